//! Per-handler extraction of access points.
//!
//! ```rust,ignore
//! use tenantguard::extraction::AccessPointExtractor;
//!
//! let extractor = AccessPointExtractor::new(&schema, &config);
//! for handler in &unit.document.handlers {
//!     match extractor.extract_handler(handler) {
//!         Ok(points) => { /* evaluate */ }
//!         Err(e) => eprintln!("{e}"),
//!     }
//! }
//! ```

use super::control_flow::{check_limits, execution_paths};
use super::predicates::{normalize_predicate, RhsResolver};
use super::{AccessPoint, ExemptionKind, HandlerError, ProviderKind, ProviderTable};
use crate::config::{ScanLimits, TenantGuardConfig};
use crate::errors::ExtractionError;
use crate::facts::{HandlerFact, Location, OperationFact};
use crate::schema::{ClassifiedSchema, Entity};
use std::collections::BTreeSet;

/// Turns handler facts into access points against a classified schema.
///
/// Holds only shared references and immutable tables, so a single
/// extractor can be used from every worker thread.
pub struct AccessPointExtractor<'a> {
    schema: &'a ClassifiedSchema,
    providers: ProviderTable,
    admin_route_prefixes: Vec<String>,
    limits: ScanLimits,
    ignore: Vec<glob::Pattern>,
}

impl<'a> AccessPointExtractor<'a> {
    pub fn new(schema: &'a ClassifiedSchema, config: &TenantGuardConfig) -> Self {
        Self {
            schema,
            providers: ProviderTable::from_config(&config.providers),
            admin_route_prefixes: config.exemptions.admin_route_prefixes.clone(),
            limits: config.limits.clone(),
            ignore: config
                .get_ignore_patterns()
                .iter()
                .filter_map(|p| glob::Pattern::new(p).ok())
                .collect(),
        }
    }

    /// Handlers in files matching an ignore pattern are not analyzed.
    pub fn is_ignored(&self, location: &Location) -> bool {
        self.ignore.iter().any(|p| p.matches(&location.file))
    }

    /// Extract every access point of one handler.
    ///
    /// Any malformed operation fails the whole handler, so that it is
    /// reported as `Unknown` instead of being partially analyzed.
    pub fn extract_handler(&self, handler: &HandlerFact) -> Result<Vec<AccessPoint>, HandlerError> {
        self.extract_operations(handler).map_err(|error| HandlerError {
            location: handler.location.clone(),
            error,
        })
    }

    fn extract_operations(&self, handler: &HandlerFact) -> Result<Vec<AccessPoint>, ExtractionError> {
        if handler.operations.len() > self.limits.max_operations_per_handler {
            return Err(ExtractionError::ScanCapExceeded {
                limit: "max_operations_per_handler",
                value: handler.operations.len(),
                max: self.limits.max_operations_per_handler,
            });
        }

        let classified: Vec<(&str, ProviderKind)> = handler
            .declared_dependencies
            .iter()
            .map(|d| {
                (
                    d.name.as_str(),
                    self.providers.classify(&d.provider, d.provider_kind_hint),
                )
            })
            .collect();

        let dependencies: BTreeSet<ProviderKind> =
            classified.iter().map(|(_, kind)| *kind).collect();
        let tenant_values: BTreeSet<&str> = classified
            .iter()
            .filter(|(_, kind)| *kind == ProviderKind::TenantContextProvider)
            .map(|(name, _)| *name)
            .collect();
        let exemptions = self.exemptions(handler, &dependencies);
        let resolver = RhsResolver::new(&handler.bindings, tenant_values);

        handler
            .operations
            .iter()
            .enumerate()
            .map(|(index, op)| {
                self.extract_operation(handler, index, op, &dependencies, &exemptions, &resolver)
            })
            .collect()
    }

    fn exemptions(
        &self,
        handler: &HandlerFact,
        dependencies: &BTreeSet<ProviderKind>,
    ) -> BTreeSet<ExemptionKind> {
        let mut exemptions = BTreeSet::new();
        if dependencies.contains(&ProviderKind::AdminProvider) {
            exemptions.insert(ExemptionKind::AdminProvider);
        }
        let admin_route = handler.location.route.as_deref().is_some_and(|route| {
            self.admin_route_prefixes
                .iter()
                .any(|prefix| route.starts_with(prefix.as_str()))
        });
        if admin_route {
            exemptions.insert(ExemptionKind::AdminRoute);
        }
        exemptions
    }

    fn extract_operation(
        &self,
        handler: &HandlerFact,
        index: usize,
        op: &OperationFact,
        dependencies: &BTreeSet<ProviderKind>,
        exemptions: &BTreeSet<ExemptionKind>,
        resolver: &RhsResolver<'_>,
    ) -> Result<AccessPoint, ExtractionError> {
        check_limits(&op.control_flow, &self.limits)?;

        if op.target_entities.is_empty() {
            return Err(ExtractionError::NoTargets { operation: index });
        }
        let targets = self.resolve_targets(&op.target_entities, index)?;

        let predicates = op
            .predicates
            .iter()
            .map(|p| normalize_predicate(p, &targets, resolver, index))
            .collect::<Result<Vec<_>, _>>()?;

        let execution_paths = execution_paths(&op.control_flow);
        let reaches_execution = !execution_paths.is_empty();

        let mut location = handler.location.clone();
        location.line = op.line.or(handler.location.line);

        let point = AccessPoint {
            id: access_point_id(&handler.location, index),
            location,
            operation_kind: op.kind,
            target_entities: targets.iter().map(|e| e.name.clone()).collect(),
            dependencies: dependencies.clone(),
            exemptions: exemptions.clone(),
            predicates,
            execution_paths,
            reaches_execution,
        };
        tracing::trace!(
            id = %point.id,
            kind = %point.operation_kind,
            reaches_execution,
            "extracted access point"
        );
        Ok(point)
    }

    fn resolve_targets(
        &self,
        names: &[String],
        operation: usize,
    ) -> Result<Vec<&'a Entity>, ExtractionError> {
        let mut targets: Vec<&Entity> = Vec::with_capacity(names.len());
        for name in names {
            let entity =
                self.schema
                    .resolve(name.trim())
                    .ok_or_else(|| ExtractionError::UnknownEntity {
                        entity: name.clone(),
                        operation,
                    })?;
            if !targets.iter().any(|t| t.name == entity.name) {
                targets.push(entity);
            }
        }
        Ok(targets)
    }
}

/// `file:line:handler#index`, or `file:handler#index` without a line.
pub fn access_point_id(location: &Location, index: usize) -> String {
    format!("{}:{}#{}", location.file_position(), location.handler, index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::{OperationKind, PathFact};
    use crate::schema::classify;
    use crate::testkit::{fixture_config, fixture_schema, HandlerFactBuilder, OperationFactBuilder};

    fn schema() -> ClassifiedSchema {
        classify(&fixture_schema(), &fixture_config().schema).unwrap()
    }

    #[test]
    fn test_extracts_scoped_read() {
        let schema = schema();
        let config = fixture_config();
        let extractor = AccessPointExtractor::new(&schema, &config);
        let handler = HandlerFactBuilder::new("routes.py", 36, "list_users_good")
            .dependency("db", "get_db")
            .dependency("workspace", "get_current_workspace")
            .operation(
                OperationFactBuilder::read(&["User"])
                    .filter("User.workspace_id", "workspace.id")
                    .build(),
            )
            .build();

        let points = extractor.extract_handler(&handler).unwrap();
        assert_eq!(points.len(), 1);
        let point = &points[0];
        assert_eq!(point.id, "routes.py:36:list_users_good#0");
        assert!(point.reaches_execution);
        assert!(point.has_dependency(ProviderKind::TenantContextProvider));
        assert!(point.exemptions.is_empty());
        assert_eq!(point.predicates[0].entity, "User");
        assert_eq!(
            point.predicates[0].rhs_source,
            crate::extraction::RhsSource::TenantContextValue
        );
    }

    #[test]
    fn test_admin_dependency_and_route_exemptions() {
        let schema = schema();
        let config = fixture_config();
        let extractor = AccessPointExtractor::new(&schema, &config);
        let handler = HandlerFactBuilder::new("routes.py", 120, "admin_list_all_users")
            .route("/admin/all-users")
            .dependency("_admin", "require_admin")
            .operation(OperationFactBuilder::read(&["User"]).build())
            .build();

        let point = &extractor.extract_handler(&handler).unwrap()[0];
        assert_eq!(
            point.exemptions,
            BTreeSet::from([ExemptionKind::AdminProvider, ExemptionKind::AdminRoute])
        );
    }

    #[test]
    fn test_unknown_entity_fails_the_handler() {
        let schema = schema();
        let config = fixture_config();
        let extractor = AccessPointExtractor::new(&schema, &config);
        let handler = HandlerFactBuilder::new("routes.py", 10, "list_invoices")
            .operation(OperationFactBuilder::read(&["User"]).build())
            .operation(OperationFactBuilder::read(&["Invoice"]).build())
            .build();

        let err = extractor.extract_handler(&handler).unwrap_err();
        assert_eq!(err.location.handler, "list_invoices");
        assert_eq!(
            err.error,
            ExtractionError::UnknownEntity {
                entity: "Invoice".into(),
                operation: 1,
            }
        );
    }

    #[test]
    fn test_unexecuted_operation_does_not_reach_execution() {
        let schema = schema();
        let config = fixture_config();
        let extractor = AccessPointExtractor::new(&schema, &config);
        let mut op = OperationFactBuilder::new(OperationKind::Delete, &["User"]).build();
        op.control_flow.paths = vec![PathFact {
            branch: None,
            builds: true,
            executes: false,
        }];
        let handler = HandlerFactBuilder::new("routes.py", 5, "build_only")
            .operation(op)
            .build();

        let point = &extractor.extract_handler(&handler).unwrap()[0];
        assert!(!point.reaches_execution);
        assert!(point.execution_paths.is_empty());
    }

    #[test]
    fn test_operation_cap() {
        let schema = schema();
        let mut config = fixture_config();
        config.limits.max_operations_per_handler = 1;
        let extractor = AccessPointExtractor::new(&schema, &config);
        let handler = HandlerFactBuilder::new("routes.py", 5, "busy")
            .operation(OperationFactBuilder::read(&["User"]).build())
            .operation(OperationFactBuilder::read(&["Project"]).build())
            .build();

        assert!(matches!(
            extractor.extract_handler(&handler).unwrap_err().error,
            ExtractionError::ScanCapExceeded { .. }
        ));
    }

    #[test]
    fn test_ignore_patterns_match_handler_file() {
        let schema = schema();
        let mut config = fixture_config();
        config.analysis.ignore = vec!["tests/**".into()];
        let extractor = AccessPointExtractor::new(&schema, &config);

        assert!(extractor.is_ignored(&Location::new("tests/test_routes.py", Some(1), "t")));
        assert!(!extractor.is_ignored(&Location::new("app/routes.py", Some(1), "t")));
    }
}
