//! End-to-end verdicts for the reference application.
//!
//! The first six tests are the canonical scenarios; the rest check the full
//! report the application produces.

use pretty_assertions::assert_eq;
use tenantguard::isolation::{Classification, Severity, ViolationKind};
use tenantguard::pipeline::analyze;
use tenantguard::report::{ExitStatus, Report};
use tenantguard::testkit::{
    finding_for, fixture_config, fixture_schema, fixture_units, HandlerFactBuilder,
    OperationFactBuilder,
};
use tenantguard::{FactsDocument, HandlerFact, SourceUnit};

fn analyze_handlers(handlers: Vec<HandlerFact>) -> Report {
    let unit = SourceUnit::new(
        "facts/app.json",
        FactsDocument {
            source: Some("app.py".into()),
            schema: fixture_schema(),
            handlers,
        },
    );
    let mut config = fixture_config();
    config.analysis.include_safe = true;
    analyze(&[unit], &[], &config).expect("fixture schema classifies")
}

fn single(handler: HandlerFact) -> (Classification, Option<ViolationKind>) {
    let name = handler.location.handler.clone();
    let report = analyze_handlers(vec![handler]);
    let finding = finding_for(&report, &name).expect("handler has a finding");
    (finding.classification, finding.violation_kind)
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn scenario_a_read_without_dependency() {
    let handler = HandlerFactBuilder::new("app.py", 1, "list_users")
        .dependency("db", "get_db")
        .operation(OperationFactBuilder::read(&["User"]).build())
        .build();

    assert_eq!(
        single(handler),
        (
            Classification::Violation,
            Some(ViolationKind::MissingDependency)
        )
    );
}

#[test]
fn scenario_b_filtered_read_is_safe() {
    let handler = HandlerFactBuilder::new("app.py", 1, "list_users")
        .dependency("ctx", "get_current_workspace")
        .binding("workspace", "ctx.workspace")
        .operation(
            OperationFactBuilder::read(&["User"])
                .filter("User.workspace_id", "workspace.id")
                .build(),
        )
        .build();

    assert_eq!(single(handler), (Classification::Safe, None));
}

#[test]
fn scenario_c_dependency_unused_by_query() {
    let handler = HandlerFactBuilder::new("app.py", 1, "list_projects")
        .dependency("workspace", "get_current_workspace")
        .operation(OperationFactBuilder::read(&["Project"]).build())
        .build();

    assert_eq!(
        single(handler),
        (
            Classification::Violation,
            Some(ViolationKind::UnusedDependency)
        )
    );
}

#[test]
fn scenario_d_update_filtered_by_id_only() {
    let handler = HandlerFactBuilder::new("app.py", 1, "update_project")
        .dependency("workspace", "get_current_workspace")
        .operation(
            OperationFactBuilder::update(&["Project"])
                .filter("Project.id", "project_id")
                .build(),
        )
        .build();

    assert_eq!(
        single(handler),
        (
            Classification::Violation,
            Some(ViolationKind::MissingFilterOnMutation)
        )
    );
}

#[test]
fn scenario_e_global_table_needs_no_tenant() {
    let handler = HandlerFactBuilder::new("app.py", 1, "list_flags")
        .operation(OperationFactBuilder::read(&["FeatureFlag"]).build())
        .build();

    assert_eq!(single(handler), (Classification::Safe, None));
}

#[test]
fn scenario_f_admin_provider_is_exempt() {
    let handler = HandlerFactBuilder::new("app.py", 1, "all_users")
        .dependency("_admin", "require_admin")
        .operation(OperationFactBuilder::read(&["User"]).build())
        .build();

    assert_eq!(single(handler), (Classification::Exempt, None));
}

// ============================================================================
// Full application
// ============================================================================

#[test]
fn test_reference_application_verdicts() {
    let mut config = fixture_config();
    config.analysis.include_safe = true;
    let report = analyze(&fixture_units(), &[], &config).unwrap();

    let verdicts: Vec<(&str, Classification, Option<ViolationKind>)> = report
        .findings
        .iter()
        .map(|f| (f.location.handler.as_str(), f.classification, f.violation_kind))
        .collect();

    use Classification::*;
    use ViolationKind::*;
    assert_eq!(
        verdicts,
        vec![
            ("list_users_bad", Violation, Some(MissingDependency)),
            ("list_users_good", Safe, None),
            ("list_projects_no_auth", Violation, Some(MissingDependency)),
            ("list_projects_missing_filter", Violation, Some(UnusedDependency)),
            ("list_projects_safe", Safe, None),
            ("update_project_bad", Violation, Some(MissingFilterOnMutation)),
            ("update_project_safe", Safe, None),
            ("list_feature_flags", Safe, None),
            ("admin_list_all_users", Exempt, None),
            ("delete_user_bad", Violation, Some(MissingDependency)),
            ("delete_user_safe", Safe, None),
        ]
    );
}

#[test]
fn test_reference_application_summary() {
    let report = analyze(&fixture_units(), &[], &fixture_config()).unwrap();

    // Safe findings are counted but left out of the listing.
    assert_eq!(report.findings.len(), 6);
    assert_eq!(report.summary.total, 11);
    assert_eq!(report.summary.count(Classification::Safe), 5);
    assert_eq!(report.summary.count(Classification::Exempt), 1);
    assert_eq!(report.summary.violations(), 5);
    assert_eq!(report.summary.analyzer_errors, 0);
    assert_eq!(report.exit_status(), ExitStatus::Violations);
}

#[test]
fn test_mutations_are_critical() {
    let report = analyze(&fixture_units(), &[], &fixture_config()).unwrap();

    let severity = |handler: &str| finding_for(&report, handler).and_then(|f| f.severity);
    assert_eq!(severity("update_project_bad"), Some(Severity::Critical));
    assert_eq!(severity("delete_user_bad"), Some(Severity::Critical));
    assert_eq!(severity("list_users_bad"), Some(Severity::High));
    assert_eq!(severity("list_projects_missing_filter"), Some(Severity::Medium));
}

#[test]
fn test_findings_carry_rule_ids_and_fixes() {
    let report = analyze(&fixture_units(), &[], &fixture_config()).unwrap();
    let finding = finding_for(&report, "update_project_bad").unwrap();

    assert_eq!(
        finding.rule_id.as_deref(),
        Some("tenant/missing-filter-on-mutation")
    );
    assert_eq!(finding.location.line, Some(81));
    assert_eq!(finding.location.route.as_deref(), Some("/projects/{project_id}"));
    assert!(finding.suggested_fix.is_some());
    assert!(finding.rationale.contains("Project"));
}

#[test]
fn test_audit_log_default_is_configurable() {
    use tenantguard::config::UnresolvedScope;

    let handler = HandlerFactBuilder::new("app.py", 1, "list_audit")
        .operation(OperationFactBuilder::read(&["AuditLog"]).build())
        .build();
    let unit = SourceUnit::new(
        "facts/app.json",
        FactsDocument {
            source: None,
            schema: fixture_schema(),
            handlers: vec![handler],
        },
    );

    let mut config = fixture_config();
    config.analysis.include_safe = true;
    let report = analyze(std::slice::from_ref(&unit), &[], &config).unwrap();
    assert_eq!(report.findings[0].classification, Classification::Safe);

    config.schema.unresolved_scope = UnresolvedScope::MarkerColumn;
    let report = analyze(&[unit], &[], &config).unwrap();
    assert_eq!(
        report.findings[0].violation_kind,
        Some(ViolationKind::MissingDependency)
    );
}

#[test]
fn test_filter_on_one_branch_only_is_not_enough() {
    let handler = HandlerFactBuilder::new("app.py", 1, "search_projects")
        .dependency("workspace", "get_current_workspace")
        .operation(
            OperationFactBuilder::read(&["Project"])
                .branches(&["scoped", "unscoped"])
                .filter_on_branch("Project.workspace_id", "workspace.id", "scoped")
                .build(),
        )
        .build();

    assert_eq!(
        single(handler),
        (
            Classification::Violation,
            Some(ViolationKind::UnusedDependency)
        )
    );
}

#[test]
fn test_join_with_one_scoped_entity_is_partial() {
    let handler = HandlerFactBuilder::new("app.py", 1, "users_with_projects")
        .dependency("workspace", "get_current_workspace")
        .operation(
            OperationFactBuilder::read(&["User", "Project"])
                .filter("User.workspace_id", "workspace.id")
                .build(),
        )
        .build();

    assert_eq!(
        single(handler),
        (
            Classification::Violation,
            Some(ViolationKind::PartialFilterCoverage)
        )
    );
}
