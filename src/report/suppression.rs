//! Suppressions from the `[[suppressions]]` config table.
//!
//! An entry names a location (`file:line`, `file::handler`, a bare handler
//! or a file glob) and a rule id or `*`. Only violations can be suppressed;
//! a suppressed violation stays in the report but no longer blocks.

use super::Finding;
use crate::config::SuppressionEntry;
use std::path::Path;

/// What a suppression entry's `location` refers to.
#[derive(Debug, Clone)]
pub enum SuppressionTarget {
    /// `routes.py:40`
    FileLine { file: String, line: u32 },
    /// `routes.py::list_users`
    FileHandler { file: String, handler: String },
    /// `list_users`
    Handler(String),
    /// `app/admin/**` or `routes.py`
    File(glob::Pattern, String),
}

impl SuppressionTarget {
    pub fn parse(location: &str) -> Self {
        let location = location.trim();
        if let Some((file, handler)) = location.split_once("::") {
            return Self::FileHandler {
                file: file.to_string(),
                handler: handler.to_string(),
            };
        }
        if let Some((file, line)) = location.rsplit_once(':') {
            if let Ok(line) = line.parse::<u32>() {
                return Self::FileLine {
                    file: file.to_string(),
                    line,
                };
            }
        }
        let looks_like_path = location.contains(['/', '.', '*', '?', '[']);
        if looks_like_path {
            if let Ok(pattern) = glob::Pattern::new(location) {
                return Self::File(pattern, location.to_string());
            }
        }
        Self::Handler(location.to_string())
    }

    pub fn matches(&self, finding: &Finding) -> bool {
        let location = &finding.location;
        match self {
            Self::FileLine { file, line } => {
                same_file(file, &location.file) && location.line == Some(*line)
            }
            Self::FileHandler { file, handler } => {
                same_file(file, &location.file) && *handler == location.handler
            }
            Self::Handler(handler) => *handler == location.handler,
            Self::File(pattern, raw) => {
                pattern.matches(&location.file) || same_file(raw, &location.file)
            }
        }
    }
}

/// `routes.py` names `app/routes.py` too; paths are compared by trailing
/// components.
fn same_file(wanted: &str, actual: &str) -> bool {
    wanted == actual || Path::new(actual).ends_with(wanted)
}

#[derive(Debug, Clone)]
pub struct Suppression {
    pub target: SuppressionTarget,
    /// `None` suppresses every rule.
    pub rule: Option<String>,
    pub reason: Option<String>,
    pub location: String,
}

impl Suppression {
    pub fn from_entry(entry: &SuppressionEntry) -> Self {
        Self {
            target: SuppressionTarget::parse(&entry.location),
            rule: (entry.rule != "*").then(|| entry.rule.clone()),
            reason: entry.reason.clone(),
            location: entry.location.clone(),
        }
    }

    /// Only violations are suppressible. Findings the analyzer could not
    /// classify always stay visible.
    pub fn applies_to(&self, finding: &Finding) -> bool {
        finding.is_violation()
            && match &self.rule {
                None => true,
                Some(rule) => finding.rule_id.as_deref() == Some(rule.as_str()),
            }
            && self.target.matches(finding)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SuppressionList {
    entries: Vec<Suppression>,
}

impl SuppressionList {
    pub fn from_config(entries: &[SuppressionEntry]) -> Self {
        Self {
            entries: entries.iter().map(Suppression::from_entry).collect(),
        }
    }

    /// Index of the first suppression covering `finding`.
    pub fn find(&self, finding: &Finding) -> Option<usize> {
        self.entries.iter().position(|s| s.applies_to(finding))
    }

    pub fn get(&self, index: usize) -> Option<&Suppression> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Suppression> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::Location;
    use crate::isolation::{Classification, ViolationKind};

    fn violation(file: &str, line: u32, handler: &str, kind: ViolationKind) -> Finding {
        Finding {
            access_point_id: Some(format!("{file}:{line}:{handler}#0")),
            location: Location::new(file, Some(line), handler),
            classification: Classification::Violation,
            violation_kind: Some(kind),
            rule_id: Some(kind.rule_id().to_string()),
            severity: None,
            entities: vec!["User".into()],
            operation: None,
            rationale: String::new(),
            suggested_fix: None,
            error_code: None,
            suppressed: false,
            suppression_reason: None,
        }
    }

    fn entry(location: &str, rule: &str) -> SuppressionEntry {
        SuppressionEntry {
            location: location.into(),
            rule: rule.into(),
            reason: Some("accepted".into()),
        }
    }

    #[test]
    fn test_parse_location_forms() {
        assert!(matches!(
            SuppressionTarget::parse("routes.py:40"),
            SuppressionTarget::FileLine { line: 40, .. }
        ));
        assert!(matches!(
            SuppressionTarget::parse("routes.py::list_users"),
            SuppressionTarget::FileHandler { .. }
        ));
        assert!(matches!(
            SuppressionTarget::parse("list_users"),
            SuppressionTarget::Handler(_)
        ));
        assert!(matches!(
            SuppressionTarget::parse("app/admin/**"),
            SuppressionTarget::File(..)
        ));
    }

    #[test]
    fn test_rule_must_match() {
        let finding = violation("app/routes.py", 40, "list_projects", ViolationKind::UnusedDependency);
        let list = SuppressionList::from_config(&[
            entry("routes.py:40", "tenant/missing-dependency"),
            entry("routes.py:40", "tenant/unused-dependency"),
        ]);
        assert_eq!(list.find(&finding), Some(1));
    }

    #[test]
    fn test_wildcard_rule_and_handler_name() {
        let finding = violation("routes.py", 12, "list_users_bad", ViolationKind::MissingDependency);
        let list = SuppressionList::from_config(&[entry("list_users_bad", "*")]);
        assert_eq!(list.find(&finding), Some(0));

        let other = violation("routes.py", 12, "list_users", ViolationKind::MissingDependency);
        assert_eq!(list.find(&other), None);
    }

    #[test]
    fn test_file_glob() {
        let finding = violation("app/admin/users.py", 3, "purge", ViolationKind::MissingDependency);
        let list = SuppressionList::from_config(&[entry("app/admin/*", "*")]);
        assert_eq!(list.find(&finding), Some(0));
    }

    #[test]
    fn test_unknown_findings_are_never_suppressed() {
        let mut finding = violation("routes.py", 1, "broken", ViolationKind::MissingDependency);
        finding.classification = Classification::Unknown;
        finding.rule_id = None;
        let list = SuppressionList::from_config(&[entry("routes.py", "*")]);
        assert_eq!(list.find(&finding), None);
    }
}
