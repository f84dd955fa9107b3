//! Suppressions configured through `.tenantguard.toml`.

use pretty_assertions::assert_eq;
use tenantguard::config::{SuppressionEntry, TenantGuardConfig};
use tenantguard::pipeline::analyze;
use tenantguard::report::{ExitStatus, Report};
use tenantguard::testkit::{finding_for, fixture_config, fixture_units};

fn suppress(location: &str, rule: &str, reason: Option<&str>) -> SuppressionEntry {
    SuppressionEntry {
        location: location.to_string(),
        rule: rule.to_string(),
        reason: reason.map(str::to_string),
    }
}

fn run_with(entries: Vec<SuppressionEntry>) -> Report {
    let config = TenantGuardConfig {
        suppressions: entries,
        ..fixture_config()
    };
    analyze(&fixture_units(), &[], &config).unwrap()
}

#[test]
fn test_suppressed_finding_is_reported_but_not_blocking() {
    let report = run_with(vec![suppress(
        "routes.py::update_project_bad",
        "tenant/missing-filter-on-mutation",
        Some("legacy endpoint, removed in the next release"),
    )]);

    let finding = finding_for(&report, "update_project_bad").unwrap();
    assert!(finding.suppressed);
    assert!(!finding.is_blocking());
    assert_eq!(
        finding.suppression_reason.as_deref(),
        Some("legacy endpoint, removed in the next release")
    );
    assert_eq!(report.summary.suppressed, 1);
    assert_eq!(report.blocking().count(), 4);
}

#[test]
fn test_rule_must_match() {
    let report = run_with(vec![suppress(
        "routes.py::update_project_bad",
        "tenant/missing-dependency",
        None,
    )]);

    assert!(!finding_for(&report, "update_project_bad").unwrap().suppressed);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("matched no finding"));
}

#[test]
fn test_file_line_suppression() {
    let report = run_with(vec![suppress("routes.py:58", "tenant/unused-dependency", None)]);

    assert!(finding_for(&report, "list_projects_missing_filter")
        .unwrap()
        .suppressed);
    assert!(report.warnings.is_empty());
}

#[test]
fn test_suppressing_every_violation_makes_the_run_clean() {
    let report = run_with(vec![suppress("routes.py", "*", None)]);

    assert_eq!(report.summary.suppressed, 5);
    assert_eq!(report.blocking().count(), 0);
    assert_eq!(report.exit_status(), ExitStatus::Clean);
}

#[test]
fn test_suppressions_parse_from_toml() {
    let config: TenantGuardConfig = toml::from_str(
        r#"
[[suppressions]]
location = "routes.py::delete_user_bad"
rule = "tenant/missing-dependency"
reason = "guarded by the gateway"
"#,
    )
    .unwrap();
    let report = run_with(config.suppressions);

    let finding = finding_for(&report, "delete_user_bad").unwrap();
    assert!(finding.suppressed);
    assert_eq!(finding.suppression_reason.as_deref(), Some("guarded by the gateway"));
}
