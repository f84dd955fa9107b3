//! Panic hook that reports what the analyzer was doing when it crashed.

use super::context::{get_current_context, get_progress, AnalysisContext};
use std::panic::PanicHookInfo;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the crash-report hook. Call once, early in `main`.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        print_crash_report(info);
    }));
}

fn print_crash_report(info: &PanicHookInfo<'_>) {
    let context = get_current_context();
    let (processed, total) = get_progress();

    eprintln!();
    eprintln!("tenantguard {VERSION} crashed ({})", std::env::consts::OS);
    eprintln!("  panic: {}", extract_panic_message(info));
    if let Some(location) = info.location() {
        eprintln!(
            "  at: {}:{}:{}",
            location.file(),
            location.line(),
            location.column()
        );
    }
    for line in context_lines(&context, processed, total) {
        eprintln!("  {line}");
    }
    if std::env::var("RUST_BACKTRACE").is_ok() {
        eprintln!("{}", std::backtrace::Backtrace::capture());
    } else {
        eprintln!("  run with RUST_BACKTRACE=1 for a stack trace");
    }
}

fn context_lines(context: &AnalysisContext, processed: usize, total: usize) -> Vec<String> {
    let mut lines = vec![match &context.phase {
        Some(phase) => format!("phase: {phase}"),
        None => "phase: (not set)".to_string(),
    }];
    if let Some(unit) = &context.current_unit {
        lines.push(format!("fact document: {}", unit.display()));
    }
    if let Some(handler) = &context.current_handler {
        lines.push(format!("handler: {handler}"));
    }
    if total > 0 {
        lines.push(format!("progress: {processed} / {total} documents"));
    }
    lines
}

fn extract_panic_message(info: &PanicHookInfo<'_>) -> String {
    if let Some(s) = info.payload().downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = info.payload().downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::AnalysisPhase;
    use std::path::PathBuf;

    #[test]
    fn test_context_lines() {
        let context = AnalysisContext {
            phase: Some(AnalysisPhase::HandlerAnalysis),
            current_unit: Some(PathBuf::from("routes.json")),
            current_handler: Some("update_project_bad".into()),
        };
        let lines = context_lines(&context, 2, 5);
        assert_eq!(
            lines,
            vec![
                "phase: handler_analysis",
                "fact document: routes.json",
                "handler: update_project_bad",
                "progress: 2 / 5 documents",
            ]
        );
    }

    #[test]
    fn test_context_lines_before_analysis() {
        let lines = context_lines(&AnalysisContext::new(), 0, 0);
        assert_eq!(lines, vec!["phase: (not set)"]);
    }
}
