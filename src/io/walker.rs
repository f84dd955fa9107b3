use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

const FACT_EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

/// A directory entry the walker could not read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkError {
    pub path: PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct WalkOutcome {
    pub files: Vec<PathBuf>,
    pub errors: Vec<WalkError>,
}

/// The innermost path an `ignore` error carries.
fn error_path(error: &ignore::Error) -> Option<PathBuf> {
    match error {
        ignore::Error::WithPath { path, .. } => Some(path.clone()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        ignore::Error::Partial(errors) => errors.iter().find_map(error_path),
        ignore::Error::Loop { child, .. } => Some(child.clone()),
        _ => None,
    }
}

/// Finds fact documents produced by the upstream parser.
pub struct FactFileWalker {
    root: PathBuf,
    extensions: Vec<String>,
    ignore_patterns: Vec<String>,
}

impl FactFileWalker {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            extensions: FACT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            ignore_patterns: vec![],
        }
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    /// Walk the root and return matching files in sorted order.
    ///
    /// An entry that cannot be read is skipped and recorded; the rest of
    /// the tree is still walked.
    pub fn walk(&self) -> WalkOutcome {
        let mut outcome = WalkOutcome::default();
        let walker = WalkBuilder::new(&self.root)
            .hidden(false)
            .git_ignore(true)
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = error_path(&e).unwrap_or_else(|| self.root.clone());
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable entry");
                    outcome.errors.push(WalkError {
                        path,
                        message: e.to_string(),
                    });
                    continue;
                }
            };
            let path = entry.path();

            if path.is_file() && self.should_process(path) {
                outcome.files.push(path.to_path_buf());
            }
        }

        outcome.files.sort();
        outcome.errors.sort_by(|a, b| a.path.cmp(&b.path));
        outcome
    }

    fn should_process(&self, path: &Path) -> bool {
        let Some(ext) = path.extension() else {
            return false;
        };
        let ext_str = ext.to_string_lossy();
        if !self.extensions.iter().any(|e| e == ext_str.as_ref()) {
            return false;
        }

        // Patterns are written relative to the scanned root.
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        !self.ignore_patterns.iter().any(|pattern| {
            glob::Pattern::new(pattern)
                .map(|p| p.matches_path(relative) || p.matches_path(path))
                .unwrap_or(false)
        })
    }
}
