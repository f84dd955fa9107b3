use super::FactsDocument;
use crate::errors::collection::{AnalysisFailure, BatchResults};
use crate::io::walker::FactFileWalker;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// A fact document together with the file it was loaded from.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceUnit {
    pub origin: PathBuf,
    pub document: FactsDocument,
}

impl SourceUnit {
    pub fn new(origin: impl Into<PathBuf>, document: FactsDocument) -> Self {
        Self {
            origin: origin.into(),
            document,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentFormat {
    Json,
    Yaml,
}

fn detect_format(path: &Path) -> DocumentFormat {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => DocumentFormat::Yaml,
        _ => DocumentFormat::Json,
    }
}

/// Parse a fact document from its text, picking the format from the path.
pub fn parse_document(path: &Path, contents: &str) -> Result<FactsDocument, AnalysisFailure> {
    let parsed = match detect_format(path) {
        DocumentFormat::Json => {
            serde_json::from_str::<FactsDocument>(contents).map_err(|e| e.to_string())
        }
        DocumentFormat::Yaml => {
            serde_yaml::from_str::<FactsDocument>(contents).map_err(|e| e.to_string())
        }
    };
    parsed.map_err(|message| AnalysisFailure::file_parse(path.to_path_buf(), message))
}

/// Read and parse a single fact document.
pub fn load_document(path: &Path) -> Result<SourceUnit, AnalysisFailure> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| AnalysisFailure::file_read(path.to_path_buf(), &e))?;
    let document = parse_document(path, &contents)?;
    tracing::debug!(
        path = %path.display(),
        entities = document.schema.len(),
        handlers = document.handlers.len(),
        "loaded fact document"
    );
    Ok(SourceUnit::new(path, document))
}

/// Load every fact document under `root` (a file or a directory).
///
/// Documents are read in parallel; the result is sorted by origin so that
/// downstream merging never depends on filesystem or thread order.
pub fn load_units(root: &Path, ignore_patterns: &[String]) -> BatchResults<SourceUnit> {
    let (files, walk_failures) = if root.is_file() {
        (vec![root.to_path_buf()], Vec::new())
    } else {
        let outcome = FactFileWalker::new(root.to_path_buf())
            .with_ignore_patterns(ignore_patterns.to_vec())
            .walk();
        let failures: Vec<AnalysisFailure> = outcome
            .errors
            .into_iter()
            .map(|e| AnalysisFailure::directory_access(e.path, e.message))
            .collect();
        (outcome.files, failures)
    };

    let mut results: BatchResults<SourceUnit> =
        files.par_iter().map(|path| load_document(path)).collect::<Vec<_>>().into_iter().collect();
    results.failures.extend(walk_failures);
    results.successes.sort_by(|a, b| a.origin.cmp(&b.origin));
    results.failures.sort_by(|a, b| a.path.cmp(&b.path));
    results
}
