//! Error collection for batch loading of fact documents.
//!
//! Each fact document is loaded independently. Instead of stopping at the
//! first unreadable file, we collect every failure and hand both successes
//! and failures to the pipeline, which decides (strict vs. lenient) whether
//! the run can continue.

use super::ErrorCode;
use serde::Serialize;
use std::path::PathBuf;

/// Successes and failures of a batch operation.
#[derive(Debug, Clone)]
pub struct BatchResults<T> {
    pub successes: Vec<T>,
    pub failures: Vec<AnalysisFailure>,
}

impl<T> BatchResults<T> {
    pub fn new(successes: Vec<T>, failures: Vec<AnalysisFailure>) -> Self {
        Self {
            successes,
            failures,
        }
    }

    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn total_count(&self) -> usize {
        self.success_count() + self.failure_count()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }
}

impl<T> FromIterator<Result<T, AnalysisFailure>> for BatchResults<T> {
    fn from_iter<I: IntoIterator<Item = Result<T, AnalysisFailure>>>(iter: I) -> Self {
        let mut successes = Vec::new();
        let mut failures = Vec::new();
        for item in iter {
            match item {
                Ok(value) => successes.push(value),
                Err(failure) => failures.push(failure),
            }
        }
        Self::new(successes, failures)
    }
}

/// A source unit that could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisFailure {
    pub path: PathBuf,
    pub operation: OperationType,
    pub code: ErrorCode,
    pub error: String,
}

impl AnalysisFailure {
    pub fn file_read(path: PathBuf, error: &std::io::Error) -> Self {
        Self {
            path,
            operation: OperationType::FileRead,
            code: ErrorCode::LOAD_IO,
            error: error.to_string(),
        }
    }

    pub fn file_parse(path: PathBuf, error: impl std::fmt::Display) -> Self {
        Self {
            path,
            operation: OperationType::FileParse,
            code: ErrorCode::LOAD_PARSE,
            error: error.to_string(),
        }
    }

    pub fn directory_access(path: PathBuf, error: impl std::fmt::Display) -> Self {
        Self {
            path,
            operation: OperationType::DirectoryAccess,
            code: ErrorCode::LOAD_IO,
            error: error.to_string(),
        }
    }
}

/// Type of operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    FileRead,
    FileParse,
    DirectoryAccess,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileRead => "File read",
            Self::FileParse => "File parse",
            Self::DirectoryAccess => "Directory access",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_results_collects_both_sides() {
        let results: BatchResults<u32> = vec![
            Ok(1),
            Err(AnalysisFailure::file_parse(
                PathBuf::from("b.json"),
                "expected value at line 1",
            )),
            Ok(3),
        ]
        .into_iter()
        .collect();

        assert_eq!(results.success_count(), 2);
        assert_eq!(results.failure_count(), 1);
        assert_eq!(results.total_count(), 3);
        assert!(!results.is_complete_success());
        assert_eq!(results.failures[0].code, ErrorCode::LOAD_PARSE);
    }

    #[test]
    fn test_file_read_failure_keeps_message() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Permission denied");
        let failure = AnalysisFailure::file_read(PathBuf::from("a.json"), &io);

        assert_eq!(failure.operation, OperationType::FileRead);
        assert_eq!(failure.operation.as_str(), "File read");
        assert!(failure.error.contains("Permission denied"));
    }
}
