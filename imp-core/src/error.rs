use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to read {path}: {source}")]
    SourceFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("compilation of {unit} failed with {errors} error(s)")]
    Aborted { unit: String, errors: usize },
}

/// Returned when a single-assignment annotation slot is written twice with
/// different values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SlotError {
    #[error("annotation slot already holds a different value")]
    AlreadySet,
}
