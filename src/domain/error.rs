//! Error types for the diff rendering core.
//!
//! Selection and positioning never error (they degrade to empty output or a
//! best-effort position), so the error surface is limited to payload
//! interpretation and grouping.

use thiserror::Error;

/// Errors raised while interpreting diff payloads or grouping lines.
#[derive(Debug, Error)]
pub enum DiffError {
    #[error("Invalid diff format: {0}")]
    InvalidFormat(String),

    #[error("Invalid diff chunk: {0}")]
    InvalidChunk(String),

    #[error("Diff operation failed: {0}")]
    OperationFailed(#[from] anyhow::Error),
}
