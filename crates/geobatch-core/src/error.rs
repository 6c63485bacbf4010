// Error types for batch dispatch

use thiserror::Error;

/// Errors surfaced by batch-level operations.
///
/// Per-item remote faults never appear here; they are absorbed by the retry
/// loop and represented by the item's absence from the output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    /// Chunk size would make chunking loop forever.
    #[error("Invalid chunk size: {0} (must be at least 1)")]
    InvalidChunkSize(usize),
}
