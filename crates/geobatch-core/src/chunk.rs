//! Input chunking for batch dispatch.

use crate::error::BatchError;

/// Split `records` into contiguous chunks of at most `size` elements.
///
/// Chunks preserve the input order; every record lands in exactly one chunk
/// and only the final chunk may be shorter than `size`. Empty input yields
/// an empty list of chunks.
///
/// # Errors
/// Returns [`BatchError::InvalidChunkSize`] when `size` is zero.
pub fn chunk<T>(records: Vec<T>, size: usize) -> Result<Vec<Vec<T>>, BatchError> {
    if size == 0 {
        return Err(BatchError::InvalidChunkSize(size));
    }

    let mut chunks = Vec::with_capacity(records.len().div_ceil(size));
    let mut current = Vec::with_capacity(size.min(records.len()));

    for record in records {
        current.push(record);
        if current.len() == size {
            chunks.push(std::mem::replace(&mut current, Vec::with_capacity(size)));
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    Ok(chunks)
}
