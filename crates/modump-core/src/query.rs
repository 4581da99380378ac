//! Growing-buffer queries against OS enumeration APIs.
//!
//! Several Win32 queries fill a caller-supplied buffer and report how many
//! elements they wrote, with no way to tell an exact fit from a truncated
//! result. The loop here only trusts a result that is strictly smaller than
//! the buffer it was given.

use crate::{Error, Result};

/// Upper bound on buffer doublings before a query is abandoned.
pub const MAX_GROW_TRIES: usize = 10;

/// Calls `op` with ever larger buffers until it reports a count strictly
/// below the buffer capacity.
///
/// `op` receives a zeroed buffer and returns the number of elements the OS
/// wrote into it. A count equal to the capacity doubles the buffer and
/// retries; a hard failure from `op` aborts the query without retrying.
/// After [`MAX_GROW_TRIES`] attempts the query fails with
/// [`Error::BufferExhausted`].
pub fn grow_query<T, F>(initial: usize, mut op: F) -> Result<Vec<T>>
where
    T: Default + Clone,
    F: FnMut(&mut [T]) -> Result<usize>,
{
    let mut capacity = initial;

    for _ in 0..MAX_GROW_TRIES {
        let mut buffer = vec![T::default(); capacity];
        let written = op(&mut buffer)?;

        if written < capacity {
            buffer.truncate(written);
            return Ok(buffer);
        }

        // an exact fit is indistinguishable from truncation, try bigger
        capacity *= 2;
    }

    Err(Error::BufferExhausted(MAX_GROW_TRIES))
}
