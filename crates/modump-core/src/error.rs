//! Error types for modump.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no other running instance found")]
    NoSiblingProcess,

    #[error("nowhere to write the dump file")]
    NoDumpLocation,

    #[error("buffer query still truncated after {0} attempts")]
    BufferExhausted(usize),

    #[cfg(windows)]
    #[error("Windows API error: {0}")]
    WindowsError(#[from] windows::core::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
