//! Crate error type.
//!
//! Background failures (notification, wake-lock, persistence) are logged
//! where they happen and never reach API callers; this type mostly
//! surfaces through [`crate::storage`].

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("alarm file is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}
