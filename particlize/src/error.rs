//! Error types used by this crate.

use thiserror::Error;

/// Catch-all error for this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A fatal configuration error (unrecognized df scheme, dimension, ...).
    #[error("configuration error: {0}")]
    Config(String),
    /// An error that originates in this crate.
    #[error("{0}")]
    General(String),
    /// Error that does not originate from this crate.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
