//! Error types for Rill.
//!
//! Streams carry no per-value failure channel. The only recoverable errors
//! are configuration errors, reported synchronously by the call that builds
//! the operator.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RillError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RillError {
    #[error("buffer count must be greater than zero (got {count})")]
    InvalidBufferCount { count: usize },
}
