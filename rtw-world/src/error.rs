//! Error types for rtw-world
//!
//! Fusion itself never fails: incomplete cycles, evictions and dangling danger
//! references are normal outcomes. These errors cover the service around it.

use thiserror::Error;

/// Main error type for rtw-world
#[derive(Error, Debug)]
pub enum Error {
    /// Errors bubbled up from rtw-common
    #[error(transparent)]
    Common(#[from] rtw_common::Error),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Invalid request payload
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience Result type using rtw-world Error
pub type Result<T> = std::result::Result<T, Error>;
