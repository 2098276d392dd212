//! Sync error types.
//!
//! These never leave the sync layer: the remote client logs them and reports
//! "no document" instead, so local state stays authoritative.

use thiserror::Error;

/// Errors that can occur while talking to the remote store.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The response was empty, not JSON, or not a roster document.
    #[error("Malformed remote data: {0}")]
    MalformedRemoteData(String),

    /// The request could not be completed.
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}
