//! Sync module for the remote single-document store.
//!
//! The whole roster is exchanged as one JSON document:
//! 1. `pull` GETs the document; anything that is not a roster is ignored
//! 2. the engine merges it into the local copy under one merge policy
//! 3. after each local write the document is stamped and POSTed in the
//!    background, without waiting for an acknowledgment

mod engine;
mod error;
#[cfg(test)]
pub(crate) mod fake;
mod remote;

pub use engine::{merge, now_millis, MergeOutcome, MergePolicy, SyncEngine};
pub use error::SyncError;
pub use remote::{parse_remote_body, HttpRemoteStore, RemoteStore};
