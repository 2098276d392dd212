//! Roster Core Library
//!
//! Document model, local persistence and remote synchronization for the
//! Roster classroom tracker.

pub mod models;
pub mod session;
pub mod storage;
pub mod sync;

pub use models::{
    class_names, default_document, validate_name, CounterField, FlagField, RosterDocument,
    StudentRecord, TrackingMode, DEFAULT_CLASS_NAME, UPDATED_AT_KEY,
};
pub use session::{MutationError, Renderer, RosterSession};
pub use storage::{LocalStore, StorageError, StoreKey};
pub use sync::{
    merge, HttpRemoteStore, MergeOutcome, MergePolicy, RemoteStore, SyncEngine, SyncError,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
