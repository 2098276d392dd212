//! Local persistence for the roster document and the last selected class.
//!
//! Each value lives in its own JSON file under the data directory:
//! ```text
//! <DATA_DIR>/
//!   roster.json
//!   last_class.json
//! ```
//!
//! Writes go to a temporary sibling file that is renamed over the target, so
//! a reader never observes a half-written value.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::models::{default_document, RosterDocument};

/// Values kept in local storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKey {
    Roster,
    LastSelectedClass,
}

impl StoreKey {
    /// Returns the filename for this key.
    pub fn filename(&self) -> &'static str {
        match self {
            StoreKey::Roster => "roster.json",
            StoreKey::LastSelectedClass => "last_class.json",
        }
    }
}

/// Device-local storage for the roster.
#[derive(Debug, Clone)]
pub struct LocalStore {
    data_dir: PathBuf,
}

impl LocalStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Returns the full path for a key.
    pub fn path(&self, key: StoreKey) -> PathBuf {
        self.data_dir.join(key.filename())
    }

    pub fn exists(&self, key: StoreKey) -> bool {
        self.path(key).exists()
    }

    /// Loads the roster, falling back to the default document when nothing
    /// is stored or the stored value cannot be parsed.
    pub fn load(&self) -> RosterDocument {
        let path = self.path(StoreKey::Roster);
        match self.read(StoreKey::Roster) {
            Ok(Some(text)) => match RosterDocument::from_json(&text) {
                Ok(doc) if doc.class_count() > 0 => doc,
                Ok(_) => {
                    tracing::warn!("{} has no classes, using default roster", path.display());
                    default_document()
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}", path.display(), e);
                    default_document()
                }
            },
            Ok(None) => default_document(),
            Err(e) => {
                tracing::warn!("{}", e);
                default_document()
            }
        }
    }

    /// Saves the roster.
    pub fn save(&self, doc: &RosterDocument) -> Result<(), StorageError> {
        let path = self.path(StoreKey::Roster);
        let text = doc
            .to_json()
            .map_err(|e| StorageError::SerializeError(path, e))?;
        self.write(StoreKey::Roster, &text)
    }

    pub fn load_last_selected_class(&self) -> Option<String> {
        let text = match self.read(StoreKey::LastSelectedClass) {
            Ok(text) => text?,
            Err(e) => {
                tracing::warn!("{}", e);
                return None;
            }
        };
        match serde_json::from_str::<String>(&text) {
            Ok(name) => Some(name),
            Err(e) => {
                tracing::warn!(
                    "Failed to parse {}: {}",
                    self.path(StoreKey::LastSelectedClass).display(),
                    e
                );
                None
            }
        }
    }

    pub fn save_last_selected_class(&self, name: &str) -> Result<(), StorageError> {
        let path = self.path(StoreKey::LastSelectedClass);
        let text =
            serde_json::to_string(name).map_err(|e| StorageError::SerializeError(path, e))?;
        self.write(StoreKey::LastSelectedClass, &text)
    }

    /// Reads a raw value. Returns `Ok(None)` if the file doesn't exist.
    fn read(&self, key: StoreKey) -> Result<Option<String>, StorageError> {
        let path = self.path(key);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::IoError(path, e)),
        }
    }

    /// Writes a raw value, creating the data directory if needed.
    fn write(&self, key: StoreKey, contents: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.data_dir)
            .map_err(|e| StorageError::IoError(self.data_dir.clone(), e))?;

        let path = self.path(key);
        let tmp_path = path.with_extension("json.tmp");

        fs::write(&tmp_path, contents).map_err(|e| StorageError::IoError(tmp_path.clone(), e))?;
        fs::rename(&tmp_path, &path).map_err(|e| StorageError::IoError(path, e))?;

        Ok(())
    }
}

/// Errors that can occur while writing local storage.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error reading or writing a file.
    IoError(PathBuf, io::Error),
    /// The value could not be serialized.
    SerializeError(PathBuf, serde_json::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::IoError(path, e) => {
                write!(f, "I/O error for {}: {}", path.display(), e)
            }
            StorageError::SerializeError(path, e) => {
                write!(f, "Failed to serialize {}: {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::IoError(_, e) => Some(e),
            StorageError::SerializeError(_, e) => Some(e),
        }
    }
}
