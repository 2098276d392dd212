//! The editing session: owns the roster and applies user edits.
//!
//! Every successful edit follows the same order:
//! 1. change the in-memory document
//! 2. stamp `updatedAt` and save locally
//! 3. re-render
//! 4. push to the remote in the background
//!
//! Local saving and rendering never wait on the network, and a failed push
//! never rolls anything back.

use std::time::Duration;

use thiserror::Error;

use crate::models::{CounterField, FlagField, RosterDocument, StudentRecord, UPDATED_AT_KEY};
use crate::storage::{LocalStore, StorageError};
use crate::sync::{MergeOutcome, RemoteStore, SyncEngine};

/// Receives the roster whenever it changes.
pub trait Renderer {
    fn render(&mut self, doc: &RosterDocument, current_class: &str);
}

/// A renderer that draws nothing.
impl Renderer for () {
    fn render(&mut self, _doc: &RosterDocument, _current_class: &str) {}
}

/// Edits the caller must be told about. Everything else is a silent no-op.
#[derive(Error, Debug)]
pub enum MutationError {
    #[error("A student named '{name}' already exists in {class_name}")]
    DuplicateNameRejected { class_name: String, name: String },

    #[error("Cannot delete '{0}': you must have at least one class")]
    InvariantViolation(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// One active editor of the roster.
pub struct RosterSession<R, V> {
    doc: RosterDocument,
    current_class: String,
    store: LocalStore,
    engine: SyncEngine<R>,
    renderer: V,
}

impl<R: RemoteStore, V: Renderer> RosterSession<R, V> {
    /// Loads the local roster and picks the current class: the last selected
    /// one if it still exists, otherwise the first.
    pub fn new(store: LocalStore, engine: SyncEngine<R>, renderer: V) -> Self {
        let doc = store.load();
        let current_class = store
            .load_last_selected_class()
            .filter(|name| doc.has_class(name))
            .or_else(|| doc.first_class().map(str::to_string))
            .unwrap_or_default();

        Self {
            doc,
            current_class,
            store,
            engine,
            renderer,
        }
    }

    /// Renders the local roster, then pulls and merges the remote one.
    pub async fn start(&mut self) -> Result<MergeOutcome, MutationError> {
        self.render();
        self.pull_and_merge().await
    }

    pub fn document(&self) -> &RosterDocument {
        &self.doc
    }

    pub fn current_class(&self) -> &str {
        &self.current_class
    }

    pub fn class_names(&self) -> Vec<String> {
        self.doc.class_names()
    }

    pub fn students_for_class(&self, class_name: &str) -> Vec<StudentRecord> {
        self.doc.students_for_class(class_name)
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn engine(&self) -> &SyncEngine<R> {
        &self.engine
    }

    pub fn renderer(&self) -> &V {
        &self.renderer
    }

    /// Pulls the remote roster and merges it into the current one.
    pub async fn pull_and_merge(&mut self) -> Result<MergeOutcome, MutationError> {
        let remote = self.engine.pull().await;
        self.apply_remote(remote)
    }

    /// Merges a pulled document into the roster as it is now.
    ///
    /// The pull may have been issued before later local edits; the merge
    /// policy decides against the current document, so a stale response
    /// loses to newer local writes.
    pub fn apply_remote(
        &mut self,
        remote: Option<RosterDocument>,
    ) -> Result<MergeOutcome, MutationError> {
        let Some(remote) = remote else {
            return Ok(MergeOutcome::Unchanged);
        };

        let outcome = self.engine.merge(&mut self.doc, remote);
        if outcome.changed() {
            tracing::info!("Merged remote roster ({:?})", outcome);
            if !self.doc.has_class(&self.current_class) {
                self.select_first_class()?;
            }
            self.store.save(&self.doc)?;
            self.render();
        }
        Ok(outcome)
    }

    /// Pulls, merges, and pushes the result back.
    pub async fn sync(&mut self) -> Result<MergeOutcome, MutationError> {
        let outcome = self.pull_and_merge().await?;
        self.engine.push(&self.doc);
        Ok(outcome)
    }

    /// Waits for background pushes. Returns how many were abandoned.
    pub async fn flush(&mut self, timeout: Duration) -> usize {
        self.engine.flush(timeout).await
    }

    /// Makes an existing class current.
    pub fn select_class(&mut self, name: &str) -> Result<bool, MutationError> {
        if !self.doc.has_class(name) {
            return Ok(false);
        }
        self.current_class = name.to_string();
        self.store.save_last_selected_class(name)?;
        self.render();
        Ok(true)
    }

    /// Adds a class and selects it. Pulls first so the new class is added
    /// to the freshest roster.
    pub async fn create_class(&mut self, name: &str) -> Result<bool, MutationError> {
        let name = name.trim();
        if name.is_empty() || name == UPDATED_AT_KEY {
            return Ok(false);
        }

        self.pull_and_merge().await?;

        if !self.doc.insert_class(name) {
            return Ok(false);
        }
        self.current_class = name.to_string();
        self.store.save_last_selected_class(name)?;
        self.commit()?;
        Ok(true)
    }

    /// Deletes a class, refusing to delete the last one.
    pub fn delete_class(&mut self, name: &str) -> Result<bool, MutationError> {
        if !self.doc.has_class(name) {
            return Ok(false);
        }
        if self.doc.class_count() <= 1 {
            return Err(MutationError::InvariantViolation(name.to_string()));
        }

        self.doc.remove_class(name);
        if self.current_class == name {
            self.select_first_class()?;
        }
        self.commit()?;
        Ok(true)
    }

    pub fn add_student(&mut self, class_name: &str, name: &str) -> Result<bool, MutationError> {
        let name = name.trim();
        if name.is_empty() || !self.doc.has_class(class_name) {
            return Ok(false);
        }
        if !self.doc.validate_name(class_name, name) {
            return Err(MutationError::DuplicateNameRejected {
                class_name: class_name.to_string(),
                name: name.to_string(),
            });
        }

        if let Some(students) = self.doc.students_mut(class_name) {
            students.push(StudentRecord::new(name));
        }
        self.commit()?;
        Ok(true)
    }

    pub fn remove_student(&mut self, class_name: &str, name: &str) -> Result<bool, MutationError> {
        let Some(students) = self.doc.students_mut(class_name) else {
            return Ok(false);
        };
        let before = students.len();
        students.retain(|s| s.name != name);
        if students.len() == before {
            return Ok(false);
        }
        self.commit()?;
        Ok(true)
    }

    /// Adds `delta` to a counter, clamping at zero.
    pub fn adjust_counter(
        &mut self,
        class_name: &str,
        name: &str,
        field: CounterField,
        delta: i64,
    ) -> Result<bool, MutationError> {
        let Some(student) = self.doc.find_student_mut(class_name, name) else {
            return Ok(false);
        };
        let before = student.counter(field);
        student.adjust(field, delta);
        if student.counter(field) == before {
            return Ok(false);
        }
        self.commit()?;
        Ok(true)
    }

    pub fn toggle_flag(
        &mut self,
        class_name: &str,
        name: &str,
        flag: FlagField,
    ) -> Result<bool, MutationError> {
        let Some(student) = self.doc.find_student_mut(class_name, name) else {
            return Ok(false);
        };
        student.toggle(flag);
        self.commit()?;
        Ok(true)
    }

    /// Folds today's marks into the weekly totals for every student.
    pub fn end_day(&mut self, class_name: &str) -> Result<bool, MutationError> {
        self.update_class(class_name, StudentRecord::end_day)
    }

    /// Clears the weekly totals; today's marks are left alone.
    pub fn reset_week(&mut self, class_name: &str) -> Result<bool, MutationError> {
        self.update_class(class_name, StudentRecord::reset_week)
    }

    /// Clears every student's dots.
    pub fn reset_dots(&mut self, class_name: &str) -> Result<bool, MutationError> {
        self.update_class(class_name, |s| s.dots = 0)
    }

    fn update_class(
        &mut self,
        class_name: &str,
        update: impl FnMut(&mut StudentRecord),
    ) -> Result<bool, MutationError> {
        let Some(students) = self.doc.students_mut(class_name) else {
            return Ok(false);
        };
        if students.is_empty() {
            return Ok(false);
        }
        students.iter_mut().for_each(update);
        self.commit()?;
        Ok(true)
    }

    fn select_first_class(&mut self) -> Result<(), StorageError> {
        self.current_class = self.doc.first_class().unwrap_or_default().to_string();
        self.store.save_last_selected_class(&self.current_class)
    }

    /// Stamps, saves, renders, then pushes.
    fn commit(&mut self) -> Result<(), MutationError> {
        self.engine.stamp(&mut self.doc);
        if let Err(e) = self.store.save(&self.doc) {
            tracing::error!("Failed to save roster: {}", e);
            return Err(e.into());
        }
        self.render();
        self.engine.push(&self.doc);
        Ok(())
    }

    fn render(&mut self) {
        self.renderer.render(&self.doc, &self.current_class);
    }
}
