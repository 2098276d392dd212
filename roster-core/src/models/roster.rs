use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::student::StudentRecord;

/// Reserved top-level key carrying the last-write timestamp.
pub const UPDATED_AT_KEY: &str = "updatedAt";

/// Class created on first launch.
pub const DEFAULT_CLASS_NAME: &str = "8th Grade";

/// The whole synchronized state: every class and its students.
///
/// On the wire this is a single JSON object whose keys are class names,
/// plus the reserved numeric `updatedAt` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterDocument {
    #[serde(
        rename = "updatedAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<i64>,
    #[serde(flatten)]
    classes: BTreeMap<String, Vec<StudentRecord>>,
}

impl Default for RosterDocument {
    fn default() -> Self {
        let mut doc = Self::empty();
        doc.classes
            .insert(DEFAULT_CLASS_NAME.to_string(), Vec::new());
        doc
    }
}

impl RosterDocument {
    /// A document with no classes and no timestamp.
    pub fn empty() -> Self {
        Self {
            updated_at: None,
            classes: BTreeMap::new(),
        }
    }

    /// Parses a document from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Class names in display order. Never includes the timestamp key.
    pub fn class_names(&self) -> Vec<String> {
        self.classes.keys().cloned().collect()
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// First class in display order.
    pub fn first_class(&self) -> Option<&str> {
        self.classes.keys().next().map(String::as_str)
    }

    /// Students of a class in storage order.
    pub fn students(&self, class_name: &str) -> Option<&[StudentRecord]> {
        self.classes.get(class_name).map(Vec::as_slice)
    }

    pub fn students_mut(&mut self, class_name: &str) -> Option<&mut Vec<StudentRecord>> {
        self.classes.get_mut(class_name)
    }

    /// Students of a class sorted for display (case-insensitive by name).
    ///
    /// Returns an empty list when the class does not exist.
    pub fn students_for_class(&self, class_name: &str) -> Vec<StudentRecord> {
        let mut students = self
            .students(class_name)
            .map(<[StudentRecord]>::to_vec)
            .unwrap_or_default();
        students.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
        });
        students
    }

    pub fn find_student(&self, class_name: &str, name: &str) -> Option<&StudentRecord> {
        self.students(class_name)?.iter().find(|s| s.name == name)
    }

    pub fn find_student_mut(&mut self, class_name: &str, name: &str) -> Option<&mut StudentRecord> {
        self.students_mut(class_name)?
            .iter_mut()
            .find(|s| s.name == name)
    }

    /// True iff no student in the class has `candidate` as a name,
    /// ignoring case. A missing class has no conflicting names.
    pub fn validate_name(&self, class_name: &str, candidate: &str) -> bool {
        self.students(class_name)
            .map(|students| !students.iter().any(|s| s.name_matches(candidate)))
            .unwrap_or(true)
    }

    /// Adds an empty class. Returns false if the name is taken.
    pub fn insert_class(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.classes.contains_key(&name) {
            return false;
        }
        self.classes.insert(name, Vec::new());
        true
    }

    pub fn remove_class(&mut self, name: &str) -> Option<Vec<StudentRecord>> {
        self.classes.remove(name)
    }

    /// Overlays every class of `other` onto this document; `other` wins
    /// per class on collision.
    pub fn overlay(&mut self, other: RosterDocument) {
        if other.updated_at.is_some() {
            self.updated_at = other.updated_at;
        }
        self.classes.extend(other.classes);
    }
}

/// True iff `candidate` is free in the class, ignoring case.
pub fn validate_name(doc: &RosterDocument, class_name: &str, candidate: &str) -> bool {
    doc.validate_name(class_name, candidate)
}

/// The first-launch document: one class, no students.
pub fn default_document() -> RosterDocument {
    RosterDocument::default()
}

/// Every class name, sorted, without the timestamp key.
pub fn class_names(doc: &RosterDocument) -> Vec<String> {
    doc.class_names()
}
