mod roster;
mod student;

pub use roster::{
    class_names, default_document, validate_name, RosterDocument, DEFAULT_CLASS_NAME,
    UPDATED_AT_KEY,
};
pub use student::{
    CounterField, FlagField, StudentRecord, TrackingMode, MARK_PENALTY, VERSES_PER_MARK,
};
