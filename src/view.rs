//! Terminal rendering of the current class.

use chrono::{Local, TimeZone};
use std::fmt::Write;

use roster_core::{Renderer, RosterDocument, StudentRecord, TrackingMode};

/// Keeps the most recent frame so the command prints it once at exit.
///
/// Renders `focus` when set, otherwise the session's current class.
#[derive(Debug, Default)]
pub struct TerminalView {
    mode: TrackingMode,
    focus: Option<String>,
    last_frame: Option<String>,
}

impl TerminalView {
    pub fn new(mode: TrackingMode, focus: Option<String>) -> Self {
        Self {
            mode,
            focus,
            last_frame: None,
        }
    }

    pub fn last_frame(&self) -> Option<&str> {
        self.last_frame.as_deref()
    }
}

impl Renderer for TerminalView {
    fn render(&mut self, doc: &RosterDocument, current_class: &str) {
        let class_name = self.focus.as_deref().unwrap_or(current_class);
        self.last_frame = Some(render_class(doc, class_name, self.mode));
    }
}

/// Formats one class as a table, students sorted by name.
pub fn render_class(doc: &RosterDocument, class_name: &str, mode: TrackingMode) -> String {
    let students = doc.students_for_class(class_name);
    let mut out = String::new();

    let _ = writeln!(out, "{} ({} students)", class_name, students.len());
    let _ = writeln!(out, "{}", "=".repeat(30));

    if students.is_empty() {
        let _ = writeln!(out, "No students yet.");
    }

    for student in &students {
        let _ = writeln!(out, "{}", student_line(student, mode));
    }

    if let Some(updated) = doc.updated_at.and_then(format_timestamp) {
        let _ = writeln!(out);
        let _ = writeln!(out, "Last updated: {}", updated);
    }

    out
}

fn student_line(student: &StudentRecord, mode: TrackingMode) -> String {
    match mode {
        TrackingMode::Dots => format!(
            "  {:<20} {:>3} dots  {:>4} verses",
            student.name,
            student.dots,
            student.verses_owed(mode)
        ),
        TrackingMode::Behavior => {
            let average = student
                .weekly_average()
                .map(|avg| format!("{:.1}", avg))
                .unwrap_or_else(|| "-".to_string());
            format!(
                "  {:<20} B:{:<3} I:{:<3} grade {:>3}  week avg {:>5}  {:>4} verses{}",
                student.name,
                student.behavior_marks,
                student.instruction_marks,
                student.daily_grade(),
                average,
                student.verses_owed(mode),
                if student.warn { "  [warn]" } else { "" }
            )
        }
    }
}

/// Lists every class, marking the current one.
pub fn render_class_list(doc: &RosterDocument, current_class: &str) -> String {
    let mut out = String::new();
    for name in doc.class_names() {
        let marker = if name == current_class { "*" } else { " " };
        let count = doc.students(&name).map(<[StudentRecord]>::len).unwrap_or(0);
        let _ = writeln!(out, "{} {} ({})", marker, name, count);
    }
    out
}

fn format_timestamp(millis: i64) -> Option<String> {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}
