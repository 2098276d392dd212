use super::{report, require_class};
use crate::Session;

/// Whole-class bookkeeping operations
#[derive(Clone, Copy)]
pub enum DayCommand {
    EndDay,
    ResetWeek,
    ResetDots,
}

impl DayCommand {
    pub fn run(self, session: &mut Session, class: &str) -> Result<(), Box<dyn std::error::Error>> {
        require_class(session, class)?;

        let (applied, message) = match self {
            DayCommand::EndDay => (session.end_day(class)?, "Day ended"),
            DayCommand::ResetWeek => (session.reset_week(class)?, "Week reset"),
            DayCommand::ResetDots => (session.reset_dots(class)?, "Dots reset"),
        };
        report(session, applied, format!("{} for {}", message, class));
        Ok(())
    }
}
