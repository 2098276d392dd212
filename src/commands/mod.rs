use clap::ValueEnum;

use crate::Session;

mod class;
mod config_cmd;
mod day;
mod show;
mod student;
mod sync_cmd;

pub use class::ClassCommand;
pub use config_cmd::ConfigCommand;
pub use day::DayCommand;
pub use show::ShowCommand;
pub use student::{AdjustCommand, StudentCommand, WarnCommand};
pub use sync_cmd::SyncCommand;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Fails when the class the command targets does not exist.
fn require_class(session: &Session, class: &str) -> Result<(), Box<dyn std::error::Error>> {
    if session.document().has_class(class) {
        Ok(())
    } else {
        Err(format!("Class not found: {}", class).into())
    }
}

/// Prints the outcome of a mutation followed by the refreshed class view.
fn report(session: &Session, applied: bool, message: impl std::fmt::Display) {
    if !applied {
        println!("Nothing changed.");
        return;
    }

    println!("{}", message);
    if let Some(frame) = session.renderer().last_frame() {
        println!();
        print!("{}", frame);
    }
}
