use clap::{Args, Subcommand, ValueEnum};

use super::{report, require_class};
use crate::config::Config;
use crate::Session;
use roster_core::{CounterField, FlagField, TrackingMode};

#[derive(Args)]
pub struct StudentCommand {
    #[command(subcommand)]
    pub command: StudentSubcommand,
}

#[derive(Subcommand)]
pub enum StudentSubcommand {
    /// Add a student to the class
    Add {
        /// Student name
        name: String,
    },

    /// Remove a student from the class
    Rm {
        /// Student name (exact)
        name: String,
    },
}

impl StudentCommand {
    pub fn run(&self, session: &mut Session, class: &str) -> Result<(), Box<dyn std::error::Error>> {
        require_class(session, class)?;

        match &self.command {
            StudentSubcommand::Add { name } => {
                let applied = session.add_student(class, name)?;
                report(session, applied, format!("Added {} to {}", name.trim(), class));
            }
            StudentSubcommand::Rm { name } => {
                if session.document().find_student(class, name).is_none() {
                    return Err(format!("No student named '{}' in {}", name, class).into());
                }
                let applied = session.remove_student(class, name)?;
                report(session, applied, format!("Removed {} from {}", name, class));
            }
        }

        Ok(())
    }
}

/// Counter selected on the command line
#[derive(Clone, Copy, ValueEnum)]
pub enum CounterArg {
    Dots,
    Behavior,
    Instruction,
}

impl From<CounterArg> for CounterField {
    fn from(arg: CounterArg) -> Self {
        match arg {
            CounterArg::Dots => CounterField::Dots,
            CounterArg::Behavior => CounterField::BehaviorMarks,
            CounterArg::Instruction => CounterField::InstructionMarks,
        }
    }
}

#[derive(Args)]
pub struct AdjustCommand {
    /// Student name (exact)
    name: String,

    /// Amount to add, negative to subtract
    #[arg(allow_hyphen_values = true)]
    delta: i64,

    /// Counter to change (defaults to dots, or behavior marks in behavior mode)
    #[arg(long, value_enum)]
    counter: Option<CounterArg>,
}

impl AdjustCommand {
    pub fn run(
        &self,
        session: &mut Session,
        config: &Config,
        class: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        require_class(session, class)?;
        if session.document().find_student(class, &self.name).is_none() {
            return Err(format!("No student named '{}' in {}", self.name, class).into());
        }

        let field = match (self.counter, config.mode.value) {
            (Some(arg), _) => arg.into(),
            (None, TrackingMode::Dots) => CounterField::Dots,
            (None, TrackingMode::Behavior) => CounterField::BehaviorMarks,
        };

        let applied = session.adjust_counter(class, &self.name, field, self.delta)?;
        report(
            session,
            applied,
            format!("{} {:+} {}", self.name, self.delta, field),
        );
        Ok(())
    }
}

#[derive(Args)]
pub struct WarnCommand {
    /// Student name (exact)
    name: String,
}

impl WarnCommand {
    pub fn run(&self, session: &mut Session, class: &str) -> Result<(), Box<dyn std::error::Error>> {
        require_class(session, class)?;
        if session.document().find_student(class, &self.name).is_none() {
            return Err(format!("No student named '{}' in {}", self.name, class).into());
        }

        let applied = session.toggle_flag(class, &self.name, FlagField::Warn)?;
        let warned = session
            .document()
            .find_student(class, &self.name)
            .is_some_and(|s| s.warn);
        let message = if warned {
            format!("Warned {}", self.name)
        } else {
            format!("Cleared warning for {}", self.name)
        };
        report(session, applied, message);
        Ok(())
    }
}
