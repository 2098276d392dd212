use clap::{Args, Subcommand};

use super::{report, require_class, OutputFormat};
use crate::view::render_class_list;
use crate::Session;

#[derive(Args)]
pub struct ClassCommand {
    #[command(subcommand)]
    pub command: ClassSubcommand,
}

#[derive(Subcommand)]
pub enum ClassSubcommand {
    /// List all classes
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Create a class and make it current
    Add {
        /// Name of the class
        name: String,
    },

    /// Delete a class and all its students
    Rm {
        /// Name of the class
        name: String,
    },

    /// Make a class current
    Select {
        /// Name of the class
        name: String,
    },
}

impl ClassCommand {
    pub async fn run(&self, session: &mut Session) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ClassSubcommand::List { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&session.class_names())?);
                    }
                    OutputFormat::Text => {
                        print!(
                            "{}",
                            render_class_list(session.document(), session.current_class())
                        );
                    }
                }
                Ok(())
            }
            ClassSubcommand::Add { name } => {
                if session.document().has_class(name.trim()) {
                    return Err(format!("Class already exists: {}", name.trim()).into());
                }
                let applied = session.create_class(name).await?;
                report(session, applied, format!("Created class: {}", name.trim()));
                Ok(())
            }
            ClassSubcommand::Rm { name } => {
                require_class(session, name)?;
                let applied = session.delete_class(name)?;
                report(session, applied, format!("Deleted class: {}", name));
                Ok(())
            }
            ClassSubcommand::Select { name } => {
                require_class(session, name)?;
                let applied = session.select_class(name)?;
                report(session, applied, format!("Current class: {}", name));
                Ok(())
            }
        }
    }
}
