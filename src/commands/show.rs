use clap::Args;

use super::{require_class, OutputFormat};
use crate::config::Config;
use crate::view::render_class;
use crate::Session;

#[derive(Args)]
pub struct ShowCommand {
    /// Show the whole roster document instead of one class
    #[arg(long)]
    all: bool,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
}

impl ShowCommand {
    pub fn run(
        &self,
        session: &Session,
        config: &Config,
        class: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let doc = session.document();

        match (&self.format, self.all) {
            (OutputFormat::Json, true) => {
                println!("{}", serde_json::to_string_pretty(doc)?);
            }
            (OutputFormat::Json, false) => {
                require_class(session, class)?;
                let students = session.students_for_class(class);
                println!("{}", serde_json::to_string_pretty(&students)?);
            }
            (OutputFormat::Text, true) => {
                for (i, name) in doc.class_names().iter().enumerate() {
                    if i > 0 {
                        println!();
                    }
                    print!("{}", render_class(doc, name, config.mode.value));
                }
            }
            (OutputFormat::Text, false) => {
                require_class(session, class)?;
                print!("{}", render_class(doc, class, config.mode.value));
            }
        }

        Ok(())
    }
}
