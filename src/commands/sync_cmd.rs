//! Sync CLI commands for synchronizing with the remote roster.

use clap::{Args, Subcommand};

use crate::config::Config;
use crate::view::render_class;
use crate::Session;
use roster_core::{MergeOutcome, MutationError, SyncError};

/// Sync with the remote roster
#[derive(Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    command: Option<SyncSubcommand>,
}

#[derive(Subcommand)]
enum SyncSubcommand {
    /// Show sync configuration and remote status
    Status,
}

impl SyncCommand {
    pub async fn run(&self, session: &mut Session, config: &Config) -> Result<(), SyncCommandError> {
        match &self.command {
            None => self.sync(session, config).await,
            Some(SyncSubcommand::Status) => self.status(session, config).await,
        }
    }

    async fn sync(&self, session: &mut Session, config: &Config) -> Result<(), SyncCommandError> {
        let remote = session
            .engine()
            .remote()
            .ok_or(SyncCommandError::NotConfigured)?;

        println!("Syncing with {}...", remote.url());
        println!();

        let pulled = remote.fetch().await;
        let pulled = match pulled {
            Ok(doc) => Ok(session.apply_remote(Some(doc))?),
            Err(e) => Err(e),
        };
        println!("  {}", pull_report(&pulled));

        // The push is awaited here so its result can be reported
        if let Some(remote) = session.engine().remote() {
            remote.send(session.document()).await?;
            println!("  ✓ pushed");
        }

        println!();
        println!("Sync complete.");
        println!();
        print!(
            "{}",
            render_class(
                session.document(),
                session.current_class(),
                config.mode.value
            )
        );

        Ok(())
    }

    async fn status(&self, session: &Session, config: &Config) -> Result<(), SyncCommandError> {
        println!("Sync Configuration");
        println!("==================");
        println!();

        let Some(remote) = session.engine().remote() else {
            println!("Status: Not configured");
            println!();
            println!("To enable sync, add to your config file:");
            println!();
            println!("  sync:");
            println!("    remote_url: \"http://localhost:8080/\"");
            println!("    auto_sync: true");
            println!();
            println!("Or set the environment variable:");
            println!("  ROSTER_REMOTE_URL");
            return Ok(());
        };

        println!("Remote:       {}", remote.url());
        println!(
            "Auto-sync:    {}",
            if config.sync.auto_sync {
                "enabled"
            } else {
                "disabled"
            }
        );
        println!("Merge policy: {}", session.engine().policy());
        println!("Timeout:      {}s", config.sync.timeout_secs);
        println!();

        print!("Remote status: ");
        match remote.fetch().await {
            Ok(doc) => println!("✓ reachable ({} classes)", doc.class_count()),
            Err(SyncError::NetworkUnavailable(e)) => println!("✗ unreachable ({})", e),
            Err(e) => println!("✗ error: {}", e),
        }

        Ok(())
    }
}

/// One status line for the pull half of a sync.
fn pull_report(pulled: &Result<MergeOutcome, SyncError>) -> String {
    match pulled {
        Ok(MergeOutcome::Unchanged) => "✓ local roster is current".to_string(),
        Ok(MergeOutcome::Replaced) => "✓ replaced with remote roster".to_string(),
        Ok(MergeOutcome::Merged) => "✓ merged remote classes".to_string(),
        Err(e) => format!("✗ pull failed, keeping local roster: {}", e),
    }
}

/// Errors from sync commands
#[derive(Debug)]
pub enum SyncCommandError {
    NotConfigured,
    SyncError(SyncError),
    MutationError(MutationError),
}

impl std::fmt::Display for SyncCommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncCommandError::NotConfigured => write!(
                f,
                "Sync is not configured. Set sync.remote_url or ROSTER_REMOTE_URL"
            ),
            SyncCommandError::SyncError(e) => write!(f, "{}", e),
            SyncCommandError::MutationError(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SyncCommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncCommandError::NotConfigured => None,
            SyncCommandError::SyncError(e) => Some(e),
            SyncCommandError::MutationError(e) => Some(e),
        }
    }
}

impl From<SyncError> for SyncCommandError {
    fn from(e: SyncError) -> Self {
        SyncCommandError::SyncError(e)
    }
}

impl From<MutationError> for SyncCommandError {
    fn from(e: MutationError) -> Self {
        SyncCommandError::MutationError(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pull_report_failure_does_not_claim_success() {
        let report = pull_report(&Err(SyncError::NetworkUnavailable(
            "connection refused".to_string(),
        )));
        assert!(report.starts_with("✗ pull failed"));
        assert!(report.contains("connection refused"));
        assert!(!report.contains("✓"));
    }

    #[test]
    fn test_pull_report_outcomes() {
        assert_eq!(
            pull_report(&Ok(MergeOutcome::Unchanged)),
            "✓ local roster is current"
        );
        assert!(pull_report(&Ok(MergeOutcome::Replaced)).contains("replaced"));
        assert!(pull_report(&Ok(MergeOutcome::Merged)).contains("merged"));
    }

    #[test]
    fn test_not_configured_message_names_settings() {
        let message = SyncCommandError::NotConfigured.to_string();
        assert!(message.contains("sync.remote_url"));
        assert!(message.contains("ROSTER_REMOTE_URL"));
    }
}
