use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use roster_core::{MergePolicy, TrackingMode};

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Remote document URL (e.g., "https://example.com/roster")
    pub remote_url: Option<String>,
    /// Pull on startup and push after writes (default: true)
    pub auto_sync: bool,
    /// How pulled documents are merged into the local one
    pub merge_policy: MergePolicy,
    /// Per-request timeout, also the longest wait for pending pushes on exit
    pub timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote_url: None,
            auto_sync: true,
            merge_policy: MergePolicy::default(),
            timeout_secs: 10,
        }
    }
}

impl SyncConfig {
    /// Returns true if a remote URL is set
    pub fn is_configured(&self) -> bool {
        self.remote_url.is_some()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Directory holding the local roster
    pub data_dir: ConfigValue<PathBuf>,
    /// Which counters are tracked
    pub mode: ConfigValue<TrackingMode>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    /// Sync configuration
    pub sync: SyncConfig,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    mode: Option<TrackingMode>,
    sync: Option<SyncConfig>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut data_dir = ConfigValue::new(Self::default_data_dir(), ConfigSource::Default);
        let mut mode = ConfigValue::new(TrackingMode::default(), ConfigSource::Default);
        let mut config_file = None;
        let mut sync = SyncConfig::default();

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(dir) = file_config.data_dir {
                // Resolve relative paths against config file's directory
                let resolved = if dir.is_relative() {
                    path.parent().map(|p| p.join(&dir)).unwrap_or(dir)
                } else {
                    dir
                };
                data_dir = ConfigValue::new(resolved, ConfigSource::File);
            }
            if let Some(file_mode) = file_config.mode {
                mode = ConfigValue::new(file_mode, ConfigSource::File);
            }
            if let Some(sync_config) = file_config.sync {
                sync = sync_config;
            }
        }

        // Apply environment variable overrides
        if let Ok(dir) = std::env::var("ROSTER_DATA_DIR") {
            data_dir = ConfigValue::new(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Ok(env_mode) = std::env::var("ROSTER_MODE") {
            let parsed = env_mode.parse().map_err(ConfigError::InvalidValue)?;
            mode = ConfigValue::new(parsed, ConfigSource::Environment);
        }
        if let Ok(url) = std::env::var("ROSTER_REMOTE_URL") {
            sync.remote_url = Some(url);
        }

        Ok(Self {
            data_dir,
            mode,
            config_file,
            sync,
        })
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/roster/
    /// - macOS: ~/Library/Application Support/roster/
    /// - Windows: %APPDATA%/roster/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("roster")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/roster/
    /// - macOS: ~/Library/Application Support/roster/
    /// - Windows: %APPDATA%/roster/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("roster")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidValue(e) => write!(f, "Invalid configuration: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nonexistent.yaml");

        let config = Config::load(Some(config_path)).unwrap();
        assert!(config.data_dir.value.ends_with("roster"));
        assert_eq!(config.data_dir.source, ConfigSource::Default);
        assert_eq!(config.mode.value, TrackingMode::Dots);
        assert_eq!(config.mode.source, ConfigSource::Default);
        assert!(config.config_file.is_none());
        assert!(config.sync.auto_sync);
        assert_eq!(config.sync.merge_policy, MergePolicy::ReplaceIfNewer);
        assert_eq!(config.sync.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "data_dir: /custom/roster").unwrap();
        writeln!(file, "mode: behavior").unwrap();
        writeln!(file, "sync:").unwrap();
        writeln!(file, "  remote_url: https://example.com/roster").unwrap();
        writeln!(file, "  merge_policy: shallow_merge").unwrap();
        writeln!(file, "  timeout_secs: 3").unwrap();

        let config = Config::load(Some(config_path.clone())).unwrap();
        assert_eq!(config.data_dir.value, PathBuf::from("/custom/roster"));
        assert_eq!(config.data_dir.source, ConfigSource::File);
        assert_eq!(config.mode.value, TrackingMode::Behavior);
        assert_eq!(config.mode.source, ConfigSource::File);
        assert_eq!(config.config_file, Some(config_path));
        assert_eq!(
            config.sync.remote_url.as_deref(),
            Some("https://example.com/roster")
        );
        assert!(config.sync.is_configured());
        assert!(config.sync.auto_sync);
        assert_eq!(config.sync.merge_policy, MergePolicy::ShallowMerge);
        assert_eq!(config.sync.timeout_secs, 3);
    }

    #[test]
    fn test_relative_data_dir_resolved_against_config_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "data_dir: data").unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.data_dir.value, temp_dir.path().join("data"));
    }

    #[test]
    #[ignore] // Run with --ignored; env vars can pollute parallel tests
    fn test_env_var_overrides_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "mode: dots").unwrap();

        // Set env var
        std::env::set_var("ROSTER_MODE", "behavior");

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.mode.value, TrackingMode::Behavior);
        assert_eq!(config.mode.source, ConfigSource::Environment);

        // Clean up
        std::env::remove_var("ROSTER_MODE");
    }

    #[test]
    fn test_invalid_yaml_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "invalid: yaml: content: [").unwrap();

        let result = Config::load(Some(config_path));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_invalid_merge_policy_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "sync:").unwrap();
        writeln!(file, "  merge_policy: spread").unwrap();

        assert!(Config::load(Some(config_path)).is_err());
    }

    #[test]
    fn test_partial_sync_block_keeps_defaults() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "sync:").unwrap();
        writeln!(file, "  auto_sync: false").unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        assert!(!config.sync.auto_sync);
        assert!(!config.sync.is_configured());
        assert_eq!(config.sync.timeout_secs, 10);
        assert_eq!(config.data_dir.source, ConfigSource::Default);
    }
}
