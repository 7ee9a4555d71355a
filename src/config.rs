/*!
 * Configuration types for bodytrack
 */

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, TrackerError};

/// Main configuration for the tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Track a single body with a generated id instead of following the
    /// live-id feed
    #[serde(default = "default_true")]
    pub single_body: bool,

    /// Ask detector units to use depth frames
    #[serde(default)]
    pub use_depth: bool,

    /// Run detector units in debug mode
    #[serde(default)]
    pub debug: bool,

    /// Period between two diagnostic records, in milliseconds
    #[serde(default = "default_diagnostic_period_ms")]
    pub diagnostic_period_ms: u64,

    /// Total processing time above which diagnostics report WARN, in milliseconds
    #[serde(default = "default_slow_processing_threshold_ms")]
    pub slow_processing_threshold_ms: u64,

    /// Frame source for the detector in single-body mode
    #[serde(default = "default_image_topic")]
    pub image_topic: String,

    /// Where diagnostic records go
    #[serde(default)]
    pub diagnostics_output: DiagnosticsOutput,

    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stderr)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            single_body: true,
            use_depth: false,
            debug: false,
            diagnostic_period_ms: default_diagnostic_period_ms(),
            slow_processing_threshold_ms: default_slow_processing_threshold_ms(),
            image_topic: default_image_topic(),
            diagnostics_output: DiagnosticsOutput::Log,
            log_level: LogLevel::Info,
            log_file: None,
            verbose: false,
        }
    }
}

/// Destination for diagnostic records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticsOutput {
    /// Emit records as tracing events
    #[default]
    Log,
    /// Write one JSON object per record to stdout
    Json,
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_diagnostic_period_ms() -> u64 {
    1000
}

fn default_slow_processing_threshold_ms() -> u64 {
    1000
}

fn default_image_topic() -> String {
    "/image".to_string()
}

impl TrackerConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: TrackerConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn diagnostic_period(&self) -> Duration {
        Duration::from_millis(self.diagnostic_period_ms)
    }

    pub fn slow_processing_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_processing_threshold_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.diagnostic_period_ms == 0 {
            return Err(TrackerError::Config(
                "diagnostic_period_ms must be greater than 0".to_string(),
            ));
        }

        if self.slow_processing_threshold_ms == 0 {
            return Err(TrackerError::Config(
                "slow_processing_threshold_ms must be greater than 0".to_string(),
            ));
        }

        if self.single_body && self.image_topic.trim().is_empty() {
            return Err(TrackerError::Config(
                "image_topic must be set in single-body mode".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = TrackerConfig::default();

        assert!(config.single_body);
        assert!(!config.use_depth);
        assert!(!config.debug);
        assert_eq!(config.diagnostic_period(), Duration::from_secs(1));
        assert_eq!(config.slow_processing_threshold(), Duration::from_millis(1000));
        assert_eq!(config.diagnostics_output, DiagnosticsOutput::Log);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: TrackerConfig = toml::from_str("").unwrap();
        assert_eq!(config, TrackerConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let toml_str = r#"
            single_body = false
            use_depth = true
            diagnostic_period_ms = 500
            diagnostics_output = "json"
            log_level = "debug"
        "#;

        let config: TrackerConfig = toml::from_str(toml_str).unwrap();
        assert!(!config.single_body);
        assert!(config.use_depth);
        assert_eq!(config.diagnostic_period(), Duration::from_millis(500));
        assert_eq!(config.diagnostics_output, DiagnosticsOutput::Json);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.slow_processing_threshold_ms, 1000);
    }

    #[test]
    fn test_file_round_trip() {
        let file = NamedTempFile::new().unwrap();
        let config = TrackerConfig {
            single_body: false,
            debug: true,
            ..Default::default()
        };

        config.to_file(file.path()).unwrap();
        let loaded = TrackerConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_validation_failures() {
        let mut config = TrackerConfig::default();

        config.diagnostic_period_ms = 0;
        assert!(config.validate().is_err());
        config.diagnostic_period_ms = 1000; // Reset

        config.slow_processing_threshold_ms = 0;
        assert!(config.validate().is_err());
        config.slow_processing_threshold_ms = 1000; // Reset

        config.image_topic = "  ".to_string();
        assert!(config.validate().is_err());

        // The image topic only matters for single-body mode
        config.single_body = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(LogLevel::Error.to_tracing_level(), tracing::Level::ERROR);
        assert_eq!(LogLevel::Warn.to_tracing_level(), tracing::Level::WARN);
        assert_eq!(LogLevel::Info.to_tracing_level(), tracing::Level::INFO);
        assert_eq!(LogLevel::Debug.to_tracing_level(), tracing::Level::DEBUG);
        assert_eq!(LogLevel::Trace.to_tracing_level(), tracing::Level::TRACE);
    }
}
