/*!
 * Error types for bodytrack
 */

use std::fmt;
use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrackerError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_PARTIAL: i32 = 1;
pub const EXIT_FATAL: i32 = 2;

#[derive(Error, Debug)]
pub enum TrackerError {
    /// The detector factory could not create a unit for a body
    #[error("Failed to create detector for body '{body_id}': {reason}")]
    Construction { body_id: String, reason: String },

    /// One or more bodies could not be tracked during a reconciliation pass.
    /// The failed ids stay out of the registry and are retried on the next
    /// live-id update.
    #[error("Reconciliation incomplete, {} body(ies) not tracked: {}", failed.len(), failed.join(", "))]
    Reconcile {
        failed: Vec<String>,
        #[source]
        source: Box<TrackerError>,
    },

    /// Releasing a detector unit failed (non-fatal)
    #[error("Failed to release detector for body '{body_id}': {reason}")]
    Teardown { body_id: String, reason: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TrackerError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        if self.is_fatal() {
            EXIT_FATAL
        } else {
            EXIT_PARTIAL
        }
    }

    /// Check if this error should stop the process.
    ///
    /// Only startup problems are fatal; everything the registry reports at
    /// runtime is surfaced and the tracker keeps going.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TrackerError::Config(_) | TrackerError::TomlDe(_) | TrackerError::TomlSer(_)
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            TrackerError::Construction { .. } | TrackerError::Reconcile { .. } => {
                ErrorCategory::Construction
            }
            TrackerError::Teardown { .. } => ErrorCategory::Teardown,
            TrackerError::Config(_) | TrackerError::TomlDe(_) | TrackerError::TomlSer(_) => {
                ErrorCategory::Configuration
            }
            TrackerError::Io(_) => ErrorCategory::IoError,
            TrackerError::Json(_) => ErrorCategory::Codec,
        }
    }
}

/// Error category for classification and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Detector units that could not be created
    Construction,
    /// Detector units that did not release cleanly
    Teardown,
    /// Configuration errors
    Configuration,
    /// I/O operation errors
    IoError,
    /// Serialization errors
    Codec,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Construction => write!(f, "construction"),
            ErrorCategory::Teardown => write!(f, "teardown"),
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::IoError => write!(f, "io"),
            ErrorCategory::Codec => write!(f, "codec"),
        }
    }
}
