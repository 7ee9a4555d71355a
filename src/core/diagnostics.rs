/*!
 * Diagnostics aggregation
 *
 * Reduces the state of every tracked detector into one status record per
 * tick. Severity is decided in a fixed order: a single unresponsive detector
 * makes the whole record ERROR, otherwise a slow combined processing time
 * makes it WARN.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::registry::{HandleRegistry, HandleView, RegistryMode};

/// Default combined processing time above which a record is WARN
pub const SLOW_PROCESSING_THRESHOLD: Duration = Duration::from_millis(1000);

/// Name reported in the "Package name" field
pub const COMPONENT_NAME: &str = env!("CARGO_PKG_NAME");

/// Status name carried by every record
pub const STATUS_NAME: &str = "Social perception: Body analysis: Skeleton extraction";

pub const HARDWARE_ID: &str = "none";

pub const MSG_NOT_RESPONDING: &str = "detection process not responding";
pub const MSG_SLOW: &str = "detection processing is slow";

// Field keys, in the order they appear in a record
pub const FIELD_PACKAGE: &str = "Package name";
pub const FIELD_SINGLE_BODY: &str = "Single body mode";
pub const FIELD_DETECTED: &str = "Currently detected bodies";
pub const FIELD_LAST_ID: &str = "Last detected body ID";
pub const FIELD_PROCESSING_TIME: &str = "Detection processing time";

/// Severity of a diagnostic record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Ok,
    Warn,
    Error,
}

impl Severity {
    /// Numeric level as used on diagnostic buses (0 = OK, 1 = WARN, 2 = ERROR)
    pub fn level(&self) -> u8 {
        match self {
            Severity::Ok => 0,
            Severity::Warn => 1,
            Severity::Error => 2,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Ok => write!(f, "OK"),
            Severity::Warn => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// One health report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub name: String,
    pub hardware_id: String,
    pub message: String,
    /// Ordered key/value pairs
    pub fields: Vec<(String, String)>,
}

impl DiagnosticRecord {
    /// Value of the first field named `key`
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Aggregate state of the registry at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthSummary {
    /// Number of tracked bodies
    pub tracked: usize,

    /// Number of bodies currently seen by their detector
    pub detected: usize,

    /// Number of detectors that stopped responding
    pub timed_out: usize,

    /// Sum of the latest processing time of every detector
    pub total_processing: Duration,

    /// Most recently inserted body
    pub last_body_id: Option<String>,
}

impl HealthSummary {
    pub fn from_views(views: &[HandleView], last_body_id: Option<&str>) -> Self {
        Self {
            tracked: views.len(),
            detected: views.iter().filter(|v| v.is_detected).count(),
            timed_out: views.iter().filter(|v| v.timed_out).count(),
            total_processing: views.iter().map(|v| v.processing_time).sum(),
            last_body_id: last_body_id.map(str::to_string),
        }
    }

    pub fn any_timeout(&self) -> bool {
        self.timed_out > 0
    }

    pub fn total_processing_ms(&self) -> f64 {
        self.total_processing.as_secs_f64() * 1000.0
    }

    /// Format a human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "Bodies: {} tracked | {} detected | {} not responding | processing {:.2}ms | last: {}",
            self.tracked,
            self.detected,
            self.timed_out,
            self.total_processing_ms(),
            self.last_body_id.as_deref().unwrap_or("-")
        )
    }
}

/// Turns registry scans into diagnostic records
#[derive(Debug, Clone)]
pub struct DiagnosticsAggregator {
    mode: RegistryMode,
    slow_threshold: Duration,
    last_severity: Option<Severity>,
    ticks: u64,
}

impl DiagnosticsAggregator {
    pub fn new(mode: RegistryMode, slow_threshold: Duration) -> Self {
        Self {
            mode,
            slow_threshold,
            last_severity: None,
            ticks: 0,
        }
    }

    /// Number of records produced so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Severity and message for a summary; first matching rule wins
    pub fn classify(&self, summary: &HealthSummary) -> (Severity, &'static str) {
        if summary.any_timeout() {
            (Severity::Error, MSG_NOT_RESPONDING)
        } else if summary.total_processing > self.slow_threshold {
            (Severity::Warn, MSG_SLOW)
        } else {
            (Severity::Ok, "")
        }
    }

    /// Build the record for a summary
    pub fn build_record(&self, summary: &HealthSummary) -> DiagnosticRecord {
        let (severity, message) = self.classify(summary);

        let single_body = if self.mode.is_single() { "True" } else { "False" };
        let fields = vec![
            (FIELD_PACKAGE.to_string(), COMPONENT_NAME.to_string()),
            (FIELD_SINGLE_BODY.to_string(), single_body.to_string()),
            (FIELD_DETECTED.to_string(), summary.detected.to_string()),
            (
                FIELD_LAST_ID.to_string(),
                summary.last_body_id.clone().unwrap_or_default(),
            ),
            (
                FIELD_PROCESSING_TIME.to_string(),
                format!("{:.2}ms", summary.total_processing_ms()),
            ),
        ];

        DiagnosticRecord {
            timestamp: Utc::now(),
            severity,
            name: STATUS_NAME.to_string(),
            hardware_id: HARDWARE_ID.to_string(),
            message: message.to_string(),
            fields,
        }
    }

    /// Scan the registry and produce this tick's record
    pub fn scan(&mut self, registry: &HandleRegistry) -> DiagnosticRecord {
        let views = registry.snapshot();
        let summary = HealthSummary::from_views(&views, registry.last_inserted());
        debug!("📊 {}", summary.summary());

        let record = self.build_record(&summary);
        self.note_severity(&record);
        self.ticks += 1;
        record
    }

    /// Log severity changes once instead of on every tick
    fn note_severity(&mut self, record: &DiagnosticRecord) {
        if self.last_severity == Some(record.severity) {
            return;
        }

        match record.severity {
            Severity::Error => error!("🚨 Diagnostics ERROR: {}", record.message),
            Severity::Warn => warn!("⚠️  Diagnostics WARN: {}", record.message),
            Severity::Ok if self.last_severity.is_some() => {
                info!("💚 Diagnostics back to OK")
            }
            Severity::Ok => {}
        }

        self.last_severity = Some(record.severity);
    }
}
