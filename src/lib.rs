/*!
 * bodytrack - per-body detector registry with health diagnostics
 *
 * Keeps one detector unit per tracked body:
 * - Reconciles detector units against an external list of live body ids
 * - Single-body mode with a generated id when no id source exists
 * - Periodic OK/WARN/ERROR diagnostics from detector latency and timeouts
 * - Pluggable detector backends and diagnostic sinks
 */

pub mod config;
pub mod core;
pub mod error;
pub mod feed;
pub mod logging;
pub mod simulator;
pub mod telemetry;
pub mod tracker;

// Re-export commonly used types
pub use config::{DiagnosticsOutput, LogLevel, TrackerConfig};
pub use crate::core::{
    DetectorFactory, DetectorSpec, DetectorUnit, DiagnosticRecord, HandleRegistry, HandleView,
    IdAllocator, RegistryMode, Severity,
};
pub use error::{Result, TrackerError};
pub use feed::LiveIdFeed;
pub use telemetry::{ChannelSink, DiagnosticSink, JsonLinesSink, LogSink};
pub use tracker::Tracker;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
