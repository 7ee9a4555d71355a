/*!
 * Core tracking logic: identifiers, the handle registry and diagnostics
 */

pub mod detector;
pub mod diagnostics;
pub mod identity;
pub mod registry;

pub use detector::{DetectorFactory, DetectorSpec, DetectorUnit};
pub use diagnostics::{DiagnosticRecord, DiagnosticsAggregator, HealthSummary, Severity};
pub use identity::IdAllocator;
pub use registry::{HandleRegistry, HandleView, ReconcileReport, RegistryMode};
