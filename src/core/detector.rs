/*!
 * Detector unit abstraction
 *
 * A detector unit is the per-body worker that extracts a skeleton from the
 * body's frames. The registry only creates, queries and releases units; how a
 * unit processes frames is up to the implementation behind these traits.
 */

use std::time::Duration;

use crate::error::Result;

/// Parameters handed to the factory for one body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectorSpec {
    /// Body the unit is responsible for
    pub body_id: String,

    /// Use depth frames in addition to color frames
    pub use_depth: bool,

    /// Enable the unit's debug output
    pub debug: bool,

    /// The unit is the only one in the process and reads the shared image
    /// source instead of a per-body crop
    pub single_body: bool,
}

impl DetectorSpec {
    pub fn new(body_id: impl Into<String>) -> Self {
        Self {
            body_id: body_id.into(),
            use_depth: false,
            debug: false,
            single_body: false,
        }
    }

    /// Same settings for another body
    pub fn for_body(&self, body_id: impl Into<String>) -> Self {
        Self {
            body_id: body_id.into(),
            ..self.clone()
        }
    }
}

/// Handle to a running per-body detector.
///
/// Implementations own whatever the unit allocates (frame subscriptions,
/// model sessions) and give it back in `release`.
pub trait DetectorUnit: Send + Sync {
    /// Name of the frame source this unit consumes
    fn frame_topic(&self) -> String;

    /// Time spent processing the most recent frame
    fn processing_time(&self) -> Duration;

    /// Whether the unit stopped producing results
    fn check_timeout(&self) -> bool;

    /// Whether the unit currently sees its body
    fn is_detected(&self) -> bool;

    /// Release the unit's resources. Must be idempotent.
    fn release(&mut self) -> Result<()>;
}

/// Creates detector units on demand
pub trait DetectorFactory: Send + Sync {
    fn create(&self, spec: &DetectorSpec) -> Result<Box<dyn DetectorUnit>>;
}

impl<F> DetectorFactory for F
where
    F: Fn(&DetectorSpec) -> Result<Box<dyn DetectorUnit>> + Send + Sync,
{
    fn create(&self, spec: &DetectorSpec) -> Result<Box<dyn DetectorUnit>> {
        self(spec)
    }
}
