/*!
 * Simulated detector backend
 *
 * Stands in for a real skeleton-extraction backend so the tracker can run
 * end to end. Units report a jittered processing time and a random detection
 * state; optionally they stop responding after a fixed delay.
 */

use rand::Rng;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::core::detector::{DetectorFactory, DetectorSpec, DetectorUnit};
use crate::error::Result;

/// Frame topic for a body in multi-body mode
pub fn body_frame_topic(body_id: &str) -> String {
    format!("/humans/bodies/{}/cropped", body_id)
}

#[derive(Debug, Clone)]
pub struct SimulatedFactory {
    /// Shared frame source used in single-body mode
    pub image_topic: String,

    /// Mean processing time per frame
    pub latency: Duration,

    /// Maximum deviation from `latency`
    pub jitter: Duration,

    /// Probability that a unit sees its body on a given query
    pub detect_probability: f64,

    /// Units stop responding after this long
    pub stall_after: Option<Duration>,
}

impl Default for SimulatedFactory {
    fn default() -> Self {
        Self {
            image_topic: "/image".to_string(),
            latency: Duration::from_millis(30),
            jitter: Duration::from_millis(10),
            detect_probability: 0.9,
            stall_after: None,
        }
    }
}

impl SimulatedFactory {
    pub fn new(image_topic: impl Into<String>) -> Self {
        Self {
            image_topic: image_topic.into(),
            ..Default::default()
        }
    }
}

impl DetectorFactory for SimulatedFactory {
    fn create(&self, spec: &DetectorSpec) -> Result<Box<dyn DetectorUnit>> {
        let topic = if spec.single_body {
            self.image_topic.clone()
        } else {
            body_frame_topic(&spec.body_id)
        };

        debug!(
            body_id = %spec.body_id,
            use_depth = spec.use_depth,
            debug = spec.debug,
            "Starting simulated detector"
        );

        Ok(Box::new(SimulatedDetector {
            topic,
            latency: self.latency,
            jitter: self.jitter,
            detect_probability: self.detect_probability.clamp(0.0, 1.0),
            stall_after: self.stall_after,
            started: Instant::now(),
            released: false,
        }))
    }
}

#[derive(Debug)]
pub struct SimulatedDetector {
    topic: String,
    latency: Duration,
    jitter: Duration,
    detect_probability: f64,
    stall_after: Option<Duration>,
    started: Instant,
    released: bool,
}

impl DetectorUnit for SimulatedDetector {
    fn frame_topic(&self) -> String {
        self.topic.clone()
    }

    fn processing_time(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.latency;
        }

        let low = self.latency.saturating_sub(self.jitter);
        let high = self.latency + self.jitter;
        rand::rng().random_range(low..=high)
    }

    fn check_timeout(&self) -> bool {
        self.stall_after
            .is_some_and(|after| self.started.elapsed() > after)
    }

    fn is_detected(&self) -> bool {
        !self.released && rand::rng().random_bool(self.detect_probability)
    }

    fn release(&mut self) -> Result<()> {
        self.released = true;
        Ok(())
    }
}
