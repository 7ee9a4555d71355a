//! Shared test helpers: a scriptable detector backend

#![allow(dead_code)]

use bodytrack::core::detector::{DetectorFactory, DetectorSpec, DetectorUnit};
use bodytrack::error::{Result, TrackerError};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a mock unit reports for its body
#[derive(Debug, Clone, Copy)]
pub struct Telemetry {
    pub processing: Duration,
    pub timed_out: bool,
    pub detected: bool,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            processing: Duration::from_millis(10),
            timed_out: false,
            detected: true,
        }
    }
}

#[derive(Default)]
struct Shared {
    created: Mutex<Vec<DetectorSpec>>,
    released: Mutex<Vec<String>>,
    telemetry: Mutex<HashMap<String, Telemetry>>,
    failing: Mutex<HashSet<String>>,
}

/// Factory whose units read their telemetry from a shared table, so tests
/// can change what a unit reports after it was created
#[derive(Default, Clone)]
pub struct MockFactory {
    shared: Arc<Shared>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_telemetry(&self, body_id: &str, telemetry: Telemetry) {
        self.shared
            .telemetry
            .lock()
            .unwrap()
            .insert(body_id.to_string(), telemetry);
    }

    pub fn set_processing_ms(&self, body_id: &str, millis: u64) {
        self.set_telemetry(
            body_id,
            Telemetry {
                processing: Duration::from_millis(millis),
                ..Default::default()
            },
        );
    }

    pub fn fail_for(&self, body_id: &str) {
        self.shared
            .failing
            .lock()
            .unwrap()
            .insert(body_id.to_string());
    }

    pub fn recover(&self, body_id: &str) {
        self.shared.failing.lock().unwrap().remove(body_id);
    }

    pub fn created(&self) -> Vec<String> {
        self.shared
            .created
            .lock()
            .unwrap()
            .iter()
            .map(|spec| spec.body_id.clone())
            .collect()
    }

    pub fn created_specs(&self) -> Vec<DetectorSpec> {
        self.shared.created.lock().unwrap().clone()
    }

    pub fn released(&self) -> Vec<String> {
        self.shared.released.lock().unwrap().clone()
    }

    pub fn release_count(&self, body_id: &str) -> usize {
        self.released().iter().filter(|id| *id == body_id).count()
    }
}

impl DetectorFactory for MockFactory {
    fn create(&self, spec: &DetectorSpec) -> Result<Box<dyn DetectorUnit>> {
        if self.shared.failing.lock().unwrap().contains(&spec.body_id) {
            return Err(TrackerError::Construction {
                body_id: spec.body_id.clone(),
                reason: "resource exhausted".to_string(),
            });
        }

        self.shared.created.lock().unwrap().push(spec.clone());
        Ok(Box::new(MockUnit {
            id: spec.body_id.clone(),
            shared: self.shared.clone(),
        }))
    }
}

struct MockUnit {
    id: String,
    shared: Arc<Shared>,
}

impl MockUnit {
    fn telemetry(&self) -> Telemetry {
        self.shared
            .telemetry
            .lock()
            .unwrap()
            .get(&self.id)
            .copied()
            .unwrap_or_default()
    }
}

impl DetectorUnit for MockUnit {
    fn frame_topic(&self) -> String {
        format!("/humans/bodies/{}/cropped", self.id)
    }

    fn processing_time(&self) -> Duration {
        self.telemetry().processing
    }

    fn check_timeout(&self) -> bool {
        self.telemetry().timed_out
    }

    fn is_detected(&self) -> bool {
        self.telemetry().detected
    }

    fn release(&mut self) -> Result<()> {
        self.shared.released.lock().unwrap().push(self.id.clone());
        Ok(())
    }
}
