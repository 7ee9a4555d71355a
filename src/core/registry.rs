/*!
 * Handle registry: one detector unit per live body
 *
 * The registry owns every detector unit and keeps the set of units aligned
 * with the externally reported list of live body ids. Insertion order is kept
 * so that the most recently tracked body can be reported and so that shutdown
 * releases units in the order they were created.
 */

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::detector::{DetectorFactory, DetectorSpec, DetectorUnit};
use crate::error::{Result, TrackerError};

/// How the registry is populated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryMode {
    /// Exactly one unit, created at startup, never reconciled
    Single,
    /// Units follow the live-id feed
    Multi,
}

impl RegistryMode {
    pub fn is_single(&self) -> bool {
        matches!(self, RegistryMode::Single)
    }
}

impl fmt::Display for RegistryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryMode::Single => write!(f, "single-body"),
            RegistryMode::Multi => write!(f, "multi-body"),
        }
    }
}

/// A tracked body and the detector unit that serves it
pub struct HandleEntry {
    id: String,
    handle: Box<dyn DetectorUnit>,
}

impl HandleEntry {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Read the unit's current state into an owned view
    pub fn view(&self) -> HandleView {
        HandleView {
            id: self.id.clone(),
            is_detected: self.handle.is_detected(),
            processing_time: self.handle.processing_time(),
            timed_out: self.handle.check_timeout(),
            frame_topic: self.handle.frame_topic(),
        }
    }

    fn release(&mut self) {
        if let Err(e) = self.handle.release() {
            warn!(
                body_id = %self.id,
                error = %e,
                "Detector release failed, dropping entry anyway"
            );
        }
    }
}

impl fmt::Debug for HandleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleEntry").field("id", &self.id).finish()
    }
}

/// Point-in-time copy of one entry's state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandleView {
    pub id: String,
    pub is_detected: bool,
    pub processing_time: Duration,
    pub timed_out: bool,
    pub frame_topic: String,
}

/// Changes applied by one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Bodies that got a new unit, in insertion order
    pub added: Vec<String>,

    /// Bodies whose unit was released, in former insertion order
    pub removed: Vec<String>,
}

impl ReconcileReport {
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Insertion-ordered registry of detector units keyed by body id
pub struct HandleRegistry {
    factory: Arc<dyn DetectorFactory>,

    /// Settings shared by every unit; only the body id changes
    template: DetectorSpec,

    mode: RegistryMode,

    entries: HashMap<String, HandleEntry>,

    /// Keys of `entries` in insertion order
    order: Vec<String>,

    /// Most recently inserted body that is still tracked
    last_inserted: Option<String>,
}

impl HandleRegistry {
    /// Create an empty registry driven by the live-id feed
    pub fn new_multi(factory: Arc<dyn DetectorFactory>, template: DetectorSpec) -> Self {
        Self {
            factory,
            template: DetectorSpec {
                single_body: false,
                ..template
            },
            mode: RegistryMode::Multi,
            entries: HashMap::new(),
            order: Vec::new(),
            last_inserted: None,
        }
    }

    /// Create a registry holding exactly one unit for `body_id`.
    ///
    /// Reconciliation is disabled on the returned registry.
    pub fn new_single(
        factory: Arc<dyn DetectorFactory>,
        template: DetectorSpec,
        body_id: &str,
    ) -> Result<Self> {
        let mut registry = Self {
            factory,
            template: DetectorSpec {
                single_body: true,
                ..template
            },
            mode: RegistryMode::Single,
            entries: HashMap::new(),
            order: Vec::new(),
            last_inserted: None,
        };

        registry.insert(body_id)?;
        Ok(registry)
    }

    pub fn mode(&self) -> RegistryMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, body_id: &str) -> bool {
        self.entries.contains_key(body_id)
    }

    /// Tracked body ids in insertion order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Id of the most recently inserted body still tracked
    pub fn last_inserted(&self) -> Option<&str> {
        self.last_inserted.as_deref()
    }

    pub fn get(&self, body_id: &str) -> Option<HandleView> {
        self.entries.get(body_id).map(HandleEntry::view)
    }

    /// Align the registry with the current set of live bodies.
    ///
    /// Vanished bodies are released and removed first, then new bodies get a
    /// unit in the order they appear in `live_ids`. Duplicates are ignored.
    /// A body whose unit cannot be created is left out and reported in the
    /// returned error; it is picked up again by the next call that still
    /// lists it.
    ///
    /// In single-body mode this is a no-op.
    pub fn reconcile<I, S>(&mut self, live_ids: I) -> Result<ReconcileReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.mode.is_single() {
            debug!("Ignoring live-id update in single-body mode");
            return Ok(ReconcileReport::default());
        }

        let mut live_set: HashSet<String> = HashSet::new();
        let mut live: Vec<String> = Vec::new();
        for id in live_ids {
            let id = id.as_ref();
            if live_set.insert(id.to_string()) {
                live.push(id.to_string());
            }
        }

        let mut report = ReconcileReport::default();

        let vanished: Vec<String> = self
            .order
            .iter()
            .filter(|id| !live_set.contains(id.as_str()))
            .cloned()
            .collect();

        for id in vanished {
            self.remove(&id);
            report.removed.push(id);
        }

        let mut failed = Vec::new();
        let mut first_error = None;

        for id in live {
            if self.entries.contains_key(&id) {
                continue;
            }

            match self.insert(&id) {
                Ok(()) => report.added.push(id),
                Err(e) => {
                    warn!(body_id = %id, error = %e, "Could not start detector");
                    failed.push(id);
                    first_error.get_or_insert(e);
                }
            }
        }

        if !report.is_unchanged() {
            info!(
                "Reconciled bodies | +{} -{} | tracking {}",
                report.added.len(),
                report.removed.len(),
                self.len()
            );
        }

        match first_error {
            Some(source) => Err(TrackerError::Reconcile {
                failed,
                source: Box::new(source),
            }),
            None => Ok(report),
        }
    }

    /// Views of every entry in insertion order
    pub fn snapshot(&self) -> Vec<HandleView> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id))
            .map(HandleEntry::view)
            .collect()
    }

    /// Release every unit in insertion order and empty the registry.
    ///
    /// Returns the number of units released.
    pub fn shutdown(&mut self) -> usize {
        let order = std::mem::take(&mut self.order);
        let mut released = 0;

        for id in &order {
            if let Some(mut entry) = self.entries.remove(id) {
                entry.release();
                debug!(body_id = %id, "Released detector");
                released += 1;
            }
        }

        self.last_inserted = None;
        released
    }

    fn insert(&mut self, body_id: &str) -> Result<()> {
        let spec = self.template.for_body(body_id);
        let handle = self.factory.create(&spec)?;

        info!(
            body_id = %body_id,
            topic = %handle.frame_topic(),
            "Tracking body"
        );

        self.entries.insert(
            body_id.to_string(),
            HandleEntry {
                id: body_id.to_string(),
                handle,
            },
        );
        self.order.push(body_id.to_string());
        self.last_inserted = Some(body_id.to_string());

        Ok(())
    }

    fn remove(&mut self, body_id: &str) {
        // Release before the entry leaves the map
        if let Some(entry) = self.entries.get_mut(body_id) {
            entry.release();
        }

        if self.entries.remove(body_id).is_some() {
            info!(body_id = %body_id, "Body lost, detector released");
        }
        self.order.retain(|id| id != body_id);

        if self.last_inserted.as_deref() == Some(body_id) {
            self.last_inserted = self.order.last().cloned();
        }
    }
}

impl Drop for HandleRegistry {
    fn drop(&mut self) {
        if !self.entries.is_empty() {
            self.shutdown();
        }
    }
}

impl fmt::Debug for HandleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleRegistry")
            .field("mode", &self.mode)
            .field("order", &self.order)
            .field("last_inserted", &self.last_inserted)
            .finish()
    }
}
