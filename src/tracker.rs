/*!
 * Tracker: the event loop around the registry
 *
 * Owns the handle registry and drives it from two sources:
 * - the live-id feed, which triggers reconciliation (multi-body mode only)
 * - a fixed-period timer, which triggers a diagnostics scan
 *
 * Both are served by one `select!` loop, so a scan never overlaps a
 * reconciliation or another scan. A due tick is served before pending feed
 * updates. On shutdown every remaining detector is
 * released before `run` returns.
 */

use std::future::Future;
use std::sync::Arc;
use tokio::io::AsyncBufRead;
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::TrackerConfig;
use crate::core::detector::{DetectorFactory, DetectorSpec};
use crate::core::diagnostics::{DiagnosticRecord, DiagnosticsAggregator};
use crate::core::identity::IdAllocator;
use crate::core::registry::{HandleRegistry, HandleView, ReconcileReport, RegistryMode};
use crate::error::Result;
use crate::feed::LiveIdFeed;
use crate::telemetry::DiagnosticSink;

pub struct Tracker {
    config: TrackerConfig,
    mode: RegistryMode,
    registry: Arc<RwLock<HandleRegistry>>,
    aggregator: DiagnosticsAggregator,
    sink: Arc<dyn DiagnosticSink>,
}

impl Tracker {
    /// Create a tracker from a validated configuration.
    ///
    /// In single-body mode the one detector is created here, under a
    /// generated id, and a failure to create it is returned to the caller.
    pub fn new(
        config: TrackerConfig,
        factory: Arc<dyn DetectorFactory>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Result<Self> {
        config.validate()?;

        let template = DetectorSpec {
            body_id: String::new(),
            use_depth: config.use_depth,
            debug: config.debug,
            single_body: config.single_body,
        };

        let registry = if config.single_body {
            let body_id = IdAllocator::new().generate();
            info!("Single-body mode, tracking generated id '{}'", body_id);
            HandleRegistry::new_single(factory, template, &body_id)?
        } else {
            HandleRegistry::new_multi(factory, template)
        };

        let mode = registry.mode();
        let aggregator = DiagnosticsAggregator::new(mode, config.slow_processing_threshold());

        Ok(Self {
            config,
            mode,
            registry: Arc::new(RwLock::new(registry)),
            aggregator,
            sink,
        })
    }

    pub fn mode(&self) -> RegistryMode {
        self.mode
    }

    /// Shared handle on the registry, for read-only inspection
    pub fn registry(&self) -> Arc<RwLock<HandleRegistry>> {
        self.registry.clone()
    }

    /// Apply one live-id update
    pub async fn apply_live_ids(&self, live_ids: &[String]) -> Result<ReconcileReport> {
        let mut registry = self.registry.write().await;
        registry.reconcile(live_ids)
    }

    /// Current view of every tracked body
    pub async fn snapshot(&self) -> Vec<HandleView> {
        self.registry.read().await.snapshot()
    }

    /// Produce and publish one diagnostic record
    ///
    /// Note: Public for integration testing
    pub async fn run_tick(&mut self) -> DiagnosticRecord {
        let record = {
            let registry = self.registry.read().await;
            self.aggregator.scan(&registry)
        };

        self.sink.publish(record.clone());
        record
    }

    /// Release every detector. Returns the number released.
    pub async fn shutdown(&self) -> usize {
        let released = self.registry.write().await.shutdown();
        info!("Released {} detector(s)", released);
        released
    }

    /// Main event loop
    ///
    /// Runs until `shutdown` resolves. `feed` is ignored in single-body mode
    /// and may be `None` when no live-id source exists; when it closes, the
    /// registry keeps its last state and diagnostics continue.
    pub async fn run<R, S>(mut self, feed: Option<LiveIdFeed<R>>, shutdown: S) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        S: Future<Output = ()>,
    {
        info!(
            "🛰️  Tracker active | Mode: {} | Diagnostic period: {}ms | Slow threshold: {}ms",
            self.mode(),
            self.config.diagnostic_period_ms,
            self.config.slow_processing_threshold_ms
        );

        let mut feed = if self.mode().is_single() {
            if feed.is_some() {
                debug!("Live-id feed ignored in single-body mode");
            }
            None
        } else {
            feed
        };

        let mut ticker = tokio::time::interval(self.config.diagnostic_period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }

                // Ahead of the feed so a backlog of updates cannot delay a report
                _ = ticker.tick() => {
                    self.run_tick().await;
                }

                update = next_update(&mut feed) => match update {
                    Ok(Some(ids)) => {
                        if let Err(e) = self.apply_live_ids(&ids).await {
                            warn!("{} (will retry on next update)", e);
                        }
                    }
                    Ok(None) => {
                        info!("Live-id feed closed, keeping current bodies");
                        feed = None;
                    }
                    Err(e) => {
                        warn!("Live-id feed failed: {}", e);
                        feed = None;
                    }
                },
            }
        }

        self.shutdown().await;
        Ok(())
    }
}

async fn next_update<R>(feed: &mut Option<LiveIdFeed<R>>) -> Result<Option<Vec<String>>>
where
    R: AsyncBufRead + Unpin,
{
    match feed {
        Some(feed) => feed.next_update().await,
        None => std::future::pending().await,
    }
}
