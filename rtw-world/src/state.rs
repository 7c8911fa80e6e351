//! Shared service state
//!
//! One world, one module registry, one danger handle and a broadcast channel
//! of fused snapshots, shared by the HTTP handlers.

use rtw_common::config::{TomlConfig, WorldKind};
use rtw_common::messages::{DangerSnapshot, DetectionFrame, WorldSnapshot};
use rtw_common::time;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

use crate::danger::SharedDanger;
use crate::error::Result;
use crate::predictor::DifferencePredictor;
use crate::tracker::{BallPossession, ModuleRegistry};
use crate::world::{CycleOutcome, DummyWorld, FilteredWorld, WorldBase};

/// Reach within which a robot is considered to hold the ball (meters)
const POSSESSION_RADIUS: f64 = 0.15;

/// Shared state accessible by all handlers
///
/// The world lock is never held while the registry lock is taken.
pub struct SharedState {
    world: Mutex<Box<dyn WorldBase>>,
    modules: Mutex<ModuleRegistry>,
    danger: SharedDanger,

    /// Fused snapshots for SSE listeners
    snapshot_tx: broadcast::Sender<WorldSnapshot>,

    pub frames_received: AtomicU64,
    pub merges: AtomicU64,
    pub module_failures: AtomicU64,
}

impl SharedState {
    pub fn new(world: Box<dyn WorldBase>, modules: ModuleRegistry, danger: SharedDanger) -> Self {
        let (snapshot_tx, _) = broadcast::channel(64);
        Self {
            world: Mutex::new(world),
            modules: Mutex::new(modules),
            danger,
            snapshot_tx,
            frames_received: AtomicU64::new(0),
            merges: AtomicU64::new(0),
            module_failures: AtomicU64::new(0),
        }
    }

    /// Build the world and default modules described by `config`
    pub fn from_config(config: &TomlConfig) -> Result<Self> {
        config.validate()?;

        let danger = SharedDanger::new();
        let world: Box<dyn WorldBase> = match config.world {
            WorldKind::Filtered => Box::new(FilteredWorld::new(
                config.our_color,
                config.fusion.clone(),
                Box::new(DifferencePredictor::new(config.predictor.window_secs)),
                Arc::new(danger.clone()),
            )),
            WorldKind::Dummy => Box::new(DummyWorld::new(config.our_color)),
        };

        let mut modules = ModuleRegistry::new();
        modules.add(Box::new(BallPossession::new(POSSESSION_RADIUS)));

        info!(
            "World ready: {:?} world, playing {}, {} tracker module(s)",
            config.world,
            config.our_color,
            modules.len()
        );
        Ok(Self::new(world, modules, danger))
    }

    /// Run one frame through the world, stamped with the current time
    pub async fn ingest(&self, frame: &DetectionFrame) -> CycleOutcome {
        self.ingest_at(frame, time::now_seconds()).await
    }

    /// Run one frame through the world at an explicit time
    ///
    /// A completed cycle is exported, run through the tracker modules and
    /// broadcast. The freshness mailbox is left for `consume`.
    pub async fn ingest_at(&self, frame: &DetectionFrame, now: f64) -> CycleOutcome {
        self.frames_received.fetch_add(1, Ordering::Relaxed);

        let (outcome, snapshot) = {
            let mut world = self.world.lock().await;
            let outcome = world.detection_callback(frame, now);
            let snapshot = outcome.is_merged().then(|| world.export());
            (outcome, snapshot)
        };

        if let Some(snapshot) = snapshot {
            self.merges.fetch_add(1, Ordering::Relaxed);

            let failures = self.modules.lock().await.update(&snapshot);
            if failures > 0 {
                self.module_failures
                    .fetch_add(failures as u64, Ordering::Relaxed);
            }

            // No receivers is fine
            let _ = self.snapshot_tx.send(snapshot);
        }
        outcome
    }

    pub async fn export(&self) -> WorldSnapshot {
        self.world.lock().await.export()
    }

    /// Latest snapshot if a merge happened since the previous call
    pub async fn consume(&self) -> Option<WorldSnapshot> {
        self.world.lock().await.consume()
    }

    pub async fn reset(&self) {
        self.world.lock().await.reset();
        info!("World reset");
    }

    /// Hand a new danger assessment to the world
    ///
    /// Picked up on the next inbound frame.
    pub fn publish_danger(&self, danger: DangerSnapshot) {
        debug!("Danger assessment published for {} robot(s)", danger.danger_list.len());
        self.danger.publish(danger);
    }

    pub fn danger(&self) -> &SharedDanger {
        &self.danger
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorldSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Name and summary of every registered module, in order
    pub async fn module_summaries(&self) -> Vec<serde_json::Value> {
        self.modules
            .lock()
            .await
            .iter()
            .map(|m| json!({ "name": m.name(), "summary": m.summary() }))
            .collect()
    }
}
