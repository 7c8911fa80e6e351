//! World models
//!
//! A world absorbs detection frames and exposes the resulting scene.
//! [`FilteredWorld`] fuses all cameras per cycle; [`DummyWorld`] just forwards
//! the latest frame.

pub mod buffer;
pub mod dummy;
pub mod filtered;
pub mod robot;

pub use buffer::{CycleBarrier, ObservationBuffer};
pub use dummy::DummyWorld;
pub use filtered::FilteredWorld;
pub use robot::{Ball, Robot, RobotVelocity};

use rtw_common::messages::{DetectionFrame, WorldSnapshot};
use serde::Serialize;
use std::fmt;

/// What one inbound frame led to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Some tracked camera has not reported yet this cycle
    Incomplete,
    /// A merge ran
    Merged {
        /// Robots fused from this cycle's observations
        fused: usize,
        /// Robots evicted as stale or future-stamped
        evicted: usize,
    },
}

impl CycleOutcome {
    pub fn is_merged(&self) -> bool {
        matches!(self, CycleOutcome::Merged { .. })
    }
}

/// Why a fused robot was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
    /// Not seen within the staleness threshold
    Stale,
    /// Stamped ahead of the current time
    FutureTimestamp,
}

impl fmt::Display for EvictionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvictionReason::Stale => write!(f, "too old"),
            EvictionReason::FutureTimestamp => write!(f, "timestamp from the future"),
        }
    }
}

/// Common interface of world implementations
pub trait WorldBase: Send {
    /// Forget everything, including tracked cameras
    fn reset(&mut self);

    /// Absorb one camera frame received at `now` (seconds)
    fn detection_callback(&mut self, frame: &DetectionFrame, now: f64) -> CycleOutcome;

    /// Current scene, side-effect free
    fn export(&self) -> WorldSnapshot;

    /// Current scene if it changed since the last consume
    fn consume(&self) -> Option<WorldSnapshot>;
}
