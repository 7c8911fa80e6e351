//! Threat assessment hand-over
//!
//! Danger scoring runs elsewhere, on its own schedule. It is reached through an
//! injected [`DangerSource`]; the world copies the latest assessment into a
//! [`DangerLatch`] once per inbound frame and joins it against the exported
//! opponents.

use rtw_common::messages::{DangerSnapshot, WorldSnapshot};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Producer of danger assessments
pub trait DangerSource: Send + Sync {
    /// False until the first assessment has been computed
    fn has_computed_once(&self) -> bool;

    /// Most recent assessment; meaningful only once `has_computed_once`
    fn latest(&self) -> DangerSnapshot;
}

/// Shared handle an external producer publishes assessments into
#[derive(Debug, Clone, Default)]
pub struct SharedDanger {
    inner: Arc<RwLock<Option<DangerSnapshot>>>,
}

impl SharedDanger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, snapshot: DangerSnapshot) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
    }

    /// Back to "never computed"
    pub fn clear(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl DangerSource for SharedDanger {
    fn has_computed_once(&self) -> bool {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    fn latest(&self) -> DangerSnapshot {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_default()
    }
}

/// Latest assessment as seen by the world
///
/// The lock only ever guards a copy in or out.
pub struct DangerLatch {
    source: Arc<dyn DangerSource>,
    latest: Mutex<Option<DangerSnapshot>>,
}

impl DangerLatch {
    pub fn new(source: Arc<dyn DangerSource>) -> Self {
        Self {
            source,
            latest: Mutex::new(None),
        }
    }

    /// Pull the source's current assessment into the latch
    pub fn refresh(&self) {
        let fresh = if self.source.has_computed_once() {
            Some(self.source.latest())
        } else {
            None
        };
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = fresh;
    }

    /// Copy of the latched assessment, `None` if never computed
    pub fn current(&self) -> Option<DangerSnapshot> {
        self.latest.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn clear(&self) {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Append danger entries for opponents present in `snapshot.theirs`
    ///
    /// Ids without a matching opponent, score or flag are skipped.
    pub fn merge_into(&self, snapshot: &mut WorldSnapshot) {
        let Some(danger) = self.current() else {
            return;
        };

        let present: HashSet<u32> = snapshot.theirs.iter().map(|r| r.id).collect();
        for id in danger.danger_list {
            if !present.contains(&id) {
                continue;
            }
            let (Some(&score), Some(&flag)) = (danger.scores.get(&id), danger.flags.get(&id)) else {
                continue;
            };
            snapshot.danger_ids.push(id);
            snapshot.danger_scores.push(score);
            snapshot.danger_flags.push(flag);
        }
    }
}
