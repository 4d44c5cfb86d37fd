use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use log::debug;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::task::JoinHandle;

use crate::state::{PipelineId, PipelineState};

struct Slot {
    state: Option<PipelineState>,
    touched: Instant,
}

impl Slot {
    fn vacant() -> Self {
        Self {
            state: None,
            touched: Instant::now(),
        }
    }
}

/// In-memory store of every pipeline seen since startup.
///
/// Each pipeline id owns its own async lock, so all read-modify-write work on
/// one pipeline (reconcile, notify, store the message handle) is serialized
/// while other pipelines proceed in parallel. The outer map lock is only held
/// to look up or insert a slot and never across an `.await`.
///
/// Entries live forever unless a `ttl` is configured, in which case
/// [`PipelineRegistry::purge_expired`] drops entries untouched for longer
/// than the ttl.
pub struct PipelineRegistry {
    slots: Mutex<HashMap<PipelineId, Arc<AsyncMutex<Slot>>>>,
    ttl: Option<Duration>,
}

/// Exclusive access to one pipeline's entry, released on drop.
pub struct PipelineSlot {
    guard: OwnedMutexGuard<Slot>,
}

impl PipelineSlot {
    /// The entry itself; `None` until the first pipeline event creates it.
    pub fn entry(&mut self) -> &mut Option<PipelineState> {
        &mut self.guard.state
    }

    pub fn state(&self) -> Option<&PipelineState> {
        self.guard.state.as_ref()
    }

    pub fn state_mut(&mut self) -> Option<&mut PipelineState> {
        self.guard.state.as_mut()
    }
}

impl Default for PipelineRegistry {
    fn default() -> Self {
        Self::new(None)
    }
}

impl PipelineRegistry {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<PipelineId, Arc<AsyncMutex<Slot>>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Locks the slot for `id`, creating a vacant one if the id is new.
    pub async fn lock(&self, id: PipelineId) -> PipelineSlot {
        let slot = Arc::clone(
            self.slots()
                .entry(id)
                .or_insert_with(|| Arc::new(AsyncMutex::new(Slot::vacant()))),
        );
        Self::acquire(slot).await
    }

    /// Locks the slot for `id` only if a pipeline state is stored under it.
    pub async fn lock_existing(&self, id: PipelineId) -> Option<PipelineSlot> {
        let slot = self.slots().get(&id).cloned()?;
        let slot = Self::acquire(slot).await;
        slot.state().is_some().then_some(slot)
    }

    async fn acquire(slot: Arc<AsyncMutex<Slot>>) -> PipelineSlot {
        let mut guard = slot.lock_owned().await;
        guard.touched = Instant::now();
        PipelineSlot { guard }
    }

    /// Returns a snapshot of the stored state.
    #[cfg(test)]
    pub async fn get(&self, id: PipelineId) -> Option<PipelineState> {
        let slot = self.slots().get(&id).cloned()?;
        let guard = slot.lock().await;
        guard.state.clone()
    }

    #[cfg(test)]
    pub async fn put(&self, id: PipelineId, state: PipelineState) {
        let mut slot = self.lock(id).await;
        *slot.entry() = Some(state);
    }

    /// Number of stored pipelines.
    ///
    /// Waits for every slot lock, so it must not be called while holding a
    /// [`PipelineSlot`].
    pub async fn len(&self) -> usize {
        let slots: Vec<_> = self.slots().values().cloned().collect();
        let mut count = 0;
        for slot in slots {
            if slot.lock().await.state.is_some() {
                count += 1;
            }
        }
        count
    }

    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drops entries not touched within the ttl, plus vacant slots.
    ///
    /// Slots that are locked or awaited by a request are always kept.
    pub fn purge_expired(&self) -> usize {
        let mut slots = self.slots();
        let before = slots.len();

        slots.retain(|_, slot| {
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            let Ok(guard) = slot.try_lock() else {
                return true;
            };
            match (&guard.state, self.ttl) {
                (None, _) => false,
                (Some(_), Some(ttl)) => guard.touched.elapsed() < ttl,
                (Some(_), None) => true,
            }
        });

        before - slots.len()
    }

    /// Runs [`Self::purge_expired`] every `interval` in the background.
    ///
    /// Returns `None` when no ttl is configured.
    pub fn spawn_reaper(self: &Arc<Self>, interval: Duration) -> Option<JoinHandle<()>> {
        if self.ttl.is_none() {
            return None;
        }
        let registry = Arc::clone(self);

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let purged = registry.purge_expired();
                if purged > 0 {
                    debug!(
                        "Purged {purged} expired pipelines, {} still tracked",
                        registry.len().await
                    );
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Commit, Project, Status};
    use std::collections::BTreeMap;

    fn pipeline(id: PipelineId) -> PipelineState {
        PipelineState {
            id,
            ref_: "main".to_string(),
            status: Status::Running,
            duration: 0,
            project: Project::default(),
            commit: Commit::default(),
            username: "root".to_string(),
            jobs: BTreeMap::new(),
            message: None,
            last_delivery_error: None,
        }
    }

    mod get_and_put {
        use super::*;

        #[tokio::test]
        async fn instances_are_isolated() {
            let first = PipelineRegistry::default();
            let second = PipelineRegistry::default();

            first.put(1, pipeline(1)).await;

            assert_eq!(first.get(1).await.map(|p| p.id), Some(1));
            assert!(second.get(1).await.is_none());
            assert!(second.is_empty().await);
        }

        #[tokio::test]
        async fn put_replaces_existing_entry() {
            let registry = PipelineRegistry::default();
            registry.put(1, pipeline(1)).await;

            let mut updated = pipeline(1);
            updated.status = Status::Success;
            registry.put(1, updated).await;

            assert_eq!(registry.len().await, 1);
            assert_eq!(registry.get(1).await.unwrap().status, Status::Success);
        }
    }

    mod lock {
        use super::*;

        #[tokio::test]
        async fn vacant_slot_is_not_counted() {
            let registry = PipelineRegistry::default();
            {
                let slot = registry.lock(5).await;
                assert!(slot.state().is_none());
            }
            assert_eq!(registry.len().await, 0);
            assert!(registry.lock_existing(5).await.is_none());
        }

        #[tokio::test]
        async fn lock_existing_returns_stored_state() {
            let registry = PipelineRegistry::default();
            registry.put(3, pipeline(3)).await;

            let mut slot = registry.lock_existing(3).await.unwrap();
            slot.state_mut().unwrap().duration = 42;
            drop(slot);

            assert_eq!(registry.get(3).await.unwrap().duration, 42);
        }

        #[tokio::test]
        async fn same_id_is_exclusive() {
            let registry = Arc::new(PipelineRegistry::default());
            let held = registry.lock(1).await;

            let contender = {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    let _slot = registry.lock(1).await;
                })
            };
            tokio::time::sleep(Duration::from_millis(20)).await;
            assert!(!contender.is_finished());

            // Other pipelines are not blocked.
            let _other = registry.lock(2).await;

            drop(held);
            contender.await.unwrap();
        }
    }

    mod purge_expired {
        use super::*;

        #[tokio::test]
        async fn keeps_everything_without_ttl() {
            let registry = PipelineRegistry::new(None);
            registry.put(1, pipeline(1)).await;
            assert_eq!(registry.purge_expired(), 0);
            assert_eq!(registry.len().await, 1);
        }

        #[tokio::test]
        async fn drops_stale_entries() {
            let registry = PipelineRegistry::new(Some(Duration::ZERO));
            registry.put(1, pipeline(1)).await;
            registry.put(2, pipeline(2)).await;

            assert_eq!(registry.purge_expired(), 2);
            assert!(registry.is_empty().await);
        }

        #[tokio::test]
        async fn keeps_fresh_and_locked_entries() {
            let registry = PipelineRegistry::new(Some(Duration::ZERO));
            registry.put(1, pipeline(1)).await;
            let _held = registry.lock(1).await;

            assert_eq!(registry.purge_expired(), 0);

            let fresh = PipelineRegistry::new(Some(Duration::from_secs(3600)));
            fresh.put(1, pipeline(1)).await;
            assert_eq!(fresh.purge_expired(), 0);
        }

        #[tokio::test]
        async fn drops_vacant_slots() {
            let registry = PipelineRegistry::new(None);
            drop(registry.lock(9).await);
            assert_eq!(registry.purge_expired(), 1);
        }
    }

    mod spawn_reaper {
        use super::*;

        #[tokio::test]
        async fn not_started_without_ttl() {
            let registry = Arc::new(PipelineRegistry::new(None));
            assert!(registry.spawn_reaper(Duration::from_secs(1)).is_none());
        }

        #[tokio::test]
        async fn purges_in_background() {
            let registry = Arc::new(PipelineRegistry::new(Some(Duration::ZERO)));
            registry.put(1, pipeline(1)).await;

            let reaper = registry.spawn_reaper(Duration::from_millis(5)).unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
            reaper.abort();

            assert!(registry.is_empty().await);
        }
    }
}
