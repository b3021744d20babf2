// ── In-flight mutation index ──
//
// Per-id FIFO serialization of mutations plus a version counter used to
// recognise stale completions. Ids with a live slot are "in flight": a
// reload must not overwrite them. While an id is in flight its slot also
// remembers the last state the remote confirmed, which is what a failed
// mutation rolls back to.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::oneshot;

use super::collection::{Collection, Mutation};
use crate::model::{Entity, EntityId};

/// Confirmed state of one id, with its list position.
struct Base<E: Entity> {
    entry: Option<Arc<E>>,
    index: Option<usize>,
    /// The cache shows `entry` itself, not an optimistic change over it.
    shown: bool,
}

struct Slot<E: Entity> {
    holders: usize,
    waiters: VecDeque<oneshot::Sender<()>>,
    /// Version of the latest optimistic change; 0 before the first one.
    version: u64,
    base: Option<Base<E>>,
}

impl<E: Entity> Slot<E> {
    fn held(holders: usize) -> Self {
        Self {
            holders,
            waiters: VecDeque::new(),
            version: 0,
            base: None,
        }
    }
}

/// Tracks which ids have mutations running and who is queued behind them.
pub(crate) struct PendingIndex<E: Entity> {
    slots: DashMap<EntityId, Slot<E>>,
    counter: AtomicU64,
}

/// Exclusive right to mutate one id. Released on drop.
pub(crate) struct IdPermit<E: Entity> {
    index: Arc<PendingIndex<E>>,
    id: EntityId,
}

impl<E: Entity> Drop for IdPermit<E> {
    fn drop(&mut self) {
        self.index.release(&self.id);
    }
}

/// Queue position held while waiting. If the waiting future is dropped
/// after the slot was already handed over, the handoff is passed on.
struct Waiter<'a, E: Entity> {
    index: &'a PendingIndex<E>,
    id: &'a EntityId,
    rx: Option<oneshot::Receiver<()>>,
}

impl<E: Entity> Drop for Waiter<'_, E> {
    fn drop(&mut self) {
        if let Some(mut rx) = self.rx.take() {
            rx.close();
            if rx.try_recv().is_ok() {
                self.index.release(self.id);
            }
        }
    }
}

impl<E: Entity> PendingIndex<E> {
    pub(crate) fn new() -> Self {
        Self {
            slots: DashMap::new(),
            counter: AtomicU64::new(0),
        }
    }

    /// Wait until every earlier mutation of `id` has settled, then take
    /// the slot. Waiters are served in arrival order.
    pub(crate) async fn acquire(self: &Arc<Self>, id: &EntityId) -> IdPermit<E> {
        loop {
            let rx = match self.slots.entry(id.clone()) {
                Entry::Vacant(vacant) => {
                    vacant.insert(Slot::held(1));
                    None
                }
                Entry::Occupied(mut occupied) => {
                    let (tx, rx) = oneshot::channel();
                    occupied.get_mut().waiters.push_back(tx);
                    Some(rx)
                }
            };

            let Some(rx) = rx else { break };

            let mut waiter = Waiter {
                index: Arc::as_ref(self),
                id,
                rx: Some(rx),
            };
            let handed_over = match waiter.rx.as_mut() {
                Some(rx) => rx.await.is_ok(),
                None => false,
            };
            waiter.rx = None;

            if handed_over {
                break;
            }
        }

        IdPermit {
            index: Arc::clone(self),
            id: id.clone(),
        }
    }

    /// Take the slot immediately, alongside any current holder. Queued
    /// waiters stay queued until every holder has released.
    pub(crate) fn preempt(self: &Arc<Self>, id: &EntityId) -> IdPermit<E> {
        self.slots
            .entry(id.clone())
            .or_insert_with(|| Slot::held(0))
            .holders += 1;
        IdPermit {
            index: Arc::clone(self),
            id: id.clone(),
        }
    }

    /// Drop one holder. The slot, with its version and confirmed base,
    /// goes away once nobody holds or waits for it.
    fn release(&self, id: &EntityId) {
        let Entry::Occupied(mut occupied) = self.slots.entry(id.clone()) else {
            return;
        };

        let slot = occupied.get_mut();
        slot.holders = slot.holders.saturating_sub(1);
        if slot.holders > 0 {
            return;
        }

        while let Some(tx) = slot.waiters.pop_front() {
            if tx.send(()).is_ok() {
                slot.holders = 1;
                return;
            }
        }

        occupied.remove();
    }

    /// Whether a mutation of `id` is running or queued.
    pub(crate) fn is_busy(&self, id: &EntityId) -> bool {
        self.slots.contains_key(id)
    }

    pub(crate) fn busy_ids(&self) -> Vec<EntityId> {
        self.slots.iter().map(|r| r.key().clone()).collect()
    }

    /// Number of mutations queued behind the current holder.
    pub(crate) fn queued(&self, id: &EntityId) -> usize {
        self.slots.get(id).map_or(0, |slot| slot.waiters.len())
    }

    /// Record an optimistic change of `id` made on top of `prior` and
    /// return its version. The first change since the id became busy
    /// fixes the confirmed base from `prior`. The caller holds a permit.
    pub(crate) fn bump(&self, id: &EntityId, prior: &Collection<E>) -> u64 {
        let version = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(mut slot) = self.slots.get_mut(id) {
            slot.version = version;
            let base = slot.base.get_or_insert_with(|| Base {
                entry: prior.get(id).cloned(),
                index: prior.position(id),
                shown: true,
            });
            base.shown = false;
        }
        version
    }

    /// Whether `version` is still the latest change recorded for `id`.
    pub(crate) fn is_current(&self, id: &EntityId, version: u64) -> bool {
        self.slots
            .get(id)
            .is_some_and(|slot| slot.version == version)
    }

    /// Record what the remote confirmed for `id` (`None` once it is gone)
    /// and return whether the cache should show it now.
    ///
    /// A current completion is always shown. A stale one is shown only
    /// when the cache was rolled back to the confirmed base after it was
    /// sent, and never over a confirmed removal.
    pub(crate) fn confirm(&self, id: &EntityId, entry: Option<Arc<E>>, current: bool) -> bool {
        let Some(mut slot) = self.slots.get_mut(id) else {
            return current;
        };
        let Some(base) = slot.base.as_mut() else {
            return current;
        };
        if !current && base.entry.is_none() {
            return false;
        }
        base.entry = entry;
        if current {
            base.shown = true;
        }
        base.shown
    }

    /// The mutation that puts `id` back to its last confirmed state, if
    /// one is known. The cache is expected to show it afterwards.
    pub(crate) fn rollback_of(&self, id: &EntityId) -> Option<Mutation<E>> {
        let mut slot = self.slots.get_mut(id)?;
        let base = slot.base.as_mut()?;
        base.shown = true;
        Some(Mutation::Restore {
            id: id.clone(),
            entry: base.entry.clone(),
            index: base.index,
        })
    }
}

impl<E: Entity> Default for PendingIndex<E> {
    fn default() -> Self {
        Self::new()
    }
}
