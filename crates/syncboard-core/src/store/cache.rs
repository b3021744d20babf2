// ── Entity cache ──
//
// One instance per entity kind. Holds the load state and the current
// snapshot behind a `watch` channel so every reader sees whole snapshots,
// never a half-applied change.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::collection::{Collection, Mutation, Snapshot};
use super::pending::PendingIndex;
use crate::error::CoreError;
use crate::model::{Entity, EntityId};
use crate::remote::RemoteStore;
use crate::stream::EntityStream;

// ── CacheState ───────────────────────────────────────────────────

/// Load lifecycle of a cache, carrying whatever data is still valid.
#[derive(Debug)]
pub enum CacheState<E: Entity> {
    /// Nothing loaded yet.
    Idle,
    /// A load is running; `previous` stays readable meanwhile.
    Loading { previous: Option<Snapshot<E>> },
    Ready(Snapshot<E>),
    /// The last load failed. `last_good` is the data from before it.
    Error {
        message: String,
        last_good: Option<Snapshot<E>>,
    },
}

impl<E: Entity> CacheState<E> {
    /// The snapshot readers should see in this state, if any.
    pub fn snapshot(&self) -> Option<&Snapshot<E>> {
        match self {
            Self::Idle => None,
            Self::Loading { previous } => previous.as_ref(),
            Self::Ready(snapshot) => Some(snapshot),
            Self::Error { last_good, .. } => last_good.as_ref(),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Same state with its data replaced. `Idle` becomes `Ready`.
    fn with_snapshot(&self, snapshot: Snapshot<E>) -> Self {
        match self {
            Self::Idle | Self::Ready(_) => Self::Ready(snapshot),
            Self::Loading { .. } => Self::Loading {
                previous: Some(snapshot),
            },
            Self::Error { message, .. } => Self::Error {
                message: message.clone(),
                last_good: Some(snapshot),
            },
        }
    }
}

impl<E: Entity> Clone for CacheState<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Idle => Self::Idle,
            Self::Loading { previous } => Self::Loading {
                previous: previous.clone(),
            },
            Self::Ready(snapshot) => Self::Ready(Arc::clone(snapshot)),
            Self::Error { message, last_good } => Self::Error {
                message: message.clone(),
                last_good: last_good.clone(),
            },
        }
    }
}

/// Result of a `load()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { count: usize },
    /// Another load was already running; this call did nothing.
    AlreadyLoading,
}

/// Snapshots on either side of an applied mutation.
#[derive(Debug, Clone)]
pub struct Applied<E: Entity> {
    pub prior: Snapshot<E>,
    pub next: Snapshot<E>,
}

// ── EntityCache ──────────────────────────────────────────────────

/// Authoritative client-side copy of one entity collection.
pub struct EntityCache<E: Entity> {
    state: watch::Sender<CacheState<E>>,
    pending: Arc<PendingIndex<E>>,
    /// Remote confirmations that arrived while a load was running. The
    /// listing may predate them, so they win over it.
    settled: DashMap<EntityId, Option<Arc<E>>>,
    empty: Snapshot<E>,
}

impl<E: Entity> EntityCache<E> {
    pub fn new() -> Self {
        let (state, _) = watch::channel(CacheState::Idle);
        Self {
            state,
            pending: Arc::new(PendingIndex::new()),
            settled: DashMap::new(),
            empty: Arc::new(Collection::new()),
        }
    }

    /// Current state (cheap clone).
    pub fn state(&self) -> CacheState<E> {
        self.state.borrow().clone()
    }

    /// Current snapshot, empty before the first load.
    pub fn snapshot(&self) -> Snapshot<E> {
        self.state
            .borrow()
            .snapshot()
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.empty))
    }

    pub fn get(&self, id: &EntityId) -> Option<Arc<E>> {
        self.state
            .borrow()
            .snapshot()
            .and_then(|s| s.get(id).cloned())
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> EntityStream<E> {
        EntityStream::new(self.state.subscribe())
    }

    /// Whether a mutation of `id` is running or queued.
    pub fn is_pending(&self, id: &EntityId) -> bool {
        self.pending.is_busy(id)
    }

    pub(crate) fn pending(&self) -> &Arc<PendingIndex<E>> {
        &self.pending
    }

    /// Note what the remote confirmed for `id` (`None` once deleted) so a
    /// load already in progress does not bring back an older value.
    pub(crate) fn remember_settled(&self, id: &EntityId, entry: Option<Arc<E>>) {
        if self.state.borrow().is_loading() {
            self.settled.insert(id.clone(), entry);
        }
    }

    /// Apply a mutation atomically and publish the result.
    ///
    /// Works in every state: while loading or after a failed load the
    /// readable snapshot is replaced and the state kind is kept.
    pub fn apply(&self, mutation: &Mutation<E>) -> Applied<E> {
        let mut applied = None;
        self.state.send_modify(|state| {
            let prior = state
                .snapshot()
                .cloned()
                .unwrap_or_else(|| Arc::clone(&self.empty));
            let next = Arc::new(prior.apply(mutation));
            *state = state.with_snapshot(Arc::clone(&next));
            applied = Some(Applied { prior, next });
        });

        // `send_modify` always runs the closure.
        applied.unwrap_or_else(|| Applied {
            prior: Arc::clone(&self.empty),
            next: Arc::clone(&self.empty),
        })
    }

    /// Replace the contents with the remote listing.
    ///
    /// A call made while another load is running returns
    /// [`LoadOutcome::AlreadyLoading`] without contacting the remote.
    /// Ids with a mutation in flight keep their cached value (or
    /// absence) instead of the listed one, and so do ids whose mutation
    /// was confirmed while the listing was on its way.
    pub async fn load(&self, remote: &dyn RemoteStore<E>) -> Result<LoadOutcome, CoreError> {
        let mut started = false;
        self.state.send_if_modified(|state| {
            if state.is_loading() {
                return false;
            }
            *state = CacheState::Loading {
                previous: state.snapshot().cloned(),
            };
            self.settled.clear();
            started = true;
            true
        });

        if !started {
            debug!(kind = %E::KIND, "load already running; skipping");
            return Ok(LoadOutcome::AlreadyLoading);
        }

        match remote.list().await {
            Ok(items) => {
                let mut fresh = Collection::from_entities(items);
                let mut count = 0;
                let mut in_flight = 0;

                self.state.send_modify(|state| {
                    let settled: Vec<_> = self
                        .settled
                        .iter()
                        .map(|r| (r.key().clone(), r.value().clone()))
                        .collect();
                    self.settled.clear();
                    for (id, entry) in settled {
                        match entry {
                            Some(entity) => fresh.upsert_in_place(entity),
                            None => fresh.remove_in_place(&id),
                        }
                    }

                    // Read under the state lock: a mutation registers its id
                    // before it applies, so none can slip in between.
                    let busy = self.pending.busy_ids();
                    in_flight = busy.len();
                    let current = state.snapshot();
                    for id in &busy {
                        match current.and_then(|s| s.get(id)) {
                            Some(entity) => fresh.upsert_in_place(Arc::clone(entity)),
                            None => fresh.remove_in_place(id),
                        }
                    }
                    count = fresh.len();
                    *state = CacheState::Ready(Arc::new(std::mem::take(&mut fresh)));
                });

                info!(kind = %E::KIND, count, in_flight, "loaded");
                Ok(LoadOutcome::Loaded { count })
            }
            Err(err) => {
                warn!(kind = %E::KIND, error = %err, "load failed");
                let message = err.to_string();
                self.state.send_modify(|state| {
                    *state = CacheState::Error {
                        message,
                        last_good: state.snapshot().cloned(),
                    };
                });
                Err(err.into())
            }
        }
    }
}

impl<E: Entity> Default for EntityCache<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Project, ProjectDraft, ProjectPatch};
    use crate::remote::{MemoryRemote, RemoteError, RemoteOp};

    fn project(id: u64, name: &str) -> Project {
        Project::from_draft(
            EntityId::Numeric(id),
            &ProjectDraft {
                name: name.into(),
                ..ProjectDraft::default()
            },
            None,
        )
    }

    fn remote(items: Vec<Project>) -> MemoryRemote<Project> {
        MemoryRemote::with_entities(items).unwrap()
    }

    #[tokio::test]
    async fn load_moves_idle_to_ready() {
        let cache = EntityCache::new();
        assert!(matches!(cache.state(), CacheState::Idle));

        let outcome = cache
            .load(&remote(vec![project(1, "A"), project(2, "B")]))
            .await
            .unwrap();

        assert_eq!(outcome, LoadOutcome::Loaded { count: 2 });
        assert!(matches!(cache.state(), CacheState::Ready(_)));
        assert_eq!(cache.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn failed_load_keeps_last_good_snapshot() {
        let cache = EntityCache::new();
        let store = remote(vec![project(1, "A")]);
        cache.load(&store).await.unwrap();

        store
            .fail_next(RemoteOp::List, RemoteError::network("timeout"))
            .await;
        let err = cache.load(&store).await.unwrap_err();

        assert!(err.is_retryable());
        let state = cache.state();
        assert_eq!(state.error(), Some("Network error: timeout"));
        assert_eq!(state.snapshot().unwrap().len(), 1);
    }

    #[test]
    fn apply_on_idle_becomes_ready() {
        let cache = EntityCache::new();
        let applied = cache.apply(&Mutation::Upsert(Arc::new(project(1, "A"))));

        assert!(applied.prior.is_empty());
        assert_eq!(applied.next.len(), 1);
        assert!(matches!(cache.state(), CacheState::Ready(_)));
    }

    #[tokio::test]
    async fn apply_after_failed_load_keeps_error_state() {
        let cache = EntityCache::new();
        let store = remote(vec![]);
        store
            .fail_next(RemoteOp::List, RemoteError::network("down"))
            .await;
        let _ = cache.load(&store).await;

        cache.apply(&Mutation::Upsert(Arc::new(project(7, "G"))));
        let state = cache.state();
        assert!(state.error().is_some());
        assert_eq!(state.snapshot().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn load_keeps_in_flight_values() {
        let cache = EntityCache::new();
        let store = remote(vec![project(1, "Server"), project(2, "B")]);
        cache.load(&store).await.unwrap();

        let id = EntityId::Numeric(1);
        let _permit = cache.pending().acquire(&id).await;
        cache.apply(&Mutation::Patch {
            id: id.clone(),
            patch: ProjectPatch {
                name: Some("Optimistic".into()),
                ..ProjectPatch::default()
            },
        });

        cache.load(&store).await.unwrap();
        assert_eq!(cache.get(&id).unwrap().name, "Optimistic");
    }

    #[tokio::test]
    async fn load_keeps_in_flight_removals() {
        let cache = EntityCache::new();
        let store = remote(vec![project(1, "A"), project(2, "B")]);
        cache.load(&store).await.unwrap();

        let id = EntityId::Numeric(2);
        let _permit = cache.pending().preempt(&id);
        cache.apply(&Mutation::Remove(id.clone()));

        cache.load(&store).await.unwrap();
        assert!(cache.get(&id).is_none());
        assert_eq!(cache.snapshot().len(), 1);
    }

    #[test]
    fn settled_ids_are_ignored_outside_a_load() {
        let cache = EntityCache::new();
        cache.apply(&Mutation::Upsert(Arc::new(project(1, "A"))));
        cache.remember_settled(&EntityId::Numeric(1), None);
        assert!(cache.settled.is_empty());
    }

    #[test]
    fn snapshot_is_shared_until_changed() {
        let cache: EntityCache<Project> = EntityCache::new();
        let a = cache.snapshot();
        let b = cache.snapshot();
        assert!(Arc::ptr_eq(&a, &b));

        cache.apply(&Mutation::Upsert(Arc::new(project(1, "A"))));
        assert!(!Arc::ptr_eq(&a, &cache.snapshot()));
    }
}
