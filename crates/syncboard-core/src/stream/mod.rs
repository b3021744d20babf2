// ── Reactive subscription handle ──

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::Entity;
use crate::store::{CacheState, Collection, Snapshot};

/// Subscription to one entity cache.
///
/// Wraps a `watch::Receiver` over the cache state. Consumers can read the
/// current value at any time or await the next change.
pub struct EntityStream<E: Entity> {
    rx: watch::Receiver<CacheState<E>>,
}

impl<E: Entity> EntityStream<E> {
    pub(crate) fn new(rx: watch::Receiver<CacheState<E>>) -> Self {
        Self { rx }
    }

    /// State as last observed, without marking it seen.
    pub fn current(&self) -> CacheState<E> {
        self.rx.borrow().clone()
    }

    /// Latest state, marking it seen.
    pub fn latest(&mut self) -> CacheState<E> {
        self.rx.borrow_and_update().clone()
    }

    /// Latest readable snapshot; empty while nothing has loaded.
    pub fn snapshot(&self) -> Snapshot<E> {
        self.rx
            .borrow()
            .snapshot()
            .cloned()
            .unwrap_or_else(|| Snapshot::new(Collection::new()))
    }

    /// Wait for the next change. Returns `None` once the cache is gone.
    pub async fn changed(&mut self) -> Option<CacheState<E>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Convert into a `Stream` that yields the current state, then every
    /// change.
    pub fn into_stream(self) -> impl Stream<Item = CacheState<E>> {
        WatchStream::new(self.rx)
    }
}

impl<E: Entity> Clone for EntityStream<E> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use futures_util::StreamExt;

    use crate::model::{EntityId, Project, ProjectDraft};
    use crate::store::{CacheState, EntityCache, Mutation};

    fn project(id: u64) -> Arc<Project> {
        Arc::new(<Project as crate::model::Entity>::from_draft(
            EntityId::Numeric(id),
            &ProjectDraft {
                name: format!("P{id}"),
                ..ProjectDraft::default()
            },
            None,
        ))
    }

    #[tokio::test]
    async fn changed_yields_after_apply() {
        let cache = EntityCache::new();
        let mut stream = cache.subscribe();
        assert!(matches!(stream.latest(), CacheState::Idle));

        cache.apply(&Mutation::Upsert(project(1)));
        let state = stream.changed().await.unwrap();
        assert_eq!(state.snapshot().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn changed_ends_when_cache_drops() {
        let cache: EntityCache<Project> = EntityCache::new();
        let mut stream = cache.subscribe();
        drop(cache);
        assert!(stream.changed().await.is_none());
    }

    #[tokio::test]
    async fn into_stream_starts_with_current_state() {
        let cache = EntityCache::new();
        cache.apply(&Mutation::Upsert(project(1)));

        let mut stream = Box::pin(cache.subscribe().into_stream());
        let first = stream.next().await.unwrap();
        assert_eq!(first.snapshot().unwrap().len(), 1);
    }
}
