// ── Per-kind view facade ──
//
// What a screen binds to: the derived item list, load state, filter
// parameters, and the mutation operations for one entity kind.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::coordinator::MutationCoordinator;
use crate::error::CoreError;
use crate::filter::{DerivedView, FilterParams, FilterValue};
use crate::model::{Entity, EntityId};
use crate::notify::{Notification, NotificationSink};
use crate::remote::RemoteStore;
use crate::store::{CacheState, EntityCache, LoadOutcome, Snapshot};
use crate::stream::EntityStream;

/// Cache, coordinator, and filter state for one entity kind.
pub struct EntityView<E: Entity> {
    cache: Arc<EntityCache<E>>,
    coordinator: MutationCoordinator<E>,
    sink: Arc<dyn NotificationSink>,
    params: Mutex<FilterParams>,
    derived: Mutex<DerivedView<E>>,
}

impl<E: Entity> EntityView<E> {
    pub fn new(remote: Arc<dyn RemoteStore<E>>, sink: Arc<dyn NotificationSink>) -> Self {
        let cache = Arc::new(EntityCache::new());
        let coordinator = MutationCoordinator::new(Arc::clone(&cache), remote, Arc::clone(&sink));
        Self {
            cache,
            coordinator,
            sink,
            params: Mutex::new(FilterParams::new()),
            derived: Mutex::new(DerivedView::new()),
        }
    }

    pub fn cache(&self) -> &Arc<EntityCache<E>> {
        &self.cache
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Filtered, ordered records. Recomputed only when the snapshot or
    /// the filter parameters changed since the last call.
    pub fn items(&self) -> Arc<Vec<Arc<E>>> {
        let snapshot = self.cache.snapshot();
        let params = self.filter_params();
        self.derived
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&snapshot, &params)
    }

    /// Unfiltered snapshot.
    pub fn snapshot(&self) -> Snapshot<E> {
        self.cache.snapshot()
    }

    pub fn get(&self, id: &EntityId) -> Option<Arc<E>> {
        self.cache.get(id)
    }

    pub fn state(&self) -> CacheState<E> {
        self.cache.state()
    }

    pub fn is_loading(&self) -> bool {
        self.cache.state().is_loading()
    }

    /// Message of the last failed load, until the next successful one.
    pub fn error(&self) -> Option<String> {
        self.cache.state().error().map(str::to_owned)
    }

    pub fn subscribe(&self) -> EntityStream<E> {
        self.cache.subscribe()
    }

    // ── Filters ──────────────────────────────────────────────────

    pub fn filter_params(&self) -> FilterParams {
        self.params
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Set one filter parameter by name. See [`FilterParams::set`].
    pub fn set_filter_parameter(
        &self,
        name: &str,
        value: impl Into<FilterValue>,
    ) -> Result<(), CoreError> {
        let mut params = self.params.lock().unwrap_or_else(PoisonError::into_inner);
        params.set::<E>(name, value)?;
        debug!(kind = %E::KIND, ?params, "filter changed");
        Ok(())
    }

    pub fn set_filter_params(&self, params: FilterParams) {
        *self.params.lock().unwrap_or_else(PoisonError::into_inner) = params;
    }

    pub fn clear_filters(&self) {
        self.set_filter_params(FilterParams::new());
    }

    // ── Loading ──────────────────────────────────────────────────

    /// Reload from the remote. A failure notifies once and leaves the
    /// previous data readable.
    pub async fn refresh(&self) -> Result<LoadOutcome, CoreError> {
        match self.cache.load(&**self.coordinator.remote()).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.sink.notify(Notification::error(
                    format!("Could not load {}", plural(E::KIND.label())),
                    &err,
                ));
                Err(err)
            }
        }
    }

    // ── Mutations ────────────────────────────────────────────────

    pub async fn create_entity(&self, draft: E::Draft) -> Result<Arc<E>, CoreError> {
        self.coordinator.create(draft).await
    }

    pub async fn update_entity(&self, id: &EntityId, patch: E::Patch) -> Result<Arc<E>, CoreError> {
        self.coordinator.update(id, patch).await
    }

    pub async fn delete_entity(&self, id: &EntityId) -> Result<(), CoreError> {
        self.coordinator.delete(id).await
    }

    pub async fn toggle_pinned(&self, id: &EntityId) -> Result<Arc<E>, CoreError> {
        self.coordinator.toggle_pinned(id).await
    }
}

fn plural(label: &str) -> String {
    format!("{}s", label.to_lowercase())
}
