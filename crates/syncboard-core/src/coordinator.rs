// ── Mutation coordinator ──
//
// Runs create / update / delete / toggle-pinned against one cache and one
// remote store. Each mutation is applied to the cache first, then sent to
// the remote, then confirmed or rolled back. Mutations of the same id run
// one at a time in call order; a delete jumps the queue.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::{Entity, EntityId};
use crate::notify::{Notification, NotificationSink};
use crate::remote::{RemoteError, RemoteStore};
use crate::store::{Applied, EntityCache, Mutation};

/// The mutation kinds, for logging and notification titles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum MutationKind {
    Create,
    Update,
    Delete,
    TogglePinned,
}

/// Optimistic mutation runner for one entity kind.
pub struct MutationCoordinator<E: Entity> {
    cache: Arc<EntityCache<E>>,
    remote: Arc<dyn RemoteStore<E>>,
    sink: Arc<dyn NotificationSink>,
}

impl<E: Entity> MutationCoordinator<E> {
    pub fn new(
        cache: Arc<EntityCache<E>>,
        remote: Arc<dyn RemoteStore<E>>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            cache,
            remote,
            sink,
        }
    }

    pub fn cache(&self) -> &Arc<EntityCache<E>> {
        &self.cache
    }

    pub fn remote(&self) -> &Arc<dyn RemoteStore<E>> {
        &self.remote
    }

    // ── Create ───────────────────────────────────────────────────

    /// Insert a placeholder record, create it remotely, then swap the
    /// placeholder for the confirmed record. On failure the placeholder
    /// is removed.
    pub async fn create(&self, draft: E::Draft) -> Result<Arc<E>, CoreError> {
        let placeholder = EntityId::placeholder();
        let pending = self.cache.pending();
        let _permit = pending.acquire(&placeholder).await;

        let optimistic = E::from_draft(placeholder.clone(), &draft, None);
        let applied = self.cache.apply(&Mutation::Upsert(Arc::new(optimistic)));
        let version = pending.bump(&placeholder, &applied.prior);
        debug!(kind = %E::KIND, id = %placeholder, "create applied optimistically");

        let result = self.remote.create(&draft).await;
        let current = pending.is_current(&placeholder, version);

        match result {
            Ok(confirmed) => {
                let confirmed = Arc::new(confirmed);
                if current {
                    self.cache.apply(&Mutation::Replace {
                        id: placeholder,
                        entity: Arc::clone(&confirmed),
                    });
                    self.cache
                        .remember_settled(confirmed.id(), Some(Arc::clone(&confirmed)));
                } else {
                    Self::discard_stale(MutationKind::Create, &placeholder);
                }
                info!(kind = %E::KIND, id = %confirmed.id(), "created");
                self.succeed(MutationKind::Create, &confirmed);
                Ok(confirmed)
            }
            Err(err) => {
                if current {
                    self.rollback(&applied, &placeholder);
                }
                Err(self.fail(MutationKind::Create, &placeholder, err.into()))
            }
        }
    }

    // ── Update ───────────────────────────────────────────────────

    /// Merge `patch` into the record now, then persist it. The cache ends
    /// up holding the record the remote returned.
    pub async fn update(&self, id: &EntityId, patch: E::Patch) -> Result<Arc<E>, CoreError> {
        self.patch_with(MutationKind::Update, id, |_| Ok(patch))
            .await
    }

    /// Flip the pinned flag. Kinds without one are rejected.
    pub async fn toggle_pinned(&self, id: &EntityId) -> Result<Arc<E>, CoreError> {
        if E::pin_patch(false).is_none() {
            let err = CoreError::Unsupported {
                kind: E::KIND,
                operation: "toggle pinned".into(),
            };
            return Err(self.fail(MutationKind::TogglePinned, id, err));
        }

        self.patch_with(MutationKind::TogglePinned, id, |current| {
            let pinned = current.pinned().unwrap_or(false);
            E::pin_patch(!pinned).ok_or_else(|| CoreError::Unsupported {
                kind: E::KIND,
                operation: "toggle pinned".into(),
            })
        })
        .await
    }

    async fn patch_with(
        &self,
        op: MutationKind,
        id: &EntityId,
        make_patch: impl FnOnce(&E) -> Result<E::Patch, CoreError> + Send,
    ) -> Result<Arc<E>, CoreError> {
        if let Err(err) = Self::check_confirmed(id) {
            return Err(self.fail(op, id, err));
        }

        let existed = self.cache.get(id).is_some();
        let pending = self.cache.pending();
        let _permit = pending.acquire(id).await;

        // Re-read after waiting: an earlier mutation may have changed or
        // removed the record.
        let Some(current) = self.cache.get(id) else {
            let err = if existed {
                CoreError::Superseded {
                    kind: E::KIND,
                    id: id.clone(),
                }
            } else {
                CoreError::NotFound {
                    kind: E::KIND,
                    id: id.clone(),
                }
            };
            return Err(self.fail(op, id, err));
        };

        let patch = match make_patch(&current) {
            Ok(patch) => patch,
            Err(err) => return Err(self.fail(op, id, err)),
        };

        let applied = self.cache.apply(&Mutation::Patch {
            id: id.clone(),
            patch: patch.clone(),
        });
        let version = pending.bump(id, &applied.prior);
        debug!(kind = %E::KIND, %id, %op, version, "applied optimistically");

        let result = self.remote.update(id, &patch).await;
        let current = pending.is_current(id, version);

        match result {
            Ok(confirmed) => {
                let confirmed = Arc::new(confirmed);
                if pending.confirm(id, Some(Arc::clone(&confirmed)), current) {
                    self.cache.apply(&Mutation::Upsert(Arc::clone(&confirmed)));
                    self.cache.remember_settled(id, Some(Arc::clone(&confirmed)));
                } else {
                    Self::discard_stale(op, id);
                }
                self.succeed(op, &confirmed);
                Ok(confirmed)
            }
            Err(err @ RemoteError::NotFound { .. }) => {
                // Gone remotely: drop the local copy instead of restoring it.
                if pending.confirm(id, None, current) {
                    self.cache.apply(&Mutation::Remove(id.clone()));
                    self.cache.remember_settled(id, None);
                }
                Err(self.fail(op, id, err.into()))
            }
            Err(err) => {
                if current {
                    self.rollback(&applied, id);
                }
                Err(self.fail(op, id, err.into()))
            }
        }
    }

    // ── Delete ───────────────────────────────────────────────────

    /// Remove the record now and delete it remotely. Does not wait for
    /// earlier mutations of the same id: their completions are discarded,
    /// and mutations still queued behind them fail as superseded.
    pub async fn delete(&self, id: &EntityId) -> Result<(), CoreError> {
        let op = MutationKind::Delete;
        if let Err(err) = Self::check_confirmed(id) {
            return Err(self.fail(op, id, err));
        }
        if self.cache.get(id).is_none() {
            let err = CoreError::NotFound {
                kind: E::KIND,
                id: id.clone(),
            };
            return Err(self.fail(op, id, err));
        }

        let pending = self.cache.pending();
        let _permit = pending.preempt(id);
        let applied = self.cache.apply(&Mutation::Remove(id.clone()));
        let version = pending.bump(id, &applied.prior);
        debug!(kind = %E::KIND, %id, version, "delete applied optimistically");

        let result = self.remote.delete(id).await;
        let current = pending.is_current(id, version);

        match result {
            Ok(()) => {
                if pending.confirm(id, None, current) {
                    self.cache.remember_settled(id, None);
                }
                info!(kind = %E::KIND, %id, "deleted");
                self.sink.notify(Notification::success(
                    format!("{} deleted", E::KIND.label()),
                    applied
                        .prior
                        .get(id)
                        .map(|e| e.display_name().to_owned()),
                ));
                Ok(())
            }
            Err(err @ RemoteError::NotFound { .. }) => {
                // Already gone remotely; the local removal stands.
                if pending.confirm(id, None, current) {
                    self.cache.remember_settled(id, None);
                }
                Err(self.fail(op, id, err.into()))
            }
            Err(err) => {
                if current {
                    self.rollback(&applied, id);
                }
                Err(self.fail(op, id, err.into()))
            }
        }
    }

    // ── Helpers ──────────────────────────────────────────────────

    fn check_confirmed(id: &EntityId) -> Result<(), CoreError> {
        if id.is_placeholder() {
            Err(CoreError::Invalid {
                message: format!("{} {id} has not been created yet", E::KIND),
            })
        } else {
            Ok(())
        }
    }

    /// Put `id` back to the last state the remote confirmed, leaving every
    /// other record as it is now. That is the state before `applied`
    /// unless an earlier mutation of `id` was still in flight then.
    fn rollback(&self, applied: &Applied<E>, id: &EntityId) {
        debug!(kind = %E::KIND, %id, "rolling back");
        let restore = self
            .cache
            .pending()
            .rollback_of(id)
            .unwrap_or_else(|| applied.prior.restore_of(id));
        self.cache.apply(&restore);
    }

    fn discard_stale(op: MutationKind, id: &EntityId) {
        debug!(kind = %E::KIND, %id, %op, "completion superseded; cache left as is");
    }

    fn succeed(&self, op: MutationKind, entity: &E) {
        let label = E::KIND.label();
        let title = match op {
            MutationKind::Create => format!("{label} created"),
            MutationKind::Update => format!("{label} updated"),
            MutationKind::Delete => format!("{label} deleted"),
            MutationKind::TogglePinned => {
                if entity.pinned().unwrap_or(false) {
                    format!("{label} pinned")
                } else {
                    format!("{label} unpinned")
                }
            }
        };
        self.sink.notify(Notification::success(
            title,
            Some(entity.display_name().to_owned()),
        ));
    }

    /// Log and report a failure; returns the error for the caller.
    fn fail(&self, op: MutationKind, id: &EntityId, err: CoreError) -> CoreError {
        warn!(kind = %E::KIND, %id, %op, error = %err, "mutation failed");
        let verb = match op {
            MutationKind::Create => "create",
            MutationKind::Update => "update",
            MutationKind::Delete => "delete",
            MutationKind::TogglePinned => "pin or unpin",
        };
        let title = format!("Could not {verb} {}", E::KIND.label().to_lowercase());
        self.sink.notify(Notification::error(title, &err));
        err
    }
}
