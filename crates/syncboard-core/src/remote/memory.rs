// ── In-memory remote store ──
//
// Holds wire-format records and speaks the `RemoteStore` contract through
// the `WireEntity` translation, exactly like a real backend adapter would.
// Used by the CLI (backed by a JSON data file) and by tests, which can
// script one-shot failures per operation.

use std::collections::{HashMap, VecDeque};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use super::wire::WireEntity;
use super::{RemoteError, RemoteStore};
use crate::model::{Entity, EntityId};

/// Remote operations, used to target scripted failures.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RemoteOp {
    List,
    Create,
    Update,
    Delete,
}

/// A `RemoteStore` over an in-process map of wire records.
pub struct MemoryRemote<E: WireEntity> {
    records: Mutex<IndexMap<EntityId, serde_json::Value>>,
    next_id: AtomicU64,
    failures: Mutex<HashMap<RemoteOp, VecDeque<RemoteError>>>,
    _kind: PhantomData<fn() -> E>,
}

impl<E: WireEntity> MemoryRemote<E> {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(IndexMap::new()),
            next_id: AtomicU64::new(1),
            failures: Mutex::new(HashMap::new()),
            _kind: PhantomData,
        }
    }

    /// Seed from raw wire records. Every record must decode; numeric ids
    /// advance the id sequence past the highest one seen.
    pub fn from_records(records: Vec<serde_json::Value>) -> Result<Self, RemoteError> {
        let mut map = IndexMap::with_capacity(records.len());
        let mut max_numeric = 0;

        for raw in records {
            let entity = E::decode(raw)?;
            let id = entity.id().clone();
            if let Some(n) = id.as_numeric() {
                max_numeric = max_numeric.max(n);
            }
            // Re-encode so stored records use the canonical wire spelling.
            map.insert(id, entity.encode()?);
        }

        Ok(Self {
            records: Mutex::new(map),
            next_id: AtomicU64::new(max_numeric + 1),
            failures: Mutex::new(HashMap::new()),
            _kind: PhantomData,
        })
    }

    /// Seed from canonical entities.
    pub fn with_entities(entities: impl IntoIterator<Item = E>) -> Result<Self, RemoteError> {
        let records = entities
            .into_iter()
            .map(|e| e.encode())
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_records(records)
    }

    /// Current wire records, in insertion order.
    pub async fn records(&self) -> Vec<serde_json::Value> {
        self.records.lock().await.values().cloned().collect()
    }

    /// Decoded view of the stored records.
    pub async fn entities(&self) -> Result<Vec<E>, RemoteError> {
        let records = self.records.lock().await;
        records.values().cloned().map(E::decode).collect()
    }

    /// Make the next call of `op` fail with `error`. Failures queue up
    /// and are consumed one per call.
    pub async fn fail_next(&self, op: RemoteOp, error: RemoteError) {
        self.failures
            .lock()
            .await
            .entry(op)
            .or_default()
            .push_back(error);
    }

    async fn scripted_failure(&self, op: RemoteOp) -> Result<(), RemoteError> {
        let mut failures = self.failures.lock().await;
        match failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => {
                debug!(kind = %E::KIND, %op, error = %err, "scripted remote failure");
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn not_found(id: &EntityId) -> RemoteError {
        RemoteError::NotFound {
            kind: E::KIND,
            id: id.clone(),
        }
    }
}

impl<E: WireEntity> Default for MemoryRemote<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: WireEntity> RemoteStore<E> for MemoryRemote<E> {
    async fn list(&self) -> Result<Vec<E>, RemoteError> {
        self.scripted_failure(RemoteOp::List).await?;
        self.entities().await
    }

    async fn create(&self, draft: &E::Draft) -> Result<E, RemoteError> {
        self.scripted_failure(RemoteOp::Create).await?;

        let id = EntityId::Numeric(self.next_id.fetch_add(1, Ordering::Relaxed));
        let entity = E::from_draft(id.clone(), draft, Some(Utc::now()));
        entity.validate().map_err(RemoteError::validation)?;

        self.records.lock().await.insert(id, entity.encode()?);
        Ok(entity)
    }

    async fn update(&self, id: &EntityId, patch: &E::Patch) -> Result<E, RemoteError> {
        self.scripted_failure(RemoteOp::Update).await?;

        let mut records = self.records.lock().await;
        let raw = records.get(id).cloned().ok_or_else(|| Self::not_found(id))?;

        let mut entity = E::decode(raw)?;
        entity.apply_patch(patch);
        entity.validate().map_err(RemoteError::validation)?;

        records.insert(id.clone(), entity.encode()?);
        Ok(entity)
    }

    async fn delete(&self, id: &EntityId) -> Result<(), RemoteError> {
        self.scripted_failure(RemoteOp::Delete).await?;

        self.records
            .lock()
            .await
            .shift_remove(id)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Project, ProjectDraft, ProjectPatch};
    use serde_json::json;

    fn seeded() -> MemoryRemote<Project> {
        MemoryRemote::from_records(vec![
            json!({ "id": 1, "name": "Beta", "isPinned": false }),
            json!({ "id": 4, "name": "Alpha", "is_pinned": true }),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn create_assigns_next_numeric_id_and_timestamp() {
        let remote = seeded();
        let created = remote
            .create(&ProjectDraft {
                name: "Gamma".into(),
                ..ProjectDraft::default()
            })
            .await
            .unwrap();

        assert_eq!(created.id, EntityId::Numeric(5));
        assert!(created.created_at.is_some());
        assert_eq!(remote.records().await.len(), 3);
    }

    #[tokio::test]
    async fn create_rejects_blank_name() {
        let remote = seeded();
        let err = remote.create(&ProjectDraft::default()).await.unwrap_err();
        assert!(matches!(err, RemoteError::Validation { .. }));
        assert_eq!(remote.records().await.len(), 2);
    }

    #[tokio::test]
    async fn stored_records_use_canonical_pinned_spelling() {
        let remote = seeded();
        for record in remote.records().await {
            assert!(record.get("isPinned").is_none());
            assert!(record.get("is_pinned").is_some());
        }
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() {
        let remote = seeded();
        let err = remote
            .update(&EntityId::Numeric(99), &ProjectPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::NotFound { .. }));
    }

    #[tokio::test]
    async fn scripted_failures_are_consumed_once() {
        let remote = seeded();
        remote
            .fail_next(RemoteOp::Delete, RemoteError::network("offline"))
            .await;

        let id = EntityId::Numeric(1);
        assert!(remote.delete(&id).await.is_err());
        remote.delete(&id).await.unwrap();
        assert!(matches!(
            remote.delete(&id).await,
            Err(RemoteError::NotFound { .. })
        ));
    }
}
