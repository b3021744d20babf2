// ── Remote store contract ──
//
// The authoritative CRUD backend for one entity kind. The core only ever
// talks to a `RemoteStore`; adapters translate the backend's own naming
// and error shapes at this boundary.

mod memory;
pub mod wire;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Entity, EntityId, EntityKind};

pub use memory::{MemoryRemote, RemoteOp};
pub use wire::WireEntity;

/// Coarse error buckets surfaced to the user.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    /// Transport-level failure; the user may retry.
    Network,
    /// The remote record no longer exists.
    NotFound,
    /// Input rejected; needs correction, never retried silently.
    Validation,
    Unknown,
}

/// Failure reported by a remote store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Server error: {message}")]
    Server { message: String },

    #[error("{kind} {id} no longer exists")]
    NotFound { kind: EntityKind, id: EntityId },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Unexpected error: {message}")]
    Unknown { message: String },
}

impl RemoteError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Network { .. } => ErrorCategory::Network,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::Server { .. } | Self::Unknown { .. } => ErrorCategory::Unknown,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Authoritative CRUD backend for entity kind `E`.
///
/// Every call may suspend and may fail. Implementations never see
/// placeholder ids.
#[async_trait]
pub trait RemoteStore<E: Entity>: Send + Sync {
    /// Fetch the full collection.
    async fn list(&self) -> Result<Vec<E>, RemoteError>;

    /// Create a record; the result carries the server-assigned id and any
    /// server-computed fields.
    async fn create(&self, draft: &E::Draft) -> Result<E, RemoteError>;

    async fn update(&self, id: &EntityId, patch: &E::Patch) -> Result<E, RemoteError>;

    async fn delete(&self, id: &EntityId) -> Result<(), RemoteError>;
}

#[async_trait]
impl<E, S> RemoteStore<E> for Arc<S>
where
    E: Entity,
    S: RemoteStore<E> + ?Sized,
{
    async fn list(&self) -> Result<Vec<E>, RemoteError> {
        (**self).list().await
    }

    async fn create(&self, draft: &E::Draft) -> Result<E, RemoteError> {
        (**self).create(draft).await
    }

    async fn update(&self, id: &EntityId, patch: &E::Patch) -> Result<E, RemoteError> {
        (**self).update(id, patch).await
    }

    async fn delete(&self, id: &EntityId) -> Result<(), RemoteError> {
        (**self).delete(id).await
    }
}
