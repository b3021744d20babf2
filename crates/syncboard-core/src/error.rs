// ── Core error types ──
//
// Remote failures arrive as `RemoteError` and are wrapped, not flattened,
// so callers can still read the category. Everything else is raised
// locally by the cache, the coordinator, or the filter engine.

use thiserror::Error;

use crate::model::{EntityId, EntityKind};
use crate::remote::{ErrorCategory, RemoteError};

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Remote failures ──────────────────────────────────────────────
    #[error(transparent)]
    Remote(#[from] RemoteError),

    // ── Local data errors ────────────────────────────────────────────
    #[error("{kind} {id} is not in the cache")]
    NotFound { kind: EntityKind, id: EntityId },

    #[error("{kind} {id} was removed before this change could run")]
    Superseded { kind: EntityKind, id: EntityId },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Operation not supported for {kind}: {operation}")]
    Unsupported {
        kind: EntityKind,
        operation: String,
    },

    #[error("Unknown filter '{field}' for {kind} (expected one of: {expected})")]
    UnknownFilter {
        kind: EntityKind,
        field: String,
        expected: String,
    },

    #[error("Invalid input: {message}")]
    Invalid { message: String },

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Workspace has been shut down")]
    ShutDown,
}

impl CoreError {
    /// Category used for user-facing notifications.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Remote(e) => e.category(),
            Self::NotFound { .. } | Self::Superseded { .. } => ErrorCategory::NotFound,
            Self::Invalid { .. } | Self::UnknownFilter { .. } => ErrorCategory::Validation,
            Self::Unsupported { .. } | Self::ShutDown => ErrorCategory::Unknown,
        }
    }

    /// Whether repeating the same action may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self.category(), ErrorCategory::Network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_category_passes_through() {
        let err = CoreError::from(RemoteError::Network {
            message: "connection reset".into(),
        });
        assert_eq!(err.category(), ErrorCategory::Network);
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "Network error: connection reset");
    }

    #[test]
    fn superseded_reads_as_not_found() {
        let err = CoreError::Superseded {
            kind: EntityKind::Project,
            id: EntityId::Numeric(4),
        };
        assert_eq!(err.category(), ErrorCategory::NotFound);
        assert!(!err.is_retryable());
    }
}
