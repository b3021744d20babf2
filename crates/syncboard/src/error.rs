//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use syncboard_config::ConfigError;
use syncboard_core::{CoreError, EntityKind, ErrorCategory, RemoteError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const UNSUPPORTED: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Records ──────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(syncboard::not_found),
        help("Run: syncboard {list_command} to see available records")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("{message}")]
    #[diagnostic(
        code(syncboard::superseded),
        help("The record was removed by an earlier change; nothing was written.")
    )]
    Superseded { message: String },

    #[error("Operation '{operation}' is not supported for {resource_type}s")]
    #[diagnostic(code(syncboard::unsupported))]
    Unsupported {
        operation: String,
        resource_type: String,
    },

    // ── Store ────────────────────────────────────────────────────────
    #[error("Store unavailable: {message}")]
    #[diagnostic(
        code(syncboard::unavailable),
        help("The change was rolled back. Try again once the store is reachable.")
    )]
    Unavailable { message: String },

    #[error("Store error: {message}")]
    #[diagnostic(code(syncboard::store))]
    Store { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(syncboard::validation))]
    Validation { field: String, reason: String },

    // ── Data file ────────────────────────────────────────────────────
    #[error("Could not read data file {path}")]
    #[diagnostic(
        code(syncboard::data_file),
        help("Check the file is valid JSON with projects, deviations, and additional_tasks arrays.")
    )]
    DataFile {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(syncboard::config),
        help("Inspect the config with: syncboard config show")
    )]
    Config(#[from] ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(syncboard::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Superseded { .. } => exit_code::CONFLICT,
            Self::Unsupported { .. } => exit_code::UNSUPPORTED,
            Self::Unavailable { .. } => exit_code::CONNECTION,
            Self::Validation { .. } | Self::Config(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { kind, id }
            | CoreError::Remote(RemoteError::NotFound { kind, id }) => CliError::NotFound {
                resource_type: kind.label().to_lowercase(),
                identifier: id.to_string(),
                list_command: format!("{} list", list_command(kind)),
            },

            err @ CoreError::Superseded { .. } => CliError::Superseded {
                message: err.to_string(),
            },

            CoreError::Unsupported { kind, operation } => CliError::Unsupported {
                operation,
                resource_type: kind.label().to_lowercase(),
            },

            CoreError::UnknownFilter {
                field, expected, ..
            } => CliError::Validation {
                field: format!("filter '{field}'"),
                reason: format!("expected one of: {expected}"),
            },

            CoreError::Invalid { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Remote(remote) => match remote.category() {
                ErrorCategory::Network => CliError::Unavailable {
                    message: remote.to_string(),
                },
                ErrorCategory::Validation => CliError::Validation {
                    field: "record".into(),
                    reason: remote.to_string(),
                },
                ErrorCategory::NotFound | ErrorCategory::Unknown => CliError::Store {
                    message: remote.to_string(),
                },
            },

            err @ CoreError::ShutDown => CliError::Store {
                message: err.to_string(),
            },
        }
    }
}

/// Subcommand that lists records of `kind`.
pub fn list_command(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Project => "projects",
        EntityKind::Deviation => "deviations",
        EntityKind::AdditionalTask => "tasks",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncboard_core::EntityId;

    #[test]
    fn network_failures_map_to_connection_exit_code() {
        let err = CliError::from(CoreError::from(RemoteError::network("offline")));
        assert_eq!(err.exit_code(), exit_code::CONNECTION);
    }

    #[test]
    fn missing_record_points_at_list_command() {
        let err = CliError::from(CoreError::NotFound {
            kind: EntityKind::AdditionalTask,
            id: EntityId::Numeric(3),
        });
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
        match err {
            CliError::NotFound { list_command, .. } => assert_eq!(list_command, "tasks list"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
