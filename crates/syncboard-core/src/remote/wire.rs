// ── Wire records (anti-corruption layer) ──
//
// Remote payloads are decoded into these records and converted to the
// canonical model here, and only here. The project backend publishes the
// pinned flag as both `is_pinned` and `isPinned`; the record accepts
// either, rejects disagreement, and writes back `is_pinned` alone.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::model::{
    AdditionalTask, Deviation, Entity, EntityId, Project, ProjectStatus,
};

use super::RemoteError;

/// An entity with a remote record representation.
pub trait WireEntity: Entity {
    type Record: Serialize + DeserializeOwned + Send + Sync;

    fn to_record(&self) -> Self::Record;

    fn from_record(record: Self::Record) -> Result<Self, RemoteError>;

    /// Decode a raw JSON payload.
    fn decode(value: serde_json::Value) -> Result<Self, RemoteError> {
        let record: Self::Record = serde_json::from_value(value).map_err(|e| RemoteError::Server {
            message: format!("malformed {} record: {e}", Self::KIND),
        })?;
        Self::from_record(record)
    }

    /// Encode into a raw JSON payload.
    fn encode(&self) -> Result<serde_json::Value, RemoteError> {
        serde_json::to_value(self.to_record()).map_err(|e| RemoteError::Unknown {
            message: format!("cannot encode {} record: {e}", Self::KIND),
        })
    }
}

// ── Project ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_pinned: Option<bool>,
    #[serde(rename = "isPinned", default, skip_serializing)]
    pub is_pinned_camel: Option<bool>,
    #[serde(default, alias = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl WireEntity for Project {
    type Record = ProjectRecord;

    fn to_record(&self) -> ProjectRecord {
        ProjectRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            code: self.code.clone(),
            customer: self.customer.clone(),
            description: self.description.clone(),
            status: self.status,
            is_pinned: Some(self.pinned),
            is_pinned_camel: None,
            created_at: self.created_at,
        }
    }

    fn from_record(record: ProjectRecord) -> Result<Self, RemoteError> {
        let pinned = match (record.is_pinned, record.is_pinned_camel) {
            (Some(a), Some(b)) if a != b => {
                return Err(RemoteError::Server {
                    message: format!(
                        "project {} reports conflicting pinned flags (is_pinned={a}, isPinned={b})",
                        record.id
                    ),
                });
            }
            (Some(flag), _) | (None, Some(flag)) => flag,
            (None, None) => false,
        };

        Ok(Project {
            id: record.id,
            name: record.name,
            code: record.code,
            customer: record.customer,
            description: record.description,
            status: record.status,
            pinned,
            created_at: record.created_at,
        })
    }
}

// ── Deviation / AdditionalTask ──────────────────────────────────────
//
// These backends already use the canonical field names.

impl WireEntity for Deviation {
    type Record = Deviation;

    fn to_record(&self) -> Deviation {
        self.clone()
    }

    fn from_record(record: Deviation) -> Result<Self, RemoteError> {
        Ok(record)
    }
}

impl WireEntity for AdditionalTask {
    type Record = AdditionalTask;

    fn to_record(&self) -> AdditionalTask {
        self.clone()
    }

    fn from_record(record: AdditionalTask) -> Result<Self, RemoteError> {
        Ok(record)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn project_accepts_camel_case_pinned() {
        let p = Project::decode(json!({ "id": 1, "name": "Quay", "isPinned": true })).unwrap();
        assert!(p.pinned);
    }

    #[test]
    fn project_accepts_snake_case_pinned() {
        let p = Project::decode(json!({ "id": 1, "name": "Quay", "is_pinned": true })).unwrap();
        assert!(p.pinned);
    }

    #[test]
    fn project_rejects_disagreeing_pinned_flags() {
        let err = Project::decode(json!({
            "id": 1, "name": "Quay", "is_pinned": true, "isPinned": false
        }))
        .unwrap_err();
        assert!(matches!(err, RemoteError::Server { .. }));
    }

    #[test]
    fn project_encodes_single_pinned_field() {
        let p = Project::decode(json!({ "id": 5, "name": "Quay", "isPinned": true })).unwrap();
        let out = p.encode().unwrap();
        assert_eq!(out["is_pinned"], json!(true));
        assert!(out.get("isPinned").is_none());
        assert!(out.get("pinned").is_none());
    }

    #[test]
    fn missing_pinned_defaults_to_false() {
        let p = Project::decode(json!({ "id": 2, "name": "Dock", "status": "active" })).unwrap();
        assert!(!p.pinned);
        assert_eq!(p.status, ProjectStatus::Active);
    }

    #[test]
    fn malformed_record_is_a_server_error() {
        let err = Deviation::decode(json!({ "id": 1 })).unwrap_err();
        assert!(matches!(err, RemoteError::Server { .. }));
    }
}
