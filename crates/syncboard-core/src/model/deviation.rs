// ── Deviation domain type ──

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity_id::EntityId;
use super::{Entity, EntityKind, require_name};

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DeviationStatus {
    #[default]
    Open,
    InReview,
    Resolved,
    Closed,
}

/// A reported departure from the agreed scope of a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deviation {
    pub id: EntityId,
    pub title: String,
    pub description: Option<String>,
    pub project_id: Option<EntityId>,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub status: DeviationStatus,
    pub reported_by: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviationDraft {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<EntityId>,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub status: DeviationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_by: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DeviationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_by: Option<String>,
}

impl Entity for Deviation {
    type Draft = DeviationDraft;
    type Patch = DeviationPatch;

    const KIND: EntityKind = EntityKind::Deviation;
    const FILTER_FIELDS: &'static [&'static str] = &["status", "severity", "project"];

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.title
    }

    fn search_fields(&self) -> Vec<&str> {
        [
            Some(self.title.as_str()),
            self.description.as_deref(),
            self.reported_by.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn filter_value(&self, field: &str) -> Option<Cow<'_, str>> {
        match field {
            "status" => Some(Cow::Borrowed(self.status.as_ref())),
            "severity" => Some(Cow::Borrowed(self.severity.as_ref())),
            "project" => self.project_id.as_ref().map(|p| Cow::Owned(p.to_string())),
            _ => None,
        }
    }

    fn from_draft(
        id: EntityId,
        draft: &DeviationDraft,
        created_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            project_id: draft.project_id.clone(),
            severity: draft.severity,
            status: draft.status,
            reported_by: draft.reported_by.clone(),
            created_at,
        }
    }

    fn apply_patch(&mut self, patch: &DeviationPatch) {
        if let Some(ref title) = patch.title {
            self.title.clone_from(title);
        }
        if let Some(ref description) = patch.description {
            self.description = Some(description.clone());
        }
        if let Some(ref project_id) = patch.project_id {
            self.project_id = Some(project_id.clone());
        }
        if let Some(severity) = patch.severity {
            self.severity = severity;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(ref reported_by) = patch.reported_by {
            self.reported_by = Some(reported_by.clone());
        }
    }

    fn validate(&self) -> Result<(), String> {
        require_name("title", &self.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deviations_have_no_pinned_flag() {
        let d = Deviation::from_draft(
            EntityId::Numeric(3),
            &DeviationDraft {
                title: "Wrong rebar grade".into(),
                ..DeviationDraft::default()
            },
            None,
        );
        assert_eq!(d.pinned(), None);
        assert!(Deviation::pin_patch(true).is_none());
    }

    #[test]
    fn project_filter_uses_id_display() {
        let d = Deviation::from_draft(
            EntityId::Numeric(3),
            &DeviationDraft {
                title: "Late delivery".into(),
                project_id: Some(EntityId::Numeric(12)),
                severity: Severity::High,
                ..DeviationDraft::default()
            },
            None,
        );
        assert_eq!(d.filter_value("project").as_deref(), Some("12"));
        assert_eq!(d.filter_value("severity").as_deref(), Some("high"));
        assert_eq!(d.filter_value("status").as_deref(), Some("open"));
    }

    #[test]
    fn blank_title_is_invalid() {
        let d = Deviation::from_draft(EntityId::Numeric(1), &DeviationDraft::default(), None);
        assert!(d.validate().is_err());
    }
}
