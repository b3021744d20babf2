// ── Project domain type ──

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity_id::EntityId;
use super::{Entity, EntityKind, require_name};

/// Project lifecycle status.
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
pub enum ProjectStatus {
    #[default]
    Planned,
    Active,
    OnHold,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: EntityId,
    pub name: String,
    /// Short project number shown next to the name (e.g. "P-1042").
    pub code: Option<String>,
    pub customer: Option<String>,
    pub description: Option<String>,
    pub status: ProjectStatus,
    /// The one canonical pinned flag. Remote spellings are mapped in
    /// `remote::wire`.
    pub pinned: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectDraft {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub pinned: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
}

impl Entity for Project {
    type Draft = ProjectDraft;
    type Patch = ProjectPatch;

    const KIND: EntityKind = EntityKind::Project;
    const FILTER_FIELDS: &'static [&'static str] = &["status"];

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn search_fields(&self) -> Vec<&str> {
        [
            Some(self.name.as_str()),
            self.code.as_deref(),
            self.customer.as_deref(),
            self.description.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn filter_value(&self, field: &str) -> Option<Cow<'_, str>> {
        match field {
            "status" => Some(Cow::Borrowed(self.status.as_ref())),
            _ => None,
        }
    }

    fn pinned(&self) -> Option<bool> {
        Some(self.pinned)
    }

    fn pin_patch(pinned: bool) -> Option<ProjectPatch> {
        Some(ProjectPatch {
            pinned: Some(pinned),
            ..ProjectPatch::default()
        })
    }

    fn from_draft(id: EntityId, draft: &ProjectDraft, created_at: Option<DateTime<Utc>>) -> Self {
        Self {
            id,
            name: draft.name.clone(),
            code: draft.code.clone(),
            customer: draft.customer.clone(),
            description: draft.description.clone(),
            status: draft.status,
            pinned: draft.pinned,
            created_at,
        }
    }

    fn apply_patch(&mut self, patch: &ProjectPatch) {
        if let Some(ref name) = patch.name {
            self.name.clone_from(name);
        }
        if let Some(ref code) = patch.code {
            self.code = Some(code.clone());
        }
        if let Some(ref customer) = patch.customer {
            self.customer = Some(customer.clone());
        }
        if let Some(ref description) = patch.description {
            self.description = Some(description.clone());
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(pinned) = patch.pinned {
            self.pinned = pinned;
        }
    }

    fn validate(&self) -> Result<(), String> {
        require_name("name", &self.name)
    }
}
