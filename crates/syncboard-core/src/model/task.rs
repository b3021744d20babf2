// ── Additional task domain type ──
//
// Work ordered on top of a project's agreed scope. Often raised from a
// deviation, in which case `source_deviation_id` records the origin.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::deviation::Deviation;
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
pub enum TaskStatus {
    #[default]
    Pending,
    Approved,
    InProgress,
    Done,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditionalTask {
    pub id: EntityId,
    pub title: String,
    pub description: Option<String>,
    pub project_id: Option<EntityId>,
    #[serde(default)]
    pub status: TaskStatus,
    pub estimated_hours: Option<f64>,
    pub source_deviation_id: Option<EntityId>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdditionalTaskDraft {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<EntityId>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_deviation_id: Option<EntityId>,
}

impl AdditionalTaskDraft {
    /// Draft carrying over the descriptive fields of a deviation.
    pub fn from_deviation(deviation: &Deviation) -> Self {
        Self {
            title: deviation.title.clone(),
            description: deviation.description.clone(),
            project_id: deviation.project_id.clone(),
            status: TaskStatus::Pending,
            estimated_hours: None,
            source_deviation_id: Some(deviation.id.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdditionalTaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,
}

impl Entity for AdditionalTask {
    type Draft = AdditionalTaskDraft;
    type Patch = AdditionalTaskPatch;

    const KIND: EntityKind = EntityKind::AdditionalTask;
    const FILTER_FIELDS: &'static [&'static str] = &["status", "project"];

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.title
    }

    fn search_fields(&self) -> Vec<&str> {
        [Some(self.title.as_str()), self.description.as_deref()]
            .into_iter()
            .flatten()
            .collect()
    }

    fn filter_value(&self, field: &str) -> Option<Cow<'_, str>> {
        match field {
            "status" => Some(Cow::Borrowed(self.status.as_ref())),
            "project" => self.project_id.as_ref().map(|p| Cow::Owned(p.to_string())),
            _ => None,
        }
    }

    fn from_draft(
        id: EntityId,
        draft: &AdditionalTaskDraft,
        created_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            project_id: draft.project_id.clone(),
            status: draft.status,
            estimated_hours: draft.estimated_hours,
            source_deviation_id: draft.source_deviation_id.clone(),
            created_at,
        }
    }

    fn apply_patch(&mut self, patch: &AdditionalTaskPatch) {
        if let Some(ref title) = patch.title {
            self.title.clone_from(title);
        }
        if let Some(ref description) = patch.description {
            self.description = Some(description.clone());
        }
        if let Some(ref project_id) = patch.project_id {
            self.project_id = Some(project_id.clone());
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(hours) = patch.estimated_hours {
            self.estimated_hours = Some(hours);
        }
    }

    fn validate(&self) -> Result<(), String> {
        require_name("title", &self.title)?;
        match self.estimated_hours {
            Some(h) if !h.is_finite() || h < 0.0 => {
                Err(format!("estimated_hours must be a non-negative number, got {h}"))
            }
            _ => Ok(()),
        }
    }
}
