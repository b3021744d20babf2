// ── Domain model ──
//
// Canonical entity types shared by the cache, the coordinator, and the
// filter engine. Remote naming quirks never reach this module; they are
// translated in `remote::wire`.

pub mod deviation;
pub mod entity_id;
pub mod project;
pub mod task;

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use deviation::{Deviation, DeviationDraft, DeviationPatch, DeviationStatus, Severity};
pub use entity_id::EntityId;
pub use project::{Project, ProjectDraft, ProjectPatch, ProjectStatus};
pub use task::{AdditionalTask, AdditionalTaskDraft, AdditionalTaskPatch, TaskStatus};

/// The entity kinds a workspace synchronizes.
#[derive(
    Debug,
    Clone,
    Copy,
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
pub enum EntityKind {
    #[strum(to_string = "project", serialize = "projects")]
    Project,
    #[strum(to_string = "deviation", serialize = "deviations")]
    Deviation,
    #[strum(
        to_string = "additional_task",
        serialize = "additional_tasks",
        serialize = "task",
        serialize = "tasks"
    )]
    AdditionalTask,
}

impl EntityKind {
    /// Human label used in notification titles.
    pub fn label(self) -> &'static str {
        match self {
            Self::Project => "Project",
            Self::Deviation => "Deviation",
            Self::AdditionalTask => "Additional task",
        }
    }
}

/// A record the cache can hold.
///
/// Implementors describe how to build an unconfirmed record from a draft,
/// how to merge a patch, and which fields the filter engine may consult.
pub trait Entity: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Fields supplied when creating a record.
    type Draft: Clone + fmt::Debug + Send + Sync + Serialize + DeserializeOwned + 'static;
    /// Partial update; every field optional.
    type Patch: Clone + fmt::Debug + Send + Sync + Serialize + DeserializeOwned + 'static;

    const KIND: EntityKind;

    /// Names accepted by categorical filters for this kind.
    const FILTER_FIELDS: &'static [&'static str];

    fn id(&self) -> &EntityId;

    /// Name used for the secondary sort key.
    fn display_name(&self) -> &str;

    /// Free-text fields matched by the query filter.
    fn search_fields(&self) -> Vec<&str>;

    /// Value of a categorical field, if the record has one.
    fn filter_value(&self, field: &str) -> Option<Cow<'_, str>>;

    /// `None` for kinds without a pinned flag.
    fn pinned(&self) -> Option<bool> {
        None
    }

    /// Patch that sets the pinned flag, for kinds that have one.
    fn pin_patch(_pinned: bool) -> Option<Self::Patch> {
        None
    }

    /// Build a record from a draft. `created_at` is `None` for optimistic
    /// placeholders; the remote store fills it in.
    fn from_draft(id: EntityId, draft: &Self::Draft, created_at: Option<DateTime<Utc>>) -> Self;

    fn apply_patch(&mut self, patch: &Self::Patch);

    /// Reject records the remote store would refuse.
    fn validate(&self) -> Result<(), String>;
}

/// Shared rule: display names must carry non-whitespace text.
pub(crate) fn require_name(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{field} must not be blank"))
    } else {
        Ok(())
    }
}
