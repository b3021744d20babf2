//! Optimistic client-side data layer for projects, deviations, and
//! additional tasks.
//!
//! The crate keeps a local copy of each entity collection, applies user
//! mutations to it immediately, and reconciles with a remote store in the
//! background:
//!
//! - **[`EntityCache`]**: one per kind. Publishes immutable snapshots and a
//!   load state ([`CacheState`]) through a `watch` channel; readers never
//!   observe a partially applied change.
//!
//! - **[`MutationCoordinator`]**: create / update / delete / toggle-pinned.
//!   Applies the change locally, calls the [`RemoteStore`], then confirms or
//!   rolls back that one record. Mutations of the same id run in call order
//!   and late completions of superseded mutations are discarded.
//!
//! - **Filter engine** ([`filter`]): free-text and categorical filters
//!   combined with AND; pinned records first, then case-insensitive name
//!   order. [`DerivedView`] memoizes the last result.
//!
//! - **[`NotificationSink`]**: receives exactly one [`Notification`] per
//!   mutation outcome or failed load.
//!
//! - **[`EntityView`]** and **[`Workspace`]**: the facade a UI binds to. A
//!   workspace is created per context and owns one view per kind.
//!
//! Remote payload quirks are translated in [`remote::wire`]; nothing past
//! that boundary sees them.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod filter;
pub mod model;
pub mod notify;
pub mod remote;
pub mod store;
pub mod stream;
pub mod view;
pub mod workspace;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::SyncConfig;
pub use coordinator::{MutationCoordinator, MutationKind};
pub use error::CoreError;
pub use filter::{DerivedView, FilterParams, FilterValue, collate, filter_view};
pub use notify::{
    ChannelSink, Notification, NotificationKind, NotificationSink, NullSink, TracingSink,
};
pub use remote::{ErrorCategory, MemoryRemote, RemoteError, RemoteOp, RemoteStore, WireEntity};
pub use store::{Applied, CacheState, Collection, EntityCache, LoadOutcome, Mutation, Snapshot};
pub use stream::EntityStream;
pub use view::EntityView;
pub use workspace::{Remotes, Workspace};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    AdditionalTask, AdditionalTaskDraft, AdditionalTaskPatch, Deviation, DeviationDraft,
    DeviationPatch, DeviationStatus, Entity, EntityId, EntityKind, Project, ProjectDraft,
    ProjectPatch, ProjectStatus, Severity, TaskStatus,
};
