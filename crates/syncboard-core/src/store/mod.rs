// ── Client-side store ──
//
// `EntityCache` owns one collection and its load state; `Collection` is the
// immutable snapshot it publishes; `PendingIndex` tracks in-flight mutations
// per id.

mod cache;
mod collection;
pub(crate) mod pending;

pub use cache::{Applied, CacheState, EntityCache, LoadOutcome};
pub use collection::{Collection, Mutation, Snapshot};
