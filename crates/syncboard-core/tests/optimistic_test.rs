#![allow(clippy::unwrap_used)]
// Ordering, rollback, and stale-completion behavior of the view facade
// against a remote whose calls complete when the test says so.

mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;

use common::{Gate, GatedRemote, drain, kinds, project, settle};
use syncboard_core::{
    CacheState, ChannelSink, CoreError, EntityId, EntityView, LoadOutcome, MemoryRemote,
    Notification, NotificationKind, Project, ProjectDraft, ProjectPatch, RemoteError, RemoteOp,
};
use tokio::sync::mpsc::UnboundedReceiver;

// ── Helpers ─────────────────────────────────────────────────────────

struct Harness {
    view: Arc<EntityView<Project>>,
    remote: Arc<GatedRemote<Project>>,
    rx: UnboundedReceiver<Notification>,
}

async fn setup(projects: Vec<Project>) -> Harness {
    let remote = Arc::new(GatedRemote::new(
        MemoryRemote::with_entities(projects).unwrap(),
    ));
    let (sink, rx) = ChannelSink::new();
    let view = Arc::new(EntityView::new(remote.clone(), Arc::new(sink)));
    view.refresh().await.unwrap();
    Harness { view, remote, rx }
}

fn rename(name: &str) -> ProjectPatch {
    ProjectPatch {
        name: Some(name.into()),
        ..ProjectPatch::default()
    }
}

fn id(n: u64) -> EntityId {
    EntityId::Numeric(n)
}

// ── Derived view ────────────────────────────────────────────────────

#[tokio::test]
async fn test_pinned_project_listed_first() {
    let h = setup(vec![project(1, "Beta", false), project(2, "Alpha", true)]).await;

    let ids: Vec<_> = h.view.items().iter().map(|p| p.id.clone()).collect();
    assert_eq!(ids, vec![id(2), id(1)]);
}

#[tokio::test]
async fn test_match_all_view_contains_every_record() {
    let h = setup(vec![
        project(1, "delta", false),
        project(2, "Charlie", true),
        project(3, "bravo", false),
        project(4, "Alpha", true),
    ])
    .await;

    h.view.set_filter_parameter("status", "all").unwrap();
    h.view.set_filter_parameter("query", "").unwrap();

    let names: Vec<_> = h.view.items().iter().map(|p| p.name.clone()).collect();
    assert_eq!(names, vec!["Alpha", "Charlie", "bravo", "delta"]);
}

// ── Create ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_shows_placeholder_until_confirmed() {
    let mut h = setup(vec![project(1, "Existing", false)]).await;
    let mut gate = h.remote.hold(RemoteOp::Create);

    let view = Arc::clone(&h.view);
    let task = tokio::spawn(async move {
        view.create_entity(ProjectDraft {
            name: "Fresh".into(),
            ..ProjectDraft::default()
        })
        .await
    });
    gate.arrived().await;

    let snapshot = h.view.snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.ids().filter(|id| id.is_placeholder()).count(), 1);

    gate.open();
    let created = task.await.unwrap().unwrap();

    let snapshot = h.view.snapshot();
    assert_eq!(snapshot.len(), 2);
    assert!(snapshot.ids().all(|id| !id.is_placeholder()));
    assert_eq!(snapshot.get(&created.id).unwrap().name, "Fresh");
    assert!(created.created_at.is_some());
    assert_eq!(kinds(&drain(&mut h.rx)), vec![NotificationKind::Success]);
}

#[tokio::test]
async fn test_create_rejected_by_validation_rolls_back() {
    let mut h = setup(vec![]).await;
    let before = h.view.snapshot();

    let err = h
        .view
        .create_entity(ProjectDraft {
            name: "   ".into(),
            ..ProjectDraft::default()
        })
        .await
        .unwrap_err();

    assert!(!err.is_retryable());
    assert_eq!(*h.view.snapshot(), *before);
    let notes = drain(&mut h.rx);
    assert_eq!(kinds(&notes), vec![NotificationKind::Error]);
    assert_eq!(
        notes[0].category,
        Some(syncboard_core::ErrorCategory::Validation)
    );
}

// ── Toggle / update rollback ────────────────────────────────────────

#[tokio::test]
async fn test_toggle_pinned_network_failure_reverts() {
    let mut h = setup(vec![project(1, "Beta", false), project(2, "Alpha", true)]).await;
    let before = h.view.snapshot();
    let mut gate = h.remote.hold(RemoteOp::Update);

    let view = Arc::clone(&h.view);
    let task = tokio::spawn(async move { view.toggle_pinned(&id(1)).await });
    gate.arrived().await;

    // Optimistic state is visible while the call is in flight.
    assert!(h.view.get(&id(1)).unwrap().pinned);

    gate.fail(RemoteError::network("connection reset"));
    let err = task.await.unwrap().unwrap_err();

    assert!(err.is_retryable());
    assert!(!h.view.get(&id(1)).unwrap().pinned);
    assert_eq!(*h.view.snapshot(), *before);
    assert_eq!(kinds(&drain(&mut h.rx)), vec![NotificationKind::Error]);
}

#[tokio::test]
async fn test_failure_on_one_id_leaves_other_id_updated() {
    let mut h = setup(vec![project(1, "One", false), project(2, "Two", false)]).await;
    let mut first = h.remote.hold(RemoteOp::Update);
    let mut second = h.remote.hold(RemoteOp::Update);

    let view = Arc::clone(&h.view);
    let t1 = tokio::spawn(async move { view.update_entity(&id(1), rename("One!")).await });
    first.arrived().await;
    let view = Arc::clone(&h.view);
    let t2 = tokio::spawn(async move { view.update_entity(&id(2), rename("Two!")).await });
    second.arrived().await;

    first.fail(RemoteError::network("timeout"));
    assert!(t1.await.unwrap().is_err());
    second.open();
    t2.await.unwrap().unwrap();

    assert_eq!(h.view.get(&id(1)).unwrap().name, "One");
    assert_eq!(h.view.get(&id(2)).unwrap().name, "Two!");
    assert_eq!(
        kinds(&drain(&mut h.rx)),
        vec![NotificationKind::Error, NotificationKind::Success]
    );
}

#[tokio::test]
async fn test_identical_patch_twice_equals_once() {
    let once = setup(vec![project(1, "A", false)]).await;
    once.view.update_entity(&id(1), rename("B")).await.unwrap();

    let twice = setup(vec![project(1, "A", false)]).await;
    twice.view.update_entity(&id(1), rename("B")).await.unwrap();
    twice.view.update_entity(&id(1), rename("B")).await.unwrap();

    assert_eq!(*once.view.snapshot(), *twice.view.snapshot());
    assert_eq!(
        once.remote.inner().records().await,
        twice.remote.inner().records().await
    );
}

// ── Same-id serialization ───────────────────────────────────────────

#[tokio::test]
async fn test_same_id_mutations_run_in_order() {
    let mut h = setup(vec![project(1, "Start", false)]).await;
    let mut first = h.remote.hold(RemoteOp::Update);

    let view = Arc::clone(&h.view);
    let t1 = tokio::spawn(async move { view.update_entity(&id(1), rename("First")).await });
    first.arrived().await;

    let view = Arc::clone(&h.view);
    let t2 = tokio::spawn(async move { view.update_entity(&id(1), rename("Second")).await });
    settle().await;

    // The second update is queued: not applied, not sent.
    assert_eq!(h.view.get(&id(1)).unwrap().name, "First");
    assert_eq!(h.remote.calls(RemoteOp::Update), 1);

    // Rolling back the first must not erase the second.
    first.fail(RemoteError::network("reset"));
    assert!(t1.await.unwrap().is_err());
    t2.await.unwrap().unwrap();

    assert_eq!(h.view.get(&id(1)).unwrap().name, "Second");
    assert_eq!(h.remote.calls(RemoteOp::Update), 2);
    assert_eq!(
        kinds(&drain(&mut h.rx)),
        vec![NotificationKind::Error, NotificationKind::Success]
    );
}

// ── Delete vs. in-flight update ─────────────────────────────────────

#[tokio::test]
async fn test_delete_while_update_in_flight_stays_deleted() {
    let mut h = setup(vec![project(1, "Doomed", false), project(2, "Kept", false)]).await;
    let mut update = h.remote.hold(RemoteOp::Update);

    let view = Arc::clone(&h.view);
    let pending = tokio::spawn(async move { view.update_entity(&id(1), rename("Late")).await });
    update.arrived().await;

    h.view.delete_entity(&id(1)).await.unwrap();
    assert!(h.view.get(&id(1)).is_none());

    // The remote accepts the late update; it must not resurrect the record.
    update.open();
    let _ = pending.await.unwrap();

    assert!(h.view.get(&id(1)).is_none());
    assert_eq!(h.view.snapshot().len(), 1);
    assert_eq!(drain(&mut h.rx).len(), 2);
}

#[tokio::test]
async fn test_delete_while_update_in_flight_ignores_late_failure() {
    let h = setup(vec![project(1, "Doomed", false)]).await;
    let mut update = h.remote.hold(RemoteOp::Update);

    let view = Arc::clone(&h.view);
    let pending = tokio::spawn(async move { view.update_entity(&id(1), rename("Late")).await });
    update.arrived().await;

    h.view.delete_entity(&id(1)).await.unwrap();

    // A failed update would normally roll back; here that would resurrect.
    update.fail(RemoteError::network("reset"));
    assert!(pending.await.unwrap().is_err());

    assert!(h.view.get(&id(1)).is_none());
    assert!(h.view.snapshot().is_empty());
}

#[tokio::test]
async fn test_update_queued_behind_delete_is_superseded() {
    let mut h = setup(vec![project(1, "Doomed", false)]).await;
    let mut first = h.remote.hold(RemoteOp::Update);

    let view = Arc::clone(&h.view);
    let t1 = tokio::spawn(async move { view.update_entity(&id(1), rename("First")).await });
    first.arrived().await;

    let view = Arc::clone(&h.view);
    let t2 = tokio::spawn(async move { view.update_entity(&id(1), rename("Queued")).await });
    settle().await;

    h.view.delete_entity(&id(1)).await.unwrap();
    // The remote no longer has the record, so the first update fails too.
    first.open();
    assert!(t1.await.unwrap().is_err());

    let err = t2.await.unwrap().unwrap_err();
    assert!(matches!(err, CoreError::Superseded { .. }));
    assert_eq!(h.remote.calls(RemoteOp::Update), 1);
    assert!(h.view.get(&id(1)).is_none());

    let notes = drain(&mut h.rx);
    assert_eq!(notes.len(), 3);
    assert_eq!(notes.iter().filter(|n| n.is_error()).count(), 2);
}

/// Hold an update of record 1 and a delete that preempts it; both calls
/// have reached the remote when this returns.
async fn update_then_delete(
    h: &Harness,
    name: &str,
) -> (
    Gate,
    tokio::task::JoinHandle<Result<Arc<Project>, CoreError>>,
    Gate,
    tokio::task::JoinHandle<Result<(), CoreError>>,
) {
    let mut update = h.remote.hold(RemoteOp::Update);
    let mut delete = h.remote.hold(RemoteOp::Delete);

    let view = Arc::clone(&h.view);
    let patch = rename(name);
    let updating = tokio::spawn(async move { view.update_entity(&id(1), patch).await });
    update.arrived().await;

    let view = Arc::clone(&h.view);
    let deleting = tokio::spawn(async move { view.delete_entity(&id(1)).await });
    delete.arrived().await;
    assert!(h.view.get(&id(1)).is_none());

    (update, updating, delete, deleting)
}

#[tokio::test]
async fn test_failed_delete_after_failed_update_restores_original() {
    let mut h = setup(vec![project(1, "Original", false), project(2, "Other", false)]).await;
    let before = h.view.snapshot();
    let (update, updating, delete, deleting) = update_then_delete(&h, "Unconfirmed").await;

    update.fail(RemoteError::network("reset"));
    assert!(updating.await.unwrap().is_err());
    delete.fail(RemoteError::network("offline"));
    assert!(deleting.await.unwrap().is_err());

    assert_eq!(h.view.get(&id(1)).unwrap().name, "Original");
    assert_eq!(h.remote.stored(&id(1)).await.unwrap().name, "Original");
    assert_eq!(*h.view.snapshot(), *before);

    let notes = drain(&mut h.rx);
    assert_eq!(kinds(&notes), vec![NotificationKind::Error, NotificationKind::Error]);
}

#[tokio::test]
async fn test_failed_delete_after_confirmed_update_restores_confirmed() {
    let h = setup(vec![project(1, "Original", false)]).await;
    let (update, updating, delete, deleting) = update_then_delete(&h, "Confirmed").await;

    update.open();
    assert_eq!(updating.await.unwrap().unwrap().name, "Confirmed");
    // The delete is still pending, so the record stays hidden.
    assert!(h.view.get(&id(1)).is_none());

    delete.fail(RemoteError::network("offline"));
    assert!(deleting.await.unwrap().is_err());

    assert_eq!(h.view.get(&id(1)).unwrap().name, "Confirmed");
    assert_eq!(h.remote.stored(&id(1)).await.unwrap().name, "Confirmed");
}

#[tokio::test]
async fn test_update_confirmed_after_failed_delete_is_shown() {
    let h = setup(vec![project(1, "Original", false)]).await;
    let (update, updating, delete, deleting) = update_then_delete(&h, "Confirmed").await;

    delete.fail(RemoteError::network("offline"));
    assert!(deleting.await.unwrap().is_err());
    assert_eq!(h.view.get(&id(1)).unwrap().name, "Original");

    update.open();
    updating.await.unwrap().unwrap();
    assert_eq!(h.view.get(&id(1)).unwrap().name, "Confirmed");
}

// ── Loads racing mutations ──────────────────────────────────────────

#[tokio::test]
async fn test_reload_keeps_in_flight_optimistic_change() {
    let h = setup(vec![project(1, "Server", false)]).await;
    let mut update = h.remote.hold(RemoteOp::Update);

    let view = Arc::clone(&h.view);
    let pending = tokio::spawn(async move { view.update_entity(&id(1), rename("Mine")).await });
    update.arrived().await;

    h.view.refresh().await.unwrap();
    assert_eq!(h.view.get(&id(1)).unwrap().name, "Mine");

    update.open();
    pending.await.unwrap().unwrap();
    assert_eq!(h.view.get(&id(1)).unwrap().name, "Mine");
}

#[tokio::test]
async fn test_reload_listed_before_delete_does_not_resurrect() {
    let h = setup(vec![project(1, "Doomed", false), project(2, "Kept", false)]).await;
    let mut list = h.remote.hold(RemoteOp::List);

    let view = Arc::clone(&h.view);
    let reload = tokio::spawn(async move { view.refresh().await });
    list.arrived().await;

    h.view.delete_entity(&id(1)).await.unwrap();
    assert!(!h.view.cache().is_pending(&id(1)));

    // The listing was taken before the delete and still contains it.
    list.open();
    reload.await.unwrap().unwrap();

    assert!(h.view.get(&id(1)).is_none());
    assert_eq!(h.view.snapshot().len(), 1);
}

#[tokio::test]
async fn test_second_load_while_loading_is_a_no_op() {
    let h = setup(vec![project(1, "A", false)]).await;
    let mut list = h.remote.hold(RemoteOp::List);

    let view = Arc::clone(&h.view);
    let first = tokio::spawn(async move { view.refresh().await });
    list.arrived().await;

    assert!(matches!(h.view.state(), CacheState::Loading { previous: Some(_) }));
    assert_eq!(h.view.items().len(), 1);

    let second = h.view.refresh().await.unwrap();
    assert_eq!(second, LoadOutcome::AlreadyLoading);

    list.open();
    assert_eq!(
        first.await.unwrap().unwrap(),
        LoadOutcome::Loaded { count: 1 }
    );
    assert!(matches!(h.view.state(), CacheState::Ready(_)));
}

#[tokio::test]
async fn test_failed_load_keeps_stale_data_and_notifies_once() {
    let mut h = setup(vec![project(1, "A", false)]).await;
    let list = h.remote.hold(RemoteOp::List);
    list.fail(RemoteError::Server {
        message: "502".into(),
    });

    assert!(h.view.refresh().await.is_err());
    assert_eq!(h.view.items().len(), 1);
    assert!(h.view.error().unwrap().contains("502"));

    let notes = drain(&mut h.rx);
    assert_eq!(kinds(&notes), vec![NotificationKind::Error]);
    assert_eq!(notes[0].category, Some(syncboard_core::ErrorCategory::Unknown));
}
