// Shared helpers for core integration tests.
#![allow(dead_code, clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use syncboard_core::{
    Entity, EntityId, MemoryRemote, Notification, NotificationKind, Project, ProjectDraft,
    RemoteError, RemoteOp, RemoteStore, WireEntity,
};

// ── GatedRemote ─────────────────────────────────────────────────────

/// Control handle for one held remote call.
pub struct Gate {
    release: oneshot::Sender<Result<(), RemoteError>>,
    arrived: Option<oneshot::Receiver<()>>,
}

impl Gate {
    /// Wait until the held call has reached the remote.
    pub async fn arrived(&mut self) {
        if let Some(rx) = self.arrived.take() {
            rx.await.unwrap();
        }
    }

    /// Let the call through to the backing store.
    pub fn open(self) {
        let _ = self.release.send(Ok(()));
    }

    /// Fail the call without touching the backing store.
    pub fn fail(self, error: RemoteError) {
        let _ = self.release.send(Err(error));
    }
}

struct Held {
    release: oneshot::Receiver<Result<(), RemoteError>>,
    arrived: oneshot::Sender<()>,
}

/// A `MemoryRemote` whose calls can be held until the test releases them.
/// Calls without a registered gate pass straight through.
pub struct GatedRemote<E: WireEntity> {
    inner: MemoryRemote<E>,
    gates: Mutex<HashMap<RemoteOp, VecDeque<Held>>>,
    calls: Mutex<HashMap<RemoteOp, usize>>,
}

impl<E: WireEntity> GatedRemote<E> {
    pub fn new(inner: MemoryRemote<E>) -> Self {
        Self {
            inner,
            gates: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &MemoryRemote<E> {
        &self.inner
    }

    /// The backing store's record for `id`, if it has one.
    pub async fn stored(&self, id: &EntityId) -> Option<E> {
        self.inner
            .entities()
            .await
            .unwrap()
            .into_iter()
            .find(|e| e.id() == id)
    }

    /// Hold the next unheld call of `op`.
    pub fn hold(&self, op: RemoteOp) -> Gate {
        let (release_tx, release_rx) = oneshot::channel();
        let (arrived_tx, arrived_rx) = oneshot::channel();
        self.gates
            .lock()
            .unwrap()
            .entry(op)
            .or_default()
            .push_back(Held {
                release: release_rx,
                arrived: arrived_tx,
            });
        Gate {
            release: release_tx,
            arrived: Some(arrived_rx),
        }
    }

    /// Number of calls of `op` that reached this remote.
    pub fn calls(&self, op: RemoteOp) -> usize {
        self.calls.lock().unwrap().get(&op).copied().unwrap_or(0)
    }

    async fn pass(&self, op: RemoteOp) -> Result<(), RemoteError> {
        *self.calls.lock().unwrap().entry(op).or_default() += 1;
        let held = self
            .gates
            .lock()
            .unwrap()
            .get_mut(&op)
            .and_then(VecDeque::pop_front);
        match held {
            None => Ok(()),
            Some(held) => {
                let _ = held.arrived.send(());
                held.release.await.unwrap_or(Ok(()))
            }
        }
    }
}

#[async_trait]
impl<E: WireEntity> RemoteStore<E> for GatedRemote<E> {
    /// The listing is taken when the call arrives, so a held list returns
    /// what the backing store held at that moment.
    async fn list(&self) -> Result<Vec<E>, RemoteError> {
        let listing = self.inner.list().await;
        self.pass(RemoteOp::List).await?;
        listing
    }

    async fn create(&self, draft: &E::Draft) -> Result<E, RemoteError> {
        self.pass(RemoteOp::Create).await?;
        self.inner.create(draft).await
    }

    async fn update(&self, id: &EntityId, patch: &E::Patch) -> Result<E, RemoteError> {
        self.pass(RemoteOp::Update).await?;
        self.inner.update(id, patch).await
    }

    async fn delete(&self, id: &EntityId) -> Result<(), RemoteError> {
        self.pass(RemoteOp::Delete).await?;
        self.inner.delete(id).await
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

pub fn project(id: u64, name: &str, pinned: bool) -> Project {
    Project::from_draft(
        EntityId::Numeric(id),
        &ProjectDraft {
            name: name.into(),
            pinned,
            ..ProjectDraft::default()
        },
        None,
    )
}

/// Collect every notification sent so far.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(n) = rx.try_recv() {
        out.push(n);
    }
    out
}

pub fn kinds(notifications: &[Notification]) -> Vec<NotificationKind> {
    notifications.iter().map(|n| n.kind).collect()
}

/// Let spawned tasks run until they block.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
