// ── Workspace ──
//
// The explicit per-context store object: one view per entity kind, one
// shared notification sink, and the background refresh lifecycle. Create
// one per UI context and pass it down; there is no global instance.

use std::sync::{Arc, Weak};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::CoreError;
use crate::model::{AdditionalTask, AdditionalTaskDraft, Deviation, Entity, EntityId, Project};
use crate::notify::{Notification, NotificationSink};
use crate::remote::RemoteStore;
use crate::view::EntityView;

/// Remote stores for every entity kind.
pub struct Remotes {
    pub projects: Arc<dyn RemoteStore<Project>>,
    pub deviations: Arc<dyn RemoteStore<Deviation>>,
    pub additional_tasks: Arc<dyn RemoteStore<AdditionalTask>>,
}

/// Views over every entity kind with a shared lifecycle.
///
/// Cheaply cloneable. Dropping the last handle cancels background tasks.
#[derive(Clone)]
pub struct Workspace {
    inner: Arc<WorkspaceInner>,
}

struct WorkspaceInner {
    config: SyncConfig,
    projects: EntityView<Project>,
    deviations: EntityView<Deviation>,
    additional_tasks: EntityView<AdditionalTask>,
    sink: Arc<dyn NotificationSink>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Drop for WorkspaceInner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl Workspace {
    /// Build the views. Nothing is loaded until [`start()`](Self::start).
    pub fn new(config: SyncConfig, remotes: Remotes, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            inner: Arc::new(WorkspaceInner {
                config,
                projects: EntityView::new(remotes.projects, Arc::clone(&sink)),
                deviations: EntityView::new(remotes.deviations, Arc::clone(&sink)),
                additional_tasks: EntityView::new(remotes.additional_tasks, Arc::clone(&sink)),
                sink,
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    pub fn projects(&self) -> &EntityView<Project> {
        &self.inner.projects
    }

    pub fn deviations(&self) -> &EntityView<Deviation> {
        &self.inner.deviations
    }

    pub fn additional_tasks(&self) -> &EntityView<AdditionalTask> {
        &self.inner.additional_tasks
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Run the initial load (if configured) and spawn the periodic
    /// refresh task (if an interval is set).
    ///
    /// A failed initial load of one kind does not stop the others; the
    /// first failure is returned after all have run.
    pub async fn start(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::ShutDown);
        }

        let loaded = if self.inner.config.load_on_start {
            self.refresh_all().await
        } else {
            Ok(())
        };

        if let Some(interval) = self.inner.config.refresh_interval() {
            let weak = Arc::downgrade(&self.inner);
            let cancel = self.inner.cancel.child_token();
            let handle = tokio::spawn(refresh_task(weak, interval, cancel));
            self.inner.task_handles.lock().await.push(handle);
            debug!(interval_secs = interval.as_secs(), "refresh task spawned");
        }

        info!("workspace started");
        loaded
    }

    /// Reload every kind concurrently.
    pub async fn refresh_all(&self) -> Result<(), CoreError> {
        refresh_views(&self.inner).await
    }

    /// Cancel background tasks and wait for them to finish.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("workspace shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    // ── Composite operations ─────────────────────────────────────

    /// Create an additional task from a deviation. The deviation itself
    /// is left untouched whatever the outcome.
    pub async fn convert_deviation_to_task(
        &self,
        deviation_id: &EntityId,
    ) -> Result<Arc<AdditionalTask>, CoreError> {
        let Some(deviation) = self.deviations().get(deviation_id) else {
            let err = CoreError::NotFound {
                kind: Deviation::KIND,
                id: deviation_id.clone(),
            };
            warn!(id = %deviation_id, "cannot convert unknown deviation");
            self.inner
                .sink
                .notify(Notification::error("Could not convert deviation", &err));
            return Err(err);
        };

        let draft = AdditionalTaskDraft::from_deviation(&deviation);
        debug!(id = %deviation_id, "converting deviation to additional task");
        self.additional_tasks().create_entity(draft).await
    }
}

async fn refresh_views(inner: &WorkspaceInner) -> Result<(), CoreError> {
    let (projects, deviations, tasks) = tokio::join!(
        inner.projects.refresh(),
        inner.deviations.refresh(),
        inner.additional_tasks.refresh(),
    );
    projects?;
    deviations?;
    tasks?;
    Ok(())
}

/// Periodically reload every kind. Holds only a weak handle so that
/// dropping the workspace ends the task.
async fn refresh_task(
    inner: Weak<WorkspaceInner>,
    interval: std::time::Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let Some(inner) = inner.upgrade() else { break };
                if let Err(e) = refresh_views(&inner).await {
                    warn!(error = %e, "periodic refresh failed");
                }
            }
        }
    }
}
