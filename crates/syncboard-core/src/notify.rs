// ── User-facing notifications ──
//
// Every mutation outcome and every failed load produces exactly one
// `Notification`. Where it ends up is the sink's business: a channel for
// UIs, the tracing log, or nowhere.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::CoreError;
use crate::remote::ErrorCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Error,
}

/// A short message for the user about something that just happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Set for errors only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ErrorCategory>,
}

impl Notification {
    pub fn success(title: impl Into<String>, detail: Option<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            title: title.into(),
            detail,
            category: None,
        }
    }

    pub fn error(title: impl Into<String>, error: &CoreError) -> Self {
        Self {
            kind: NotificationKind::Error,
            title: title.into(),
            detail: Some(error.to_string()),
            category: Some(error.category()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == NotificationKind::Error
    }
}

/// Destination for notifications. Must never block.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Forwards notifications to an unbounded channel.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, notification: Notification) {
        // A dropped receiver means nobody is listening any more.
        let _ = self.tx.send(notification);
    }
}

/// Writes notifications to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, n: Notification) {
        match n.kind {
            NotificationKind::Success => {
                info!(title = %n.title, detail = n.detail.as_deref(), "notification");
            }
            NotificationKind::Error => {
                warn!(
                    title = %n.title,
                    detail = n.detail.as_deref(),
                    category = ?n.category,
                    "notification"
                );
            }
        }
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&self, _notification: Notification) {}
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::remote::RemoteError;

    #[test]
    fn error_carries_category_and_message() {
        let err = CoreError::from(RemoteError::validation("name must not be blank"));
        let n = Notification::error("Could not create project", &err);

        assert!(n.is_error());
        assert_eq!(n.category, Some(ErrorCategory::Validation));
        assert_eq!(
            n.detail.as_deref(),
            Some("Validation failed: name must not be blank")
        );
    }

    #[tokio::test]
    async fn channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelSink::new();
        sink.notify(Notification::success("first", None));
        sink.notify(Notification::success("second", None));

        assert_eq!(rx.recv().await.unwrap().title, "first");
        assert_eq!(rx.recv().await.unwrap().title, "second");
    }

    #[test]
    fn channel_sink_ignores_closed_receiver() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.notify(Notification::success("nobody listening", None));
    }
}
