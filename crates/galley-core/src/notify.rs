//! Fire-and-forget notification side channel.
//!
//! Notifications are produced by transitions and dispatched only after the
//! transition has committed. Delivery failures are logged and absorbed.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

use crate::model::ManuscriptId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    SubmissionReceived,
    EditorAssigned,
    ReviewerAssigned,
    ReviewSubmitted,
    DecisionIssued,
    PaymentRequested,
    PaymentStatusChanged,
    RevisionReceived,
    CopyEditorAssigned,
    CopyEditingStarted,
    DraftReadyForReview,
    AuthorApprovedDraft,
    AuthorRequestedChanges,
    GalleyProofReady,
    CopyEditConfirmed,
    ManuscriptPublished,
}

impl NotificationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SubmissionReceived => "submission-received",
            Self::EditorAssigned => "editor-assigned",
            Self::ReviewerAssigned => "reviewer-assigned",
            Self::ReviewSubmitted => "review-submitted",
            Self::DecisionIssued => "decision-issued",
            Self::PaymentRequested => "payment-requested",
            Self::PaymentStatusChanged => "payment-status-changed",
            Self::RevisionReceived => "revision-received",
            Self::CopyEditorAssigned => "copy-editor-assigned",
            Self::CopyEditingStarted => "copy-editing-started",
            Self::DraftReadyForReview => "draft-ready-for-review",
            Self::AuthorApprovedDraft => "author-approved-draft",
            Self::AuthorRequestedChanges => "author-requested-changes",
            Self::GalleyProofReady => "galley-proof-ready",
            Self::CopyEditConfirmed => "copy-edit-confirmed",
            Self::ManuscriptPublished => "manuscript-published",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed event addressed to one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    /// Recipient e-mail address.
    pub recipient: String,
    pub manuscript_id: ManuscriptId,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Notification {
    #[must_use]
    pub fn new(
        kind: NotificationKind,
        recipient: impl Into<String>,
        manuscript_id: &ManuscriptId,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            kind,
            recipient: recipient.into(),
            manuscript_id: manuscript_id.clone(),
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    #[error("delivery to {recipient} failed: {reason}")]
    Delivery { recipient: String, reason: String },

    #[error("notification channel closed")]
    Closed,
}

pub trait NotificationSink: Send + Sync {
    /// Deliver one notification.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] on delivery failure. Callers absorb it.
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Deliver every notification, logging and absorbing failures.
///
/// Returns the number delivered.
pub fn dispatch(sink: &dyn NotificationSink, notifications: &[Notification]) -> usize {
    let mut delivered = 0;
    for notification in notifications {
        match sink.notify(notification) {
            Ok(()) => delivered += 1,
            Err(err) => warn!(
                kind = %notification.kind,
                recipient = %notification.recipient,
                manuscript = %notification.manuscript_id,
                error = %err,
                "notification dropped"
            ),
        }
    }
    delivered
}

/// Writes notifications to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            kind = %notification.kind,
            recipient = %notification.recipient,
            manuscript = %notification.manuscript_id,
            payload = %notification.payload,
            "notification"
        );
        Ok(())
    }
}

/// Keeps delivered notifications in memory. Can be switched to fail.
#[derive(Debug, Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<Notification>>,
    failing: AtomicBool,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent delivery fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    #[must_use]
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Drain and return everything recorded so far.
    pub fn take(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .map(|mut s| std::mem::take(&mut *s))
            .unwrap_or_default()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Delivery {
                recipient: notification.recipient.clone(),
                reason: "sink configured to fail".into(),
            });
        }
        let mut sent = self.sent.lock().map_err(|_| NotifyError::Closed)?;
        sent.push(notification.clone());
        Ok(())
    }
}

/// Forwards notifications to a worker thread that owns the real sink, so a
/// slow sink never blocks a transition.
#[derive(Debug)]
pub struct BackgroundSink {
    tx: Option<Sender<Notification>>,
    worker: Option<JoinHandle<usize>>,
}

impl BackgroundSink {
    pub fn spawn(inner: Arc<dyn NotificationSink>) -> Self {
        let (tx, rx) = mpsc::channel::<Notification>();
        let worker = std::thread::spawn(move || {
            let mut delivered = 0;
            for notification in rx {
                delivered += dispatch(inner.as_ref(), std::slice::from_ref(&notification));
            }
            debug!(delivered, "notification worker stopped");
            delivered
        });
        Self {
            tx: Some(tx),
            worker: Some(worker),
        }
    }

    /// Close the queue and wait for the worker to drain it.
    ///
    /// Returns the number of notifications the worker delivered.
    pub fn shutdown(mut self) -> usize {
        self.stop()
    }

    fn stop(&mut self) -> usize {
        drop(self.tx.take());
        self.worker
            .take()
            .and_then(|worker| worker.join().ok())
            .unwrap_or(0)
    }
}

impl NotificationSink for BackgroundSink {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.tx
            .as_ref()
            .ok_or(NotifyError::Closed)?
            .send(notification.clone())
            .map_err(|_| NotifyError::Closed)
    }
}

impl Drop for BackgroundSink {
    fn drop(&mut self) {
        self.stop();
    }
}
