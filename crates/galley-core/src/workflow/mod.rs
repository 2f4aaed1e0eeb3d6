//! Pure transition functions.
//!
//! Each function validates a request against a manuscript snapshot, mutates
//! the snapshot in place and returns the [`Change`] describing the timeline
//! entry, notifications and touched payment/review rows. Nothing here
//! touches the store or any external collaborator; the engine commits the
//! result and dispatches notifications afterwards.

pub mod copyedit;
pub mod decision;
pub mod payment;
pub mod publish;
pub mod submission;

use chrono::{DateTime, Utc};

use crate::actor::{Actor, Role};
use crate::error::{ErrorCode, WorkflowError};
use crate::model::{FileRef, Manuscript, Payment, Review};
use crate::notify::{Notification, NotificationKind};
use crate::timeline::{EntryDraft, TimelineEvent};

/// Everything one transition produced besides the mutated manuscript.
#[derive(Debug, Clone)]
pub struct Change {
    pub entry: EntryDraft,
    pub notifications: Vec<Notification>,
    pub payments: Vec<Payment>,
    pub reviews: Vec<Review>,
}

impl Change {
    #[must_use]
    pub fn new(
        event: TimelineEvent,
        description: impl Into<String>,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            entry: EntryDraft::new(event, description, actor.account_id.clone(), at),
            notifications: Vec::new(),
            payments: Vec::new(),
            reviews: Vec::new(),
        }
    }

    #[must_use]
    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.entry.metadata = metadata;
        self
    }

    #[must_use]
    pub fn notify(mut self, notifications: impl IntoIterator<Item = Notification>) -> Self {
        self.notifications.extend(notifications);
        self
    }

    #[must_use]
    pub fn payment(mut self, payment: Payment) -> Self {
        self.payments.push(payment);
        self
    }

    #[must_use]
    pub fn review(mut self, review: Review) -> Self {
        self.reviews.push(review);
        self
    }
}

pub(crate) const EDITORIAL: &[Role] = &[Role::Editor, Role::Admin];

/// Require the actor to be the submitter or a listed author.
pub(crate) fn require_party(
    manuscript: &Manuscript,
    actor: &Actor,
    action: &'static str,
) -> Result<(), WorkflowError> {
    if manuscript.is_party(actor) {
        Ok(())
    } else {
        Err(Actor::forbidden(
            action,
            ErrorCode::NotManuscriptParty,
            format!("{} is not an author of {}", actor.email, manuscript.id),
        ))
    }
}

/// Require the copy-editor role and the current copy-editor assignment.
pub(crate) fn require_assigned_copy_editor(
    manuscript: &Manuscript,
    actor: &Actor,
    action: &'static str,
) -> Result<(), WorkflowError> {
    actor.require_any(action, &[Role::CopyEditor])?;
    if manuscript.assigned_copy_editor.as_ref() == Some(&actor.account_id) {
        Ok(())
    } else {
        Err(Actor::forbidden(
            action,
            ErrorCode::NotAssignee,
            format!("{} is not the assigned copy editor", actor.email),
        ))
    }
}

/// Mark every file as the current version.
pub(crate) fn current_files(files: Vec<FileRef>) -> Vec<FileRef> {
    files
        .into_iter()
        .map(|mut f| {
            f.is_current_version = true;
            f
        })
        .collect()
}

/// One notification per author address.
pub(crate) fn to_authors(
    manuscript: &Manuscript,
    kind: NotificationKind,
    payload: &serde_json::Value,
) -> Vec<Notification> {
    manuscript
        .author_emails()
        .into_iter()
        .map(|email| Notification::new(kind, email, &manuscript.id, payload.clone()))
        .collect()
}

/// Notification to the assigned editor, if any.
pub(crate) fn to_editor(
    manuscript: &Manuscript,
    kind: NotificationKind,
    payload: serde_json::Value,
) -> Option<Notification> {
    manuscript
        .assigned_editor_email
        .as_ref()
        .map(|email| Notification::new(kind, email.clone(), &manuscript.id, payload))
}

pub(crate) fn non_blank(field: &'static str, value: &str) -> Result<(), WorkflowError> {
    if value.trim().is_empty() {
        Err(WorkflowError::validation(field, "must not be empty"))
    } else {
        Ok(())
    }
}

pub(crate) fn require_files(field: &'static str, files: &[FileRef]) -> Result<(), WorkflowError> {
    if files.is_empty() {
        return Err(WorkflowError::validation(field, "at least one file is required"));
    }
    if let Some(bad) = files.iter().find(|f| f.name.trim().is_empty() || f.url.trim().is_empty()) {
        return Err(WorkflowError::validation(
            field,
            format!("file {} is missing a name or location", bad.id),
        ));
    }
    Ok(())
}
