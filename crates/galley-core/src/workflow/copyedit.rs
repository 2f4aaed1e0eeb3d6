//! Copy-editing sub-workflow, nested inside the `accepted` status once a
//! copy editor has been assigned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{
    Change, EDITORIAL, current_files, non_blank, require_assigned_copy_editor, require_files,
    require_party, to_authors, to_editor,
};
use crate::actor::{Account, Actor, Role};
use crate::error::WorkflowError;
use crate::guard::{Clearance, payment_clearance};
use crate::model::{
    Approval, AuthorCopyEditReview, CopyEditStage, CopyEditorAssignment, DraftStatus, FileRef,
    GalleyProof, Manuscript, ManuscriptStatus, Payment,
};
use crate::notify::{Notification, NotificationKind};
use crate::timeline::TimelineEvent;

fn in_production(manuscript: &Manuscript, action: &'static str) -> Result<CopyEditStage, WorkflowError> {
    match (manuscript.status, manuscript.copy_edit_stage) {
        (ManuscriptStatus::Accepted, Some(stage)) if stage != CopyEditStage::AcceptedAwaitingCopyEdit => {
            Ok(stage)
        }
        (ManuscriptStatus::Accepted, _) => Err(WorkflowError::transition(
            action,
            manuscript.status,
            "no copy editor has been assigned yet",
        )),
        (status, _) => Err(WorkflowError::transition(
            action,
            status,
            "copy editing happens only after acceptance",
        )),
    }
}

fn advance(
    manuscript: &mut Manuscript,
    action: &'static str,
    target: CopyEditStage,
) -> Result<(), WorkflowError> {
    let stage = in_production(manuscript, action)?;
    stage
        .can_advance_to(target)
        .map_err(|e| WorkflowError::transition(action, manuscript.status, e.to_string()))?;
    manuscript.copy_edit_stage = Some(target);
    Ok(())
}

fn assignment_mut<'a>(
    manuscript: &'a mut Manuscript,
    action: &'static str,
) -> Result<&'a mut CopyEditorAssignment, WorkflowError> {
    let status = manuscript.status;
    manuscript
        .copy_editor_assignment
        .as_mut()
        .ok_or_else(|| WorkflowError::transition(action, status, "no copy editor assignment"))
}

/// Assign or replace the copy editor.
///
/// The first assignment moves the stage from `accepted-awaiting-copy-edit`
/// to `in-copy-editing`; the status stays `accepted`. Later assignments
/// replace the assignee and carry existing galley proofs over; refused once
/// the manuscript is ready for publication.
///
/// # Errors
///
/// Authorization unless editor/admin; state conflict outside `accepted`;
/// validation if the assignee lacks the
/// copy-editor role or the payment gate is closed.
pub fn assign_copy_editor(
    manuscript: &mut Manuscript,
    actor: &Actor,
    copy_editor: &Account,
    payments: &[Payment],
    due_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Change, WorkflowError> {
    const ACTION: &str = "assign copy editor";
    actor.require_any(ACTION, EDITORIAL)?;
    let starting = match (manuscript.status, manuscript.copy_edit_stage) {
        (ManuscriptStatus::Accepted, Some(CopyEditStage::AcceptedAwaitingCopyEdit)) => true,
        (ManuscriptStatus::Accepted, Some(stage)) if stage.allows_copy_editor_assignment() => false,
        (ManuscriptStatus::Accepted, _) => {
            return Err(WorkflowError::transition(
                ACTION,
                manuscript.status,
                "copy editing is already confirmed",
            ));
        }
        (status, _) => {
            return Err(WorkflowError::transition(
                ACTION,
                status,
                "copy editors are assigned only after acceptance",
            ));
        }
    };
    if !copy_editor.roles.contains(Role::CopyEditor) {
        return Err(WorkflowError::validation(
            "copy_editor",
            format!("{} does not hold the copy-editor role", copy_editor.email),
        ));
    }
    let clearance = payment_clearance(manuscript, payments)?;

    if starting {
        manuscript.copy_edit_stage = Some(CopyEditStage::InCopyEditing);
    }

    let previous = manuscript.copy_editor_assignment.take();
    let previous_id = previous.as_ref().map(|a| a.copy_editor.clone());
    let (galley_proofs, notes) = previous
        .map(|a| (a.galley_proofs, a.notes))
        .unwrap_or_default();
    manuscript.assigned_copy_editor = Some(copy_editor.id.clone());
    manuscript.copy_editor_assignment = Some(CopyEditorAssignment {
        copy_editor: copy_editor.id.clone(),
        copy_editor_email: copy_editor.email.clone(),
        assigned_by: actor.account_id.clone(),
        assigned_at: now,
        started_at: now,
        due_date,
        completed_at: None,
        draft_ready_at: None,
        notes,
        galley_proofs,
        completion_confirmed: false,
        confirmed_at: None,
    });

    let cleared_by = match &clearance {
        Clearance::FeeWaived => json!("fee-waived"),
        Clearance::Paid(id) => json!(id),
    };
    let mut notifications = vec![Notification::new(
        NotificationKind::CopyEditorAssigned,
        copy_editor.email.clone(),
        &manuscript.id,
        json!({"title": manuscript.title, "due_date": due_date}),
    )];
    notifications.extend(to_authors(
        manuscript,
        NotificationKind::CopyEditingStarted,
        &json!({"due_date": due_date}),
    ));

    Ok(Change::new(
        TimelineEvent::CopyEditorAssigned,
        format!("Copy editor {} assigned", copy_editor.name),
        actor,
        now,
    )
    .metadata(json!({
        "copy_editor": copy_editor.id,
        "previous_copy_editor": previous_id,
        "due_date": due_date,
        "cleared_by": cleared_by,
    }))
    .notify(notifications))
}

/// Hand the copy-edited draft to the authors.
///
/// # Errors
///
/// Authorization unless the actor is the assigned copy editor; state
/// conflict outside `in-copy-editing`/`revision`.
pub fn mark_draft_ready(
    manuscript: &mut Manuscript,
    actor: &Actor,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> Result<Change, WorkflowError> {
    const ACTION: &str = "mark draft ready";
    require_assigned_copy_editor(manuscript, actor, ACTION)?;
    advance(manuscript, ACTION, CopyEditStage::DraftReady)?;
    let assignment = assignment_mut(manuscript, ACTION)?;
    assignment.completed_at = Some(now);
    assignment.draft_ready_at = Some(now);
    if notes.is_some() {
        assignment.notes.clone_from(&notes);
    }
    manuscript.draft_status = Some(DraftStatus::AwaitingAuthorReview);

    Ok(Change::new(
        TimelineEvent::CopyEditDraftReady,
        "Copy-edited draft ready for author review",
        actor,
        now,
    )
    .metadata(json!({"notes": notes}))
    .notify(to_authors(
        manuscript,
        NotificationKind::DraftReadyForReview,
        &json!({"notes": notes}),
    )))
}

/// Return to copy editing after the authors requested changes.
///
/// # Errors
///
/// Authorization unless the actor is the assigned copy editor; state
/// conflict unless the stage is `revision`.
pub fn resume_copy_editing(
    manuscript: &mut Manuscript,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<Change, WorkflowError> {
    const ACTION: &str = "resume copy editing";
    require_assigned_copy_editor(manuscript, actor, ACTION)?;
    advance(manuscript, ACTION, CopyEditStage::InCopyEditing)?;
    Ok(Change::new(
        TimelineEvent::CopyEditingResumed,
        "Copy editing resumed after author feedback",
        actor,
        now,
    ))
}

/// An author's verdict on the copy-edited draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorReviewRequest {
    pub approval: Approval,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub attached_files: Vec<FileRef>,
}

/// Record an author review of the draft. Latest review wins on the
/// aggregate; the timeline keeps every one.
///
/// Approval moves to `final-review` and, when files are attached, replaces
/// the manuscript's file set. A change request moves to `revision`.
///
/// # Errors
///
/// Authorization unless the actor is the submitter or a listed author;
/// state conflict outside `draft-ready`/`final-review`/`revision`;
/// validation for a change request without comments.
pub fn author_review(
    manuscript: &mut Manuscript,
    actor: &Actor,
    request: AuthorReviewRequest,
    now: DateTime<Utc>,
) -> Result<Change, WorkflowError> {
    const ACTION: &str = "review copy-edited draft";
    require_party(manuscript, actor, ACTION)?;
    let (target, draft_status) = match request.approval {
        Approval::Approved => (CopyEditStage::FinalReview, DraftStatus::ApprovedByAuthor),
        Approval::NeedsChanges => {
            non_blank("comments", &request.comments)?;
            (CopyEditStage::Revision, DraftStatus::ChangesRequested)
        }
    };
    if !request.attached_files.is_empty() {
        require_files("attached_files", &request.attached_files)?;
    }
    advance(manuscript, ACTION, target)?;

    let attached = current_files(request.attached_files);
    if request.approval == Approval::Approved && !attached.is_empty() {
        manuscript.latest_manuscript_files.clone_from(&attached);
    }
    manuscript.draft_status = Some(draft_status);
    manuscript.author_copy_edit_review = Some(AuthorCopyEditReview {
        approval: request.approval,
        comments: request.comments.clone(),
        reviewed_by: actor.account_id.clone(),
        reviewed_at: now,
        attached_files: attached,
    });

    let attached_count = manuscript
        .author_copy_edit_review
        .as_ref()
        .map_or(0, |r| r.attached_files.len());
    let notifications: Vec<Notification> = match request.approval {
        Approval::Approved => to_editor(
            manuscript,
            NotificationKind::AuthorApprovedDraft,
            json!({"attached_files": attached_count}),
        )
        .into_iter()
        .collect(),
        Approval::NeedsChanges => manuscript
            .copy_editor_email()
            .map(|email| {
                Notification::new(
                    NotificationKind::AuthorRequestedChanges,
                    email,
                    &manuscript.id,
                    json!({"comments": request.comments}),
                )
            })
            .into_iter()
            .collect(),
    };

    Ok(Change::new(
        TimelineEvent::AuthorCopyEditReview,
        match request.approval {
            Approval::Approved => "Author approved the copy-edited draft",
            Approval::NeedsChanges => "Author requested changes to the copy-edited draft",
        },
        actor,
        now,
    )
    .metadata(json!({
        "approval": request.approval.as_str(),
        "comments": request.comments,
        "attached_files": attached_count,
    }))
    .notify(notifications))
}

/// Upload a new galley-proof version.
///
/// # Errors
///
/// Authorization unless the actor is the assigned copy editor; state
/// conflict outside production or once ready for publication; validation
/// without files.
pub fn submit_galley_proof(
    manuscript: &mut Manuscript,
    actor: &Actor,
    files: Vec<FileRef>,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> Result<Change, WorkflowError> {
    const ACTION: &str = "submit galley proof";
    require_assigned_copy_editor(manuscript, actor, ACTION)?;
    let stage = in_production(manuscript, ACTION)?;
    if stage == CopyEditStage::ReadyForPublication {
        return Err(WorkflowError::transition(
            ACTION,
            manuscript.status,
            "copy editing is already confirmed",
        ));
    }
    require_files("files", &files)?;

    let assignment = assignment_mut(manuscript, ACTION)?;
    let version = u32::try_from(assignment.galley_proofs.len())
        .map_or(u32::MAX, |n| n.saturating_add(1));
    let count = files.len();
    assignment.galley_proofs.push(GalleyProof {
        version,
        files,
        notes: notes.clone(),
        submitted_at: now,
    });

    Ok(Change::new(
        TimelineEvent::GalleyProofSubmitted,
        format!("Galley proof v{version} submitted"),
        actor,
        now,
    )
    .metadata(json!({"version": version, "files": count, "notes": notes}))
    .notify(to_authors(
        manuscript,
        NotificationKind::GalleyProofReady,
        &json!({"version": version}),
    )))
}

/// Copy editor's sign-off: `final-review` to `ready-for-publication`.
///
/// # Errors
///
/// Authorization unless the actor is the assigned copy editor; state
/// conflict outside `final-review`, without an author approval, or without
/// any galley proof.
pub fn confirm_copy_edit(
    manuscript: &mut Manuscript,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<Change, WorkflowError> {
    const ACTION: &str = "confirm copy edit";
    require_assigned_copy_editor(manuscript, actor, ACTION)?;
    let approved = manuscript
        .author_copy_edit_review
        .as_ref()
        .is_some_and(|r| r.approval == Approval::Approved);
    if !approved {
        return Err(WorkflowError::transition(
            ACTION,
            manuscript.status,
            "the authors have not approved the draft",
        ));
    }
    let proofs = manuscript
        .copy_editor_assignment
        .as_ref()
        .map_or(0, |a| a.galley_proofs.len());
    if proofs == 0 {
        return Err(WorkflowError::transition(
            ACTION,
            manuscript.status,
            "no galley proof has been submitted",
        ));
    }
    advance(manuscript, ACTION, CopyEditStage::ReadyForPublication)?;
    let assignment = assignment_mut(manuscript, ACTION)?;
    assignment.completion_confirmed = true;
    assignment.confirmed_at = Some(now);

    Ok(Change::new(
        TimelineEvent::CopyEditConfirmed,
        "Copy editing confirmed; ready for publication",
        actor,
        now,
    )
    .metadata(json!({"galley_proofs": proofs}))
    .notify(to_editor(
        manuscript,
        NotificationKind::CopyEditConfirmed,
        json!({"galley_proofs": proofs}),
    )))
}
