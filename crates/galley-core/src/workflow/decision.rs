//! Editorial decisions and author resubmission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{
    Change, EDITORIAL, current_files, non_blank, require_files, require_party, to_authors,
    to_editor,
};
use crate::actor::{Actor, Role};
use crate::error::{ErrorCode, WorkflowError};
use crate::model::{
    AcceptanceRecord, CopyEditStage, FileRef, Manuscript, ManuscriptStatus, Payment,
    RevisionRecord, ReviewSummary, format_amount,
};
use crate::notify::{Notification, NotificationKind};
use crate::payment::FeeQuote;
use crate::timeline::TimelineEvent;

/// Closed set of editorial decisions, each mapping to one target status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Decision {
    Accept,
    MinorRevision,
    MajorRevision,
    Reject,
}

impl Decision {
    pub const ALL: [Self; 4] = [
        Self::Accept,
        Self::MinorRevision,
        Self::MajorRevision,
        Self::Reject,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::MinorRevision => "minor-revision",
            Self::MajorRevision => "major-revision",
            Self::Reject => "reject",
        }
    }

    #[must_use]
    pub const fn target_status(self) -> ManuscriptStatus {
        match self {
            Self::Accept => ManuscriptStatus::Accepted,
            Self::MinorRevision => ManuscriptStatus::MinorRevisionRequested,
            Self::MajorRevision => ManuscriptStatus::MajorRevisionRequested,
            Self::Reject => ManuscriptStatus::Rejected,
        }
    }

    /// Parse a decision, accepting `_` for `-` and any case.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::UnknownDecision`] for anything else.
    pub fn parse(raw: &str) -> Result<Self, WorkflowError> {
        let normalized = raw.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == normalized)
            .ok_or_else(|| WorkflowError::UnknownDecision(raw.to_string()))
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fee outcome computed by the engine before an `accept` is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptOutcome {
    pub fee: FeeQuote,
    /// Pending obligation; `None` when the fee is free.
    pub payment: Option<Payment>,
}

/// Check everything about a decision that does not depend on the fee.
///
/// Run before any gateway call so a refused decision never creates an
/// obligation.
///
/// # Errors
///
/// Authorization unless editor/admin, or when an editor other than the
/// assigned one decides; state conflict outside the review statuses.
pub fn authorize_decision(manuscript: &Manuscript, actor: &Actor) -> Result<(), WorkflowError> {
    const ACTION: &str = "decide";
    actor.require_any(ACTION, EDITORIAL)?;
    if !actor.has(Role::Admin) {
        if let Some(assigned) = &manuscript.assigned_editor {
            if *assigned != actor.account_id {
                return Err(Actor::forbidden(
                    ACTION,
                    ErrorCode::NotAssignee,
                    format!("{} is not the assigned editor", actor.email),
                ));
            }
        }
    }
    if !manuscript.status.accepts_decision() {
        return Err(WorkflowError::transition(
            ACTION,
            manuscript.status,
            if manuscript.status.is_terminal() {
                "status is terminal"
            } else {
                "decisions are issued only from under-review or under-editorial-review"
            },
        ));
    }
    Ok(())
}

/// Apply an editorial decision.
///
/// # Errors
///
/// Everything [`authorize_decision`] returns; an internal error if an
/// `accept` arrives without its fee outcome.
pub fn decide(
    manuscript: &mut Manuscript,
    actor: &Actor,
    decision: Decision,
    comments: &str,
    summary: &ReviewSummary,
    outcome: Option<AcceptOutcome>,
    now: DateTime<Utc>,
) -> Result<Change, WorkflowError> {
    authorize_decision(manuscript, actor)?;
    let target = decision.target_status();
    manuscript
        .status
        .can_transition_to(target)
        .map_err(|e| WorkflowError::transition("decide", e.from, e.reason))?;

    let mut metadata = json!({
        "decision": decision,
        "comments": comments,
        "review_summary": summary,
    });
    let mut notifications = to_authors(
        manuscript,
        NotificationKind::DecisionIssued,
        &json!({"decision": decision, "comments": comments}),
    );
    let mut payments = Vec::new();

    if decision == Decision::Accept {
        let Some(outcome) = outcome else {
            return Err(WorkflowError::Inconsistent(
                "accept decision without a fee outcome".into(),
            ));
        };
        let payment_id = outcome.payment.as_ref().map(|p| p.id.clone());
        metadata["fee"] = json!({
            "amount_minor": outcome.fee.amount_minor,
            "currency": outcome.fee.currency,
            "waived": outcome.fee.is_free(),
            "reason": outcome.fee.reason,
        });
        metadata["payment_id"] = json!(payment_id);

        if let Some(payment) = outcome.payment {
            notifications.push(Notification::new(
                NotificationKind::PaymentRequested,
                manuscript.submitter_email.clone(),
                &manuscript.id,
                json!({
                    "payment_id": payment.id,
                    "amount": format_amount(payment.amount_minor, &payment.currency),
                    "due_date": payment.due_date,
                }),
            ));
            payments.push(payment);
        }
        manuscript.acceptance = Some(AcceptanceRecord {
            decided_by: actor.account_id.clone(),
            decided_at: now,
            fee: outcome.fee,
            payment_id,
        });
        manuscript.copy_edit_stage = Some(CopyEditStage::AcceptedAwaitingCopyEdit);
    }

    manuscript.status = target;
    let mut change = Change::new(
        TimelineEvent::EditorialDecision,
        format!("Editorial decision: {}", target.label()),
        actor,
        now,
    )
    .metadata(metadata)
    .notify(notifications);
    change.payments = payments;
    Ok(change)
}

/// Author resubmission after a revision request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionRequest {
    pub response_to_reviewers: String,
    pub summary_of_changes: String,
    pub files: Vec<FileRef>,
}

/// Resubmit a revised manuscript: back to `under-review` in a new round,
/// with the file set replaced wholesale.
///
/// # Errors
///
/// Authorization unless the actor is the submitter or a listed author;
/// state conflict unless a revision was requested; validation for blank
/// responses or no files.
pub fn resubmit(
    manuscript: &mut Manuscript,
    actor: &Actor,
    request: RevisionRequest,
    now: DateTime<Utc>,
) -> Result<Change, WorkflowError> {
    const ACTION: &str = "resubmit revision";
    require_party(manuscript, actor, ACTION)?;
    if !manuscript.status.awaits_revision() {
        return Err(WorkflowError::transition(
            ACTION,
            manuscript.status,
            "no revision was requested",
        ));
    }
    non_blank("response_to_reviewers", &request.response_to_reviewers)?;
    non_blank("summary_of_changes", &request.summary_of_changes)?;
    require_files("files", &request.files)?;
    manuscript
        .status
        .can_transition_to(ManuscriptStatus::UnderReview)
        .map_err(|e| WorkflowError::transition(ACTION, e.from, e.reason))?;

    let previous_status = manuscript.status;
    let files = current_files(request.files);
    manuscript.review_round += 1;
    manuscript.revisions.push(RevisionRecord {
        round: manuscript.review_round,
        response_to_reviewers: request.response_to_reviewers,
        summary_of_changes: request.summary_of_changes,
        files: files.clone(),
        submitted_by: actor.account_id.clone(),
        submitted_at: now,
    });
    manuscript.latest_manuscript_files = files;
    manuscript.status = ManuscriptStatus::UnderReview;

    Ok(Change::new(
        TimelineEvent::RevisionSubmitted,
        format!("Revision submitted for round {}", manuscript.review_round),
        actor,
        now,
    )
    .metadata(json!({
        "round": manuscript.review_round,
        "previous_status": previous_status,
        "files": manuscript.latest_manuscript_files.len(),
    }))
    .notify(to_editor(
        manuscript,
        NotificationKind::RevisionReceived,
        json!({"round": manuscript.review_round}),
    )))
}

#[cfg(test)]
mod tests {
    use super::{AcceptOutcome, Decision, RevisionRequest, decide, resubmit};
    use crate::error::{ErrorCode, ErrorKind};
    use crate::model::{CopyEditStage, ManuscriptStatus, ReviewSummary};
    use crate::payment::FeeQuote;
    use crate::testing::{self, at};

    fn under_review() -> crate::model::Manuscript {
        let mut ms = testing::submitted();
        ms.status = ManuscriptStatus::UnderReview;
        ms.assigned_editor = Some(testing::editor().id);
        ms.assigned_editor_email = Some(testing::editor().email);
        ms
    }

    fn free() -> AcceptOutcome {
        AcceptOutcome {
            fee: FeeQuote {
                amount_minor: 0,
                currency: "USD".into(),
                waived: true,
                reason: Some("waived".into()),
                discount: None,
            },
            payment: None,
        }
    }

    #[test]
    fn parse_is_closed() {
        assert_eq!(Decision::parse("Minor_Revision").unwrap(), Decision::MinorRevision);
        let err = Decision::parse("accept-with-conditions").unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnknownDecision);
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn accept_with_waived_fee_enters_copy_edit_queue() {
        let mut ms = under_review();
        let summary = ReviewSummary::for_round(1, &[]);
        let change = decide(
            &mut ms,
            &testing::editor().actor(),
            Decision::Accept,
            "Well done",
            &summary,
            Some(free()),
            at(10),
        )
        .unwrap();
        assert_eq!(ms.status, ManuscriptStatus::Accepted);
        assert_eq!(ms.copy_edit_stage, Some(CopyEditStage::AcceptedAwaitingCopyEdit));
        assert!(ms.acceptance.as_ref().unwrap().fee_waived());
        assert!(change.payments.is_empty());
        assert_eq!(change.entry.metadata["decision"], "accept");
        assert_eq!(change.entry.metadata["fee"]["waived"], true);
    }

    #[test]
    fn other_editor_is_refused() {
        let mut ms = under_review();
        let mut other = testing::editor();
        other.id = crate::model::AccountId::new_unchecked("acct-other-ed");
        other.email = "other@journal.org".into();
        let err = decide(
            &mut ms,
            &other.actor(),
            Decision::Reject,
            "",
            &ReviewSummary::for_round(1, &[]),
            None,
            at(10),
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotAssignee);

        decide(
            &mut ms,
            &testing::admin().actor(),
            Decision::Reject,
            "",
            &ReviewSummary::for_round(1, &[]),
            None,
            at(10),
        )
        .unwrap();
        assert_eq!(ms.status, ManuscriptStatus::Rejected);
    }

    #[test]
    fn rejected_is_terminal_for_decisions() {
        let mut ms = under_review();
        ms.status = ManuscriptStatus::Rejected;
        let err = decide(
            &mut ms,
            &testing::editor().actor(),
            Decision::Accept,
            "",
            &ReviewSummary::for_round(1, &[]),
            Some(free()),
            at(10),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateConflict);
    }

    #[test]
    fn resubmission_opens_next_round_and_replaces_files() {
        let mut ms = under_review();
        decide(
            &mut ms,
            &testing::editor().actor(),
            Decision::MajorRevision,
            "Needs more data",
            &ReviewSummary::for_round(1, &[]),
            None,
            at(10),
        )
        .unwrap();
        assert_eq!(ms.status, ManuscriptStatus::MajorRevisionRequested);

        let request = RevisionRequest {
            response_to_reviewers: "Added cohort B".into(),
            summary_of_changes: "New section 4".into(),
            files: vec![testing::file("draft-v2.pdf")],
        };

        let stranger = testing::reviewer().actor();
        let err = resubmit(&mut ms, &stranger, request.clone(), at(20)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotManuscriptParty);

        // A listed co-author without the submitting account may resubmit.
        resubmit(&mut ms, &testing::coauthor().actor(), request, at(20)).unwrap();
        assert_eq!(ms.status, ManuscriptStatus::UnderReview);
        assert_eq!(ms.review_round, 2);
        assert_eq!(ms.latest_manuscript_files.len(), 1);
        assert_eq!(ms.latest_manuscript_files[0].name, "draft-v2.pdf");
        assert_eq!(ms.revisions.len(), 1);
    }

    #[test]
    fn resubmission_requires_response() {
        let mut ms = under_review();
        ms.status = ManuscriptStatus::MinorRevisionRequested;
        let err = resubmit(
            &mut ms,
            &testing::author().actor(),
            RevisionRequest {
                response_to_reviewers: "  ".into(),
                summary_of_changes: "x".into(),
                files: vec![testing::file("v2.pdf")],
            },
            at(20),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
