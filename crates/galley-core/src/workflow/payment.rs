//! Payment outcomes and obligation reissue.
//!
//! The gateway reports outcomes; an admin records them here so that every
//! change in payment status is visible on the manuscript timeline.

use chrono::{DateTime, Utc};
use serde_json::json;

use super::Change;
use super::decision::AcceptOutcome;
use crate::actor::{Actor, Role};
use crate::error::WorkflowError;
use crate::model::{Manuscript, ManuscriptStatus, Payment, PaymentStatus, format_amount};
use crate::notify::{Notification, NotificationKind};
use crate::timeline::TimelineEvent;

const ADMIN: &[Role] = &[Role::Admin];

/// Record a gateway-reported outcome for one payment.
///
/// # Errors
///
/// Authorization unless admin; validation if the payment belongs to another
/// manuscript; state conflict for an illegal payment transition.
pub fn record_payment_outcome(
    manuscript: &Manuscript,
    actor: &Actor,
    payment: &Payment,
    outcome: PaymentStatus,
    note: Option<String>,
    now: DateTime<Utc>,
) -> Result<Change, WorkflowError> {
    const ACTION: &str = "record payment outcome";
    actor.require_any(ACTION, ADMIN)?;
    if payment.manuscript_id != manuscript.id {
        return Err(WorkflowError::validation(
            "payment",
            format!("{} belongs to {}", payment.id, payment.manuscript_id),
        ));
    }
    if !payment.status.can_move_to(outcome) {
        return Err(WorkflowError::transition(
            ACTION,
            manuscript.status,
            format!("payment {} cannot move from {} to {outcome}", payment.id, payment.status),
        ));
    }

    let mut updated = payment.clone();
    let previous = updated.status;
    updated.status = outcome;
    updated.updated_at = now;
    if note.is_some() {
        updated.note.clone_from(&note);
    }

    Ok(Change::new(
        TimelineEvent::PaymentStatusChanged,
        format!("Payment {} {previous} -> {outcome}", payment.id),
        actor,
        now,
    )
    .metadata(json!({
        "payment_id": payment.id,
        "from": previous,
        "to": outcome,
        "note": note,
    }))
    .notify([Notification::new(
        NotificationKind::PaymentStatusChanged,
        manuscript.submitter_email.clone(),
        &manuscript.id,
        json!({"payment_id": payment.id, "status": outcome}),
    )])
    .payment(updated))
}

/// Check that a fresh obligation may be created. Called before the fee is
/// recomputed so that a refused reissue never reaches the gateway.
///
/// # Errors
///
/// Authorization unless admin; state conflict outside
/// `accepted`, when the fee was waived, or while a payment is
/// still open or already settled.
pub fn check_reissue(
    manuscript: &Manuscript,
    actor: &Actor,
    payments: &[Payment],
) -> Result<(), WorkflowError> {
    const ACTION: &str = "reissue payment";
    actor.require_any(ACTION, ADMIN)?;
    if manuscript.status != ManuscriptStatus::Accepted {
        return Err(WorkflowError::transition(
            ACTION,
            manuscript.status,
            "payments are reissued only after acceptance",
        ));
    }
    if manuscript.acceptance.as_ref().is_none_or(|a| a.fee_waived()) {
        return Err(WorkflowError::transition(
            ACTION,
            manuscript.status,
            "no fee is owed",
        ));
    }
    if let Some(blocking) = payments
        .iter()
        .find(|p| p.status.is_active() || p.status.clears_gate())
    {
        return Err(WorkflowError::transition(
            ACTION,
            manuscript.status,
            format!("payment {} is {}", blocking.id, blocking.status),
        ));
    }
    Ok(())
}

/// Replace the acceptance fee outcome with a freshly computed one. Earlier
/// payments stay on record.
///
/// # Errors
///
/// Everything [`check_reissue`] returns.
pub fn reissue(
    manuscript: &mut Manuscript,
    actor: &Actor,
    payments: &[Payment],
    outcome: AcceptOutcome,
    now: DateTime<Utc>,
) -> Result<Change, WorkflowError> {
    check_reissue(manuscript, actor, payments)?;
    let superseded: Vec<_> = payments.iter().map(|p| p.id.clone()).collect();
    let payment_id = outcome.payment.as_ref().map(|p| p.id.clone());
    let status = manuscript.status;
    let acceptance = manuscript.acceptance.as_mut().ok_or_else(|| {
        WorkflowError::transition("reissue payment", status, "no acceptance record")
    })?;
    acceptance.fee = outcome.fee.clone();
    acceptance.payment_id.clone_from(&payment_id);

    let mut change = Change::new(
        TimelineEvent::PaymentReissued,
        match &outcome.payment {
            Some(p) => format!(
                "Payment reissued: {}",
                format_amount(p.amount_minor, &p.currency)
            ),
            None => "Fee recomputed: nothing owed".to_string(),
        },
        actor,
        now,
    )
    .metadata(json!({
        "payment_id": payment_id,
        "amount_minor": outcome.fee.amount_minor,
        "currency": outcome.fee.currency,
        "waived": outcome.fee.is_free(),
        "superseded": superseded,
    }));
    if let Some(payment) = outcome.payment {
        change = change
            .notify([Notification::new(
                NotificationKind::PaymentRequested,
                manuscript.submitter_email.clone(),
                &manuscript.id,
                json!({
                    "payment_id": payment.id,
                    "amount": format_amount(payment.amount_minor, &payment.currency),
                    "due_date": payment.due_date,
                }),
            )])
            .payment(payment);
    }
    Ok(change)
}
