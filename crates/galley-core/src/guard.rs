//! Payment gate evaluated when a copy editor is assigned.

use crate::error::WorkflowError;
use crate::model::{Manuscript, Payment, PaymentId, PaymentStatus};

/// Why the gate opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clearance {
    /// The acceptance fee resolved to nothing owed.
    FeeWaived,
    /// A completed or waived payment exists.
    Paid(PaymentId),
}

/// Evaluate the payment gate against the current payment records.
///
/// Never cached; callers pass payments read in the same unit of work.
///
/// # Errors
///
/// Returns [`WorkflowError::PaymentRequired`] if neither a fee waiver nor a
/// clearing payment exists.
pub fn payment_clearance(
    manuscript: &Manuscript,
    payments: &[Payment],
) -> Result<Clearance, WorkflowError> {
    let refuse = |reason: String| WorkflowError::PaymentRequired {
        manuscript_id: manuscript.id.to_string(),
        reason,
    };

    let Some(acceptance) = manuscript.acceptance.as_ref() else {
        return Err(refuse("manuscript has no acceptance record".into()));
    };
    if acceptance.fee_waived() {
        return Ok(Clearance::FeeWaived);
    }

    if let Some(paid) = payments
        .iter()
        .filter(|p| p.manuscript_id == manuscript.id)
        .find(|p| p.status.clears_gate())
    {
        return Ok(Clearance::Paid(paid.id.clone()));
    }

    let latest = payments
        .iter()
        .filter(|p| p.manuscript_id == manuscript.id)
        .max_by_key(|p| p.updated_at);
    Err(refuse(match latest {
        Some(p) if p.status == PaymentStatus::Failed => {
            format!("payment {} failed; reissue the obligation", p.id)
        }
        Some(p) => format!("payment {} is {}", p.id, p.status),
        None => "no payment on record".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::{Clearance, payment_clearance};
    use crate::error::ErrorCode;
    use crate::model::{Payment, PaymentId, PaymentStatus};
    use crate::testing::{self, at};

    fn payment(id: &str, status: PaymentStatus, day: i64) -> Payment {
        let ms = testing::accepted(200_000);
        Payment {
            id: PaymentId::new_unchecked(id),
            manuscript_id: ms.id,
            amount_minor: 200_000,
            currency: "USD".into(),
            status,
            due_date: at(40),
            discount: None,
            note: None,
            created_at: at(day),
            updated_at: at(day),
        }
    }

    #[test]
    fn waived_fee_opens_gate_without_payments() {
        let ms = testing::accepted(0);
        assert_eq!(payment_clearance(&ms, &[]).unwrap(), Clearance::FeeWaived);
    }

    #[test]
    fn gate_needs_completed_or_waived_payment() {
        let ms = testing::accepted(200_000);
        let err = payment_clearance(&ms, &[]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::PaymentRequired);

        let mut open = payment("pay-1", PaymentStatus::Processing, 10);
        open.manuscript_id = ms.id.clone();
        assert!(payment_clearance(&ms, std::slice::from_ref(&open)).is_err());

        let mut waived = payment("pay-2", PaymentStatus::Waived, 11);
        waived.manuscript_id = ms.id.clone();
        assert_eq!(
            payment_clearance(&ms, &[open, waived]).unwrap(),
            Clearance::Paid(PaymentId::new_unchecked("pay-2"))
        );
    }

    #[test]
    fn failed_payment_message_suggests_reissue() {
        let ms = testing::accepted(200_000);
        let mut failed = payment("pay-1", PaymentStatus::Failed, 10);
        failed.manuscript_id = ms.id.clone();
        let err = payment_clearance(&ms, &[failed]).unwrap_err();
        assert!(err.to_string().contains("reissue"));
    }

    #[test]
    fn other_manuscripts_payments_are_ignored() {
        let ms = testing::accepted(200_000);
        let foreign = payment("pay-9", PaymentStatus::Completed, 10);
        assert_ne!(foreign.manuscript_id, ms.id);
        assert!(payment_clearance(&ms, &[foreign]).is_err());
    }
}
