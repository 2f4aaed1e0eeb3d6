use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ManuscriptId, PaymentId};
use super::status::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Waived,
}

impl PaymentStatus {
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Processing,
        Self::Completed,
        Self::Failed,
        Self::Waived,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Waived => "waived",
        }
    }

    /// An open obligation. At most one per manuscript.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }

    /// Satisfies the payment gate.
    #[must_use]
    pub const fn clears_gate(self) -> bool {
        matches!(self, Self::Completed | Self::Waived)
    }

    /// Legal outcome transitions:
    /// - `pending -> processing | completed | failed | waived`
    /// - `processing -> completed | failed | waived`
    /// - `completed -> failed` (administrative rejection)
    #[must_use]
    pub const fn can_move_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (
                Self::Pending,
                Self::Processing | Self::Completed | Self::Failed | Self::Waived
            ) | (
                Self::Processing,
                Self::Completed | Self::Failed | Self::Waived
            ) | (Self::Completed, Self::Failed)
        )
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ParseEnumError {
                expected: "payment status",
                got: s.to_string(),
            })
    }
}

/// Discount applied by the fee table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    pub percent: u8,
    pub reason: String,
    pub original_amount_minor: u64,
}

/// Payment aggregate. Referenced by manuscript id, never embedded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub manuscript_id: ManuscriptId,
    /// Amount in minor currency units (cents).
    pub amount_minor: u64,
    pub currency: String,
    pub status: PaymentStatus,
    pub due_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<Discount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Render minor units as `"2000.00 USD"`.
#[must_use]
pub fn format_amount(amount_minor: u64, currency: &str) -> String {
    format!("{}.{:02} {currency}", amount_minor / 100, amount_minor % 100)
}

#[cfg(test)]
mod tests {
    use super::{PaymentStatus, format_amount};
    use std::str::FromStr;

    #[test]
    fn outcome_transitions() {
        use PaymentStatus as P;
        assert!(P::Pending.can_move_to(P::Completed));
        assert!(P::Pending.can_move_to(P::Processing));
        assert!(P::Processing.can_move_to(P::Failed));
        assert!(P::Completed.can_move_to(P::Failed));
        assert!(!P::Completed.can_move_to(P::Pending));
        assert!(!P::Failed.can_move_to(P::Completed));
        assert!(!P::Waived.can_move_to(P::Failed));
        assert!(!P::Pending.can_move_to(P::Pending));
    }

    #[test]
    fn gate_and_activity_flags() {
        assert!(PaymentStatus::Pending.is_active());
        assert!(PaymentStatus::Processing.is_active());
        assert!(!PaymentStatus::Completed.is_active());
        assert!(PaymentStatus::Completed.clears_gate());
        assert!(PaymentStatus::Waived.clears_gate());
        assert!(!PaymentStatus::Failed.clears_gate());
    }

    #[test]
    fn parse_and_format() {
        assert_eq!(
            PaymentStatus::from_str(" Completed ").unwrap(),
            PaymentStatus::Completed
        );
        assert!(PaymentStatus::from_str("refunded").is_err());
        assert_eq!(format_amount(200_000, "USD"), "2000.00 USD");
        assert_eq!(format_amount(1_505, "EUR"), "15.05 EUR");
    }
}
