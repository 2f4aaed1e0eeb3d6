use std::fmt;

use crate::model::ManuscriptStatus;
use crate::notify::NotifyError;
use crate::payment::GatewayError;
use crate::store::StoreError;

/// Error taxonomy surfaced to callers.
///
/// `Authorization` means the actor may not do this at all; `StateConflict`
/// means the move is not legal from the manuscript's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Authorization,
    Validation,
    StateConflict,
    NotFound,
    Dependency,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Authorization => "authorization",
            Self::Validation => "validation",
            Self::StateConflict => "state-conflict",
            Self::NotFound => "not-found",
            Self::Dependency => "dependency",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-readable error codes for operators and API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    MissingRole,
    NotManuscriptParty,
    NotAssignee,
    InvalidField,
    UnknownDecision,
    PaymentRequired,
    InvalidStateTransition,
    ConcurrentModification,
    ManuscriptNotFound,
    PaymentNotFound,
    ReviewNotFound,
    AccountNotFound,
    PaymentGatewayFailed,
    StoreFailed,
    TimelineCorrupt,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::MissingRole => "E1101",
            Self::NotManuscriptParty => "E1102",
            Self::NotAssignee => "E1103",
            Self::InvalidField => "E2001",
            Self::UnknownDecision => "E2002",
            Self::PaymentRequired => "E2003",
            Self::InvalidStateTransition => "E3001",
            Self::ConcurrentModification => "E3002",
            Self::ManuscriptNotFound => "E4001",
            Self::PaymentNotFound => "E4002",
            Self::ReviewNotFound => "E4003",
            Self::AccountNotFound => "E4004",
            Self::PaymentGatewayFailed => "E5001",
            Self::StoreFailed => "E5002",
            Self::TimelineCorrupt => "E5003",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::MissingRole => "Acting account lacks a required role",
            Self::NotManuscriptParty => "Acting account is not an author of this manuscript",
            Self::NotAssignee => "Acting account is not the assigned party",
            Self::InvalidField => "Invalid or missing field",
            Self::UnknownDecision => "Unknown editorial decision",
            Self::PaymentRequired => "Payment not completed or waived",
            Self::InvalidStateTransition => "Invalid state transition",
            Self::ConcurrentModification => "Manuscript changed since it was read",
            Self::ManuscriptNotFound => "Manuscript not found",
            Self::PaymentNotFound => "Payment not found",
            Self::ReviewNotFound => "Review not found",
            Self::AccountNotFound => "Account not found",
            Self::PaymentGatewayFailed => "Payment gateway call failed",
            Self::StoreFailed => "Manuscript store failure",
            Self::TimelineCorrupt => "Timeline hash chain broken",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and clients.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in galley.toml and retry."),
            Self::MissingRole | Self::NotManuscriptParty | Self::NotAssignee => None,
            Self::InvalidField => Some("Correct the named field and resubmit the request."),
            Self::UnknownDecision => {
                Some("Use one of: accept, minor-revision, major-revision, reject.")
            }
            Self::PaymentRequired => {
                Some("Record a completed payment or a waiver before assigning a copy editor.")
            }
            Self::InvalidStateTransition => {
                Some("Reload the manuscript and check which transitions its status allows.")
            }
            Self::ConcurrentModification => Some("Reload the manuscript and retry the request."),
            Self::ManuscriptNotFound
            | Self::PaymentNotFound
            | Self::ReviewNotFound
            | Self::AccountNotFound => None,
            Self::PaymentGatewayFailed => Some("Retry once the payment provider is reachable."),
            Self::StoreFailed => Some("Check database path, disk space and permissions."),
            Self::TimelineCorrupt => Some("Restore the store from backup; timelines are append-only."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Aggregates and records addressable by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Manuscript,
    Payment,
    Review,
    Account,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Manuscript => "manuscript",
            Self::Payment => "payment",
            Self::Review => "review",
            Self::Account => "account",
        })
    }
}

/// Errors returned by every engine operation.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// The acting account lacks every role that may perform `action`.
    #[error("{action} requires one of the roles [{required}]")]
    MissingRole {
        action: &'static str,
        required: String,
    },

    /// Identity check failed (not an author, not the assigned copy editor, ...).
    #[error("{action} refused: {reason}")]
    Forbidden {
        action: &'static str,
        code: ErrorCode,
        reason: String,
    },

    /// A request field is missing or malformed.
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// The editorial decision value is outside the closed enumeration.
    #[error("unknown decision '{0}': expected accept, minor-revision, major-revision or reject")]
    UnknownDecision(String),

    /// The payment-gating guard refused a copy-editor assignment.
    #[error("payment gate closed for {manuscript_id}: {reason}")]
    PaymentRequired {
        manuscript_id: String,
        reason: String,
    },

    /// The transition is not legal from the manuscript's current state.
    #[error("cannot {action} while manuscript is {from}: {reason}")]
    InvalidTransition {
        action: &'static str,
        from: String,
        reason: String,
    },

    /// Optimistic concurrency check failed.
    #[error("manuscript {manuscript_id} changed concurrently (expected revision {expected})")]
    Conflict { manuscript_id: String, expected: u64 },

    /// Referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: String },

    /// Payment gateway or fee table failure. Never absorbed.
    #[error("payment gateway failure: {0}")]
    Gateway(#[from] GatewayError),

    /// Underlying store failure.
    #[error("store failure: {0}")]
    Store(StoreError),

    /// Manuscript state failed an internal consistency check.
    #[error("internal inconsistency: {0}")]
    Inconsistent(String),
}

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict {
                manuscript_id,
                expected,
            } => Self::Conflict {
                manuscript_id,
                expected,
            },
            other => Self::Store(other),
        }
    }
}

impl From<NotifyError> for WorkflowError {
    fn from(err: NotifyError) -> Self {
        Self::Inconsistent(format!("notification error escaped dispatch: {err}"))
    }
}

impl WorkflowError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn transition(
        action: &'static str,
        from: ManuscriptStatus,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidTransition {
            action,
            from: from.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(entity: Entity, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Taxonomy bucket for this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingRole { .. } | Self::Forbidden { .. } => ErrorKind::Authorization,
            Self::Validation { .. } | Self::UnknownDecision(_) | Self::PaymentRequired { .. } => {
                ErrorKind::Validation
            }
            Self::InvalidTransition { .. } | Self::Conflict { .. } => ErrorKind::StateConflict,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Gateway(_) | Self::Store(_) | Self::Inconsistent(_) => ErrorKind::Dependency,
        }
    }

    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::MissingRole { .. } => ErrorCode::MissingRole,
            Self::Forbidden { code, .. } => *code,
            Self::Validation { .. } => ErrorCode::InvalidField,
            Self::UnknownDecision(_) => ErrorCode::UnknownDecision,
            Self::PaymentRequired { .. } => ErrorCode::PaymentRequired,
            Self::InvalidTransition { .. } => ErrorCode::InvalidStateTransition,
            Self::Conflict { .. } => ErrorCode::ConcurrentModification,
            Self::NotFound { entity, .. } => match entity {
                Entity::Manuscript => ErrorCode::ManuscriptNotFound,
                Entity::Payment => ErrorCode::PaymentNotFound,
                Entity::Review => ErrorCode::ReviewNotFound,
                Entity::Account => ErrorCode::AccountNotFound,
            },
            Self::Gateway(_) => ErrorCode::PaymentGatewayFailed,
            Self::Store(StoreError::Timeline(_)) => ErrorCode::TimelineCorrupt,
            Self::Store(_) => ErrorCode::StoreFailed,
            Self::Inconsistent(_) => ErrorCode::InternalUnexpected,
        }
    }

    /// Optional remediation hint.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

#[cfg(test)]
mod tests {
    use super::{Entity, ErrorCode, ErrorKind, WorkflowError};
    use crate::model::ManuscriptStatus;
    use crate::store::StoreError;
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::ConfigParseError,
            ErrorCode::MissingRole,
            ErrorCode::NotManuscriptParty,
            ErrorCode::NotAssignee,
            ErrorCode::InvalidField,
            ErrorCode::UnknownDecision,
            ErrorCode::PaymentRequired,
            ErrorCode::InvalidStateTransition,
            ErrorCode::ConcurrentModification,
            ErrorCode::ManuscriptNotFound,
            ErrorCode::PaymentNotFound,
            ErrorCode::ReviewNotFound,
            ErrorCode::AccountNotFound,
            ErrorCode::PaymentGatewayFailed,
            ErrorCode::StoreFailed,
            ErrorCode::TimelineCorrupt,
            ErrorCode::InternalUnexpected,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::InvalidStateTransition.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn authorization_and_state_conflict_stay_distinct() {
        let denied = WorkflowError::MissingRole {
            action: "decide",
            required: "editor, admin".into(),
        };
        let illegal = WorkflowError::transition("decide", ManuscriptStatus::Rejected, "terminal");
        assert_eq!(denied.kind(), ErrorKind::Authorization);
        assert_eq!(illegal.kind(), ErrorKind::StateConflict);
        assert_ne!(denied.code(), illegal.code());
    }

    #[test]
    fn store_conflict_maps_to_state_conflict() {
        let err: WorkflowError = StoreError::Conflict {
            manuscript_id: "ms-1".into(),
            expected: 3,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::StateConflict);
        assert_eq!(err.code(), ErrorCode::ConcurrentModification);
    }

    #[test]
    fn not_found_codes_follow_entity() {
        assert_eq!(
            WorkflowError::not_found(Entity::Payment, "pay-1").code(),
            ErrorCode::PaymentNotFound
        );
        assert_eq!(
            WorkflowError::not_found(Entity::Manuscript, "ms-1").code(),
            ErrorCode::ManuscriptNotFound
        );
    }
}
