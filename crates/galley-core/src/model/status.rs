use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Primary manuscript status. The only authoritative workflow field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ManuscriptStatus {
    Submitted,
    UnderReview,
    UnderEditorialReview,
    Accepted,
    MinorRevisionRequested,
    MajorRevisionRequested,
    Rejected,
    Published,
}

impl ManuscriptStatus {
    pub const ALL: [Self; 8] = [
        Self::Submitted,
        Self::UnderReview,
        Self::UnderEditorialReview,
        Self::Accepted,
        Self::MinorRevisionRequested,
        Self::MajorRevisionRequested,
        Self::Rejected,
        Self::Published,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::UnderReview => "under-review",
            Self::UnderEditorialReview => "under-editorial-review",
            Self::Accepted => "accepted",
            Self::MinorRevisionRequested => "minor-revision-requested",
            Self::MajorRevisionRequested => "major-revision-requested",
            Self::Rejected => "rejected",
            Self::Published => "published",
        }
    }

    /// Display label for UI and notification rendering. Never parsed back.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Submitted => "Submitted",
            Self::UnderReview => "Under Review",
            Self::UnderEditorialReview => "Under Editorial Review",
            Self::Accepted => "Accepted",
            Self::MinorRevisionRequested => "Minor Revision Requested",
            Self::MajorRevisionRequested => "Major Revision Requested",
            Self::Rejected => "Rejected",
            Self::Published => "Published",
        }
    }

    /// No workflow transition leaves a terminal status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Published)
    }

    /// Statuses from which an editorial decision may be issued.
    #[must_use]
    pub const fn accepts_decision(self) -> bool {
        matches!(self, Self::UnderReview | Self::UnderEditorialReview)
    }

    #[must_use]
    pub const fn awaits_revision(self) -> bool {
        matches!(
            self,
            Self::MinorRevisionRequested | Self::MajorRevisionRequested
        )
    }

    /// Validate whether a status change from self to `target` is allowed.
    ///
    /// Valid transitions:
    /// - `submitted -> under-review`
    /// - `under-review -> under-editorial-review`
    /// - `under-review | under-editorial-review -> accepted | *-revision-requested | rejected`
    /// - `*-revision-requested -> under-review` (resubmission)
    /// - `accepted -> published` (gated on the copy-edit stage by the caller)
    pub fn can_transition_to(&self, target: Self) -> Result<(), InvalidTransition> {
        if *self == target {
            return Err(InvalidTransition {
                from: *self,
                to: target,
                reason: "no-op status change is not allowed",
            });
        }

        if self.is_terminal() {
            return Err(InvalidTransition {
                from: *self,
                to: target,
                reason: "status is terminal",
            });
        }

        let allowed = match (*self, target) {
            (Self::Submitted, Self::UnderReview)
            | (Self::UnderReview, Self::UnderEditorialReview)
            | (Self::Accepted, Self::Published) => true,
            (from, to) if from.accepts_decision() => matches!(
                to,
                Self::Accepted
                    | Self::MinorRevisionRequested
                    | Self::MajorRevisionRequested
                    | Self::Rejected
            ),
            (from, Self::UnderReview) => from.awaits_revision(),
            _ => false,
        };

        if allowed {
            Ok(())
        } else {
            Err(InvalidTransition {
                from: *self,
                to: target,
                reason: "transition not allowed by lifecycle rules",
            })
        }
    }
}

/// Copy-editing sub-state, present only once a manuscript is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CopyEditStage {
    AcceptedAwaitingCopyEdit,
    InCopyEditing,
    DraftReady,
    Revision,
    FinalReview,
    ReadyForPublication,
}

impl CopyEditStage {
    pub const ALL: [Self; 6] = [
        Self::AcceptedAwaitingCopyEdit,
        Self::InCopyEditing,
        Self::DraftReady,
        Self::Revision,
        Self::FinalReview,
        Self::ReadyForPublication,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AcceptedAwaitingCopyEdit => "accepted-awaiting-copy-edit",
            Self::InCopyEditing => "in-copy-editing",
            Self::DraftReady => "draft-ready",
            Self::Revision => "revision",
            Self::FinalReview => "final-review",
            Self::ReadyForPublication => "ready-for-publication",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::AcceptedAwaitingCopyEdit => "Awaiting Copy Editor",
            Self::InCopyEditing => "Copy Editing",
            Self::DraftReady => "Draft Ready for Author",
            Self::Revision => "Author Requested Changes",
            Self::FinalReview => "Final Review",
            Self::ReadyForPublication => "Ready for Publication",
        }
    }

    /// Validate a stage move. Repeating an author review may land on the
    /// stage it started from (`final-review` or `revision`).
    pub fn can_advance_to(&self, target: Self) -> Result<(), InvalidStageTransition> {
        let allowed = matches!(
            (*self, target),
            (Self::AcceptedAwaitingCopyEdit, Self::InCopyEditing)
                | (Self::InCopyEditing | Self::Revision, Self::DraftReady)
                | (Self::Revision, Self::InCopyEditing)
                | (
                    Self::DraftReady | Self::FinalReview | Self::Revision,
                    Self::FinalReview | Self::Revision
                )
                | (Self::FinalReview, Self::ReadyForPublication)
        );

        if allowed {
            Ok(())
        } else {
            Err(InvalidStageTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// The stage at which a copy editor may still be (re)assigned.
    #[must_use]
    pub const fn allows_copy_editor_assignment(self) -> bool {
        !matches!(self, Self::ReadyForPublication)
    }
}

/// Author-facing state of the copy-edited draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DraftStatus {
    AwaitingAuthorReview,
    ApprovedByAuthor,
    ChangesRequested,
}

impl DraftStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AwaitingAuthorReview => "awaiting-author-review",
            Self::ApprovedByAuthor => "approved-by-author",
            Self::ChangesRequested => "changes-requested",
        }
    }
}

/// Article categories used by the fee table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArticleType {
    ResearchArticle,
    ReviewArticle,
    ShortCommunication,
    CaseReport,
    Editorial,
    Letter,
}

impl ArticleType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ResearchArticle => "research-article",
            Self::ReviewArticle => "review-article",
            Self::ShortCommunication => "short-communication",
            Self::CaseReport => "case-report",
            Self::Editorial => "editorial",
            Self::Letter => "letter",
        }
    }
}

/// Whether a status/stage pair describes a single workflow phase.
///
/// - no stage before acceptance or after rejection
/// - `accepted` pairs with any copy-edit stage; production runs inside it
/// - `published` pairs only with `ready-for-publication`
#[must_use]
pub const fn phase_is_consistent(status: ManuscriptStatus, stage: Option<CopyEditStage>) -> bool {
    match (status, stage) {
        (ManuscriptStatus::Accepted, Some(_))
        | (ManuscriptStatus::Published, Some(CopyEditStage::ReadyForPublication)) => true,
        (ManuscriptStatus::Accepted | ManuscriptStatus::Published, _) => false,
        (_, stage) => stage.is_none(),
    }
}

/// Error returned when a status transition is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: ManuscriptStatus,
    pub to: ManuscriptStatus,
    pub reason: &'static str,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}: {}", self.from, self.to, self.reason)
    }
}

/// Error returned when a copy-edit stage move is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidStageTransition {
    pub from: CopyEditStage,
    pub to: CopyEditStage,
}

impl fmt::Display for InvalidStageTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "copy-edit stage {} cannot move to {}", self.from, self.to)
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

macro_rules! text_enum {
    ($ty:ty, $expected:literal, [$($variant:expr),+ $(,)?]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = normalize(s);
                [$($variant),+]
                    .into_iter()
                    .find(|candidate| candidate.as_str() == normalized)
                    .ok_or_else(|| ParseEnumError {
                        expected: $expected,
                        got: s.to_string(),
                    })
            }
        }
    };
}

fn normalize(input: &str) -> String {
    input.trim().to_ascii_lowercase().replace('_', "-")
}

text_enum!(
    ManuscriptStatus,
    "status",
    [
        ManuscriptStatus::Submitted,
        ManuscriptStatus::UnderReview,
        ManuscriptStatus::UnderEditorialReview,
        ManuscriptStatus::Accepted,
        ManuscriptStatus::MinorRevisionRequested,
        ManuscriptStatus::MajorRevisionRequested,
        ManuscriptStatus::Rejected,
        ManuscriptStatus::Published,
    ]
);

text_enum!(
    CopyEditStage,
    "copy-edit stage",
    [
        CopyEditStage::AcceptedAwaitingCopyEdit,
        CopyEditStage::InCopyEditing,
        CopyEditStage::DraftReady,
        CopyEditStage::Revision,
        CopyEditStage::FinalReview,
        CopyEditStage::ReadyForPublication,
    ]
);

text_enum!(
    DraftStatus,
    "draft status",
    [
        DraftStatus::AwaitingAuthorReview,
        DraftStatus::ApprovedByAuthor,
        DraftStatus::ChangesRequested,
    ]
);

text_enum!(
    ArticleType,
    "article type",
    [
        ArticleType::ResearchArticle,
        ArticleType::ReviewArticle,
        ArticleType::ShortCommunication,
        ArticleType::CaseReport,
        ArticleType::Editorial,
        ArticleType::Letter,
    ]
);

#[cfg(test)]
mod tests {
    use super::{
        ArticleType, CopyEditStage, DraftStatus, InvalidTransition, ManuscriptStatus,
        phase_is_consistent,
    };
    use std::str::FromStr;

    #[test]
    fn enum_json_uses_kebab_case() {
        assert_eq!(
            serde_json::to_string(&ManuscriptStatus::UnderEditorialReview).unwrap(),
            "\"under-editorial-review\""
        );
        assert_eq!(
            serde_json::to_string(&CopyEditStage::AcceptedAwaitingCopyEdit).unwrap(),
            "\"accepted-awaiting-copy-edit\""
        );
        assert_eq!(
            serde_json::from_str::<DraftStatus>("\"changes-requested\"").unwrap(),
            DraftStatus::ChangesRequested
        );
    }

    #[test]
    fn display_parse_roundtrips() {
        for value in ManuscriptStatus::ALL {
            assert_eq!(ManuscriptStatus::from_str(&value.to_string()).unwrap(), value);
        }
        for value in CopyEditStage::ALL {
            assert_eq!(CopyEditStage::from_str(&value.to_string()).unwrap(), value);
        }
    }

    #[test]
    fn parse_accepts_underscores_and_case() {
        assert_eq!(
            ManuscriptStatus::from_str(" Under_Review ").unwrap(),
            ManuscriptStatus::UnderReview
        );
        assert_eq!(
            ArticleType::from_str("case_report").unwrap(),
            ArticleType::CaseReport
        );
    }

    #[test]
    fn parse_rejects_unknown_values() {
        assert!(ManuscriptStatus::from_str("withdrawn").is_err());
        assert!(CopyEditStage::from_str("typesetting").is_err());
        assert!(ArticleType::from_str("poem").is_err());
    }

    #[test]
    fn labels_are_separate_from_wire_values() {
        assert_eq!(ManuscriptStatus::UnderReview.label(), "Under Review");
        assert!(ManuscriptStatus::from_str(ManuscriptStatus::UnderReview.label()).is_err());
    }

    #[test]
    fn status_transition_rules() {
        use ManuscriptStatus as S;
        assert!(S::Submitted.can_transition_to(S::UnderReview).is_ok());
        assert!(S::UnderReview.can_transition_to(S::UnderEditorialReview).is_ok());
        assert!(S::UnderReview.can_transition_to(S::Accepted).is_ok());
        assert!(S::UnderEditorialReview.can_transition_to(S::Rejected).is_ok());
        assert!(S::MajorRevisionRequested.can_transition_to(S::UnderReview).is_ok());
        assert!(S::MinorRevisionRequested.can_transition_to(S::UnderReview).is_ok());
        assert!(S::Accepted.can_transition_to(S::Published).is_ok());

        assert!(matches!(
            S::Submitted.can_transition_to(S::Accepted),
            Err(InvalidTransition {
                from: S::Submitted,
                to: S::Accepted,
                ..
            })
        ));
        assert!(S::UnderReview.can_transition_to(S::Published).is_err());
        assert!(S::UnderReview.can_transition_to(S::UnderReview).is_err());
    }

    #[test]
    fn terminal_statuses_allow_nothing() {
        for target in ManuscriptStatus::ALL {
            assert!(ManuscriptStatus::Rejected.can_transition_to(target).is_err());
            assert!(ManuscriptStatus::Published.can_transition_to(target).is_err());
        }
    }

    #[test]
    fn stage_rules_allow_idempotent_author_reviews() {
        use CopyEditStage as C;
        assert!(C::DraftReady.can_advance_to(C::FinalReview).is_ok());
        assert!(C::FinalReview.can_advance_to(C::FinalReview).is_ok());
        assert!(C::Revision.can_advance_to(C::Revision).is_ok());
        assert!(C::Revision.can_advance_to(C::InCopyEditing).is_ok());
        assert!(C::FinalReview.can_advance_to(C::ReadyForPublication).is_ok());
        assert!(C::DraftReady.can_advance_to(C::ReadyForPublication).is_err());
        assert!(C::InCopyEditing.can_advance_to(C::FinalReview).is_err());
        assert!(C::ReadyForPublication.can_advance_to(C::Revision).is_err());
    }

    #[test]
    fn phase_consistency_table() {
        use CopyEditStage as C;
        use ManuscriptStatus as S;
        assert!(phase_is_consistent(S::UnderReview, None));
        assert!(!phase_is_consistent(S::UnderReview, Some(C::DraftReady)));
        assert!(phase_is_consistent(S::Accepted, Some(C::AcceptedAwaitingCopyEdit)));
        assert!(!phase_is_consistent(S::Accepted, None));
        assert!(phase_is_consistent(S::Accepted, Some(C::Revision)));
        assert!(phase_is_consistent(S::Accepted, Some(C::ReadyForPublication)));
        assert!(phase_is_consistent(S::Published, Some(C::ReadyForPublication)));
        assert!(!phase_is_consistent(S::Published, Some(C::FinalReview)));
    }
}
