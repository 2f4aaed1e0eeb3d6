//! Append-only manuscript timeline.
//!
//! Every committed transition appends exactly one [`TimelineEntry`]. Entries
//! carry the status and copy-edit stage *after* the transition, so the
//! timeline can be replayed without consulting the aggregate, and each entry
//! hashes its predecessor so edits and gaps are detectable.

pub mod canonical;
pub mod hash;
pub mod replay;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{AccountId, CopyEditStage, ManuscriptStatus, ParseEnumError};

pub use hash::{ChainError, compute_entry_hash, verify_chain, verify_chain_from};
pub use replay::{AuthorReviewRecord, StatusChange, author_review_history, final_phase, status_history};

/// Timeline event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimelineEvent {
    Submitted,
    EditorAssigned,
    ReviewerAssigned,
    ReviewSubmitted,
    EditorialReviewStarted,
    EditorialDecision,
    RevisionSubmitted,
    PaymentStatusChanged,
    PaymentReissued,
    CopyEditorAssigned,
    CopyEditingResumed,
    CopyEditDraftReady,
    AuthorCopyEditReview,
    GalleyProofSubmitted,
    CopyEditConfirmed,
    Published,
}

impl TimelineEvent {
    pub const ALL: [Self; 16] = [
        Self::Submitted,
        Self::EditorAssigned,
        Self::ReviewerAssigned,
        Self::ReviewSubmitted,
        Self::EditorialReviewStarted,
        Self::EditorialDecision,
        Self::RevisionSubmitted,
        Self::PaymentStatusChanged,
        Self::PaymentReissued,
        Self::CopyEditorAssigned,
        Self::CopyEditingResumed,
        Self::CopyEditDraftReady,
        Self::AuthorCopyEditReview,
        Self::GalleyProofSubmitted,
        Self::CopyEditConfirmed,
        Self::Published,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::EditorAssigned => "editor-assigned",
            Self::ReviewerAssigned => "reviewer-assigned",
            Self::ReviewSubmitted => "review-submitted",
            Self::EditorialReviewStarted => "editorial-review-started",
            Self::EditorialDecision => "editorial-decision",
            Self::RevisionSubmitted => "revision-submitted",
            Self::PaymentStatusChanged => "payment-status-changed",
            Self::PaymentReissued => "payment-reissued",
            Self::CopyEditorAssigned => "copy-editor-assigned",
            Self::CopyEditingResumed => "copy-editing-resumed",
            Self::CopyEditDraftReady => "copy-edit-draft-ready",
            Self::AuthorCopyEditReview => "author-copy-edit-review",
            Self::GalleyProofSubmitted => "galley-proof-submitted",
            Self::CopyEditConfirmed => "copy-edit-confirmed",
            Self::Published => "published",
        }
    }
}

impl std::fmt::Display for TimelineEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TimelineEvent {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|event| event.as_str() == normalized)
            .ok_or_else(|| ParseEnumError {
                expected: "timeline event",
                got: s.to_string(),
            })
    }
}

/// One committed timeline record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// 1-based position in the manuscript's timeline.
    pub seq: u64,
    pub event: TimelineEvent,
    pub description: String,
    pub performed_by: AccountId,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub status_after: ManuscriptStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_after: Option<CopyEditStage>,
    /// Hash of the previous entry; `None` only for `seq == 1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_hash: Option<String>,
    /// `blake3:<hex>` over this entry's content and `prev_hash`.
    pub entry_hash: String,
}

/// An entry not yet positioned in a timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryDraft {
    pub event: TimelineEvent,
    pub description: String,
    pub performed_by: AccountId,
    pub date: DateTime<Utc>,
    pub metadata: serde_json::Value,
}

impl EntryDraft {
    #[must_use]
    pub fn new(
        event: TimelineEvent,
        description: impl Into<String>,
        performed_by: AccountId,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            event,
            description: description.into(),
            performed_by,
            date,
            metadata: serde_json::Value::Null,
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Position this draft after `prev` and compute its hash.
    #[must_use]
    pub fn seal(
        self,
        prev: Option<&TimelineEntry>,
        status_after: ManuscriptStatus,
        stage_after: Option<CopyEditStage>,
    ) -> TimelineEntry {
        let mut entry = TimelineEntry {
            seq: prev.map_or(1, |p| p.seq + 1),
            event: self.event,
            description: self.description,
            performed_by: self.performed_by,
            date: self.date,
            metadata: self.metadata,
            status_after,
            stage_after,
            prev_hash: prev.map(|p| p.entry_hash.clone()),
            entry_hash: String::new(),
        };
        entry.entry_hash = compute_entry_hash(&entry);
        entry
    }
}

#[cfg(test)]
mod tests {
    use super::{EntryDraft, TimelineEvent};
    use crate::model::{AccountId, CopyEditStage, ManuscriptStatus};
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn seal_chains_to_previous_entry() {
        let at = Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap();
        let first = EntryDraft::new(
            TimelineEvent::Submitted,
            "Manuscript submitted",
            AccountId::new_unchecked("a1"),
            at,
        )
        .seal(None, ManuscriptStatus::Submitted, None);
        assert_eq!(first.seq, 1);
        assert!(first.prev_hash.is_none());
        assert!(first.entry_hash.starts_with("blake3:"));

        let second = EntryDraft::new(
            TimelineEvent::EditorialDecision,
            "Accepted",
            AccountId::new_unchecked("e1"),
            at,
        )
        .with_metadata(json!({"decision": "accept"}))
        .seal(
            Some(&first),
            ManuscriptStatus::Accepted,
            Some(CopyEditStage::AcceptedAwaitingCopyEdit),
        );
        assert_eq!(second.seq, 2);
        assert_eq!(second.prev_hash.as_deref(), Some(first.entry_hash.as_str()));
        assert_ne!(second.entry_hash, first.entry_hash);
    }

    #[test]
    fn event_names_are_kebab_case() {
        for event in TimelineEvent::ALL {
            let json = serde_json::to_string(&event).unwrap();
            assert_eq!(json, format!("\"{}\"", event.as_str()));
            assert_eq!(TimelineEvent::from_str(event.as_str()).unwrap(), event);
        }
    }
}
