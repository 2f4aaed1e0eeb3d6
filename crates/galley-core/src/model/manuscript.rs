use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{AccountId, FileId, ManuscriptId, PaymentId};
use super::status::{ArticleType, CopyEditStage, DraftStatus, ManuscriptStatus, phase_is_consistent};
use crate::actor::Actor;
use crate::payment::FeeQuote;
use crate::timeline::TimelineEntry;

/// A listed author. Need not have an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
}

/// Reference returned by the file collaborator. The engine never sees bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub id: FileId,
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default)]
    pub is_current_version: bool,
}

/// Author resubmission for one review round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionRecord {
    pub round: u32,
    pub response_to_reviewers: String,
    pub summary_of_changes: String,
    pub files: Vec<FileRef>,
    pub submitted_by: AccountId,
    pub submitted_at: DateTime<Utc>,
}

/// Fee outcome captured at acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptanceRecord {
    pub decided_by: AccountId,
    pub decided_at: DateTime<Utc>,
    pub fee: FeeQuote,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<PaymentId>,
}

impl AcceptanceRecord {
    /// Whether the fee resolved to nothing owed.
    #[must_use]
    pub const fn fee_waived(&self) -> bool {
        self.fee.is_free()
    }
}

/// Typeset artifacts uploaded by the copy editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleyProof {
    pub version: u32,
    pub files: Vec<FileRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyEditorAssignment {
    pub copy_editor: AccountId,
    pub copy_editor_email: String,
    pub assigned_by: AccountId,
    pub assigned_at: DateTime<Utc>,
    pub started_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft_ready_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub galley_proofs: Vec<GalleyProof>,
    #[serde(default)]
    pub completion_confirmed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
}

/// Author verdict on a copy-edited draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Approval {
    Approved,
    NeedsChanges,
}

impl Approval {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::NeedsChanges => "needs_changes",
        }
    }
}

impl std::fmt::Display for Approval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Approval {
    type Err = super::status::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "approved" | "approve" => Ok(Self::Approved),
            "needs_changes" | "revision_requested" | "changes_requested" => Ok(Self::NeedsChanges),
            _ => Err(super::status::ParseEnumError {
                expected: "approval",
                got: s.to_string(),
            }),
        }
    }
}

/// Latest author review of the copy-edited draft. Overwritten on each review;
/// earlier reviews survive only in the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorCopyEditReview {
    pub approval: Approval,
    #[serde(default)]
    pub comments: String,
    pub reviewed_by: AccountId,
    pub reviewed_at: DateTime<Utc>,
    #[serde(default)]
    pub attached_files: Vec<FileRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    pub volume: u32,
    pub issue: u32,
    pub pages: String,
    pub published_date: DateTime<Utc>,
    pub published_by: AccountId,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    pub views: u64,
    pub downloads: u64,
    pub citations: u64,
}

/// The manuscript aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manuscript {
    pub id: ManuscriptId,
    pub title: String,
    #[serde(default, rename = "abstract")]
    pub abstract_text: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub article_type: ArticleType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
    pub status: ManuscriptStatus,
    pub authors: Vec<Author>,
    pub submitted_by: AccountId,
    pub submitter_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_editor: Option<AccountId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_editor_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_copy_editor: Option<AccountId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_edit_stage: Option<CopyEditStage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft_status: Option<DraftStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_copy_edit_review: Option<AuthorCopyEditReview>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_editor_assignment: Option<CopyEditorAssignment>,
    pub latest_manuscript_files: Vec<FileRef>,
    #[serde(default)]
    pub revisions: Vec<RevisionRecord>,
    pub review_round: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptance: Option<AcceptanceRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication: Option<Publication>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
    #[serde(default)]
    pub timeline: Vec<TimelineEntry>,
    /// Optimistic-concurrency counter; bumped on every commit.
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Manuscript {
    /// Whether `actor` is the submitter or one of the listed authors.
    #[must_use]
    pub fn is_party(&self, actor: &Actor) -> bool {
        actor.account_id == self.submitted_by
            || actor.email_matches(&self.submitter_email)
            || self.authors.iter().any(|a| actor.email_matches(&a.email))
    }

    /// Addresses for author-facing notifications: the submitter first, then
    /// listed authors, without duplicates.
    #[must_use]
    pub fn author_emails(&self) -> Vec<String> {
        let mut out = vec![self.submitter_email.clone()];
        for author in &self.authors {
            if !out.iter().any(|e| e.eq_ignore_ascii_case(&author.email)) {
                out.push(author.email.clone());
            }
        }
        out
    }

    #[must_use]
    pub fn copy_editor_email(&self) -> Option<&str> {
        self.copy_editor_assignment
            .as_ref()
            .map(|a| a.copy_editor_email.as_str())
    }

    /// Check cross-field invariants before a commit.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violated invariant.
    pub fn check_consistency(&self) -> Result<(), String> {
        if !phase_is_consistent(self.status, self.copy_edit_stage) {
            return Err(format!(
                "status {} disagrees with copy-edit stage {}",
                self.status,
                self.copy_edit_stage
                    .map_or_else(|| "none".to_string(), |s| s.to_string())
            ));
        }
        if self.copy_edit_stage == Some(CopyEditStage::ReadyForPublication)
            && self
                .author_copy_edit_review
                .as_ref()
                .is_none_or(|r| r.approval != Approval::Approved)
        {
            return Err("ready-for-publication without author approval".into());
        }
        let has_publication = self.publication.is_some();
        if has_publication != (self.status == ManuscriptStatus::Published) {
            return Err("publication record present outside published status".into());
        }
        if self.assigned_copy_editor.is_some() && self.status != ManuscriptStatus::Accepted {
            return Err("copy editor assigned outside production".into());
        }
        Ok(())
    }
}
