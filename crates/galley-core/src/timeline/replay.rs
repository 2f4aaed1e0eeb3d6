//! Read models rebuilt from the timeline alone.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{TimelineEntry, TimelineEvent};
use crate::model::{AccountId, Approval, CopyEditStage, ManuscriptStatus};

/// One status change as recorded by the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub seq: u64,
    pub event: TimelineEvent,
    pub from: Option<ManuscriptStatus>,
    pub to: ManuscriptStatus,
    pub date: DateTime<Utc>,
}

/// Every status change in order. The first element records submission.
#[must_use]
pub fn status_history(entries: &[TimelineEntry]) -> Vec<StatusChange> {
    let mut out = Vec::new();
    let mut current: Option<ManuscriptStatus> = None;
    for entry in entries {
        if current != Some(entry.status_after) {
            out.push(StatusChange {
                seq: entry.seq,
                event: entry.event,
                from: current,
                to: entry.status_after,
                date: entry.date,
            });
            current = Some(entry.status_after);
        }
    }
    out
}

/// An author review of a copy-edited draft, as replayed from the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorReviewRecord {
    pub seq: u64,
    pub approval: Approval,
    pub comments: String,
    pub attached_files: u64,
    pub reviewed_by: AccountId,
    pub reviewed_at: DateTime<Utc>,
    pub stage_after: Option<CopyEditStage>,
}

/// Every author review in order. The aggregate keeps only the latest one.
///
/// Entries whose metadata lacks a parseable `approval` are skipped.
#[must_use]
pub fn author_review_history(entries: &[TimelineEntry]) -> Vec<AuthorReviewRecord> {
    entries
        .iter()
        .filter(|e| e.event == TimelineEvent::AuthorCopyEditReview)
        .filter_map(|e| {
            let approval = e
                .metadata
                .get("approval")
                .and_then(serde_json::Value::as_str)?
                .parse()
                .ok()?;
            Some(AuthorReviewRecord {
                seq: e.seq,
                approval,
                comments: e
                    .metadata
                    .get("comments")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                attached_files: e
                    .metadata
                    .get("attached_files")
                    .and_then(serde_json::Value::as_u64)
                    .unwrap_or(0),
                reviewed_by: e.performed_by.clone(),
                reviewed_at: e.date,
                stage_after: e.stage_after,
            })
        })
        .collect()
}

/// Status and stage after the last entry.
#[must_use]
pub fn final_phase(
    entries: &[TimelineEntry],
) -> Option<(ManuscriptStatus, Option<CopyEditStage>)> {
    entries.last().map(|e| (e.status_after, e.stage_after))
}

#[cfg(test)]
mod tests {
    use super::{author_review_history, final_phase, status_history};
    use crate::model::{AccountId, Approval, CopyEditStage, ManuscriptStatus};
    use crate::timeline::{EntryDraft, TimelineEntry, TimelineEvent};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn push(
        out: &mut Vec<TimelineEntry>,
        event: TimelineEvent,
        metadata: serde_json::Value,
        status: ManuscriptStatus,
        stage: Option<CopyEditStage>,
    ) {
        let at = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();
        let entry = EntryDraft::new(event, event.as_str(), AccountId::new_unchecked("a1"), at)
            .with_metadata(metadata)
            .seal(out.last(), status, stage);
        out.push(entry);
    }

    #[test]
    fn replay_recovers_every_author_review() {
        use CopyEditStage as C;
        use ManuscriptStatus as S;
        let mut entries = Vec::new();
        push(&mut entries, TimelineEvent::CopyEditDraftReady, json!({}), S::Accepted, Some(C::DraftReady));
        push(
            &mut entries,
            TimelineEvent::AuthorCopyEditReview,
            json!({"approval": "needs_changes", "comments": "Fix figure 2", "attached_files": 0}),
            S::Accepted,
            Some(C::Revision),
        );
        push(&mut entries, TimelineEvent::CopyEditDraftReady, json!({}), S::Accepted, Some(C::DraftReady));
        push(
            &mut entries,
            TimelineEvent::AuthorCopyEditReview,
            json!({"approval": "approved", "comments": "", "attached_files": 2}),
            S::Accepted,
            Some(C::FinalReview),
        );

        let history = author_review_history(&entries);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].approval, Approval::NeedsChanges);
        assert_eq!(history[0].comments, "Fix figure 2");
        assert_eq!(history[1].approval, Approval::Approved);
        assert_eq!(history[1].attached_files, 2);
        assert_eq!(final_phase(&entries), Some((S::Accepted, Some(C::FinalReview))));
    }

    #[test]
    fn status_history_collapses_repeats() {
        use ManuscriptStatus as S;
        let mut entries = Vec::new();
        push(&mut entries, TimelineEvent::Submitted, json!({}), S::Submitted, None);
        push(&mut entries, TimelineEvent::EditorAssigned, json!({}), S::Submitted, None);
        push(&mut entries, TimelineEvent::ReviewerAssigned, json!({}), S::UnderReview, None);
        push(&mut entries, TimelineEvent::EditorialDecision, json!({}), S::Rejected, None);

        let history = status_history(&entries);
        let path: Vec<_> = history.iter().map(|c| c.to).collect();
        assert_eq!(path, vec![S::Submitted, S::UnderReview, S::Rejected]);
        assert_eq!(history[0].from, None);
        assert_eq!(history[2].from, Some(S::UnderReview));
        assert_eq!(history[2].event, TimelineEvent::EditorialDecision);
    }
}
