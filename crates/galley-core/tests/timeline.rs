//! Timeline as a wire format: replay and tamper detection on stored data.


use galley_core::model::{Approval, CopyEditStage};
use galley_core::store::{ManuscriptStore, SqliteStore, StoreError};
use galley_core::timeline::{ChainError, TimelineEvent, final_phase, status_history};
use galley_core::workflow::copyedit::AuthorReviewRequest;
use galley_core::{ErrorCode, Target};
use harness::Harness;
use rusqlite::Connection;

#[test]
fn replay_matches_aggregate() {
    let h = Harness::in_memory();
    let ms = h.draft_ready();
    let t = Target::latest(ms.id.clone());
    let author = h.actor("acct-ada");

    h.engine.author_review(&author, &t, harness::approve(&[])).unwrap();
    h.engine
        .author_review(
            &author,
            &t,
            AuthorReviewRequest {
                approval: Approval::NeedsChanges,
                comments: "one more thing".into(),
                attached_files: vec![harness::file("notes.pdf")],
            },
        )
        .unwrap();
    let ms = h.engine.manuscript(&ms.id).unwrap();

    assert_eq!(final_phase(&ms.timeline), Some((ms.status, ms.copy_edit_stage)));
    for (i, entry) in ms.timeline.iter().enumerate() {
        assert_eq!(entry.seq, i as u64 + 1);
    }
    assert_eq!(ms.timeline[0].event, TimelineEvent::Submitted);

    // The aggregate only keeps the latest review; the timeline keeps both.
    let latest = ms.author_copy_edit_review.as_ref().unwrap();
    assert_eq!(latest.approval, Approval::NeedsChanges);
    let history = h.engine.author_review_history(&ms.id).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].approval, Approval::Approved);
    assert_eq!(history[0].stage_after, Some(CopyEditStage::FinalReview));
    assert_eq!(history[1].stage_after, Some(CopyEditStage::Revision));
    assert_eq!(history[1].attached_files, 1);

    let changes = status_history(&ms.timeline);
    assert_eq!(changes.first().unwrap().from, None);
    assert_eq!(changes.last().unwrap().to, ms.status);
}

#[test]
fn tampered_rows_are_detected_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("galley.db");
    let h = Harness::with_store(SqliteStore::open(&path).unwrap());
    let ms = h.under_review("Norway");

    let raw = Connection::open(&path).unwrap();
    raw.execute_batch("DROP TRIGGER timeline_entries_no_update;")
        .unwrap();
    raw.execute(
        "UPDATE timeline_entries
            SET entry_json = json_set(entry_json, '$.description', 'rewritten')
          WHERE manuscript_id = ?1 AND seq = 2",
        [ms.id.as_str()],
    )
    .unwrap();

    let err = h.engine.store().load_manuscript(&ms.id).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Timeline(ChainError::HashMismatch { seq: 2 })
    ));

    let err = h.engine.manuscript(&ms.id).unwrap_err();
    assert_eq!(err.code(), ErrorCode::TimelineCorrupt);

    let checks = h.engine.store().verify_timelines().unwrap();
    assert!(checks.iter().any(|c| c.result.is_err()));
}
