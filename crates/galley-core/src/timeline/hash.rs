//! BLAKE3 hash chain over timeline entries.

use chrono::SecondsFormat;

use super::TimelineEntry;
use super::canonical::canonicalize_json;

/// A break in a timeline's hash chain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("timeline sequence gap: expected seq {expected}, found {found}")]
    SequenceGap { expected: u64, found: u64 },

    #[error("entry {seq} does not link to its predecessor")]
    BrokenLink { seq: u64 },

    #[error("entry {seq} content does not match its hash")]
    HashMismatch { seq: u64 },
}

/// Compute the `blake3:<hex>` hash of an entry.
///
/// The hash input is the UTF-8 bytes of
/// `{seq}\t{event}\t{performed_by}\t{date}\t{status_after}\t{stage_after}\t{prev_hash}\t{description}\t{metadata}\n`
/// with the date in RFC 3339 (microseconds, `Z`) and metadata as canonical JSON.
#[must_use]
pub fn compute_entry_hash(entry: &TimelineEntry) -> String {
    let hash_input = format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
        entry.seq,
        entry.event,
        entry.performed_by,
        entry.date.to_rfc3339_opts(SecondsFormat::Micros, true),
        entry.status_after,
        entry.stage_after.map_or("", |s| s.as_str()),
        entry.prev_hash.as_deref().unwrap_or(""),
        entry.description,
        canonicalize_json(&entry.metadata),
    );
    let hash = blake3::hash(hash_input.as_bytes());
    format!("blake3:{hash}")
}

/// Verify that `entries` form a gapless chain starting at `seq == 1`.
///
/// # Errors
///
/// Returns the first [`ChainError`] found, scanning from the oldest entry.
pub fn verify_chain(entries: &[TimelineEntry]) -> Result<(), ChainError> {
    verify_chain_from(None, entries)
}

/// Verify that `entries` continue the chain after `prev`.
///
/// # Errors
///
/// Returns the first [`ChainError`] found.
pub fn verify_chain_from(
    prev: Option<&TimelineEntry>,
    entries: &[TimelineEntry],
) -> Result<(), ChainError> {
    let mut prev = prev;
    for entry in entries {
        let expected = prev.map_or(1, |p| p.seq + 1);
        if entry.seq != expected {
            return Err(ChainError::SequenceGap {
                expected,
                found: entry.seq,
            });
        }
        if entry.prev_hash.as_deref() != prev.map(|p| p.entry_hash.as_str()) {
            return Err(ChainError::BrokenLink { seq: entry.seq });
        }
        if compute_entry_hash(entry) != entry.entry_hash {
            return Err(ChainError::HashMismatch { seq: entry.seq });
        }
        prev = Some(entry);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ChainError, verify_chain, verify_chain_from};
    use crate::model::{AccountId, ManuscriptStatus};
    use crate::timeline::{EntryDraft, TimelineEntry, TimelineEvent};
    use chrono::{Duration, TimeZone, Utc};

    fn chain(n: usize) -> Vec<TimelineEntry> {
        let start = Utc.with_ymd_and_hms(2026, 4, 1, 10, 0, 0).unwrap();
        let mut out: Vec<TimelineEntry> = Vec::new();
        for i in 0..n {
            let entry = EntryDraft::new(
                TimelineEvent::EditorAssigned,
                format!("step {i}"),
                AccountId::new_unchecked("e1"),
                start + Duration::minutes(i64::try_from(i).unwrap()),
            )
            .seal(out.last(), ManuscriptStatus::Submitted, None);
            out.push(entry);
        }
        out
    }

    #[test]
    fn valid_chain_verifies() {
        assert_eq!(verify_chain(&chain(5)), Ok(()));
        assert_eq!(verify_chain(&[]), Ok(()));
    }

    #[test]
    fn edited_description_is_detected() {
        let mut entries = chain(3);
        entries[1].description = "rewritten".into();
        assert_eq!(
            verify_chain(&entries),
            Err(ChainError::HashMismatch { seq: 2 })
        );
    }

    #[test]
    fn dropped_entry_is_a_gap() {
        let mut entries = chain(3);
        entries.remove(1);
        assert_eq!(
            verify_chain(&entries),
            Err(ChainError::SequenceGap {
                expected: 2,
                found: 3
            })
        );
    }

    #[test]
    fn rehashed_forgery_breaks_link() {
        let mut entries = chain(3);
        entries[1].description = "rewritten".into();
        entries[1].entry_hash = super::compute_entry_hash(&entries[1]);
        assert_eq!(
            verify_chain(&entries),
            Err(ChainError::BrokenLink { seq: 3 })
        );
    }

    #[test]
    fn continuation_checks_against_persisted_tail() {
        let entries = chain(4);
        assert_eq!(verify_chain_from(Some(&entries[1]), &entries[2..]), Ok(()));
        assert!(verify_chain_from(Some(&entries[0]), &entries[2..]).is_err());
    }
}
