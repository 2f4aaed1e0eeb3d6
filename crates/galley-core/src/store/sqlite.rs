//! SQLite-backed [`ManuscriptStore`] and [`AccountDirectory`].
//!
//! The manuscript document is stored as JSON alongside a few filterable
//! columns; timeline entries live in their own append-only table.

use rusqlite::{Connection, ErrorCode, OptionalExtension, TransactionBehavior, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use super::{AccountDirectory, Commit, ManuscriptFilter, ManuscriptStore, StoreError};
use crate::actor::{Account, RoleSet};
use crate::db;
use crate::model::{
    AccountId, Manuscript, ManuscriptId, Payment, PaymentId, Review, ReviewId, ReviewStatus,
};
use crate::timeline::{ChainError, TimelineEntry, verify_chain, verify_chain_from};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

/// Result of checking one manuscript's stored timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineCheck {
    pub manuscript_id: ManuscriptId,
    pub entries: usize,
    pub result: Result<(), ChainError>,
}

impl SqliteStore {
    /// Wrap an already configured and migrated connection.
    #[must_use]
    pub const fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Open (or create) a store file.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        Ok(Self::new(db::open_store(path)?))
    }

    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be migrated.
    pub fn open_in_memory() -> anyhow::Result<Self> {
        Ok(Self::new(db::open_in_memory()?))
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Re-verify the hash chain of every stored timeline.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if rows cannot be read or decoded.
    pub fn verify_timelines(&self) -> Result<Vec<TimelineCheck>, StoreError> {
        let conn = self.conn()?;
        let ids: Vec<String> = {
            let mut stmt =
                conn.prepare("SELECT manuscript_id FROM manuscripts ORDER BY created_at_us")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect::<Result<_, _>>()?
        };

        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let entries = read_timeline(&conn, &id)?;
            out.push(TimelineCheck {
                manuscript_id: ManuscriptId::new_unchecked(id),
                entries: entries.len(),
                result: verify_chain(&entries),
            });
        }
        Ok(out)
    }
}

impl ManuscriptStore for SqliteStore {
    fn load_manuscript(&self, id: &ManuscriptId) -> Result<Option<Manuscript>, StoreError> {
        let conn = self.conn()?;
        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT doc_json, revision FROM manuscripts WHERE manuscript_id = ?1",
                [id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((doc, revision)) = row else {
            return Ok(None);
        };

        let mut manuscript: Manuscript = serde_json::from_str(&doc)?;
        manuscript.revision = to_u64(revision, "manuscripts.revision")?;
        let timeline = read_timeline(&conn, id.as_str())?;
        verify_chain(&timeline)?;
        manuscript.timeline = timeline;
        Ok(Some(manuscript))
    }

    fn list_manuscripts(&self, filter: &ManuscriptFilter) -> Result<Vec<Manuscript>, StoreError> {
        let conn = self.conn()?;
        let limit = filter
            .limit
            .map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));
        let docs: Vec<(String, i64)> = {
            let mut stmt = conn.prepare(
                "SELECT doc_json, revision FROM manuscripts
                 WHERE (?1 IS NULL OR status = ?1)
                   AND (?2 IS NULL OR submitted_by = ?2)
                 ORDER BY updated_at_us DESC, manuscript_id
                 LIMIT ?3",
            )?;
            let rows = stmt.query_map(
                params![
                    filter.status.map(|s| s.as_str()),
                    filter.submitted_by.as_ref().map(AccountId::as_str),
                    limit
                ],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            rows.collect::<Result<_, _>>()?
        };

        docs.into_iter()
            .map(|(doc, revision)| {
                let mut manuscript: Manuscript = serde_json::from_str(&doc)?;
                manuscript.revision = to_u64(revision, "manuscripts.revision")?;
                Ok(manuscript)
            })
            .collect()
    }

    fn payments_for(&self, id: &ManuscriptId) -> Result<Vec<Payment>, StoreError> {
        let conn = self.conn()?;
        let docs = query_docs(
            &conn,
            "SELECT doc_json FROM payments WHERE manuscript_id = ?1
             ORDER BY created_at_us, payment_id",
            id.as_str(),
        )?;
        docs.iter()
            .map(|doc| serde_json::from_str(doc).map_err(StoreError::from))
            .collect()
    }

    fn load_payment(&self, id: &PaymentId) -> Result<Option<Payment>, StoreError> {
        let conn = self.conn()?;
        let doc: Option<String> = conn
            .query_row(
                "SELECT doc_json FROM payments WHERE payment_id = ?1",
                [id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        doc.map(|d| serde_json::from_str(&d).map_err(StoreError::from))
            .transpose()
    }

    fn reviews_for(&self, id: &ManuscriptId) -> Result<Vec<Review>, StoreError> {
        let conn = self.conn()?;
        let docs = query_docs(
            &conn,
            "SELECT doc_json FROM reviews WHERE manuscript_id = ?1
             ORDER BY round, assigned_at_us, review_id",
            id.as_str(),
        )?;
        docs.iter()
            .map(|doc| serde_json::from_str(doc).map_err(StoreError::from))
            .collect()
    }

    fn load_review(&self, id: &ReviewId) -> Result<Option<Review>, StoreError> {
        let conn = self.conn()?;
        let doc: Option<String> = conn
            .query_row(
                "SELECT doc_json FROM reviews WHERE review_id = ?1",
                [id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        doc.map(|d| serde_json::from_str(&d).map_err(StoreError::from))
            .transpose()
    }

    fn commit(&self, commit: &Commit) -> Result<(), StoreError> {
        let manuscript = &commit.manuscript;
        let id = manuscript.id.as_str();

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // The conditional write runs first so a lost race reports a conflict
        // rather than a timeline mismatch.
        write_manuscript(&tx, manuscript, commit.expected_revision)?;

        let last = last_entry(&tx, id)?;
        let last_seq = last.as_ref().map_or(0, |e| e.seq);
        let start = manuscript.timeline.partition_point(|e| e.seq <= last_seq);
        let appended = &manuscript.timeline[start..];
        if appended.len() != 1 {
            return Err(StoreError::InvalidCommit(format!(
                "commit must append exactly one timeline entry, found {}",
                appended.len()
            )));
        }
        verify_chain_from(last.as_ref(), appended)?;
        for entry in appended {
            if entry.status_after != manuscript.status
                || entry.stage_after != manuscript.copy_edit_stage
            {
                return Err(StoreError::InvalidCommit(format!(
                    "timeline entry {} disagrees with manuscript phase",
                    entry.seq
                )));
            }
            insert_entry(&tx, id, entry)?;
        }

        for payment in &commit.payments {
            if payment.manuscript_id != manuscript.id {
                return Err(StoreError::InvalidCommit(format!(
                    "payment {} belongs to {}",
                    payment.id, payment.manuscript_id
                )));
            }
            upsert_payment(&tx, payment)?;
        }
        for review in &commit.reviews {
            if review.manuscript_id != manuscript.id {
                return Err(StoreError::InvalidCommit(format!(
                    "review {} belongs to {}",
                    review.id, review.manuscript_id
                )));
            }
            upsert_review(&tx, review)?;
        }

        tx.commit()?;
        debug!(
            manuscript = id,
            revision = manuscript.revision,
            payments = commit.payments.len(),
            reviews = commit.reviews.len(),
            "committed manuscript"
        );
        Ok(())
    }
}

impl AccountDirectory for SqliteStore {
    fn find_account(&self, id: &AccountId) -> Result<Option<Account>, StoreError> {
        let conn = self.conn()?;
        read_account(
            &conn,
            "SELECT account_id, email, name, roles FROM accounts WHERE account_id = ?1",
            id.as_str(),
        )
    }

    fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let conn = self.conn()?;
        read_account(
            &conn,
            "SELECT account_id, email, name, roles FROM accounts WHERE email = ?1",
            email.trim(),
        )
    }

    fn upsert_account(&self, account: &Account) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO accounts (account_id, email, name, roles) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(account_id) DO UPDATE SET
                email = excluded.email, name = excluded.name, roles = excluded.roles",
            params![
                account.id.as_str(),
                account.email.trim(),
                account.name,
                account.roles.to_string()
            ],
        )
        .map_err(|e| constraint_to_duplicate(e, || format!("account e-mail {}", account.email)))?;
        Ok(())
    }

    fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT account_id, email, name, roles FROM accounts ORDER BY email")?;
        let rows: Vec<(String, String, String, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))?
            .collect::<Result<_, _>>()?;
        rows.into_iter().map(account_from_row).collect()
    }
}

fn write_manuscript(
    conn: &Connection,
    manuscript: &Manuscript,
    expected_revision: Option<u64>,
) -> Result<(), StoreError> {
    let id = manuscript.id.as_str();
    let doc = document_json(manuscript)?;
    let revision = to_i64(manuscript.revision, "revision")?;
    let stage = manuscript.copy_edit_stage.map(|s| s.as_str());

    match expected_revision {
        None => {
            if manuscript.revision != 1 {
                return Err(StoreError::InvalidCommit(format!(
                    "new manuscript must carry revision 1, found {}",
                    manuscript.revision
                )));
            }
            conn.execute(
                "INSERT INTO manuscripts (manuscript_id, title, article_type, status,
                    copy_edit_stage, submitted_by, revision, doc_json, created_at_us, updated_at_us)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    id,
                    manuscript.title,
                    manuscript.article_type.as_str(),
                    manuscript.status.as_str(),
                    stage,
                    manuscript.submitted_by.as_str(),
                    revision,
                    doc,
                    manuscript.created_at.timestamp_micros(),
                    manuscript.updated_at.timestamp_micros(),
                ],
            )
            .map_err(|e| constraint_to_duplicate(e, || format!("manuscript {id}")))?;
        }
        Some(expected) => {
            if manuscript.revision != expected + 1 {
                return Err(StoreError::InvalidCommit(format!(
                    "revision must advance from {expected} to {}, found {}",
                    expected + 1,
                    manuscript.revision
                )));
            }
            let changed = conn.execute(
                "UPDATE manuscripts SET
                    title = ?2, status = ?3, copy_edit_stage = ?4, revision = ?5,
                    doc_json = ?6, updated_at_us = ?7
                 WHERE manuscript_id = ?1 AND revision = ?8",
                params![
                    id,
                    manuscript.title,
                    manuscript.status.as_str(),
                    stage,
                    revision,
                    doc,
                    manuscript.updated_at.timestamp_micros(),
                    to_i64(expected, "expected revision")?,
                ],
            )?;
            if changed == 0 {
                return Err(StoreError::Conflict {
                    manuscript_id: id.to_string(),
                    expected,
                });
            }
        }
    }
    Ok(())
}

fn insert_entry(conn: &Connection, manuscript_id: &str, entry: &TimelineEntry) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO timeline_entries (manuscript_id, seq, event, performed_by, date_us,
            status_after, stage_after, prev_hash, entry_hash, entry_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            manuscript_id,
            to_i64(entry.seq, "seq")?,
            entry.event.as_str(),
            entry.performed_by.as_str(),
            entry.date.timestamp_micros(),
            entry.status_after.as_str(),
            entry.stage_after.map(|s| s.as_str()),
            entry.prev_hash,
            entry.entry_hash,
            serde_json::to_string(entry)?,
        ],
    )?;
    Ok(())
}

fn upsert_payment(conn: &Connection, payment: &Payment) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO payments (payment_id, manuscript_id, status, amount_minor, currency,
            doc_json, created_at_us, updated_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(payment_id) DO UPDATE SET
            status = excluded.status,
            amount_minor = excluded.amount_minor,
            currency = excluded.currency,
            doc_json = excluded.doc_json,
            updated_at_us = excluded.updated_at_us",
        params![
            payment.id.as_str(),
            payment.manuscript_id.as_str(),
            payment.status.as_str(),
            to_i64(payment.amount_minor, "amount_minor")?,
            payment.currency,
            serde_json::to_string(payment)?,
            payment.created_at.timestamp_micros(),
            payment.updated_at.timestamp_micros(),
        ],
    )
    .map_err(|e| {
        constraint_to_duplicate(e, || {
            format!("active payment for manuscript {}", payment.manuscript_id)
        })
    })?;
    Ok(())
}

fn upsert_review(conn: &Connection, review: &Review) -> Result<(), StoreError> {
    let status = match review.status {
        ReviewStatus::Pending => "pending",
        ReviewStatus::Submitted => "submitted",
    };
    conn.execute(
        "INSERT INTO reviews (review_id, manuscript_id, reviewer_id, round, status, doc_json,
            assigned_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(review_id) DO UPDATE SET
            status = excluded.status,
            doc_json = excluded.doc_json",
        params![
            review.id.as_str(),
            review.manuscript_id.as_str(),
            review.reviewer_id.as_str(),
            i64::from(review.round),
            status,
            serde_json::to_string(review)?,
            review.assigned_at.timestamp_micros(),
        ],
    )
    .map_err(|e| {
        constraint_to_duplicate(e, || {
            format!(
                "review by {} for round {} of {}",
                review.reviewer_id, review.round, review.manuscript_id
            )
        })
    })?;
    Ok(())
}

fn last_entry(conn: &Connection, manuscript_id: &str) -> Result<Option<TimelineEntry>, StoreError> {
    let json: Option<String> = conn
        .query_row(
            "SELECT entry_json FROM timeline_entries WHERE manuscript_id = ?1
             ORDER BY seq DESC LIMIT 1",
            [manuscript_id],
            |row| row.get(0),
        )
        .optional()?;
    json.map(|j| serde_json::from_str(&j).map_err(StoreError::from))
        .transpose()
}

fn read_timeline(conn: &Connection, manuscript_id: &str) -> Result<Vec<TimelineEntry>, StoreError> {
    let docs = query_docs(
        conn,
        "SELECT entry_json FROM timeline_entries WHERE manuscript_id = ?1 ORDER BY seq",
        manuscript_id,
    )?;
    docs.iter()
        .map(|doc| serde_json::from_str(doc).map_err(StoreError::from))
        .collect()
}

fn query_docs(conn: &Connection, sql: &str, key: &str) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([key], |row| row.get(0))?;
    Ok(rows.collect::<Result<_, _>>()?)
}

fn read_account(conn: &Connection, sql: &str, key: &str) -> Result<Option<Account>, StoreError> {
    let row: Option<(String, String, String, String)> = conn
        .query_row(sql, [key], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })
        .optional()?;
    row.map(account_from_row).transpose()
}

fn account_from_row(
    (id, email, name, roles): (String, String, String, String),
) -> Result<Account, StoreError> {
    let roles = RoleSet::parse_list(&roles)
        .map_err(|e| StoreError::Corrupt(format!("account {id}: {e}")))?;
    Ok(Account {
        id: AccountId::new_unchecked(id),
        email,
        name,
        roles,
    })
}

fn document_json(manuscript: &Manuscript) -> Result<String, StoreError> {
    let mut value = serde_json::to_value(manuscript)?;
    if let Some(obj) = value.as_object_mut() {
        obj.remove("timeline");
    }
    Ok(value.to_string())
}

fn constraint_to_duplicate(err: rusqlite::Error, what: impl FnOnce() -> String) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(ref e, _) if e.code == ErrorCode::ConstraintViolation => {
            StoreError::Duplicate(what())
        }
        other => StoreError::Sqlite(other),
    }
}

fn to_i64(value: u64, field: &str) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::InvalidCommit(format!("{field} out of range")))
}

fn to_u64(value: i64, field: &str) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::Corrupt(format!("{field} is negative")))
}
