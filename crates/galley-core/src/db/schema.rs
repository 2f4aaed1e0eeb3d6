//! SQLite schema for the manuscript store.
//!
//! - `manuscripts` holds the aggregate document plus filterable columns
//! - `timeline_entries` is the append-only, hash-chained timeline
//! - `payments` and `reviews` are separate aggregates keyed by manuscript
//! - `accounts` backs the role oracle
//! - `store_meta` tracks the applied schema version

/// Migration v1: core tables and integrity constraints.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS manuscripts (
    manuscript_id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    article_type TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN (
        'submitted', 'under-review', 'under-editorial-review', 'accepted',
        'minor-revision-requested', 'major-revision-requested', 'rejected',
        'published'
    )),
    copy_edit_stage TEXT,
    submitted_by TEXT NOT NULL,
    revision INTEGER NOT NULL CHECK (revision >= 0),
    doc_json TEXT NOT NULL,
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL,
    CHECK (manuscript_id LIKE 'ms-%')
);

CREATE TABLE IF NOT EXISTS timeline_entries (
    manuscript_id TEXT NOT NULL REFERENCES manuscripts(manuscript_id),
    seq INTEGER NOT NULL CHECK (seq >= 1),
    event TEXT NOT NULL,
    performed_by TEXT NOT NULL,
    date_us INTEGER NOT NULL,
    status_after TEXT NOT NULL,
    stage_after TEXT,
    prev_hash TEXT,
    entry_hash TEXT NOT NULL UNIQUE,
    entry_json TEXT NOT NULL,
    PRIMARY KEY (manuscript_id, seq),
    CHECK ((seq = 1) = (prev_hash IS NULL))
);

CREATE TRIGGER IF NOT EXISTS timeline_entries_no_update
BEFORE UPDATE ON timeline_entries
BEGIN
    SELECT RAISE(ABORT, 'timeline entries are append-only');
END;

CREATE TRIGGER IF NOT EXISTS timeline_entries_no_delete
BEFORE DELETE ON timeline_entries
BEGIN
    SELECT RAISE(ABORT, 'timeline entries are append-only');
END;

CREATE TABLE IF NOT EXISTS payments (
    payment_id TEXT PRIMARY KEY,
    manuscript_id TEXT NOT NULL REFERENCES manuscripts(manuscript_id),
    status TEXT NOT NULL CHECK (status IN ('pending', 'processing', 'completed', 'failed', 'waived')),
    amount_minor INTEGER NOT NULL CHECK (amount_minor >= 0),
    currency TEXT NOT NULL,
    doc_json TEXT NOT NULL,
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_payments_one_active
    ON payments(manuscript_id)
    WHERE status IN ('pending', 'processing');

CREATE TABLE IF NOT EXISTS reviews (
    review_id TEXT PRIMARY KEY,
    manuscript_id TEXT NOT NULL REFERENCES manuscripts(manuscript_id),
    reviewer_id TEXT NOT NULL,
    round INTEGER NOT NULL CHECK (round >= 1),
    status TEXT NOT NULL CHECK (status IN ('pending', 'submitted')),
    doc_json TEXT NOT NULL,
    assigned_at_us INTEGER NOT NULL,
    UNIQUE (manuscript_id, reviewer_id, round)
);

CREATE TABLE IF NOT EXISTS accounts (
    account_id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE COLLATE NOCASE,
    name TEXT NOT NULL,
    roles TEXT NOT NULL DEFAULT '',
    CHECK (length(trim(email)) > 0)
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL,
    created_at_us INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO store_meta (id, schema_version, created_at_us)
VALUES (1, 0, CAST(strftime('%s', 'now') AS INTEGER) * 1000000);
";

/// Migration v2: read-path indexes.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_manuscripts_status_updated
    ON manuscripts(status, updated_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_manuscripts_submitted_by
    ON manuscripts(submitted_by);

CREATE INDEX IF NOT EXISTS idx_timeline_entries_event
    ON timeline_entries(event, manuscript_id);

CREATE INDEX IF NOT EXISTS idx_payments_manuscript_updated
    ON payments(manuscript_id, updated_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_reviews_manuscript_round
    ON reviews(manuscript_id, round);

CREATE INDEX IF NOT EXISTS idx_reviews_reviewer
    ON reviews(reviewer_id, status);
";

/// Indexes the latest schema must contain.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_payments_one_active",
    "idx_manuscripts_status_updated",
    "idx_manuscripts_submitted_by",
    "idx_timeline_entries_event",
    "idx_payments_manuscript_updated",
    "idx_reviews_manuscript_round",
    "idx_reviews_reviewer",
];

#[cfg(test)]
mod tests {
    use crate::db::migrations;
    use rusqlite::{Connection, params};

    fn migrated() -> Connection {
        let mut conn = Connection::open_in_memory().expect("open");
        migrations::migrate(&mut conn).expect("migrate");
        conn.execute(
            "INSERT INTO manuscripts (manuscript_id, title, article_type, status, submitted_by,
                revision, doc_json, created_at_us, updated_at_us)
             VALUES ('ms-1', 'T', 'research-article', 'accepted', 'a1', 1, '{}', 1, 1)",
            [],
        )
        .expect("insert manuscript");
        conn
    }

    fn insert_payment(conn: &Connection, id: &str, status: &str) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO payments (payment_id, manuscript_id, status, amount_minor, currency,
                doc_json, created_at_us, updated_at_us)
             VALUES (?1, 'ms-1', ?2, 100, 'USD', '{}', 1, 1)",
            params![id, status],
        )
    }

    #[test]
    fn only_one_active_payment_per_manuscript() {
        let conn = migrated();
        insert_payment(&conn, "pay-1", "failed").expect("historical payment");
        insert_payment(&conn, "pay-2", "pending").expect("active payment");
        assert!(insert_payment(&conn, "pay-3", "processing").is_err());
        insert_payment(&conn, "pay-4", "completed").expect("settled payment");
    }

    #[test]
    fn timeline_rows_cannot_be_changed() {
        let conn = migrated();
        conn.execute(
            "INSERT INTO timeline_entries (manuscript_id, seq, event, performed_by, date_us,
                status_after, entry_hash, entry_json)
             VALUES ('ms-1', 1, 'submitted', 'a1', 1, 'submitted', 'blake3:aa', '{}')",
            [],
        )
        .expect("append");

        let update = conn.execute(
            "UPDATE timeline_entries SET event = 'published' WHERE seq = 1",
            [],
        );
        assert!(update.is_err());
        let delete = conn.execute("DELETE FROM timeline_entries", []);
        assert!(delete.is_err());

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM timeline_entries", [], |row| row.get(0))
            .expect("count");
        assert_eq!(rows, 1);
    }

    #[test]
    fn first_entry_has_no_predecessor() {
        let conn = migrated();
        let bad = conn.execute(
            "INSERT INTO timeline_entries (manuscript_id, seq, event, performed_by, date_us,
                status_after, prev_hash, entry_hash, entry_json)
             VALUES ('ms-1', 1, 'submitted', 'a1', 1, 'submitted', 'blake3:00', 'blake3:aa', '{}')",
            [],
        );
        assert!(bad.is_err());
    }

    #[test]
    fn account_email_is_case_insensitive_unique() {
        let conn = migrated();
        conn.execute(
            "INSERT INTO accounts (account_id, email, name) VALUES ('a1', 'Ada@x.org', 'Ada')",
            [],
        )
        .expect("first");
        assert!(
            conn.execute(
                "INSERT INTO accounts (account_id, email, name) VALUES ('a2', 'ada@X.org', 'Ada 2')",
                [],
            )
            .is_err()
        );
    }
}
