//! Persistence seam for manuscripts, payments, reviews and accounts.

pub mod sqlite;

pub use sqlite::SqliteStore;

use crate::actor::Account;
use crate::model::{
    AccountId, Manuscript, ManuscriptId, ManuscriptStatus, Payment, PaymentId, Review, ReviewId,
};
use crate::timeline::ChainError;

/// Errors from a store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The conditional write lost to a concurrent writer.
    #[error("manuscript {manuscript_id} was modified concurrently (expected revision {expected})")]
    Conflict { manuscript_id: String, expected: u64 },

    #[error("{0} already exists")]
    Duplicate(String),

    /// A commit did not append a valid continuation of the timeline.
    #[error("timeline rejected: {0}")]
    Timeline(#[from] ChainError),

    #[error("invalid commit: {0}")]
    InvalidCommit(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("store connection lock poisoned")]
    Poisoned,
}

/// One atomic unit of work: the manuscript document, the timeline entry it
/// gained, and any payment or review rows touched by the same transition.
#[derive(Debug, Clone)]
pub struct Commit {
    /// Document to write. Its `timeline` must extend the stored one by
    /// exactly one entry, and its `revision` must be `expected + 1`.
    pub manuscript: Manuscript,
    /// `None` inserts a new manuscript; `Some(n)` updates only if the stored
    /// revision is still `n`.
    pub expected_revision: Option<u64>,
    /// Payments to insert or overwrite.
    pub payments: Vec<Payment>,
    /// Reviews to insert or overwrite.
    pub reviews: Vec<Review>,
}

impl Commit {
    #[must_use]
    pub const fn insert(manuscript: Manuscript) -> Self {
        Self {
            manuscript,
            expected_revision: None,
            payments: Vec::new(),
            reviews: Vec::new(),
        }
    }

    #[must_use]
    pub const fn update(manuscript: Manuscript, expected_revision: u64) -> Self {
        Self {
            manuscript,
            expected_revision: Some(expected_revision),
            payments: Vec::new(),
            reviews: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_payment(mut self, payment: Payment) -> Self {
        self.payments.push(payment);
        self
    }

    #[must_use]
    pub fn with_review(mut self, review: Review) -> Self {
        self.reviews.push(review);
        self
    }
}

/// Listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManuscriptFilter {
    pub status: Option<ManuscriptStatus>,
    pub submitted_by: Option<AccountId>,
    pub limit: Option<usize>,
}

pub trait ManuscriptStore: Send + Sync {
    /// Load a manuscript with its full timeline.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure or a broken timeline chain.
    fn load_manuscript(&self, id: &ManuscriptId) -> Result<Option<Manuscript>, StoreError>;

    /// List manuscripts, most recently updated first. Timelines are not loaded.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn list_manuscripts(&self, filter: &ManuscriptFilter) -> Result<Vec<Manuscript>, StoreError>;

    /// All payments ever recorded for a manuscript, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn payments_for(&self, id: &ManuscriptId) -> Result<Vec<Payment>, StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn load_payment(&self, id: &PaymentId) -> Result<Option<Payment>, StoreError>;

    /// All reviews for a manuscript across rounds, in assignment order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn reviews_for(&self, id: &ManuscriptId) -> Result<Vec<Review>, StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn load_review(&self, id: &ReviewId) -> Result<Option<Review>, StoreError>;

    /// Apply a commit atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the revision moved, and other
    /// variants on invalid commits or backend failure.
    fn commit(&self, commit: &Commit) -> Result<(), StoreError>;
}

/// Account lookup backing the role oracle.
pub trait AccountDirectory: Send + Sync {
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn find_account(&self, id: &AccountId) -> Result<Option<Account>, StoreError>;

    /// Case-insensitive e-mail lookup.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure or a duplicate e-mail.
    fn upsert_account(&self, account: &Account) -> Result<(), StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn list_accounts(&self) -> Result<Vec<Account>, StoreError>;
}
