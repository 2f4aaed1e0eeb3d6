//! Optimistic concurrency: competing writers on the same manuscript.


use galley_core::model::{
    AccountId, Manuscript, ManuscriptId, Payment, PaymentId, PaymentStatus, Review, ReviewId,
};
use galley_core::store::{
    AccountDirectory, Commit, ManuscriptFilter, ManuscriptStore, SqliteStore, StoreError,
};
use galley_core::{Account, Engine, ErrorCode, ErrorKind, Target};
use harness::Harness;
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

type Hook = Box<dyn FnOnce() + Send>;

/// Runs `hook` once, right after the first manuscript load, so another
/// writer can land between the engine's load and its commit.
struct Interleaved {
    inner: SqliteStore,
    hook: Mutex<Option<Hook>>,
}

impl Interleaved {
    fn new(inner: SqliteStore, hook: impl FnOnce() + Send + 'static) -> Self {
        Self {
            inner,
            hook: Mutex::new(Some(Box::new(hook))),
        }
    }
}

impl ManuscriptStore for Interleaved {
    fn load_manuscript(&self, id: &ManuscriptId) -> Result<Option<Manuscript>, StoreError> {
        let loaded = self.inner.load_manuscript(id)?;
        if let Some(hook) = self.hook.lock().unwrap().take() {
            hook();
        }
        Ok(loaded)
    }

    fn list_manuscripts(&self, filter: &ManuscriptFilter) -> Result<Vec<Manuscript>, StoreError> {
        self.inner.list_manuscripts(filter)
    }

    fn payments_for(&self, id: &ManuscriptId) -> Result<Vec<Payment>, StoreError> {
        self.inner.payments_for(id)
    }

    fn load_payment(&self, id: &PaymentId) -> Result<Option<Payment>, StoreError> {
        self.inner.load_payment(id)
    }

    fn reviews_for(&self, id: &ManuscriptId) -> Result<Vec<Review>, StoreError> {
        self.inner.reviews_for(id)
    }

    fn load_review(&self, id: &ReviewId) -> Result<Option<Review>, StoreError> {
        self.inner.load_review(id)
    }

    fn commit(&self, commit: &Commit) -> Result<(), StoreError> {
        self.inner.commit(commit)
    }
}

impl AccountDirectory for Interleaved {
    fn find_account(&self, id: &AccountId) -> Result<Option<Account>, StoreError> {
        self.inner.find_account(id)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        self.inner.find_by_email(email)
    }

    fn upsert_account(&self, account: &Account) -> Result<(), StoreError> {
        self.inner.upsert_account(account)
    }

    fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        self.inner.list_accounts()
    }
}

#[test]
fn stale_snapshot_is_refused() {
    let h = Harness::in_memory();
    let ms = h.under_review("Norway");
    let snapshot = Target::from(&ms);

    h.engine
        .assign_reviewer(&h.actor("acct-ed"), &snapshot, &harness::id("acct-rev2"), None)
        .unwrap();
    let err = h
        .engine
        .decide(&h.actor("acct-ed"), &snapshot, "reject", "")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StateConflict);
    assert_eq!(err.code(), ErrorCode::ConcurrentModification);
}

#[test]
fn accept_and_reject_race_on_one_engine() {
    let h = Arc::new(Harness::in_memory());
    let ms = h.under_review("Norway");
    let snapshot = Target::from(&ms);
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = ["accept", "reject"]
        .into_iter()
        .map(|decision| {
            let h = Arc::clone(&h);
            let barrier = Arc::clone(&barrier);
            let snapshot = snapshot.clone();
            thread::spawn(move || {
                let editor = h.actor("acct-ed");
                barrier.wait();
                h.engine.decide(&editor, &snapshot, decision, "race")
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|t| t.join().unwrap()).collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "{results:?}");
    let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert_eq!(loser.kind(), ErrorKind::StateConflict);

    let stored = h.reload(&ms);
    assert_eq!(stored.revision, ms.revision + 1);
    assert_eq!(stored.timeline.len(), ms.timeline.len() + 1);

    // A losing accept must not leave a live obligation behind.
    let live = h.gateway.entries().into_iter().filter(|(_, e)| !e.voided).count();
    assert_eq!(live, h.engine.payments(&ms.id).unwrap().len());
}

#[test]
fn separate_connections_on_one_file_race() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("galley.db");
    let first = Harness::with_store(SqliteStore::open(&path).unwrap());
    let ms = first.under_review("Nepal");
    let second = Harness::with_store(SqliteStore::open(&path).unwrap());
    let snapshot = Target::from(&ms);

    let barrier = Barrier::new(2);
    let results = thread::scope(|scope| {
        let a = scope.spawn(|| {
            let editor = first.actor("acct-ed");
            barrier.wait();
            first.engine.decide(&editor, &snapshot, "accept", "a")
        });
        let b = scope.spawn(|| {
            let editor = second.actor("acct-ed");
            barrier.wait();
            second.engine.decide(&editor, &snapshot, "minor-revision", "b")
        });
        [a.join().unwrap(), b.join().unwrap()]
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1, "{results:?}");
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(err.code(), ErrorCode::ConcurrentModification);
    }
    let stored = second.reload(&ms);
    assert_eq!(stored.revision, ms.revision + 1);
    assert!(galley_core::timeline::verify_chain(&stored.timeline).is_ok());
}

#[test]
fn payment_failing_mid_assignment_blocks_the_copy_editor() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("galley.db");
    let seed = Arc::new(Harness::with_store(SqliteStore::open(&path).unwrap()));
    let ms = seed.accepted("Norway");
    let admin = seed.actor("acct-admin");
    let payment = seed.engine.payments(&ms.id).unwrap().remove(0);
    seed.engine
        .record_payment_outcome(&admin, &payment.id, PaymentStatus::Completed, None)
        .unwrap();
    seed.tick();

    let writer = Arc::clone(&seed);
    let failed = payment.id.clone();
    let store = Interleaved::new(SqliteStore::open(&path).unwrap(), move || {
        writer
            .engine
            .record_payment_outcome(&admin, &failed, PaymentStatus::Failed, Some("chargeback".into()))
            .unwrap();
    });
    let engine = Engine::new(store, harness::config()).with_clock(seed.clock.clone());

    let err = engine
        .assign_copy_editor(
            &seed.actor("acct-ed"),
            &Target::latest(ms.id.clone()),
            &harness::id("acct-ce"),
            None,
        )
        .unwrap_err();
    assert!(
        matches!(
            err.code(),
            ErrorCode::ConcurrentModification | ErrorCode::PaymentRequired
        ),
        "{err:?}"
    );

    let stored = seed.reload(&ms);
    assert!(stored.assigned_copy_editor.is_none());
    assert_eq!(
        seed.engine.payments(&ms.id).unwrap()[0].status,
        PaymentStatus::Failed
    );
    assert!(galley_core::timeline::verify_chain(&stored.timeline).is_ok());
}

#[test]
fn completed_payment_later_failed_blocks_the_copy_editor() {
    let h = Harness::in_memory();
    let ms = h.accepted("Norway");
    let admin = h.actor("acct-admin");
    let payment = h.engine.payments(&ms.id).unwrap().remove(0);
    h.tick();
    h.engine
        .record_payment_outcome(&admin, &payment.id, PaymentStatus::Completed, None)
        .unwrap();
    h.tick();
    h.engine
        .record_payment_outcome(&admin, &payment.id, PaymentStatus::Failed, Some("chargeback".into()))
        .unwrap();
    h.tick();

    let err = h
        .engine
        .assign_copy_editor(
            &h.actor("acct-ed"),
            &Target::latest(ms.id.clone()),
            &harness::id("acct-ce"),
            None,
        )
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::PaymentRequired);
    assert!(h.reload(&ms).assigned_copy_editor.is_none());
}
