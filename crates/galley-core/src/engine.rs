//! Orchestration: load, transition, commit, then notify.
//!
//! Every mutating operation follows the same unit of work:
//!
//! 1. load the manuscript (and its payments/reviews when the transition
//!    needs them) from the store;
//! 2. run the pure transition in [`crate::workflow`] against that snapshot;
//! 3. seal the timeline entry, bump the revision and commit conditionally on
//!    the revision read in step 1;
//! 4. dispatch notifications, absorbing failures.
//!
//! Gateway calls happen between 2's authorization checks and the commit. If
//! the commit then fails, the obligation is voided best-effort.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::actor::{Account, Actor};
use crate::clock::{Clock, SystemClock};
use crate::config::WorkflowConfig;
use crate::error::{Entity, WorkflowError};
use crate::model::{
    AccountId, FileRef, Manuscript, ManuscriptId, Payment, PaymentId, PaymentStatus, Review,
    ReviewId, ReviewSummary,
};
use crate::notify::{LogSink, NotificationSink, dispatch};
use crate::payment::{
    FeeCalculator, LedgerGateway, ObligationRequest, PaymentGateway, ScheduleFeeCalculator,
};
use crate::store::{AccountDirectory, Commit, ManuscriptFilter, ManuscriptStore};
use crate::timeline::{AuthorReviewRecord, StatusChange, author_review_history, status_history};
use crate::workflow::copyedit::{self, AuthorReviewRequest};
use crate::workflow::decision::{self, AcceptOutcome, Decision, RevisionRequest};
use crate::workflow::publish::{self, PublishRequest};
use crate::workflow::submission::{self, ReviewSubmission, SubmitRequest};
use crate::workflow::{self, Change};

/// Which manuscript an operation acts on, optionally pinned to a revision.
///
/// A pinned revision that no longer matches the store fails with a conflict
/// before any validation runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub id: ManuscriptId,
    pub expected_revision: Option<u64>,
}

impl Target {
    #[must_use]
    pub const fn latest(id: ManuscriptId) -> Self {
        Self {
            id,
            expected_revision: None,
        }
    }

    #[must_use]
    pub const fn at(id: ManuscriptId, revision: u64) -> Self {
        Self {
            id,
            expected_revision: Some(revision),
        }
    }
}

impl From<&Manuscript> for Target {
    fn from(manuscript: &Manuscript) -> Self {
        Self::at(manuscript.id.clone(), manuscript.revision)
    }
}

impl From<ManuscriptId> for Target {
    fn from(id: ManuscriptId) -> Self {
        Self::latest(id)
    }
}

/// The manuscript lifecycle engine.
pub struct Engine<S> {
    store: S,
    fees: Arc<dyn FeeCalculator>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    config: WorkflowConfig,
}

impl<S> std::fmt::Debug for Engine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: ManuscriptStore + AccountDirectory> Engine<S> {
    /// Engine with the configured fee schedule, a local ledger gateway, a
    /// logging notification sink and the system clock.
    pub fn new(store: S, config: WorkflowConfig) -> Self {
        Self {
            store,
            fees: Arc::new(ScheduleFeeCalculator::new(config.fees.clone())),
            gateway: Arc::new(LedgerGateway::new()),
            notifier: Arc::new(LogSink),
            clock: Arc::new(SystemClock),
            config,
        }
    }

    #[must_use]
    pub fn with_gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateway = gateway;
        self
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = notifier;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_fee_calculator(mut self, fees: Arc<dyn FeeCalculator>) -> Self {
        self.fees = fees;
        self
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    // ----- reads -----

    /// # Errors
    ///
    /// Not found, or a store failure.
    pub fn manuscript(&self, id: &ManuscriptId) -> Result<Manuscript, WorkflowError> {
        self.store
            .load_manuscript(id)?
            .ok_or_else(|| WorkflowError::not_found(Entity::Manuscript, id))
    }

    /// # Errors
    ///
    /// Store failure.
    pub fn list(&self, filter: &ManuscriptFilter) -> Result<Vec<Manuscript>, WorkflowError> {
        Ok(self.store.list_manuscripts(filter)?)
    }

    /// # Errors
    ///
    /// Not found, or a store failure.
    pub fn payments(&self, id: &ManuscriptId) -> Result<Vec<Payment>, WorkflowError> {
        self.manuscript(id)?;
        Ok(self.store.payments_for(id)?)
    }

    /// # Errors
    ///
    /// Not found, or a store failure.
    pub fn reviews(&self, id: &ManuscriptId) -> Result<Vec<Review>, WorkflowError> {
        self.manuscript(id)?;
        Ok(self.store.reviews_for(id)?)
    }

    /// Summary of the manuscript's current review round.
    ///
    /// # Errors
    ///
    /// Not found, or a store failure.
    pub fn review_summary(&self, id: &ManuscriptId) -> Result<ReviewSummary, WorkflowError> {
        let manuscript = self.manuscript(id)?;
        let reviews = self.store.reviews_for(id)?;
        Ok(ReviewSummary::for_round(manuscript.review_round, &reviews))
    }

    /// Every author review of the copy-edited draft, replayed from the
    /// timeline.
    ///
    /// # Errors
    ///
    /// Not found, or a store failure.
    pub fn author_review_history(
        &self,
        id: &ManuscriptId,
    ) -> Result<Vec<AuthorReviewRecord>, WorkflowError> {
        Ok(author_review_history(&self.manuscript(id)?.timeline))
    }

    /// # Errors
    ///
    /// Not found, or a store failure.
    pub fn status_history(&self, id: &ManuscriptId) -> Result<Vec<StatusChange>, WorkflowError> {
        Ok(status_history(&self.manuscript(id)?.timeline))
    }

    // ----- intake and review -----

    /// # Errors
    ///
    /// See [`submission::submit`]; store failures.
    pub fn submit(&self, actor: &Actor, request: SubmitRequest) -> Result<Manuscript, WorkflowError> {
        let (manuscript, change) = submission::submit(actor, request, self.clock.now())?;
        self.finish(manuscript, None, change)
    }

    /// # Errors
    ///
    /// See [`submission::assign_editor`]; not found for an unknown account.
    pub fn assign_editor(
        &self,
        actor: &Actor,
        target: &Target,
        editor: &AccountId,
    ) -> Result<Manuscript, WorkflowError> {
        let editor = self.account(editor)?;
        self.apply(target, |ms, now| {
            submission::assign_editor(ms, actor, &editor, now)
        })
    }

    /// Assign a reviewer; `due_date` defaults to `[review] due_days` from now.
    ///
    /// # Errors
    ///
    /// See [`submission::assign_reviewer`]; not found for an unknown account.
    pub fn assign_reviewer(
        &self,
        actor: &Actor,
        target: &Target,
        reviewer: &AccountId,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Manuscript, WorkflowError> {
        let reviewer = self.account(reviewer)?;
        let due_days = self.config.review.due_days;
        self.apply(target, |ms, now| {
            let existing = self.store.reviews_for(&ms.id)?;
            let due = due_date.unwrap_or_else(|| now + Duration::days(due_days));
            submission::assign_reviewer(ms, actor, &reviewer, &existing, due, now)
        })
    }

    /// # Errors
    ///
    /// See [`submission::submit_review`]; not found for an unknown review.
    pub fn submit_review(
        &self,
        actor: &Actor,
        review: &ReviewId,
        report: ReviewSubmission,
    ) -> Result<Manuscript, WorkflowError> {
        let manuscript_id = self.review(review)?.manuscript_id;
        self.apply(&Target::latest(manuscript_id), |ms, now| {
            // Re-read under the loaded revision; a concurrent submit bumps it.
            let review = self.review(review)?;
            submission::submit_review(ms, actor, &review, report, now)
        })
    }

    /// # Errors
    ///
    /// See [`submission::begin_editorial_review`].
    pub fn begin_editorial_review(
        &self,
        actor: &Actor,
        target: &Target,
    ) -> Result<Manuscript, WorkflowError> {
        self.apply(target, |ms, now| {
            let reviews = self.store.reviews_for(&ms.id)?;
            submission::begin_editorial_review(ms, actor, &reviews, now)
        })
    }

    // ----- editorial decision -----

    /// Issue an editorial decision. `accept` computes the fee and, when
    /// something is owed, opens an obligation with the gateway first; a
    /// gateway failure leaves the manuscript untouched.
    ///
    /// # Errors
    ///
    /// See [`decision::decide`]; [`WorkflowError::UnknownDecision`];
    /// gateway failures.
    pub fn decide(
        &self,
        actor: &Actor,
        target: &Target,
        decision: &str,
        comments: &str,
    ) -> Result<Manuscript, WorkflowError> {
        let mut manuscript = self.load(target)?;
        let expected = manuscript.revision;
        decision::authorize_decision(&manuscript, actor)?;
        let decision = Decision::parse(decision)?;

        let reviews = self.store.reviews_for(&manuscript.id)?;
        let summary = ReviewSummary::for_round(manuscript.review_round, &reviews);
        let now = self.clock.now();
        let outcome = if decision == Decision::Accept {
            Some(self.open_obligation(&manuscript, now)?)
        } else {
            None
        };
        let obligation = outcome
            .as_ref()
            .and_then(|o| o.payment.as_ref())
            .map(|p| p.id.clone());

        let result = decision::decide(&mut manuscript, actor, decision, comments, &summary, outcome, now)
            .and_then(|change| self.finish(manuscript, Some(expected), change));
        if result.is_err() {
            self.void_obligation(obligation.as_ref());
        }
        result
    }

    /// # Errors
    ///
    /// See [`decision::resubmit`].
    pub fn resubmit(
        &self,
        actor: &Actor,
        target: &Target,
        request: RevisionRequest,
    ) -> Result<Manuscript, WorkflowError> {
        self.apply(target, |ms, now| decision::resubmit(ms, actor, request, now))
    }

    // ----- payments -----

    /// Record a gateway-reported payment outcome.
    ///
    /// # Errors
    ///
    /// See [`workflow::payment::record_payment_outcome`]; not found for an
    /// unknown payment.
    pub fn record_payment_outcome(
        &self,
        actor: &Actor,
        payment: &PaymentId,
        outcome: PaymentStatus,
        note: Option<String>,
    ) -> Result<Manuscript, WorkflowError> {
        let manuscript_id = self.payment(payment)?.manuscript_id;
        self.apply(&Target::latest(manuscript_id), |ms, now| {
            let payment = self.payment(payment)?;
            workflow::payment::record_payment_outcome(ms, actor, &payment, outcome, note, now)
        })
    }

    /// Recompute the fee and open a fresh obligation after the previous one
    /// failed.
    ///
    /// # Errors
    ///
    /// See [`workflow::payment::reissue`]; gateway failures.
    pub fn reissue_payment(&self, actor: &Actor, target: &Target) -> Result<Manuscript, WorkflowError> {
        let mut manuscript = self.load(target)?;
        let expected = manuscript.revision;
        let payments = self.store.payments_for(&manuscript.id)?;
        workflow::payment::check_reissue(&manuscript, actor, &payments)?;

        let now = self.clock.now();
        let outcome = self.open_obligation(&manuscript, now)?;
        let obligation = outcome.payment.as_ref().map(|p| p.id.clone());
        let result = workflow::payment::reissue(&mut manuscript, actor, &payments, outcome, now)
            .and_then(|change| self.finish(manuscript, Some(expected), change));
        if result.is_err() {
            self.void_obligation(obligation.as_ref());
        }
        result
    }

    // ----- copy editing -----

    /// Assign or replace the copy editor; `due_date` defaults to
    /// `[copy_edit] due_days` from now. Payments are read after the
    /// manuscript, so any payment change since then fails the commit.
    ///
    /// # Errors
    ///
    /// See [`copyedit::assign_copy_editor`]; not found for an unknown account.
    pub fn assign_copy_editor(
        &self,
        actor: &Actor,
        target: &Target,
        copy_editor: &AccountId,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Manuscript, WorkflowError> {
        let copy_editor = self.account(copy_editor)?;
        let due_days = self.config.copy_edit.due_days;
        self.apply(target, |ms, now| {
            let payments = self.store.payments_for(&ms.id)?;
            let due = due_date.unwrap_or_else(|| now + Duration::days(due_days));
            copyedit::assign_copy_editor(ms, actor, &copy_editor, &payments, due, now)
        })
    }

    /// # Errors
    ///
    /// See [`copyedit::mark_draft_ready`].
    pub fn mark_draft_ready(
        &self,
        actor: &Actor,
        target: &Target,
        notes: Option<String>,
    ) -> Result<Manuscript, WorkflowError> {
        self.apply(target, |ms, now| copyedit::mark_draft_ready(ms, actor, notes, now))
    }

    /// # Errors
    ///
    /// See [`copyedit::resume_copy_editing`].
    pub fn resume_copy_editing(&self, actor: &Actor, target: &Target) -> Result<Manuscript, WorkflowError> {
        self.apply(target, |ms, now| copyedit::resume_copy_editing(ms, actor, now))
    }

    /// # Errors
    ///
    /// See [`copyedit::author_review`].
    pub fn author_review(
        &self,
        actor: &Actor,
        target: &Target,
        request: AuthorReviewRequest,
    ) -> Result<Manuscript, WorkflowError> {
        self.apply(target, |ms, now| copyedit::author_review(ms, actor, request, now))
    }

    /// # Errors
    ///
    /// See [`copyedit::submit_galley_proof`].
    pub fn submit_galley_proof(
        &self,
        actor: &Actor,
        target: &Target,
        files: Vec<FileRef>,
        notes: Option<String>,
    ) -> Result<Manuscript, WorkflowError> {
        self.apply(target, |ms, now| {
            copyedit::submit_galley_proof(ms, actor, files, notes, now)
        })
    }

    /// # Errors
    ///
    /// See [`copyedit::confirm_copy_edit`].
    pub fn confirm_copy_edit(&self, actor: &Actor, target: &Target) -> Result<Manuscript, WorkflowError> {
        self.apply(target, |ms, now| copyedit::confirm_copy_edit(ms, actor, now))
    }

    // ----- publication -----

    /// # Errors
    ///
    /// See [`publish::publish`].
    pub fn publish(
        &self,
        actor: &Actor,
        target: &Target,
        request: PublishRequest,
    ) -> Result<Manuscript, WorkflowError> {
        self.apply(target, |ms, now| publish::publish(ms, actor, request, now))
    }

    // ----- internals -----

    fn account(&self, id: &AccountId) -> Result<Account, WorkflowError> {
        self.store
            .find_account(id)?
            .ok_or_else(|| WorkflowError::not_found(Entity::Account, id))
    }

    fn payment(&self, id: &PaymentId) -> Result<Payment, WorkflowError> {
        self.store
            .load_payment(id)?
            .ok_or_else(|| WorkflowError::not_found(Entity::Payment, id))
    }

    fn review(&self, id: &ReviewId) -> Result<Review, WorkflowError> {
        self.store
            .load_review(id)?
            .ok_or_else(|| WorkflowError::not_found(Entity::Review, id))
    }

    fn load(&self, target: &Target) -> Result<Manuscript, WorkflowError> {
        let manuscript = self.manuscript(&target.id)?;
        match target.expected_revision {
            Some(expected) if expected != manuscript.revision => Err(WorkflowError::Conflict {
                manuscript_id: target.id.to_string(),
                expected,
            }),
            _ => Ok(manuscript),
        }
    }

    fn apply<F>(&self, target: &Target, transition: F) -> Result<Manuscript, WorkflowError>
    where
        F: FnOnce(&mut Manuscript, DateTime<Utc>) -> Result<Change, WorkflowError>,
    {
        let mut manuscript = self.load(target)?;
        let expected = manuscript.revision;
        let change = transition(&mut manuscript, self.clock.now())?;
        self.finish(manuscript, Some(expected), change)
    }

    /// Seal, commit, then notify.
    fn finish(
        &self,
        mut manuscript: Manuscript,
        expected_revision: Option<u64>,
        change: Change,
    ) -> Result<Manuscript, WorkflowError> {
        let Change {
            entry,
            notifications,
            payments,
            reviews,
        } = change;
        let at = entry.date;
        let sealed = entry.seal(
            manuscript.timeline.last(),
            manuscript.status,
            manuscript.copy_edit_stage,
        );
        let event = sealed.event;
        manuscript.timeline.push(sealed);
        manuscript.revision += 1;
        manuscript.updated_at = at;
        manuscript
            .check_consistency()
            .map_err(WorkflowError::Inconsistent)?;

        let commit = Commit {
            manuscript,
            expected_revision,
            payments,
            reviews,
        };
        self.store.commit(&commit)?;
        let manuscript = commit.manuscript;
        info!(
            manuscript = %manuscript.id,
            event = %event,
            status = %manuscript.status,
            revision = manuscript.revision,
            "transition committed"
        );

        let delivered = dispatch(self.notifier.as_ref(), &notifications);
        debug!(
            manuscript = %manuscript.id,
            delivered,
            total = notifications.len(),
            "notifications dispatched"
        );
        Ok(manuscript)
    }

    fn open_obligation(
        &self,
        manuscript: &Manuscript,
        now: DateTime<Utc>,
    ) -> Result<AcceptOutcome, WorkflowError> {
        let fee = self.fees.calculate_fee(
            manuscript.article_type,
            manuscript.country.as_deref(),
            manuscript.institution.as_deref(),
        )?;
        if fee.is_free() {
            return Ok(AcceptOutcome { fee, payment: None });
        }

        let due_date = now + Duration::days(self.config.payment.due_days);
        let request = ObligationRequest {
            manuscript_id: manuscript.id.clone(),
            amount_minor: fee.amount_minor,
            currency: fee.currency.clone(),
            due_date,
            discount: fee.discount.clone(),
            requested_at: now,
        };
        let id = self.gateway.create_obligation(&request)?;
        debug!(manuscript = %manuscript.id, payment = %id, "obligation opened");
        let payment = Payment {
            id,
            manuscript_id: manuscript.id.clone(),
            amount_minor: fee.amount_minor,
            currency: fee.currency.clone(),
            status: PaymentStatus::Pending,
            due_date,
            discount: fee.discount.clone(),
            note: fee.reason.clone(),
            created_at: now,
            updated_at: now,
        };
        Ok(AcceptOutcome {
            fee,
            payment: Some(payment),
        })
    }

    fn void_obligation(&self, id: Option<&PaymentId>) {
        let Some(id) = id else {
            return;
        };
        if let Err(err) = self.gateway.void_obligation(id) {
            warn!(payment = %id, error = %err, "could not void uncommitted obligation");
        }
    }
}
