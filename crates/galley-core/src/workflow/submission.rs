//! Intake and peer review: submission, editor and reviewer assignment,
//! review submission and the move to editorial review.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{
    Change, EDITORIAL, current_files, non_blank, require_files, to_editor,
};
use crate::actor::{Account, Actor, Role};
use crate::error::{ErrorCode, WorkflowError};
use crate::model::{
    ArticleType, Author, FileRef, Manuscript, ManuscriptId, ManuscriptStatus, Ratings,
    Recommendation, Review, ReviewId, ReviewStatus, ReviewSummary,
};
use crate::notify::{Notification, NotificationKind};
use crate::timeline::TimelineEvent;

/// A new manuscript as submitted by an author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub title: String,
    #[serde(default, rename = "abstract")]
    pub abstract_text: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub article_type: ArticleType,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub institution: Option<String>,
    pub authors: Vec<Author>,
    pub files: Vec<FileRef>,
}

/// Create a manuscript in `submitted`. The returned manuscript has no
/// timeline yet; the entry is in the returned [`Change`].
///
/// # Errors
///
/// Authorization if the actor lacks the author role; validation for a
/// blank title, no authors, an author without a usable e-mail, or no files.
pub fn submit(
    actor: &Actor,
    request: SubmitRequest,
    now: DateTime<Utc>,
) -> Result<(Manuscript, Change), WorkflowError> {
    actor.require_any("submit", &[Role::Author])?;
    non_blank("title", &request.title)?;
    if request.authors.is_empty() {
        return Err(WorkflowError::validation("authors", "at least one author is required"));
    }
    for author in &request.authors {
        non_blank("authors.name", &author.name)?;
        if !author.email.contains('@') {
            return Err(WorkflowError::validation(
                "authors.email",
                format!("'{}' is not an e-mail address", author.email),
            ));
        }
    }
    require_files("files", &request.files)?;

    let manuscript = Manuscript {
        id: ManuscriptId::mint(&request.title, now),
        title: request.title.trim().to_string(),
        abstract_text: request.abstract_text,
        keywords: request.keywords,
        article_type: request.article_type,
        country: request.country,
        institution: request.institution,
        status: ManuscriptStatus::Submitted,
        authors: request.authors,
        submitted_by: actor.account_id.clone(),
        submitter_email: actor.email.clone(),
        assigned_editor: None,
        assigned_editor_email: None,
        assigned_copy_editor: None,
        copy_edit_stage: None,
        draft_status: None,
        author_copy_edit_review: None,
        copy_editor_assignment: None,
        latest_manuscript_files: current_files(request.files),
        revisions: Vec::new(),
        review_round: 1,
        acceptance: None,
        publication: None,
        metrics: None,
        timeline: Vec::new(),
        revision: 0,
        created_at: now,
        updated_at: now,
    };

    let payload = json!({"title": manuscript.title});
    let change = Change::new(TimelineEvent::Submitted, "Manuscript submitted", actor, now)
        .metadata(json!({
            "article_type": manuscript.article_type,
            "authors": manuscript.authors.len(),
            "files": manuscript.latest_manuscript_files.len(),
        }))
        .notify([Notification::new(
            NotificationKind::SubmissionReceived,
            actor.email.clone(),
            &manuscript.id,
            payload,
        )]);
    Ok((manuscript, change))
}

/// Assign (or replace) the handling editor. Legal in any non-terminal status.
///
/// # Errors
///
/// Authorization unless editor/admin; state conflict when terminal;
/// validation if the assignee lacks the editor role.
pub fn assign_editor(
    manuscript: &mut Manuscript,
    actor: &Actor,
    editor: &Account,
    now: DateTime<Utc>,
) -> Result<Change, WorkflowError> {
    actor.require_any("assign editor", EDITORIAL)?;
    if manuscript.status.is_terminal() {
        return Err(WorkflowError::transition(
            "assign editor",
            manuscript.status,
            "status is terminal",
        ));
    }
    if !editor.roles.contains(Role::Editor) {
        return Err(WorkflowError::validation(
            "editor",
            format!("{} does not hold the editor role", editor.email),
        ));
    }

    let previous = manuscript.assigned_editor.replace(editor.id.clone());
    manuscript.assigned_editor_email = Some(editor.email.clone());

    Ok(Change::new(
        TimelineEvent::EditorAssigned,
        format!("Editor {} assigned", editor.name),
        actor,
        now,
    )
    .metadata(json!({
        "editor": editor.id,
        "previous_editor": previous,
    }))
    .notify([Notification::new(
        NotificationKind::EditorAssigned,
        editor.email.clone(),
        &manuscript.id,
        json!({"title": manuscript.title}),
    )]))
}

/// Assign a reviewer for the current round. The first assignment moves a
/// `submitted` manuscript to `under-review`.
///
/// # Errors
///
/// Authorization unless editor/admin; state conflict outside
/// `submitted`/`under-review`; validation if the assignee lacks the reviewer
/// role, is an author, or is already assigned this round.
pub fn assign_reviewer(
    manuscript: &mut Manuscript,
    actor: &Actor,
    reviewer: &Account,
    existing: &[Review],
    due_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Change, WorkflowError> {
    actor.require_any("assign reviewer", EDITORIAL)?;
    if !matches!(
        manuscript.status,
        ManuscriptStatus::Submitted | ManuscriptStatus::UnderReview
    ) {
        return Err(WorkflowError::transition(
            "assign reviewer",
            manuscript.status,
            "reviewers are assigned before the editorial decision",
        ));
    }
    if !reviewer.roles.contains(Role::Reviewer) {
        return Err(WorkflowError::validation(
            "reviewer",
            format!("{} does not hold the reviewer role", reviewer.email),
        ));
    }
    if manuscript.is_party(&reviewer.actor()) {
        return Err(WorkflowError::validation(
            "reviewer",
            format!("{} is an author of this manuscript", reviewer.email),
        ));
    }
    let round = manuscript.review_round;
    if existing
        .iter()
        .any(|r| r.round == round && r.reviewer_id == reviewer.id)
    {
        return Err(WorkflowError::validation(
            "reviewer",
            format!("{} is already assigned for round {round}", reviewer.email),
        ));
    }

    if manuscript.status == ManuscriptStatus::Submitted {
        manuscript
            .status
            .can_transition_to(ManuscriptStatus::UnderReview)
            .map_err(|e| WorkflowError::transition("assign reviewer", e.from, e.reason))?;
        manuscript.status = ManuscriptStatus::UnderReview;
    }

    let review = Review {
        id: ReviewId::mint(&format!("{}:{}", manuscript.id, reviewer.id), now),
        manuscript_id: manuscript.id.clone(),
        reviewer_id: reviewer.id.clone(),
        reviewer_email: reviewer.email.clone(),
        round,
        status: ReviewStatus::Pending,
        assigned_at: now,
        due_date,
        recommendation: None,
        ratings: None,
        comments_for_author: String::new(),
        confidential_comments: String::new(),
        submitted_at: None,
    };

    Ok(Change::new(
        TimelineEvent::ReviewerAssigned,
        format!("Reviewer assigned for round {round}"),
        actor,
        now,
    )
    .metadata(json!({
        "review_id": review.id,
        "reviewer": reviewer.id,
        "round": round,
        "due_date": due_date,
    }))
    .notify([Notification::new(
        NotificationKind::ReviewerAssigned,
        reviewer.email.clone(),
        &manuscript.id,
        json!({"title": manuscript.title, "due_date": due_date}),
    )])
    .review(review))
}

/// A reviewer's completed report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSubmission {
    pub recommendation: Recommendation,
    pub ratings: Ratings,
    pub comments_for_author: String,
    #[serde(default)]
    pub confidential_comments: String,
}

/// Record the assigned reviewer's report for the current round.
///
/// # Errors
///
/// Authorization unless the actor is the assigned reviewer; state conflict
/// if the manuscript is not under review or the review is closed; validation
/// for out-of-range ratings or blank author comments.
pub fn submit_review(
    manuscript: &mut Manuscript,
    actor: &Actor,
    review: &Review,
    submission: ReviewSubmission,
    now: DateTime<Utc>,
) -> Result<Change, WorkflowError> {
    const ACTION: &str = "submit review";
    actor.require_any(ACTION, &[Role::Reviewer])?;
    if review.reviewer_id != actor.account_id {
        return Err(Actor::forbidden(
            ACTION,
            ErrorCode::NotAssignee,
            format!("review {} is assigned to someone else", review.id),
        ));
    }
    if manuscript.status != ManuscriptStatus::UnderReview {
        return Err(WorkflowError::transition(
            ACTION,
            manuscript.status,
            "reviews are accepted only while under review",
        ));
    }
    if review.round != manuscript.review_round {
        return Err(WorkflowError::transition(
            ACTION,
            manuscript.status,
            format!("review belongs to closed round {}", review.round),
        ));
    }
    if review.status == ReviewStatus::Submitted {
        return Err(WorkflowError::transition(
            ACTION,
            manuscript.status,
            "review already submitted",
        ));
    }
    if let Some(field) = submission.ratings.out_of_range() {
        return Err(WorkflowError::validation(
            "ratings",
            format!("{field} must be between {} and {}", Ratings::MIN, Ratings::MAX),
        ));
    }
    non_blank("comments_for_author", &submission.comments_for_author)?;

    let mut updated = review.clone();
    updated.status = ReviewStatus::Submitted;
    updated.recommendation = Some(submission.recommendation);
    updated.ratings = Some(submission.ratings);
    updated.comments_for_author = submission.comments_for_author;
    updated.confidential_comments = submission.confidential_comments;
    updated.submitted_at = Some(now);

    Ok(Change::new(
        TimelineEvent::ReviewSubmitted,
        format!("Review submitted ({})", submission.recommendation),
        actor,
        now,
    )
    .metadata(json!({
        "review_id": updated.id,
        "round": updated.round,
        "recommendation": submission.recommendation,
    }))
    .notify(to_editor(
        manuscript,
        NotificationKind::ReviewSubmitted,
        json!({"review_id": updated.id, "recommendation": submission.recommendation}),
    ))
    .review(updated))
}

/// Move from `under-review` to `under-editorial-review`.
///
/// # Errors
///
/// Authorization unless editor/admin; state conflict from any other status
/// or when no review of the current round has been submitted.
pub fn begin_editorial_review(
    manuscript: &mut Manuscript,
    actor: &Actor,
    reviews: &[Review],
    now: DateTime<Utc>,
) -> Result<Change, WorkflowError> {
    const ACTION: &str = "begin editorial review";
    actor.require_any(ACTION, EDITORIAL)?;
    manuscript
        .status
        .can_transition_to(ManuscriptStatus::UnderEditorialReview)
        .map_err(|e| WorkflowError::transition(ACTION, e.from, e.reason))?;

    let summary = ReviewSummary::for_round(manuscript.review_round, reviews);
    if summary.completed == 0 {
        return Err(WorkflowError::transition(
            ACTION,
            manuscript.status,
            format!("no completed reviews in round {}", summary.round),
        ));
    }

    manuscript.status = ManuscriptStatus::UnderEditorialReview;
    Ok(Change::new(
        TimelineEvent::EditorialReviewStarted,
        "Editorial review started",
        actor,
        now,
    )
    .metadata(json!({
        "round": summary.round,
        "completed_reviews": summary.completed,
        "assigned_reviews": summary.assigned,
    })))
}
