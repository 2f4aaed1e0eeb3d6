//! Terminal transition binding a manuscript to a volume and issue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{Change, EDITORIAL, non_blank, to_authors};
use crate::actor::Actor;
use crate::error::WorkflowError;
use crate::model::{CopyEditStage, Manuscript, ManuscriptStatus, Metrics, Publication};
use crate::notify::NotificationKind;
use crate::timeline::TimelineEvent;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub volume: u32,
    pub issue: u32,
    pub pages: String,
    pub published_date: DateTime<Utc>,
}

/// Publish a manuscript whose copy editing is confirmed. One-way.
///
/// # Errors
///
/// Authorization unless editor/admin; state conflict unless the stage is
/// `ready-for-publication`; validation for a zero volume or issue, or blank
/// pages.
pub fn publish(
    manuscript: &mut Manuscript,
    actor: &Actor,
    request: PublishRequest,
    now: DateTime<Utc>,
) -> Result<Change, WorkflowError> {
    const ACTION: &str = "publish";
    actor.require_any(ACTION, EDITORIAL)?;
    if manuscript.copy_edit_stage != Some(CopyEditStage::ReadyForPublication) {
        return Err(WorkflowError::transition(
            ACTION,
            manuscript.status,
            "copy editing has not been confirmed",
        ));
    }
    manuscript
        .status
        .can_transition_to(ManuscriptStatus::Published)
        .map_err(|e| WorkflowError::transition(ACTION, e.from, e.reason))?;
    if request.volume == 0 {
        return Err(WorkflowError::validation("volume", "must be at least 1"));
    }
    if request.issue == 0 {
        return Err(WorkflowError::validation("issue", "must be at least 1"));
    }
    non_blank("pages", &request.pages)?;

    manuscript.status = ManuscriptStatus::Published;
    manuscript.assigned_copy_editor = None;
    manuscript.metrics = Some(Metrics::default());
    manuscript.publication = Some(Publication {
        volume: request.volume,
        issue: request.issue,
        pages: request.pages.trim().to_string(),
        published_date: request.published_date,
        published_by: actor.account_id.clone(),
    });

    let citation = json!({
        "volume": request.volume,
        "issue": request.issue,
        "pages": request.pages.trim(),
        "published_date": request.published_date,
    });
    Ok(Change::new(
        TimelineEvent::Published,
        format!("Published in volume {}, issue {}", request.volume, request.issue),
        actor,
        now,
    )
    .metadata(citation.clone())
    .notify(to_authors(
        manuscript,
        NotificationKind::ManuscriptPublished,
        &citation,
    )))
}
