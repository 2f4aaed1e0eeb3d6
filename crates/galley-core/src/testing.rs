//! Shared fixtures for unit tests.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::actor::{Account, Role};
use crate::model::{
    AcceptanceRecord, AccountId, ArticleType, Author, CopyEditStage, CopyEditorAssignment,
    FileId, FileRef, Manuscript, ManuscriptStatus,
};
use crate::payment::FeeQuote;
use crate::workflow::Change;
use crate::workflow::submission::{self, SubmitRequest};

pub fn at(days: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap() + Duration::days(days)
}

fn account(id: &str, email: &str, name: &str, roles: &[Role]) -> Account {
    Account {
        id: AccountId::new_unchecked(id),
        email: email.into(),
        name: name.into(),
        roles: roles.iter().copied().collect(),
    }
}

pub fn author() -> Account {
    account("acct-ada", "ada@uni.edu", "Ada Lovelace", &[Role::Author])
}

pub fn coauthor() -> Account {
    account("acct-grace", "grace@uni.edu", "Grace Hopper", &[Role::Author])
}

pub fn editor() -> Account {
    account("acct-ed", "ed@journal.org", "Ed Itor", &[Role::Editor])
}

pub fn reviewer() -> Account {
    account("acct-rev", "rev@lab.org", "Rae Viewer", &[Role::Reviewer])
}

pub fn copy_editor() -> Account {
    account("acct-ce", "ce@journal.org", "Cora Copy", &[Role::CopyEditor])
}

pub fn admin() -> Account {
    account("acct-admin", "admin@journal.org", "Ad Min", &[Role::Admin])
}

pub fn file(name: &str) -> FileRef {
    FileRef {
        id: FileId::new_unchecked(format!("file-{name}")),
        name: name.into(),
        url: format!("s3://manuscripts/{name}"),
        size_bytes: Some(1024),
        content_type: Some("application/pdf".into()),
        uploaded_at: at(0),
        is_current_version: false,
    }
}

pub fn submit_request() -> SubmitRequest {
    SubmitRequest {
        title: "Hydrothermal vent microbiomes".into(),
        abstract_text: "We sample vents.".into(),
        keywords: vec!["microbiology".into()],
        article_type: ArticleType::ResearchArticle,
        country: Some("Norway".into()),
        institution: None,
        authors: vec![
            Author {
                name: "Ada Lovelace".into(),
                email: "ada@uni.edu".into(),
                affiliation: None,
            },
            Author {
                name: "Grace Hopper".into(),
                email: "grace@uni.edu".into(),
                affiliation: Some("Navy".into()),
            },
        ],
        files: vec![file("draft-v1.pdf")],
    }
}

/// Seal `change` onto `manuscript` the way the engine does before a commit.
pub fn seal(manuscript: &mut Manuscript, change: Change) {
    let entry = change.entry.seal(
        manuscript.timeline.last(),
        manuscript.status,
        manuscript.copy_edit_stage,
    );
    manuscript.timeline.push(entry);
    manuscript.revision += 1;
}

pub fn submitted() -> Manuscript {
    let (mut ms, change) =
        submission::submit(&author().actor(), submit_request(), at(0)).unwrap();
    seal(&mut ms, change);
    ms
}

/// Accepted manuscript; `fee_minor == 0` models a waived fee.
pub fn accepted(fee_minor: u64) -> Manuscript {
    let mut ms = submitted();
    ms.assigned_editor = Some(editor().id);
    ms.assigned_editor_email = Some(editor().email);
    ms.status = ManuscriptStatus::Accepted;
    ms.copy_edit_stage = Some(CopyEditStage::AcceptedAwaitingCopyEdit);
    ms.acceptance = Some(AcceptanceRecord {
        decided_by: editor().id,
        decided_at: at(10),
        fee: FeeQuote {
            amount_minor: fee_minor,
            currency: "USD".into(),
            waived: fee_minor == 0,
            reason: None,
            discount: None,
        },
        payment_id: None,
    });
    ms
}

/// Accepted and in copy editing at `stage` with the fixture copy editor assigned.
pub fn in_production(stage: CopyEditStage) -> Manuscript {
    let mut ms = accepted(0);
    let ce = copy_editor();
    ms.copy_edit_stage = Some(stage);
    ms.assigned_copy_editor = Some(ce.id.clone());
    ms.copy_editor_assignment = Some(CopyEditorAssignment {
        copy_editor: ce.id,
        copy_editor_email: ce.email,
        assigned_by: editor().id,
        assigned_at: at(12),
        started_at: at(12),
        due_date: at(26),
        completed_at: None,
        draft_ready_at: None,
        notes: None,
        galley_proofs: Vec::new(),
        completion_confirmed: false,
        confirmed_at: None,
    });
    ms
}
