//! `galley copyedit`: the copy-editing sub-workflow after assignment.

use anyhow::Result;
use chrono::Utc;
use clap::{Args, Subcommand};
use galley_core::model::Approval;
use galley_core::workflow::copyedit::AuthorReviewRequest;

use super::{Session, TargetArgs, parse_files, render_transition};

#[derive(Subcommand, Debug)]
pub enum CopyEditCommand {
    /// Copy editor: the draft is ready for the authors.
    DraftReady(NotesArgs),
    /// Copy editor: pick the draft back up after requested changes.
    Resume(TargetArgs),
    /// Author: approve the draft or request changes.
    Review(AuthorReviewArgs),
    /// Copy editor: upload a galley proof.
    Proof(ProofArgs),
    /// Copy editor: confirm copy editing is complete.
    Confirm(TargetArgs),
}

#[derive(Args, Debug)]
pub struct NotesArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args, Debug)]
pub struct AuthorReviewArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// `approved` or `needs-changes`.
    #[arg(long)]
    pub approval: Approval,

    /// Required when requesting changes.
    #[arg(long, default_value = "")]
    pub comments: String,

    /// Corrected file as `name=url`. Repeatable; on approval the set
    /// replaces the manuscript files.
    #[arg(long)]
    pub file: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ProofArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Proof file as `name=url`. Repeatable.
    #[arg(long, required = true)]
    pub file: Vec<String>,

    #[arg(long)]
    pub notes: Option<String>,
}

pub fn run_copyedit(command: &CopyEditCommand, session: &Session) -> Result<()> {
    let actor = session.actor()?;
    let engine = &session.engine;
    let ms = match command {
        CopyEditCommand::DraftReady(args) => session.check(engine.mark_draft_ready(
            &actor,
            &args.target.target(),
            args.notes.clone(),
        ))?,
        CopyEditCommand::Resume(target) => {
            session.check(engine.resume_copy_editing(&actor, &target.target()))?
        }
        CopyEditCommand::Review(args) => {
            let attached_files =
                parse_files(&args.file, Utc::now()).or_else(|err| session.refuse(&err))?;
            let request = AuthorReviewRequest {
                approval: args.approval,
                comments: args.comments.clone(),
                attached_files,
            };
            session.check(engine.author_review(&actor, &args.target.target(), request))?
        }
        CopyEditCommand::Proof(args) => {
            let files = parse_files(&args.file, Utc::now()).or_else(|err| session.refuse(&err))?;
            session.check(engine.submit_galley_proof(
                &actor,
                &args.target.target(),
                files,
                args.notes.clone(),
            ))?
        }
        CopyEditCommand::Confirm(target) => {
            session.check(engine.confirm_copy_edit(&actor, &target.target()))?
        }
    };
    render_transition(session.output, &ms)
}
