//! `galley revise`: author resubmission after a revision request.

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use galley_core::workflow::decision::RevisionRequest;

use super::{Session, TargetArgs, parse_files, render_transition};

#[derive(Args, Debug)]
pub struct ReviseArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Point-by-point response to the reviewers.
    #[arg(long)]
    pub response: String,

    /// Summary of what changed.
    #[arg(long)]
    pub summary: String,

    /// Revised manuscript file as `name=url`. Repeatable; replaces the
    /// current file set.
    #[arg(long)]
    pub file: Vec<String>,
}

pub fn run_revise(args: &ReviseArgs, session: &Session) -> Result<()> {
    let actor = session.actor()?;
    let files = parse_files(&args.file, Utc::now()).or_else(|err| session.refuse(&err))?;
    let request = RevisionRequest {
        response_to_reviewers: args.response.clone(),
        summary_of_changes: args.summary.clone(),
        files,
    };
    let ms = session.check(session.engine.resubmit(&actor, &args.target.target(), request))?;
    render_transition(session.output, &ms)
}
