//! `galley assign`: editor, reviewer and copy-editor assignment.

use anyhow::Result;
use clap::{Args, Subcommand};
use std::io::Write;

use super::{Session, TargetArgs, parse_date, render_transition};
use crate::output::render;

#[derive(Subcommand, Debug)]
pub enum AssignCommand {
    /// Assign the handling editor.
    Editor(AssigneeArgs),
    /// Invite a reviewer for the current round.
    Reviewer(DatedAssigneeArgs),
    /// Hand an accepted manuscript to a copy editor (payment-gated).
    CopyEditor(DatedAssigneeArgs),
}

#[derive(Args, Debug)]
pub struct AssigneeArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Assignee account id or e-mail.
    pub assignee: String,
}

#[derive(Args, Debug)]
pub struct DatedAssigneeArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Assignee account id or e-mail.
    pub assignee: String,

    /// Due date (YYYY-MM-DD); defaults to the configured number of days.
    #[arg(long, value_parser = parse_date)]
    pub due: Option<chrono::DateTime<chrono::Utc>>,
}

pub fn run_assign(command: &AssignCommand, session: &Session) -> Result<()> {
    let actor = session.actor()?;
    match command {
        AssignCommand::Editor(args) => {
            let editor = session.account(&args.assignee)?;
            let ms = session.check(session.engine.assign_editor(
                &actor,
                &args.target.target(),
                &editor.id,
            ))?;
            render_transition(session.output, &ms)
        }
        AssignCommand::Reviewer(args) => {
            let reviewer = session.account(&args.assignee)?;
            let ms = session.check(session.engine.assign_reviewer(
                &actor,
                &args.target.target(),
                &reviewer.id,
                args.due,
            ))?;
            // The review id is needed by the reviewer to submit a report.
            let reviews = session.check(session.engine.reviews(&ms.id))?;
            let review = reviews
                .iter()
                .rev()
                .find(|r| r.reviewer_id == reviewer.id && r.round == ms.review_round);
            match review {
                Some(review) => render(session.output, review, |r, w| {
                    writeln!(
                        w,
                        "✓ {}  review {} assigned to {} (round {}, due {})",
                        ms.id,
                        r.id,
                        r.reviewer_email,
                        r.round,
                        super::format_ts(r.due_date)
                    )
                }),
                None => render_transition(session.output, &ms),
            }
        }
        AssignCommand::CopyEditor(args) => {
            let copy_editor = session.account(&args.assignee)?;
            let ms = session.check(session.engine.assign_copy_editor(
                &actor,
                &args.target.target(),
                &copy_editor.id,
                args.due,
            ))?;
            render_transition(session.output, &ms)
        }
    }
}
