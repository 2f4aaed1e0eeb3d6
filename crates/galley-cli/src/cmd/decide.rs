//! `galley decide`: the editorial decision.

use anyhow::Result;
use clap::Args;

use super::{Session, TargetArgs, render_transition};

#[derive(Args, Debug)]
pub struct DecideArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// accept, minor-revision, major-revision or reject.
    pub decision: String,

    /// Decision letter sent to the authors.
    #[arg(long, default_value = "")]
    pub comments: String,
}

/// Execute `galley decide`. The engine parses the decision; unknown values
/// fail with its validation code.
pub fn run_decide(args: &DecideArgs, session: &Session) -> Result<()> {
    let actor = session.actor()?;
    let ms = session.check(session.engine.decide(
        &actor,
        &args.target.target(),
        &args.decision,
        &args.comments,
    ))?;
    render_transition(session.output, &ms)
}
