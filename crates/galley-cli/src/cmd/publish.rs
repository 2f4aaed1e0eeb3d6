//! `galley publish`: bind a manuscript to a volume and issue.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use galley_core::workflow::publish::PublishRequest;

use super::{Session, TargetArgs, parse_date, render_transition};

#[derive(Args, Debug)]
pub struct PublishArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[arg(long)]
    pub volume: u32,

    #[arg(long)]
    pub issue: u32,

    /// Page range, e.g. `101-118` or `e2041`.
    #[arg(long)]
    pub pages: String,

    /// Publication date (YYYY-MM-DD); defaults to now.
    #[arg(long, value_parser = parse_date)]
    pub date: Option<DateTime<Utc>>,
}

pub fn run_publish(args: &PublishArgs, session: &Session) -> Result<()> {
    let actor = session.actor()?;
    let request = PublishRequest {
        volume: args.volume,
        issue: args.issue,
        pages: args.pages.clone(),
        published_date: args.date.unwrap_or_else(Utc::now),
    };
    let ms = session.check(session.engine.publish(&actor, &args.target.target(), request))?;
    render_transition(session.output, &ms)
}
