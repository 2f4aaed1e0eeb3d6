//! `galley timeline`: the append-only audit log of a manuscript.

use anyhow::Result;
use clap::Args;
use std::io::Write;

use super::{Session, TargetArgs, format_ts};
use crate::output::{pretty_rule, render};

#[derive(Args, Debug)]
pub struct TimelineArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Show status changes only.
    #[arg(long, conflicts_with = "author_reviews")]
    pub status: bool,

    /// Show every author review of the copy-edited draft, oldest first.
    #[arg(long)]
    pub author_reviews: bool,
}

pub fn run_timeline(args: &TimelineArgs, session: &Session) -> Result<()> {
    let id = args.target.id();
    if args.status {
        let changes = session.check(session.engine.status_history(&id))?;
        return render(session.output, &changes, |changes, w| {
            for c in changes {
                let from = c.from.map_or("-", |s| s.as_str());
                writeln!(w, "{:>4}  {}  {} -> {}", c.seq, format_ts(c.date), from, c.to)?;
            }
            Ok(())
        });
    }

    if args.author_reviews {
        let reviews = session.check(session.engine.author_review_history(&id))?;
        return render(session.output, &reviews, |reviews, w| {
            if reviews.is_empty() {
                return writeln!(w, "No author reviews.");
            }
            for r in reviews {
                writeln!(
                    w,
                    "{:>4}  {}  {}  {}",
                    r.seq,
                    format_ts(r.reviewed_at),
                    r.approval.as_str(),
                    r.reviewed_by
                )?;
                if !r.comments.is_empty() {
                    writeln!(w, "      {}", r.comments)?;
                }
            }
            Ok(())
        });
    }

    let manuscript = session.check(session.engine.manuscript(&id))?;
    render(session.output, &manuscript.timeline, |entries, w| {
        writeln!(w, "{:>4}  {:<20} {:<26} {:<16} DESCRIPTION", "SEQ", "DATE", "EVENT", "BY")?;
        pretty_rule(w)?;
        for e in entries {
            writeln!(
                w,
                "{:>4}  {:<20} {:<26} {:<16} {}",
                e.seq,
                format_ts(e.date),
                e.event.as_str(),
                e.performed_by.as_str(),
                e.description
            )?;
        }
        Ok(())
    })
}
