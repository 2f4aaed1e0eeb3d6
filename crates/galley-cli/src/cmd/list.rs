//! `galley list`: manuscripts, most recently updated first.

use anyhow::Result;
use clap::Args;
use galley_core::model::{AccountId, ManuscriptStatus};
use galley_core::store::ManuscriptFilter;
use std::io::Write;

use super::{Session, format_ts};
use crate::output::{pretty_rule, render};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Filter by status, e.g. `under-review`.
    #[arg(short, long)]
    pub status: Option<ManuscriptStatus>,

    /// Filter by submitting account (id or e-mail).
    #[arg(long)]
    pub submitted_by: Option<String>,

    /// Maximum manuscripts to show.
    #[arg(short = 'n', long, default_value = "50")]
    pub limit: usize,
}

pub fn run_list(args: &ListArgs, session: &Session) -> Result<()> {
    let submitted_by: Option<AccountId> = match args.submitted_by {
        Some(ref handle) => Some(session.account(handle)?.id),
        None => None,
    };
    let filter = ManuscriptFilter {
        status: args.status,
        submitted_by,
        limit: Some(args.limit),
    };
    let manuscripts = session.check(session.engine.list(&filter))?;
    render(session.output, &manuscripts, |list, w| {
        if list.is_empty() {
            return writeln!(w, "No manuscripts.");
        }
        writeln!(w, "{:<14} {:<24} {:<20} TITLE", "ID", "STATUS", "UPDATED")?;
        pretty_rule(w)?;
        for ms in list {
            writeln!(
                w,
                "{:<14} {:<24} {:<20} {}",
                ms.id.as_str(),
                ms.status.as_str(),
                format_ts(ms.updated_at),
                ms.title
            )?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: ListArgs,
    }

    #[test]
    fn defaults() {
        let w = Wrapper::parse_from(["test"]);
        assert!(w.args.status.is_none());
        assert!(w.args.submitted_by.is_none());
        assert_eq!(w.args.limit, 50);
    }

    #[test]
    fn status_accepts_snake_case() {
        let w = Wrapper::parse_from(["test", "--status", "under_review"]);
        assert_eq!(w.args.status, Some(ManuscriptStatus::UnderReview));
        assert!(Wrapper::try_parse_from(["test", "--status", "lost"]).is_err());
    }
}
