//! `galley review`: reviewer reports and the move to editorial review.

use anyhow::Result;
use clap::{Args, Subcommand};
use galley_core::model::{Ratings, Recommendation, ReviewId, ReviewStatus};
use galley_core::workflow::submission::ReviewSubmission;
use std::io::Write;

use super::{Session, TargetArgs, format_ts, render_transition};
use crate::output::{pretty_kv, pretty_rule, pretty_section, render};

#[derive(Subcommand, Debug)]
pub enum ReviewCommand {
    /// Submit the report for an assigned review.
    Submit(SubmitReviewArgs),
    /// List reviews across all rounds.
    List(TargetArgs),
    /// Summarize the current round.
    Summary(TargetArgs),
    /// Close the review round and move to editorial review.
    Conclude(TargetArgs),
}

#[derive(Args, Debug)]
pub struct SubmitReviewArgs {
    /// Review id printed by `galley assign reviewer`.
    pub review: String,

    /// accept, minor-revision, major-revision or reject.
    #[arg(long)]
    pub recommendation: Recommendation,

    /// Ratings are 1 (poor) to 5 (excellent).
    #[arg(long)]
    pub originality: u8,

    #[arg(long)]
    pub methodology: u8,

    #[arg(long)]
    pub clarity: u8,

    #[arg(long)]
    pub significance: u8,

    /// Comments shared with the authors.
    #[arg(long)]
    pub comments: String,

    /// Comments for the editors only.
    #[arg(long, default_value = "")]
    pub confidential: String,
}

pub fn run_review(command: &ReviewCommand, session: &Session) -> Result<()> {
    match command {
        ReviewCommand::Submit(args) => {
            let actor = session.actor()?;
            let report = ReviewSubmission {
                recommendation: args.recommendation,
                ratings: Ratings {
                    originality: args.originality,
                    methodology: args.methodology,
                    clarity: args.clarity,
                    significance: args.significance,
                },
                comments_for_author: args.comments.clone(),
                confidential_comments: args.confidential.clone(),
            };
            let review = ReviewId::new_unchecked(args.review.trim());
            let ms = session.check(session.engine.submit_review(&actor, &review, report))?;
            render_transition(session.output, &ms)
        }
        ReviewCommand::List(target) => {
            let reviews = session.check(session.engine.reviews(&target.id()))?;
            render(session.output, &reviews, |reviews, w| {
                if reviews.is_empty() {
                    return writeln!(w, "No reviews assigned.");
                }
                writeln!(
                    w,
                    "{:<16} {:<5} {:<26} {:<10} {:<20} RECOMMENDATION",
                    "ID", "ROUND", "REVIEWER", "STATUS", "DUE"
                )?;
                pretty_rule(w)?;
                for r in reviews {
                    writeln!(
                        w,
                        "{:<16} {:<5} {:<26} {:<10} {:<20} {}",
                        r.id.as_str(),
                        r.round,
                        r.reviewer_email,
                        status_label(r.status),
                        format_ts(r.due_date),
                        r.recommendation.map_or("-", Recommendation::as_str)
                    )?;
                }
                Ok(())
            })
        }
        ReviewCommand::Summary(target) => {
            let summary = session.check(session.engine.review_summary(&target.id()))?;
            render(session.output, &summary, |s, w| {
                pretty_section(w, &format!("Review round {}", s.round))?;
                pretty_kv(w, "Completed", format!("{} of {}", s.completed, s.assigned))?;
                for (rec, count) in &s.recommendations {
                    pretty_kv(w, rec.as_str(), count.to_string())?;
                }
                if let Some(ref mean) = s.mean_ratings {
                    pretty_kv(
                        w,
                        "Mean ratings",
                        format!(
                            "originality {:.1}, methodology {:.1}, clarity {:.1}, significance {:.1}",
                            mean.originality, mean.methodology, mean.clarity, mean.significance
                        ),
                    )?;
                }
                pretty_kv(w, "Consensus", s.consensus.map_or("none", Recommendation::as_str))
            })
        }
        ReviewCommand::Conclude(target) => {
            let actor = session.actor()?;
            let ms = session.check(session.engine.begin_editorial_review(&actor, &target.target()))?;
            render_transition(session.output, &ms)
        }
    }
}

const fn status_label(status: ReviewStatus) -> &'static str {
    match status {
        ReviewStatus::Pending => "pending",
        ReviewStatus::Submitted => "submitted",
    }
}
