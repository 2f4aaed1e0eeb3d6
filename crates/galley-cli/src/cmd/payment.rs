//! `galley payment`: list payments, record provider outcomes, reissue.

use anyhow::Result;
use clap::{Args, Subcommand};
use galley_core::model::{PaymentId, PaymentStatus, format_amount};
use std::io::Write;

use super::{Session, TargetArgs, format_ts, render_transition};
use crate::output::{pretty_rule, render};

#[derive(Subcommand, Debug)]
pub enum PaymentCommand {
    /// List every payment recorded for a manuscript.
    List(TargetArgs),
    /// Record an outcome reported by the payment provider (admin only).
    Record(RecordArgs),
    /// Open a fresh obligation after a failed payment (admin only).
    Reissue(TargetArgs),
}

#[derive(Args, Debug)]
pub struct RecordArgs {
    pub payment: String,

    /// processing, completed, failed or waived.
    pub status: PaymentStatus,

    #[arg(long)]
    pub note: Option<String>,
}

pub fn run_payment(command: &PaymentCommand, session: &Session) -> Result<()> {
    match command {
        PaymentCommand::List(target) => {
            let payments = session.check(session.engine.payments(&target.id()))?;
            render(session.output, &payments, |payments, w| {
                if payments.is_empty() {
                    return writeln!(w, "No payments.");
                }
                writeln!(w, "{:<16} {:<12} {:<16} DUE", "ID", "STATUS", "AMOUNT")?;
                pretty_rule(w)?;
                for p in payments {
                    writeln!(
                        w,
                        "{:<16} {:<12} {:<16} {}",
                        p.id.as_str(),
                        p.status.as_str(),
                        format_amount(p.amount_minor, &p.currency),
                        format_ts(p.due_date)
                    )?;
                }
                Ok(())
            })
        }
        PaymentCommand::Record(args) => {
            let actor = session.actor()?;
            let id = PaymentId::new_unchecked(args.payment.trim());
            let ms = session.check(session.engine.record_payment_outcome(
                &actor,
                &id,
                args.status,
                args.note.clone(),
            ))?;
            render_transition(session.output, &ms)
        }
        PaymentCommand::Reissue(target) => {
            let actor = session.actor()?;
            let ms = session.check(session.engine.reissue_payment(&actor, &target.target()))?;
            render_transition(session.output, &ms)
        }
    }
}
