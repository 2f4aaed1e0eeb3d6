//! `galley show`: full details of one manuscript.

use anyhow::Result;
use galley_core::model::{Manuscript, Payment, format_amount};
use serde::Serialize;
use std::io::{self, Write};

use super::{Session, TargetArgs, format_ts};
use crate::output::{pretty_kv, pretty_rule, pretty_section, render};

#[derive(Debug, Serialize)]
struct ShowOutput<'a> {
    #[serde(flatten)]
    manuscript: &'a Manuscript,
    payments: &'a [Payment],
}

pub fn run_show(args: &TargetArgs, session: &Session) -> Result<()> {
    let id = args.id();
    let manuscript = session.check(session.engine.manuscript(&id))?;
    let payments = session.check(session.engine.payments(&id))?;
    let out = ShowOutput {
        manuscript: &manuscript,
        payments: &payments,
    };
    render(session.output, &out, |o, w| write_human(o.manuscript, o.payments, w))
}

fn write_human(ms: &Manuscript, payments: &[Payment], w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &format!("{}  {}", ms.id, ms.title))?;
    pretty_kv(w, "Status", ms.status.label())?;
    if let Some(stage) = ms.copy_edit_stage {
        pretty_kv(w, "Copy editing", stage.label())?;
    }
    if let Some(draft) = ms.draft_status {
        pretty_kv(w, "Draft", draft.as_str())?;
    }
    pretty_kv(w, "Type", ms.article_type.as_str())?;
    pretty_kv(w, "Round", ms.review_round.to_string())?;
    pretty_kv(w, "Revision", ms.revision.to_string())?;
    pretty_kv(w, "Submitted by", &ms.submitter_email)?;
    for author in &ms.authors {
        let line = match author.affiliation {
            Some(ref aff) => format!("{} <{}>; {aff}", author.name, author.email),
            None => format!("{} <{}>", author.name, author.email),
        };
        pretty_kv(w, "Author", line)?;
    }
    if let Some(ref editor) = ms.assigned_editor_email {
        pretty_kv(w, "Editor", editor)?;
    }
    if let Some(ref assignment) = ms.copy_editor_assignment {
        if ms.assigned_copy_editor.is_some() {
            pretty_kv(
                w,
                "Copy editor",
                format!(
                    "{} (due {})",
                    assignment.copy_editor_email,
                    format_ts(assignment.due_date)
                ),
            )?;
        }
        if !assignment.galley_proofs.is_empty() {
            pretty_kv(w, "Proofs", assignment.galley_proofs.len().to_string())?;
        }
    }
    for file in &ms.latest_manuscript_files {
        pretty_kv(w, "File", format!("{}  {}", file.name, file.url))?;
    }
    if let Some(ref acceptance) = ms.acceptance {
        let fee = if acceptance.fee_waived() {
            acceptance
                .fee
                .reason
                .clone()
                .unwrap_or_else(|| "waived".to_string())
        } else {
            format_amount(acceptance.fee.amount_minor, &acceptance.fee.currency)
        };
        pretty_kv(w, "Fee", fee)?;
    }
    for p in payments {
        pretty_kv(
            w,
            "Payment",
            format!(
                "{}  {}  {}",
                p.id,
                p.status,
                format_amount(p.amount_minor, &p.currency)
            ),
        )?;
    }
    if let Some(ref publication) = ms.publication {
        pretty_kv(
            w,
            "Published",
            format!(
                "vol. {} no. {}, pp. {} ({})",
                publication.volume,
                publication.issue,
                publication.pages,
                publication.published_date.format("%Y-%m-%d")
            ),
        )?;
    }
    pretty_kv(w, "Updated", format_ts(ms.updated_at))?;
    pretty_rule(w)?;
    if let Some(last) = ms.timeline.last() {
        writeln!(w, "last: {}  {}", last.event, last.description)?;
    }
    Ok(())
}
