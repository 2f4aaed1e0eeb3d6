//! `galley verify`: re-check every stored timeline hash chain.

use anyhow::Result;
use serde::Serialize;
use std::io::Write;

use super::Session;
use crate::output::render;

#[derive(Debug, Serialize)]
struct VerifyRow {
    manuscript_id: String,
    entries: usize,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct VerifyOutput {
    checked: usize,
    broken: usize,
    timelines: Vec<VerifyRow>,
}

/// Exits non-zero when any chain is broken.
pub fn run_verify(session: &Session) -> Result<()> {
    let checks = session.engine.store().verify_timelines()?;
    let timelines: Vec<VerifyRow> = checks
        .into_iter()
        .map(|c| VerifyRow {
            manuscript_id: c.manuscript_id.to_string(),
            entries: c.entries,
            ok: c.result.is_ok(),
            error: c.result.err().map(|e| e.to_string()),
        })
        .collect();
    let broken = timelines.iter().filter(|t| !t.ok).count();
    let out = VerifyOutput {
        checked: timelines.len(),
        broken,
        timelines,
    };
    render(session.output, &out, |o, w| {
        for t in &o.timelines {
            match t.error {
                Some(ref err) => writeln!(w, "✗ {}  {err}", t.manuscript_id)?,
                None => writeln!(w, "✓ {}  {} entries", t.manuscript_id, t.entries)?,
            }
        }
        writeln!(w, "{} timelines checked, {} broken", o.checked, o.broken)
    })?;

    if broken > 0 {
        anyhow::bail!("{broken} timeline(s) failed verification");
    }
    Ok(())
}
