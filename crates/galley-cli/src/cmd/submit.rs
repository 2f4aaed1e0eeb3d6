//! `galley submit`: create a manuscript in `submitted`.

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use galley_core::model::{ArticleType, Author};
use galley_core::workflow::submission::SubmitRequest;
use std::path::{Path, PathBuf};

use super::{Session, parse_files, render_transition};
use crate::output::CliError;

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Read the whole request from a JSON file instead of flags.
    #[arg(long, value_name = "PATH", conflicts_with_all = ["title", "author", "file"])]
    pub from_json: Option<PathBuf>,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long = "abstract", default_value = "")]
    pub abstract_text: String,

    /// Comma-separated keywords.
    #[arg(long, default_value = "")]
    pub keywords: String,

    /// research-article, review-article, short-communication, case-report,
    /// editorial or letter.
    #[arg(long = "type", default_value = "research-article")]
    pub article_type: ArticleType,

    /// Corresponding author's country; feeds the fee schedule.
    #[arg(long)]
    pub country: Option<String>,

    #[arg(long)]
    pub institution: Option<String>,

    /// Author as `Name <email>` or `Name <email>; Affiliation`. Repeatable.
    #[arg(long)]
    pub author: Vec<String>,

    /// Manuscript file as `name=url` or a url. Repeatable.
    #[arg(long)]
    pub file: Vec<String>,
}

/// Parse `Name <email>` with an optional `; Affiliation` suffix.
pub fn parse_author(raw: &str) -> Result<Author, String> {
    let (person, affiliation) = match raw.split_once(';') {
        Some((person, aff)) => (person, Some(aff.trim()).filter(|a| !a.is_empty())),
        None => (raw, None),
    };
    let (name, rest) = person
        .split_once('<')
        .ok_or_else(|| format!("invalid author '{raw}': expected 'Name <email>'"))?;
    let email = rest
        .strip_suffix('>')
        .or_else(|| rest.trim_end().strip_suffix('>'))
        .ok_or_else(|| format!("invalid author '{raw}': missing '>'"))?
        .trim();
    Ok(Author {
        name: name.trim().to_string(),
        email: email.to_string(),
        affiliation: affiliation.map(str::to_string),
    })
}

fn request_from_flags(args: &SubmitArgs, session: &Session) -> Result<SubmitRequest> {
    let now = Utc::now();
    let authors = args
        .author
        .iter()
        .map(|a| parse_author(a))
        .collect::<Result<Vec<_>, _>>()
        .or_else(|msg| {
            session.refuse(&CliError::with_details(
                msg,
                "use --author \"Ada Lovelace <ada@uni.edu>\"",
                "invalid_author",
            ))
        })?;
    let files = parse_files(&args.file, now).or_else(|err| session.refuse(&err))?;

    Ok(SubmitRequest {
        title: args.title.clone().unwrap_or_default(),
        abstract_text: args.abstract_text.clone(),
        keywords: args
            .keywords
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect(),
        article_type: args.article_type,
        country: args.country.clone(),
        institution: args.institution.clone(),
        authors,
        files,
    })
}

fn request_from_json(path: &Path) -> Result<SubmitRequest> {
    use anyhow::Context as _;
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&body).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn run_submit(args: &SubmitArgs, session: &Session) -> Result<()> {
    let actor = session.actor()?;
    let request = match args.from_json {
        Some(ref path) => request_from_json(path)?,
        None => request_from_flags(args, session)?,
    };
    let ms = session.check(session.engine.submit(&actor, request))?;
    render_transition(session.output, &ms)
}
