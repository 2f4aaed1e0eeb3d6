//! Command handlers and the state they share.

pub mod account;
pub mod assign;
pub mod copyedit;
pub mod decide;
pub mod init;
pub mod list;
pub mod payment;
pub mod publish;
pub mod review;
pub mod revise;
pub mod show;
pub mod submit;
pub mod timeline;
pub mod verify;

use anyhow::Context as _;
use chrono::{DateTime, NaiveDate, Utc};
use clap::Args;
use galley_core::config::{CONFIG_FILE_NAME, UserConfig, load_config, load_user_config};
use galley_core::model::{FileId, FileRef, Manuscript, ManuscriptId};
use galley_core::notify::{BackgroundSink, LogSink};
use galley_core::store::SqliteStore;
use galley_core::{Account, Actor, Engine, Target, WorkflowError};
use serde::Serialize;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::identity;
use crate::output::{CliError, OutputMode, fail, render, render_error};

pub const DB_ENV: &str = "GALLEY_DB";
pub const DEFAULT_DB_FILE: &str = "galley.db";

/// Flags shared by every subcommand.
#[derive(Debug, Clone)]
pub struct Global {
    pub db: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub actor: Option<String>,
    pub output: OutputMode,
}

/// Store path precedence: `--db` > `GALLEY_DB` > user config > `./galley.db`.
pub fn resolve_db_path(flag: Option<&Path>, user: &UserConfig) -> PathBuf {
    if let Some(path) = flag {
        return path.to_path_buf();
    }
    if let Some(path) = env::var_os(DB_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(path);
    }
    user.database
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE))
}

pub fn resolve_config_path(flag: Option<&Path>) -> PathBuf {
    flag.map_or_else(|| PathBuf::from(CONFIG_FILE_NAME), Path::to_path_buf)
}

/// An engine over the configured store plus the caller's identity settings.
pub struct Session {
    pub engine: Engine<SqliteStore>,
    pub output: OutputMode,
    notifier: Arc<BackgroundSink>,
    actor_flag: Option<String>,
    configured_actor: Option<String>,
}

impl Session {
    /// Open the store and configuration named by the global flags.
    ///
    /// # Errors
    ///
    /// Fails when the store has not been initialized or cannot be opened,
    /// or when a configuration file is malformed.
    pub fn open(global: &Global) -> anyhow::Result<Self> {
        let user = load_user_config(dirs::config_dir().as_deref())?;
        let db_path = resolve_db_path(global.db.as_deref(), &user);
        if !db_path.exists() {
            render_error(
                global.output,
                &CliError::with_details(
                    format!("store not found at {}", db_path.display()),
                    "run `galley init` or pass --db",
                    "store_missing",
                ),
            )?;
            anyhow::bail!("store not found at {}", db_path.display());
        }

        let config = load_config(&resolve_config_path(global.config.as_deref()))?;
        let store = SqliteStore::open(&db_path)
            .with_context(|| format!("Failed to open store {}", db_path.display()))?;
        debug!(db = %db_path.display(), "store opened");

        let notifier = Arc::new(BackgroundSink::spawn(Arc::new(LogSink)));
        Ok(Self {
            engine: Engine::new(store, config).with_notifier(notifier.clone()),
            output: global.output,
            notifier,
            actor_flag: global.actor.clone(),
            configured_actor: user.actor,
        })
    }

    /// The acting identity; required by every mutating command.
    pub fn actor(&self) -> anyhow::Result<Actor> {
        identity::require_actor(
            self.engine.store(),
            self.actor_flag.as_deref(),
            self.configured_actor.as_deref(),
        )
        .or_else(|err| self.refuse(&err))
    }

    /// Look up another account (an assignee) by id or e-mail.
    pub fn account(&self, handle: &str) -> anyhow::Result<Account> {
        identity::lookup_account(self.engine.store(), handle).or_else(|err| self.refuse(&err))
    }

    /// Render a workflow failure and turn it into the process error.
    pub fn check<T>(&self, result: Result<T, WorkflowError>) -> anyhow::Result<T> {
        result.map_err(|err| fail(self.output, &err))
    }

    pub fn refuse<T>(&self, err: &CliError) -> anyhow::Result<T> {
        render_error(self.output, err)?;
        anyhow::bail!("{}", err.message)
    }

    /// Drop the engine and wait for queued notifications to go out.
    pub fn close(self) {
        let Self { engine, notifier, .. } = self;
        drop(engine);
        match Arc::try_unwrap(notifier) {
            Ok(sink) => debug!(delivered = sink.shutdown(), "notifications flushed"),
            Err(_) => debug!("notification queue still shared; flushed on drop"),
        }
    }
}

/// Manuscript argument shared by every per-manuscript command.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Manuscript id.
    pub manuscript: String,

    /// Refuse unless the manuscript is still at this revision.
    #[arg(long, value_name = "N")]
    pub revision: Option<u64>,
}

impl TargetArgs {
    pub fn id(&self) -> ManuscriptId {
        ManuscriptId::new_unchecked(self.manuscript.trim())
    }

    pub fn target(&self) -> Target {
        match self.revision {
            Some(revision) => Target::at(self.id(), revision),
            None => Target::latest(self.id()),
        }
    }
}

/// Result of a mutating command.
#[derive(Debug, Serialize)]
pub struct TransitionOutput {
    pub id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copy_edit_stage: Option<String>,
    pub revision: u64,
    pub event: String,
    pub description: String,
}

impl From<&Manuscript> for TransitionOutput {
    fn from(ms: &Manuscript) -> Self {
        let last = ms.timeline.last();
        Self {
            id: ms.id.to_string(),
            status: ms.status.to_string(),
            copy_edit_stage: ms.copy_edit_stage.map(|s| s.to_string()),
            revision: ms.revision,
            event: last.map(|e| e.event.to_string()).unwrap_or_default(),
            description: last.map(|e| e.description.clone()).unwrap_or_default(),
        }
    }
}

pub fn render_transition(output: OutputMode, ms: &Manuscript) -> anyhow::Result<()> {
    render(output, &TransitionOutput::from(ms), |o, w| {
        write!(w, "✓ {}  {}  {}", o.id, o.status, o.description)?;
        if let Some(ref stage) = o.copy_edit_stage {
            write!(w, "  [{stage}]")?;
        }
        writeln!(w)
    })
}

/// Parse a file reference given as `name=url` or a bare url.
pub fn parse_file(raw: &str, now: DateTime<Utc>) -> Result<FileRef, String> {
    let raw = raw.trim();
    let (name, url) = match raw.split_once('=') {
        Some((name, url)) => (name.trim().to_string(), url.trim().to_string()),
        None => {
            let name = raw.rsplit('/').next().unwrap_or(raw).to_string();
            (name, raw.to_string())
        }
    };
    if name.is_empty() || url.is_empty() {
        return Err(format!("invalid file '{raw}': expected name=url or a url"));
    }
    Ok(FileRef {
        id: FileId::mint(&url, now),
        content_type: guess_content_type(&name),
        name,
        url,
        size_bytes: None,
        uploaded_at: now,
        is_current_version: false,
    })
}

fn guess_content_type(name: &str) -> Option<String> {
    let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "tex" => "application/x-tex",
        "zip" => "application/zip",
        "html" => "text/html",
        _ => return None,
    };
    Some(mime.to_string())
}

pub fn parse_files(raw: &[String], now: DateTime<Utc>) -> Result<Vec<FileRef>, CliError> {
    raw.iter()
        .map(|f| parse_file(f, now))
        .collect::<Result<_, _>>()
        .map_err(|msg| CliError::with_details(msg, "use --file name=url", "invalid_file"))
}

/// Accepts `YYYY-MM-DD` (midnight UTC) or RFC 3339.
pub fn parse_date(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
        .ok_or_else(|| format!("invalid date '{raw}': expected YYYY-MM-DD or RFC 3339"))
}

pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M UTC").to_string()
}
