//! `galley init`: create the store, a default `galley.toml` and the first
//! admin account.

use anyhow::{Context as _, Result};
use chrono::Utc;
use clap::Args;
use galley_core::config::{UserConfig, WorkflowConfig, load_user_config};
use galley_core::model::AccountId;
use galley_core::store::{AccountDirectory, SqliteStore};
use galley_core::{Account, Role};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

use super::{Global, resolve_config_path, resolve_db_path};
use crate::output::{pretty_kv, render};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Re-run migrations on an existing store instead of refusing.
    #[arg(long)]
    pub force: bool,

    /// Register an admin account with this e-mail.
    #[arg(long, value_name = "EMAIL")]
    pub admin_email: Option<String>,

    /// Display name for the admin account.
    #[arg(long, value_name = "NAME", requires = "admin_email")]
    pub admin_name: Option<String>,
}

#[derive(Debug, Serialize)]
struct InitOutput {
    database: PathBuf,
    config: PathBuf,
    config_written: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    admin: Option<Account>,
}

/// Execute `galley init`.
///
/// # Errors
///
/// Returns an error if the store already exists and `--force` is not set,
/// or if any filesystem or store operation fails.
pub fn run_init(args: &InitArgs, global: &Global) -> Result<()> {
    let user = load_user_config(dirs::config_dir().as_deref()).unwrap_or_else(|_| UserConfig::default());
    let db_path = resolve_db_path(global.db.as_deref(), &user);
    if db_path.exists() && !args.force {
        anyhow::bail!(
            "{} already exists. Use `galley init --force` to re-run migrations.",
            db_path.display()
        );
    }

    let store = SqliteStore::open(&db_path)?;

    let config_path = resolve_config_path(global.config.as_deref());
    let config_written = if config_path.exists() {
        false
    } else {
        let body = toml::to_string_pretty(&WorkflowConfig::default())
            .context("Failed to serialize default config")?;
        std::fs::write(&config_path, body)
            .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        true
    };

    let admin = match args.admin_email {
        Some(ref email) => Some(bootstrap_admin(&store, email, args.admin_name.as_deref())?),
        None => None,
    };

    info!(db = %db_path.display(), config_written, "store initialized");

    let out = InitOutput {
        database: db_path,
        config: config_path,
        config_written,
        admin,
    };
    render(global.output, &out, |o, w| {
        writeln!(w, "✓ Initialized galley store.")?;
        writeln!(w)?;
        pretty_kv(w, "Store", o.database.display().to_string())?;
        pretty_kv(
            w,
            "Config",
            format!(
                "{}{}",
                o.config.display(),
                if o.config_written { " (written)" } else { "" }
            ),
        )?;
        if let Some(ref admin) = o.admin {
            pretty_kv(w, "Admin", format!("{} <{}>", admin.id, admin.email))?;
        }
        writeln!(w)?;
        writeln!(w, "Next steps:")?;
        writeln!(w, "  export GALLEY_ACTOR=<admin email>")?;
        writeln!(w, "  galley account add --email ed@journal.org --name Ed --roles editor")
    })
}

fn bootstrap_admin(store: &SqliteStore, email: &str, name: Option<&str>) -> Result<Account> {
    if !store.list_accounts()?.is_empty() {
        anyhow::bail!("accounts already exist; use `galley account add` as an admin instead");
    }
    let email = email.trim();
    if !email.contains('@') {
        anyhow::bail!("invalid admin e-mail '{email}'");
    }
    let account = Account {
        id: AccountId::mint(email, Utc::now()),
        email: email.to_string(),
        name: name.unwrap_or("Administrator").to_string(),
        roles: [Role::Admin].into_iter().collect(),
    };
    store.upsert_account(&account)?;
    Ok(account)
}
