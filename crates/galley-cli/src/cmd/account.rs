//! `galley account`: manage the account table that backs the role oracle.

use anyhow::Result;
use chrono::Utc;
use clap::{Args, Subcommand};
use galley_core::actor::RoleSet;
use galley_core::model::AccountId;
use galley_core::store::{AccountDirectory, StoreError};
use galley_core::{Account, Role};
use std::io::Write;

use super::Session;
use crate::output::{CliError, pretty_rule, render};

#[derive(Subcommand, Debug)]
pub enum AccountCommand {
    /// Register an account (admin only).
    Add(AddArgs),
    /// Replace an account's roles (admin only).
    Grant(GrantArgs),
    /// List registered accounts.
    List,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    #[arg(long)]
    pub email: String,

    #[arg(long)]
    pub name: String,

    /// Comma-separated roles: author, reviewer, editor, copy-editor, admin.
    #[arg(long, value_name = "ROLES")]
    pub roles: String,

    /// Use this id instead of minting one.
    #[arg(long)]
    pub id: Option<String>,
}

#[derive(Args, Debug)]
pub struct GrantArgs {
    /// Account id or e-mail.
    pub account: String,

    /// Comma-separated roles; replaces the current set.
    #[arg(long, value_name = "ROLES")]
    pub roles: String,
}

pub fn run_account(command: &AccountCommand, session: &Session) -> Result<()> {
    match command {
        AccountCommand::Add(args) => run_add(args, session),
        AccountCommand::Grant(args) => run_grant(args, session),
        AccountCommand::List => run_list(session),
    }
}

fn parse_roles(session: &Session, raw: &str) -> Result<RoleSet> {
    match RoleSet::parse_list(raw) {
        Ok(roles) if !roles.is_empty() => Ok(roles),
        Ok(_) => session.refuse(&CliError::with_details(
            "at least one role is required",
            "e.g. --roles editor,reviewer",
            "invalid_roles",
        )),
        Err(err) => session.refuse(&CliError::with_details(
            err.to_string(),
            "roles are author, reviewer, editor, copy-editor, admin",
            "invalid_roles",
        )),
    }
}

fn save(session: &Session, account: &Account) -> Result<()> {
    match session.engine.store().upsert_account(account) {
        Ok(()) => Ok(()),
        Err(StoreError::Duplicate(what)) => session.refuse(&CliError::with_details(
            format!("{what} already exists"),
            "e-mail addresses are unique, ignoring case",
            "duplicate_account",
        )),
        Err(err) => Err(err.into()),
    }
}

fn run_add(args: &AddArgs, session: &Session) -> Result<()> {
    let actor = session.actor()?;
    session.check(actor.require_any("register account", &[Role::Admin]))?;

    let email = args.email.trim();
    if !email.contains('@') {
        return session.refuse(&CliError::with_details(
            format!("invalid e-mail '{email}'"),
            "pass a full address",
            "invalid_email",
        ));
    }
    let roles = parse_roles(session, &args.roles)?;
    let id = args.id.as_deref().map_or_else(
        || AccountId::mint(email, Utc::now()),
        AccountId::new_unchecked,
    );
    let account = Account {
        id,
        email: email.to_string(),
        name: args.name.trim().to_string(),
        roles,
    };
    save(session, &account)?;
    tracing::info!(account = %account.id, roles = %account.roles, by = %actor.account_id, "account registered");

    render(session.output, &account, |a, w| {
        writeln!(w, "✓ {}  {} <{}>  [{}]", a.id, a.name, a.email, a.roles)
    })
}

fn run_grant(args: &GrantArgs, session: &Session) -> Result<()> {
    let actor = session.actor()?;
    session.check(actor.require_any("change roles", &[Role::Admin]))?;

    let mut account = session.account(&args.account)?;
    account.roles = parse_roles(session, &args.roles)?;
    save(session, &account)?;
    tracing::info!(account = %account.id, roles = %account.roles, by = %actor.account_id, "roles changed");

    render(session.output, &account, |a, w| {
        writeln!(w, "✓ {}  [{}]", a.id, a.roles)
    })
}

fn run_list(session: &Session) -> Result<()> {
    let accounts = session.engine.store().list_accounts()?;
    render(session.output, &accounts, |accounts, w| {
        if accounts.is_empty() {
            return writeln!(w, "No accounts registered.");
        }
        writeln!(w, "{:<16} {:<28} {:<20} ROLES", "ID", "EMAIL", "NAME")?;
        pretty_rule(w)?;
        for a in accounts {
            writeln!(w, "{:<16} {:<28} {:<20} {}", a.id.as_str(), a.email, a.name, a.roles)?;
        }
        Ok(())
    })
}
