//! Acting identity resolution for CLI commands.
//!
//! The resolution chain: `--as` flag > `GALLEY_ACTOR` env > `actor` in the
//! user config. The resolved handle is an account id or an e-mail address
//! and is looked up in the store's account table, which is the role oracle.
//! Read-only commands work without an identity.

use galley_core::model::AccountId;
use galley_core::store::AccountDirectory;
use galley_core::{Account, Actor};
use std::env;

use crate::output::CliError;

pub const ACTOR_ENV: &str = "GALLEY_ACTOR";

/// Environment reader trait for dependency injection in tests.
trait EnvReader {
    fn get(&self, key: &str) -> Option<String>;
}

struct RealEnv;

impl EnvReader for RealEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

fn resolve_handle_with(
    cli_flag: Option<&str>,
    configured: Option<&str>,
    env: &dyn EnvReader,
) -> Option<String> {
    if let Some(handle) = cli_flag.map(str::trim).filter(|h| !h.is_empty()) {
        return Some(handle.to_string());
    }

    if let Some(val) = env.get(ACTOR_ENV) {
        return Some(val.trim().to_string());
    }

    configured
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
}

/// Resolve the acting handle (account id or e-mail), if any.
pub fn resolve_handle(cli_flag: Option<&str>, configured: Option<&str>) -> Option<String> {
    resolve_handle_with(cli_flag, configured, &RealEnv)
}

/// Find an account by id or, when the handle contains `@`, by e-mail.
///
/// # Errors
///
/// Returns a [`CliError`] when the directory fails or has no such account.
pub fn lookup_account(directory: &dyn AccountDirectory, handle: &str) -> Result<Account, CliError> {
    let found = if handle.contains('@') {
        directory.find_by_email(handle)
    } else {
        directory.find_account(&AccountId::new_unchecked(handle))
    };
    match found {
        Ok(Some(account)) => Ok(account),
        Ok(None) => Err(CliError::with_details(
            format!("no account '{handle}'"),
            "use `galley account list` to see registered accounts",
            "unknown_account",
        )),
        Err(err) => Err(CliError::with_details(
            format!("account lookup failed: {err}"),
            "check that the store file is readable",
            "store_error",
        )),
    }
}

/// Resolve the acting identity, returning an error if none is configured.
///
/// Use this for mutating commands.
///
/// # Errors
///
/// Returns a [`CliError`] when no handle is configured or it names no account.
pub fn require_actor(
    directory: &dyn AccountDirectory,
    cli_flag: Option<&str>,
    configured: Option<&str>,
) -> Result<Actor, CliError> {
    let handle = resolve_handle(cli_flag, configured).ok_or_else(|| {
        CliError::with_details(
            "an acting identity is required for this command",
            format!("pass --as <account-id|email> or set {ACTOR_ENV}"),
            "missing_actor",
        )
    })?;
    lookup_account(directory, &handle).map(|account| account.actor())
}
