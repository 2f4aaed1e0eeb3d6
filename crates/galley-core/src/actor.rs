//! Acting identities and their capability sets.
//!
//! The engine never authenticates. Every operation receives an [`Actor`]
//! produced by the caller's role oracle and checks it against the roles the
//! operation declares.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{ErrorCode, WorkflowError};
use crate::model::{AccountId, ParseEnumError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Author,
    Reviewer,
    Editor,
    CopyEditor,
    Admin,
}

impl Role {
    pub const ALL: [Self; 5] = [
        Self::Author,
        Self::Reviewer,
        Self::Editor,
        Self::CopyEditor,
        Self::Admin,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Author => "author",
            Self::Reviewer => "reviewer",
            Self::Editor => "editor",
            Self::CopyEditor => "copy-editor",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "author" => Ok(Self::Author),
            "reviewer" => Ok(Self::Reviewer),
            "editor" => Ok(Self::Editor),
            "copy-editor" | "copyeditor" => Ok(Self::CopyEditor),
            "admin" => Ok(Self::Admin),
            _ => Err(ParseEnumError {
                expected: "role",
                got: s.to_string(),
            }),
        }
    }
}

/// Non-exclusive set of roles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    #[must_use]
    pub fn contains_any(&self, roles: &[Role]) -> bool {
        roles.iter().any(|role| self.contains(*role))
    }

    pub fn insert(&mut self, role: Role) {
        self.0.insert(role);
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse a comma-separated role list (`"editor,admin"`).
    ///
    /// # Errors
    ///
    /// Returns [`ParseEnumError`] for the first unknown role name.
    pub fn parse_list(raw: &str) -> Result<Self, ParseEnumError> {
        raw.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(Role::from_str)
            .collect()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|role| role.as_str()).collect();
        f.write_str(&names.join(","))
    }
}

/// A registered account, as returned by the account directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub name: String,
    pub roles: RoleSet,
}

impl Account {
    /// Acting identity for this account.
    #[must_use]
    pub fn actor(&self) -> Actor {
        Actor {
            account_id: self.id.clone(),
            email: self.email.clone(),
            roles: self.roles.clone(),
        }
    }
}

/// The identity performing an operation plus its capability set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub account_id: AccountId,
    pub email: String,
    pub roles: RoleSet,
}

impl Actor {
    #[must_use]
    pub fn new(account_id: impl Into<String>, email: impl Into<String>, roles: &[Role]) -> Self {
        Self {
            account_id: AccountId::new_unchecked(account_id),
            email: email.into(),
            roles: roles.iter().copied().collect(),
        }
    }

    #[must_use]
    pub fn has(&self, role: Role) -> bool {
        self.roles.contains(role)
    }

    /// Require at least one of `roles`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::MissingRole`] naming the acceptable roles.
    pub fn require_any(&self, action: &'static str, roles: &[Role]) -> Result<(), WorkflowError> {
        if self.roles.contains_any(roles) {
            return Ok(());
        }
        let required: Vec<&str> = roles.iter().map(|role| role.as_str()).collect();
        Err(WorkflowError::MissingRole {
            action,
            required: required.join(", "),
        })
    }

    /// Case-insensitive e-mail comparison used for identity matching.
    #[must_use]
    pub fn email_matches(&self, email: &str) -> bool {
        self.email.trim().eq_ignore_ascii_case(email.trim())
    }

    pub(crate) fn forbidden(
        action: &'static str,
        code: ErrorCode,
        reason: impl Into<String>,
    ) -> WorkflowError {
        WorkflowError::Forbidden {
            action,
            code,
            reason: reason.into(),
        }
    }
}
