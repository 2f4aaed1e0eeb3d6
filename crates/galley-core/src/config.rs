//! Workflow configuration loaded from `galley.toml`.
//!
//! Every field has a default so an absent file, or a file with only some
//! sections, yields a usable configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "galley.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default)]
    pub payment: PaymentConfig,
    #[serde(default)]
    pub fees: FeeConfig,
    #[serde(default)]
    pub review: ReviewConfig,
    #[serde(default)]
    pub copy_edit: CopyEditConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// Days between acceptance and the payment due date.
    #[serde(default = "default_payment_due_days")]
    pub due_days: i64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            due_days: default_payment_due_days(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfig {
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Fee in minor units for article types not listed in `by_article_type`.
    #[serde(default = "default_fee_minor")]
    pub default_minor: u64,
    /// Per-type overrides keyed by the kebab-case article type.
    #[serde(default = "default_fee_table")]
    pub by_article_type: BTreeMap<String, u64>,
    #[serde(default)]
    pub waived_countries: Vec<String>,
    #[serde(default)]
    pub institution_discounts: Vec<InstitutionDiscount>,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            default_minor: default_fee_minor(),
            by_article_type: default_fee_table(),
            waived_countries: Vec::new(),
            institution_discounts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstitutionDiscount {
    pub institution: String,
    pub percent: u8,
    #[serde(default = "default_discount_reason")]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewConfig {
    #[serde(default = "default_review_due_days")]
    pub due_days: i64,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            due_days: default_review_due_days(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyEditConfig {
    #[serde(default = "default_copy_edit_due_days")]
    pub due_days: i64,
}

impl Default for CopyEditConfig {
    fn default() -> Self {
        Self {
            due_days: default_copy_edit_due_days(),
        }
    }
}

/// Per-user settings from `$XDG_CONFIG_HOME/galley/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    /// Default acting account (id or e-mail).
    #[serde(default)]
    pub actor: Option<String>,
    /// Default store path.
    #[serde(default)]
    pub database: Option<PathBuf>,
    #[serde(default)]
    pub output: Option<String>,
}

/// Load workflow configuration from `path`; a missing file yields defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<WorkflowConfig> {
    if !path.exists() {
        return Ok(WorkflowConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<WorkflowConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load per-user settings, if a config directory exists.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config(config_dir: Option<&Path>) -> Result<UserConfig> {
    let Some(config_dir) = config_dir else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("galley/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

const fn default_payment_due_days() -> i64 {
    30
}

const fn default_review_due_days() -> i64 {
    21
}

const fn default_copy_edit_due_days() -> i64 {
    14
}

fn default_currency() -> String {
    "USD".to_string()
}

const fn default_fee_minor() -> u64 {
    200_000
}

fn default_fee_table() -> BTreeMap<String, u64> {
    BTreeMap::from([
        ("short-communication".to_string(), 100_000),
        ("case-report".to_string(), 100_000),
        ("editorial".to_string(), 0),
        ("letter".to_string(), 0),
    ])
}

fn default_discount_reason() -> String {
    "institutional agreement".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let cfg = load_config(&dir.path().join(CONFIG_FILE_NAME)).expect("load");
        assert_eq!(cfg, WorkflowConfig::default());
        assert_eq!(cfg.payment.due_days, 30);
        assert_eq!(cfg.review.due_days, 21);
        assert_eq!(cfg.copy_edit.due_days, 14);
        assert_eq!(cfg.fees.currency, "USD");
        assert_eq!(cfg.fees.by_article_type.get("editorial"), Some(&0));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            r#"
[payment]
due_days = 10

[fees]
currency = "EUR"
waived_countries = ["Nepal", "Malawi"]

[[fees.institution_discounts]]
institution = "Partner University"
percent = 50
"#,
        )
        .expect("write config");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.payment.due_days, 10);
        assert_eq!(cfg.fees.currency, "EUR");
        assert_eq!(cfg.fees.default_minor, 200_000);
        assert_eq!(cfg.fees.waived_countries.len(), 2);
        assert_eq!(cfg.fees.institution_discounts[0].percent, 50);
        assert_eq!(
            cfg.fees.institution_discounts[0].reason,
            "institutional agreement"
        );
        assert_eq!(cfg.copy_edit.due_days, 14);
    }

    #[test]
    fn malformed_file_names_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[payment\ndue_days = ").expect("write config");
        let err = load_config(&path).expect_err("should fail");
        assert!(format!("{err:#}").contains("Failed to parse"));
    }

    #[test]
    fn user_config_reads_actor_and_database() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::create_dir_all(dir.path().join("galley")).expect("mkdir");
        std::fs::write(
            dir.path().join("galley/config.toml"),
            "actor = \"ed@journal.org\"\ndatabase = \"/srv/galley/galley.db\"\n",
        )
        .expect("write");
        let cfg = load_user_config(Some(dir.path())).expect("load");
        assert_eq!(cfg.actor.as_deref(), Some("ed@journal.org"));
        assert_eq!(cfg.database, Some(PathBuf::from("/srv/galley/galley.db")));

        assert_eq!(load_user_config(None).expect("load"), UserConfig::default());
    }
}
