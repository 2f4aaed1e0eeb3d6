use serde::{Deserialize, Serialize};

use super::GatewayError;
use crate::config::FeeConfig;
use crate::model::{ArticleType, Discount};

/// Outcome of the fee table for one manuscript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeQuote {
    /// Amount owed in minor units, after any discount.
    pub amount_minor: u64,
    pub currency: String,
    #[serde(default)]
    pub waived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<Discount>,
}

impl FeeQuote {
    /// Nothing is owed: explicitly waived or zero.
    #[must_use]
    pub const fn is_free(&self) -> bool {
        self.waived || self.amount_minor == 0
    }
}

/// Article processing charge lookup.
pub trait FeeCalculator: Send + Sync {
    /// Compute the fee for an accepted manuscript.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] if the fee source is unavailable.
    fn calculate_fee(
        &self,
        article_type: ArticleType,
        country: Option<&str>,
        institution: Option<&str>,
    ) -> Result<FeeQuote, GatewayError>;
}

/// Fee table driven by the `[fees]` config section.
///
/// Order of evaluation: waived country, then zero-fee article type, then the
/// first matching institution discount.
#[derive(Debug, Clone)]
pub struct ScheduleFeeCalculator {
    config: FeeConfig,
}

impl ScheduleFeeCalculator {
    #[must_use]
    pub const fn new(config: FeeConfig) -> Self {
        Self { config }
    }

    fn base_fee(&self, article_type: ArticleType) -> u64 {
        self.config
            .by_article_type
            .get(article_type.as_str())
            .copied()
            .unwrap_or(self.config.default_minor)
    }
}

impl FeeCalculator for ScheduleFeeCalculator {
    fn calculate_fee(
        &self,
        article_type: ArticleType,
        country: Option<&str>,
        institution: Option<&str>,
    ) -> Result<FeeQuote, GatewayError> {
        let currency = self.config.currency.clone();
        let base = self.base_fee(article_type);

        let waived_country = country.map(str::trim).filter(|c| {
            self.config
                .waived_countries
                .iter()
                .any(|w| w.eq_ignore_ascii_case(c))
        });
        if let Some(country) = waived_country {
            return Ok(FeeQuote {
                amount_minor: 0,
                currency,
                waived: true,
                reason: Some(format!("fee waived for authors based in {country}")),
                discount: None,
            });
        }

        if base == 0 {
            return Ok(FeeQuote {
                amount_minor: 0,
                currency,
                waived: false,
                reason: Some(format!("no fee for {article_type}")),
                discount: None,
            });
        }

        let matched = institution.and_then(|inst| {
            self.config
                .institution_discounts
                .iter()
                .find(|d| d.institution.eq_ignore_ascii_case(inst.trim()))
        });

        let Some(rule) = matched else {
            return Ok(FeeQuote {
                amount_minor: base,
                currency,
                waived: false,
                reason: None,
                discount: None,
            });
        };

        let percent = rule.percent.min(100);
        let amount = base - base * u64::from(percent) / 100;
        Ok(FeeQuote {
            amount_minor: amount,
            currency,
            waived: percent == 100,
            reason: Some(rule.reason.clone()),
            discount: Some(Discount {
                percent,
                reason: rule.reason.clone(),
                original_amount_minor: base,
            }),
        })
    }
}
