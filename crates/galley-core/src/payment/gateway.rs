use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::model::{Discount, ManuscriptId, PaymentId};

/// Payment gateway or fee source failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("payment provider unavailable: {0}")]
    Unavailable(String),

    #[error("obligation rejected by provider: {0}")]
    Rejected(String),

    #[error("unknown obligation {0}")]
    UnknownObligation(PaymentId),
}

/// A new payment obligation to open with the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObligationRequest {
    pub manuscript_id: ManuscriptId,
    pub amount_minor: u64,
    pub currency: String,
    pub due_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<Discount>,
    pub requested_at: DateTime<Utc>,
}

/// External payment provider. The engine creates obligations and reacts to
/// reported outcomes; it never moves money itself.
pub trait PaymentGateway: Send + Sync {
    /// Open an obligation and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when the provider refuses or is unreachable.
    fn create_obligation(&self, request: &ObligationRequest) -> Result<PaymentId, GatewayError>;

    /// Cancel an obligation that was never committed.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when the provider cannot void it.
    fn void_obligation(&self, id: &PaymentId) -> Result<(), GatewayError>;
}

/// Ledger state for one obligation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub request: ObligationRequest,
    pub voided: bool,
}

/// In-process gateway that records obligations in a local ledger.
#[derive(Debug, Default)]
pub struct LedgerGateway {
    entries: Mutex<BTreeMap<PaymentId, LedgerEntry>>,
}

impl LedgerGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the ledger.
    #[must_use]
    pub fn entries(&self) -> Vec<(PaymentId, LedgerEntry)> {
        self.entries
            .lock()
            .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }
}

impl PaymentGateway for LedgerGateway {
    fn create_obligation(&self, request: &ObligationRequest) -> Result<PaymentId, GatewayError> {
        if request.amount_minor == 0 {
            return Err(GatewayError::Rejected(
                "zero-amount obligations are not accepted".into(),
            ));
        }
        let id = PaymentId::mint(request.manuscript_id.as_str(), request.requested_at);
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| GatewayError::Unavailable("ledger lock poisoned".into()))?;
        entries.insert(
            id.clone(),
            LedgerEntry {
                request: request.clone(),
                voided: false,
            },
        );
        Ok(id)
    }

    fn void_obligation(&self, id: &PaymentId) -> Result<(), GatewayError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| GatewayError::Unavailable("ledger lock poisoned".into()))?;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| GatewayError::UnknownObligation(id.clone()))?;
        entry.voided = true;
        Ok(())
    }
}
