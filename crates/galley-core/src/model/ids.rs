//! Opaque identifiers for manuscripts, payments, reviews and accounts.
//!
//! Minted ids are `<prefix>-<10 hex chars>` where the hex is a BLAKE3 digest
//! of a caller seed, the mint time and a process-local counter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

const HASH_LEN: usize = 10;

static MINT_COUNTER: AtomicU64 = AtomicU64::new(0);

fn mint(prefix: &str, seed: &str, at: DateTime<Utc>) -> String {
    let n = MINT_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut hasher = blake3::Hasher::new();
    hasher.update(seed.as_bytes());
    hasher.update(&at.timestamp_micros().to_le_bytes());
    hasher.update(&n.to_le_bytes());
    hasher.update(&std::process::id().to_le_bytes());
    let hex = hasher.finalize().to_hex();
    format!("{prefix}-{}", &hex[..HASH_LEN])
}

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            /// Mint a fresh id.
            #[must_use]
            pub fn mint(seed: &str, at: DateTime<Utc>) -> Self {
                Self(mint($prefix, seed, at))
            }

            /// Wrap an existing id without validation (store rows, CLI input).
            #[must_use]
            pub fn new_unchecked(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }
    };
}

id_type!(
    /// Manuscript aggregate id (`ms-…`).
    ManuscriptId,
    "ms"
);
id_type!(
    /// Payment aggregate id (`pay-…`).
    PaymentId,
    "pay"
);
id_type!(
    /// Review aggregate id (`rev-…`).
    ReviewId,
    "rev"
);
id_type!(
    /// Account id as issued by the identity provider.
    AccountId,
    "acct"
);
id_type!(
    /// Reference returned by the file collaborator.
    FileId,
    "file"
);
