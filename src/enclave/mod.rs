//! Signing enclave boundary.
//!
//! The enclave is reached with a single request carrying a fixed probe
//! payload. Whatever comes back on success is an opaque token; any other
//! outcome, transport failures included, is `EnclaveUnreachable`. There is
//! no automatic retry.

#[cfg(feature = "http-enclave")]
mod http;

#[cfg(feature = "http-enclave")]
pub use http::HttpEnclave;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};

pub const PROBE_DESTINATION: &str = "LIVE_FIRE_TEST";

/// Token reported when the enclave answers 2xx with an empty body.
pub const FALLBACK_TOKEN: &str = "04_MOCK_SHARE_B_PUBLIC_KEY";

/// Fixed-shape liveness probe. Not a transfer instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningProbe {
    pub destination: String,
    pub amount: u64,
}

impl Default for SigningProbe {
    fn default() -> Self {
        Self { destination: PROBE_DESTINATION.into(), amount: 0 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningToken(pub String);

impl SigningToken {
    pub fn as_str(&self) -> &str { &self.0 }
}

#[async_trait]
pub trait SigningClient: Send + Sync {
    async fn sign(&self, probe: &SigningProbe) -> VaultResult<SigningToken>;
}

/// Signer used when no enclave endpoint is configured. Every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineEnclave;

#[async_trait]
impl SigningClient for OfflineEnclave {
    async fn sign(&self, _probe: &SigningProbe) -> VaultResult<SigningToken> {
        Err(VaultError::EnclaveUnreachable("no enclave configured".into()))
    }
}
