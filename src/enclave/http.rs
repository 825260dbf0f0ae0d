//! reqwest-backed enclave client: `POST <base>/sign`.

use async_trait::async_trait;
use std::time::Duration;

use super::{SigningClient, SigningProbe, SigningToken, FALLBACK_TOKEN};
use crate::error::{VaultError, VaultResult};

#[derive(Debug, Clone)]
pub struct HttpEnclave {
    client: reqwest::Client,
    base_url: String,
}

impl HttpEnclave {
    pub fn new(base_url: &str, timeout: Duration) -> VaultResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VaultError::Config(format!("enclave client: {e}")))?;
        Ok(Self { client, base_url: normalize_base(base_url)? })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/sign", self.base_url)
    }
}

/// Bare hosts get `https://`; trailing slashes are dropped.
fn normalize_base(raw: &str) -> VaultResult<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(VaultError::Config("enclave url is empty".into()));
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("https://{trimmed}"))
    }
}

#[async_trait]
impl SigningClient for HttpEnclave {
    async fn sign(&self, probe: &SigningProbe) -> VaultResult<SigningToken> {
        let endpoint = self.endpoint();
        tracing::info!(%endpoint, "contacting enclave");

        let response = self
            .client
            .post(&endpoint)
            .header("ngrok-skip-browser-warning", "true")
            .json(probe)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "enclave transport failure");
                VaultError::EnclaveUnreachable(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(%status, "enclave rejected probe");
            return Err(VaultError::EnclaveUnreachable(format!("status {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| VaultError::EnclaveUnreachable(e.to_string()))?;
        let token = body.trim();
        tracing::info!("enclave connection established");
        Ok(SigningToken(if token.is_empty() { FALLBACK_TOKEN.into() } else { token.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_normalization() {
        assert_eq!(normalize_base("custody.example.app").unwrap(), "https://custody.example.app");
        assert_eq!(normalize_base("http://127.0.0.1:9000/").unwrap(), "http://127.0.0.1:9000");
        assert!(normalize_base("  ").is_err());
    }

    #[test]
    fn endpoint_appends_sign() {
        let enclave = HttpEnclave::new("http://localhost:1", Duration::from_millis(50)).unwrap();
        assert_eq!(enclave.endpoint(), "http://localhost:1/sign");
    }

    #[tokio::test]
    async fn unreachable_host_is_enclave_error() {
        // Port 9 on loopback: nothing listens, connection is refused.
        let enclave = HttpEnclave::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let err = enclave.sign(&SigningProbe::default()).await.unwrap_err();
        assert!(matches!(err, VaultError::EnclaveUnreachable(_)));
    }
}
