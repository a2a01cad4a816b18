//! The co-signer boundary.
//!
//! The fee account's secret lives only in a wallet backend. The client sends
//! it unsigned transactions and SEP-45 client-domain entries and gets them
//! back signed.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use sorokey_credentials::ConditionalSync;
use sorokey_xdr::{SorobanAuthorizationEntry, TransactionEnvelope, Xdr};
use url::Url;

use crate::{WalletConfig, WalletError};

/// A remote holder of the fee account key.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait CoSigner: ConditionalSync {
    /// Add the fee account's signature to a transaction envelope.
    async fn sign_transaction(
        &self,
        envelope: &TransactionEnvelope,
        network_passphrase: &str,
    ) -> Result<TransactionEnvelope, WalletError>;

    /// Sign a SEP-45 authorization entry for the client domain account.
    async fn sign_authorization_entry(
        &self,
        entry: &SorobanAuthorizationEntry,
        valid_until_ledger: u32,
        network_passphrase: &str,
    ) -> Result<SorobanAuthorizationEntry, WalletError>;
}

#[derive(Deserialize)]
struct SignedTransaction {
    signed_tx: String,
}

#[derive(Deserialize)]
struct SignedEntry {
    signed_entry: String,
}

/// A [`CoSigner`] reached over HTTP with form-encoded requests.
#[derive(Debug, Clone)]
pub struct HttpCoSigner {
    endpoint: String,
    client: Client,
}

impl HttpCoSigner {
    pub fn new(endpoint: &str, timeout_seconds: u64) -> Result<Self, WalletError> {
        Url::parse(endpoint).map_err(|error| WalletError::Config(error.to_string()))?;

        #[cfg(not(target_arch = "wasm32"))]
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|error| WalletError::CoSigner(error.to_string()))?;

        #[cfg(target_arch = "wasm32")]
        let client = {
            let _ = timeout_seconds;
            Client::new()
        };

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &WalletConfig) -> Result<Self, WalletError> {
        Self::new(&config.cosigner_endpoint, config.request_timeout)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<T, WalletError> {
        let response = self
            .client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .map_err(|e| WalletError::CoSigner(format!("{path}: HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WalletError::CoSigner(format!(
                "{path}: HTTP {} - {body}",
                status.as_u16()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| WalletError::UnexpectedResponse(format!("{path}: {e}")))
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl CoSigner for HttpCoSigner {
    async fn sign_transaction(
        &self,
        envelope: &TransactionEnvelope,
        network_passphrase: &str,
    ) -> Result<TransactionEnvelope, WalletError> {
        let form = [
            ("unsigned_tx", envelope.to_xdr_base64()?),
            ("network_passphrase", network_passphrase.to_string()),
        ];
        let response: SignedTransaction = self.post("/sign-tx", &form).await?;
        Ok(TransactionEnvelope::from_xdr_base64(&response.signed_tx)?)
    }

    async fn sign_authorization_entry(
        &self,
        entry: &SorobanAuthorizationEntry,
        valid_until_ledger: u32,
        network_passphrase: &str,
    ) -> Result<SorobanAuthorizationEntry, WalletError> {
        let form = [
            ("unsigned_entry", entry.to_xdr_base64()?),
            ("valid_until_ledger_seq", valid_until_ledger.to_string()),
            ("network_passphrase", network_passphrase.to_string()),
        ];
        let response: SignedEntry = self.post("/sep45/sign", &form).await?;
        Ok(SorobanAuthorizationEntry::from_xdr_base64(
            &response.signed_entry,
        )?)
    }
}
