//! Wallet configuration.
//!
//! A [`WalletConfig`] is built once, validated once when a
//! [`SmartWallet`](crate::SmartWallet) is constructed, and never changes
//! afterwards.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sorokey_xdr::{Hash, StrKey, StrKeyKind};
use url::Url;

use crate::WalletError;

/// Passphrase of the Stellar test network.
pub const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";

/// Soroban RPC endpoint of the Stellar test network.
pub const TESTNET_RPC_URL: &str = "https://soroban-testnet.stellar.org";

/// Hash of the passkey account contract WASM installed on testnet.
pub const DEFAULT_WASM_HASH: &str =
    "03dbb8b88b981e944ae44f48edba5a39c8351ea8c84959b92707108837654f6f";

/// Which network to talk to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Soroban RPC endpoint.
    pub rpc_url: String,
    /// Network passphrase; its SHA-256 is the network id.
    pub network_passphrase: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: TESTNET_RPC_URL.to_string(),
            network_passphrase: TESTNET_PASSPHRASE.to_string(),
        }
    }
}

/// How long to wait for a submitted transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Number of `getTransaction` calls before giving up.
    pub attempts: u32,
    /// Delay between calls, in milliseconds.
    pub interval_ms: u64,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            attempts: 100,
            interval_ms: 2_000,
        }
    }
}

impl PollPolicy {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Configuration for a [`SmartWallet`](crate::SmartWallet).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    pub network: NetworkConfig,

    /// Base URL of the wallet backend that holds the fee account key.
    pub cosigner_endpoint: String,

    /// `G…` address of the fee-paying account. It is the source of every
    /// transaction and the deployer of every passkey contract; only the
    /// co-signer holds its secret.
    pub source_account: String,

    /// Hex hash of the passkey account contract WASM.
    pub wasm_hash: String,

    /// Classic fee for a transaction, in stroops, before resource fees.
    pub max_fee: u32,

    /// Seconds a built transaction stays valid.
    pub transaction_timeout: u64,

    /// Ledgers an authorization signature stays valid after the latest
    /// ledger (about five seconds each).
    pub signature_validity_ledgers: u32,

    pub poll: PollPolicy,

    /// WebAuthn relying party id (the site's domain).
    pub rp_id: String,

    /// WebAuthn relying party name shown in passkey prompts.
    pub rp_name: String,

    /// Timeout for HTTP requests in seconds.
    pub request_timeout: u64,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            cosigner_endpoint: "http://localhost:8080".to_string(),
            source_account: String::new(),
            wasm_hash: DEFAULT_WASM_HASH.to_string(),
            max_fee: 10_000,
            transaction_timeout: 300,
            signature_validity_ledgers: 60,
            poll: PollPolicy::default(),
            rp_id: "localhost".to_string(),
            rp_name: "Stellar Demo Wallet".to_string(),
            request_timeout: 30,
        }
    }
}

impl WalletConfig {
    /// Testnet defaults with the given fee account.
    pub fn new(source_account: impl Into<String>) -> Self {
        Self {
            source_account: source_account.into(),
            ..Default::default()
        }
    }

    pub fn with_network(
        mut self,
        rpc_url: impl Into<String>,
        network_passphrase: impl Into<String>,
    ) -> Self {
        self.network = NetworkConfig {
            rpc_url: rpc_url.into(),
            network_passphrase: network_passphrase.into(),
        };
        self
    }

    pub fn with_cosigner(mut self, endpoint: impl Into<String>) -> Self {
        self.cosigner_endpoint = endpoint.into();
        self
    }

    pub fn with_wasm_hash(mut self, wasm_hash: impl Into<String>) -> Self {
        self.wasm_hash = wasm_hash.into();
        self
    }

    pub fn with_max_fee(mut self, max_fee: u32) -> Self {
        self.max_fee = max_fee;
        self
    }

    pub fn with_transaction_timeout(mut self, seconds: u64) -> Self {
        self.transaction_timeout = seconds;
        self
    }

    pub fn with_signature_validity(mut self, ledgers: u32) -> Self {
        self.signature_validity_ledgers = ledgers;
        self
    }

    pub fn with_poll(mut self, attempts: u32, interval: Duration) -> Self {
        self.poll = PollPolicy {
            attempts,
            interval_ms: interval.as_millis().try_into().unwrap_or(u64::MAX),
        };
        self
    }

    pub fn with_relying_party(mut self, rp_id: impl Into<String>, rp_name: impl Into<String>) -> Self {
        self.rp_id = rp_id.into();
        self.rp_name = rp_name.into();
        self
    }

    pub fn with_request_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout = seconds;
        self
    }

    /// The contract WASM hash as bytes.
    pub fn wasm_hash_bytes(&self) -> Result<Hash, WalletError> {
        let bytes = hex::decode(&self.wasm_hash)
            .map_err(|error| WalletError::Config(format!("wasm_hash: {error}")))?;
        bytes
            .try_into()
            .map_err(|bytes: Vec<u8>| {
                WalletError::Config(format!("wasm_hash: expected 32 bytes, got {}", bytes.len()))
            })
    }

    /// Check that every field can be used.
    pub fn validate(&self) -> Result<(), WalletError> {
        StrKey::decode_as(StrKeyKind::Account, &self.source_account)
            .map_err(|error| WalletError::Config(format!("source_account: {error}")))?;
        self.wasm_hash_bytes()?;
        Url::parse(&self.network.rpc_url)
            .map_err(|error| WalletError::Config(format!("rpc_url: {error}")))?;
        Url::parse(&self.cosigner_endpoint)
            .map_err(|error| WalletError::Config(format!("cosigner_endpoint: {error}")))?;
        if self.network.network_passphrase.is_empty() {
            return Err(WalletError::Config("network_passphrase is empty".into()));
        }
        if self.poll.attempts == 0 {
            return Err(WalletError::Config("poll.attempts must be at least 1".into()));
        }
        if self.rp_id.is_empty() {
            return Err(WalletError::Config("rp_id is empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCOUNT: &str = "GA7QYNF7SOWQ3GLR2BGMZEHXAVIRZA4KVWLTJJFC7MGXUA74P7UJVSGZ";

    #[test]
    fn it_defaults_to_testnet_policy() {
        let config = WalletConfig::new(ACCOUNT);
        assert_eq!(config.network.network_passphrase, TESTNET_PASSPHRASE);
        assert_eq!(config.max_fee, 10_000);
        assert_eq!(config.signature_validity_ledgers, 60);
        assert_eq!(config.poll.attempts, 100);
        assert_eq!(config.poll.interval(), Duration::from_secs(2));
        assert_eq!(config.rp_name, "Stellar Demo Wallet");
        config.validate().unwrap();
    }

    #[test]
    fn it_builds_with_overrides() {
        let config = WalletConfig::new(ACCOUNT)
            .with_network("http://localhost:8000/rpc", "Standalone Network ; February 2017")
            .with_cosigner("http://localhost:3000")
            .with_poll(5, Duration::from_millis(10))
            .with_signature_validity(120)
            .with_relying_party("wallet.example", "Example");

        assert_eq!(config.network.rpc_url, "http://localhost:8000/rpc");
        assert_eq!(config.poll, PollPolicy { attempts: 5, interval_ms: 10 });
        assert_eq!(config.signature_validity_ledgers, 120);
        assert_eq!(config.rp_id, "wallet.example");
        config.validate().unwrap();
    }

    #[test]
    fn it_rejects_unusable_configuration() {
        assert!(matches!(
            WalletConfig::default().validate(),
            Err(WalletError::Config(_))
        ));
        assert!(matches!(
            WalletConfig::new(ACCOUNT).with_wasm_hash("abcd").validate(),
            Err(WalletError::Config(_))
        ));
        assert!(matches!(
            WalletConfig::new(ACCOUNT)
                .with_poll(0, Duration::from_secs(1))
                .validate(),
            Err(WalletError::Config(_))
        ));
    }

    #[test]
    fn it_round_trips_through_json() {
        let config = WalletConfig::new(ACCOUNT).with_max_fee(500);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(serde_json::from_str::<WalletConfig>(&json).unwrap(), config);

        let partial: WalletConfig =
            serde_json::from_str(&format!(r#"{{"source_account":"{ACCOUNT}"}}"#)).unwrap();
        assert_eq!(partial, WalletConfig::new(ACCOUNT));
    }
}
