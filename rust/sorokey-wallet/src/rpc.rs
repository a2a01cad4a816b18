//! The Soroban RPC boundary.
//!
//! Only the five calls the wallet needs are modelled. [`HttpRpcClient`]
//! speaks JSON-RPC to a Soroban RPC server; tests substitute an in-memory
//! implementation.

mod http;

use async_trait::async_trait;
use sorokey_credentials::ConditionalSync;
use sorokey_xdr::{ScVal, SorobanAuthorizationEntry, SorobanTransactionData, Transaction, TransactionEnvelope};

pub use http::HttpRpcClient;

use crate::WalletError;

/// The outcome of `simulateTransaction`.
///
/// Each simulation is a fresh value; a transaction must be assembled from
/// the latest one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationResult {
    /// Authorization entries the invocation requires, unsigned.
    pub auth: Vec<SorobanAuthorizationEntry>,
    /// Minimum resource fee in stroops, as the decimal string the server
    /// reports.
    pub min_resource_fee: String,
    /// Footprint and resources to attach to the transaction.
    pub transaction_data: Option<SorobanTransactionData>,
    pub latest_ledger: u32,
    /// The invocation's return value.
    pub return_value: Option<ScVal>,
    /// Set when the simulation failed; carries the host diagnostic.
    pub error: Option<String>,
}

impl SimulationResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// The resource fee as a number. Anything that is not a non-negative
    /// decimal integer counts as zero.
    pub fn resource_fee(&self) -> u64 {
        self.min_resource_fee.trim().parse().unwrap_or(0)
    }
}

/// `sendTransaction` status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    Pending,
    Duplicate,
    TryAgainLater,
    Error,
}

impl SendStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SendStatus::Pending => "PENDING",
            SendStatus::Duplicate => "DUPLICATE",
            SendStatus::TryAgainLater => "TRY_AGAIN_LATER",
            SendStatus::Error => "ERROR",
        }
    }
}

/// The outcome of `sendTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendResult {
    /// Hex transaction hash.
    pub hash: String,
    pub status: SendStatus,
    /// Base64 `TransactionResult` when the server rejected the transaction.
    pub error_result_xdr: Option<String>,
}

/// `getTransaction` status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Success,
    Failed,
    NotFound,
}

/// The outcome of `getTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionInfo {
    pub hash: String,
    pub status: TransactionStatus,
    /// Ledger the transaction was applied in.
    pub ledger: Option<u32>,
    /// The invocation's return value, when the server reports it.
    pub return_value: Option<ScVal>,
    /// Base64 `TransactionResult`.
    pub result_xdr: Option<String>,
}

/// A Soroban RPC server.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait SorobanRpc: ConditionalSync {
    /// Dry-run `transaction` against current ledger state.
    async fn simulate_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<SimulationResult, WalletError>;

    /// Submit a signed transaction.
    async fn send_transaction(
        &self,
        envelope: &TransactionEnvelope,
    ) -> Result<SendResult, WalletError>;

    /// Look up a submitted transaction by hex hash.
    async fn get_transaction(&self, hash: &str) -> Result<TransactionInfo, WalletError>;

    /// The sequence number of the latest closed ledger.
    async fn get_latest_ledger(&self) -> Result<u32, WalletError>;

    /// The current sequence number of a `G…` account.
    async fn get_account_sequence(&self, address: &str) -> Result<i64, WalletError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_parses_resource_fees_leniently() {
        let fee = |value: &str| SimulationResult {
            min_resource_fee: value.to_string(),
            ..Default::default()
        };
        assert_eq!(fee("1500").resource_fee(), 1500);
        assert_eq!(fee(" 42 ").resource_fee(), 42);
        assert_eq!(fee("").resource_fee(), 0);
        assert_eq!(fee("-5").resource_fee(), 0);
        assert_eq!(fee("12abc").resource_fee(), 0);
    }
}
