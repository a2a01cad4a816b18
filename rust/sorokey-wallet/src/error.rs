//! Wallet errors.

use sorokey_credentials::webauthn::{CeremonyError, CredentialError, SignatureError};
use sorokey_xdr::{StrKeyError, XdrError};
use thiserror::Error;

/// Everything that can stop a wallet operation.
///
/// Variants keep the kind of failure intact so callers can tell a bad
/// device from a bad network from an outcome that is not yet known.
#[derive(Debug, Error)]
pub enum WalletError {
    /// The passkey registration response did not yield a usable key.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// The assertion signature could not be canonicalized.
    #[error(transparent)]
    Signature(#[from] SignatureError),

    /// The user or the platform declined a WebAuthn ceremony.
    #[error("authentication ceremony failed: {0}")]
    Ceremony(#[from] CeremonyError),

    /// A list of authorization entries could not be decoded or encoded.
    #[error("malformed authorization data: {0}")]
    MalformedAuthorizationData(XdrError),

    /// Any other XDR value could not be decoded or encoded.
    #[error(transparent)]
    Xdr(#[from] XdrError),

    /// An address or key string is not a valid StrKey.
    #[error("invalid address: {0}")]
    StrKey(#[from] StrKeyError),

    /// The configuration is incomplete or inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The network rejected a simulation; carries its diagnostic.
    #[error("simulation failed: {0}")]
    Simulation(String),

    /// The network rejected a submitted transaction.
    #[error("transaction rejected with status {status}")]
    Submission {
        /// The `sendTransaction` status.
        status: String,
        /// Base64 `TransactionResult` with the result codes, when present.
        error_result_xdr: Option<String>,
    },

    /// The transaction was applied and failed.
    #[error("transaction {hash} failed")]
    TransactionFailed {
        hash: String,
        /// Base64 `TransactionResult`, when present.
        result_xdr: Option<String>,
    },

    /// Polling gave up before the transaction reached a terminal state. It
    /// may still be applied later.
    #[error("transaction {hash} not found after {attempts} attempts")]
    TransactionTimeout { hash: String, attempts: u32 },

    /// Classic fee plus resource fee does not fit a transaction fee.
    #[error("fee of {0} stroops exceeds the transaction fee limit")]
    InvalidFee(u64),

    /// A SEP-45 challenge failed validation.
    #[error("invalid web auth challenge: {0}")]
    InvalidChallenge(String),

    /// The RPC server could not be reached or answered with an error.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// The co-signer could not be reached or refused to sign.
    #[error("co-signer error: {0}")]
    CoSigner(String),

    /// A response was well-formed but not what the protocol allows.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl WalletError {
    /// Whether the outcome of a submitted transaction is still unknown.
    pub fn is_timeout(&self) -> bool {
        matches!(self, WalletError::TransactionTimeout { .. })
    }
}
