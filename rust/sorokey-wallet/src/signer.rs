//! Signing of Soroban authorization entries.
//!
//! An entry is signed by the address in its credentials over
//! `SHA-256(HashIdPreimage::SorobanAuthorization)`. Classic accounts sign
//! with Ed25519; passkey contract accounts sign with a WebAuthn assertion
//! whose challenge is that payload.

use sorokey_credentials::webauthn::{AssertionRequest, Authenticator, canonicalize};
use sorokey_xdr::{
    Hash, HashIdPreimage, ScAddress, ScVal, SorobanAuthorizationEntry,
    SorobanAuthorizedInvocation, network_id,
};
use tracing::debug;

use crate::{Keypair, SorobanRpc, WalletError};

/// How a passkey signature is presented to the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasskeyRole {
    /// The contract is authorizing its own invocation. The contract checks
    /// the WebAuthn client data itself, so the signature carries
    /// `authenticator_data` and `client_data_json`.
    Account,
    /// The contract co-signs an invocation for someone else (SEP-45). Only
    /// `credential_id` and `signature` are sent.
    Invoker,
}

/// Who signs an authorization entry.
#[derive(Debug, Clone)]
pub enum SignerRole {
    /// A classic account; signs entries whose address is its `G…` key.
    Classic(Keypair),
    /// A passkey contract account; signs entries whose address is a
    /// contract.
    Passkey {
        credential_id: Vec<u8>,
        role: PasskeyRole,
    },
}

impl SignerRole {
    pub fn passkey(credential_id: impl Into<Vec<u8>>) -> Self {
        SignerRole::Passkey {
            credential_id: credential_id.into(),
            role: PasskeyRole::Account,
        }
    }

    /// Whether entries authorized by `address` are this signer's to sign.
    pub fn signs_for(&self, address: &ScAddress) -> bool {
        match (self, address) {
            (SignerRole::Classic(keypair), ScAddress::Account(key)) => {
                *key == keypair.public_key()
            }
            (SignerRole::Passkey { .. }, ScAddress::Contract(_)) => true,
            _ => false,
        }
    }
}

/// The 32 bytes an address signs to authorize `invocation`.
pub fn authorization_payload(
    network_id: &Hash,
    nonce: i64,
    signature_expiration_ledger: u32,
    invocation: &SorobanAuthorizedInvocation,
) -> Result<Hash, WalletError> {
    Ok(HashIdPreimage::SorobanAuthorization {
        network_id: *network_id,
        nonce,
        signature_expiration_ledger,
        invocation: invocation.clone(),
    }
    .hash()?)
}

/// Signs authorization entries as a classic account or a passkey contract.
pub struct EntrySigner<'a, R, A> {
    rpc: &'a R,
    authenticator: &'a A,
    network_id: Hash,
    rp_id: String,
    validity_ledgers: u32,
}

impl<'a, R, A> EntrySigner<'a, R, A>
where
    R: SorobanRpc,
    A: Authenticator,
{
    pub fn new(
        rpc: &'a R,
        authenticator: &'a A,
        network_passphrase: &str,
        rp_id: impl Into<String>,
        validity_ledgers: u32,
    ) -> Self {
        Self {
            rpc,
            authenticator,
            network_id: network_id(network_passphrase),
            rp_id: rp_id.into(),
            validity_ledgers,
        }
    }

    pub fn network_id(&self) -> &Hash {
        &self.network_id
    }

    /// Sign `entry`, valid until `validity_ledgers` past the latest ledger.
    ///
    /// Entries authorized by the transaction source, or by an address the
    /// role does not sign for, come back unchanged.
    pub async fn sign(
        &self,
        entry: &SorobanAuthorizationEntry,
        role: &SignerRole,
    ) -> Result<SorobanAuthorizationEntry, WalletError> {
        match entry.address_credentials() {
            Some(credentials) if role.signs_for(&credentials.address) => {
                let latest = self.rpc.get_latest_ledger().await?;
                self.sign_until(entry, role, latest.saturating_add(self.validity_ledgers))
                    .await
            }
            _ => Ok(entry.clone()),
        }
    }

    /// Sign `entry` with an explicit expiration ledger.
    pub async fn sign_until(
        &self,
        entry: &SorobanAuthorizationEntry,
        role: &SignerRole,
        expiration_ledger: u32,
    ) -> Result<SorobanAuthorizationEntry, WalletError> {
        let nonce = match entry.address_credentials() {
            Some(credentials) if role.signs_for(&credentials.address) => credentials.nonce,
            _ => return Ok(entry.clone()),
        };

        let payload = authorization_payload(
            &self.network_id,
            nonce,
            expiration_ledger,
            &entry.root_invocation,
        )?;
        debug!(nonce, expiration_ledger, "signing authorization entry");

        let signature = match role {
            SignerRole::Classic(keypair) => classic_signature(keypair, &payload)?,
            SignerRole::Passkey {
                credential_id,
                role,
            } => self.passkey_signature(credential_id, *role, &payload).await?,
        };

        let mut signed = entry.clone();
        if let Some(credentials) = signed.address_credentials_mut() {
            credentials.signature_expiration_ledger = expiration_ledger;
            credentials.signature = signature;
        }
        Ok(signed)
    }

    async fn passkey_signature(
        &self,
        credential_id: &[u8],
        role: PasskeyRole,
        payload: &Hash,
    ) -> Result<ScVal, WalletError> {
        let assertion = self
            .authenticator
            .assert(&AssertionRequest {
                challenge: payload.to_vec(),
                rp_id: self.rp_id.clone(),
                allow_credentials: vec![credential_id.to_vec()],
            })
            .await?;
        let signature = canonicalize(&assertion.signature)?;

        let mut fields = vec![
            ("credential_id", ScVal::Bytes(assertion.credential_id)),
            ("signature", ScVal::Bytes(signature.to_vec())),
        ];
        if role == PasskeyRole::Account {
            fields.push((
                "authenticator_data",
                ScVal::Bytes(assertion.authenticator_data),
            ));
            fields.push(("client_data_json", ScVal::Bytes(assertion.client_data_json)));
        }
        Ok(ScVal::symbol_map(fields)?)
    }
}

/// The signature value a classic account's entry carries:
/// `[{ public_key, signature }]`.
fn classic_signature(keypair: &Keypair, payload: &Hash) -> Result<ScVal, WalletError> {
    let entry = ScVal::symbol_map([
        ("public_key", ScVal::Bytes(keypair.public_key().to_vec())),
        ("signature", ScVal::Bytes(keypair.sign(payload).to_vec())),
    ])?;
    Ok(ScVal::Vec(Some(vec![entry])))
}
