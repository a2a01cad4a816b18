//! Classic Stellar account keys.

use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use rand::rngs::OsRng;
use sorokey_xdr::{AccountId, DecoratedSignature, Hash, StrKey, StrKeyKind, TransactionEnvelope};

use crate::WalletError;

/// An Ed25519 account keypair.
#[derive(Clone)]
pub struct Keypair {
    key: SigningKey,
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

impl Keypair {
    /// Generate a fresh keypair.
    pub fn random() -> Self {
        Self {
            key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Load a keypair from an `S…` secret seed.
    pub fn from_secret(secret: &str) -> Result<Self, WalletError> {
        let seed = StrKey::decode_as(StrKeyKind::Seed, secret)?;
        Ok(Self::from_seed(&seed))
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(seed),
        }
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }

    pub fn account_id(&self) -> AccountId {
        AccountId(self.public_key())
    }

    /// The `G…` account address.
    pub fn address(&self) -> String {
        StrKey::Account(self.public_key()).to_string()
    }

    /// The `S…` secret seed.
    pub fn secret(&self) -> String {
        StrKey::Seed(self.key.to_bytes()).to_string()
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.key.sign(message).to_bytes()
    }

    /// The last four bytes of the public key, which identify this signer in
    /// a transaction envelope.
    pub fn signature_hint(&self) -> [u8; 4] {
        let key = self.public_key();
        [key[28], key[29], key[30], key[31]]
    }

    /// Add this key's signature to an envelope.
    pub fn sign_envelope(
        &self,
        envelope: &mut TransactionEnvelope,
        network_id: &Hash,
    ) -> Result<(), WalletError> {
        let hash = envelope.tx.hash(network_id)?;
        envelope.signatures.push(DecoratedSignature {
            hint: self.signature_hint(),
            signature: self.sign(&hash).to_vec(),
        });
        Ok(())
    }
}

/// Check an Ed25519 signature by the account at `public_key`.
pub fn verify_signature(public_key: &[u8; 32], message: &[u8], signature: &[u8]) -> bool {
    let Ok(key) = VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    key.verify(message, &signature).is_ok()
}
