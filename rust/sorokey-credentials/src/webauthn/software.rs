//! An in-process passkey for tests.
//!
//! [`SoftwareAuthenticator`] holds a P-256 key and answers ceremonies the way
//! a platform authenticator does: registration returns a `fmt: "none"`
//! attestation object carrying a COSE EC2 key, and assertions sign
//! `authenticatorData || SHA-256(clientDataJSON)` with a DER signature.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use p256::ecdsa::signature::Signer as _;
use p256::ecdsa::{Signature, SigningKey};
use p256::elliptic_curve::scalar::IsHigh;
use serde_cbor::Value;
use sha2::{Digest, Sha256};

use super::authenticator::{AssertionRequest, AssertionResult, Authenticator, RegistrationOptions};
use super::credential::{FLAG_AT, FLAG_UP, FLAG_UV, PUBLIC_KEY_LENGTH, PasskeyCredential, RegistrationResponse};
use super::error::CeremonyError;

/// A deterministic P-256 passkey.
#[derive(Debug)]
pub struct SoftwareAuthenticator {
    key: SigningKey,
    credential_id: Vec<u8>,
    sign_count: AtomicU32,
    declining: bool,
    high_s: bool,
}

impl SoftwareAuthenticator {
    /// Derive a passkey from `seed`. The same seed always yields the same key
    /// and credential id.
    pub fn from_seed(seed: &[u8]) -> Self {
        let mut counter = 0u32;
        let key = loop {
            let digest = Sha256::new()
                .chain_update(seed)
                .chain_update(counter.to_be_bytes())
                .finalize();
            if let Ok(key) = SigningKey::from_bytes(&digest) {
                break key;
            }
            counter += 1;
        };
        let point = key.verifying_key().to_encoded_point(false);
        let credential_id = Sha256::digest(point.as_bytes())[..16].to_vec();

        Self {
            key,
            credential_id,
            sign_count: AtomicU32::new(0),
            declining: false,
            high_s: false,
        }
    }

    /// Fail every ceremony as if the user dismissed the prompt.
    pub fn declining(mut self) -> Self {
        self.declining = true;
        self
    }

    /// Return high-S signatures from assertions, as some authenticators do.
    pub fn producing_high_s(mut self) -> Self {
        self.high_s = true;
        self
    }

    pub fn credential_id(&self) -> &[u8] {
        &self.credential_id
    }

    /// The uncompressed SEC1 public key.
    pub fn public_key(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        let mut point = [0u8; PUBLIC_KEY_LENGTH];
        point.copy_from_slice(self.key.verifying_key().to_encoded_point(false).as_bytes());
        point
    }

    pub fn credential(&self) -> PasskeyCredential {
        PasskeyCredential {
            credential_id: self.credential_id.clone(),
            public_key: self.public_key(),
        }
    }

    fn cose_key(&self) -> Value {
        let point = self.key.verifying_key().to_encoded_point(false);
        let mut key = BTreeMap::new();
        key.insert(Value::Integer(1), Value::Integer(2));
        key.insert(Value::Integer(3), Value::Integer(-7));
        key.insert(Value::Integer(-1), Value::Integer(1));
        key.insert(Value::Integer(-2), Value::Bytes(point.as_bytes()[1..33].to_vec()));
        key.insert(Value::Integer(-3), Value::Bytes(point.as_bytes()[33..].to_vec()));
        Value::Map(key)
    }

    fn sign(&self, signed_data: &[u8]) -> Result<Vec<u8>, CeremonyError> {
        let signature: Signature = self.key.sign(signed_data);
        let signature = if self.high_s && !bool::from(signature.s().is_high()) {
            let (r, s) = signature.split_scalars();
            Signature::from_scalars(r, -s)
                .map_err(|error| CeremonyError::AssertionFailed(error.to_string()))?
        } else {
            signature
        };
        Ok(signature.to_der().as_bytes().to_vec())
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Authenticator for SoftwareAuthenticator {
    async fn register(
        &self,
        options: &RegistrationOptions,
    ) -> Result<RegistrationResponse, CeremonyError> {
        if self.declining {
            return Err(CeremonyError::Declined("NotAllowedError".into()));
        }

        let cose_key = serde_cbor::to_vec(&self.cose_key())
            .map_err(|error| CeremonyError::RegistrationFailed(error.to_string()))?;
        let mut authenticator_data = Sha256::digest(options.rp_id.as_bytes()).to_vec();
        authenticator_data.push(FLAG_UP | FLAG_UV | FLAG_AT);
        authenticator_data.extend_from_slice(&0u32.to_be_bytes());
        authenticator_data.extend_from_slice(&[0u8; 16]);
        authenticator_data.extend_from_slice(&(self.credential_id.len() as u16).to_be_bytes());
        authenticator_data.extend_from_slice(&self.credential_id);
        authenticator_data.extend_from_slice(&cose_key);

        let mut attestation = BTreeMap::new();
        attestation.insert(Value::Text("fmt".into()), Value::Text("none".into()));
        attestation.insert(Value::Text("attStmt".into()), Value::Map(BTreeMap::new()));
        attestation.insert(Value::Text("authData".into()), Value::Bytes(authenticator_data));
        let attestation_object = serde_cbor::to_vec(&Value::Map(attestation))
            .map_err(|error| CeremonyError::RegistrationFailed(error.to_string()))?;

        Ok(RegistrationResponse {
            credential_id: self.credential_id.clone(),
            public_key: None,
            authenticator_data: None,
            attestation_object: Some(attestation_object),
        })
    }

    async fn assert(&self, request: &AssertionRequest) -> Result<AssertionResult, CeremonyError> {
        if self.declining {
            return Err(CeremonyError::Declined("NotAllowedError".into()));
        }
        if !request.allow_credentials.is_empty()
            && !request.allow_credentials.contains(&self.credential_id)
        {
            return Err(CeremonyError::AssertionFailed(
                "no allowed credential on this authenticator".into(),
            ));
        }

        let client_data_json = serde_json::to_vec(&serde_json::json!({
            "type": "webauthn.get",
            "challenge": URL_SAFE_NO_PAD.encode(&request.challenge),
            "origin": format!("https://{}", request.rp_id),
            "crossOrigin": false
        }))
        .map_err(|error| CeremonyError::AssertionFailed(error.to_string()))?;

        let count = self.sign_count.fetch_add(1, Ordering::Relaxed) + 1;
        let mut authenticator_data = Sha256::digest(request.rp_id.as_bytes()).to_vec();
        authenticator_data.push(FLAG_UP | FLAG_UV);
        authenticator_data.extend_from_slice(&count.to_be_bytes());

        let mut signed_data = authenticator_data.clone();
        signed_data.extend_from_slice(&Sha256::digest(&client_data_json));

        Ok(AssertionResult {
            credential_id: self.credential_id.clone(),
            signature: self.sign(&signed_data)?,
            authenticator_data,
            client_data_json,
        })
    }
}
