//! Passkey signature verification.
//!
//! Performs the same checks a passkey-controlled Soroban account makes in
//! `__check_auth`:
//! 1. `clientDataJSON.type` is `webauthn.get` and its challenge is
//!    `base64url(payload)`
//! 2. the user-present and user-verified flags are set
//! 3. the compact, low-S P-256 signature verifies over
//!    `authenticatorData || SHA-256(clientDataJSON)`

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use p256::ecdsa::signature::Verifier as _;
use p256::ecdsa::{Signature, VerifyingKey};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::authenticator::AssertionResult;
use super::credential::{FLAG_UP, FLAG_UV, FLAGS_OFFSET, PUBLIC_KEY_LENGTH};
use super::error::PasskeyVerifyError;
use super::signature::{CompactSignature, canonicalize};

/// Minimum authenticator data: rpIdHash, flags and signCount.
const MIN_AUTHENTICATOR_DATA: usize = 37;

#[derive(Deserialize)]
struct ClientData {
    #[serde(rename = "type")]
    kind: String,
    challenge: String,
}

/// Verifies passkey assertions against a P-256 public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasskeyVerifier {
    key: VerifyingKey,
}

impl PasskeyVerifier {
    /// Create a verifier from SEC1 bytes (33 compressed or 65 uncompressed).
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, PasskeyVerifyError> {
        let key =
            VerifyingKey::from_sec1_bytes(bytes).map_err(|_| PasskeyVerifyError::InvalidPublicKey)?;
        Ok(Self { key })
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.key
    }

    /// The uncompressed SEC1 public key.
    pub fn to_public_key(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        let mut point = [0u8; PUBLIC_KEY_LENGTH];
        point.copy_from_slice(self.key.to_encoded_point(false).as_bytes());
        point
    }

    /// Verify a compact signature produced by a passkey over `payload`.
    pub fn verify(
        &self,
        payload: &[u8],
        authenticator_data: &[u8],
        client_data_json: &[u8],
        signature: &CompactSignature,
    ) -> Result<(), PasskeyVerifyError> {
        self.validate_client_data(payload, client_data_json)?;

        if authenticator_data.len() < MIN_AUTHENTICATOR_DATA {
            return Err(PasskeyVerifyError::InvalidAuthenticatorData);
        }
        let flags = authenticator_data[FLAGS_OFFSET];
        if flags & FLAG_UP == 0 {
            return Err(PasskeyVerifyError::UserNotPresent);
        }
        if flags & FLAG_UV == 0 {
            return Err(PasskeyVerifyError::UserNotVerified);
        }

        let signature = Signature::from_slice(signature.as_bytes())
            .map_err(|e| PasskeyVerifyError::InvalidSignature(e.to_string()))?;
        let mut signed_data = Vec::with_capacity(authenticator_data.len() + 32);
        signed_data.extend_from_slice(authenticator_data);
        signed_data.extend_from_slice(&Sha256::digest(client_data_json));

        self.key
            .verify(&signed_data, &signature)
            .map_err(|e| PasskeyVerifyError::InvalidSignature(e.to_string()))
    }

    /// Verify a raw ceremony result, canonicalizing its DER signature first.
    pub fn verify_assertion(
        &self,
        payload: &[u8],
        assertion: &AssertionResult,
    ) -> Result<(), PasskeyVerifyError> {
        let signature = canonicalize(&assertion.signature)
            .map_err(|e| PasskeyVerifyError::InvalidSignature(e.to_string()))?;
        self.verify(
            payload,
            &assertion.authenticator_data,
            &assertion.client_data_json,
            &signature,
        )
    }

    fn validate_client_data(
        &self,
        payload: &[u8],
        client_data_json: &[u8],
    ) -> Result<(), PasskeyVerifyError> {
        let client_data: ClientData = serde_json::from_slice(client_data_json)
            .map_err(|e| PasskeyVerifyError::InvalidClientData(e.to_string()))?;

        if client_data.kind != "webauthn.get" {
            return Err(PasskeyVerifyError::UnexpectedType(client_data.kind));
        }

        let challenge = URL_SAFE_NO_PAD
            .decode(client_data.challenge.trim_end_matches('='))
            .map_err(|e| PasskeyVerifyError::InvalidClientData(e.to_string()))?;
        if challenge != payload {
            return Err(PasskeyVerifyError::ChallengeMismatch);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use p256::ecdsa::signature::Signer as _;
    use p256::ecdsa::{DerSignature, SigningKey};
    use p256::elliptic_curve::scalar::IsHigh;

    use super::*;

    fn client_data_json(kind: &str, payload: &[u8]) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "type": kind,
            "challenge": URL_SAFE_NO_PAD.encode(payload),
            "origin": "https://example.com",
            "crossOrigin": false
        }))
        .unwrap()
    }

    fn authenticator_data(flags: u8) -> Vec<u8> {
        let mut data = Sha256::digest(b"example.com").to_vec();
        data.push(flags);
        data.extend_from_slice(&[0, 0, 0, 1]);
        data
    }

    fn fixture(payload: &[u8], flags: u8) -> (PasskeyVerifier, AssertionResult) {
        let key = SigningKey::from_bytes(&[42u8; 32].into()).unwrap();
        let verifier = PasskeyVerifier {
            key: *key.verifying_key(),
        };
        let client_data_json = client_data_json("webauthn.get", payload);
        let authenticator_data = authenticator_data(flags);

        let mut signed_data = authenticator_data.clone();
        signed_data.extend_from_slice(&Sha256::digest(&client_data_json));
        let signature: DerSignature = key.sign(&signed_data);

        (
            verifier,
            AssertionResult {
                credential_id: vec![1, 2, 3],
                signature: signature.to_bytes().to_vec(),
                authenticator_data,
                client_data_json,
            },
        )
    }

    #[test]
    fn it_verifies_a_valid_assertion() {
        let payload = [7u8; 32];
        let (verifier, assertion) = fixture(&payload, 0x05);
        verifier.verify_assertion(&payload, &assertion).unwrap();
    }

    #[test]
    fn it_rejects_a_different_payload() {
        let (verifier, assertion) = fixture(&[7u8; 32], 0x05);
        assert_eq!(
            verifier.verify_assertion(&[8u8; 32], &assertion),
            Err(PasskeyVerifyError::ChallengeMismatch)
        );
    }

    #[test]
    fn it_rejects_registration_client_data() {
        let payload = [7u8; 32];
        let (verifier, mut assertion) = fixture(&payload, 0x05);
        assertion.client_data_json = client_data_json("webauthn.create", &payload);
        assert_eq!(
            verifier.verify_assertion(&payload, &assertion),
            Err(PasskeyVerifyError::UnexpectedType("webauthn.create".into()))
        );
    }

    #[test]
    fn it_requires_user_presence_and_verification() {
        let payload = [7u8; 32];
        let (verifier, assertion) = fixture(&payload, 0x04);
        assert_eq!(
            verifier.verify_assertion(&payload, &assertion),
            Err(PasskeyVerifyError::UserNotPresent)
        );
        let (verifier, assertion) = fixture(&payload, 0x01);
        assert_eq!(
            verifier.verify_assertion(&payload, &assertion),
            Err(PasskeyVerifyError::UserNotVerified)
        );
    }

    #[test]
    fn it_rejects_a_tampered_authenticator_data() {
        let payload = [7u8; 32];
        let (verifier, mut assertion) = fixture(&payload, 0x05);
        assertion.authenticator_data[0] ^= 0xff;
        assert!(matches!(
            verifier.verify_assertion(&payload, &assertion),
            Err(PasskeyVerifyError::InvalidSignature(_))
        ));
    }

    #[test]
    fn it_accepts_high_s_ceremony_output_once_canonicalized() {
        let payload = [7u8; 32];
        let (verifier, mut assertion) = fixture(&payload, 0x05);
        let signature = Signature::from_der(&assertion.signature).unwrap();
        let (r, s) = signature.split_scalars();
        let high = if bool::from(s.is_high()) {
            signature
        } else {
            Signature::from_scalars(r, -s).unwrap()
        };
        assertion.signature = high.to_der().as_bytes().to_vec();

        verifier.verify_assertion(&payload, &assertion).unwrap();
    }

    #[test]
    fn it_round_trips_the_public_key() {
        let (verifier, _) = fixture(&[0u8; 32], 0x05);
        let restored = PasskeyVerifier::from_sec1_bytes(&verifier.to_public_key()).unwrap();
        assert_eq!(restored, verifier);
    }
}
