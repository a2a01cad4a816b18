//! Passkey credentials and public-key extraction from registration responses.
//!
//! Authenticator data layout:
//!
//! ```text
//! rpIdHash (32) | flags (1) | signCount (4) | aaguid (16) | credIdLen (2, BE)
//!   | credentialId (credIdLen) | credentialPublicKey (COSE, CBOR) | extensions
//! ```

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_cbor::Value;
use tracing::debug;

use super::error::CredentialError;

/// User present.
pub(crate) const FLAG_UP: u8 = 0x01;
/// User verified.
pub(crate) const FLAG_UV: u8 = 0x04;
/// Attested credential data included.
pub(crate) const FLAG_AT: u8 = 0x40;

/// Offset of the flags byte in authenticator data.
pub(crate) const FLAGS_OFFSET: usize = 32;
const CREDENTIAL_ID_LENGTH_OFFSET: usize = 53;
const ATTESTED_CREDENTIAL_OFFSET: usize = 55;

/// Length of an uncompressed SEC1 P-256 point.
pub const PUBLIC_KEY_LENGTH: usize = 65;

const COSE_KTY: i128 = 1;
const COSE_ALG: i128 = 3;
const COSE_CRV: i128 = -1;
const COSE_X: i128 = -2;
const COSE_Y: i128 = -3;
const COSE_KTY_EC2: i128 = 2;
const COSE_ALG_ES256: i128 = -7;
const COSE_CRV_P256: i128 = 1;

/// The decoded fields of a WebAuthn registration response.
///
/// Browsers expose the credential public key in different ways: directly
/// (`getPublicKey()`, SPKI), inside raw authenticator data, or only inside
/// the CBOR attestation object. Any of the three is enough.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationResponse {
    /// The credential id (`rawId`).
    pub credential_id: Vec<u8>,
    /// A DER public key whose last 65 bytes are the SEC1 point.
    pub public_key: Option<Vec<u8>>,
    pub authenticator_data: Option<Vec<u8>>,
    pub attestation_object: Option<Vec<u8>>,
}

/// A registered passkey: its credential id and uncompressed P-256 key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasskeyCredential {
    pub credential_id: Vec<u8>,
    pub public_key: [u8; PUBLIC_KEY_LENGTH],
}

impl PasskeyCredential {
    /// Build a credential from a registration response.
    pub fn from_registration(response: &RegistrationResponse) -> Result<Self, CredentialError> {
        Ok(Self {
            credential_id: response.credential_id.clone(),
            public_key: extract_public_key(response)?,
        })
    }

    /// The credential id as unpadded base64url, the form browsers report as
    /// `credential.id`.
    pub fn credential_id_base64url(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.credential_id)
    }
}

/// Extract the 65-byte uncompressed P-256 public key from a registration
/// response.
///
/// A directly exposed public key is trimmed to its last 65 bytes and not
/// otherwise validated. Otherwise the key is read from the attested
/// credential data of the authenticator data, taken as-is or from the
/// `authData` field of the attestation object.
pub fn extract_public_key(
    response: &RegistrationResponse,
) -> Result<[u8; PUBLIC_KEY_LENGTH], CredentialError> {
    if let Some(public_key) = &response.public_key {
        let start = public_key
            .len()
            .checked_sub(PUBLIC_KEY_LENGTH)
            .ok_or(CredentialError::InvalidCurvePoint)?;
        let mut point = [0u8; PUBLIC_KEY_LENGTH];
        point.copy_from_slice(&public_key[start..]);
        return Ok(point);
    }

    let authenticator_data = match (&response.authenticator_data, &response.attestation_object) {
        (Some(authenticator_data), _) => authenticator_data.clone(),
        (None, Some(attestation_object)) => {
            debug!("reading public key from attestation object");
            authenticator_data_from_attestation(attestation_object)?
        }
        (None, None) => return Err(CredentialError::MissingWebAuthnData),
    };

    public_key_from_authenticator_data(&authenticator_data)
}

fn authenticator_data_from_attestation(attestation_object: &[u8]) -> Result<Vec<u8>, CredentialError> {
    match decode_first(attestation_object)? {
        Value::Map(entries) => match entries.get(&Value::Text("authData".into())) {
            Some(Value::Bytes(bytes)) => Ok(bytes.clone()),
            _ => Err(CredentialError::InvalidAuthenticatorData),
        },
        _ => Err(CredentialError::Cbor("attestation object is not a map".into())),
    }
}

/// Read the credential public key from authenticator data with attested
/// credential data.
pub fn public_key_from_authenticator_data(
    authenticator_data: &[u8],
) -> Result<[u8; PUBLIC_KEY_LENGTH], CredentialError> {
    if authenticator_data.len() < ATTESTED_CREDENTIAL_OFFSET {
        return Err(CredentialError::InvalidAuthenticatorData);
    }
    if authenticator_data[FLAGS_OFFSET] & FLAG_AT == 0 {
        return Err(CredentialError::NoAttestedCredential);
    }

    let credential_id_length = u16::from_be_bytes([
        authenticator_data[CREDENTIAL_ID_LENGTH_OFFSET],
        authenticator_data[CREDENTIAL_ID_LENGTH_OFFSET + 1],
    ]) as usize;
    let cose_key = authenticator_data
        .get(ATTESTED_CREDENTIAL_OFFSET + credential_id_length..)
        .ok_or(CredentialError::InvalidAuthenticatorData)?;

    let Value::Map(key) = decode_first(cose_key)? else {
        return Err(CredentialError::UnsupportedKeyType);
    };
    let label = |label: i128| key.get(&Value::Integer(label));

    let is_p256 = label(COSE_KTY) == Some(&Value::Integer(COSE_KTY_EC2))
        && label(COSE_ALG) == Some(&Value::Integer(COSE_ALG_ES256))
        && label(COSE_CRV) == Some(&Value::Integer(COSE_CRV_P256));
    if !is_p256 {
        return Err(CredentialError::UnsupportedKeyType);
    }

    let coordinate = |value: Option<&Value>| match value {
        Some(Value::Bytes(bytes)) if bytes.len() == 32 => Ok(bytes.clone()),
        _ => Err(CredentialError::InvalidCurvePoint),
    };
    let x = coordinate(label(COSE_X))?;
    let y = coordinate(label(COSE_Y))?;

    let mut point = [0u8; PUBLIC_KEY_LENGTH];
    point[0] = 0x04;
    point[1..33].copy_from_slice(&x);
    point[33..].copy_from_slice(&y);
    Ok(point)
}

/// Decode the first CBOR item of `bytes`, ignoring whatever follows it
/// (extensions after the COSE key).
fn decode_first(bytes: &[u8]) -> Result<Value, CredentialError> {
    serde_cbor::Deserializer::from_slice(bytes)
        .into_iter::<Value>()
        .next()
        .ok_or_else(|| CredentialError::Cbor("empty input".into()))?
        .map_err(|error| CredentialError::Cbor(error.to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn cose_key(entries: Vec<(i128, Value)>) -> Vec<u8> {
        let map: BTreeMap<Value, Value> = entries
            .into_iter()
            .map(|(label, value)| (Value::Integer(label), value))
            .collect();
        serde_cbor::to_vec(&Value::Map(map)).unwrap()
    }

    fn p256_cose_key() -> Vec<u8> {
        cose_key(vec![
            (COSE_KTY, Value::Integer(2)),
            (COSE_ALG, Value::Integer(-7)),
            (COSE_CRV, Value::Integer(1)),
            (COSE_X, Value::Bytes(vec![0x11; 32])),
            (COSE_Y, Value::Bytes(vec![0x22; 32])),
        ])
    }

    fn authenticator_data(flags: u8, credential_id: &[u8], key: &[u8]) -> Vec<u8> {
        let mut data = vec![0xaa; 32];
        data.push(flags);
        data.extend_from_slice(&[0, 0, 0, 1]);
        data.extend_from_slice(&[0; 16]);
        data.extend_from_slice(&(credential_id.len() as u16).to_be_bytes());
        data.extend_from_slice(credential_id);
        data.extend_from_slice(key);
        data
    }

    fn expected_point() -> [u8; 65] {
        let mut point = [0u8; 65];
        point[0] = 0x04;
        point[1..33].fill(0x11);
        point[33..].fill(0x22);
        point
    }

    #[test]
    fn it_trims_a_direct_public_key_to_its_last_65_bytes() {
        let mut spki = vec![0x30; 26];
        spki.extend_from_slice(&expected_point());
        let response = RegistrationResponse {
            public_key: Some(spki),
            ..Default::default()
        };
        assert_eq!(extract_public_key(&response).unwrap(), expected_point());
    }

    #[test]
    fn it_reads_the_key_from_authenticator_data() {
        let response = RegistrationResponse {
            authenticator_data: Some(authenticator_data(0x45, &[7; 16], &p256_cose_key())),
            ..Default::default()
        };
        assert_eq!(extract_public_key(&response).unwrap(), expected_point());
    }

    #[test]
    fn it_reads_the_key_from_an_attestation_object() {
        let mut attestation = BTreeMap::new();
        attestation.insert(Value::Text("fmt".into()), Value::Text("none".into()));
        attestation.insert(Value::Text("attStmt".into()), Value::Map(BTreeMap::new()));
        attestation.insert(
            Value::Text("authData".into()),
            Value::Bytes(authenticator_data(0x45, &[1, 2, 3], &p256_cose_key())),
        );
        let response = RegistrationResponse {
            attestation_object: Some(serde_cbor::to_vec(&Value::Map(attestation)).unwrap()),
            ..Default::default()
        };
        assert_eq!(extract_public_key(&response).unwrap(), expected_point());
    }

    #[test]
    fn it_ignores_extensions_after_the_key() {
        let mut key = p256_cose_key();
        key.extend_from_slice(&serde_cbor::to_vec(&Value::Text("ext".into())).unwrap());
        let data = authenticator_data(0xc5, &[9; 4], &key);
        assert_eq!(
            public_key_from_authenticator_data(&data).unwrap(),
            expected_point()
        );
    }

    #[test]
    fn it_rejects_short_authenticator_data() {
        assert_eq!(
            public_key_from_authenticator_data(&[0x45; 54]),
            Err(CredentialError::InvalidAuthenticatorData)
        );
    }

    #[test]
    fn it_requires_the_attested_credential_flag() {
        let data = authenticator_data(0x05, &[7; 16], &p256_cose_key());
        assert_eq!(
            public_key_from_authenticator_data(&data),
            Err(CredentialError::NoAttestedCredential)
        );
    }

    #[test]
    fn it_rejects_a_credential_id_length_past_the_end() {
        let mut data = authenticator_data(0x45, &[], &[]);
        data[53] = 0xff;
        assert_eq!(
            public_key_from_authenticator_data(&data),
            Err(CredentialError::InvalidAuthenticatorData)
        );
    }

    #[test]
    fn it_rejects_non_p256_keys() {
        let ed25519 = cose_key(vec![
            (COSE_KTY, Value::Integer(1)),
            (COSE_ALG, Value::Integer(-8)),
            (COSE_CRV, Value::Integer(6)),
            (COSE_X, Value::Bytes(vec![0x11; 32])),
        ]);
        let data = authenticator_data(0x45, &[7; 16], &ed25519);
        assert_eq!(
            public_key_from_authenticator_data(&data),
            Err(CredentialError::UnsupportedKeyType)
        );
    }

    #[test]
    fn it_rejects_short_coordinates() {
        let key = cose_key(vec![
            (COSE_KTY, Value::Integer(2)),
            (COSE_ALG, Value::Integer(-7)),
            (COSE_CRV, Value::Integer(1)),
            (COSE_X, Value::Bytes(vec![0x11; 31])),
            (COSE_Y, Value::Bytes(vec![0x22; 32])),
        ]);
        let data = authenticator_data(0x45, &[7; 16], &key);
        assert_eq!(
            public_key_from_authenticator_data(&data),
            Err(CredentialError::InvalidCurvePoint)
        );
    }

    #[test]
    fn it_requires_some_webauthn_data() {
        assert_eq!(
            extract_public_key(&RegistrationResponse::default()),
            Err(CredentialError::MissingWebAuthnData)
        );
    }
}
