//! Error types for passkey operations.

use thiserror::Error;

/// Errors from extracting a public key out of a registration response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// The response carried neither a public key, authenticator data nor an
    /// attestation object.
    #[error("no WebAuthn public key data in registration response")]
    MissingWebAuthnData,

    /// The attestation object or COSE key could not be decoded as CBOR.
    #[error("invalid CBOR: {0}")]
    Cbor(String),

    /// The authenticator data is shorter than 55 bytes or its credential id
    /// length runs past the end.
    #[error("invalid authenticator data")]
    InvalidAuthenticatorData,

    /// The attested credential data flag (bit 6) is not set.
    #[error("authenticator data has no attested credential")]
    NoAttestedCredential,

    /// The credential key is not an EC2 / ES256 / P-256 key.
    #[error("unsupported key type")]
    UnsupportedKeyType,

    /// A coordinate is missing or not 32 bytes.
    #[error("invalid elliptic curve coordinates")]
    InvalidCurvePoint,
}

/// Errors from converting a DER signature to compact form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// The input is not a DER `SEQUENCE { INTEGER r, INTEGER s }`.
    #[error("malformed DER signature: {0}")]
    MalformedDer(&'static str),

    /// `s` is not a scalar of the P-256 group (it is not below the order).
    #[error("signature scalar out of range")]
    ScalarOutOfRange,
}

/// A WebAuthn ceremony did not produce a result.
///
/// Ceremony failures are never retried automatically: the user either
/// dismissed the prompt or the platform cannot run it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CeremonyError {
    /// The WebAuthn API is not available in this environment.
    #[error("WebAuthn API not available: {0}")]
    NotAvailable(String),

    /// The user or the authenticator declined the request.
    #[error("ceremony declined: {0}")]
    Declined(String),

    /// Credential registration failed.
    #[error("registration failed: {0}")]
    RegistrationFailed(String),

    /// Assertion failed.
    #[error("assertion failed: {0}")]
    AssertionFailed(String),

    /// A JavaScript interop error occurred.
    #[error("JS error: {0}")]
    JsError(String),
}

/// Errors from verifying a passkey assertion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasskeyVerifyError {
    /// The public key is not a valid P-256 point.
    #[error("invalid public key")]
    InvalidPublicKey,

    /// The ECDSA signature is malformed, high-S, or does not verify.
    #[error("invalid ECDSA signature: {0}")]
    InvalidSignature(String),

    /// The `clientDataJSON` could not be parsed as JSON.
    #[error("invalid clientDataJSON: {0}")]
    InvalidClientData(String),

    /// The `clientDataJSON` type is not `webauthn.get`.
    #[error("unexpected client data type {0:?}")]
    UnexpectedType(String),

    /// The challenge in `clientDataJSON` does not match the payload.
    #[error("challenge mismatch")]
    ChallengeMismatch,

    /// The authenticator data is too short.
    #[error("invalid authenticator data")]
    InvalidAuthenticatorData,

    /// The user-present flag is not set.
    #[error("user not present")]
    UserNotPresent,

    /// The user-verified flag is not set.
    #[error("user not verified")]
    UserNotVerified,
}
