//! WebAuthn passkeys as Soroban account signers.
//!
//! A passkey signs with ECDSA P-256. Registration yields its public key,
//! which the smart account stores at deployment; every later authorization
//! is an assertion whose DER signature must be converted to the compact,
//! low-S form the Soroban host accepts.
//!
//! The ceremonies themselves sit behind the [`Authenticator`] trait. On
//! `wasm32-unknown-unknown` the [`BrowserAuthenticator`] drives
//! `navigator.credentials`; tests use the `SoftwareAuthenticator` from the
//! `helpers` feature.

mod authenticator;
mod credential;
mod error;
mod signature;
mod verifier;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
mod browser;

#[cfg(any(test, feature = "helpers"))]
mod software;

pub use authenticator::{AssertionRequest, AssertionResult, Authenticator, RegistrationOptions};
pub use credential::{
    PUBLIC_KEY_LENGTH, PasskeyCredential, RegistrationResponse, extract_public_key,
    public_key_from_authenticator_data,
};
pub use error::{CeremonyError, CredentialError, PasskeyVerifyError, SignatureError};
pub use signature::{CompactSignature, canonicalize};
pub use verifier::PasskeyVerifier;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub use browser::BrowserAuthenticator;

#[cfg(any(test, feature = "helpers"))]
pub use software::SoftwareAuthenticator;
