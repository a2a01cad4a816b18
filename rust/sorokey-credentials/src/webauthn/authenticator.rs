//! The WebAuthn ceremony boundary.
//!
//! Passkey ceremonies happen outside this crate: in a browser through
//! `navigator.credentials`, or in tests through a software key. Callers
//! receive an [`Authenticator`] and never learn which.

use async_trait::async_trait;

use super::credential::RegistrationResponse;
use super::error::CeremonyError;
use crate::ConditionalSync;

/// Relying-party and user details for registering a new passkey.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationOptions {
    /// The relying party identifier (typically the domain, e.g. `"example.com"`).
    pub rp_id: String,
    /// A human-readable relying party name.
    pub rp_name: String,
    /// An opaque user identifier (unique per user on this RP).
    pub user_id: Vec<u8>,
    pub user_name: String,
    pub user_display_name: String,
}

impl RegistrationOptions {
    /// Options for a passkey named by the user, as the wallet registers them:
    /// the name is both the user id and the display name.
    pub fn named(rp_id: impl Into<String>, rp_name: impl Into<String>, name: &str) -> Self {
        Self {
            rp_id: rp_id.into(),
            rp_name: rp_name.into(),
            user_id: name.as_bytes().to_vec(),
            user_name: name.to_string(),
            user_display_name: name.to_string(),
        }
    }
}

/// A request to sign `challenge` with a passkey.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionRequest {
    /// Raw challenge bytes; the authenticator embeds them base64url-encoded
    /// in `clientDataJSON`.
    pub challenge: Vec<u8>,
    pub rp_id: String,
    /// Credential ids the user may choose from. Empty lets the platform
    /// offer any discoverable credential for the relying party.
    pub allow_credentials: Vec<Vec<u8>>,
}

/// The output of an assertion ceremony.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionResult {
    pub credential_id: Vec<u8>,
    /// DER-encoded ECDSA signature over
    /// `authenticatorData || SHA-256(clientDataJSON)`.
    pub signature: Vec<u8>,
    pub authenticator_data: Vec<u8>,
    pub client_data_json: Vec<u8>,
}

/// Something that can run WebAuthn registration and assertion ceremonies.
///
/// Either call may suspend indefinitely while the user interacts with the
/// device, and either may fail with a [`CeremonyError`] if the user dismisses
/// the prompt.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait Authenticator: ConditionalSync {
    /// Create a new passkey credential.
    async fn register(
        &self,
        options: &RegistrationOptions,
    ) -> Result<RegistrationResponse, CeremonyError>;

    /// Sign a challenge with an existing passkey.
    async fn assert(&self, request: &AssertionRequest) -> Result<AssertionResult, CeremonyError>;
}
