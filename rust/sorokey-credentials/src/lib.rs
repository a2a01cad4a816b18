//! Passkey credentials for Soroban smart accounts.
//!
//! See [`webauthn`] for public-key extraction, signature canonicalization
//! and the ceremony boundary.

pub mod webauthn;

mod sync;
pub use sync::*;
