//! Typed Stellar XDR for passkey-authorized Soroban accounts.
//!
//! This crate covers the slice of the Stellar wire format a smart wallet
//! touches: contract values, authorization entries and their signing
//! preimages, Soroban transactions and envelopes, ledger keys, and StrKey
//! address strings. Every type implements [`Xdr`], whose decoder is strict
//! enough that `encode(decode(bytes)) == bytes` for any accepted input.
//!
//! [`AuthorizationEntries`] is the transport codec for lists of
//! authorization entries exchanged as base64.

mod auth;
mod codec;
mod error;
mod ledger;
mod preimage;
mod scval;
mod strkey;
mod transaction;

pub use auth::*;
pub use codec::{MAX_DEPTH, UNBOUNDED, Xdr, XdrReader, XdrWriter};
pub use error::*;
pub use ledger::*;
pub use preimage::*;
pub use scval::*;
pub use strkey::*;
pub use transaction::*;
