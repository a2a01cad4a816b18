//! A passkey-authorized Soroban smart wallet.
//!
//! Each user account is a Soroban contract whose `__check_auth` accepts
//! WebAuthn signatures from one passkey. A fee account held by a wallet
//! backend (the co-signer) pays for and deploys these contracts, so the
//! passkey never needs a classic key.
//!
//! [`SmartWallet`] runs the use cases:
//! - [`SmartWallet::create_contract`] registers a passkey and deploys its
//!   contract
//! - [`SmartWallet::connect_contract`] recovers the contract address of an
//!   existing passkey
//! - [`SmartWallet::transfer`] moves tokens, signing authorization with the
//!   passkey or a classic key
//! - [`SmartWallet::sign_web_auth_challenge`] answers a SEP-45 challenge
//!
//! The building blocks are public as well: [`EntrySigner`] signs
//! authorization entries, [`assemble`] attaches simulation results, and
//! [`poll_transaction`] waits for an outcome. The network, the co-signer and
//! the WebAuthn authenticator are traits ([`SorobanRpc`], [`CoSigner`],
//! [`Authenticator`](sorokey_credentials::webauthn::Authenticator)) so each
//! can be replaced.

mod address;
mod assembler;
mod config;
mod cosigner;
mod error;
mod keypair;
mod poll;
mod rpc;
mod sep45;
mod signer;
mod wallet;

pub use address::{contract_id_preimage, contract_salt, derive_contract_address, derive_contract_id};
pub use assembler::assemble;
pub use config::*;
pub use cosigner::{CoSigner, HttpCoSigner};
pub use error::WalletError;
pub use keypair::{Keypair, verify_signature};
pub use poll::poll_transaction;
pub use rpc::*;
pub use sep45::{ChallengeResponse, HttpWebAuthServer, WebAuthChallenge, WebAuthServer};
pub use signer::{EntrySigner, PasskeyRole, SignerRole, authorization_payload};
pub use wallet::{ContractAccount, SmartWallet};
