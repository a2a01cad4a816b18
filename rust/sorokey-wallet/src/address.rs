//! Deterministic addresses of passkey contracts.
//!
//! A passkey contract is deployed by the fee account with the salt
//! `SHA-256(credential_id)`, so its address follows from the network, the
//! deployer and the credential alone.

use sha2::{Digest, Sha256};
use sorokey_xdr::{
    AccountId, ContractIdPreimage, Hash, HashIdPreimage, ScAddress, StrKey, network_id,
};

use crate::WalletError;

/// The deployment salt for a credential.
pub fn contract_salt(credential_id: &[u8]) -> [u8; 32] {
    Sha256::digest(credential_id).into()
}

/// The contract id preimage used both to deploy and to derive the address.
pub fn contract_id_preimage(deployer: &AccountId, credential_id: &[u8]) -> ContractIdPreimage {
    ContractIdPreimage::FromAddress {
        address: ScAddress::Account(deployer.0),
        salt: contract_salt(credential_id),
    }
}

/// The raw contract id of the passkey contract `deployer` creates for
/// `credential_id`.
pub fn derive_contract_id(
    network_passphrase: &str,
    deployer: &AccountId,
    credential_id: &[u8],
) -> Result<Hash, WalletError> {
    Ok(HashIdPreimage::ContractId {
        network_id: network_id(network_passphrase),
        contract_id_preimage: contract_id_preimage(deployer, credential_id),
    }
    .hash()?)
}

/// The `C…` address of the passkey contract the `G…` account `deployer`
/// creates for `credential_id`.
pub fn derive_contract_address(
    network_passphrase: &str,
    deployer: &str,
    credential_id: &[u8],
) -> Result<String, WalletError> {
    let deployer = AccountId::from_strkey(deployer)?;
    let id = derive_contract_id(network_passphrase, &deployer, credential_id)?;
    Ok(StrKey::Contract(id).to_string())
}
