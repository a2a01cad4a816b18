//! Hash preimages for contract ids and authorization payloads.

use sha2::{Digest, Sha256};

use crate::XdrError;
use crate::auth::{ContractIdPreimage, SorobanAuthorizedInvocation};
use crate::codec::{Xdr, XdrReader, XdrWriter, invalid};
use crate::scval::Hash;

const ENVELOPE_TYPE_CONTRACT_ID: i32 = 8;
const ENVELOPE_TYPE_SOROBAN_AUTHORIZATION: i32 = 9;

/// The network id: SHA-256 of the network passphrase.
pub fn network_id(passphrase: &str) -> Hash {
    Sha256::digest(passphrase.as_bytes()).into()
}

/// Structures whose SHA-256 identifies a contract or authorizes an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashIdPreimage {
    /// Hashes to the id of a contract created from `contract_id_preimage`.
    ContractId {
        network_id: Hash,
        contract_id_preimage: ContractIdPreimage,
    },
    /// Hashes to the payload an address signs to authorize `invocation`.
    SorobanAuthorization {
        network_id: Hash,
        nonce: i64,
        signature_expiration_ledger: u32,
        invocation: SorobanAuthorizedInvocation,
    },
}

impl HashIdPreimage {
    pub fn hash(&self) -> Result<Hash, XdrError> {
        Ok(Sha256::digest(self.to_xdr()?).into())
    }
}

impl Xdr for HashIdPreimage {
    fn read_xdr(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        match reader.read_i32()? {
            ENVELOPE_TYPE_CONTRACT_ID => Ok(HashIdPreimage::ContractId {
                network_id: reader.read_fixed()?,
                contract_id_preimage: ContractIdPreimage::read_xdr(reader)?,
            }),
            ENVELOPE_TYPE_SOROBAN_AUTHORIZATION => Ok(HashIdPreimage::SorobanAuthorization {
                network_id: reader.read_fixed()?,
                nonce: reader.read_i64()?,
                signature_expiration_ledger: reader.read_u32()?,
                invocation: SorobanAuthorizedInvocation::read_xdr(reader)?,
            }),
            other => Err(invalid("EnvelopeType", other)),
        }
    }

    fn write_xdr(&self, writer: &mut XdrWriter) -> Result<(), XdrError> {
        match self {
            HashIdPreimage::ContractId {
                network_id,
                contract_id_preimage,
            } => {
                writer.write_i32(ENVELOPE_TYPE_CONTRACT_ID);
                writer.write_fixed(network_id);
                contract_id_preimage.write_xdr(writer)
            }
            HashIdPreimage::SorobanAuthorization {
                network_id,
                nonce,
                signature_expiration_ledger,
                invocation,
            } => {
                writer.write_i32(ENVELOPE_TYPE_SOROBAN_AUTHORIZATION);
                writer.write_fixed(network_id);
                writer.write_i64(*nonce);
                writer.write_u32(*signature_expiration_ledger);
                invocation.write_xdr(writer)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_derives_the_testnet_network_id() {
        assert_eq!(
            hex::encode(network_id("Test SDF Network ; September 2015")),
            "cee0302d59844d32bdca915c8203dd44b33fbb7edc19051ea37abedf28ecd472"
        );
    }

    #[test]
    fn it_prefixes_the_envelope_type() {
        let preimage = HashIdPreimage::ContractId {
            network_id: [0u8; 32],
            contract_id_preimage: ContractIdPreimage::FromAsset(crate::ledger::Asset::Native),
        };
        let bytes = preimage.to_xdr().unwrap();
        assert_eq!(&bytes[..4], &[0, 0, 0, 8]);
        assert_eq!(bytes.len(), 4 + 32 + 4 + 4);
        assert_eq!(HashIdPreimage::from_xdr(&bytes).unwrap(), preimage);
    }
}
