//! Ledger keys, assets and Soroban resource declarations.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::codec::{UNBOUNDED, Xdr, XdrReader, XdrWriter, invalid, read_discriminant};
use crate::scval::{Hash, ScAddress, ScVal};
use crate::strkey::{StrKey, StrKeyError, StrKeyKind};
use crate::XdrError;

/// An Ed25519 account id (`PublicKey` in the schema).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    /// Parse a `G…` address.
    pub fn from_strkey(address: &str) -> Result<Self, StrKeyError> {
        StrKey::decode_as(StrKeyKind::Account, address).map(AccountId)
    }

    pub fn to_strkey(&self) -> String {
        StrKey::Account(self.0).to_string()
    }
}

impl Xdr for AccountId {
    fn read_xdr(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        read_discriminant(reader, "PublicKeyType", |value| (value == 0).then_some(()))?;
        Ok(AccountId(reader.read_fixed()?))
    }

    fn write_xdr(&self, writer: &mut XdrWriter) -> Result<(), XdrError> {
        writer.write_i32(0);
        writer.write_fixed(&self.0);
        Ok(())
    }
}

/// A classic Stellar asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asset {
    Native,
    CreditAlphanum4 { code: [u8; 4], issuer: AccountId },
    CreditAlphanum12 { code: [u8; 12], issuer: AccountId },
}

impl Xdr for Asset {
    fn read_xdr(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        match reader.read_i32()? {
            0 => Ok(Asset::Native),
            1 => Ok(Asset::CreditAlphanum4 {
                code: reader.read_fixed()?,
                issuer: AccountId::read_xdr(reader)?,
            }),
            2 => Ok(Asset::CreditAlphanum12 {
                code: reader.read_fixed()?,
                issuer: AccountId::read_xdr(reader)?,
            }),
            other => Err(invalid("AssetType", other)),
        }
    }

    fn write_xdr(&self, writer: &mut XdrWriter) -> Result<(), XdrError> {
        match self {
            Asset::Native => writer.write_i32(0),
            Asset::CreditAlphanum4 { code, issuer } => {
                writer.write_i32(1);
                writer.write_fixed(code);
                issuer.write_xdr(writer)?;
            }
            Asset::CreditAlphanum12 { code, issuer } => {
                writer.write_i32(2);
                writer.write_fixed(code);
                issuer.write_xdr(writer)?;
            }
        }
        Ok(())
    }
}

/// Lifetime class of a contract data entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractDataDurability {
    Temporary,
    Persistent,
}

/// Identifies a single ledger entry.
///
/// Only the kinds a Soroban footprint can hold are modelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerKey {
    Account {
        account_id: AccountId,
    },
    Trustline {
        account_id: AccountId,
        asset: Asset,
    },
    ContractData {
        contract: ScAddress,
        key: ScVal,
        durability: ContractDataDurability,
    },
    ContractCode {
        hash: Hash,
    },
}

impl Xdr for LedgerKey {
    fn read_xdr(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        Ok(match reader.read_i32()? {
            0 => LedgerKey::Account {
                account_id: AccountId::read_xdr(reader)?,
            },
            1 => LedgerKey::Trustline {
                account_id: AccountId::read_xdr(reader)?,
                asset: Asset::read_xdr(reader)?,
            },
            6 => LedgerKey::ContractData {
                contract: ScAddress::read_xdr(reader)?,
                key: ScVal::read_xdr(reader)?,
                durability: read_discriminant(reader, "ContractDataDurability", |value| {
                    match value {
                        0 => Some(ContractDataDurability::Temporary),
                        1 => Some(ContractDataDurability::Persistent),
                        _ => None,
                    }
                })?,
            },
            7 => LedgerKey::ContractCode {
                hash: reader.read_fixed()?,
            },
            other => return Err(invalid("LedgerEntryType", other)),
        })
    }

    fn write_xdr(&self, writer: &mut XdrWriter) -> Result<(), XdrError> {
        match self {
            LedgerKey::Account { account_id } => {
                writer.write_i32(0);
                account_id.write_xdr(writer)?;
            }
            LedgerKey::Trustline { account_id, asset } => {
                writer.write_i32(1);
                account_id.write_xdr(writer)?;
                asset.write_xdr(writer)?;
            }
            LedgerKey::ContractData {
                contract,
                key,
                durability,
            } => {
                writer.write_i32(6);
                contract.write_xdr(writer)?;
                key.write_xdr(writer)?;
                writer.write_i32(match durability {
                    ContractDataDurability::Temporary => 0,
                    ContractDataDurability::Persistent => 1,
                });
            }
            LedgerKey::ContractCode { hash } => {
                writer.write_i32(7);
                writer.write_fixed(hash);
            }
        }
        Ok(())
    }
}

/// The ledger entries a Soroban transaction may touch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LedgerFootprint {
    pub read_only: Vec<LedgerKey>,
    pub read_write: Vec<LedgerKey>,
}

impl Xdr for LedgerFootprint {
    fn read_xdr(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        Ok(LedgerFootprint {
            read_only: reader.read_array(UNBOUNDED)?,
            read_write: reader.read_array(UNBOUNDED)?,
        })
    }

    fn write_xdr(&self, writer: &mut XdrWriter) -> Result<(), XdrError> {
        writer.write_array(&self.read_only, UNBOUNDED)?;
        writer.write_array(&self.read_write, UNBOUNDED)
    }
}

/// Declared resource limits of a Soroban transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SorobanResources {
    pub footprint: LedgerFootprint,
    pub instructions: u32,
    pub disk_read_bytes: u32,
    pub write_bytes: u32,
}

/// Resources and fee attached to a transaction by simulation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SorobanTransactionData {
    /// Indices of archived entries to restore automatically, when present.
    pub archived_entries: Option<Vec<u32>>,
    pub resources: SorobanResources,
    pub resource_fee: i64,
}

impl Xdr for SorobanTransactionData {
    fn read_xdr(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        let archived_entries = match reader.read_i32()? {
            0 => None,
            1 => Some(reader.read_array(UNBOUNDED)?),
            other => return Err(invalid("SorobanTransactionDataExt", other)),
        };
        Ok(SorobanTransactionData {
            archived_entries,
            resources: SorobanResources {
                footprint: LedgerFootprint::read_xdr(reader)?,
                instructions: reader.read_u32()?,
                disk_read_bytes: reader.read_u32()?,
                write_bytes: reader.read_u32()?,
            },
            resource_fee: reader.read_i64()?,
        })
    }

    fn write_xdr(&self, writer: &mut XdrWriter) -> Result<(), XdrError> {
        match &self.archived_entries {
            None => writer.write_i32(0),
            Some(entries) => {
                writer.write_i32(1);
                writer.write_array(entries, UNBOUNDED)?;
            }
        }
        self.resources.footprint.write_xdr(writer)?;
        writer.write_u32(self.resources.instructions);
        writer.write_u32(self.resources.disk_read_bytes);
        writer.write_u32(self.resources.write_bytes);
        writer.write_i64(self.resource_fee);
        Ok(())
    }
}

/// The leading fields of an account ledger entry.
///
/// Only the fields needed to build a transaction are read; the rest of the
/// entry is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountSummary {
    pub account_id: AccountId,
    pub balance: i64,
    pub sequence: i64,
}

impl AccountSummary {
    /// Read from a base64 `LedgerEntryData` as returned by `getLedgerEntries`.
    pub fn from_ledger_entry_data(encoded: &str) -> Result<Self, XdrError> {
        let bytes = STANDARD.decode(encoded.trim())?;
        let mut reader = XdrReader::new(&bytes);
        read_discriminant(&mut reader, "LedgerEntryType", |value| {
            (value == 0).then_some(())
        })?;
        Ok(AccountSummary {
            account_id: AccountId::read_xdr(&mut reader)?,
            balance: reader.read_i64()?,
            sequence: reader.read_i64()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_reads_the_sequence_number_from_an_account_entry() {
        let mut writer = XdrWriter::new();
        writer.write_i32(0);
        AccountId([3u8; 32]).write_xdr(&mut writer).unwrap();
        writer.write_i64(10_000_000);
        writer.write_i64(4_294_967_297);
        // Remaining AccountEntry fields are not read.
        writer.write_u32(0);
        let encoded = STANDARD.encode(writer.finish());

        let summary = AccountSummary::from_ledger_entry_data(&encoded).unwrap();
        assert_eq!(summary.account_id, AccountId([3u8; 32]));
        assert_eq!(summary.sequence, 4_294_967_297);
    }

    #[test]
    fn it_rejects_non_account_entries() {
        let encoded = STANDARD.encode([0, 0, 0, 6]);
        assert!(matches!(
            AccountSummary::from_ledger_entry_data(&encoded),
            Err(XdrError::InvalidDiscriminant { .. })
        ));
    }

    #[test]
    fn it_rejects_ledger_keys_outside_a_soroban_footprint() {
        // LEDGER_ENTRY_TYPE_OFFER
        let bytes = [0, 0, 0, 2];
        assert!(matches!(
            LedgerKey::from_xdr(&bytes),
            Err(XdrError::InvalidDiscriminant { .. })
        ));
    }

    #[test]
    fn it_round_trips_a_contract_data_footprint() {
        let data = SorobanTransactionData {
            archived_entries: Some(vec![1]),
            resources: SorobanResources {
                footprint: LedgerFootprint {
                    read_only: vec![LedgerKey::ContractCode { hash: [1u8; 32] }],
                    read_write: vec![LedgerKey::ContractData {
                        contract: ScAddress::Contract([2u8; 32]),
                        key: ScVal::LedgerKeyNonce(42),
                        durability: ContractDataDurability::Temporary,
                    }],
                },
                instructions: 1_000_000,
                disk_read_bytes: 2048,
                write_bytes: 512,
            },
            resource_fee: 1500,
        };
        let encoded = data.to_xdr_base64().unwrap();
        assert_eq!(
            SorobanTransactionData::from_xdr_base64(&encoded).unwrap(),
            data
        );
    }
}
