//! Soroban contract values (`SCVal`) and addresses.

use std::fmt;
use std::str::FromStr;

use crate::codec::{UNBOUNDED, Xdr, XdrReader, XdrWriter, invalid, read_discriminant};
use crate::strkey::{StrKey, StrKeyError};
use crate::XdrError;

/// Maximum length of a contract symbol.
pub const SYMBOL_MAX: u32 = 32;

/// A 32-byte SHA-256 digest.
pub type Hash = [u8; 32];

/// An address that can authorize invocations: an account, a contract, or a
/// multiplexed account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScAddress {
    /// An Ed25519 account.
    Account([u8; 32]),
    /// A contract, by id.
    Contract(Hash),
    /// A multiplexed account.
    MuxedAccount {
        /// Multiplexing id.
        id: u64,
        /// Underlying Ed25519 key.
        ed25519: [u8; 32],
    },
}

impl ScAddress {
    /// The contract id if this is a contract address.
    pub fn contract_id(&self) -> Option<&Hash> {
        match self {
            ScAddress::Contract(id) => Some(id),
            _ => None,
        }
    }

    fn to_strkey(&self) -> StrKey {
        match self {
            ScAddress::Account(key) => StrKey::Account(*key),
            ScAddress::Contract(id) => StrKey::Contract(*id),
            ScAddress::MuxedAccount { id, ed25519 } => StrKey::Muxed {
                ed25519: *ed25519,
                id: *id,
            },
        }
    }
}

impl fmt::Display for ScAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_strkey().fmt(f)
    }
}

impl FromStr for ScAddress {
    type Err = StrKeyError;

    fn from_str(encoded: &str) -> Result<Self, Self::Err> {
        Ok(match encoded.parse::<StrKey>()? {
            StrKey::Account(key) => ScAddress::Account(key),
            StrKey::Contract(id) => ScAddress::Contract(id),
            StrKey::Muxed { ed25519, id } => ScAddress::MuxedAccount { id, ed25519 },
            StrKey::Seed(_) => return Err(StrKeyError::UnknownVersion(18 << 3)),
        })
    }
}

impl Xdr for ScAddress {
    fn read_xdr(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        match reader.read_i32()? {
            0 => {
                // PublicKey union; only Ed25519 (0) exists.
                read_discriminant(reader, "PublicKeyType", |value| (value == 0).then_some(()))?;
                Ok(ScAddress::Account(reader.read_fixed()?))
            }
            1 => Ok(ScAddress::Contract(reader.read_fixed()?)),
            2 => Ok(ScAddress::MuxedAccount {
                id: reader.read_u64()?,
                ed25519: reader.read_fixed()?,
            }),
            other => Err(invalid("ScAddressType", other)),
        }
    }

    fn write_xdr(&self, writer: &mut XdrWriter) -> Result<(), XdrError> {
        match self {
            ScAddress::Account(key) => {
                writer.write_i32(0);
                writer.write_i32(0);
                writer.write_fixed(key);
            }
            ScAddress::Contract(id) => {
                writer.write_i32(1);
                writer.write_fixed(id);
            }
            ScAddress::MuxedAccount { id, ed25519 } => {
                writer.write_i32(2);
                writer.write_u64(*id);
                writer.write_fixed(ed25519);
            }
        }
        Ok(())
    }
}

/// A contract or host error value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScError {
    /// A contract-defined error code.
    Contract(u32),
    /// A host error: `kind` is the `SCErrorType` (1..=9) and `code` the
    /// `SCErrorCode` (0..=9).
    Host { kind: i32, code: i32 },
}

impl Xdr for ScError {
    fn read_xdr(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        match reader.read_i32()? {
            0 => Ok(ScError::Contract(reader.read_u32()?)),
            kind @ 1..=9 => {
                let code = read_discriminant(reader, "SCErrorCode", |value| {
                    (0..=9).contains(&value).then_some(value)
                })?;
                Ok(ScError::Host { kind, code })
            }
            other => Err(invalid("SCErrorType", other)),
        }
    }

    fn write_xdr(&self, writer: &mut XdrWriter) -> Result<(), XdrError> {
        match self {
            ScError::Contract(code) => {
                writer.write_i32(0);
                writer.write_u32(*code);
            }
            ScError::Host { kind, code } => {
                if !(1..=9).contains(kind) {
                    return Err(invalid("SCErrorType", *kind));
                }
                if !(0..=9).contains(code) {
                    return Err(invalid("SCErrorCode", *code));
                }
                writer.write_i32(*kind);
                writer.write_i32(*code);
            }
        }
        Ok(())
    }
}

/// A 256-bit unsigned integer as four big-endian limbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UInt256Parts {
    pub hi_hi: u64,
    pub hi_lo: u64,
    pub lo_hi: u64,
    pub lo_lo: u64,
}

/// A 256-bit signed integer as four big-endian limbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Int256Parts {
    pub hi_hi: i64,
    pub hi_lo: u64,
    pub lo_hi: u64,
    pub lo_lo: u64,
}

/// What a contract instance executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractExecutable {
    /// Uploaded WASM, by hash.
    Wasm(Hash),
    /// The built-in Stellar Asset Contract.
    StellarAsset,
}

impl Xdr for ContractExecutable {
    fn read_xdr(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        match reader.read_i32()? {
            0 => Ok(ContractExecutable::Wasm(reader.read_fixed()?)),
            1 => Ok(ContractExecutable::StellarAsset),
            other => Err(invalid("ContractExecutableType", other)),
        }
    }

    fn write_xdr(&self, writer: &mut XdrWriter) -> Result<(), XdrError> {
        match self {
            ContractExecutable::Wasm(hash) => {
                writer.write_i32(0);
                writer.write_fixed(hash);
            }
            ContractExecutable::StellarAsset => writer.write_i32(1),
        }
        Ok(())
    }
}

/// One key/value pair of an [`ScVal::Map`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScMapEntry {
    pub key: ScVal,
    pub val: ScVal,
}

impl Xdr for ScMapEntry {
    fn read_xdr(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        Ok(ScMapEntry {
            key: ScVal::read_xdr(reader)?,
            val: ScVal::read_xdr(reader)?,
        })
    }

    fn write_xdr(&self, writer: &mut XdrWriter) -> Result<(), XdrError> {
        self.key.write_xdr(writer)?;
        self.val.write_xdr(writer)
    }
}

/// The stored form of a contract instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScContractInstance {
    pub executable: ContractExecutable,
    pub storage: Option<Vec<ScMapEntry>>,
}

/// A Soroban contract value.
///
/// Variants follow the `SCValType` discriminants 0 through 21 in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScVal {
    Bool(bool),
    Void,
    Error(ScError),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    Timepoint(u64),
    Duration(u64),
    U128(u128),
    I128(i128),
    U256(UInt256Parts),
    I256(Int256Parts),
    Bytes(Vec<u8>),
    String(String),
    /// A symbol of at most 32 characters from `[a-zA-Z0-9_]`.
    Symbol(String),
    Vec(Option<Vec<ScVal>>),
    Map(Option<Vec<ScMapEntry>>),
    Address(ScAddress),
    ContractInstance(ScContractInstance),
    LedgerKeyContractInstance,
    LedgerKeyNonce(i64),
}

impl ScVal {
    /// Build a symbol, validating its length and alphabet.
    pub fn symbol(name: &str) -> Result<Self, XdrError> {
        validate_symbol(name)?;
        Ok(ScVal::Symbol(name.to_string()))
    }

    /// Build a map keyed by symbols, sorted by key as the host requires.
    pub fn symbol_map<I, K>(entries: I) -> Result<Self, XdrError>
    where
        I: IntoIterator<Item = (K, ScVal)>,
        K: AsRef<str>,
    {
        let mut entries = entries
            .into_iter()
            .map(|(key, val)| {
                validate_symbol(key.as_ref())?;
                Ok((key.as_ref().to_string(), val))
            })
            .collect::<Result<Vec<_>, XdrError>>()?;
        entries.sort_by(|(left, _), (right, _)| left.cmp(right));
        Ok(ScVal::Map(Some(
            entries
                .into_iter()
                .map(|(key, val)| ScMapEntry {
                    key: ScVal::Symbol(key),
                    val,
                })
                .collect(),
        )))
    }

    /// Look up a symbol key in a map value.
    pub fn map_get(&self, key: &str) -> Option<&ScVal> {
        match self {
            ScVal::Map(Some(entries)) => entries
                .iter()
                .find(|entry| matches!(&entry.key, ScVal::Symbol(symbol) if symbol == key))
                .map(|entry| &entry.val),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<&ScAddress> {
        match self {
            ScVal::Address(address) => Some(address),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ScVal::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_vec(&self) -> Option<&[ScVal]> {
        match self {
            ScVal::Vec(Some(items)) => Some(items),
            _ => None,
        }
    }

    fn read_body(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        Ok(match reader.read_i32()? {
            0 => ScVal::Bool(reader.read_bool()?),
            1 => ScVal::Void,
            2 => ScVal::Error(ScError::read_xdr(reader)?),
            3 => ScVal::U32(reader.read_u32()?),
            4 => ScVal::I32(reader.read_i32()?),
            5 => ScVal::U64(reader.read_u64()?),
            6 => ScVal::I64(reader.read_i64()?),
            7 => ScVal::Timepoint(reader.read_u64()?),
            8 => ScVal::Duration(reader.read_u64()?),
            9 => {
                let hi = reader.read_u64()? as u128;
                let lo = reader.read_u64()? as u128;
                ScVal::U128((hi << 64) | lo)
            }
            10 => {
                let hi = reader.read_i64()? as i128;
                let lo = reader.read_u64()? as i128;
                ScVal::I128((hi << 64) | lo)
            }
            11 => ScVal::U256(UInt256Parts {
                hi_hi: reader.read_u64()?,
                hi_lo: reader.read_u64()?,
                lo_hi: reader.read_u64()?,
                lo_lo: reader.read_u64()?,
            }),
            12 => ScVal::I256(Int256Parts {
                hi_hi: reader.read_i64()?,
                hi_lo: reader.read_u64()?,
                lo_hi: reader.read_u64()?,
                lo_lo: reader.read_u64()?,
            }),
            13 => ScVal::Bytes(reader.read_opaque(UNBOUNDED)?),
            14 => ScVal::String(reader.read_string(UNBOUNDED)?),
            15 => {
                let symbol = reader.read_string(SYMBOL_MAX)?;
                validate_symbol(&symbol)?;
                ScVal::Symbol(symbol)
            }
            16 => ScVal::Vec(if reader.read_bool()? {
                Some(reader.read_array(UNBOUNDED)?)
            } else {
                None
            }),
            17 => ScVal::Map(if reader.read_bool()? {
                Some(reader.read_array(UNBOUNDED)?)
            } else {
                None
            }),
            18 => ScVal::Address(ScAddress::read_xdr(reader)?),
            19 => {
                let executable = ContractExecutable::read_xdr(reader)?;
                let storage = if reader.read_bool()? {
                    Some(reader.read_array(UNBOUNDED)?)
                } else {
                    None
                };
                ScVal::ContractInstance(ScContractInstance {
                    executable,
                    storage,
                })
            }
            20 => ScVal::LedgerKeyContractInstance,
            21 => ScVal::LedgerKeyNonce(reader.read_i64()?),
            other => return Err(invalid("SCValType", other)),
        })
    }
}

pub(crate) fn validate_symbol(symbol: &str) -> Result<(), XdrError> {
    let valid = symbol.len() <= SYMBOL_MAX as usize
        && symbol
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || byte == b'_');
    if valid {
        Ok(())
    } else {
        Err(XdrError::InvalidSymbol(symbol.to_string()))
    }
}

fn write_optional_array<T: Xdr>(
    writer: &mut XdrWriter,
    items: &Option<Vec<T>>,
) -> Result<(), XdrError> {
    match items {
        Some(items) => {
            writer.write_bool(true);
            writer.write_array(items, UNBOUNDED)
        }
        None => {
            writer.write_bool(false);
            Ok(())
        }
    }
}

impl Xdr for ScVal {
    fn read_xdr(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        reader.nested(ScVal::read_body)
    }

    fn write_xdr(&self, writer: &mut XdrWriter) -> Result<(), XdrError> {
        match self {
            ScVal::Bool(value) => {
                writer.write_i32(0);
                writer.write_bool(*value);
            }
            ScVal::Void => writer.write_i32(1),
            ScVal::Error(error) => {
                writer.write_i32(2);
                error.write_xdr(writer)?;
            }
            ScVal::U32(value) => {
                writer.write_i32(3);
                writer.write_u32(*value);
            }
            ScVal::I32(value) => {
                writer.write_i32(4);
                writer.write_i32(*value);
            }
            ScVal::U64(value) => {
                writer.write_i32(5);
                writer.write_u64(*value);
            }
            ScVal::I64(value) => {
                writer.write_i32(6);
                writer.write_i64(*value);
            }
            ScVal::Timepoint(value) => {
                writer.write_i32(7);
                writer.write_u64(*value);
            }
            ScVal::Duration(value) => {
                writer.write_i32(8);
                writer.write_u64(*value);
            }
            ScVal::U128(value) => {
                writer.write_i32(9);
                writer.write_u64((*value >> 64) as u64);
                writer.write_u64(*value as u64);
            }
            ScVal::I128(value) => {
                writer.write_i32(10);
                writer.write_i64((*value >> 64) as i64);
                writer.write_u64(*value as u64);
            }
            ScVal::U256(parts) => {
                writer.write_i32(11);
                writer.write_u64(parts.hi_hi);
                writer.write_u64(parts.hi_lo);
                writer.write_u64(parts.lo_hi);
                writer.write_u64(parts.lo_lo);
            }
            ScVal::I256(parts) => {
                writer.write_i32(12);
                writer.write_i64(parts.hi_hi);
                writer.write_u64(parts.hi_lo);
                writer.write_u64(parts.lo_hi);
                writer.write_u64(parts.lo_lo);
            }
            ScVal::Bytes(bytes) => {
                writer.write_i32(13);
                writer.write_opaque(bytes, UNBOUNDED)?;
            }
            ScVal::String(value) => {
                writer.write_i32(14);
                writer.write_string(value, UNBOUNDED)?;
            }
            ScVal::Symbol(symbol) => {
                validate_symbol(symbol)?;
                writer.write_i32(15);
                writer.write_string(symbol, SYMBOL_MAX)?;
            }
            ScVal::Vec(items) => {
                writer.write_i32(16);
                write_optional_array(writer, items)?;
            }
            ScVal::Map(entries) => {
                writer.write_i32(17);
                write_optional_array(writer, entries)?;
            }
            ScVal::Address(address) => {
                writer.write_i32(18);
                address.write_xdr(writer)?;
            }
            ScVal::ContractInstance(instance) => {
                writer.write_i32(19);
                instance.executable.write_xdr(writer)?;
                write_optional_array(writer, &instance.storage)?;
            }
            ScVal::LedgerKeyContractInstance => writer.write_i32(20),
            ScVal::LedgerKeyNonce(nonce) => {
                writer.write_i32(21);
                writer.write_i64(*nonce);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_encodes_i128_as_high_and_low_halves() {
        let bytes = ScVal::I128(-1).to_xdr().unwrap();
        assert_eq!(&bytes[..4], &[0, 0, 0, 10]);
        assert!(bytes[4..].iter().all(|byte| *byte == 0xff));
        assert_eq!(ScVal::from_xdr(&bytes).unwrap(), ScVal::I128(-1));

        let large = ScVal::I128(10_000_000 * 1_000_000_000_000);
        assert_eq!(ScVal::from_xdr(&large.to_xdr().unwrap()).unwrap(), large);
    }

    #[test]
    fn it_rejects_invalid_symbols() {
        assert!(ScVal::symbol("transfer").is_ok());
        assert!(ScVal::symbol("has space").is_err());
        assert!(ScVal::symbol(&"a".repeat(33)).is_err());

        let mut writer = XdrWriter::new();
        writer.write_i32(15);
        writer.write_string("no-dash", SYMBOL_MAX).unwrap();
        assert_eq!(
            ScVal::from_xdr(&writer.finish()),
            Err(XdrError::InvalidSymbol("no-dash".into()))
        );
    }

    #[test]
    fn it_sorts_symbol_maps_by_key() {
        let map = ScVal::symbol_map([
            ("signature", ScVal::Void),
            ("credential_id", ScVal::Void),
            ("authenticator_data", ScVal::Void),
        ])
        .unwrap();
        let ScVal::Map(Some(entries)) = &map else {
            panic!("expected a map");
        };
        let keys: Vec<_> = entries
            .iter()
            .map(|entry| match &entry.key {
                ScVal::Symbol(symbol) => symbol.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(keys, ["authenticator_data", "credential_id", "signature"]);
        assert_eq!(map.map_get("signature"), Some(&ScVal::Void));
    }

    #[test]
    fn it_rejects_unknown_value_types() {
        assert_eq!(
            ScVal::from_xdr(&[0, 0, 0, 22]),
            Err(XdrError::InvalidDiscriminant {
                name: "SCValType",
                value: 22
            })
        );
    }

    #[test]
    fn it_limits_nesting_depth() {
        let mut writer = XdrWriter::new();
        for _ in 0..200 {
            writer.write_i32(16);
            writer.write_bool(true);
            writer.write_u32(1);
        }
        writer.write_i32(1);
        assert_eq!(
            ScVal::from_xdr(&writer.finish()),
            Err(XdrError::DepthLimitExceeded(crate::codec::MAX_DEPTH))
        );
    }

    #[test]
    fn it_formats_addresses_as_strkeys() {
        let contract = ScAddress::Contract([7u8; 32]);
        let encoded = contract.to_string();
        assert!(encoded.starts_with('C'));
        assert_eq!(encoded.parse::<ScAddress>().unwrap(), contract);

        let account: ScAddress = "GA7QYNF7SOWQ3GLR2BGMZEHXAVIRZA4KVWLTJJFC7MGXUA74P7UJVSGZ"
            .parse()
            .unwrap();
        assert!(matches!(account, ScAddress::Account(_)));
    }
}
