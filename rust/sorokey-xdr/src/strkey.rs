//! Stellar "StrKey" address strings.
//!
//! A StrKey is `base32(version || payload || crc16_xmodem_le)` using the
//! RFC 4648 alphabet without padding. The version byte selects the leading
//! character: `G` for accounts, `S` for secret seeds, `C` for contracts,
//! and `M` for muxed accounts.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Errors from parsing a StrKey string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrKeyError {
    /// A character outside the base32 alphabet.
    #[error("invalid base32 character {0:?}")]
    InvalidCharacter(char),

    /// The decoded length does not match the key kind.
    #[error("invalid length {0}")]
    InvalidLength(usize),

    /// The version byte is not one this crate understands.
    #[error("unknown version byte {0:#04x}")]
    UnknownVersion(u8),

    /// The version byte is valid but not the kind that was asked for.
    #[error("expected a {expected} key, found a {found} key")]
    UnexpectedKind {
        /// The requested kind.
        expected: StrKeyKind,
        /// The kind actually encoded.
        found: StrKeyKind,
    },

    /// The trailing CRC16 does not match the payload.
    #[error("checksum mismatch")]
    InvalidChecksum,

    /// The string is not in canonical form (stray bits or padding).
    #[error("non-canonical encoding")]
    NonCanonical,
}

/// The kinds of StrKey this crate reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrKeyKind {
    /// An Ed25519 account public key (`G…`).
    Account,
    /// An Ed25519 secret seed (`S…`).
    Seed,
    /// A contract id (`C…`).
    Contract,
    /// A multiplexed account (`M…`).
    Muxed,
}

impl StrKeyKind {
    const fn version(self) -> u8 {
        match self {
            StrKeyKind::Account => 6 << 3,
            StrKeyKind::Seed => 18 << 3,
            StrKeyKind::Contract => 2 << 3,
            StrKeyKind::Muxed => 12 << 3,
        }
    }

    const fn payload_len(self) -> usize {
        match self {
            StrKeyKind::Muxed => 40,
            _ => 32,
        }
    }

    fn from_version(version: u8) -> Option<Self> {
        [
            StrKeyKind::Account,
            StrKeyKind::Seed,
            StrKeyKind::Contract,
            StrKeyKind::Muxed,
        ]
        .into_iter()
        .find(|kind| kind.version() == version)
    }
}

impl fmt::Display for StrKeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrKeyKind::Account => "account",
            StrKeyKind::Seed => "secret seed",
            StrKeyKind::Contract => "contract",
            StrKeyKind::Muxed => "muxed account",
        };
        f.write_str(name)
    }
}

/// A decoded StrKey.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StrKey {
    Account([u8; 32]),
    Seed([u8; 32]),
    Contract([u8; 32]),
    Muxed {
        ed25519: [u8; 32],
        id: u64,
    },
}

impl StrKey {
    pub fn kind(&self) -> StrKeyKind {
        match self {
            StrKey::Account(_) => StrKeyKind::Account,
            StrKey::Seed(_) => StrKeyKind::Seed,
            StrKey::Contract(_) => StrKeyKind::Contract,
            StrKey::Muxed { .. } => StrKeyKind::Muxed,
        }
    }

    fn payload(&self) -> Vec<u8> {
        match self {
            StrKey::Account(key) | StrKey::Seed(key) | StrKey::Contract(key) => key.to_vec(),
            StrKey::Muxed { ed25519, id } => {
                let mut payload = ed25519.to_vec();
                payload.extend_from_slice(&id.to_be_bytes());
                payload
            }
        }
    }

    /// Parse a StrKey, requiring a particular kind, and return its 32-byte key.
    pub fn decode_as(kind: StrKeyKind, encoded: &str) -> Result<[u8; 32], StrKeyError> {
        match encoded.parse::<StrKey>()? {
            StrKey::Account(key) if kind == StrKeyKind::Account => Ok(key),
            StrKey::Seed(key) if kind == StrKeyKind::Seed => Ok(key),
            StrKey::Contract(key) if kind == StrKeyKind::Contract => Ok(key),
            StrKey::Muxed { ed25519, .. } if kind == StrKeyKind::Muxed => Ok(ed25519),
            other => Err(StrKeyError::UnexpectedKind {
                expected: kind,
                found: other.kind(),
            }),
        }
    }
}

impl fmt::Display for StrKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut raw = vec![self.kind().version()];
        raw.extend_from_slice(&self.payload());
        let checksum = crc16_xmodem(&raw);
        raw.extend_from_slice(&checksum.to_le_bytes());
        f.write_str(&base32_encode(&raw))
    }
}

impl FromStr for StrKey {
    type Err = StrKeyError;

    fn from_str(encoded: &str) -> Result<Self, Self::Err> {
        let raw = base32_decode(encoded)?;
        if raw.len() < 3 {
            return Err(StrKeyError::InvalidLength(raw.len()));
        }
        let kind = StrKeyKind::from_version(raw[0]).ok_or(StrKeyError::UnknownVersion(raw[0]))?;
        let payload = &raw[1..raw.len() - 2];
        if payload.len() != kind.payload_len() {
            return Err(StrKeyError::InvalidLength(payload.len()));
        }

        let (body, checksum) = raw.split_at(raw.len() - 2);
        if crc16_xmodem(body).to_le_bytes() != [checksum[0], checksum[1]] {
            return Err(StrKeyError::InvalidChecksum);
        }

        let mut key = [0u8; 32];
        key.copy_from_slice(&payload[..32]);
        let strkey = match kind {
            StrKeyKind::Account => StrKey::Account(key),
            StrKeyKind::Seed => StrKey::Seed(key),
            StrKeyKind::Contract => StrKey::Contract(key),
            StrKeyKind::Muxed => {
                let mut id = [0u8; 8];
                id.copy_from_slice(&payload[32..]);
                StrKey::Muxed {
                    ed25519: key,
                    id: u64::from_be_bytes(id),
                }
            }
        };

        if strkey.to_string() != encoded {
            return Err(StrKeyError::NonCanonical);
        }
        Ok(strkey)
    }
}

fn crc16_xmodem(bytes: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for byte in bytes {
        crc ^= (*byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

fn base32_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(5) * 8);
    let mut buffer: u32 = 0;
    let mut bits = 0;
    for byte in bytes {
        buffer = (buffer << 8) | *byte as u32;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
        }
    }
    if bits > 0 {
        out.push(ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize] as char);
    }
    out
}

fn base32_decode(encoded: &str) -> Result<Vec<u8>, StrKeyError> {
    let mut out = Vec::with_capacity(encoded.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits = 0;
    for character in encoded.chars() {
        let value = ALPHABET
            .iter()
            .position(|candidate| *candidate as char == character)
            .ok_or(StrKeyError::InvalidCharacter(character))?;
        buffer = (buffer << 5) | value as u32;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
        }
    }
    Ok(out)
}
