//! Conversion of DER ECDSA signatures to the compact low-S form Soroban
//! accepts.

use p256::elliptic_curve::ff::PrimeField;
use p256::elliptic_curve::scalar::IsHigh;
use p256::{FieldBytes, Scalar};

use super::error::SignatureError;

const SEQUENCE: u8 = 0x30;
const INTEGER: u8 = 0x02;

/// A 64-byte `r || s` P-256 signature with `s <= n / 2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactSignature([u8; 64]);

impl CompactSignature {
    pub fn r(&self) -> &[u8] {
        &self.0[..32]
    }

    pub fn s(&self) -> &[u8] {
        &self.0[32..]
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl AsRef<[u8]> for CompactSignature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Convert a DER-encoded P-256 signature to compact low-S form.
///
/// `r` and `s` are right-aligned into 32 bytes each, so DER's leading sign
/// byte and short integers are both handled. When `s` is above half the
/// curve order it is replaced by `n - s`; otherwise it passes through.
pub fn canonicalize(der: &[u8]) -> Result<CompactSignature, SignatureError> {
    let body = read_element(der, SEQUENCE)
        .and_then(|(body, rest)| rest.is_empty().then_some(body))
        .ok_or(SignatureError::MalformedDer("expected a single SEQUENCE"))?;
    let (r, rest) =
        read_element(body, INTEGER).ok_or(SignatureError::MalformedDer("missing r"))?;
    let (s, rest) =
        read_element(rest, INTEGER).ok_or(SignatureError::MalformedDer("missing s"))?;
    if !rest.is_empty() {
        return Err(SignatureError::MalformedDer("trailing data after s"));
    }

    let r = right_align(r)?;
    let s = right_align(s)?;
    let s = Option::<Scalar>::from(Scalar::from_repr(*FieldBytes::from_slice(&s)))
        .ok_or(SignatureError::ScalarOutOfRange)?;
    let s = if bool::from(s.is_high()) { -s } else { s };

    let mut compact = [0u8; 64];
    compact[..32].copy_from_slice(&r);
    compact[32..].copy_from_slice(&s.to_repr());
    Ok(CompactSignature(compact))
}

/// Read one short-form DER element with the given tag, returning its
/// contents and the remaining input.
fn read_element(input: &[u8], tag: u8) -> Option<(&[u8], &[u8])> {
    match input {
        [found, length, rest @ ..] if *found == tag && *length < 0x80 => {
            let length = *length as usize;
            (rest.len() >= length).then(|| rest.split_at(length))
        }
        _ => None,
    }
}

fn right_align(integer: &[u8]) -> Result<[u8; 32], SignatureError> {
    let start = integer
        .iter()
        .position(|byte| *byte != 0)
        .unwrap_or(integer.len());
    let significant = &integer[start..];
    if significant.len() > 32 {
        return Err(SignatureError::MalformedDer("integer wider than 32 bytes"));
    }
    let mut aligned = [0u8; 32];
    aligned[32 - significant.len()..].copy_from_slice(significant);
    Ok(aligned)
}
