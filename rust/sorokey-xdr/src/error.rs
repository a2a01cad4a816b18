use thiserror::Error;

use crate::strkey::StrKeyError;

/// Errors that can occur while encoding or decoding XDR.
///
/// Decoding is strict: every failure mode of the wire format is reported
/// rather than tolerated, so a successfully decoded value always re-encodes
/// to the exact bytes it was read from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XdrError {
    /// The input ended before the value was complete.
    #[error("unexpected end of input: {needed} more bytes required")]
    UnexpectedEof {
        /// How many bytes were missing at the point of failure.
        needed: usize,
    },

    /// A union discriminant or enum value is not defined for the type.
    #[error("invalid discriminant {value} for {name}")]
    InvalidDiscriminant {
        /// The XDR type being decoded.
        name: &'static str,
        /// The discriminant that was read.
        value: i64,
    },

    /// A variable-length value is longer than its declared bound.
    #[error("length {length} exceeds maximum of {max}")]
    LengthExceeded {
        /// The length that was read or supplied.
        length: usize,
        /// The bound declared by the XDR schema.
        max: u32,
    },

    /// Alignment padding contained non-zero bytes.
    #[error("non-zero padding bytes")]
    NonZeroPadding,

    /// A boolean was encoded with a value other than 0 or 1.
    #[error("invalid boolean value {0}")]
    InvalidBool(u32),

    /// A string or symbol was not valid UTF-8.
    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    /// A symbol contained characters outside `[a-zA-Z0-9_]`.
    #[error("invalid symbol {0:?}")]
    InvalidSymbol(String),

    /// Bytes remained after a complete value was decoded.
    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),

    /// Recursive structures were nested deeper than the decoder allows.
    #[error("nesting exceeds {0} levels")]
    DepthLimitExceeded(u32),

    /// The transport string was not valid base64.
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// An address string could not be parsed.
    #[error("invalid address: {0}")]
    StrKey(#[from] StrKeyError),
}
