//! XDR (RFC 4506) reader and writer.
//!
//! All quantities are big-endian and every item occupies a multiple of four
//! bytes. Variable-length opaques, strings and arrays carry a `u32` length
//! prefix and a schema-declared upper bound.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::XdrError;

/// Maximum nesting of recursive structures (`ScVal`, invocation trees)
/// accepted by the decoder.
pub const MAX_DEPTH: u32 = 128;

/// Bound used for variable-length items the schema leaves unbounded.
pub const UNBOUNDED: u32 = u32::MAX;

/// A type with a canonical XDR representation.
pub trait Xdr: Sized {
    /// Read a value from the reader's current position.
    fn read_xdr(reader: &mut XdrReader<'_>) -> Result<Self, XdrError>;

    /// Append the value's encoding to the writer.
    fn write_xdr(&self, writer: &mut XdrWriter) -> Result<(), XdrError>;

    /// Encode to a fresh byte vector.
    fn to_xdr(&self) -> Result<Vec<u8>, XdrError> {
        let mut writer = XdrWriter::new();
        self.write_xdr(&mut writer)?;
        Ok(writer.finish())
    }

    /// Decode a value that must span the entire input.
    fn from_xdr(bytes: &[u8]) -> Result<Self, XdrError> {
        let mut reader = XdrReader::new(bytes);
        let value = Self::read_xdr(&mut reader)?;
        reader.finish()?;
        Ok(value)
    }

    /// Encode to standard base64, the transport form used by RPC servers.
    fn to_xdr_base64(&self) -> Result<String, XdrError> {
        Ok(STANDARD.encode(self.to_xdr()?))
    }

    /// Decode from standard base64.
    fn from_xdr_base64(encoded: &str) -> Result<Self, XdrError> {
        let bytes = STANDARD.decode(encoded.trim())?;
        Self::from_xdr(&bytes)
    }
}

/// Cursor over an XDR-encoded byte slice.
#[derive(Debug)]
pub struct XdrReader<'a> {
    bytes: &'a [u8],
    position: usize,
    depth: u32,
}

impl<'a> XdrReader<'a> {
    /// Start reading at the beginning of `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            position: 0,
            depth: 0,
        }
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    /// Ensure the whole input has been consumed.
    pub fn finish(self) -> Result<(), XdrError> {
        match self.remaining() {
            0 => Ok(()),
            trailing => Err(XdrError::TrailingBytes(trailing)),
        }
    }

    fn take(&mut self, length: usize) -> Result<&'a [u8], XdrError> {
        if length > self.remaining() {
            return Err(XdrError::UnexpectedEof {
                needed: length - self.remaining(),
            });
        }
        let slice = &self.bytes[self.position..self.position + length];
        self.position += length;
        Ok(slice)
    }

    fn skip_padding(&mut self, length: usize) -> Result<(), XdrError> {
        let padding = (4 - length % 4) % 4;
        if self.take(padding)?.iter().any(|byte| *byte != 0) {
            return Err(XdrError::NonZeroPadding);
        }
        Ok(())
    }

    fn read_length(&mut self, max: u32) -> Result<usize, XdrError> {
        let length = self.read_u32()?;
        if length > max {
            return Err(XdrError::LengthExceeded {
                length: length as usize,
                max,
            });
        }
        Ok(length as usize)
    }

    /// Run `read` one nesting level deeper, failing past [`MAX_DEPTH`].
    pub fn nested<T>(
        &mut self,
        read: impl FnOnce(&mut Self) -> Result<T, XdrError>,
    ) -> Result<T, XdrError> {
        if self.depth >= MAX_DEPTH {
            return Err(XdrError::DepthLimitExceeded(MAX_DEPTH));
        }
        self.depth += 1;
        let result = read(self);
        self.depth -= 1;
        result
    }

    pub fn read_u32(&mut self) -> Result<u32, XdrError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_i32(&mut self) -> Result<i32, XdrError> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_u64(&mut self) -> Result<u64, XdrError> {
        let high = self.read_u32()? as u64;
        let low = self.read_u32()? as u64;
        Ok((high << 32) | low)
    }

    pub fn read_i64(&mut self) -> Result<i64, XdrError> {
        Ok(self.read_u64()? as i64)
    }

    pub fn read_bool(&mut self) -> Result<bool, XdrError> {
        match self.read_u32()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(XdrError::InvalidBool(other)),
        }
    }

    /// Read fixed-length opaque data (`opaque[N]`).
    pub fn read_fixed<const N: usize>(&mut self) -> Result<[u8; N], XdrError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        self.skip_padding(N)?;
        Ok(out)
    }

    /// Read variable-length opaque data (`opaque<max>`).
    pub fn read_opaque(&mut self, max: u32) -> Result<Vec<u8>, XdrError> {
        let length = self.read_length(max)?;
        let bytes = self.take(length)?.to_vec();
        self.skip_padding(length)?;
        Ok(bytes)
    }

    /// Read a UTF-8 string (`string<max>`).
    pub fn read_string(&mut self, max: u32) -> Result<String, XdrError> {
        String::from_utf8(self.read_opaque(max)?).map_err(|_| XdrError::InvalidUtf8)
    }

    /// Read a variable-length array (`T<max>`).
    pub fn read_array<T: Xdr>(&mut self, max: u32) -> Result<Vec<T>, XdrError> {
        let length = self.read_length(max)?;
        // Every XDR item is at least four bytes wide.
        if length > self.remaining() / 4 {
            return Err(XdrError::UnexpectedEof {
                needed: length.saturating_mul(4).saturating_sub(self.remaining()),
            });
        }
        let mut items = Vec::with_capacity(length);
        for _ in 0..length {
            items.push(T::read_xdr(self)?);
        }
        Ok(items)
    }

    /// Read an optional value (`T*`).
    pub fn read_option<T: Xdr>(&mut self) -> Result<Option<T>, XdrError> {
        if self.read_bool()? {
            Ok(Some(T::read_xdr(self)?))
        } else {
            Ok(None)
        }
    }
}

/// Growable XDR output buffer.
#[derive(Debug, Default)]
pub struct XdrWriter {
    buffer: Vec<u8>,
}

impl XdrWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the encoded bytes.
    pub fn finish(self) -> Vec<u8> {
        self.buffer
    }

    fn pad(&mut self, length: usize) {
        let padding = (4 - length % 4) % 4;
        self.buffer.extend(std::iter::repeat_n(0u8, padding));
    }

    fn write_length(&mut self, length: usize, max: u32) -> Result<(), XdrError> {
        if length > max as usize {
            return Err(XdrError::LengthExceeded { length, max });
        }
        self.write_u32(length as u32);
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_u32(value as u32);
    }

    pub fn write_fixed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
        self.pad(bytes.len());
    }

    pub fn write_opaque(&mut self, bytes: &[u8], max: u32) -> Result<(), XdrError> {
        self.write_length(bytes.len(), max)?;
        self.write_fixed(bytes);
        Ok(())
    }

    pub fn write_string(&mut self, value: &str, max: u32) -> Result<(), XdrError> {
        self.write_opaque(value.as_bytes(), max)
    }

    pub fn write_array<T: Xdr>(&mut self, items: &[T], max: u32) -> Result<(), XdrError> {
        self.write_length(items.len(), max)?;
        for item in items {
            item.write_xdr(self)?;
        }
        Ok(())
    }

    pub fn write_option<T: Xdr>(&mut self, value: Option<&T>) -> Result<(), XdrError> {
        match value {
            Some(value) => {
                self.write_bool(true);
                value.write_xdr(self)
            }
            None => {
                self.write_bool(false);
                Ok(())
            }
        }
    }
}

impl Xdr for u32 {
    fn read_xdr(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        reader.read_u32()
    }

    fn write_xdr(&self, writer: &mut XdrWriter) -> Result<(), XdrError> {
        writer.write_u32(*self);
        Ok(())
    }
}

impl Xdr for i64 {
    fn read_xdr(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        reader.read_i64()
    }

    fn write_xdr(&self, writer: &mut XdrWriter) -> Result<(), XdrError> {
        writer.write_i64(*self);
        Ok(())
    }
}

impl<const N: usize> Xdr for [u8; N] {
    fn read_xdr(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        reader.read_fixed()
    }

    fn write_xdr(&self, writer: &mut XdrWriter) -> Result<(), XdrError> {
        writer.write_fixed(self);
        Ok(())
    }
}

impl<T: Xdr> Xdr for Box<T> {
    fn read_xdr(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        Ok(Box::new(T::read_xdr(reader)?))
    }

    fn write_xdr(&self, writer: &mut XdrWriter) -> Result<(), XdrError> {
        (**self).write_xdr(writer)
    }
}

/// Read a union discriminant, mapping unknown values through `decode`.
pub(crate) fn read_discriminant<T>(
    reader: &mut XdrReader<'_>,
    name: &'static str,
    decode: impl FnOnce(i32) -> Option<T>,
) -> Result<T, XdrError> {
    let value = reader.read_i32()?;
    decode(value).ok_or(XdrError::InvalidDiscriminant {
        name,
        value: value as i64,
    })
}

pub(crate) fn invalid(name: &'static str, value: i32) -> XdrError {
    XdrError::InvalidDiscriminant {
        name,
        value: value as i64,
    }
}
