//! Deterministic binary encoding for everything stratadb puts on disk.
//!
//! The WAL record frame, the SSTable sidecar files, memtable snapshots and
//! the token-bucket state all share one hand-written, byte-stable wire
//! format. Owning the format (instead of delegating to a serialization
//! crate) means the on-disk representation can never drift underneath a
//! dependency upgrade.
//!
//! # Wire format
//!
//! | Rust type         | Encoding                                     |
//! |-------------------|----------------------------------------------|
//! | `u8`              | 1 byte                                       |
//! | `u32`             | 4 bytes, little-endian                       |
//! | `u64`             | 8 bytes, little-endian                       |
//! | `i64`             | 8 bytes, little-endian                       |
//! | `bool`            | 1 byte (`0x00` = false, `0x01` = true)       |
//! | `Vec<u8>`         | `[u32 len][bytes]`                           |
//!
//! Fields with an out-of-band length (the key and value of a WAL or data
//! block, whose sizes precede them as `u64`s) are written with
//! [`put_raw`] / [`take_raw`] instead of the length-prefixed form.
//!
//! # Safety limits
//!
//! Variable-length decoders reject any length above [`MAX_BYTE_LEN`], so a
//! corrupted length field cannot trigger a multi-gigabyte allocation.
//!
//! No function in this module panics; every failure is reported through
//! [`EncodingError`].


use thiserror::Error;

/// Upper bound for a single length-prefixed byte sequence (64 MiB).
///
/// Decoded lengths above this are treated as corruption rather than
/// honored with an allocation.
pub const MAX_BYTE_LEN: u32 = 64 * 1024 * 1024;

// ------------------------------------------------------------------------------------------------
// Error type
// ------------------------------------------------------------------------------------------------

/// Errors produced while encoding or decoding wire data.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// The buffer ran out of bytes before decoding completed.
    #[error("unexpected end of buffer (need {needed} bytes, have {available})")]
    UnexpectedEnd {
        /// Bytes required to continue decoding.
        needed: usize,
        /// Bytes actually remaining.
        available: usize,
    },

    /// A bool field held a byte other than `0x00` or `0x01`.
    #[error("invalid bool byte: 0x{0:02X}")]
    InvalidBool(u8),

    /// A decoded length exceeded [`MAX_BYTE_LEN`] or a value could not be
    /// represented in the wire format.
    #[error("length out of range: {0}")]
    LengthOutOfRange(u64),
}

// ------------------------------------------------------------------------------------------------
// Core traits
// ------------------------------------------------------------------------------------------------

/// Serialize `self` onto the end of a byte buffer.
///
/// Implementations must be deterministic: equal values always produce
/// identical bytes.
pub trait Encode {
    /// Append the encoded representation of `self` to `buf`.
    fn encode_to(&self, buf: &mut Vec<u8>) -> Result<(), EncodingError>;
}

/// Deserialize a value from the front of a byte slice.
///
/// Returns `(value, bytes_consumed)` so callers can walk a buffer holding
/// several encoded items.
pub trait Decode: Sized {
    /// Decode one value starting at `buf[0]`.
    fn decode_from(buf: &[u8]) -> Result<(Self, usize), EncodingError>;
}

/// Encode a value into a fresh `Vec<u8>`.
pub fn encode_to_vec<T: Encode>(value: &T) -> Result<Vec<u8>, EncodingError> {
    let mut buf = Vec::new();
    value.encode_to(&mut buf)?;
    Ok(buf)
}

/// Decode a value from the beginning of `buf`, returning it together with
/// the number of bytes consumed.
pub fn decode_from_slice<T: Decode>(buf: &[u8]) -> Result<(T, usize), EncodingError> {
    T::decode_from(buf)
}

// ------------------------------------------------------------------------------------------------
// Helpers
// ------------------------------------------------------------------------------------------------

#[inline]
fn need(buf: &[u8], wanted: usize) -> Result<(), EncodingError> {
    if buf.len() < wanted {
        return Err(EncodingError::UnexpectedEnd {
            needed: wanted,
            available: buf.len(),
        });
    }
    Ok(())
}

/// Append raw bytes with no length prefix.
///
/// The matching length must be carried elsewhere in the frame.
#[inline]
pub fn put_raw(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(bytes);
}

/// Take exactly `len` raw bytes from the front of `buf`.
#[inline]
pub fn take_raw(buf: &[u8], len: usize) -> Result<(Vec<u8>, usize), EncodingError> {
    need(buf, len)?;
    Ok((buf[..len].to_vec(), len))
}

// ------------------------------------------------------------------------------------------------
// Primitive implementations
// ------------------------------------------------------------------------------------------------

impl Encode for u8 {
    #[inline]
    fn encode_to(&self, buf: &mut Vec<u8>) -> Result<(), EncodingError> {
        buf.push(*self);
        Ok(())
    }
}

impl Decode for u8 {
    #[inline]
    fn decode_from(buf: &[u8]) -> Result<(Self, usize), EncodingError> {
        need(buf, 1)?;
        Ok((buf[0], 1))
    }
}

impl Encode for u32 {
    #[inline]
    fn encode_to(&self, buf: &mut Vec<u8>) -> Result<(), EncodingError> {
        buf.extend_from_slice(&self.to_le_bytes());
        Ok(())
    }
}

impl Decode for u32 {
    #[inline]
    fn decode_from(buf: &[u8]) -> Result<(Self, usize), EncodingError> {
        need(buf, 4)?;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&buf[..4]);
        Ok((u32::from_le_bytes(bytes), 4))
    }
}

impl Encode for u64 {
    #[inline]
    fn encode_to(&self, buf: &mut Vec<u8>) -> Result<(), EncodingError> {
        buf.extend_from_slice(&self.to_le_bytes());
        Ok(())
    }
}

impl Decode for u64 {
    #[inline]
    fn decode_from(buf: &[u8]) -> Result<(Self, usize), EncodingError> {
        need(buf, 8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&buf[..8]);
        Ok((u64::from_le_bytes(bytes), 8))
    }
}

impl Encode for i64 {
    #[inline]
    fn encode_to(&self, buf: &mut Vec<u8>) -> Result<(), EncodingError> {
        buf.extend_from_slice(&self.to_le_bytes());
        Ok(())
    }
}

impl Decode for i64 {
    #[inline]
    fn decode_from(buf: &[u8]) -> Result<(Self, usize), EncodingError> {
        need(buf, 8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&buf[..8]);
        Ok((i64::from_le_bytes(bytes), 8))
    }
}

impl Encode for bool {
    #[inline]
    fn encode_to(&self, buf: &mut Vec<u8>) -> Result<(), EncodingError> {
        buf.push(u8::from(*self));
        Ok(())
    }
}

impl Decode for bool {
    #[inline]
    fn decode_from(buf: &[u8]) -> Result<(Self, usize), EncodingError> {
        need(buf, 1)?;
        match buf[0] {
            0 => Ok((false, 1)),
            1 => Ok((true, 1)),
            other => Err(EncodingError::InvalidBool(other)),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Length-prefixed byte vectors: [u32 len][bytes]
// ------------------------------------------------------------------------------------------------

impl Encode for Vec<u8> {
    #[inline]
    fn encode_to(&self, buf: &mut Vec<u8>) -> Result<(), EncodingError> {
        let len = u32::try_from(self.len())
            .map_err(|_| EncodingError::LengthOutOfRange(self.len() as u64))?;
        len.encode_to(buf)?;
        buf.extend_from_slice(self);
        Ok(())
    }
}

impl Decode for Vec<u8> {
    #[inline]
    fn decode_from(buf: &[u8]) -> Result<(Self, usize), EncodingError> {
        let (len, mut offset) = u32::decode_from(buf)?;
        if len > MAX_BYTE_LEN {
            return Err(EncodingError::LengthOutOfRange(u64::from(len)));
        }
        let len = len as usize;
        need(&buf[offset..], len)?;
        let data = buf[offset..offset + len].to_vec();
        offset += len;
        Ok((data, offset))
    }
}
