//! Read response validation and typed payload decoding.
//!
//! A read response is a 25-byte header followed by the data block bytes.
//! Byte 21 of the header is the return code of the requested item; `0xFF`
//! means the device delivered the data.
//!
//! All decoders take an `offset` relative to the start of the payload and
//! add the header length themselves. String fields carry one extra
//! sub-header byte before their content. Multi-byte values are big-endian.
//!
//! Every decoder checks the buffer length first and returns
//! [`S7Error::ShortPayload`] instead of reading out of bounds.
//!
//! # Example
//!
//! ```
//! use siemens_s7::payload::{check_read_response, get_bool, get_u16, READ_RESPONSE_HEADER_SIZE};
//!
//! let mut response = vec![0u8; READ_RESPONSE_HEADER_SIZE];
//! response[21] = 0xFF;
//! response.extend_from_slice(&[0x12, 0x34, 0b0000_0100]);
//!
//! check_read_response(&response).unwrap();
//! assert_eq!(get_u16(&response, 0).unwrap(), 0x1234);
//! assert!(get_bool(&response, 2, 2).unwrap());
//! ```

use crate::error::{Result, S7Error};

/// Length of the read response header preceding the payload.
pub const READ_RESPONSE_HEADER_SIZE: usize = 25;

/// Length of the sub-header preceding string content.
pub const STRING_HEADER_SIZE: usize = 1;

const READ_STATUS_INDEX: usize = 21;
const READ_SUCCESS: u8 = 0xFF;

mod sealed {
    pub trait Sealed {}
}

/// Fixed-width value stored big-endian in a payload.
///
/// Implemented for `u8`, `i8`, `u16`, `i16`, `u32`, `i32`, `u64`, `i64`,
/// `f32` and `f64`. Signed integers are two's complement, floats IEEE-754.
pub trait BigEndian: sealed::Sealed + Copy {
    /// Encoded width in bytes.
    const WIDTH: usize;

    /// Decodes a value from exactly `WIDTH` bytes.
    fn from_be_slice(bytes: &[u8]) -> Self;
}

macro_rules! impl_big_endian {
    ($($ty:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl BigEndian for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn from_be_slice(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_be_bytes(raw)
                }
            }
        )*
    };
}

impl_big_endian!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// Returns `width` bytes starting at absolute index `start`.
fn field(buffer: &[u8], start: usize, width: usize) -> Result<&[u8]> {
    let end = start.saturating_add(width);
    buffer
        .get(start..end)
        .ok_or_else(|| S7Error::short_payload(end, buffer.len()))
}

/// Checks a read response for a device-reported failure.
///
/// # Errors
///
/// - `S7Error::ShortResponse` if the buffer is shorter than the 25-byte header
/// - `S7Error::ReadRejected` if the item return code is not `0xFF`
pub fn check_read_response(buffer: &[u8]) -> Result<()> {
    if buffer.len() < READ_RESPONSE_HEADER_SIZE {
        return Err(S7Error::short_response(
            READ_RESPONSE_HEADER_SIZE,
            buffer.len(),
        ));
    }
    let code = buffer[READ_STATUS_INDEX];
    if code != READ_SUCCESS {
        return Err(S7Error::ReadRejected { code });
    }
    Ok(())
}

/// Decodes any [`BigEndian`] value at a payload offset.
///
/// The typed `get_*` functions are thin wrappers over this one.
///
/// # Example
///
/// ```
/// use siemens_s7::payload::{decode, READ_RESPONSE_HEADER_SIZE};
///
/// let mut response = vec![0u8; READ_RESPONSE_HEADER_SIZE];
/// response.extend_from_slice(&(-2i32).to_be_bytes());
/// assert_eq!(decode::<i32>(&response, 0).unwrap(), -2);
/// ```
pub fn decode<T: BigEndian>(buffer: &[u8], offset: usize) -> Result<T> {
    let start = offset.saturating_add(READ_RESPONSE_HEADER_SIZE);
    field(buffer, start, T::WIDTH).map(T::from_be_slice)
}

macro_rules! typed_decoders {
    ($($name:ident => $ty:ty, $label:literal;)*) => {
        $(
            #[doc = concat!("Decodes ", $label, " at a payload offset.")]
            ///
            /// # Errors
            ///
            /// Returns `S7Error::ShortPayload` if the buffer ends before the field does.
            #[inline]
            pub fn $name(buffer: &[u8], offset: usize) -> Result<$ty> {
                decode::<$ty>(buffer, offset)
            }
        )*
    };
}

typed_decoders! {
    get_u8 => u8, "an unsigned byte";
    get_i8 => i8, "a signed byte";
    get_u16 => u16, "a big-endian `u16` (WORD)";
    get_i16 => i16, "a big-endian `i16` (INT)";
    get_u32 => u32, "a big-endian `u32` (DWORD)";
    get_i32 => i32, "a big-endian `i32` (DINT)";
    get_u64 => u64, "a big-endian `u64` (LWORD)";
    get_i64 => i64, "a big-endian `i64` (LINT)";
    get_f32 => f32, "a big-endian IEEE-754 `f32` (REAL)";
    get_f64 => f64, "a big-endian IEEE-754 `f64` (LREAL)";
}

/// Reads bit `bit` (0 = LSB) of the payload byte at `offset`.
///
/// # Errors
///
/// - `S7Error::ShortPayload` if the byte is past the end of the buffer
/// - `S7Error::InvalidIndex` if `bit` > 7
///
/// # Example
///
/// ```
/// use siemens_s7::payload::{get_bool, READ_RESPONSE_HEADER_SIZE};
///
/// let mut response = vec![0u8; READ_RESPONSE_HEADER_SIZE];
/// response.push(0b0000_0001);
/// assert!(get_bool(&response, 0, 0).unwrap());
/// assert!(!get_bool(&response, 0, 1).unwrap());
/// ```
pub fn get_bool(buffer: &[u8], offset: usize, bit: u8) -> Result<bool> {
    let byte = get_u8(buffer, offset)?;
    if bit > 7 {
        return Err(S7Error::InvalidIndex { index: bit });
    }
    Ok(byte & (1 << bit) != 0)
}

/// Returns the `length` raw bytes of a string field.
///
/// The content starts one sub-header byte after `offset`. Bytes are returned
/// untouched: no trimming, no NUL handling, no encoding check. S7 strings are
/// often Latin-1 or CP1252; decode them as the device requires.
///
/// # Errors
///
/// - `S7Error::InvalidLength` if `length` is 0, whatever the buffer holds
/// - `S7Error::ShortPayload` if the buffer ends before the content does
pub fn get_string_bytes(buffer: &[u8], offset: usize, length: usize) -> Result<&[u8]> {
    if length == 0 {
        return Err(S7Error::InvalidLength { length });
    }
    let start = offset
        .saturating_add(READ_RESPONSE_HEADER_SIZE)
        .saturating_add(STRING_HEADER_SIZE);
    field(buffer, start, length)
}

/// Reads a string field as text.
///
/// Same checks as [`get_string_bytes`]. Bytes that are not valid UTF-8 are
/// replaced with U+FFFD; use [`get_string_bytes`] when they must survive.
pub fn get_string(buffer: &[u8], offset: usize, length: usize) -> Result<String> {
    let raw = get_string_bytes(buffer, offset, length)?;
    Ok(String::from_utf8_lossy(raw).into_owned())
}

/// A read response whose return code has been checked.
///
/// # Example
///
/// ```
/// use siemens_s7::ReadResponse;
///
/// let mut bytes = vec![0u8; 25];
/// bytes[21] = 0xFF;
/// bytes.extend_from_slice(&[0x41, 0x20, 0x00, 0x00]);
///
/// let response = ReadResponse::parse(&bytes).unwrap();
/// assert_eq!(response.get::<f32>(0).unwrap(), 10.0);
/// assert_eq!(response.payload().len(), 4);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ReadResponse<'a> {
    bytes: &'a [u8],
}

impl<'a> ReadResponse<'a> {
    /// Validates `bytes` with [`check_read_response`] and wraps them.
    ///
    /// Pass only the bytes actually received (`&buffer[..n]`).
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        check_read_response(bytes)?;
        Ok(Self { bytes })
    }

    /// Returns the payload bytes following the header.
    pub fn payload(&self) -> &'a [u8] {
        &self.bytes[READ_RESPONSE_HEADER_SIZE..]
    }

    /// Decodes a fixed-width value at a payload offset.
    pub fn get<T: BigEndian>(&self, offset: usize) -> Result<T> {
        decode(self.bytes, offset)
    }

    /// Reads a single bit. See [`get_bool`].
    pub fn get_bool(&self, offset: usize, bit: u8) -> Result<bool> {
        get_bool(self.bytes, offset, bit)
    }

    /// Reads a string field. See [`get_string`].
    pub fn get_string(&self, offset: usize, length: usize) -> Result<String> {
        get_string(self.bytes, offset, length)
    }

    /// Returns the raw bytes of a string field. See [`get_string_bytes`].
    pub fn get_string_bytes(&self, offset: usize, length: usize) -> Result<&'a [u8]> {
        get_string_bytes(self.bytes, offset, length)
    }
}
