//! Decoding of raw entry bytes into typed values
//!
//! Everything here is a pure function of the field type, the element count, the byte order and
//! the value bytes. Where the bytes came from (inline or behind an offset) is the caller's
//! business.

use super::ifd::{Rational, SRational, Value};
use super::stream::{ByteCursor, ByteOrder};
use crate::error::{DecodeError, DecodeResult, OutOfRange};
use crate::tags::Type;

/// Default length above which byte runs are kept as raw bytes.
pub const DEFAULT_BINARY_THRESHOLD: usize = 64;

/// Decoding parameters that stay fixed for a stream, apart from the UTF-8 capability which is
/// raised once an EXIF 3.0 version tag has been seen.
#[derive(Clone, Copy, Debug)]
pub struct Codec {
    pub byte_order: ByteOrder,
    /// Text may be UTF-8 even when it looks like plain ASCII.
    pub utf8: bool,
    /// BYTE and SBYTE runs longer than this stay [`Value::Bytes`].
    pub binary_threshold: usize,
}

impl Codec {
    pub fn new(byte_order: ByteOrder) -> Self {
        Codec {
            byte_order,
            utf8: false,
            binary_threshold: DEFAULT_BINARY_THRESHOLD,
        }
    }

    /// Decode `count` elements of `type_` from `raw`.
    ///
    /// `raw` must hold at least `count` elements. `Ok(None)` means the value is absent: an empty
    /// value or a single rational with a zero denominator.
    pub fn decode(&self, type_: Type, count: u32, raw: &[u8]) -> DecodeResult<Option<Value>> {
        let count = usize::try_from(count).map_err(|_| DecodeError::LimitsExceeded)?;
        let len = count
            .checked_mul(type_.byte_len())
            .ok_or(DecodeError::LimitsExceeded)?;

        if raw.len() < len {
            return Err(DecodeError::OutOfRange(OutOfRange {
                offset: 0,
                len,
                buffer_len: raw.len(),
            }));
        }

        if count == 0 {
            return Ok(None);
        }

        let raw = &raw[..len];
        let cursor = ByteCursor::new(raw, self.byte_order);
        let width = type_.byte_len();

        let value = match type_ {
            Type::ASCII => Value::Text(self.decode_text(raw)),
            Type::UNDEFINED => Value::Bytes(raw.to_vec()),
            Type::BYTE if count > self.binary_threshold => Value::Bytes(raw.to_vec()),
            Type::SBYTE if count > self.binary_threshold => Value::Bytes(raw.to_vec()),
            Type::BYTE => ints(count, |i| Ok(i64::from(raw[i])))?,
            Type::SBYTE => ints(count, |i| Ok(i64::from(raw[i] as i8)))?,
            Type::SHORT => ints(count, |i| Ok(i64::from(cursor.read_u16(i * width)?)))?,
            Type::SSHORT => ints(count, |i| Ok(i64::from(cursor.read_i16(i * width)?)))?,
            Type::LONG => ints(count, |i| Ok(i64::from(cursor.read_u32(i * width)?)))?,
            Type::SLONG => ints(count, |i| Ok(i64::from(cursor.read_i32(i * width)?)))?,
            Type::SLONG8 => ints(count, |i| Ok(cursor.read_i64(i * width)?))?,
            Type::LONG8 => ints(count, |i| {
                i64::try_from(cursor.read_u64(i * width)?).map_err(|_| DecodeError::LimitsExceeded)
            })?,
            Type::IFD | Type::IFD8 => {
                let offset = |i: usize| -> DecodeResult<u64> {
                    Ok(match type_ {
                        Type::IFD => u64::from(cursor.read_u32(i * width)?),
                        _ => cursor.read_u64(i * width)?,
                    })
                };

                if count == 1 {
                    Value::SubDirectory(offset(0)?)
                } else {
                    ints(count, |i| {
                        i64::try_from(offset(i)?).map_err(|_| DecodeError::LimitsExceeded)
                    })?
                }
            }
            Type::FLOAT | Type::DOUBLE => {
                let mut floats = Vec::with_capacity(count);
                for i in 0..count {
                    floats.push(match type_ {
                        Type::FLOAT => f64::from(cursor.read_f32(i * width)?),
                        _ => cursor.read_f64(i * width)?,
                    });
                }

                if count == 1 {
                    Value::Float(floats[0])
                } else {
                    Value::FloatList(floats)
                }
            }
            Type::RATIONAL => {
                let mut list = Vec::with_capacity(count);
                for i in 0..count {
                    let n = cursor.read_u32(i * width)?;
                    let d = cursor.read_u32(i * width + 4)?;
                    list.push(Rational::new(n, d));
                }

                match list.as_slice() {
                    [None] => return Ok(None),
                    [Some(r)] => Value::Rational(*r),
                    _ => Value::RationalList(list),
                }
            }
            Type::SRATIONAL => {
                let mut list = Vec::with_capacity(count);
                for i in 0..count {
                    let n = cursor.read_i32(i * width)?;
                    let d = cursor.read_i32(i * width + 4)?;
                    list.push(SRational::new(n, d));
                }

                match list.as_slice() {
                    [None] => return Ok(None),
                    [Some(r)] => Value::SRational(*r),
                    _ => Value::SRationalList(list),
                }
            }
        };

        Ok(Some(value))
    }

    /// Text up to the first NUL, with trailing NUL and whitespace removed.
    pub fn decode_text(&self, raw: &[u8]) -> String {
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        let bytes = &raw[..end];

        let text = if self.utf8 || !bytes.is_ascii() {
            match std::str::from_utf8(bytes) {
                Ok(s) => s.to_owned(),
                Err(_) => ascii_lossy(bytes),
            }
        } else {
            ascii_lossy(bytes)
        };

        text.trim_end_matches(|c: char| c == '\0' || c.is_whitespace())
            .to_owned()
    }
}

/// Decode with the default settings of a stream in `byte_order`.
pub fn decode(type_: Type, count: u32, raw: &[u8], byte_order: ByteOrder) -> DecodeResult<Option<Value>> {
    Codec::new(byte_order).decode(type_, count, raw)
}

/// Whether an `ExifVersion` value announces EXIF 3.0 or later.
pub fn announces_utf8(version: &Value) -> bool {
    let Some(bytes) = version.as_bytes() else {
        return false;
    };

    match bytes.get(..4) {
        Some(digits) if digits.iter().all(u8::is_ascii_digit) => digits >= &b"0300"[..],
        _ => false,
    }
}

fn ints(count: usize, mut element: impl FnMut(usize) -> DecodeResult<i64>) -> DecodeResult<Value> {
    if count == 1 {
        return Ok(Value::Int(element(0)?));
    }

    let mut list = Vec::with_capacity(count);
    for i in 0..count {
        list.push(element(i)?);
    }
    Ok(Value::IntList(list))
}

fn ascii_lossy(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if b.is_ascii() { char::from(b) } else { '\u{FFFD}' })
        .collect()
}
