//! Function for reading TIFF directories and their entries

use std::fmt;
use std::num::NonZeroU32;

use tracing::debug;

use super::cycles::{ChainGuard, ClaimedRanges};
use super::stream::{ByteCursor, ByteOrder};
use super::Limits;
use crate::directory::Directory;
use crate::error::{DecodeError, DecodeResult};
use crate::tags::Type;

/// Size of one directory entry on disk.
pub const ENTRY_LEN: usize = 12;

/// An unsigned fraction. The denominator is never zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rational {
    pub numerator: u32,
    pub denominator: u32,
}

impl Rational {
    /// `None` when `denominator` is zero.
    pub fn new(numerator: u32, denominator: u32) -> Option<Self> {
        (denominator != 0).then_some(Rational {
            numerator,
            denominator,
        })
    }

    pub fn to_f64(self) -> f64 {
        f64::from(self.numerator) / f64::from(self.denominator)
    }
}

/// A signed fraction. The denominator is never zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SRational {
    pub numerator: i32,
    pub denominator: i32,
}

impl SRational {
    /// `None` when `denominator` is zero.
    pub fn new(numerator: i32, denominator: i32) -> Option<Self> {
        (denominator != 0).then_some(SRational {
            numerator,
            denominator,
        })
    }

    pub fn to_f64(self) -> f64 {
        f64::from(self.numerator) / f64::from(self.denominator)
    }
}

/// A decoded tag value.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Value {
    Int(i64),
    IntList(Vec<i64>),
    Float(f64),
    FloatList(Vec<f64>),
    Rational(Rational),
    SRational(SRational),
    /// Elements with a zero denominator are `None`.
    RationalList(Vec<Option<Rational>>),
    /// Elements with a zero denominator are `None`.
    SRationalList(Vec<Option<SRational>>),
    Text(String),
    Bytes(Vec<u8>),
    /// Offset of a directory, relative to the stream it was found in.
    SubDirectory(u64),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(v) => Some(v),
            Value::IntList(ref v) if v.len() == 1 => Some(v[0]),
            Value::SubDirectory(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        self.as_i64().and_then(|v| u32::try_from(v).ok())
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.as_i64().and_then(|v| u64::try_from(v).ok())
    }

    /// All integer elements, for scalar and list values alike.
    pub fn as_u64_list(&self) -> Option<Vec<u64>> {
        match *self {
            Value::IntList(ref v) => v.iter().map(|&i| u64::try_from(i).ok()).collect(),
            Value::Bytes(ref v) => Some(v.iter().map(|&b| u64::from(b)).collect()),
            _ => self.as_u64().map(|v| vec![v]),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match *self {
            Value::Text(ref s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match *self {
            Value::Bytes(ref b) => Some(b),
            Value::Text(ref s) => Some(s.as_bytes()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list<T>(
            f: &mut fmt::Formatter<'_>,
            items: &[T],
            mut each: impl FnMut(&mut fmt::Formatter<'_>, &T) -> fmt::Result,
        ) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                each(f, item)?;
            }
            Ok(())
        }

        fn ratio<T: fmt::Display>(f: &mut fmt::Formatter<'_>, n: T, d: T) -> fmt::Result {
            write!(f, "{}/{}", n, d)
        }

        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::IntList(v) => list(f, v, |f, i| write!(f, "{}", i)),
            Value::Float(v) => write!(f, "{}", v),
            Value::FloatList(v) => list(f, v, |f, i| write!(f, "{}", i)),
            Value::Rational(r) => ratio(f, r.numerator, r.denominator),
            Value::SRational(r) => ratio(f, r.numerator, r.denominator),
            Value::RationalList(v) => list(f, v, |f, r| match r {
                Some(r) => ratio(f, r.numerator, r.denominator),
                None => f.write_str("undef"),
            }),
            Value::SRationalList(v) => list(f, v, |f, r| match r {
                Some(r) => ratio(f, r.numerator, r.denominator),
                None => f.write_str("undef"),
            }),
            Value::Text(s) => f.write_str(s),
            Value::Bytes(b) => write!(f, "(Binary data {} bytes)", b.len()),
            Value::SubDirectory(o) => write!(f, "(Directory at {:#x})", o),
        }
    }
}

/// A 12-byte directory entry as stored in the file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    tag: u16,
    type_raw: u16,
    count: u32,
    value_or_offset: [u8; 4],
    /// Absolute position of the entry itself.
    position: usize,
}

impl Entry {
    pub fn new(tag: u16, type_raw: u16, count: u32, value_or_offset: [u8; 4], position: usize) -> Self {
        Entry {
            tag,
            type_raw,
            count,
            value_or_offset,
            position,
        }
    }

    pub fn tag(&self) -> u16 {
        self.tag
    }

    /// The field type, `None` for codes outside the TIFF type table.
    pub fn field_type(&self) -> Option<Type> {
        Type::from_u16(self.type_raw)
    }

    pub fn type_code(&self) -> u16 {
        self.type_raw
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn raw_value(&self) -> [u8; 4] {
        self.value_or_offset
    }

    /// The value field read as an offset.
    pub fn offset(&self, byte_order: ByteOrder) -> u32 {
        match byte_order {
            ByteOrder::LittleEndian => u32::from_le_bytes(self.value_or_offset),
            ByteOrder::BigEndian => u32::from_be_bytes(self.value_or_offset),
        }
    }

    /// Total byte size of the value.
    pub fn value_len(&self) -> DecodeResult<usize> {
        let type_ = self
            .field_type()
            .ok_or(DecodeError::UnknownType(self.type_raw))?;
        type_
            .value_bytes(self.count)
            .ok_or(DecodeError::LimitsExceeded)
    }

    /// Whether the value lives inside the entry rather than behind an offset.
    pub fn is_inline(&self) -> DecodeResult<bool> {
        Ok(self.value_len()? <= 4)
    }

    /// Absolute location and length of the value bytes.
    ///
    /// Inline values are read from the entry's own value field. Other values are found at
    /// `base + offset`, where `base` is the start of the stream the offset is relative to.
    pub fn value_location(&self, byte_order: ByteOrder, base: usize) -> DecodeResult<(usize, usize)> {
        let len = self.value_len()?;
        if len <= 4 {
            return Ok((self.position + 8, len));
        }

        let at = usize::try_from(self.offset(byte_order))
            .ok()
            .and_then(|offset| base.checked_add(offset))
            .ok_or(DecodeError::LimitsExceeded)?;
        Ok((at, len))
    }
}

/// Parse one directory at the absolute `offset`.
///
/// Only the structure is read: entry count, entries and the next pointer. Sub-directory pointers
/// are returned as plain entries and are not followed.
pub fn parse_directory(cursor: &ByteCursor<'_>, offset: usize, limits: &Limits) -> DecodeResult<Directory> {
    read_directory(cursor, offset, limits.max_entries)
}

pub(crate) fn read_directory(
    cursor: &ByteCursor<'_>,
    offset: usize,
    max_entries: usize,
) -> DecodeResult<Directory> {
    let count = usize::from(cursor.read_u16(offset)?);

    if count == 0 {
        return Err(DecodeError::InvalidDirectory("directory has no entries"));
    }

    if count > max_entries {
        return Err(DecodeError::InvalidDirectory("entry count exceeds the sanity ceiling"));
    }

    let table = offset + 2;
    // Check the whole table at once before reading entries one by one.
    cursor.read_bytes(table, count * ENTRY_LEN)?;

    let mut entries = Vec::with_capacity(count);
    for i in 0..count {
        let position = table + i * ENTRY_LEN;
        let mut value_or_offset = [0u8; 4];
        value_or_offset.copy_from_slice(cursor.read_bytes(position + 8, 4)?);

        entries.push(Entry::new(
            cursor.read_u16(position)?,
            cursor.read_u16(position + 2)?,
            cursor.read_u32(position + 4)?,
            value_or_offset,
            position,
        ));
    }

    // A missing next pointer at the very end of the buffer ends the chain.
    let next = cursor
        .read_u32(table + count * ENTRY_LEN)
        .ok()
        .and_then(NonZeroU32::new);

    Ok(Directory::new(offset, entries, next))
}

/// Follow the IFD chain starting at the stream-relative `first` offset.
///
/// Stops at a zero pointer, at a revisited or claimed offset, at the first directory that fails
/// to parse, or after `limits.max_directories` directories. Every parsed directory is claimed.
pub fn walk_chain(
    cursor: &ByteCursor<'_>,
    base: usize,
    first: u32,
    limits: &Limits,
    claims: &mut ClaimedRanges,
) -> Vec<Directory> {
    let mut guard = ChainGuard::new(limits.max_directories);
    let mut chain = Vec::new();
    let mut next = NonZeroU32::new(first);

    while let Some(relative) = next {
        let step = stream_offset(base, relative.get()).and_then(|offset| {
            guard.visit(offset)?;
            claims.check(offset)?;
            parse_directory(cursor, offset, limits)
        });

        match step {
            Ok(directory) => {
                claims.claim(directory.byte_range());
                next = directory.next();
                chain.push(directory);
            }
            Err(err) => {
                debug!(offset = relative.get(), index = chain.len(), error = %err, "ending directory chain");
                break;
            }
        }
    }

    chain
}

/// Absolute position of a stream-relative offset.
pub(crate) fn stream_offset(base: usize, relative: u32) -> DecodeResult<usize> {
    usize::try_from(relative)
        .ok()
        .and_then(|relative| base.checked_add(relative))
        .ok_or(DecodeError::LimitsExceeded)
}
