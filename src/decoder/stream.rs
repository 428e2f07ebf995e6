//! Bounds-checked access to the file buffer

use crate::error::OutOfRange;

/// Byte order of a TIFF stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// little endian byte order
    LittleEndian,
    /// big endian byte order
    BigEndian,
}

impl ByteOrder {
    /// Interpret the two marker bytes opening a TIFF header.
    pub fn from_marker(marker: [u8; 2]) -> Option<Self> {
        match &marker {
            b"II" => Some(ByteOrder::LittleEndian),
            b"MM" => Some(ByteOrder::BigEndian),
            _ => None,
        }
    }

    /// Human readable name, as published under `File:ExifByteOrder`.
    pub fn description(self) -> &'static str {
        match self {
            ByteOrder::LittleEndian => "Little-endian (Intel, II)",
            ByteOrder::BigEndian => "Big-endian (Motorola, MM)",
        }
    }
}

macro_rules! read_fn {
    ($name:ident, $type:ty) => {
        #[doc = concat!("Reads an `", stringify!($type), "` at `offset` in the cursor's byte order.")]
        #[inline(always)]
        pub fn $name(&self, offset: usize) -> Result<$type, OutOfRange> {
            let n = self.read_array::<{ std::mem::size_of::<$type>() }>(offset)?;
            Ok(match self.byte_order {
                ByteOrder::LittleEndian => <$type>::from_le_bytes(n),
                ByteOrder::BigEndian => <$type>::from_be_bytes(n),
            })
        }
    };
}

/// A view of the whole buffer that is aware of the byte order.
///
/// All reads are positioned and validate `offset + width <= len` before touching memory. The
/// cursor itself is `Copy`; switching byte order for an embedded structure produces a new
/// cursor over the same bytes.
#[derive(Clone, Copy, Debug)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    byte_order: ByteOrder,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8], byte_order: ByteOrder) -> Self {
        ByteCursor { data, byte_order }
    }

    /// The same bytes read in another byte order.
    pub fn with_byte_order(self, byte_order: ByteOrder) -> Self {
        ByteCursor { byte_order, ..self }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow `len` bytes starting at `offset`.
    pub fn read_bytes(&self, offset: usize, len: usize) -> Result<&'a [u8], OutOfRange> {
        let out_of_range = OutOfRange {
            offset,
            len,
            buffer_len: self.data.len(),
        };

        match offset.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(&self.data[offset..end]),
            _ => Err(out_of_range),
        }
    }

    fn read_array<const N: usize>(&self, offset: usize) -> Result<[u8; N], OutOfRange> {
        let mut n = [0u8; N];
        n.copy_from_slice(self.read_bytes(offset, N)?);
        Ok(n)
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8, OutOfRange> {
        Ok(self.read_array::<1>(offset)?[0])
    }

    pub fn read_i8(&self, offset: usize) -> Result<i8, OutOfRange> {
        Ok(self.read_u8(offset)? as i8)
    }

    read_fn!(read_u16, u16);
    read_fn!(read_i16, i16);
    read_fn!(read_u32, u32);
    read_fn!(read_i32, i32);
    read_fn!(read_u64, u64);
    read_fn!(read_i64, i64);
    read_fn!(read_f32, f32);
    read_fn!(read_f64, f64);

    /// Check for `prefix` at `offset` without failing on short buffers.
    pub fn starts_with(&self, offset: usize, prefix: &[u8]) -> bool {
        self.read_bytes(offset, prefix.len())
            .map_or(false, |bytes| bytes == prefix)
    }

    /// First position of `needle` in `[start, start + window)`.
    ///
    /// The search never looks past the buffer and never past the window, so its cost is bounded
    /// by `window` regardless of the input.
    pub fn find(&self, needle: &[u8], start: usize, window: usize) -> Option<usize> {
        if needle.is_empty() || start >= self.data.len() {
            return None;
        }

        let end = start.saturating_add(window).min(self.data.len());
        self.data[start..end]
            .windows(needle.len())
            .position(|w| w == needle)
            .map(|pos| start + pos)
    }
}

#[cfg(test)]
mod tests {
    use super::{ByteCursor, ByteOrder};

    #[test]
    fn reads_respect_byte_order() {
        let data = [0x01, 0x02, 0x03, 0x04];
        let le = ByteCursor::new(&data, ByteOrder::LittleEndian);
        let be = le.with_byte_order(ByteOrder::BigEndian);

        assert_eq!(le.read_u16(0).expect("in range"), 0x0201);
        assert_eq!(be.read_u16(0).expect("in range"), 0x0102);
        assert_eq!(le.read_u32(0).expect("in range"), 0x0403_0201);
        assert_eq!(be.read_u32(0).expect("in range"), 0x0102_0304);
    }

    #[test]
    fn reads_past_the_end_fail() {
        let data = [0u8; 6];
        let cursor = ByteCursor::new(&data, ByteOrder::LittleEndian);

        assert!(cursor.read_u32(2).is_ok());
        let err = cursor.read_u32(3).expect_err("one byte short");
        assert_eq!(err.offset, 3);
        assert_eq!(err.len, 4);
        assert_eq!(err.buffer_len, 6);
        assert!(cursor.read_u64(0).is_err());
        assert!(cursor.read_u8(6).is_err());
    }

    #[test]
    fn offset_overflow_is_out_of_range() {
        let data = [0u8; 4];
        let cursor = ByteCursor::new(&data, ByteOrder::BigEndian);

        assert!(cursor.read_bytes(usize::MAX, 2).is_err());
        assert!(cursor.read_u16(usize::MAX - 1).is_err());
    }

    #[test]
    fn bounded_find() {
        let data = b"xxxxII*\0yyyy";
        let cursor = ByteCursor::new(data, ByteOrder::LittleEndian);

        assert_eq!(cursor.find(b"II*\0", 0, data.len()), Some(4));
        assert_eq!(cursor.find(b"II*\0", 0, 6), None, "match straddles the window");
        assert_eq!(cursor.find(b"II*\0", 5, 100), None);
        assert_eq!(cursor.find(b"II*\0", 100, 100), None);
    }

    #[test]
    fn markers() {
        assert_eq!(ByteOrder::from_marker(*b"II"), Some(ByteOrder::LittleEndian));
        assert_eq!(ByteOrder::from_marker(*b"MM"), Some(ByteOrder::BigEndian));
        assert_eq!(ByteOrder::from_marker(*b"IM"), None);
    }
}
