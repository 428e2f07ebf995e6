//! Synthesis of small TIFF streams and their containers.
#![allow(dead_code)]

use raw_exif::ByteOrder;

/// One directory entry to be written.
#[derive(Clone, Debug)]
pub struct Field {
    tag: u16,
    type_: u16,
    count: u32,
    value: FieldValue,
}

#[derive(Clone, Debug)]
enum FieldValue {
    /// Value bytes in stream byte order, placed inline or after the directory.
    Data(Vec<u8>),
    /// A value field written as is, for offsets the test controls.
    Offset(u32),
}

/// A TIFF stream under construction.
///
/// Directories are appended at the end of the stream with their out-of-line values right after
/// them. Offsets are relative to the start of the stream, like in a real file.
pub struct Stream {
    order: ByteOrder,
    bytes: Vec<u8>,
}

impl Stream {
    pub fn new(order: ByteOrder) -> Self {
        Self::with_magic(order, 42)
    }

    pub fn le() -> Self {
        Self::new(ByteOrder::LittleEndian)
    }

    pub fn be() -> Self {
        Self::new(ByteOrder::BigEndian)
    }

    /// A stream with a private magic number, e.g. `0x4F52` for ORF or `0x55` for RW2.
    pub fn with_magic(order: ByteOrder, magic: u16) -> Self {
        let mut stream = Stream {
            order,
            bytes: match order {
                ByteOrder::LittleEndian => b"II".to_vec(),
                ByteOrder::BigEndian => b"MM".to_vec(),
            },
        };
        let magic = stream.u16(magic);
        stream.bytes.extend_from_slice(&magic);
        let first = stream.u32(8);
        stream.bytes.extend_from_slice(&first);
        stream
    }

    pub fn u16(&self, v: u16) -> [u8; 2] {
        match self.order {
            ByteOrder::LittleEndian => v.to_le_bytes(),
            ByteOrder::BigEndian => v.to_be_bytes(),
        }
    }

    pub fn u32(&self, v: u32) -> [u8; 4] {
        match self.order {
            ByteOrder::LittleEndian => v.to_le_bytes(),
            ByteOrder::BigEndian => v.to_be_bytes(),
        }
    }

    pub fn len(&self) -> u32 {
        self.bytes.len() as u32
    }

    pub fn short(&self, tag: u16, values: &[u16]) -> Field {
        let data = values.iter().flat_map(|&v| self.u16(v)).collect();
        Field::data(tag, 3, values.len() as u32, data)
    }

    pub fn long(&self, tag: u16, values: &[u32]) -> Field {
        let data = values.iter().flat_map(|&v| self.u32(v)).collect();
        Field::data(tag, 4, values.len() as u32, data)
    }

    /// An ASCII value with its terminating NUL.
    pub fn ascii(&self, tag: u16, text: &str) -> Field {
        let mut data = text.as_bytes().to_vec();
        data.push(0);
        Field::data(tag, 2, data.len() as u32, data)
    }

    pub fn rational(&self, tag: u16, values: &[(u32, u32)]) -> Field {
        let data = values
            .iter()
            .flat_map(|&(n, d)| self.u32(n).into_iter().chain(self.u32(d)))
            .collect();
        Field::data(tag, 5, values.len() as u32, data)
    }

    pub fn bytes(&self, tag: u16, values: &[u8]) -> Field {
        Field::data(tag, 1, values.len() as u32, values.to_vec())
    }

    pub fn undefined(&self, tag: u16, values: &[u8]) -> Field {
        Field::data(tag, 7, values.len() as u32, values.to_vec())
    }

    /// A sub-directory pointer.
    pub fn pointer(&self, tag: u16, offset: u32) -> Field {
        self.long(tag, &[offset])
    }

    /// An entry whose value field holds `offset` no matter the size of the value.
    pub fn at_offset(&self, tag: u16, type_: u16, count: u32, offset: u32) -> Field {
        Field {
            tag,
            type_,
            count,
            value: FieldValue::Offset(offset),
        }
    }

    /// Append zero bytes up to `len`.
    pub fn pad_to(&mut self, len: u32) {
        assert!(len >= self.len(), "cannot pad backwards");
        self.bytes.resize(len as usize, 0);
    }

    /// Append raw bytes, returning their offset.
    pub fn append(&mut self, data: &[u8]) -> u32 {
        let at = self.len();
        self.bytes.extend_from_slice(data);
        at
    }

    pub fn set_first_ifd(&mut self, offset: u32) {
        let v = self.u32(offset);
        self.bytes[4..8].copy_from_slice(&v);
    }

    /// Point the next-IFD field of the directory at `ifd` to `next`.
    pub fn set_next(&mut self, ifd: u32, next: u32) {
        let ifd = ifd as usize;
        let count = match self.order {
            ByteOrder::LittleEndian => u16::from_le_bytes([self.bytes[ifd], self.bytes[ifd + 1]]),
            ByteOrder::BigEndian => u16::from_be_bytes([self.bytes[ifd], self.bytes[ifd + 1]]),
        };
        let at = ifd + 2 + 12 * usize::from(count);
        let v = self.u32(next);
        self.bytes[at..at + 4].copy_from_slice(&v);
    }

    /// Append a directory on an even offset and return that offset.
    pub fn ifd(&mut self, fields: &[Field], next: u32) -> u32 {
        if self.bytes.len() % 2 == 1 {
            self.bytes.push(0);
        }

        let offset = self.len();
        let mut data_at = offset + 2 + 12 * fields.len() as u32 + 4;
        let mut table = self.u16(fields.len() as u16).to_vec();
        let mut values = Vec::new();

        for field in fields {
            table.extend_from_slice(&self.u16(field.tag));
            table.extend_from_slice(&self.u16(field.type_));
            table.extend_from_slice(&self.u32(field.count));
            match &field.value {
                FieldValue::Offset(offset) => table.extend_from_slice(&self.u32(*offset)),
                FieldValue::Data(data) if data.len() <= 4 => {
                    let mut inline = [0u8; 4];
                    inline[..data.len()].copy_from_slice(data);
                    table.extend_from_slice(&inline);
                }
                FieldValue::Data(data) => {
                    table.extend_from_slice(&self.u32(data_at));
                    values.extend_from_slice(data);
                    if data.len() % 2 == 1 {
                        values.push(0);
                    }
                    data_at = offset + 2 + 12 * fields.len() as u32 + 4 + values.len() as u32;
                }
            }
        }

        table.extend_from_slice(&self.u32(next));
        self.bytes.extend_from_slice(&table);
        self.bytes.extend_from_slice(&values);
        offset
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl Field {
    fn data(tag: u16, type_: u16, count: u32, data: Vec<u8>) -> Self {
        Field {
            tag,
            type_,
            count,
            value: FieldValue::Data(data),
        }
    }
}

/// A JPEG with the stream in an EXIF APP1 segment.
pub fn jpeg(tiff: &[u8]) -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8];
    // An APP0 segment in front, like JFIF files have.
    out.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x07]);
    out.extend_from_slice(b"JFIF\0");
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(tiff);
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}

fn png_chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(kind);
    hasher.update(data);
    out.extend_from_slice(&hasher.finalize().to_be_bytes());
}

/// A 1×1 PNG with the stream in an `eXIf` chunk.
pub fn png(tiff: &[u8]) -> Vec<u8> {
    let mut out = b"\x89PNG\r\n\x1a\n".to_vec();
    png_chunk(&mut out, b"IHDR", &[0, 0, 0, 1, 0, 0, 0, 1, 8, 0, 0, 0, 0]);
    png_chunk(&mut out, b"eXIf", tiff);
    png_chunk(&mut out, b"IEND", &[]);
    out
}

/// A PNG with the stream hex dumped in an uncompressed `tEXt` raw profile.
pub fn png_raw_profile(tiff: &[u8]) -> Vec<u8> {
    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(tiff);

    let mut text = b"Raw profile type exif\0\nexif\n".to_vec();
    text.extend_from_slice(format!("{:8}\n", payload.len()).as_bytes());
    for line in payload.chunks(36) {
        text.extend(line.iter().flat_map(|b| format!("{:02x}", b).into_bytes()));
        text.push(b'\n');
    }

    let mut out = b"\x89PNG\r\n\x1a\n".to_vec();
    png_chunk(&mut out, b"IHDR", &[0, 0, 0, 1, 0, 0, 0, 1, 8, 0, 0, 0, 0]);
    png_chunk(&mut out, b"tEXt", &text);
    png_chunk(&mut out, b"IEND", &[]);
    out
}

/// A native TIFF with one directory holding `fields`.
pub fn single_ifd(order: ByteOrder, fields: impl FnOnce(&Stream) -> Vec<Field>) -> Vec<u8> {
    let mut stream = Stream::new(order);
    let fields = fields(&stream);
    stream.ifd(&fields, 0);
    stream.into_bytes()
}
