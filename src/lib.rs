//! Reading of TIFF and EXIF metadata, including vendor MakerNotes
//!
//! EXIF is a TIFF stream: a header, a chain of Image File Directories, and sub-directories for
//! the EXIF, GPS and Interoperability tags. The stream sits in a JPEG APP1 segment, a PNG chunk,
//! or makes up the whole file for TIFF and most raw formats. This crate locates the stream, walks
//! all of its directories, picks the directory of the main image among the previews, resolves
//! vendor MakerNotes and merges everything into one flat [`TagNamespace`].
//!
//! The input is untrusted. Every read is bounds checked and every loop is bounded; a malformed
//! tag or directory is skipped, and only an unusable header fails the read.
//!
//! ```
//! # fn main() -> Result<(), raw_exif::ReadError> {
//! # let data: &[u8] = b"MM\0*\0\0\0\x08\0\x01\x01\x00\0\x03\0\0\0\x01\0\x64\0\0\0\0\0\0";
//! let tags = raw_exif::parse(data)?;
//! assert_eq!(tags.get("ImageWidth").and_then(|v| v.as_i64()), Some(100));
//! assert_eq!(tags.get("File:ExifByteOrder").and_then(|v| v.as_str()), Some("Big-endian (Motorola, MM)"));
//! # Ok(())
//! # }
//! ```
//!
//! # Related Links
//! * <https://web.archive.org/web/20210108073850/https://www.adobe.io/open/standards/TIFF.html> - The TIFF specification
//! * <https://www.cipa.jp/std/documents/download_e.html?DC-008-Translation-2023-E> - EXIF 3.0

pub mod decoder;
mod directory;
mod error;
mod namespace;
pub mod tags;

pub use self::decoder::container::ContainerKind;
pub use self::decoder::ifd::{Entry, Rational, SRational, Value};
pub use self::decoder::stream::{ByteCursor, ByteOrder};
pub use self::directory::Directory;
pub use self::error::{DecodeError, DecodeResult, OutOfRange, ReadError, ReadResult};
pub use self::namespace::{Iter, TagNamespace};
pub use self::tags::{Tag, Type};

/// Read all metadata from a complete file buffer.
///
/// This is [`Decoder::new(data).decode()`](decoder::Decoder) with the default
/// [`Limits`](decoder::Limits).
pub fn parse(data: &[u8]) -> ReadResult<TagNamespace> {
    decoder::Decoder::new(data).decode()
}
