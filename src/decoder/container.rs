//! Container detection and location of the embedded TIFF stream
//!
//! # Related Links
//! * <https://www.w3.org/TR/png-3/#eXIf> - The PNG eXIf chunk
//! * JPEG: ITU T.81 Annex B, and EXIF 2.3 section 4.7 for the APP1 layout

use std::borrow::Cow;
use std::ops::Range;

use tracing::debug;

use super::stream::{ByteCursor, ByteOrder};
use super::Limits;
use crate::error::{ReadError, ReadResult};

/// The kind of file a TIFF stream was found in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ContainerKind {
    Jpeg,
    Png,
    /// A native TIFF file, which includes most raw formats (DNG, NEF, CR2, ...).
    Tiff,
    /// Olympus raw, a TIFF with a private magic number.
    Orf,
    /// Panasonic raw, a TIFF with a private magic number.
    Rw2,
    /// Fujifilm raw, an ASCII header followed by an embedded JPEG.
    Raf,
    /// A bare `Exif\0\0` APP1 payload.
    ExifBlob,
}

impl ContainerKind {
    pub fn name(&self) -> &'static str {
        match self {
            ContainerKind::Jpeg => "JPEG",
            ContainerKind::Png => "PNG",
            ContainerKind::Tiff => "TIFF",
            ContainerKind::Orf => "ORF",
            ContainerKind::Rw2 => "RW2",
            ContainerKind::Raf => "RAF",
            ContainerKind::ExifBlob => "EXIF",
        }
    }
}

/// The located TIFF stream.
#[derive(Clone, Debug)]
pub struct Container<'a> {
    pub kind: ContainerKind,
    /// The buffer the stream lives in: the file itself, or a decompressed copy.
    pub payload: Cow<'a, [u8]>,
    /// Position of the TIFF header in `payload`.
    pub stream_start: usize,
    /// Position of a second TIFF header carrying secondary metadata, if any.
    pub secondary_start: Option<usize>,
}

impl<'a> Container<'a> {
    fn borrowed(kind: ContainerKind, data: &'a [u8], stream_start: usize) -> Self {
        Container {
            kind,
            payload: Cow::Borrowed(data),
            stream_start,
            secondary_start: None,
        }
    }
}

mod marker {
    // The first byte of a marker.
    pub const P: u8 = 0xff;
    // Marker codes.
    pub const Z: u8 = 0x00; // Not a marker but a byte stuffing.
    pub const TEM: u8 = 0x01;
    pub const RST0: u8 = 0xd0;
    pub const RST7: u8 = 0xd7;
    pub const SOI: u8 = 0xd8;
    pub const EOI: u8 = 0xd9;
    pub const SOS: u8 = 0xda;
    pub const APP1: u8 = 0xe1;
}

const JPEG_SIG: [u8; 2] = [marker::P, marker::SOI];
const PNG_SIG: [u8; 8] = *b"\x89PNG\r\n\x1a\n";
const RAF_SIG: &[u8] = b"FUJIFILM";
// Exif identifier code "Exif\0\0". [EXIF23 4.7.2]
const EXIF_ID: [u8; 6] = *b"Exif\0\0";

const TIFF_LE: [u8; 4] = *b"II*\0";
const TIFF_BE: [u8; 4] = *b"MM\0*";

/// Position of the big-endian JPEG offset in a RAF header.
const RAF_JPEG_OFFSET: usize = 84;
/// A secondary TIFF header this close to the start is the primary one.
const SECONDARY_MIN_OFFSET: usize = 100;

/// Identify the container and locate its TIFF stream.
pub fn detect<'a>(data: &'a [u8], limits: &Limits) -> ReadResult<Container<'a>> {
    let cursor = ByteCursor::new(data, ByteOrder::BigEndian);

    if cursor.starts_with(0, &JPEG_SIG) {
        return jpeg_stream(&cursor, 0)
            .map(|stream| Container::borrowed(ContainerKind::Jpeg, &data[..stream.end], stream.start))
            .ok_or(ReadError::NoExifData(ContainerKind::Jpeg));
    }

    if let Some(kind) = tiff_kind(&cursor) {
        let mut container = Container::borrowed(kind, data, 0);
        if kind == ContainerKind::Rw2 {
            let from = SECONDARY_MIN_OFFSET + 1;
            let window = limits.embedded_tiff_scan_window.saturating_sub(from);
            container.secondary_start = embedded_tiff(&cursor, from, window);
        }
        return Ok(container);
    }

    if cursor.starts_with(0, &PNG_SIG) {
        return png_stream(data);
    }

    if cursor.starts_with(0, RAF_SIG) {
        return raf_stream(&cursor, limits)
            .map(|stream| Container::borrowed(ContainerKind::Raf, &data[..stream.end], stream.start));
    }

    if cursor.starts_with(0, &EXIF_ID) {
        return Ok(Container::borrowed(ContainerKind::ExifBlob, data, EXIF_ID.len()));
    }

    Err(ReadError::UnsupportedFormat)
}

fn tiff_kind(cursor: &ByteCursor<'_>) -> Option<ContainerKind> {
    let head = cursor.read_bytes(0, 4).ok()?;
    match head {
        b"II*\0" | b"MM\0*" => Some(ContainerKind::Tiff),
        b"IIRO" | b"IIRS" | b"MMOR" => Some(ContainerKind::Orf),
        b"IIU\0" | b"MM\0U" => Some(ContainerKind::Rw2),
        _ => None,
    }
}

/// First ordinary TIFF header in `[start, start + window)`.
fn embedded_tiff(cursor: &ByteCursor<'_>, start: usize, window: usize) -> Option<usize> {
    let le = cursor.find(&TIFF_LE, start, window);
    let be = cursor.find(&TIFF_BE, start, window);
    match (le, be) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Walk JPEG marker segments from the SOI at `soi` to the first EXIF APP1 segment.
///
/// Returns the TIFF stream inside that segment: from the TIFF header to the end of the segment.
fn jpeg_stream(cursor: &ByteCursor<'_>, soi: usize) -> Option<Range<usize>> {
    let mut pos = soi + JPEG_SIG.len();

    loop {
        // Find a marker prefix. Discard non-ff bytes, which appear if we are out of sync.
        while cursor.read_u8(pos).ok()? != marker::P {
            pos += 1;
        }

        // Fill bytes may precede the marker code.
        let mut code = marker::P;
        while code == marker::P {
            pos += 1;
            code = cursor.read_u8(pos).ok()?;
        }
        pos += 1;

        match code {
            marker::Z | marker::TEM | marker::RST0..=marker::RST7 => continue,
            marker::SOI => {
                debug!(offset = pos, "unexpected SOI in JPEG marker stream");
                return None;
            }
            marker::EOI | marker::SOS => return None,
            _ => {}
        }

        let seglen = usize::from(cursor.read_u16(pos).ok()?);
        if seglen < 2 {
            debug!(offset = pos, "invalid JPEG segment length");
            return None;
        }

        let payload = pos + 2;
        if code == marker::APP1 && cursor.starts_with(payload, &EXIF_ID) {
            // Offsets in the stream must not reach into the following segments.
            let end = pos.saturating_add(seglen).min(cursor.len());
            return Some(payload + EXIF_ID.len()..end);
        }

        pos += seglen;
    }
}

fn png_stream(data: &[u8]) -> ReadResult<Container<'_>> {
    let cursor = ByteCursor::new(data, ByteOrder::BigEndian);
    let mut pos = PNG_SIG.len();
    let mut raw_profile = None;

    // Each chunk is a length, a type, the data and a CRC.
    while let (Ok(len), Ok(kind)) = (cursor.read_u32(pos), cursor.read_bytes(pos + 4, 4)) {
        let start = pos + 8;
        let Ok(len) = usize::try_from(len) else {
            break;
        };
        let Ok(chunk) = cursor.read_bytes(start, len) else {
            debug!(offset = pos, "truncated PNG chunk");
            break;
        };

        match kind {
            b"eXIf" => return Ok(Container::borrowed(ContainerKind::Png, data, start)),
            b"zTXt" | b"tEXt" if raw_profile.is_none() => {
                raw_profile = raw_profile_exif(kind == b"zTXt", chunk);
            }
            b"IEND" => break,
            _ => {}
        }

        pos = start.saturating_add(len).saturating_add(4);
    }

    match raw_profile {
        Some(payload) => Ok(Container {
            kind: ContainerKind::Png,
            payload: Cow::Owned(payload),
            stream_start: 0,
            secondary_start: None,
        }),
        None => Err(ReadError::NoExifData(ContainerKind::Png)),
    }
}

/// The TIFF stream of an ImageMagick style `Raw profile type exif` text chunk.
///
/// The text is `\n<name>\n<length>\n<hex digits with line breaks>`.
fn raw_profile_exif(compressed: bool, chunk: &[u8]) -> Option<Vec<u8>> {
    let keyword_end = chunk.iter().position(|&b| b == 0)?;
    let keyword = &chunk[..keyword_end];
    if keyword != b"Raw profile type exif" && keyword != b"Raw profile type APP1" {
        return None;
    }

    let text: Cow<'_, [u8]> = if compressed {
        // Compression method byte, zero for zlib.
        if chunk.get(keyword_end + 1) != Some(&0) {
            return None;
        }
        Cow::Owned(inflate(chunk.get(keyword_end + 2..)?)?)
    } else {
        Cow::Borrowed(chunk.get(keyword_end + 1..)?)
    };

    let mut fields = text
        .split(|&b| b == b'\n')
        .filter(|line| !line.is_empty());
    let _name = fields.next()?;
    let declared: usize = std::str::from_utf8(fields.next()?).ok()?.trim().parse().ok()?;
    let digits: Vec<u8> = fields
        .flat_map(|line| line.iter().copied())
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    let mut payload = match hex::decode(&digits) {
        Ok(payload) => payload,
        Err(err) => {
            debug!(error = %err, "malformed raw profile hex dump");
            return None;
        }
    };
    payload.truncate(declared);

    if payload.starts_with(&EXIF_ID) {
        payload = payload.split_off(EXIF_ID.len());
    }

    Some(payload)
}

#[cfg(feature = "deflate")]
fn inflate(data: &[u8]) -> Option<Vec<u8>> {
    use std::io::Read;

    let mut out = Vec::new();
    match flate2::read::ZlibDecoder::new(data).read_to_end(&mut out) {
        Ok(_) => Some(out),
        Err(err) => {
            debug!(error = %err, "could not inflate PNG text chunk");
            None
        }
    }
}

#[cfg(not(feature = "deflate"))]
fn inflate(_: &[u8]) -> Option<Vec<u8>> {
    debug!("compressed PNG text chunks need the deflate feature");
    None
}

/// A RAF file names the offset of its embedded JPEG in the header. Older or unusual files are
/// searched for a bare TIFF header within `limits.embedded_tiff_scan_window` bytes instead.
fn raf_stream(cursor: &ByteCursor<'_>, limits: &Limits) -> ReadResult<Range<usize>> {
    let jpeg = cursor
        .read_u32(RAF_JPEG_OFFSET)
        .ok()
        .and_then(|offset| usize::try_from(offset).ok())
        .filter(|&offset| cursor.starts_with(offset, &JPEG_SIG));

    if let Some(stream) = jpeg.and_then(|soi| jpeg_stream(cursor, soi)) {
        return Ok(stream);
    }

    embedded_tiff(cursor, RAF_SIG.len(), limits.embedded_tiff_scan_window)
        .map(|start| start..cursor.len())
        .ok_or(ReadError::NoExifData(ContainerKind::Raf))
}
