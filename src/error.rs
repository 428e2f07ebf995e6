use std::error::Error;
use std::fmt;

use quick_error::quick_error;

use crate::decoder::container::ContainerKind;

/// A read that would cross the end of the buffer.
///
/// This is the only failure [`ByteCursor`](crate::ByteCursor) produces. Every other layer
/// treats it as "this candidate or tag is invalid" and moves on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OutOfRange {
    /// First byte of the attempted read.
    pub offset: usize,
    /// Number of bytes requested.
    pub len: usize,
    /// Length of the buffer the read was attempted on.
    pub buffer_len: usize,
}

impl fmt::Display for OutOfRange {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            fmt,
            "read of {} bytes at offset {} exceeds buffer of {} bytes",
            self.len, self.offset, self.buffer_len
        )
    }
}

impl Error for OutOfRange {}

quick_error! {
    /// Errors that abort a whole read.
    ///
    /// Anything below the level of the container and TIFF header is recovered internally and
    /// reported through `tracing` instead.
    #[derive(Debug, Clone, PartialEq)]
    pub enum ReadError {
        /// No known container signature at the start of the buffer.
        UnsupportedFormat {
            display("unrecognized container signature")
        }
        /// The container was recognized but holds no EXIF payload.
        NoExifData(kind: ContainerKind) {
            display("{} container carries no EXIF payload", kind.name())
        }
        /// The buffer ends before the mandatory TIFF header does.
        TruncatedHeader { needed: usize, actual: usize } {
            display("TIFF header needs {} bytes but only {} are available", needed, actual)
        }
        InvalidByteOrder(marker: [u8; 2]) {
            display("byte order marker {:02X?} is neither II nor MM", marker)
        }
        InvalidMagic(magic: u16) {
            display("TIFF magic number {:#06x} is not recognized", magic)
        }
    }
}

quick_error! {
    /// Errors scoped to a single tag, directory or MakerNote candidate.
    ///
    /// These never escape [`parse`](crate::parse); the offending item is skipped.
    #[derive(Debug, Clone, PartialEq)]
    pub enum DecodeError {
        OutOfRange(err: OutOfRange) {
            from()
            display("{}", err)
            source(err)
        }
        UnknownType(code: u16) {
            display("unknown field type {}", code)
        }
        LimitsExceeded {
            display("value exceeds the configured decoding limits")
        }
        /// The offset falls inside a directory that was already parsed.
        ClaimedRange(offset: usize) {
            display("offset {} lies inside an already parsed directory", offset)
        }
        InvalidDirectory(reason: &'static str) {
            display("invalid directory: {}", reason)
        }
        CycleInOffsets {
            display("directory chain revisits an offset")
        }
    }
}

/// Result of a complete read.
pub type ReadResult<T> = Result<T, ReadError>;

/// Result of decoding one item inside a TIFF stream.
pub type DecodeResult<T> = Result<T, DecodeError>;
