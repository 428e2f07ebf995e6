//! Resolution of vendor MakerNotes
//!
//! A MakerNote tag only declares an offset, and vendors disagree on what that offset is
//! relative to and on what precedes the actual directory. Resolution therefore builds an ordered
//! list of candidate directory locations from the declared offset and the vendor's
//! [`Layout`]s, and accepts the first candidate that looks like a directory of that vendor. For
//! vendors with a private tag band a bounded scan of the stream is the last resort.
//!
//! Resolution never mutates anything: the same buffer and request always give the same tags.

mod pkts;
pub mod vendor;

use std::borrow::Cow;

use tracing::{debug, trace};

pub use self::pkts::{Pkts, PKTS};
use self::vendor::{Layout, OffsetBase, OrderSource, VendorProfile};
use super::codec::Codec;
use super::cycles::ClaimedRanges;
use super::ifd::{read_directory, Value};
use super::stream::{ByteCursor, ByteOrder};
use super::{entry_value, Limits};
use crate::directory::Directory;
use crate::tags::{unknown_name, Tag};

/// Decoder for a vendor format that is not a TIFF directory.
pub trait RecordDecoder {
    /// Bytes that open a block of records.
    fn magic(&self) -> &'static [u8];

    /// Decode all records found in `bytes` into canonical names and values.
    fn decode(&self, bytes: &[u8]) -> Vec<(String, Value)>;
}

/// A MakerNote bearing entry and its surroundings.
#[derive(Clone, Copy, Debug)]
pub struct MakerNoteRequest<'a> {
    /// The `Make` found in the directories decoded so far.
    pub make: Option<&'a str>,
    pub tag: u16,
    /// The raw value field of the entry.
    pub declared_offset: u32,
    /// Byte length of the MakerNote value.
    pub count: u32,
    pub stream_base: usize,
    /// Absolute position of the directory holding the entry.
    pub directory_offset: usize,
    pub byte_order: ByteOrder,
}

/// Tags recovered from one MakerNote.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedMakerNote {
    pub vendor: &'static str,
    /// Group the tags are published under.
    pub group: &'static str,
    /// Absolute position the tags were decoded from.
    pub offset: usize,
    pub tags: Vec<(String, Value)>,
}

/// A location to try as the vendor directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Candidate {
    directory: usize,
    /// What value offsets inside the directory are relative to.
    base: usize,
    byte_order: ByteOrder,
}

/// Profile responsible for a request.
pub fn profile_for(request: &MakerNoteRequest<'_>) -> &'static VendorProfile {
    if request.tag == Tag::IPTCNAA.to_u16() || request.tag == Tag::LeafData.to_u16() {
        return vendor::leaf();
    }

    request
        .make
        .and_then(vendor::for_make)
        .unwrap_or_else(vendor::generic)
}

/// Locate and decode the MakerNote described by `request`.
///
/// `claims` holds the directories of the enclosing stream; candidates inside them are never
/// accepted. Returns `None` when no candidate yields any tag.
pub fn resolve(
    data: &[u8],
    request: &MakerNoteRequest<'_>,
    claims: &ClaimedRanges,
    codec: &Codec,
    limits: &Limits,
) -> Option<ResolvedMakerNote> {
    Resolver {
        cursor: ByteCursor::new(data, request.byte_order),
        request,
        profile: profile_for(request),
        claims,
        codec,
        limits,
    }
    .run()
}

struct Resolver<'a, 'r> {
    cursor: ByteCursor<'a>,
    request: &'r MakerNoteRequest<'r>,
    profile: &'static VendorProfile,
    claims: &'r ClaimedRanges,
    codec: &'r Codec,
    limits: &'r Limits,
}

impl Resolver<'_, '_> {
    fn run(&self) -> Option<ResolvedMakerNote> {
        let request = self.request;
        let declared = usize::try_from(request.declared_offset).ok()?;

        let mut positions: Vec<usize> = Vec::with_capacity(3);
        for position in [
            request.stream_base.checked_add(declared),
            Some(declared),
            request.directory_offset.checked_add(declared),
        ]
        .into_iter()
        .flatten()
        {
            if !positions.contains(&position) {
                positions.push(position);
            }
        }

        for &position in &positions {
            if let Some(tags) = self.records_at(position) {
                return self.finish(position, tags);
            }

            for candidate in self.candidates_at(position) {
                if let Some(directory) = self.plausible(candidate) {
                    trace!(vendor = self.profile.name, offset = candidate.directory, "MakerNote directory found");
                    return self.finish(candidate.directory, self.decode(candidate, &directory));
                }
            }
        }

        if self.profile.band.is_some() {
            if let Some((candidate, directory)) = self.scan() {
                debug!(
                    vendor = self.profile.name,
                    declared = request.declared_offset,
                    found = candidate.directory,
                    "MakerNote located by scan"
                );
                return self.finish(candidate.directory, self.decode(candidate, &directory));
            }
        }

        debug!(vendor = self.profile.name, declared = request.declared_offset, "MakerNote not resolved");
        None
    }

    fn finish(&self, offset: usize, tags: Vec<(String, Value)>) -> Option<ResolvedMakerNote> {
        if tags.is_empty() {
            return None;
        }

        Some(ResolvedMakerNote {
            vendor: self.profile.name,
            group: self.profile.group,
            offset,
            tags,
        })
    }

    /// Record blocks within the declared value length at `position`.
    fn records_at(&self, position: usize) -> Option<Vec<(String, Value)>> {
        let records = self.profile.records?;
        let available = self.cursor.len().checked_sub(position)?;
        let len = usize::try_from(self.request.count).ok()?.min(available);
        let bytes = self.cursor.read_bytes(position, len).ok()?;

        self.cursor.find(records.magic(), position, len)?;
        let tags = records.decode(bytes);
        (!tags.is_empty()).then_some(tags)
    }

    /// Candidates derived from the vendor layouts whose signature is present, then the bare
    /// position itself.
    fn candidates_at(&self, position: usize) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = self
            .profile
            .layouts
            .iter()
            .filter(|layout| self.cursor.starts_with(position, layout.signature))
            .filter_map(|layout| self.layout_candidate(position, layout))
            .collect();

        candidates.push(Candidate {
            directory: position,
            base: self.request.stream_base,
            byte_order: self.request.byte_order,
        });
        candidates
    }

    fn layout_candidate(&self, start: usize, layout: &Layout) -> Option<Candidate> {
        let marker_order = |at: usize| {
            let marker = self.cursor.read_bytes(at, 2).ok()?;
            ByteOrder::from_marker([marker[0], marker[1]])
        };

        let byte_order = match layout.byte_order {
            OrderSource::Stream => self.request.byte_order,
            OrderSource::Fixed(order) => order,
            OrderSource::Marker(at) => start
                .checked_add(at)
                .and_then(marker_order)
                .unwrap_or(self.request.byte_order),
        };

        let skipped = start.checked_add(layout.skip)?;
        match layout.base {
            OffsetBase::Stream => Some(Candidate {
                directory: skipped,
                base: self.request.stream_base,
                byte_order,
            }),
            OffsetBase::MakerNote => Some(Candidate {
                directory: skipped,
                base: start,
                byte_order,
            }),
            OffsetBase::EmbeddedTiff(at) => {
                let header = start.checked_add(at)?;
                let byte_order = marker_order(header)?;
                let cursor = self.cursor.with_byte_order(byte_order);
                if cursor.read_u16(header + 2).ok()? != 42 {
                    return None;
                }

                let first = usize::try_from(cursor.read_u32(header + 4).ok()?).ok()?;
                Some(Candidate {
                    directory: header.checked_add(first)?,
                    base: header,
                    byte_order,
                })
            }
            OffsetBase::OffsetField(at) => {
                let field = self.cursor.with_byte_order(ByteOrder::LittleEndian);
                let offset = usize::try_from(field.read_u32(start.checked_add(at)?).ok()?).ok()?;
                Some(Candidate {
                    directory: start.checked_add(offset)?,
                    base: start,
                    byte_order,
                })
            }
        }
    }

    /// Parse `candidate` and accept it if it is a structurally sound directory of this vendor.
    fn plausible(&self, candidate: Candidate) -> Option<Directory> {
        if self.claims.contains(candidate.directory) {
            trace!(offset = candidate.directory, "MakerNote candidate inside a parsed directory");
            return None;
        }

        let cursor = self.cursor.with_byte_order(candidate.byte_order);
        let directory =
            read_directory(&cursor, candidate.directory, self.limits.makernote_max_entries).ok()?;

        let range = directory.byte_range();
        if self.claims.overlaps(range.start, range.len()) {
            return None;
        }

        // Mostly recognizable field types, a few odd entries are common.
        let typed = directory.iter().filter(|e| e.field_type().is_some()).count();
        if typed * 4 < directory.len() * 3 {
            return None;
        }

        if self.profile.band.is_some() && self.band_hits(&directory) == 0 {
            return None;
        }

        Some(directory)
    }

    fn band_hits(&self, directory: &Directory) -> usize {
        directory
            .iter()
            .filter(|e| self.profile.in_band(e.tag()))
            .count()
    }

    /// Cheap test on the first entries before a full parse.
    fn worth_parsing(&self, cursor: &ByteCursor<'_>, position: usize) -> bool {
        const PROBE: usize = 24;

        let Ok(count) = cursor.read_u16(position) else {
            return false;
        };
        let count = usize::from(count);
        if count == 0 || count > self.limits.makernote_max_entries {
            return false;
        }

        (0..count.min(PROBE)).any(|i| {
            let entry = position + 2 + i * 12;
            cursor
                .read_u16(entry)
                .map_or(false, |tag| self.profile.in_band(tag))
        })
    }

    /// Scan the stream at a fixed stride for the directory with the most band tags.
    fn scan(&self) -> Option<(Candidate, Directory)> {
        let start = self.request.stream_base;
        let end = start
            .saturating_add(self.limits.makernote_scan_window)
            .min(self.cursor.len());
        let stride = self.limits.makernote_scan_stride.max(1);

        let mut best: Option<(Candidate, Directory, usize)> = None;
        for position in (start..end).step_by(stride) {
            if !self.worth_parsing(&self.cursor, position) {
                continue;
            }

            let candidate = Candidate {
                directory: position,
                base: self.request.stream_base,
                byte_order: self.request.byte_order,
            };
            let Some(directory) = self.plausible(candidate) else {
                continue;
            };

            let hits = self.band_hits(&directory);
            if best.as_ref().map_or(true, |(_, _, most)| hits > *most) {
                best = Some((candidate, directory, hits));
            }
        }

        best.map(|(candidate, directory, _)| (candidate, directory))
    }

    fn decode(&self, candidate: Candidate, directory: &Directory) -> Vec<(String, Value)> {
        let cursor = self.cursor.with_byte_order(candidate.byte_order);
        let codec = Codec {
            byte_order: candidate.byte_order,
            ..*self.codec
        };

        let mut tags = Vec::with_capacity(directory.len());
        for entry in directory.iter() {
            let name = match (self.profile.names)(entry.tag()) {
                Some(name) => Cow::Borrowed(name),
                None => Cow::Owned(unknown_name(entry.tag())),
            };

            match entry_value(&cursor, entry, candidate.base, &codec, self.claims, self.limits) {
                Ok(Some(value)) => tags.push((name.into_owned(), value)),
                Ok(None) => {}
                Err(err) => {
                    debug!(vendor = self.profile.name, tag = entry.tag(), error = %err, "skipping MakerNote tag");
                }
            }
        }

        tags
    }
}
