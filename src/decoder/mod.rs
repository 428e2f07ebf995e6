use std::borrow::Cow;

use tracing::debug;

use self::codec::{announces_utf8, Codec};
use self::container::ContainerKind;
use self::cycles::{ChainGuard, ClaimedRanges};
use self::ifd::{parse_directory, stream_offset, walk_chain, Entry, Value};
use self::makernote::vendor::{self, VendorProfile};
use self::makernote::{MakerNoteRequest, ResolvedMakerNote};
use self::selector::{classify_with, ClassifiedDirectory, DirectoryRef, Selection};
use self::stream::{ByteCursor, ByteOrder};
use crate::directory::Directory;
use crate::error::{DecodeError, DecodeResult, ReadError, ReadResult};
use crate::namespace::TagNamespace;
use crate::tags::{classify, Tag, TagClass, TagGroup};

pub mod codec;
pub mod container;
pub mod cycles;
pub mod ifd;
pub mod makernote;
pub mod selector;
pub mod stream;

/// Length of the TIFF header: byte order marker, magic number and first IFD offset.
const HEADER_LEN: usize = 8;

/// Magic numbers accepted after the byte order marker.
const MAGIC_NUMBERS: [u16; 4] = [
    42,
    // Olympus ORF
    0x4F52,
    0x5352,
    // Panasonic RW2
    0x0055,
];

/// Decoding limits
///
/// Every ceiling bounds the work done on garbage or adversarial input. Exceeding one never fails
/// the whole read, the affected directory, value or MakerNote is skipped instead.
#[derive(Clone, Debug)]
pub struct Limits {
    /// The maximum number of directories followed along the IFD chain, the default is 10.
    pub max_directories: usize,
    /// The maximum number of EXIF, GPS, Interoperability and SubIFD directories per stream, the
    /// default is 32.
    pub max_sub_directories: usize,
    /// Directories claiming more entries are rejected, the default is 1000.
    pub max_entries: usize,
    /// The maximum size of any ifd value in bytes, the default is
    /// 1MiB.
    pub ifd_value_size: usize,
    /// Entry count ceiling for MakerNote directory candidates, the default is 250.
    pub makernote_max_entries: usize,
    /// Bytes of the stream searched when a MakerNote is not found at its declared offset, the
    /// default is 512KiB.
    pub makernote_scan_window: usize,
    /// Step between positions tested by the MakerNote scan, the default is 2.
    pub makernote_scan_stride: usize,
    /// Bytes searched for an embedded TIFF header, the secondary one of RW2 files or the stream of
    /// RAF files without a JPEG offset, the default is 5000.
    pub embedded_tiff_scan_window: usize,
    /// BYTE runs longer than this are kept as raw bytes, the default is 64.
    pub binary_threshold: usize,
    /// The purpose of this is to prevent all the fields of the struct from
    /// being public, as this would make adding new fields a major version
    /// bump.
    _non_exhaustive: (),
}

impl Limits {
    /// A configuration that does not impose any limits.
    ///
    /// Scans remain bounded by the length of the buffer and chains by cycle detection, so this is
    /// safe to use, just slow on hostile input.
    pub fn unlimited() -> Limits {
        Limits {
            max_directories: usize::MAX,
            max_sub_directories: usize::MAX,
            max_entries: usize::from(u16::MAX),
            ifd_value_size: usize::MAX,
            makernote_max_entries: usize::from(u16::MAX),
            makernote_scan_window: usize::MAX,
            makernote_scan_stride: 1,
            embedded_tiff_scan_window: usize::MAX,
            binary_threshold: usize::MAX,
            _non_exhaustive: (),
        }
    }
}

impl Default for Limits {
    fn default() -> Limits {
        Limits {
            max_directories: 10,
            max_sub_directories: 32,
            max_entries: 1000,
            ifd_value_size: 1024 * 1024,
            makernote_max_entries: 250,
            makernote_scan_window: 512 * 1024,
            makernote_scan_stride: 2,
            embedded_tiff_scan_window: 5000,
            binary_threshold: codec::DEFAULT_BINARY_THRESHOLD,
            _non_exhaustive: (),
        }
    }
}

/// The metadata decoder for one file buffer.
///
/// ```
/// # fn main() -> Result<(), raw_exif::ReadError> {
/// # let data = b"II*\0\x08\0\0\0\x01\0\x12\x01\x03\0\x01\0\0\0\x06\0\0\0\0\0\0\0";
/// use raw_exif::decoder::{Decoder, Limits};
///
/// let tags = Decoder::new(data).with_limits(Limits::default()).decode()?;
/// assert_eq!(tags.get("Orientation").and_then(|v| v.as_i64()), Some(6));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Decoder<'a> {
    data: &'a [u8],
    limits: Limits,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Decoder<'a> {
        Decoder {
            data,
            limits: Default::default(),
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Decoder<'a> {
        self.limits = limits;
        self
    }

    /// Detect the container, decode every reachable directory and merge the tags.
    ///
    /// Only a missing or unusable TIFF header is an error. Everything below the header is decoded
    /// on a best-effort basis.
    pub fn decode(self) -> ReadResult<TagNamespace> {
        let container = container::detect(self.data, &self.limits)?;
        let payload: &[u8] = &container.payload;

        let mut namespace = decode_stream(payload, container.stream_start, container.kind, &self.limits)?;

        if let Some(start) = container.secondary_start {
            match decode_stream(payload, start, container.kind, &self.limits) {
                Ok(secondary) => namespace.overlay_secondary(secondary),
                Err(err) => debug!(offset = start, error = %err, "skipping secondary TIFF stream"),
            }
        }

        Ok(namespace)
    }
}

/// Read the TIFF header at `start`, returning the byte order and the first IFD offset.
fn read_header(data: &[u8], start: usize) -> ReadResult<(ByteOrder, u32)> {
    let actual = data.len().saturating_sub(start);
    if actual < HEADER_LEN {
        return Err(ReadError::TruncatedHeader {
            needed: HEADER_LEN,
            actual,
        });
    }

    let marker = [data[start], data[start + 1]];
    let byte_order = ByteOrder::from_marker(marker).ok_or(ReadError::InvalidByteOrder(marker))?;

    let cursor = ByteCursor::new(data, byte_order);
    let truncated = |_| ReadError::TruncatedHeader {
        needed: HEADER_LEN,
        actual,
    };
    let magic = cursor.read_u16(start + 2).map_err(truncated)?;
    if !MAGIC_NUMBERS.contains(&magic) {
        return Err(ReadError::InvalidMagic(magic));
    }

    let first = cursor.read_u32(start + 4).map_err(truncated)?;
    Ok((byte_order, first))
}

/// Decode the TIFF stream whose header is at `start`.
fn decode_stream(
    data: &[u8],
    start: usize,
    kind: ContainerKind,
    limits: &Limits,
) -> ReadResult<TagNamespace> {
    let (byte_order, first) = read_header(data, start)?;

    let mut codec = Codec::new(byte_order);
    codec.binary_threshold = limits.binary_threshold;

    let stream = StreamDecoder {
        cursor: ByteCursor::new(data, byte_order),
        base: start,
        claims: ClaimedRanges::new(),
        codec,
        limits,
        namespace: TagNamespace::new(byte_order, kind),
        pending: Vec::new(),
        private_band: None,
    };

    Ok(stream.run(first))
}

/// Decode the value of `entry`, reading out-of-line values at `base + offset`.
///
/// Values that overlap an already parsed directory are rejected: the offset is garbage.
pub(crate) fn entry_value(
    cursor: &ByteCursor<'_>,
    entry: &Entry,
    base: usize,
    codec: &Codec,
    claims: &ClaimedRanges,
    limits: &Limits,
) -> DecodeResult<Option<Value>> {
    let type_ = entry
        .field_type()
        .ok_or(DecodeError::UnknownType(entry.type_code()))?;
    let (at, len) = entry.value_location(cursor.byte_order(), base)?;

    if len > limits.ifd_value_size {
        return Err(DecodeError::LimitsExceeded);
    }

    if !entry.is_inline()? && claims.overlaps(at, len) {
        return Err(DecodeError::ClaimedRange(at));
    }

    let raw = cursor.read_bytes(at, len)?;
    codec.decode(type_, entry.count(), raw)
}

/// A MakerNote bearing entry waiting for the `Make` to be known.
struct PendingMakerNote {
    entry: Entry,
    directory_offset: usize,
    /// Group the raw value is published under when nothing can be resolved.
    group: String,
    tag_group: TagGroup,
}

/// State of one TIFF stream decode.
struct StreamDecoder<'a, 'l> {
    cursor: ByteCursor<'a>,
    /// Position of the TIFF header; stream offsets are relative to it.
    base: usize,
    claims: ClaimedRanges,
    codec: Codec,
    limits: &'l Limits,
    namespace: TagNamespace,
    pending: Vec<PendingMakerNote>,
    /// Vendor whose private band names image and EXIF tags, decided by the `Make`.
    private_band: Option<&'static VendorProfile>,
}

impl StreamDecoder<'_, '_> {
    fn run(mut self, first: u32) -> TagNamespace {
        let chain = walk_chain(&self.cursor, self.base, first, self.limits, &mut self.claims);
        let mut guard = ChainGuard::new(self.limits.max_sub_directories);

        // SubIFDs of the first directory come first so that their positions match
        // `DirectoryRef::SubIfd`.
        let mut sub_ifds = Vec::new();
        let mut selectable = 0;
        for (i, dir) in chain.iter().enumerate() {
            if let Some(entry) = dir.get_tag(Tag::SubIFDs) {
                for offset in self.pointer_offsets(entry) {
                    if let Some(sub) = self.sub_directory(offset, &mut guard) {
                        sub_ifds.push(sub);
                    }
                }
            }
            if i == 0 {
                selectable = sub_ifds.len();
            }
        }

        let make = chain
            .iter()
            .chain(sub_ifds.iter())
            .find_map(|dir| self.text(dir, Tag::Make));
        self.private_band = make
            .as_deref()
            .and_then(vendor::for_make)
            .filter(|profile| profile.band.is_some());

        let classified_chain: Vec<ClassifiedDirectory> = chain
            .iter()
            .enumerate()
            .map(|(i, dir)| self.classify(DirectoryRef::Chain(i), dir))
            .collect();
        let classified_subs: Vec<ClassifiedDirectory> = sub_ifds[..selectable]
            .iter()
            .enumerate()
            .map(|(i, dir)| self.classify(DirectoryRef::SubIfd(i), dir))
            .collect();

        let Some(Selection { main, previews }) = selector::select(&classified_chain, &classified_subs) else {
            debug!(offset = first, "no readable directory in TIFF stream");
            self.publish_byte_order();
            return self.namespace;
        };

        let main_dir = match main {
            DirectoryRef::Chain(i) => &chain[i],
            DirectoryRef::SubIfd(i) => &sub_ifds[i],
        };
        self.namespace.set_main_image(main.group());

        // Main image, then EXIF, GPS, SubIFDs, previews and MakerNotes. Every insert keeps an
        // existing key, so this order is the precedence order.
        self.publish_main(main.group(), main_dir);

        let search: Vec<&Directory> = std::iter::once(main_dir).chain(chain.iter()).collect();
        let exif = self.find_sub_directory(&search, Tag::ExifOffset, &mut guard);
        if let Some(exif) = &exif {
            self.publish_exif(exif, &mut guard);
        }

        let mut gps_search = search;
        gps_search.extend(exif.as_ref());
        if let Some(gps) = self.find_sub_directory(&gps_search, Tag::GPSInfo, &mut guard) {
            self.publish_group(&gps, "GPS", TagGroup::Gps);
        }

        for (i, sub) in sub_ifds.iter().enumerate() {
            if DirectoryRef::SubIfd(i) != main {
                self.publish_sub_ifd(DirectoryRef::SubIfd(i).group(), sub);
            }
        }

        for preview in previews {
            if let DirectoryRef::Chain(i) = preview {
                self.publish_preview(preview.group(), &chain[i]);
            }
        }

        self.resolve_maker_notes(make.as_deref());

        self.publish_byte_order();
        self.namespace
    }

    fn tag_name(&self, tag_group: TagGroup, id: u16) -> Cow<'static, str> {
        match self.private_band {
            Some(profile) if profile.in_band(id) => tag_group.tag_name_or(id, profile.names),
            _ => tag_group.tag_name(id),
        }
    }

    fn value(&self, entry: &Entry) -> DecodeResult<Option<Value>> {
        entry_value(&self.cursor, entry, self.base, &self.codec, &self.claims, self.limits)
    }

    /// The value of `entry`, logging why it is skipped if it cannot be decoded.
    fn publishable(&self, entry: &Entry) -> Option<Value> {
        match self.value(entry) {
            Ok(value) => value,
            Err(err) => {
                debug!(tag = entry.tag(), position = entry.position(), error = %err, "skipping tag");
                None
            }
        }
    }

    fn text(&self, dir: &Directory, tag: Tag) -> Option<String> {
        let value = self.value(dir.get_tag(tag)?).ok()??;
        value.as_str().map(str::to_owned)
    }

    fn classify(&self, reference: DirectoryRef, dir: &Directory) -> ClassifiedDirectory {
        classify_with(reference, dir, |tag| {
            dir.get_tag(tag).and_then(|entry| self.value(entry).ok().flatten())
        })
    }

    /// Stream offsets stored in a sub-directory pointer entry.
    fn pointer_offsets(&self, entry: &Entry) -> Vec<u32> {
        let offsets = match self.publishable(entry) {
            Some(Value::SubDirectory(offset)) => vec![offset],
            Some(value) => value.as_u64_list().unwrap_or_default(),
            None => Vec::new(),
        };

        offsets
            .into_iter()
            .filter_map(|offset| u32::try_from(offset).ok())
            .collect()
    }

    /// Parse and claim the directory at the stream offset `offset`.
    fn sub_directory(&mut self, offset: u32, guard: &mut ChainGuard) -> Option<Directory> {
        let step = stream_offset(self.base, offset).and_then(|at| {
            guard.visit(at)?;
            self.claims.check(at)?;
            parse_directory(&self.cursor, at, self.limits)
        });

        match step {
            Ok(dir) => {
                self.claims.claim(dir.byte_range());
                Some(dir)
            }
            Err(err) => {
                debug!(offset, error = %err, "skipping sub-directory");
                None
            }
        }
    }

    /// Follow the first `pointer` entry found in `dirs`.
    fn find_sub_directory(&mut self, dirs: &[&Directory], pointer: Tag, guard: &mut ChainGuard) -> Option<Directory> {
        let entry = dirs.iter().find_map(|dir| dir.get_tag(pointer))?;
        let offset = self.pointer_offsets(entry).into_iter().next()?;
        self.sub_directory(offset, guard)
    }

    /// Publish the values of `dir` through `publish`, queueing MakerNotes and skipping pointers.
    fn for_each_value(
        &mut self,
        dir: &Directory,
        group: &str,
        tag_group: TagGroup,
        mut publish: impl FnMut(&mut TagNamespace, &Entry, &str, Value),
    ) {
        for entry in dir.iter() {
            match classify(entry.tag()) {
                TagClass::SubDirectory(_) => continue,
                TagClass::MakerNote => {
                    self.pending.push(PendingMakerNote {
                        entry: entry.clone(),
                        directory_offset: dir.offset(),
                        group: group.to_owned(),
                        tag_group,
                    });
                    continue;
                }
                _ => {}
            }

            if let Some(value) = self.publishable(entry) {
                let name = self.tag_name(tag_group, entry.tag());
                publish(&mut self.namespace, entry, &name, value);
            }
        }
    }

    fn publish_main(&mut self, group: String, dir: &Directory) {
        self.for_each_value(dir, &group, TagGroup::Image, |ns, entry, name, value| {
            if entry.tag() == Tag::ImageLength.to_u16() {
                ns.insert("ImageHeight", value.clone());
                ns.insert_grouped(&group, "ImageHeight", value.clone());
            }
            ns.insert(name, value.clone());
            ns.insert_grouped(&group, name, value);
        });
    }

    fn publish_exif(&mut self, dir: &Directory, guard: &mut ChainGuard) {
        let version = dir.get_tag(Tag::ExifVersion).and_then(|e| self.publishable(e));
        if version.as_ref().is_some_and(announces_utf8) {
            self.codec.utf8 = true;
            self.namespace.insert_grouped("EXIF", "EXIF3.0", Value::Int(1));
            self.namespace
                .insert_grouped("EXIF", "EXIFStandard", Value::Text("EXIF 3.0".to_owned()));
            self.namespace.insert_grouped("EXIF", "SupportsUTF8", Value::Int(1));
        }

        self.publish_group(dir, "EXIF", TagGroup::Exif);

        if let Some(interop) = self.find_sub_directory(&[dir], Tag::InteropOffset, guard) {
            self.for_each_value(&interop, "Interop", TagGroup::Interop, |ns, _, name, value| {
                let compat = if name.starts_with("Interop") {
                    name.to_owned()
                } else {
                    format!("Interop{}", name)
                };
                ns.insert_grouped("EXIF", &compat, value.clone());
                ns.insert_grouped("Interop", name, value);
            });
        }
    }

    fn publish_group(&mut self, dir: &Directory, group: &str, tag_group: TagGroup) {
        self.for_each_value(dir, group, tag_group, |ns, _, name, value| {
            ns.insert_grouped(group, name, value);
        });
    }

    fn publish_sub_ifd(&mut self, group: String, dir: &Directory) {
        self.for_each_value(dir, &group, TagGroup::Image, |ns, entry, name, value| {
            if classify(entry.tag()) != TagClass::Critical {
                ns.insert_grouped("EXIF", name, value.clone());
            }
            ns.insert_grouped(&group, name, value);
        });
    }

    fn publish_preview(&mut self, group: String, dir: &Directory) {
        let thumbnail = [Tag::ThumbnailOffset.to_u16(), Tag::ThumbnailLength.to_u16()];
        self.for_each_value(dir, &group, TagGroup::Image, |ns, entry, name, value| {
            if thumbnail.contains(&entry.tag()) {
                ns.insert_grouped("EXIF", name, value.clone());
            }
            if classify(entry.tag()) != TagClass::Critical {
                ns.insert(name, value.clone());
            }
            ns.insert_grouped(&group, name, value);
        });
    }

    fn resolve_maker_notes(&mut self, make: Option<&str>) {
        let is_leaf = make.and_then(vendor::for_make).map(|p| p.name) == Some("Leaf");

        for pending in std::mem::take(&mut self.pending) {
            let entry = &pending.entry;
            let resolved = if entry.tag() == Tag::IPTCNAA.to_u16() && !is_leaf {
                // Ordinary IPTC data outside of Leaf files.
                None
            } else {
                self.resolve(make, &pending)
            };

            match resolved {
                Some(note) => {
                    for (name, value) in note.tags {
                        self.namespace.insert_grouped(note.group, &name, value);
                    }
                }
                None => {
                    if let Some(value) = self.publishable(entry) {
                        let name = self.tag_name(pending.tag_group, entry.tag());
                        self.namespace.insert_grouped(&pending.group, &name, value);
                    }
                }
            }
        }
    }

    fn resolve(&self, make: Option<&str>, pending: &PendingMakerNote) -> Option<ResolvedMakerNote> {
        let entry = &pending.entry;
        let len = entry.value_len().ok()?;
        if entry.is_inline().ok()? {
            return None;
        }

        let request = MakerNoteRequest {
            make,
            tag: entry.tag(),
            declared_offset: entry.offset(self.cursor.byte_order()),
            count: u32::try_from(len).ok()?,
            stream_base: self.base,
            directory_offset: pending.directory_offset,
            byte_order: self.cursor.byte_order(),
        };

        makernote::resolve(self.cursor.data(), &request, &self.claims, &self.codec, self.limits)
    }

    fn publish_byte_order(&mut self) {
        let order = self.cursor.byte_order().description();
        self.namespace
            .insert_grouped("File", "ExifByteOrder", Value::Text(order.to_owned()));
    }
}
