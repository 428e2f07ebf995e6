//! Static vendor profiles for MakerNote resolution
//!
//! A profile is data: how a vendor frames its MakerNote directory, which private tag band it
//! uses, and how its tags are named. Adding a vendor means adding a profile here; the resolver
//! does not change.

use std::ops::RangeInclusive;

use super::pkts::PKTS;
use super::RecordDecoder;
use crate::decoder::stream::ByteOrder;
use crate::tags::leaf_name;

/// What stream-relative offsets inside the MakerNote directory are relative to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OffsetBase {
    /// The enclosing TIFF stream, like ordinary EXIF values.
    Stream,
    /// The first byte of the MakerNote.
    MakerNote,
    /// A TIFF header embedded at this position of the MakerNote, which also supplies the byte
    /// order and the directory offset.
    EmbeddedTiff(usize),
    /// The first byte of the MakerNote, with the directory offset stored as a little-endian
    /// `u32` at this position.
    OffsetField(usize),
}

/// Byte order of the MakerNote directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderSource {
    Stream,
    Fixed(ByteOrder),
    /// An `II`/`MM` marker at this position of the MakerNote. Anything else means the stream
    /// order.
    Marker(usize),
}

/// One framing a vendor uses in front of its directory.
#[derive(Clone, Copy, Debug)]
pub struct Layout {
    pub signature: &'static [u8],
    /// Distance from the MakerNote start to the directory.
    pub skip: usize,
    pub base: OffsetBase,
    pub byte_order: OrderSource,
}

/// Everything the resolver knows about one vendor.
pub struct VendorProfile {
    pub name: &'static str,
    /// Prefixes of the `Make` tag, compared case-insensitively.
    pub makes: &'static [&'static str],
    pub layouts: &'static [Layout],
    /// Private tag ids; a directory only counts as this vendor's when it uses one of them.
    pub band: Option<RangeInclusive<u16>>,
    /// Group for the published tags.
    pub group: &'static str,
    pub names: fn(u16) -> Option<&'static str>,
    pub records: Option<&'static (dyn RecordDecoder + Sync)>,
}

impl VendorProfile {
    pub fn matches_make(&self, make: &str) -> bool {
        let make = make.trim_start();
        self.makes.iter().any(|prefix| {
            make.len() >= prefix.len() && make.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
        })
    }

    pub fn in_band(&self, tag: u16) -> bool {
        self.band.as_ref().map_or(false, |band| band.contains(&tag))
    }
}

impl std::fmt::Debug for VendorProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VendorProfile")
            .field("name", &self.name)
            .field("band", &self.band)
            .field("group", &self.group)
            .finish()
    }
}

/// Profile for the private Leaf tags, whatever the `Make` says.
pub fn leaf() -> &'static VendorProfile {
    &LEAF
}

/// Profile for MakerNotes of unknown vendors.
pub fn generic() -> &'static VendorProfile {
    &GENERIC
}

/// Profile for a camera make, if the vendor is known.
pub fn for_make(make: &str) -> Option<&'static VendorProfile> {
    PROFILES.iter().copied().find(|p| p.matches_make(make))
}

/// Whether `group` holds MakerNote derived tags.
pub fn is_maker_note_group(group: &str) -> bool {
    group == GENERIC.group || PROFILES.iter().any(|p| p.group == group)
}

static PROFILES: [&VendorProfile; 8] = [
    &CANON, &NIKON, &OLYMPUS, &PANASONIC, &FUJIFILM, &SONY, &PENTAX, &LEAF,
];

const MAKER_NOTE: &str = "MakerNote";

static GENERIC: VendorProfile = VendorProfile {
    name: "generic",
    makes: &[],
    layouts: &[],
    band: None,
    group: MAKER_NOTE,
    names: no_names,
    records: None,
};

static CANON: VendorProfile = VendorProfile {
    name: "Canon",
    makes: &["Canon"],
    layouts: &[],
    band: None,
    group: MAKER_NOTE,
    names: canon_name,
    records: None,
};

static NIKON: VendorProfile = VendorProfile {
    name: "Nikon",
    makes: &["Nikon"],
    layouts: &[Layout {
        signature: b"Nikon\0",
        skip: 18,
        base: OffsetBase::EmbeddedTiff(10),
        byte_order: OrderSource::Stream,
    }],
    band: None,
    group: MAKER_NOTE,
    names: nikon_name,
    records: None,
};

static OLYMPUS: VendorProfile = VendorProfile {
    name: "Olympus",
    makes: &["Olympus", "OM Digital"],
    layouts: &[
        Layout {
            signature: b"OLYMPUS\0",
            skip: 12,
            base: OffsetBase::MakerNote,
            byte_order: OrderSource::Marker(8),
        },
        Layout {
            signature: b"OM SYSTEM\0",
            skip: 16,
            base: OffsetBase::MakerNote,
            byte_order: OrderSource::Marker(12),
        },
        Layout {
            signature: b"OLYMP\0",
            skip: 8,
            base: OffsetBase::Stream,
            byte_order: OrderSource::Stream,
        },
    ],
    band: None,
    group: MAKER_NOTE,
    names: olympus_name,
    records: None,
};

static PANASONIC: VendorProfile = VendorProfile {
    name: "Panasonic",
    makes: &["Panasonic", "Leica Camera"],
    layouts: &[Layout {
        signature: b"Panasonic\0\0\0",
        skip: 12,
        base: OffsetBase::Stream,
        byte_order: OrderSource::Stream,
    }],
    band: None,
    group: MAKER_NOTE,
    names: panasonic_name,
    records: None,
};

static FUJIFILM: VendorProfile = VendorProfile {
    name: "Fujifilm",
    makes: &["Fujifilm", "Fuji"],
    layouts: &[Layout {
        signature: b"FUJIFILM",
        skip: 12,
        base: OffsetBase::OffsetField(8),
        byte_order: OrderSource::Fixed(ByteOrder::LittleEndian),
    }],
    band: None,
    group: MAKER_NOTE,
    names: fujifilm_name,
    records: None,
};

static SONY: VendorProfile = VendorProfile {
    name: "Sony",
    makes: &["Sony"],
    layouts: &[Layout {
        signature: b"SONY DSC \0\0\0",
        skip: 12,
        base: OffsetBase::Stream,
        byte_order: OrderSource::Stream,
    }],
    band: None,
    group: MAKER_NOTE,
    names: sony_name,
    records: None,
};

static PENTAX: VendorProfile = VendorProfile {
    name: "Pentax",
    makes: &["Pentax", "Ricoh", "Asahi"],
    layouts: &[
        Layout {
            signature: b"AOC\0",
            skip: 6,
            base: OffsetBase::Stream,
            byte_order: OrderSource::Marker(4),
        },
        Layout {
            signature: b"PENTAX \0",
            skip: 10,
            base: OffsetBase::MakerNote,
            byte_order: OrderSource::Marker(8),
        },
    ],
    band: None,
    group: MAKER_NOTE,
    names: pentax_name,
    records: None,
};

static LEAF: VendorProfile = VendorProfile {
    name: "Leaf",
    makes: &["Leaf"],
    layouts: &[],
    band: Some(0x8000..=0x8070),
    group: "Leaf",
    names: leaf_name,
    records: Some(&PKTS),
};

fn no_names(_: u16) -> Option<&'static str> {
    None
}

fn canon_name(id: u16) -> Option<&'static str> {
    Some(match id {
        0x0001 => "CanonCameraSettings",
        0x0002 => "CanonFocalLength",
        0x0004 => "CanonShotInfo",
        0x0006 => "CanonImageType",
        0x0007 => "CanonFirmwareVersion",
        0x0008 => "FileNumber",
        0x0009 => "OwnerName",
        0x000C => "SerialNumber",
        0x0010 => "CanonModelID",
        0x0095 => "LensModel",
        _ => return None,
    })
}

fn nikon_name(id: u16) -> Option<&'static str> {
    Some(match id {
        0x0001 => "MakerNoteVersion",
        0x0002 => "ISO",
        0x0004 => "Quality",
        0x0005 => "WhiteBalance",
        0x0007 => "FocusMode",
        0x001D => "SerialNumber",
        0x0084 => "Lens",
        0x00A7 => "ShutterCount",
        _ => return None,
    })
}

fn olympus_name(id: u16) -> Option<&'static str> {
    Some(match id {
        0x0200 => "SpecialMode",
        0x0201 => "Quality",
        0x0204 => "DigitalZoom",
        0x0207 => "CameraType",
        0x0209 => "CameraID",
        0x2010 => "Equipment",
        0x2020 => "CameraSettings",
        _ => return None,
    })
}

fn panasonic_name(id: u16) -> Option<&'static str> {
    Some(match id {
        0x0001 => "ImageQuality",
        0x0002 => "FirmwareVersion",
        0x0003 => "WhiteBalance",
        0x0007 => "FocusMode",
        0x0025 => "InternalSerialNumber",
        _ => return None,
    })
}

fn fujifilm_name(id: u16) -> Option<&'static str> {
    Some(match id {
        0x0000 => "Version",
        0x0010 => "InternalSerialNumber",
        0x1000 => "Quality",
        0x1001 => "Sharpness",
        0x1002 => "WhiteBalance",
        0x1031 => "PictureMode",
        _ => return None,
    })
}

fn sony_name(id: u16) -> Option<&'static str> {
    Some(match id {
        0x0102 => "Quality",
        0x0104 => "FlashExposureComp",
        0xB020 => "CreativeStyle",
        0xB027 => "LensType",
        _ => return None,
    })
}

fn pentax_name(id: u16) -> Option<&'static str> {
    Some(match id {
        0x0000 => "PentaxVersion",
        0x0001 => "PentaxModelType",
        0x0005 => "PentaxModelID",
        0x0008 => "Quality",
        _ => return None,
    })
}
