use std::borrow::Cow;

macro_rules! tags {
    {
        // Permit arbitrary meta items, which include documentation.
        $( #[$enum_attr:meta] )*
        $vis:vis enum $name:ident(u16) $(unknown(#[$unknown_meta:meta] $unknown_doc:ident))* {
            // Each of the `Name = Val,` permitting documentation.
            $($(#[$ident_attr:meta])* $tag:ident = $val:expr,)*
        }
    } => {
        $( #[$enum_attr] )*
        #[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
        #[non_exhaustive]
        #[repr(u16)]
        $vis enum $name {
            $($(#[$ident_attr])* $tag = $val,)*
            $(
                #[$unknown_meta]
                Unknown(u16),
            )*
        }

        impl $name {
            #[inline(always)]
            pub const fn from_u16(val: u16) -> Option<Self> {
                match val {
                    $( $val => Some($name::$tag), )*
                    _ => None,
                }
            }

            $(
            #[inline(always)]
            pub const fn from_u16_exhaustive($unknown_doc: u16) -> Self {
                match Self::from_u16($unknown_doc) {
                    Some(v) => v,
                    None => $name::Unknown($unknown_doc),
                }
            }
            )*

            #[inline(always)]
            pub const fn to_u16(&self) -> u16 {
                match *self {
                    $( $name::$tag => $val, )*
                    $( $name::Unknown($unknown_doc) => { $unknown_doc }, )*
                }
            }

            /// The canonical tag name, `None` for ids without one.
            pub const fn name(&self) -> Option<&'static str> {
                match *self {
                    $( $name::$tag => Some(stringify!($tag)), )*
                    #[allow(unreachable_patterns)]
                    _ => None,
                }
            }
        }
    };
}

// Baseline TIFF, TIFF/EP, DNG and EXIF attributes share one id space.
tags! {
/// Tags of image directories and of the EXIF sub-directory
pub enum Tag(u16) unknown(
    /// A private or extension tag
    unknown
) {
    SubfileType = 0x00FE,
    OldSubfileType = 0x00FF,
    ImageWidth = 0x0100,
    ImageLength = 0x0101,
    BitsPerSample = 0x0102,
    Compression = 0x0103,
    PhotometricInterpretation = 0x0106,
    Thresholding = 0x0107,
    FillOrder = 0x010A,
    DocumentName = 0x010D,
    ImageDescription = 0x010E,
    Make = 0x010F,
    Model = 0x0110,
    StripOffsets = 0x0111,
    Orientation = 0x0112,
    SamplesPerPixel = 0x0115,
    RowsPerStrip = 0x0116,
    StripByteCounts = 0x0117,
    MinSampleValue = 0x0118,
    MaxSampleValue = 0x0119,
    XResolution = 0x011A,
    YResolution = 0x011B,
    PlanarConfiguration = 0x011C,
    PageName = 0x011D,
    XPosition = 0x011E,
    YPosition = 0x011F,
    ResolutionUnit = 0x0128,
    PageNumber = 0x0129,
    TransferFunction = 0x012D,
    Software = 0x0131,
    ModifyDate = 0x0132,
    Artist = 0x013B,
    HostComputer = 0x013C,
    Predictor = 0x013D,
    WhitePoint = 0x013E,
    PrimaryChromaticities = 0x013F,
    ColorMap = 0x0140,
    TileWidth = 0x0142,
    TileLength = 0x0143,
    TileOffsets = 0x0144,
    TileByteCounts = 0x0145,
    SubIFDs = 0x014A,
    InkSet = 0x014C,
    ExtraSamples = 0x0152,
    SampleFormat = 0x0153,
    JPEGTables = 0x015B,
    ThumbnailOffset = 0x0201,
    ThumbnailLength = 0x0202,
    YCbCrCoefficients = 0x0211,
    YCbCrSubSampling = 0x0212,
    YCbCrPositioning = 0x0213,
    ReferenceBlackWhite = 0x0214,
    ApplicationNotes = 0x02BC,
    Rating = 0x4746,
    RatingPercent = 0x4749,
    CFARepeatPatternDim = 0x828D,
    CFAPattern2 = 0x828E,
    Copyright = 0x8298,
    ExposureTime = 0x829A,
    FNumber = 0x829D,
    IPTCNAA = 0x83BB,
    PhotoshopSettings = 0x8649,
    LeafData = 0x8606,
    ExifOffset = 0x8769,
    ICCProfile = 0x8773,
    ExposureProgram = 0x8822,
    SpectralSensitivity = 0x8824,
    GPSInfo = 0x8825,
    ISO = 0x8827,
    OptoElectricConvFactor = 0x8828,
    SensitivityType = 0x8830,
    StandardOutputSensitivity = 0x8831,
    RecommendedExposureIndex = 0x8832,
    ExifVersion = 0x9000,
    DateTimeOriginal = 0x9003,
    CreateDate = 0x9004,
    OffsetTime = 0x9010,
    OffsetTimeOriginal = 0x9011,
    OffsetTimeDigitized = 0x9012,
    ComponentsConfiguration = 0x9101,
    CompressedBitsPerPixel = 0x9102,
    ShutterSpeedValue = 0x9201,
    ApertureValue = 0x9202,
    BrightnessValue = 0x9203,
    ExposureCompensation = 0x9204,
    MaxApertureValue = 0x9205,
    SubjectDistance = 0x9206,
    MeteringMode = 0x9207,
    LightSource = 0x9208,
    Flash = 0x9209,
    FocalLength = 0x920A,
    SubjectArea = 0x9214,
    MakerNote = 0x927C,
    UserComment = 0x9286,
    SubSecTime = 0x9290,
    SubSecTimeOriginal = 0x9291,
    SubSecTimeDigitized = 0x9292,
    XPTitle = 0x9C9B,
    XPComment = 0x9C9C,
    XPAuthor = 0x9C9D,
    XPKeywords = 0x9C9E,
    XPSubject = 0x9C9F,
    FlashpixVersion = 0xA000,
    ColorSpace = 0xA001,
    ExifImageWidth = 0xA002,
    ExifImageHeight = 0xA003,
    RelatedSoundFile = 0xA004,
    InteropOffset = 0xA005,
    FlashEnergy = 0xA20B,
    FocalPlaneXResolution = 0xA20E,
    FocalPlaneYResolution = 0xA20F,
    FocalPlaneResolutionUnit = 0xA210,
    SubjectLocation = 0xA214,
    ExposureIndex = 0xA215,
    SensingMethod = 0xA217,
    FileSource = 0xA300,
    SceneType = 0xA301,
    CFAPattern = 0xA302,
    CustomRendered = 0xA401,
    ExposureMode = 0xA402,
    WhiteBalance = 0xA403,
    DigitalZoomRatio = 0xA404,
    FocalLengthIn35mmFormat = 0xA405,
    SceneCaptureType = 0xA406,
    GainControl = 0xA407,
    Contrast = 0xA408,
    Saturation = 0xA409,
    Sharpness = 0xA40A,
    DeviceSettingDescription = 0xA40B,
    SubjectDistanceRange = 0xA40C,
    ImageUniqueID = 0xA420,
    OwnerName = 0xA430,
    SerialNumber = 0xA431,
    LensInfo = 0xA432,
    LensMake = 0xA433,
    LensModel = 0xA434,
    LensSerialNumber = 0xA435,
    CompositeImage = 0xA460,
    Gamma = 0xA500,
    PrintIM = 0xC4A5,
    DNGVersion = 0xC612,
    DNGBackwardVersion = 0xC613,
    UniqueCameraModel = 0xC614,
    LocalizedCameraModel = 0xC615,
    CFAPlaneColor = 0xC616,
    CFALayout = 0xC617,
    BlackLevelRepeatDim = 0xC619,
    BlackLevel = 0xC61A,
    WhiteLevel = 0xC61D,
    DefaultScale = 0xC61E,
    DefaultCropOrigin = 0xC61F,
    DefaultCropSize = 0xC620,
    ColorMatrix1 = 0xC621,
    ColorMatrix2 = 0xC622,
    AsShotNeutral = 0xC628,
    BaselineExposure = 0xC62A,
    DNGPrivateData = 0xC634,
    CalibrationIlluminant1 = 0xC65A,
    CalibrationIlluminant2 = 0xC65B,
    ActiveArea = 0xC68D,
    OriginalRawFileName = 0xC68B,
    MaskedAreas = 0xC68E,
}
}

tags! {
/// Tags of the GPS sub-directory
pub enum GpsTag(u16) unknown(
    /// A private or extension tag
    unknown
) {
    GPSVersionID = 0x0000,
    GPSLatitudeRef = 0x0001,
    GPSLatitude = 0x0002,
    GPSLongitudeRef = 0x0003,
    GPSLongitude = 0x0004,
    GPSAltitudeRef = 0x0005,
    GPSAltitude = 0x0006,
    GPSTimeStamp = 0x0007,
    GPSSatellites = 0x0008,
    GPSStatus = 0x0009,
    GPSMeasureMode = 0x000A,
    GPSDOP = 0x000B,
    GPSSpeedRef = 0x000C,
    GPSSpeed = 0x000D,
    GPSTrackRef = 0x000E,
    GPSTrack = 0x000F,
    GPSImgDirectionRef = 0x0010,
    GPSImgDirection = 0x0011,
    GPSMapDatum = 0x0012,
    GPSDestLatitudeRef = 0x0013,
    GPSDestLatitude = 0x0014,
    GPSDestLongitudeRef = 0x0015,
    GPSDestLongitude = 0x0016,
    GPSDestBearingRef = 0x0017,
    GPSDestBearing = 0x0018,
    GPSDestDistanceRef = 0x0019,
    GPSDestDistance = 0x001A,
    GPSProcessingMethod = 0x001B,
    GPSAreaInformation = 0x001C,
    GPSDateStamp = 0x001D,
    GPSDifferential = 0x001E,
    GPSHPositioningError = 0x001F,
}
}

tags! {
/// Tags of the interoperability sub-directory
pub enum InteropTag(u16) unknown(
    /// A private or extension tag
    unknown
) {
    InteropIndex = 0x0001,
    InteropVersion = 0x0002,
    RelatedImageFileFormat = 0x1000,
    RelatedImageWidth = 0x1001,
    RelatedImageHeight = 0x1002,
}
}

tags! {
/// The private tag band of Leaf digital backs
pub enum LeafTag(u16) unknown(
    /// A tag in the band without a known name
    unknown
) {
    CCDRect = 0x8000,
    CCDValidRect = 0x8001,
    CCDVideoRect = 0x8002,
    CameraBackType = 0x8003,
    CameraName = 0x8004,
    CameraObjBackType = 0x8005,
    CameraObjName = 0x8006,
    CameraObjType = 0x8007,
    CameraObjVersion = 0x8008,
    CameraProfileVersion = 0x8009,
    CaptProfBackType = 0x800A,
    CaptProfName = 0x800B,
    CaptProfType = 0x800C,
    CaptProfVersion = 0x800D,
    CaptureObjBackType = 0x800E,
    CaptureObjName = 0x800F,
    CaptureObjType = 0x8010,
    CaptureObjVersion = 0x8011,
    CaptureSerial = 0x8013,
    ColorCasts = 0x8014,
    ColorCorrection = 0x8015,
    ColorMatrix = 0x8016,
    DataLen = 0x8017,
    FocusInfo = 0x8018,
    Gamma = 0x8019,
    ImgProfBackType = 0x801A,
    ImgProfName = 0x801B,
    ImgProfType = 0x801C,
    ImgProfVersion = 0x801D,
    InputProfile = 0x801E,
    IntensityHistogram = 0x801F,
    ISOSpeed = 0x8021,
    JPEGQuality = 0x8022,
    LeafAutoActive = 0x8023,
    LeafHotArea = 0x8024,
    LeafInputProfile = 0x8025,
    LeafOutputProfile = 0x8026,
    LeafSelectActivity = 0x8027,
    LensID = 0x8032,
    LensType = 0x8033,
    Locks = 0x8034,
    Mosaic = 0x8035,
    MultiQuality = 0x8036,
    NeutObjBackType = 0x8037,
    NeutObjName = 0x8038,
    NeutObjType = 0x8039,
    NeutObjVersion = 0x803A,
    Neutrals = 0x803B,
    Orientation = 0x803F,
    OutputProfile = 0x8040,
    PixelAspectRatio = 0x8044,
    PixelSize = 0x8045,
    Rect = 0x804A,
    Resolution = 0x804B,
    Scale = 0x804C,
    SelObjBackType = 0x804D,
    SelObjName = 0x804E,
    SelObjType = 0x804F,
    SelObjVersion = 0x8050,
    SensorSize = 0x8051,
    ShootObjBackType = 0x8052,
    ShootObjName = 0x8053,
    ShootObjType = 0x8054,
    ShootObjVersion = 0x8055,
    ShutterSpeed = 0x8056,
    SingleQuality = 0x8057,
    ToneObjBackType = 0x805B,
    ToneObjName = 0x805C,
    ToneObjType = 0x805D,
    ToneObjVersion = 0x805E,
    ToneCurve = 0x805F,
    XYOffsetInfo = 0x8070,
}
}

tags! {
/// The type of an IFD entry (a 2 byte field).
#[allow(clippy::upper_case_acronyms)]
pub enum Type(u16) {
    /// 8-bit unsigned integer
    BYTE = 1,
    /// 8-bit byte that contains a 7-bit ASCII code; the last byte must be zero
    ASCII = 2,
    /// 16-bit unsigned integer
    SHORT = 3,
    /// 32-bit unsigned integer
    LONG = 4,
    /// Fraction stored as two 32-bit unsigned integers
    RATIONAL = 5,
    /// 8-bit signed integer
    SBYTE = 6,
    /// 8-bit byte that may contain anything, depending on the field
    UNDEFINED = 7,
    /// 16-bit signed integer
    SSHORT = 8,
    /// 32-bit signed integer
    SLONG = 9,
    /// Fraction stored as two 32-bit signed integers
    SRATIONAL = 10,
    /// 32-bit IEEE floating point
    FLOAT = 11,
    /// 64-bit IEEE floating point
    DOUBLE = 12,
    /// 32-bit unsigned integer (offset)
    IFD = 13,
    /// BigTIFF 64-bit unsigned integer
    LONG8 = 16,
    /// BigTIFF 64-bit signed integer
    SLONG8 = 17,
    /// BigTIFF 64-bit unsigned integer (offset)
    IFD8 = 18,
}
}

impl Type {
    /// Width of one element in bytes.
    pub fn byte_len(&self) -> usize {
        match *self {
            Type::BYTE | Type::SBYTE | Type::ASCII | Type::UNDEFINED => 1,
            Type::SHORT | Type::SSHORT => 2,
            Type::LONG | Type::SLONG | Type::FLOAT | Type::IFD => 4,
            Type::LONG8
            | Type::SLONG8
            | Type::DOUBLE
            | Type::RATIONAL
            | Type::SRATIONAL
            | Type::IFD8 => 8,
        }
    }

    /// Total size of `count` elements, `None` on overflow.
    pub fn value_bytes(&self, count: u32) -> Option<usize> {
        usize::try_from(count).ok()?.checked_mul(self.byte_len())
    }
}

/// The directory a tag was read from, which decides the id space its name comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TagGroup {
    Image,
    Exif,
    Gps,
    Interop,
}

impl TagGroup {
    /// Name of `id` in this group, `Unknown0xNNNN` for ids without a known name.
    pub fn tag_name(self, id: u16) -> Cow<'static, str> {
        self.tag_name_or(id, |_| None)
    }

    /// Like [`tag_name`](Self::tag_name), with `private` naming image and EXIF ids of a vendor's
    /// private band.
    pub fn tag_name_or(self, id: u16, private: impl FnOnce(u16) -> Option<&'static str>) -> Cow<'static, str> {
        let known = match self {
            TagGroup::Image | TagGroup::Exif => Tag::from_u16(id).and_then(|t| t.name()).or_else(|| private(id)),
            TagGroup::Gps => GpsTag::from_u16(id).and_then(|t| t.name()),
            TagGroup::Interop => InteropTag::from_u16(id).and_then(|t| t.name()),
        };

        match known {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(unknown_name(id)),
        }
    }
}

pub(crate) fn leaf_name(id: u16) -> Option<&'static str> {
    LeafTag::from_u16(id).and_then(|t| t.name())
}

pub(crate) fn unknown_name(id: u16) -> String {
    format!("Unknown0x{:04X}", id)
}

/// Sub-directories reachable from pointer tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubDirectoryKind {
    Exif,
    Gps,
    Interop,
    SubIfds,
}

/// How directory traversal and namespace merging treat a tag id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TagClass {
    /// Describes the pixel data of the directory it sits in.
    Critical,
    /// Points at one or more further directories.
    SubDirectory(SubDirectoryKind),
    /// Carries a vendor MakerNote or vendor record block.
    MakerNote,
    Ordinary,
}

const CRITICAL_TAGS: &[Tag] = &[
    Tag::SubfileType,
    Tag::ImageWidth,
    Tag::ImageLength,
    Tag::BitsPerSample,
    Tag::Compression,
    Tag::PhotometricInterpretation,
    Tag::StripOffsets,
    Tag::SamplesPerPixel,
    Tag::RowsPerStrip,
    Tag::StripByteCounts,
    Tag::PlanarConfiguration,
    Tag::TileWidth,
    Tag::TileLength,
    Tag::TileOffsets,
    Tag::TileByteCounts,
    Tag::SampleFormat,
    Tag::CFARepeatPatternDim,
    Tag::CFAPattern2,
    Tag::CFAPlaneColor,
    Tag::CFALayout,
    Tag::BlackLevel,
    Tag::WhiteLevel,
    Tag::DefaultCropOrigin,
    Tag::DefaultCropSize,
    Tag::ActiveArea,
    Tag::MaskedAreas,
];

const MAKER_NOTE_TAGS: &[Tag] = &[Tag::MakerNote, Tag::IPTCNAA, Tag::LeafData];

/// Class of a tag found in an image or EXIF directory.
pub fn classify(id: u16) -> TagClass {
    match Tag::from_u16(id) {
        Some(Tag::ExifOffset) => TagClass::SubDirectory(SubDirectoryKind::Exif),
        Some(Tag::GPSInfo) => TagClass::SubDirectory(SubDirectoryKind::Gps),
        Some(Tag::InteropOffset) => TagClass::SubDirectory(SubDirectoryKind::Interop),
        Some(Tag::SubIFDs) => TagClass::SubDirectory(SubDirectoryKind::SubIfds),
        Some(tag) if CRITICAL_TAGS.contains(&tag) => TagClass::Critical,
        Some(tag) if MAKER_NOTE_TAGS.contains(&tag) => TagClass::MakerNote,
        _ => TagClass::Ordinary,
    }
}
