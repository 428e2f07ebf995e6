mod common;

use common::{jpeg, png, png_raw_profile, single_ifd, Stream};
use raw_exif::decoder::{Decoder, Limits};
use raw_exif::{parse, ByteOrder, ContainerKind, Rational, ReadError, Tag, Value};

fn text(s: &str) -> Value {
    Value::Text(s.to_owned())
}

/// IFD0 with two strips, an EXIF and a GPS directory and an Interoperability directory.
fn camera_stream(order: ByteOrder) -> Vec<u8> {
    let mut s = Stream::new(order);
    s.pad_to(16);

    let interop = {
        let fields = [s.ascii(0x0001, "R98"), s.undefined(0x0002, b"0100")];
        s.ifd(&fields, 0)
    };
    let exif = {
        let fields = [
            s.rational(0x829A, &[(1, 250)]),
            s.short(0x8827, &[400]),
            s.undefined(0x9000, b"0232"),
            s.pointer(0xA005, interop),
        ];
        s.ifd(&fields, 0)
    };
    let gps = {
        let fields = [
            s.bytes(0x0000, &[2, 3, 0, 0]),
            s.ascii(0x0001, "N"),
            s.rational(0x0002, &[(52, 1), (31, 1), (0, 0)]),
        ];
        s.ifd(&fields, 0)
    };
    let ifd0 = {
        let fields = [
            s.short(Tag::ImageWidth.to_u16(), &[640]),
            s.short(Tag::ImageLength.to_u16(), &[480]),
            s.ascii(Tag::Make.to_u16(), "Acme"),
            s.ascii(Tag::Model.to_u16(), "Model 1"),
            s.short(Tag::Orientation.to_u16(), &[6]),
            s.pointer(Tag::ExifOffset.to_u16(), exif),
            s.pointer(Tag::GPSInfo.to_u16(), gps),
        ];
        s.ifd(&fields, 0)
    };
    s.set_first_ifd(ifd0);
    s.into_bytes()
}

#[test]
fn jpeg_orientation() {
    let tiff = single_ifd(ByteOrder::LittleEndian, |s| vec![s.short(0x0112, &[1])]);
    let tags = parse(&jpeg(&tiff)).expect("valid JPEG");

    assert_eq!(tags.container(), ContainerKind::Jpeg);
    assert_eq!(tags.get("Orientation"), Some(&Value::Int(1)));
    assert_eq!(tags.get("IFD0:Orientation"), Some(&Value::Int(1)));
    assert_eq!(
        tags.get("File:ExifByteOrder"),
        Some(&text("Little-endian (Intel, II)"))
    );
    assert_eq!(tags.len(), 3);
}

#[test]
fn image_height_alias() {
    let tiff = single_ifd(ByteOrder::LittleEndian, |s| {
        vec![s.short(0x0100, &[100]), s.short(0x0101, &[50])]
    });
    let tags = parse(&tiff).expect("valid TIFF");

    assert_eq!(tags.container(), ContainerKind::Tiff);
    assert_eq!(tags.main_image(), Some("IFD0"));
    assert_eq!(tags.get("ImageWidth"), Some(&Value::Int(100)));
    assert_eq!(tags.get("ImageHeight"), Some(&Value::Int(50)));
    assert_eq!(tags.get("ImageLength"), Some(&Value::Int(50)));
    assert_eq!(tags.get("IFD0:ImageHeight"), Some(&Value::Int(50)));
}

#[test]
fn png_matches_native_tiff() {
    let tiff = camera_stream(ByteOrder::LittleEndian);
    let native = parse(&tiff).expect("valid TIFF");
    let in_png = parse(&png(&tiff)).expect("valid PNG");

    assert_eq!(in_png.container(), ContainerKind::Png);
    assert!(native.iter().eq(in_png.iter()));

    let raw_profile = parse(&png_raw_profile(&tiff)).expect("raw profile");
    assert!(native.iter().eq(raw_profile.iter()));
}

#[test]
fn byte_orders_agree() {
    let le = parse(&camera_stream(ByteOrder::LittleEndian)).expect("little-endian");
    let be = parse(&camera_stream(ByteOrder::BigEndian)).expect("big-endian");

    assert_eq!(le.byte_order(), ByteOrder::LittleEndian);
    assert_eq!(be.byte_order(), ByteOrder::BigEndian);
    assert_eq!(le.len(), be.len());
    for (key, value) in &le {
        if key != "File:ExifByteOrder" {
            assert_eq!(be.get(key), Some(value), "{}", key);
        }
    }
}

#[test]
fn sub_directories() {
    let tags = parse(&camera_stream(ByteOrder::BigEndian)).expect("valid TIFF");

    assert_eq!(tags.get("Make"), Some(&text("Acme")));
    assert_eq!(tags.get("IFD0:Model"), Some(&text("Model 1")));
    assert_eq!(
        tags.get("EXIF:ExposureTime"),
        Some(&Value::Rational(Rational { numerator: 1, denominator: 250 }))
    );
    assert_eq!(tags.get("EXIF:ISO"), Some(&Value::Int(400)));
    assert_eq!(tags.get("EXIF:ExifVersion"), Some(&Value::Bytes(b"0232".to_vec())));
    assert_eq!(tags.get("GPS:GPSLatitudeRef"), Some(&text("N")));
    assert_eq!(tags.get("GPS:GPSVersionID"), Some(&Value::IntList(vec![2, 3, 0, 0])));
    assert_eq!(
        tags.get("GPS:GPSLatitude"),
        Some(&Value::RationalList(vec![
            Rational::new(52, 1),
            Rational::new(31, 1),
            None
        ]))
    );
    assert_eq!(tags.get("Interop:InteropIndex"), Some(&text("R98")));
    assert_eq!(tags.get("EXIF:InteropIndex"), Some(&text("R98")));
    assert_eq!(tags.get("EXIF:InteropVersion"), Some(&Value::Bytes(b"0100".to_vec())));

    // Pointers are structure, not tags.
    assert!(tags.get("IFD0:ExifOffset").is_none());
    assert!(tags.get("ExifOffset").is_none());
    assert!(tags.get("EXIF:InteropOffset").is_none());
}

#[test]
fn zero_denominator_is_absent() {
    let tiff = single_ifd(ByteOrder::BigEndian, |s| {
        vec![
            s.short(0x0100, &[1]),
            s.rational(0x011A, &[(72, 0)]),
            s.rational(0x011B, &[(72, 1)]),
        ]
    });
    let tags = parse(&tiff).expect("valid TIFF");

    assert!(tags.get("XResolution").is_none());
    assert_eq!(
        tags.get("YResolution"),
        Some(&Value::Rational(Rational { numerator: 72, denominator: 1 }))
    );
}

#[test]
fn chain_cycle_terminates() {
    let mut s = Stream::le();
    let ifd0 = {
        let fields = [s.short(0x0100, &[100]), s.short(0x0101, &[100])];
        s.ifd(&fields, 0)
    };
    let ifd1 = {
        let fields = [s.short(0x00FE, &[1]), s.short(0x0100, &[10]), s.short(0x0101, &[10])];
        s.ifd(&fields, ifd0)
    };
    s.set_next(ifd0, ifd1);

    let tags = parse(&s.into_bytes()).expect("valid TIFF");
    assert_eq!(tags.get("ImageWidth"), Some(&Value::Int(100)));
    assert_eq!(tags.get("IFD1:ImageWidth"), Some(&Value::Int(10)));
    assert!(!tags.iter().any(|(k, _)| k.starts_with("IFD2:")));
}

#[test]
fn chain_length_is_bounded() {
    let mut s = Stream::le();
    let mut next = 0;
    for width in (1..=6).rev() {
        let fields = [s.short(0x00FE, &[1]), s.short(0x0100, &[width])];
        next = s.ifd(&fields, next);
    }
    s.set_first_ifd(next);
    let data = s.into_bytes();

    let mut limits = Limits::default();
    limits.max_directories = 3;
    let tags = Decoder::new(&data).with_limits(limits).decode().expect("valid TIFF");
    assert!(tags.get("IFD2:ImageWidth").is_some());
    assert!(tags.get("IFD3:ImageWidth").is_none());

    let tags = parse(&data).expect("valid TIFF");
    assert_eq!(tags.get("IFD5:ImageWidth"), Some(&Value::Int(6)));
}

#[test]
fn full_resolution_sub_ifd_is_main() {
    let mut s = Stream::le();
    s.pad_to(16);
    let sub = {
        let fields = [
            s.long(0x00FE, &[0]),
            s.long(0x0100, &[4000]),
            s.long(0x0101, &[3000]),
            s.short(0x0103, &[7]),
        ];
        s.ifd(&fields, 0)
    };
    let ifd0 = {
        let fields = [
            s.long(0x00FE, &[1]),
            s.short(0x0100, &[100]),
            s.short(0x0101, &[100]),
            s.short(0x0103, &[1]),
            s.ascii(0x010F, "Acme"),
            s.long(0x014A, &[sub]),
        ];
        s.ifd(&fields, 0)
    };
    s.set_first_ifd(ifd0);

    let tags = parse(&s.into_bytes()).expect("valid TIFF");
    assert_eq!(tags.main_image(), Some("SubIFD0"));
    assert_eq!(tags.get("ImageWidth"), Some(&Value::Int(4000)));
    assert_eq!(tags.get("ImageHeight"), Some(&Value::Int(3000)));
    assert_eq!(tags.get("Compression"), Some(&Value::Int(7)));
    assert_eq!(tags.get("SubIFD0:ImageWidth"), Some(&Value::Int(4000)));
    // The reduced first directory becomes a preview.
    assert_eq!(tags.get("IFD0:ImageWidth"), Some(&Value::Int(100)));
    assert_eq!(tags.get("IFD0:Compression"), Some(&Value::Int(1)));
    // Non-critical preview tags fill in what the main image lacks.
    assert_eq!(tags.get("Make"), Some(&text("Acme")));
}

#[test]
fn secondary_sub_ifds_do_not_override_critical_tags() {
    let mut s = Stream::le();
    s.pad_to(16);
    let sub = {
        let fields = [
            s.long(0x00FE, &[1]),
            s.long(0x0100, &[160]),
            s.ascii(0x0131, "Firmware 2"),
        ];
        s.ifd(&fields, 0)
    };
    let ifd0 = {
        let fields = [
            s.short(0x0100, &[4000]),
            s.short(0x0101, &[3000]),
            s.long(0x014A, &[sub]),
        ];
        s.ifd(&fields, 0)
    };
    s.set_first_ifd(ifd0);

    let tags = parse(&s.into_bytes()).expect("valid TIFF");
    assert_eq!(tags.main_image(), Some("IFD0"));
    assert_eq!(tags.get("ImageWidth"), Some(&Value::Int(4000)));
    assert_eq!(tags.get("SubIFD0:ImageWidth"), Some(&Value::Int(160)));
    assert!(tags.get("EXIF:ImageWidth").is_none());
    assert_eq!(tags.get("EXIF:Software"), Some(&text("Firmware 2")));
}

#[test]
fn thumbnail_directory() {
    let mut s = Stream::be();
    s.pad_to(16);
    let ifd1 = {
        let fields = [
            s.long(0x00FE, &[1]),
            s.short(0x0103, &[6]),
            s.long(0x0201, &[4096]),
            s.long(0x0202, &[1234]),
            s.ascii(0x0131, "Thumbnailer"),
        ];
        s.ifd(&fields, 0)
    };
    let ifd0 = {
        let fields = [
            s.short(0x0100, &[100]),
            s.short(0x0101, &[50]),
            s.short(0x0103, &[1]),
        ];
        s.ifd(&fields, ifd1)
    };
    s.set_first_ifd(ifd0);

    let tags = parse(&s.into_bytes()).expect("valid TIFF");
    assert_eq!(tags.main_image(), Some("IFD0"));
    assert_eq!(tags.get("Compression"), Some(&Value::Int(1)));
    assert_eq!(tags.get("IFD1:Compression"), Some(&Value::Int(6)));
    assert_eq!(tags.get("EXIF:ThumbnailOffset"), Some(&Value::Int(4096)));
    assert_eq!(tags.get("EXIF:ThumbnailLength"), Some(&Value::Int(1234)));
    assert_eq!(tags.get("IFD1:ThumbnailOffset"), Some(&Value::Int(4096)));
    assert_eq!(tags.get("Software"), Some(&text("Thumbnailer")));
}

#[test]
fn unknown_tags_and_binary_runs() {
    let tiff = single_ifd(ByteOrder::LittleEndian, |s| {
        vec![
            s.short(0x0100, &[1]),
            s.bytes(0x02BC, &[b'x'; 100]),
            s.bytes(0x1234, &[1, 2, 3]),
            s.at_offset(0x1235, 99, 1, 7),
        ]
    });
    let tags = parse(&tiff).expect("valid TIFF");

    assert_eq!(tags.get("ApplicationNotes"), Some(&Value::Bytes(vec![b'x'; 100])));
    assert_eq!(tags.get("Unknown0x1234"), Some(&Value::IntList(vec![1, 2, 3])));
    // Unknown field types are skipped.
    assert!(tags.get("Unknown0x1235").is_none());
}

#[test]
fn out_of_range_value_is_skipped() {
    let tiff = single_ifd(ByteOrder::LittleEndian, |s| {
        vec![
            s.short(0x0100, &[1]),
            s.at_offset(0x010E, 2, 40, 0xFFFF_0000),
            s.short(0x0112, &[3]),
        ]
    });
    let tags = parse(&tiff).expect("valid TIFF");

    assert!(tags.get("ImageDescription").is_none());
    assert_eq!(tags.get("Orientation"), Some(&Value::Int(3)));
}

#[test]
fn raw_wrappers() {
    let mut orf = Stream::with_magic(ByteOrder::LittleEndian, 0x4F52);
    let fields = [orf.ascii(0x010F, "OLYMPUS IMAGING CORP.")];
    orf.ifd(&fields, 0);
    let tags = parse(&orf.into_bytes()).expect("valid ORF");
    assert_eq!(tags.container(), ContainerKind::Orf);
    assert_eq!(tags.get("Make"), Some(&text("OLYMPUS IMAGING CORP.")));

    let tiff = single_ifd(ByteOrder::BigEndian, |s| vec![s.short(0x0112, &[8])]);
    let mut raf = b"FUJIFILMCCD-RAW 0201FF383501".to_vec();
    raf.resize(128, 0);
    raf[84..88].copy_from_slice(&128u32.to_be_bytes());
    raf.extend(jpeg(&tiff));
    let tags = parse(&raf).expect("valid RAF");
    assert_eq!(tags.container(), ContainerKind::Raf);
    assert_eq!(tags.get("Orientation"), Some(&Value::Int(8)));

    let mut blob = b"Exif\0\0".to_vec();
    blob.extend_from_slice(&tiff);
    let tags = parse(&blob).expect("valid APP1 payload");
    assert_eq!(tags.container(), ContainerKind::ExifBlob);
    assert_eq!(tags.get("Orientation"), Some(&Value::Int(8)));
}

#[test]
fn rw2_secondary_stream_is_merged() {
    let mut rw2 = Stream::with_magic(ByteOrder::LittleEndian, 0x55);
    let fields = [rw2.ascii(0x010F, "Panasonic"), rw2.short(0x0100, &[5000])];
    rw2.ifd(&fields, 0);
    rw2.pad_to(512);

    let secondary = single_ifd(ByteOrder::LittleEndian, |s| {
        vec![s.ascii(0x010F, "Other"), s.ascii(0x0110, "DC-S1")]
    });
    rw2.append(&secondary);

    let tags = parse(&rw2.into_bytes()).expect("valid RW2");
    assert_eq!(tags.container(), ContainerKind::Rw2);
    assert_eq!(tags.get("Make"), Some(&text("Panasonic")));
    assert_eq!(tags.get("Model"), Some(&text("DC-S1")));
    assert_eq!(tags.get("ImageWidth"), Some(&Value::Int(5000)));
}

#[test]
fn fatal_errors() {
    assert_eq!(parse(b""), Err(ReadError::UnsupportedFormat));
    assert_eq!(parse(b"GIF89a\x01\0\x01\0"), Err(ReadError::UnsupportedFormat));
    assert_eq!(
        parse(b"\xff\xd8\xff\xd9"),
        Err(ReadError::NoExifData(ContainerKind::Jpeg))
    );
    assert_eq!(
        parse(b"Exif\0\0II*\0"),
        Err(ReadError::TruncatedHeader { needed: 8, actual: 4 })
    );
    assert_eq!(
        parse(b"Exif\0\0MM\0+\0\0\0\x08"),
        Err(ReadError::InvalidMagic(0x2B))
    );
}

#[test]
fn header_without_directories() {
    let tags = parse(b"II*\0\xff\xff\0\0").expect("header is valid");
    assert_eq!(tags.main_image(), None);
    assert_eq!(tags.len(), 1);
    assert!(tags.get("File:ExifByteOrder").is_some());
}

#[test]
fn decoding_is_deterministic() {
    let data = jpeg(&camera_stream(ByteOrder::BigEndian));
    assert_eq!(parse(&data), parse(&data));
}

#[test]
fn truncated_prefixes() {
    let data = jpeg(&camera_stream(ByteOrder::LittleEndian));
    let complete = parse(&data).expect("valid JPEG");

    for len in 0..data.len() {
        if let Ok(tags) = parse(&data[..len]) {
            assert!(tags.len() <= complete.len(), "prefix of {} bytes", len);
        }
    }
}

#[test]
fn exif_3_announces_utf8_text() {
    let exif_stream = |version: &[u8]| {
        let mut s = Stream::le();
        let exif = {
            let fields = [s.undefined(0x9000, version), s.ascii(0xA434, "Sonnar 55mm F1.8 Ø49")];
            s.ifd(&fields, 0)
        };
        let ifd0 = {
            let fields = [s.pointer(Tag::ExifOffset.to_u16(), exif)];
            s.ifd(&fields, 0)
        };
        s.set_first_ifd(ifd0);
        s.into_bytes()
    };

    let tags = parse(&exif_stream(b"0300")).expect("valid TIFF");
    assert_eq!(tags.get("EXIF:LensModel"), Some(&text("Sonnar 55mm F1.8 Ø49")));
    assert_eq!(tags.get("EXIF:EXIF3.0"), Some(&Value::Int(1)));
    assert_eq!(tags.get("EXIF:EXIFStandard"), Some(&text("EXIF 3.0")));
    assert_eq!(tags.get("EXIF:SupportsUTF8"), Some(&Value::Int(1)));

    let tags = parse(&exif_stream(b"0232")).expect("valid TIFF");
    assert_eq!(tags.get("EXIF:ExifVersion"), Some(&Value::Bytes(b"0232".to_vec())));
    assert!(tags.get("EXIF:EXIF3.0").is_none());
    assert!(tags.get("EXIF:SupportsUTF8").is_none());
}
