//! Leaf `PKTS` records
//!
//! Leaf backs store most of their settings in the LeafData tag as a sequence of records rather
//! than as a TIFF directory. A record is the magic `PKTS`, a 4-byte version, a NUL terminated
//! name, NUL padding, and a NUL terminated printable value. Values may be preceded by a binary
//! size field which is skipped along with the padding.

use super::RecordDecoder;
use crate::decoder::ifd::Value;
use crate::decoder::stream::{ByteCursor, ByteOrder};

const MAGIC: &[u8] = b"PKTS";
/// Values are short strings; anything longer is not a value.
const MAX_VALUE_LEN: usize = 200;

/// The decoder for `PKTS` record blocks.
#[derive(Debug)]
pub struct Pkts;

pub static PKTS: Pkts = Pkts;

/// Canonical names of record names. `None` marks records that only group other records.
static RECORD_NAMES: &[(&str, Option<&str>)] = &[
    ("camera_profile", None),
    ("CamProf_capture_profile", None),
    ("CamProf_version", Some("CameraProfileVersion")),
    ("CamProf_name", Some("CameraProfileName")),
    ("CamProf_type", Some("CameraProfileType")),
    ("CamProf_back_type", Some("CameraBackType")),
    ("CaptProf_version", Some("CaptProfVersion")),
    ("CaptProf_name", Some("CaptProfName")),
    ("CaptProf_type", Some("CaptProfType")),
    ("CaptProf_back_type", Some("CaptProfBackType")),
    ("ImgProf_version", Some("ImgProfVersion")),
    ("ImgProf_name", Some("ImgProfName")),
    ("ImgProf_type", Some("ImgProfType")),
    ("ImgProf_back_type", Some("ImgProfBackType")),
    ("CameraObj_version", Some("CameraObjVersion")),
    ("CameraObj_name", Some("CameraObjName")),
    ("CameraObj_type", Some("CameraObjType")),
    ("CameraObj_back_type", Some("CameraObjBackType")),
    ("CaptureObj_version", Some("CaptureObjVersion")),
    ("CaptureObj_name", Some("CaptureObjName")),
    ("CaptureObj_type", Some("CaptureObjType")),
    ("CaptureObj_back_type", Some("CaptureObjBackType")),
    ("CaptureSerial", Some("CaptureSerial")),
    ("ShootObj_version", Some("ShootObjVersion")),
    ("ShootObj_name", Some("ShootObjName")),
    ("ShootObj_type", Some("ShootObjType")),
    ("ShootObj_back_type", Some("ShootObjBackType")),
    ("NeutObj_version", Some("NeutObjVersion")),
    ("NeutObj_name", Some("NeutObjName")),
    ("NeutObj_type", Some("NeutObjType")),
    ("NeutObj_back_type", Some("NeutObjBackType")),
    ("Neutrals", Some("Neutrals")),
    ("ColorCasts", Some("ColorCasts")),
    ("SelObj_version", Some("SelObjVersion")),
    ("SelObj_name", Some("SelObjName")),
    ("SelObj_type", Some("SelObjType")),
    ("SelObj_back_type", Some("SelObjBackType")),
    ("Rect", Some("Rect")),
    ("Resolution", Some("Resolution")),
    ("Scale", Some("Scale")),
    ("Locks", Some("Locks")),
    ("Orientation", Some("Orientation")),
    ("ToneObj_version", Some("ToneObjVersion")),
    ("ToneObj_name", Some("ToneObjName")),
    ("ToneObj_type", Some("ToneObjType")),
    ("ToneObj_back_type", Some("ToneObjBackType")),
    ("ShadowEndPoints", Some("ShadowEndPoints")),
    ("HighlightEndPoints", Some("HighlightEndPoints")),
    ("Npts", Some("Npts")),
    ("Tones", Some("Tones")),
    ("Gamma", Some("Gamma")),
    ("SharpObj_version", Some("SharpObjVersion")),
    ("SharpObj_name", Some("SharpObjName")),
    ("SharpObj_type", Some("SharpObjType")),
    ("SharpObj_back_type", Some("SharpObjBackType")),
    ("SharpMethod", Some("SharpMethod")),
    ("DataLen", Some("DataLen")),
    ("SharpInfo", Some("SharpInfo")),
    ("SingleQuality", Some("SingleQuality")),
    ("MultiQuality", Some("MultiQuality")),
    ("ColorObj_version", Some("ColorObjVersion")),
    ("ColorObj_name", Some("ColorObjName")),
    ("ColorObj_type", Some("ColorObjType")),
    ("ColorObj_back_type", Some("ColorObjBackType")),
    ("HasICC", Some("HasICC")),
    ("InputProfile", Some("InputProfile")),
    ("OutputProfile", Some("OutputProfile")),
    ("SaveObj_version", Some("SaveObjVersion")),
    ("SaveObj_name", Some("SaveObjName")),
    ("SaveObj_type", Some("SaveObjType")),
    ("SaveObj_back_type", Some("SaveObjBackType")),
    ("LeafAutoActive", Some("LeafAutoActive")),
    ("LeafHotFolder", Some("LeafHotFolder")),
    ("LeafOutputFileType", Some("LeafOutputFileType")),
    ("LeafAutoBaseName", Some("LeafAutoBaseName")),
    ("LeafSaveSelection", Some("LeafSaveSelection")),
    ("LeafOpenProcHDR", Some("LeafOpenProcHDR")),
    ("StdAutoActive", Some("StdAutoActive")),
    ("StdHotFolder", Some("StdHotFolder")),
    ("StdOutputFileType", Some("StdOutputFileType")),
    ("StdOutputColorMode", Some("StdOutputColorMode")),
    ("StdOutputBitDepth", Some("StdOutputBitDepth")),
    ("StdBaseName", Some("StdBaseName")),
    ("StdSaveSelection", Some("StdSaveSelection")),
    ("StdOxygen", Some("StdOxygen")),
    ("StdOpenInPhotoshop", Some("StdOpenInPhotoshop")),
    ("StdScaledOutput", Some("StdScaledOutput")),
    ("StdSharpenOutput", Some("StdSharpenOutput")),
    ("ISOSpeed", Some("ISOSpeed")),
    ("Strobe", Some("Strobe")),
    ("CameraType", Some("CameraType")),
    ("LensType", Some("LensType")),
    ("LensID", Some("LensID")),
    ("ImageStatus", Some("ImageStatus")),
    ("RotationAngle", Some("RotationAngle")),
    ("PreviewInfo", Some("PreviewInfo")),
    ("PreviewImage", Some("PreviewImage")),
    ("PDAHistogram", Some("PDAHistogram")),
    ("CameraName", Some("CameraName")),
    ("ImageOffset", Some("ImageOffset")),
    ("LuminanceConsts", Some("LuminanceConsts")),
    ("XYOffsetInfo", Some("XYOffsetInfo")),
    ("ColorMatrix", Some("ColorMatrix")),
    ("ReconstructionType", Some("ReconstructionType")),
    ("ImageFields", Some("ImageFields")),
    ("ImageBounds", Some("ImageBounds")),
    ("NumberOfPlanes", Some("NumberOfPlanes")),
    ("RawDataRotation", Some("RawDataRotation")),
    ("ColorAverages", Some("ColorAverages")),
    ("MosaicPattern", Some("MosaicPattern")),
    ("DarkCorrectionType", Some("DarkCorrectionType")),
    ("RightDarkRect", Some("RightDarkRect")),
    ("LeftDarkRect", Some("LeftDarkRect")),
    ("CenterDarkRect", Some("CenterDarkRect")),
    ("CCDRect", Some("CCDRect")),
    ("CCDValidRect", Some("CCDValidRect")),
    ("CCDVideoRect", Some("CCDVideoRect")),
];

impl RecordDecoder for Pkts {
    fn magic(&self) -> &'static [u8] {
        MAGIC
    }

    fn decode(&self, bytes: &[u8]) -> Vec<(String, Value)> {
        let cursor = ByteCursor::new(bytes, ByteOrder::LittleEndian);
        let mut records = Vec::new();
        let mut next = cursor.find(MAGIC, 0, bytes.len());

        while let Some(record) = next {
            // Magic and version.
            let name_start = record + 8;
            let Some(name_len) = bytes
                .get(name_start..)
                .and_then(|rest| rest.iter().position(|&b| b == 0))
            else {
                break;
            };

            let value_start = name_start + name_len + 1;
            next = cursor.find(MAGIC, value_start, bytes.len());
            let value_end = next.unwrap_or(bytes.len());

            let Ok(name) = std::str::from_utf8(&bytes[name_start..name_start + name_len]) else {
                continue;
            };

            let canonical = match RECORD_NAMES.iter().find(|(raw, _)| *raw == name) {
                Some((_, None)) => continue,
                Some((_, Some(canonical))) => *canonical,
                None if !name.is_empty() => name,
                None => continue,
            };

            if let Some(text) = printable_value(&bytes[value_start..value_end]) {
                records.push((canonical.to_owned(), parse_value(text)));
            }
        }

        records
    }
}

fn is_printable(b: &u8) -> bool {
    (0x20..0x7f).contains(b)
}

/// The first printable run in `region`, within the value length ceiling.
fn printable_value(region: &[u8]) -> Option<&str> {
    let window = &region[..region.len().min(MAX_VALUE_LEN)];
    let first = window.iter().position(is_printable)?;
    let len = window[first..]
        .iter()
        .position(|b| !is_printable(b))
        .unwrap_or(window.len() - first);

    let text = std::str::from_utf8(&window[first..first + len]).ok()?.trim();
    (!text.is_empty()).then_some(text)
}

fn parse_value(text: &str) -> Value {
    if let Ok(int) = text.parse::<i64>() {
        return Value::Int(int);
    }

    let numeric = text
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'));
    match text.parse::<f64>() {
        Ok(float) if numeric => Value::Float(float),
        _ => Value::Text(text.to_owned()),
    }
}
