use std::collections::HashMap;
use std::{fs, path};

use raw_exif::decoder::{Decoder, Limits};
use raw_exif::TagNamespace;

use libtest_mimic::{Arguments, Failed, Trial};
use walkdir::WalkDir;

const FIXTURE_DIR: &str = "tests/fixtures";

// `find tests/fixtures -type f | sort`, with a key every complete file must produce.
const FILES: &[(&str, &str)] = &[
    ("tests/fixtures/camera.jpg", "EXIF:ExposureTime"),
    ("tests/fixtures/camera.png", "GPS:GPSLatitudeRef"),
    ("tests/fixtures/camera_be.tif", "Interop:InteropIndex"),
    ("tests/fixtures/camera_le.tif", "EXIF:ThumbnailOffset"),
    ("tests/fixtures/cycle.tif", "IFD1:SubfileType"),
    ("tests/fixtures/leaf_scan.tif", "Leaf:ISOSpeed"),
    ("tests/fixtures/nikon_subifd.nef", "MakerNote:ISO"),
    ("tests/fixtures/raw_profile.png", "EXIF:ISO"),
    ("tests/fixtures/secondary.rw2", "Make"),
];

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .init();

    let mut candidates: HashMap<_, _> = FILES.iter().copied().collect();
    let mut trials = Vec::new();

    for entry in WalkDir::new(FIXTURE_DIR).sort_by_file_name() {
        let entry = entry.unwrap();

        if !entry.file_type().is_file() {
            continue;
        }

        let Some(path) = entry.path().to_str() else {
            continue;
        };

        let Some(expected_key) = candidates.remove(path) else {
            panic!("File {} not in fixture list", path);
        };

        let path = path.to_string();
        trials.push(Trial::test(
            format!("{}::complete", path),
            {
                let path = path.clone();
                move || -> Result<(), Failed> { decode_complete(&path, expected_key) }
            },
        ));
        trials.push(Trial::test(format!("{}::prefixes", path), move || -> Result<(), Failed> {
            decode_prefixes(&path)
        }));
    }

    if !candidates.is_empty() {
        for (path, _) in candidates {
            eprintln!("Fixture {} not found in directory walk", path);
        }

        panic!("Some fixtures were not found");
    }

    let args = Arguments::from_args();
    libtest_mimic::run(&args, trials).exit();
}

fn read_fixture(path: &str) -> Result<Vec<u8>, Failed> {
    let path = path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(path);
    fs::read(&path).map_err(|e| Failed::from(format_args!("Reading {} failed: {}", path.display(), e)))
}

fn decode(data: &[u8]) -> Result<TagNamespace, raw_exif::ReadError> {
    Decoder::new(data).with_limits(Limits::default()).decode()
}

fn decode_complete(path: &str, expected_key: &str) -> Result<(), Failed> {
    let data = read_fixture(path)?;
    let tags = decode(&data).map_err(|e| Failed::from(format_args!("Decoding failed for {}: {}", path, e)))?;

    if tags.get(expected_key).is_none() {
        return Err(Failed::from(format_args!("{} lacks {}", path, expected_key)));
    }

    if decode(&data) != Ok(tags) {
        return Err(Failed::from(format_args!("Decoding {} twice differs", path)));
    }

    Ok(())
}

/// Every prefix of the file decodes to a namespace or a typed error, the same way twice.
fn decode_prefixes(path: &str) -> Result<(), Failed> {
    let data = read_fixture(path)?;

    for len in 0..data.len() {
        let prefix = &data[..len];
        if decode(prefix) != decode(prefix) {
            return Err(Failed::from(format_args!("Prefix of {} bytes is not deterministic", len)));
        }
    }

    Ok(())
}
