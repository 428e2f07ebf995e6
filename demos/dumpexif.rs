//! Print every tag found in the files given on the command line.
//!
//! Set `RUST_LOG=raw_exif=debug` to see skipped tags and MakerNote resolution.
use std::{env, fs, process};

use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let paths: Vec<_> = env::args_os().skip(1).collect();
    if paths.is_empty() {
        eprintln!("usage: dumpexif FILE...");
        process::exit(2);
    }

    let mut failed = false;
    for path in paths {
        let path = std::path::Path::new(&path);
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(err) => {
                eprintln!("{}: {}", path.display(), err);
                failed = true;
                continue;
            }
        };

        match raw_exif::parse(&data) {
            Ok(tags) => {
                println!(
                    "== {} ({:?}, main image {})",
                    path.display(),
                    tags.container(),
                    tags.main_image().unwrap_or("none")
                );
                for (key, value) in &tags {
                    println!("{:<40} {}", key, value);
                }
            }
            Err(err) => {
                eprintln!("{}: {}", path.display(), err);
                failed = true;
            }
        }
    }

    if failed {
        process::exit(1);
    }
}
