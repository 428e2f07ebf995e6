#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut limits = raw_exif::decoder::Limits::default();
    limits.ifd_value_size = 1_000_000;
    limits.makernote_scan_window = 4096;

    let _ = raw_exif::decoder::Decoder::new(data).with_limits(limits).decode();
});
