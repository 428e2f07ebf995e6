extern crate criterion;
extern crate raw_exif;

use criterion::{
    black_box, measurement::Measurement, BenchmarkGroup, BenchmarkId, Criterion, Throughput,
};

fn read_metadata(data: &[u8]) {
    let tags = raw_exif::parse(black_box(data)).unwrap();
    black_box(tags.len());
}

fn main() {
    struct BenchDef {
        data: &'static [u8],
        id: &'static str,
        sample_size: usize,
    }

    fn run_bench_def<M: Measurement>(group: &mut BenchmarkGroup<M>, def: BenchDef) {
        group
            .sample_size(def.sample_size)
            .throughput(Throughput::Bytes(def.data.len() as u64))
            .bench_with_input(
                BenchmarkId::new(def.id, def.data.len()),
                def.data,
                |b, input| b.iter(|| read_metadata(input)),
            );
    }

    let mut c = Criterion::default().configure_from_args();
    let mut group = c.benchmark_group("parse");

    run_bench_def(
        &mut group,
        BenchDef {
            data: include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/camera.jpg")),
            id: "camera.jpg",
            sample_size: 500,
        },
    );

    // Compressed raw profile, hex decoded after inflating.
    run_bench_def(
        &mut group,
        BenchDef {
            data: include_bytes!(concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/tests/fixtures/raw_profile.png"
            )),
            id: "raw_profile.png",
            sample_size: 500,
        },
    );

    // The MakerNote is only found by scanning.
    run_bench_def(
        &mut group,
        BenchDef {
            data: include_bytes!(concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/tests/fixtures/leaf_scan.tif"
            )),
            id: "leaf_scan.tif",
            sample_size: 500,
        },
    );

    run_bench_def(
        &mut group,
        BenchDef {
            data: include_bytes!(concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/tests/fixtures/secondary.rw2"
            )),
            id: "secondary.rw2",
            sample_size: 500,
        },
    );

    group.finish();
}
