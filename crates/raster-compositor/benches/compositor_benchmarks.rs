//! Benchmarks for tile compositing.
//!
//! Run with: cargo bench --package raster-compositor --bench compositor_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use raster_compositor::{CompositorOptions, MemoryOpener, RasterCompositor, SourceDescriptor};
use test_utils::create_u8_pyramid;
use tokio::runtime::Runtime;

fn build_compositor(rt: &Runtime, source_count: usize, nodata: bool) -> RasterCompositor {
    let mut opener = MemoryOpener::new();
    let mut sources = Vec::new();
    for i in 0..source_count {
        let url = format!("band{}.tif", i);
        opener.insert(url.clone(), create_u8_pyramid(1024, 1024, 3, 256, 1));
        let source = SourceDescriptor::new(url);
        sources.push(if nodata { source.with_nodata(0.0) } else { source });
    }

    let mut compositor = RasterCompositor::new(sources, CompositorOptions::default()).unwrap();
    rt.block_on(compositor.configure(&opener)).unwrap();
    compositor
}

fn bench_load_tile(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("load_tile");
    group.throughput(Throughput::Elements(256 * 256));

    for source_count in [1usize, 2, 3] {
        for nodata in [false, true] {
            let compositor = build_compositor(&rt, source_count, nodata);
            let id = format!("{}src_nodata={}", source_count, nodata);
            group.bench_with_input(BenchmarkId::from_parameter(id), &compositor, |b, compositor| {
                b.iter(|| {
                    let tile = rt.block_on(compositor.load_tile(2, 1, 1)).unwrap();
                    black_box(tile)
                })
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_load_tile);
criterion_main!(benches);
