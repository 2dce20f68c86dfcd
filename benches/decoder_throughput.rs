//! Benchmarks for the streaming frame decoder
//!
//! Measures decode throughput on a realistic command mix for:
//! - One large chunk
//! - Small chunks as a USB serial adapter delivers them
//! - Byte-at-a-time feeding (worst case state machine overhead)

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use lcdscope::FrameDecoder;
use lcdscope::test_utils::boot_stream;
use std::hint::black_box;

fn bench_chunked_decode(c: &mut Criterion) {
    let stream = boot_stream(100);

    let mut group = c.benchmark_group("decoder_chunked");
    group.throughput(Throughput::Bytes(stream.len() as u64));

    for chunk_size in [1usize, 16, 64, stream.len()] {
        group.bench_with_input(BenchmarkId::from_parameter(chunk_size), &chunk_size, |b, &size| {
            b.iter(|| {
                let mut decoder = FrameDecoder::new();
                let mut decoded = 0usize;
                for chunk in stream.chunks(size) {
                    decoded += decoder.feed(black_box(chunk)).len();
                }
                black_box(decoded)
            })
        });
    }

    group.finish();
}

fn bench_feed_byte(c: &mut Criterion) {
    let stream = boot_stream(10);

    let mut group = c.benchmark_group("decoder_feed_byte");
    group.throughput(Throughput::Bytes(stream.len() as u64));

    group.bench_function("boot_screen_x10", |b| {
        b.iter(|| {
            let mut decoder = FrameDecoder::new();
            let mut decoded = 0usize;
            for &byte in &stream {
                if decoder.feed_byte(black_box(byte)).is_some() {
                    decoded += 1;
                }
            }
            black_box(decoded)
        })
    });

    group.finish();
}

fn bench_noise_resync(c: &mut Criterion) {
    // Line noise before the first sentinel is discarded byte by byte
    let mut stream = vec![0x55u8; 4096];
    stream.extend(boot_stream(1));

    c.bench_function("decoder_noise_resync", |b| {
        b.iter(|| {
            let mut decoder = FrameDecoder::new();
            black_box(decoder.feed(black_box(&stream)).len())
        })
    });
}

criterion_group!(benches, bench_chunked_decode, bench_feed_byte, bench_noise_resync);
criterion_main!(benches);
