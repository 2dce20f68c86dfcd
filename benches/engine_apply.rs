//! Benchmarks for display engine mutation and snapshot cost
//!
//! - Applying a decoded boot screen
//! - Full-row text rendering in both modes
//! - Snapshot copies handed to renderers and history

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use lcdscope::test_utils::boot_stream;
use lcdscope::{Command, DisplayEngine, FrameDecoder, TextMode};
use std::hint::black_box;

fn decoded_boot_screen() -> Vec<Command> {
    let mut decoder = FrameDecoder::new();
    decoder.feed(&boot_stream(1)).into_iter().filter_map(Result::ok).collect()
}

fn bench_apply(c: &mut Criterion) {
    let commands = decoded_boot_screen();

    let mut group = c.benchmark_group("engine_apply");
    group.throughput(Throughput::Elements(commands.len() as u64));

    group.bench_function("boot_screen", |b| {
        let mut engine = DisplayEngine::default();
        b.iter(|| {
            for command in &commands {
                // Debug commands are refused, which is part of the cost
                let _ = black_box(engine.apply(black_box(command)));
            }
        })
    });

    group.finish();
}

fn bench_text_rows(c: &mut Criterion) {
    let row = "ABCDEFGHIJKLMNOPQRSTU";

    let mut group = c.benchmark_group("engine_text_row");
    group.throughput(Throughput::Elements(row.len() as u64));

    for (name, mode) in [("normal", TextMode::Normal), ("inverse", TextMode::Inverse)] {
        group.bench_function(name, |b| {
            let mut engine = DisplayEngine::default();
            b.iter(|| engine.write_char_at(black_box(row), 3, 0, mode))
        });
    }

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut engine = DisplayEngine::default();
    for command in decoded_boot_screen() {
        let _ = engine.apply(&command);
    }

    c.bench_function("engine_snapshot", |b| b.iter(|| black_box(engine.snapshot())));
}

criterion_group!(benches, bench_apply, bench_text_rows, bench_snapshot);
criterion_main!(benches);
