//! Line framing and classification benchmarks.
//!
//! Measures the per-chunk cost of the receive path at different chunk sizes.
//!
//! Run with: cargo bench --bench framing
//! Results saved to: target/criterion/

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use twitch_chatbot::{Line, LineFramer};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const CHUNK_SIZES: &[usize] = &[16, 512, 2048];
const LINES_PER_RUN: usize = 1_000;

// ============================================================================
// Fixtures
// ============================================================================

/// Realistic inbound traffic: mostly chat, some probes and notices.
fn traffic() -> Vec<u8> {
    let mut data = String::new();
    for i in 0..LINES_PER_RUN {
        match i % 10 {
            0 => data.push_str("PING :tmi.twitch.tv\r\n"),
            1 => data.push_str(":tmi.twitch.tv 001 bot1 :Welcome, GLHF!\r\n"),
            2 => data.push_str(":viewer!viewer@viewer.tmi.twitch.tv PRIVMSG #chan :!dice\r\n"),
            _ => data.push_str(
                ":viewer!viewer@viewer.tmi.twitch.tv PRIVMSG #chan :hello there, great stream 🎉\r\n",
            ),
        }
    }
    data.into_bytes()
}

// ============================================================================
// Benchmark: Framing
// ============================================================================

fn bench_framing(c: &mut Criterion) {
    let data = traffic();

    let mut group = c.benchmark_group("framing");
    group.throughput(Throughput::Bytes(data.len() as u64));

    for &size in CHUNK_SIZES {
        group.bench_with_input(BenchmarkId::new("push", size), &size, |b, &size| {
            b.iter(|| {
                let mut framer = LineFramer::new();
                let mut count = 0;
                for chunk in data.chunks(size) {
                    count += framer.push(black_box(chunk)).len();
                }
                count
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Framing + Classification
// ============================================================================

fn bench_receive_path(c: &mut Criterion) {
    let data = traffic();

    let mut group = c.benchmark_group("receive_path");
    group.throughput(Throughput::Elements(LINES_PER_RUN as u64));

    group.bench_function("frame_and_parse", |b| {
        b.iter(|| {
            let mut framer = LineFramer::new();
            let mut chats = 0;
            for chunk in data.chunks(2048) {
                for line in framer.push(chunk) {
                    if matches!(Line::parse(black_box(&line)), Line::Chat(_)) {
                        chats += 1;
                    }
                }
            }
            chats
        });
    });

    group.finish();
}

criterion_group!(benches, bench_framing, bench_receive_path);
criterion_main!(benches);
