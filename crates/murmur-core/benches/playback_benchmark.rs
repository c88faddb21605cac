use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use murmur_core::{
    ChunkQueue, CompletionGate, ConsumerAdapter, PlaybackStats, SampleChunk, StreamStatus,
};
use std::sync::Arc;

/// One second of 24 kHz audio split into chunks of `chunk_len` samples
fn queued(chunk_len: usize) -> ConsumerAdapter {
    let queue = Arc::new(ChunkQueue::unbounded());
    let audio: Vec<f32> = (0..24_000).map(|i| (i as f32 * 0.001).sin() * 0.5).collect();
    for chunk in audio.chunks(chunk_len) {
        queue.append(SampleChunk::from_slice(chunk)).unwrap();
    }
    queue.mark_producer_finished();
    ConsumerAdapter::new(
        queue,
        Arc::new(CompletionGate::new()),
        Arc::new(PlaybackStats::new()),
    )
}

fn bench_consumer_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("consumer_fill");

    let cases = vec![
        ("small_chunks_256_frame", 64, 256),
        ("matched_1024", 1_024, 1_024),
        ("large_chunks_128_frame", 4_800, 128),
    ];

    for (name, chunk_len, frame_len) in cases {
        group.bench_function(BenchmarkId::new("drain_1sec", name), |b| {
            let mut frame = vec![0.0_f32; frame_len];
            b.iter_batched(
                || queued(chunk_len),
                |mut consumer| {
                    while consumer.fill(black_box(&mut frame)) == StreamStatus::Continue {}
                    black_box(consumer)
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn bench_queue_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_append");

    for chunk_len in [256_usize, 2_400, 24_000] {
        let chunk: Vec<f32> = vec![0.25; chunk_len];
        group.bench_with_input(BenchmarkId::from_parameter(chunk_len), &chunk, |b, chunk| {
            let queue = ChunkQueue::unbounded();
            b.iter(|| {
                queue.append(SampleChunk::from_slice(black_box(chunk))).unwrap();
                black_box(queue.try_take())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_consumer_fill, bench_queue_append);
criterion_main!(benches);
