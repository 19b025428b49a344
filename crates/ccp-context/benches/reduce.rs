use ccp_context::{ContextReducer, TruncatingReducer, DEFAULT_MAX_TOKENS};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn context_of(tokens: usize) -> String {
    (0..tokens)
        .map(|index| format!("token{index}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn benchmark_truncation(c: &mut Criterion) {
    let reducer = TruncatingReducer::default();

    let mut group = c.benchmark_group("reduce/truncate");
    for tokens in [DEFAULT_MAX_TOKENS / 2, DEFAULT_MAX_TOKENS * 4, DEFAULT_MAX_TOKENS * 64] {
        let context = context_of(tokens);
        group.throughput(Throughput::Elements(tokens as u64));
        group.bench_with_input(BenchmarkId::from_parameter(tokens), &context, |b, context| {
            b.iter(|| reducer.reduce(black_box("what changed?"), black_box(context)));
        });
    }
    group.finish();
}

criterion_group!(reduce_benches, benchmark_truncation);
criterion_main!(reduce_benches);
