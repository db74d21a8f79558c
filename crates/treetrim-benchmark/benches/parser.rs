use std::hint::black_box;

use codspeed_criterion_compat::{
    BenchmarkId, Criterion, Throughput, criterion_group, criterion_main,
};

fn benchmark_parser(c: &mut Criterion) {
    let sources = [
        ("line", "result = compute(alpha, beta) + offset * 2"),
        ("comprehension", "pairs = {k: [v * 2 for v in vs if v] for k, vs in table.items()}"),
        (
            "function",
            r#"
def search(items, key, *, default=None):
    lo, hi = 0, len(items)
    while lo < hi:
        mid = (lo + hi) // 2
        if items[mid] < key:
            lo = mid + 1
        elif items[mid] > key:
            hi = mid
        else:
            return mid
    return default
"#,
        ),
    ];

    let mut group = c.benchmark_group("Parser Benchmark");

    for (name, source) in sources {
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::new("parse", name), source, |b, source| {
            b.iter(|| black_box(treetrim_parse::parse(source)));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_parser);
criterion_main!(benches);
