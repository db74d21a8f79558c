use std::hint::black_box;

use codspeed_criterion_compat::{BenchmarkId, Criterion, criterion_group, criterion_main};
use treetrim_prune::{ExactOptimizer, GreedyOptimizer};
use treetrim_syntax::Node;

const SOURCE: &str = "total = price(item, qty=2) * (1 - discount) + shipping[region] or fallback";

fn attributed() -> Node {
    let mut tree = treetrim_parse::get_node(SOURCE).expect("benchmark source parses");
    let tokens = SOURCE.split_whitespace().map(str::to_owned).collect::<Vec<_>>();
    let logprobs = (0..tokens.len()).map(|i| -0.05 - (i * 7 % 11) as f64 * 0.21).collect::<Vec<_>>();
    treetrim_analysis::attribute(&mut tree, SOURCE, &tokens, &logprobs)
        .expect("tokens spell the source");
    tree
}

fn benchmark_prune(c: &mut Criterion) {
    let tree = attributed();
    let thresholds = [8.0, 4.0, 2.0, 1.0, 0.5];

    let mut group = c.benchmark_group("Prune Benchmark");

    for max_holes in [Some(1), Some(3), None] {
        let label = max_holes.map_or_else(|| "unbounded".to_owned(), |m| format!("m={m}"));

        group.bench_with_input(BenchmarkId::new("exact", &label), &max_holes, |b, &max_holes| {
            let optimizer = ExactOptimizer::new(max_holes);
            b.iter(|| black_box(optimizer.prune(&tree, &thresholds)));
        });

        group.bench_with_input(BenchmarkId::new("greedy", &label), &max_holes, |b, &max_holes| {
            let optimizer = GreedyOptimizer::new(max_holes);
            b.iter(|| black_box(optimizer.prune_all(&tree, &thresholds)));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_prune);
criterion_main!(benches);
