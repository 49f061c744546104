use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use slp_recompress::{decompress, Grammar, Recompressor};

/// Generate repetitive text data
fn generate_repetitive_text(size: usize) -> Vec<u8> {
    let pattern = b"the quick brown fox jumps over the lazy dog ";
    pattern.repeat(size / pattern.len())
}

/// Generate source code-like data
fn generate_source_code(size: usize) -> Vec<u8> {
    let patterns: [&[u8]; 7] = [
        b"fn main() {\n",
        b"    let x = 42;\n",
        b"    println!(\"Hello, world!\");\n",
        b"    if x > 0 {\n",
        b"        return x;\n",
        b"    }\n",
        b"}\n",
    ];

    let mut result = Vec::with_capacity(size);
    let mut i = 0;
    while result.len() < size {
        result.extend_from_slice(patterns[i % patterns.len()]);
        i += 1;
    }
    result.truncate(size);
    result
}

/// Generate low-repetition data (simulating base64)
fn generate_low_repetition(size: usize) -> Vec<u8> {
    let chars = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut seed = 12345u64;

    (0..size)
        .map(|_| {
            // Simple LCG random
            seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
            chars[(seed % chars.len() as u64) as usize]
        })
        .collect()
}

fn bench_recompress(c: &mut Criterion) {
    let sizes = [1_000, 4_000, 16_000];
    let mut group = c.benchmark_group("recompress");
    group.sample_size(10);

    for size in sizes.iter() {
        let inputs = [
            ("repetitive", generate_repetitive_text(*size)),
            ("source_code", generate_source_code(*size)),
            ("low_repetition", generate_low_repetition(*size)),
        ];

        for (name, data) in inputs {
            let grammar = Grammar::from_bytes(&data);
            group.bench_with_input(BenchmarkId::new(name, size), &grammar, |b, grammar| {
                b.iter(|| {
                    let result = Recompressor::new(black_box(grammar.clone()))
                        .with_observer(())
                        .run();
                    black_box(result)
                });
            });
        }
    }

    group.finish();
}

fn bench_excerpt(c: &mut Criterion) {
    let sizes = [10_000, 100_000, 1_000_000];
    let mut group = c.benchmark_group("excerpt");

    for size in sizes.iter() {
        let data = generate_repetitive_text(*size);
        let grammar = Grammar::from_bytes(&data);
        let middle = data.len() / 2;

        group.bench_with_input(BenchmarkId::new("window_64", size), &grammar, |b, grammar| {
            b.iter(|| black_box(grammar.excerpt(black_box(middle), black_box(middle + 64))));
        });

        group.bench_with_input(BenchmarkId::new("whole", size), &grammar, |b, grammar| {
            b.iter(|| black_box(grammar.excerpt(0, black_box(data.len()))));
        });
    }

    group.finish();
}

fn bench_decompress(c: &mut Criterion) {
    let sizes = [1_000, 10_000, 100_000];
    let mut group = c.benchmark_group("decompress");

    for size in sizes.iter() {
        let data = generate_repetitive_text(*size);

        // Prepare pre-built grammars
        let balanced = Grammar::from_bytes(&data);
        let recompressed = Recompressor::new(balanced.clone())
            .with_observer(())
            .run()
            .grammar;

        group.bench_with_input(BenchmarkId::new("balanced", size), &balanced, |b, grammar| {
            b.iter(|| black_box(decompress(grammar)));
        });

        group.bench_with_input(
            BenchmarkId::new("recompressed", size),
            &recompressed,
            |b, grammar| {
                b.iter(|| {
                    let count: usize = black_box(grammar.iter().count());
                    black_box(count)
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_recompress, bench_excerpt, bench_decompress);
criterion_main!(benches);
