//! Criterion microbenches for the operator hot path.
//!
//! - Unary: rotate, cut (with crystal breaking), pin push, crystallize.
//! - Binary: full swap, stack.
//!
//! Inputs are random valid shapes from a fixed seed so runs compare.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};
use shapez::api::*;

fn random_valid(rng: &mut StdRng, n: usize) -> Vec<Shape> {
    let mut out = Vec::with_capacity(n);
    while out.len() < n {
        let shape = Shape(rng.gen::<u32>());
        if shape.is_valid() {
            out.push(shape);
        }
    }
    out
}

fn bench_unary(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let shapes = random_valid(&mut rng, 1024);
    let mut group = c.benchmark_group("unary");
    let ops: [(&str, fn(Shape) -> Shape); 5] = [
        ("rotate_right", rotate_right),
        ("cut_left", cut_left),
        ("cut_right", cut_right),
        ("pin_push", pin_push),
        ("crystallize", crystallize),
    ];
    for (name, f) in ops {
        group.bench_function(BenchmarkId::new(name, shapes.len()), |b| {
            b.iter(|| {
                for &s in &shapes {
                    black_box(f(black_box(s)));
                }
            })
        });
    }
    group.finish();
}

fn bench_binary(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let pairs: Vec<(Shape, Shape)> = random_valid(&mut rng, 512)
        .chunks_exact(2)
        .map(|p| (p[0], p[1]))
        .collect();
    let mut group = c.benchmark_group("binary");
    let ops: [(&str, fn(Shape, Shape) -> Shape); 3] =
        [("swap_left", swap_left), ("stack", stack), ("fast_stack", fast_stack)];
    for (name, f) in ops {
        group.bench_function(BenchmarkId::new(name, pairs.len()), |b| {
            b.iter(|| {
                for &(x, y) in &pairs {
                    black_box(f(black_box(x), black_box(y)));
                }
            })
        });
    }
    group.finish();
}

fn bench_key(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(3);
    let shapes = random_valid(&mut rng, 1024);
    c.bench_function("key", |b| {
        b.iter(|| shapes.iter().filter(|s| s.is_key()).count())
    });
}

criterion_group!(benches, bench_unary, bench_binary, bench_key);
criterion_main!(benches);
