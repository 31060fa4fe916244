use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use epimatch_3d::pose::{fundamental_8point, ransac_fundamental, RansacParams};

// points on two views related by a horizontal translation, with a share of outliers
fn make_correspondences(n: usize, outlier_every: usize) -> (Vec<[f64; 2]>, Vec<[f64; 2]>) {
    let mut x1 = Vec::with_capacity(n);
    let mut x2 = Vec::with_capacity(n);
    for i in 0..n {
        let u = (i as f64 * 0.618_034).fract() * 640.0;
        let v = (i as f64 * 0.414_214).fract() * 480.0;
        let depth = 2.0 + (i as f64 * 0.732_051).fract() * 6.0;
        x1.push([u, v]);
        if i % outlier_every == 0 {
            x2.push([640.0 - u, 480.0 - v]);
        } else {
            x2.push([u - 300.0 / depth, v]);
        }
    }
    (x1, x2)
}

fn bench_fundamental(c: &mut Criterion) {
    let mut group = c.benchmark_group("Fundamental");

    for n in [100, 1000] {
        let (x1, x2) = make_correspondences(n, 4);

        group.bench_with_input(BenchmarkId::new("8point", n), &n, |b, _| {
            b.iter(|| black_box(fundamental_8point(&x1, &x2)))
        });

        group.bench_with_input(BenchmarkId::new("ransac", n), &n, |b, _| {
            let params = RansacParams::default();
            b.iter(|| black_box(ransac_fundamental(&x1, &x2, &params)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fundamental);
criterion_main!(benches);
