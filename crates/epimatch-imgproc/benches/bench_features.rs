use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};

use epimatch_image::Image;
use epimatch_imgproc::features::{knn_match, FastDetector, OrbDetector};

fn textured_image(width: usize, height: usize) -> Image<f32, 1> {
    let mut rng = StdRng::seed_from_u64(0);
    let mut data = vec![0.5f32; width * height];
    for _ in 0..(width * height / 400) {
        let x0 = rng.random_range(0..width - 16);
        let y0 = rng.random_range(0..height - 16);
        let v: f32 = rng.random_range(0.0..1.0);
        for y in y0..y0 + 16 {
            for x in x0..x0 + 16 {
                data[y * width + x] = v;
            }
        }
    }
    Image::new([width, height].into(), data).unwrap()
}

fn bench_fast_corner_detect(c: &mut Criterion) {
    let mut group = c.benchmark_group("FastCornerDetect");

    for (width, height) in [(640, 480), (1280, 720)] {
        let img = textured_image(width, height);
        let parameter_string = format!("{width}x{height}");

        group.bench_with_input(
            BenchmarkId::new("fast_native_cpu", &parameter_string),
            &img,
            |b, i| {
                let detector = FastDetector::default();
                b.iter(|| black_box(detector.extract_keypoints(i)).unwrap())
            },
        );
    }

    group.finish();
}

fn bench_orb(c: &mut Criterion) {
    let mut group = c.benchmark_group("Orb");
    group.sample_size(10);

    let img = textured_image(640, 480);
    let orb = OrbDetector::new().with_n_keypoints(2000);

    group.bench_function("detect_and_extract_640x480", |b| {
        b.iter(|| black_box(orb.detect_and_extract(&img)).unwrap())
    });

    let (_, descriptors) = orb.detect_and_extract(&img).unwrap();
    group.bench_function("knn_match_self", |b| {
        b.iter(|| black_box(knn_match(&descriptors, &descriptors, 2)))
    });

    group.finish();
}

criterion_group!(benches, bench_fast_corner_detect, bench_orb);
criterion_main!(benches);
