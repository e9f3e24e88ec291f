use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dragoneye::fuzzy::crisp_inputs;
use dragoneye::fuzzy::presets::{self, DIAMETER, LENGTH, RATIO, WEIGHT};
use dragoneye::*;
use image::{DynamicImage, Rgb, RgbImage};

fn specimen_photo() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(640, 480, |x, y| {
        let dx = (f64::from(x) - 320.0) / 220.0;
        let dy = (f64::from(y) - 240.0) / 140.0;
        if dx * dx + dy * dy <= 1.0 {
            Rgb([205, 35, 70])
        } else {
            Rgb([245, 245, 245])
        }
    }))
}

fn bench_fuzzy_evaluate(c: &mut Criterion) {
    let rules = presets::shared_size_rule_base();
    let inputs = crisp_inputs([(LENGTH, 0.42), (DIAMETER, 0.61), (WEIGHT, 0.37), (RATIO, 0.88)]);

    c.bench_function("fuzzy_size_evaluate", |b| {
        b.iter(|| black_box(rules.evaluate(black_box(&inputs)).unwrap()))
    });
}

fn bench_rule_base_build(c: &mut Criterion) {
    c.bench_function("size_rule_base_build", |b| {
        b.iter(|| black_box(presets::size_rule_base().unwrap()))
    });
}

fn bench_segmentation(c: &mut Criterion) {
    let hsv = preprocess(&specimen_photo(), &PreprocessConfig::default()).unwrap();
    let segmenter = Segmenter::default();

    c.bench_function("segment_640x480", |b| {
        b.iter(|| black_box(segmenter.segment(black_box(&hsv))))
    });
}

fn bench_grade_image(c: &mut Criterion) {
    let image = specimen_photo();
    let grader = Grader::default();

    c.bench_function("grade_image_640x480", |b| {
        b.iter(|| black_box(grader.grade_image(black_box(&image), None, None).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_fuzzy_evaluate,
    bench_rule_base_build,
    bench_segmentation,
    bench_grade_image
);
criterion_main!(benches);
