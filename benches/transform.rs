use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;

use picbox::engine::options::{Degree, Mode, OperationName, OptionSet, OutputFormat, Quality};
use picbox::engine::pipeline::{Engine, OperationChain};

fn create_bench_image(width: u32, height: u32) -> Vec<u8> {
    let mut img = RgbaImage::new(width, height);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        *pixel = image::Rgba([(x % 255) as u8, (y % 255) as u8, ((x + y) % 255) as u8, 255]);
    }
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
}

fn bench_transform(c: &mut Criterion) {
    let input_data = create_bench_image(1920, 1080);
    let engine = Engine::default();

    let mut group = c.benchmark_group("transform");
    group.sample_size(10); // Image ops are slow, reduce sample size

    group.bench_function("crop_1080p_to_thumbnail_jpeg", |b| {
        let options = OptionSet {
            width: Some(200),
            height: Some(200),
            mode: Mode::Crop,
            format: Some(OutputFormat::Jpeg),
            quality: Quality::Value(80),
            ..OptionSet::default()
        };
        let chain = OperationChain::from_names(&[OperationName::Resize], &options).unwrap();
        b.iter(|| {
            engine
                .process(black_box(&input_data), &chain, black_box(&options))
                .unwrap()
        })
    });

    group.bench_function("fill_1080p_to_medium_webp", |b| {
        let options = OptionSet {
            width: Some(800),
            height: Some(800),
            mode: Mode::Fill,
            format: Some(OutputFormat::WebP),
            quality: Quality::Value(85),
            ..OptionSet::default()
        };
        let chain = OperationChain::from_names(&[OperationName::Resize], &options).unwrap();
        b.iter(|| {
            engine
                .process(black_box(&input_data), &chain, black_box(&options))
                .unwrap()
        })
    });

    group.bench_function("rotate_then_resize_png", |b| {
        let options = OptionSet {
            width: Some(400),
            degree: Some(Degree::Angle(30)),
            expand: true,
            ..OptionSet::default()
        };
        let chain = OperationChain::from_names(
            &[OperationName::Rotate, OperationName::Resize],
            &options,
        )
        .unwrap();
        b.iter(|| {
            engine
                .process(black_box(&input_data), &chain, black_box(&options))
                .unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_transform);
criterion_main!(benches);
