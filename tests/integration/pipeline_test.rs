//! End-to-end engine tests: raw option strings in, encoded bytes out.

use bytes::Bytes;
use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use img_parts::{jpeg::Jpeg, ImageEXIF};
use std::io::Cursor;

use picbox::engine::jpeg::read_profile;
use picbox::engine::options::{parse_operations, OptionSet, OutputFormat, RawOptions, ResizeLimits};
use picbox::engine::pipeline::{Engine, OperationChain, ProcessedImage};
use picbox::error::{ErrorKind, ImageError};

/// Left half red, right half blue
fn halves(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgb([255, 0, 0])
        } else {
            Rgb([0, 0, 255])
        }
    }))
}

fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, format).unwrap();
    buffer.into_inner()
}

fn jpeg_with_quality(img: &DynamicImage, quality: u8) -> Vec<u8> {
    let mut out = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality)
        .encode_image(img)
        .unwrap();
    out
}

/// Minimal little-endian TIFF block holding only the orientation tag
fn orientation_exif(orientation: u16) -> Bytes {
    let mut exif = vec![b'I', b'I', 0x2A, 0x00, 0x08, 0x00, 0x00, 0x00];
    exif.extend_from_slice(&[0x01, 0x00]);
    exif.extend_from_slice(&[0x12, 0x01, 0x03, 0x00, 0x01, 0x00, 0x00, 0x00]);
    exif.extend_from_slice(&orientation.to_le_bytes());
    exif.extend_from_slice(&[0x00, 0x00]);
    exif.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
    Bytes::from(exif)
}

fn with_exif(jpeg: Vec<u8>, exif: Bytes) -> Vec<u8> {
    let mut container = Jpeg::from_bytes(Bytes::from(jpeg)).unwrap();
    container.set_exif(Some(exif));
    container.encoder().bytes().to_vec()
}

fn run(source: &[u8], ops: &str, pairs: &[(&str, &str)]) -> Result<ProcessedImage, ImageError> {
    let operations = parse_operations(ops)?;
    let mut raw = RawOptions::new();
    for (name, value) in pairs {
        assert!(raw.set(name, *value), "unknown option {}", name);
    }
    let options = OptionSet::normalize(&raw, &operations, &ResizeLimits::default())?;
    let chain = OperationChain::from_names(&operations, &options)?;
    Engine::default().process(source, &chain, &options)
}

fn decode(processed: &ProcessedImage) -> DynamicImage {
    image::load_from_memory(&processed.data).unwrap()
}

#[test]
fn test_crop_center_to_square() {
    let source = encode(&halves(400, 300), ImageFormat::Png);
    let out = run(&source, "resize", &[("width", "100"), ("height", "100")]).unwrap();

    assert_eq!(out.format, Some(OutputFormat::Png));
    let img = decode(&out);
    assert_eq!(img.dimensions(), (100, 100));
    // centered crop keeps both halves
    let left = img.get_pixel(10, 50);
    let right = img.get_pixel(90, 50);
    assert!(left[0] > 250 && left[2] < 5, "{:?}", left);
    assert!(right[2] > 250 && right[0] < 5, "{:?}", right);
}

#[test]
fn test_fill_pads_with_background() {
    let source = encode(&halves(400, 300), ImageFormat::Png);
    let out = run(
        &source,
        "resize",
        &[
            ("width", "500"),
            ("height", "400"),
            ("mode", "fill"),
            ("background", "ccc"),
        ],
    )
    .unwrap();

    let img = decode(&out);
    assert_eq!(img.dimensions(), (500, 400));
    assert_eq!(img.get_pixel(250, 10).0[..3], [204, 204, 204]);
    assert_eq!(img.get_pixel(10, 200).0[..3], [204, 204, 204]);
}

#[test]
fn test_single_dimension_keeps_aspect() {
    let source = encode(&halves(400, 300), ImageFormat::Png);
    let out = run(&source, "resize", &[("width", "200")]).unwrap();
    assert_eq!(decode(&out).dimensions(), (200, 150));
}

#[test]
fn test_operation_order_is_honored() {
    let source = encode(&halves(200, 100), ImageFormat::Png);
    let pairs = [("rect", "0,0,100,50"), ("degree", "90")];

    let region_then_rotate = decode(&run(&source, "region,rotate", &pairs).unwrap());
    let rotate_then_region = decode(&run(&source, "rotate,region", &pairs).unwrap());

    assert_eq!(region_then_rotate.dimensions(), (50, 100));
    assert_eq!(rotate_then_region.dimensions(), (100, 50));
}

#[test]
fn test_region_out_of_bounds() {
    let source = encode(&halves(100, 100), ImageFormat::Png);
    let err = run(&source, "region", &[("rect", "50,50,60,10")]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Rectangle);
}

#[test]
fn test_noop_returns_source_bytes() {
    let source = encode(&halves(10, 10), ImageFormat::Png);
    let out = run(&source, "noop", &[]).unwrap();
    assert_eq!(out.data, source);
    assert_eq!(out.format, None);
}

#[test]
fn test_auto_rotation_from_exif() {
    let jpeg = jpeg_with_quality(&halves(40, 20), 90);
    let source = with_exif(jpeg, orientation_exif(6));

    let auto = run(&source, "rotate", &[("degree", "auto")]).unwrap();
    assert_eq!(auto.format, Some(OutputFormat::Jpeg));
    assert_eq!(decode(&auto).dimensions(), (20, 40));

    let explicit = run(&source, "rotate", &[("degree", "90")]).unwrap();
    assert_eq!(decode(&auto).to_rgb8(), decode(&explicit).to_rgb8());
}

#[test]
fn test_auto_rotation_without_orientation_is_identity() {
    let source = jpeg_with_quality(&halves(40, 20), 90);
    let out = run(&source, "rotate", &[("degree", "auto")]).unwrap();
    assert_eq!(decode(&out).dimensions(), (40, 20));
}

#[test]
fn test_preserve_exif() {
    let exif = orientation_exif(1);
    let source = with_exif(jpeg_with_quality(&halves(40, 20), 90), exif.clone());

    let kept = run(&source, "resize", &[("width", "20"), ("preserve_exif", "1")]).unwrap();
    let container = Jpeg::from_bytes(Bytes::from(kept.data)).unwrap();
    assert_eq!(container.exif(), Some(exif));

    let dropped = run(&source, "resize", &[("width", "20")]).unwrap();
    let container = Jpeg::from_bytes(Bytes::from(dropped.data)).unwrap();
    assert_eq!(container.exif(), None);
}

#[test]
fn test_quality_keep_follows_source() {
    let source = jpeg_with_quality(&halves(64, 64), 60);
    let out = run(&source, "resize", &[("width", "32"), ("quality", "keep")]).unwrap();

    let estimate = read_profile(&out.data).unwrap().quality.unwrap();
    assert!((estimate as i16 - 60).abs() <= 3, "estimated {}", estimate);
}

#[test]
fn test_quality_keep_repeated_save_is_stable() {
    let source = jpeg_with_quality(&halves(64, 64), 75);
    let pairs = [("width", "64"), ("quality", "keep")];

    let first = run(&source, "resize", &pairs).unwrap();
    let second = run(&source, "resize", &pairs).unwrap();
    assert_eq!(first.data, second.data);
}

#[test]
fn test_transparent_png_to_jpeg_uses_background() {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(30, 30, Rgba([0, 0, 0, 0])));
    let source = encode(&img, ImageFormat::Png);
    let out = run(
        &source,
        "resize",
        &[
            ("width", "30"),
            ("format", "jpeg"),
            ("background", "00ff00"),
            ("quality", "100"),
        ],
    )
    .unwrap();

    assert_eq!(out.format, Some(OutputFormat::Jpeg));
    let pixel = decode(&out).get_pixel(15, 15);
    assert!(pixel[1] > 240 && pixel[0] < 15 && pixel[2] < 15, "{:?}", pixel);
}

#[test]
fn test_webp_output() {
    let source = encode(&halves(40, 40), ImageFormat::Png);
    let out = run(&source, "resize", &[("width", "20"), ("format", "webp")]).unwrap();
    assert_eq!(out.format, Some(OutputFormat::WebP));
    assert_eq!(decode(&out).dimensions(), (20, 20));
}

#[test]
fn test_validation_failures() {
    let source = encode(&halves(10, 10), ImageFormat::Png);
    let cases = [
        ("resize", vec![], ErrorKind::Dimensions),
        ("resize", vec![("width", "-1")], ErrorKind::Dimensions),
        ("rotate", vec![("degree", "360")], ErrorKind::Degree),
        ("region", vec![("rect", "1,2,3")], ErrorKind::Rectangle),
        ("resize", vec![("width", "5"), ("mode", "zoom")], ErrorKind::Mode),
        ("resize", vec![("width", "5"), ("filter", "box")], ErrorKind::Filter),
        ("resize", vec![("width", "5"), ("format", "bmp")], ErrorKind::Format),
        ("resize", vec![("width", "5"), ("position", "middle")], ErrorKind::Position),
        ("resize", vec![("width", "5"), ("background", "ggg")], ErrorKind::Background),
        ("resize", vec![("width", "5"), ("quality", "101")], ErrorKind::Quality),
        ("resize", vec![("width", "5"), ("optimize", "yes")], ErrorKind::Optimize),
        ("resize", vec![("width", "5"), ("progressive", "x")], ErrorKind::Progressive),
        ("resize", vec![("width", "5"), ("retain", "101")], ErrorKind::Retain),
    ];

    for (ops, pairs, expected) in cases {
        let err = run(&source, ops, &pairs).unwrap_err();
        assert_eq!(err.kind(), expected, "{} {:?}", ops, pairs);
    }
}
