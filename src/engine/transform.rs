//! Geometric transforms: resize modes, region selection and rotation
//!
//! Every transform takes ownership of the current raster and returns the
//! next one, so a chain of operations reads as a fold over the raster.

use image::{imageops, DynamicImage, ImageBuffer, Luma, Pixel, Rgb, RgbImage, Rgba, RgbaImage};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};

use super::face::FaceLocator;
use super::geometry::{self, Color};
use super::options::{Degree, Filter, Mode, OptionSet, OutputFormat, Position, Rect};
use super::raster::RasterImage;
use super::resize::resize_exact;
use crate::error::ImageError;

/// Resize according to `options.mode`.
///
/// A missing width or height is derived from the source aspect ratio.
pub fn resize(
    raster: RasterImage,
    width: Option<u32>,
    height: Option<u32>,
    options: &OptionSet,
    faces: &FaceLocator,
) -> Result<RasterImage, ImageError> {
    let size = geometry::resolve_size(raster.dimensions(), width, height)?;

    tracing::debug!(
        mode = ?options.mode,
        from_width = raster.width(),
        from_height = raster.height(),
        to_width = size.0,
        to_height = size.1,
        "resizing"
    );

    match options.mode {
        Mode::Scale => scale(raster, size, options.filter),
        Mode::Clip => clip(raster, size, options.filter),
        Mode::Crop => crop(raster, size, options.filter, options.position, faces),
        Mode::Fill => fill(raster, size, options.filter, options.background),
        Mode::Adapt => {
            let similarity = geometry::aspect_similarity(raster.dimensions(), size);
            if similarity >= options.retain as f64 {
                crop(raster, size, options.filter, options.position, faces)
            } else {
                fill(raster, size, options.filter, options.background)
            }
        }
    }
}

/// Stretch to exactly `size`
pub fn scale(raster: RasterImage, size: (u32, u32), filter: Filter) -> Result<RasterImage, ImageError> {
    let resized = resize_exact(raster.image(), size.0, size.1, filter)?;
    Ok(raster.with_image(resized))
}

/// Shrink to fit inside `size`, keeping aspect ratio. Never enlarges.
pub fn clip(raster: RasterImage, size: (u32, u32), filter: Filter) -> Result<RasterImage, ImageError> {
    let fitted = geometry::fit_within(raster.dimensions(), size);
    if fitted == raster.dimensions() {
        return Ok(raster);
    }
    scale(raster, fitted, filter)
}

/// Cover `size` exactly, cutting the overflow around the position anchor
pub fn crop(
    raster: RasterImage,
    size: (u32, u32),
    filter: Filter,
    position: Position,
    faces: &FaceLocator,
) -> Result<RasterImage, ImageError> {
    let anchor = match position {
        Position::Ratio { x, y } => (x, y),
        Position::Face => faces.locate(raster.image()),
    };

    let area = geometry::crop_box(raster.dimensions(), size, anchor);
    let cropped = raster
        .image()
        .crop_imm(area.x, area.y, area.width, area.height);
    let resized = resize_exact(&cropped, size.0, size.1, filter)?;
    Ok(raster.with_image(resized))
}

/// Clip, then center on a `size` canvas painted with `background`
pub fn fill(
    raster: RasterImage,
    size: (u32, u32),
    filter: Filter,
    background: Color,
) -> Result<RasterImage, ImageError> {
    let clipped = clip(raster, size, filter)?;
    if clipped.dimensions() == size {
        return Ok(clipped);
    }

    let x = (size.0.saturating_sub(clipped.width()) / 2) as i64;
    let y = (size.1.saturating_sub(clipped.height()) / 2) as i64;

    let canvas = if background.has_alpha() {
        let mut canvas = RgbaImage::from_pixel(size.0, size.1, background.to_rgba());
        imageops::overlay(&mut canvas, &clipped.image().to_rgba8(), x, y);
        DynamicImage::ImageRgba8(canvas)
    } else if clipped.image().color().has_alpha() {
        let mut canvas = RgbaImage::from_pixel(size.0, size.1, background.to_rgba());
        imageops::overlay(&mut canvas, &clipped.image().to_rgba8(), x, y);
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8())
    } else {
        let mut canvas = RgbImage::from_pixel(size.0, size.1, background.to_rgb());
        imageops::replace(&mut canvas, &clipped.image().to_rgb8(), x, y);
        DynamicImage::ImageRgb8(canvas)
    };

    Ok(clipped.with_image(canvas))
}

/// Cut out `rect`. The rectangle must lie inside the current image.
pub fn region(raster: RasterImage, rect: Rect) -> Result<RasterImage, ImageError> {
    let right = rect.x as u64 + rect.width as u64;
    let bottom = rect.y as u64 + rect.height as u64;
    if right > raster.width() as u64 || bottom > raster.height() as u64 {
        return Err(ImageError::rectangle("Region out-of-bounds"));
    }
    if rect.width == 0 || rect.height == 0 {
        return Err(ImageError::rectangle("Region is empty"));
    }

    let cropped = raster
        .image()
        .crop_imm(rect.x, rect.y, rect.width, rect.height);
    Ok(raster.with_image(cropped))
}

/// Clockwise rotation for an EXIF orientation value
pub fn orientation_degrees(orientation: Option<u32>) -> u16 {
    match orientation {
        Some(3) => 180,
        Some(6) => 90,
        Some(8) => 270,
        _ => 0,
    }
}

/// Rotate clockwise about the center.
///
/// `Degree::Auto` reads the EXIF orientation of JPEG sources; any other
/// source rotates by 0°. Right-angle rotations are exact transposes and
/// ignore `expand`; other angles keep the canvas unless `expand` is set.
pub fn rotate(
    raster: RasterImage,
    degree: Degree,
    expand: bool,
    filter: Filter,
) -> Result<RasterImage, ImageError> {
    let degrees = match degree {
        Degree::Angle(d) => d % 360,
        Degree::Auto if raster.format() == OutputFormat::Jpeg => {
            orientation_degrees(raster.orientation())
        }
        Degree::Auto => 0,
    };

    tracing::debug!(degrees, expand, "rotating");

    let rotated = match degrees {
        0 => return Ok(raster),
        90 => raster.image().rotate90(),
        180 => raster.image().rotate180(),
        270 => raster.image().rotate270(),
        d => rotate_free(raster.image(), d as f64, expand, interpolation(filter)),
    };
    Ok(raster.with_image(rotated))
}

fn interpolation(filter: Filter) -> Interpolation {
    match filter {
        Filter::Nearest => Interpolation::Nearest,
        Filter::Bilinear => Interpolation::Bilinear,
        Filter::Bicubic | Filter::Antialias => Interpolation::Bicubic,
    }
}

fn rotate_free(img: &DynamicImage, degrees: f64, expand: bool, interp: Interpolation) -> DynamicImage {
    match img {
        DynamicImage::ImageLuma8(buf) => {
            DynamicImage::ImageLuma8(rotate_buffer(buf, degrees, expand, interp, Luma([0])))
        }
        DynamicImage::ImageRgb8(buf) => {
            DynamicImage::ImageRgb8(rotate_buffer(buf, degrees, expand, interp, Rgb([0, 0, 0])))
        }
        other => DynamicImage::ImageRgba8(rotate_buffer(
            &other.to_rgba8(),
            degrees,
            expand,
            interp,
            Rgba([0, 0, 0, 0]),
        )),
    }
}

fn rotate_buffer<P>(
    img: &ImageBuffer<P, Vec<u8>>,
    degrees: f64,
    expand: bool,
    interp: Interpolation,
    fill: P,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8> + Send + Sync + 'static,
{
    let theta = degrees.to_radians() as f32;
    if !expand {
        return rotate_about_center(img, theta, interp, fill);
    }

    let (width, height) = geometry::rotated_bounds(img.width(), img.height(), degrees);
    let mut canvas = ImageBuffer::from_pixel(width, height, fill);
    let x = (width as i64 - img.width() as i64) / 2;
    let y = (height as i64 - img.height() as i64) / 2;
    imageops::replace(&mut canvas, img, x, y);
    rotate_about_center(&canvas, theta, interp, fill)
}
