//! Resampling with fast_image_resize
//!
//! Images keep their channel layout (gray, RGB or RGBA) across a resize.
//! Alpha is premultiplied before convolution so transparent pixels don't
//! bleed color into their neighbours.

use fast_image_resize::{FilterType, Image, MulDiv, PixelType, ResizeAlg, Resizer};
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use std::num::NonZeroU32;

use super::options::Filter;
use crate::error::ImageError;

impl Filter {
    /// Resampling algorithm used for this filter
    pub fn resize_alg(&self) -> ResizeAlg {
        match self {
            Filter::Nearest => ResizeAlg::Nearest,
            Filter::Bilinear => ResizeAlg::Convolution(FilterType::Bilinear),
            Filter::Bicubic => ResizeAlg::Convolution(FilterType::CatmullRom),
            Filter::Antialias => ResizeAlg::Convolution(FilterType::Lanczos3),
        }
    }
}

/// Resize to exactly `width`×`height`, ignoring aspect ratio
pub fn resize_exact(
    img: &DynamicImage,
    width: u32,
    height: u32,
    filter: Filter,
) -> Result<DynamicImage, ImageError> {
    if img.width() == width && img.height() == height {
        return Ok(img.clone());
    }

    let src_width = NonZeroU32::new(img.width())
        .ok_or_else(|| ImageError::image_format("Source width is 0"))?;
    let src_height = NonZeroU32::new(img.height())
        .ok_or_else(|| ImageError::image_format("Source height is 0"))?;
    let dst_width =
        NonZeroU32::new(width).ok_or_else(|| ImageError::dimensions("Target width is 0"))?;
    let dst_height =
        NonZeroU32::new(height).ok_or_else(|| ImageError::dimensions("Target height is 0"))?;

    let (pixels, pixel_type) = match img {
        DynamicImage::ImageLuma8(gray) => (gray.as_raw().clone(), PixelType::U8),
        DynamicImage::ImageRgb8(rgb) => (rgb.as_raw().clone(), PixelType::U8x3),
        other if other.color().has_alpha() => (other.to_rgba8().into_raw(), PixelType::U8x4),
        other => (other.to_rgb8().into_raw(), PixelType::U8x3),
    };
    let has_alpha = pixel_type == PixelType::U8x4;

    let mut src_image = Image::from_vec_u8(src_width, src_height, pixels, pixel_type)
        .map_err(|e| ImageError::image_format(format!("Failed to create source image: {:?}", e)))?;
    let mut dst_image = Image::new(dst_width, dst_height, pixel_type);

    let alpha_mul_div = MulDiv::default();
    if has_alpha {
        alpha_mul_div
            .multiply_alpha_inplace(&mut src_image.view_mut())
            .map_err(|e| ImageError::image_format(format!("Alpha premultiply failed: {:?}", e)))?;
    }

    let mut resizer = Resizer::new(filter.resize_alg());
    resizer
        .resize(&src_image.view(), &mut dst_image.view_mut())
        .map_err(|e| ImageError::image_format(format!("Resize operation failed: {:?}", e)))?;

    if has_alpha {
        alpha_mul_div
            .divide_alpha_inplace(&mut dst_image.view_mut())
            .map_err(|e| ImageError::image_format(format!("Alpha restore failed: {:?}", e)))?;
    }

    let buffer = dst_image.into_vec();
    let resized = match pixel_type {
        PixelType::U8 => GrayImage::from_raw(width, height, buffer).map(DynamicImage::ImageLuma8),
        PixelType::U8x3 => RgbImage::from_raw(width, height, buffer).map(DynamicImage::ImageRgb8),
        _ => RgbaImage::from_raw(width, height, buffer).map(DynamicImage::ImageRgba8),
    };
    resized.ok_or_else(|| ImageError::image_format("Failed to create output image buffer"))
}
