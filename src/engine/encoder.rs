//! Image encoder abstraction and the save step
//!
//! Provides a trait-based encoder system that allows:
//! - One encoder per output format behind a common interface
//! - Format-specific knobs (quality, progressive, optimize, subsampling)
//! - EXIF reattachment for containers that carry it

use bytes::Bytes;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder as ImagePngEncoder};
use image::{DynamicImage, ImageEncoder as _, ImageFormat};
use img_parts::{jpeg::Jpeg, png::Png, webp::WebP, ImageEXIF};
use std::io::Cursor;

use super::geometry::Color;
use super::options::{OptionSet, OutputFormat, Quality};
use super::raster::RasterImage;
use crate::constants::DEFAULT_QUALITY;
use crate::error::ImageError;

/// Settings handed to an encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderSettings {
    /// Quality value (0-100)
    pub quality: u8,
    pub optimize: bool,
    pub progressive: bool,
    /// Chroma block size in luma pixels, JPEG only
    pub chroma_sampling: Option<(u8, u8)>,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            optimize: false,
            progressive: false,
            chroma_sampling: None,
        }
    }
}

/// Result of encoding an image
#[derive(Debug)]
pub struct EncodedImage {
    /// The encoded image data
    pub data: Vec<u8>,
    /// The output format
    pub format: OutputFormat,
    /// Content-Type header value
    pub content_type: &'static str,
}

impl EncodedImage {
    pub fn new(data: Vec<u8>, format: OutputFormat) -> Self {
        Self {
            data,
            format,
            content_type: format.content_type(),
        }
    }
}

/// Trait for image encoders
///
/// Implementations receive an 8-bit gray, gray+alpha, RGB or RGBA image;
/// images with alpha only reach encoders that support transparency.
pub trait ImageEncoder: Send + Sync {
    /// The output format this encoder produces
    fn format(&self) -> OutputFormat;

    fn encode(&self, image: &DynamicImage, settings: &EncoderSettings) -> Result<Vec<u8>, ImageError>;

    /// Check if this encoder supports transparency
    fn supports_transparency(&self) -> bool;
}

/// JPEG encoder using mozjpeg
pub struct JpegEncoder;

impl ImageEncoder for JpegEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Jpeg
    }

    fn encode(&self, image: &DynamicImage, settings: &EncoderSettings) -> Result<Vec<u8>, ImageError> {
        let (pixels, grayscale) = match image {
            DynamicImage::ImageLuma8(gray) => (gray.as_raw().clone(), true),
            other => (other.to_rgb8().into_raw(), false),
        };
        let color_space = if grayscale {
            mozjpeg::ColorSpace::JCS_GRAYSCALE
        } else {
            mozjpeg::ColorSpace::JCS_RGB
        };

        let mut comp = mozjpeg::Compress::new(color_space);
        // libjpeg-compatible baseline; progressive and Huffman optimization are opt-in
        comp.set_fastest_defaults();
        comp.set_size(image.width() as usize, image.height() as usize);
        comp.set_quality(settings.quality as f32);
        if let (Some((h, v)), false) = (settings.chroma_sampling, grayscale) {
            comp.set_chroma_sampling_pixel_sizes((h, v), (h, v));
        }
        comp.set_optimize_coding(settings.optimize);
        if settings.progressive {
            comp.set_progressive_mode();
        }

        let mut comp = comp
            .start_compress(Vec::new())
            .map_err(|e| ImageError::image_save(format!("Failed to encode to jpeg: {}", e)))?;
        comp.write_scanlines(&pixels)
            .map_err(|e| ImageError::image_save(format!("Failed to encode to jpeg: {}", e)))?;
        comp.finish()
            .map_err(|e| ImageError::image_save(format!("Failed to encode to jpeg: {}", e)))
    }

    fn supports_transparency(&self) -> bool {
        false
    }
}

/// PNG encoder using the image crate, with oxipng for `optimize`
pub struct PngEncoder;

impl ImageEncoder for PngEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Png
    }

    fn encode(&self, image: &DynamicImage, settings: &EncoderSettings) -> Result<Vec<u8>, ImageError> {
        let mut output = Vec::new();
        let (compression, filter) = if settings.optimize {
            (CompressionType::Best, PngFilterType::Adaptive)
        } else {
            (CompressionType::Default, PngFilterType::Sub)
        };

        ImagePngEncoder::new_with_quality(&mut output, compression, filter)
            .write_image(image.as_bytes(), image.width(), image.height(), image.color())
            .map_err(|e| ImageError::image_save(format!("Failed to encode to png: {}", e)))?;

        if !settings.optimize {
            return Ok(output);
        }
        oxipng::optimize_from_memory(&output, &oxipng::Options::from_preset(2))
            .map_err(|e| ImageError::image_save(format!("Failed to optimize png: {}", e)))
    }

    fn supports_transparency(&self) -> bool {
        true
    }
}

/// Lossy WebP encoder using libwebp
pub struct WebPEncoder;

impl ImageEncoder for WebPEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::WebP
    }

    fn encode(&self, image: &DynamicImage, settings: &EncoderSettings) -> Result<Vec<u8>, ImageError> {
        let (width, height) = (image.width(), image.height());
        let quality = settings.quality as f32;
        let memory = if image.color().has_alpha() {
            let rgba = image.to_rgba8();
            webp::Encoder::from_rgba(&rgba, width, height).encode_simple(false, quality)
        } else {
            let rgb = image.to_rgb8();
            webp::Encoder::from_rgb(&rgb, width, height).encode_simple(false, quality)
        }
        .map_err(|e| ImageError::image_save(format!("Failed to encode to webp: {:?}", e)))?;
        Ok(memory.to_vec())
    }

    fn supports_transparency(&self) -> bool {
        true
    }
}

/// GIF and TIFF encoders from the image crate
pub struct CodecEncoder(OutputFormat);

impl ImageEncoder for CodecEncoder {
    fn format(&self) -> OutputFormat {
        self.0
    }

    fn encode(&self, image: &DynamicImage, _settings: &EncoderSettings) -> Result<Vec<u8>, ImageError> {
        let codec = match self.0 {
            OutputFormat::Gif => ImageFormat::Gif,
            _ => ImageFormat::Tiff,
        };
        let image = match image {
            DynamicImage::ImageLumaA8(_) => DynamicImage::ImageRgba8(image.to_rgba8()),
            other => other.clone(),
        };

        let mut output = Cursor::new(Vec::new());
        image
            .write_to(&mut output, codec)
            .map_err(|e| ImageError::image_save(format!("Failed to encode to {}: {}", self.0, e)))?;
        Ok(output.into_inner())
    }

    fn supports_transparency(&self) -> bool {
        true
    }
}

/// Factory for creating encoders based on output format
pub struct EncoderFactory;

impl EncoderFactory {
    pub fn create(format: OutputFormat) -> Box<dyn ImageEncoder> {
        match format {
            OutputFormat::Jpeg => Box::new(JpegEncoder),
            OutputFormat::Png => Box::new(PngEncoder),
            OutputFormat::WebP => Box::new(WebPEncoder),
            OutputFormat::Gif | OutputFormat::Tiff => Box::new(CodecEncoder(format)),
        }
    }
}

/// Options consumed by [`save`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    /// Target format; `None` keeps the source format
    pub format: Option<OutputFormat>,
    pub quality: Quality,
    pub optimize: bool,
    pub progressive: bool,
    pub preserve_exif: bool,
    /// Matte for transparent pixels when the target has no alpha
    pub background: Color,
}

impl From<&OptionSet> for SaveOptions {
    fn from(options: &OptionSet) -> Self {
        Self {
            format: options.format,
            quality: options.quality,
            optimize: options.optimize,
            progressive: options.progressive,
            preserve_exif: options.preserve_exif,
            background: options.background,
        }
    }
}

/// Encode the final raster.
///
/// JPEG-to-JPEG saves keep the source chroma subsampling, and with
/// `Quality::Keep` the source quality as well.
pub fn save(raster: RasterImage, options: &SaveOptions) -> Result<EncodedImage, ImageError> {
    let format = options.format.unwrap_or_else(|| raster.format());
    let encoder = EncoderFactory::create(format);

    let source_profile = match (raster.format(), format) {
        (OutputFormat::Jpeg, OutputFormat::Jpeg) => raster.jpeg_profile(),
        _ => None,
    };
    let quality = match options.quality {
        Quality::Value(q) => q,
        Quality::Keep => source_profile
            .and_then(|p| p.quality)
            .unwrap_or(DEFAULT_QUALITY),
    };
    let settings = EncoderSettings {
        quality,
        optimize: options.optimize,
        progressive: options.progressive,
        chroma_sampling: source_profile.and_then(|p| p.chroma_sampling),
    };

    let exif = options
        .preserve_exif
        .then(|| raster.exif().cloned())
        .flatten();

    let mut image = raster.into_image();
    if !encoder.supports_transparency() && image.color().has_alpha() {
        image = flatten(&image, options.background);
    }

    let mut data = encoder.encode(&image, &settings)?;
    if let Some(exif) = exif {
        data = attach_exif(data, format, exif)?;
    }

    tracing::debug!(
        format = %format,
        quality = settings.quality,
        bytes = data.len(),
        "encoded image"
    );

    Ok(EncodedImage::new(data, format))
}

/// Composite over an opaque background
fn flatten(image: &DynamicImage, background: Color) -> DynamicImage {
    let mut canvas = image::RgbaImage::from_pixel(
        image.width(),
        image.height(),
        image::Rgba([background.r, background.g, background.b, 255]),
    );
    image::imageops::overlay(&mut canvas, &image.to_rgba8(), 0, 0);
    DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8())
}

fn attach_exif(data: Vec<u8>, format: OutputFormat, exif: Bytes) -> Result<Vec<u8>, ImageError> {
    let bytes = Bytes::from(data);
    let failed = |e: img_parts::Error| ImageError::image_save(format!("Failed to write EXIF: {}", e));

    let out = match format {
        OutputFormat::Jpeg => {
            let mut jpeg = Jpeg::from_bytes(bytes).map_err(failed)?;
            jpeg.set_exif(Some(exif));
            jpeg.encoder().bytes()
        }
        OutputFormat::Png => {
            let mut png = Png::from_bytes(bytes).map_err(failed)?;
            png.set_exif(Some(exif));
            png.encoder().bytes()
        }
        OutputFormat::WebP => {
            let mut webp = WebP::from_bytes(bytes).map_err(failed)?;
            webp.set_exif(Some(exif));
            webp.encoder().bytes()
        }
        OutputFormat::Gif | OutputFormat::Tiff => {
            tracing::debug!(format = %format, "EXIF not preserved for this format");
            bytes
        }
    };
    Ok(out.to_vec())
}
