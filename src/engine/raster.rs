//! Decoded source images
//!
//! A [`RasterImage`] is the pixel grid plus what the save step needs to know
//! about where it came from: source format, EXIF blob, EXIF orientation and,
//! for JPEG sources, the original encoder profile.

use bytes::Bytes;
use image::io::Reader as ImageReader;
use image::{ColorType, DynamicImage};
use img_parts::{DynImage, ImageEXIF};
use std::io::Cursor;

use super::jpeg::{self, JpegProfile};
use super::options::OutputFormat;
use crate::error::ImageError;

/// A decoded image owned by one request
#[derive(Debug, Clone)]
pub struct RasterImage {
    image: DynamicImage,
    format: OutputFormat,
    exif: Option<Bytes>,
    orientation: Option<u32>,
    jpeg_profile: Option<JpegProfile>,
}

impl RasterImage {
    /// Decode encoded bytes.
    ///
    /// Unknown or unsupported formats and undecodable data fail with
    /// `ImageFormatError`. Metadata problems never fail the decode.
    pub fn decode(data: &[u8]) -> Result<Self, ImageError> {
        let detected = image::guess_format(data)
            .map_err(|_| ImageError::image_format("Unknown format"))?;
        let format = OutputFormat::from_image_format(detected).ok_or_else(|| {
            ImageError::image_format(format!("Unsupported format: {:?}", detected))
        })?;

        let image = ImageReader::with_format(Cursor::new(data), detected)
            .decode()
            .map_err(|e| ImageError::image_format(format!("File is not an image: {}", e)))?;

        let (orientation, jpeg_profile) = if format == OutputFormat::Jpeg {
            (read_orientation(data), jpeg::read_profile(data))
        } else {
            (None, None)
        };

        tracing::debug!(
            format = %format,
            width = image.width(),
            height = image.height(),
            "decoded source image"
        );

        Ok(Self {
            image: normalize_depth(image),
            format,
            exif: read_exif_blob(data),
            orientation,
            jpeg_profile,
        })
    }

    /// Wrap an already decoded image with no source metadata
    pub fn from_image(image: DynamicImage, format: OutputFormat) -> Self {
        Self {
            image: normalize_depth(image),
            format,
            exif: None,
            orientation: None,
            jpeg_profile: None,
        }
    }

    /// Replace the pixels, keeping the source metadata
    pub fn with_image(self, image: DynamicImage) -> Self {
        Self { image, ..self }
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_image(self) -> DynamicImage {
        self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    /// Format the source bytes were encoded in
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Raw EXIF payload captured at decode
    pub fn exif(&self) -> Option<&Bytes> {
        self.exif.as_ref()
    }

    /// EXIF orientation tag value (JPEG sources only)
    pub fn orientation(&self) -> Option<u32> {
        self.orientation
    }

    pub fn jpeg_profile(&self) -> Option<JpegProfile> {
        self.jpeg_profile
    }
}

/// Reduce high bit-depth and float images to 8 bits per channel
fn normalize_depth(image: DynamicImage) -> DynamicImage {
    match image.color() {
        ColorType::L8 | ColorType::La8 | ColorType::Rgb8 | ColorType::Rgba8 => image,
        ColorType::L16 => DynamicImage::ImageLuma8(image.to_luma8()),
        ColorType::La16 => DynamicImage::ImageLumaA8(image.to_luma_alpha8()),
        color if color.has_alpha() => DynamicImage::ImageRgba8(image.to_rgba8()),
        _ => DynamicImage::ImageRgb8(image.to_rgb8()),
    }
}

fn read_exif_blob(data: &[u8]) -> Option<Bytes> {
    match DynImage::from_bytes(Bytes::copy_from_slice(data)) {
        Ok(Some(container)) => container.exif(),
        Ok(None) => None,
        Err(e) => {
            tracing::debug!(error = %e, "could not read metadata container");
            None
        }
    }
}

/// EXIF orientation tag (274) of an encoded image.
///
/// Absent or malformed metadata yields `None`.
pub fn read_orientation(data: &[u8]) -> Option<u32> {
    let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(data)) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => return None,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable EXIF data");
            return None;
        }
    };

    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
}
