//! Face-weighted crop anchors
//!
//! Detection itself is a pluggable capability behind [`FaceDetector`]. The
//! process keeps at most one detector, installed once and read-only after
//! that; [`FaceLocator`] turns its detections into a crop ratio.

use image::{DynamicImage, GrayImage};
use std::sync::{Arc, OnceLock};

/// Bounding box of a detected face, in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceBounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Pluggable face detection backend.
pub trait FaceDetector: Send + Sync {
    /// Detect faces in a row-major grayscale buffer of `width` × `height` bytes.
    fn detect(&self, gray: &[u8], width: u32, height: u32) -> Vec<FaceBounds>;
}

static GLOBAL_DETECTOR: OnceLock<Arc<dyn FaceDetector>> = OnceLock::new();

/// Install the process-wide detector. Returns false if one is already set.
pub fn install_global_detector(detector: Arc<dyn FaceDetector>) -> bool {
    GLOBAL_DETECTOR.set(detector).is_ok()
}

pub fn global_detector() -> Option<Arc<dyn FaceDetector>> {
    GLOBAL_DETECTOR.get().cloned()
}

/// Resolves the "face" position for an image
#[derive(Clone, Default)]
pub struct FaceLocator {
    detector: Option<Arc<dyn FaceDetector>>,
}

impl std::fmt::Debug for FaceLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaceLocator")
            .field("has_detector", &self.detector.is_some())
            .finish()
    }
}

impl FaceLocator {
    pub fn new(detector: Arc<dyn FaceDetector>) -> Self {
        Self {
            detector: Some(detector),
        }
    }

    /// Locator backed by the process-wide detector, if one is installed
    pub fn global() -> Self {
        Self {
            detector: global_detector(),
        }
    }

    /// Crop ratio centered on the detected faces; (0.5, 0.5) when none are found.
    pub fn locate(&self, image: &DynamicImage) -> (f64, f64) {
        let Some(detector) = &self.detector else {
            tracing::warn!("face position requested but no face detector is installed");
            return (0.5, 0.5);
        };

        let gray = detection_input(image);
        let faces = detector.detect(gray.as_raw(), gray.width(), gray.height());
        tracing::debug!(faces = faces.len(), "face detection finished");

        face_centroid(&faces, image.width(), image.height()).unwrap_or((0.5, 0.5))
    }
}

/// Grayscale, histogram-equalized copy of the image
pub fn detection_input(image: &DynamicImage) -> GrayImage {
    imageproc::contrast::equalize_histogram(&image.to_luma8())
}

/// Mean of the face-box centers, normalized by the image size
pub fn face_centroid(faces: &[FaceBounds], width: u32, height: u32) -> Option<(f64, f64)> {
    if faces.is_empty() || width == 0 || height == 0 {
        return None;
    }

    let n = faces.len() as f64;
    let (sum_x, sum_y) = faces.iter().fold((0.0, 0.0), |(sx, sy), face| {
        (sx + face.x + face.width / 2.0, sy + face.y + face.height / 2.0)
    });

    Some((
        (sum_x / (n * width as f64)).clamp(0.0, 1.0),
        (sum_y / (n * height as f64)).clamp(0.0, 1.0),
    ))
}
