//! Image engine
//!
//! Synchronous, CPU-bound processing of one source image per call:
//! - Option parsing and validation
//! - Resize modes (crop, scale, clip, fill, adapt), region and rotate
//! - Face-weighted crop anchors
//! - Encoding to JPEG, PNG, WebP, GIF and TIFF
//!
//! # Example
//!
//! ```no_run
//! use picbox::engine::{Engine, OperationChain, OperationName, OptionSet};
//!
//! let options = OptionSet { width: Some(100), height: Some(100), ..OptionSet::default() };
//! let chain = OperationChain::from_names(&[OperationName::Resize], &options)?;
//! let source = std::fs::read("photo.jpg").unwrap();
//! let out = Engine::new().process(&source, &chain, &options)?;
//! # Ok::<(), picbox::error::ImageError>(())
//! ```

pub mod encoder;
pub mod face;
pub mod geometry;
pub mod jpeg;
pub mod options;
pub mod pipeline;
pub mod raster;
pub mod resize;
pub mod transform;

pub use encoder::{EncodedImage, EncoderFactory, ImageEncoder, SaveOptions};
pub use face::{FaceBounds, FaceDetector, FaceLocator};
pub use geometry::Color;
pub use options::{
    Degree, Filter, Mode, OperationName, OptionSet, OutputFormat, Position, Quality, RawOptions,
    Rect, ResizeLimits,
};
pub use pipeline::{Engine, Operation, OperationChain, ProcessedImage};
pub use raster::RasterImage;
