//! Operation chains
//!
//! Handles one request end to end: decode → operations in client order → save.

use super::encoder::{self, SaveOptions};
use super::face::FaceLocator;
use super::options::{Degree, OperationName, OptionSet, OutputFormat, Rect};
use super::raster::RasterImage;
use super::transform;
use crate::error::ImageError;

/// One step of a chain, carrying the options it needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Resize {
        width: Option<u32>,
        height: Option<u32>,
    },
    Rotate {
        degree: Degree,
        expand: bool,
    },
    Region {
        rect: Rect,
    },
    Noop,
}

impl Operation {
    pub fn name(&self) -> OperationName {
        match self {
            Operation::Resize { .. } => OperationName::Resize,
            Operation::Rotate { .. } => OperationName::Rotate,
            Operation::Region { .. } => OperationName::Region,
            Operation::Noop => OperationName::Noop,
        }
    }
}

/// Ordered, non-empty list of operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationChain {
    operations: Vec<Operation>,
}

impl OperationChain {
    /// Build a chain from requested names and the validated options.
    ///
    /// Fails if the list is empty or an operation lacks its options.
    pub fn from_names(names: &[OperationName], options: &OptionSet) -> Result<Self, ImageError> {
        if names.is_empty() {
            return Err(ImageError::operation("Missing operation"));
        }

        let operations = names
            .iter()
            .map(|name| match name {
                OperationName::Noop => Ok(Operation::Noop),
                OperationName::Resize => {
                    if options.width.is_none() && options.height.is_none() {
                        return Err(ImageError::dimensions("Missing dimensions"));
                    }
                    Ok(Operation::Resize {
                        width: options.width,
                        height: options.height,
                    })
                }
                OperationName::Rotate => options
                    .degree
                    .map(|degree| Operation::Rotate {
                        degree,
                        expand: options.expand,
                    })
                    .ok_or_else(|| ImageError::degree("Missing rotation degree")),
                OperationName::Region => options
                    .rect
                    .map(|rect| Operation::Region { rect })
                    .ok_or_else(|| ImageError::rectangle("Missing region")),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { operations })
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// True if any step is `noop`, which turns the whole chain into a pass-through
    pub fn is_passthrough(&self) -> bool {
        self.operations.contains(&Operation::Noop)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Result of running a chain
#[derive(Debug)]
pub struct ProcessedImage {
    pub data: Vec<u8>,
    /// Encoding of `data`; `None` for pass-through bytes
    pub format: Option<OutputFormat>,
}

impl ProcessedImage {
    /// Content-Type for the response, if known
    pub fn content_type(&self) -> Option<&'static str> {
        self.format.map(|f| f.content_type())
    }
}

/// Synchronous image engine
#[derive(Debug, Clone, Default)]
pub struct Engine {
    faces: FaceLocator,
}

impl Engine {
    /// Engine using the process-wide face detector, if installed
    pub fn new() -> Self {
        Self {
            faces: FaceLocator::global(),
        }
    }

    pub fn with_face_locator(faces: FaceLocator) -> Self {
        Self { faces }
    }

    /// Run `chain` over the encoded source `data`.
    ///
    /// A chain containing `noop` returns `data` untouched without decoding.
    /// Otherwise operations apply left to right and the result is saved once.
    pub fn process(
        &self,
        data: &[u8],
        chain: &OperationChain,
        options: &OptionSet,
    ) -> Result<ProcessedImage, ImageError> {
        if chain.is_passthrough() {
            tracing::debug!(bytes = data.len(), "noop requested, passing source through");
            return Ok(ProcessedImage {
                data: data.to_vec(),
                format: None,
            });
        }

        let raster = RasterImage::decode(data)?;
        let source_size = raster.dimensions();

        let raster = chain
            .operations()
            .iter()
            .try_fold(raster, |raster, operation| self.apply(raster, operation, options))?;

        tracing::debug!(
            operations = chain.len(),
            from_width = source_size.0,
            from_height = source_size.1,
            to_width = raster.width(),
            to_height = raster.height(),
            "operation chain complete"
        );

        let encoded = encoder::save(raster, &SaveOptions::from(options))?;
        Ok(ProcessedImage {
            data: encoded.data,
            format: Some(encoded.format),
        })
    }

    fn apply(
        &self,
        raster: RasterImage,
        operation: &Operation,
        options: &OptionSet,
    ) -> Result<RasterImage, ImageError> {
        match *operation {
            Operation::Resize { width, height } => {
                transform::resize(raster, width, height, options, &self.faces)
            }
            Operation::Rotate { degree, expand } => {
                transform::rotate(raster, degree, expand, options.filter)
            }
            Operation::Region { rect } => transform::region(raster, rect),
            Operation::Noop => Ok(raster),
        }
    }
}
