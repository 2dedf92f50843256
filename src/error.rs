//! Error taxonomy for request validation, image processing and source fetches
//!
//! Every failure a request can hit maps to one [`ErrorKind`], which carries a
//! stable numeric code for machine-readable bodies and an HTTP status class.
//! Codes are part of the public contract and must stay pairwise distinct.

use serde::Serialize;
use std::fmt;

/// Kinds of request failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    // === Option errors (400) ===
    Background,
    Dimensions,
    Filter,
    Format,
    Mode,
    Position,
    Quality,
    Url,
    Degree,
    Operation,
    Rectangle,
    Optimize,
    Progressive,
    Retain,
    PreserveExif,

    // === Access errors (403) ===
    Signature,
    Client,
    Host,

    // === Image errors (415) ===
    ImageFormat,
    ImageSave,

    // === Upstream errors (404) ===
    Fetch,
}

impl ErrorKind {
    /// Every kind, in code order
    pub const ALL: [ErrorKind; 21] = [
        ErrorKind::Background,
        ErrorKind::Dimensions,
        ErrorKind::Filter,
        ErrorKind::Format,
        ErrorKind::Mode,
        ErrorKind::Position,
        ErrorKind::Quality,
        ErrorKind::Url,
        ErrorKind::Degree,
        ErrorKind::Operation,
        ErrorKind::Rectangle,
        ErrorKind::Optimize,
        ErrorKind::Progressive,
        ErrorKind::Retain,
        ErrorKind::PreserveExif,
        ErrorKind::Signature,
        ErrorKind::Client,
        ErrorKind::Host,
        ErrorKind::ImageFormat,
        ErrorKind::ImageSave,
        ErrorKind::Fetch,
    ];

    /// Stable machine-readable error code
    pub fn error_code(&self) -> u16 {
        match self {
            ErrorKind::Background => 1,
            ErrorKind::Dimensions => 2,
            ErrorKind::Filter => 3,
            ErrorKind::Format => 4,
            ErrorKind::Mode => 5,
            ErrorKind::Position => 6,
            ErrorKind::Quality => 7,
            ErrorKind::Url => 8,
            ErrorKind::Degree => 9,
            ErrorKind::Operation => 10,
            ErrorKind::Rectangle => 11,
            ErrorKind::Optimize => 12,
            ErrorKind::Progressive => 13,
            ErrorKind::Retain => 14,
            ErrorKind::PreserveExif => 15,
            ErrorKind::Signature => 101,
            ErrorKind::Client => 102,
            ErrorKind::Host => 103,
            ErrorKind::ImageFormat => 201,
            ErrorKind::ImageSave => 202,
            ErrorKind::Fetch => 301,
        }
    }

    /// Maps the kind to an HTTP status code
    ///
    /// Status mapping:
    /// - option errors → 400 (Bad Request)
    /// - Signature, Client, Host → 403 (Forbidden)
    /// - ImageFormat, ImageSave → 415 (Unsupported Media Type)
    /// - Fetch → 404 (Not Found)
    pub fn to_http_status(&self) -> u16 {
        match self {
            ErrorKind::Signature | ErrorKind::Client | ErrorKind::Host => 403,
            ErrorKind::ImageFormat | ErrorKind::ImageSave => 415,
            ErrorKind::Fetch => 404,
            _ => 400,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Background => "BackgroundError",
            ErrorKind::Dimensions => "DimensionsError",
            ErrorKind::Filter => "FilterError",
            ErrorKind::Format => "FormatError",
            ErrorKind::Mode => "ModeError",
            ErrorKind::Position => "PositionError",
            ErrorKind::Quality => "QualityError",
            ErrorKind::Url => "UrlError",
            ErrorKind::Degree => "DegreeError",
            ErrorKind::Operation => "OperationError",
            ErrorKind::Rectangle => "RectangleError",
            ErrorKind::Optimize => "OptimizeError",
            ErrorKind::Progressive => "ProgressiveError",
            ErrorKind::Retain => "RetainError",
            ErrorKind::PreserveExif => "PreserveExifError",
            ErrorKind::Signature => "SignatureError",
            ErrorKind::Client => "ClientError",
            ErrorKind::Host => "HostError",
            ErrorKind::ImageFormat => "ImageFormatError",
            ErrorKind::ImageSave => "ImageSaveError",
            ErrorKind::Fetch => "FetchError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request failure: its kind plus a human-readable message
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ImageError {
    kind: ErrorKind,
    message: String,
}

/// JSON body emitted at the request boundary on failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub status_code: u16,
    pub error_code: u16,
    pub error: String,
}

impl ImageError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn error_code(&self) -> u16 {
        self.kind.error_code()
    }

    pub fn to_http_status(&self) -> u16 {
        self.kind.to_http_status()
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            status_code: self.to_http_status(),
            error_code: self.error_code(),
            error: self.message.clone(),
        }
    }

    /// Serialized error body, `{"status_code":..,"error_code":..,"error":..}`
    pub fn to_json(&self) -> String {
        // A struct of two integers and a string always serializes
        serde_json::to_string(&self.to_body()).unwrap_or_default()
    }

    // Helper constructors for common error patterns

    pub fn background(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Background, message)
    }

    pub fn dimensions(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Dimensions, message)
    }

    pub fn operation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Operation, message)
    }

    pub fn url(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Url, message)
    }

    pub fn degree(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Degree, message)
    }

    pub fn rectangle(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Rectangle, message)
    }

    pub fn image_format(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ImageFormat, message)
    }

    pub fn image_save(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ImageSave, message)
    }

    pub fn fetch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fetch, message)
    }
}
