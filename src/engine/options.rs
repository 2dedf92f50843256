//! Transform option parsing and normalization
//!
//! Raw option strings arrive from the request (keyed by argument name) and
//! from server-level defaults (keyed by option name). [`OptionSet::normalize`]
//! merges them over the hardcoded defaults and checks every domain in a fixed
//! order, failing on the first violation.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::geometry::{self, Color};
use crate::constants::{
    DEFAULT_BACKGROUND, DEFAULT_FILTER, DEFAULT_MODE, DEFAULT_POSITION, DEFAULT_QUALITY,
    DEFAULT_RETAIN, DEGREE_AUTO, QUALITY_KEEP,
};
use crate::error::{ErrorKind, ImageError};

/// Option names paired with the request argument that carries them
pub const OPTION_ARGUMENTS: [(&str, &str); 15] = [
    ("width", "w"),
    ("height", "h"),
    ("mode", "mode"),
    ("filter", "filter"),
    ("format", "fmt"),
    ("position", "pos"),
    ("background", "bg"),
    ("quality", "q"),
    ("optimize", "opt"),
    ("progressive", "prog"),
    ("preserve_exif", "preserve_exif"),
    ("retain", "retain"),
    ("degree", "deg"),
    ("expand", "expand"),
    ("rect", "rect"),
];

/// Resize strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Crop when the aspect ratios are close enough, fill otherwise
    Adapt,
    /// Shrink to fit inside the box, keeping aspect ratio
    Clip,
    /// Cover the box exactly, cropping overflow at the position
    #[default]
    Crop,
    /// Clip, then pad to the box with the background color
    Fill,
    /// Stretch to the box
    Scale,
}

impl FromStr for Mode {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "adapt" => Ok(Mode::Adapt),
            "clip" => Ok(Mode::Clip),
            "crop" => Ok(Mode::Crop),
            "fill" => Ok(Mode::Fill),
            "scale" => Ok(Mode::Scale),
            _ => Err(ImageError::new(
                ErrorKind::Mode,
                format!("Invalid mode: {}", s),
            )),
        }
    }
}

/// Resampling filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    Antialias,
    Bicubic,
    Bilinear,
    Nearest,
}

impl FromStr for Filter {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "antialias" => Ok(Filter::Antialias),
            "bicubic" => Ok(Filter::Bicubic),
            "bilinear" => Ok(Filter::Bilinear),
            "nearest" => Ok(Filter::Nearest),
            _ => Err(ImageError::new(
                ErrorKind::Filter,
                format!("Invalid filter: {}", s),
            )),
        }
    }
}

/// Encoded image format, for both sources and outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Gif,
    Jpeg,
    Png,
    WebP,
    Tiff,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gif => "gif",
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Tiff => "tiff",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Gif => "image/gif",
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Tiff => "image/tiff",
        }
    }

    /// Whether the encoder keeps an alpha channel
    pub fn supports_transparency(&self) -> bool {
        !matches!(self, Self::Jpeg)
    }

    /// Map a detected codec format; `None` for formats outside the supported set
    pub fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Gif => Some(Self::Gif),
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::WebP => Some(Self::WebP),
            image::ImageFormat::Tiff => Some(Self::Tiff),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gif" => Ok(OutputFormat::Gif),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            "tiff" => Ok(OutputFormat::Tiff),
            _ => Err(ImageError::new(
                ErrorKind::Format,
                format!("Invalid format: {}", s),
            )),
        }
    }
}

/// Crop anchor
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Position {
    /// Fixed ratio pair in [0, 1]²
    Ratio { x: f64, y: f64 },
    /// Centroid of detected faces, resolved per image
    Face,
}

impl Default for Position {
    fn default() -> Self {
        Position::Ratio { x: 0.5, y: 0.5 }
    }
}

impl FromStr for Position {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some((x, y)) = geometry::parse_ratio(s) {
            return Ok(Position::Ratio { x, y });
        }
        if s == "face" {
            return Ok(Position::Face);
        }
        geometry::named_position(s)
            .map(|(x, y)| Position::Ratio { x, y })
            .ok_or_else(|| ImageError::new(ErrorKind::Position, format!("Invalid position: {}", s)))
    }
}

/// Output quality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Value(u8),
    /// Reuse the source encoder settings (JPEG sources only)
    Keep,
}

impl Default for Quality {
    fn default() -> Self {
        Quality::Value(DEFAULT_QUALITY)
    }
}

impl FromStr for Quality {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == QUALITY_KEEP {
            return Ok(Quality::Keep);
        }
        parse_percentage(s)
            .map(Quality::Value)
            .ok_or_else(|| ImageError::new(ErrorKind::Quality, format!("Invalid quality: {}", s)))
    }
}

/// Rotation amount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degree {
    /// Clockwise degrees, 0–359
    Angle(u16),
    /// Derived from the EXIF orientation tag
    Auto,
}

impl FromStr for Degree {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == DEGREE_AUTO {
            return Ok(Degree::Auto);
        }
        parse_uint(s)
            .filter(|d| *d < 360)
            .map(|d| Degree::Angle(d as u16))
            .ok_or_else(|| ImageError::degree(format!("Invalid rotation degree: {}", s)))
    }
}

/// Region rectangle: origin plus size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FromStr for Rect {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<u32> = s
            .split(',')
            .map(parse_uint)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ImageError::rectangle(format!("Invalid rectangle: {}", s)))?;

        match parts.as_slice() {
            [x, y, width, height] => Ok(Rect {
                x: *x,
                y: *y,
                width: *width,
                height: *height,
            }),
            _ => Err(ImageError::rectangle(format!("Invalid rectangle: {}", s))),
        }
    }
}

/// Requested operation names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationName {
    Noop,
    Region,
    Resize,
    Rotate,
}

impl OperationName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::Region => "region",
            Self::Resize => "resize",
            Self::Rotate => "rotate",
        }
    }
}

impl FromStr for OperationName {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "noop" => Ok(OperationName::Noop),
            "region" => Ok(OperationName::Region),
            "resize" => Ok(OperationName::Resize),
            "rotate" => Ok(OperationName::Rotate),
            _ => Err(ImageError::operation(format!("Unsupported operation: {}", s))),
        }
    }
}

/// Parse a comma-separated operation list
pub fn parse_operations(value: &str) -> Result<Vec<OperationName>, ImageError> {
    value.split(',').map(OperationName::from_str).collect()
}

/// Upper bounds on requested resize dimensions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResizeLimits {
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
}

/// Unvalidated option strings keyed by option name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOptions {
    values: HashMap<&'static str, String>,
}

impl RawOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect recognized options from request arguments
    pub fn from_request_args(args: &HashMap<String, String>) -> Self {
        let mut raw = Self::new();
        for (option, arg) in OPTION_ARGUMENTS {
            if let Some(value) = args.get(arg) {
                raw.values.insert(option, value.clone());
            }
        }
        raw
    }

    /// Set an option by name. Returns false for names that are not options.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> bool {
        match OPTION_ARGUMENTS.iter().find(|(option, _)| *option == name) {
            Some((option, _)) => {
                self.values.insert(option, value.into());
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Fill options missing here from `defaults`
    pub fn with_defaults(mut self, defaults: &RawOptions) -> Self {
        for (name, value) in &defaults.values {
            self.values.entry(*name).or_insert_with(|| value.clone());
        }
        self
    }

    fn non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.is_empty())
    }
}

/// Fully resolved options for one request
#[derive(Debug, Clone, PartialEq)]
pub struct OptionSet {
    pub mode: Mode,
    pub filter: Filter,
    /// Output format override; `None` keeps the source format
    pub format: Option<OutputFormat>,
    pub position: Position,
    pub background: Color,
    pub quality: Quality,
    pub optimize: bool,
    pub progressive: bool,
    pub preserve_exif: bool,
    pub retain: u8,
    pub expand: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub degree: Option<Degree>,
    pub rect: Option<Rect>,
}

impl Default for OptionSet {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            filter: Filter::default(),
            format: None,
            position: Position::default(),
            background: Color::rgb(255, 255, 255),
            quality: Quality::default(),
            optimize: false,
            progressive: false,
            preserve_exif: false,
            retain: DEFAULT_RETAIN,
            expand: false,
            width: None,
            height: None,
            degree: None,
            rect: None,
        }
    }
}

impl OptionSet {
    /// Validate merged raw options for the requested operations.
    ///
    /// Checks run in order: resize dimensions, rotation degree, region
    /// rectangle, then mode, filter, format, position, background, quality,
    /// optimize, progressive, preserve_exif and retain.
    pub fn normalize(
        raw: &RawOptions,
        operations: &[OperationName],
        limits: &ResizeLimits,
    ) -> Result<Self, ImageError> {
        let mut options = OptionSet::default();

        if operations.contains(&OperationName::Resize) {
            let (width, height) = parse_dimensions(raw, limits)?;
            options.width = width;
            options.height = height;
        }

        if operations.contains(&OperationName::Rotate) {
            let degree = raw
                .non_empty("degree")
                .ok_or_else(|| ImageError::degree("Missing rotation degree"))?;
            options.degree = Some(degree.parse()?);
            options.expand = parse_flag(raw.get("expand"), ErrorKind::Degree, "expand")?;
        }

        if operations.contains(&OperationName::Region) {
            let rect = raw
                .non_empty("rect")
                .ok_or_else(|| ImageError::rectangle("Missing region"))?;
            options.rect = Some(rect.parse()?);
        }

        options.mode = raw.get("mode").unwrap_or(DEFAULT_MODE).parse()?;
        options.filter = raw.get("filter").unwrap_or(DEFAULT_FILTER).parse()?;
        options.format = raw.non_empty("format").map(str::parse::<OutputFormat>).transpose()?;
        options.position = raw.get("position").unwrap_or(DEFAULT_POSITION).parse()?;
        options.background = geometry::parse_hex_color(
            raw.get("background").unwrap_or(DEFAULT_BACKGROUND),
        )?;
        options.quality = match raw.get("quality") {
            Some(q) => q.parse()?,
            None => Quality::default(),
        };
        options.optimize = parse_flag(raw.non_empty("optimize"), ErrorKind::Optimize, "optimize")?;
        options.progressive =
            parse_flag(raw.non_empty("progressive"), ErrorKind::Progressive, "progressive")?;
        options.preserve_exif = parse_flag(
            raw.non_empty("preserve_exif"),
            ErrorKind::PreserveExif,
            "preserve_exif",
        )?;
        options.retain = match raw.get("retain") {
            Some(r) => parse_percentage(r).ok_or_else(|| {
                ImageError::new(ErrorKind::Retain, format!("Invalid retain: {}", r))
            })?,
            None => DEFAULT_RETAIN,
        };

        Ok(options)
    }
}

fn parse_dimensions(
    raw: &RawOptions,
    limits: &ResizeLimits,
) -> Result<(Option<u32>, Option<u32>), ImageError> {
    let width = raw.non_empty("width");
    let height = raw.non_empty("height");
    if width.is_none() && height.is_none() {
        return Err(ImageError::dimensions("Missing dimensions"));
    }

    let width = width
        .map(|w| parse_uint(w).ok_or_else(|| ImageError::dimensions(format!("Invalid width: {}", w))))
        .transpose()?;
    let height = height
        .map(|h| {
            parse_uint(h).ok_or_else(|| ImageError::dimensions(format!("Invalid height: {}", h)))
        })
        .transpose()?;

    if width.unwrap_or(0) == 0 && height.unwrap_or(0) == 0 {
        return Err(ImageError::dimensions("Missing dimensions"));
    }
    if let (Some(w), Some(max)) = (width, limits.max_width) {
        if w > max {
            return Err(ImageError::dimensions(format!(
                "Width {} exceeds maximum {}",
                w, max
            )));
        }
    }
    if let (Some(h), Some(max)) = (height, limits.max_height) {
        if h > max {
            return Err(ImageError::dimensions(format!(
                "Height {} exceeds maximum {}",
                h, max
            )));
        }
    }

    Ok((width, height))
}

/// Non-negative decimal integer, digits only
fn parse_uint(value: &str) -> Option<u32> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

fn parse_percentage(value: &str) -> Option<u8> {
    parse_uint(value).filter(|v| *v <= 100).map(|v| v as u8)
}

/// Integer-encoded boolean: zero is false, any other integer is true
fn parse_flag(value: Option<&str>, kind: ErrorKind, name: &str) -> Result<bool, ImageError> {
    match value {
        None => Ok(false),
        Some(v) => parse_uint(v)
            .map(|n| n != 0)
            .ok_or_else(|| ImageError::new(kind, format!("Invalid {}: {}", name, v))),
    }
}
