//! Geometry and color helpers shared by the validator and the transform engine
//!
//! All functions here are pure: size resolution, hex color parsing,
//! position ratios and the box arithmetic behind crop/clip/rotate.

use crate::error::ImageError;

/// A background color parsed from hex notation
///
/// `a` is present only when the source string carried an alpha channel
/// (4- or 8-digit ARGB forms).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: Option<u8>,
}

impl Color {
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: None }
    }

    pub fn argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self {
            r,
            g,
            b,
            a: Some(a),
        }
    }

    pub fn has_alpha(&self) -> bool {
        self.a.is_some()
    }

    pub fn to_rgba(&self) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, self.a.unwrap_or(255)])
    }

    pub fn to_rgb(&self) -> image::Rgb<u8> {
        image::Rgb([self.r, self.g, self.b])
    }
}

/// Parse a hex color in 3-digit RGB, 4-digit ARGB, 6-digit RGB or 8-digit
/// ARGB form. Short forms are digit-doubled (`"f"` → 255, `"8"` → 136).
pub fn parse_hex_color(hex: &str) -> Result<Color, ImageError> {
    if !matches!(hex.len(), 3 | 4 | 6 | 8) {
        return Err(ImageError::background(format!(
            "Invalid background color length: {}",
            hex
        )));
    }
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ImageError::background(format!(
            "Invalid background color: {}",
            hex
        )));
    }

    let expanded: String = if hex.len() <= 4 {
        hex.chars().flat_map(|c| [c, c]).collect()
    } else {
        hex.to_string()
    };

    let value = u32::from_str_radix(&expanded, 16)
        .map_err(|_| ImageError::background(format!("Invalid background color: {}", hex)))?;
    let r = ((value >> 16) & 0xff) as u8;
    let g = ((value >> 8) & 0xff) as u8;
    let b = (value & 0xff) as u8;

    if expanded.len() == 8 {
        Ok(Color::argb(((value >> 24) & 0xff) as u8, r, g, b))
    } else {
        Ok(Color::rgb(r, g, b))
    }
}

/// Resolve requested dimensions against the source size.
///
/// A missing (or zero) dimension is computed from the present one so the
/// source aspect ratio is kept: `missing = round(present * other / present_src)`.
pub fn resolve_size(
    source: (u32, u32),
    width: Option<u32>,
    height: Option<u32>,
) -> Result<(u32, u32), ImageError> {
    let (src_w, src_h) = source;
    let width = width.filter(|w| *w > 0);
    let height = height.filter(|h| *h > 0);

    match (width, height) {
        (Some(w), Some(h)) => Ok((w, h)),
        (Some(w), None) => {
            let h = (w as f64 * src_h as f64 / src_w.max(1) as f64).round() as u32;
            Ok((w, h.max(1)))
        }
        (None, Some(h)) => {
            let w = (h as f64 * src_w as f64 / src_h.max(1) as f64).round() as u32;
            Ok((w.max(1), h))
        }
        (None, None) => Err(ImageError::dimensions("Missing dimensions")),
    }
}

/// Ratios for the named crop anchors
pub fn named_position(name: &str) -> Option<(f64, f64)> {
    let ratio = match name {
        "top-left" => (0.0, 0.0),
        "top" => (0.5, 0.0),
        "top-right" => (1.0, 0.0),
        "left" => (0.0, 0.5),
        "center" => (0.5, 0.5),
        "right" => (1.0, 0.5),
        "bottom-left" => (0.0, 1.0),
        "bottom" => (0.5, 1.0),
        "bottom-right" => (1.0, 1.0),
        _ => return None,
    };
    Some(ratio)
}

/// Parse a custom `"x,y"` ratio. Both parts must be plain decimals in [0, 1].
pub fn parse_ratio(value: &str) -> Option<(f64, f64)> {
    let (x, y) = value.split_once(',')?;
    let x = parse_unit_decimal(x)?;
    let y = parse_unit_decimal(y)?;
    Some((x, y))
}

fn parse_unit_decimal(part: &str) -> Option<f64> {
    let (int, frac) = match part.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (part, None),
    };
    if int.is_empty() || !int.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if let Some(frac) = frac {
        if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
    }
    let value: f64 = part.parse().ok()?;
    (0.0..=1.0).contains(&value).then_some(value)
}

/// An integer pixel box inside an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Source box that, scaled to `target`, covers it exactly.
///
/// The box has the target aspect ratio, is as large as the source allows,
/// and its leftover margin is split according to `anchor`
/// ((0,0) keeps the top-left corner, (1,1) the bottom-right).
pub fn crop_box(source: (u32, u32), target: (u32, u32), anchor: (f64, f64)) -> PixelBox {
    let (src_w, src_h) = (source.0 as f64, source.1 as f64);
    let source_ratio = src_w / src_h;
    let target_ratio = target.0 as f64 / target.1 as f64;

    let (crop_w, crop_h) = if (source_ratio - target_ratio).abs() < f64::EPSILON {
        (src_w, src_h)
    } else if source_ratio > target_ratio {
        (target_ratio * src_h, src_h)
    } else {
        (src_w, src_w / target_ratio)
    };

    let width = (crop_w.round() as u32).clamp(1, source.0);
    let height = (crop_h.round() as u32).clamp(1, source.1);
    let x = ((src_w - crop_w) * anchor.0).round().max(0.0) as u32;
    let y = ((src_h - crop_h) * anchor.1).round().max(0.0) as u32;

    PixelBox {
        x: x.min(source.0 - width),
        y: y.min(source.1 - height),
        width,
        height,
    }
}

/// Largest size with the source aspect ratio that fits inside `bounds`.
/// Never grows the source.
pub fn fit_within(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bounds;
    if src_w <= max_w && src_h <= max_h {
        return source;
    }

    let scale = (max_w as f64 / src_w as f64).min(max_h as f64 / src_h as f64);
    let w = ((src_w as f64 * scale).round() as u32).clamp(1, max_w.max(1));
    let h = ((src_h as f64 * scale).round() as u32).clamp(1, max_h.max(1));
    (w, h)
}

/// Aspect-ratio similarity as a percentage: 100 means identical ratios.
pub fn aspect_similarity(source: (u32, u32), target: (u32, u32)) -> f64 {
    let source_ratio = source.0 as f64 / source.1 as f64;
    let target_ratio = target.0 as f64 / target.1 as f64;
    source_ratio.min(target_ratio) / source_ratio.max(target_ratio) * 100.0
}

/// Bounding box of a `width`×`height` rectangle rotated by `degrees`.
pub fn rotated_bounds(width: u32, height: u32, degrees: f64) -> (u32, u32) {
    let theta = degrees.to_radians();
    let (sin, cos) = (theta.sin().abs(), theta.cos().abs());
    let (w, h) = (width as f64, height as f64);
    // Trim float noise so 30° on integral sizes doesn't gain a pixel
    let new_w = (w * cos + h * sin - 1e-6).ceil().max(1.0) as u32;
    let new_h = (w * sin + h * cos - 1e-6).ceil().max(1.0) as u32;
    (new_w, new_h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use rstest::rstest;

    #[test]
    fn test_short_and_long_hex_match() {
        assert_eq!(
            parse_hex_color("ccc").unwrap(),
            parse_hex_color("cccccc").unwrap()
        );
        assert_eq!(
            parse_hex_color("1a9").unwrap(),
            parse_hex_color("11aa99").unwrap()
        );
        assert_eq!(parse_hex_color("ccc").unwrap(), Color::rgb(204, 204, 204));
    }

    #[rstest]
    #[case("fabc", 255)]
    #[case("0abc", 0)]
    #[case("8abc", 136)]
    #[case("ffaabbcc", 255)]
    #[case("80aabbcc", 128)]
    fn test_alpha_channel(#[case] hex: &str, #[case] alpha: u8) {
        let color = parse_hex_color(hex).unwrap();
        assert_eq!(color.a, Some(alpha));
    }

    #[test]
    fn test_argb_component_order() {
        assert_eq!(
            parse_hex_color("80112233").unwrap(),
            Color::argb(0x80, 0x11, 0x22, 0x33)
        );
        assert_eq!(
            parse_hex_color("8123").unwrap(),
            Color::argb(0x88, 0x11, 0x22, 0x33)
        );
    }

    #[rstest]
    #[case("")]
    #[case("f")]
    #[case("ff")]
    #[case("fffff")]
    #[case("fffffff")]
    #[case("fffffffff")]
    #[case("ggg")]
    #[case("+ff")]
    #[case("#fff")]
    #[case("12345z")]
    fn test_invalid_background(#[case] hex: &str) {
        let err = parse_hex_color(hex).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Background);
    }

    #[test]
    fn test_resolve_size_missing_height() {
        assert_eq!(resolve_size((400, 300), Some(100), None).unwrap(), (100, 75));
        assert_eq!(resolve_size((400, 300), Some(99), None).unwrap(), (99, 74));
    }

    #[test]
    fn test_resolve_size_missing_width() {
        assert_eq!(resolve_size((400, 300), None, Some(150)).unwrap(), (200, 150));
        // 7 * 400 / 300 = 9.33
        assert_eq!(resolve_size((400, 300), None, Some(7)).unwrap(), (9, 7));
    }

    #[test]
    fn test_resolve_size_keeps_ratio_within_rounding() {
        let source = (1234, 567);
        for w in 1..300 {
            let (_, h) = resolve_size(source, Some(w), None).unwrap();
            let exact = w as f64 * 567.0 / 1234.0;
            assert!((h as f64 - exact).abs() <= 0.5 || h == 1);
        }
    }

    #[test]
    fn test_resolve_size_zero_is_missing() {
        assert_eq!(resolve_size((400, 300), Some(0), Some(150)).unwrap(), (200, 150));
        let err = resolve_size((400, 300), Some(0), Some(0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Dimensions);
    }

    #[test]
    fn test_named_positions() {
        assert_eq!(named_position("center"), Some((0.5, 0.5)));
        assert_eq!(named_position("top-left"), Some((0.0, 0.0)));
        assert_eq!(named_position("bottom"), Some((0.5, 1.0)));
        assert_eq!(named_position("face"), None);
        assert_eq!(named_position("middle"), None);
    }

    #[rstest]
    #[case("0,0", Some((0.0, 0.0)))]
    #[case("1,1", Some((1.0, 1.0)))]
    #[case("0.25,0.75", Some((0.25, 0.75)))]
    #[case("1.5,0", None)]
    #[case("-0.1,0", None)]
    #[case("0.5", None)]
    #[case(".5,.5", None)]
    #[case("1e-1,0", None)]
    #[case("0.5,0.5,0.5", None)]
    fn test_parse_ratio(#[case] input: &str, #[case] expected: Option<(f64, f64)>) {
        assert_eq!(parse_ratio(input), expected);
    }

    #[test]
    fn test_crop_box_centered_landscape() {
        let b = crop_box((400, 300), (100, 100), (0.5, 0.5));
        assert_eq!(
            b,
            PixelBox {
                x: 50,
                y: 0,
                width: 300,
                height: 300
            }
        );
    }

    #[test]
    fn test_crop_box_anchors() {
        assert_eq!(crop_box((400, 300), (100, 100), (0.0, 0.0)).x, 0);
        assert_eq!(crop_box((400, 300), (100, 100), (1.0, 1.0)).x, 100);
        let portrait = crop_box((300, 400), (100, 100), (0.5, 1.0));
        assert_eq!((portrait.x, portrait.y), (0, 100));
    }

    #[test]
    fn test_crop_box_same_ratio_is_whole_image() {
        let b = crop_box((400, 300), (200, 150), (0.0, 1.0));
        assert_eq!((b.x, b.y, b.width, b.height), (0, 0, 400, 300));
    }

    #[test]
    fn test_fit_within() {
        assert_eq!(fit_within((400, 300), (100, 100)), (100, 75));
        assert_eq!(fit_within((300, 400), (100, 100)), (75, 100));
        assert_eq!(fit_within((50, 40), (100, 100)), (50, 40));
        assert_eq!(fit_within((400, 50), (500, 40)), (320, 40));
    }

    #[test]
    fn test_aspect_similarity() {
        assert!((aspect_similarity((400, 300), (400, 300)) - 100.0).abs() < 1e-9);
        assert!((aspect_similarity((400, 200), (200, 200)) - 50.0).abs() < 1e-9);
        assert!((aspect_similarity((200, 200), (400, 200)) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_rotated_bounds() {
        assert_eq!(rotated_bounds(100, 50, 0.0), (100, 50));
        assert_eq!(rotated_bounds(100, 50, 90.0), (50, 100));
        assert_eq!(rotated_bounds(100, 100, 45.0), (142, 142));
    }
}
