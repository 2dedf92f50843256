// Error taxonomy contract tests

use picbox::error::{ErrorKind, ImageError};
use std::collections::HashSet;

#[test]
fn test_error_codes_and_statuses() {
    let table = [
        (ErrorKind::Background, "BackgroundError", 1, 400),
        (ErrorKind::Dimensions, "DimensionsError", 2, 400),
        (ErrorKind::Filter, "FilterError", 3, 400),
        (ErrorKind::Format, "FormatError", 4, 400),
        (ErrorKind::Mode, "ModeError", 5, 400),
        (ErrorKind::Position, "PositionError", 6, 400),
        (ErrorKind::Quality, "QualityError", 7, 400),
        (ErrorKind::Url, "UrlError", 8, 400),
        (ErrorKind::Degree, "DegreeError", 9, 400),
        (ErrorKind::Operation, "OperationError", 10, 400),
        (ErrorKind::Rectangle, "RectangleError", 11, 400),
        (ErrorKind::Optimize, "OptimizeError", 12, 400),
        (ErrorKind::Progressive, "ProgressiveError", 13, 400),
        (ErrorKind::Retain, "RetainError", 14, 400),
        (ErrorKind::PreserveExif, "PreserveExifError", 15, 400),
        (ErrorKind::Signature, "SignatureError", 101, 403),
        (ErrorKind::Client, "ClientError", 102, 403),
        (ErrorKind::Host, "HostError", 103, 403),
        (ErrorKind::ImageFormat, "ImageFormatError", 201, 415),
        (ErrorKind::ImageSave, "ImageSaveError", 202, 415),
        (ErrorKind::Fetch, "FetchError", 301, 404),
    ];

    for (kind, name, code, status) in table {
        assert_eq!(kind.as_str(), name);
        assert_eq!(kind.error_code(), code, "{}", name);
        assert_eq!(kind.to_http_status(), status, "{}", name);
    }
    assert_eq!(table.len(), ErrorKind::ALL.len());
}

#[test]
fn test_error_codes_are_distinct() {
    let codes: HashSet<u16> = ErrorKind::ALL.iter().map(|k| k.error_code()).collect();
    assert_eq!(codes.len(), ErrorKind::ALL.len());
}

#[test]
fn test_error_body_shape() {
    let err = ImageError::rectangle("Region out-of-bounds");
    let body: serde_json::Value = serde_json::from_str(&err.to_json()).unwrap();

    assert_eq!(body["status_code"], 400);
    assert_eq!(body["error_code"], 11);
    assert_eq!(body["error"], "Region out-of-bounds");
    assert_eq!(err.to_string(), "Region out-of-bounds");
}
