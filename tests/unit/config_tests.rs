// Configuration loading tests

use picbox::config::{Config, LogFormat};
use picbox::engine::options::{Mode, OperationName, OptionSet};
use std::path::Path;

#[test]
fn test_example_config_loads_and_validates() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config.example.yaml");
    let config = Config::from_file(&path).unwrap();
    config.validate().unwrap();

    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.limits.max_resize_width, Some(4096));
    assert_eq!(
        config.allowed_operations().unwrap(),
        vec![
            OperationName::Region,
            OperationName::Resize,
            OperationName::Rotate,
            OperationName::Noop
        ]
    );
}

#[test]
fn test_example_defaults_match_builtin_defaults() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config.example.yaml");
    let config = Config::from_file(&path).unwrap();
    let raw = config.default_options().unwrap();

    let options = OptionSet::normalize(&raw, &[], &config.limits.resize_limits()).unwrap();
    assert_eq!(options, OptionSet::default());
    assert_eq!(options.mode, Mode::Crop);
}
