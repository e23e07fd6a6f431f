//! Configuration tests
//!
//! The round-trip tests guard `to_toml()`: when a field is added to
//! `Config` it has to be written out and parsed back here.

use super::*;
use std::collections::HashMap;

fn no_env(_: &str) -> Option<String> {
    None
}

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

// ─────────────────────────────────────────────────────────────────────────────
// Round-trip tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_roundtrip_default() {
    let config = Config::default();
    let toml_str = config.to_toml();

    let parsed: Result<FileConfig, _> = toml::from_str(&toml_str);
    assert!(
        parsed.is_ok(),
        "Default config should round-trip.\nTOML:\n{}\nError: {:?}",
        toml_str,
        parsed.err()
    );
}

#[test]
fn test_config_roundtrip_preserves_values() {
    let mut config = Config::default();
    config.api_url = "https://grace.example.org/api".to_string();
    config.out_dir = PathBuf::from("C:\\sites\\grace");
    config.request_timeout_secs = 3;
    config.carousel.interval_ms = 2500;
    config.logging.level = "debug".to_string();
    config.logging.file_enabled = true;
    config.logging.file_rotation = LogRotation::Hourly;

    let file: FileConfig = toml::from_str(&config.to_toml()).unwrap();
    let parsed = Config::resolve(file, no_env);

    assert_eq!(parsed.api_url, config.api_url);
    assert_eq!(parsed.out_dir, config.out_dir);
    assert_eq!(parsed.request_timeout_secs, 3);
    assert_eq!(parsed.carousel, CarouselConfig { interval_ms: 2500 });
    assert_eq!(parsed.logging.level, "debug");
    assert!(parsed.logging.file_enabled);
    assert_eq!(parsed.logging.file_rotation, LogRotation::Hourly);
    assert_eq!(parsed.logging.file_prefix, "chapel");
}

// ─────────────────────────────────────────────────────────────────────────────
// Precedence
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_empty_file_uses_defaults() {
    let config = Config::resolve(FileConfig::default(), no_env);
    let defaults = Config::default();

    assert_eq!(config.api_url, defaults.api_url);
    assert_eq!(config.out_dir, defaults.out_dir);
    assert_eq!(config.request_timeout(), Duration::from_secs(10));
    assert_eq!(config.carousel.interval(), Duration::from_millis(6000));
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_env_overrides_file() {
    let file: FileConfig = toml::from_str(
        r#"
        api_url = "https://file.example.org/api"
        out_dir = "from-file"
        request_timeout_secs = 20
        "#,
    )
    .unwrap();

    let config = Config::resolve(
        file,
        env_from(&[
            ("CHAPEL_API_URL", "https://env.example.org/api"),
            ("CHAPEL_OUT_DIR", "from-env"),
        ]),
    );

    assert_eq!(config.api_url, "https://env.example.org/api");
    assert_eq!(config.out_dir, PathBuf::from("from-env"));
    assert_eq!(config.request_timeout_secs, 20);
}

#[test]
fn test_blank_or_invalid_env_falls_through() {
    let file: FileConfig = toml::from_str(
        r#"
        api_url = "https://file.example.org/api"
        request_timeout_secs = 20
        "#,
    )
    .unwrap();

    let config = Config::resolve(
        file,
        env_from(&[
            ("CHAPEL_API_URL", "  "),
            ("CHAPEL_REQUEST_TIMEOUT_SECS", "soon"),
        ]),
    );

    assert_eq!(config.api_url, "https://file.example.org/api");
    assert_eq!(config.request_timeout_secs, 20);
}

#[test]
fn test_zero_intervals_fall_back_to_defaults() {
    let file: FileConfig = toml::from_str(
        r#"
        request_timeout_secs = 0

        [carousel]
        interval_ms = 0
        "#,
    )
    .unwrap();

    let config = Config::resolve(file, no_env);
    assert_eq!(config.request_timeout_secs, 10);
    assert_eq!(config.carousel.interval_ms, 6000);
}

#[test]
fn test_partial_logging_section() {
    let file: FileConfig = toml::from_str(
        r#"
        [logging]
        file_enabled = true
        file_rotation = "NEVER"
        "#,
    )
    .unwrap();

    let logging = Config::resolve(file, no_env).logging;
    assert!(logging.file_enabled);
    assert_eq!(logging.file_rotation, LogRotation::Never);
    assert_eq!(logging.level, "info");
    assert_eq!(logging.file_dir, PathBuf::from("./logs"));
}

#[test]
fn test_unknown_rotation_defaults_to_daily() {
    assert_eq!(LogRotation::from_str("weekly"), LogRotation::Daily);
    assert_eq!(LogRotation::from_str("Hourly"), LogRotation::Hourly);
}

#[test]
fn test_malformed_file_is_rejected() {
    let parsed: Result<FileConfig, _> = toml::from_str("request_timeout_secs = \"ten\"");
    assert!(parsed.is_err());
}
