//! Configuration resolution and graceful degradation tests
//!
//! Covers:
//! - Priority order: command line, environment, user config, defaults
//! - Missing config files fall back to defaults instead of failing
//! - Malformed config files are reported as errors
//!
//! Tests that touch VGAL_CONFIG are marked #[serial] so they never race on
//! the process environment.

use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;
use vgal_common::config::{ConfigResolver, ConfigSource, GalleryConfig, CONFIG_ENV_VAR};
use vgal_common::Error;

const SAMPLE_CONFIG: &str = r#"
[sequence]
end_advance_delay_ms = 400
error_advance_delay_ms = 200

[viewport]
margin_px = 50.0

[logging]
level = "debug"

[[items]]
src = "media/showreel.mp4"
title = "Showreel"
looping = true

[[items]]
src = "media/featured-01.mp4"
title = "Featured 1"
"#;

fn write_config(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("write config");
    path
}

#[test]
#[serial]
fn test_cli_path_takes_precedence_over_env() {
    let dir = TempDir::new().unwrap();
    let cli = write_config(&dir, "cli.toml", SAMPLE_CONFIG);
    let from_env = write_config(&dir, "env.toml", "");
    env::set_var(CONFIG_ENV_VAR, &from_env);

    let resolver = ConfigResolver::new(Some(cli.clone()));
    assert_eq!(resolver.resolve(), ConfigSource::CommandLine(cli));

    let (config, _) = resolver.load().unwrap();
    assert_eq!(config.total_items(), 2);
    assert_eq!(config.sequence.end_advance_delay_ms, 400);

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_used_without_cli_path() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "env.toml", SAMPLE_CONFIG);
    env::set_var(CONFIG_ENV_VAR, &path);

    let resolver = ConfigResolver::new(None);
    assert_eq!(resolver.resolve(), ConfigSource::Environment(path));

    let (config, source) = resolver.load().unwrap();
    assert!(matches!(source, ConfigSource::Environment(_)));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.viewport.margin_px, 50.0);
    // Untouched field keeps its default
    assert_eq!(config.viewport.threshold, 0.1);

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_file_degrades_to_defaults() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("does-not-exist.toml");

    let resolver = ConfigResolver::new(Some(missing));
    let (config, source) = resolver.load().expect("missing file must not be fatal");

    assert_eq!(source, ConfigSource::Defaults);
    assert!(config.items.is_empty());
    assert_eq!(config.sequence.error_advance_delay_ms, 250);
}

#[test]
#[serial]
fn test_malformed_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "broken.toml", "[[items]\nsrc = 3");

    let resolver = ConfigResolver::new(Some(path));
    let result = resolver.load();

    match result {
        Err(Error::Config(message)) => assert!(message.contains("broken.toml")),
        other => panic!("Expected Config error, got {:?}", other),
    }
}

#[test]
fn test_load_reads_items_from_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "gallery.toml", SAMPLE_CONFIG);

    let config = GalleryConfig::load(&path).unwrap();
    assert_eq!(config.items[0].src, "media/showreel.mp4");
    assert!(config.items[0].looping);
    assert_eq!(config.items[1].title, "Featured 1");
}

#[test]
fn test_config_source_display() {
    assert_eq!(ConfigSource::Defaults.to_string(), "built-in defaults");
    let source = ConfigSource::Environment("/tmp/x.toml".into());
    assert!(source.to_string().starts_with(CONFIG_ENV_VAR));
}
