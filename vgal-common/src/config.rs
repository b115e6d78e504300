//! Configuration loading for the gallery sequencer
//!
//! The gallery is configured by a single TOML bootstrap file. Every section and
//! every field has a built-in default, so an empty (or missing) file yields a
//! working configuration.
//!
//! # Config file resolution order
//!
//! 1. Command-line argument (highest priority)
//! 2. `VGAL_CONFIG` environment variable
//! 3. `<user config dir>/vgal/config.toml`, if it exists
//! 4. Built-in defaults (fallback)
//!
//! A file named by the command line or the environment that does not exist is
//! not fatal: a warning is logged and defaults are used. A file that exists but
//! does not parse or validate is an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "VGAL_CONFIG";

/// Complete gallery configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GalleryConfig {
    /// Sequence pacing
    #[serde(default)]
    pub sequence: SequenceTiming,

    /// Lazy-activation proximity settings
    #[serde(default)]
    pub viewport: ViewportConfig,

    /// Logging configuration (used by the binary)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Gallery items in sequence order
    #[serde(default)]
    pub items: Vec<ItemConfig>,
}

/// Delays that pace the "preview all" walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceTiming {
    /// Pause after an item plays to its end, before the next item takes over
    #[serde(default = "default_end_advance_delay_ms")]
    pub end_advance_delay_ms: u64,

    /// Pause after an item fails (load error or playback rejection)
    #[serde(default = "default_error_advance_delay_ms")]
    pub error_advance_delay_ms: u64,

    /// Offset of the preview frame shown on idle thumbnails
    #[serde(default = "default_preview_frame_ms")]
    pub preview_frame_ms: u64,
}

/// Proximity rule for lazy activation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportConfig {
    /// Margin (px) by which the viewport is grown before intersecting
    #[serde(default = "default_margin_px")]
    pub margin_px: f64,

    /// Fraction of the item's area that must fall inside the grown viewport
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// One gallery item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemConfig {
    /// Media source (path or URL handed to the media backend)
    pub src: String,

    /// Display title
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub aspect: AspectRatio,

    /// Loop playback when played outside of a sequence turn (showreels)
    #[serde(default)]
    pub looping: bool,
}

/// Thumbnail aspect ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectRatio {
    /// 16:9
    #[default]
    Video,
    /// 9:16
    Vertical,
}

fn default_end_advance_delay_ms() -> u64 {
    500
}

fn default_error_advance_delay_ms() -> u64 {
    250
}

fn default_preview_frame_ms() -> u64 {
    1000
}

fn default_margin_px() -> f64 {
    100.0
}

fn default_threshold() -> f64 {
    0.1
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SequenceTiming {
    fn default() -> Self {
        Self {
            end_advance_delay_ms: default_end_advance_delay_ms(),
            error_advance_delay_ms: default_error_advance_delay_ms(),
            preview_frame_ms: default_preview_frame_ms(),
        }
    }
}

impl SequenceTiming {
    pub fn end_advance_delay(&self) -> Duration {
        Duration::from_millis(self.end_advance_delay_ms)
    }

    pub fn error_advance_delay(&self) -> Duration {
        Duration::from_millis(self.error_advance_delay_ms)
    }

    pub fn preview_frame(&self) -> Duration {
        Duration::from_millis(self.preview_frame_ms)
    }
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            margin_px: default_margin_px(),
            threshold: default_threshold(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl ItemConfig {
    /// Item with a source and title, default aspect, not looping
    pub fn new(src: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            title: title.into(),
            aspect: AspectRatio::default(),
            looping: false,
        }
    }
}

impl GalleryConfig {
    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: GalleryConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        let sequence = &self.sequence;
        if sequence.error_advance_delay_ms >= sequence.end_advance_delay_ms {
            return Err(Error::Config(format!(
                "sequence.error_advance_delay_ms ({}) must be shorter than end_advance_delay_ms ({})",
                sequence.error_advance_delay_ms, sequence.end_advance_delay_ms
            )));
        }

        let viewport = &self.viewport;
        if !(0.0..=1.0).contains(&viewport.threshold) {
            return Err(Error::Config(format!(
                "viewport.threshold must be within [0, 1], got {}",
                viewport.threshold
            )));
        }
        if !viewport.margin_px.is_finite() || viewport.margin_px < 0.0 {
            return Err(Error::Config(format!(
                "viewport.margin_px must be a non-negative number, got {}",
                viewport.margin_px
            )));
        }
        if let Some((index, _)) = self
            .items
            .iter()
            .enumerate()
            .find(|(_, item)| item.src.trim().is_empty())
        {
            return Err(Error::Config(format!("items[{}].src is empty", index)));
        }
        Ok(())
    }

    /// Number of items in the gallery
    pub fn total_items(&self) -> usize {
        self.items.len()
    }
}

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine(PathBuf),
    Environment(PathBuf),
    UserConfig(PathBuf),
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CommandLine(p) => write!(f, "command line ({})", p.display()),
            ConfigSource::Environment(p) => write!(f, "{} ({})", CONFIG_ENV_VAR, p.display()),
            ConfigSource::UserConfig(p) => write!(f, "user config ({})", p.display()),
            ConfigSource::Defaults => write!(f, "built-in defaults"),
        }
    }
}

/// Resolves and loads the config file following the priority order above
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Determine which config file to use, if any
    pub fn resolve(&self) -> ConfigSource {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_path {
            return ConfigSource::CommandLine(path.clone());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.is_empty() {
                return ConfigSource::Environment(PathBuf::from(path));
            }
        }

        // Priority 3: User config file
        if let Some(path) = user_config_path() {
            if path.exists() {
                return ConfigSource::UserConfig(path);
            }
        }

        // Priority 4: Built-in defaults
        ConfigSource::Defaults
    }

    /// Load the effective configuration
    ///
    /// Missing files degrade to defaults with a warning; malformed files are errors.
    pub fn load(&self) -> Result<(GalleryConfig, ConfigSource)> {
        let source = self.resolve();
        let path = match &source {
            ConfigSource::CommandLine(p)
            | ConfigSource::Environment(p)
            | ConfigSource::UserConfig(p) => p.clone(),
            ConfigSource::Defaults => {
                info!("No config file found, using built-in defaults");
                return Ok((GalleryConfig::default(), source));
            }
        };

        if !path.exists() {
            warn!(
                "Config file {} does not exist, using built-in defaults",
                path.display()
            );
            return Ok((GalleryConfig::default(), ConfigSource::Defaults));
        }

        let config = GalleryConfig::load(&path)?;
        info!("Loaded configuration from {}", source);
        Ok((config, source))
    }
}

/// Platform config location: `<config dir>/vgal/config.toml`
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("vgal").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config = GalleryConfig::from_toml_str("").unwrap();

        assert_eq!(config.sequence.end_advance_delay_ms, 500);
        assert_eq!(config.sequence.error_advance_delay_ms, 250);
        assert_eq!(config.sequence.preview_frame_ms, 1000);
        assert_eq!(config.viewport.margin_px, 100.0);
        assert_eq!(config.viewport.threshold, 0.1);
        assert_eq!(config.logging.level, "info");
        assert!(config.items.is_empty());
    }

    #[test]
    fn test_error_path_skips_faster_than_end_path_by_default() {
        let timing = SequenceTiming::default();
        assert!(timing.error_advance_delay() < timing.end_advance_delay());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = GalleryConfig::from_toml_str(
            r#"
            [sequence]
            end_advance_delay_ms = 750
            "#,
        )
        .unwrap();

        assert_eq!(config.sequence.end_advance_delay_ms, 750);
        assert_eq!(config.sequence.error_advance_delay_ms, 250);
    }

    #[test]
    fn test_items_parse_in_order() {
        let config = GalleryConfig::from_toml_str(
            r#"
            [[items]]
            src = "media/showreel.mp4"
            title = "Showreel"
            looping = true

            [[items]]
            src = "media/social-01.mp4"
            aspect = "vertical"
            "#,
        )
        .unwrap();

        assert_eq!(config.total_items(), 2);
        assert_eq!(config.items[0].title, "Showreel");
        assert!(config.items[0].looping);
        assert_eq!(config.items[0].aspect, AspectRatio::Video);
        assert_eq!(config.items[1].aspect, AspectRatio::Vertical);
        assert!(!config.items[1].looping);
        assert_eq!(config.items[1].title, "");
    }

    #[test]
    fn test_error_delay_must_be_shorter_than_end_delay() {
        let equal = GalleryConfig::from_toml_str(
            "[sequence]\nend_advance_delay_ms = 300\nerror_advance_delay_ms = 300\n",
        );
        match equal {
            Err(Error::Config(message)) => assert!(message.contains("error_advance_delay_ms")),
            other => panic!("expected a config error, got {:?}", other.map(|_| ())),
        }

        // Lowering the end delay below the default error delay is caught too
        let slower = GalleryConfig::from_toml_str("[sequence]\nend_advance_delay_ms = 100\n");
        assert!(matches!(slower, Err(Error::Config(_))));

        let faster = GalleryConfig::from_toml_str(
            "[sequence]\nend_advance_delay_ms = 300\nerror_advance_delay_ms = 299\n",
        );
        assert!(faster.is_ok());
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let result = GalleryConfig::from_toml_str("[viewport]\nthreshold = 1.5\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_negative_margin_rejected() {
        let result = GalleryConfig::from_toml_str("[viewport]\nmargin_px = -1.0\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_empty_src_rejected() {
        let result = GalleryConfig::from_toml_str("[[items]]\nsrc = \"  \"\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let result = GalleryConfig::from_toml_str("[sequence\nend_advance_delay_ms = 1");
        assert!(matches!(result, Err(Error::TomlParse(_))));
    }
}
