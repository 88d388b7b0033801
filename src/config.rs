//! Grid configuration.
//!
//! Handles loading, validating, and merging `grid.toml`. Stock defaults are
//! overridden by a `grid.toml` placed next to the catalog file.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [images]
//! breakpoints = [320, 480, 640, 800, 960, 1200]  # srcset widths, ascending
//! display_size = 320                              # square crop used for `src`
//! sizes = "(min-width: 1024px) 360px, (min-width: 768px) 45vw, 92vw"
//!
//! [prefetch]
//! idle_timeout_ms = 1500    # latest start for idle-time prefetches
//! fallback_delay_ms = 150   # delay when the host has no idle callbacks
//! low_priority = true       # send a low fetch-priority hint when supported
//!
//! [colors.light]
//! background = "#ffffff"
//! text = "#111111"
//! text_muted = "#666666"
//! border = "#e0e0e0"
//! accent = "#2f6f4f"        # Cart button, active dot
//!
//! [colors.dark]
//! background = "#0f1115"
//! text = "#eeeeee"
//! text_muted = "#9a9a9a"
//! border = "#2a2d33"
//! accent = "#7fc8a0"
//! ```
//!
//! Config files are sparse: override just the values you want. Unknown keys
//! are rejected to catch typos early.

use crate::variant::{BREAKPOINT_WIDTHS, DEFAULT_DISPLAY_SIZE, DEFAULT_SIZES};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the config file looked up next to the catalog.
pub const CONFIG_FILENAME: &str = "grid.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Grid configuration loaded from `grid.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    /// Responsive variant settings.
    pub images: ImagesConfig,
    /// Idle-time prefetch settings.
    pub prefetch: PrefetchConfig,
    /// Color schemes for the light and dark themes.
    pub colors: ColorConfig,
}

impl GridConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let breakpoints = &self.images.breakpoints;
        if breakpoints.is_empty() {
            return Err(ConfigError::Validation(
                "images.breakpoints must not be empty".into(),
            ));
        }
        if breakpoints.contains(&0) {
            return Err(ConfigError::Validation(
                "images.breakpoints values must be non-zero".into(),
            ));
        }
        if breakpoints.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConfigError::Validation(
                "images.breakpoints must be strictly ascending".into(),
            ));
        }
        if self.images.display_size == 0 {
            return Err(ConfigError::Validation(
                "images.display_size must be non-zero".into(),
            ));
        }
        if self.prefetch.idle_timeout_ms == 0 || self.prefetch.fallback_delay_ms == 0 {
            return Err(ConfigError::Validation(
                "prefetch delays must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Responsive variant settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Widths offered in every `srcset`, ascending.
    pub breakpoints: Vec<u32>,
    /// Square crop size used for the `src` of a card image.
    pub display_size: u32,
    /// `sizes` attribute for card images.
    pub sizes: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            breakpoints: BREAKPOINT_WIDTHS.to_vec(),
            display_size: DEFAULT_DISPLAY_SIZE,
            sizes: DEFAULT_SIZES.to_string(),
        }
    }
}

/// Idle-time prefetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrefetchConfig {
    /// An idle-deferred prefetch starts no later than this.
    pub idle_timeout_ms: u64,
    /// Delay used when the host has no idle callbacks.
    pub fallback_delay_ms: u64,
    /// Ask for low fetch priority where the host supports it.
    pub low_priority: bool,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: 1500,
            fallback_delay_ms: 150,
            low_priority: true,
        }
    }
}

/// Color configuration for the light and dark themes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorConfig {
    pub light: ColorScheme,
    pub dark: ColorScheme,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            light: ColorScheme::default_light(),
            dark: ColorScheme::default_dark(),
        }
    }
}

/// Individual color scheme (light or dark).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorScheme {
    pub background: String,
    pub text: String,
    /// Descriptions, prices, the "no results" message.
    pub text_muted: String,
    pub border: String,
    /// Cart button and active carousel dot.
    pub accent: String,
}

impl ColorScheme {
    pub fn default_light() -> Self {
        Self {
            background: "#ffffff".to_string(),
            text: "#111111".to_string(),
            text_muted: "#666666".to_string(),
            border: "#e0e0e0".to_string(),
            accent: "#2f6f4f".to_string(),
        }
    }

    pub fn default_dark() -> Self {
        Self {
            background: "#0f1115".to_string(),
            text: "#eeeeee".to_string(),
            text_muted: "#9a9a9a".to_string(),
            border: "#2a2d33".to_string(),
            accent: "#7fc8a0".to_string(),
        }
    }
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::default_light()
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(GridConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `grid.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no `grid.toml`.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load config from `grid.toml` in the given directory: user values merged
/// on top of stock defaults, unknown keys rejected, result validated.
pub fn load_config(dir: &Path) -> Result<GridConfig, ConfigError> {
    let merged = match load_raw_config(dir)? {
        Some(overlay) => merge_toml(stock_defaults_value()?, overlay),
        None => stock_defaults_value()?,
    };
    let config: GridConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `grid.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Product Grid Configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file as grid.toml next to the catalog file.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Responsive image variants
# ---------------------------------------------------------------------------
[images]
# Widths offered in every srcset. Must be non-empty and strictly ascending.
breakpoints = [320, 480, 640, 800, 960, 1200]

# Square crop (w = h) requested for the src of each card image.
display_size = 320

# sizes attribute matching the grid's column layout.
sizes = "(min-width: 1024px) 360px, (min-width: 768px) 45vw, 92vw"

# ---------------------------------------------------------------------------
# Prefetching
# ---------------------------------------------------------------------------
[prefetch]
# Idle-time prefetches start no later than this many milliseconds.
idle_timeout_ms = 1500

# Delay used instead when the host has no idle callbacks.
fallback_delay_ms = 150

# Send a low fetch-priority hint where supported.
low_priority = true

# ---------------------------------------------------------------------------
# Colors - Light theme
# ---------------------------------------------------------------------------
[colors.light]
background = "#ffffff"
text = "#111111"
text_muted = "#666666"    # Descriptions, prices, status messages
border = "#e0e0e0"
accent = "#2f6f4f"        # Cart button, active dot

# ---------------------------------------------------------------------------
# Colors - Dark theme
# ---------------------------------------------------------------------------
[colors.dark]
background = "#0f1115"
text = "#eeeeee"
text_muted = "#9a9a9a"
border = "#2a2d33"
accent = "#7fc8a0"
"##
}

/// Generate CSS custom properties for both themes, keyed on `data-theme`.
pub fn generate_color_css(colors: &ColorConfig) -> String {
    format!(
        r#":root, :root[data-theme="light"] {{
    --color-bg: {light_bg};
    --color-text: {light_text};
    --color-text-muted: {light_text_muted};
    --color-border: {light_border};
    --color-accent: {light_accent};
}}

:root[data-theme="dark"] {{
    --color-bg: {dark_bg};
    --color-text: {dark_text};
    --color-text-muted: {dark_text_muted};
    --color-border: {dark_border};
    --color-accent: {dark_accent};
}}"#,
        light_bg = colors.light.background,
        light_text = colors.light.text,
        light_text_muted = colors.light.text_muted,
        light_border = colors.light.border,
        light_accent = colors.light.accent,
        dark_bg = colors.dark.background,
        dark_text = colors.dark.text,
        dark_text_muted = colors.dark.text_muted,
        dark_border = colors.dark.border,
        dark_accent = colors.dark.accent,
    )
}
