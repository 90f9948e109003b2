//! Scene configuration.
//!
//! Thresholds and limits that tune interaction, history and rendering.
//! Everything has a default; a JSON document only needs the fields it
//! overrides.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::keybindings::KeyBindings;

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Full configuration for a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Version of the configuration format
    pub version: u32,

    #[serde(default)]
    pub interaction: InteractionConfig,

    #[serde(default)]
    pub undo: UndoConfig,

    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub keybindings: KeyBindings,
}

/// Pointer interaction thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Pointer travel (screen px) below which a press/release is a click
    pub click_distance: f32,
    /// Press duration (ms) below which a press/release is a click
    pub click_time_ms: u64,
    /// Max distance (screen px) between the clicks of a double click
    pub double_click_distance: f32,
    /// Max delay (ms) between the clicks of a double click
    pub double_click_time_ms: u64,
    /// Width of the border band of a box (screen px)
    pub border_tolerance: f32,
    /// Smallest box (px) kept when drawing in interactive mode
    pub min_establish_size: f32,
    /// Smallest box side (px) a resize may produce
    pub min_box_size: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            click_distance: DEFAULT_CLICK_DISTANCE,
            click_time_ms: DEFAULT_CLICK_TIME_MS,
            double_click_distance: DEFAULT_DOUBLE_CLICK_DISTANCE,
            double_click_time_ms: DEFAULT_DOUBLE_CLICK_TIME_MS,
            border_tolerance: DEFAULT_BORDER_TOLERANCE,
            min_establish_size: DEFAULT_MIN_ESTABLISH_SIZE,
            min_box_size: DEFAULT_MIN_BOX_SIZE,
        }
    }
}

/// Configuration for the undo stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UndoConfig {
    /// Maximum number of commands to keep in history
    pub max_history: usize,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            max_history: DEFAULT_MAX_HISTORY,
        }
    }
}

/// Rendering and layout settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Retry budget passed to the resource loader
    pub resource_retries: u32,
    /// Font size of classification labels
    pub label_font_size: f32,
    /// Inset of the classification stack from the media corner
    pub label_padding: f32,
    /// Gap between stacked classification labels
    pub label_spacing: f32,
    /// Frames slower than this are logged
    pub slow_frame_ms: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            resource_retries: DEFAULT_RESOURCE_RETRIES,
            label_font_size: DEFAULT_LABEL_FONT_SIZE,
            label_padding: DEFAULT_LABEL_PADDING,
            label_spacing: DEFAULT_LABEL_SPACING,
            slow_frame_ms: DEFAULT_SLOW_FRAME_MS,
        }
    }
}

impl SceneConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            interaction: InteractionConfig::default(),
            undo: UndoConfig::default(),
            render: RenderConfig::default(),
            keybindings: KeyBindings::default(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.undo.max_history == 0 {
            return Err(ConfigError::invalid("undo.max_history must be at least 1"));
        }
        let interaction = &self.interaction;
        let distances = [
            ("interaction.click_distance", interaction.click_distance),
            ("interaction.double_click_distance", interaction.double_click_distance),
            ("interaction.border_tolerance", interaction.border_tolerance),
            ("interaction.min_establish_size", interaction.min_establish_size),
            ("interaction.min_box_size", interaction.min_box_size),
        ];
        for (name, value) in distances {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::invalid(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if self.render.label_font_size <= 0.0 {
            return Err(ConfigError::invalid("render.label_font_size must be positive"));
        }
        Ok(())
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// A value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}
