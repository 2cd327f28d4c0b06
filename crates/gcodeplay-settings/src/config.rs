//! Configuration for GCodePlay
//!
//! Provides configuration file handling and validation. Supports JSON and
//! TOML file formats.
//!
//! Configuration is organized into logical sections:
//! - Parser settings (coordinate mode, arc segmentation, deposit rules)
//! - Color settings (color mode, feed gradient, progress colors)
//! - Playback settings (scrub threshold, look-ahead, batching)
//! - Machine settings (belt geometry)
//! - Voxel settings (cell dimensions)
//! - Tool table

use gcodeplay_core::constants::{
    DEFAULT_ARC_SEGMENT_LENGTH, DEFAULT_BATCH_SIZE, DEFAULT_BELT_ANGLE_DEG,
    DEFAULT_BELT_REFERENCE_HEIGHT, DEFAULT_DARKEN_DELTA, DEFAULT_HIGHLIGHT_TICKS,
    DEFAULT_LOOK_AHEAD, DEFAULT_MAX_FEED_RATE, DEFAULT_MIN_FEED_RATE, DEFAULT_MIN_SEGMENT_LENGTH,
    DEFAULT_SCRUB_DISTANCE, DEFAULT_VOXEL_HEIGHT, DEFAULT_VOXEL_WIDTH,
};
use gcodeplay_core::{Color, Tool, ToolRegistry};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::error::{ConfigError, ConfigResult, SettingsResult};

/// How segment colors are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Per-tool color
    #[default]
    Flat,
    /// Gradient between two colors by feed rate
    Feed,
    /// Slicer feature color
    Feature,
}

impl std::fmt::Display for ColorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flat => write!(f, "flat"),
            Self::Feed => write!(f, "feed"),
            Self::Feature => write!(f, "feature"),
        }
    }
}

impl FromStr for ColorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flat" | "color" | "tool" => Ok(Self::Flat),
            "feed" => Ok(Self::Feed),
            "feature" => Ok(Self::Feature),
            _ => Err(format!("Unknown color mode: {}", s)),
        }
    }
}

/// Interpreter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserSettings {
    /// Start in absolute (G90) mode
    pub absolute_by_default: bool,
    /// Target length of interpolated arc segments (mm)
    pub arc_segment_length: f64,
    /// Substitute the minimum radius for arcs whose radius is too small
    pub arc_radius_fixup: bool,
    /// Treat every G1 as depositing, for machines without a flow axis
    pub working_moves_deposit: bool,
    /// Emit non-depositing moves as travel segments
    pub render_travels: bool,
    /// Depositing moves shorter than this are dropped (mm)
    pub min_segment_length: f64,
    /// Drop everything the slicer does not mark as perimeter
    pub perimeter_only: bool,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            absolute_by_default: true,
            arc_segment_length: DEFAULT_ARC_SEGMENT_LENGTH,
            arc_radius_fixup: false,
            working_moves_deposit: false,
            render_travels: true,
            min_segment_length: DEFAULT_MIN_SEGMENT_LENGTH,
            perimeter_only: false,
        }
    }
}

/// Color settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorSettings {
    pub mode: ColorMode,
    /// Feed rate mapped to `min_feed_color` (mm/min)
    pub min_feed_rate: f64,
    /// Feed rate mapped to `max_feed_color` (mm/min)
    pub max_feed_rate: f64,
    pub min_feed_color: Color,
    pub max_feed_color: Color,
    /// Highlight color for freshly revealed additive segments
    pub progress_color: Color,
    pub travel_color: Color,
    /// Brightness shift for darker tool variants
    pub darken_delta: f32,
}

impl ColorSettings {
    /// Feed-gradient color, clamped at both thresholds
    pub fn feed_color(&self, feed_rate: f64) -> Color {
        let span = self.max_feed_rate - self.min_feed_rate;
        let ratio = if span > 0.0 {
            (feed_rate - self.min_feed_rate) / span
        } else {
            1.0
        };
        if ratio >= 1.0 {
            self.max_feed_color
        } else if ratio <= 0.0 {
            self.min_feed_color
        } else {
            self.min_feed_color.lerp(&self.max_feed_color, ratio as f32)
        }
    }
}

impl Default for ColorSettings {
    fn default() -> Self {
        Self {
            mode: ColorMode::Flat,
            min_feed_rate: DEFAULT_MIN_FEED_RATE,
            max_feed_rate: DEFAULT_MAX_FEED_RATE,
            min_feed_color: Color::BLUE,
            max_feed_color: Color::RED,
            progress_color: Color::GREEN,
            travel_color: Color::RED,
            darken_delta: DEFAULT_DARKEN_DELTA,
        }
    }
}

/// Playback settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Cursor jump (bytes) that forces a full recompute
    pub scrub_distance: u64,
    /// Bytes past the cursor pre-revealed at full opacity
    pub look_ahead: u64,
    /// Ticks a newly revealed segment stays highlighted
    pub highlight_ticks: u8,
    /// Segments per controller batch
    pub batch_size: usize,
    /// Travel moves vanish once passed
    pub ephemeral_travels: bool,
    /// Opacity of not-yet-reached additive segments; `None` hides them
    pub hidden_translucency: Option<f32>,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            scrub_distance: DEFAULT_SCRUB_DISTANCE,
            look_ahead: DEFAULT_LOOK_AHEAD,
            highlight_ticks: DEFAULT_HIGHLIGHT_TICKS,
            batch_size: DEFAULT_BATCH_SIZE,
            ephemeral_travels: true,
            hidden_translucency: None,
        }
    }
}

/// Belt (non-orthogonal gantry) geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeltSettings {
    /// Gantry angle from the belt surface (degrees)
    pub angle_deg: f64,
    /// Height at which the sheared and machine Y coincide (mm)
    pub reference_height: f64,
}

impl BeltSettings {
    /// Y shift per unit of Z
    pub fn shear(&self) -> f64 {
        (90.0 - self.angle_deg).to_radians().tan()
    }

    /// Constant removed so the first layer lands near the origin
    pub fn computed_offset(&self) -> f64 {
        self.reference_height * self.shear()
    }
}

impl Default for BeltSettings {
    fn default() -> Self {
        Self {
            angle_deg: DEFAULT_BELT_ANGLE_DEG,
            reference_height: DEFAULT_BELT_REFERENCE_HEIGHT,
        }
    }
}

/// Machine settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineSettings {
    /// Present only for belt printers
    pub belt: Option<BeltSettings>,
}

/// Voxel simulation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoxelSettings {
    pub enabled: bool,
    /// Cell size along X and Y (mm)
    pub cell_width: f64,
    /// Cell size along Z (mm)
    pub cell_height: f64,
    /// Ticks a changed cell stays highlighted
    pub highlight_ticks: u8,
}

impl Default for VoxelSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            cell_width: DEFAULT_VOXEL_WIDTH,
            cell_height: DEFAULT_VOXEL_HEIGHT,
            highlight_ticks: DEFAULT_HIGHLIGHT_TICKS,
        }
    }
}

fn default_tools() -> Vec<Tool> {
    ToolRegistry::default_printer().tools().to_vec()
}

/// Complete configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub parser: ParserSettings,
    pub color: ColorSettings,
    pub playback: PlaybackSettings,
    pub machine: MachineSettings,
    pub voxel: VoxelSettings,
    #[serde(default = "default_tools")]
    pub tools: Vec<Tool>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            parser: ParserSettings::default(),
            color: ColorSettings::default(),
            playback: PlaybackSettings::default(),
            machine: MachineSettings::default(),
            voxel: VoxelSettings::default(),
            tools: default_tools(),
        }
    }
}

impl Config {
    /// Create default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from file; the extension selects the format
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path)?;

        let config: Self = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            other => {
                return Err(ConfigError::UnsupportedFormat(
                    other.unwrap_or("<none>").to_string(),
                )
                .into())
            }
        };

        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> SettingsResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse JSON text
    pub fn from_json_str(content: &str) -> SettingsResult<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.parser.arc_segment_length <= 0.0 {
            return Err(ConfigError::out_of_range(
                "parser.arc_segment_length",
                self.parser.arc_segment_length,
            ));
        }

        if self.parser.min_segment_length < 0.0 {
            return Err(ConfigError::out_of_range(
                "parser.min_segment_length",
                self.parser.min_segment_length,
            ));
        }

        if self.color.min_feed_rate >= self.color.max_feed_rate {
            return Err(ConfigError::out_of_range(
                "color.min_feed_rate",
                format!(
                    "{} (must be below max_feed_rate {})",
                    self.color.min_feed_rate, self.color.max_feed_rate
                ),
            ));
        }

        if !(0.0..=1.0).contains(&self.color.darken_delta) {
            return Err(ConfigError::out_of_range(
                "color.darken_delta",
                self.color.darken_delta,
            ));
        }

        if self.playback.batch_size == 0 {
            return Err(ConfigError::out_of_range("playback.batch_size", 0));
        }

        if let Some(alpha) = self.playback.hidden_translucency {
            if !(0.0..=1.0).contains(&alpha) {
                return Err(ConfigError::out_of_range(
                    "playback.hidden_translucency",
                    alpha,
                ));
            }
        }

        if let Some(belt) = &self.machine.belt {
            if belt.angle_deg <= 0.0 || belt.angle_deg >= 90.0 {
                return Err(ConfigError::out_of_range(
                    "machine.belt.angle_deg",
                    belt.angle_deg,
                ));
            }
        }

        if self.voxel.cell_width <= 0.0 || self.voxel.cell_height <= 0.0 {
            return Err(ConfigError::out_of_range(
                "voxel.cell_width/cell_height",
                format!("{}x{}", self.voxel.cell_width, self.voxel.cell_height),
            ));
        }

        for (idx, tool) in self.tools.iter().enumerate() {
            if tool.diameter <= 0.0 {
                return Err(ConfigError::out_of_range(
                    &format!("tools[{}].diameter", idx),
                    tool.diameter,
                ));
            }
        }

        Ok(())
    }

    /// Build the tool registry described by this configuration
    pub fn tool_registry(&self) -> ToolRegistry {
        ToolRegistry::new(self.tools.clone(), self.color.darken_delta)
    }

    /// Apply a single `section.key = value` override.
    ///
    /// The configuration is validated afterwards; on failure it is left
    /// unchanged.
    pub fn set_value(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        let mut next = self.clone();
        match key {
            "parser.absolute_by_default" => next.parser.absolute_by_default = parse(key, value)?,
            "parser.arc_segment_length" => next.parser.arc_segment_length = parse(key, value)?,
            "parser.arc_radius_fixup" => next.parser.arc_radius_fixup = parse(key, value)?,
            "parser.working_moves_deposit" => {
                next.parser.working_moves_deposit = parse(key, value)?
            }
            "parser.render_travels" => next.parser.render_travels = parse(key, value)?,
            "parser.min_segment_length" => next.parser.min_segment_length = parse(key, value)?,
            "parser.perimeter_only" => next.parser.perimeter_only = parse(key, value)?,
            "color.mode" => next.color.mode = parse(key, value)?,
            "color.min_feed_rate" => next.color.min_feed_rate = parse(key, value)?,
            "color.max_feed_rate" => next.color.max_feed_rate = parse(key, value)?,
            "color.min_feed_color" => next.color.min_feed_color = parse_color(key, value)?,
            "color.max_feed_color" => next.color.max_feed_color = parse_color(key, value)?,
            "color.progress_color" => next.color.progress_color = parse_color(key, value)?,
            "color.travel_color" => next.color.travel_color = parse_color(key, value)?,
            "color.darken_delta" => next.color.darken_delta = parse(key, value)?,
            "playback.scrub_distance" => next.playback.scrub_distance = parse(key, value)?,
            "playback.look_ahead" => next.playback.look_ahead = parse(key, value)?,
            "playback.highlight_ticks" => next.playback.highlight_ticks = parse(key, value)?,
            "playback.batch_size" => next.playback.batch_size = parse(key, value)?,
            "playback.ephemeral_travels" => next.playback.ephemeral_travels = parse(key, value)?,
            "playback.hidden_translucency" => {
                next.playback.hidden_translucency = match value.trim() {
                    "" | "none" => None,
                    v => Some(parse(key, v)?),
                }
            }
            "machine.belt" => {
                next.machine.belt = if parse::<bool>(key, value)? {
                    Some(next.machine.belt.unwrap_or_default())
                } else {
                    None
                }
            }
            "machine.belt.angle_deg" => {
                next.machine.belt.get_or_insert_with(BeltSettings::default).angle_deg =
                    parse(key, value)?
            }
            "voxel.enabled" => next.voxel.enabled = parse(key, value)?,
            "voxel.cell_width" => next.voxel.cell_width = parse(key, value)?,
            "voxel.cell_height" => next.voxel.cell_height = parse(key, value)?,
            "voxel.highlight_ticks" => next.voxel.highlight_ticks = parse(key, value)?,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        next.validate()?;
        *self = next;
        Ok(())
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_color(key: &str, value: &str) -> ConfigResult<Color> {
    Color::from_hex(value).ok_or_else(|| ConfigError::InvalidColor {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert!(config.parser.absolute_by_default);
        assert_eq!(config.parser.arc_segment_length, 1.0);
        assert_eq!(config.playback.scrub_distance, 30_000);
        assert_eq!(config.playback.look_ahead, 500);
        assert_eq!(config.playback.batch_size, 20_000);
        assert_eq!(config.color.mode, ColorMode::Flat);
        assert_eq!(config.tools.len(), 5);
        assert!(config.machine.belt.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_feed_color_clamps() {
        let color = ColorSettings::default();
        assert_eq!(color.feed_color(100.0), Color::BLUE);
        assert_eq!(color.feed_color(9000.0), Color::RED);
        let mid = color.feed_color(2400.0);
        assert!((mid.r - 0.5).abs() < 1e-6);
        assert!((mid.b - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_belt_shear() {
        let belt = BeltSettings::default();
        let expected = 55f64.to_radians().tan();
        assert!((belt.shear() - expected).abs() < 1e-12);
        assert!((belt.computed_offset() - 0.2 * expected).abs() < 1e-12);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.parser.arc_segment_length = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValueOutOfRange { .. })
        ));

        let mut config = Config::default();
        config.color.min_feed_rate = 5000.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.voxel.cell_height = -1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.playback.hidden_translucency = Some(1.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_set_value() {
        let mut config = Config::default();
        config.set_value("color.mode", "feed").unwrap();
        assert_eq!(config.color.mode, ColorMode::Feed);

        config.set_value("playback.hidden_translucency", "0.25").unwrap();
        assert_eq!(config.playback.hidden_translucency, Some(0.25));

        config.set_value("machine.belt.angle_deg", "45").unwrap();
        assert_eq!(config.machine.belt.map(|b| b.angle_deg), Some(45.0));

        assert!(matches!(
            config.set_value("color.progress_color", "green"),
            Err(ConfigError::InvalidColor { .. })
        ));
        assert!(matches!(
            config.set_value("ui.theme", "dark"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_set_value_keeps_config_on_invalid() {
        let mut config = Config::default();
        assert!(config.set_value("playback.batch_size", "0").is_err());
        assert_eq!(config.playback.batch_size, 20_000);
    }

    #[test]
    fn test_tool_registry_uses_darken_delta() {
        let mut config = Config::default();
        config.color.darken_delta = 0.5;
        let registry = config.tool_registry();
        let dark = registry.darker_color(4);
        assert!((dark.r - 0.5).abs() < 1e-6);
    }
}
