//! GCodePlay Settings Crate
//!
//! Explicit configuration for the interpreter, playback controller, and voxel
//! simulator. Configuration is loaded once and passed in at construction;
//! nothing is written back.

pub mod config;
pub mod error;

pub use config::{
    BeltSettings, ColorMode, ColorSettings, Config, MachineSettings, ParserSettings,
    PlaybackSettings, VoxelSettings,
};
pub use error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
