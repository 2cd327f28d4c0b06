//! # GCodePlay Core
//!
//! Core types and utilities for GCodePlay.
//! Provides geometry primitives, colors, units, the tool/material registry,
//! the error taxonomy, and the callback types used by long-running work.

pub mod constants;
pub mod data;
pub mod error;
pub mod types;
pub mod units;

pub use data::{
    arc_sweep, center_from_radius, lerp, Color, Plane, Position, Tool, ToolIndex, ToolKind,
    ToolRegistry, ToolResolution,
};

pub use error::{Error, GeometryError, InterpretError, Result};

pub use types::{CancelToken, ProgressCallback, StepCallback};

pub use units::Units;
