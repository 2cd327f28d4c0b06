//! Data models shared by the interpreter and the playback simulators
//!
//! This module provides:
//! - Positions and working planes with arc-center math
//! - RGBA colors with hex parsing, interpolation, and darkening
//! - The tool/material registry

pub mod color;
pub mod geometry;
pub mod tools;

pub use color::Color;
pub use geometry::{arc_sweep, center_from_radius, lerp, Plane, Position};
pub use tools::{Tool, ToolIndex, ToolKind, ToolRegistry, ToolResolution};
