//! Tool/material registry
//!
//! This module provides:
//! - Tool kinds (additive extruders vs. subtractive cutters)
//! - Tool definitions with color and diameter
//! - An ordered, index-addressable registry with wrap/clamp resolution
//! - Precomputed darker color variants for alternate shading

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Color;
use crate::constants::{DEFAULT_DARKEN_DELTA, DEFAULT_TOOL_DIAMETER};

/// Index into the tool registry
pub type ToolIndex = usize;

/// Whether a tool adds or removes material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    /// Extruder, pen, laser deposition
    #[default]
    #[serde(alias = "extruder")]
    Additive,
    /// End mill, router bit
    #[serde(alias = "endmill")]
    Subtractive,
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Additive => write!(f, "Additive"),
            Self::Subtractive => write!(f, "Subtractive"),
        }
    }
}

/// Complete tool definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Display name
    pub name: String,
    /// Base color for flat color mode
    pub color: Color,
    /// Nozzle or bit diameter in mm
    pub diameter: f64,
    /// Additive or subtractive
    #[serde(default)]
    pub kind: ToolKind,
}

impl Tool {
    pub fn new(name: impl Into<String>, color: Color, diameter: f64, kind: ToolKind) -> Self {
        Self {
            name: name.into(),
            color,
            diameter,
            kind,
        }
    }

    pub fn is_additive(&self) -> bool {
        self.kind == ToolKind::Additive
    }

    pub fn radius(&self) -> f64 {
        self.diameter / 2.0
    }
}

impl Default for Tool {
    fn default() -> Self {
        Self::new(
            "Tool #0",
            Color::BLUE,
            DEFAULT_TOOL_DIAMETER,
            ToolKind::Additive,
        )
    }
}

/// Outcome of resolving a programmed tool number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolResolution {
    /// Index that was actually selected
    pub index: ToolIndex,
    /// True when the request was wrapped or clamped
    pub adjusted: bool,
}

/// Ordered tool registry
///
/// Never empty: constructing from an empty list inserts a default tool.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
    darker: Vec<Color>,
    darken_delta: f32,
}

impl ToolRegistry {
    /// Create a registry with the given darker-variant brightness delta
    pub fn new(tools: Vec<Tool>, darken_delta: f32) -> Self {
        if tools.is_empty() {
            tracing::warn!("Empty tool table, using a single default tool");
        }
        let mut registry = Self {
            tools: if tools.is_empty() {
                vec![Tool::default()]
            } else {
                tools
            },
            darker: Vec::new(),
            darken_delta,
        };
        registry.rebuild_variants();
        registry
    }

    /// Five additive 0.4mm tools colored cyan, magenta, yellow, black, white
    pub fn default_printer() -> Self {
        let palette = ["#00FFFF", "#FF00FF", "#FFFF00", "#000000", "#FFFFFF"];
        let tools = palette
            .iter()
            .enumerate()
            .map(|(idx, hex)| {
                Tool::new(
                    format!("Tool #{}", idx),
                    Color::from_hex(hex).unwrap_or_default(),
                    DEFAULT_TOOL_DIAMETER,
                    ToolKind::Additive,
                )
            })
            .collect();
        Self::new(tools, DEFAULT_DARKEN_DELTA)
    }

    fn rebuild_variants(&mut self) {
        self.darker = self
            .tools
            .iter()
            .map(|t| t.color.darken(self.darken_delta))
            .collect();
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    /// Map a programmed tool number onto a valid index.
    ///
    /// Negative numbers clamp to zero; numbers past the end wrap by modulo.
    pub fn resolve(&self, requested: i64) -> ToolResolution {
        if requested < 0 {
            return ToolResolution {
                index: 0,
                adjusted: true,
            };
        }
        let requested = requested as u64;
        let len = self.tools.len() as u64;
        if requested >= len {
            ToolResolution {
                index: (requested % len) as usize,
                adjusted: true,
            }
        } else {
            ToolResolution {
                index: requested as usize,
                adjusted: false,
            }
        }
    }

    /// Tool at `index`, wrapping out-of-range indices
    pub fn get(&self, index: ToolIndex) -> &Tool {
        &self.tools[index % self.tools.len()]
    }

    pub fn is_additive(&self, index: ToolIndex) -> bool {
        self.get(index).is_additive()
    }

    pub fn diameter(&self, index: ToolIndex) -> f64 {
        self.get(index).diameter
    }

    pub fn color(&self, index: ToolIndex) -> Color {
        self.get(index).color
    }

    /// Precomputed darker variant of the tool color
    pub fn darker_color(&self, index: ToolIndex) -> Color {
        self.darker[index % self.darker.len()]
    }

    /// True if any registered tool removes material
    pub fn has_subtractive(&self) -> bool {
        self.tools.iter().any(|t| !t.is_additive())
    }

    /// Update a tool's diameter; ignored for unknown indices
    pub fn set_diameter(&mut self, index: ToolIndex, diameter: f64) {
        if let Some(tool) = self.tools.get_mut(index) {
            tool.diameter = diameter;
        }
    }

    /// Update a tool's color and its darker variant; ignored for unknown indices
    pub fn set_color(&mut self, index: ToolIndex, color: Color) {
        if let Some(tool) = self.tools.get_mut(index) {
            tool.color = color;
            self.darker[index] = color.darken(self.darken_delta);
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.tools)
    }

    pub fn from_json(json: &str, darken_delta: f32) -> Result<Self, serde_json::Error> {
        let tools: Vec<Tool> = serde_json::from_str(json)?;
        Ok(Self::new(tools, darken_delta))
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::default_printer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_printer() {
        let registry = ToolRegistry::default_printer();
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.color(0), Color::from_hex("#00FFFF").unwrap());
        assert!(registry.is_additive(4));
        assert_eq!(registry.diameter(2), 0.4);
        assert!(!registry.has_subtractive());
    }

    #[test]
    fn test_empty_registry_gets_default_tool() {
        let registry = ToolRegistry::new(Vec::new(), 0.1);
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_resolve_wraps_and_clamps() {
        let registry = ToolRegistry::default_printer();
        assert_eq!(
            registry.resolve(2),
            ToolResolution {
                index: 2,
                adjusted: false
            }
        );
        assert_eq!(
            registry.resolve(7),
            ToolResolution {
                index: 2,
                adjusted: true
            }
        );
        assert_eq!(
            registry.resolve(-1),
            ToolResolution {
                index: 0,
                adjusted: true
            }
        );
    }

    #[test]
    fn test_darker_variant_clamped() {
        let registry = ToolRegistry::default_printer();
        let dark = registry.darker_color(0);
        assert_eq!(dark.r, 0.0);
        assert!((dark.g - 0.9).abs() < 1e-6);
        assert_eq!(registry.darker_color(3), Color::BLACK);
    }

    #[test]
    fn test_set_color_updates_variant() {
        let mut registry = ToolRegistry::default_printer();
        registry.set_color(1, Color::rgb(0.5, 0.5, 0.5));
        assert!((registry.darker_color(1).r - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_json_round_trip_with_aliases() {
        let json = r##"[{"name":"Mill","color":"#808080","diameter":3.175,"kind":"endmill"}]"##;
        let registry = ToolRegistry::from_json(json, 0.1).unwrap();
        assert!(registry.has_subtractive());
        assert!(!registry.is_additive(0));

        let back = ToolRegistry::from_json(&registry.to_json().unwrap(), 0.1).unwrap();
        assert_eq!(back.tools(), registry.tools());
    }
}
