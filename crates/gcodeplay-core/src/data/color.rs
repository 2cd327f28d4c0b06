//! RGBA color values used for segment and voxel appearance

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// RGBA color with components in `0.0..=1.0`
///
/// Serialized as a hex string (`#RRGGBB` or `#RRGGBBAA`) so configuration
/// files stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Color = Color::rgb(0.0, 1.0, 0.0);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);
    pub const TRANSPARENT: Color = Color::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA` (leading `#` optional). Missing alpha is opaque.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if !(digits.len() == 6 || digits.len() == 8) || !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| -> Option<f32> {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .ok()
                .map(|v| v as f32 / 255.0)
        };
        let a = if digits.len() == 8 { channel(6)? } else { 1.0 };
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?, a))
    }

    pub fn to_hex(&self) -> String {
        let byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        if self.a >= 1.0 {
            format!("#{:02X}{:02X}{:02X}", byte(self.r), byte(self.g), byte(self.b))
        } else {
            format!(
                "#{:02X}{:02X}{:02X}{:02X}",
                byte(self.r),
                byte(self.g),
                byte(self.b),
                byte(self.a)
            )
        }
    }

    /// Linear interpolation, `t` clamped to `0..=1`
    pub fn lerp(&self, other: &Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        Color::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
            self.a + (other.a - self.a) * t,
        )
    }

    /// Shift RGB by `-delta`, clamped at the component boundaries. Alpha is kept.
    pub fn darken(&self, delta: f32) -> Color {
        Color::new(
            (self.r - delta).clamp(0.0, 1.0),
            (self.g - delta).clamp(0.0, 1.0),
            (self.b - delta).clamp(0.0, 1.0),
            self.a,
        )
    }

    pub fn with_alpha(&self, a: f32) -> Color {
        Color::new(self.r, self.g, self.b, a)
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::from_hex(s).ok_or_else(|| format!("Invalid color: {}", s))
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex() {
        assert_eq!(Color::from_hex("#FF0000"), Some(Color::RED));
        assert_eq!(Color::from_hex("00ff00"), Some(Color::GREEN));
        let c = Color::from_hex("#0000FF80").unwrap();
        assert!((c.a - 128.0 / 255.0).abs() < 1e-6);
        assert!(Color::from_hex("#12345").is_none());
        assert!(Color::from_hex("#GG0000").is_none());
    }

    #[test]
    fn test_hex_round_trip() {
        assert_eq!(Color::from_hex("#00FFFF").unwrap().to_hex(), "#00FFFF");
    }

    #[test]
    fn test_lerp_clamps() {
        let mid = Color::BLUE.lerp(&Color::RED, 0.5);
        assert!((mid.r - 0.5).abs() < 1e-6);
        assert!((mid.b - 0.5).abs() < 1e-6);
        assert_eq!(Color::BLUE.lerp(&Color::RED, 2.0), Color::RED);
        assert_eq!(Color::BLUE.lerp(&Color::RED, -1.0), Color::BLUE);
    }

    #[test]
    fn test_darken_clamps() {
        let c = Color::rgb(0.05, 0.5, 1.0).darken(0.1);
        assert_eq!(c.r, 0.0);
        assert!((c.g - 0.4).abs() < 1e-6);
        assert!((c.b - 0.9).abs() < 1e-6);
        assert_eq!(c.a, 1.0);
    }

    #[test]
    fn test_serde_as_hex() {
        let json = serde_json::to_string(&Color::RED).unwrap();
        assert_eq!(json, "\"#FF0000\"");
        let back: Color = serde_json::from_str("\"#00FF00\"").unwrap();
        assert_eq!(back, Color::GREEN);
        assert!(serde_json::from_str::<Color>("\"nope\"").is_err());
    }
}
