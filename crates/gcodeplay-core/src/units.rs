//! Unit handling for G20/G21
//!
//! All interpreter state is kept in millimetres; inch programs are scaled on
//! the way in.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::MM_PER_INCH;

/// Programmed length units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// G21
    #[default]
    Millimeters,
    /// G20
    Inches,
}

impl Units {
    /// Convert a programmed value to millimetres
    pub fn to_mm(&self, value: f64) -> f64 {
        match self {
            Units::Millimeters => value,
            Units::Inches => value * MM_PER_INCH,
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Units::Millimeters => write!(f, "mm"),
            Units::Inches => write!(f, "in"),
        }
    }
}

impl FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mm" | "millimeters" | "metric" => Ok(Self::Millimeters),
            "in" | "inch" | "inches" | "imperial" => Ok(Self::Inches),
            _ => Err(format!("Unknown units: {}", s)),
        }
    }
}
