//! Slicer feature annotations
//!
//! Slicers mark each block of moves with a comment naming the feature being
//! printed (`;TYPE:External perimeter`, `; feature shells`, ...). Each
//! [`SlicerStyle`] owns a fixed table from feature name to color and
//! perimeter/support flags; [`FeatureClassifier`] tracks the active feature
//! over one parse session.

use gcodeplay_core::constants::METADATA_SCAN_LINES;
use gcodeplay_core::Color;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Color used for any feature name missing from the active table
pub const UNKNOWN_FEATURE_COLOR: Color = Color::rgb(0.5, 0.5, 0.5);

/// One row of a slicer's feature table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureEntry {
    pub name: &'static str,
    pub color: Color,
    pub is_perimeter: bool,
    pub is_support: bool,
}

const fn entry(
    name: &'static str,
    rgb: (f32, f32, f32),
    is_perimeter: bool,
    is_support: bool,
) -> FeatureEntry {
    FeatureEntry {
        name,
        color: Color::rgb(rgb.0, rgb.1, rgb.2),
        is_perimeter,
        is_support,
    }
}

const CURA_FEATURES: &[FeatureEntry] = &[
    entry("SKIN", (1.0, 0.9, 0.3), true, false),
    entry("WALL-OUTER", (1.0, 0.5, 0.2), true, false),
    entry("WALL-INNER", (0.59, 0.19, 0.16), true, false),
    entry("FILL", (0.95, 0.25, 0.25), false, false),
    entry("SKIRT", (0.0, 0.53, 0.43), false, false),
    entry("SUPPORT", (0.0, 1.0, 0.0), false, true),
    entry("SUPPORT-INTERFACE", (0.0, 0.5, 0.0), false, true),
    entry("PRIME-TOWER", (0.7, 0.89, 0.67), false, false),
    entry("Custom", (0.5, 0.5, 0.5), false, false),
];

const PRUSA_FEATURES: &[FeatureEntry] = &[
    entry("Perimeter", (1.0, 0.9, 0.3), true, false),
    entry("External perimeter", (1.0, 0.5, 0.2), true, false),
    entry("Overhang perimeter", (0.15, 0.16, 0.75), true, false),
    entry("Internal infill", (0.59, 0.19, 0.16), false, false),
    entry("Solid infill", (0.59, 0.19, 0.8), false, false),
    entry("Top solid infill", (0.95, 0.25, 0.25), true, false),
    entry("Bridge infill", (0.3, 0.5, 0.73), false, false),
    entry("Gap fill", (1.0, 1.0, 1.0), false, false),
    entry("Skirt", (0.0, 0.53, 0.43), false, false),
    entry("Skirt/Brim", (0.0, 0.53, 0.43), false, false),
    entry("Support material", (0.0, 1.0, 0.0), false, true),
    entry("Support material interface", (0.0, 0.5, 0.0), false, true),
    entry("Wipe tower", (0.7, 0.89, 0.67), false, false),
    entry("Custom", (0.5, 0.5, 0.5), false, false),
];

const SUPERSLICER_FEATURES: &[FeatureEntry] = &[
    entry("Perimeter", (1.0, 0.9, 0.3), true, false),
    entry("External perimeter", (1.0, 0.5, 0.2), true, false),
    entry("Internal infill", (0.59, 0.19, 0.16), false, false),
    entry("Solid infill", (0.59, 0.19, 0.8), true, false),
    entry("Top solid infill", (0.95, 0.25, 0.25), true, false),
    entry("Bridge infill", (0.3, 0.5, 0.73), false, false),
    entry("Gap fill", (1.0, 1.0, 1.0), false, false),
    entry("Skirt", (0.0, 0.53, 0.43), false, false),
    entry("Skirt/Brim", (0.0, 0.53, 0.43), false, false),
    entry("Supported material", (0.0, 1.0, 0.0), false, true),
    entry("Supported material interface", (0.0, 0.5, 0.0), false, true),
    entry("Support material", (0.5, 0.5, 0.5), false, true),
    entry("Support material interface", (0.5, 0.5, 0.5), false, true),
    entry("Overhang perimeter", (0.5, 0.5, 0.5), true, false),
    entry("Wipe tower", (0.5, 0.5, 0.5), true, false),
    entry("Custom", (0.5, 0.5, 0.5), false, false),
];

const ORCA_FEATURES: &[FeatureEntry] = &[
    entry("Outer wall", (1.0, 0.9, 0.3), true, false),
    entry("Inner wall", (1.0, 0.49, 0.22), false, false),
    entry("Overhang wall", (0.15, 0.16, 0.75), false, false),
    entry("Sparse infill", (0.69, 0.19, 0.16), false, false),
    entry("Internal solid infill", (0.59, 0.33, 0.8), false, false),
    entry("Top surface", (0.7, 0.22, 0.22), true, false),
    entry("Bottom surface", (0.4, 0.36, 0.78), true, false),
    entry("Bridge", (0.3, 0.5, 0.73), false, false),
    entry("Custom", (0.37, 0.82, 0.58), false, false),
    entry("Support", (0.0, 1.0, 0.0), false, true),
    entry("Support interface", (0.12, 0.38, 0.13), false, true),
    entry("Prime tower", (0.7, 0.89, 0.67), false, false),
    entry("Internal Bridge", (0.3, 0.5, 0.73), false, false),
    entry("Skirt", (0.0, 0.53, 0.43), false, false),
];

const IDEAMAKER_FEATURES: &[FeatureEntry] = &[
    entry("WALL-OUTER", (0.47, 0.18, 0.18), true, false),
    entry("WALL-INNER", (0.0, 0.55, 0.0), false, false),
    entry("FILL", (0.9, 0.2, 0.2), false, false),
    entry("SOLID-FILL", (0.95, 0.25, 0.25), false, false),
    entry("BRIDGE", (0.9, 0.15, 0.195), false, false),
    entry("SKIRT", (0.31, 0.12, 0.33), false, false),
    entry("SUPPORT", (0.0, 0.53, 0.43), false, true),
    entry("DENSE-SUPPORT", (0.0, 0.28, 0.55), false, true),
    entry("RAFT", (0.59, 0.49, 0.2), false, false),
    entry("CUSTOM", (0.5, 0.5, 0.5), false, false),
];

const KIRIMOTO_FEATURES: &[FeatureEntry] = &[
    entry("shells", (1.0, 0.9, 0.3), true, false),
    entry("sparse infill", (0.59, 0.19, 0.16), false, false),
    entry("solid fill", (0.59, 0.19, 0.8), true, false),
    entry("Support material", (0.5, 0.5, 0.5), false, true),
    entry("Support material interface", (0.5, 0.5, 0.5), false, true),
    entry("Overhang perimeter", (0.5, 0.5, 0.5), true, false),
    entry("Wipe tower", (0.5, 0.5, 0.5), true, false),
];

/// A parsed annotation comment
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    /// Start of a named feature block
    Feature(String),
    /// Explicit layer height for the following moves
    Height(f64),
}

/// Annotation convention of the program's producer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SlicerStyle {
    /// No recognized annotations
    #[default]
    Generic,
    Cura,
    PrusaSlicer,
    SuperSlicer,
    OrcaSlicer,
    IdeaMaker,
    KiriMoto,
}

impl SlicerStyle {
    /// Detect the producer from the leading text of a program.
    pub fn detect(head: &str) -> Self {
        let head = head.to_lowercase();
        if head.contains("superslicer") {
            Self::SuperSlicer
        } else if head.contains("orcaslicer") {
            Self::OrcaSlicer
        } else if head.contains("prusaslicer") {
            Self::PrusaSlicer
        } else if head.contains("cura_steamengine") || head.contains("generated with cura") {
            Self::Cura
        } else if head.contains("ideamaker") {
            Self::IdeaMaker
        } else if head.contains("kiri:moto") || head.contains("kirimoto") {
            Self::KiriMoto
        } else {
            Self::Generic
        }
    }

    /// Feature table for this style
    pub fn features(&self) -> &'static [FeatureEntry] {
        match self {
            Self::Generic => &[],
            Self::Cura => CURA_FEATURES,
            Self::PrusaSlicer => PRUSA_FEATURES,
            Self::SuperSlicer => SUPERSLICER_FEATURES,
            Self::OrcaSlicer => ORCA_FEATURES,
            Self::IdeaMaker => IDEAMAKER_FEATURES,
            Self::KiriMoto => KIRIMOTO_FEATURES,
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&'static FeatureEntry> {
        self.features().iter().find(|e| e.name == name)
    }

    /// Parse a whole-line comment in this style's convention.
    pub fn parse_annotation(&self, comment: &str) -> Option<Annotation> {
        let comment = comment.trim();
        match self {
            Self::Generic => None,
            Self::KiriMoto => comment
                .strip_prefix("; feature")
                .map(|name| Annotation::Feature(name.trim().to_string())),
            Self::OrcaSlicer => {
                if let Some(height) = comment.strip_prefix(";HEIGHT:") {
                    return height.trim().parse().ok().map(Annotation::Height);
                }
                comment
                    .strip_prefix(";TYPE:")
                    .map(|name| Annotation::Feature(name.trim().to_string()))
            }
            _ => comment
                .strip_prefix(";TYPE:")
                .map(|name| Annotation::Feature(name.trim().to_string())),
        }
    }
}

impl fmt::Display for SlicerStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generic => write!(f, "Generic"),
            Self::Cura => write!(f, "Cura"),
            Self::PrusaSlicer => write!(f, "PrusaSlicer"),
            Self::SuperSlicer => write!(f, "SuperSlicer"),
            Self::OrcaSlicer => write!(f, "OrcaSlicer"),
            Self::IdeaMaker => write!(f, "ideaMaker"),
            Self::KiriMoto => write!(f, "Kiri:Moto"),
        }
    }
}

/// Per-tool data recovered from trailing slicer comments
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MachineMetadata {
    /// Nozzle diameter per tool, in tool order
    pub nozzle_diameters: Vec<f64>,
}

impl MachineMetadata {
    /// Scan `lines` (normally the last [`METADATA_SCAN_LINES`] of a program)
    /// for `nozzle_diameter = a,b,...`. The last match wins.
    pub fn scan<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut metadata = Self::default();
        for line in lines {
            if !line.contains("nozzle_diameter") {
                continue;
            }
            let Some((_, values)) = line.split_once('=') else {
                continue;
            };
            let diameters: Vec<f64> = values
                .split(',')
                .filter_map(|v| v.trim().parse::<f64>().ok())
                .filter(|d| *d > 0.0)
                .collect();
            if !diameters.is_empty() {
                metadata.nozzle_diameters = diameters;
            }
        }
        metadata
    }

    /// Scan the trailing window of a complete program.
    pub fn scan_program(text: &str) -> Self {
        let lines: Vec<&str> = text.lines().collect();
        let start = lines.len().saturating_sub(METADATA_SCAN_LINES);
        Self::scan(lines[start..].iter().copied())
    }
}

/// Tracks the active slicer feature over one parse session
#[derive(Debug, Clone, Default)]
pub struct FeatureClassifier {
    style: SlicerStyle,
    feature: Option<String>,
    entry: Option<&'static FeatureEntry>,
    height_hint: Option<f64>,
    missing: HashSet<String>,
}

impl FeatureClassifier {
    pub fn new(style: SlicerStyle) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }

    pub fn style(&self) -> SlicerStyle {
        self.style
    }

    /// Consume an annotation comment. Returns false if the comment is not an
    /// annotation in this style.
    pub fn recognize(&mut self, comment: &str) -> bool {
        match self.style.parse_annotation(comment) {
            Some(Annotation::Feature(name)) => {
                self.entry = self.style.lookup(&name);
                if self.entry.is_none() {
                    self.report_missing(&name);
                }
                self.feature = Some(name);
                true
            }
            Some(Annotation::Height(height)) => {
                self.height_hint = Some(height);
                true
            }
            None => false,
        }
    }

    fn report_missing(&mut self, name: &str) {
        if self.missing.insert(name.to_string()) {
            tracing::warn!(feature = name, slicer = %self.style, "Missing feature");
        }
    }

    /// Name of the active feature, if any has been seen
    pub fn feature_name(&self) -> Option<&str> {
        self.feature.as_deref()
    }

    pub fn feature_color(&self) -> Color {
        self.entry.map(|e| e.color).unwrap_or(UNKNOWN_FEATURE_COLOR)
    }

    /// Unknown features count as perimeter so perimeter-only mode keeps them.
    pub fn is_perimeter(&self) -> bool {
        self.entry.map(|e| e.is_perimeter).unwrap_or(true)
    }

    pub fn is_support(&self) -> bool {
        self.entry.map(|e| e.is_support).unwrap_or(false)
    }

    /// Last `;HEIGHT:` value seen
    pub fn height_hint(&self) -> Option<f64> {
        self.height_hint
    }

    /// Feature names that were not in the table, each reported once
    pub fn missing_features(&self) -> impl Iterator<Item = &str> {
        self.missing.iter().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_styles() {
        assert_eq!(
            SlicerStyle::detect("; generated by PrusaSlicer 2.6.0"),
            SlicerStyle::PrusaSlicer
        );
        assert_eq!(
            SlicerStyle::detect("; generated by SuperSlicer 2.5 (based on PrusaSlicer)"),
            SlicerStyle::SuperSlicer
        );
        assert_eq!(
            SlicerStyle::detect(";FLAVOR:Marlin\n;Generated with Cura_SteamEngine 5.4"),
            SlicerStyle::Cura
        );
        assert_eq!(
            SlicerStyle::detect("; generated by OrcaSlicer 1.8"),
            SlicerStyle::OrcaSlicer
        );
        assert_eq!(SlicerStyle::detect(";Sliced by ideaMaker"), SlicerStyle::IdeaMaker);
        assert_eq!(SlicerStyle::detect("; Generated by Kiri:Moto"), SlicerStyle::KiriMoto);
        assert_eq!(SlicerStyle::detect("G28\nG1 X1"), SlicerStyle::Generic);
    }

    #[test]
    fn test_prusa_feature_lookup() {
        let mut classifier = FeatureClassifier::new(SlicerStyle::PrusaSlicer);
        assert!(classifier.recognize(";TYPE:External perimeter"));
        assert_eq!(classifier.feature_name(), Some("External perimeter"));
        assert_eq!(classifier.feature_color(), Color::rgb(1.0, 0.5, 0.2));
        assert!(classifier.is_perimeter());
        assert!(!classifier.is_support());

        assert!(classifier.recognize(";TYPE:Support material"));
        assert!(classifier.is_support());
        assert!(!classifier.is_perimeter());
    }

    #[test]
    fn test_unknown_feature_reported_once() {
        let mut classifier = FeatureClassifier::new(SlicerStyle::Cura);
        assert!(classifier.recognize(";TYPE:MYSTERY"));
        assert!(classifier.recognize(";TYPE:FILL"));
        assert!(classifier.recognize(";TYPE:MYSTERY"));
        assert_eq!(classifier.feature_color(), UNKNOWN_FEATURE_COLOR);
        assert!(classifier.is_perimeter());
        assert_eq!(classifier.missing_features().count(), 1);
    }

    #[test]
    fn test_orca_height_hint() {
        let mut classifier = FeatureClassifier::new(SlicerStyle::OrcaSlicer);
        assert!(classifier.recognize(";HEIGHT:0.28"));
        assert_eq!(classifier.height_hint(), Some(0.28));
        assert!(classifier.recognize(";TYPE:Outer wall"));
        assert_eq!(classifier.height_hint(), Some(0.28));
    }

    #[test]
    fn test_kirimoto_prefix() {
        let mut classifier = FeatureClassifier::new(SlicerStyle::KiriMoto);
        assert!(classifier.recognize("; feature shells"));
        assert_eq!(classifier.feature_name(), Some("shells"));
        assert!(!classifier.recognize(";TYPE:shells"));
    }

    #[test]
    fn test_generic_recognizes_nothing() {
        let mut classifier = FeatureClassifier::new(SlicerStyle::Generic);
        assert!(!classifier.recognize(";TYPE:Perimeter"));
        assert!(classifier.is_perimeter());
        assert_eq!(classifier.feature_name(), None);
    }

    #[test]
    fn test_metadata_scan() {
        let text = "G1 X1\n; nozzle_diameter = 0.6,0.4\n; filament_type = PLA\n";
        let metadata = MachineMetadata::scan_program(text);
        assert_eq!(metadata.nozzle_diameters, vec![0.6, 0.4]);

        let metadata = MachineMetadata::scan(["; nozzle_diameter = abc"]);
        assert!(metadata.nozzle_diameters.is_empty());
    }

    #[test]
    fn test_metadata_window_is_bounded() {
        let mut text = String::from("; nozzle_diameter = 0.8\n");
        for _ in 0..METADATA_SCAN_LINES {
            text.push_str("G1 X1\n");
        }
        assert!(MachineMetadata::scan_program(&text).nozzle_diameters.is_empty());
    }
}
