//! Program summaries for the command-line driver

use gcodeplay_settings::Config;
use gcodeplay_visualizer::{ParseOutput, PlaybackDriver, VoxelSimulator};
use serde::Serialize;
use std::fmt;

/// Playback state at one cursor offset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CursorReport {
    pub offset: u64,
    pub revealed_segments: usize,
    pub line_number: Option<u32>,
    pub position: Option<[f64; 3]>,
    pub layer_height: Option<f64>,
}

impl CursorReport {
    pub fn new(output: &ParseOutput, config: &Config, offset: u64) -> Self {
        let mut driver = PlaybackDriver::new(&output.store, &output.registry, config);
        driver.advance(offset);
        let location = output.store.locate(offset);
        Self {
            offset,
            revealed_segments: driver.revealed_count(),
            line_number: location.map(|l| l.line_number),
            position: location.map(|l| l.position.to_array()),
            layer_height: output.store.layer_at(offset).map(|l| l.height),
        }
    }
}

/// Voxel grid statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoxelReport {
    pub cells: usize,
    /// Cells holding material at the report offset
    pub present: usize,
    pub subtractive: bool,
}

impl VoxelReport {
    pub fn new(sim: &VoxelSimulator, offset: u64) -> Self {
        Self {
            cells: sim.len(),
            present: sim.present_count(offset),
            subtractive: sim.has_subtractive(),
        }
    }
}

/// Per-tool line in a summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolReport {
    pub name: String,
    pub kind: String,
    pub diameter: f64,
    pub color: String,
}

/// Everything the driver prints about a parsed program
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgramSummary {
    pub slicer: String,
    pub segments: usize,
    pub depositing_segments: usize,
    pub layers: usize,
    pub offsets: Option<(u64, u64)>,
    pub instructions: Option<(u64, u64)>,
    pub bounds: Option<([f64; 3], [f64; 3])>,
    pub feed_range: Option<(f64, f64)>,
    pub max_depositing_height: Option<f64>,
    pub tools: Vec<ToolReport>,
    pub recoverable_problems: usize,
    pub degenerate_arcs: usize,
    pub config_warnings: usize,
    pub cursor: Option<CursorReport>,
    pub voxels: Option<VoxelReport>,
}

impl ProgramSummary {
    pub fn new(output: &ParseOutput) -> Self {
        let store = &output.store;
        Self {
            slicer: output.slicer.to_string(),
            segments: store.len(),
            depositing_segments: store.depositing_count(),
            layers: store.layers().len(),
            offsets: store.min_offset().zip(store.max_offset()),
            instructions: store
                .first_instruction_offset()
                .zip(store.last_instruction_offset()),
            bounds: store
                .bounds()
                .map(|b| (b.min.to_array(), b.max.to_array())),
            feed_range: store.feed_range(),
            max_depositing_height: store.max_depositing_height(),
            tools: output
                .registry
                .tools()
                .iter()
                .map(|t| ToolReport {
                    name: t.name.clone(),
                    kind: t.kind.to_string(),
                    diameter: t.diameter,
                    color: t.color.to_hex(),
                })
                .collect(),
            recoverable_problems: output.diagnostics.recoverable,
            degenerate_arcs: output.diagnostics.degenerate_arcs,
            config_warnings: output.diagnostics.config_warnings,
            cursor: None,
            voxels: None,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn write_point(f: &mut fmt::Formatter<'_>, p: &[f64; 3]) -> fmt::Result {
    write!(f, "({:.3}, {:.3}, {:.3})", p[0], p[1], p[2])
}

impl fmt::Display for ProgramSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Slicer:      {}", self.slicer)?;
        writeln!(
            f,
            "Segments:    {} ({} depositing)",
            self.segments, self.depositing_segments
        )?;
        writeln!(f, "Layers:      {}", self.layers)?;
        if let Some((min, max)) = self.offsets {
            writeln!(f, "Offsets:     {}..={}", min, max)?;
        }
        if let Some((min, max)) = &self.bounds {
            write!(f, "Bounds:      ")?;
            write_point(f, min)?;
            write!(f, " - ")?;
            write_point(f, max)?;
            writeln!(f)?;
        }
        if let Some((min, max)) = self.feed_range {
            writeln!(f, "Feed:        {:.0}..{:.0} mm/min", min, max)?;
        }
        for (index, tool) in self.tools.iter().enumerate() {
            writeln!(
                f,
                "Tool {}:      {} [{}] {:.2}mm {}",
                index, tool.name, tool.kind, tool.diameter, tool.color
            )?;
        }
        if self.recoverable_problems + self.degenerate_arcs + self.config_warnings > 0 {
            writeln!(
                f,
                "Problems:    {} recoverable, {} degenerate arcs, {} config warnings",
                self.recoverable_problems, self.degenerate_arcs, self.config_warnings
            )?;
        }
        if let Some(cursor) = &self.cursor {
            write!(
                f,
                "Cursor {}: {} revealed",
                cursor.offset, cursor.revealed_segments
            )?;
            if let Some(line) = cursor.line_number {
                write!(f, ", line {}", line)?;
            }
            if let Some(position) = &cursor.position {
                write!(f, " at ")?;
                write_point(f, position)?;
            }
            writeln!(f)?;
        }
        if let Some(voxels) = &self.voxels {
            writeln!(
                f,
                "Voxels:      {} cells, {} present{}",
                voxels.cells,
                voxels.present,
                if voxels.subtractive { ", subtractive" } else { "" }
            )?;
        }
        Ok(())
    }
}
