//! Voxel material simulation
//!
//! Rasterizes depositing segments into a sparse grid of cells. Each cell keeps
//! an ordered log of add/remove events keyed by stream offset, so its state at
//! any cursor is the last event at or before that offset.
//!
//! Additive tools add the cells along the bead (plus the cells below it when
//! the bead is taller than one cell). Subtractive tools remove every cell
//! within the tool radius from the cut height up to one cell above the highest
//! deposited layer.

use gcodeplay_core::{Color, InterpretError, Position, StepCallback, ToolRegistry};
use gcodeplay_settings::{PlaybackSettings, VoxelSettings};
use glam::{IVec3, Vec3};
use std::collections::HashMap;
use tracing::{debug, info};

use super::playback::AdvanceKind;
use super::segment_store::{Segment, SegmentStore};

/// Segments between progress reports
const PROGRESS_INTERVAL: usize = 10_000;

/// Highlight for a cell that was just added
pub const ADDITIVE_HIGHLIGHT: Color = Color::new(0.0, 1.0, 0.0, 0.8);
/// Highlight for a cell that was just removed
pub const SUBTRACTIVE_HIGHLIGHT: Color = Color::new(1.0, 0.0, 0.0, 0.8);

/// One change to a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoxelEvent {
    pub stream_offset: u64,
    /// Added when true, removed when false
    pub add: bool,
}

/// Material state of a cell at a given offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    Absent,
    Present,
}

/// A grid cell and its event log
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelCell {
    pub key: IVec3,
    /// Color of the segment that first touched the cell
    pub color: Color,
    /// Ordered by stream offset
    pub events: Vec<VoxelEvent>,
}

impl VoxelCell {
    /// Last event with `stream_offset <= offset`
    pub fn last_event_at(&self, offset: u64) -> Option<&VoxelEvent> {
        let idx = self.events.partition_point(|e| e.stream_offset <= offset);
        idx.checked_sub(1).map(|i| &self.events[i])
    }

    pub fn state_at(&self, offset: u64) -> CellState {
        match self.last_event_at(offset) {
            Some(event) if event.add => CellState::Present,
            _ => CellState::Absent,
        }
    }

    fn record(&mut self, event: VoxelEvent) {
        if self.events.last() != Some(&event) {
            self.events.push(event);
        }
    }
}

/// Instance buffers for the renderer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoxelInstances {
    /// Cell centers, in cell order
    pub translations: Vec<Vec3>,
    /// Base colors, in cell order
    pub colors: Vec<[f32; 4]>,
}

/// Sparse voxel grid built from a segment store
#[derive(Debug, Clone)]
pub struct VoxelSimulator {
    cell_width: f64,
    cell_height: f64,
    index: HashMap<IVec3, usize>,
    cells: Vec<VoxelCell>,
    has_subtractive: bool,
    max_layer: i32,
    translations: Option<Vec<Vec3>>,
}

impl VoxelSimulator {
    fn empty(settings: &VoxelSettings) -> Result<Self, InterpretError> {
        if !(settings.cell_width > 0.0 && settings.cell_height > 0.0) {
            return Err(InterpretError::ConfigurationInvalid {
                reason: format!(
                    "voxel cell size must be positive, got {}x{}",
                    settings.cell_width, settings.cell_height
                ),
            });
        }
        Ok(Self {
            cell_width: settings.cell_width,
            cell_height: settings.cell_height,
            index: HashMap::new(),
            cells: Vec::new(),
            has_subtractive: false,
            max_layer: 0,
            translations: None,
        })
    }

    pub fn build(
        store: &SegmentStore,
        registry: &ToolRegistry,
        settings: &VoxelSettings,
    ) -> Result<Self, InterpretError> {
        Self::build_with_progress(store, registry, settings, &mut |_| true)
    }

    /// Build the grid, reporting progress. The callback returns `false` to cancel.
    pub fn build_with_progress(
        store: &SegmentStore,
        registry: &ToolRegistry,
        settings: &VoxelSettings,
        progress: StepCallback<'_>,
    ) -> Result<Self, InterpretError> {
        let mut sim = Self::empty(settings)?;
        let total = store.len().max(1);

        for (idx, segment) in store.segments().iter().enumerate() {
            if idx % PROGRESS_INTERVAL == 0 && !progress(idx as f32 / total as f32) {
                info!(processed = idx, "Voxel build cancelled");
                return Err(InterpretError::Cancelled);
            }
            if !segment.is_depositing {
                continue;
            }
            let tool = registry.get(segment.tool_index);
            if tool.is_additive() {
                sim.add_segment(segment);
            } else {
                sim.cut_segment(segment, tool.radius());
            }
        }
        if !progress(1.0) {
            return Err(InterpretError::Cancelled);
        }

        sim.translations = Some(sim.cells.iter().map(|c| sim.cell_center(c.key)).collect());
        debug!(
            cells = sim.cells.len(),
            subtractive = sim.has_subtractive,
            "Voxel grid built"
        );
        Ok(sim)
    }

    /// Grid key for a rendering-space point
    pub fn key_for(&self, point: Position) -> IVec3 {
        IVec3::new(
            (point.x / self.cell_width).floor() as i32,
            (point.y / self.cell_width).floor() as i32,
            ((point.z / self.cell_height).floor() as i32).max(0),
        )
    }

    pub fn cell_center(&self, key: IVec3) -> Vec3 {
        Vec3::new(
            ((key.x as f64 + 0.5) * self.cell_width) as f32,
            ((key.y as f64 + 0.5) * self.cell_width) as f32,
            ((key.z as f64 + 0.5) * self.cell_height) as f32,
        )
    }

    /// Points along the segment, at most half a cell apart
    fn samples(&self, segment: &Segment, z_shift: f64) -> Vec<Position> {
        let shift = Position::new(0.0, 0.0, z_shift);
        let steps = (segment.length() / (self.cell_width / 2.0)).ceil().max(1.0) as usize;
        (0..=steps)
            .map(|k| segment.start.lerp(segment.end, k as f64 / steps as f64) + shift)
            .collect()
    }

    fn touch(&mut self, key: IVec3, color: Color, event: VoxelEvent) {
        match self.index.get(&key) {
            Some(&idx) => self.cells[idx].record(event),
            None => {
                self.index.insert(key, self.cells.len());
                self.cells.push(VoxelCell {
                    key,
                    color,
                    events: vec![event],
                });
            }
        }
    }

    fn add_segment(&mut self, segment: &Segment) {
        let event = VoxelEvent {
            stream_offset: segment.stream_offset,
            add: true,
        };
        let depth = if segment.layer_height > self.cell_height {
            (segment.layer_height / self.cell_height).ceil() as i32
        } else {
            1
        };

        for point in self.samples(segment, -self.cell_height / 2.0) {
            let key = self.key_for(point);
            self.max_layer = self.max_layer.max(key.z);
            for below in 0..depth {
                let z = key.z - below;
                if z < 0 {
                    break;
                }
                self.touch(IVec3::new(key.x, key.y, z), segment.color, event);
            }
        }
    }

    fn cut_segment(&mut self, segment: &Segment, radius: f64) {
        self.has_subtractive = true;
        let event = VoxelEvent {
            stream_offset: segment.stream_offset,
            add: false,
        };
        let reach = (radius / self.cell_width).ceil() as i32;
        let top = self.max_layer + 1;

        for point in self.samples(segment, 0.0) {
            let center = self.key_for(point);
            for dx in -reach..=reach {
                for dy in -reach..=reach {
                    let key = IVec3::new(center.x + dx, center.y + dy, center.z);
                    let cell = self.cell_center(key);
                    let ddx = cell.x as f64 - point.x;
                    let ddy = cell.y as f64 - point.y;
                    if (dx != 0 || dy != 0) && ddx * ddx + ddy * ddy > radius * radius {
                        continue;
                    }
                    for z in center.z..=top {
                        self.touch(IVec3::new(key.x, key.y, z), segment.color, event);
                    }
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[VoxelCell] {
        &self.cells
    }

    pub fn cell(&self, key: IVec3) -> Option<&VoxelCell> {
        self.index.get(&key).map(|&idx| &self.cells[idx])
    }

    pub fn has_subtractive(&self) -> bool {
        self.has_subtractive
    }

    /// Highest cell layer reached by an additive tool
    pub fn max_layer(&self) -> i32 {
        self.max_layer
    }

    /// State of the cell at `key` as of `offset`. Untouched cells are absent.
    pub fn state_at(&self, key: IVec3, offset: u64) -> CellState {
        self.cell(key)
            .map(|c| c.state_at(offset))
            .unwrap_or(CellState::Absent)
    }

    pub fn events(&self, key: IVec3) -> &[VoxelEvent] {
        self.cell(key).map(|c| c.events.as_slice()).unwrap_or(&[])
    }

    /// Number of cells present at `offset`
    pub fn present_count(&self, offset: u64) -> usize {
        self.cells
            .iter()
            .filter(|c| c.state_at(offset) == CellState::Present)
            .count()
    }

    /// True while per-cell transforms are still held
    pub fn retains_transforms(&self) -> bool {
        self.translations.is_some()
    }

    /// Produce instance buffers for the renderer.
    ///
    /// Cells never move when no subtractive tool was used, so their
    /// transforms are released after this call.
    pub fn instances(&mut self) -> VoxelInstances {
        let retained = if self.has_subtractive {
            self.translations.clone()
        } else {
            self.translations.take()
        };
        let translations = retained
            .unwrap_or_else(|| self.cells.iter().map(|c| self.cell_center(c.key)).collect());

        VoxelInstances {
            translations,
            colors: self.cells.iter().map(|c| c.color.with_alpha(1.0).to_array()).collect(),
        }
    }
}

/// How a cell should be drawn at the current cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellPhase {
    Absent,
    /// Just added, still highlighted
    Adding,
    Present,
    /// Just removed, still highlighted
    Removing,
}

/// Per-cell playback mirroring the segment scrub rule
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelPlayback {
    counters: Vec<u8>,
    last_offset: Option<u64>,
    force_redraw: bool,
    scrub_distance: u64,
    highlight_ticks: u8,
}

impl VoxelPlayback {
    pub fn new(sim: &VoxelSimulator, playback: &PlaybackSettings, voxel: &VoxelSettings) -> Self {
        Self {
            counters: vec![voxel.highlight_ticks; sim.len()],
            last_offset: None,
            force_redraw: false,
            scrub_distance: playback.scrub_distance,
            highlight_ticks: voxel.highlight_ticks,
        }
    }

    pub fn force_redraw(&mut self) {
        self.force_redraw = true;
    }

    pub fn last_offset(&self) -> Option<u64> {
        self.last_offset
    }

    pub fn advance(&mut self, sim: &VoxelSimulator, offset: u64) -> AdvanceKind {
        let last = match self.last_offset {
            Some(last) if !self.force_redraw && last.abs_diff(offset) <= self.scrub_distance => last,
            _ => {
                self.counters.fill(self.highlight_ticks);
                self.last_offset = Some(offset);
                self.force_redraw = false;
                return AdvanceKind::FullPass;
            }
        };

        if offset > last {
            for (counter, cell) in self.counters.iter_mut().zip(sim.cells()) {
                if cell
                    .last_event_at(offset)
                    .is_some_and(|e| e.stream_offset > last)
                {
                    *counter = 0;
                }
            }
        }
        self.last_offset = Some(offset);
        AdvanceKind::Incremental
    }

    /// Step cell highlights. Returns the number still highlighted.
    pub fn tick(&mut self) -> usize {
        let ticks = self.highlight_ticks;
        let mut active = 0;
        for counter in self.counters.iter_mut().filter(|c| **c < ticks) {
            *counter += 1;
            if *counter < ticks {
                active += 1;
            }
        }
        active
    }

    pub fn phase(&self, sim: &VoxelSimulator, index: usize) -> CellPhase {
        let (Some(cell), Some(offset)) = (sim.cells().get(index), self.last_offset) else {
            return CellPhase::Absent;
        };
        let fresh = self
            .counters
            .get(index)
            .is_some_and(|&c| c < self.highlight_ticks);
        match cell.last_event_at(offset) {
            None => CellPhase::Absent,
            Some(e) if e.add && fresh => CellPhase::Adding,
            Some(e) if e.add => CellPhase::Present,
            Some(_) if fresh => CellPhase::Removing,
            Some(_) => CellPhase::Absent,
        }
    }

    /// Instance color for cell `index`; transparent when absent
    pub fn color(&self, sim: &VoxelSimulator, index: usize) -> Color {
        match self.phase(sim, index) {
            CellPhase::Absent => Color::TRANSPARENT,
            CellPhase::Adding => ADDITIVE_HIGHLIGHT,
            CellPhase::Removing => SUBTRACTIVE_HIGHLIGHT,
            CellPhase::Present => sim.cells()[index].color.with_alpha(1.0),
        }
    }
}
