//! Segment store and layer index
//!
//! Holds every segment emitted during a parse session in stream order, plus
//! the aggregates the renderer and playback layers need: offset range,
//! bounds, feed range and the discovered layer boundaries.

use gcodeplay_core::{Color, Position, ToolIndex};
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Motion type a segment came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SegmentKind {
    Rapid,
    Linear,
    ArcCw,
    ArcCcw,
}

/// One immutable drawable line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: Position,
    pub end: Position,
    /// Byte offset just past the originating instruction
    pub stream_offset: u64,
    pub line_number: u32,
    pub tool_index: ToolIndex,
    pub color: Color,
    /// Adds or removes material; false for travel
    pub is_depositing: bool,
    pub is_perimeter: bool,
    /// Bead thickness (mm)
    pub layer_height: f64,
    pub feed_rate: f64,
    pub kind: SegmentKind,
}

impl Segment {
    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }

    pub fn is_travel(&self) -> bool {
        !self.is_depositing
    }
}

/// A discovered layer boundary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerInfo {
    /// Vertical coordinate of the layer (mm)
    pub height: f64,
    /// Stream offset of the move that started the layer
    pub first_offset: u64,
    pub line_number: u32,
    /// Index of the first segment on this layer
    pub first_segment: usize,
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Position,
    pub max: Position,
}

impl Bounds {
    pub fn from_point(p: Position) -> Self {
        Self { min: p, max: p }
    }

    pub fn extend(&mut self, p: Position) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Position {
        (self.min + self.max) / 2.0
    }
}

/// Where the cursor sits in the program
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CursorLocation {
    /// Line number of the last revealed instruction
    pub line_number: u32,
    /// Tool tip at the end of the last revealed segment
    pub position: Position,
    pub segment_index: usize,
}

/// Ordered segment collection with derived aggregates
#[derive(Debug, Clone, Default)]
pub struct SegmentStore {
    segments: Vec<Segment>,
    layers: Vec<LayerInfo>,
    first_instruction: Option<u64>,
    last_instruction: Option<u64>,
    bounds: Option<Bounds>,
    feed_range: Option<(f64, f64)>,
    max_depositing_height: Option<f64>,
}

impl SegmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a segment. Offsets must be non-decreasing.
    pub fn push(&mut self, segment: Segment) {
        debug_assert!(
            self.segments
                .last()
                .is_none_or(|last| last.stream_offset <= segment.stream_offset),
            "segments must arrive in stream order"
        );

        match self.bounds.as_mut() {
            Some(bounds) => {
                bounds.extend(segment.start);
                bounds.extend(segment.end);
            }
            None => {
                let mut bounds = Bounds::from_point(segment.start);
                bounds.extend(segment.end);
                self.bounds = Some(bounds);
            }
        }

        if segment.feed_rate > 0.0 {
            self.feed_range = Some(match self.feed_range {
                Some((lo, hi)) => (lo.min(segment.feed_rate), hi.max(segment.feed_rate)),
                None => (segment.feed_rate, segment.feed_rate),
            });
        }

        if segment.is_depositing {
            let top = segment.start.z.max(segment.end.z);
            self.max_depositing_height = Some(self.max_depositing_height.map_or(top, |h| h.max(top)));
        }

        self.segments.push(segment);
    }

    /// Record a layer starting at the next segment to be pushed.
    pub fn push_layer(&mut self, height: f64, first_offset: u64, line_number: u32) {
        self.layers.push(LayerInfo {
            height,
            first_offset,
            line_number,
            first_segment: self.segments.len(),
        });
    }

    /// Record that an instruction ending at `offset` was read.
    pub fn note_instruction(&mut self, offset: u64) {
        if self.first_instruction.is_none() {
            self.first_instruction = Some(offset);
        }
        self.last_instruction = Some(offset);
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn layers(&self) -> &[LayerInfo] {
        &self.layers
    }

    pub fn min_offset(&self) -> Option<u64> {
        self.segments.first().map(|s| s.stream_offset)
    }

    pub fn max_offset(&self) -> Option<u64> {
        self.segments.last().map(|s| s.stream_offset)
    }

    /// Offset of the first non-comment instruction
    pub fn first_instruction_offset(&self) -> Option<u64> {
        self.first_instruction
    }

    pub fn last_instruction_offset(&self) -> Option<u64> {
        self.last_instruction
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// `(min, max)` programmed feed rate over all segments
    pub fn feed_range(&self) -> Option<(f64, f64)> {
        self.feed_range
    }

    pub fn max_depositing_height(&self) -> Option<f64> {
        self.max_depositing_height
    }

    pub fn depositing_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_depositing).count()
    }

    /// Fixed-size chunks paired with the index of their first segment
    pub fn batches(&self, batch_size: usize) -> impl Iterator<Item = (usize, &[Segment])> {
        let size = batch_size.max(1);
        self.segments
            .chunks(size)
            .enumerate()
            .map(move |(i, chunk)| (i * size, chunk))
    }

    /// Number of segments with `stream_offset <= offset`
    pub fn partition(&self, offset: u64) -> usize {
        self.segments.partition_point(|s| s.stream_offset <= offset)
    }

    /// Line and tool position for a cursor offset
    pub fn locate(&self, offset: u64) -> Option<CursorLocation> {
        let revealed = self.partition(offset);
        let index = revealed.checked_sub(1)?;
        let segment = &self.segments[index];
        Some(CursorLocation {
            line_number: segment.line_number,
            position: segment.end,
            segment_index: index,
        })
    }

    /// Layer containing `offset`
    pub fn layer_at(&self, offset: u64) -> Option<&LayerInfo> {
        let idx = self.layers.partition_point(|l| l.first_offset <= offset);
        idx.checked_sub(1).map(|i| &self.layers[i])
    }
}
