//! Playback over interpreted geometry
//!
//! This module provides:
//! - The ordered segment store and layer index
//! - Batched playback/scrub controllers
//! - Voxel material simulation and per-cell playback

pub mod playback;
pub mod segment_store;
pub mod voxel;

pub use playback::{
    AdvanceKind, PlaybackController, PlaybackDriver, RevealState, SegmentAppearance, SegmentRole,
};
pub use segment_store::{Bounds, CursorLocation, LayerInfo, Segment, SegmentKind, SegmentStore};
pub use voxel::{
    CellPhase, CellState, VoxelCell, VoxelEvent, VoxelInstances, VoxelPlayback, VoxelSimulator,
    ADDITIVE_HIGHLIGHT, SUBTRACTIVE_HIGHLIGHT,
};
