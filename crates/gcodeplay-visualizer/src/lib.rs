//! # GCodePlay Visualizer
//!
//! Turns G-code text into an ordered timeline of segments and plays it back.
//! Includes the interpreter, parse sessions, the segment store, scrub
//! controllers, and the voxel material simulator.

pub mod gcode;
pub mod visualizer;

pub use gcode::{
    parse_str, Annotation, ArcCenter, ArcInterpolator, ArcMove, BeltGeometry, FeatureClassifier,
    MachineMetadata, MachineState, MotionMode, MotionStateMachine, ParseDiagnostics, ParseOutput,
    ParseSession, SlicerStyle, StepBudget, StepStatus, WorkplaceIndex,
};

pub use visualizer::{
    AdvanceKind, Bounds, CellPhase, CellState, CursorLocation, LayerInfo, PlaybackController,
    PlaybackDriver, RevealState, Segment, SegmentAppearance, SegmentKind, SegmentRole,
    SegmentStore, VoxelCell, VoxelEvent, VoxelInstances, VoxelPlayback, VoxelSimulator,
};
