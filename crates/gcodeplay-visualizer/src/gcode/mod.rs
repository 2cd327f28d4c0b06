//! G-Code interpretation
//!
//! This module provides:
//! - Word tokenizing and comment stripping
//! - Arc expansion on any working plane
//! - Slicer annotation recognition
//! - The motion state machine
//! - Resumable, chunked parse sessions

pub mod arc;
pub mod features;
pub mod interpreter;
pub mod parser;
pub mod session;

pub use arc::{ArcCenter, ArcInterpolator, ArcMove};
pub use features::{
    Annotation, FeatureClassifier, FeatureEntry, MachineMetadata, SlicerStyle,
    UNKNOWN_FEATURE_COLOR,
};
pub use interpreter::{
    BeltGeometry, MachineState, MotionMode, MotionStateMachine, ParseDiagnostics, WorkplaceIndex,
};
pub use parser::{ParsedLine, Word};
pub use session::{parse_str, ParseOutput, ParseSession, StepBudget, StepStatus};
