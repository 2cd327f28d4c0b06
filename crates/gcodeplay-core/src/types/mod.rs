//! Shared type aliases and small cross-crate handles

pub mod aliases;

pub use aliases::{CancelToken, ProgressCallback, StepCallback};
