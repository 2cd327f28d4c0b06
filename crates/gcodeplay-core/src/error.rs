//! Error handling for GCodePlay
//!
//! Provides the error taxonomy shared by the interpreter, the arc
//! interpolator, and the playback simulators:
//! - Geometry errors (degenerate arcs)
//! - Interpretation errors (recoverable parse problems, invalid configuration,
//!   cancellation)
//!
//! Nothing in normal operation is fatal to a parse session. Most of these
//! variants are logged and counted rather than propagated; only
//! [`InterpretError::Cancelled`] and [`InterpretError::EmptyInput`] abort a
//! session.

use thiserror::Error;

/// Geometry error type
///
/// Raised by the arc-center math when a circular move cannot be expanded.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Start and target coincide in a radius-format arc
    #[error("Arc chord has zero length")]
    ZeroChord,

    /// Center-format arc with I/J/K offsets all zero
    #[error("Arc center offset is zero")]
    ZeroCenterOffset,

    /// Radius is smaller than half the chord
    #[error("Arc radius {radius:.4} is smaller than the minimum {minimum:.4}")]
    RadiusTooSmall {
        /// The requested radius.
        radius: f64,
        /// The smallest radius that can span the chord.
        minimum: f64,
    },

    /// Requested interpolation segment length is not positive
    #[error("Segment length must be positive, got {0}")]
    ZeroSegmentLength(f64),
}

/// Interpretation error type
///
/// Mirrors the failure classes of the motion state machine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpretError {
    /// Malformed numeric token or unknown command; defaulted and ignored
    #[error("Recoverable parse problem at line {line_number}: {reason}")]
    ParseRecoverable {
        /// The line number of the offending instruction.
        line_number: u32,
        /// What was wrong with it.
        reason: String,
    },

    /// A single move could not be expanded; position was updated without geometry
    #[error("Degenerate geometry at line {line_number}: {source}")]
    GeometryDegenerate {
        /// The line number of the offending instruction.
        line_number: u32,
        /// The underlying geometry failure.
        #[source]
        source: GeometryError,
    },

    /// Out-of-range tool index, missing workplace, etc. Clamped or wrapped.
    #[error("Invalid configuration: {reason}")]
    ConfigurationInvalid {
        /// What was clamped or wrapped.
        reason: String,
    },

    /// Cooperative cancellation was observed
    #[error("Operation cancelled")]
    Cancelled,

    /// Session started with no instruction data
    #[error("No instruction data to interpret")]
    EmptyInput,
}

impl InterpretError {
    /// Whether this error ends the whole session rather than a single instruction.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::EmptyInput)
    }
}

/// Main error type for GCodePlay
#[derive(Error, Debug)]
pub enum Error {
    /// Geometry error
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// Interpretation error
    #[error(transparent)]
    Interpret(#[from] InterpretError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a new generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Check if this error represents a cancelled operation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Interpret(InterpretError::Cancelled))
    }
}

/// Result type for GCodePlay operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_error_display() {
        let err = GeometryError::RadiusTooSmall {
            radius: 1.0,
            minimum: 5.0,
        };
        assert_eq!(
            err.to_string(),
            "Arc radius 1.0000 is smaller than the minimum 5.0000"
        );
        assert_eq!(GeometryError::ZeroChord.to_string(), "Arc chord has zero length");
    }

    #[test]
    fn test_interpret_error_display() {
        let err = InterpretError::GeometryDegenerate {
            line_number: 12,
            source: GeometryError::ZeroCenterOffset,
        };
        assert_eq!(
            err.to_string(),
            "Degenerate geometry at line 12: Arc center offset is zero"
        );
    }

    #[test]
    fn test_session_fatal() {
        assert!(InterpretError::Cancelled.is_session_fatal());
        assert!(InterpretError::EmptyInput.is_session_fatal());
        assert!(!InterpretError::ConfigurationInvalid {
            reason: "tool 12".into()
        }
        .is_session_fatal());
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = InterpretError::Cancelled.into();
        assert!(err.is_cancelled());

        let err: Error = GeometryError::ZeroChord.into();
        assert!(matches!(err, Error::Geometry(_)));
        assert!(!err.is_cancelled());
    }
}
