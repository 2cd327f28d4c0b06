//! Geometry primitives: positions, working planes, and arc-center math
//!
//! Positions are machine-space millimetres with Z as the vertical axis.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::ARC_RADIUS_TOLERANCE;
use crate::error::GeometryError;

/// 3D point in machine space (mm)
pub type Position = DVec3;

/// Arc working plane (G17/G18/G19)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Plane {
    /// G17
    #[default]
    XY,
    /// G18
    XZ,
    /// G19
    YZ,
}

impl Plane {
    /// Axis indices `(first, second, helical)` for this plane.
    ///
    /// G18 uses Z as its first axis so that positive rotation keeps the
    /// right-hand rule when viewed from the positive helical axis.
    pub const fn axes(&self) -> (usize, usize, usize) {
        match self {
            Plane::XY => (0, 1, 2),
            Plane::XZ => (2, 0, 1),
            Plane::YZ => (1, 2, 0),
        }
    }

    /// Split a position into `(u, v, w)` plane coordinates.
    pub fn project(&self, p: Position) -> (f64, f64, f64) {
        let (u, v, w) = self.axes();
        (p[u], p[v], p[w])
    }

    /// Inverse of [`Plane::project`].
    pub fn unproject(&self, u: f64, v: f64, w: f64) -> Position {
        let (ui, vi, wi) = self.axes();
        let mut p = DVec3::ZERO;
        p[ui] = u;
        p[vi] = v;
        p[wi] = w;
        p
    }

    /// Center-offset letters for the in-plane axes.
    pub const fn offset_letters(&self) -> (char, char) {
        match self {
            Plane::XY => ('I', 'J'),
            Plane::XZ => ('K', 'I'),
            Plane::YZ => ('J', 'K'),
        }
    }
}

impl fmt::Display for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plane::XY => write!(f, "XY plane (G17)"),
            Plane::XZ => write!(f, "XZ plane (G18)"),
            Plane::YZ => write!(f, "YZ plane (G19)"),
        }
    }
}

/// Resolve the in-plane center offset for a radius-format arc.
///
/// `(du, dv)` is the chord from start to target. Returns the center as an
/// offset from the start point. A positive radius selects the shorter arc, a
/// negative one the longer arc. When the radius cannot span the chord by more
/// than [`ARC_RADIUS_TOLERANCE`] the call fails unless `fixup` is set, in
/// which case the minimum feasible radius is used.
pub fn center_from_radius(
    du: f64,
    dv: f64,
    radius: f64,
    clockwise: bool,
    fixup: bool,
) -> Result<(f64, f64), GeometryError> {
    let d_squared = du * du + dv * dv;
    if d_squared <= f64::EPSILON {
        return Err(GeometryError::ZeroChord);
    }

    let minimum = d_squared.sqrt() / 2.0;
    let mut h_squared = radius * radius - d_squared / 4.0;
    if h_squared < 0.0 {
        let within_tolerance = radius.abs() >= minimum * (1.0 - ARC_RADIUS_TOLERANCE);
        if !(within_tolerance || fixup) {
            return Err(GeometryError::RadiusTooSmall {
                radius: radius.abs(),
                minimum,
            });
        }
        h_squared = 0.0;
    }

    let mut h_div_d = (h_squared / d_squared).sqrt();
    if (clockwise && radius < 0.0) || (!clockwise && radius > 0.0) {
        h_div_d = -h_div_d;
    }

    Ok((du / 2.0 + dv * h_div_d, dv / 2.0 - du * h_div_d))
}

/// Signed sweep from `start_angle` to `end_angle` in the requested direction.
///
/// The magnitude is in `(0, 2π]`; a coincident start and end sweep a full turn
/// only when `full_circle` is set, otherwise zero.
pub fn arc_sweep(start_angle: f64, end_angle: f64, clockwise: bool, full_circle: bool) -> f64 {
    use std::f64::consts::TAU;

    if full_circle {
        return if clockwise { -TAU } else { TAU };
    }
    let mut total = if clockwise {
        start_angle - end_angle
    } else {
        end_angle - start_angle
    };
    if total < 0.0 {
        total += TAU;
    }
    if clockwise {
        -total
    } else {
        total
    }
}

/// Linear interpolation between two positions.
pub fn lerp(a: Position, b: Position, t: f64) -> Position {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_project_round_trip() {
        let p = DVec3::new(1.0, 2.0, 3.0);
        for plane in [Plane::XY, Plane::XZ, Plane::YZ] {
            let (u, v, w) = plane.project(p);
            assert_eq!(plane.unproject(u, v, w), p);
        }
        assert_eq!(Plane::XZ.project(p), (3.0, 1.0, 2.0));
    }

    #[test]
    fn test_center_from_radius_half_circle() {
        let (i, j) = center_from_radius(10.0, 0.0, 5.0, true, false).unwrap();
        assert!((i - 5.0).abs() < 1e-12);
        assert!(j.abs() < 1e-12);
    }

    #[test]
    fn test_center_from_radius_picks_short_arc() {
        // Clockwise from (0,0) to (10,0) with r=10: the short arc bows upward,
        // so the center sits below the chord.
        let (i, j) = center_from_radius(10.0, 0.0, 10.0, true, false).unwrap();
        assert!((i - 5.0).abs() < 1e-9);
        assert!((j + 75f64.sqrt()).abs() < 1e-9);

        // A negative radius selects the other center.
        let (_, j) = center_from_radius(10.0, 0.0, -10.0, true, false).unwrap();
        assert!((j - 75f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_center_from_radius_too_small() {
        let err = center_from_radius(10.0, 0.0, 2.0, false, false).unwrap_err();
        assert!(matches!(err, GeometryError::RadiusTooSmall { .. }));

        let (i, j) = center_from_radius(10.0, 0.0, 2.0, false, true).unwrap();
        assert!((i - 5.0).abs() < 1e-12);
        assert!(j.abs() < 1e-12);
    }

    #[test]
    fn test_center_from_radius_within_tolerance() {
        assert!(center_from_radius(10.0, 0.0, 4.999_9, false, false).is_ok());
    }

    #[test]
    fn test_zero_chord() {
        assert_eq!(
            center_from_radius(0.0, 0.0, 5.0, true, false),
            Err(GeometryError::ZeroChord)
        );
    }

    #[test]
    fn test_arc_sweep_directions() {
        use std::f64::consts::{FRAC_PI_2, PI, TAU};
        assert!((arc_sweep(0.0, FRAC_PI_2, false, false) - FRAC_PI_2).abs() < 1e-12);
        assert!((arc_sweep(0.0, FRAC_PI_2, true, false) + 3.0 * FRAC_PI_2).abs() < 1e-12);
        assert!((arc_sweep(PI, 0.0, true, false) + PI).abs() < 1e-12);
        assert_eq!(arc_sweep(1.0, 1.0, false, true), TAU);
    }
}
