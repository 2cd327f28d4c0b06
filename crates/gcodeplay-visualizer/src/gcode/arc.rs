//! Arc interpolation
//!
//! Expands a circular or helical move into short straight segments on any of
//! the three principal planes. The in-plane axes and the helical axis come
//! from [`Plane::axes`], so one code path serves G17, G18 and G19.

use gcodeplay_core::{arc_sweep, center_from_radius, GeometryError, Plane, Position};

/// How the arc center is given
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArcCenter {
    /// In-plane offset from the start point (`I`/`J`, `K`/`I` or `J`/`K`)
    Offset { u: f64, v: f64 },
    /// Signed radius (`R`); negative selects the longer arc
    Radius(f64),
}

/// A single circular move
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcMove {
    pub start: Position,
    pub target: Position,
    pub plane: Plane,
    pub center: ArcCenter,
    pub clockwise: bool,
}

/// Interpolation settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcInterpolator {
    segment_length: f64,
    radius_fixup: bool,
}

const FULL_CIRCLE_EPSILON: f64 = 1e-9;

impl ArcInterpolator {
    pub fn new(segment_length: f64, radius_fixup: bool) -> Result<Self, GeometryError> {
        if segment_length.is_nan() || segment_length <= 0.0 {
            return Err(GeometryError::ZeroSegmentLength(segment_length));
        }
        Ok(Self {
            segment_length,
            radius_fixup,
        })
    }

    pub fn segment_length(&self) -> f64 {
        self.segment_length
    }

    /// Expand `arc` into points.
    ///
    /// The returned points exclude the start and end exactly on the target,
    /// so `points.len()` equals the segment count
    /// `max(1, ceil(arc_length / segment_length))`.
    pub fn interpolate(&self, arc: &ArcMove) -> Result<Vec<Position>, GeometryError> {
        let (su, sv, sw) = arc.plane.project(arc.start);
        let (tu, tv, tw) = arc.plane.project(arc.target);

        let (i, j, full_circle) = match arc.center {
            ArcCenter::Offset { u, v } => {
                if u == 0.0 && v == 0.0 {
                    return Err(GeometryError::ZeroCenterOffset);
                }
                let coincident =
                    (tu - su).abs() < FULL_CIRCLE_EPSILON && (tv - sv).abs() < FULL_CIRCLE_EPSILON;
                (u, v, coincident)
            }
            ArcCenter::Radius(r) => {
                let (i, j) = center_from_radius(tu - su, tv - sv, r, arc.clockwise, self.radius_fixup)?;
                (i, j, false)
            }
        };

        let cu = su + i;
        let cv = sv + j;
        let radius = (i * i + j * j).sqrt();
        let start_angle = (-j).atan2(-i);
        let end_angle = (tv - cv).atan2(tu - cu);
        let sweep = arc_sweep(start_angle, end_angle, arc.clockwise, full_circle);

        let helical = tw - sw;
        let planar_length = radius * sweep.abs();
        let arc_length = (planar_length * planar_length + helical * helical).sqrt();
        let segments = ((arc_length / self.segment_length).ceil() as usize).max(1);

        let mut points = Vec::with_capacity(segments);
        for step in 1..segments {
            let t = step as f64 / segments as f64;
            let angle = start_angle + sweep * t;
            points.push(arc.plane.unproject(
                cu + radius * angle.cos(),
                cv + radius * angle.sin(),
                sw + helical * t,
            ));
        }
        points.push(arc.target);

        tracing::trace!(
            plane = %arc.plane,
            radius,
            sweep,
            segments,
            "Interpolated arc"
        );
        Ok(points)
    }
}

impl Default for ArcInterpolator {
    fn default() -> Self {
        Self {
            segment_length: gcodeplay_core::constants::DEFAULT_ARC_SEGMENT_LENGTH,
            radius_fixup: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use std::f64::consts::PI;

    fn arc(start: DVec3, target: DVec3, center: ArcCenter, clockwise: bool) -> ArcMove {
        ArcMove {
            start,
            target,
            plane: Plane::XY,
            center,
            clockwise,
        }
    }

    #[test]
    fn test_half_circle_clockwise() {
        let interp = ArcInterpolator::new(1.0, false).unwrap();
        let points = interp
            .interpolate(&arc(
                DVec3::ZERO,
                DVec3::new(10.0, 0.0, 0.0),
                ArcCenter::Offset { u: 5.0, v: 0.0 },
                true,
            ))
            .unwrap();

        assert_eq!(points.len(), (PI * 5.0).ceil() as usize);
        assert_eq!(points.last(), Some(&DVec3::new(10.0, 0.0, 0.0)));
        // Clockwise from (0,0) around (5,0) passes over the top.
        let mid = points[points.len() / 2 - 1];
        assert!(mid.y > 4.0);
        for p in &points {
            let r = ((p.x - 5.0).powi(2) + p.y.powi(2)).sqrt();
            assert!((r - 5.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_counter_clockwise_goes_below() {
        let interp = ArcInterpolator::new(1.0, false).unwrap();
        let points = interp
            .interpolate(&arc(
                DVec3::ZERO,
                DVec3::new(10.0, 0.0, 0.0),
                ArcCenter::Offset { u: 5.0, v: 0.0 },
                false,
            ))
            .unwrap();
        assert!(points[points.len() / 2 - 1].y < -4.0);
    }

    #[test]
    fn test_full_circle() {
        let interp = ArcInterpolator::new(1.0, false).unwrap();
        let points = interp
            .interpolate(&arc(
                DVec3::ZERO,
                DVec3::ZERO,
                ArcCenter::Offset { u: 5.0, v: 0.0 },
                false,
            ))
            .unwrap();
        assert_eq!(points.len(), (2.0 * PI * 5.0).ceil() as usize);
        assert_eq!(points.last(), Some(&DVec3::ZERO));
    }

    #[test]
    fn test_helical_advances_linearly() {
        let interp = ArcInterpolator::new(0.5, false).unwrap();
        let points = interp
            .interpolate(&arc(
                DVec3::ZERO,
                DVec3::new(0.0, 0.0, 2.0),
                ArcCenter::Offset { u: 1.0, v: 0.0 },
                false,
            ))
            .unwrap();
        let n = points.len() as f64;
        for (k, p) in points.iter().enumerate() {
            assert!((p.z - 2.0 * (k as f64 + 1.0) / n).abs() < 1e-9);
        }
    }

    #[test]
    fn test_xz_plane_keeps_y() {
        let interp = ArcInterpolator::new(1.0, false).unwrap();
        let points = interp
            .interpolate(&ArcMove {
                start: DVec3::new(0.0, 3.0, 0.0),
                target: DVec3::new(10.0, 3.0, 0.0),
                plane: Plane::XZ,
                // G18 offsets are (K, I): center at x = 5
                center: ArcCenter::Offset { u: 0.0, v: 5.0 },
                clockwise: true,
            })
            .unwrap();
        for p in &points {
            assert!((p.y - 3.0).abs() < 1e-12);
            let r = ((p.x - 5.0).powi(2) + p.z.powi(2)).sqrt();
            assert!((r - 5.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_radius_format() {
        let interp = ArcInterpolator::new(1.0, false).unwrap();
        let points = interp
            .interpolate(&arc(
                DVec3::ZERO,
                DVec3::new(10.0, 0.0, 0.0),
                ArcCenter::Radius(5.0),
                true,
            ))
            .unwrap();
        assert_eq!(points.len(), 16);
    }

    #[test]
    fn test_degenerate_arcs_fail_closed() {
        let interp = ArcInterpolator::new(1.0, false).unwrap();
        let zero_offset = arc(
            DVec3::ZERO,
            DVec3::new(1.0, 0.0, 0.0),
            ArcCenter::Offset { u: 0.0, v: 0.0 },
            true,
        );
        assert_eq!(
            interp.interpolate(&zero_offset),
            Err(GeometryError::ZeroCenterOffset)
        );

        let small = arc(
            DVec3::ZERO,
            DVec3::new(10.0, 0.0, 0.0),
            ArcCenter::Radius(1.0),
            true,
        );
        assert!(matches!(
            interp.interpolate(&small),
            Err(GeometryError::RadiusTooSmall { .. })
        ));

        let fixed = ArcInterpolator::new(1.0, true).unwrap();
        let points = fixed.interpolate(&small).unwrap();
        assert_eq!(points.last(), Some(&DVec3::new(10.0, 0.0, 0.0)));
    }

    #[test]
    fn test_segment_length_must_be_positive() {
        assert_eq!(
            ArcInterpolator::new(0.0, false),
            Err(GeometryError::ZeroSegmentLength(0.0))
        );
    }
}
