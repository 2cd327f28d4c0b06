//! Integration tests for the tool registry and arc-center math.

use gcodeplay_core::{center_from_radius, Color, Plane, Tool, ToolKind, ToolRegistry};
use glam::DVec3;
use proptest::prelude::*;

#[test]
fn test_mixed_registry_lookups() {
    let tools = vec![
        Tool::new("Extruder", Color::from_hex("#FFAA00").unwrap(), 0.6, ToolKind::Additive),
        Tool::new("Flat end mill", Color::from_hex("#808080").unwrap(), 3.175, ToolKind::Subtractive),
    ];
    let registry = ToolRegistry::new(tools, 0.1);

    assert!(registry.is_additive(0));
    assert!(!registry.is_additive(1));
    assert!(registry.has_subtractive());
    assert_eq!(registry.diameter(1), 3.175);
    assert_eq!(registry.resolve(5).index, 1);
    assert_eq!(registry.resolve(-3).index, 0);
}

#[test]
fn test_plane_unproject_places_helical_axis() {
    let p = Plane::YZ.unproject(1.0, 2.0, 3.0);
    assert_eq!(p, DVec3::new(3.0, 1.0, 2.0));
}

proptest! {
    #[test]
    fn prop_radius_center_is_equidistant(
        du in -50.0f64..50.0,
        dv in -50.0f64..50.0,
        extra in 0.0f64..20.0,
        clockwise in any::<bool>(),
        negative in any::<bool>(),
    ) {
        let chord = (du * du + dv * dv).sqrt();
        prop_assume!(chord > 1e-3);
        let r = chord / 2.0 + extra + 1e-3;
        let radius = if negative { -r } else { r };

        let (i, j) = center_from_radius(du, dv, radius, clockwise, false).unwrap();
        let to_start = (i * i + j * j).sqrt();
        let to_end = ((i - du).powi(2) + (j - dv).powi(2)).sqrt();
        prop_assert!((to_start - r).abs() < 1e-6 * r.max(1.0));
        prop_assert!((to_end - r).abs() < 1e-6 * r.max(1.0));
    }
}
