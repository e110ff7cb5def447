//! Angle and range helpers for the scan beam

use std::f32::consts::TAU;

use glam::Vec2;

/// Map any angle into [0, 2π).
pub fn normalize_angle(angle: f32) -> f32 {
    let a = angle.rem_euclid(TAU);
    // rem_euclid rounds tiny negative inputs up to exactly TAU
    if a >= TAU {
        0.0
    } else {
        a
    }
}

/// True if `target` lies on the counter-clockwise arc from `start` to `end`.
///
/// Handles arcs that cross 0/2π (`start > end` after normalization).
pub fn is_angle_between(target: f32, start: f32, end: f32) -> bool {
    let target = normalize_angle(target);
    let start = normalize_angle(start);
    let end = normalize_angle(end);

    if start <= end {
        target >= start && target <= end
    } else {
        target >= start || target <= end
    }
}

/// Outside the dead zone (strict) and within range (inclusive)
pub fn is_in_range_ring(distance: f32, range: f32, dead_zone: f32) -> bool {
    distance > dead_zone && distance <= range
}

/// Bearing of a point seen from the origin, in [0, 2π)
pub fn bearing(position: Vec2) -> f32 {
    normalize_angle(position.y.atan2(position.x))
}

/// True if `position` falls inside the beam centered on `scan_angle` with full width `beam_width`
pub fn is_in_beam(position: Vec2, scan_angle: f32, beam_width: f32) -> bool {
    // Both arc ends normalize to the same angle once the beam covers the circle
    if beam_width >= TAU - 0.001 {
        return true;
    }
    let half = beam_width / 2.0;
    is_angle_between(
        bearing(position),
        normalize_angle(scan_angle - half),
        normalize_angle(scan_angle + half),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn normalize_stays_in_half_open_range() {
        let samples = [
            0.0, TAU, -TAU, 3.0 * TAU, -0.0, -1e-9, -1e-3, 1.0, -1.0, 7.5, -100.25, 1e6,
        ];
        for &x in &samples {
            let a = normalize_angle(x);
            assert!((0.0..TAU).contains(&a), "normalize_angle({x}) = {a}");
        }
        assert_eq!(normalize_angle(0.0), 0.0);
        assert_eq!(normalize_angle(TAU), 0.0);
        assert!((normalize_angle(-PI / 2.0) - 1.5 * PI).abs() < 1e-5);
    }

    #[test]
    fn range_ring_excludes_dead_zone_and_includes_range() {
        assert!(!is_in_range_ring(20.0, 350.0, 20.0));
        assert!(is_in_range_ring(20.001, 350.0, 20.0));
        assert!(is_in_range_ring(350.0, 350.0, 20.0));
        assert!(!is_in_range_ring(350.0 + 1e-3, 350.0, 20.0));
    }

    #[test]
    fn arc_without_wraparound() {
        assert!(is_angle_between(1.0, 0.5, 1.5));
        assert!(is_angle_between(0.5, 0.5, 1.5));
        assert!(!is_angle_between(2.0, 0.5, 1.5));
    }

    #[test]
    fn arc_crossing_zero() {
        assert!(is_angle_between(TAU - 0.01, TAU - 0.05, 0.15));
        assert!(is_angle_between(0.1, TAU - 0.05, 0.15));
        assert!(!is_angle_between(PI, TAU - 0.05, 0.15));
    }

    #[test]
    fn beam_wraps_past_zero() {
        let target = Vec2::new((TAU - 0.01).cos(), (TAU - 0.01).sin()) * 100.0;
        assert!(is_in_beam(target, 0.05, 0.2));

        let behind = Vec2::new(-100.0, 0.0);
        assert!(!is_in_beam(behind, 0.05, 0.2));
    }

    #[test]
    fn full_circle_beam_sees_every_bearing() {
        for target in [Vec2::new(100.0, 0.0), Vec2::new(-100.0, 0.0), Vec2::new(0.0, -100.0)] {
            assert!(is_in_beam(target, 1.0, TAU));
            assert!(is_in_beam(target, 1.0, 360.0_f32.to_radians()));
        }
        assert!(!is_in_beam(Vec2::new(-100.0, 0.0), 0.0, PI));
    }

    #[test]
    fn bearing_of_axes() {
        assert_eq!(bearing(Vec2::new(10.0, 0.0)), 0.0);
        assert!((bearing(Vec2::new(0.0, 10.0)) - PI / 2.0).abs() < 1e-6);
        assert!((bearing(Vec2::new(0.0, -10.0)) - 1.5 * PI).abs() < 1e-5);
    }
}
