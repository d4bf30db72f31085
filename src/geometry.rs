//! Scalar and vector quantities derived from node locations.

use oncosim_common::{angle_to_vec, Vec2};

/// Distance of a point from the origin.
#[inline(always)]
pub fn radial_distance(location: Vec2) -> f64 {
    location.length()
}

/// Vector pointing from `a` to `b`.
#[inline(always)]
pub fn displacement(a: Vec2, b: Vec2) -> Vec2 {
    b - a
}

/// Equilibrium separation of two interacting nodes.
#[inline(always)]
pub fn rest_length(radius_a: f64, radius_b: f64) -> f64 {
    radius_a + radius_b
}

/// Point at `radius` from the origin along angle `theta`.
#[inline(always)]
pub fn point_on_circle(radius: f64, theta: f64) -> Vec2 {
    angle_to_vec(theta).scale(radius)
}
