//! Coordinate transforms and rotations.
//!
//! Spherical catalog coordinates to observer-centred Cartesian, the
//! yaw/pitch rotation used by the projected view, and the stable hashes
//! behind every procedural placement (field stars, orbit phases).

use nalgebra::{Matrix3, Vector3};
use std::f64::consts::{PI, TAU};

/// Bearing/elevation in degrees and range in parsecs to observer-centred
/// Cartesian parsecs. x points at (0°, 0°), z at the pole.
pub fn spherical_to_cartesian(bearing_deg: f64, elevation_deg: f64, range: f64) -> Vector3<f64> {
    let bearing = bearing_deg.to_radians();
    let elevation = elevation_deg.to_radians();
    let (sb, cb) = bearing.sin_cos();
    let (se, ce) = elevation.sin_cos();
    Vector3::new(range * ce * cb, range * ce * sb, range * se)
}

/// Raw transform over possibly-missing inputs; missing components read as 0,
/// so a record without coordinates lands on the origin.
pub fn transform(bearing_deg: Option<f64>, elevation_deg: Option<f64>, range: Option<f64>) -> Vector3<f64> {
    spherical_to_cartesian(
        bearing_deg.unwrap_or(0.0),
        elevation_deg.unwrap_or(0.0),
        range.unwrap_or(0.0),
    )
}

/// Position used for rendering. `None` marks the object as unplaced: a
/// missing or non-finite coordinate, or a non-positive range.
pub fn placement(bearing_deg: Option<f64>, elevation_deg: Option<f64>, range: Option<f64>) -> Option<Vector3<f64>> {
    let (bearing, elevation, range) = (bearing_deg?, elevation_deg?, range?);
    if !(bearing.is_finite() && elevation.is_finite() && range.is_finite()) || range <= 0.0 {
        return None;
    }
    Some(spherical_to_cartesian(bearing, elevation, range))
}

pub fn rotate_point_matrix(p: &Vector3<f64>, rot: &Matrix3<f64>) -> Vector3<f64> {
    rot * p
}

/// Yaw about the pole first, then pitch about the screen x axis.
pub fn yaw_pitch_matrix(yaw: f64, pitch: f64) -> Matrix3<f64> {
    let (sy, cy) = yaw.sin_cos();
    let (sp, cp) = pitch.sin_cos();
    let rot_z = Matrix3::new(
        cy, -sy, 0.0,
        sy, cy, 0.0,
        0.0, 0.0, 1.0,
    );
    let rot_x = Matrix3::new(
        1.0, 0.0, 0.0,
        0.0, cp, -sp,
        0.0, sp, cp,
    );
    rot_x * rot_z
}

pub fn wrap_angle(angle: f64) -> f64 {
    (angle + PI).rem_euclid(TAU) - PI
}

/// Square-root compression of orbital distance into display units.
pub fn display_radius(distance_au: f64, scale: f64) -> f64 {
    distance_au.max(0.0).sqrt() * scale
}

/// splitmix64 finaliser.
pub fn stable_hash(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Uniform value in [0, 1) derived from `seed`.
pub fn hash_unit(seed: u64) -> f64 {
    (stable_hash(seed) >> 11) as f64 / (1u64 << 53) as f64
}

/// FNV-1a over the UTF-8 bytes of `name`.
pub fn name_hash(name: &str) -> u64 {
    name.bytes().fold(0xcbf2_9ce4_8422_2325, |h, b| {
        (h ^ b as u64).wrapping_mul(0x0000_0100_0000_01B3)
    })
}

/// Unit vector uniformly distributed on the sphere, fixed per index.
pub fn hash_direction(index: u64) -> Vector3<f64> {
    let z = 2.0 * hash_unit(index.wrapping_mul(2)) - 1.0;
    let phi = TAU * hash_unit(index.wrapping_mul(2).wrapping_add(1));
    let r = (1.0 - z * z).max(0.0).sqrt();
    Vector3::new(r * phi.cos(), r * phi.sin(), z)
}
