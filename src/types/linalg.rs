//! Linear algebra aliases for orientation data
//!
//! Sensors deliver orientation as (w, x, y, z) quaternions; everything
//! downstream works on these aliases rather than raw tuples.

use nalgebra::{Quaternion, Vector3};

// ===== Orientation =====
pub type Quat = Quaternion<f64>;

// ===== Per-axis sensor channels =====
pub type Vec3 = Vector3<f64>;

/// Build a quaternion from device column order (w, x, y, z).
///
/// nalgebra's constructor already takes the scalar part first, this only
/// names the convention at the call sites.
pub fn quat_wxyz(w: f64, x: f64, y: f64, z: f64) -> Quat {
    Quaternion::new(w, x, y, z)
}

/// `sqrt(w² + x² + y² + z²)`
pub fn quat_magnitude(q: &Quat) -> f64 {
    q.norm()
}
