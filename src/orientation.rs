//! Quaternion to Tait-Bryan angles, ZYX (yaw-pitch-roll) order.
//!
//! ```text
//! roll  = atan2(2(wx + yz), 1 - 2(x² + y²))
//! pitch = asin(clamp(2(wy - zx), -1, 1))      flexion-extension
//! yaw   = atan2(2(wz + xy), 1 - 2(y² + z²))
//! ```
//!
//! The asin argument is clamped so quaternions that drifted slightly off
//! unit length never leave its domain.

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};
use crate::types::{Quat, Sample};

/// Angles in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EulerAngles {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

pub fn quaternion_to_euler(q: &Quat) -> AnalysisResult<EulerAngles> {
    let (w, x, y, z) = (q.w, q.i, q.j, q.k);
    if ![w, x, y, z].iter().all(|c| c.is_finite()) {
        return Err(AnalysisError::computation(format!(
            "non-finite quaternion ({w}, {x}, {y}, {z})"
        )));
    }

    let sinr_cosp = 2.0 * (w * x + y * z);
    let cosr_cosp = 1.0 - 2.0 * (x * x + y * y);
    let roll = sinr_cosp.atan2(cosr_cosp);

    let sinp = (2.0 * (w * y - z * x)).clamp(-1.0, 1.0);
    let pitch = sinp.asin();

    let siny_cosp = 2.0 * (w * z + x * y);
    let cosy_cosp = 1.0 - 2.0 * (y * y + z * z);
    let yaw = siny_cosp.atan2(cosy_cosp);

    Ok(EulerAngles {
        roll: roll.to_degrees(),
        pitch: pitch.to_degrees(),
        yaw: yaw.to_degrees(),
    })
}

/// Element-wise conversion of a whole stream.
pub fn euler_series(samples: &[Sample]) -> AnalysisResult<Vec<EulerAngles>> {
    samples
        .iter()
        .map(|s| quaternion_to_euler(&s.quaternion))
        .collect()
}

/// Pitch (flexion-extension) of every sample, degrees.
pub fn pitch_series(samples: &[Sample]) -> AnalysisResult<Vec<f64>> {
    samples
        .iter()
        .map(|s| quaternion_to_euler(&s.quaternion).map(|e| e.pitch))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::quat_wxyz;
    use approx::assert_abs_diff_eq;
    use nalgebra::{UnitQuaternion, Vector3};

    #[test]
    fn test_identity_is_zero() {
        let e = quaternion_to_euler(&quat_wxyz(1.0, 0.0, 0.0, 0.0)).unwrap();
        assert_eq!(e, EulerAngles { roll: 0.0, pitch: 0.0, yaw: 0.0 });
    }

    #[test]
    fn test_quarter_turn_about_pitch_axis() {
        let half = std::f64::consts::FRAC_PI_4;
        let e = quaternion_to_euler(&quat_wxyz(half.cos(), 0.0, half.sin(), 0.0)).unwrap();
        assert_abs_diff_eq!(e.pitch, 90.0, epsilon = 1e-6);
    }

    #[test]
    fn test_matches_nalgebra_away_from_gimbal_lock() {
        let (roll, pitch, yaw) = (0.3, -0.4, 1.1);
        let q = UnitQuaternion::from_euler_angles(roll, pitch, yaw);
        let e = quaternion_to_euler(q.quaternion()).unwrap();
        assert_abs_diff_eq!(e.roll, roll.to_degrees(), epsilon = 1e-9);
        assert_abs_diff_eq!(e.pitch, pitch.to_degrees(), epsilon = 1e-9);
        assert_abs_diff_eq!(e.yaw, yaw.to_degrees(), epsilon = 1e-9);
    }

    #[test]
    fn test_pure_pitch_rotation() {
        let q = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 30f64.to_radians());
        let e = quaternion_to_euler(q.quaternion()).unwrap();
        assert_abs_diff_eq!(e.pitch, 30.0, epsilon = 1e-9);
        assert_abs_diff_eq!(e.roll, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_overlong_quaternion_is_clamped() {
        // |q| > 1 pushes 2(wy - zx) past 1
        let e = quaternion_to_euler(&quat_wxyz(0.75, 0.0, 0.75, 0.0)).unwrap();
        assert_abs_diff_eq!(e.pitch, 90.0, epsilon = 1e-9);
        let e = quaternion_to_euler(&quat_wxyz(0.75, 0.0, -0.75, 0.0)).unwrap();
        assert_abs_diff_eq!(e.pitch, -90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_non_finite_rejected() {
        let err = quaternion_to_euler(&quat_wxyz(f64::NAN, 0.0, 0.0, 0.0)).unwrap_err();
        assert!(matches!(err, AnalysisError::Computation(_)));
    }

    #[test]
    fn test_series_matches_scalar() {
        let samples: Vec<Sample> = (0..5)
            .map(|i| {
                let half = 0.1 * i as f64;
                Sample::new(i as f64, quat_wxyz(half.cos(), 0.0, half.sin(), 0.0))
            })
            .collect();
        let series = euler_series(&samples).unwrap();
        let pitches = pitch_series(&samples).unwrap();
        for (s, (e, p)) in samples.iter().zip(series.iter().zip(&pitches)) {
            assert_eq!(*e, quaternion_to_euler(&s.quaternion).unwrap());
            assert_eq!(e.pitch, *p);
        }
    }
}
