//! Orientation decomposition.
//!
//! The perception feed delivers orientations as quaternions; everything
//! downstream of the cache (the motion executor's standoff targets, the
//! scene synchronizer's obstacle boxes) works in roll/pitch/yaw.  The
//! conversion happens exactly once, at cache-update time, so all consumers
//! agree on the axis convention.

use armos_types::{Quat, RollPitchYaw};
use nalgebra::{Quaternion, UnitQuaternion};

/// Decompose a feed quaternion into intrinsic roll/pitch/yaw (radians).
///
/// Non-unit inputs are renormalised; a degenerate (near-zero) quaternion
/// decomposes as the identity rotation rather than propagating NaNs into
/// the cache.
pub fn quat_to_rpy(q: &Quat) -> RollPitchYaw {
    let raw = Quaternion::new(q.w, q.x, q.y, q.z);
    match UnitQuaternion::try_new(raw, 1.0e-9) {
        Some(unit) => {
            let (roll, pitch, yaw) = unit.euler_angles();
            RollPitchYaw::new(roll, pitch, yaw)
        }
        None => RollPitchYaw::zero(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1.0e-9, "expected {b}, got {a}");
    }

    #[test]
    fn identity_decomposes_to_zero_angles() {
        let rpy = quat_to_rpy(&Quat::identity());
        assert_close(rpy.roll, 0.0);
        assert_close(rpy.pitch, 0.0);
        assert_close(rpy.yaw, 0.0);
    }

    #[test]
    fn quarter_turn_about_x_is_pure_roll() {
        // q = (cos(θ/2), sin(θ/2), 0, 0) with θ = π/2.
        let half = FRAC_PI_4;
        let q = Quat::new(half.cos(), half.sin(), 0.0, 0.0);
        let rpy = quat_to_rpy(&q);
        assert_close(rpy.roll, FRAC_PI_2);
        assert_close(rpy.pitch, 0.0);
        assert_close(rpy.yaw, 0.0);
    }

    #[test]
    fn quarter_turn_about_z_is_pure_yaw() {
        let half = FRAC_PI_4;
        let q = Quat::new(half.cos(), 0.0, 0.0, half.sin());
        let rpy = quat_to_rpy(&q);
        assert_close(rpy.roll, 0.0);
        assert_close(rpy.pitch, 0.0);
        assert_close(rpy.yaw, FRAC_PI_2);
    }

    #[test]
    fn non_unit_quaternion_is_renormalised() {
        // Same rotation as a quarter turn about z, scaled by 3.
        let half = FRAC_PI_4;
        let q = Quat::new(3.0 * half.cos(), 0.0, 0.0, 3.0 * half.sin());
        let rpy = quat_to_rpy(&q);
        assert_close(rpy.yaw, FRAC_PI_2);
    }

    #[test]
    fn degenerate_quaternion_falls_back_to_identity() {
        let rpy = quat_to_rpy(&Quat::new(0.0, 0.0, 0.0, 0.0));
        assert_close(rpy.roll, 0.0);
        assert_close(rpy.pitch, 0.0);
        assert_close(rpy.yaw, 0.0);
    }
}
