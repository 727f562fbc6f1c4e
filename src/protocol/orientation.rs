//! Quaternion to Euler angle conversion

use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

/// Radians to degrees.
pub const RAD_TO_DEG: f64 = 180.0 / std::f64::consts::PI;

/// Roll, pitch and yaw in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EulerAngles {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl EulerAngles {
    pub fn as_array(&self) -> [f64; 3] {
        [self.roll, self.pitch, self.yaw]
    }
}

impl From<[f64; 3]> for EulerAngles {
    fn from([roll, pitch, yaw]: [f64; 3]) -> Self {
        Self { roll, pitch, yaw }
    }
}

/// `asin` with its argument clamped to `[-1, 1]`.
///
/// Quaternions that are not exactly unit length can push the argument slightly
/// outside the domain, where `asin` would return NaN.
pub fn asin_clamped(x: f64) -> f64 {
    if x <= -1.0 {
        -FRAC_PI_2
    } else if x >= 1.0 {
        FRAC_PI_2
    } else {
        x.asin()
    }
}

/// Convert a scalar-first orientation quaternion to Euler angles in degrees.
pub fn quaternion_to_euler(q0: f64, q1: f64, q2: f64, q3: f64) -> EulerAngles {
    let sqw = q0 * q0;
    let dphi = 2.0 * (sqw + q3 * q3) - 1.0;
    let dpsi = 2.0 * (sqw + q1 * q1) - 1.0;

    let roll = (2.0 * (q2 * q3 + q0 * q1)).atan2(dphi);
    let pitch = -asin_clamped(2.0 * (q1 * q3 - q0 * q2));
    let yaw = (2.0 * (q1 * q2 + q0 * q3)).atan2(dpsi);

    EulerAngles { roll: roll * RAD_TO_DEG, pitch: pitch * RAD_TO_DEG, yaw: yaw * RAD_TO_DEG }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f64::consts::FRAC_1_SQRT_2;

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "expected {expected}, got {actual}");
    }

    #[test]
    fn asin_clamped_saturates() {
        assert_eq!(asin_clamped(1.5), FRAC_PI_2);
        assert_eq!(asin_clamped(-2.0), -FRAC_PI_2);
        assert_eq!(asin_clamped(1.0), FRAC_PI_2);
        assert_eq!(asin_clamped(-1.0), -FRAC_PI_2);
        assert_eq!(asin_clamped(0.0), 0.0);
        assert_close(asin_clamped(0.5), 0.5f64.asin());
    }

    #[test]
    fn identity_quaternion_is_level() {
        let euler = quaternion_to_euler(1.0, 0.0, 0.0, 0.0);
        assert_close(euler.roll, 0.0);
        assert_close(euler.pitch, 0.0);
        assert_close(euler.yaw, 0.0);
    }

    #[test]
    fn single_axis_rotations() {
        let h = FRAC_1_SQRT_2;

        let roll = quaternion_to_euler(h, h, 0.0, 0.0);
        assert_close(roll.roll, 90.0);
        assert_close(roll.pitch, 0.0);
        assert_close(roll.yaw, 0.0);

        let yaw = quaternion_to_euler(h, 0.0, 0.0, h);
        assert_close(yaw.roll, 0.0);
        assert_close(yaw.yaw, 90.0);

        let half = 30f64.to_radians().sin();
        let whole = 30f64.to_radians().cos();
        let pitch = quaternion_to_euler(whole, 0.0, half, 0.0);
        assert_close(pitch.pitch, 60.0);
    }

    #[test]
    fn gimbal_lock_with_overshoot_stays_finite() {
        // Slightly over-normalised 90° pitch pushes the asin argument past 1
        let h = FRAC_1_SQRT_2 * (1.0 + 1e-9);
        let euler = quaternion_to_euler(h, 0.0, h, 0.0);
        assert!(euler.pitch.is_finite());
        assert_close(euler.pitch, 90.0);
    }

    proptest! {
        #[test]
        fn outputs_are_finite_and_bounded(
            q0 in -1.0f64..1.0,
            q1 in -1.0f64..1.0,
            q2 in -1.0f64..1.0,
            q3 in -1.0f64..1.0
        ) {
            let norm = (q0 * q0 + q1 * q1 + q2 * q2 + q3 * q3).sqrt();
            prop_assume!(norm > 1e-3);
            // up to 1% normalisation error
            let scale = 1.01 / norm;
            let euler = quaternion_to_euler(q0 * scale, q1 * scale, q2 * scale, q3 * scale);
            prop_assert!(euler.roll.is_finite() && euler.roll.abs() <= 180.0);
            prop_assert!(euler.pitch.is_finite() && euler.pitch.abs() <= 90.0);
            prop_assert!(euler.yaw.is_finite() && euler.yaw.abs() <= 180.0);
        }
    }
}
