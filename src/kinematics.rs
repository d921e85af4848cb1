// Omniwheel kinematics for the LeKiwi 3-wheel base
// Converts robot-relative chassis speeds to wheel speeds and back.

use serde::{Deserialize, Serialize};

use crate::speeds::RobotSpeeds;

/// Wheel configuration for LeKiwi base
pub const WHEEL_RADIUS: f64 = 0.05; // meters
pub const BASE_RADIUS: f64 = 0.125; // meters (distance from center to wheel)

/// Wheel mounting angles (degrees) with -90° offset
/// Left wheel at 240°, Back wheel at 0°, Right wheel at 120°
pub const WHEEL_ANGLES_DEG: [f64; 3] = [240.0 - 90.0, 0.0 - 90.0, 120.0 - 90.0];

/// Wheel speed limit of the STS3215 servos in velocity mode (rad/s)
pub const MAX_WHEEL_SPEED: f64 = 3000.0 / 4096.0 * std::f64::consts::TAU;

/// Angular wheel velocities (rad/s) for the three motors
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WheelSpeeds {
    pub left: f64,
    pub back: f64,
    pub right: f64,
}

impl WheelSpeeds {
    pub fn new(left: f64, back: f64, right: f64) -> Self {
        Self { left, back, right }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Returns velocities as array [left, back, right]
    pub fn as_array(&self) -> [f64; 3] {
        [self.left, self.back, self.right]
    }

    pub fn from_array([left, back, right]: [f64; 3]) -> Self {
        Self { left, back, right }
    }

    /// Factor in `(0, 1]` that brings the fastest wheel down to `max_speed`
    pub fn desaturation_scale(&self, max_speed: f64) -> f64 {
        let fastest = self
            .as_array()
            .iter()
            .fold(0.0f64, |acc, w| acc.max(w.abs()));

        if fastest > max_speed {
            max_speed / fastest
        } else {
            1.0
        }
    }

    /// Scales all wheels by the same factor so none exceeds `max_speed`,
    /// preserving the direction of motion.
    pub fn desaturate(&self, max_speed: f64) -> WheelSpeeds {
        let scale = self.desaturation_scale(max_speed);
        Self::from_array(self.as_array().map(|w| w * scale))
    }
}

/// Geometry of a three-omniwheel base
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OmniKinematics {
    pub wheel_radius: f64,
    pub base_radius: f64,
    pub wheel_angles_deg: [f64; 3],
}

impl Default for OmniKinematics {
    fn default() -> Self {
        Self {
            wheel_radius: WHEEL_RADIUS,
            base_radius: BASE_RADIUS,
            wheel_angles_deg: WHEEL_ANGLES_DEG,
        }
    }
}

impl OmniKinematics {
    /// Each row: [cos(angle), sin(angle), base_radius]
    /// Maps body velocities to wheel rim speed
    fn rows(&self) -> [[f64; 3]; 3] {
        self.wheel_angles_deg.map(|deg| {
            let (sin_a, cos_a) = deg.to_radians().sin_cos();
            [cos_a, sin_a, self.base_radius]
        })
    }

    /// Inverse kinematics: chassis speeds -> wheel angular speeds
    pub fn to_wheel_speeds(&self, speeds: &RobotSpeeds) -> WheelSpeeds {
        let velocity = [speeds.vx, speeds.vy, speeds.omega];
        let rim = self
            .rows()
            .map(|row| row[0] * velocity[0] + row[1] * velocity[1] + row[2] * velocity[2]);
        WheelSpeeds::from_array(rim.map(|linear| linear / self.wheel_radius))
    }

    /// Forward kinematics: wheel angular speeds -> chassis speeds.
    ///
    /// Solves the 3x3 wheel matrix with Cramer's rule; the three-wheel layout
    /// is square so the solution is exact.
    pub fn to_chassis_speeds(&self, wheels: &WheelSpeeds) -> RobotSpeeds {
        let m = self.rows();
        let rim = wheels.as_array().map(|w| w * self.wheel_radius);

        let det = det3(m);
        if det.abs() < f64::EPSILON {
            return RobotSpeeds::ZERO;
        }

        let solve = |col: usize| {
            let mut replaced = m;
            for (row, value) in replaced.iter_mut().zip(rim) {
                row[col] = value;
            }
            det3(replaced) / det
        };

        RobotSpeeds::new(solve(0), solve(1), solve(2))
    }

    /// Chassis speed reachable in every direction with wheels at `max_wheel`
    pub fn max_linear_velocity(&self, max_wheel: f64) -> f64 {
        max_wheel * self.wheel_radius
    }

    /// Spin rate reachable with wheels at `max_wheel`
    pub fn max_angular_velocity(&self, max_wheel: f64) -> f64 {
        max_wheel * self.wheel_radius / self.base_radius
    }
}

fn det3(m: [[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_velocity() {
        let wheels = OmniKinematics::default().to_wheel_speeds(&RobotSpeeds::ZERO);
        assert_eq!(wheels, WheelSpeeds::zero());
    }

    #[test]
    fn test_forward_motion() {
        // Back wheel is at -90° (perpendicular to forward), so it doesn't contribute
        // Left and right wheels spin in opposite directions to move forward
        let wheels = OmniKinematics::default().to_wheel_speeds(&RobotSpeeds::new(0.1, 0.0, 0.0));
        assert!(wheels.left != 0.0);
        assert!(wheels.right != 0.0);
        assert!(
            (wheels.left > 0.0) != (wheels.right > 0.0),
            "Left and right wheels should spin opposite directions"
        );
        assert!(wheels.back.abs() < 1e-12);
    }

    #[test]
    fn test_rotation_only() {
        // Pure rotation should spin all wheels in same direction, same rate
        let wheels = OmniKinematics::default().to_wheel_speeds(&RobotSpeeds::new(0.0, 0.0, 1.0));
        let expected = BASE_RADIUS / WHEEL_RADIUS;
        for w in wheels.as_array() {
            assert!((w - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_forward_inverse_round_trip() {
        let kinematics = OmniKinematics::default();
        let speeds = RobotSpeeds::new(0.25, -0.1, 0.8);
        let back = kinematics.to_chassis_speeds(&kinematics.to_wheel_speeds(&speeds));
        assert!((back.vx - speeds.vx).abs() < 1e-12);
        assert!((back.vy - speeds.vy).abs() < 1e-12);
        assert!((back.omega - speeds.omega).abs() < 1e-12);
    }

    #[test]
    fn test_desaturate_preserves_ratio() {
        let wheels = WheelSpeeds::new(20.0, -10.0, 5.0).desaturate(10.0);
        assert!((wheels.left - 10.0).abs() < 1e-12);
        assert!((wheels.back + 5.0).abs() < 1e-12);
        assert!((wheels.right - 2.5).abs() < 1e-12);

        let slow = WheelSpeeds::new(1.0, 2.0, -3.0);
        assert_eq!(slow.desaturate(10.0), slow);
    }

    #[test]
    fn test_capability_bounds() {
        let kinematics = OmniKinematics::default();
        let v = kinematics.max_linear_velocity(MAX_WHEEL_SPEED);
        let w = kinematics.max_angular_velocity(MAX_WHEEL_SPEED);
        assert!(v > 0.2 && v < 0.3, "max linear {}", v);
        assert!((w - v / BASE_RADIUS).abs() < 1e-12);
    }
}
