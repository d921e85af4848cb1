// Dead-reckoning pose estimate from measured chassis velocity

use tracing::debug;

use super::PoseEstimator;
use crate::geometry::{Pose2d, Twist2d};
use crate::speeds::RobotSpeeds;

/// Integrates the measured robot-relative velocity along constant-twist arcs.
///
/// Vision fixes replace the pose outright; there is no weighting between
/// odometry and vision.
#[derive(Debug, Clone, Default)]
pub struct WheelOdometry {
    pose: Pose2d,
    velocity: RobotSpeeds,
    last_vision_timestamp: Option<f64>,
}

impl WheelOdometry {
    pub fn new(initial: Pose2d) -> Self {
        Self {
            pose: initial,
            ..Default::default()
        }
    }

    /// Records the latest velocity reading
    pub fn set_measured_velocity(&mut self, velocity: RobotSpeeds) {
        self.velocity = velocity;
    }

    /// Advances the pose by holding the measured velocity for `dt` seconds
    pub fn update(&mut self, dt: f64) {
        let v = self.velocity;
        self.pose = self
            .pose
            .exp(Twist2d::new(v.vx * dt, v.vy * dt, v.omega * dt));
    }

    pub fn last_vision_timestamp(&self) -> Option<f64> {
        self.last_vision_timestamp
    }
}

impl PoseEstimator for WheelOdometry {
    fn pose(&self) -> Pose2d {
        self.pose
    }

    fn set_pose(&mut self, pose: Pose2d) {
        self.pose = pose;
    }

    fn measured_velocity_robot_relative(&self) -> RobotSpeeds {
        self.velocity
    }

    fn add_vision_measurement(&mut self, pose: Pose2d, timestamp: f64) {
        debug!(
            "Vision fix at t={:.3}: ({:.3}, {:.3}, {:.1}°)",
            timestamp,
            pose.x(),
            pose.y(),
            pose.rotation.degrees()
        );
        self.pose = pose;
        self.last_vision_timestamp = Some(timestamp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rotation2d;
    use std::f64::consts::PI;

    #[test]
    fn test_straight_line() {
        let mut odom = WheelOdometry::default();
        odom.set_measured_velocity(RobotSpeeds::new(0.5, 0.0, 0.0));
        for _ in 0..50 {
            odom.update(0.02);
        }
        assert!((odom.pose().x() - 0.5).abs() < 1e-9);
        assert!(odom.pose().y().abs() < 1e-12);
    }

    #[test]
    fn test_driving_a_circle_returns_home() {
        let mut odom = WheelOdometry::default();
        // 1 m/s forward while turning at 1 rad/s: unit circle in 2pi seconds
        odom.set_measured_velocity(RobotSpeeds::new(1.0, 0.0, 1.0));
        let steps = 1000;
        for _ in 0..steps {
            odom.update(2.0 * PI / steps as f64);
        }
        let pose = odom.pose();
        assert!(pose.x().abs() < 1e-9 && pose.y().abs() < 1e-9, "{:?}", pose);
        assert!((pose.rotation.radians() - 2.0 * PI).abs() < 1e-9);
    }

    #[test]
    fn test_vision_replaces_pose() {
        let mut odom = WheelOdometry::new(Pose2d::new(1.0, 1.0, Rotation2d::ZERO));
        let fix = Pose2d::new(2.0, 0.5, Rotation2d::from_degrees(30.0));
        odom.add_vision_measurement(fix, 12.5);
        assert_eq!(odom.pose(), fix);
        assert_eq!(odom.last_vision_timestamp(), Some(12.5));
    }
}
