// Holonomic drive abstraction
//
// Provides:
// - `HolonomicDrive`: what a chassis must implement, plus the derived
//   frame conversions, latency compensation and command paths
// - `PoseEstimator`: the odometry collaborator a chassis reads its pose from
// - Dead-reckoning odometry and the LeKiwi base implementation

mod lekiwi;
mod odometry;

pub use lekiwi::LeKiwiBase;
pub use odometry::WheelOdometry;

use crate::config::LOOP_PERIOD;
use crate::geometry::{Pose2d, Rotation2d, Translation2d};
use crate::speeds::{FieldSpeeds, RobotSpeeds};

/// Source of truth for where the robot is.
///
/// Reads never fail: a missing sensor is the estimator's problem, and it
/// still reports its best guess.
pub trait PoseEstimator {
    fn pose(&self) -> Pose2d;

    fn set_pose(&mut self, pose: Pose2d);

    /// Velocity as sensed, not as commanded
    fn measured_velocity_robot_relative(&self) -> RobotSpeeds;

    /// Absolute pose observed by an external sensor at `timestamp` seconds.
    /// Ordering of timestamps is not checked here.
    fn add_vision_measurement(&mut self, pose: Pose2d, timestamp: f64);
}

/// A chassis that can translate in any direction while rotating.
///
/// Implementors provide raw actuation and estimator access; every other
/// operation is derived from those.
pub trait HolonomicDrive {
    /// Runs a discrete, robot-relative command with no further processing.
    /// This is the only path to the motors.
    fn run_raw_chassis_speeds(&mut self, speeds: RobotSpeeds);

    /// Current estimated pose
    fn pose(&self) -> Pose2d;

    /// Overwrites the estimated pose (match start, relocalization)
    fn set_pose(&mut self, pose: Pose2d);

    /// Measured chassis velocity, robot-relative
    fn measured_chassis_speeds_robot_relative(&self) -> RobotSpeeds;

    fn chassis_max_linear_velocity(&self) -> f64;

    fn chassis_max_angular_velocity(&self) -> f64;

    /// Forwards a vision pose fix, captured at `timestamp` seconds, to the
    /// estimator
    fn add_vision_measurement(&mut self, vision_pose: Pose2d, timestamp: f64);

    fn facing(&self) -> Rotation2d {
        self.pose().rotation
    }

    fn measured_chassis_speeds_field_relative(&self) -> FieldSpeeds {
        self.measured_chassis_speeds_robot_relative()
            .to_field_relative(self.facing())
    }

    /// Current pose pushed forward along the measured field-relative velocity,
    /// to make up for the delay between sampling the pose and acting on it.
    ///
    /// Translation and rotation use separate look-ahead windows (seconds).
    fn pose_with_velocity_compensation(
        &self,
        translation_look_ahead: f64,
        rotation_look_ahead: f64,
    ) -> Pose2d {
        let velocity = self.measured_chassis_speeds_field_relative();
        let pose = self.pose();
        Pose2d {
            translation: pose.translation
                + Translation2d::new(velocity.vx, velocity.vy) * translation_look_ahead,
            rotation: pose.rotation + Rotation2d::from_radians(velocity.omega * rotation_look_ahead),
        }
    }

    /// Runs a continuous field-relative command, e.g. from a position
    /// controller
    fn run_field_centric_chassis_speeds(&mut self, speeds: FieldSpeeds) {
        let robot_relative = speeds.to_robot_relative(self.facing());
        self.run_robot_centric_chassis_speeds(robot_relative);
    }

    /// Runs a continuous robot-relative command, discretized over one control
    /// period. The only place discretization happens.
    fn run_robot_centric_chassis_speeds(&mut self, speeds: RobotSpeeds) {
        self.run_raw_chassis_speeds(speeds.discretize(LOOP_PERIOD.as_secs_f64()));
    }

    fn stop(&mut self) {
        self.run_robot_centric_chassis_speeds(RobotSpeeds::ZERO);
    }
}
