// LeKiwi omniwheel base as a holonomic drive
//
// Hardware access lives in a separate bridge process. This side buffers the
// latest raw command for the runtime to publish and turns the bridge's wheel
// velocity reports into measured chassis speeds.

use tracing::{debug, info};

use super::{HolonomicDrive, PoseEstimator, WheelOdometry};
use crate::config::DriveConfig;
use crate::geometry::Pose2d;
use crate::kinematics::{OmniKinematics, WheelSpeeds};
use crate::speeds::RobotSpeeds;

pub struct LeKiwiBase<E = WheelOdometry> {
    estimator: E,
    kinematics: OmniKinematics,
    max_wheel_speed: f64,
    command: RobotSpeeds,
    loopback: bool,
}

impl LeKiwiBase<WheelOdometry> {
    pub fn new(config: &DriveConfig) -> Self {
        Self::with_estimator(config, WheelOdometry::default())
    }

    /// Measured velocity is taken to be the last command sent, for bench runs
    /// without wheel feedback
    pub fn loopback(config: &DriveConfig) -> Self {
        let mut base = Self::new(config);
        base.loopback = true;
        info!("Base running in loopback: commands are echoed as measurements");
        base
    }

    /// Records the wheel velocities reported by the hardware bridge
    pub fn on_wheel_feedback(&mut self, wheels: &WheelSpeeds) {
        if self.loopback {
            return;
        }
        let measured = self.kinematics.to_chassis_speeds(wheels);
        self.estimator.set_measured_velocity(measured);
    }

    /// Advances odometry by one period of `dt` seconds
    pub fn update(&mut self, dt: f64) {
        if self.loopback {
            self.estimator.set_measured_velocity(self.command);
        }
        self.estimator.update(dt);
    }
}

impl<E: PoseEstimator> LeKiwiBase<E> {
    pub fn with_estimator(config: &DriveConfig, estimator: E) -> Self {
        Self {
            estimator,
            kinematics: config.kinematics,
            max_wheel_speed: config.max_wheel_speed,
            command: RobotSpeeds::ZERO,
            loopback: false,
        }
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    /// Last raw command, to be published as actuation
    pub fn actuation(&self) -> RobotSpeeds {
        self.command
    }

    /// Wheel velocities for the last raw command
    pub fn wheel_targets(&self) -> WheelSpeeds {
        self.kinematics
            .to_wheel_speeds(&self.command)
            .desaturate(self.max_wheel_speed)
    }
}

impl<E: PoseEstimator> HolonomicDrive for LeKiwiBase<E> {
    /// Buffers the command scaled down as a whole if any wheel would exceed
    /// what the servos can do, so the published chassis speeds, the wheel
    /// targets and loopback odometry agree.
    fn run_raw_chassis_speeds(&mut self, speeds: RobotSpeeds) {
        let scale = self
            .kinematics
            .to_wheel_speeds(&speeds)
            .desaturation_scale(self.max_wheel_speed);
        let speeds = speeds * scale;
        if speeds != self.command {
            debug!(
                "Raw command: vx={:.3}, vy={:.3}, omega={:.3}",
                speeds.vx, speeds.vy, speeds.omega
            );
        }
        self.command = speeds;
    }

    fn pose(&self) -> Pose2d {
        self.estimator.pose()
    }

    fn set_pose(&mut self, pose: Pose2d) {
        info!(
            "Pose reset to ({:.3}, {:.3}, {:.1}°)",
            pose.x(),
            pose.y(),
            pose.rotation.degrees()
        );
        self.estimator.set_pose(pose);
    }

    fn measured_chassis_speeds_robot_relative(&self) -> RobotSpeeds {
        self.estimator.measured_velocity_robot_relative()
    }

    fn chassis_max_linear_velocity(&self) -> f64 {
        self.kinematics.max_linear_velocity(self.max_wheel_speed)
    }

    fn chassis_max_angular_velocity(&self) -> f64 {
        self.kinematics.max_angular_velocity(self.max_wheel_speed)
    }

    fn add_vision_measurement(&mut self, vision_pose: Pose2d, timestamp: f64) {
        self.estimator.add_vision_measurement(vision_pose, timestamp);
    }
}
