// Pose-tracking controller for a holonomic base
//
// Translation and heading are corrected by separate loops so they can be
// tuned independently: one PID per field axis for position, a profiled PID
// on the wrapped heading error for rotation.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use super::pid::PidController;
use super::profile::Constraints;
use super::profiled_pid::ProfiledPidController;
use crate::config::{DriveConfig, PidGains};
use crate::geometry::{Pose2d, Rotation2d};
use crate::speeds::FieldSpeeds;
use crate::trajectory::TrajectoryState;

/// Acceptance band around a target pose
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    /// Maximum distance from the target position (m)
    pub position: f64,
    /// Maximum absolute heading error (rad)
    pub heading: f64,
}

impl Tolerance {
    pub fn new(position: f64, heading: Rotation2d) -> Self {
        Self {
            position,
            heading: heading.radians().abs(),
        }
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::new(0.05, Rotation2d::from_degrees(2.0))
    }
}

#[derive(Debug, Clone, Copy)]
struct TrackingError {
    distance: f64,
    heading: Rotation2d,
}

#[derive(Debug, Clone)]
pub struct HolonomicDriveController {
    x_controller: PidController,
    y_controller: PidController,
    theta_controller: ProfiledPidController,
    tolerance: Tolerance,
    last_error: Option<TrackingError>,
    first_run: bool,
    enabled: bool,
}

impl HolonomicDriveController {
    pub fn new(
        x_controller: PidController,
        y_controller: PidController,
        mut theta_controller: ProfiledPidController,
    ) -> Self {
        theta_controller.enable_continuous_input(-PI, PI);
        Self {
            x_controller,
            y_controller,
            theta_controller,
            tolerance: Tolerance::default(),
            last_error: None,
            first_run: true,
            enabled: true,
        }
    }

    /// Controller with the gains and heading constraints from `config`,
    /// stepping at the control-loop period
    pub fn from_config(config: &DriveConfig) -> Self {
        let period = config.loop_period();
        let pid = |g: &PidGains| PidController::new(g.kp, g.ki, g.kd, period);
        let mut controller = Self::new(
            pid(&config.translation),
            pid(&config.translation),
            ProfiledPidController::new(
                config.heading.kp,
                config.heading.ki,
                config.heading.kd,
                Constraints::new(
                    config.heading_constraints.max_velocity,
                    config.heading_constraints.max_acceleration,
                ),
                period,
            ),
        );
        controller.set_tolerance(config.tolerance);
        controller
    }

    pub fn set_tolerance(&mut self, tolerance: Tolerance) {
        self.tolerance = tolerance;
    }

    /// With feedback disabled only the velocity feedforward is produced
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Starts a new tracking operation from `heading`: the heading profile
    /// restarts at the measured heading and the position loops forget their
    /// history. `at_reference` reads false until the next `calculate`.
    pub fn reset(&mut self, heading: Rotation2d) {
        self.theta_controller.reset(heading.radians());
        self.x_controller.reset();
        self.y_controller.reset();
        self.last_error = None;
        self.first_run = false;
    }

    /// Whether the last computed error is inside the tolerance band
    pub fn at_reference(&self) -> bool {
        self.last_error.is_some_and(|e| {
            e.distance <= self.tolerance.position && e.heading.radians().abs() <= self.tolerance.heading
        })
    }

    /// Field-relative command driving `current` towards `target` while
    /// turning to `desired_heading`. `linear_velocity` is the reference speed
    /// along the target pose's heading (zero for a stationary goal).
    pub fn calculate(
        &mut self,
        current: Pose2d,
        target: Pose2d,
        linear_velocity: f64,
        desired_heading: Rotation2d,
    ) -> FieldSpeeds {
        if self.first_run {
            self.theta_controller.reset(current.rotation.radians());
            self.first_run = false;
        }

        let x_ff = linear_velocity * target.rotation.cos();
        let y_ff = linear_velocity * target.rotation.sin();

        let omega = self
            .theta_controller
            .calculate(current.rotation.radians(), desired_heading.radians());

        self.last_error = Some(TrackingError {
            distance: current.translation.distance(target.translation),
            heading: current.rotation.shortest_to(desired_heading),
        });

        if !self.enabled {
            return FieldSpeeds::new(x_ff, y_ff, omega);
        }

        let x_feedback = self.x_controller.calculate(current.x(), target.x());
        let y_feedback = self.y_controller.calculate(current.y(), target.y());

        FieldSpeeds::new(x_ff + x_feedback, y_ff + y_feedback, omega)
    }

    /// Same as `calculate` with the pose and speed taken from a trajectory sample
    pub fn calculate_trajectory(
        &mut self,
        current: Pose2d,
        state: &TrajectoryState,
        desired_heading: Rotation2d,
    ) -> FieldSpeeds {
        self.calculate(current, state.pose, state.velocity, desired_heading)
    }

    /// Signed heading error from the last `calculate`, wrapped to the
    /// smallest rotation
    pub fn heading_error(&self) -> Option<Rotation2d> {
        self.last_error.map(|e| e.heading)
    }

    /// Distance to the target from the last `calculate`
    pub fn position_error(&self) -> Option<f64> {
        self.last_error.map(|e| e.distance)
    }
}
