use std::time::Duration;

use super::{Command, Tracking};
use crate::config::DriveConfig;
use crate::controller::{HolonomicDriveController, Tolerance};
use crate::drive::HolonomicDrive;
use crate::geometry::Rotation2d;
use crate::trajectory::TrajectoryState;

/// Feeds one trajectory sample and desired heading per tick into the tracking
/// controller and drives the result. Stepping through the samples is up to
/// the supplier; this never finishes on its own.
pub struct FollowTrajectory<S, R> {
    states: S,
    rotation: R,
    controller: HolonomicDriveController,
    translation_look_ahead: f64,
    rotation_look_ahead: f64,
}

impl<S, R> FollowTrajectory<S, R>
where
    S: FnMut() -> TrajectoryState,
    R: FnMut() -> Rotation2d,
{
    pub fn new(states: S, rotation: R, config: &DriveConfig) -> Self {
        Self {
            states,
            rotation,
            controller: HolonomicDriveController::from_config(config),
            translation_look_ahead: config.translation_look_ahead,
            rotation_look_ahead: config.rotation_look_ahead,
        }
    }
}

impl<D, S, R> Command<D> for FollowTrajectory<S, R>
where
    D: HolonomicDrive + ?Sized,
    S: FnMut() -> TrajectoryState,
    R: FnMut() -> Rotation2d,
{
    fn name(&self) -> &'static str {
        "follow_trajectory"
    }

    fn initialize(&mut self, drive: &mut D, _now: Duration) {
        self.controller.reset(drive.facing());
    }

    fn execute(&mut self, drive: &mut D, _now: Duration) {
        let current =
            drive.pose_with_velocity_compensation(self.translation_look_ahead, self.rotation_look_ahead);
        let state = (self.states)();
        let heading = (self.rotation)();
        let speeds = self.controller.calculate_trajectory(current, &state, heading);
        drive.run_field_centric_chassis_speeds(speeds);
    }
}

impl<S, R> Tracking for FollowTrajectory<S, R> {
    fn set_tolerance(&mut self, tolerance: Tolerance) {
        self.controller.set_tolerance(tolerance);
    }

    fn at_reference(&self) -> bool {
        self.controller.at_reference()
    }
}
