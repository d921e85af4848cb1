use std::time::Duration;

use super::{Command, Tracking};
use crate::config::DriveConfig;
use crate::controller::{HolonomicDriveController, Tolerance};
use crate::drive::HolonomicDrive;
use crate::geometry::Pose2d;

/// Drives towards a target pose that may change every tick.
///
/// Each tick the current pose is extrapolated by the configured look-ahead,
/// the controller is evaluated against the live target and the field-relative
/// result is driven. The heading loop is reset to the measured heading on
/// initialize, so a previous move's residual error cannot cause an initial
/// spin. Never finishes on its own; wrap it in [`super::Supervised`] for that.
pub struct DriveToPose<T> {
    target: T,
    controller: HolonomicDriveController,
    translation_look_ahead: f64,
    rotation_look_ahead: f64,
}

impl<T> DriveToPose<T>
where
    T: FnMut() -> Pose2d,
{
    pub fn new(target: T, config: &DriveConfig) -> Self {
        Self {
            target,
            controller: HolonomicDriveController::from_config(config),
            translation_look_ahead: config.translation_look_ahead,
            rotation_look_ahead: config.rotation_look_ahead,
        }
    }
}

impl<D, T> Command<D> for DriveToPose<T>
where
    D: HolonomicDrive + ?Sized,
    T: FnMut() -> Pose2d,
{
    fn name(&self) -> &'static str {
        "drive_to_pose"
    }

    fn initialize(&mut self, drive: &mut D, _now: Duration) {
        self.controller.reset(drive.facing());
    }

    fn execute(&mut self, drive: &mut D, _now: Duration) {
        let current =
            drive.pose_with_velocity_compensation(self.translation_look_ahead, self.rotation_look_ahead);
        let target = (self.target)();
        let speeds = self
            .controller
            .calculate(current, target, 0.0, target.rotation);
        drive.run_field_centric_chassis_speeds(speeds);
    }
}

impl<T> Tracking for DriveToPose<T> {
    fn set_tolerance(&mut self, tolerance: Tolerance) {
        self.controller.set_tolerance(tolerance);
    }

    fn at_reference(&self) -> bool {
        self.controller.at_reference()
    }
}
