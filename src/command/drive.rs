use std::time::Duration;

use super::Command;
use crate::drive::HolonomicDrive;
use crate::speeds::{FieldSpeeds, RobotSpeeds};

/// A velocity request together with the frame it was given in
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriveSpeeds {
    RobotCentric(RobotSpeeds),
    FieldCentric(FieldSpeeds),
}

impl DriveSpeeds {
    /// Builds the request from raw components and a field-centric switch
    pub fn new(vx: f64, vy: f64, omega: f64, field_centric: bool) -> Self {
        if field_centric {
            Self::FieldCentric(FieldSpeeds::new(vx, vy, omega))
        } else {
            Self::RobotCentric(RobotSpeeds::new(vx, vy, omega))
        }
    }

    pub fn stopped() -> Self {
        Self::RobotCentric(RobotSpeeds::ZERO)
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Self::RobotCentric(s) => s.is_zero(),
            Self::FieldCentric(s) => s.is_zero(),
        }
    }
}

/// Samples a velocity request every tick and runs it in the requested frame.
/// Never finishes on its own; it must be superseded or cancelled.
pub struct RunDrive<S> {
    speeds: S,
}

impl<S> RunDrive<S>
where
    S: FnMut() -> DriveSpeeds,
{
    pub fn new(speeds: S) -> Self {
        Self { speeds }
    }
}

impl<D, S> Command<D> for RunDrive<S>
where
    D: HolonomicDrive + ?Sized,
    S: FnMut() -> DriveSpeeds,
{
    fn name(&self) -> &'static str {
        "drive"
    }

    fn execute(&mut self, drive: &mut D, _now: Duration) {
        match (self.speeds)() {
            DriveSpeeds::FieldCentric(speeds) => drive.run_field_centric_chassis_speeds(speeds),
            DriveSpeeds::RobotCentric(speeds) => drive.run_robot_centric_chassis_speeds(speeds),
        }
    }
}
