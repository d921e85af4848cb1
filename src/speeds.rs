// Chassis velocity with its reference frame carried in the type
//
// A robot-relative command can never be handed to something expecting a
// field-relative one: converting requires the current heading and goes
// through `to_field_relative` / `to_robot_relative`.

use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::ops::{Add, Mul, Neg};

use crate::geometry::{Pose2d, Rotation2d, Transform2d, Translation2d};

/// Velocity measured along the robot's own forward (x) and left (y) axes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotRelative;

/// Velocity measured along the fixed field axes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRelative;

/// Linear velocity (m/s) along two orthogonal axes plus angular velocity
/// (rad/s, counter-clockwise positive) in frame `F`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChassisSpeeds<F> {
    pub vx: f64,
    pub vy: f64,
    pub omega: f64,
    #[serde(skip)]
    frame: PhantomData<F>,
}

pub type RobotSpeeds = ChassisSpeeds<RobotRelative>;
pub type FieldSpeeds = ChassisSpeeds<FieldRelative>;

impl<F> ChassisSpeeds<F> {
    /// The canonical "stopped" command
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(vx: f64, vy: f64, omega: f64) -> Self {
        Self {
            vx,
            vy,
            omega,
            frame: PhantomData,
        }
    }

    /// Exact comparison against zero on all three axes
    pub fn is_zero(&self) -> bool {
        self.vx == 0.0 && self.vy == 0.0 && self.omega == 0.0
    }

    fn rotated(&self, rotation: Rotation2d) -> (f64, f64) {
        let v = Translation2d::new(self.vx, self.vy).rotate_by(rotation);
        (v.x, v.y)
    }
}

impl RobotSpeeds {
    /// Re-expresses the command in the field frame given the robot heading
    pub fn to_field_relative(&self, heading: Rotation2d) -> FieldSpeeds {
        let (vx, vy) = self.rotated(heading);
        FieldSpeeds::new(vx, vy, self.omega)
    }

    /// Compensates for the command being held for `dt` seconds while the
    /// heading keeps turning under `omega`.
    ///
    /// The returned command, held constant for `dt`, ends at the pose the
    /// continuous command was aiming for: the pose reached by moving
    /// `(vx, vy, omega) * dt` is mapped back through `Pose2d::log` and the
    /// resulting twist is divided by `dt`. A zero command or a non-positive
    /// `dt` is returned unchanged.
    pub fn discretize(&self, dt: f64) -> RobotSpeeds {
        if self.is_zero() || dt <= 0.0 {
            return *self;
        }
        let desired_delta = Pose2d::ORIGIN.plus(Transform2d::new(
            Translation2d::new(self.vx * dt, self.vy * dt),
            Rotation2d::from_radians(self.omega * dt),
        ));
        let twist = Pose2d::ORIGIN.log(desired_delta);
        RobotSpeeds::new(twist.dx / dt, twist.dy / dt, twist.dtheta / dt)
    }
}

impl FieldSpeeds {
    /// Re-expresses the command in the robot frame given the robot heading
    pub fn to_robot_relative(&self, heading: Rotation2d) -> RobotSpeeds {
        let (vx, vy) = self.rotated(-heading);
        RobotSpeeds::new(vx, vy, self.omega)
    }
}

impl<F> Add for ChassisSpeeds<F> {
    type Output = ChassisSpeeds<F>;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.vx + rhs.vx, self.vy + rhs.vy, self.omega + rhs.omega)
    }
}

impl<F> Neg for ChassisSpeeds<F> {
    type Output = ChassisSpeeds<F>;

    fn neg(self) -> Self {
        Self::new(-self.vx, -self.vy, -self.omega)
    }
}

impl<F> Mul<f64> for ChassisSpeeds<F> {
    type Output = ChassisSpeeds<F>;

    fn mul(self, scalar: f64) -> Self {
        Self::new(self.vx * scalar, self.vy * scalar, self.omega * scalar)
    }
}
