// Schedulable motion primitives
//
// A command is bound to the drive while it is active. The scheduler calls
// `initialize` once, then `execute` and `is_finished` every tick, then `end`
// exactly once, whether it finished or was superseded or cancelled.

mod drive;
mod drive_to_pose;
mod follow_trajectory;
mod scheduler;
mod supervision;

pub use drive::{DriveSpeeds, RunDrive};
pub use drive_to_pose::DriveToPose;
pub use follow_trajectory::FollowTrajectory;
pub use scheduler::CommandScheduler;
pub use supervision::{Outcome, Supervised, SupervisionHandle, Tracking};

use std::time::Duration;

use crate::config::DriveConfig;
use crate::controller::Tolerance;
use crate::drive::HolonomicDrive;
use crate::geometry::{Pose2d, Rotation2d};
use crate::trajectory::TrajectoryState;

pub trait Command<D: HolonomicDrive + ?Sized> {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Called once when the command becomes active. `now` is the time since
    /// the scheduler started.
    fn initialize(&mut self, _drive: &mut D, _now: Duration) {}

    /// Called once per control-loop tick while active
    fn execute(&mut self, drive: &mut D, now: Duration);

    /// Checked after every `execute`; most primitives never finish on their own
    fn is_finished(&mut self, _drive: &D, _now: Duration) -> bool {
        false
    }

    /// Called exactly once when the command stops being active
    fn end(&mut self, _drive: &mut D, _interrupted: bool) {}
}

/// Repeatedly drives the sampled speeds; see [`RunDrive`]
pub fn drive<S>(speeds: S) -> RunDrive<S>
where
    S: FnMut() -> DriveSpeeds,
{
    RunDrive::new(speeds)
}

/// Tracks a live target pose until superseded; see [`DriveToPose`]
pub fn drive_to_pose<T>(target: T, config: &DriveConfig) -> DriveToPose<T>
where
    T: FnMut() -> Pose2d,
{
    DriveToPose::new(target, config)
}

/// Tracks a target pose until within `tolerance`, or `timeout` elapses, or
/// the returned handle cancels it. Always stops the drive on the way out.
pub fn drive_to_pose_within<T>(
    target: T,
    tolerance: Tolerance,
    timeout: Duration,
    config: &DriveConfig,
) -> Supervised<DriveToPose<T>>
where
    T: FnMut() -> Pose2d,
{
    Supervised::new(DriveToPose::new(target, config), tolerance, timeout)
}

/// Follows a trajectory sample supplier until superseded; see [`FollowTrajectory`]
pub fn follow_trajectory<S, R>(states: S, rotation: R, config: &DriveConfig) -> FollowTrajectory<S, R>
where
    S: FnMut() -> TrajectoryState,
    R: FnMut() -> Rotation2d,
{
    FollowTrajectory::new(states, rotation, config)
}

/// Trajectory following bounded by tolerance, timeout and cancellation
pub fn follow_trajectory_within<S, R>(
    states: S,
    rotation: R,
    tolerance: Tolerance,
    timeout: Duration,
    config: &DriveConfig,
) -> Supervised<FollowTrajectory<S, R>>
where
    S: FnMut() -> TrajectoryState,
    R: FnMut() -> Rotation2d,
{
    Supervised::new(FollowTrajectory::new(states, rotation, config), tolerance, timeout)
}
