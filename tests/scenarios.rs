// End-to-end motion scenarios on a loopback LeKiwi base

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use approx::assert_abs_diff_eq;

use lekiwi_holonomic_drive::command::{self, Command, CommandScheduler, Outcome};
use lekiwi_holonomic_drive::config::{DriveConfig, LOOP_PERIOD};
use lekiwi_holonomic_drive::controller::Tolerance;
use lekiwi_holonomic_drive::drive::{HolonomicDrive, LeKiwiBase};
use lekiwi_holonomic_drive::geometry::{Pose2d, Rotation2d, Translation2d};
use lekiwi_holonomic_drive::speeds::{FieldSpeeds, RobotSpeeds};
use lekiwi_holonomic_drive::trajectory::Trajectory;

/// Loopback base that counts stop requests and raw commands issued after them
struct CountingBase {
    base: LeKiwiBase,
    stops: usize,
    commands_after_stop: usize,
}

impl CountingBase {
    fn new(config: &DriveConfig) -> Self {
        Self {
            base: LeKiwiBase::loopback(config),
            stops: 0,
            commands_after_stop: 0,
        }
    }

    fn tick(&mut self) {
        self.base.update(LOOP_PERIOD.as_secs_f64());
    }
}

impl HolonomicDrive for CountingBase {
    fn run_raw_chassis_speeds(&mut self, speeds: RobotSpeeds) {
        if self.stops > 0 && !speeds.is_zero() {
            self.commands_after_stop += 1;
        }
        self.base.run_raw_chassis_speeds(speeds);
    }
    fn pose(&self) -> Pose2d {
        self.base.pose()
    }
    fn set_pose(&mut self, pose: Pose2d) {
        self.base.set_pose(pose);
    }
    fn measured_chassis_speeds_robot_relative(&self) -> RobotSpeeds {
        self.base.measured_chassis_speeds_robot_relative()
    }
    fn chassis_max_linear_velocity(&self) -> f64 {
        self.base.chassis_max_linear_velocity()
    }
    fn chassis_max_angular_velocity(&self) -> f64 {
        self.base.chassis_max_angular_velocity()
    }
    fn add_vision_measurement(&mut self, vision_pose: Pose2d, timestamp: f64) {
        self.base.add_vision_measurement(vision_pose, timestamp);
    }
    fn stop(&mut self) {
        self.stops += 1;
        self.base.stop();
    }
}

/// Steps the scheduler at the loop rate until it is idle or `limit` passes.
/// Returns the elapsed time.
fn run_until_idle(scheduler: &mut CommandScheduler<CountingBase>, limit: Duration) -> Duration {
    let mut now = Duration::ZERO;
    while scheduler.is_busy() && now <= limit {
        scheduler.drive_mut().tick();
        scheduler.run(now);
        now += LOOP_PERIOD;
    }
    now
}

#[test]
fn test_drive_to_pose_within_reaches_target() {
    let config = DriveConfig::default();
    let mut scheduler = CommandScheduler::new(CountingBase::new(&config));
    let target = Pose2d::new(1.0, 0.0, Rotation2d::ZERO);

    let goal = command::drive_to_pose_within(
        move || target,
        Tolerance::new(0.05, Rotation2d::from_degrees(2.0)),
        Duration::from_secs(5),
        &config,
    );
    let handle = goal.handle();
    scheduler.schedule(goal);

    let elapsed = run_until_idle(&mut scheduler, Duration::from_secs(6));

    assert_eq!(handle.outcome(), Some(Outcome::Reached));
    assert!(elapsed < Duration::from_secs(5), "took {:?}", elapsed);

    let drive = scheduler.drive();
    assert_eq!(drive.stops, 1);
    assert_eq!(drive.commands_after_stop, 0);
    assert!(drive.base.actuation().is_zero());
    assert_abs_diff_eq!(drive.pose().x(), 1.0, epsilon = 0.08);
    assert_abs_diff_eq!(drive.pose().y(), 0.0, epsilon = 1e-9);
}

#[test]
fn test_drive_to_pose_within_times_out() {
    let config = DriveConfig::default();
    let mut scheduler = CommandScheduler::new(CountingBase::new(&config));
    let target = Pose2d::new(10.0, 0.0, Rotation2d::from_degrees(180.0));

    let goal = command::drive_to_pose_within(
        move || target,
        Tolerance::default(),
        Duration::from_millis(200),
        &config,
    );
    let handle = goal.handle();
    scheduler.schedule(goal);

    let elapsed = run_until_idle(&mut scheduler, Duration::from_secs(2));

    assert_eq!(handle.outcome(), Some(Outcome::TimedOut));
    assert!(elapsed <= Duration::from_millis(260), "took {:?}", elapsed);
    assert_eq!(scheduler.drive().stops, 1);
    assert!(scheduler.drive().base.actuation().is_zero());
}

#[test]
fn test_cancel_stops_once_and_issues_nothing_after() {
    let config = DriveConfig::default();
    let mut scheduler = CommandScheduler::new(CountingBase::new(&config));
    let target = Pose2d::new(3.0, 1.0, Rotation2d::from_degrees(45.0));

    let goal = command::drive_to_pose_within(move || target, Tolerance::default(), Duration::from_secs(5), &config);
    let handle = goal.handle();
    scheduler.schedule(goal);

    let mut now = Duration::ZERO;
    for _ in 0..10 {
        scheduler.drive_mut().tick();
        scheduler.run(now);
        now += LOOP_PERIOD;
    }
    assert!(!scheduler.drive().base.actuation().is_zero());

    handle.cancel();
    run_until_idle(&mut scheduler, Duration::from_secs(1));

    assert_eq!(handle.outcome(), Some(Outcome::Cancelled));
    assert_eq!(scheduler.drive().stops, 1);
    assert_eq!(scheduler.drive().commands_after_stop, 0);

    // Cancelling again after the end is harmless
    handle.cancel();
    assert_eq!(scheduler.drive().stops, 1);
}

#[test]
fn test_superseding_goal_stops_previous_once() {
    let config = DriveConfig::default();
    let mut scheduler = CommandScheduler::new(CountingBase::new(&config));

    let first = command::drive_to_pose_within(
        || Pose2d::new(2.0, 0.0, Rotation2d::ZERO),
        Tolerance::default(),
        Duration::from_secs(5),
        &config,
    );
    let first_handle = first.handle();
    scheduler.schedule(first);
    scheduler.run(Duration::ZERO);

    let second = command::drive_to_pose_within(
        || Pose2d::new(0.0, 0.5, Rotation2d::ZERO),
        Tolerance::default(),
        Duration::from_secs(5),
        &config,
    );
    scheduler.schedule(second);

    assert_eq!(first_handle.outcome(), Some(Outcome::Cancelled));
    assert_eq!(scheduler.drive().stops, 1);
}

#[test]
fn test_restart_has_no_heading_spike() {
    let config = DriveConfig::default();
    let mut drive = LeKiwiBase::loopback(&config);
    let target = Pose2d::new(0.0, 0.0, Rotation2d::from_degrees(90.0));
    let mut goal = command::drive_to_pose_within(move || target, Tolerance::default(), Duration::from_millis(300), &config);

    // Time out mid-turn, leaving the heading profile moving
    let mut now = Duration::ZERO;
    goal.initialize(&mut drive, now);
    loop {
        drive.update(LOOP_PERIOD.as_secs_f64());
        goal.execute(&mut drive, now);
        if goal.is_finished(&drive, now) {
            goal.end(&mut drive, false);
            break;
        }
        now += LOOP_PERIOD;
    }
    assert_eq!(goal.handle().outcome(), Some(Outcome::TimedOut));

    // Already facing the target on restart: nothing to turn
    drive.set_pose(target);
    drive.update(LOOP_PERIOD.as_secs_f64());
    goal.initialize(&mut drive, now);
    goal.execute(&mut drive, now);
    assert_abs_diff_eq!(drive.actuation().omega, 0.0, epsilon = 1e-9);
}

#[test]
fn test_follow_trajectory_ends_near_final_sample() {
    let config = DriveConfig::default();
    let mut scheduler = CommandScheduler::new(CountingBase::new(&config));
    let trajectory = Trajectory::straight_line(Translation2d::ZERO, Translation2d::new(0.5, 0.25), 0.2, 0.02);
    let total = trajectory.total_time();

    let clock = Rc::new(Cell::new(0.0));
    let time = clock.clone();
    scheduler.schedule(command::follow_trajectory(
        move || trajectory.sample(time.get()),
        || Rotation2d::from_degrees(30.0),
        &config,
    ));

    let mut now = Duration::ZERO;
    while now.as_secs_f64() < total + 2.0 {
        clock.set(now.as_secs_f64());
        scheduler.drive_mut().tick();
        scheduler.run(now);
        now += LOOP_PERIOD;
    }

    let pose = scheduler.drive().pose();
    assert_abs_diff_eq!(pose.x(), 0.5, epsilon = 0.02);
    assert_abs_diff_eq!(pose.y(), 0.25, epsilon = 0.02);
    assert_abs_diff_eq!(pose.rotation.degrees(), 30.0, epsilon = 1.0);
}

/// Runs a supervised trajectory with the sample clock tied to loop time.
/// Returns the outcome and the trajectory time at which it ended.
fn run_supervised_trajectory(
    scheduler: &mut CommandScheduler<CountingBase>,
    trajectory: Trajectory,
    tolerance: Tolerance,
    timeout: Duration,
) -> (Option<Outcome>, f64) {
    let clock = Rc::new(Cell::new(0.0));
    let time = clock.clone();
    let goal = command::follow_trajectory_within(
        move || trajectory.sample(time.get()),
        || Rotation2d::ZERO,
        tolerance,
        timeout,
        &DriveConfig::default(),
    );
    let handle = goal.handle();
    scheduler.schedule(goal);

    let mut now = Duration::ZERO;
    while scheduler.is_busy() && now < Duration::from_secs(10) {
        clock.set(now.as_secs_f64());
        scheduler.drive_mut().tick();
        scheduler.run(now);
        now += LOOP_PERIOD;
    }
    (handle.outcome(), clock.get())
}

#[test]
fn test_follow_trajectory_within_reaches_final_sample() {
    let config = DriveConfig::default();
    let mut scheduler = CommandScheduler::new(CountingBase::new(&config));
    // Start well off the path so the error cannot close before the end
    scheduler.drive_mut().set_pose(Pose2d::new(0.0, -0.3, Rotation2d::ZERO));
    let end = Translation2d::new(0.2, 0.0);
    let trajectory = Trajectory::straight_line(Translation2d::ZERO, end, 0.2, 0.02);
    let total = trajectory.total_time();

    let (outcome, ended_at) = run_supervised_trajectory(
        &mut scheduler,
        trajectory,
        Tolerance::new(0.01, Rotation2d::from_degrees(2.0)),
        Duration::from_secs(8),
    );

    assert_eq!(outcome, Some(Outcome::Reached));
    assert!(ended_at >= total, "ended at {} of {}", ended_at, total);

    let drive = scheduler.drive();
    assert_eq!(drive.stops, 1);
    assert_eq!(drive.commands_after_stop, 0);
    assert!(drive.base.actuation().is_zero());
    assert_abs_diff_eq!(drive.pose().x(), end.x, epsilon = 0.02);
    assert_abs_diff_eq!(drive.pose().y(), end.y, epsilon = 0.02);
}

#[test]
fn test_follow_trajectory_within_times_out() {
    let config = DriveConfig::default();
    let mut scheduler = CommandScheduler::new(CountingBase::new(&config));
    scheduler.drive_mut().set_pose(Pose2d::new(0.0, -0.3, Rotation2d::ZERO));
    let trajectory = Trajectory::straight_line(Translation2d::ZERO, Translation2d::new(2.0, 0.0), 0.2, 0.02);

    let (outcome, ended_at) = run_supervised_trajectory(
        &mut scheduler,
        trajectory,
        Tolerance::new(0.01, Rotation2d::from_degrees(2.0)),
        Duration::from_millis(500),
    );

    assert_eq!(outcome, Some(Outcome::TimedOut));
    assert_abs_diff_eq!(ended_at, 0.5, epsilon = 1e-9);
    assert_eq!(scheduler.drive().stops, 1);
    assert!(scheduler.drive().base.actuation().is_zero());
}

#[test]
fn test_frame_round_trip() {
    let heading = Rotation2d::from_degrees(-135.0);
    let field = FieldSpeeds::new(0.3, -0.7, 1.2);
    let back = field.to_robot_relative(heading).to_field_relative(heading);
    assert_abs_diff_eq!(back.vx, field.vx, epsilon = 1e-12);
    assert_abs_diff_eq!(back.vy, field.vy, epsilon = 1e-12);
    assert_abs_diff_eq!(back.omega, field.omega, epsilon = 1e-12);
}

#[test]
fn test_zero_command_stays_zero() {
    assert!(RobotSpeeds::ZERO.discretize(LOOP_PERIOD.as_secs_f64()).is_zero());
    assert!(FieldSpeeds::ZERO.to_robot_relative(Rotation2d::from_degrees(33.0)).is_zero());
}

#[test]
fn test_heading_error_takes_short_way_round() {
    let error = Rotation2d::from_degrees(170.0).shortest_to(Rotation2d::from_degrees(-170.0));
    assert_abs_diff_eq!(error.degrees(), 20.0, epsilon = 1e-9);
}

#[test]
fn test_look_ahead_uses_measured_velocity() {
    let config = DriveConfig::default();
    let mut drive = LeKiwiBase::loopback(&config);
    drive.run_raw_chassis_speeds(RobotSpeeds::new(0.1, 0.0, 0.0));
    // Zero-length update only latches the echoed velocity
    drive.update(0.0);

    let compensated = drive.pose_with_velocity_compensation(0.1, 0.05);
    assert_abs_diff_eq!(compensated.x(), 0.01, epsilon = 1e-12);
    assert_abs_diff_eq!(compensated.y(), 0.0, epsilon = 1e-12);
    assert_eq!(drive.pose(), Pose2d::ORIGIN);
}
