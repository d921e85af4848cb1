// 50 Hz control loop with watchdog
// Note: a watchdog is a safety mechanism that triggers a safe action if something goes wrong
// Eg. without it if teleop crashes and stops sending commands, the runtime will keep running and sending commands to the robot

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use tokio::time::interval;
use tracing::{info, warn};

use crate::command::{self, CommandScheduler, DriveSpeeds, SupervisionHandle};
use crate::config::{
    CMD_TIMEOUT, DriveConfig, LOOP_HZ, LOOP_PERIOD, TOPIC_CMD_BASE, TOPIC_CMD_CANCEL,
    TOPIC_CMD_GOAL, TOPIC_CMD_POSE_RESET, TOPIC_HEALTH, TOPIC_POSE, TOPIC_RT_BASE, TOPIC_VISION,
    TOPIC_WHEELS,
};
use crate::controller::Tolerance;
use crate::drive::{HolonomicDrive, LeKiwiBase};
use crate::geometry::Pose2d;
use crate::messages::{
    BaseActuation, BaseCommand, GoalCommand, PoseMessage, RuntimeHealth, VisionMeasurement,
    WheelFeedback,
};

/// Latest teleop input, shared with the default drive command
#[derive(Debug, Default)]
struct TeleopInput {
    latest: Option<BaseCommand>,
    received_at: Duration,
    stale: bool,
}

impl TeleopInput {
    fn speeds(&self) -> DriveSpeeds {
        match self.latest {
            Some(cmd) if !self.stale => cmd.speeds(),
            _ => DriveSpeeds::stopped(),
        }
    }
}

pub struct Runtime {
    config: DriveConfig,
    scheduler: CommandScheduler<LeKiwiBase>,
    teleop: Rc<RefCell<TeleopInput>>,
    goal: Option<SupervisionHandle>,
    health: RuntimeHealth,
}

impl Runtime {
    pub fn new(config: DriveConfig, base: LeKiwiBase) -> Self {
        let teleop = Rc::new(RefCell::new(TeleopInput {
            stale: true, // Start stale until first cmd
            ..Default::default()
        }));

        let mut scheduler = CommandScheduler::new(base);
        let input = teleop.clone();
        scheduler.set_default_command(command::drive(move || input.borrow().speeds()));

        Self {
            config,
            scheduler,
            teleop,
            goal: None,
            health: RuntimeHealth::CmdStale,
        }
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    pub fn pose(&self) -> Pose2d {
        self.scheduler.drive().pose()
    }

    /// True while a goal holds the drive
    pub fn is_tracking(&self) -> bool {
        self.goal.is_some()
    }

    /// Process incoming teleop command. Any nonzero command takes the drive
    /// back from a running goal.
    pub fn on_command(&mut self, cmd: BaseCommand, now: Duration) {
        {
            let mut teleop = self.teleop.borrow_mut();
            teleop.latest = Some(cmd);
            teleop.received_at = now;
        }

        if self.goal.is_some() && !cmd.speeds().is_zero() {
            info!("Teleop input, abandoning goal");
            self.scheduler.cancel();
            self.goal = None;
        }
    }

    /// Starts driving to a goal, superseding teleop or a previous goal.
    /// Goals with a non-finite target or an unrepresentable timeout are
    /// dropped and whatever was running keeps running.
    pub fn on_goal(&mut self, goal: GoalCommand) {
        let target = goal.pose();
        if !(target.x().is_finite() && target.y().is_finite() && target.rotation.radians().is_finite()) {
            warn!("Dropping goal with non-finite target: {:?}", goal);
            return;
        }
        let tolerance = Tolerance {
            position: goal.tolerance_m.unwrap_or(self.config.tolerance.position),
            heading: goal
                .tolerance_deg
                .map_or(self.config.tolerance.heading, |deg| deg.to_radians().abs()),
        };
        let timeout_secs = goal.timeout_s.unwrap_or(self.config.goal_timeout_secs);
        let timeout = match Duration::try_from_secs_f64(timeout_secs.max(0.0)) {
            Ok(timeout) => timeout,
            Err(e) => {
                warn!("Dropping goal with timeout {}s: {}", timeout_secs, e);
                return;
            }
        };

        info!(
            "Goal ({:.3}, {:.3}, {:.1}°), tolerance {:.3} m / {:.1}°, timeout {:.1}s",
            target.x(),
            target.y(),
            target.rotation.degrees(),
            tolerance.position,
            tolerance.heading.to_degrees(),
            timeout.as_secs_f64()
        );

        let cmd = command::drive_to_pose_within(move || target, tolerance, timeout, &self.config);
        self.goal = Some(cmd.handle());
        self.scheduler.schedule(cmd);
    }

    /// Asks the running goal to stop on the next tick
    pub fn on_cancel(&mut self) {
        match &self.goal {
            Some(handle) => handle.cancel(),
            None => info!("Cancel received with no active goal"),
        }
    }

    pub fn on_vision(&mut self, vision: &VisionMeasurement) {
        self.scheduler
            .drive_mut()
            .add_vision_measurement(Pose2d::from(&vision.pose), vision.timestamp);
    }

    pub fn on_wheel_feedback(&mut self, wheels: &WheelFeedback) {
        self.scheduler.drive_mut().on_wheel_feedback(wheels);
    }

    pub fn on_pose_reset(&mut self, pose: &PoseMessage) {
        self.scheduler.drive_mut().set_pose(Pose2d::from(pose));
    }

    /// One control tick: watchdog, odometry, active command. Returns the
    /// actuation to publish.
    pub fn step(&mut self, now: Duration) -> BaseActuation {
        self.check_watchdog(now);

        self.scheduler.drive_mut().update(LOOP_PERIOD.as_secs_f64());
        self.scheduler.run(now);

        if let Some(outcome) = self.goal.as_ref().and_then(|h| h.outcome()) {
            info!("Goal finished: {:?}", outcome);
            self.goal = None;
        }

        self.health = if self.goal.is_some() {
            RuntimeHealth::Tracking
        } else if self.teleop.borrow().stale {
            RuntimeHealth::CmdStale
        } else {
            RuntimeHealth::Ok
        };

        self.actuation()
    }

    pub fn actuation(&self) -> BaseActuation {
        let base = self.scheduler.drive();
        BaseActuation::new(&base.actuation(), base.wheel_targets())
    }

    /// Ends whatever is running and leaves the base commanded to zero
    pub fn shutdown(&mut self) -> BaseActuation {
        self.scheduler.cancel();
        self.scheduler.drive_mut().stop();
        self.goal = None;
        self.actuation()
    }

    fn check_watchdog(&mut self, now: Duration) {
        let mut teleop = self.teleop.borrow_mut();
        let cmd_age = now.saturating_sub(teleop.received_at);
        let stale = teleop.latest.is_none() || cmd_age > CMD_TIMEOUT;

        if stale && !teleop.stale {
            // Watchdog triggered - stop the robot
            warn!("Command stale ({:?} old), stopping robot", cmd_age);
        }
        teleop.stale = stale;
    }
}

fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, serde_json::Error> {
    serde_json::from_slice(payload)
}

pub async fn run(
    config: DriveConfig,
    loopback: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let sub_cmd = session.declare_subscriber(TOPIC_CMD_BASE).await?;
    let sub_goal = session.declare_subscriber(TOPIC_CMD_GOAL).await?;
    let sub_cancel = session.declare_subscriber(TOPIC_CMD_CANCEL).await?;
    let sub_pose_reset = session.declare_subscriber(TOPIC_CMD_POSE_RESET).await?;
    let sub_vision = session.declare_subscriber(TOPIC_VISION).await?;
    let sub_wheels = session.declare_subscriber(TOPIC_WHEELS).await?;
    let pub_actuation = session.declare_publisher(TOPIC_RT_BASE).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;
    let pub_pose = session.declare_publisher(TOPIC_POSE).await?;

    let base = if loopback {
        LeKiwiBase::loopback(&config)
    } else {
        LeKiwiBase::new(&config)
    };
    info!(
        "Chassis limits: {:.3} m/s, {:.2} rad/s",
        base.chassis_max_linear_velocity(),
        base.chassis_max_angular_velocity()
    );
    let mut runtime = Runtime::new(config, base);
    let mut tick = interval(LOOP_PERIOD);
    let started = Instant::now();

    info!(
        "Runtime started: {}Hz loop, {}ms watchdog timeout",
        LOOP_HZ,
        CMD_TIMEOUT.as_millis()
    );
    info!(
        "Subscribed to: {}, {}, {}, {}, {}, {}",
        TOPIC_CMD_BASE, TOPIC_CMD_GOAL, TOPIC_CMD_CANCEL, TOPIC_CMD_POSE_RESET, TOPIC_VISION, TOPIC_WHEELS
    );
    info!("Publishing to: {}, {}, {}", TOPIC_RT_BASE, TOPIC_HEALTH, TOPIC_POSE);

    // Single signal future for the whole loop
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = tick.tick() => {}
            _ = &mut ctrl_c => {
                info!("Shutting down, stopping base");
                let actuation = runtime.shutdown();
                pub_actuation.put(serde_json::to_string(&actuation)?).await?;
                return Ok(());
            }
        }
        let now = started.elapsed();

        // 1. Drain all pending messages (non-blocking), in arrival order per topic
        while let Ok(Some(sample)) = sub_wheels.try_recv() {
            match decode::<WheelFeedback>(&sample.payload().to_bytes()) {
                Ok(wheels) => runtime.on_wheel_feedback(&wheels),
                Err(e) => warn!("Failed to parse wheel feedback: {}", e),
            }
        }
        while let Ok(Some(sample)) = sub_vision.try_recv() {
            match decode::<VisionMeasurement>(&sample.payload().to_bytes()) {
                Ok(vision) => runtime.on_vision(&vision),
                Err(e) => warn!("Failed to parse vision measurement: {}", e),
            }
        }
        while let Ok(Some(sample)) = sub_pose_reset.try_recv() {
            match decode::<PoseMessage>(&sample.payload().to_bytes()) {
                Ok(pose) => runtime.on_pose_reset(&pose),
                Err(e) => warn!("Failed to parse pose reset: {}", e),
            }
        }
        while let Ok(Some(sample)) = sub_goal.try_recv() {
            match decode::<GoalCommand>(&sample.payload().to_bytes()) {
                Ok(goal) => runtime.on_goal(goal),
                Err(e) => warn!("Failed to parse goal: {}", e),
            }
        }
        while let Ok(Some(_)) = sub_cancel.try_recv() {
            runtime.on_cancel();
        }
        while let Ok(Some(sample)) = sub_cmd.try_recv() {
            match decode::<BaseCommand>(&sample.payload().to_bytes()) {
                Ok(cmd) => runtime.on_command(cmd, now),
                Err(e) => warn!("Failed to parse command: {}", e),
            }
        }

        // 2. Run the active command (includes watchdog logic)
        let actuation = runtime.step(now);

        // 3. Publish actuation
        let actuation_json = serde_json::to_string(&actuation)?;
        pub_actuation.put(actuation_json).await?;

        // 4. Publish health and pose
        let health_json = serde_json::to_string(&runtime.health())?;
        pub_health.put(health_json).await?;
        let pose_json = serde_json::to_string(&PoseMessage::from(runtime.pose()))?;
        pub_pose.put(pose_json).await?;
    }
}
