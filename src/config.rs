// Loop rate, timeouts, topics, controller tuning
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::controller::Tolerance;
use crate::kinematics::{MAX_WHEEL_SPEED, OmniKinematics};

// Runtime loop frequency
pub const LOOP_HZ: u64 = 50;

// One control period; discretization and the runtime interval must agree on it
pub const LOOP_PERIOD: Duration = Duration::from_millis(1000 / LOOP_HZ);

// Command timeout for watchdog
pub const CMD_TIMEOUT: Duration = Duration::from_millis(250);

// Zenoh topics
pub const TOPIC_CMD_BASE: &str = "lekiwi/cmd/base"; // teleop velocity
pub const TOPIC_CMD_GOAL: &str = "lekiwi/cmd/goal"; // drive-to-pose requests
pub const TOPIC_CMD_CANCEL: &str = "lekiwi/cmd/cancel"; // abandon the active goal
pub const TOPIC_CMD_POSE_RESET: &str = "lekiwi/cmd/pose_reset"; // overwrite odometry
pub const TOPIC_VISION: &str = "lekiwi/state/vision"; // external pose fixes
pub const TOPIC_WHEELS: &str = "lekiwi/state/wheels"; // measured wheel velocities
pub const TOPIC_RT_BASE: &str = "lekiwi/rt/base"; // actuation
pub const TOPIC_HEALTH: &str = "lekiwi/state/health"; // health status
pub const TOPIC_POSE: &str = "lekiwi/state/pose"; // estimated pose

// Latency compensation: how far ahead the pose is extrapolated before it is
// fed to the tracking controller
pub const TRANSLATIONAL_LOOK_AHEAD_TIME: f64 = 0.1; // seconds
pub const ROTATIONAL_LOOK_AHEAD_TIME: f64 = 0.05; // seconds

// Default drive-to-pose timeout
pub const DEFAULT_GOAL_TIMEOUT_SECS: f64 = 5.0;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f64,
    #[serde(default)]
    pub ki: f64,
    #[serde(default)]
    pub kd: f64,
}

impl PidGains {
    pub const fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadingConstraints {
    pub max_velocity: f64,     // rad/s
    pub max_acceleration: f64, // rad/s²
}

/// Tunables for the drive and its motion primitives.
///
/// Every field has a default, so a config file only needs the values it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub translation: PidGains,
    pub heading: PidGains,
    pub heading_constraints: HeadingConstraints,
    pub translation_look_ahead: f64,
    pub rotation_look_ahead: f64,
    pub tolerance: Tolerance,
    pub goal_timeout_secs: f64,
    pub kinematics: OmniKinematics,
    pub max_wheel_speed: f64, // rad/s
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            translation: PidGains::new(2.0, 0.0, 0.0),
            heading: PidGains::new(3.0, 0.0, 0.0),
            heading_constraints: HeadingConstraints {
                max_velocity: std::f64::consts::PI,
                max_acceleration: 2.0 * std::f64::consts::PI,
            },
            translation_look_ahead: TRANSLATIONAL_LOOK_AHEAD_TIME,
            rotation_look_ahead: ROTATIONAL_LOOK_AHEAD_TIME,
            tolerance: Tolerance::default(),
            goal_timeout_secs: DEFAULT_GOAL_TIMEOUT_SECS,
            kinematics: OmniKinematics::default(),
            max_wheel_speed: MAX_WHEEL_SPEED,
        }
    }
}

impl DriveConfig {
    /// Loads a JSON config file; missing fields keep their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Control-loop period in seconds
    pub fn loop_period(&self) -> f64 {
        LOOP_PERIOD.as_secs_f64()
    }
}
