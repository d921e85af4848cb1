// Define message types for the runtime
//
// Angular quantities on the wire are in degrees (deg/s for rates), matching
// the teleop tools; everything inside the crate is radians.

use serde::{Deserialize, Serialize};

use crate::command::DriveSpeeds;
use crate::geometry::{Pose2d, Rotation2d};
use crate::kinematics::WheelSpeeds;
use crate::speeds::RobotSpeeds;

// Command from teleop/scripts -> runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BaseCommand {
    pub x_vel: f64,     // m/s
    pub y_vel: f64,     // m/s
    pub theta_vel: f64, // deg/s
    #[serde(default)]
    pub field_centric: bool,
}

impl BaseCommand {
    pub fn speeds(&self) -> DriveSpeeds {
        DriveSpeeds::new(
            self.x_vel,
            self.y_vel,
            self.theta_vel.to_radians(),
            self.field_centric,
        )
    }
}

// Drive-to-pose request; unset fields fall back to the drive config
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GoalCommand {
    pub x: f64,
    pub y: f64,
    pub heading_deg: f64,
    #[serde(default)]
    pub tolerance_m: Option<f64>,
    #[serde(default)]
    pub tolerance_deg: Option<f64>,
    #[serde(default)]
    pub timeout_s: Option<f64>,
}

impl GoalCommand {
    pub fn pose(&self) -> Pose2d {
        Pose2d::new(self.x, self.y, Rotation2d::from_degrees(self.heading_deg))
    }
}

// Pose on the wire: pose resets in, estimated pose out
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseMessage {
    pub x: f64,
    pub y: f64,
    pub heading_deg: f64,
}

impl From<Pose2d> for PoseMessage {
    fn from(pose: Pose2d) -> Self {
        Self {
            x: pose.x(),
            y: pose.y(),
            heading_deg: pose.rotation.wrapped().degrees(),
        }
    }
}

impl From<&PoseMessage> for Pose2d {
    fn from(msg: &PoseMessage) -> Self {
        Pose2d::new(msg.x, msg.y, Rotation2d::from_degrees(msg.heading_deg))
    }
}

// Absolute pose fix from the camera pipeline
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VisionMeasurement {
    #[serde(flatten)]
    pub pose: PoseMessage,
    pub timestamp: f64, // seconds
}

// Measured wheel velocities from lekiwi-hw (rad/s)
pub type WheelFeedback = WheelSpeeds;

// Actuation output from runtime -> lekiwi-hw
// Has default values because we don't always have an actuation to send
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct BaseActuation {
    pub x_vel: f64,     // m/s, robot frame
    pub y_vel: f64,     // m/s, robot frame
    pub theta_vel: f64, // deg/s
    pub wheels: WheelSpeeds,
}

impl BaseActuation {
    pub fn new(speeds: &RobotSpeeds, wheels: WheelSpeeds) -> Self {
        Self {
            x_vel: speeds.vx,
            y_vel: speeds.vy,
            theta_vel: speeds.omega.to_degrees(),
            wheels,
        }
    }
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
    Tracking,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_command_defaults_to_robot_centric() {
        let cmd: BaseCommand =
            serde_json::from_str(r#"{"x_vel": 0.1, "y_vel": 0.0, "theta_vel": 90.0}"#).unwrap();
        match cmd.speeds() {
            DriveSpeeds::RobotCentric(s) => {
                assert_eq!(s.vx, 0.1);
                assert!((s.omega - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
            }
            other => panic!("expected robot-centric, got {:?}", other),
        }
    }

    #[test]
    fn test_goal_optional_fields() {
        let goal: GoalCommand = serde_json::from_str(r#"{"x": 1.0, "y": 2.0, "heading_deg": 45.0}"#).unwrap();
        assert!(goal.tolerance_m.is_none());
        assert!(goal.timeout_s.is_none());
        assert!((goal.pose().rotation.degrees() - 45.0).abs() < 1e-12);
    }

    #[test]
    fn test_vision_is_flat_on_the_wire() {
        let v: VisionMeasurement =
            serde_json::from_str(r#"{"x": 1.0, "y": 2.0, "heading_deg": 0.0, "timestamp": 3.5}"#).unwrap();
        assert_eq!(v.pose.x, 1.0);
        assert_eq!(v.timestamp, 3.5);
    }

    #[test]
    fn test_published_heading_is_wrapped() {
        let pose = Pose2d::new(1.0, 0.0, Rotation2d::from_degrees(450.0));
        let msg = PoseMessage::from(pose);
        assert!((msg.heading_deg - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_health_serialization() {
        assert_eq!(serde_json::to_string(&RuntimeHealth::CmdStale).unwrap(), "\"cmd_stale\"");
    }
}
