//! Holonomic drivetrain control for the LeKiwi omniwheel base.
//!
//! Frame-typed chassis speeds, a pose-tracking controller, and motion
//! commands (teleop drive, drive-to-pose, trajectory following) that run on
//! any [`drive::HolonomicDrive`]. The [`runtime`] wires them to Zenoh at a
//! fixed loop rate.

pub mod command;
pub mod config;
pub mod controller;
pub mod drive;
pub mod geometry;
pub mod kinematics;
pub mod messages;
pub mod runtime;
pub mod speeds;
pub mod trajectory;
