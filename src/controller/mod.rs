// Feedback controllers
//
// Provides:
// - Fixed-period PID with continuous (wrapped) input
// - Trapezoid motion profile and a PID that tracks it
// - Holonomic pose-tracking controller built from the above

mod holonomic;
pub mod pid;
pub mod profile;
pub mod profiled_pid;

pub use holonomic::{HolonomicDriveController, Tolerance};
pub use pid::PidController;
pub use profile::{Constraints, TrapezoidProfile};
pub use profiled_pid::ProfiledPidController;
