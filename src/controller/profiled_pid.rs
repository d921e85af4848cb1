// PID controller that tracks a trapezoid-profiled setpoint instead of
// jumping straight to the goal

use super::pid::PidController;
use super::profile::{Constraints, State, TrapezoidProfile};
use crate::geometry::input_modulus;

#[derive(Debug, Clone)]
pub struct ProfiledPidController {
    pid: PidController,
    constraints: Constraints,
    goal: State,
    setpoint: State,
    continuous: Option<(f64, f64)>,
}

impl ProfiledPidController {
    pub fn new(kp: f64, ki: f64, kd: f64, constraints: Constraints, period: f64) -> Self {
        Self {
            pid: PidController::new(kp, ki, kd, period),
            constraints,
            goal: State::default(),
            setpoint: State::default(),
            continuous: None,
        }
    }

    pub fn enable_continuous_input(&mut self, min: f64, max: f64) {
        self.pid.enable_continuous_input(min, max);
        self.continuous = Some((min, max));
    }

    pub fn set_tolerance(&mut self, position: f64, velocity: f64) {
        self.pid.set_tolerance(position, velocity);
    }

    pub fn goal(&self) -> State {
        self.goal
    }

    pub fn setpoint(&self) -> State {
        self.setpoint
    }

    pub fn position_error(&self) -> f64 {
        self.pid.position_error()
    }

    /// Restarts the profile from `measurement` at rest and clears the PID
    /// history, so the first output after a reset carries no stale error.
    pub fn reset(&mut self, measurement: f64) {
        self.reset_to(State::new(measurement, 0.0));
    }

    pub fn reset_to(&mut self, state: State) {
        self.pid.reset();
        self.setpoint = state;
    }

    pub fn calculate(&mut self, measurement: f64, goal: f64) -> f64 {
        self.goal = State::new(goal, 0.0);

        if let Some((min, max)) = self.continuous {
            // Pull goal and setpoint into the same turn as the measurement so
            // the profile never plans the long way around
            let bound = (max - min) / 2.0;
            let goal_min_distance = input_modulus(self.goal.position - measurement, -bound, bound);
            let setpoint_min_distance =
                input_modulus(self.setpoint.position - measurement, -bound, bound);
            self.goal.position = goal_min_distance + measurement;
            self.setpoint.position = setpoint_min_distance + measurement;
        }

        let profile = TrapezoidProfile::new(self.constraints);
        self.setpoint = profile.calculate(self.pid.period(), self.setpoint, self.goal);
        self.pid.calculate(measurement, self.setpoint.position)
    }
}
