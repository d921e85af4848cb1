// Discrete PID controller running at a fixed period

use crate::geometry::input_modulus;

#[derive(Debug, Clone)]
pub struct PidController {
    kp: f64,
    ki: f64,
    kd: f64,
    period: f64,

    continuous: Option<(f64, f64)>,
    integrator_range: (f64, f64),
    position_tolerance: f64,
    velocity_tolerance: f64,

    setpoint: f64,
    measurement: f64,
    position_error: f64,
    velocity_error: f64,
    prev_error: f64,
    total_error: f64,
    have_measurement: bool,
}

impl PidController {
    /// `period` is the time between `calculate` calls, in seconds.
    pub fn new(kp: f64, ki: f64, kd: f64, period: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            period,
            continuous: None,
            integrator_range: (-1.0, 1.0),
            position_tolerance: 0.05,
            velocity_tolerance: f64::INFINITY,
            setpoint: 0.0,
            measurement: 0.0,
            position_error: 0.0,
            velocity_error: 0.0,
            prev_error: 0.0,
            total_error: 0.0,
            have_measurement: false,
        }
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    /// Treats `min` and `max` as the same point, so the error is always taken
    /// the short way around (headings).
    pub fn enable_continuous_input(&mut self, min: f64, max: f64) {
        self.continuous = Some((min, max));
    }

    /// Bounds on the integral term's contribution to the output
    pub fn set_integrator_range(&mut self, min: f64, max: f64) {
        self.integrator_range = (min, max);
    }

    pub fn set_tolerance(&mut self, position: f64, velocity: f64) {
        self.position_tolerance = position;
        self.velocity_tolerance = velocity;
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    pub fn position_error(&self) -> f64 {
        self.position_error
    }

    pub fn velocity_error(&self) -> f64 {
        self.velocity_error
    }

    /// True once a measurement has been seen and both errors are inside tolerance
    pub fn at_setpoint(&self) -> bool {
        self.have_measurement
            && self.position_error.abs() < self.position_tolerance
            && self.velocity_error.abs() < self.velocity_tolerance
    }

    pub fn calculate(&mut self, measurement: f64, setpoint: f64) -> f64 {
        self.setpoint = setpoint;
        self.measurement = measurement;
        self.prev_error = self.position_error;
        let first = !self.have_measurement;
        self.have_measurement = true;

        self.update_error();
        self.velocity_error = if first {
            0.0
        } else {
            (self.position_error - self.prev_error) / self.period
        };

        if self.ki != 0.0 {
            self.total_error = (self.total_error + self.position_error * self.period).clamp(
                self.integrator_range.0 / self.ki,
                self.integrator_range.1 / self.ki,
            );
        }

        self.kp * self.position_error + self.ki * self.total_error + self.kd * self.velocity_error
    }

    /// Clears accumulated and previous error.
    pub fn reset(&mut self) {
        self.position_error = 0.0;
        self.prev_error = 0.0;
        self.total_error = 0.0;
        self.velocity_error = 0.0;
        self.have_measurement = false;
    }

    fn update_error(&mut self) {
        self.position_error = match self.continuous {
            Some((min, max)) => {
                let bound = (max - min) / 2.0;
                input_modulus(self.setpoint - self.measurement, -bound, bound)
            }
            None => self.setpoint - self.measurement,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_proportional_only() {
        let mut pid = PidController::new(2.0, 0.0, 0.0, 0.02);
        assert_eq!(pid.calculate(1.0, 3.0), 4.0);
        assert_eq!(pid.calculate(3.0, 3.0), 0.0);
    }

    #[test]
    fn test_continuous_input_takes_short_way() {
        let mut pid = PidController::new(1.0, 0.0, 0.0, 0.02);
        pid.enable_continuous_input(-PI, PI);

        let measurement = (-170.0f64).to_radians();
        let setpoint = 170.0f64.to_radians();
        let output = pid.calculate(measurement, setpoint);

        assert!((output + 20.0f64.to_radians()).abs() < 1e-9, "output {}", output);
    }

    #[test]
    fn test_first_call_has_no_derivative_kick() {
        let mut pid = PidController::new(0.0, 0.0, 1.0, 0.02);
        assert_eq!(pid.calculate(0.0, 10.0), 0.0);
        // Error shrinks from 10 to 8 over one period
        assert!((pid.calculate(2.0, 10.0) + 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_integrator_is_clamped() {
        let mut pid = PidController::new(0.0, 1.0, 0.0, 1.0);
        pid.set_integrator_range(-0.5, 0.5);
        for _ in 0..10 {
            pid.calculate(0.0, 1.0);
        }
        assert!((pid.calculate(0.0, 1.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut pid = PidController::new(1.0, 1.0, 1.0, 0.02);
        pid.set_tolerance(0.1, f64::INFINITY);
        pid.calculate(0.0, 0.05);
        assert!(pid.at_setpoint());

        pid.reset();
        assert!(!pid.at_setpoint());
        assert_eq!(pid.position_error(), 0.0);
    }
}
