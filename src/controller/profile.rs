// Trapezoidal motion profile: accelerate, cruise, decelerate

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    pub max_velocity: f64,
    pub max_acceleration: f64,
}

impl Constraints {
    pub fn new(max_velocity: f64, max_acceleration: f64) -> Self {
        Self {
            max_velocity,
            max_acceleration,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct State {
    pub position: f64,
    pub velocity: f64,
}

impl State {
    pub fn new(position: f64, velocity: f64) -> Self {
        Self { position, velocity }
    }

    fn scaled(&self, direction: f64) -> Self {
        Self::new(self.position * direction, self.velocity * direction)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TrapezoidProfile {
    constraints: Constraints,
}

impl TrapezoidProfile {
    pub fn new(constraints: Constraints) -> Self {
        Self { constraints }
    }

    /// State `t` seconds after `current` along the profile towards `goal`.
    pub fn calculate(&self, t: f64, current: State, goal: State) -> State {
        let max_v = self.constraints.max_velocity;
        let max_a = self.constraints.max_acceleration;

        // Work in the frame where the move is positive
        let direction = if current.position > goal.position {
            -1.0
        } else {
            1.0
        };
        let mut current = current.scaled(direction);
        let goal = goal.scaled(direction);

        current.velocity = current.velocity.min(max_v);

        // Distance that would have been covered speeding up from (or slowing
        // down to) rest, so the trapezoid can be computed as if from zero
        let cutoff_begin = current.velocity / max_a;
        let cutoff_dist_begin = cutoff_begin * cutoff_begin * max_a / 2.0;
        let cutoff_end = goal.velocity / max_a;
        let cutoff_dist_end = cutoff_end * cutoff_end * max_a / 2.0;

        let full_trapezoid_dist =
            cutoff_dist_begin + (goal.position - current.position) + cutoff_dist_end;
        let mut acceleration_time = max_v / max_a;
        let mut full_speed_dist = full_trapezoid_dist - acceleration_time * acceleration_time * max_a;

        // Triangle profile: never reaches cruise speed
        if full_speed_dist < 0.0 {
            acceleration_time = (full_trapezoid_dist / max_a).sqrt();
            full_speed_dist = 0.0;
        }

        let end_accel = acceleration_time - cutoff_begin;
        let end_full_speed = end_accel + full_speed_dist / max_v;
        let end_decel = end_full_speed + acceleration_time - cutoff_end;

        let mut result = current;
        if t < end_accel {
            result.velocity += t * max_a;
            result.position += (current.velocity + t * max_a / 2.0) * t;
        } else if t < end_full_speed {
            result.velocity = max_v;
            result.position +=
                (current.velocity + end_accel * max_a / 2.0) * end_accel + max_v * (t - end_accel);
        } else if t <= end_decel {
            let time_left = end_decel - t;
            result.velocity = goal.velocity + time_left * max_a;
            result.position = goal.position - (goal.velocity + time_left * max_a / 2.0) * time_left;
        } else {
            result = goal;
        }

        result.scaled(direction)
    }
}
