// Time-indexed reference for trajectory following
//
// Generation happens elsewhere; this only holds the samples and interpolates
// between them so a per-tick supplier can ask for "the state at time t".

use serde::{Deserialize, Serialize};

use crate::geometry::{Pose2d, Rotation2d, Translation2d};

/// One sample of a pre-generated trajectory
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryState {
    /// Seconds since the start of the trajectory
    pub time: f64,
    /// Speed along the path (m/s)
    pub velocity: f64,
    /// Acceleration along the path (m/s²)
    pub acceleration: f64,
    /// Position, heading pointing along the direction of travel
    pub pose: Pose2d,
    /// Path curvature (rad/m)
    pub curvature: f64,
}

impl TrajectoryState {
    fn interpolate(&self, end: &TrajectoryState, t: f64) -> TrajectoryState {
        // Kinematic interpolation of distance travelled, then lerp along the
        // chord; good enough between densely spaced samples
        let time = lerp(self.time, end.time, t);
        let dt = time - self.time;

        let velocity = self.velocity + self.acceleration * dt;
        let travelled = self.velocity * dt + 0.5 * self.acceleration * dt * dt;
        let segment = self.pose.translation.distance(end.pose.translation);
        let fraction = if segment > 0.0 {
            (travelled / segment).clamp(0.0, 1.0)
        } else {
            t
        };

        let translation = self.pose.translation
            + (end.pose.translation - self.pose.translation) * fraction;
        let rotation = self.pose.rotation + self.pose.rotation.shortest_to(end.pose.rotation) * fraction;

        TrajectoryState {
            time,
            velocity,
            acceleration: self.acceleration,
            pose: Pose2d {
                translation,
                rotation,
            },
            curvature: lerp(self.curvature, end.curvature, fraction),
        }
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Samples ordered by time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    states: Vec<TrajectoryState>,
}

impl Trajectory {
    /// Sorts the samples by time
    pub fn new(mut states: Vec<TrajectoryState>) -> Self {
        states.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { states }
    }

    /// Straight line from `start` to `end` at constant `speed`, sampled every
    /// `dt`. A non-positive or non-finite `dt` yields just the two endpoints.
    pub fn straight_line(start: Translation2d, end: Translation2d, speed: f64, dt: f64) -> Self {
        let length = start.distance(end);
        let heading = {
            let d = end - start;
            Rotation2d::from_radians(d.y.atan2(d.x))
        };
        let duration = if speed > 0.0 { length / speed } else { 0.0 };
        let dt = if dt > 0.0 && dt.is_finite() { dt } else { duration.max(f64::MIN_POSITIVE) };
        let steps = (duration / dt).ceil().max(1.0) as usize;

        let states = (0..=steps)
            .map(|i| {
                let time = (i as f64 * dt).min(duration);
                let fraction = if duration > 0.0 { time / duration } else { 1.0 };
                TrajectoryState {
                    time,
                    velocity: if i == steps { 0.0 } else { speed },
                    acceleration: 0.0,
                    pose: Pose2d {
                        translation: start + (end - start) * fraction,
                        rotation: heading,
                    },
                    curvature: 0.0,
                }
            })
            .collect();
        Self { states }
    }

    pub fn states(&self) -> &[TrajectoryState] {
        &self.states
    }

    pub fn total_time(&self) -> f64 {
        self.states.last().map_or(0.0, |s| s.time)
    }

    /// State at `time`, clamped to the first and last samples
    pub fn sample(&self, time: f64) -> TrajectoryState {
        let (Some(first), Some(last)) = (self.states.first(), self.states.last()) else {
            return TrajectoryState::default();
        };
        if time <= first.time {
            return *first;
        }
        if time >= last.time {
            return *last;
        }

        // First sample strictly after `time`; exists since time < last.time
        let upper = self.states.partition_point(|s| s.time <= time);
        let prev = &self.states[upper - 1];
        let next = &self.states[upper];

        let span = next.time - prev.time;
        if span <= 0.0 {
            return *next;
        }
        prev.interpolate(next, (time - prev.time) / span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_clamps_to_ends() {
        let traj = Trajectory::straight_line(Translation2d::ZERO, Translation2d::new(1.0, 0.0), 0.5, 0.1);
        assert_eq!(traj.sample(-1.0), traj.states()[0]);
        assert_eq!(traj.sample(100.0), *traj.states().last().unwrap());
        assert!((traj.total_time() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_sample_between_states() {
        let traj = Trajectory::straight_line(Translation2d::ZERO, Translation2d::new(1.0, 0.0), 0.5, 0.1);
        let mid = traj.sample(1.05);
        assert!((mid.pose.x() - 0.525).abs() < 1e-9, "x {}", mid.pose.x());
        assert!(mid.pose.y().abs() < 1e-12);
        assert_eq!(mid.velocity, 0.5);
    }

    #[test]
    fn test_straight_line_heading() {
        let traj = Trajectory::straight_line(Translation2d::ZERO, Translation2d::new(0.0, -2.0), 1.0, 0.5);
        let heading = traj.sample(0.7).pose.rotation.degrees();
        assert!((heading + 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_straight_line_bad_dt_gives_endpoints() {
        for dt in [0.0, -0.1, f64::NAN] {
            let traj = Trajectory::straight_line(Translation2d::ZERO, Translation2d::new(1.0, 0.0), 0.5, dt);
            assert_eq!(traj.states().len(), 2);
            assert!((traj.total_time() - 2.0).abs() < 1e-9);
            assert!((traj.sample(100.0).pose.x() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_new_sorts_samples() {
        let a = TrajectoryState { time: 1.0, ..Default::default() };
        let b = TrajectoryState { time: 0.0, ..Default::default() };
        let traj = Trajectory::new(vec![a, b]);
        assert_eq!(traj.states()[0].time, 0.0);
    }

    #[test]
    fn test_empty_trajectory() {
        let traj = Trajectory::default();
        assert_eq!(traj.sample(0.3), TrajectoryState::default());
        assert_eq!(traj.total_time(), 0.0);
    }
}
