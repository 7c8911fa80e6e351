//! Velocity estimation
//!
//! The fusion core hands every fused pose to a [`Predictor`] and immediately
//! asks it for a smoothed velocity. [`DifferencePredictor`] is the built-in
//! estimator: a finite difference over a short sample window.

use rtw_common::geometry::wrap_angle;
use rtw_common::Vector2;
use std::collections::{HashMap, VecDeque};

use crate::world::robot::{Ball, Robot, RobotVelocity};

/// Velocity estimator fed once per fused entity per cycle
pub trait Predictor: Send {
    /// Ingest one fused robot pose
    fn update_robot(&mut self, robot: &Robot, our_team: bool, timestamp: f64);

    /// Ingest one fused ball position
    fn update_ball(&mut self, ball: &Ball, timestamp: f64);

    /// Velocity reflecting the latest `update_robot` for this robot
    fn robot_velocity(&self, id: u32, our_team: bool) -> Option<RobotVelocity>;

    /// Velocity reflecting the latest `update_ball`
    fn ball_velocity(&self) -> Option<Vector2>;

    /// Forget all history
    fn reset(&mut self) {}
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    t: f64,
    x: f64,
    y: f64,
    rot: f64,
}

#[derive(Debug, Default)]
struct History {
    samples: VecDeque<Sample>,
}

impl History {
    fn push(&mut self, sample: Sample, window_secs: f64) {
        match self.samples.back() {
            Some(last) if sample.t < last.t => self.samples.clear(),
            Some(last) if sample.t == last.t => {
                self.samples.pop_back();
            }
            _ => {}
        }
        self.samples.push_back(sample);

        // Samples older than the window go, down to the newest alone
        let cutoff = sample.t - window_secs;
        while self.samples.len() > 1 && self.samples.front().is_some_and(|s| s.t < cutoff) {
            self.samples.pop_front();
        }
    }

    fn velocity(&self) -> Option<RobotVelocity> {
        let first = self.samples.front()?;
        let last = self.samples.back()?;
        let dt = last.t - first.t;
        if self.samples.len() < 2 || dt <= 0.0 {
            return None;
        }
        Some(RobotVelocity {
            x: (last.x - first.x) / dt,
            y: (last.y - first.y) / dt,
            rot: wrap_angle(last.rot - first.rot) / dt,
        })
    }
}

/// Finite-difference velocity over a sliding time window
#[derive(Debug)]
pub struct DifferencePredictor {
    window_secs: f64,
    robots: HashMap<(bool, u32), History>,
    ball: History,
}

impl DifferencePredictor {
    pub fn new(window_secs: f64) -> Self {
        Self {
            window_secs,
            robots: HashMap::new(),
            ball: History::default(),
        }
    }
}

impl Predictor for DifferencePredictor {
    fn update_robot(&mut self, robot: &Robot, our_team: bool, timestamp: f64) {
        let sample = Sample {
            t: timestamp,
            x: robot.position.x,
            y: robot.position.y,
            rot: robot.orientation,
        };
        self.robots
            .entry((our_team, robot.id))
            .or_default()
            .push(sample, self.window_secs);
    }

    fn update_ball(&mut self, ball: &Ball, timestamp: f64) {
        let sample = Sample {
            t: timestamp,
            x: ball.position.x,
            y: ball.position.y,
            rot: 0.0,
        };
        self.ball.push(sample, self.window_secs);
    }

    fn robot_velocity(&self, id: u32, our_team: bool) -> Option<RobotVelocity> {
        self.robots.get(&(our_team, id))?.velocity()
    }

    fn ball_velocity(&self) -> Option<Vector2> {
        self.ball.velocity().map(|v| Vector2::new(v.x, v.y))
    }

    fn reset(&mut self) {
        self.robots.clear();
        self.ball = History::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtw_common::messages::TeamColor;
    use rtw_common::Vector3;

    fn robot_at(id: u32, x: f64, y: f64, orientation: f64) -> Robot {
        let mut robot = Robot::new(id, TeamColor::Blue);
        robot.move_to(x, y);
        robot.rotate_to(orientation);
        robot
    }

    #[test]
    fn test_single_sample_has_no_estimate() {
        let mut predictor = DifferencePredictor::new(0.1);
        predictor.update_robot(&robot_at(1, 0.0, 0.0, 0.0), true, 1.0);
        assert!(predictor.robot_velocity(1, true).is_none());
        assert!(predictor.ball_velocity().is_none());
    }

    #[test]
    fn test_robot_finite_difference() {
        let mut predictor = DifferencePredictor::new(1.0);
        predictor.update_robot(&robot_at(1, 0.0, 0.0, 0.0), true, 1.0);
        predictor.update_robot(&robot_at(1, 0.5, -0.25, 0.1), true, 1.5);

        let vel = predictor.robot_velocity(1, true).unwrap();
        assert!((vel.x - 1.0).abs() < 1e-9);
        assert!((vel.y + 0.5).abs() < 1e-9);
        assert!((vel.rot - 0.2).abs() < 1e-9);

        // Teams are tracked separately
        assert!(predictor.robot_velocity(1, false).is_none());
    }

    #[test]
    fn test_angular_velocity_across_seam() {
        let mut predictor = DifferencePredictor::new(1.0);
        predictor.update_robot(&robot_at(2, 0.0, 0.0, 3.1), false, 0.0);
        predictor.update_robot(&robot_at(2, 0.0, 0.0, -3.1), false, 1.0);

        let vel = predictor.robot_velocity(2, false).unwrap();
        let expected = 2.0 * std::f64::consts::PI - 6.2;
        assert!((vel.rot - expected).abs() < 1e-9);
    }

    #[test]
    fn test_window_drops_old_samples() {
        let mut predictor = DifferencePredictor::new(0.1);
        predictor.update_robot(&robot_at(1, 0.0, 0.0, 0.0), true, 0.0);
        predictor.update_robot(&robot_at(1, 10.0, 0.0, 0.0), true, 1.0);
        predictor.update_robot(&robot_at(1, 10.1, 0.0, 0.0), true, 1.05);
        predictor.update_robot(&robot_at(1, 10.2, 0.0, 0.0), true, 1.1);

        // Only samples within 0.1 s of the newest remain
        let vel = predictor.robot_velocity(1, true).unwrap();
        assert!((vel.x - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_gap_longer_than_window_has_no_estimate() {
        let mut predictor = DifferencePredictor::new(0.1);
        predictor.update_robot(&robot_at(1, 0.0, 0.0, 0.0), true, 0.0);
        predictor.update_robot(&robot_at(1, 5.0, 0.0, 0.0), true, 5.0);
        assert!(predictor.robot_velocity(1, true).is_none());

        // Estimates resume once the window fills again
        predictor.update_robot(&robot_at(1, 5.1, 0.0, 0.0), true, 5.05);
        let vel = predictor.robot_velocity(1, true).unwrap();
        assert!((vel.x - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_time_going_backwards_restarts_history() {
        let mut predictor = DifferencePredictor::new(1.0);
        predictor.update_robot(&robot_at(1, 0.0, 0.0, 0.0), true, 5.0);
        predictor.update_robot(&robot_at(1, 1.0, 0.0, 0.0), true, 5.5);
        predictor.update_robot(&robot_at(1, 2.0, 0.0, 0.0), true, 1.0);
        assert!(predictor.robot_velocity(1, true).is_none());
    }

    #[test]
    fn test_ball_velocity_and_reset() {
        let mut predictor = DifferencePredictor::new(0.5);
        let mut ball = Ball::default();
        predictor.update_ball(&ball, 0.0);
        ball.move_to(Vector3::new(0.2, 0.4, 0.0));
        predictor.update_ball(&ball, 0.2);

        let vel = predictor.ball_velocity().unwrap();
        assert!((vel.x - 1.0).abs() < 1e-9);
        assert!((vel.y - 2.0).abs() < 1e-9);

        predictor.reset();
        assert!(predictor.ball_velocity().is_none());
    }
}
