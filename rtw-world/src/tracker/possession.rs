//! Ball possession estimate
//!
//! The robot nearest the ball owns it, provided it is within `radius`.

use rtw_common::geometry::Vector2;
use rtw_common::messages::{RobotState, WorldSnapshot};
use serde::Serialize;
use serde_json::json;

use super::{ModuleError, TrackerModule};

/// Which side holds the ball
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Ours,
    Theirs,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Possession {
    pub side: Side,
    pub robot_id: u32,
    pub distance: f64,
}

pub struct BallPossession {
    radius: f64,
    current: Option<Possession>,
    updates: u64,
}

impl BallPossession {
    pub const NAME: &'static str = "ball_possession";

    pub fn new(radius: f64) -> Self {
        Self {
            radius,
            current: None,
            updates: 0,
        }
    }

    pub fn current(&self) -> Option<Possession> {
        self.current
    }
}

fn nearest(robots: &[RobotState], side: Side, ball: Vector2) -> Option<Possession> {
    let mut best: Option<Possession> = None;
    for robot in robots {
        let distance = Vector2::new(robot.x, robot.y).dist(ball);
        if best.map_or(true, |b| distance < b.distance) {
            best = Some(Possession {
                side,
                robot_id: robot.id,
                distance,
            });
        }
    }
    best
}

impl TrackerModule for BallPossession {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn update(&mut self, world: &WorldSnapshot) -> Result<(), ModuleError> {
        let ball = Vector2::new(world.ball.x, world.ball.y);
        if !ball.x.is_finite() || !ball.y.is_finite() {
            self.current = None;
            return Err(ModuleError::InsufficientData(format!(
                "ball position is not finite: ({}, {})",
                ball.x, ball.y
            )));
        }

        let ours = nearest(&world.ours, Side::Ours, ball);
        let theirs = nearest(&world.theirs, Side::Theirs, ball);
        let closest = match (ours, theirs) {
            (Some(a), Some(b)) => Some(if b.distance < a.distance { b } else { a }),
            (a, b) => a.or(b),
        };

        self.current = closest.filter(|p| p.distance <= self.radius);
        self.updates += 1;
        Ok(())
    }

    fn summary(&self) -> serde_json::Value {
        json!({
            "radius": self.radius,
            "updates": self.updates,
            "possession": self.current,
        })
    }
}
