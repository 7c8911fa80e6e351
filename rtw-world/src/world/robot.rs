//! Fused entities
//!
//! A [`Robot`] is rebuilt every fusion cycle from the cameras that saw it; the
//! [`Ball`] persists across cycles and only moves when some camera saw it.

use rtw_common::messages::{BallState, RobotState, TeamColor};
use rtw_common::{Vector2, Vector3};

/// Linear and angular velocity of a robot
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RobotVelocity {
    pub x: f64,
    pub y: f64,
    /// rad/s
    pub rot: f64,
}

/// A robot fused from one or more camera observations
#[derive(Debug, Clone, PartialEq)]
pub struct Robot {
    pub id: u32,
    pub team: TeamColor,
    pub position: Vector2,
    pub orientation: f64,
    pub velocity: RobotVelocity,
    /// Time (seconds) of the fusion cycle that last saw this robot
    pub last_detection: f64,
}

impl Robot {
    pub fn new(id: u32, team: TeamColor) -> Self {
        Self {
            id,
            team,
            position: Vector2::default(),
            orientation: 0.0,
            velocity: RobotVelocity::default(),
            last_detection: 0.0,
        }
    }

    pub fn move_to(&mut self, x: f64, y: f64) {
        self.position = Vector2::new(x, y);
    }

    pub fn rotate_to(&mut self, orientation: f64) {
        self.orientation = orientation;
    }

    /// True when the last detection is more than `max_age` seconds before `now`
    pub fn is_detection_old(&self, now: f64, max_age: f64) -> bool {
        now - self.last_detection > max_age
    }

    /// True when the last detection lies more than `tolerance` seconds after `now`
    pub fn is_detection_from_future(&self, now: f64, tolerance: f64) -> bool {
        self.last_detection - now > tolerance
    }

    pub fn to_state(&self) -> RobotState {
        RobotState {
            id: self.id,
            x: self.position.x,
            y: self.position.y,
            orientation: self.orientation,
            vx: self.velocity.x,
            vy: self.velocity.y,
            vrot: self.velocity.rot,
        }
    }
}

/// The fused ball
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Ball {
    pub position: Vector3,
    pub velocity: Vector2,
}

impl Ball {
    pub fn move_to(&mut self, position: Vector3) {
        self.position = position;
    }

    pub fn to_state(&self) -> BallState {
        BallState {
            x: self.position.x,
            y: self.position.y,
            z: self.position.z,
            vx: self.velocity.x,
            vy: self.velocity.y,
        }
    }
}
