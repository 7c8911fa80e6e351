//! Wire messages for the RTW world services
//!
//! Detection frames come in one per camera per capture; world snapshots go out
//! once per fusion cycle. Both are plain serde types so any transport (HTTP,
//! SSE, files) can carry them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::{Error, Vector3};

/// Team colour as assigned by the referee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamColor {
    Blue,
    Yellow,
}

impl TeamColor {
    /// The other team's colour
    pub fn opponent(self) -> TeamColor {
        match self {
            TeamColor::Blue => TeamColor::Yellow,
            TeamColor::Yellow => TeamColor::Blue,
        }
    }
}

impl fmt::Display for TeamColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamColor::Blue => write!(f, "blue"),
            TeamColor::Yellow => write!(f, "yellow"),
        }
    }
}

impl FromStr for TeamColor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blue" => Ok(TeamColor::Blue),
            "yellow" => Ok(TeamColor::Yellow),
            other => Err(Error::InvalidInput(format!(
                "unknown team color '{}', expected 'blue' or 'yellow'",
                other
            ))),
        }
    }
}

/// A single robot sighting from one camera
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionRobot {
    pub robot_id: u32,
    pub x: f64,
    pub y: f64,
    /// Heading in radians
    #[serde(default)]
    pub orientation: f64,
}

/// A single ball candidate from one camera
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionBall {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl DetectionBall {
    pub fn position(&self) -> Vector3 {
        Vector3::new(self.x, self.y, self.z)
    }
}

/// Everything one camera saw in one capture
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionFrame {
    pub camera_id: u32,

    /// Capture time reported by the vision system (seconds), informational only
    #[serde(default)]
    pub t_capture: Option<f64>,

    #[serde(default)]
    pub robots_blue: Vec<DetectionRobot>,

    #[serde(default)]
    pub robots_yellow: Vec<DetectionRobot>,

    /// Ball candidates, possibly several or none
    #[serde(default)]
    pub balls: Vec<DetectionBall>,
}

impl DetectionFrame {
    pub fn new(camera_id: u32) -> Self {
        Self {
            camera_id,
            ..Default::default()
        }
    }

    /// Robots of one colour in this frame
    pub fn robots(&self, color: TeamColor) -> &[DetectionRobot] {
        match color {
            TeamColor::Blue => &self.robots_blue,
            TeamColor::Yellow => &self.robots_yellow,
        }
    }

    pub fn with_robot(mut self, color: TeamColor, robot_id: u32, x: f64, y: f64, orientation: f64) -> Self {
        let robot = DetectionRobot { robot_id, x, y, orientation };
        match color {
            TeamColor::Blue => self.robots_blue.push(robot),
            TeamColor::Yellow => self.robots_yellow.push(robot),
        }
        self
    }

    pub fn with_ball(mut self, x: f64, y: f64, z: f64) -> Self {
        self.balls.push(DetectionBall { x, y, z });
        self
    }
}

/// Fused robot as published in a world snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RobotState {
    pub id: u32,
    pub x: f64,
    pub y: f64,
    pub orientation: f64,
    pub vx: f64,
    pub vy: f64,
    pub vrot: f64,
}

/// Fused ball as published in a world snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BallState {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub vx: f64,
    pub vy: f64,
}

/// The fused scene handed to consumers
///
/// `danger_ids`, `danger_scores` and `danger_flags` always have equal length
/// and are index-aligned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub ours: Vec<RobotState>,
    pub theirs: Vec<RobotState>,
    pub ball: BallState,
    #[serde(default)]
    pub danger_ids: Vec<u32>,
    #[serde(default)]
    pub danger_scores: Vec<f64>,
    #[serde(default)]
    pub danger_flags: Vec<bool>,
}

impl WorldSnapshot {
    pub fn our_robot(&self, id: u32) -> Option<&RobotState> {
        self.ours.iter().find(|r| r.id == id)
    }

    pub fn their_robot(&self, id: u32) -> Option<&RobotState> {
        self.theirs.iter().find(|r| r.id == id)
    }
}

/// Ranked threat assessment over opponent robots
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DangerSnapshot {
    /// Opponent ids, most dangerous first
    pub danger_list: Vec<u32>,
    #[serde(default)]
    pub scores: BTreeMap<u32, f64>,
    #[serde(default)]
    pub flags: BTreeMap<u32, bool>,
}
