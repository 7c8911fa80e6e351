//! Naive world that forwards whatever the last frame contained
//!
//! Useful with a single camera or a simulator that already reports a clean
//! scene. The first ball candidate is taken as the ball.

use rtw_common::messages::{DetectionFrame, DetectionRobot, TeamColor, WorldSnapshot};
use std::collections::BTreeMap;

use super::robot::{Ball, Robot};
use super::{CycleOutcome, WorldBase};
use crate::mailbox::FreshnessMailbox;

pub struct DummyWorld {
    our_color: TeamColor,
    us: Vec<Robot>,
    them: Vec<Robot>,
    ball: Ball,
    fresh: FreshnessMailbox,
}

impl DummyWorld {
    pub fn new(our_color: TeamColor) -> Self {
        Self {
            our_color,
            us: Vec::new(),
            them: Vec::new(),
            ball: Ball::default(),
            fresh: FreshnessMailbox::new(),
        }
    }
}

/// One robot per id, first sighting wins, ordered by id
fn forward_robots(detections: &[DetectionRobot], team: TeamColor, now: f64) -> Vec<Robot> {
    let mut robots: BTreeMap<u32, Robot> = BTreeMap::new();
    for detection in detections {
        robots.entry(detection.robot_id).or_insert_with(|| {
            let mut robot = Robot::new(detection.robot_id, team);
            robot.move_to(detection.x, detection.y);
            robot.rotate_to(detection.orientation);
            robot.last_detection = now;
            robot
        });
    }
    robots.into_values().collect()
}

impl WorldBase for DummyWorld {
    fn reset(&mut self) {
        self.us.clear();
        self.them.clear();
        self.ball = Ball::default();
        self.fresh.clear();
    }

    fn detection_callback(&mut self, frame: &DetectionFrame, now: f64) -> CycleOutcome {
        let their_color = self.our_color.opponent();
        self.us = forward_robots(frame.robots(self.our_color), self.our_color, now);
        self.them = forward_robots(frame.robots(their_color), their_color, now);

        if let Some(ball) = frame.balls.first() {
            self.ball.move_to(ball.position());
        }

        self.fresh.publish();
        CycleOutcome::Merged {
            fused: self.us.len() + self.them.len(),
            evicted: 0,
        }
    }

    fn export(&self) -> WorldSnapshot {
        WorldSnapshot {
            ours: self.us.iter().map(Robot::to_state).collect(),
            theirs: self.them.iter().map(Robot::to_state).collect(),
            ball: self.ball.to_state(),
            ..Default::default()
        }
    }

    fn consume(&self) -> Option<WorldSnapshot> {
        self.fresh.take_with(|| self.export())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwards_latest_frame() {
        let mut world = DummyWorld::new(TeamColor::Blue);
        let frame = DetectionFrame::new(0)
            .with_robot(TeamColor::Blue, 2, 1.0, 1.0, 0.5)
            .with_robot(TeamColor::Blue, 2, 9.0, 9.0, 0.0)
            .with_robot(TeamColor::Yellow, 4, -1.0, 0.0, 0.0)
            .with_ball(0.3, 0.4, 0.0)
            .with_ball(5.0, 5.0, 0.0);

        let outcome = world.detection_callback(&frame, 1.0);
        assert_eq!(outcome, CycleOutcome::Merged { fused: 2, evicted: 0 });

        let snapshot = world.consume().unwrap();
        assert_eq!(snapshot.ours.len(), 1);
        assert_eq!(snapshot.ours[0].x, 1.0);
        assert_eq!(snapshot.theirs[0].id, 4);
        assert_eq!((snapshot.ball.x, snapshot.ball.y), (0.3, 0.4));
        assert!(world.consume().is_none());
    }

    #[test]
    fn test_frame_without_ball_keeps_ball() {
        let mut world = DummyWorld::new(TeamColor::Yellow);
        world.detection_callback(&DetectionFrame::new(0).with_ball(1.0, 2.0, 0.0), 1.0);
        world.detection_callback(&DetectionFrame::new(1), 1.1);

        let snapshot = world.export();
        assert_eq!((snapshot.ball.x, snapshot.ball.y), (1.0, 2.0));
        assert!(snapshot.ours.is_empty());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut world = DummyWorld::new(TeamColor::Yellow);
        world.detection_callback(
            &DetectionFrame::new(0).with_robot(TeamColor::Yellow, 1, 0.0, 0.0, 0.0),
            1.0,
        );
        world.reset();
        assert!(world.consume().is_none());
        assert_eq!(world.export(), WorldSnapshot::default());
    }
}
