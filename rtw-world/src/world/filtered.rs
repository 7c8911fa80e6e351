//! Multi-camera fusion
//!
//! Frames are buffered until every known camera has reported, then merged:
//! robots are averaged across the cameras that saw them, the ball is taken from
//! the camera closest to where it was, velocities come from the predictor and
//! robots that went unseen for too long are dropped.

use rtw_common::config::{FusionConfig, OrientationAveraging};
use rtw_common::messages::{DetectionFrame, DetectionRobot, TeamColor, WorldSnapshot};
use rtw_common::geometry::wrap_angle;
use rtw_common::Vector2;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};

use super::buffer::{closest_ball, CycleBarrier, ObservationBuffer};
use super::robot::{Ball, Robot};
use super::{CycleOutcome, EvictionReason, WorldBase};
use crate::danger::{DangerLatch, DangerSource};
use crate::mailbox::FreshnessMailbox;
use crate::predictor::Predictor;

/// Result of fusing one team
struct TeamMerge {
    fused: usize,
    evicted: usize,
}

/// The fusion engine
pub struct FilteredWorld {
    our_color: TeamColor,
    config: FusionConfig,
    barrier: CycleBarrier,
    buffer: ObservationBuffer,
    robots_blue: BTreeMap<u32, Robot>,
    robots_yellow: BTreeMap<u32, Robot>,
    ball: Ball,
    predictor: Box<dyn Predictor>,
    fresh: FreshnessMailbox,
    danger: DangerLatch,
}

impl FilteredWorld {
    pub fn new(
        our_color: TeamColor,
        config: FusionConfig,
        predictor: Box<dyn Predictor>,
        danger: Arc<dyn DangerSource>,
    ) -> Self {
        Self {
            our_color,
            barrier: CycleBarrier::new(),
            buffer: ObservationBuffer::new(config.ball_miss_limit),
            config,
            robots_blue: BTreeMap::new(),
            robots_yellow: BTreeMap::new(),
            ball: Ball::default(),
            predictor,
            fresh: FreshnessMailbox::new(),
            danger: DangerLatch::new(danger),
        }
    }

    pub fn our_color(&self) -> TeamColor {
        self.our_color
    }

    pub fn barrier(&self) -> &CycleBarrier {
        &self.barrier
    }

    pub fn buffer(&self) -> &ObservationBuffer {
        &self.buffer
    }

    pub fn robots(&self, color: TeamColor) -> &BTreeMap<u32, Robot> {
        match color {
            TeamColor::Blue => &self.robots_blue,
            TeamColor::Yellow => &self.robots_yellow,
        }
    }

    pub fn ball(&self) -> &Ball {
        &self.ball
    }

    pub fn is_fresh(&self) -> bool {
        self.fresh.is_fresh()
    }

    /// Fuse the buffered cycle into the world state
    fn merge_frames(&mut self, now: f64) -> CycleOutcome {
        let blue_is_ours = self.our_color == TeamColor::Blue;

        let blue = merge_robots(
            self.buffer.robots(TeamColor::Blue),
            &mut self.robots_blue,
            TeamColor::Blue,
            blue_is_ours,
            self.predictor.as_mut(),
            &self.config,
            now,
        );
        let yellow = merge_robots(
            self.buffer.robots(TeamColor::Yellow),
            &mut self.robots_yellow,
            TeamColor::Yellow,
            !blue_is_ours,
            self.predictor.as_mut(),
            &self.config,
            now,
        );

        // Take the ball from the camera closest to where the ball was
        if let Some(closest) = closest_ball(self.buffer.balls().values(), self.ball.position.xy()) {
            self.ball.move_to(closest.position());
        }
        self.predictor.update_ball(&self.ball, now);
        if let Some(velocity) = self.predictor.ball_velocity() {
            self.ball.velocity = velocity;
        }

        self.buffer.clear_robots();

        let fused = blue.fused + yellow.fused;
        let evicted = blue.evicted + yellow.evicted;
        trace!("Merged cycle at {:.3}: {} robots fused, {} evicted", now, fused, evicted);
        CycleOutcome::Merged { fused, evicted }
    }
}

impl WorldBase for FilteredWorld {
    fn reset(&mut self) {
        self.barrier.clear();
        self.buffer.clear();
        self.robots_blue.clear();
        self.robots_yellow.clear();
        self.ball = Ball::default();
        self.predictor.reset();
        self.fresh.clear();
        self.danger.clear();
    }

    fn detection_callback(&mut self, frame: &DetectionFrame, now: f64) -> CycleOutcome {
        self.barrier.mark_reported(frame.camera_id);
        self.buffer.absorb(frame);

        let outcome = if self.barrier.is_complete() {
            self.barrier.start_next_cycle();
            let outcome = self.merge_frames(now);
            self.fresh.publish();
            outcome
        } else {
            CycleOutcome::Incomplete
        };

        self.danger.refresh();
        outcome
    }

    fn export(&self) -> WorldSnapshot {
        let their_color = self.our_color.opponent();
        let mut snapshot = WorldSnapshot {
            ours: self.robots(self.our_color).values().map(Robot::to_state).collect(),
            theirs: self.robots(their_color).values().map(Robot::to_state).collect(),
            ball: self.ball.to_state(),
            ..Default::default()
        };
        self.danger.merge_into(&mut snapshot);
        snapshot
    }

    fn consume(&self) -> Option<WorldSnapshot> {
        self.fresh.take_with(|| self.export())
    }
}

/// Fuse one team's observations into `output`, then evict stale robots
fn merge_robots(
    observations: &BTreeMap<u32, BTreeMap<u32, DetectionRobot>>,
    output: &mut BTreeMap<u32, Robot>,
    team: TeamColor,
    our_team: bool,
    predictor: &mut dyn Predictor,
    config: &FusionConfig,
    now: f64,
) -> TeamMerge {
    let mut fused = 0;

    for (&bot_id, per_camera) in observations {
        let Some((position, orientation)) =
            average_pose(per_camera.values(), config.orientation_averaging)
        else {
            continue;
        };

        let mut robot = Robot::new(bot_id, team);
        robot.move_to(position.x, position.y);
        robot.rotate_to(orientation);

        predictor.update_robot(&robot, our_team, now);
        robot.velocity = predictor
            .robot_velocity(bot_id, our_team)
            .unwrap_or_default();

        robot.last_detection = now;
        output.insert(bot_id, robot);
        fused += 1;
    }

    let mut evicted = 0;
    output.retain(|id, robot| match eviction_reason(robot, now, config) {
        Some(reason) => {
            debug!("Removing {} bot {}: {}", team, id, reason);
            evicted += 1;
            false
        }
        None => true,
    });

    TeamMerge { fused, evicted }
}

fn eviction_reason(robot: &Robot, now: f64, config: &FusionConfig) -> Option<EvictionReason> {
    if robot.is_detection_old(now, config.stale_after_secs) {
        Some(EvictionReason::Stale)
    } else if robot.is_detection_from_future(now, config.future_tolerance_secs) {
        Some(EvictionReason::FutureTimestamp)
    } else {
        None
    }
}

/// Mean position and orientation, `None` without observations
fn average_pose<'a, I>(observations: I, averaging: OrientationAveraging) -> Option<(Vector2, f64)>
where
    I: IntoIterator<Item = &'a DetectionRobot>,
{
    let mut count = 0usize;
    let (mut x, mut y) = (0.0_f64, 0.0_f64);
    let (mut sum_w, mut sum_sin, mut sum_cos) = (0.0_f64, 0.0_f64, 0.0_f64);

    for obs in observations {
        count += 1;
        x += obs.x;
        y += obs.y;
        sum_w += obs.orientation;
        sum_sin += obs.orientation.sin();
        sum_cos += obs.orientation.cos();
    }

    if count == 0 {
        return None;
    }
    let n = count as f64;
    let arithmetic = sum_w / n;

    let orientation = match averaging {
        OrientationAveraging::Arithmetic => arithmetic,
        // Opposing headings cancel out; fall back to the plain mean
        OrientationAveraging::Circular if sum_sin.hypot(sum_cos) < 1e-9 => wrap_angle(arithmetic),
        OrientationAveraging::Circular => sum_sin.atan2(sum_cos),
    };

    Some((Vector2::new(x / n, y / n), orientation))
}
