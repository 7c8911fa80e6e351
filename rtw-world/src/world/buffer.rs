//! Per-cycle observation buffering and the camera barrier
//!
//! Every inbound frame is absorbed into [`ObservationBuffer`] and ticks its
//! camera off in [`CycleBarrier`]. A merge may run once every camera that has
//! ever reported has reported again since the last merge.

use rtw_common::messages::{DetectionBall, DetectionFrame, DetectionRobot, TeamColor};
use rtw_common::Vector2;
use std::collections::BTreeMap;

/// robot id -> camera id -> latest observation of that robot by that camera
pub type RobotMultiCamBuffer = BTreeMap<u32, BTreeMap<u32, DetectionRobot>>;

/// Tracks which cameras reported in the current cycle
///
/// Cameras are discovered on their first frame and stay tracked until
/// [`CycleBarrier::clear`].
#[derive(Debug, Default, Clone)]
pub struct CycleBarrier {
    reported: BTreeMap<u32, bool>,
}

impl CycleBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `camera_id` as reported, tracking it if new
    pub fn mark_reported(&mut self, camera_id: u32) {
        self.reported.insert(camera_id, true);
    }

    /// True iff at least one camera is tracked and all of them reported
    pub fn is_complete(&self) -> bool {
        !self.reported.is_empty() && self.reported.values().all(|&reported| reported)
    }

    /// Clear all flags; cameras remain tracked
    pub fn start_next_cycle(&mut self) {
        for reported in self.reported.values_mut() {
            *reported = false;
        }
    }

    /// `None` if the camera was never seen
    pub fn has_reported(&self, camera_id: u32) -> Option<bool> {
        self.reported.get(&camera_id).copied()
    }

    pub fn cameras(&self) -> impl Iterator<Item = u32> + '_ {
        self.reported.keys().copied()
    }

    pub fn camera_count(&self) -> usize {
        self.reported.len()
    }

    /// Forget every camera
    pub fn clear(&mut self) {
        self.reported.clear();
    }
}

/// First candidate minimizing squared planar distance to `reference`
pub fn closest_ball<'a, I>(candidates: I, reference: Vector2) -> Option<&'a DetectionBall>
where
    I: IntoIterator<Item = &'a DetectionBall>,
{
    let mut best: Option<(&DetectionBall, f64)> = None;
    for ball in candidates {
        let dist2 = ball.position().xy().dist2(reference);
        match best {
            Some((_, best_dist2)) if dist2 >= best_dist2 => {}
            _ => best = Some((ball, dist2)),
        }
    }
    best.map(|(ball, _)| ball)
}

/// Raw observations accumulated within one fusion cycle
#[derive(Debug, Clone)]
pub struct ObservationBuffer {
    robots_blue: RobotMultiCamBuffer,
    robots_yellow: RobotMultiCamBuffer,
    /// camera id -> last accepted ball candidate of that camera
    balls: BTreeMap<u32, DetectionBall>,
    /// camera id -> consecutive frames without any ball
    frames_without_ball: BTreeMap<u32, u32>,
    ball_miss_limit: u32,
}

impl ObservationBuffer {
    pub fn new(ball_miss_limit: u32) -> Self {
        Self {
            robots_blue: RobotMultiCamBuffer::new(),
            robots_yellow: RobotMultiCamBuffer::new(),
            balls: BTreeMap::new(),
            frames_without_ball: BTreeMap::new(),
            ball_miss_limit,
        }
    }

    /// Buffer everything in one camera frame
    pub fn absorb(&mut self, frame: &DetectionFrame) {
        let cam_id = frame.camera_id;

        for color in [TeamColor::Blue, TeamColor::Yellow] {
            let buffer = self.robots_mut(color);
            for robot in frame.robots(color) {
                buffer.entry(robot.robot_id).or_default().insert(cam_id, *robot);
            }
        }

        self.absorb_balls(cam_id, &frame.balls);
    }

    fn absorb_balls(&mut self, cam_id: u32, candidates: &[DetectionBall]) {
        if candidates.is_empty() {
            let misses = self.frames_without_ball.entry(cam_id).or_insert(0);
            *misses = misses.saturating_add(1);
            if *misses >= self.ball_miss_limit {
                self.balls.remove(&cam_id);
            }
            return;
        }

        self.frames_without_ball.insert(cam_id, 0);

        // Reference is this camera's previous pick, the origin if it has none
        let previous = self
            .balls
            .get(&cam_id)
            .map(|ball| ball.position().xy())
            .unwrap_or_default();

        if let Some(closest) = closest_ball(candidates, previous) {
            self.balls.insert(cam_id, *closest);
        }
    }

    pub fn robots(&self, color: TeamColor) -> &RobotMultiCamBuffer {
        match color {
            TeamColor::Blue => &self.robots_blue,
            TeamColor::Yellow => &self.robots_yellow,
        }
    }

    fn robots_mut(&mut self, color: TeamColor) -> &mut RobotMultiCamBuffer {
        match color {
            TeamColor::Blue => &mut self.robots_blue,
            TeamColor::Yellow => &mut self.robots_yellow,
        }
    }

    pub fn balls(&self) -> &BTreeMap<u32, DetectionBall> {
        &self.balls
    }

    pub fn frames_without_ball(&self, cam_id: u32) -> u32 {
        self.frames_without_ball.get(&cam_id).copied().unwrap_or(0)
    }

    /// Drop robot observations after a merge; ball entries age out on their own
    pub fn clear_robots(&mut self) {
        self.robots_blue.clear();
        self.robots_yellow.clear();
    }

    /// Drop everything, including ball entries and miss counters
    pub fn clear(&mut self) {
        self.clear_robots();
        self.balls.clear();
        self.frames_without_ball.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_barrier_never_complete_without_cameras() {
        let barrier = CycleBarrier::new();
        assert!(!barrier.is_complete());
    }

    #[test]
    fn test_barrier_waits_for_every_tracked_camera() {
        let mut barrier = CycleBarrier::new();
        barrier.mark_reported(0);
        barrier.mark_reported(1);
        assert!(barrier.is_complete());

        barrier.start_next_cycle();
        assert!(!barrier.is_complete());
        assert_eq!(barrier.camera_count(), 2);

        barrier.mark_reported(1);
        assert!(!barrier.is_complete());
        assert_eq!(barrier.has_reported(0), Some(false));

        barrier.mark_reported(0);
        assert!(barrier.is_complete());
        assert_eq!(barrier.has_reported(7), None);
    }

    #[test]
    fn test_new_camera_joins_open_cycle() {
        let mut barrier = CycleBarrier::new();
        barrier.mark_reported(0);
        barrier.start_next_cycle();
        barrier.mark_reported(0);
        barrier.mark_reported(2);
        assert!(barrier.is_complete());
        assert_eq!(barrier.cameras().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_same_camera_overwrites_robot_slot() {
        let mut buffer = ObservationBuffer::new(5);
        buffer.absorb(&DetectionFrame::new(0).with_robot(TeamColor::Blue, 7, 1.0, 1.0, 0.0));
        buffer.absorb(&DetectionFrame::new(0).with_robot(TeamColor::Blue, 7, 2.0, 3.0, 0.1));
        buffer.absorb(&DetectionFrame::new(1).with_robot(TeamColor::Blue, 7, 4.0, 3.0, 0.1));

        let slots = &buffer.robots(TeamColor::Blue)[&7];
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[&0].x, 2.0);
        assert_eq!(slots[&1].x, 4.0);
        assert!(buffer.robots(TeamColor::Yellow).is_empty());
    }

    #[test]
    fn test_ingest_picks_ball_nearest_previous_pick() {
        let mut buffer = ObservationBuffer::new(5);

        // No previous pick: nearest to the origin wins
        buffer.absorb(&DetectionFrame::new(0).with_ball(3.0, 0.0, 0.0).with_ball(1.0, 1.0, 0.0));
        assert_eq!(buffer.balls()[&0].x, 1.0);

        // Now nearest to (1, 1)
        buffer.absorb(
            &DetectionFrame::new(0)
                .with_ball(-1.0, -1.0, 0.0)
                .with_ball(1.5, 1.0, 0.0)
                .with_ball(0.0, 0.0, 0.0),
        );
        assert_eq!(buffer.balls()[&0].x, 1.5);
    }

    #[test]
    fn test_closest_ball_tie_keeps_first() {
        let candidates = [
            DetectionBall { x: 1.0, y: 0.0, z: 0.0 },
            DetectionBall { x: -1.0, y: 0.0, z: 0.5 },
        ];
        let picked = closest_ball(&candidates, Vector2::default()).unwrap();
        assert_eq!(picked.x, 1.0);
        let none: &[DetectionBall] = &[];
        assert!(closest_ball(none, Vector2::default()).is_none());
    }

    #[test]
    fn test_ball_entry_evicted_after_miss_limit() {
        let mut buffer = ObservationBuffer::new(5);
        buffer.absorb(&DetectionFrame::new(2).with_ball(0.5, 0.5, 0.0));

        for miss in 1..5 {
            buffer.absorb(&DetectionFrame::new(2));
            assert_eq!(buffer.frames_without_ball(2), miss);
            assert!(buffer.balls().contains_key(&2), "evicted too early at miss {}", miss);
        }

        buffer.absorb(&DetectionFrame::new(2));
        assert_eq!(buffer.frames_without_ball(2), 5);
        assert!(buffer.balls().is_empty());
    }

    #[test]
    fn test_ball_report_resets_miss_counter() {
        let mut buffer = ObservationBuffer::new(5);
        buffer.absorb(&DetectionFrame::new(0).with_ball(0.0, 0.0, 0.0));
        for _ in 0..4 {
            buffer.absorb(&DetectionFrame::new(0));
        }
        buffer.absorb(&DetectionFrame::new(0).with_ball(0.1, 0.0, 0.0));
        assert_eq!(buffer.frames_without_ball(0), 0);

        for _ in 0..4 {
            buffer.absorb(&DetectionFrame::new(0));
        }
        assert!(buffer.balls().contains_key(&0));
    }

    #[test]
    fn test_clear_robots_keeps_balls() {
        let mut buffer = ObservationBuffer::new(5);
        buffer.absorb(
            &DetectionFrame::new(0)
                .with_robot(TeamColor::Yellow, 1, 0.0, 0.0, 0.0)
                .with_ball(0.0, 0.0, 0.0),
        );
        buffer.clear_robots();
        assert!(buffer.robots(TeamColor::Yellow).is_empty());
        assert_eq!(buffer.balls().len(), 1);

        buffer.clear();
        assert!(buffer.balls().is_empty());
    }
}
