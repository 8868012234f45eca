//! Per-bone rotation targets for a single leaf and the damping that chases
//! them every frame.
//!
//! A leaf is bent by a chain of bones spanning its width. Each bone carries a
//! rotation around the spine axis (`y`) and a small fold around the page's
//! horizontal axis (`x`). Three curves shape the `y` rotation: an inside curve
//! pulling the first bones toward the target side, an outside curve pushing
//! the rest back so the page lies with a gentle arc, and a turning curve that
//! only appears while a flip is in progress.

use std::f32::consts::{FRAC_PI_2, PI, TAU};
use std::time::{Duration, Instant};

use crate::config::BookConfig;

/// Bones covered by the inside curve.
pub const INSIDE_CURVE_BONES: usize = 8;
const INSIDE_CURVE_STRENGTH: f32 = 0.18;
const OUTSIDE_CURVE_STRENGTH: f32 = 0.05;
const TURNING_CURVE_STRENGTH: f32 = 0.09;
const FOLD_DEGREES: f32 = 2.0;

/// Rotation of one bone relative to its parent, in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BonePose {
    pub y: f32,
    pub x: f32,
}

/// Critically damped spring toward a moving target.
///
/// Carries velocity between frames so that retargeting mid-motion stays
/// continuous in both position and velocity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SmoothDamp {
    pub value: f32,
    pub velocity: f32,
}

impl SmoothDamp {
    pub const fn new(value: f32) -> Self {
        Self {
            value,
            velocity: 0.0,
        }
    }

    pub fn snap(&mut self, value: f32) {
        self.value = value;
        self.velocity = 0.0;
    }

    pub fn update(&mut self, target: f32, smooth_time: f32, dt: f32) -> f32 {
        let smooth_time = smooth_time.max(1e-4);
        let dt = dt.max(0.0);
        let omega = 2.0 / smooth_time;
        let x = omega * dt;
        let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);
        let change = self.value - target;
        let temp = (self.velocity + omega * change) * dt;
        self.velocity = (self.velocity - omega * temp) * decay;
        let mut next = target + (change + temp) * decay;
        // No overshoot past the target.
        if (target - self.value > 0.0) == (next > target) {
            next = target;
            self.velocity = 0.0;
        }
        self.value = next;
        next
    }

    /// Like [`Self::update`] but takes the short way around the circle.
    pub fn update_angle(&mut self, target: f32, smooth_time: f32, dt: f32) -> f32 {
        let target = self.value + wrap_angle(target - self.value);
        self.update(target, smooth_time, dt)
    }
}

/// Wrap an angle into `[-π, π)`.
pub fn wrap_angle(angle: f32) -> f32 {
    (angle + PI).rem_euclid(TAU) - PI
}

/// Curl bump: 0 at rest, 1 half-way through a flip, 0 again once settled.
pub fn turning_time(elapsed: Duration, flip_duration: Duration) -> f32 {
    let span = flip_duration.as_secs_f32().max(f32::EPSILON);
    let t = (elapsed.as_secs_f32() / span).clamp(0.0, 1.0);
    (PI * t).sin().max(0.0)
}

/// Resting rotation of leaf `index`: -90° when turned to the left, +90° when
/// on the right, fanned slightly per leaf unless the book is shut.
pub fn target_rotation(index: usize, opened: bool, book_closed: bool, fan_out_degrees: f32) -> f32 {
    let base = if opened { -FRAC_PI_2 } else { FRAC_PI_2 };
    if book_closed {
        base
    } else {
        base + (index as f32 * fan_out_degrees).to_radians()
    }
}

/// Target pose of every bone for the given leaf rotation and curl amount.
pub fn bone_targets(bones: usize, target: f32, turning: f32, book_closed: bool) -> Vec<BonePose> {
    let span = bones.max(1) as f32;
    (0..bones)
        .map(|i| {
            if book_closed {
                return if i == 0 {
                    BonePose { y: target, x: 0.0 }
                } else {
                    BonePose::default()
                };
            }
            let fi = i as f32;
            let inside = if i < INSIDE_CURVE_BONES {
                (fi * 0.2 + 0.25).sin()
            } else {
                0.0
            };
            let outside = if i >= INSIDE_CURVE_BONES {
                (fi * 0.3 + 0.09).cos()
            } else {
                0.0
            };
            let turn = (fi * PI / span).sin() * turning;
            let y = INSIDE_CURVE_STRENGTH * inside * target
                - OUTSIDE_CURVE_STRENGTH * outside * target
                + TURNING_CURVE_STRENGTH * turn * target;
            let fold = if i > INSIDE_CURVE_BONES {
                (fi * PI / span - 0.5).sin() * turning
            } else {
                0.0
            };
            let x = (target.signum() * FOLD_DEGREES).to_radians() * fold;
            BonePose { y, x }
        })
        .collect()
}

/// Animation state of one leaf.
#[derive(Debug, Clone)]
pub struct PageDeformer {
    index: usize,
    bones: usize,
    flip_duration: Duration,
    turn_smooth_time: f32,
    fold_smooth_time: f32,
    fan_out_degrees: f32,
    last_opened: bool,
    turned_at: Option<Instant>,
    y: Vec<SmoothDamp>,
    x: Vec<SmoothDamp>,
    poses: Vec<BonePose>,
    settled_once: bool,
}

impl PageDeformer {
    pub fn new(index: usize, cfg: &BookConfig) -> Self {
        let bones = cfg.segments + 1;
        Self {
            index,
            bones,
            flip_duration: cfg.flip_duration,
            turn_smooth_time: cfg.turn_smooth_time,
            fold_smooth_time: cfg.fold_smooth_time,
            fan_out_degrees: cfg.fan_out_degrees,
            last_opened: false,
            turned_at: None,
            y: vec![SmoothDamp::default(); bones],
            x: vec![SmoothDamp::default(); bones],
            poses: vec![BonePose::default(); bones],
            settled_once: false,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn bone_count(&self) -> usize {
        self.bones
    }

    pub fn poses(&self) -> &[BonePose] {
        &self.poses
    }

    /// Curl amount at `now`, zero when the leaf has never been turned.
    pub fn turning(&self, now: Instant) -> f32 {
        self.turned_at.map_or(0.0, |at| {
            turning_time(now.saturating_duration_since(at), self.flip_duration)
        })
    }

    /// Drop accumulated motion; the next update snaps to its targets.
    pub fn reset(&mut self) {
        self.settled_once = false;
        self.turned_at = None;
    }

    /// Advance one frame. The first call after construction or [`Self::reset`]
    /// snaps to the target pose instead of easing into it.
    pub fn update(&mut self, opened: bool, book_closed: bool, now: Instant, dt: f32) -> &[BonePose] {
        if opened != self.last_opened {
            self.last_opened = opened;
            if self.settled_once {
                self.turned_at = Some(now);
            }
        }
        let target = target_rotation(self.index, opened, book_closed, self.fan_out_degrees);
        let targets = bone_targets(self.bones, target, self.turning(now), book_closed);

        for (i, goal) in targets.iter().enumerate() {
            if self.settled_once {
                self.y[i].update_angle(goal.y, self.turn_smooth_time, dt);
                self.x[i].update_angle(goal.x, self.fold_smooth_time, dt);
            } else {
                self.y[i].snap(goal.y);
                self.x[i].snap(goal.x);
            }
            self.poses[i] = BonePose {
                y: self.y[i].value,
                x: self.x[i].value,
            };
        }
        self.settled_once = true;
        &self.poses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: Duration = Duration::from_micros(16_667);

    fn run(
        deformer: &mut PageDeformer,
        opened: bool,
        closed: bool,
        start: Instant,
        frames: u32,
    ) -> Instant {
        let mut now = start;
        for _ in 0..frames {
            now += FRAME;
            deformer.update(opened, closed, now, FRAME.as_secs_f32());
        }
        now
    }

    #[test]
    fn turning_bump_is_zero_at_rest() {
        let flip = Duration::from_millis(400);
        assert_eq!(turning_time(Duration::ZERO, flip), 0.0);
        assert!((turning_time(Duration::from_millis(200), flip) - 1.0).abs() < 1e-6);
        assert!(turning_time(Duration::from_secs(3), flip) < 1e-6);
    }

    #[test]
    fn closed_targets_are_trivial() {
        let poses = bone_targets(31, FRAC_PI_2, 0.7, true);
        assert_eq!(poses[0], BonePose { y: FRAC_PI_2, x: 0.0 });
        assert!(poses[1..].iter().all(|p| *p == BonePose::default()));
    }

    #[test]
    fn fold_only_past_inside_curve_and_follows_target_sign() {
        let right = bone_targets(31, FRAC_PI_2, 1.0, false);
        let left = bone_targets(31, -FRAC_PI_2, 1.0, false);
        assert!(right[..=INSIDE_CURVE_BONES].iter().all(|p| p.x == 0.0));
        assert!(right[20].x > 0.0);
        assert!(left[20].x < 0.0);
    }

    #[test]
    fn settles_to_closed_pose() {
        let cfg = BookConfig::default();
        let mut deformer = PageDeformer::new(0, &cfg);
        let t0 = Instant::now();
        let now = run(&mut deformer, true, false, t0, 30);
        run(&mut deformer, false, true, now, 600);
        let poses = deformer.poses();
        assert!((poses[0].y - FRAC_PI_2).abs() < 1e-3, "{:?}", poses[0]);
        for pose in &poses[1..] {
            assert!(pose.y.abs() < 1e-3 && pose.x.abs() < 1e-3, "{pose:?}");
        }
    }

    #[test]
    fn rapid_toggling_stays_continuous() {
        let cfg = BookConfig::default();
        let mut deformer = PageDeformer::new(3, &cfg);
        let mut now = Instant::now();
        deformer.update(false, false, now, 0.0);
        let mut previous: Vec<SmoothDamp> = deformer.y.clone();
        for frame in 0..240u32 {
            // Toggle every 100 ms, well inside the 400 ms curl.
            let opened = (frame / 6) % 2 == 0;
            now += FRAME;
            deformer.update(opened, false, now, FRAME.as_secs_f32());
            for (before, after) in previous.iter().zip(&deformer.y) {
                assert!((after.value - before.value).abs() < 0.1, "position jump");
                assert!((after.velocity - before.velocity).abs() < 2.0, "velocity jump");
            }
            previous = deformer.y.clone();
        }
    }

    #[test]
    fn smooth_damp_never_overshoots() {
        let mut d = SmoothDamp::new(0.0);
        for _ in 0..200 {
            let v = d.update(1.0, 0.3, 1.0 / 60.0);
            assert!(v <= 1.0);
        }
        assert!((d.value - 1.0).abs() < 1e-3);
        assert_eq!(d.update(1.0, 0.3, 0.0), d.value);
    }

    #[test]
    fn wrap_angle_takes_short_way() {
        assert!((wrap_angle(3.0 * PI / 2.0) + FRAC_PI_2).abs() < 1e-5);
        assert!((wrap_angle(0.25) - 0.25).abs() < 1e-6);
    }
}
