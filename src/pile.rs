//! Browsing view: every album as a closed book on a messy pile.

use std::f32::consts::FRAC_PI_2;
use std::time::Instant;

use glam::{Mat4, Vec3};
use tracing::debug;

use crate::book::scene::{Camera, Ray, intersect_triangle};
use crate::config::{BookConfig, PileConfig};

/// Aspect ratio at which the camera reaches its closest position.
const WIDE_ASPECT: f32 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slide {
    Idle,
    Out { started: Instant, direction: i8 },
    In { started: Instant, direction: i8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PileChange {
    /// The outgoing book left the frame; `display` now shows the new top.
    Committed { display: usize },
    /// The incoming book finished sliding in.
    Settled,
}

/// Where and how to draw one book of the pile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PileBook {
    pub index: usize,
    /// 0 for the top of the stack.
    pub depth: usize,
    pub model: Mat4,
    pub opacity: f32,
}

#[derive(Debug, Clone)]
pub struct BookPile {
    cfg: PileConfig,
    width: f32,
    height: f32,
    count: usize,
    active: usize,
    display: usize,
    slide: Slide,
}

fn ease_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

impl BookPile {
    pub fn new(count: usize, cfg: &PileConfig, book: &BookConfig) -> Self {
        Self {
            cfg: cfg.clone(),
            width: book.page_width,
            height: book.page_height,
            count,
            active: 0,
            display: 0,
            slide: Slide::Idle,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The selected album; changes as soon as a cycle is accepted.
    pub fn active(&self) -> usize {
        self.active
    }

    /// The album drawn on top; lags `active` until the slide-out completes.
    pub fn display(&self) -> usize {
        self.display
    }

    pub fn is_sliding(&self) -> bool {
        self.slide != Slide::Idle
    }

    pub fn cycle_next(&mut self, now: Instant) -> bool {
        self.cycle(1, now)
    }

    pub fn cycle_prev(&mut self, now: Instant) -> bool {
        self.cycle(-1, now)
    }

    /// Requests during a slide, or with fewer than two albums, are dropped.
    fn cycle(&mut self, direction: i8, now: Instant) -> bool {
        if self.is_sliding() || self.count < 2 {
            return false;
        }
        self.active = if direction > 0 {
            (self.active + 1) % self.count
        } else {
            (self.active + self.count - 1) % self.count
        };
        self.slide = Slide::Out {
            started: now,
            direction,
        };
        debug!(active = self.active, direction, "pile cycle");
        true
    }

    /// Jump to `index` without animation.
    pub fn select(&mut self, index: usize) {
        if index < self.count {
            self.active = index;
            self.display = index;
            self.slide = Slide::Idle;
        }
    }

    pub fn tick(&mut self, now: Instant) -> Option<PileChange> {
        let duration = self.cfg.slide_duration;
        match self.slide {
            Slide::Out { started, direction } if now.saturating_duration_since(started) >= duration => {
                self.display = self.active;
                self.slide = Slide::In {
                    started: now,
                    direction,
                };
                Some(PileChange::Committed {
                    display: self.display,
                })
            }
            Slide::In { started, .. } if now.saturating_duration_since(started) >= duration => {
                self.slide = Slide::Idle;
                Some(PileChange::Settled)
            }
            _ => None,
        }
    }

    fn progress(&self, started: Instant, now: Instant) -> f32 {
        let span = self.cfg.slide_duration.as_secs_f32().max(f32::EPSILON);
        now.saturating_duration_since(started).as_secs_f32() / span
    }

    /// Horizontal offset of the top book at `now`.
    pub fn slide_offset(&self, now: Instant) -> f32 {
        let distance = self.cfg.slide_distance;
        match self.slide {
            Slide::Idle => 0.0,
            Slide::Out { started, direction } => {
                f32::from(direction) * distance * ease_in_out(self.progress(started, now))
            }
            Slide::In { started, direction } => {
                -f32::from(direction) * distance * (1.0 - ease_in_out(self.progress(started, now)))
            }
        }
    }

    /// Stack depth of `index` below the displayed top.
    pub fn depth_of(&self, index: usize) -> usize {
        if self.count == 0 {
            return 0;
        }
        (index + self.count - self.display % self.count) % self.count
    }

    pub fn opacity_for_depth(&self, depth: usize) -> f32 {
        (1.0 - depth as f32 * self.cfg.opacity_step).max(self.cfg.min_opacity)
    }

    /// Deterministic messy offset `(dx, dz, yaw)` for a book, stable for a
    /// given album index.
    pub fn rest_offset(&self, index: usize) -> (f32, f32, f32) {
        let f = index as f32;
        (
            (f * 1.7 + 0.3).sin() * 0.12 * self.width,
            (f * 2.3 + 1.1).cos() * 0.08 * self.height,
            (f * 3.1 + 0.7).sin() * 0.14,
        )
    }

    fn model_for(&self, index: usize, depth: usize, slide: f32) -> Mat4 {
        let (dx, dz, yaw) = self.rest_offset(index);
        let level = self.count.saturating_sub(depth + 1) as f32;
        let position = Vec3::new(dx + slide, level * self.cfg.book_thickness, dz);
        Mat4::from_translation(position)
            * Mat4::from_rotation_y(yaw)
            * Mat4::from_rotation_x(-FRAC_PI_2)
            * Mat4::from_scale(Vec3::new(self.width, self.height, 1.0))
    }

    /// Every book, bottom of the stack first. Models map the unit quad
    /// `[-0.5, 0.5]²` onto the cover.
    pub fn books(&self, now: Instant) -> Vec<PileBook> {
        let slide = self.slide_offset(now);
        let mut books: Vec<PileBook> = (0..self.count)
            .map(|index| {
                let depth = self.depth_of(index);
                let top = depth == 0;
                PileBook {
                    index,
                    depth,
                    model: self.model_for(index, depth, if top { slide } else { 0.0 }),
                    // The sliding book stays opaque while it leaves the frame.
                    opacity: if top { 1.0 } else { self.opacity_for_depth(depth) },
                }
            })
            .collect();
        books.sort_by(|a, b| b.depth.cmp(&a.depth));
        books
    }

    /// Top-down camera pulled closer on wide viewports.
    pub fn camera(&self, aspect: f32) -> Camera {
        let t = ((aspect - 1.0) / (WIDE_ASPECT - 1.0)).clamp(0.0, 1.0);
        let factor = 1.0 - self.cfg.max_aspect_compensation * t;
        let target = Vec3::ZERO;
        let base = Vec3::new(0.0, self.cfg.camera_height, self.cfg.camera_back);
        Camera::looking_at(target + (base - target) * factor, target, self.cfg.fov_degrees, aspect)
    }

    /// Whether the world-space `ray` lands on the top book. Only the settled
    /// top book is clickable.
    pub fn hit_top(&self, ray: &Ray) -> bool {
        if self.is_sliding() || self.count == 0 {
            return false;
        }
        let model = self.model_for(self.display, 0, 0.0);
        let corner = |x: f32, y: f32| model.transform_point3(Vec3::new(x, y, 0.0));
        let (a, b, c, d) = (
            corner(-0.5, -0.5),
            corner(0.5, -0.5),
            corner(-0.5, 0.5),
            corner(0.5, 0.5),
        );
        intersect_triangle(ray, a, b, c).is_some() || intersect_triangle(ray, c, b, d).is_some()
    }
}
