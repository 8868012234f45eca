//! Cameras, rays and the placement of the open book in the world.

use glam::{Mat4, Vec3};

use crate::book::deformer::SmoothDamp;
use crate::book::{Book, BookHit};
use crate::config::{BookConfig, IntroConfig};

const OFFSET_SMOOTH_TIME: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Move the ray into another space. The direction is not renormalised, so
    /// hit distances keep their ordering.
    pub fn transformed(&self, m: &Mat4) -> Ray {
        Ray {
            origin: m.transform_point3(self.origin),
            direction: m.transform_vector3(self.direction),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    pub distance: f32,
    /// Barycentric weight of the second vertex.
    pub u: f32,
    /// Barycentric weight of the third vertex.
    pub v: f32,
}

/// Möller–Trumbore intersection; triangles facing away from the ray are
/// skipped to match back-face culling.
pub fn intersect_triangle(ray: &Ray, a: Vec3, b: Vec3, c: Vec3) -> Option<TriangleHit> {
    const EPSILON: f32 = 1e-7;
    let e1 = b - a;
    let e2 = c - a;
    let p = ray.direction.cross(e2);
    let det = e1.dot(p);
    if det < EPSILON {
        return None;
    }
    let inv = 1.0 / det;
    let s = ray.origin - a;
    let u = s.dot(p) * inv;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(e1);
    let v = ray.direction.dot(q) * inv;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let distance = e2.dot(q) * inv;
    (distance > 0.0).then_some(TriangleHit { distance, u, v })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn looking_at(eye: Vec3, target: Vec3, fov_degrees: f32, aspect: f32) -> Self {
        Self {
            eye,
            target,
            fov_y: fov_degrees.to_radians(),
            aspect: aspect.max(1e-3),
            near: 0.05,
            far: 100.0,
        }
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, Vec3::Y)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection() * self.view()
    }

    /// World-space ray through a pixel of a `width × height` viewport.
    pub fn ray_through(&self, x: f32, y: f32, width: u32, height: u32) -> Ray {
        let ndc_x = 2.0 * x / width.max(1) as f32 - 1.0;
        let ndc_y = 1.0 - 2.0 * y / height.max(1) as f32;
        let inverse = self.view_proj().inverse();
        let near = inverse.project_point3(Vec3::new(ndc_x, ndc_y, 0.0));
        let far = inverse.project_point3(Vec3::new(ndc_x, ndc_y, 1.0));
        Ray::new(near, (far - near).normalize_or_zero())
    }
}

/// Size of the world-space rectangle visible at `distance` from the camera.
pub fn visible_extent(fov_degrees: f32, aspect: f32, distance: f32) -> (f32, f32) {
    let height = 2.0 * distance * (fov_degrees.to_radians() * 0.5).tan();
    (height * aspect, height)
}

/// Book scale for the visible world rectangle at the book plane.
pub fn responsive_scale(visible_width: f32, visible_height: f32, cfg: &IntroConfig) -> f32 {
    cfg.max_scale
        .min(visible_width / cfg.width_divisor)
        .min(visible_height / cfg.height_divisor)
        .max(cfg.min_scale)
}

/// Horizontal shift that centres whatever is visible of the book: the right
/// leaf when shut at the front, the left leaf when shut at the back.
pub fn center_offset(book: &Book, page_width: f32) -> f32 {
    let displayed = book.displayed_page();
    if displayed == 0 {
        -page_width * 0.5
    } else if displayed == book.page_count() {
        page_width * 0.5
    } else {
        0.0
    }
}

/// Camera and book placement while reading.
#[derive(Debug, Clone)]
pub struct ReadingScene {
    intro: IntroConfig,
    page_width: f32,
    viewport: (u32, u32),
    camera: Camera,
    scale: f32,
    offset: SmoothDamp,
}

impl ReadingScene {
    pub fn new(intro: &IntroConfig, book: &BookConfig, viewport: (u32, u32)) -> Self {
        let mut scene = Self {
            intro: intro.clone(),
            page_width: book.page_width,
            viewport,
            camera: Camera::looking_at(Vec3::ZERO, Vec3::NEG_Z, intro.fov_degrees, 1.0),
            scale: 1.0,
            offset: SmoothDamp::new(-book.page_width * 0.5),
        };
        scene.resize(viewport.0, viewport.1);
        scene
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = (width.max(1), height.max(1));
        let aspect = self.viewport.0 as f32 / self.viewport.1 as f32;
        self.camera = Camera::looking_at(
            Vec3::new(0.0, 0.0, self.intro.camera_distance),
            Vec3::ZERO,
            self.intro.fov_degrees,
            aspect,
        );
        let (w, h) = visible_extent(self.intro.fov_degrees, aspect, self.intro.camera_distance);
        self.scale = responsive_scale(w, h, &self.intro);
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn offset(&self) -> f32 {
        self.offset.value
    }

    /// Jump straight to the resting placement for `book`.
    pub fn snap(&mut self, book: &Book) {
        self.offset.snap(center_offset(book, self.page_width));
    }

    pub fn update(&mut self, book: &Book, dt: f32) {
        let goal = center_offset(book, self.page_width);
        self.offset.update(goal, OFFSET_SMOOTH_TIME, dt);
    }

    /// Book space to world space.
    pub fn book_model(&self) -> Mat4 {
        Mat4::from_scale(Vec3::splat(self.scale))
            * Mat4::from_translation(Vec3::new(self.offset.value, 0.0, 0.0))
    }

    pub fn view_proj(&self) -> Mat4 {
        self.camera.view_proj()
    }

    /// Leaf, side and texture coordinate under a viewport pixel.
    pub fn pick(&self, book: &Book, x: f32, y: f32) -> Option<BookHit> {
        let world = self
            .camera
            .ray_through(x, y, self.viewport.0, self.viewport.1);
        book.pick(&world.transformed(&self.book_model().inverse()))
    }

    /// Viewport pixel of a book-space point, for tests and overlays.
    pub fn project(&self, point: Vec3) -> (f32, f32) {
        let clip = self.view_proj() * self.book_model() * point.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        (
            (ndc.x + 1.0) * 0.5 * self.viewport.0 as f32,
            (1.0 - ndc.y) * 0.5 * self.viewport.1 as f32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ray_hits_front_and_skips_back_faces() {
        let (a, b, c) = (
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        );
        let toward = Ray::new(Vec3::new(0.25, 0.25, 5.0), Vec3::NEG_Z);
        let hit = intersect_triangle(&toward, a, b, c).unwrap();
        assert!((hit.distance - 5.0).abs() < 1e-5);
        assert!((hit.u - 0.25).abs() < 1e-5 && (hit.v - 0.25).abs() < 1e-5);

        let behind = Ray::new(Vec3::new(0.25, 0.25, -5.0), Vec3::Z);
        assert!(intersect_triangle(&behind, a, b, c).is_none());
    }

    #[test]
    fn scale_is_clamped_both_ways() {
        let cfg = IntroConfig::default();
        assert_eq!(responsive_scale(100.0, 100.0, &cfg), cfg.max_scale);
        assert_eq!(responsive_scale(0.5, 0.5, &cfg), cfg.min_scale);
        assert!((responsive_scale(3.3, 100.0, &cfg) - 1.1).abs() < 1e-5);
    }

    #[test]
    fn centre_ray_points_down_the_view_axis() {
        let cam = Camera::looking_at(Vec3::new(0.0, 0.0, 4.0), Vec3::ZERO, 45.0, 1.5);
        let ray = cam.ray_through(300.0, 200.0, 600, 400);
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-4);
    }
}
