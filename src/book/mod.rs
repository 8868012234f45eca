//! An open album: the page cursor, its sequential stepping and the per-leaf
//! deformers that animate each flip.

pub mod deformer;
pub mod intro;
pub mod pages;
pub mod scene;
pub mod skinning;

use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::{Mat4, Vec3};
use tracing::{debug, trace};

use crate::config::BookConfig;
use crate::events::Photo;
use deformer::PageDeformer;
use pages::{BookPages, FaceRole};
use scene::{Ray, intersect_triangle};
use skinning::{MeshVertex, PageMesh};

/// Where a ray or click landed on the book.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BookHit {
    pub page: usize,
    pub role: FaceRole,
    pub uv: (f32, f32),
    pub distance: f32,
}

pub struct Book {
    pages: Arc<BookPages>,
    cfg: BookConfig,
    mesh: Arc<PageMesh>,
    deformers: Vec<PageDeformer>,
    skinned: Vec<Vec<MeshVertex>>,
    target: usize,
    displayed: usize,
    next_step_at: Option<Instant>,
}

impl std::fmt::Debug for Book {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Book")
            .field("album", &self.pages.title())
            .field("page_count", &self.page_count())
            .field("displayed", &self.displayed)
            .field("target", &self.target)
            .finish()
    }
}

impl Book {
    pub fn new(pages: Arc<BookPages>, cfg: &BookConfig) -> Self {
        let mesh = Arc::new(PageMesh::new(cfg));
        let deformers = (0..pages.page_count())
            .map(|i| PageDeformer::new(i, cfg))
            .collect();
        Self {
            skinned: vec![Vec::new(); pages.page_count()],
            pages,
            cfg: cfg.clone(),
            mesh,
            deformers,
            target: 0,
            displayed: 0,
            next_step_at: None,
        }
    }

    pub fn pages(&self) -> &Arc<BookPages> {
        &self.pages
    }

    pub fn mesh(&self) -> &Arc<PageMesh> {
        &self.mesh
    }

    pub fn page_count(&self) -> usize {
        self.pages.page_count()
    }

    pub fn displayed_page(&self) -> usize {
        self.displayed
    }

    pub fn target_page(&self) -> usize {
        self.target
    }

    /// True while the cursor still has steps to take.
    pub fn is_stepping(&self) -> bool {
        self.next_step_at.is_some()
    }

    /// Leaf `index` is turned to the left.
    pub fn opened(&self, index: usize) -> bool {
        self.displayed > index
    }

    pub fn closed(&self) -> bool {
        self.displayed == 0 || self.displayed == self.page_count()
    }

    fn step_delay(&self) -> Duration {
        if self.target.abs_diff(self.displayed) > self.cfg.fast_step_distance {
            self.cfg.step_fast
        } else {
            self.cfg.step_slow
        }
    }

    /// Take one step toward the target and schedule the next one.
    fn step(&mut self, now: Instant) -> Option<usize> {
        if self.displayed == self.target {
            self.next_step_at = None;
            return None;
        }
        let delay = self.step_delay();
        if self.target > self.displayed {
            self.displayed += 1;
        } else {
            self.displayed -= 1;
        }
        self.next_step_at = (self.displayed != self.target).then(|| now + delay);
        trace!(displayed = self.displayed, target = self.target, "page step");
        Some(self.displayed)
    }

    /// Aim the cursor at `page`, clamped to `[0, page_count]`.
    ///
    /// The first leaf turns immediately; the rest follow one per step, 50 ms
    /// apart while far from the target and 150 ms apart near it. A new target
    /// replaces any pending step.
    pub fn set_target_page(&mut self, page: usize, now: Instant) -> Option<usize> {
        let page = page.min(self.page_count());
        if page == self.target {
            return None;
        }
        debug!(from = self.displayed, to = page, "page target changed");
        self.target = page;
        self.step(now)
    }

    /// Fire the pending step if it is due. At most one step per call.
    pub fn tick(&mut self, now: Instant) -> Option<usize> {
        match self.next_step_at {
            Some(at) if now >= at => self.step(now),
            _ => None,
        }
    }

    /// Put every leaf back on the right-hand side without animation.
    pub fn reset(&mut self) {
        self.target = 0;
        self.displayed = 0;
        self.next_step_at = None;
        for deformer in &mut self.deformers {
            deformer.reset();
        }
    }

    /// Placement of leaf `index` inside the book group: the group turns the
    /// pages to face the reader and each leaf is stacked by the paper depth.
    pub fn page_transform(&self, index: usize) -> Mat4 {
        let depth = self.cfg.page_depth;
        let z = -(index as f32) * depth + self.displayed as f32 * depth;
        Mat4::from_rotation_y(-FRAC_PI_2) * Mat4::from_translation(Vec3::new(0.0, 0.0, z))
    }

    /// Advance every deformer and re-skin the leaves.
    pub fn update_pages(&mut self, now: Instant, dt: f32) {
        let closed = self.closed();
        for i in 0..self.deformers.len() {
            let opened = self.opened(i);
            let transform = self.page_transform(i);
            let poses = self.deformers[i].update(opened, closed, now, dt);
            self.skinned[i] = self.mesh.skin(poses, transform);
        }
    }

    /// Skinned vertices of leaf `index` in book space, from the last update.
    pub fn skinned_page(&self, index: usize) -> &[MeshVertex] {
        self.skinned.get(index).map_or(&[], Vec::as_slice)
    }

    /// Bone rotations of leaf `index`, from the last update.
    pub fn bone_poses(&self, index: usize) -> &[deformer::BonePose] {
        self.deformers.get(index).map_or(&[], |d| d.poses())
    }

    /// Nearest front-facing triangle hit by `ray` (in book space).
    pub fn pick(&self, ray: &Ray) -> Option<BookHit> {
        let mut best: Option<BookHit> = None;
        for (page, vertices) in self.skinned.iter().enumerate() {
            if vertices.is_empty() {
                continue;
            }
            for tri in self.mesh.triangles() {
                let [a, b, c] = tri.indices.map(|i| &vertices[i as usize]);
                let Some(hit) = intersect_triangle(
                    ray,
                    Vec3::from(a.position),
                    Vec3::from(b.position),
                    Vec3::from(c.position),
                ) else {
                    continue;
                };
                if best.is_some_and(|prev| prev.distance <= hit.distance) {
                    continue;
                }
                let w = 1.0 - hit.u - hit.v;
                let u = a.uv[0] * w + b.uv[0] * hit.u + c.uv[0] * hit.v;
                let v = a.uv[1] * w + b.uv[1] * hit.u + c.uv[1] * hit.v;
                best = Some(BookHit {
                    page,
                    role: tri.role,
                    uv: (u, v),
                    distance: hit.distance,
                });
            }
        }
        best
    }

    /// Photo drawn at `hit`, if the click landed inside a cell.
    pub fn photo_at(&self, hit: &BookHit) -> Option<&Photo> {
        self.pages.hit_test(hit.page, hit.role, hit.uv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::pages::{FaceData, FaceRole};
    use crate::book::scene::ReadingScene;
    use crate::config::IntroConfig;
    use crate::processing::compositor::PageTexture;
    use crate::processing::layout::{GridGeometry, compute_grid_cells};
    use glam::Vec2;
    use image::RgbaImage;

    fn blank_pages(page_count: usize) -> Arc<BookPages> {
        let faces = (0..page_count * 2)
            .map(|_| FaceData {
                role: FaceRole::Front,
                texture: PageTexture::new(RgbaImage::new(4, 4), 50),
                photos: Vec::new(),
                cells: Vec::new(),
            })
            .collect();
        Arc::new(BookPages::from_faces("test", "test", faces))
    }

    #[test]
    fn steps_are_sequential_and_paced() {
        let cfg = BookConfig::default();
        let mut book = Book::new(blank_pages(12), &cfg);
        let t0 = Instant::now();
        assert_eq!(book.set_target_page(10, t0), Some(1));

        let mut visited = vec![book.displayed_page()];
        let mut now = t0;
        while book.is_stepping() {
            now += Duration::from_millis(10);
            if let Some(p) = book.tick(now) {
                visited.push(p);
            }
        }
        assert_eq!(visited, (1..=10).collect::<Vec<_>>());
        // 8 fast steps while more than two pages away, then a slow one.
        assert_eq!(now - t0, Duration::from_millis(8 * 50 + 150));
    }

    #[test]
    fn target_is_clamped_and_retargeting_reverses() {
        let cfg = BookConfig::default();
        let mut book = Book::new(blank_pages(2), &cfg);
        let t0 = Instant::now();
        book.set_target_page(99, t0);
        assert_eq!(book.target_page(), 2);
        assert_eq!(book.displayed_page(), 1);
        assert_eq!(book.set_target_page(0, t0), Some(0));
        assert!(!book.is_stepping());
        assert!(book.closed());
    }

    #[test]
    fn at_most_one_step_per_tick() {
        let cfg = BookConfig::default();
        let mut book = Book::new(blank_pages(6), &cfg);
        let t0 = Instant::now();
        book.set_target_page(6, t0);
        book.tick(t0 + Duration::from_secs(5));
        assert_eq!(book.displayed_page(), 2);
    }

    #[test]
    fn opened_and_closed_follow_cursor() {
        let cfg = BookConfig::default();
        let mut book = Book::new(blank_pages(3), &cfg);
        assert!(book.closed());
        book.set_target_page(1, Instant::now());
        assert!(book.opened(0));
        assert!(!book.opened(1));
        assert!(!book.closed());
    }

    fn photo_face(photos: Vec<Photo>, geo: &GridGeometry) -> FaceData {
        FaceData {
            role: FaceRole::Front,
            texture: PageTexture::new(RgbaImage::new(geo.width, geo.height), 50),
            cells: compute_grid_cells(photos.len(), geo),
            photos,
        }
    }

    /// Book-space position of texture coordinate `uv` on one side of a leaf.
    fn point_on_leaf(book: &Book, page: usize, role: FaceRole, uv: Vec2) -> Option<Vec3> {
        let vertices = book.skinned_page(page);
        for tri in book.mesh().triangles().iter().filter(|tri| tri.role == role) {
            let [a, b, c] = tri.indices.map(|i| &vertices[i as usize]);
            let (ua, ub, uc) = (Vec2::from(a.uv), Vec2::from(b.uv), Vec2::from(c.uv));
            let (e0, e1, d) = (ub - ua, uc - ua, uv - ua);
            let den = e0.perp_dot(e1);
            if den.abs() < 1e-12 {
                continue;
            }
            let s = d.perp_dot(e1) / den;
            let t = e0.perp_dot(d) / den;
            if s >= 0.0 && t >= 0.0 && s + t <= 1.0 {
                let [pa, pb, pc] = [a, b, c].map(|v| Vec3::from(v.position));
                return Some(pa * (1.0 - s - t) + pb * s + pc * t);
            }
        }
        None
    }

    #[test]
    fn clicks_on_the_open_spread_find_their_photos() {
        let cfg = BookConfig::default();
        let geo = GridGeometry {
            width: 200,
            height: 260,
            padding: 10,
            gap: 6,
            single_inset: 10,
        };
        let left: Vec<Photo> = (0..4).map(|i| Photo::new(format!("l{i}"), "")).collect();
        let right: Vec<Photo> = (0..4).map(|i| Photo::new(format!("r{i}"), "")).collect();
        let faces = vec![
            photo_face(Vec::new(), &geo),
            photo_face(left.clone(), &geo),
            photo_face(right.clone(), &geo),
            photo_face(Vec::new(), &geo),
            photo_face(Vec::new(), &geo),
            photo_face(Vec::new(), &geo),
        ];
        let pages = Arc::new(BookPages::from_faces("spread", "spread", faces));
        let mut book = Book::new(pages, &cfg);
        let mut scene = ReadingScene::new(&IntroConfig::default(), &cfg, (1280, 800));

        let mut now = Instant::now();
        book.set_target_page(1, now);
        for _ in 0..400 {
            now += Duration::from_millis(16);
            book.tick(now);
            book.update_pages(now, 0.016);
            scene.update(&book, 0.016);
        }
        assert_eq!(book.displayed_page(), 1);

        for (page, role, photos) in [(0, FaceRole::Back, &left), (1, FaceRole::Front, &right)] {
            let face = book.pages().face_at(2 * page + usize::from(role == FaceRole::Back)).unwrap();
            for (i, cell) in face.cells.iter().enumerate() {
                let uv = Vec2::new(
                    (cell.x as f32 + cell.w as f32 * 0.5) / geo.width as f32,
                    (cell.y as f32 + cell.h as f32 * 0.5) / geo.height as f32,
                );
                let point = point_on_leaf(&book, page, role, uv).unwrap();
                let (x, y) = scene.project(point);
                let hit = scene.pick(&book, x, y).unwrap();
                assert_eq!((hit.page, hit.role), (page, role), "cell {i}");
                assert_eq!(book.photo_at(&hit), Some(&photos[i]), "cell {i}");
            }

            // The gap between the first two cells hits paper, not a photo.
            let gap = Vec2::new(
                (face.cells[0].right() as f32 + geo.gap as f32 * 0.5) / geo.width as f32,
                (face.cells[0].y as f32 + face.cells[0].h as f32 * 0.5) / geo.height as f32,
            );
            let point = point_on_leaf(&book, page, role, gap).unwrap();
            let (x, y) = scene.project(point);
            let hit = scene.pick(&book, x, y).unwrap();
            assert_eq!(book.photo_at(&hit), None);
        }

        assert!(scene.pick(&book, 2.0, 2.0).is_none());
    }

    #[test]
    fn closed_book_settles_to_trivial_pose() {
        let cfg = BookConfig::default();
        let mut book = Book::new(blank_pages(3), &cfg);
        let mut now = Instant::now();
        book.set_target_page(2, now);
        for _ in 0..120 {
            now += Duration::from_millis(16);
            book.tick(now);
            book.update_pages(now, 0.016);
        }
        book.set_target_page(3, now);
        for _ in 0..600 {
            now += Duration::from_millis(16);
            book.tick(now);
            book.update_pages(now, 0.016);
        }
        assert!(book.closed());
        for page in 0..3 {
            let poses = book.bone_poses(page);
            assert!((poses[0].y + FRAC_PI_2).abs() < 1e-3, "page {page}: {:?}", poses[0]);
            assert!(poses[1..].iter().all(|p| p.y.abs() < 1e-3 && p.x.abs() < 1e-3));
        }
    }
}
