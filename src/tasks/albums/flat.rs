//! Single-face reader for narrow viewports. Shows one composited face at a
//! time, fitted to the window, and reuses the face cells for hit testing.

use tracing::trace;

use crate::book::pages::BookPages;
use crate::events::Photo;
use crate::processing::layout::{GridCell, center_offset, resize_to_contain};

/// Face shown in flat mode for a 3D cursor position: the left-hand face of
/// the open spread, or the cover when shut at the front.
pub fn face_for_cursor(cursor: usize) -> usize {
    (2 * cursor).saturating_sub(1)
}

/// Cursor that shows `face` in the 3D book.
pub fn cursor_for_face(face: usize) -> usize {
    face.div_ceil(2)
}

#[derive(Debug, Clone)]
pub struct FlatReader {
    face: usize,
    face_count: usize,
    swipe_from: Option<f32>,
    swipe_threshold: f32,
}

impl FlatReader {
    pub fn new(face_count: usize, swipe_threshold: f32) -> Self {
        Self {
            face: 0,
            face_count,
            swipe_from: None,
            swipe_threshold,
        }
    }

    pub fn face(&self) -> usize {
        self.face
    }

    pub fn face_count(&self) -> usize {
        self.face_count
    }

    pub fn set_face(&mut self, face: usize) {
        self.face = face.min(self.face_count.saturating_sub(1));
    }

    pub fn next(&mut self) -> bool {
        if self.face + 1 < self.face_count {
            self.face += 1;
            true
        } else {
            false
        }
    }

    pub fn prev(&mut self) -> bool {
        if self.face > 0 {
            self.face -= 1;
            true
        } else {
            false
        }
    }

    pub fn swipe_start(&mut self, x: f32) {
        self.swipe_from = Some(x);
    }

    /// Finish a swipe; a leftward drag past the threshold turns forward.
    pub fn swipe_end(&mut self, x: f32) -> bool {
        let Some(from) = self.swipe_from.take() else {
            return false;
        };
        let dx = x - from;
        trace!(dx, "flat swipe");
        if dx <= -self.swipe_threshold {
            self.next()
        } else if dx >= self.swipe_threshold {
            self.prev()
        } else {
            false
        }
    }

    /// Screen rectangle the current face is drawn into.
    pub fn face_rect(texture: (u32, u32), viewport: (u32, u32)) -> GridCell {
        let (w, h) = resize_to_contain(viewport.0, viewport.1, texture.0, texture.1);
        let (x, y) = center_offset(w, h, viewport.0, viewport.1);
        GridCell::new(x, y, w, h)
    }

    /// Photo under a viewport pixel, using the same cells as the 3D book.
    pub fn hit_test<'a>(
        &self,
        pages: &'a BookPages,
        x: f32,
        y: f32,
        viewport: (u32, u32),
    ) -> Option<&'a Photo> {
        let face = pages.face_at(self.face)?;
        let rect = Self::face_rect((face.texture.width(), face.texture.height()), viewport);
        if !rect.contains(x, y) {
            return None;
        }
        let u = (x - rect.x as f32) / rect.w as f32;
        let v = (y - rect.y as f32) / rect.h as f32;
        face.photo_at_uv(u, v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::pages::{FaceData, FaceRole};
    use crate::processing::compositor::PageTexture;
    use crate::processing::layout::{GridGeometry, compute_grid_cells};
    use image::RgbaImage;

    #[test]
    fn cursor_face_mapping_round_trips() {
        assert_eq!(face_for_cursor(0), 0);
        assert_eq!(face_for_cursor(1), 1);
        assert_eq!(face_for_cursor(2), 3);
        for cursor in 0..6 {
            assert_eq!(cursor_for_face(face_for_cursor(cursor)), cursor);
        }
        assert_eq!(cursor_for_face(2), 1);
    }

    #[test]
    fn swipes_need_the_threshold() {
        let mut reader = FlatReader::new(4, 50.0);
        reader.swipe_start(300.0);
        assert!(!reader.swipe_end(270.0));
        reader.swipe_start(300.0);
        assert!(reader.swipe_end(200.0));
        assert_eq!(reader.face(), 1);
        reader.swipe_start(100.0);
        assert!(reader.swipe_end(200.0));
        assert_eq!(reader.face(), 0);
        assert!(!reader.swipe_end(0.0));
    }

    #[test]
    fn faces_are_clamped() {
        let mut reader = FlatReader::new(4, 50.0);
        reader.set_face(9);
        assert_eq!(reader.face(), 3);
        assert!(!reader.next());
    }

    #[test]
    fn clicks_on_the_fitted_face_find_their_photos() {
        let geo = GridGeometry {
            width: 200,
            height: 260,
            padding: 10,
            gap: 6,
            single_inset: 10,
        };
        let photos: Vec<Photo> = (0..4).map(|i| Photo::new(format!("p{i}"), "")).collect();
        let face = |photos: Vec<Photo>| FaceData {
            role: FaceRole::Front,
            texture: PageTexture::new(RgbaImage::new(geo.width, geo.height), 50),
            cells: compute_grid_cells(photos.len(), &geo),
            photos,
        };
        let pages = BookPages::from_faces(
            "flat",
            "flat",
            vec![face(Vec::new()), face(photos.clone()), face(Vec::new()), face(Vec::new())],
        );
        let viewport = (600, 520);
        let mut reader = FlatReader::new(pages.face_count(), 50.0);
        reader.set_face(1);

        // 200×260 scaled by 2 and centred horizontally.
        let rect = FlatReader::face_rect((200, 260), viewport);
        assert_eq!(rect, GridCell::new(100, 0, 400, 520));
        let cells = compute_grid_cells(4, &geo);
        for (i, cell) in cells.iter().enumerate() {
            let x = rect.x as f32 + (cell.x as f32 + cell.w as f32 * 0.5) * 2.0;
            let y = rect.y as f32 + (cell.y as f32 + cell.h as f32 * 0.5) * 2.0;
            assert_eq!(reader.hit_test(&pages, x, y, viewport), Some(&photos[i]), "cell {i}");
        }

        let gap_x = rect.x as f32 + (cells[0].right() as f32 + 3.0) * 2.0;
        assert_eq!(reader.hit_test(&pages, gap_x, 150.0, viewport), None);
        assert_eq!(reader.hit_test(&pages, 50.0, 260.0, viewport), None);

        reader.set_face(0);
        assert_eq!(reader.hit_test(&pages, 300.0, 260.0, viewport), None);
    }

    #[test]
    fn face_rect_letterboxes() {
        let rect = FlatReader::face_rect((2048, 2730), (800, 600));
        assert_eq!((rect.w, rect.h), (450, 600));
        assert_eq!((rect.x, rect.y), (175, 0));
    }
}
