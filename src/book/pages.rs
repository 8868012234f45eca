//! The leaves of an album: which content lands on which face, the composited
//! textures, and the cells needed to map a click back to a photo.

use tracing::{debug, info};

use crate::events::{Album, Photo};
use crate::processing::compositor::{Compositor, PageTexture};
use crate::processing::layout::{GridCell, MAX_PHOTOS_PER_FACE};
use crate::processing::title_card::CardSide;
use crate::source::PhotoSource;

/// Which side of a leaf a triangle, texture or click belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaceRole {
    Front,
    Back,
}

/// Planned content of one face, in reading order.
#[derive(Debug, Clone, PartialEq)]
pub enum FaceContent {
    Cover,
    /// Up to four photos; empty for the blank interior of an empty album.
    Photos(Vec<Photo>),
    /// Padding inserted before the back cover to make the face count even.
    Filler,
    BackCover,
}

/// Lay out an album as cover, interior faces of up to four photos, optional
/// filler and back cover. The result always has an even length of at least 4.
pub fn plan_faces(photos: &[Photo]) -> Vec<FaceContent> {
    let mut faces = vec![FaceContent::Cover];
    if photos.is_empty() {
        faces.push(FaceContent::Photos(Vec::new()));
    } else {
        faces.extend(
            photos
                .chunks(MAX_PHOTOS_PER_FACE)
                .map(|chunk| FaceContent::Photos(chunk.to_vec())),
        );
    }
    if faces.len() % 2 == 0 {
        faces.push(FaceContent::Filler);
    }
    faces.push(FaceContent::BackCover);
    faces
}

/// Number of leaves produced for an album with `photo_count` photos.
pub fn page_count_for(photo_count: usize) -> usize {
    let interior = photo_count.div_ceil(MAX_PHOTOS_PER_FACE).max(1);
    (2 + interior).div_ceil(2)
}

#[derive(Debug, Clone)]
pub struct FaceData {
    pub role: FaceRole,
    pub texture: PageTexture,
    pub photos: Vec<Photo>,
    pub cells: Vec<GridCell>,
}

impl FaceData {
    /// Photo whose cell contains the canvas pixel, if any.
    pub fn photo_at_pixel(&self, px: f32, py: f32) -> Option<&Photo> {
        let index = self.cells.iter().position(|cell| cell.contains(px, py))?;
        self.photos.get(index)
    }

    /// Photo under texture coordinate `(u, v)` with `v` growing downwards.
    pub fn photo_at_uv(&self, u: f32, v: f32) -> Option<&Photo> {
        if !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&v) {
            return None;
        }
        let px = u * self.texture.width() as f32;
        let py = v * self.texture.height() as f32;
        self.photo_at_pixel(px, py)
    }
}

/// One physical leaf.
#[derive(Debug, Clone)]
pub struct PageData {
    pub front: FaceData,
    pub back: FaceData,
}

impl PageData {
    pub fn face(&self, role: FaceRole) -> &FaceData {
        match role {
            FaceRole::Front => &self.front,
            FaceRole::Back => &self.back,
        }
    }
}

/// Every leaf of one album. Built once and shared read-only.
#[derive(Debug, Clone)]
pub struct BookPages {
    title: String,
    slug: String,
    pages: Vec<PageData>,
}

impl BookPages {
    /// Pair consecutive faces into leaves. A trailing unpaired face is dropped;
    /// [`plan_faces`] never produces one.
    pub fn from_faces(title: impl Into<String>, slug: impl Into<String>, faces: Vec<FaceData>) -> Self {
        let mut pages = Vec::with_capacity(faces.len() / 2);
        let mut iter = faces.into_iter();
        while let (Some(mut front), Some(mut back)) = (iter.next(), iter.next()) {
            front.role = FaceRole::Front;
            back.role = FaceRole::Back;
            pages.push(PageData { front, back });
        }
        Self {
            title: title.into(),
            slug: slug.into(),
            pages,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn face_count(&self) -> usize {
        self.pages.len() * 2
    }

    /// Faces in reading order: front of leaf 0, back of leaf 0, front of leaf 1, ...
    pub fn faces(&self) -> impl Iterator<Item = &FaceData> {
        self.pages.iter().flat_map(|page| [&page.front, &page.back])
    }

    pub fn face_at(&self, index: usize) -> Option<&FaceData> {
        let page = self.pages.get(index / 2)?;
        Some(if index % 2 == 0 { &page.front } else { &page.back })
    }

    /// Map a click on leaf `page`, side `role`, at texture coordinate `uv`
    /// back to the photo drawn there.
    pub fn hit_test(&self, page: usize, role: FaceRole, uv: (f32, f32)) -> Option<&Photo> {
        self.pages.get(page)?.face(role).photo_at_uv(uv.0, uv.1)
    }
}

async fn build_face<S: PhotoSource>(
    content: &FaceContent,
    album: &Album,
    source: &S,
    compositor: &Compositor,
) -> FaceData {
    let role = FaceRole::Front;
    match content {
        FaceContent::Cover | FaceContent::BackCover => {
            let side = if matches!(content, FaceContent::Cover) {
                CardSide::Front
            } else {
                CardSide::Back
            };
            let texture = compositor
                .render_cover(
                    source,
                    &album.title,
                    album.cover_image_url.as_deref(),
                    album.created_at,
                    side,
                )
                .await;
            FaceData {
                role,
                texture,
                photos: Vec::new(),
                cells: Vec::new(),
            }
        }
        FaceContent::Filler => FaceData {
            role,
            texture: compositor.blank_face(),
            photos: Vec::new(),
            cells: Vec::new(),
        },
        FaceContent::Photos(photos) => {
            let cells = compositor.cells_for(photos.len());
            let texture = compositor
                .render_grid_texture(source, photos, &cells)
                .await;
            FaceData {
                role,
                texture,
                photos: photos.clone(),
                cells,
            }
        }
    }
}

/// Composite every face of `album`. Both faces of a leaf are built
/// concurrently; leaves are built in order.
pub async fn build_page_set<S: PhotoSource>(
    album: &Album,
    source: &S,
    compositor: &Compositor,
) -> BookPages {
    let plan = plan_faces(&album.photos);
    let mut faces = Vec::with_capacity(plan.len());
    for (leaf, pair) in plan.chunks(2).enumerate() {
        match pair {
            [front, back] => {
                let (front, back) = futures::join!(
                    build_face(front, album, source, compositor),
                    build_face(back, album, source, compositor),
                );
                faces.push(front);
                faces.push(back);
            }
            [single] => faces.push(build_face(single, album, source, compositor).await),
            _ => {}
        }
        debug!(album = %album.title, leaf, "leaf composited");
    }
    let pages = BookPages::from_faces(album.title.clone(), album.slug(), faces);
    info!(
        album = %album.title,
        photos = album.photos.len(),
        pages = pages.page_count(),
        "album pages ready"
    );
    pages
}
