use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::book::pages::BookPages;

/// One photo as supplied by the content layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Photo {
    pub url: String,
    #[serde(default)]
    pub caption: String,
}

impl Photo {
    pub fn new(url: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            caption: caption.into(),
        }
    }
}

/// An album record, the unit the pile and the book operate on.
#[derive(Debug, Clone, PartialEq)]
pub struct Album {
    pub title: String,
    pub cover_image_url: Option<String>,
    pub photos: Vec<Photo>,
    pub created_at: Option<NaiveDate>,
}

impl Album {
    pub fn new(title: impl Into<String>, photos: Vec<Photo>) -> Self {
        Self {
            title: title.into(),
            cover_image_url: None,
            photos,
            created_at: None,
        }
    }

    /// Stable cache key derived from the title.
    pub fn slug(&self) -> String {
        let mut slug = String::with_capacity(self.title.len());
        let mut pending_dash = false;
        for ch in self.title.chars() {
            if ch.is_alphanumeric() {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.extend(ch.to_lowercase());
            } else {
                pending_dash = true;
            }
        }
        if slug.is_empty() {
            slug.push_str("untitled");
        }
        slug
    }
}

/// Progress and results streamed from the loader to the viewer.
#[derive(Debug, Clone)]
pub enum LoadUpdate {
    /// The loader started building album `index` of `total`.
    Progress {
        index: usize,
        total: usize,
        title: String,
    },
    /// Pages for album `index` are ready.
    AlbumReady {
        index: usize,
        pages: Arc<BookPages>,
    },
    /// Every album requested at startup has been built.
    Finished,
}

/// Asks the loader to (re)build a single album out of band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildAlbum(pub usize);

/// Notifications emitted by the orchestrator for the embedding application.
#[derive(Debug, Clone, PartialEq)]
pub enum AlbumsEvent {
    LoadProgress {
        loaded: usize,
        total: usize,
        album: String,
    },
    AlbumOpened {
        index: usize,
        title: String,
    },
    AlbumClosed {
        index: usize,
    },
    PhotoClicked(Photo),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Left,
    Right,
    Enter,
    Escape,
    Home,
    End,
    ToggleView,
}

/// Input surface of the orchestrator, already translated from window events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UserInput {
    Key(NavKey),
    /// Primary click at a position in physical pixels.
    Click { x: f32, y: f32 },
    SwipeStart { x: f32 },
    SwipeEnd { x: f32 },
    Resize { width: u32, height: u32 },
}
