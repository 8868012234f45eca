//! Top-level orchestration: loading, the browsing pile, opening a book,
//! reading it and closing it again, with every pile/book swap hidden behind
//! a blink.

pub mod blink;
pub mod controls;
pub mod flat;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::Sender;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::book::Book;
use crate::book::intro::{IntroDirector, IntroPhase};
use crate::book::pages::BookPages;
use crate::book::scene::ReadingScene;
use crate::cache::TextureCache;
use crate::config::{Configuration, ViewModePreference};
use crate::events::{Album, AlbumsEvent, BuildAlbum, LoadUpdate, NavKey, UserInput};
use crate::pile::BookPile;
use blink::{Blink, BlinkPhase};
use controls::{NavControl, browse_controls, control_at, reading_controls};
use flat::{FlatReader, cursor_for_face, face_for_cursor};

/// Longest frame step fed to the damping, so a stalled frame cannot fling pages.
const MAX_FRAME_STEP: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Loading,
    Browsing,
    Opening,
    Reading,
    Closing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    ThreeD,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Swap {
    Open(usize),
    Close,
}

/// What the renderer should draw this frame.
pub enum Stage<'a> {
    Loading {
        loaded: usize,
        total: usize,
        title: Option<&'a str>,
    },
    Pile {
        pile: &'a BookPile,
    },
    Book {
        book: &'a Book,
        scene: &'a ReadingScene,
    },
    Flat {
        pages: &'a Arc<BookPages>,
        face: usize,
    },
}

pub struct PhotoAlbums {
    cfg: Configuration,
    albums: Arc<Vec<Album>>,
    cache: TextureCache<String, Arc<BookPages>>,
    loaded: usize,
    loading_title: Option<String>,
    state: AppState,
    pile: BookPile,
    blink: Blink,
    pending: Option<Swap>,
    awaiting: Option<usize>,
    book: Option<Book>,
    open_index: Option<usize>,
    intro: IntroDirector,
    scene: ReadingScene,
    flat: FlatReader,
    view_mode: ViewMode,
    view_locked: bool,
    last_flip: Option<Instant>,
    last_tick: Option<Instant>,
    viewport: (u32, u32),
    events: Sender<AlbumsEvent>,
    build_requests: Option<Sender<BuildAlbum>>,
}

impl PhotoAlbums {
    pub fn new(
        cfg: Configuration,
        albums: Arc<Vec<Album>>,
        events: Sender<AlbumsEvent>,
        now: Instant,
    ) -> Self {
        let viewport = (cfg.window.width, cfg.window.height);
        let view_mode = preferred_mode(cfg.reader.view_mode, viewport.0, cfg.reader.flat_breakpoint_px);
        Self {
            pile: BookPile::new(albums.len(), &cfg.pile, &cfg.book),
            blink: Blink::new(&cfg.blink, now),
            intro: IntroDirector::new(&cfg.intro, now),
            scene: ReadingScene::new(&cfg.intro, &cfg.book, viewport),
            flat: FlatReader::new(0, cfg.reader.swipe_threshold_px),
            cache: TextureCache::new(),
            loaded: 0,
            loading_title: None,
            state: AppState::Loading,
            pending: None,
            awaiting: None,
            book: None,
            open_index: None,
            view_mode,
            view_locked: cfg.reader.view_mode != ViewModePreference::Auto,
            last_flip: None,
            last_tick: None,
            viewport,
            events,
            build_requests: None,
            albums,
            cfg,
        }
    }

    /// Channel used to ask the loader for albums missing from the cache.
    pub fn with_build_requests(mut self, requests: Sender<BuildAlbum>) -> Self {
        self.build_requests = Some(requests);
        self
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn albums(&self) -> &[Album] {
        &self.albums
    }

    pub fn pile(&self) -> &BookPile {
        &self.pile
    }

    pub fn book(&self) -> Option<&Book> {
        self.book.as_ref()
    }

    pub fn scene(&self) -> &ReadingScene {
        &self.scene
    }

    pub fn flat(&self) -> &FlatReader {
        &self.flat
    }

    pub fn intro_phase(&self) -> IntroPhase {
        self.intro.phase()
    }

    pub fn open_index(&self) -> Option<usize> {
        self.open_index
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn blink_phase(&self) -> BlinkPhase {
        self.blink.phase()
    }

    pub fn blink_opacity(&self, now: Instant) -> f32 {
        self.blink.opacity(now)
    }

    /// Built pages of album `index`, if the loader has delivered them.
    pub fn pages_for(&self, index: usize) -> Option<&Arc<BookPages>> {
        let album = self.albums.get(index)?;
        self.cache.get(&album.slug())
    }

    pub fn stage(&self) -> Stage<'_> {
        match (&self.book, self.view_mode) {
            (Some(book), ViewMode::ThreeD) => Stage::Book {
                book,
                scene: &self.scene,
            },
            (Some(book), ViewMode::Flat) => Stage::Flat {
                pages: book.pages(),
                face: self.flat.face(),
            },
            (None, _) if self.state == AppState::Loading => Stage::Loading {
                loaded: self.loaded,
                total: self.albums.len(),
                title: self.loading_title.as_deref(),
            },
            (None, _) => Stage::Pile { pile: &self.pile },
        }
    }

    /// Pointer controls that respond to clicks right now.
    pub fn controls(&self) -> Vec<NavControl> {
        if !self.blink.is_idle() {
            return Vec::new();
        }
        match self.state {
            AppState::Browsing if !self.pile.is_empty() => browse_controls(self.viewport),
            AppState::Reading => reading_controls(self.viewport),
            _ => Vec::new(),
        }
    }

    /// One-line caption for the on-screen overlay.
    pub fn overlay_text(&self) -> Option<String> {
        match self.state {
            AppState::Loading => Some(match &self.loading_title {
                Some(title) => format!(
                    "Loading album {} of {}: {title}",
                    (self.loaded + 1).min(self.albums.len()),
                    self.albums.len()
                ),
                None => "Loading albums".to_string(),
            }),
            AppState::Browsing if self.pile.is_empty() => Some("No albums".to_string()),
            AppState::Browsing => self.albums.get(self.pile.active()).map(|album| {
                format!(
                    "{}  ·  {} of {}  ·  \u{2190} \u{2192} browse, Enter to open",
                    album.title,
                    self.pile.active() + 1,
                    self.albums.len()
                )
            }),
            AppState::Reading => {
                let book = self.book.as_ref()?;
                let position = match self.view_mode {
                    ViewMode::ThreeD => format!(
                        "page {} of {}",
                        book.displayed_page(),
                        book.page_count()
                    ),
                    ViewMode::Flat => format!(
                        "face {} of {}",
                        self.flat.face() + 1,
                        self.flat.face_count()
                    ),
                };
                Some(format!("{}  ·  {position}  ·  Esc to close", book.pages().title()))
            }
            AppState::Opening | AppState::Closing => None,
        }
    }

    fn emit(&self, event: AlbumsEvent) {
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => warn!(?event, "event channel full; dropping"),
            Err(TrySendError::Closed(_)) => debug!("event channel closed"),
        }
    }

    pub fn on_load_update(&mut self, update: LoadUpdate, now: Instant) {
        match update {
            LoadUpdate::Progress {
                index,
                total,
                title,
            } => {
                self.emit(AlbumsEvent::LoadProgress {
                    loaded: index,
                    total,
                    album: title.clone(),
                });
                self.loading_title = Some(title);
            }
            LoadUpdate::AlbumReady { index, pages } => {
                let Some(album) = self.albums.get(index) else {
                    warn!(index, "pages delivered for unknown album");
                    return;
                };
                let slug = album.slug();
                let fresh = !self.cache.contains(&slug);
                self.cache.insert_if_absent(slug, pages);
                if self.state == AppState::Loading && fresh {
                    self.loaded += 1;
                    self.emit(AlbumsEvent::LoadProgress {
                        loaded: self.loaded,
                        total: self.albums.len(),
                        album: album.title.clone(),
                    });
                }
                match self.awaiting {
                    Some(wanted)
                        if wanted == index
                            && self.state == AppState::Browsing
                            && self.pile.active() == index =>
                    {
                        self.awaiting = None;
                        self.begin_open(index, now);
                    }
                    _ => debug!(index, "album pages cached"),
                }
            }
            LoadUpdate::Finished => {
                if self.state == AppState::Loading {
                    info!(albums = self.albums.len(), "loading finished; browsing");
                    self.loading_title = None;
                    self.state = AppState::Browsing;
                }
            }
        }
    }

    pub fn handle_input(&mut self, input: UserInput, now: Instant) {
        match input {
            UserInput::Resize { width, height } => {
                self.resize(width, height, now);
                return;
            }
            UserInput::Key(NavKey::ToggleView) if self.state != AppState::Loading => {
                let next = match self.view_mode {
                    ViewMode::ThreeD => ViewMode::Flat,
                    ViewMode::Flat => ViewMode::ThreeD,
                };
                self.view_locked = true;
                self.set_view_mode(next, now);
                return;
            }
            _ => {}
        }

        let input = match input {
            UserInput::Click { x, y } => match control_at(&self.controls(), x, y) {
                Some(control) => {
                    debug!(icon = ?control.icon, "control clicked");
                    UserInput::Key(control.icon.key())
                }
                None => input,
            },
            _ => input,
        };

        match self.state {
            AppState::Browsing => self.browse_input(input, now),
            AppState::Reading => self.read_input(input, now),
            AppState::Loading | AppState::Opening | AppState::Closing => {}
        }
    }

    fn browse_input(&mut self, input: UserInput, now: Instant) {
        match input {
            UserInput::Key(NavKey::Left) => {
                if self.pile.cycle_prev(now) {
                    self.awaiting = None;
                }
            }
            UserInput::Key(NavKey::Right) => {
                if self.pile.cycle_next(now) {
                    self.awaiting = None;
                }
            }
            UserInput::Key(NavKey::Enter) => {
                self.request_open(now);
            }
            UserInput::Click { x, y } => {
                let (w, h) = self.viewport;
                let ray = self
                    .pile
                    .camera(w as f32 / h as f32)
                    .ray_through(x, y, w, h);
                if self.pile.hit_top(&ray) {
                    self.request_open(now);
                }
            }
            _ => {}
        }
    }

    fn read_input(&mut self, input: UserInput, now: Instant) {
        match input {
            UserInput::Key(NavKey::Escape) => self.request_close(now),
            UserInput::Key(NavKey::Left) => self.flip(now, |cur, _| cur.saturating_sub(1)),
            UserInput::Key(NavKey::Right) => self.flip(now, |cur, _| cur + 1),
            UserInput::Key(NavKey::Home) => self.flip(now, |_, _| 0),
            UserInput::Key(NavKey::End) => self.flip(now, |_, last| last),
            UserInput::Click { x, y } => self.click_page(x, y),
            UserInput::SwipeStart { x } if self.view_mode == ViewMode::Flat => {
                self.flat.swipe_start(x);
            }
            UserInput::SwipeEnd { x } if self.view_mode == ViewMode::Flat => {
                if self.cooling_down(now) {
                    return;
                }
                if self.flat.swipe_end(x) {
                    self.last_flip = Some(now);
                }
            }
            _ => {}
        }
    }

    fn cooling_down(&self, now: Instant) -> bool {
        self.last_flip
            .is_some_and(|last| now.saturating_duration_since(last) < self.cfg.reader.flip_cooldown)
    }

    /// Move to `pick(current, last)` in whichever reader is showing, at most
    /// once per cooldown.
    fn flip(&mut self, now: Instant, pick: impl Fn(usize, usize) -> usize) {
        if self.cooling_down(now) {
            debug!("flip dropped during cooldown");
            return;
        }
        match self.view_mode {
            ViewMode::ThreeD => {
                let Some(book) = self.book.as_mut() else { return };
                let target = pick(book.target_page(), book.page_count());
                book.set_target_page(target, now);
            }
            ViewMode::Flat => {
                let last = self.flat.face_count().saturating_sub(1);
                let target = pick(self.flat.face(), last);
                self.flat.set_face(target);
            }
        }
        self.last_flip = Some(now);
    }

    fn click_page(&mut self, x: f32, y: f32) {
        let Some(book) = self.book.as_ref() else { return };
        let photo = match self.view_mode {
            ViewMode::ThreeD => self
                .scene
                .pick(book, x, y)
                .and_then(|hit| book.photo_at(&hit)),
            ViewMode::Flat => self.flat.hit_test(book.pages(), x, y, self.viewport),
        };
        if let Some(photo) = photo {
            info!(url = %photo.url, "photo clicked");
            self.emit(AlbumsEvent::PhotoClicked(photo.clone()));
        }
    }

    fn request_open(&mut self, now: Instant) {
        if !self.blink.is_idle() || self.pile.is_sliding() || self.pile.is_empty() {
            return;
        }
        let index = self.pile.active();
        if self.pages_for(index).is_some() {
            self.begin_open(index, now);
            return;
        }
        self.awaiting = Some(index);
        match &self.build_requests {
            Some(requests) => {
                if let Err(err) = requests.try_send(BuildAlbum(index)) {
                    warn!(index, error = %err, "could not request album build");
                }
            }
            None => warn!(index, "album pages missing and no loader to ask"),
        }
    }

    fn begin_open(&mut self, index: usize, now: Instant) {
        if self.blink.start(now).is_some() {
            debug!(index, "opening album");
            self.pending = Some(Swap::Open(index));
            self.state = AppState::Opening;
        }
    }

    fn request_close(&mut self, now: Instant) {
        if self.blink.start(now).is_some() {
            self.pending = Some(Swap::Close);
            self.state = AppState::Closing;
        }
    }

    /// Swap scenes while the screen is black.
    fn perform_swap(&mut self, swap: Swap, now: Instant) {
        match swap {
            Swap::Open(index) => {
                let Some(pages) = self.pages_for(index).cloned() else {
                    warn!(index, "album pages vanished before mount");
                    self.state = AppState::Browsing;
                    return;
                };
                let mut book = Book::new(pages, &self.cfg.book);
                book.update_pages(now, 0.0);
                self.scene.snap(&book);
                self.intro.restart(now);
                self.flat = FlatReader::new(
                    book.pages().face_count(),
                    self.cfg.reader.swipe_threshold_px,
                );
                let title = book.pages().title().to_string();
                self.book = Some(book);
                self.open_index = Some(index);
                self.last_flip = None;
                info!(index, album = %title, "album mounted");
                self.emit(AlbumsEvent::AlbumOpened { index, title });
            }
            Swap::Close => {
                if let Some(mut book) = self.book.take() {
                    book.reset();
                }
                if let Some(index) = self.open_index.take() {
                    self.pile.select(index);
                    info!(index, "album closed");
                    self.emit(AlbumsEvent::AlbumClosed { index });
                }
            }
        }
    }

    fn resize(&mut self, width: u32, height: u32, now: Instant) {
        self.viewport = (width.max(1), height.max(1));
        self.scene.resize(self.viewport.0, self.viewport.1);
        if let Some(book) = self.book.as_ref() {
            self.scene.snap(book);
        }
        if !self.view_locked {
            let mode = preferred_mode(
                ViewModePreference::Auto,
                width,
                self.cfg.reader.flat_breakpoint_px,
            );
            if mode != self.view_mode {
                self.set_view_mode(mode, now);
            }
        }
    }

    /// Switch readers, carrying the reading position across.
    fn set_view_mode(&mut self, mode: ViewMode, now: Instant) {
        if mode == self.view_mode {
            return;
        }
        if let Some(book) = self.book.as_mut() {
            match mode {
                ViewMode::Flat => self.flat.set_face(face_for_cursor(book.target_page())),
                ViewMode::ThreeD => {
                    book.set_target_page(cursor_for_face(self.flat.face()), now);
                }
            }
        }
        info!(?mode, "view mode");
        self.view_mode = mode;
    }

    /// Advance every state machine to `now`.
    pub fn tick(&mut self, now: Instant) {
        let dt = self
            .last_tick
            .map_or(Duration::ZERO, |last| now.saturating_duration_since(last))
            .min(MAX_FRAME_STEP)
            .as_secs_f32();
        self.last_tick = Some(now);

        if let Some(change) = self.blink.on_tick(now) {
            match change.to {
                BlinkPhase::Black => {
                    if let Some(swap) = self.pending.take() {
                        self.perform_swap(swap, now);
                    }
                }
                BlinkPhase::Idle if self.state == AppState::Closing => {
                    self.state = AppState::Browsing;
                }
                _ => {}
            }
        }

        self.pile.tick(now);

        let Some(book) = self.book.as_mut() else {
            return;
        };
        if self.state == AppState::Opening {
            if let Some(change) = self.intro.on_tick(now) {
                match change.to {
                    IntroPhase::Opening => {
                        book.set_target_page(1, now);
                    }
                    IntroPhase::Done => {
                        info!(album = %book.pages().title(), "reading");
                        self.state = AppState::Reading;
                    }
                    IntroPhase::Laying => {}
                }
            }
        }
        book.tick(now);
        book.update_pages(now, dt);
        self.scene.update(book, dt);
    }
}

fn preferred_mode(pref: ViewModePreference, width: u32, breakpoint: u32) -> ViewMode {
    match pref {
        ViewModePreference::ThreeD => ViewMode::ThreeD,
        ViewModePreference::Flat => ViewMode::Flat,
        ViewModePreference::Auto if width < breakpoint => ViewMode::Flat,
        ViewModePreference::Auto => ViewMode::ThreeD,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::pages::{FaceData, FaceRole};
    use crate::processing::compositor::PageTexture;
    use image::RgbaImage;
    use tokio::sync::mpsc;

    fn pages(title: &str, faces: usize) -> Arc<BookPages> {
        let faces = (0..faces)
            .map(|_| FaceData {
                role: FaceRole::Front,
                texture: PageTexture::new(RgbaImage::new(4, 4), 50),
                photos: Vec::new(),
                cells: Vec::new(),
            })
            .collect();
        Arc::new(BookPages::from_faces(title, title, faces))
    }

    fn orchestrator(
        titles: &[&str],
    ) -> (PhotoAlbums, mpsc::Receiver<AlbumsEvent>, Instant) {
        let albums: Arc<Vec<Album>> = Arc::new(titles.iter().map(|t| Album::new(*t, Vec::new())).collect());
        let (tx, rx) = mpsc::channel(64);
        let now = Instant::now();
        (PhotoAlbums::new(Configuration::default(), albums, tx, now), rx, now)
    }

    fn run_until(albums: &mut PhotoAlbums, from: Instant, span: Duration) -> Instant {
        let mut now = from;
        let end = from + span;
        while now < end {
            now += Duration::from_millis(10);
            albums.tick(now);
        }
        now
    }

    #[test]
    fn narrow_viewports_default_to_flat() {
        assert_eq!(preferred_mode(ViewModePreference::Auto, 500, 768), ViewMode::Flat);
        assert_eq!(preferred_mode(ViewModePreference::Auto, 1280, 768), ViewMode::ThreeD);
        assert_eq!(preferred_mode(ViewModePreference::ThreeD, 300, 768), ViewMode::ThreeD);
    }

    #[test]
    fn stale_build_results_are_cached_not_mounted() {
        let (mut albums, _rx, t0) = orchestrator(&["a", "b"]);
        let (req_tx, mut req_rx) = mpsc::channel(4);
        albums = albums.with_build_requests(req_tx);
        albums.on_load_update(LoadUpdate::Finished, t0);
        assert_eq!(albums.state(), AppState::Browsing);

        albums.handle_input(UserInput::Key(NavKey::Enter), t0);
        assert_eq!(req_rx.try_recv().unwrap(), BuildAlbum(0));
        assert_eq!(albums.state(), AppState::Browsing);

        // Selection moves on before the build lands.
        albums.handle_input(UserInput::Key(NavKey::Right), t0);
        albums.on_load_update(
            LoadUpdate::AlbumReady {
                index: 0,
                pages: pages("a", 4),
            },
            t0,
        );
        assert_eq!(albums.state(), AppState::Browsing);
        assert!(albums.pages_for(0).is_some());
        assert!(albums.book().is_none());
    }

    #[test]
    fn awaited_build_opens_when_still_selected() {
        let (mut albums, _rx, t0) = orchestrator(&["a"]);
        let (req_tx, _req_rx) = mpsc::channel(4);
        albums = albums.with_build_requests(req_tx);
        albums.on_load_update(LoadUpdate::Finished, t0);
        albums.handle_input(UserInput::Key(NavKey::Enter), t0);
        albums.on_load_update(
            LoadUpdate::AlbumReady {
                index: 0,
                pages: pages("a", 4),
            },
            t0,
        );
        assert_eq!(albums.state(), AppState::Opening);
    }

    fn click(albums: &mut PhotoAlbums, icon: controls::ControlIcon, now: Instant) {
        let control = albums
            .controls()
            .into_iter()
            .find(|control| control.icon == icon)
            .unwrap();
        let rect = control.rect;
        albums.handle_input(
            UserInput::Click {
                x: rect.x as f32 + rect.w as f32 * 0.5,
                y: rect.y as f32 + rect.h as f32 * 0.5,
            },
            now,
        );
    }

    #[test]
    fn on_screen_controls_drive_navigation() {
        use controls::ControlIcon;

        let (mut albums, mut rx, t0) = orchestrator(&["a", "b"]);
        for (index, title) in ["a", "b"].into_iter().enumerate() {
            albums.on_load_update(
                LoadUpdate::AlbumReady {
                    index,
                    pages: pages(title, 8),
                },
                t0,
            );
        }
        albums.on_load_update(LoadUpdate::Finished, t0);
        let icons: Vec<_> = albums.controls().iter().map(|c| c.icon).collect();
        assert_eq!(icons, [ControlIcon::Prev, ControlIcon::Next, ControlIcon::Open]);

        click(&mut albums, ControlIcon::Next, t0);
        assert_eq!(albums.pile().active(), 1);
        let now = run_until(&mut albums, t0, Duration::from_millis(1000));
        assert!(!albums.pile().is_sliding());

        click(&mut albums, ControlIcon::Open, now);
        assert_eq!(albums.state(), AppState::Opening);
        assert!(albums.controls().is_empty());

        let now = run_until(&mut albums, now, Duration::from_millis(2000));
        assert_eq!(albums.state(), AppState::Reading);
        assert_eq!(albums.open_index(), Some(1));
        assert_eq!(albums.book().unwrap().target_page(), 1);
        let icons: Vec<_> = albums.controls().iter().map(|c| c.icon).collect();
        assert_eq!(icons, [ControlIcon::Prev, ControlIcon::Next, ControlIcon::Close]);

        click(&mut albums, ControlIcon::Next, now);
        assert_eq!(albums.book().unwrap().target_page(), 2);
        let now = now + Duration::from_millis(300);
        click(&mut albums, ControlIcon::Prev, now);
        assert_eq!(albums.book().unwrap().target_page(), 1);

        click(&mut albums, ControlIcon::Close, now);
        assert_eq!(albums.state(), AppState::Closing);
        run_until(&mut albums, now, Duration::from_millis(1000));
        assert_eq!(albums.state(), AppState::Browsing);
        assert_eq!(albums.pile().active(), 1);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert!(events.contains(&AlbumsEvent::AlbumOpened {
            index: 1,
            title: "b".to_string()
        }));
        assert!(events.contains(&AlbumsEvent::AlbumClosed { index: 1 }));
        assert!(!events.iter().any(|e| matches!(e, AlbumsEvent::PhotoClicked(_))));
    }

    #[test]
    fn toggle_view_carries_position() {
        let (mut albums, _rx, t0) = orchestrator(&["a"]);
        albums.on_load_update(
            LoadUpdate::AlbumReady {
                index: 0,
                pages: pages("a", 8),
            },
            t0,
        );
        albums.on_load_update(LoadUpdate::Finished, t0);
        albums.handle_input(UserInput::Key(NavKey::Enter), t0);
        let now = run_until(&mut albums, t0, Duration::from_millis(2000));
        assert_eq!(albums.state(), AppState::Reading);
        albums.handle_input(UserInput::Key(NavKey::Right), now);
        assert_eq!(albums.book().unwrap().target_page(), 2);

        albums.handle_input(UserInput::Key(NavKey::ToggleView), now);
        assert_eq!(albums.view_mode(), ViewMode::Flat);
        assert_eq!(albums.flat().face(), 3);
        assert!(matches!(albums.stage(), Stage::Flat { face: 3, .. }));

        let later = now + Duration::from_millis(400);
        albums.handle_input(UserInput::Key(NavKey::Right), later);
        albums.handle_input(UserInput::Key(NavKey::ToggleView), later);
        assert_eq!(albums.book().unwrap().target_page(), 2);
    }
}
