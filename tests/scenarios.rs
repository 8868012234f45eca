use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use image::{Rgba, RgbaImage};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use photo_book::config::{Configuration, PageCanvasConfig};
use photo_book::events::{Album, AlbumsEvent, LoadUpdate, NavKey, Photo, UserInput};
use photo_book::processing::compositor::Compositor;
use photo_book::processing::text::Typefaces;
use photo_book::source::PhotoSource;
use photo_book::tasks::albums::{AppState, PhotoAlbums};
use photo_book::tasks::loader;

const FRAME: Duration = Duration::from_millis(10);

struct SolidSource;

impl PhotoSource for SolidSource {
    async fn fetch(&self, url: &str) -> Result<RgbaImage> {
        if url.starts_with("missing") {
            anyhow::bail!("no such photo");
        }
        Ok(RgbaImage::from_pixel(24, 16, Rgba([30, 90, 160, 255])))
    }
}

fn compositor() -> Compositor {
    let canvas = PageCanvasConfig {
        width: 120,
        height: 160,
        padding_px: 8,
        gap_px: 4,
        single_inset_px: 8,
        matte_px: 2,
        shadow_px: 2,
        caption_band_px: 10,
        ..PageCanvasConfig::default()
    };
    Compositor::new(canvas, Typefaces::none())
}

/// Run the loader to completion and feed every update to `albums`.
async fn load_all(albums: &mut PhotoAlbums, records: Arc<Vec<Album>>, now: Instant) {
    let (tx, mut rx) = mpsc::channel(8);
    let (_req_tx, req_rx) = mpsc::channel(1);
    let cancel = CancellationToken::new();
    let task = tokio::spawn(loader::run(
        records,
        Arc::new(SolidSource),
        compositor(),
        tx,
        req_rx,
        cancel.clone(),
    ));
    while let Some(update) = rx.recv().await {
        let finished = matches!(update, LoadUpdate::Finished);
        albums.on_load_update(update, now);
        if finished {
            break;
        }
    }
    cancel.cancel();
    task.await.unwrap().unwrap();
}

fn drain(events: &mut mpsc::Receiver<AlbumsEvent>) -> Vec<AlbumsEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

/// Tick frame by frame until `done` holds, returning the instant it first did.
fn tick_until(
    albums: &mut PhotoAlbums,
    mut now: Instant,
    limit: Duration,
    done: impl Fn(&PhotoAlbums) -> bool,
) -> Instant {
    let end = now + limit;
    while now < end {
        now += FRAME;
        albums.tick(now);
        if done(albums) {
            return now;
        }
    }
    panic!("condition not reached within {limit:?}");
}

#[tokio::test]
async fn open_and_read_an_album() {
    let records = Arc::new(vec![Album::new(
        "Harbour",
        (0..5)
            .map(|i| Photo::new(format!("harbour-{i}.jpg"), format!("boat {i}")))
            .collect(),
    )]);
    let (events_tx, mut events) = mpsc::channel(64);
    let t0 = Instant::now();
    let mut albums = PhotoAlbums::new(Configuration::default(), records.clone(), events_tx, t0);
    assert_eq!(albums.state(), AppState::Loading);

    load_all(&mut albums, records, t0).await;
    assert_eq!(albums.state(), AppState::Browsing);
    assert_eq!(albums.pile().active(), 0);
    let progress = drain(&mut events);
    assert!(progress.iter().any(|event| matches!(
        event,
        AlbumsEvent::LoadProgress { loaded: 1, total: 1, .. }
    )));

    albums.handle_input(UserInput::Key(NavKey::Enter), t0);
    assert_eq!(albums.state(), AppState::Opening);

    let black = tick_until(&mut albums, t0, Duration::from_secs(1), |a| a.book().is_some());
    assert_eq!(black - t0, Duration::from_millis(300));
    assert_eq!(
        drain(&mut events),
        [AlbumsEvent::AlbumOpened {
            index: 0,
            title: "Harbour".to_string()
        }]
    );
    let book = albums.book().unwrap();
    assert_eq!(book.page_count(), 2);
    assert_eq!(book.displayed_page(), 0);

    let reading = tick_until(&mut albums, black, Duration::from_secs(2), |a| {
        a.state() == AppState::Reading
    });
    assert_eq!(reading - black, Duration::from_millis(1150));
    assert_eq!(albums.book().unwrap().displayed_page(), 1);

    // Three presses, each after the cooldown; the cursor clamps at page_count.
    let mut now = reading;
    for _ in 0..3 {
        albums.handle_input(UserInput::Key(NavKey::Right), now);
        now += Duration::from_millis(300);
        albums.tick(now);
    }
    let book = albums.book().unwrap();
    assert_eq!(book.target_page(), 2);
    assert_eq!(book.displayed_page(), 2);
    assert!(book.closed());

    albums.handle_input(UserInput::Key(NavKey::Escape), now);
    assert_eq!(albums.state(), AppState::Closing);
    let browsing = tick_until(&mut albums, now, Duration::from_secs(2), |a| {
        a.state() == AppState::Browsing
    });
    assert_eq!(browsing - now, Duration::from_millis(900));
    assert!(albums.book().is_none());
    assert_eq!(drain(&mut events), [AlbumsEvent::AlbumClosed { index: 0 }]);
}

#[tokio::test]
async fn flips_inside_the_cooldown_are_dropped() {
    let records = Arc::new(vec![Album::new(
        "Long",
        (0..24).map(|i| Photo::new(format!("p{i}"), "")).collect(),
    )]);
    let (events_tx, _events) = mpsc::channel(64);
    let t0 = Instant::now();
    let mut albums = PhotoAlbums::new(Configuration::default(), records.clone(), events_tx, t0);
    load_all(&mut albums, records, t0).await;
    albums.handle_input(UserInput::Key(NavKey::Enter), t0);
    let reading = tick_until(&mut albums, t0, Duration::from_secs(3), |a| {
        a.state() == AppState::Reading
    });

    albums.handle_input(UserInput::Key(NavKey::Right), reading);
    albums.handle_input(UserInput::Key(NavKey::Right), reading + Duration::from_millis(100));
    albums.handle_input(UserInput::Key(NavKey::Right), reading + Duration::from_millis(299));
    assert_eq!(albums.book().unwrap().target_page(), 2);

    let later = reading + Duration::from_millis(300);
    albums.handle_input(UserInput::Key(NavKey::End), later);
    let book = albums.book().unwrap();
    assert_eq!(book.target_page(), book.page_count());
}

#[tokio::test]
async fn empty_album_opens_with_cover_and_back_only() {
    let records = Arc::new(vec![Album::new("Nothing yet", Vec::new())]);
    let (events_tx, mut events) = mpsc::channel(64);
    let t0 = Instant::now();
    let mut albums = PhotoAlbums::new(Configuration::default(), records.clone(), events_tx, t0);
    load_all(&mut albums, records, t0).await;

    let pages = albums.pages_for(0).unwrap().clone();
    assert_eq!(pages.page_count(), 2);
    assert!(pages.faces().all(|face| face.photos.is_empty()));

    albums.handle_input(UserInput::Key(NavKey::Enter), t0);
    let reading = tick_until(&mut albums, t0, Duration::from_secs(3), |a| {
        a.state() == AppState::Reading
    });
    drain(&mut events);

    let (w, h) = albums.viewport();
    albums.handle_input(
        UserInput::Click {
            x: w as f32 * 0.5,
            y: h as f32 * 0.5,
        },
        reading,
    );
    assert!(drain(&mut events).is_empty());
}

#[tokio::test]
async fn broken_photos_still_build_pages() {
    let records = Arc::new(vec![Album::new(
        "Mixed",
        vec![
            Photo::new("missing-1.jpg", "lost"),
            Photo::new("found.jpg", "kept"),
        ],
    )]);
    let (events_tx, _events) = mpsc::channel(64);
    let t0 = Instant::now();
    let mut albums = PhotoAlbums::new(Configuration::default(), records.clone(), events_tx, t0);
    load_all(&mut albums, records, t0).await;
    let pages = albums.pages_for(0).unwrap();
    assert_eq!(pages.page_count(), 2);
    let interior = pages.face_at(1).unwrap();
    assert_eq!(interior.photos.len(), 2);
    assert_eq!(interior.cells.len(), 2);
}
