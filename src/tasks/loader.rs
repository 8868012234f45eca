use std::sync::Arc;

use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::book::pages::{BookPages, build_page_set};
use crate::cache::TextureCache;
use crate::events::{Album, BuildAlbum, LoadUpdate};
use crate::processing::compositor::Compositor;
use crate::source::PhotoSource;

/// Pre-builds every album, one after another, then serves rebuild requests.
///
/// Finished page sets are cached by album slug for the whole session, so a
/// request for an album that was already built is answered from the cache.
pub async fn run<S: PhotoSource>(
    albums: Arc<Vec<Album>>,
    source: Arc<S>,
    compositor: Compositor,
    to_viewer: Sender<LoadUpdate>,
    mut requests: Receiver<BuildAlbum>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut cache: TextureCache<String, Arc<BookPages>> = TextureCache::new();
    let total = albums.len();

    for (index, album) in albums.iter().enumerate() {
        let progress = LoadUpdate::Progress {
            index,
            total,
            title: album.title.clone(),
        };
        if to_viewer.send(progress).await.is_err() {
            debug!("viewer gone; loader stopping");
            return Ok(());
        }
        let pages = select! {
            _ = cancel.cancelled() => return Ok(()),
            pages = build(album, source.as_ref(), &compositor, &mut cache) => pages,
        };
        if to_viewer
            .send(LoadUpdate::AlbumReady { index, pages })
            .await
            .is_err()
        {
            return Ok(());
        }
    }
    info!(albums = total, "all albums built");
    if to_viewer.send(LoadUpdate::Finished).await.is_err() {
        return Ok(());
    }

    loop {
        select! {
            _ = cancel.cancelled() => break,
            request = requests.recv() => {
                let Some(BuildAlbum(index)) = request else { break };
                let Some(album) = albums.get(index) else {
                    warn!(index, "build requested for unknown album");
                    continue;
                };
                let pages = select! {
                    _ = cancel.cancelled() => break,
                    pages = build(album, source.as_ref(), &compositor, &mut cache) => pages,
                };
                if to_viewer.send(LoadUpdate::AlbumReady { index, pages }).await.is_err() {
                    break;
                }
            }
        }
    }
    Ok(())
}

async fn build<S: PhotoSource>(
    album: &Album,
    source: &S,
    compositor: &Compositor,
    cache: &mut TextureCache<String, Arc<BookPages>>,
) -> Arc<BookPages> {
    let slug = album.slug();
    if let Some(pages) = cache.get(&slug) {
        debug!(album = %album.title, "album pages served from cache");
        return pages.clone();
    }
    let pages = Arc::new(build_page_set(album, source, compositor).await);
    cache.insert_if_absent(slug, pages).clone()
}
