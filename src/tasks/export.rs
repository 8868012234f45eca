//! Headless export: composite every album and write its faces to disk, plus
//! a static flat reader that embeds the faces as data URLs.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::book::pages::{BookPages, build_page_set};
use crate::events::Album;
use crate::processing::compositor::Compositor;
use crate::source::PhotoSource;

/// Build and write every album under `out_dir/<slug>/`. Returns the album
/// directories written.
pub async fn run<S: PhotoSource>(
    albums: Arc<Vec<Album>>,
    source: Arc<S>,
    compositor: Compositor,
    out_dir: PathBuf,
    cancel: CancellationToken,
) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(&out_dir)
        .await
        .with_context(|| format!("failed to create export directory {}", out_dir.display()))?;

    let mut written = Vec::with_capacity(albums.len());
    for album in albums.iter() {
        let pages = select! {
            _ = cancel.cancelled() => break,
            pages = build_page_set(album, source.as_ref(), &compositor) => Arc::new(pages),
        };
        let dir = out_dir.join(pages.slug());
        write_album(pages.clone(), dir.clone()).await?;
        info!(album = %album.title, faces = pages.face_count(), dir = %dir.display(), "album exported");
        written.push(dir);
    }
    Ok(written)
}

async fn write_album(pages: Arc<BookPages>, dir: PathBuf) -> Result<()> {
    tokio::task::spawn_blocking(move || write_album_blocking(&pages, &dir))
        .await
        .context("export task panicked")?
}

fn write_album_blocking(pages: &BookPages, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    for (index, face) in pages.faces().enumerate() {
        let path = dir.join(face_file_name(index));
        face.texture
            .image
            .save(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        debug!(path = %path.display(), "face written");
    }
    let index = dir.join("index.html");
    std::fs::write(&index, flat_reader_html(pages))
        .with_context(|| format!("failed to write {}", index.display()))?;
    Ok(())
}

pub fn face_file_name(index: usize) -> String {
    format!("face-{index:02}.png")
}

/// Single-page reader listing every face in order, one per screen.
pub fn flat_reader_html(pages: &BookPages) -> String {
    let title = escape_html(pages.title());
    let mut html = String::new();
    let _ = write!(
        html,
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n<style>\n\
         body {{ margin: 0; background: #1b1a19; }}\n\
         img {{ display: block; max-width: 100vw; max-height: 100vh; margin: 0 auto 2rem; }}\n\
         </style>\n</head>\n<body>\n"
    );
    for (index, face) in pages.faces().enumerate() {
        let alt = match face.photos.len() {
            0 => format!("{title}, face {}", index + 1),
            _ => face
                .photos
                .iter()
                .map(|photo| escape_html(&photo.caption))
                .filter(|caption| !caption.is_empty())
                .collect::<Vec<_>>()
                .join("; "),
        };
        let _ = writeln!(
            html,
            "<img src=\"{}\" alt=\"{alt}\" width=\"{}\" height=\"{}\">",
            face.texture.data_url,
            face.texture.width(),
            face.texture.height()
        );
    }
    html.push_str("</body>\n</html>\n");
    html
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageCanvasConfig;
    use crate::events::Photo;
    use crate::processing::text::Typefaces;
    use image::{Rgba, RgbaImage};

    struct SolidSource;

    impl PhotoSource for SolidSource {
        async fn fetch(&self, _url: &str) -> Result<RgbaImage> {
            Ok(RgbaImage::from_pixel(8, 8, Rgba([200, 40, 40, 255])))
        }
    }

    fn compositor() -> Compositor {
        let canvas = PageCanvasConfig {
            width: 90,
            height: 120,
            padding_px: 6,
            gap_px: 4,
            single_inset_px: 6,
            matte_px: 2,
            shadow_px: 1,
            caption_band_px: 8,
            ..PageCanvasConfig::default()
        };
        Compositor::new(canvas, Typefaces::none())
    }

    #[test]
    fn html_escapes_titles() {
        assert_eq!(escape_html("Tom & \"Jerry\" <3"), "Tom &amp; &quot;Jerry&quot; &lt;3");
    }

    #[tokio::test]
    async fn writes_every_face_and_an_index() {
        let out = tempfile::tempdir().unwrap();
        let albums = Arc::new(vec![Album::new(
            "Road Trip",
            (0..5).map(|i| Photo::new(format!("p{i}"), format!("stop {i}"))).collect(),
        )]);
        let dirs = run(
            albums,
            Arc::new(SolidSource),
            compositor(),
            out.path().to_path_buf(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(dirs, [out.path().join("road-trip")]);
        // Cover, two photo faces, back cover.
        for index in 0..4 {
            assert!(dirs[0].join(face_file_name(index)).is_file(), "face {index}");
        }
        let html = std::fs::read_to_string(dirs[0].join("index.html")).unwrap();
        assert_eq!(html.matches("<img ").count(), 4);
        assert!(!dirs[0].join(face_file_name(4)).exists());
        assert!(html.contains("data:image/jpeg;base64,"));
        assert!(html.contains("stop 4"));
    }
}
