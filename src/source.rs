//! Where photo pixels come from: local files or HTTP(S) URLs.

use std::future::Future;
use std::io::Cursor;
use std::path::PathBuf;

use anyhow::{Context, Result};
use image::RgbaImage;
use tracing::debug;

use crate::config::FetchConfig;
use crate::processing::resize::fit_within;

/// Resolves a photo URL to decoded RGBA pixels.
pub trait PhotoSource: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<RgbaImage>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    Remote(String),
    Local(PathBuf),
}

fn locate(url: &str) -> Location {
    let trimmed = url.trim();
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Location::Remote(trimmed.to_string())
    } else if let Some(rest) = trimmed.strip_prefix("file://") {
        Location::Local(PathBuf::from(rest))
    } else {
        Location::Local(PathBuf::from(trimmed))
    }
}

/// Fetches remote photos with `reqwest` and reads everything else from disk.
#[derive(Debug, Clone)]
pub struct UrlPhotoSource {
    client: reqwest::Client,
    max_dim: u32,
}

impl UrlPhotoSource {
    pub fn new(cfg: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            max_dim: cfg.max_source_dim,
        })
    }
}

impl PhotoSource for UrlPhotoSource {
    async fn fetch(&self, url: &str) -> Result<RgbaImage> {
        let bytes = match locate(url) {
            Location::Remote(url) => {
                let response = self
                    .client
                    .get(&url)
                    .send()
                    .await
                    .with_context(|| format!("request for {url} failed"))?
                    .error_for_status()
                    .with_context(|| format!("server rejected {url}"))?;
                response
                    .bytes()
                    .await
                    .with_context(|| format!("failed to read body of {url}"))?
                    .to_vec()
            }
            Location::Local(path) => tokio::fs::read(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?,
        };
        let max_dim = self.max_dim;
        tokio::task::spawn_blocking(move || decode_photo(&bytes, max_dim))
            .await
            .context("photo decode task failed")?
    }
}

/// Decodes an image to RGBA8, applies EXIF orientation and bounds its size.
pub fn decode_photo(bytes: &[u8], max_dim: u32) -> Result<RgbaImage> {
    let img = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?;
    let img = apply_orientation(img.to_rgba8(), read_orientation(bytes).unwrap_or(1));
    fit_within(img, max_dim)
}

fn read_orientation(bytes: &[u8]) -> Option<u16> {
    let mut cursor = Cursor::new(bytes);
    let exif = exif::Reader::new().read_from_container(&mut cursor).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let orientation = field.value.get_uint(0)? as u16;
    debug!(orientation, "exif orientation");
    Some(orientation)
}

fn apply_orientation(img: RgbaImage, orientation: u16) -> RgbaImage {
    use image::imageops::{flip_horizontal, flip_vertical, rotate90, rotate180, rotate270};
    match orientation {
        2 => flip_horizontal(&img),
        3 => rotate180(&img),
        4 => flip_vertical(&img),
        5 => flip_horizontal(&rotate90(&img)),
        6 => rotate90(&img),
        7 => flip_horizontal(&rotate270(&img)),
        8 => rotate270(&img),
        _ => img,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};

    #[test]
    fn classifies_urls() {
        assert_eq!(
            locate("https://cdn.example/a.jpg"),
            Location::Remote("https://cdn.example/a.jpg".into())
        );
        assert_eq!(
            locate("file:///srv/p.png"),
            Location::Local(PathBuf::from("/srv/p.png"))
        );
        assert_eq!(locate("photos/x.jpg"), Location::Local("photos/x.jpg".into()));
    }

    #[test]
    fn orientation_six_swaps_dimensions() {
        let img = RgbaImage::new(2, 1);
        assert_eq!(apply_orientation(img, 6).dimensions(), (1, 2));
    }

    #[tokio::test]
    async fn reads_local_files_and_reports_missing_ones() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("red.png");
        RgbaImage::from_pixel(8, 4, Rgba([255, 0, 0, 255]))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();

        let source = UrlPhotoSource::new(&FetchConfig::default()).unwrap();
        let img = source.fetch(path.to_str().unwrap()).await.unwrap();
        assert_eq!(img.dimensions(), (8, 4));

        let missing = dir.path().join("nope.png");
        assert!(source.fetch(missing.to_str().unwrap()).await.is_err());
    }
}
