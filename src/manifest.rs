//! Album list loading.
//!
//! The manifest is either a bare list of album records or a mapping with an
//! `albums` key, in YAML or JSON (picked by file extension). Records may name
//! a `directory` whose images are appended to the album in file-name order.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::events::{Album, Photo};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct AlbumRecord {
    title: String,
    #[serde(default)]
    cover_image_url: Option<String>,
    #[serde(default)]
    photos: Vec<Photo>,
    #[serde(default)]
    created_at: Option<NaiveDate>,
    #[serde(default)]
    directory: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ManifestFile {
    List(Vec<AlbumRecord>),
    Wrapped { albums: Vec<AlbumRecord> },
}

impl ManifestFile {
    fn into_records(self) -> Vec<AlbumRecord> {
        match self {
            ManifestFile::List(records) | ManifestFile::Wrapped { albums: records } => records,
        }
    }
}

fn is_remote(url: &str) -> bool {
    let lower = url.trim().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("file://")
}

/// Resolve a local photo reference against the manifest's directory.
fn resolve(base: &Path, url: &str) -> String {
    if is_remote(url) || Path::new(url).is_absolute() {
        url.to_string()
    } else {
        base.join(url).to_string_lossy().into_owned()
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

/// Images under `dir`, sorted by file name, captioned with their file stem.
pub fn scan_directory(dir: &Path) -> Result<Vec<Photo>> {
    ensure!(dir.is_dir(), "album directory {} does not exist", dir.display());
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if entry.file_type().is_file() && has_image_extension(entry.path()) {
            paths.push(entry.into_path());
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()).then_with(|| a.cmp(b)));
    debug!(dir = %dir.display(), count = paths.len(), "scanned album directory");
    Ok(paths
        .into_iter()
        .map(|path| {
            let caption = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().replace(['_', '-'], " "))
                .unwrap_or_default();
            Photo::new(path.to_string_lossy(), caption)
        })
        .collect())
}

fn into_album(record: AlbumRecord, base: &Path) -> Result<Album> {
    let mut photos: Vec<Photo> = record
        .photos
        .into_iter()
        .map(|photo| Photo {
            url: resolve(base, &photo.url),
            caption: photo.caption,
        })
        .collect();
    if let Some(dir) = record.directory {
        let dir = if dir.is_absolute() { dir } else { base.join(dir) };
        let scanned = scan_directory(&dir)
            .with_context(|| format!("album '{}' directory", record.title))?;
        photos.extend(scanned);
    }
    Ok(Album {
        cover_image_url: record.cover_image_url.map(|url| resolve(base, &url)),
        title: record.title,
        photos,
        created_at: record.created_at,
    })
}

/// Parse manifest text; `json` selects the JSON parser.
pub fn parse_manifest(text: &str, json: bool, base: &Path) -> Result<Vec<Album>> {
    let file: ManifestFile = if json {
        serde_json::from_str(text).context("invalid JSON album manifest")?
    } else {
        serde_yaml::from_str(text).context("invalid YAML album manifest")?
    };
    file.into_records()
        .into_iter()
        .map(|record| into_album(record, base))
        .collect()
}

pub fn load_manifest(path: impl AsRef<Path>) -> Result<Vec<Album>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read album manifest {}", path.display()))?;
    let json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let albums = parse_manifest(&text, json, base)?;
    info!(
        manifest = %path.display(),
        albums = albums.len(),
        photos = albums.iter().map(|a| a.photos.len()).sum::<usize>(),
        "album manifest loaded"
    );
    Ok(albums)
}
