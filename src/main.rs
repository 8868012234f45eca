use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use photo_book::config::Configuration;
use photo_book::events::{AlbumsEvent, BuildAlbum, LoadUpdate};
use photo_book::manifest;
use photo_book::processing::compositor::Compositor;
use photo_book::processing::text::Typefaces;
use photo_book::source::UrlPhotoSource;
use photo_book::tasks;

#[derive(Debug, Parser)]
#[command(name = "photo-book", version, about = "interactive 3D photo-book viewer")]
struct Args {
    /// Path to YAML config; built-in defaults when omitted
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,
    /// Album manifest to present, overriding `album-manifest`
    #[arg(long, value_name = "FILE")]
    manifest: Option<PathBuf>,
    /// Write every album's faces and a flat HTML reader into DIR, then exit
    #[arg(long, value_name = "DIR")]
    export: Option<PathBuf>,
    /// Raise this crate's log level (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        config,
        manifest,
        export,
        verbose,
    } = Args::parse();

    // RUST_LOG wins; otherwise info, raised for this crate by -v.
    let default_filter = match verbose {
        0 => "info",
        1 => "info,photo_book=debug",
        _ => "info,photo_book=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .compact()
        .init();

    let mut cfg = match &config {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Configuration::default(),
    };
    if let Some(manifest) = manifest {
        cfg.album_manifest = manifest;
    }
    let cfg = cfg.validated().context("invalid configuration values")?;
    tracing::debug!("configuration:\n{:#?}", cfg);

    let albums = Arc::new(
        manifest::load_manifest(&cfg.album_manifest).with_context(|| {
            format!("failed to load albums from {}", cfg.album_manifest.display())
        })?,
    );
    let source = Arc::new(UrlPhotoSource::new(&cfg.fetch)?);
    let compositor = Compositor::new(cfg.page_canvas.clone(), Typefaces::load_system());

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    if let Some(out_dir) = export {
        let written = tasks::export::run(albums, source, compositor, out_dir.clone(), cancel)
            .await
            .context("export failed")?;
        tracing::info!(albums = written.len(), dir = %out_dir.display(), "export finished");
        return Ok(());
    }

    // Channels (small/bounded)
    let (load_tx, load_rx) = mpsc::channel::<LoadUpdate>(16); // Loader -> Viewer
    let (build_tx, build_rx) = mpsc::channel::<BuildAlbum>(4); // Viewer -> Loader
    let (events_tx, mut events_rx) = mpsc::channel::<AlbumsEvent>(64); // Viewer -> host

    let mut tasks = JoinSet::new();

    // Album loader
    tasks.spawn({
        let albums = albums.clone();
        let cancel = cancel.clone();
        async move {
            tasks::loader::run(albums, source, compositor, load_tx, build_rx, cancel)
                .await
                .context("loader task failed")
        }
    });

    // Host notifications; this binary only logs them.
    tasks.spawn({
        let cancel = cancel.clone();
        async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = events_rx.recv() => {
                        let Some(event) = event else { break };
                        match event {
                            AlbumsEvent::LoadProgress { loaded, total, album } => {
                                tracing::info!(loaded, total, album, "load progress");
                            }
                            AlbumsEvent::AlbumOpened { index, title } => {
                                tracing::info!(index, title, "album opened");
                            }
                            AlbumsEvent::AlbumClosed { index } => {
                                tracing::info!(index, "album closed");
                            }
                            AlbumsEvent::PhotoClicked(photo) => {
                                tracing::info!(url = %photo.url, caption = %photo.caption, "photo clicked");
                            }
                        }
                    }
                }
            }
            Ok(())
        }
    });

    // Run the windowed viewer on the main thread (blocking) after spawning other tasks
    if let Err(e) = tasks::viewer::run_windowed(
        cfg.clone(),
        albums,
        load_rx,
        events_tx,
        build_tx,
        cancel.clone(),
    )
    .context("viewer failed")
    {
        tracing::error!("{e:?}");
    }
    // Ensure other tasks are asked to stop
    cancel.cancel();

    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("task error: {e:?}"),
            Err(e) => tracing::error!("join error: {e}"),
        }
    }

    Ok(())
}
