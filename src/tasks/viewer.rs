mod renderer;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use renderer::BookRenderer;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use wgpu::{self, SurfaceError};
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalPosition},
    event::{ElementState, KeyEvent, MouseButton, TouchPhase, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowAttributes},
};

use crate::{
    config::Configuration,
    events::{Album, AlbumsEvent, BuildAlbum, LoadUpdate, NavKey, UserInput},
    processing::text::Typefaces,
    tasks::albums::PhotoAlbums,
};

/// Pointer travel below which a press/release pair counts as a click.
const CLICK_SLOP_PX: f32 = 8.0;

#[derive(Debug)]
enum ViewerEvent {
    Cancelled,
}

type LoadReceiver = mpsc::Receiver<LoadUpdate>;

struct ViewerApp {
    cfg: Configuration,
    cancel: CancellationToken,
    window: Option<Arc<Window>>,
    surface: Option<wgpu::Surface<'static>>,
    surface_config: Option<wgpu::SurfaceConfiguration>,
    device: Option<wgpu::Device>,
    queue: Option<wgpu::Queue>,
    renderer: Option<BookRenderer>,
    albums: PhotoAlbums,
    from_loader: LoadReceiver,
    loader_done: bool,
    cursor: PhysicalPosition<f64>,
    pressed_at: Option<PhysicalPosition<f64>>,
}

impl ViewerApp {
    fn new(
        cfg: Configuration,
        cancel: CancellationToken,
        albums: PhotoAlbums,
        from_loader: LoadReceiver,
    ) -> Self {
        Self {
            cfg,
            cancel,
            window: None,
            surface: None,
            surface_config: None,
            device: None,
            queue: None,
            renderer: None,
            albums,
            from_loader,
            loader_done: false,
            cursor: PhysicalPosition::new(0.0, 0.0),
            pressed_at: None,
        }
    }

    fn ensure_window(&mut self, event_loop: &ActiveEventLoop) -> Option<Arc<Window>> {
        if let Some(window) = self.window.as_ref() {
            return Some(window.clone());
        }

        let attrs = WindowAttributes::default()
            .with_title(self.cfg.window.title.clone())
            .with_inner_size(LogicalSize::new(self.cfg.window.width, self.cfg.window.height));
        match event_loop.create_window(attrs) {
            Ok(window) => {
                let window = Arc::new(window);
                self.window = Some(window.clone());
                Some(window)
            }
            Err(err) => {
                error!(error = %err, "failed to create viewer window");
                None
            }
        }
    }

    fn init_gpu(&mut self, window: Arc<Window>) -> Result<()> {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window.clone())
            .context("failed to create surface")?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to acquire GPU adapter")?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|fmt| fmt.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .context("surface reports no formats")?;

        let limits = adapter.limits();
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("viewer-device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits,
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
        }))
        .context("failed to acquire GPU device")?;

        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        info!(
            width = config.width,
            height = config.height,
            format = ?config.format,
            "viewer surface configured",
        );

        let renderer = BookRenderer::new(&device, &queue, format, &self.cfg, Typefaces::load_system());
        self.albums.handle_input(
            UserInput::Resize {
                width: config.width,
                height: config.height,
            },
            Instant::now(),
        );

        self.surface = Some(surface);
        self.surface_config = Some(config);
        self.device = Some(device);
        self.queue = Some(queue);
        self.renderer = Some(renderer);
        Ok(())
    }

    fn handle_resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        let (Some(surface), Some(device), Some(config)) = (
            self.surface.as_ref(),
            self.device.as_ref(),
            self.surface_config.as_mut(),
        ) else {
            return;
        };

        config.width = new_size.width.max(1);
        config.height = new_size.height.max(1);
        surface.configure(device, config);
        debug!(
            width = config.width,
            height = config.height,
            "viewer surface resized",
        );
        self.albums.handle_input(
            UserInput::Resize {
                width: config.width,
                height: config.height,
            },
            Instant::now(),
        );
        self.request_redraw();
    }

    /// Apply everything the loader has delivered since the last frame.
    fn drain_loader(&mut self, now: Instant) {
        if self.loader_done {
            return;
        }
        loop {
            match self.from_loader.try_recv() {
                Ok(update) => self.albums.on_load_update(update, now),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!("loader channel closed");
                    self.loader_done = true;
                    break;
                }
            }
        }
    }

    fn draw(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        self.drain_loader(now);
        self.albums.tick(now);

        let (Some(surface), Some(device), Some(queue), Some(config), Some(window)) = (
            self.surface.as_ref(),
            self.device.as_ref(),
            self.queue.as_ref(),
            self.surface_config.as_ref(),
            self.window.clone(),
        ) else {
            return;
        };

        let frame = match surface.get_current_texture() {
            Ok(frame) => frame,
            Err(SurfaceError::Outdated) | Err(SurfaceError::Lost) => {
                info!("viewer surface lost; reconfiguring");
                self.handle_resize(window.inner_size());
                return;
            }
            Err(SurfaceError::OutOfMemory) => {
                error!("viewer surface out of memory; exiting event loop");
                event_loop.exit();
                return;
            }
            Err(SurfaceError::Timeout) => {
                warn!("viewer surface acquisition timed out");
                return;
            }
            Err(SurfaceError::Other) => {
                warn!("viewer surface reported an unknown error; retrying");
                self.handle_resize(window.inner_size());
                return;
            }
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("viewer-encoder"),
        });

        if let Some(renderer) = self.renderer.as_mut() {
            renderer.render(
                device,
                queue,
                &mut encoder,
                &view,
                (config.width, config.height),
                &self.albums,
                now,
            );
        }

        queue.submit(std::iter::once(encoder.finish()));
        window.pre_present_notify();
        frame.present();
    }

    fn request_redraw(&self) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn on_key(&mut self, event: &KeyEvent) {
        if event.state != ElementState::Pressed {
            return;
        }
        let key = match &event.logical_key {
            Key::Named(NamedKey::ArrowLeft) => NavKey::Left,
            Key::Named(NamedKey::ArrowRight) => NavKey::Right,
            Key::Named(NamedKey::Enter) => NavKey::Enter,
            Key::Named(NamedKey::Escape) => NavKey::Escape,
            Key::Named(NamedKey::Home) => NavKey::Home,
            Key::Named(NamedKey::End) => NavKey::End,
            Key::Character(c) if c.eq_ignore_ascii_case("v") => NavKey::ToggleView,
            _ => return,
        };
        self.albums.handle_input(UserInput::Key(key), Instant::now());
    }

    fn on_press(&mut self, at: PhysicalPosition<f64>) {
        self.pressed_at = Some(at);
        self.albums
            .handle_input(UserInput::SwipeStart { x: at.x as f32 }, Instant::now());
    }

    /// A release ends a swipe; a release close to its press is also a click.
    fn on_release(&mut self, at: PhysicalPosition<f64>) {
        let Some(from) = self.pressed_at.take() else {
            return;
        };
        let now = Instant::now();
        self.albums
            .handle_input(UserInput::SwipeEnd { x: at.x as f32 }, now);
        let travel = ((at.x - from.x).powi(2) + (at.y - from.y).powi(2)).sqrt() as f32;
        if travel < CLICK_SLOP_PX {
            self.albums.handle_input(
                UserInput::Click {
                    x: at.x as f32,
                    y: at.y as f32,
                },
                now,
            );
        }
    }
}

impl ApplicationHandler<ViewerEvent> for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.cancel.is_cancelled() {
            event_loop.exit();
            return;
        }

        let Some(window) = self.ensure_window(event_loop) else {
            event_loop.exit();
            return;
        };

        if self.device.is_none() {
            if let Err(err) = self.init_gpu(window) {
                error!(error = ?err, "failed to initialize GPU state");
                event_loop.exit();
                return;
            }
        }

        self.request_redraw();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.clone() else {
            return;
        };
        if window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("viewer window close requested");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                self.handle_resize(new_size);
            }
            WindowEvent::ScaleFactorChanged {
                mut inner_size_writer,
                ..
            } => {
                let size = window.inner_size();
                let _ = inner_size_writer.request_inner_size(size);
                self.handle_resize(size);
            }
            WindowEvent::KeyboardInput { event, .. } => self.on_key(&event),
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = position;
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => self.on_press(self.cursor),
                ElementState::Released => self.on_release(self.cursor),
            },
            WindowEvent::Touch(touch) => match touch.phase {
                TouchPhase::Started => self.on_press(touch.location),
                TouchPhase::Ended => self.on_release(touch.location),
                TouchPhase::Cancelled => self.pressed_at = None,
                TouchPhase::Moved => {}
            },
            WindowEvent::RedrawRequested => {
                self.draw(event_loop);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        // Every state machine is time-driven; keep frames coming.
        self.request_redraw();
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::Cancelled => {
                info!("viewer received cancellation event");
                event_loop.exit();
            }
        }
    }
}

/// Run the window on the calling thread until it closes or `cancel` fires.
pub fn run_windowed(
    cfg: Configuration,
    albums: Arc<Vec<Album>>,
    from_loader: LoadReceiver,
    events: mpsc::Sender<AlbumsEvent>,
    build_requests: mpsc::Sender<BuildAlbum>,
    cancel: CancellationToken,
) -> Result<()> {
    let event_loop = EventLoop::<ViewerEvent>::with_user_event()
        .build()
        .context("failed to build viewer event loop")?;
    let proxy = event_loop.create_proxy();

    let cancel_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            cancel.cancelled().await;
            let _ = proxy.send_event(ViewerEvent::Cancelled);
        })
    };

    let orchestrator = PhotoAlbums::new(cfg.clone(), albums, events, Instant::now())
        .with_build_requests(build_requests);
    let mut app = ViewerApp::new(cfg, cancel, orchestrator, from_loader);
    let run_result = event_loop.run_app(&mut app);
    cancel_task.abort();

    run_result.context("viewer event loop failed")
}
