//! GPU side of the viewer: one textured pipeline drawn in world space (book
//! leaves, pile covers) and in screen space (flat faces, overlay, blink).

use std::mem::size_of;
use std::ops::Range;
use std::time::Instant;

use ab_glyph::{Font, PxScale, ScaleFont};
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use image::{Rgba, RgbaImage};
use tracing::debug;

use crate::book::pages::{BookPages, FaceRole};
use crate::book::skinning::{MeshVertex, PageMesh};
use crate::cache::TextureCache;
use crate::config::Configuration;
use crate::pile::BookPile;
use crate::processing::layout::GridCell;
use crate::processing::text::{Typefaces, draw_text, measure_text};
use crate::tasks::albums::controls::{ControlIcon, icon_image};
use crate::tasks::albums::flat::FlatReader;
use crate::tasks::albums::{PhotoAlbums, Stage};

/// Dynamic uniform offsets must be multiples of the device alignment.
const UNIFORM_STRIDE: u64 = 256;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const OVERLAY_TEXT_PX: f32 = 22.0;
const OVERLAY_MARGIN_PX: f32 = 24.0;
const ICON_TEXTURE_PX: u32 = 128;

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];

/// Unit quad `[-0.5, 0.5]²` facing +Z, texture top at +Y.
const QUAD_VERTICES: [MeshVertex; 4] = [
    MeshVertex {
        position: [-0.5, -0.5, 0.0],
        uv: [0.0, 1.0],
    },
    MeshVertex {
        position: [0.5, -0.5, 0.0],
        uv: [1.0, 1.0],
    },
    MeshVertex {
        position: [-0.5, 0.5, 0.0],
        uv: [0.0, 0.0],
    },
    MeshVertex {
        position: [0.5, 0.5, 0.0],
        uv: [1.0, 0.0],
    },
];
const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 1, 3];

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct DrawUniform {
    mvp: [[f32; 4]; 4],
    tint: [f32; 4],
}

struct GpuTexture {
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TextureRef {
    Face(String, usize),
    White,
    Overlay,
    Icon(ControlIcon),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Space {
    World,
    Screen,
}

struct DrawCall {
    space: Space,
    indices: Range<u32>,
    base_vertex: i32,
    slot: u32,
    texture: TextureRef,
}

struct OverlayText {
    text: String,
    size: (u32, u32),
    texture: GpuTexture,
}

pub struct BookRenderer {
    world_pipeline: wgpu::RenderPipeline,
    screen_pipeline: wgpu::RenderPipeline,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniform_capacity: u64,
    vertex_buffer: wgpu::Buffer,
    vertex_capacity: u64,
    index_buffer: wgpu::Buffer,
    quad_indices: Range<u32>,
    front_indices: Range<u32>,
    back_indices: Range<u32>,
    depth: Option<(wgpu::TextureView, (u32, u32))>,
    white: GpuTexture,
    icons: TextureCache<ControlIcon, GpuTexture>,
    faces: TextureCache<(String, usize), GpuTexture>,
    overlay: Option<OverlayText>,
    fonts: Typefaces,
    clear: wgpu::Color,
    blink_colour: [f32; 3],
    placeholder: [f32; 3],
    vertices: Vec<MeshVertex>,
    uniforms: Vec<DrawUniform>,
    draws: Vec<DrawCall>,
}

impl BookRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
        cfg: &Configuration,
        fonts: Typefaces,
    ) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("book-uniform-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(size_of::<DrawUniform>() as u64),
                },
                count: None,
            }],
        });
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("book-texture-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("book-shader"),
            source: wgpu::ShaderSource::Wgsl(std::borrow::Cow::Borrowed(include_str!(
                "../shaders/book.wgsl"
            ))),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("book-pipeline-layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });
        let world_pipeline = build_pipeline(device, &pipeline_layout, &shader, format, Space::World);
        let screen_pipeline =
            build_pipeline(device, &pipeline_layout, &shader, format, Space::Screen);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("book-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let uniform_capacity = 64;
        let (uniform_buffer, uniform_bind_group) =
            create_uniforms(device, &uniform_layout, uniform_capacity);
        let vertex_capacity = 4096;
        let vertex_buffer = create_vertex_buffer(device, vertex_capacity);

        // Every leaf shares the same topology, so one index buffer serves them all.
        let mesh = PageMesh::new(&cfg.book);
        let front = mesh.indices(FaceRole::Front);
        let back = mesh.indices(FaceRole::Back);
        let mut indices = Vec::with_capacity(QUAD_INDICES.len() + front.len() + back.len());
        indices.extend_from_slice(&QUAD_INDICES);
        let quad_indices = 0..indices.len() as u32;
        indices.extend_from_slice(&front);
        let front_indices = quad_indices.end..indices.len() as u32;
        indices.extend_from_slice(&back);
        let back_indices = front_indices.end..indices.len() as u32;
        let index_buffer = wgpu::util::DeviceExt::create_buffer_init(
            device,
            &wgpu::util::BufferInitDescriptor {
                label: Some("book-indices"),
                contents: bytemuck::cast_slice(&indices),
                usage: wgpu::BufferUsages::INDEX,
            },
        );

        let white = upload_texture(
            device,
            queue,
            &texture_layout,
            &sampler,
            &RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 255])),
            "white",
        );

        let mut icons = TextureCache::new();
        for icon in ControlIcon::ALL {
            icons.get_or_compute(icon, || {
                upload_texture(
                    device,
                    queue,
                    &texture_layout,
                    &sampler,
                    &icon_image(icon, ICON_TEXTURE_PX),
                    "control-icon",
                )
            });
        }

        let [r, g, b] = cfg.window.background.to_f32();
        Self {
            world_pipeline,
            screen_pipeline,
            uniform_layout,
            texture_layout,
            sampler,
            uniform_buffer,
            uniform_bind_group,
            uniform_capacity,
            vertex_buffer,
            vertex_capacity,
            index_buffer,
            quad_indices,
            front_indices,
            back_indices,
            depth: None,
            white,
            icons,
            faces: TextureCache::new(),
            overlay: None,
            fonts,
            clear: wgpu::Color {
                r: f64::from(r),
                g: f64::from(g),
                b: f64::from(b),
                a: 1.0,
            },
            blink_colour: cfg.blink.colour.to_f32(),
            placeholder: cfg.page_canvas.placeholder.to_f32(),
            vertices: Vec::new(),
            uniforms: Vec::new(),
            draws: Vec::new(),
        }
    }

    /// Record one frame of `albums` into `encoder`.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        size: (u32, u32),
        albums: &PhotoAlbums,
        now: Instant,
    ) {
        self.vertices.clear();
        self.vertices.extend_from_slice(&QUAD_VERTICES);
        self.uniforms.clear();
        self.draws.clear();

        let (w, h) = (size.0.max(1) as f32, size.1.max(1) as f32);
        let screen = Mat4::orthographic_rh(0.0, w, h, 0.0, -1.0, 1.0);

        match albums.stage() {
            Stage::Loading { loaded, total, .. } => {
                let track = GridCell::new(
                    (w * 0.3) as u32,
                    (h * 0.5) as u32,
                    (w * 0.4) as u32,
                    6,
                );
                self.push_rect(screen, track, TextureRef::White, [1.0, 1.0, 1.0, 0.2]);
                let fraction = if total == 0 {
                    1.0
                } else {
                    loaded as f32 / total as f32
                };
                let fill = GridCell::new(track.x, track.y, (track.w as f32 * fraction) as u32, 6);
                self.push_rect(screen, fill, TextureRef::White, [1.0, 1.0, 1.0, 0.9]);
            }
            Stage::Pile { pile } => self.push_pile(device, queue, albums, pile, w / h, now),
            Stage::Book { book, scene } => {
                let mvp = scene.view_proj() * scene.book_model();
                let pages = book.pages();
                for leaf in 0..book.page_count() {
                    let skinned = book.skinned_page(leaf);
                    if skinned.is_empty() {
                        continue;
                    }
                    let base_vertex = self.vertices.len() as i32;
                    self.vertices.extend_from_slice(skinned);
                    for (face, indices) in [
                        (2 * leaf, self.front_indices.clone()),
                        (2 * leaf + 1, self.back_indices.clone()),
                    ] {
                        let texture = self.ensure_face(device, queue, pages, face);
                        self.push_draw(Space::World, indices, base_vertex, mvp, [1.0; 4], texture);
                    }
                }
            }
            Stage::Flat { pages, face } => {
                if let Some(data) = pages.face_at(face) {
                    let rect = FlatReader::face_rect(
                        (data.texture.width(), data.texture.height()),
                        (size.0.max(1), size.1.max(1)),
                    );
                    let texture = self.ensure_face(device, queue, pages, face);
                    self.push_rect(screen, rect, texture, [1.0; 4]);
                }
            }
        }

        if let Some(text) = albums.overlay_text() {
            if let Some(rect) = self.update_overlay(device, queue, &text, size) {
                self.push_rect(screen, rect, TextureRef::Overlay, [1.0; 4]);
            }
        }

        for control in albums.controls() {
            self.push_rect(screen, control.rect, TextureRef::Icon(control.icon), [1.0; 4]);
        }

        let blink = albums.blink_opacity(now);
        if blink > 0.0 {
            let [r, g, b] = self.blink_colour;
            let full = GridCell::new(0, 0, size.0.max(1), size.1.max(1));
            self.push_rect(screen, full, TextureRef::White, [r, g, b, blink]);
        }

        self.upload(device, queue);
        self.ensure_depth(device, size);
        let Some((depth_view, _)) = self.depth.as_ref() else {
            return;
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("book-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        for draw in &self.draws {
            let texture = match &draw.texture {
                TextureRef::Face(slug, face) => self
                    .faces
                    .get(&(slug.clone(), *face))
                    .unwrap_or(&self.white),
                TextureRef::White => &self.white,
                TextureRef::Icon(icon) => self.icons.get(icon).unwrap_or(&self.white),
                TextureRef::Overlay => match &self.overlay {
                    Some(overlay) => &overlay.texture,
                    None => continue,
                },
            };
            pass.set_pipeline(match draw.space {
                Space::World => &self.world_pipeline,
                Space::Screen => &self.screen_pipeline,
            });
            pass.set_bind_group(
                0,
                &self.uniform_bind_group,
                &[(u64::from(draw.slot) * UNIFORM_STRIDE) as u32],
            );
            pass.set_bind_group(1, &texture.bind_group, &[]);
            pass.draw_indexed(draw.indices.clone(), draw.base_vertex, 0..1);
        }
    }

    fn push_pile(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        albums: &PhotoAlbums,
        pile: &BookPile,
        aspect: f32,
        now: Instant,
    ) {
        let view_proj = pile.camera(aspect).view_proj();
        for book in pile.books(now) {
            let (texture, [r, g, b]) = match albums.pages_for(book.index) {
                Some(pages) => (self.ensure_face(device, queue, pages, 0), [1.0; 3]),
                None => (TextureRef::White, self.placeholder),
            };
            self.push_draw(
                Space::World,
                self.quad_indices.clone(),
                0,
                view_proj * book.model,
                [r, g, b, book.opacity],
                texture,
            );
        }
    }

    fn push_rect(&mut self, screen: Mat4, rect: GridCell, texture: TextureRef, tint: [f32; 4]) {
        let model = Mat4::from_translation(Vec3::new(
            rect.x as f32 + rect.w as f32 * 0.5,
            rect.y as f32 + rect.h as f32 * 0.5,
            0.0,
        )) * Mat4::from_scale(Vec3::new(rect.w as f32, -(rect.h as f32), 1.0));
        self.push_draw(
            Space::Screen,
            self.quad_indices.clone(),
            0,
            screen * model,
            tint,
            texture,
        );
    }

    fn push_draw(
        &mut self,
        space: Space,
        indices: Range<u32>,
        base_vertex: i32,
        mvp: Mat4,
        tint: [f32; 4],
        texture: TextureRef,
    ) {
        let slot = self.uniforms.len() as u32;
        self.uniforms.push(DrawUniform {
            mvp: mvp.to_cols_array_2d(),
            tint,
        });
        self.draws.push(DrawCall {
            space,
            indices,
            base_vertex,
            slot,
            texture,
        });
    }

    /// Upload face `face` of `pages` on first use; textures live for the session.
    fn ensure_face(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        pages: &BookPages,
        face: usize,
    ) -> TextureRef {
        let Some(data) = pages.face_at(face) else {
            return TextureRef::White;
        };
        let key = (pages.slug().to_string(), face);
        let layout = &self.texture_layout;
        let sampler = &self.sampler;
        self.faces.get_or_compute(key.clone(), || {
            debug!(album = %pages.slug(), face, "uploading face texture");
            upload_texture(device, queue, layout, sampler, &data.texture.image, "face")
        });
        TextureRef::Face(key.0, key.1)
    }

    /// Re-rasterise the overlay caption when its text or the viewport changes.
    fn update_overlay(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        text: &str,
        size: (u32, u32),
    ) -> Option<GridCell> {
        let font = self.fonts.title().or(self.fonts.caption())?.clone();
        let stale = self
            .overlay
            .as_ref()
            .is_none_or(|overlay| overlay.text != text);
        if stale {
            let image = rasterise_overlay(&font, text);
            let texture = upload_texture(
                device,
                queue,
                &self.texture_layout,
                &self.sampler,
                &image,
                "overlay",
            );
            self.overlay = Some(OverlayText {
                text: text.to_string(),
                size: image.dimensions(),
                texture,
            });
        }
        let (w, h) = self.overlay.as_ref()?.size;
        let w = w.min(size.0);
        let x = (size.0 - w) / 2;
        let y = (size.1 as f32 - OVERLAY_MARGIN_PX - h as f32).max(0.0) as u32;
        Some(GridCell::new(x, y, w, h))
    }

    fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        let vertex_bytes = (self.vertices.len() * size_of::<MeshVertex>()) as u64;
        if vertex_bytes > self.vertex_capacity {
            self.vertex_capacity = vertex_bytes.next_power_of_two();
            self.vertex_buffer = create_vertex_buffer(device, self.vertex_capacity);
        }
        queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&self.vertices));

        let slots = self.uniforms.len().max(1) as u64;
        if slots > self.uniform_capacity {
            self.uniform_capacity = slots.next_power_of_two();
            let (buffer, bind_group) =
                create_uniforms(device, &self.uniform_layout, self.uniform_capacity);
            self.uniform_buffer = buffer;
            self.uniform_bind_group = bind_group;
        }
        let mut bytes = vec![0u8; (self.uniforms.len() as u64 * UNIFORM_STRIDE) as usize];
        for (slot, uniform) in self.uniforms.iter().enumerate() {
            let start = slot * UNIFORM_STRIDE as usize;
            let raw = bytemuck::bytes_of(uniform);
            bytes[start..start + raw.len()].copy_from_slice(raw);
        }
        if !bytes.is_empty() {
            queue.write_buffer(&self.uniform_buffer, 0, &bytes);
        }
    }

    fn ensure_depth(&mut self, device: &wgpu::Device, size: (u32, u32)) {
        let size = (size.0.max(1), size.1.max(1));
        if self.depth.as_ref().is_some_and(|(_, current)| *current == size) {
            return;
        }
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("book-depth"),
            size: wgpu::Extent3d {
                width: size.0,
                height: size.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.depth = Some((view, size));
    }
}

fn rasterise_overlay(font: &ab_glyph::FontArc, text: &str) -> RgbaImage {
    let scale = PxScale::from(OVERLAY_TEXT_PX);
    let pad = OVERLAY_TEXT_PX * 0.6;
    let width = (measure_text(text, font, scale) + 2.0 * pad).ceil().max(1.0) as u32;
    let height = (OVERLAY_TEXT_PX * 1.4 + pad).ceil() as u32;
    let mut image = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 150]));
    let ascent = font.as_scaled(scale).ascent();
    let baseline = (height as f32 - OVERLAY_TEXT_PX * 1.4) * 0.5 + ascent;
    draw_text(
        &mut image,
        font,
        text,
        scale,
        pad,
        baseline,
        Rgba([245, 240, 230, 255]),
    );
    image
}

fn build_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    space: Space,
) -> wgpu::RenderPipeline {
    let (label, cull_mode, depth_write_enabled, depth_compare) = match space {
        Space::World => (
            "book-world-pipeline",
            Some(wgpu::Face::Back),
            true,
            wgpu::CompareFunction::LessEqual,
        ),
        Space::Screen => (
            "book-screen-pipeline",
            None,
            false,
            wgpu::CompareFunction::Always,
        ),
    };
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: size_of::<MeshVertex>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &VERTEX_ATTRIBUTES,
            }],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled,
            depth_compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    })
}

fn create_uniforms(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    slots: u64,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("book-uniforms"),
        size: slots * UNIFORM_STRIDE,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("book-uniform-bind-group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: wgpu::BufferSize::new(size_of::<DrawUniform>() as u64),
            }),
        }],
    });
    (buffer, bind_group)
}

fn create_vertex_buffer(device: &wgpu::Device, bytes: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("book-vertices"),
        size: bytes,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    image: &RgbaImage,
    label: &str,
) -> GpuTexture {
    let (width, height) = image.dimensions();
    let size = wgpu::Extent3d {
        width: width.max(1),
        height: height.max(1),
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    if width > 0 && height > 0 {
        queue.write_texture(
            texture.as_image_copy(),
            image.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );
    }
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    });
    GpuTexture {
        _texture: texture,
        bind_group,
    }
}
