//! Segmented page mesh bound to a chain of bones, skinned on the CPU.
//!
//! Bone 0 sits on the spine; every following bone is one segment further
//! along the page width and inherits its parent's rotation. Each vertex is
//! blended between the two bones bracketing its position along the width.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3};

use crate::book::deformer::BonePose;
use crate::book::pages::FaceRole;
use crate::config::BookConfig;

/// Rows of vertices across the page height, matching a two-segment box side.
const HEIGHT_SEGMENTS: usize = 2;

/// Vertex as uploaded to the GPU.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

#[derive(Debug, Clone, Copy)]
struct BoundVertex {
    position: Vec3,
    uv: Vec2,
    bone: usize,
    weight: f32,
}

/// A triangle of the page mesh tagged with the side it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triangle {
    pub role: FaceRole,
    pub indices: [u32; 3],
}

#[derive(Debug, Clone)]
pub struct PageMesh {
    vertices: Vec<BoundVertex>,
    triangles: Vec<Triangle>,
    segments: usize,
    segment_width: f32,
    bind_inverse: Vec<Mat4>,
}

impl PageMesh {
    pub fn new(cfg: &BookConfig) -> Self {
        let segments = cfg.segments.max(1);
        let width = cfg.page_width;
        let height = cfg.page_height;
        let segment_width = width / segments as f32;
        let half_depth = cfg.page_depth * 0.5;

        let mut vertices = Vec::with_capacity(2 * (segments + 1) * (HEIGHT_SEGMENTS + 1));
        let mut triangles = Vec::with_capacity(4 * segments * HEIGHT_SEGMENTS);

        for role in [FaceRole::Front, FaceRole::Back] {
            let base = vertices.len() as u32;
            let z = match role {
                FaceRole::Front => half_depth,
                FaceRole::Back => -half_depth,
            };
            for row in 0..=HEIGHT_SEGMENTS {
                let v = row as f32 / HEIGHT_SEGMENTS as f32;
                let y = height * 0.5 - v * height;
                for col in 0..=segments {
                    let x = col as f32 * segment_width;
                    let along = x / width;
                    let u = match role {
                        FaceRole::Front => along,
                        FaceRole::Back => 1.0 - along,
                    };
                    let (bone, weight) = skin_binding(x, segment_width, segments);
                    vertices.push(BoundVertex {
                        position: Vec3::new(x, y, z),
                        uv: Vec2::new(u, v),
                        bone,
                        weight,
                    });
                }
            }
            let stride = (segments + 1) as u32;
            for row in 0..HEIGHT_SEGMENTS as u32 {
                for col in 0..segments as u32 {
                    let tl = base + row * stride + col;
                    let tr = tl + 1;
                    let bl = tl + stride;
                    let br = bl + 1;
                    // Counter-clockwise when seen from the side the face points to.
                    let quads = match role {
                        FaceRole::Front => [[tl, bl, tr], [tr, bl, br]],
                        FaceRole::Back => [[tl, tr, bl], [tr, br, bl]],
                    };
                    triangles.extend(quads.map(|indices| Triangle { role, indices }));
                }
            }
        }

        let bind_inverse = (0..=segments)
            .map(|k| Mat4::from_translation(Vec3::new(-(k as f32) * segment_width, 0.0, 0.0)))
            .collect();

        Self {
            vertices,
            triangles,
            segments,
            segment_width,
            bind_inverse,
        }
    }

    pub fn bone_count(&self) -> usize {
        self.segments + 1
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Index list of one side, for drawing.
    pub fn indices(&self, role: FaceRole) -> Vec<u32> {
        self.triangles
            .iter()
            .filter(|tri| tri.role == role)
            .flat_map(|tri| tri.indices)
            .collect()
    }

    /// World matrix of every bone for the given local rotations.
    pub fn bone_world(&self, poses: &[BonePose]) -> Vec<Mat4> {
        let mut out = Vec::with_capacity(self.bone_count());
        let mut parent = Mat4::IDENTITY;
        for i in 0..self.bone_count() {
            let pose = poses.get(i).copied().unwrap_or_default();
            let offset = if i == 0 { 0.0 } else { self.segment_width };
            let local = Mat4::from_translation(Vec3::new(offset, 0.0, 0.0))
                * Mat4::from_rotation_x(pose.x)
                * Mat4::from_rotation_y(pose.y);
            parent *= local;
            out.push(parent);
        }
        out
    }

    /// Deform the mesh by `poses` and place it with `transform`.
    pub fn skin(&self, poses: &[BonePose], transform: Mat4) -> Vec<MeshVertex> {
        let skinning: Vec<Mat4> = self
            .bone_world(poses)
            .into_iter()
            .zip(&self.bind_inverse)
            .map(|(world, inverse)| transform * world * *inverse)
            .collect();
        self.vertices
            .iter()
            .map(|vertex| {
                let a = skinning[vertex.bone].transform_point3(vertex.position);
                let b = skinning[vertex.bone + 1].transform_point3(vertex.position);
                let p = a * (1.0 - vertex.weight) + b * vertex.weight;
                MeshVertex {
                    position: p.to_array(),
                    uv: vertex.uv.to_array(),
                }
            })
            .collect()
    }
}

/// Lower bracketing bone and blend weight toward the next one for a vertex
/// `x` units from the spine.
fn skin_binding(x: f32, segment_width: f32, segments: usize) -> (usize, f32) {
    let t = (x / segment_width).max(0.0);
    let bone = (t.floor() as usize).min(segments - 1);
    let weight = (t - bone as f32).clamp(0.0, 1.0);
    (bone, weight)
}
