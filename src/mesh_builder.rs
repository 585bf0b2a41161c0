//! Growable triangle buffers for one mesh layer of a chunk.
//!
//! Vertices are appended per triangle or quad; nothing is shared between
//! primitives except the four corners of a quad. Quads always emit the
//! triangles `v1, v3, v2` and `v2, v3, v4`.

use bevy::asset::RenderAssetUsages;
use bevy::mesh::Indices;
use bevy::prelude::*;
use bevy::render::render_resource::PrimitiveTopology;

use crate::math::compute_normal;
use crate::metrics::HexMetrics;

/// Splat weight selecting the first of the three cells of a vertex.
pub const WEIGHTS_1: Vec3 = Vec3::X;
/// Splat weight selecting the second cell.
pub const WEIGHTS_2: Vec3 = Vec3::Y;
/// Splat weight selecting the third cell.
pub const WEIGHTS_3: Vec3 = Vec3::Z;

/// Which optional per-vertex channels a layer records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshChannels {
    /// Three cell indices plus blend weights per vertex.
    pub cell_data: bool,
    /// Primary texture coordinates.
    pub uv: bool,
    /// Secondary texture coordinates.
    pub uv2: bool,
}

/// Triangle buffers of one layer, perturbing vertices with the grid's noise.
#[derive(Clone, Debug)]
pub struct HexMeshBuilder<'a> {
    metrics: &'a HexMetrics,
    channels: MeshChannels,
    vertices: Vec<Vec3>,
    triangles: Vec<u32>,
    cell_indices: Vec<[u32; 3]>,
    cell_weights: Vec<Vec3>,
    uvs: Vec<Vec2>,
    uv2s: Vec<Vec2>,
}

impl<'a> HexMeshBuilder<'a> {
    /// Empty builder recording the given channels.
    pub fn new(metrics: &'a HexMetrics, channels: MeshChannels) -> Self {
        Self {
            metrics,
            channels,
            vertices: Vec::new(),
            triangles: Vec::new(),
            cell_indices: Vec::new(),
            cell_weights: Vec::new(),
            uvs: Vec::new(),
            uv2s: Vec::new(),
        }
    }

    /// Drops all recorded geometry, keeping the allocations.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.triangles.clear();
        self.cell_indices.clear();
        self.cell_weights.clear();
        self.uvs.clear();
        self.uv2s.clear();
    }

    /// Channels this builder records.
    pub fn channels(&self) -> MeshChannels {
        self.channels
    }

    /// Vertex positions.
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Triangle index list, three per triangle.
    pub fn triangles(&self) -> &[u32] {
        &self.triangles
    }

    /// Cell indices per vertex.
    pub fn cell_indices(&self) -> &[[u32; 3]] {
        &self.cell_indices
    }

    /// Cell blend weights per vertex.
    pub fn cell_weights(&self) -> &[Vec3] {
        &self.cell_weights
    }

    /// Primary UVs per vertex.
    pub fn uvs(&self) -> &[Vec2] {
        &self.uvs
    }

    /// Secondary UVs per vertex.
    pub fn uv2s(&self) -> &[Vec2] {
        &self.uv2s
    }

    /// Number of triangles recorded.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    // ── Triangles ──────────────────────────────────────────────────

    /// Adds a triangle, perturbing each corner.
    pub fn add_triangle(&mut self, v1: Vec3, v2: Vec3, v3: Vec3) {
        let m = self.metrics;
        self.add_triangle_unperturbed(m.perturb(v1), m.perturb(v2), m.perturb(v3));
    }

    /// Adds a triangle exactly as given.
    pub fn add_triangle_unperturbed(&mut self, v1: Vec3, v2: Vec3, v3: Vec3) {
        let base = self.vertices.len() as u32;
        self.vertices.extend([v1, v2, v3]);
        self.triangles.extend([base, base + 1, base + 2]);
    }

    /// Cell data for the last triangle with a weight per corner.
    pub fn add_triangle_cell_data(&mut self, indices: [u32; 3], w1: Vec3, w2: Vec3, w3: Vec3) {
        self.cell_indices.extend([indices; 3]);
        self.cell_weights.extend([w1, w2, w3]);
    }

    /// Cell data for the last triangle with one weight for all corners.
    pub fn add_triangle_cell_data_uniform(&mut self, indices: [u32; 3], weights: Vec3) {
        self.add_triangle_cell_data(indices, weights, weights, weights);
    }

    /// UVs for the last triangle.
    pub fn add_triangle_uv(&mut self, uv1: Vec2, uv2: Vec2, uv3: Vec2) {
        self.uvs.extend([uv1, uv2, uv3]);
    }

    /// Secondary UVs for the last triangle.
    pub fn add_triangle_uv2(&mut self, uv1: Vec2, uv2: Vec2, uv3: Vec2) {
        self.uv2s.extend([uv1, uv2, uv3]);
    }

    // ── Quads ──────────────────────────────────────────────────────

    /// Adds a quad, perturbing each corner.
    pub fn add_quad(&mut self, v1: Vec3, v2: Vec3, v3: Vec3, v4: Vec3) {
        let m = self.metrics;
        self.add_quad_unperturbed(m.perturb(v1), m.perturb(v2), m.perturb(v3), m.perturb(v4));
    }

    /// Adds a quad exactly as given.
    pub fn add_quad_unperturbed(&mut self, v1: Vec3, v2: Vec3, v3: Vec3, v4: Vec3) {
        let base = self.vertices.len() as u32;
        self.vertices.extend([v1, v2, v3, v4]);
        self.triangles
            .extend([base, base + 2, base + 1, base + 1, base + 2, base + 3]);
    }

    /// Cell data for the last quad with a weight per corner.
    pub fn add_quad_cell_data(&mut self, indices: [u32; 3], w1: Vec3, w2: Vec3, w3: Vec3, w4: Vec3) {
        self.cell_indices.extend([indices; 4]);
        self.cell_weights.extend([w1, w2, w3, w4]);
    }

    /// Cell data for the last quad, `near` on the first two corners and `far` on the rest.
    pub fn add_quad_cell_data_pair(&mut self, indices: [u32; 3], near: Vec3, far: Vec3) {
        self.add_quad_cell_data(indices, near, near, far, far);
    }

    /// Cell data for the last quad with one weight for all corners.
    pub fn add_quad_cell_data_uniform(&mut self, indices: [u32; 3], weights: Vec3) {
        self.add_quad_cell_data(indices, weights, weights, weights, weights);
    }

    /// UVs for the last quad.
    pub fn add_quad_uv(&mut self, uv1: Vec2, uv2: Vec2, uv3: Vec2, uv4: Vec2) {
        self.uvs.extend([uv1, uv2, uv3, uv4]);
    }

    /// UVs for the last quad spanning a rectangle.
    pub fn add_quad_uv_range(&mut self, u_min: f32, u_max: f32, v_min: f32, v_max: f32) {
        self.add_quad_uv(
            Vec2::new(u_min, v_min),
            Vec2::new(u_max, v_min),
            Vec2::new(u_min, v_max),
            Vec2::new(u_max, v_max),
        );
    }

    /// Secondary UVs for the last quad.
    pub fn add_quad_uv2(&mut self, uv1: Vec2, uv2: Vec2, uv3: Vec2, uv4: Vec2) {
        self.uv2s.extend([uv1, uv2, uv3, uv4]);
    }

    /// Secondary UVs for the last quad spanning a rectangle.
    pub fn add_quad_uv2_range(&mut self, u_min: f32, u_max: f32, v_min: f32, v_max: f32) {
        self.add_quad_uv2(
            Vec2::new(u_min, v_min),
            Vec2::new(u_max, v_min),
            Vec2::new(u_min, v_max),
            Vec2::new(u_max, v_max),
        );
    }

    // ── Output ─────────────────────────────────────────────────────

    /// Vertex color from the cell data of vertex `v`.
    fn blend_color(&self, v: usize, cell_color: &impl Fn(u32) -> LinearRgba) -> [f32; 4] {
        let indices = self.cell_indices[v];
        let w = self.cell_weights[v];
        let c = cell_color(indices[0]) * w.x + cell_color(indices[1]) * w.y + cell_color(indices[2]) * w.z;
        [c.red, c.green, c.blue, 1.0]
    }

    /// Converts the buffers into a flat-shaded Bevy mesh.
    ///
    /// Every triangle gets its own three vertices so each face can carry its
    /// own normal. With cell data recorded, vertex colors blend the colors
    /// `cell_color` returns for the three cells of each vertex.
    pub fn to_mesh(&self, cell_color: impl Fn(u32) -> LinearRgba) -> Mesh {
        let count = self.triangles.len();
        let mut positions = Vec::with_capacity(count);
        let mut normals = Vec::with_capacity(count);
        let mut colors = Vec::with_capacity(if self.channels.cell_data { count } else { 0 });
        let mut uvs = Vec::with_capacity(if self.channels.uv { count } else { 0 });
        let mut uv2s = Vec::with_capacity(if self.channels.uv2 { count } else { 0 });

        for tri in self.triangles.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let normal = compute_normal(self.vertices[a], self.vertices[b], self.vertices[c]);
            for v in [a, b, c] {
                positions.push(self.vertices[v].to_array());
                normals.push(normal.to_array());
                if self.channels.cell_data {
                    colors.push(self.blend_color(v, &cell_color));
                }
                if self.channels.uv {
                    uvs.push(self.uvs[v].to_array());
                }
                if self.channels.uv2 {
                    uv2s.push(self.uv2s[v].to_array());
                }
            }
        }

        let indices: Vec<u32> = (0..count as u32).collect();
        let mut mesh = Mesh::new(
            PrimitiveTopology::TriangleList,
            RenderAssetUsages::RENDER_WORLD,
        )
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, normals)
        .with_inserted_indices(Indices::U32(indices));

        if self.channels.cell_data {
            mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, colors);
        }
        if self.channels.uv {
            mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
        }
        if self.channels.uv2 {
            mesh.insert_attribute(Mesh::ATTRIBUTE_UV_1, uv2s);
        }
        mesh
    }
}
