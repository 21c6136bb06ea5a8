//! 3D mesh primitives for GPU rendering.
//!
//! This module provides the geometry building blocks for the scene pass:
//!
//! - [`Vertex3d`] — The vertex format used by all meshes: position, normal, UV
//! - [`MaterialSlots`] — Per-mesh texture bindings by semantic
//! - [`Mesh`] — GPU-resident geometry with vertex and index buffers
//!
//! # Vertex Layout
//!
//! [`Vertex3d`] uses the following GPU layout (32 bytes per vertex):
//!
//! | Attribute | Format    | Offset | Shader Location |
//! |-----------|-----------|--------|-----------------|
//! | position  | Float32x3 | 0      | 0               |
//! | normal    | Float32x3 | 12     | 1               |
//! | uv        | Float32x2 | 24     | 2               |
//!
//! This layout is exposed via [`Vertex3d::LAYOUT`] for pipeline creation.

use std::rc::Rc;

use crate::gpu::GpuContext;
use crate::texture::Texture;

/// A vertex for 3D mesh rendering with position, normal, and texture
/// coordinates.
///
/// Uses `#[repr(C)]` for a predictable memory layout and derives
/// [`bytemuck::Pod`] and [`bytemuck::Zeroable`] for safe casting to byte
/// slices at upload time.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3d {
    /// The 3D position of this vertex in model space.
    pub position: [f32; 3],
    /// The surface normal vector (should be normalized for correct lighting).
    pub normal: [f32; 3],
    /// Texture coordinates, typically in the range [0, 1].
    pub uv: [f32; 2],
}

impl Vertex3d {
    /// The wgpu vertex buffer layout descriptor for this vertex type.
    ///
    /// - **Array stride**: 32 bytes per vertex
    /// - **Step mode**: Per-vertex
    /// - **Attributes**: position (loc 0), normal (loc 1), uv (loc 2)
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex3d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            // normal
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
            // uv
            wgpu::VertexAttribute {
                offset: 24,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    };

    /// Creates a new vertex with the given position, normal, and UV
    /// coordinates.
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Texture bindings for one mesh, keyed by semantic.
///
/// The scene shader samples three maps per mesh: a diffuse albedo, a specular
/// intensity map, and an emissive map. A mesh carries at most one texture per
/// semantic; when its source material lists several of one kind, the first
/// wins. Empty slots fall back to the scene pass defaults (white diffuse,
/// black specular and emissive), so untextured meshes still render.
///
/// Textures are reference-counted because several meshes in a model commonly
/// share the same image file.
#[derive(Clone, Debug, Default)]
pub struct MaterialSlots {
    pub diffuse: Option<Rc<Texture>>,
    pub specular: Option<Rc<Texture>>,
    pub emissive: Option<Rc<Texture>>,
}

/// GPU-resident 3D mesh geometry with vertex and index buffers.
///
/// A `Mesh` holds the GPU buffers required to render 3D geometry plus its
/// texture bindings. Once created, the mesh data lives on the GPU and is
/// immutable; to render different geometry, create a new mesh.
#[derive(Debug)]
pub struct Mesh {
    /// The GPU buffer containing vertex data.
    pub(crate) vertex_buffer: wgpu::Buffer,
    /// The GPU buffer containing index data (u32 indices).
    pub(crate) index_buffer: wgpu::Buffer,
    /// The number of indices in the mesh (determines draw call size).
    pub(crate) index_count: u32,
    /// Texture bindings for this mesh.
    pub material: MaterialSlots,
}

impl Mesh {
    /// Creates a mesh from raw vertex and index data.
    ///
    /// This uploads the provided geometry to GPU buffers. The mesh is ready
    /// to render immediately after creation. An empty mesh will not render
    /// anything but is not an error.
    pub fn new(
        gpu: &GpuContext,
        vertices: &[Vertex3d],
        indices: &[u32],
        material: MaterialSlots,
    ) -> Self {
        use wgpu::util::DeviceExt;

        let vertex_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Vertex Buffer"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let index_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Index Buffer"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            material,
        }
    }

    /// Number of indices this mesh draws.
    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}
