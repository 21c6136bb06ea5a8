//! Lit geometry pass with dual HDR color outputs.
//!
//! This pass renders every mesh in the scene into a [`SceneTarget`]: full lit
//! color into attachment 0 and the bright-pass extraction into attachment 1,
//! in the same pass. Two pipelines share one shader module; the static
//! pipeline reads its model matrix from a uniform while the instanced
//! pipeline multiplies it with a per-instance matrix streamed through the
//! vertex fetch, so 10,000 copies cost one draw call.
//!
//! # Bind groups
//!
//! - **Group 0**: frame uniforms (view/projection, camera position, time,
//!   point lights), written once per frame
//! - **Group 1**: per-draw uniforms (model matrix, glow intensities) in one
//!   dynamic-offset buffer, one 256-byte slot per draw
//! - **Group 2**: the mesh's material textures (diffuse, specular, emissive)
//!   plus the shared sampler
//!
//! Per-draw uniforms live in distinct slots of one buffer because
//! `Queue::write_buffer` resolves before the encoder is submitted; rewriting
//! a single slot between draws would leave every draw seeing the last value.

use glam::{Mat4, Vec3};

use crate::gpu::GpuContext;
use crate::instancing::{InstancePool, InstanceRaw};
use crate::mesh::{Mesh, Vertex3d};
use crate::model::Model;
use crate::render_target::{DEPTH_FORMAT, HDR_FORMAT, SceneTarget};
use crate::texture::Texture;

/// Maximum draws per frame; bounds the dynamic uniform buffer.
const MAX_DRAWS: u64 = 16;
/// Slot stride for the per-draw uniform buffer. WebGPU's default
/// `min_uniform_buffer_offset_alignment` is 256.
const DRAW_SLOT: u64 = 256;

/// Panics when a frame's draw list would overrun the draw uniform buffer.
fn ensure_draw_capacity(static_count: usize, instanced_count: usize) {
    let total = static_count + instanced_count;
    assert!(
        total as u64 <= MAX_DRAWS,
        "{total} draws exceed the {MAX_DRAWS}-slot draw uniform buffer"
    );
}

/// A point light as the shader sees it.
///
/// Falloff is the classic `1 / (constant + linear·d + quadratic·d²)` curve;
/// the linear and quadratic terms are animated per frame to make the lights
/// breathe.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointLight {
    pub position: [f32; 3],
    pub constant: f32,
    pub color: [f32; 3],
    pub linear: f32,
    pub quadratic: f32,
    pub _pad: [f32; 3],
}

impl PointLight {
    pub fn new(position: Vec3, color: Vec3, linear: f32, quadratic: f32) -> Self {
        Self {
            position: position.to_array(),
            constant: 1.0,
            color: color.to_array(),
            linear,
            quadratic,
            _pad: [0.0; 3],
        }
    }
}

/// Frame uniforms for the scene shader (group 0, binding 0).
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct FrameUniforms {
    view: [[f32; 4]; 4],
    proj: [[f32; 4]; 4],
    view_pos: [f32; 3],
    time: f32,
    lights: [PointLight; 2],
}

/// Per-draw uniforms (group 1, binding 0, dynamic offset).
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct DrawUniforms {
    model: [[f32; 4]; 4],
    /// Glow intensity per instance phase; instance `i` uses entry `i % 4`.
    glow_phases: [f32; 4],
    /// Glow intensity for static draws.
    emissive: f32,
    _pad: [f32; 3],
}

/// Everything the scene shader needs that changes once per frame.
pub struct FrameInputs {
    pub view: Mat4,
    pub proj: Mat4,
    pub view_pos: Vec3,
    pub time: f32,
    pub lights: [PointLight; 2],
}

/// One model drawn with a single transform.
pub struct StaticDraw<'a> {
    pub model: &'a Model,
    pub transform: Mat4,
    /// Emissive map multiplier for this draw.
    pub emissive: f32,
}

/// One model drawn once for every matrix in an instance pool.
pub struct InstancedDraw<'a> {
    pub model: &'a Model,
    /// Applied before the per-instance matrix, so it scales the whole field.
    pub base_transform: Mat4,
    pub instances: &'a InstancePool,
    /// Emissive multipliers cycled across instances by `index % 4`.
    pub glow_phases: [f32; 4],
}

/// Renders lit geometry into the dual-output HDR scene target.
pub struct ScenePass {
    static_pipeline: wgpu::RenderPipeline,
    instanced_pipeline: wgpu::RenderPipeline,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    draw_buffer: wgpu::Buffer,
    draw_bind_group: wgpu::BindGroup,
    texture_bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    default_white: Texture,
    default_black: Texture,
}

impl ScenePass {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/scene.wgsl").into()),
        });

        // Frame uniforms (group 0)
        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let frame_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Frame Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &frame_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        // Per-draw uniforms (group 1, dynamic offset)
        let draw_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw Uniforms"),
            size: DRAW_SLOT * MAX_DRAWS,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let draw_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Draw Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<DrawUniforms>() as u64,
                        ),
                    },
                    count: None,
                }],
            });

        let draw_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw Bind Group"),
            layout: &draw_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &draw_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<DrawUniforms>() as u64),
                }),
            }],
        });

        // Material textures (group 2)
        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Material Bind Group Layout"),
                entries: &[
                    texture_entry(0),
                    texture_entry(1),
                    texture_entry(2),
                    wgpu::BindGroupLayoutEntry {
                        binding: 3,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Material Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        // Fallbacks for empty material slots: white diffuse keeps untextured
        // meshes visible; black specular and emissive disable those terms.
        let default_white = Texture::solid(gpu, [255, 255, 255, 255], "Default White");
        let default_black = Texture::solid(gpu, [0, 0, 0, 255], "Default Black");

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[
                &frame_bind_group_layout,
                &draw_bind_group_layout,
                &texture_bind_group_layout,
            ],
            push_constant_ranges: &[],
        });

        // Both color attachments are HDR and written with no blending.
        let color_targets = [
            Some(wgpu::ColorTargetState {
                format: HDR_FORMAT,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            }),
            Some(wgpu::ColorTargetState {
                format: HDR_FORMAT,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            }),
        ];

        fn make_pipeline(
            device: &wgpu::Device,
            layout: &wgpu::PipelineLayout,
            shader: &wgpu::ShaderModule,
            color_targets: &[Option<wgpu::ColorTargetState>],
            label: &str,
            entry_point: &str,
            buffers: &[wgpu::VertexBufferLayout],
        ) -> wgpu::RenderPipeline {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: shader,
                    entry_point: Some(entry_point),
                    buffers,
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: shader,
                    entry_point: Some("fs_main"),
                    targets: color_targets,
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: Some(wgpu::Face::Back),
                    front_face: wgpu::FrontFace::Ccw,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        }

        let static_pipeline = make_pipeline(
            device,
            &pipeline_layout,
            &shader,
            &color_targets,
            "Scene Pipeline",
            "vs_static",
            &[Vertex3d::LAYOUT],
        );
        let instanced_pipeline = make_pipeline(
            device,
            &pipeline_layout,
            &shader,
            &color_targets,
            "Scene Pipeline (Instanced)",
            "vs_instanced",
            &[Vertex3d::LAYOUT, InstanceRaw::LAYOUT],
        );

        Self {
            static_pipeline,
            instanced_pipeline,
            frame_buffer,
            frame_bind_group,
            draw_buffer,
            draw_bind_group,
            texture_bind_group_layout,
            sampler,
            default_white,
            default_black,
        }
    }

    fn material_bind_group(&self, gpu: &GpuContext, mesh: &Mesh) -> wgpu::BindGroup {
        let diffuse = mesh
            .material
            .diffuse
            .as_deref()
            .unwrap_or(&self.default_white);
        let specular = mesh
            .material
            .specular
            .as_deref()
            .unwrap_or(&self.default_black);
        let emissive = mesh
            .material
            .emissive
            .as_deref()
            .unwrap_or(&self.default_black);

        gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Material Bind Group"),
            layout: &self.texture_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(diffuse.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(specular.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(emissive.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }

    /// Record the scene pass into `encoder`.
    ///
    /// Uploads the frame uniforms and one draw-uniform slot per draw, then
    /// draws every static model followed by the instanced draws.
    ///
    /// # Panics
    ///
    /// Panics if the combined draw list exceeds the buffer's
    /// [`MAX_DRAWS`] slots.
    pub fn render(
        &self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        target: &SceneTarget,
        frame: &FrameInputs,
        statics: &[StaticDraw],
        instanced: &[InstancedDraw],
    ) {
        ensure_draw_capacity(statics.len(), instanced.len());

        let frame_uniforms = FrameUniforms {
            view: frame.view.to_cols_array_2d(),
            proj: frame.proj.to_cols_array_2d(),
            view_pos: frame.view_pos.to_array(),
            time: frame.time,
            lights: frame.lights,
        };
        gpu.queue.write_buffer(
            &self.frame_buffer,
            0,
            bytemuck::cast_slice(&[frame_uniforms]),
        );

        // Each draw gets its own 256-byte slot.
        let mut slot = 0u64;
        for draw in statics {
            let uniforms = DrawUniforms {
                model: draw.transform.to_cols_array_2d(),
                glow_phases: [draw.emissive; 4],
                emissive: draw.emissive,
                _pad: [0.0; 3],
            };
            gpu.queue
                .write_buffer(&self.draw_buffer, slot * DRAW_SLOT, bytemuck::cast_slice(&[uniforms]));
            slot += 1;
        }
        for draw in instanced {
            let uniforms = DrawUniforms {
                model: draw.base_transform.to_cols_array_2d(),
                glow_phases: draw.glow_phases,
                emissive: 0.0,
                _pad: [0.0; 3],
            };
            gpu.queue
                .write_buffer(&self.draw_buffer, slot * DRAW_SLOT, bytemuck::cast_slice(&[uniforms]));
            slot += 1;
        }

        let clear = wgpu::Operations {
            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
            store: wgpu::StoreOp::Store,
        };

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[
                Some(wgpu::RenderPassColorAttachment {
                    view: &target.color.view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: clear,
                }),
                Some(wgpu::RenderPassColorAttachment {
                    view: &target.bright.view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: clear,
                }),
            ],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &target.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_bind_group(0, &self.frame_bind_group, &[]);

        let mut slot = 0u32;
        render_pass.set_pipeline(&self.static_pipeline);
        for draw in statics {
            render_pass.set_bind_group(1, &self.draw_bind_group, &[slot * DRAW_SLOT as u32]);
            slot += 1;
            for mesh in &draw.model.meshes {
                let material = self.material_bind_group(gpu, mesh);
                render_pass.set_bind_group(2, &material, &[]);
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass
                    .set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        render_pass.set_pipeline(&self.instanced_pipeline);
        for draw in instanced {
            render_pass.set_bind_group(1, &self.draw_bind_group, &[slot * DRAW_SLOT as u32]);
            slot += 1;
            render_pass.set_vertex_buffer(1, draw.instances.buffer().slice(..));
            for mesh in &draw.model.meshes {
                let material = self.material_bind_group(gpu, mesh);
                render_pass.set_bind_group(2, &material, &[]);
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass
                    .set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..mesh.index_count, 0, 0..draw.instances.count());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_structs_match_wgsl_layout() {
        // FrameUniforms: two mat4x4 + vec3 + f32 + two 48-byte lights.
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 240);
        assert_eq!(std::mem::size_of::<PointLight>(), 48);
        // DrawUniforms: mat4x4 + vec4 + f32 + padding to 16.
        assert_eq!(std::mem::size_of::<DrawUniforms>(), 96);
        assert!(std::mem::size_of::<DrawUniforms>() as u64 <= DRAW_SLOT);
    }

    #[test]
    fn draw_capacity_admits_the_demo_scene() {
        // Three statics plus one instanced draw.
        ensure_draw_capacity(3, 1);
        ensure_draw_capacity(MAX_DRAWS as usize, 0);
    }

    #[test]
    #[should_panic(expected = "exceed the")]
    fn overlong_draw_list_is_rejected() {
        ensure_draw_capacity(MAX_DRAWS as usize, 1);
    }
}
