//! Tone-map and bloom composite onto the visible surface.
//!
//! The final pass samples the lit scene (unit 0) and the blurred bright-pass
//! (unit 1), optionally adds the bloom, optionally applies exposure tone
//! mapping, and writes the result to the swapchain. The HDR and bloom
//! toggles only change this shader's branches; the earlier passes always
//! run.

use glam::Vec3;

use crate::gpu::GpuContext;

/// Composite controls, written once per frame.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct CompositeUniforms {
    exposure: f32,
    hdr: u32,
    bloom: u32,
    _pad: u32,
}

/// Combines the scene and blur chains into the final image.
pub struct CompositePass {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
}

impl CompositePass {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Composite Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/composite.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Composite Uniforms"),
            size: std::mem::size_of::<CompositeUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Composite Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Composite Bind Group Layout"),
            entries: &[
                // Uniforms
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Scene color
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                // Blurred bright-pass
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                // Sampler
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Composite Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Composite Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            uniform_buffer,
            bind_group_layout,
            sampler,
        }
    }

    /// Record the composite into `encoder`, writing the surface view.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
        scene_view: &wgpu::TextureView,
        bloom_view: &wgpu::TextureView,
        exposure: f32,
        hdr: bool,
        bloom: bool,
    ) {
        let uniforms = CompositeUniforms {
            exposure,
            hdr: hdr as u32,
            bloom: bloom as u32,
            _pad: 0,
        };
        gpu.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Composite Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(scene_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(bloom_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Composite Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: surface_view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }
}

/// CPU mirror of the composite shader's math for one pixel.
///
/// Keeps the tone-mapping behavior testable: with HDR and bloom disabled the
/// composite must pass the scene color through untouched.
pub fn composite_reference(scene: Vec3, blurred: Vec3, exposure: f32, hdr: bool, bloom: bool) -> Vec3 {
    let mut color = scene;
    if bloom {
        color += blurred;
    }
    if hdr {
        color = Vec3::ONE - (-color * exposure).exp();
    }
    color
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_toggles_pass_the_scene_through() {
        let scene = Vec3::new(0.25, 1.75, 0.5);
        let blurred = Vec3::new(3.0, 3.0, 3.0);
        let out = composite_reference(scene, blurred, 3.0, false, false);
        assert_eq!(out, scene);
    }

    #[test]
    fn bloom_adds_before_tone_mapping() {
        let scene = Vec3::splat(0.5);
        let blurred = Vec3::splat(0.5);
        let with_bloom = composite_reference(scene, blurred, 1.0, true, true);
        let expected = Vec3::ONE - (-Vec3::splat(1.0)).exp();
        assert!((with_bloom - expected).length() < 1e-6);
    }

    #[test]
    fn tone_mapping_compresses_into_unit_range() {
        // exp(-600) underflows to zero in f32, so extreme inputs saturate
        // at exactly 1.0 rather than strictly below it.
        let extreme =
            composite_reference(Vec3::splat(100.0), Vec3::splat(100.0), 3.0, true, true);
        assert!(extreme.max_element() <= 1.0);
        assert!(extreme.min_element() > 0.99);

        // A moderate input lands representably below the asymptote.
        let moderate = composite_reference(Vec3::splat(2.0), Vec3::ZERO, 1.0, true, false);
        assert!(moderate.max_element() < 1.0);
        assert!((moderate.x - (1.0 - (-2.0f32).exp())).abs() < 1e-6);
    }

    #[test]
    fn higher_exposure_brightens() {
        let scene = Vec3::splat(0.5);
        let low = composite_reference(scene, Vec3::ZERO, 1.0, true, false);
        let high = composite_reference(scene, Vec3::ZERO, 3.0, true, false);
        assert!(high.x > low.x);
    }
}
