//! Offscreen render targets for the HDR pipeline.
//!
//! All intermediate results live in `Rgba16Float` textures so values above
//! 1.0 survive between passes; only the final composite lands in the
//! surface's sRGB format. Targets are created once at startup at the fixed
//! surface size.

use crate::gpu::GpuContext;

/// Texture format for every intermediate color target.
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Depth format for the scene pass.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// An off-screen render target used for intermediate pass results.
///
/// Render targets are GPU textures that can be both rendered to (as a color
/// attachment) and sampled from (as a texture binding). This dual capability
/// enables ping-pong rendering where one pass writes to target A while
/// reading from target B, then the next pass reverses the roles.
pub struct RenderTarget {
    /// The underlying GPU texture that stores pixel data.
    pub texture: wgpu::Texture,
    /// A view into the texture, used for attachments and shader sampling.
    pub view: wgpu::TextureView,
}

impl RenderTarget {
    /// Creates a new HDR render target at the surface dimensions.
    pub fn new(gpu: &GpuContext, label: &str) -> Self {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: gpu.width(),
                height: gpu.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: HDR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

/// The scene pass output: two HDR color attachments sharing one depth
/// buffer.
///
/// Attachment 0 receives the full lit color; attachment 1 receives only the
/// fragments whose luminance crosses the bright-pass threshold, which seeds
/// the blur chain.
pub struct SceneTarget {
    /// Full lit scene color.
    pub color: RenderTarget,
    /// Bright-pass extraction.
    pub bright: RenderTarget,
    /// Shared depth attachment.
    pub depth_view: wgpu::TextureView,
}

impl SceneTarget {
    pub fn new(gpu: &GpuContext) -> Self {
        let depth = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Scene Depth"),
            size: wgpu::Extent3d {
                width: gpu.width(),
                height: gpu.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        Self {
            color: RenderTarget::new(gpu, "Scene Color"),
            bright: RenderTarget::new(gpu, "Scene Bright"),
            depth_view: depth.create_view(&wgpu::TextureViewDescriptor::default()),
        }
    }
}
