//! Core GPU context and device management.
//!
//! This module provides [`GpuContext`], the central struct that holds all wgpu
//! resources needed for rendering. It manages the device, queue, surface, and
//! surface configuration, and is passed to every rendering pass in the demo.
//!
//! The demo renders at a fixed resolution: the window is created
//! non-resizable at [`SURFACE_WIDTH`] × [`SURFACE_HEIGHT`] and every
//! offscreen target matches it, so there is no resize path here.

use std::sync::Arc;
use winit::window::Window;

/// Fixed surface width in pixels.
pub const SURFACE_WIDTH: u32 = 1280;
/// Fixed surface height in pixels.
pub const SURFACE_HEIGHT: u32 = 720;

/// Core GPU context holding wgpu resources.
///
/// This struct owns the fundamental wgpu objects needed for rendering:
/// the surface for presenting to the window, the device for creating GPU
/// resources, the queue for submitting commands, and the surface
/// configuration.
///
/// All fields are public to allow direct access to wgpu APIs when needed.
/// The context is created once at startup and passed by reference to all
/// rendering passes.
pub struct GpuContext {
    /// The surface for presenting rendered frames to the window.
    pub surface: wgpu::Surface<'static>,
    /// The logical GPU device for creating resources and pipelines.
    pub device: wgpu::Device,
    /// The command queue for submitting work to the GPU.
    pub queue: wgpu::Queue,
    /// Current surface configuration (format, size, present mode).
    pub config: wgpu::SurfaceConfiguration,
}

impl GpuContext {
    /// Create a new GPU context from a winit window.
    ///
    /// This performs all wgpu initialization:
    /// 1. Creates a wgpu instance with primary backends (Vulkan, Metal, DX12)
    /// 2. Creates a surface for the window
    /// 3. Requests a suitable GPU adapter
    /// 4. Creates the logical device and command queue
    /// 5. Configures the surface with an sRGB format and Fifo present mode
    ///
    /// # Panics
    ///
    /// Panics if no suitable GPU adapter is found or device creation fails.
    pub fn new(window: Arc<Window>) -> Self {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window).unwrap();

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .expect("Failed to find a suitable GPU adapter");

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Emberfield Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
            trace: Default::default(),
            experimental_features: Default::default(),
        }))
        .expect("Failed to create device");

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Self {
            surface,
            device,
            queue,
            config,
        }
    }

    /// Returns the surface width in pixels.
    pub fn width(&self) -> u32 {
        self.config.width
    }

    /// Returns the surface height in pixels.
    pub fn height(&self) -> u32 {
        self.config.height
    }

    /// Returns the aspect ratio (width / height).
    pub fn aspect(&self) -> f32 {
        self.config.width as f32 / self.config.height as f32
    }
}
