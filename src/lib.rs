//! # Emberfield
//!
//! **A real-time HDR bloom and instancing demo built on wgpu.**
//!
//! Emberfield renders a small fixed scene — a figure, a flame, a ground
//! plane, and a field of 10,000 instanced butterflies — through a
//! three-stage pipeline:
//!
//! 1. **Scene pass**: lit geometry into a dual-output HDR target
//!    (full color plus a bright-pass extraction), sharing one depth buffer.
//! 2. **Blur pass**: 50 iterations of separable Gaussian blur, ping-ponging
//!    between two offscreen targets to widen the bright-pass glow.
//! 3. **Composite pass**: exposure tone mapping plus additive bloom onto
//!    the visible surface.
//!
//! ## Controls
//!
//! - **W/A/S/D** — move the camera
//! - **Mouse** — look around; **scroll** — zoom
//! - **R** — toggle camera auto-orbit
//! - **H** / **B** — toggle HDR tone mapping / bloom
//! - **Q** / **E** — lower / raise exposure
//! - **ESC** — exit

mod app;
mod blur_pass;
mod camera;
mod composite_pass;
mod gpu;
mod input;
mod instancing;
mod mesh;
mod model;
mod obj;
mod orbit;
mod render_graph;
mod render_target;
mod scene_pass;
mod texture;

pub use app::{App, DemoAssets};
pub use blur_pass::BlurPass;
pub use camera::{Camera, CameraMovement};
pub use composite_pass::{CompositePass, composite_reference};
pub use gpu::{GpuContext, SURFACE_HEIGHT, SURFACE_WIDTH};
pub use input::Input;
pub use instancing::{InstancePool, InstanceSpread};
pub use mesh::{MaterialSlots, Mesh, Vertex3d};
pub use model::{Model, ModelError};
pub use obj::{ObjError, ObjMaterial, ObjMesh, ObjModel, parse_obj_file, parse_obj_str};
pub use orbit::OrbitRig;
pub use render_graph::{
    BLUR_ITERATIONS, BlurSource, BlurStep, EffectSettings, RenderGraph, blur_schedule,
};
pub use render_target::{RenderTarget, SceneTarget};
pub use scene_pass::{FrameInputs, InstancedDraw, PointLight, ScenePass, StaticDraw};
pub use texture::Texture;

// Re-export glam math types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

// Re-export commonly used winit types for convenience
pub use winit::keyboard::KeyCode;
