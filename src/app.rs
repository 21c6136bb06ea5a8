//! Windowing, per-frame update, and scene assembly.
//!
//! [`App`] is the winit application handler: it creates the fixed-size
//! window and GPU context on resume, loads [`DemoAssets`], and drives a
//! continuous redraw loop. Each frame it folds input into the camera and
//! effect settings, animates the lights and emissive intensities, and hands
//! the assembled draw lists to the render graph.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use glam::{Mat4, Vec3};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::KeyCode;
use winit::window::{Window, WindowAttributes, WindowId};

use crate::camera::{Camera, CameraMovement};
use crate::gpu::{GpuContext, SURFACE_HEIGHT, SURFACE_WIDTH};
use crate::input::Input;
use crate::instancing::{InstancePool, InstanceSpread};
use crate::model::Model;
use crate::orbit::OrbitRig;
use crate::render_graph::{EffectSettings, RenderGraph};
use crate::scene_pass::{FrameInputs, InstancedDraw, PointLight, StaticDraw};

/// Exposure change per second while Q or E is held.
const EXPOSURE_RATE: f32 = 2.0;

/// The models the demo draws, plus the butterfly instance stream.
pub struct DemoAssets {
    pub figure: Model,
    pub flame: Model,
    pub ground: Model,
    pub butterfly: Model,
    pub butterflies: InstancePool,
}

impl DemoAssets {
    /// Load every model from `dir`.
    ///
    /// A model that fails to load is logged and replaced with an empty one,
    /// so a missing asset costs its draws but not the whole demo.
    pub fn load(gpu: &GpuContext, dir: &Path) -> Self {
        let load = |name: &str| match Model::load(gpu, dir.join(name)) {
            Ok(model) => model,
            Err(e) => {
                log::error!("failed to load {name}: {e}");
                Model::from_meshes(Vec::new())
            }
        };

        Self {
            figure: load("figure.obj"),
            flame: load("flame.obj"),
            ground: load("ground.obj"),
            butterfly: load("butterfly.obj"),
            butterflies: InstancePool::new(gpu, &InstanceSpread::default()),
        }
    }
}

/// The demo application.
///
/// Window and GPU state live in `Option`s because winit only hands out a
/// window once the event loop resumes.
pub struct App {
    asset_dir: PathBuf,
    window: Option<Arc<Window>>,
    gpu: Option<GpuContext>,
    graph: Option<RenderGraph>,
    assets: Option<DemoAssets>,
    input: Input,
    camera: Camera,
    orbit: OrbitRig,
    /// Auto-orbit drives the view while set; toggled with R.
    orbiting: bool,
    /// Mouse movement steers the camera while set; toggled with Space.
    free_look: bool,
    settings: EffectSettings,
    start: Instant,
    last_frame: Instant,
}

impl App {
    pub fn new(asset_dir: impl Into<PathBuf>) -> Self {
        let now = Instant::now();
        Self {
            asset_dir: asset_dir.into(),
            window: None,
            gpu: None,
            graph: None,
            assets: None,
            input: Input::new(),
            camera: Camera::new().position([0.0, 2.5, 8.0]),
            orbit: OrbitRig::default(),
            orbiting: true,
            free_look: true,
            settings: EffectSettings::default(),
            start: now,
            last_frame: now,
        }
    }

    fn apply_input(&mut self, event_loop: &ActiveEventLoop, dt: f32) {
        if self.input.key_pressed(KeyCode::Escape) {
            event_loop.exit();
            return;
        }

        if self.input.key_pressed(KeyCode::KeyH) {
            self.settings.hdr = !self.settings.hdr;
            log::info!("hdr: {}", self.settings.hdr);
        }
        if self.input.key_pressed(KeyCode::KeyB) {
            self.settings.bloom = !self.settings.bloom;
            log::info!("bloom: {}", self.settings.bloom);
        }
        if self.input.key_pressed(KeyCode::KeyR) {
            self.orbiting = !self.orbiting;
            // The orbit keeps the altitude the camera held when it engaged.
            if self.orbiting {
                self.orbit.height = self.camera.position.y;
            }
        }
        if self.input.key_pressed(KeyCode::Space) {
            self.free_look = !self.free_look;
        }

        if self.input.key_down(KeyCode::KeyQ) {
            self.settings.exposure -= EXPOSURE_RATE * dt;
        }
        if self.input.key_down(KeyCode::KeyE) {
            self.settings.exposure += EXPOSURE_RATE * dt;
        }

        if self.input.key_down(KeyCode::KeyW) {
            self.camera.advance(CameraMovement::Forward, dt);
        }
        if self.input.key_down(KeyCode::KeyS) {
            self.camera.advance(CameraMovement::Backward, dt);
        }
        if self.input.key_down(KeyCode::KeyA) {
            self.camera.advance(CameraMovement::Left, dt);
        }
        if self.input.key_down(KeyCode::KeyD) {
            self.camera.advance(CameraMovement::Right, dt);
        }

        if self.free_look {
            let delta = self.input.mouse_delta();
            // Screen y grows downward; the camera wants up-positive pitch.
            self.camera.look(delta.x, -delta.y);
        }
        self.camera.zoom_by(self.input.scroll_delta().y);
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        let t = now.duration_since(self.start).as_secs_f32();

        self.apply_input(event_loop, dt);
        if event_loop.exiting() {
            return;
        }

        let (Some(gpu), Some(graph), Some(assets)) = (&self.gpu, &self.graph, &self.assets)
        else {
            return;
        };

        // Both lights breathe together: their falloff coefficients are fit
        // against an oscillating reference distance, so the lit radius
        // swells and shrinks over time.
        let reference_dist = 29.0 + t.sin() * 9.0;
        let linear = 5.4399 * reference_dist.powf(-1.063);
        let quadratic = 107.35 * reference_dist.powf(-2.115);
        let light_color = Vec3::new(0.45, 0.3, 0.3);
        let lights = [
            PointLight::new(Vec3::new(-1.6, 0.5, 0.55), light_color, linear, quadratic),
            PointLight::new(Vec3::new(1.6, 4.6, 1.55), light_color, linear, quadratic),
        ];

        let (view, view_pos) = if self.orbiting {
            (self.orbit.view_matrix(t), self.orbit.eye(t))
        } else {
            (self.camera.view_matrix(), self.camera.position)
        };

        let frame = FrameInputs {
            view,
            proj: self.camera.projection_matrix(gpu.aspect()),
            view_pos,
            time: t,
            lights,
        };

        let statics = [
            StaticDraw {
                model: &assets.figure,
                transform: Mat4::from_scale(Vec3::splat(0.2)),
                emissive: 0.9 + (t * 1.6).sin() * 0.1,
            },
            StaticDraw {
                model: &assets.flame,
                transform: Mat4::from_scale(Vec3::splat(0.2)),
                emissive: 0.6 + t.sin() * 0.4,
            },
            StaticDraw {
                model: &assets.ground,
                transform: Mat4::from_scale(Vec3::splat(0.2)),
                emissive: 0.0,
            },
        ];

        // Four glow phases a quarter period apart, cycled across the field
        // by instance index so neighbours shimmer out of step.
        let glow_phases = std::array::from_fn(|k| {
            0.7 + (t * 0.5 + k as f32 * std::f32::consts::FRAC_PI_2).sin() * 0.3
        });
        let instanced = [InstancedDraw {
            model: &assets.butterfly,
            base_transform: Mat4::from_scale(Vec3::splat(0.025)),
            instances: &assets.butterflies,
            glow_phases,
        }];

        graph.render(gpu, &frame, &statics, &instanced, &self.settings);

        self.input.begin_frame();
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = WindowAttributes::default()
            .with_title("Emberfield")
            .with_inner_size(PhysicalSize::new(SURFACE_WIDTH, SURFACE_HEIGHT))
            .with_resizable(false);
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .expect("failed to create window"),
        );

        let gpu = GpuContext::new(window.clone());
        self.graph = Some(RenderGraph::new(&gpu));
        self.assets = Some(DemoAssets::load(&gpu, &self.asset_dir));
        self.gpu = Some(gpu);

        window.request_redraw();
        self.window = Some(window);

        // Timing restarts here so asset loading doesn't count toward the
        // first frame's delta.
        let now = Instant::now();
        self.start = now;
        self.last_frame = now;
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        self.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}
