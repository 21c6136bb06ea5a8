//! Frame orchestration: scene pass, blur chain, composite, present.
//!
//! [`RenderGraph`] owns every offscreen target and pass object and records
//! one frame into a single command encoder: the lit scene with its
//! bright-pass output, then [`BLUR_ITERATIONS`] alternating blur iterations
//! ping-ponging between two targets, then the composite onto the swapchain.
//!
//! The blur ordering is factored out into the pure [`blur_schedule`] so the
//! ping-pong invariants can be checked without a GPU: the first iteration
//! reads the bright-pass, every later iteration reads the target written by
//! its predecessor, and the direction alternates starting horizontal.

use crate::blur_pass::BlurPass;
use crate::composite_pass::CompositePass;
use crate::gpu::GpuContext;
use crate::render_target::{RenderTarget, SceneTarget};
use crate::scene_pass::{FrameInputs, InstancedDraw, ScenePass, StaticDraw};

/// Number of one-direction blur iterations per frame.
pub const BLUR_ITERATIONS: usize = 50;

/// Where a blur iteration reads from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlurSource {
    /// The scene pass's bright-pass attachment.
    Bright,
    /// One of the two ping-pong targets.
    Target(usize),
}

/// One planned blur iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlurStep {
    pub horizontal: bool,
    pub source: BlurSource,
    pub target: usize,
}

/// Plan the ping-pong blur chain for `iterations` passes.
///
/// Iteration `i` writes target `i % 2`; the first iteration seeds from the
/// bright-pass and every later one reads its predecessor's output. The
/// direction starts horizontal and alternates.
pub fn blur_schedule(iterations: usize) -> Vec<BlurStep> {
    (0..iterations)
        .map(|i| BlurStep {
            horizontal: i % 2 == 0,
            source: if i == 0 {
                BlurSource::Bright
            } else {
                BlurSource::Target((i - 1) % 2)
            },
            target: i % 2,
        })
        .collect()
}

/// User-facing toggles for the composite stage.
///
/// Exposure is deliberately unclamped; holding E long enough blows the
/// image out, exactly as the controls advertise.
#[derive(Clone, Copy, Debug)]
pub struct EffectSettings {
    pub hdr: bool,
    pub bloom: bool,
    pub exposure: f32,
}

impl Default for EffectSettings {
    fn default() -> Self {
        Self {
            hdr: true,
            bloom: true,
            exposure: 3.0,
        }
    }
}

/// Owns the offscreen targets and passes and records whole frames.
pub struct RenderGraph {
    scene_target: SceneTarget,
    blur_targets: [RenderTarget; 2],
    scene_pass: ScenePass,
    blur_pass: BlurPass,
    composite_pass: CompositePass,
}

impl RenderGraph {
    pub fn new(gpu: &GpuContext) -> Self {
        Self {
            scene_target: SceneTarget::new(gpu),
            blur_targets: [
                RenderTarget::new(gpu, "Blur Target A"),
                RenderTarget::new(gpu, "Blur Target B"),
            ],
            scene_pass: ScenePass::new(gpu),
            blur_pass: BlurPass::new(gpu),
            composite_pass: CompositePass::new(gpu),
        }
    }

    /// Render and present one frame.
    ///
    /// A failure to acquire the surface is logged and the frame skipped;
    /// the next frame retries.
    pub fn render(
        &self,
        gpu: &GpuContext,
        frame: &FrameInputs,
        statics: &[StaticDraw],
        instanced: &[InstancedDraw],
        settings: &EffectSettings,
    ) {
        let surface_texture = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(e) => {
                log::warn!("dropping frame: surface unavailable: {e}");
                return;
            }
        };
        let surface_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        self.scene_pass.render(
            gpu,
            &mut encoder,
            &self.scene_target,
            frame,
            statics,
            instanced,
        );

        let schedule = blur_schedule(BLUR_ITERATIONS);
        for step in &schedule {
            let input = match step.source {
                BlurSource::Bright => &self.scene_target.bright.view,
                BlurSource::Target(i) => &self.blur_targets[i].view,
            };
            self.blur_pass.render(
                gpu,
                &mut encoder,
                input,
                &self.blur_targets[step.target],
                step.horizontal,
            );
        }

        // With zero iterations the raw bright-pass stands in for the blur.
        let bloom_view = match schedule.last() {
            Some(step) => &self.blur_targets[step.target].view,
            None => &self.scene_target.bright.view,
        };

        self.composite_pass.render(
            gpu,
            &mut encoder,
            &surface_view,
            &self.scene_target.color.view,
            bloom_view,
            settings.exposure,
            settings.hdr,
            settings.bloom,
        );

        gpu.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_iteration_seeds_from_the_bright_pass() {
        let schedule = blur_schedule(BLUR_ITERATIONS);
        assert_eq!(schedule[0].source, BlurSource::Bright);
        assert!(schedule[0].horizontal);
    }

    #[test]
    fn directions_alternate() {
        let schedule = blur_schedule(BLUR_ITERATIONS);
        for pair in schedule.windows(2) {
            assert_ne!(pair[0].horizontal, pair[1].horizontal);
        }
    }

    #[test]
    fn each_iteration_reads_its_predecessors_output() {
        let schedule = blur_schedule(BLUR_ITERATIONS);
        for (i, pair) in schedule.windows(2).enumerate() {
            assert_eq!(pair[1].source, BlurSource::Target(pair[0].target));
            // No iteration reads and writes the same target.
            if let BlurSource::Target(src) = pair[1].source {
                assert_ne!(src, pair[1].target, "iteration {} self-reads", i + 1);
            }
        }
    }

    #[test]
    fn schedule_covers_the_requested_iterations() {
        assert_eq!(blur_schedule(BLUR_ITERATIONS).len(), 50);
        assert!(blur_schedule(0).is_empty());
    }
}
