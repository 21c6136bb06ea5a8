//! Procedural instance generation and the per-instance vertex stream.
//!
//! The butterfly field is 10,000 copies of one model drawn in a single
//! instanced call. [`InstanceSpread`] generates the model matrices from a
//! seeded PCG stream, so a given seed always yields the same field;
//! [`InstancePool`] uploads them once as a vertex buffer stepped per
//! instance (a 4×4 matrix across shader locations 3..6).

use glam::{Mat4, Vec3};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::gpu::GpuContext;

/// One instance as it appears in the vertex stream: a column-major 4×4
/// model matrix.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
}

impl InstanceRaw {
    /// Vertex buffer layout for the instance stream: four Float32x4 columns
    /// at shader locations 3 through 6, stepped per instance.
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<InstanceRaw>() as u64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 3,
                format: wgpu::VertexFormat::Float32x4,
            },
            wgpu::VertexAttribute {
                offset: 16,
                shader_location: 4,
                format: wgpu::VertexFormat::Float32x4,
            },
            wgpu::VertexAttribute {
                offset: 32,
                shader_location: 5,
                format: wgpu::VertexFormat::Float32x4,
            },
            wgpu::VertexAttribute {
                offset: 48,
                shader_location: 6,
                format: wgpu::VertexFormat::Float32x4,
            },
        ],
    };
}

/// Parameters for scattering instances across the field.
///
/// Each instance gets a position uniform in a square of side `expanse`
/// (centered on the origin) with height in `[0, y_extent)`, a uniform scale
/// in `scale_range`, a yaw that faces it along its bearing from the center
/// (`atan2(z, x)`), and small random tilts around X and Z.
#[derive(Clone, Debug)]
pub struct InstanceSpread {
    pub count: u32,
    pub expanse: f32,
    pub y_extent: f32,
    pub scale_range: std::ops::Range<f32>,
    /// Tilt range around X and Z, in degrees.
    pub tilt_degrees: f32,
    pub seed: u64,
}

impl Default for InstanceSpread {
    fn default() -> Self {
        Self {
            count: 10_000,
            expanse: 2000.0,
            // 0.32 of the expanse, so the column of butterflies reaches
            // roughly a third as high as the field is wide.
            y_extent: 640.0,
            scale_range: 0.5..1.0,
            tilt_degrees: 5.0,
            seed: 0x5eed,
        }
    }
}

impl InstanceSpread {
    /// Generate the model matrices for this spread.
    ///
    /// The per-instance transform composes as translate ∘ scale ∘ tilt-X ∘
    /// yaw ∘ tilt-Z, so the tilts and yaw act on the model before it is
    /// scaled and placed.
    pub fn generate(&self) -> Vec<Mat4> {
        let mut rng = Pcg32::seed_from_u64(self.seed);
        let half = self.expanse * 0.5;

        (0..self.count)
            .map(|_| {
                let x = rng.random_range(-half..half);
                let z = rng.random_range(-half..half);
                let y = rng.random_range(0.0..self.y_extent);
                let scale = rng.random_range(self.scale_range.clone());
                let yaw = z.atan2(x);
                // random_range panics on an empty range, so a zero tilt
                // skips sampling entirely.
                let mut tilt = || {
                    if self.tilt_degrees > 0.0 {
                        rng.random_range(-self.tilt_degrees..self.tilt_degrees)
                            .to_radians()
                    } else {
                        0.0
                    }
                };
                let tilt_x = tilt();
                let tilt_z = tilt();

                Mat4::from_translation(Vec3::new(x, y, z))
                    * Mat4::from_scale(Vec3::splat(scale))
                    * Mat4::from_rotation_x(tilt_x)
                    * Mat4::from_rotation_y(yaw)
                    * Mat4::from_rotation_z(tilt_z)
            })
            .collect()
    }
}

/// GPU-resident instance stream, uploaded once at startup.
pub struct InstancePool {
    buffer: wgpu::Buffer,
    count: u32,
}

impl InstancePool {
    pub fn new(gpu: &GpuContext, spread: &InstanceSpread) -> Self {
        use wgpu::util::DeviceExt;

        let matrices = spread.generate();
        let raw: Vec<InstanceRaw> = matrices
            .iter()
            .map(|m| InstanceRaw {
                model: m.to_cols_array_2d(),
            })
            .collect();

        let buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Instance Buffer"),
                contents: bytemuck::cast_slice(&raw),
                usage: wgpu::BufferUsages::VERTEX,
            });

        Self {
            buffer,
            count: spread.count,
        }
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn same_seed_reproduces_the_field() {
        let spread = InstanceSpread {
            count: 64,
            ..Default::default()
        };
        let a = spread.generate();
        let b = spread.generate();
        assert_eq!(a.len(), 64);
        for (ma, mb) in a.iter().zip(b.iter()) {
            assert_eq!(ma.to_cols_array(), mb.to_cols_array());
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let a = InstanceSpread {
            count: 8,
            seed: 1,
            ..Default::default()
        }
        .generate();
        let b = InstanceSpread {
            count: 8,
            seed: 2,
            ..Default::default()
        }
        .generate();
        assert_ne!(a[0].to_cols_array(), b[0].to_cols_array());
    }

    #[test]
    fn decomposition_respects_the_spread_bounds() {
        let spread = InstanceSpread {
            count: 500,
            ..Default::default()
        };
        let half = spread.expanse * 0.5;
        for m in spread.generate() {
            let (scale, _rotation, translation) = m.to_scale_rotation_translation();
            assert!(translation.x >= -half && translation.x < half);
            assert!(translation.z >= -half && translation.z < half);
            assert!(translation.y >= 0.0 && translation.y < spread.y_extent);
            // Scale is uniform and inside the requested range.
            assert!((scale.x - scale.y).abs() < 1e-4);
            assert!((scale.y - scale.z).abs() < 1e-4);
            assert!(scale.x >= spread.scale_range.start - 1e-4);
            assert!(scale.x < spread.scale_range.end + 1e-4);
        }
    }

    #[test]
    fn yaw_faces_the_bearing_from_center() {
        // With tilts disabled the rotation is a pure yaw of atan2(z, x).
        let spread = InstanceSpread {
            count: 200,
            tilt_degrees: 0.0,
            ..Default::default()
        };
        for m in spread.generate() {
            let (_scale, rotation, translation) = m.to_scale_rotation_translation();
            let expected = Quat::from_rotation_y(translation.z.atan2(translation.x));
            assert!(rotation.dot(expected).abs() > 0.9999);
        }
    }
}
