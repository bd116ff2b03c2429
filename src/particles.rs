//! GPU-resident smoke particle system.
//!
//! Particle state lives in a storage buffer updated by a compute pass each
//! frame; drawing pulls the same buffer from the vertex shader to emit
//! additive billboards. Lifecycle from the outside is setup/update/draw only.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::rendering::Layouts;

/// Number of particles in the pool.
pub const PARTICLE_COUNT: u32 = 4096;

/// Compute workgroup size; must match particles_update.wgsl.
const WORKGROUP_SIZE: u32 = 64;

/// GPU particle state. `misc` packs birth time, lifetime, and a per-particle
/// seed used for respawn placement.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Particle {
    pub position: [f32; 4],
    pub velocity: [f32; 4],
    pub misc: [f32; 4],
}

/// Uniforms for the compute update.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ParticleUpdateUniforms {
    pub time: f32,
    pub dt: f32,
    pub volume: f32,
    pub dir_mag: f32,
    pub pos_mag: f32,
    pub time_mag: f32,
    pub freq_mag: f32,
    pub count: u32,
}

/// Uniforms for the billboard draw.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ParticleDrawUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub right: [f32; 4],
    pub up: [f32; 4],
    pub color1: [f32; 4],
    pub color2: [f32; 4],
    /// x: smoothed volume, y: time, z: base billboard size, w: unused.
    pub misc: [f32; 4],
}

pub struct ParticleSystem {
    update_uniform: wgpu::Buffer,
    draw_uniform: wgpu::Buffer,
    update_bind_group: wgpu::BindGroup,
    draw_bind_group: wgpu::BindGroup,
}

impl ParticleSystem {
    pub fn new(device: &wgpu::Device, layouts: &Layouts) -> Self {
        let particles = seed_particles();

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Buffer"),
            contents: bytemuck::cast_slice(&particles),
            usage: wgpu::BufferUsages::STORAGE,
        });

        let update_uniform = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Update Uniforms"),
            size: std::mem::size_of::<ParticleUpdateUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let draw_uniform = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Draw Uniforms"),
            size: std::mem::size_of::<ParticleDrawUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let update_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Particle Update Bind Group"),
            layout: &layouts.particle_update,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: update_uniform.as_entire_binding(),
                },
            ],
        });
        let draw_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Particle Draw Bind Group"),
            layout: &layouts.particle_draw,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: draw_uniform.as_entire_binding(),
                },
            ],
        });

        Self {
            update_uniform,
            draw_uniform,
            update_bind_group,
            draw_bind_group,
        }
    }

    /// Upload this frame's uniforms.
    pub fn write_uniforms(
        &self,
        queue: &wgpu::Queue,
        update: &ParticleUpdateUniforms,
        draw: &ParticleDrawUniforms,
    ) {
        queue.write_buffer(&self.update_uniform, 0, bytemuck::cast_slice(&[*update]));
        queue.write_buffer(&self.draw_uniform, 0, bytemuck::cast_slice(&[*draw]));
    }

    /// Encode the compute update pass.
    pub fn update(&self, encoder: &mut wgpu::CommandEncoder, pipeline: &wgpu::ComputePipeline) {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Particle Update Pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.update_bind_group, &[]);
        pass.dispatch_workgroups(PARTICLE_COUNT.div_ceil(WORKGROUP_SIZE), 1, 1);
    }

    /// Record the billboard draw into an open render pass.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, pipeline: &wgpu::RenderPipeline) {
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.draw_bind_group, &[]);
        pass.draw(0..6, 0..PARTICLE_COUNT);
    }
}

/// Initial particle pool: spread over the mesh area with staggered births so
/// the pool cycles immediately instead of spawning in one burst.
fn seed_particles() -> Vec<Particle> {
    let mut state = 0x9e37_79b9u32;
    let mut rand01 = move || {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (state >> 8) as f32 / 16_777_216.0
    };

    (0..PARTICLE_COUNT)
        .map(|_| {
            let x = (rand01() - 0.5) * 160.0;
            let z = (rand01() - 0.5) * 40.0;
            let lifetime = 4.0 + rand01() * 6.0;
            let birth = -lifetime * rand01();
            let seed = rand01();
            Particle {
                position: [x, rand01() * 2.0, z, 1.0],
                velocity: [0.0, 0.5 + rand01(), 0.0, 0.0],
                misc: [birth, lifetime, seed, 0.0],
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_particles_pool() {
        let particles = seed_particles();
        assert_eq!(particles.len(), PARTICLE_COUNT as usize);
        for p in &particles {
            assert!(p.misc[1] >= 4.0 && p.misc[1] <= 10.0, "lifetime in range");
            assert!(p.misc[0] <= 0.0, "births are staggered into the past");
            assert!(p.velocity[1] > 0.0, "initial drift is upward");
        }
    }

    #[test]
    fn test_seed_particles_are_not_uniform() {
        let particles = seed_particles();
        let first = particles[0].position;
        assert!(particles.iter().any(|p| p.position != first));
    }

    #[test]
    fn test_particle_is_pod_sized() {
        // Three vec4s per particle on the GPU side.
        assert_eq!(std::mem::size_of::<Particle>(), 48);
        assert_eq!(std::mem::size_of::<ParticleUpdateUniforms>(), 32);
        assert_eq!(std::mem::size_of::<ParticleDrawUniforms>(), 144);
    }
}
