//! Rendering system: device setup, offscreen propagation passes, and the
//! final frame composition.
//!
//! Frame order: slide+stamp into the ping-pong destination, displacement
//! map, normal map, particle compute, then the swapchain pass (background,
//! particles, optional debug tiles, mesh, panel overlay).

mod pipelines;
mod targets;

pub use pipelines::{Layouts, Pipelines, RenderError};
pub use targets::{FloatTarget, PingPong};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use log::warn;
use wgpu::util::DeviceExt;

use crate::mesh::LatticeMesh;
use crate::params::{AppParams, RenderConfig};
use crate::particles::ParticleSystem;
use crate::ui::UiLayer;

/// Width of the straight stamp bar in ping-pong texels.
const STAMP_BAR_TEXELS: f32 = 50.0;

/// Normal derivation strength.
const NORMAL_STRENGTH: f32 = 4.0;

/// Alpha of the undisplaced mesh overlay.
const OVERLAY_ALPHA: f32 = 0.2;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct SlideUniforms {
    dx: f32,
    _pad: [f32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct StampUniforms {
    /// UV-space rect (x0, y0, x1, y1).
    rect: [f32; 4],
    color: [f32; 4],
    /// 0 = bar, 1 = circle.
    mode: u32,
    _pad: [u32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct DispUniforms {
    time: f32,
    amplitude: f32,
    audio_amplitude: f32,
    _pad: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct NormalUniforms {
    strength: f32,
    _pad: [f32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct MeshUniforms {
    view_proj: [[f32; 4]; 4],
    line_color1: [f32; 4],
    line_color2: [f32; 4],
    falloff_color: [f32; 4],
    volume_color: [f32; 4],
    /// x: gap alpha, y: line width, z: overlay alpha, w: unused.
    misc: [f32; 4],
    /// x: falloff, y: lines, z: overlay, w: unused.
    flags: [u32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct BackgroundUniforms {
    hue: f32,
    brightness: f32,
    _pad: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct BlitUniforms {
    /// Screen-UV rect (x0, y0, x1, y1).
    rect: [f32; 4],
}

/// Everything the renderer needs for one frame.
pub struct FrameScene<'a> {
    pub time: f32,
    /// Raw monitor volume, stamped into the propagation buffer.
    pub volume: f32,
    /// Eased base wave amplitude (A toggles its target).
    pub amplitude: f32,
    pub view_proj: Mat4,
    pub params: &'a AppParams,
}

/// Rendering system managing the wgpu device, targets, and pipelines.
pub struct RenderSystem {
    surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    vsync: bool,

    pub layouts: Layouts,
    pipelines: Pipelines,
    shader_dir: PathBuf,
    wireframe_supported: bool,

    pingpong: PingPong,
    displacement: FloatTarget,
    normal_map: FloatTarget,
    map_size: u32,
    debug_tile_px: f32,

    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,

    slide_ubuf: wgpu::Buffer,
    stamp_ubuf: wgpu::Buffer,
    disp_ubuf: wgpu::Buffer,
    normal_ubuf: wgpu::Buffer,
    mesh_ubuf: wgpu::Buffer,
    overlay_ubuf: wgpu::Buffer,
    background_ubuf: wgpu::Buffer,
    blit_ubufs: [wgpu::Buffer; 3],

    slide_bind_groups: [wgpu::BindGroup; 2],
    stamp_bind_group: wgpu::BindGroup,
    disp_bind_groups: [wgpu::BindGroup; 2],
    normal_bind_group: wgpu::BindGroup,
    mesh_bind_groups: [wgpu::BindGroup; 2],
    overlay_bind_groups: [wgpu::BindGroup; 2],
    background_bind_group: Option<wgpu::BindGroup>,
    blit_pingpong_groups: [wgpu::BindGroup; 2],
    blit_disp_group: wgpu::BindGroup,
    blit_normal_group: wgpu::BindGroup,
}

impl RenderSystem {
    pub async fn new(
        window: Arc<winit::window::Window>,
        mesh: &LatticeMesh,
        render_config: &RenderConfig,
        assets_dir: &Path,
    ) -> Result<Self, RenderError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;

        let wireframe_supported = adapter
            .features()
            .contains(wgpu::Features::POLYGON_MODE_LINE);
        let required_features = if wireframe_supported {
            wgpu::Features::POLYGON_MODE_LINE
        } else {
            warn!("wireframe unsupported on this adapter, W will be inert");
            wgpu::Features::empty()
        };

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Main Device"),
                    required_features,
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

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
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let layouts = Layouts::new(&device);
        let shader_dir = assets_dir.join("shaders");
        let pipelines = Pipelines::build(
            &device,
            surface_format,
            &shader_dir,
            &layouts,
            wireframe_supported,
        )?;

        let map_size = render_config.map_size;
        let pingpong = PingPong::new(&device, map_size, wgpu::TextureFormat::R32Float);
        let displacement = FloatTarget::new(
            &device,
            "Displacement Map",
            map_size,
            wgpu::TextureFormat::R32Float,
        );
        let normal_map = FloatTarget::new(
            &device,
            "Normal Map",
            map_size,
            wgpu::TextureFormat::Rgba32Float,
        );

        // The propagation reads whatever is in the source on frame one;
        // both buffers start from silence.
        clear_targets(
            &device,
            &queue,
            &[
                &pingpong.targets[0].view,
                &pingpong.targets[1].view,
                &displacement.view,
                &normal_map.view,
            ],
        );

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let make_ubuf = |label: &str, size: u64| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        let slide_ubuf = make_ubuf("Slide Uniforms", std::mem::size_of::<SlideUniforms>() as u64);
        let stamp_ubuf = make_ubuf("Stamp Uniforms", std::mem::size_of::<StampUniforms>() as u64);
        let disp_ubuf = make_ubuf(
            "Displacement Uniforms",
            std::mem::size_of::<DispUniforms>() as u64,
        );
        let normal_ubuf = make_ubuf(
            "Normal Uniforms",
            std::mem::size_of::<NormalUniforms>() as u64,
        );
        let mesh_ubuf = make_ubuf("Mesh Uniforms", std::mem::size_of::<MeshUniforms>() as u64);
        let overlay_ubuf = make_ubuf(
            "Mesh Overlay Uniforms",
            std::mem::size_of::<MeshUniforms>() as u64,
        );
        let background_ubuf = make_ubuf(
            "Background Uniforms",
            std::mem::size_of::<BackgroundUniforms>() as u64,
        );
        let blit_ubufs = [
            make_ubuf("Blit Uniforms 0", std::mem::size_of::<BlitUniforms>() as u64),
            make_ubuf("Blit Uniforms 1", std::mem::size_of::<BlitUniforms>() as u64),
            make_ubuf("Blit Uniforms 2", std::mem::size_of::<BlitUniforms>() as u64),
        ];

        let pass_group = |label: &str, ubuf: &wgpu::Buffer, view: &wgpu::TextureView| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &layouts.pass,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: ubuf.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                ],
            })
        };

        let slide_bind_groups = [
            pass_group("Slide From A", &slide_ubuf, &pingpong.targets[0].view),
            pass_group("Slide From B", &slide_ubuf, &pingpong.targets[1].view),
        ];
        let disp_bind_groups = [
            pass_group("Displace From A", &disp_ubuf, &pingpong.targets[0].view),
            pass_group("Displace From B", &disp_ubuf, &pingpong.targets[1].view),
        ];
        let normal_bind_group = pass_group("Normal From Disp", &normal_ubuf, &displacement.view);
        let blit_pingpong_groups = [
            pass_group("Blit Ping-Pong A", &blit_ubufs[0], &pingpong.targets[0].view),
            pass_group("Blit Ping-Pong B", &blit_ubufs[0], &pingpong.targets[1].view),
        ];
        let blit_disp_group = pass_group("Blit Displacement", &blit_ubufs[1], &displacement.view);
        let blit_normal_group = pass_group("Blit Normal", &blit_ubufs[2], &normal_map.view);

        let stamp_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Stamp Bind Group"),
            layout: &layouts.uniform_only,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: stamp_ubuf.as_entire_binding(),
            }],
        });

        let mesh_group = |label: &str, ubuf: &wgpu::Buffer, audio_view: &wgpu::TextureView| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &layouts.mesh,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: ubuf.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&displacement.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&normal_map.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::TextureView(audio_view),
                    },
                ],
            })
        };
        let mesh_bind_groups = [
            mesh_group("Mesh Audio A", &mesh_ubuf, &pingpong.targets[0].view),
            mesh_group("Mesh Audio B", &mesh_ubuf, &pingpong.targets[1].view),
        ];
        let overlay_bind_groups = [
            mesh_group("Overlay Audio A", &overlay_ubuf, &pingpong.targets[0].view),
            mesh_group("Overlay Audio B", &overlay_ubuf, &pingpong.targets[1].view),
        ];

        let background_bind_group =
            load_background(&device, &queue, &layouts, &background_ubuf, assets_dir);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            vsync: true,
            layouts,
            pipelines,
            shader_dir,
            wireframe_supported,
            pingpong,
            displacement,
            normal_map,
            map_size,
            debug_tile_px: render_config.debug_tile_px,
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
            slide_ubuf,
            stamp_ubuf,
            disp_ubuf,
            normal_ubuf,
            mesh_ubuf,
            overlay_ubuf,
            background_ubuf,
            blit_ubufs,
            slide_bind_groups,
            stamp_bind_group,
            disp_bind_groups,
            normal_bind_group,
            mesh_bind_groups,
            overlay_bind_groups,
            background_bind_group,
            blit_pingpong_groups,
            blit_disp_group,
            blit_normal_group,
        })
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
    }

    /// Toggle vertical sync (V).
    pub fn toggle_vsync(&mut self) {
        self.vsync = !self.vsync;
        self.config.present_mode = if self.vsync {
            wgpu::PresentMode::Fifo
        } else {
            wgpu::PresentMode::AutoNoVsync
        };
        self.surface.configure(&self.device, &self.config);
    }

    /// Rebuild all pipelines from the shader directory (S). On failure the
    /// previous pipelines stay active.
    pub fn reload_shaders(&mut self) -> Result<(), RenderError> {
        let pipelines = Pipelines::build(
            &self.device,
            self.config.format,
            &self.shader_dir,
            &self.layouts,
            self.wireframe_supported,
        )?;
        self.pipelines = pipelines;
        Ok(())
    }

    /// Rewrite the mesh vertex buffer (line-orientation changes).
    pub fn update_mesh_vertices(&self, vertices: &[crate::mesh::Vertex]) {
        self.queue
            .write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(vertices));
    }

    /// Render one frame.
    pub fn render(
        &mut self,
        scene: &FrameScene,
        particles: &ParticleSystem,
        ui: Option<(&mut UiLayer, &winit::window::Window, egui::FullOutput)>,
    ) -> Result<(), wgpu::SurfaceError> {
        self.write_frame_uniforms(scene);

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        self.encode_propagation(&mut encoder);
        self.encode_map_passes(&mut encoder);
        particles.update(&mut encoder, &self.pipelines.particle_update);
        self.encode_main_pass(&mut encoder, &view, scene, particles);

        if let Some((ui_layer, window, full_output)) = ui {
            ui_layer.paint(
                &self.device,
                &self.queue,
                &mut encoder,
                window,
                &view,
                (self.config.width, self.config.height),
                full_output,
            );
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        self.pingpong.swap();
        Ok(())
    }

    fn write_frame_uniforms(&self, scene: &FrameScene) {
        let p = scene.params;

        let slide = SlideUniforms {
            dx: p.movement.dx,
            _pad: [0.0; 3],
        };
        self.queue
            .write_buffer(&self.slide_ubuf, 0, bytemuck::cast_slice(&[slide]));

        let stamp = if p.movement.straight_marker {
            StampUniforms {
                rect: [1.0 - STAMP_BAR_TEXELS / self.map_size as f32, 0.0, 1.0, 1.0],
                color: [scene.volume; 4],
                mode: 0,
                _pad: [0; 3],
            }
        } else {
            // Circle at the right mid edge, radius half the buffer height.
            StampUniforms {
                rect: [0.5, 0.0, 1.5, 1.0],
                color: [scene.volume; 4],
                mode: 1,
                _pad: [0; 3],
            }
        };
        self.queue
            .write_buffer(&self.stamp_ubuf, 0, bytemuck::cast_slice(&[stamp]));

        let disp = DispUniforms {
            time: scene.time,
            amplitude: scene.amplitude,
            audio_amplitude: p.movement.audio_amplitude,
            _pad: 0.0,
        };
        self.queue
            .write_buffer(&self.disp_ubuf, 0, bytemuck::cast_slice(&[disp]));

        let normal = NormalUniforms {
            strength: NORMAL_STRENGTH,
            _pad: [0.0; 3],
        };
        self.queue
            .write_buffer(&self.normal_ubuf, 0, bytemuck::cast_slice(&[normal]));

        let vp = scene.view_proj.to_cols_array_2d();
        let mesh = MeshUniforms {
            view_proj: vp,
            line_color1: rgb1(p.lines.color1),
            line_color2: rgb1(p.lines.color2),
            falloff_color: rgb1(p.lines.falloff_color),
            volume_color: rgb1(p.lines.volume_color),
            misc: [p.lines.gap_alpha, p.lines.line_width, 0.0, 0.0],
            flags: [
                p.toggles.enable_falloff as u32,
                p.lines.enable_lines as u32,
                0,
                0,
            ],
        };
        self.queue
            .write_buffer(&self.mesh_ubuf, 0, bytemuck::cast_slice(&[mesh]));

        let overlay = MeshUniforms {
            misc: [p.lines.gap_alpha, p.lines.line_width, OVERLAY_ALPHA, 0.0],
            flags: [0, 0, 1, 0],
            ..mesh
        };
        self.queue
            .write_buffer(&self.overlay_ubuf, 0, bytemuck::cast_slice(&[overlay]));

        let background = BackgroundUniforms {
            hue: p.background.hue,
            brightness: p.background.brightness,
            _pad: [0.0; 2],
        };
        self.queue
            .write_buffer(&self.background_ubuf, 0, bytemuck::cast_slice(&[background]));

        // Debug tiles across the top-left corner.
        let (w, h) = (self.config.width as f32, self.config.height as f32);
        let tile = self.debug_tile_px;
        for (i, ubuf) in self.blit_ubufs.iter().enumerate() {
            let x0 = i as f32 * tile / w;
            let x1 = (i + 1) as f32 * tile / w;
            let blit = BlitUniforms {
                rect: [x0, 0.0, x1.min(1.0), (tile / h).min(1.0)],
            };
            self.queue
                .write_buffer(ubuf, 0, bytemuck::cast_slice(&[blit]));
        }
    }

    /// Slide the previous buffer by dx, then stamp the volume marker.
    fn encode_propagation(&self, encoder: &mut wgpu::CommandEncoder) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Propagation Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.pingpong.dest().view,
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

        pass.set_pipeline(&self.pipelines.slide);
        pass.set_bind_group(0, &self.slide_bind_groups[self.pingpong.source_index()], &[]);
        pass.draw(0..3, 0..1);

        pass.set_pipeline(&self.pipelines.stamp);
        pass.set_bind_group(0, &self.stamp_bind_group, &[]);
        pass.draw(0..6, 0..1);
    }

    /// Displacement map from the propagation buffer, then normals from it.
    fn encode_map_passes(&self, encoder: &mut wgpu::CommandEncoder) {
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Displacement Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.displacement.view,
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
            pass.set_pipeline(&self.pipelines.displacement);
            pass.set_bind_group(0, &self.disp_bind_groups[self.pingpong.dest_index()], &[]);
            pass.draw(0..3, 0..1);
        }
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Normal Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.normal_map.view,
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
            pass.set_pipeline(&self.pipelines.normal);
            pass.set_bind_group(0, &self.normal_bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
    }

    fn encode_main_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        scene: &FrameScene,
        particles: &ParticleSystem,
    ) {
        let p = scene.params;
        let bg = p.background.color;
        let clear = wgpu::Color {
            r: bg[0] as f64,
            g: bg[1] as f64,
            b: bg[2] as f64,
            a: 1.0,
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Main Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if !p.background.solid {
            if let Some(ref background) = self.background_bind_group {
                pass.set_pipeline(&self.pipelines.background);
                pass.set_bind_group(0, background, &[]);
                pass.draw(0..3, 0..1);
            }
        }

        particles.draw(&mut pass, &self.pipelines.particle_draw);

        if p.toggles.draw_textures {
            pass.set_pipeline(&self.pipelines.blit);
            pass.set_bind_group(
                0,
                &self.blit_pingpong_groups[self.pingpong.dest_index()],
                &[],
            );
            pass.draw(0..6, 0..1);
            pass.set_bind_group(0, &self.blit_disp_group, &[]);
            pass.draw(0..6, 0..1);
            pass.set_bind_group(0, &self.blit_normal_group, &[]);
            pass.draw(0..6, 0..1);
        }

        let mesh_pipeline = if p.toggles.draw_wireframe {
            self.pipelines
                .mesh_wireframe
                .as_ref()
                .unwrap_or(&self.pipelines.mesh)
        } else {
            &self.pipelines.mesh
        };

        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

        if p.toggles.draw_original_mesh {
            pass.set_pipeline(mesh_pipeline);
            pass.set_bind_group(
                0,
                &self.overlay_bind_groups[self.pingpong.dest_index()],
                &[],
            );
            pass.draw_indexed(0..self.index_count, 0, 0..1);
        }

        pass.set_pipeline(mesh_pipeline);
        pass.set_bind_group(0, &self.mesh_bind_groups[self.pingpong.dest_index()], &[]);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

fn rgb1(c: [f32; 3]) -> [f32; 4] {
    [c[0], c[1], c[2], 1.0]
}

fn clear_targets(device: &wgpu::Device, queue: &wgpu::Queue, views: &[&wgpu::TextureView]) {
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Target Clear Encoder"),
    });
    for view in views {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Target Clear Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
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
    }
    queue.submit(std::iter::once(encoder.finish()));
}

/// Load the optional background texture. A missing or undecodable image is
/// logged and leaves the background unset.
fn load_background(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layouts: &Layouts,
    ubuf: &wgpu::Buffer,
    assets_dir: &Path,
) -> Option<wgpu::BindGroup> {
    let path = assets_dir.join("background.png");
    let img = match image::open(&path) {
        Ok(img) => img.to_rgba8(),
        Err(e) => {
            warn!("could not load background image {}: {}", path.display(), e);
            return None;
        }
    };
    let (width, height) = img.dimensions();

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Background Texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &img,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("Background Sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    });

    Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Background Bind Group"),
        layout: &layouts.background,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: ubuf.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(&sampler),
            },
        ],
    }))
}
