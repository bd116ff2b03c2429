//! Shader loading and pipeline construction.
//!
//! Shaders are read from the asset directory at runtime so they can be
//! reloaded live (S key). Compile errors are caught through a validation
//! error scope; a failed reload leaves the previous pipelines running.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::mesh::Vertex;

/// Errors raised during GPU setup and shader (re)loading.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to create rendering surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("failed to request GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("failed to read shader {path}: {source}")]
    ShaderIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("shader {name} failed to compile: {message}")]
    ShaderCompile { name: String, message: String },
}

/// Bind group layouts, created once and reused across shader reloads.
pub struct Layouts {
    /// Uniform buffer + one unfilterable float texture (propagation,
    /// displacement, normal, blit passes).
    pub pass: wgpu::BindGroupLayout,

    /// Uniform buffer only (marker stamp).
    pub uniform_only: wgpu::BindGroupLayout,

    /// Mesh pass: uniforms + displacement/normal/audio textures.
    pub mesh: wgpu::BindGroupLayout,

    /// Background pass: uniforms + filterable texture + sampler.
    pub background: wgpu::BindGroupLayout,

    /// Particle compute: read-write storage + uniforms.
    pub particle_update: wgpu::BindGroupLayout,

    /// Particle draw: read-only storage + uniforms.
    pub particle_draw: wgpu::BindGroupLayout,
}

impl Layouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let float_texture = |binding: u32, visibility: wgpu::ShaderStages| {
            wgpu::BindGroupLayoutEntry {
                binding,
                visibility,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            }
        };

        let pass = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Pass Layout"),
            entries: &[
                uniform_entry(0),
                float_texture(1, wgpu::ShaderStages::FRAGMENT),
            ],
        });

        let uniform_only = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Uniform-Only Layout"),
            entries: &[uniform_entry(0)],
        });

        let mesh = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Mesh Layout"),
            entries: &[
                uniform_entry(0),
                float_texture(1, wgpu::ShaderStages::VERTEX),
                float_texture(2, wgpu::ShaderStages::VERTEX),
                float_texture(3, wgpu::ShaderStages::VERTEX),
            ],
        });

        let background = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Background Layout"),
            entries: &[
                uniform_entry(0),
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
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let storage_entry = |read_only: bool| wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: if read_only {
                wgpu::ShaderStages::VERTEX
            } else {
                wgpu::ShaderStages::COMPUTE
            },
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let particle_update = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Particle Update Layout"),
            entries: &[
                storage_entry(false),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let particle_draw = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Particle Draw Layout"),
            entries: &[storage_entry(true), uniform_entry(1)],
        });

        Self {
            pass,
            uniform_only,
            mesh,
            background,
            particle_update,
            particle_draw,
        }
    }
}

/// All pipelines, rebuilt together on shader reload.
pub struct Pipelines {
    pub slide: wgpu::RenderPipeline,
    pub stamp: wgpu::RenderPipeline,
    pub displacement: wgpu::RenderPipeline,
    pub normal: wgpu::RenderPipeline,
    pub mesh: wgpu::RenderPipeline,
    pub mesh_wireframe: Option<wgpu::RenderPipeline>,
    pub background: wgpu::RenderPipeline,
    pub blit: wgpu::RenderPipeline,
    pub particle_update: wgpu::ComputePipeline,
    pub particle_draw: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn build(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        shader_dir: &Path,
        layouts: &Layouts,
        wireframe_supported: bool,
    ) -> Result<Self, RenderError> {
        let slide_shader = load_shader(device, shader_dir, "slide.wgsl")?;
        let stamp_shader = load_shader(device, shader_dir, "stamp.wgsl")?;
        let disp_shader = load_shader(device, shader_dir, "displacement_map.wgsl")?;
        let normal_shader = load_shader(device, shader_dir, "normal_map.wgsl")?;
        let mesh_shader = load_shader(device, shader_dir, "mesh.wgsl")?;
        let background_shader = load_shader(device, shader_dir, "background.wgsl")?;
        let blit_shader = load_shader(device, shader_dir, "blit.wgsl")?;
        let particle_update_shader = load_shader(device, shader_dir, "particles_update.wgsl")?;
        let particle_draw_shader = load_shader(device, shader_dir, "particles_draw.wgsl")?;

        let pass_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Pass Pipeline Layout"),
            bind_group_layouts: &[&layouts.pass],
            push_constant_ranges: &[],
        });
        let stamp_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Stamp Pipeline Layout"),
            bind_group_layouts: &[&layouts.uniform_only],
            push_constant_ranges: &[],
        });
        let mesh_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[&layouts.mesh],
            push_constant_ranges: &[],
        });
        let background_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Background Pipeline Layout"),
            bind_group_layouts: &[&layouts.background],
            push_constant_ranges: &[],
        });
        let particle_update_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Particle Update Pipeline Layout"),
                bind_group_layouts: &[&layouts.particle_update],
                push_constant_ranges: &[],
            });
        let particle_draw_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Particle Draw Pipeline Layout"),
            bind_group_layouts: &[&layouts.particle_draw],
            push_constant_ranges: &[],
        });

        let slide = fullscreen_pipeline(
            device,
            "Slide Pipeline",
            &pass_layout,
            &slide_shader,
            wgpu::TextureFormat::R32Float,
            None,
        );
        let stamp = fullscreen_pipeline(
            device,
            "Stamp Pipeline",
            &stamp_layout,
            &stamp_shader,
            wgpu::TextureFormat::R32Float,
            None,
        );
        let displacement = fullscreen_pipeline(
            device,
            "Displacement Pipeline",
            &pass_layout,
            &disp_shader,
            wgpu::TextureFormat::R32Float,
            None,
        );
        let normal = fullscreen_pipeline(
            device,
            "Normal Pipeline",
            &pass_layout,
            &normal_shader,
            wgpu::TextureFormat::Rgba32Float,
            None,
        );
        let background = fullscreen_pipeline(
            device,
            "Background Pipeline",
            &background_layout,
            &background_shader,
            surface_format,
            None,
        );
        let blit = fullscreen_pipeline(
            device,
            "Blit Pipeline",
            &pass_layout,
            &blit_shader,
            surface_format,
            None,
        );

        let mesh = mesh_pipeline(
            device,
            "Mesh Pipeline",
            &mesh_layout,
            &mesh_shader,
            surface_format,
            wgpu::PolygonMode::Fill,
        );
        let mesh_wireframe = wireframe_supported.then(|| {
            mesh_pipeline(
                device,
                "Mesh Wireframe Pipeline",
                &mesh_layout,
                &mesh_shader,
                surface_format,
                wgpu::PolygonMode::Line,
            )
        });

        let particle_update = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Particle Update Pipeline"),
            layout: Some(&particle_update_layout),
            module: &particle_update_shader,
            entry_point: Some("cs_main"),
            compilation_options: Default::default(),
            cache: None,
        });

        let particle_draw = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Particle Draw Pipeline"),
            layout: Some(&particle_draw_layout),
            vertex: wgpu::VertexState {
                module: &particle_draw_shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &particle_draw_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(additive_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Ok(Self {
            slide,
            stamp,
            displacement,
            normal,
            mesh,
            mesh_wireframe,
            background,
            blit,
            particle_update,
            particle_draw,
        })
    }
}

/// Additive blending for the mesh and particles (alpha-weighted add).
fn additive_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::One,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::One,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

/// Read and compile one WGSL shader, catching validation errors.
fn load_shader(
    device: &wgpu::Device,
    dir: &Path,
    name: &str,
) -> Result<wgpu::ShaderModule, RenderError> {
    let path = dir.join(name);
    let source = fs::read_to_string(&path).map_err(|e| RenderError::ShaderIo {
        path: path.clone(),
        source: e,
    })?;

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(name),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(RenderError::ShaderCompile {
            name: name.to_string(),
            message: err.to_string(),
        });
    }
    Ok(module)
}

/// Vertex-buffer-free pipeline drawing fullscreen triangles or uniform quads.
fn fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

/// Displaced-mesh pipeline (fill or wireframe).
fn mesh_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    polygon_mode: wgpu::PolygonMode,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[
                    wgpu::VertexAttribute {
                        offset: 0,
                        shader_location: 0,
                        format: wgpu::VertexFormat::Float32x3,
                    },
                    wgpu::VertexAttribute {
                        offset: 12,
                        shader_location: 1,
                        format: wgpu::VertexFormat::Float32x3,
                    },
                    wgpu::VertexAttribute {
                        offset: 24,
                        shader_location: 2,
                        format: wgpu::VertexFormat::Float32x3,
                    },
                    wgpu::VertexAttribute {
                        offset: 36,
                        shader_location: 3,
                        format: wgpu::VertexFormat::Float32x2,
                    },
                ],
            }],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(additive_blend()),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}
