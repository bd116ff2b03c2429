//! Application entry point: window, event handling, and the frame loop.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use glam::Vec4;
use log::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Fullscreen, Window, WindowId},
};

use smokewave::audio::{load_clip, AudioError, AudioSystem};
use smokewave::camera::OrbitCamera;
use smokewave::cli::Args;
use smokewave::mesh::LatticeMesh;
use smokewave::params::{ease_amplitude, AppParams, FftConfig, RenderConfig};
use smokewave::particles::{
    ParticleDrawUniforms, ParticleSystem, ParticleUpdateUniforms, PARTICLE_COUNT,
};
use smokewave::rendering::{FrameScene, RenderSystem};
use smokewave::ui::UiLayer;

struct App {
    args: Args,

    window: Option<Arc<Window>>,
    render: Option<RenderSystem>,
    ui: Option<UiLayer>,
    particles: Option<ParticleSystem>,
    audio: Option<AudioSystem>,

    mesh: LatticeMesh,
    camera: OrbitCamera,
    params: AppParams,
    render_config: RenderConfig,

    start_time: Instant,
    last_frame: Instant,
    volume_smoothed: f32,
    amplitude: f32,
    amplitude_target: f32,
    mesh_length_lines: bool,

    dragging: bool,
    cursor: Option<(f64, f64)>,

    /// Startup failure carried out of the event loop; `main` returns it so
    /// the process exits nonzero with context.
    fatal: Option<anyhow::Error>,
}

impl App {
    fn new(args: Args) -> Self {
        let params = AppParams::default();
        let render_config = RenderConfig {
            window_width: args.width,
            window_height: args.height,
            fullscreen: args.fullscreen,
            ..Default::default()
        };
        let mesh_length_lines = params.lines.length_lines;

        Self {
            args,
            window: None,
            render: None,
            ui: None,
            particles: None,
            audio: None,
            mesh: LatticeMesh::new(mesh_length_lines),
            camera: OrbitCamera::new(),
            params,
            render_config,
            start_time: Instant::now(),
            last_frame: Instant::now(),
            volume_smoothed: 0.0,
            amplitude: 0.0,
            amplitude_target: 10.0,
            mesh_length_lines,
            dragging: false,
            cursor: None,
            fatal: None,
        }
    }

    fn abort(
        &mut self,
        event_loop: &winit::event_loop::ActiveEventLoop,
        err: anyhow::Error,
    ) {
        error!("{:#}", err);
        self.fatal = Some(err);
        event_loop.exit();
    }

    fn take_fatal(&mut self) -> Option<anyhow::Error> {
        self.fatal.take()
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &winit::event_loop::ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &winit::event_loop::ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let mut attributes = Window::default_attributes()
            .with_title("Smokewave")
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.render_config.window_width,
                self.render_config.window_height,
            ));
        if self.render_config.fullscreen {
            attributes = attributes.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.abort(
                    event_loop,
                    anyhow::Error::new(e).context("failed to create window"),
                );
                return;
            }
        };

        let render = match pollster::block_on(RenderSystem::new(
            Arc::clone(&window),
            &self.mesh,
            &self.render_config,
            &self.args.assets,
        )) {
            Ok(render) => render,
            Err(e) => {
                self.abort(
                    event_loop,
                    anyhow::Error::new(e).context("failed to initialize rendering"),
                );
                return;
            }
        };

        let ui = UiLayer::new(&window, &render.device, render.surface_format());
        let particles = ParticleSystem::new(&render.device, &render.layouts);

        let audio = load_clip(&self.args.audio)
            .map_err(AudioError::from)
            .and_then(|clip| AudioSystem::new(clip, FftConfig::default(), self.params.audio));
        let audio = match audio {
            Ok(audio) => audio,
            Err(e) => {
                self.abort(
                    event_loop,
                    anyhow::Error::new(e).context("failed to start audio"),
                );
                return;
            }
        };

        info!("running; press Esc to quit, ` for the panel");

        self.window = Some(window);
        self.render = Some(render);
        self.ui = Some(ui);
        self.particles = Some(particles);
        self.audio = Some(audio);
        self.last_frame = Instant::now();
    }

    fn window_event(
        &mut self,
        event_loop: &winit::event_loop::ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let consumed = match (&mut self.ui, &self.window) {
            (Some(ui), Some(window)) => ui.on_event(window, &event),
            _ => false,
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(render) = &mut self.render {
                    render.resize(size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(code),
                        repeat: false,
                        ..
                    },
                ..
            } if !consumed => self.handle_key(code, event_loop),
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.dragging = state == ElementState::Pressed && !consumed;
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some((px, py)) = self.cursor {
                    if self.dragging && !consumed {
                        self.camera
                            .orbit((position.x - px) as f32, (position.y - py) as f32);
                    }
                }
                self.cursor = Some((position.x, position.y));
            }
            WindowEvent::MouseWheel { delta, .. } if !consumed => {
                let delta = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 50.0,
                };
                self.camera.zoom(delta);
            }
            WindowEvent::RedrawRequested => self.render_frame(event_loop),
            _ => {}
        }
    }
}

impl App {
    fn handle_key(&mut self, code: KeyCode, event_loop: &winit::event_loop::ActiveEventLoop) {
        match code {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::KeyF => {
                if let Some(window) = &self.window {
                    let fullscreen = window
                        .fullscreen()
                        .is_none()
                        .then_some(Fullscreen::Borderless(None));
                    window.set_fullscreen(fullscreen);
                }
            }
            KeyCode::Backquote => self.params.toggles.show_panel = !self.params.toggles.show_panel,
            KeyCode::KeyM => {
                self.params.toggles.draw_original_mesh = !self.params.toggles.draw_original_mesh;
            }
            KeyCode::KeyS => {
                if let Some(render) = &mut self.render {
                    match render.reload_shaders() {
                        Ok(()) => info!("shaders reloaded"),
                        Err(e) => warn!("shader reload failed, keeping current: {}", e),
                    }
                }
            }
            KeyCode::KeyT => self.params.toggles.draw_textures = !self.params.toggles.draw_textures,
            KeyCode::KeyV => {
                if let Some(render) = &mut self.render {
                    render.toggle_vsync();
                }
            }
            KeyCode::KeyW => {
                self.params.toggles.draw_wireframe = !self.params.toggles.draw_wireframe;
            }
            KeyCode::Space => self.camera.reset(),
            KeyCode::KeyA => {
                // Toggle the base wave between on and becalmed; the eased
                // amplitude glides toward whichever target is active.
                self.amplitude_target = if self.amplitude_target > 0.0 { 0.0 } else { 10.0 };
            }
            KeyCode::KeyQ => {
                self.params.toggles.enable_falloff = !self.params.toggles.enable_falloff;
            }
            _ => {}
        }
    }

    fn render_frame(&mut self, event_loop: &winit::event_loop::ActiveEventLoop) {
        let (Some(window), Some(render), Some(ui), Some(particles), Some(audio)) = (
            &self.window,
            &mut self.render,
            &mut self.ui,
            &self.particles,
            &self.audio,
        ) else {
            return;
        };

        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32().min(0.1);
        self.last_frame = now;
        let time = self.start_time.elapsed().as_secs_f32();

        audio.apply_params(&self.params.audio);
        let volume = audio.volume();
        let bands = audio.bands();

        self.volume_smoothed = self
            .params
            .movement
            .smooth_volume(self.volume_smoothed, volume);
        self.amplitude = ease_amplitude(self.amplitude, self.amplitude_target);

        if self.params.lines.length_lines != self.mesh_length_lines {
            self.mesh_length_lines = self.params.lines.length_lines;
            self.mesh.set_line_orientation(self.mesh_length_lines);
            render.update_mesh_vertices(&self.mesh.vertices);
        }

        let (width, height) = render.surface_size();
        let aspect = width as f32 / height.max(1) as f32;
        let view_proj = self.camera.view_proj(&self.render_config, aspect);
        let (right, up) = self.camera.billboard_axes();

        let p = &self.params.particles;
        particles.write_uniforms(
            &render.queue,
            &ParticleUpdateUniforms {
                time,
                dt,
                volume: self.volume_smoothed + bands.low * 0.2,
                dir_mag: p.dir_mag,
                pos_mag: p.pos_mag,
                time_mag: p.time_mag,
                freq_mag: p.freq_mag,
                count: PARTICLE_COUNT,
            },
            &ParticleDrawUniforms {
                view_proj: view_proj.to_cols_array_2d(),
                right: Vec4::from((right, 0.0)).to_array(),
                up: Vec4::from((up, 0.0)).to_array(),
                color1: p.color1,
                color2: p.color2,
                misc: [self.volume_smoothed, time, 1.5 + bands.high * 0.5, 0.0],
            },
        );

        let full_output = ui.run(window, &mut self.params);

        let scene = FrameScene {
            time,
            volume,
            amplitude: self.amplitude,
            view_proj,
            params: &self.params,
        };

        match render.render(&scene, particles, Some((ui, window.as_ref(), full_output))) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = window.inner_size();
                render.resize(size.width, size.height);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                error!("out of GPU memory");
                event_loop.exit();
            }
            Err(e) => warn!("dropped frame: {:?}", e),
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut app = App::new(args);
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.run_app(&mut app)?;

    match app.take_fatal() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_failure_is_carried_out_of_the_loop() {
        let mut app = App::new(Args::parse_from(["smokewave"]));
        assert!(app.take_fatal().is_none());

        app.fatal = Some(anyhow::anyhow!("no audio output device found"));
        let err = app.take_fatal().expect("startup error surfaces to main");
        assert!(err.to_string().contains("no audio output device"));
        assert!(app.take_fatal().is_none());
    }
}
