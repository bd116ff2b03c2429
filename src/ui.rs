//! Debug parameter panel rendered with egui on top of the frame.

use egui_wgpu::ScreenDescriptor;
use winit::event::WindowEvent;
use winit::window::Window;

use crate::params::AppParams;

pub struct UiLayer {
    ctx: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
}

impl UiLayer {
    pub fn new(window: &Window, device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let ctx = egui::Context::default();
        let state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let renderer = egui_wgpu::Renderer::new(device, surface_format, None, 1, false);
        Self {
            ctx,
            state,
            renderer,
        }
    }

    /// Feed a window event to egui. Returns true when egui consumed it and
    /// the app should not act on it.
    pub fn on_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// Run the panel UI for this frame and collect its output.
    pub fn run(&mut self, window: &Window, params: &mut AppParams) -> egui::FullOutput {
        let input = self.state.take_egui_input(window);
        let show_panel = params.toggles.show_panel;
        self.ctx.run(input, |ctx| {
            if show_panel {
                parameter_panel(ctx, params);
            }
        })
    }

    /// Paint the UI into an open encoder, on top of the rendered frame.
    #[allow(clippy::too_many_arguments)]
    pub fn paint(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        window: &Window,
        view: &wgpu::TextureView,
        size: (u32, u32),
        full_output: egui::FullOutput,
    ) {
        self.state
            .handle_platform_output(window, full_output.platform_output);

        let paint_jobs = self
            .ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen = ScreenDescriptor {
            size_in_pixels: [size.0, size.1],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, delta) in &full_output.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, delta);
        }
        self.renderer
            .update_buffers(device, queue, encoder, &paint_jobs, &screen);

        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Panel Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                })
                .forget_lifetime();
            self.renderer.render(&mut pass, &paint_jobs, &screen);
        }

        for id in &full_output.textures_delta.free {
            self.renderer.free_texture(id);
        }
    }
}

fn parameter_panel(ctx: &egui::Context, params: &mut AppParams) {
    egui::Window::new("Parameters")
        .default_width(280.0)
        .show(ctx, |ui| {
            ui.collapsing("Display", |ui| {
                ui.checkbox(&mut params.toggles.draw_textures, "Draw maps");
                ui.checkbox(&mut params.toggles.draw_wireframe, "Wireframe");
                ui.checkbox(&mut params.toggles.draw_original_mesh, "Flat mesh overlay");
                ui.checkbox(&mut params.toggles.enable_falloff, "Edge falloff");
            });

            ui.collapsing("Movement", |ui| {
                ui.add(
                    egui::Slider::new(&mut params.movement.dx, 0.0..=0.02)
                        .text("Slide step"),
                );
                ui.add(
                    egui::Slider::new(&mut params.movement.audio_amplitude, 0.0..=20.0)
                        .text("Audio amplitude"),
                );
                ui.checkbox(&mut params.movement.straight_marker, "Straight marker");
                ui.add(
                    egui::Slider::new(&mut params.movement.volume_smoothing, 0.0..=1.0)
                        .text("Volume smoothing"),
                );
            });

            ui.collapsing("Lines", |ui| {
                ui.checkbox(&mut params.lines.enable_lines, "Enable lines");
                ui.checkbox(&mut params.lines.length_lines, "Length-wise");
                ui.add(
                    egui::Slider::new(&mut params.lines.line_width, 0.0..=1.0).text("Width"),
                );
                ui.add(
                    egui::Slider::new(&mut params.lines.gap_alpha, 0.0..=1.0).text("Gap alpha"),
                );
                ui.horizontal(|ui| {
                    ui.color_edit_button_rgb(&mut params.lines.color1);
                    ui.label("Color 1");
                });
                ui.horizontal(|ui| {
                    ui.color_edit_button_rgb(&mut params.lines.color2);
                    ui.label("Color 2");
                });
                ui.horizontal(|ui| {
                    ui.color_edit_button_rgb(&mut params.lines.falloff_color);
                    ui.label("Falloff");
                });
                ui.horizontal(|ui| {
                    ui.color_edit_button_rgb(&mut params.lines.volume_color);
                    ui.label("Volume tint");
                });
            });

            ui.collapsing("Background", |ui| {
                ui.checkbox(&mut params.background.solid, "Solid color");
                ui.horizontal(|ui| {
                    ui.color_edit_button_rgb(&mut params.background.color);
                    ui.label("Color");
                });
                ui.add(
                    egui::Slider::new(&mut params.background.hue, 0.0..=std::f32::consts::TAU)
                        .text("Hue shift"),
                );
                ui.add(
                    egui::Slider::new(&mut params.background.brightness, 0.0..=1.0)
                        .text("Brightness"),
                );
            });

            ui.collapsing("Particles", |ui| {
                ui.horizontal(|ui| {
                    ui.color_edit_button_rgba_premultiplied(&mut params.particles.color1);
                    ui.label("Birth color");
                });
                ui.horizontal(|ui| {
                    ui.color_edit_button_rgba_premultiplied(&mut params.particles.color2);
                    ui.label("Death color");
                });
                ui.add(
                    egui::Slider::new(&mut params.particles.dir_mag, 0.0..=1.0)
                        .text("Swirl strength"),
                );
                ui.add(
                    egui::Slider::new(&mut params.particles.pos_mag, 0.0..=4.0)
                        .text("Swirl scale"),
                );
                ui.add(
                    egui::Slider::new(&mut params.particles.time_mag, 0.0..=1.0)
                        .text("Swirl speed"),
                );
                ui.add(
                    egui::Slider::new(&mut params.particles.freq_mag, 0.0..=1.0)
                        .text("Swirl frequency"),
                );
            });

            ui.collapsing("Audio", |ui| {
                ui.add(egui::Slider::new(&mut params.audio.gain, 0.0..=2.0).text("Gain"));
                ui.add(
                    egui::Slider::new(&mut params.audio.delay_s, 0.0..=0.5).text("Delay (s)"),
                );
                ui.add(
                    egui::Slider::new(&mut params.audio.filter_center_hz, 20.0..=20000.0)
                        .logarithmic(true)
                        .text("Filter center"),
                );
                ui.add(
                    egui::Slider::new(&mut params.audio.filter_q, 0.1..=200.0)
                        .logarithmic(true)
                        .text("Filter Q"),
                );
            });
        });
}
