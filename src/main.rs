use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{error, info};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Window, WindowId},
};

use glam::Vec2;

mod config;
mod error;
mod mesh;
mod renderer;
mod scene;
mod ui;

use config::{Args, ViewerConfig, usage};
use mesh::Mesh;
use renderer::{Camera, GpuState, pick_point};
use scene::Scene;
use ui::{
    PickedPoint, SceneSummary, UiActions, UiState, apply_theme, draw_help_overlay,
    draw_pick_marker, draw_point_labels, draw_side_panel,
};

const MIN_PICK_RADIUS: f32 = 8.0;

struct InputState {
    forward: f32,
    right: f32,
    up: f32,
    mouse_captured: bool,
    mouse_delta: Vec2,
    cursor: Option<Vec2>,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            forward: 0.0,
            right: 0.0,
            up: 0.0,
            mouse_captured: false,
            mouse_delta: Vec2::ZERO,
            cursor: None,
        }
    }
}

impl InputState {
    fn is_moving(&self) -> bool {
        self.forward != 0.0 || self.right != 0.0 || self.up != 0.0
    }
}

struct App {
    config: ViewerConfig,
    mesh: Mesh,
    scene: Scene,
    summary: SceneSummary,

    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    egui_state: Option<egui_winit::State>,
    egui_renderer: Option<egui_wgpu::Renderer>,
    egui_ctx: egui::Context,

    camera: Camera,
    ui_state: UiState,
    input: InputState,

    last_frame: Instant,
    last_vsync_state: bool,

    /// Set when the window or GPU cannot be brought up; `main` reports it.
    fatal: Option<anyhow::Error>,
}

impl App {
    fn new(config: ViewerConfig, mesh: Mesh, scene: Scene) -> Self {
        let file_name = config
            .file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| config.file.display().to_string());
        let summary = SceneSummary::new(file_name, mesh.cell_count(), &scene);

        let mut camera = Camera::default();
        camera.frame(&scene.bounds);

        let ui_state = UiState::new(&config);
        let last_vsync_state = ui_state.vsync_enabled;

        Self {
            config,
            mesh,
            scene,
            summary,

            window: None,
            gpu: None,
            egui_state: None,
            egui_renderer: None,
            egui_ctx: egui::Context::default(),

            camera,
            ui_state,
            input: InputState::default(),

            last_frame: Instant::now(),
            last_vsync_state,

            fatal: None,
        }
    }

    fn init_gpu(&mut self, window: Arc<Window>) -> Result<()> {
        let gpu = pollster::block_on(GpuState::new(window.clone(), &self.scene, self.config.vsync))?;

        let egui_state = egui_winit::State::new(
            self.egui_ctx.clone(),
            self.egui_ctx.viewport_id(),
            &window,
            Some(window.scale_factor() as f32),
            None,
            Some(2048),
        );

        let egui_renderer =
            egui_wgpu::Renderer::new(&gpu.device, gpu.config.format, None, 1, false);

        apply_theme(&self.egui_ctx);

        let size = window.inner_size();
        self.camera.set_aspect(size.width as f32, size.height as f32);
        gpu.update_style(&self.ui_state.style);

        self.window = Some(window);
        self.gpu = Some(gpu);
        self.egui_state = Some(egui_state);
        self.egui_renderer = Some(egui_renderer);

        Ok(())
    }

    fn update(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        self.camera.set_mode(self.ui_state.camera_mode);
        self.camera
            .process_keyboard(self.input.forward, self.input.right, self.input.up, dt);

        if self.input.mouse_captured {
            self.camera.process_mouse_movement(self.input.mouse_delta);
        }
        self.input.mouse_delta = Vec2::ZERO;
    }

    fn render(&mut self) -> Result<()> {
        let (Some(window), Some(egui_state), Some(gpu)) = (&self.window, &mut self.egui_state, &self.gpu) else {
            return Ok(());
        };

        let raw_input = egui_state.take_egui_input(window);
        let viewport = gpu.viewport();

        let mut ui_actions = UiActions::default();

        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            ui_actions = draw_side_panel(ctx, &mut self.ui_state, &self.summary);
            draw_help_overlay(ctx, &self.camera, self.ui_state.picked);

            let markers = &self.ui_state.style.markers;
            if markers.labels {
                draw_point_labels(
                    ctx,
                    &self.camera,
                    viewport,
                    self.mesh.points(),
                    &self.scene.labels,
                    markers.size,
                );
            }
            if let Some(picked) = self.ui_state.picked {
                draw_pick_marker(ctx, &self.camera, viewport, picked, markers.size);
            }
        });

        self.handle_ui_actions(ui_actions);

        let Some(gpu) = &mut self.gpu else {
            return Ok(());
        };
        let Some(window) = &self.window else {
            return Ok(());
        };
        let Some(egui_state) = &mut self.egui_state else {
            return Ok(());
        };
        let Some(egui_renderer) = &mut self.egui_renderer else {
            return Ok(());
        };

        egui_state.handle_platform_output(window, full_output.platform_output);

        if self.ui_state.vsync_enabled != self.last_vsync_state {
            gpu.set_vsync(self.ui_state.vsync_enabled);
            self.last_vsync_state = self.ui_state.vsync_enabled;
        }

        let output = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.resize(gpu.size);
                window.request_redraw();
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                return Err(anyhow!("out of GPU memory"));
            }
            Err(wgpu::SurfaceError::Timeout) => {
                window.request_redraw();
                return Ok(());
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        gpu.update_camera(&self.camera);
        gpu.update_style(&self.ui_state.style);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [gpu.config.width, gpu.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, delta) in full_output.textures_delta.set {
            egui_renderer.update_texture(&gpu.device, &gpu.queue, id, &delta);
        }

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Main Encoder"),
            });

        egui_renderer.update_buffers(
            &gpu.device,
            &gpu.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        gpu.render_scene(&view, &mut encoder, &self.ui_state.style);

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let mut render_pass = render_pass.forget_lifetime();
            egui_renderer.render(&mut render_pass, &paint_jobs, &screen_descriptor);
        }

        for id in full_output.textures_delta.free {
            egui_renderer.free_texture(&id);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        let egui_wants_repaint = full_output
            .viewport_output
            .get(&egui::ViewportId::ROOT)
            .is_some_and(|v| v.repaint_delay.is_zero());
        if egui_wants_repaint || self.input.is_moving() {
            window.request_redraw();
        }

        Ok(())
    }

    fn handle_ui_actions(&mut self, actions: UiActions) {
        if actions.reframe {
            self.reframe();
        }
    }

    fn reframe(&mut self) {
        self.camera.frame(&self.scene.bounds);
        self.ui_state.camera_mode = self.camera.mode;
    }

    fn pick(&mut self) {
        let (Some(gpu), Some(cursor)) = (&self.gpu, self.input.cursor) else {
            return;
        };

        let radius = (self.ui_state.style.markers.size * 0.5 + 4.0).max(MIN_PICK_RADIUS);
        let picked = pick_point(&self.camera, gpu.viewport(), self.mesh.points(), cursor, radius);

        self.ui_state.picked = picked.map(|index| {
            let position = self.mesh.points()[index];
            info!(
                "picked point {index} at ({}, {}, {})",
                position[0], position[1], position[2]
            );
            PickedPoint { index, position }
        });
    }

    fn set_mouse_capture(&mut self, captured: bool) {
        self.input.mouse_captured = captured;

        if let Some(window) = &self.window {
            if captured {
                let _ = window
                    .set_cursor_grab(CursorGrabMode::Confined)
                    .or_else(|_| window.set_cursor_grab(CursorGrabMode::Locked));
                window.set_cursor_visible(false);
            } else {
                let _ = window.set_cursor_grab(CursorGrabMode::None);
                window.set_cursor_visible(true);
            }
        }
    }

    fn handle_key(&mut self, key: KeyCode, pressed: bool) {
        let value = if pressed { 1.0 } else { 0.0 };

        // The clock is stale after the window idles under `ControlFlow::Wait`.
        if pressed && !self.input.is_moving() {
            self.last_frame = Instant::now();
        }

        match key {
            KeyCode::KeyW | KeyCode::KeyZ => self.input.forward = value,
            KeyCode::KeyS => self.input.forward = -value,
            KeyCode::KeyA | KeyCode::KeyQ => self.input.right = -value,
            KeyCode::KeyD => self.input.right = value,
            KeyCode::Space => self.input.up = value,
            KeyCode::ShiftLeft | KeyCode::ControlLeft => self.input.up = -value,
            KeyCode::Escape if pressed => self.set_mouse_capture(false),
            KeyCode::KeyC if pressed => {
                self.ui_state.camera_mode = self.ui_state.camera_mode.toggled();
            }
            KeyCode::KeyR if pressed => self.reframe(),
            KeyCode::KeyL if pressed => {
                let labels = &mut self.ui_state.style.markers.labels;
                *labels = !*labels;
            }
            KeyCode::Tab if pressed => self.ui_state.show_panel = !self.ui_state.show_panel,
            _ => {}
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title(format!("plyview: {}", self.summary.file_name))
            .with_inner_size(PhysicalSize::new(1600, 900));

        let result = event_loop
            .create_window(window_attrs)
            .context("failed to create window")
            .and_then(|window| self.init_gpu(Arc::new(window)).context("failed to initialise GPU"));

        if let Err(e) = result {
            error!("{e:#}");
            self.fatal = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Some(egui_state) = &mut self.egui_state {
            if let Some(window) = &self.window {
                let response = egui_state.on_window_event(window, &event);
                if response.repaint {
                    window.request_redraw();
                }
                if response.consumed {
                    return;
                }
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.resize(size);
                    self.camera
                        .set_aspect(size.width as f32, size.height as f32);
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    self.handle_key(key, event.state == ElementState::Pressed);
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                self.input.cursor = Some(Vec2::new(position.x as f32, position.y as f32));
            }

            WindowEvent::CursorLeft { .. } => {
                self.input.cursor = None;
            }

            WindowEvent::MouseInput {
                button: MouseButton::Right,
                state,
                ..
            } => {
                self.set_mouse_capture(state == ElementState::Pressed);
            }

            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state: ElementState::Pressed,
                ..
            } => {
                self.pick();
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    winit::event::MouseScrollDelta::LineDelta(_, y) => y,
                    winit::event::MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 50.0,
                };
                self.camera.process_scroll(scroll);
            }

            WindowEvent::RedrawRequested => {
                self.update();
                if let Err(e) = self.render() {
                    error!("{e:#}");
                    self.fatal = Some(e);
                    event_loop.exit();
                }
                return;
            }

            _ => {}
        }

        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn device_event(&mut self, _: &ActiveEventLoop, _: winit::event::DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            if self.input.mouse_captured {
                self.input.mouse_delta.x += delta.0 as f32;
                self.input.mouse_delta.y += delta.1 as f32;
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
        }
    }
}

fn init_logging() {
    let mut builder = pretty_env_logger::formatted_timed_builder();
    builder
        .filter_level(log::LevelFilter::Warn)
        .filter_module("plyview", log::LevelFilter::Info);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn program_name() -> String {
    std::env::args_os()
        .next()
        .as_deref()
        .and_then(|arg0| Path::new(arg0).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "plyview".to_string())
}

fn main() -> Result<()> {
    init_logging();

    let Some(config) = ViewerConfig::from_args(Args::parse()) else {
        println!("{}", usage(&program_name()));
        std::process::exit(1);
    };

    let mesh = Mesh::load(&config.file)
        .with_context(|| format!("failed to load mesh from {}", config.file.display()))?;
    let highlight = config.highlight.resolve(mesh.cell_count());
    let scene = Scene::build(&mesh, &highlight)?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config, mesh, scene);
    event_loop.run_app(&mut app)?;

    match app.fatal.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
