use anyhow::{Context, Result};
use clap::Parser;
use egui::Context as EguiContext;
use glam::Vec2;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tilescape_camera::{Camera, CameraRig};
use tilescape_common::{CellCoord, Model, SavedPosition, TilePersistence, ViewerConfig};
use tilescape_input::{Action, MoveKeys, PointerButtons, pick_cell};
use tilescape_persist::TileDatabase;
use tilescape_render::FrameView;
use tilescape_render_wgpu::{WgpuInstanceDevice, WgpuRenderer};
use tilescape_stream::TileStore;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

/// Pixels of touchpad scroll per wheel notch.
const PIXELS_PER_NOTCH: f64 = 40.0;

#[derive(Parser)]
#[command(name = "tilescape-desktop", about = "Tilescape desktop viewer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML viewer config (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Tile database directory, overrides the config
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

/// Application state.
struct AppState {
    config: ViewerConfig,
    db: TileDatabase,
    rig: CameraRig,
    store: TileStore<wgpu::Buffer>,
    /// Ground point the camera follows.
    focus: Vec2,
    selected: Model,
    highlight: Option<CellCoord>,
    show_hud: bool,
    // Input state
    keys: MoveKeys,
    buttons: PointerButtons,
    cursor: Option<Vec2>,
    window_size: Vec2,
    last_frame: Instant,
    last_error: Option<String>,
}

impl AppState {
    fn new(config: ViewerConfig) -> Result<Self> {
        let db = TileDatabase::open(&config.data_dir)
            .with_context(|| format!("opening {}", config.data_dir.display()))?;
        let saved = db.saved_position();
        let tile_size = config.world.tile_size;

        let mut rig = CameraRig::new(&config.camera, &config.world);
        rig.warp(saved.x, saved.z);
        tracing::info!(x = saved.x, z = saved.z, model = %saved.model, "restored position");

        Ok(Self {
            window_size: Vec2::new(config.camera.viewport_width, config.camera.viewport_height),
            store: TileStore::new(tile_size),
            focus: Vec2::new(saved.x, saved.z),
            selected: saved.model,
            highlight: None,
            show_hud: true,
            keys: MoveKeys::default(),
            buttons: PointerButtons::default(),
            cursor: None,
            last_frame: Instant::now(),
            last_error: None,
            config,
            db,
            rig,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.window_size = Vec2::new(width.max(1) as f32, height.max(1) as f32);
        // Keep the configured render height, follow the window's aspect.
        let render_height = self.config.camera.viewport_height;
        let aspect = self.window_size.x / self.window_size.y;
        self.rig.set_viewport(render_height * aspect, render_height);
    }

    fn update(&mut self, dt: f32) {
        let movement = self.keys.action(self.config.move_speed, dt);
        self.apply(movement);
        self.rig.track(self.focus.x, self.focus.y);

        self.highlight = None;
        if let Some(cursor) = self.cursor {
            let ndc = Camera::screen_to_ndc(cursor, self.window_size);
            let ground = self.rig.main().project(ndc, 0.0);
            let cell = pick_cell(
                ground.x,
                ground.y,
                cursor.x < self.window_size.x / 2.0,
                self.config.world.tile_size,
                self.config.pick_bias,
            );
            if self.store.window().contains(cell) {
                self.highlight = Some(cell);
            }
            self.apply(Action::from_pointer(self.buttons, self.selected, cell));
        }

        let position = SavedPosition {
            model: self.selected,
            x: self.focus.x,
            z: self.focus.y,
        };
        if let Err(e) = self.db.set_saved_position(position) {
            tracing::warn!("failed to save position: {e}");
        }
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::Move { dx, dz } => {
                self.focus += Vec2::new(dx, dz);
            }
            Action::CycleModel(delta) => {
                self.selected = self.selected.cycle(delta);
                tracing::debug!(model = %self.selected, "selected model");
            }
            Action::Place { .. } | Action::Erase(_) => {
                let Some((model, cell)) = action.edit() else {
                    return;
                };
                if self.store.model_at(cell) == Some(model) {
                    return;
                }
                if let Err(e) = self.store.edit_model(model, cell, &mut self.db) {
                    tracing::warn!(x = cell.x, z = cell.z, "edit dropped: {e}");
                }
            }
            Action::Highlight(_) | Action::Noop => {}
        }
    }

    fn handle_key(&mut self, key: KeyCode, pressed: bool) {
        match key {
            KeyCode::KeyW => self.keys.forward = pressed,
            KeyCode::KeyS => self.keys.back = pressed,
            KeyCode::KeyA => self.keys.left = pressed,
            KeyCode::KeyD => self.keys.right = pressed,
            KeyCode::F1 if pressed => self.show_hud = !self.show_hud,
            KeyCode::F5 if pressed => self.commit(),
            _ => {}
        }
    }

    fn commit(&mut self) {
        match self.db.commit() {
            Ok(written) => tracing::info!(written, "tile edits committed"),
            Err(e) => tracing::error!("failed to commit tile edits: {e}"),
        }
    }

    fn draw_ui(&mut self, ctx: &EguiContext) {
        if !self.show_hud {
            return;
        }

        egui::Window::new("Tilescape")
            .default_pos([8.0, 8.0])
            .resizable(false)
            .show(ctx, |ui| {
                ui.label(format!("Focus: ({:.1}, {:.1})", self.focus.x, self.focus.y));
                let eye = self.rig.main().position();
                ui.label(format!("Camera: ({:.1}, {:.1}, {:.1})", eye.x, eye.y, eye.z));
                ui.horizontal(|ui| {
                    if ui.button("<").clicked() {
                        self.apply(Action::CycleModel(-1));
                    }
                    ui.strong(self.selected.name());
                    if ui.button(">").clicked() {
                        self.apply(Action::CycleModel(1));
                    }
                });
                match self.highlight {
                    Some(cell) => ui.label(format!("Cell: ({}, {})", cell.x, cell.z)),
                    None => ui.label("Cell: -"),
                };
                ui.separator();

                let w = self.store.window();
                ui.label(format!(
                    "Window: {}x{} at ({}, {})",
                    w.width(),
                    w.height(),
                    w.min.x,
                    w.min.z
                ));
                let instances: usize = Model::ALL.iter().map(|&m| self.store.instance_count(m)).sum();
                ui.label(format!(
                    "Instances: {instances}  Lights: {}",
                    self.store.light_count()
                ));
                if let Some(stats) = self.store.last_stats() {
                    ui.label(format!(
                        "Last rebuild: {} records in {:.2} ms",
                        stats.records,
                        stats.elapsed.as_secs_f64() * 1000.0
                    ));
                }
                ui.label(format!("Unsaved events: {}", self.db.pending().len()));
                ui.horizontal(|ui| {
                    if ui.button("Commit (F5)").clicked() {
                        self.commit();
                    }
                    if ui.button("Compact").clicked() {
                        if let Err(e) = self.db.compact() {
                            tracing::error!("failed to compact: {e}");
                        }
                    }
                });
                if let Some(error) = &self.last_error {
                    ui.colored_label(egui::Color32::LIGHT_RED, error.as_str());
                }

                ui.separator();
                ui.small("WASD: Move | Wheel: Model | RMB: Place | LMB: Erase | F1: HUD");
            });
    }
}

struct GpuApp {
    state: AppState,
    window: Option<Arc<Window>>,
    surface: Option<wgpu::Surface<'static>>,
    device: Option<wgpu::Device>,
    queue: Option<wgpu::Queue>,
    config: Option<wgpu::SurfaceConfiguration>,
    renderer: Option<WgpuRenderer>,
    egui_ctx: EguiContext,
    egui_winit: Option<egui_winit::State>,
    egui_renderer: Option<egui_wgpu::Renderer>,
}

impl GpuApp {
    fn new(state: AppState) -> Self {
        Self {
            state,
            window: None,
            surface: None,
            device: None,
            queue: None,
            config: None,
            renderer: None,
            egui_ctx: EguiContext::default(),
            egui_winit: None,
            egui_renderer: None,
        }
    }

    fn shutdown(&mut self) {
        if let (Some(device), Some(queue)) = (&self.device, &self.queue) {
            self.state
                .store
                .release(&mut WgpuInstanceDevice::new(device, queue));
        }
        self.state.commit();
    }

    fn frame(&mut self) {
        let now = Instant::now();
        let dt = (now - self.state.last_frame).as_secs_f32().min(0.1);
        self.state.last_frame = now;
        self.state.update(dt);

        let (Some(surface), Some(device), Some(queue)) =
            (&self.surface, &self.device, &self.queue)
        else {
            return;
        };

        let state = &mut self.state;
        let bounds = state.rig.bounds();
        match state.store.reconcile(
            &bounds,
            &mut state.db,
            &mut WgpuInstanceDevice::new(device, queue),
        ) {
            Ok(_) => state.last_error = None,
            Err(e) => {
                tracing::error!("window reconcile failed: {e}");
                state.last_error = Some(e.to_string());
            }
        }

        let output = match surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                if let Some(config) = &self.config {
                    surface.configure(device, config);
                }
                return;
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        if let Some(renderer) = &self.renderer {
            let frame = FrameView::capture(&self.state.rig, &self.state.store)
                .with_highlight(self.state.highlight)
                .with_selected(self.state.selected);
            renderer.render(device, queue, &view, &frame, &self.state.store);
        }

        let (Some(window), Some(egui_winit), Some(egui_renderer), Some(config)) = (
            &self.window,
            &mut self.egui_winit,
            &mut self.egui_renderer,
            &self.config,
        ) else {
            return;
        };

        let raw_input = egui_winit.take_egui_input(window);
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            self.state.draw_ui(ctx);
        });
        egui_winit.handle_platform_output(window, full_output.platform_output);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [config.width, config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            egui_renderer.update_texture(device, queue, *id, image_delta);
        }
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("egui_encoder"),
        });
        egui_renderer.update_buffers(device, queue, &mut encoder, &paint_jobs, &screen_descriptor);
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();
            egui_renderer.render(&mut pass, &paint_jobs, &screen_descriptor);
        }
        queue.submit(std::iter::once(encoder.finish()));
        for id in &full_output.textures_delta.free {
            egui_renderer.free_texture(id);
        }

        output.present();
        window.request_redraw();
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title("Tilescape")
            .with_inner_size(PhysicalSize::new(1280u32, 720));
        let window = Arc::new(event_loop.create_window(attrs).expect("create window"));

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .expect("create surface");

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .expect("find adapter");

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("tilescape_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .expect("create device");

        let size = window.inner_size();
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
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        self.state.resize(config.width, config.height);

        let renderer = WgpuRenderer::new(
            &device,
            surface_format,
            config.width,
            config.height,
            self.state.config.world.tile_size,
        );

        let egui_winit = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        self.window = Some(window);
        self.surface = Some(surface);
        self.device = Some(device);
        self.queue = Some(queue);
        self.config = Some(config);
        self.renderer = Some(renderer);
        self.egui_winit = Some(egui_winit);
        self.egui_renderer = Some(egui_renderer);

        tracing::info!(
            "GPU initialized with {} backend",
            adapter.get_info().backend.to_str()
        );
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let (Some(egui_winit), Some(window)) = (&mut self.egui_winit, &self.window) {
            let response = egui_winit.on_window_event(window, &event);
            if response.consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                self.shutdown();
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let (Some(surface), Some(device), Some(config)) =
                    (&self.surface, &self.device, &mut self.config)
                {
                    config.width = new_size.width.max(1);
                    config.height = new_size.height.max(1);
                    surface.configure(device, config);
                    self.state.resize(config.width, config.height);
                    if let Some(renderer) = &mut self.renderer {
                        renderer.resize(device, config.width, config.height);
                    }
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: key_state,
                        ..
                    },
                ..
            } => {
                self.state
                    .handle_key(key, key_state == ElementState::Pressed);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.state.cursor = Some(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::CursorLeft { .. } => {
                self.state.cursor = None;
                self.state.buttons = PointerButtons::default();
            }
            WindowEvent::MouseInput {
                button,
                state: btn_state,
                ..
            } => {
                let pressed = btn_state == ElementState::Pressed;
                match button {
                    MouseButton::Left => self.state.buttons.left = pressed,
                    MouseButton::Right => self.state.buttons.right = pressed,
                    _ => {}
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => (p.y / PIXELS_PER_NOTCH) as f32,
                };
                self.state.apply(Action::from_wheel(lines));
            }
            WindowEvent::RedrawRequested => self.frame(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    tracing::info!("tilescape-desktop starting");

    let mut config = match &cli.config {
        Some(path) => ViewerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ViewerConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(AppState::new(config)?);
    event_loop.run_app(&mut app)?;

    Ok(())
}
