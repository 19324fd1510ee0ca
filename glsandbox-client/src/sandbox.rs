//! Per-frame state of the demo: cameras, meshes, UI panels and rendering.

use std::{rc::Rc, sync::Arc};

use anyhow::Context;
use glam::{Vec2, Vec3};
use glow::HasContext;
use glsandbox_core::{
    camera::{FreeFlyCamera, InputSource, MIN_ZOOM, OrthoCamera2D},
    gfx::{BlitSource, GpuContext, PixelRect, RenderTarget, ShaderProgram},
};

use crate::{
    assets,
    config::{CameraConfig, Config},
    input::SdlInput,
    scene::{self, Mesh},
};

/// Zoom factor applied per wheel notch in 2D mode.
const ZOOM_STEP: f32 = 1.1;
const GRID_HALF_LINES: u32 = 40;
const GRID_SPACING: f32 = 50.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewMode {
    Scene3D,
    Plane2D,
}

/// Perspective parameters of the 3D view.
#[derive(Clone, Copy, Debug)]
struct Lens {
    fov: f32,
    near: f32,
    far: f32,
}

impl From<&CameraConfig> for Lens {
    fn from(config: &CameraConfig) -> Self {
        Self {
            fov: config.fov,
            near: config.near,
            far: config.far,
        }
    }
}

/// Smoothed frame time.
#[derive(Debug, Default)]
pub struct FrameStats {
    average: Option<f32>,
}

impl FrameStats {
    const SMOOTHING: f32 = 0.05;

    pub fn record(&mut self, delta_time: f32) {
        if delta_time <= 0.0 {
            return;
        }
        self.average = Some(match self.average {
            Some(average) => average + (delta_time - average) * Self::SMOOTHING,
            None => delta_time,
        });
    }

    /// Average frame time in milliseconds.
    pub fn frame_ms(&self) -> f32 {
        self.average.map_or(0.0, |average| average * 1000.0)
    }

    pub fn fps(&self) -> f32 {
        self.average.map_or(0.0, |average| 1.0 / average)
    }
}

pub struct Sandbox {
    ctx: Rc<GpuContext>,
    gl: Arc<glow::Context>,
    scene_program: ShaderProgram,
    flat_program: ShaderProgram,
    pyramid: Mesh,
    grid: Mesh,
    camera: FreeFlyCamera,
    camera_2d: OrthoCamera2D,
    lens: Lens,
    mode: ViewMode,
    clear_color: [f32; 3],
    depth_test: bool,
    /// The scene is drawn here instead of the window and shown in the
    /// "Viewport" window.
    offscreen: Option<RenderTarget>,
    offscreen_requested: bool,
    show_inspection: bool,
    stats: FrameStats,
    window_size: (u32, u32),
    cursor_world: Vec2,
}

impl Sandbox {
    pub fn new(
        ctx: &Rc<GpuContext>,
        gl: &Arc<glow::Context>,
        config: &Config,
        width: u32,
        height: u32,
    ) -> anyhow::Result<Self> {
        log::info!("Initializing shaders...");
        let scene_program = ShaderProgram::new(
            ctx,
            &assets::load_shader(&config.shaders.vertex)?,
            &assets::load_shader(&config.shaders.fragment)?,
        )
        .context("Failed to build the scene shader")?;
        let flat_program = ShaderProgram::new(
            ctx,
            assets::embedded_shader("flat.vert")?,
            assets::embedded_shader("flat.frag")?,
        )
        .context("Failed to build the 2D shader")?;

        log::info!("Setting up meshes...");
        let pyramid = scene::pyramid(ctx).context("Failed to create the pyramid mesh")?;
        let grid = scene::grid(ctx, GRID_HALF_LINES, GRID_SPACING)
            .context("Failed to create the grid mesh")?;

        let mut camera = FreeFlyCamera::new(width, height, Vec3::from(config.camera.position));
        camera.speed = config.camera.speed;
        camera.sensitivity = config.camera.sensitivity;

        Ok(Self {
            ctx: Rc::clone(ctx),
            gl: Arc::clone(gl),
            scene_program,
            flat_program,
            pyramid,
            grid,
            camera,
            camera_2d: OrthoCamera2D::new(width, height, Vec2::ZERO),
            lens: Lens::from(&config.camera),
            mode: ViewMode::Scene3D,
            clear_color: config.render.clear_color,
            depth_test: config.render.depth_test,
            offscreen: None,
            offscreen_requested: config.render.offscreen,
            show_inspection: false,
            stats: FrameStats::default(),
            window_size: (width, height),
            cursor_world: Vec2::ZERO,
        })
    }

    /// Follows a change of the window's drawable size.
    pub fn resize(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        log::debug!("Window resized to {width}x{height}");
        self.window_size = (width, height);
        self.ctx.viewport(0, 0, width as i32, height as i32);
        self.camera.set_viewport_size(width, height);
        self.camera_2d.set_viewport_size(width, height);

        let Some(target) = &mut self.offscreen else {
            return;
        };
        if let Err(err) = target.resize(width as i32, height as i32) {
            log::error!("Offscreen rendering disabled: {err}");
            self.offscreen = None;
            self.offscreen_requested = false;
        }
    }

    /// Applies camera input for this frame. `ui_owns_pointer` is set while
    /// the overlay is using the mouse or keyboard.
    pub fn update(&mut self, input: &mut SdlInput<'_>, delta_time: f32, ui_owns_pointer: bool) {
        self.stats.record(delta_time);

        match self.mode {
            ViewMode::Scene3D => {
                if !ui_owns_pointer || self.camera.is_looking() {
                    self.camera.inputs(input, delta_time);
                }
            }
            ViewMode::Plane2D => {
                let cursor = input.cursor_position();
                let mouse = &input.state().mouse;
                if !ui_owns_pointer {
                    if mouse.scroll_delta.y != 0.0 {
                        let factor = ZOOM_STEP.powf(mouse.scroll_delta.y);
                        zoom_about(&mut self.camera_2d, cursor, factor);
                    }
                    let panning = mouse.down.contains(&sdl2::mouse::MouseButton::Middle);
                    if panning && mouse.delta != Vec2::ZERO {
                        pan(&mut self.camera_2d, cursor - mouse.delta, cursor);
                    }
                }
                self.cursor_world = self.camera_2d.screen_to_world(cursor);
            }
        }
    }

    /// Builds this frame's UI panels.
    pub fn ui(&mut self, ctx: &egui::Context) {
        egui::Window::new("Controls")
            .default_pos([10.0, 10.0])
            .default_width(300.0)
            .show(ctx, |ui| {
                ui.label("Renderer Settings");
                ui.horizontal(|ui| {
                    ui.radio_value(&mut self.mode, ViewMode::Scene3D, "3D scene");
                    ui.radio_value(&mut self.mode, ViewMode::Plane2D, "2D plane");
                });

                match self.mode {
                    ViewMode::Scene3D => self.scene_controls(ui),
                    ViewMode::Plane2D => self.plane_controls(ui),
                }

                ui.horizontal(|ui| {
                    ui.color_edit_button_rgb(&mut self.clear_color);
                    ui.label("Background");
                });
                ui.checkbox(&mut self.show_inspection, "Show UI inspection window");
                ui.label(format!(
                    "Application average {:.3} ms/frame ({:.1} FPS)",
                    self.stats.frame_ms(),
                    self.stats.fps()
                ));
            });

        if self.show_inspection {
            egui::Window::new("Inspection")
                .open(&mut self.show_inspection)
                .show(ctx, |ui| ctx.inspection_ui(ui));
        }

        if let Some(target) = &self.offscreen {
            let source = target.blit_source();
            let aspect_ratio = source.width as f32 / source.height.max(1) as f32;
            egui::Window::new("Viewport")
                .default_size([480.0, 480.0 / aspect_ratio])
                .show(ctx, |ui| {
                    let width = ui.available_width();
                    let (rect, _) = ui.allocate_exact_size(
                        egui::vec2(width, width / aspect_ratio),
                        egui::Sense::hover(),
                    );
                    ui.painter().add(viewport_callback(rect, source));
                });
        }
    }

    fn scene_controls(&mut self, ui: &mut egui::Ui) {
        ui.add(egui::Slider::new(&mut self.camera.speed, 0.5..=30.0).text("Speed"));
        ui.add(egui::Slider::new(&mut self.camera.sensitivity, 1.0..=300.0).text("Sensitivity"));
        ui.add(egui::Slider::new(&mut self.lens.fov, 20.0..=110.0).text("Field of view"));
        ui.checkbox(&mut self.depth_test, "Depth test");
        ui.checkbox(&mut self.offscreen_requested, "Render offscreen");
        let position = self.camera.position;
        ui.label(format!(
            "Position: ({:.2}, {:.2}, {:.2})",
            position.x, position.y, position.z
        ));
    }

    fn plane_controls(&mut self, ui: &mut egui::Ui) {
        let mut zoom = self.camera_2d.zoom();
        if ui
            .add(
                egui::Slider::new(&mut zoom, MIN_ZOOM..=20.0)
                    .logarithmic(true)
                    .text("Zoom"),
            )
            .changed()
        {
            self.camera_2d.set_zoom(zoom);
        }

        let mut degrees = self.camera_2d.rotation().to_degrees();
        if ui
            .add(egui::Slider::new(&mut degrees, -180.0..=180.0).text("Rotation"))
            .changed()
        {
            self.camera_2d.set_rotation(degrees.to_radians());
        }

        if ui.button("Reset view").clicked() {
            self.camera_2d.set_position(Vec2::ZERO);
            self.camera_2d.set_zoom(1.0);
            self.camera_2d.set_rotation(0.0);
        }

        ui.label("Scroll to zoom, drag with the middle button to pan.");
        ui.label(format!(
            "Cursor: ({:.1}, {:.1})",
            self.cursor_world.x, self.cursor_world.y
        ));
    }

    /// Creates or releases the offscreen target to match the UI toggle.
    ///
    /// Call before building the UI: the "Viewport" window reads from the
    /// target while the overlay paints, so it must live through the frame.
    pub fn sync_offscreen(&mut self) {
        match (self.offscreen_requested, self.offscreen.is_some()) {
            (true, false) => {
                let (width, height) = self.window_size;
                match RenderTarget::new(&self.ctx, width as i32, height as i32) {
                    Ok(target) => self.offscreen = Some(target),
                    Err(err) => {
                        log::error!("Offscreen rendering disabled: {err}");
                        self.offscreen_requested = false;
                    }
                }
            }
            (false, true) => {
                self.offscreen = None;
                log::debug!("Offscreen target released");
            }
            _ => {}
        }
    }

    pub fn render(&mut self) {
        let (width, height) = self.window_size;
        match &self.offscreen {
            Some(target) => target.bind(),
            None => self.ctx.viewport(0, 0, width as i32, height as i32),
        }

        self.draw();

        if let Some(target) = &self.offscreen {
            target.unbind();
            self.ctx.viewport(0, 0, width as i32, height as i32);
            self.clear();
        }
    }

    fn clear(&self) {
        let [r, g, b] = self.clear_color;
        unsafe {
            self.gl.clear_color(r, g, b, 1.0);
            self.gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }
    }

    fn draw(&mut self) {
        unsafe {
            // The overlay painter leaves depth testing off.
            if self.depth_test && self.mode == ViewMode::Scene3D {
                self.gl.enable(glow::DEPTH_TEST);
            } else {
                self.gl.disable(glow::DEPTH_TEST);
            }
        }
        self.clear();

        match self.mode {
            ViewMode::Scene3D => {
                let program = self.scene_program.activate();
                let Lens { fov, near, far } = self.lens;
                self.camera.matrix(fov, near, far, &program, "camMatrix");
                self.pyramid.draw();
            }
            ViewMode::Plane2D => {
                let program = self.flat_program.activate();
                self.camera_2d.set_matrices(&program);
                self.grid.draw();
            }
        }
    }
}

/// Paints the offscreen image into `rect` of the UI by blitting the target's
/// framebuffer. The painter never sees the target's texture.
fn viewport_callback(rect: egui::Rect, source: BlitSource) -> egui::PaintCallback {
    egui::PaintCallback {
        rect,
        callback: Arc::new(egui_glow::CallbackFn::new(move |info, painter| {
            source.copy_to(painter.gl(), viewport_rect(&info));
        })),
    }
}

/// The callback's viewport in GL window coordinates.
fn viewport_rect(info: &egui::PaintCallbackInfo) -> PixelRect {
    let viewport = info.viewport_in_pixels();
    PixelRect::new(
        viewport.left_px,
        viewport.from_bottom_px,
        viewport.width_px,
        viewport.height_px,
    )
}

/// Scales the zoom by `factor` while keeping the world point under `cursor`
/// in place.
pub fn zoom_about(camera: &mut OrthoCamera2D, cursor: Vec2, factor: f32) {
    let anchor = camera.screen_to_world(cursor);
    camera.set_zoom(camera.zoom() * factor);
    let drifted = camera.screen_to_world(cursor);
    camera.translate(anchor - drifted);
}

/// Moves the camera so the world point under `from` ends up under `to`.
pub fn pan(camera: &mut OrthoCamera2D, from: Vec2, to: Vec2) {
    let shift = camera.screen_to_world(from) - camera.screen_to_world(to);
    camera.translate(shift);
}
