//! Windowed particle system builder and runner.

use std::sync::Arc;

use glam::Vec3;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::config::EmissionConfig;
use crate::error::{GpuError, RunError};
use crate::gpu::{BlendMode, GpuRenderer, RenderStyle};
use crate::render::{FrameError, FramePipeline};
use crate::scheduler::EmissionScheduler;
use crate::shape::{Motion, ShapeConstants};
use crate::time::FrameClock;

/// Frames between window title FPS refreshes.
const TITLE_REFRESH_FRAMES: u64 = 30;

/// A windowed particle effect.
///
/// Use method chaining to configure, then call `.run()` to open a window.
///
/// ```ignore
/// let config = EmissionConfig::new(1000.0, 2.0)?;
/// ParticleSystem::new(config)
///     .with_motion(Motion::Fall { distance: 2.0, width: 2.0 })
///     .with_seed(7)
///     .run()?;
/// ```
///
/// Controls: drag to orbit, scroll to zoom, Space to pause, R to restart.
pub struct ParticleSystem {
    config: EmissionConfig,
    motion: Motion,
    style: RenderStyle,
    seed: Option<u64>,
    title: String,
}

impl ParticleSystem {
    /// A system emitting with `config`, falling straight down by default.
    pub fn new(config: EmissionConfig) -> Self {
        Self {
            config,
            motion: Motion::default(),
            style: RenderStyle::default(),
            seed: None,
            title: "ringfx".to_string(),
        }
    }

    /// Set the per-instance motion evaluated in the vertex shader.
    pub fn with_motion(mut self, motion: Motion) -> Self {
        self.motion = motion;
        self
    }

    /// Set colors and fade/shrink behavior.
    ///
    /// `particle_size` is taken from the emission config, not from here.
    pub fn with_constants(mut self, constants: ShapeConstants) -> Self {
        self.style.constants = constants;
        self
    }

    /// Move the emitter.
    pub fn with_origin(mut self, origin: Vec3) -> Self {
        self.style.origin = origin;
        self
    }

    /// Set how overlapping particles combine.
    pub fn with_blend_mode(mut self, blend: BlendMode) -> Self {
        self.style.blend = blend;
        self
    }

    /// Seed the slot random generator for a reproducible run.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the window title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Open the window and run until it is closed.
    ///
    /// Non-finite motion parameters are rejected before any window opens.
    pub fn run(mut self) -> Result<(), RunError> {
        self.motion.validate()?;
        self.style.constants.particle_size = self.config.particle_size();

        let rng = match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        let pipeline = FramePipeline::new(EmissionScheduler::new(self.config, rng));

        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = App {
            window: None,
            renderer: None,
            pipeline,
            clock: FrameClock::new(),
            motion: self.motion,
            style: self.style,
            title: self.title,
            mouse_pressed: false,
            last_mouse_pos: None,
            error: None,
        };
        event_loop.run_app(&mut app)?;

        match app.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

struct App {
    window: Option<Arc<Window>>,
    renderer: Option<GpuRenderer>,
    pipeline: FramePipeline,
    clock: FrameClock,
    motion: Motion,
    style: RenderStyle,
    title: String,
    mouse_pressed: bool,
    last_mouse_pos: Option<(f64, f64)>,
    /// First fatal error; reported from `run` after the loop exits.
    error: Option<RunError>,
}

impl App {
    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), RunError> {
        let window_attrs = Window::default_attributes()
            .with_title(self.title.as_str())
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let capacity = self.pipeline.scheduler().ring().capacity();
        let renderer = pollster::block_on(GpuRenderer::new(
            window.clone(),
            capacity,
            &self.motion,
            self.style,
        ))
        .map_err(RunError::from)?;

        self.window = Some(window);
        self.renderer = Some(renderer);
        self.clock.reset();
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: RunError) {
        log::error!("{}", err);
        self.error.get_or_insert(err);
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        let dt = self.clock.update();
        match self.pipeline.frame(dt, renderer) {
            Ok(_) => {}
            Err(FrameError::Sink(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                log::warn!("surface lost, reconfiguring");
                renderer.recover_surface();
            }
            Err(FrameError::Sink(wgpu::SurfaceError::OutOfMemory)) => {
                self.fail(event_loop, RunError::Gpu(GpuError::OutOfMemory));
                return;
            }
            Err(e) => log::warn!("frame skipped: {}", e),
        }

        if let Some(window) = &self.window {
            if self.clock.frame() % TITLE_REFRESH_FRAMES == 0 {
                let scheduler = self.pipeline.scheduler();
                window.set_title(&format!(
                    "{} - {} particles - {:.0} fps",
                    self.title,
                    scheduler.visible_count(),
                    self.clock.fps()
                ));
            }
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(err) = self.init(event_loop) {
                self.fail(event_loop, err);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(renderer) = &mut self.renderer {
                    renderer.resize(physical_size);
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                match event.physical_key {
                    PhysicalKey::Code(KeyCode::Space) => {
                        self.clock.toggle_pause();
                        log::info!("paused: {}", self.clock.is_paused());
                    }
                    PhysicalKey::Code(KeyCode::KeyR) => {
                        self.pipeline.reset();
                    }
                    _ => {}
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if button == MouseButton::Left {
                    self.mouse_pressed = state == ElementState::Pressed;
                    if !self.mouse_pressed {
                        self.last_mouse_pos = None;
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if self.mouse_pressed {
                    if let Some((last_x, last_y)) = self.last_mouse_pos {
                        if let Some(renderer) = &mut self.renderer {
                            renderer
                                .camera
                                .orbit((position.x - last_x) as f32, (position.y - last_y) as f32);
                        }
                    }
                    self.last_mouse_pos = Some((position.x, position.y));
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.1,
                };
                if let Some(renderer) = &mut self.renderer {
                    renderer.camera.zoom(scroll);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}
