//! Platform layer: window, event loop and the portal application on top.
//!
//! The event loop owns an [`AppContext`] whose renderer is the wgpu
//! [`GpuState`] plus the egui [`DebugPanel`]. Redraws are requested
//! continuously while the render loop runs.

pub mod context;
pub mod debug_panel;
pub mod input;
pub mod portal;
pub mod render_loop;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use corelib::camera::PerspectiveCamera;
use corelib::points::PointFieldParams;
use corelib::scene::Scene;
use corelib::viewport::Viewport;
use renderer::{GpuOptions, GpuState};
use wgpu::SurfaceError;
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::{ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

pub use context::{AppContext, AssetRequests, AssetSources, FrameRenderer};
pub use debug_panel::DebugPanel;

/// Startup options, filled from the command line.
#[derive(Clone, Debug)]
pub struct PortalOptions {
    pub backends: wgpu::Backends,
    pub show_fps: bool,
    /// Initial logical window size.
    pub width: u32,
    pub height: u32,
    pub antialias: bool,
    /// Directory with portal.glb, baked.jpg and draco/.
    pub assets: PathBuf,
    pub points: PointFieldParams,
}

impl Default for PortalOptions {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            show_fps: false,
            width: 1280,
            height: 720,
            antialias: true,
            assets: PathBuf::from("static"),
            points: PointFieldParams::default(),
        }
    }
}

/// wgpu renderer with the debug panel painted over each frame.
pub struct WindowRenderer {
    window: Arc<Window>,
    gpu: GpuState,
    panel: DebugPanel,
}

impl WindowRenderer {
    pub fn new(window: Arc<Window>, gpu: GpuState, panel: DebugPanel) -> Self {
        Self { window, gpu, panel }
    }

    pub fn panel_mut(&mut self) -> &mut DebugPanel {
        &mut self.panel
    }
}

impl FrameRenderer for WindowRenderer {
    fn set_size(&mut self, width: u32, height: u32) {
        let PhysicalSize {
            width: pw,
            height: ph,
        } = self.window.inner_size();
        self.gpu.resize_surface(pw, ph);
        self.gpu.set_size(width, height);
    }

    fn set_pixel_ratio(&mut self, ratio: f64) {
        self.gpu.set_pixel_ratio(ratio);
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<()> {
        match self.gpu.render(scene, camera, Some(&mut self.panel)) {
            Ok(()) => Ok(()),
            Err(e) if GpuState::is_surface_lost(&e) => {
                log::warn!("Surface {e:?}; reconfiguring");
                self.gpu.recreate_surface();
                Ok(())
            }
            Err(SurfaceError::Timeout) => {
                log::warn!("Surface timeout; skipping frame");
                Ok(())
            }
            Err(e) => Err(anyhow!("frame failed: {e:?}")),
        }
    }
}

struct PortalApp {
    options: PortalOptions,
    window: Option<Arc<Window>>,
    ctx: Option<AppContext<WindowRenderer>>,
    drag: input::DragTracker,
    error: Option<anyhow::Error>,
}

impl PortalApp {
    fn new(options: PortalOptions) -> Self {
        Self {
            options,
            window: None,
            ctx: None,
            drag: input::DragTracker::default(),
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title("Portal")
            .with_inner_size(LogicalSize::new(self.options.width, self.options.height));
        let window = Arc::new(event_loop.create_window(attrs)?);

        let gpu = pollster::block_on(GpuState::new(
            window.clone(),
            GpuOptions {
                backends: self.options.backends,
                antialias: self.options.antialias,
            },
        ))?;
        let panel = DebugPanel::new(window.clone(), gpu.device(), gpu.surface_format());

        let scale = window.scale_factor();
        let logical: LogicalSize<u32> = window.inner_size().to_logical(scale);
        log::info!(
            "Window created: {}x{} logical, scale {scale}",
            logical.width,
            logical.height
        );

        let mut ctx = AppContext::new(
            WindowRenderer::new(window.clone(), gpu, panel),
            Viewport::new(logical.width, logical.height, scale),
            self.options.points,
            self.options.show_fps,
            &mut rand::rng(),
        );
        let sources = AssetSources::new(self.options.assets.clone());
        log::info!(
            "Loading assets from {} ({} must not require Draco compression)",
            sources.root().display(),
            portal::MODEL_FILE
        );
        ctx.begin_loading(AssetRequests::start(&sources));

        window.request_redraw();
        self.window = Some(window);
        self.ctx = Some(ctx);
        Ok(())
    }
}

impl ApplicationHandler for PortalApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.ctx.is_some() {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            log::error!("Startup failed: {e:#}");
            self.error = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let (Some(window), Some(ctx)) = (self.window.as_ref(), self.ctx.as_mut()) else {
            return;
        };
        let consumed = ctx.renderer_mut().panel_mut().on_window_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting event loop.");
                ctx.stop();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                let scale = window.scale_factor();
                let logical: LogicalSize<u32> = size.to_logical(scale);
                log::info!(
                    "Resized: {}x{} ({}x{} logical)",
                    size.width,
                    size.height,
                    logical.width,
                    logical.height
                );
                ctx.resize(logical.width, logical.height, scale);
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                // размер придёт следующим Resized
                log::info!("Scale factor changed: {scale_factor}");
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed if !consumed => self.drag.press(),
                ElementState::Pressed => {}
                ElementState::Released => self.drag.release(),
            },
            WindowEvent::CursorMoved { position, .. } => {
                let logical = position.to_logical::<f64>(window.scale_factor());
                if let Some((dx, dy)) = self.drag.moved(logical.x, logical.y) {
                    ctx.handle_drag(dx, dy);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::KeyH),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } if !consumed => {
                ctx.renderer_mut().panel_mut().toggle();
            }
            WindowEvent::RedrawRequested => {
                ctx.poll_assets();
                if let Err(e) = ctx.tick() {
                    log::error!("Render loop stopped: {e:#}");
                    self.error = Some(e);
                    event_loop.exit();
                    return;
                }
                if ctx.is_running() {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

/// Open the window and run the portal scene until it is closed.
pub fn run(options: PortalOptions) -> Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = PortalApp::new(options);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
