//! Debug panel drawn with egui on top of the presented frame. Empty for now;
//! `H` toggles it.

use std::sync::Arc;

use egui::{ClippedPrimitive, TexturesDelta, ViewportId};
use egui_wgpu::ScreenDescriptor;
use renderer::Overlay;
use wgpu::{CommandEncoder, Device, Queue, RenderPass, TextureFormat};
use winit::event::WindowEvent;
use winit::window::Window;

pub const PANEL_TITLE: &str = "Debug";
pub const PANEL_WIDTH: f32 = 400.0;

struct PreparedFrame {
    jobs: Vec<ClippedPrimitive>,
    textures: TexturesDelta,
    screen: ScreenDescriptor,
}

pub struct DebugPanel {
    window: Arc<Window>,
    ctx: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
    visible: bool,
    frame: Option<PreparedFrame>,
}

impl DebugPanel {
    pub fn new(window: Arc<Window>, device: &Device, surface_format: TextureFormat) -> Self {
        let ctx = egui::Context::default();
        let state = egui_winit::State::new(
            ctx.clone(),
            ViewportId::ROOT,
            &*window,
            Some(window.scale_factor() as f32),
            None,
            Some(device.limits().max_texture_dimension_2d as usize),
        );
        let renderer = egui_wgpu::Renderer::new(device, surface_format, None, 1, false);
        Self {
            window,
            ctx,
            state,
            renderer,
            visible: true,
            frame: None,
        }
    }

    /// Returns `true` if egui consumed the event.
    pub fn on_window_event(&mut self, event: &WindowEvent) -> bool {
        self.state.on_window_event(&self.window, event).consumed
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
        log::debug!("Debug panel {}", if self.visible { "shown" } else { "hidden" });
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    fn run_ui(&mut self, size_in_pixels: [u32; 2]) -> PreparedFrame {
        let raw_input = self.state.take_egui_input(&self.window);
        let visible = self.visible;
        let output = self.ctx.run(raw_input, |ctx| {
            if visible {
                egui::Window::new(PANEL_TITLE)
                    .default_width(PANEL_WIDTH)
                    .show(ctx, |_ui| {});
            }
        });
        self.state
            .handle_platform_output(&self.window, output.platform_output);

        PreparedFrame {
            jobs: self.ctx.tessellate(output.shapes, output.pixels_per_point),
            textures: output.textures_delta,
            screen: ScreenDescriptor {
                size_in_pixels,
                pixels_per_point: output.pixels_per_point,
            },
        }
    }
}

impl Overlay for DebugPanel {
    fn prepare(
        &mut self,
        device: &Device,
        queue: &Queue,
        encoder: &mut CommandEncoder,
        size_in_pixels: [u32; 2],
    ) {
        let frame = self.run_ui(size_in_pixels);
        for (id, delta) in &frame.textures.set {
            self.renderer.update_texture(device, queue, *id, delta);
        }
        // no paint callbacks, so nothing extra to submit
        let _ = self
            .renderer
            .update_buffers(device, queue, encoder, &frame.jobs, &frame.screen);
        self.frame = Some(frame);
    }

    fn paint(&mut self, pass: &mut RenderPass<'static>) {
        let Some(frame) = self.frame.take() else {
            return;
        };
        self.renderer.render(pass, &frame.jobs, &frame.screen);
        for id in &frame.textures.free {
            self.renderer.free_texture(id);
        }
    }
}
