//! Application context: scene, camera, controls, viewport and renderer
//! behind one value owned by the event loop.

use std::path::{Path, PathBuf};

use anyhow::Result;
use asset::{ModelLoader, Pending, TextureLoader, TextureOptions};
use corelib::camera::PerspectiveCamera;
use corelib::controls::OrbitControls;
use corelib::points::PointFieldParams;
use corelib::scene::{LoadedModel, Node, NodeKind, Scene};
use corelib::texture::{ColorSpace, TextureData};
use corelib::viewport::Viewport;
use corelib::{CoreResult, Vec3};
use rand::Rng;

use crate::portal::{self, PortalMaterials};
use crate::render_loop::RenderLoop;

/// What the context needs from whatever draws frames.
pub trait FrameRenderer {
    /// Logical size of the drawing surface.
    fn set_size(&mut self, width: u32, height: u32);
    /// Already clamped to [`corelib::viewport::MAX_PIXEL_RATIO`].
    fn set_pixel_ratio(&mut self, ratio: f64);
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<()>;
}

/// Where the portal's files live.
#[derive(Clone, Debug)]
pub struct AssetSources {
    root: PathBuf,
}

impl AssetSources {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn model_path(&self) -> PathBuf {
        self.root.join(portal::MODEL_FILE)
    }

    pub fn baked_texture_path(&self) -> PathBuf {
        self.root.join(portal::BAKED_TEXTURE_FILE)
    }

    pub fn draco_path(&self) -> PathBuf {
        self.root.join(portal::DRACO_DIR)
    }
}

/// In-flight asset loads.
#[derive(Default)]
pub struct AssetRequests {
    pub baked_texture: Option<Pending<TextureData>>,
    pub model: Option<Pending<LoadedModel>>,
}

impl AssetRequests {
    /// Kick off the texture load, then the model load.
    pub fn start(sources: &AssetSources) -> Self {
        // baked.jpg: no vertical flip, colour data in sRGB
        let textures = TextureLoader::new(TextureOptions {
            flip_y: false,
            color_space: ColorSpace::Srgb,
        });
        let mut models = ModelLoader::new();
        models.set_draco_decoder_path(sources.draco_path());

        Self {
            baked_texture: Some(textures.load(sources.baked_texture_path())),
            model: Some(models.load(sources.model_path())),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.baked_texture.is_none() && self.model.is_none()
    }
}

pub struct AppContext<R> {
    scene: Scene,
    camera: PerspectiveCamera,
    controls: OrbitControls,
    viewport: Viewport,
    renderer: R,
    render_loop: RenderLoop,
    materials: PortalMaterials,
    look_target: Vec3,
    requests: AssetRequests,
}

impl<R: FrameRenderer> AppContext<R> {
    /// Build the scene graph and configure `renderer` for `viewport`.
    pub fn new<G: Rng + ?Sized>(
        mut renderer: R,
        viewport: Viewport,
        points: PointFieldParams,
        show_fps: bool,
        rng: &mut G,
    ) -> Self {
        let mut scene = Scene::new();
        let materials = PortalMaterials::create(&mut scene);

        let field = portal::point_field_node(&mut scene, points, rng);
        scene.add(field);

        let camera = portal::camera(viewport.aspect());
        scene.add(Node::new("camera", NodeKind::Camera));
        let controls = portal::orbit_controls(&camera);

        renderer.set_size(viewport.width(), viewport.height());
        renderer.set_pixel_ratio(viewport.pixel_ratio());

        log::info!(
            "Scene ready: {} points, viewport {}x{} @{}",
            points.count,
            viewport.width(),
            viewport.height(),
            viewport.pixel_ratio()
        );

        Self {
            scene,
            camera,
            controls,
            viewport,
            renderer,
            render_loop: RenderLoop::new(show_fps),
            materials,
            look_target: portal::LOOK_TARGET,
            requests: AssetRequests::default(),
        }
    }

    /// Adopt a new logical size and device pixel ratio.
    pub fn resize(&mut self, width: u32, height: u32, device_pixel_ratio: f64) {
        self.viewport.resize(width, height, device_pixel_ratio);

        self.camera.aspect = self.viewport.aspect();
        self.camera.update_projection_matrix();

        self.renderer
            .set_size(self.viewport.width(), self.viewport.height());
        self.renderer.set_pixel_ratio(self.viewport.pixel_ratio());
        log::debug!(
            "Viewport {}x{} @{}",
            self.viewport.width(),
            self.viewport.height(),
            self.viewport.pixel_ratio()
        );
    }

    pub fn begin_loading(&mut self, requests: AssetRequests) {
        self.requests = requests;
    }

    /// Apply whatever finished loading since the last call.
    pub fn poll_assets(&mut self) {
        if let Some(result) = self.requests.baked_texture.as_mut().and_then(Pending::poll) {
            self.requests.baked_texture = None;
            match result.map(|tex| self.on_texture_loaded(tex)) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::error!("Baked texture rejected: {e}"),
                Err(e) => log::error!("Baked texture failed to load: {e:#}"),
            }
        }

        if let Some(result) = self.requests.model.as_mut().and_then(Pending::poll) {
            self.requests.model = None;
            match result.map(|model| self.on_model_loaded(model)) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::error!("Portal model not added: {e}"),
                Err(e) => log::error!("Portal model failed to load: {e:#}"),
            }
        }
    }

    pub fn on_texture_loaded(&mut self, texture: TextureData) -> CoreResult<()> {
        log::info!("Baked texture loaded: {}x{}", texture.width, texture.height);
        self.scene.set_texture(self.materials.baked_texture, texture)
    }

    /// Bind materials to the model's named meshes and add it to the scene.
    /// Nothing is added when a binding fails.
    pub fn on_model_loaded(&mut self, mut model: LoadedModel) -> CoreResult<()> {
        self.materials.bind(&mut model)?;
        let nodes = model.root.subtree_len();
        self.scene.add_model(model);
        log::info!("Portal model added ({nodes} nodes)");
        Ok(())
    }

    /// Feed a pointer drag, in logical pixels, to the controls.
    pub fn handle_drag(&mut self, dx: f64, dy: f64) {
        self.controls
            .handle_drag(dx as f32, dy as f32, self.viewport.height() as f32);
    }

    /// One frame: controls, camera aim, render. A render error stops the loop.
    pub fn tick(&mut self) -> Result<()> {
        if self.render_loop.begin_frame().is_none() {
            return Ok(());
        }

        self.controls.update(&mut self.camera);
        self.camera.look_at(self.look_target);

        if let Err(e) = self.renderer.render(&self.scene, &self.camera) {
            self.render_loop.stop();
            return Err(e);
        }
        Ok(())
    }

    pub fn stop(&mut self) {
        self.render_loop.stop();
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.render_loop.is_running()
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn controls(&self) -> &OrbitControls {
        &self.controls
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn materials(&self) -> &PortalMaterials {
        &self.materials
    }

    pub fn requests(&self) -> &AssetRequests {
        &self.requests
    }

    pub fn render_loop(&self) -> &RenderLoop {
        &self.render_loop
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use corelib::mesh::{Geometry, GeometryId, MeshData};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[derive(Default)]
    struct RecordingRenderer {
        size: (u32, u32),
        pixel_ratio: f64,
        size_calls: usize,
        frames: usize,
        drawn_children: usize,
        last_aspect: f32,
        fail: bool,
    }

    impl FrameRenderer for RecordingRenderer {
        fn set_size(&mut self, width: u32, height: u32) {
            self.size = (width, height);
            self.size_calls += 1;
        }

        fn set_pixel_ratio(&mut self, ratio: f64) {
            self.pixel_ratio = ratio;
        }

        fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<()> {
            if self.fail {
                return Err(anyhow!("device lost"));
            }
            self.frames += 1;
            self.drawn_children = scene.child_count();
            self.last_aspect = camera.aspect;
            Ok(())
        }
    }

    fn context(width: u32, height: u32, dpr: f64) -> AppContext<RecordingRenderer> {
        let mut rng = StdRng::seed_from_u64(7);
        AppContext::new(
            RecordingRenderer::default(),
            Viewport::new(width, height, dpr),
            PointFieldParams::default(),
            false,
            &mut rng,
        )
    }

    fn model_with(names: &[&str]) -> LoadedModel {
        let mut root = Node::group("Scene");
        let mut geometries = Vec::new();
        for (i, name) in names.iter().enumerate() {
            geometries.push(Geometry::Mesh(MeshData::default()));
            root.children.push(Node::new(
                *name,
                NodeKind::Mesh {
                    geometry: GeometryId(i as u32),
                    material: None,
                },
            ));
        }
        LoadedModel { root, geometries }
    }

    fn full_model() -> LoadedModel {
        model_with(&[
            portal::BAKED,
            portal::PORTAL_LIGHT,
            portal::POLE_LIGHT_A,
            portal::POLE_LIGHT_B,
        ])
    }

    #[test]
    fn initial_configuration() {
        let ctx = context(800, 600, 1.0);
        assert!((ctx.camera().aspect - 4.0 / 3.0).abs() < 1e-6);
        assert_eq!(ctx.renderer().size, (800, 600));
        assert_eq!(ctx.renderer().pixel_ratio, 1.0);
        // points + camera
        assert_eq!(ctx.scene().child_count(), 2);
        assert_eq!(ctx.camera().position, portal::CAMERA_START);
    }

    #[test]
    fn resize_updates_camera_and_renderer() {
        let mut ctx = context(800, 600, 1.0);
        ctx.resize(1024, 768, 3.0);
        assert!((ctx.camera().aspect - 4.0 / 3.0).abs() < 1e-6);
        assert_eq!(ctx.renderer().size, (1024, 768));
        assert_eq!(ctx.renderer().pixel_ratio, 2.0);

        ctx.resize(1920, 1080, 1.25);
        assert_eq!(ctx.camera().aspect, 1920.0 / 1080.0);
        assert_eq!(ctx.renderer().pixel_ratio, 1.25);
    }

    #[test]
    fn resize_is_idempotent() {
        let mut ctx = context(800, 600, 1.0);
        ctx.resize(640, 480, 2.0);
        let proj = ctx.camera().proj();
        let calls = ctx.renderer().size_calls;
        ctx.resize(640, 480, 2.0);
        assert_eq!(ctx.camera().proj(), proj);
        assert_eq!(ctx.renderer().size, (640, 480));
        assert_eq!(ctx.renderer().pixel_ratio, 2.0);
        assert_eq!(ctx.renderer().size_calls, calls + 1);
    }

    #[test]
    fn zero_sized_window_is_clamped() {
        let mut ctx = context(800, 600, 1.0);
        ctx.resize(0, 0, 1.0);
        assert_eq!(ctx.renderer().size, (1, 1));
        assert!(ctx.camera().aspect.is_finite());
    }

    #[test]
    fn model_load_binds_materials() {
        let mut ctx = context(800, 600, 1.0);
        ctx.on_model_loaded(full_model()).expect("bindable");
        assert_eq!(ctx.scene().child_count(), 3);

        let mats = *ctx.materials();
        let model_root = &ctx.scene().children()[2];
        let material_of = |name| model_root.find_child(name).and_then(Node::material);
        assert_eq!(material_of(portal::BAKED), Some(mats.baked));
        assert_eq!(material_of(portal::PORTAL_LIGHT), Some(mats.portal_light));
        assert_eq!(material_of(portal::POLE_LIGHT_A), Some(mats.pole_light));
        assert_eq!(material_of(portal::POLE_LIGHT_B), Some(mats.pole_light));
    }

    #[test]
    fn missing_node_keeps_scene_and_loop() {
        let mut ctx = context(800, 600, 1.0);
        let model = model_with(&[portal::BAKED, portal::PORTAL_LIGHT, portal::POLE_LIGHT_A]);
        assert!(ctx.on_model_loaded(model).is_err());
        assert_eq!(ctx.scene().child_count(), 2);

        ctx.tick().expect("frame");
        assert!(ctx.is_running());
        assert_eq!(ctx.renderer().frames, 1);
    }

    #[test]
    fn meshless_named_node_still_adds_model() {
        let mut ctx = context(800, 600, 1.0);
        let mut model = model_with(&[portal::BAKED, portal::PORTAL_LIGHT, portal::POLE_LIGHT_A]);
        model.root.children.push(Node::group(portal::POLE_LIGHT_B));
        ctx.on_model_loaded(model).expect("group with a bound name is tolerated");
        assert_eq!(ctx.scene().child_count(), 3);

        let model_root = &ctx.scene().children()[2];
        let pole_b = model_root.find_child(portal::POLE_LIGHT_B).expect("kept");
        assert_eq!(pole_b.material(), None);
        assert_eq!(
            model_root.find_child(portal::BAKED).and_then(Node::material),
            Some(ctx.materials().baked)
        );
    }

    #[test]
    fn polling_applies_finished_loads_once() {
        let mut ctx = context(800, 600, 1.0);
        ctx.begin_loading(AssetRequests {
            baked_texture: Some(Pending::ready(
                "baked",
                Ok(TextureData::solid([10, 20, 30, 255], ColorSpace::Srgb)),
            )),
            model: Some(Pending::ready("portal", Ok(full_model()))),
        });
        ctx.poll_assets();
        assert!(ctx.requests().is_idle());
        assert_eq!(ctx.scene().child_count(), 3);
        let slot = ctx
            .scene()
            .texture(ctx.materials().baked_texture)
            .expect("slot");
        assert!(slot.is_loaded());

        ctx.poll_assets();
        assert_eq!(ctx.scene().child_count(), 3);
    }

    #[test]
    fn failed_loads_are_dropped() {
        let mut ctx = context(800, 600, 1.0);
        ctx.begin_loading(AssetRequests {
            baked_texture: Some(Pending::ready("baked", Err(anyhow!("no such file")))),
            model: Some(Pending::ready("portal", Err(anyhow!("bad glb")))),
        });
        ctx.poll_assets();
        assert!(ctx.requests().is_idle());
        assert_eq!(ctx.scene().child_count(), 2);
        let slot = ctx
            .scene()
            .texture(ctx.materials().baked_texture)
            .expect("slot");
        assert!(!slot.is_loaded());
    }

    #[test]
    fn tick_renders_and_aims_camera() {
        let mut ctx = context(800, 600, 1.0);
        for _ in 0..3 {
            ctx.tick().expect("frame");
        }
        assert_eq!(ctx.renderer().frames, 3);
        assert_eq!(ctx.camera().target(), portal::LOOK_TARGET);
        let polar = ctx.controls().polar_angle();
        assert!((1.2..=1.4 + 1e-5).contains(&polar));
        assert!((ctx.renderer().last_aspect - 4.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn drag_stays_inside_limits() {
        let mut ctx = context(800, 600, 1.0);
        for _ in 0..50 {
            ctx.handle_drag(-400.0, 300.0);
            ctx.tick().expect("frame");
        }
        let azimuth = ctx.controls().azimuthal_angle();
        let polar = ctx.controls().polar_angle();
        assert!((-0.25 - 1e-5..=0.25 + 1e-5).contains(&azimuth));
        assert!((1.2 - 1e-5..=1.4 + 1e-5).contains(&polar));
    }

    #[test]
    fn render_error_stops_loop() {
        let mut ctx = context(800, 600, 1.0);
        ctx.renderer_mut().fail = true;
        assert!(ctx.tick().is_err());
        assert!(!ctx.is_running());

        ctx.renderer_mut().fail = false;
        ctx.tick().expect("stopped loop is a no-op");
        assert_eq!(ctx.renderer().frames, 0);
    }

    #[test]
    fn stop_halts_rendering() {
        let mut ctx = context(800, 600, 1.0);
        ctx.tick().expect("frame");
        ctx.stop();
        ctx.tick().expect("no-op");
        assert_eq!(ctx.renderer().frames, 1);
        assert_eq!(ctx.render_loop().frames(), 1);
    }
}
