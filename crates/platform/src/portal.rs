//! The portal scene: fixed camera rig, point field and material bindings for
//! the baked model's named meshes.

use corelib::camera::PerspectiveCamera;
use corelib::controls::OrbitControls;
use corelib::material::{Color, Material, MaterialId};
use corelib::mesh::Geometry;
use corelib::points::{PointField, PointFieldParams};
use corelib::scene::{LoadedModel, Node, NodeKind, Scene};
use corelib::texture::TextureId;
use corelib::transform::Transform;
use corelib::{CoreError, CoreResult, Vec3};
use rand::Rng;

pub const BAKED: &str = "baked";
pub const PORTAL_LIGHT: &str = "portalLight";
pub const POLE_LIGHT_A: &str = "poleLightA";
pub const POLE_LIGHT_B: &str = "poleLightB";

pub const MODEL_FILE: &str = "portal.glb";
pub const BAKED_TEXTURE_FILE: &str = "baked.jpg";
pub const DRACO_DIR: &str = "draco";

pub const FOV_Y_DEG: f32 = 45.0;
pub const Z_NEAR: f32 = 0.1;
pub const Z_FAR: f32 = 100.0;
pub const CAMERA_START: Vec3 = Vec3::new(0.0, 0.3, 2.5);
/// Re-applied every frame after the controls update.
pub const LOOK_TARGET: Vec3 = Vec3::new(0.0, 1.0, -4.0);

pub const AZIMUTH_LIMITS: (f32, f32) = (-0.25, 0.25);
pub const POLAR_LIMITS: (f32, f32) = (1.2, 1.4);

pub const POINTS_POSITION: Vec3 = Vec3::new(0.0, 5.0, -10.0);
pub const POINT_SIZE: f32 = 0.02;

pub const PORTAL_LIGHT_COLOR: u32 = 0xffffff;
pub const POLE_LIGHT_COLOR: u32 = 0xffffe5;

pub fn camera(aspect: f32) -> PerspectiveCamera {
    let mut camera = PerspectiveCamera::new(FOV_Y_DEG, aspect, Z_NEAR, Z_FAR);
    camera.position = CAMERA_START;
    camera
}

/// Damped rotation only: no pan, no zoom, narrow look angles.
pub fn orbit_controls(camera: &PerspectiveCamera) -> OrbitControls {
    let mut controls = OrbitControls::new(camera);
    controls.enable_damping = true;
    controls.enable_pan = false;
    controls.enable_zoom = false;
    (controls.min_azimuth_angle, controls.max_azimuth_angle) = AZIMUTH_LIMITS;
    (controls.min_polar_angle, controls.max_polar_angle) = POLAR_LIMITS;
    controls
}

/// Generate the point field and store it in `scene`. Returns the node to add.
pub fn point_field_node<R: Rng + ?Sized>(
    scene: &mut Scene,
    params: PointFieldParams,
    rng: &mut R,
) -> Node {
    let geometry = scene.add_geometry(Geometry::Points(PointField::generate(params, rng)));
    let material = scene.add_material(Material::points(POINT_SIZE));
    Node::new("points", NodeKind::Points { geometry, material })
        .with_transform(Transform::from_translation(POINTS_POSITION))
}

/// The pre-built materials the model's named meshes receive.
#[derive(Clone, Copy, Debug)]
pub struct PortalMaterials {
    pub baked_texture: TextureId,
    pub baked: MaterialId,
    pub portal_light: MaterialId,
    pub pole_light: MaterialId,
}

impl PortalMaterials {
    /// Register the baked texture slot and the materials in `scene`.
    pub fn create(scene: &mut Scene) -> Self {
        let baked_texture = scene.add_texture_slot("baked");
        Self {
            baked_texture,
            baked: scene.add_material(Material::basic_map(baked_texture)),
            portal_light: scene.add_material(Material::basic(Color::from_hex(PORTAL_LIGHT_COLOR))),
            pole_light: scene.add_material(Material::basic(Color::from_hex(POLE_LIGHT_COLOR))),
        }
    }

    fn bindings(&self) -> [(&'static str, MaterialId); 4] {
        [
            (BAKED, self.baked),
            (PORTAL_LIGHT, self.portal_light),
            (POLE_LIGHT_A, self.pole_light),
            (POLE_LIGHT_B, self.pole_light),
        ]
    }

    /// Assign materials to the model's top-level meshes by exact name.
    /// Every name must exist before anything is assigned. A named node
    /// without a mesh keeps no material and does not block the model.
    pub fn bind(&self, model: &mut LoadedModel) -> CoreResult<()> {
        if let Some((name, _)) = self
            .bindings()
            .into_iter()
            .find(|(name, _)| model.child(name).is_none())
        {
            return Err(CoreError::MissingNode {
                name: name.to_owned(),
            });
        }

        for (name, material) in self.bindings() {
            let Some(node) = model.child_mut(name) else {
                continue;
            };
            match node.set_material(material) {
                Ok(()) => {}
                Err(CoreError::NotAMesh { name }) => {
                    log::warn!("Node '{name}' has no mesh; material not assigned");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelib::mesh::{GeometryId, MeshData};

    fn portal_model(names: &[&str]) -> LoadedModel {
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

    #[test]
    fn binds_all_four_meshes() {
        let mut scene = Scene::new();
        let mats = PortalMaterials::create(&mut scene);
        let mut model = portal_model(&[BAKED, PORTAL_LIGHT, POLE_LIGHT_A, POLE_LIGHT_B]);
        mats.bind(&mut model).expect("all nodes present");

        let material_of = |name: &str| model.child(name).and_then(Node::material);
        assert_eq!(material_of(BAKED), Some(mats.baked));
        assert_eq!(material_of(PORTAL_LIGHT), Some(mats.portal_light));
        assert_eq!(material_of(POLE_LIGHT_A), Some(mats.pole_light));
        assert_eq!(material_of(POLE_LIGHT_B), Some(mats.pole_light));

        assert_eq!(
            scene.material(mats.baked).expect("baked").map(),
            Some(mats.baked_texture)
        );
    }

    #[test]
    fn missing_node_leaves_model_untouched() {
        let mut scene = Scene::new();
        let mats = PortalMaterials::create(&mut scene);
        let mut model = portal_model(&[BAKED, PORTAL_LIGHT, POLE_LIGHT_A]);
        let err = mats.bind(&mut model).unwrap_err();
        assert!(matches!(err, CoreError::MissingNode { ref name } if name == POLE_LIGHT_B));
        assert!(model.root.children.iter().all(|n| n.material().is_none()));
    }

    #[test]
    fn nested_names_do_not_count() {
        let mut scene = Scene::new();
        let mats = PortalMaterials::create(&mut scene);
        let mut model = portal_model(&[BAKED, PORTAL_LIGHT, POLE_LIGHT_A]);
        let nested = Node::new(
            POLE_LIGHT_B,
            NodeKind::Mesh {
                geometry: GeometryId(0),
                material: None,
            },
        );
        model.root.children[0].children.push(nested);
        assert!(mats.bind(&mut model).is_err());
    }

    #[test]
    fn group_with_expected_name_is_skipped() {
        let mut scene = Scene::new();
        let mats = PortalMaterials::create(&mut scene);
        let mut model = portal_model(&[BAKED, PORTAL_LIGHT, POLE_LIGHT_A]);
        model.root.children.push(Node::group(POLE_LIGHT_B));
        mats.bind(&mut model).expect("present group is not fatal");

        assert_eq!(model.child(POLE_LIGHT_A).and_then(Node::material), Some(mats.pole_light));
        assert_eq!(model.child(POLE_LIGHT_B).and_then(Node::material), None);

        scene.add_model(model);
        assert_eq!(scene.child_count(), 1);
    }

    #[test]
    fn rig_matches_portal_framing() {
        let cam = camera(16.0 / 9.0);
        assert_eq!(cam.position, CAMERA_START);
        assert!((cam.fov_y_rad - 45f32.to_radians()).abs() < 1e-6);
        let controls = orbit_controls(&cam);
        assert!(controls.enable_damping);
        assert!(!controls.enable_pan && !controls.enable_zoom);
        assert_eq!(controls.min_polar_angle, 1.2);
        assert_eq!(controls.max_azimuth_angle, 0.25);
    }
}
