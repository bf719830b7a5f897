//! glTF / GLB model loading into a [`LoadedModel`] node tree.
//!
//! The root of the result stands for the file's default scene; its immediate
//! children are the scene's top-level nodes, named as authored. Materials in
//! the file are not imported: callers bind their own by node name.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use corelib::mesh::{Geometry, GeometryId, MeshData, MeshVertex};
use corelib::scene::{LoadedModel, Node, NodeKind};
use corelib::transform::Transform;
use corelib::{Quat, Vec3};
use gltf::Gltf;

use crate::pending::Pending;

pub const DRACO_EXTENSION: &str = "KHR_draco_mesh_compression";

#[derive(Clone, Debug, Default)]
pub struct ModelLoader {
    draco_decoder_path: Option<PathBuf>,
}

impl ModelLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory holding the Draco decoder assets. Must be set before loading
    /// files that declare Draco compression.
    pub fn set_draco_decoder_path(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.draco_decoder_path = Some(path.into());
        self
    }

    #[inline]
    pub fn draco_decoder_path(&self) -> Option<&Path> {
        self.draco_decoder_path.as_deref()
    }

    /// Start loading in the background.
    pub fn load(&self, path: impl Into<PathBuf>) -> Pending<LoadedModel> {
        let path = path.into();
        let loader = self.clone();
        Pending::spawn(path.display().to_string(), move || loader.load_path(&path))
    }

    /// Load a model synchronously.
    pub fn load_path(&self, path: &Path) -> Result<LoadedModel> {
        log::info!("Loading model from {:?}", path);
        let bytes = std::fs::read(path).with_context(|| format!("Failed to read model {:?}", path))?;
        let model = self
            .load_from_slice(&bytes, path.parent())
            .with_context(|| format!("Failed to decode model {:?}", path))?;
        log::info!(
            "Loaded model {:?}: {} nodes, {} meshes",
            path,
            model.root.subtree_len(),
            model.geometries.len()
        );
        Ok(model)
    }

    /// Decode `.glb` or `.gltf` bytes. External buffers resolve against `base`.
    pub fn load_from_slice(&self, bytes: &[u8], base: Option<&Path>) -> Result<LoadedModel> {
        let gltf = Gltf::from_slice_without_validation(bytes).context("not a glTF document")?;
        let blob = gltf.blob;
        let document = gltf.document;

        if document.extensions_used().any(|ext| ext == DRACO_EXTENSION) {
            self.check_draco(&document)?;
        }

        let buffers =
            gltf::import_buffers(&document, base, blob).context("failed to load buffers")?;

        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or_else(|| anyhow!("model contains no scene"))?;

        let mut geometries = Vec::new();
        let mut root = Node::group(scene.name().unwrap_or("Scene"));
        for node in scene.nodes() {
            root.children
                .push(convert_node(&node, &buffers, &mut geometries)?);
        }

        Ok(LoadedModel { root, geometries })
    }

    fn check_draco(&self, document: &gltf::Document) -> Result<()> {
        let decoder = self.draco_decoder_path.as_deref().ok_or_else(|| {
            anyhow!("model uses {DRACO_EXTENSION} but no Draco decoder path is configured")
        })?;
        if !decoder.is_dir() {
            bail!("Draco decoder directory {:?} not found", decoder);
        }
        // Optional compression keeps uncompressed fallback accessors we can read.
        if document
            .extensions_required()
            .any(|ext| ext == DRACO_EXTENSION)
        {
            bail!(
                "model requires {DRACO_EXTENSION}, which is not decoded here; \
                 re-export it without Draco compression (decoder path {:?})",
                decoder
            );
        }
        log::debug!("Draco extension present but optional; reading fallback accessors");
        Ok(())
    }
}

fn convert_node(
    node: &gltf::Node,
    buffers: &[gltf::buffer::Data],
    geometries: &mut Vec<Geometry>,
) -> Result<Node> {
    let (t, r, s) = node.transform().decomposed();
    let transform = Transform::from_trs(Vec3::from(t), Quat::from_array(r), Vec3::from(s));
    let name = node.name().unwrap_or_default().to_owned();

    let kind = match node.mesh() {
        Some(mesh) => {
            let data = read_mesh(&mesh, buffers)
                .with_context(|| format!("mesh of node '{}'", name))?;
            geometries.push(Geometry::Mesh(data));
            NodeKind::Mesh {
                geometry: GeometryId(geometries.len() as u32 - 1),
                material: None,
            }
        }
        None => NodeKind::Group,
    };

    let mut out = Node::new(name, kind).with_transform(transform);
    for child in node.children() {
        out.children.push(convert_node(&child, buffers, geometries)?);
    }
    Ok(out)
}

fn read_mesh(mesh: &gltf::Mesh, buffers: &[gltf::buffer::Data]) -> Result<MeshData> {
    let mut out = MeshData::default();
    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::warn!(
                "Skipping {:?} primitive in mesh '{}'",
                primitive.mode(),
                mesh.name().unwrap_or_default()
            );
            continue;
        }

        let reader = primitive.reader(|b| buffers.get(b.index()).map(|d| d.0.as_slice()));
        let positions: Vec<[f32; 3]> = reader
            .read_positions()
            .ok_or_else(|| anyhow!("primitive {} has no positions", primitive.index()))?
            .collect();
        let normals: Vec<[f32; 3]> = reader
            .read_normals()
            .map(|it| it.collect())
            .unwrap_or_default();
        let uvs: Vec<[f32; 2]> = reader
            .read_tex_coords(0)
            .map(|tc| tc.into_f32().collect())
            .unwrap_or_default();
        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };

        if let Some(bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
            bail!(
                "index {} out of bounds (len={}) in primitive {}",
                bad,
                positions.len(),
                primitive.index()
            );
        }

        let vertices = positions
            .iter()
            .enumerate()
            .map(|(i, &position)| {
                let normal = normals.get(i).copied().unwrap_or([0.0, 0.0, 1.0]);
                let uv = uvs.get(i).copied().unwrap_or([0.0, 0.0]);
                MeshVertex::new(position, normal, uv)
            })
            .collect();
        out.append(MeshData::new(vertices, indices));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One triangle: (0,0,0) (1,0,0) (0,1,0).
    const TRIANGLE_B64: &str = "AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA";

    fn portal_gltf(extensions: &str) -> String {
        format!(
            r#"{{
  "asset": {{ "version": "2.0" }},
  {extensions}
  "buffers": [{{ "byteLength": 36, "uri": "data:application/octet-stream;base64,{TRIANGLE_B64}" }}],
  "bufferViews": [{{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }}],
  "accessors": [{{
    "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
    "min": [0, 0, 0], "max": [1, 1, 0]
  }}],
  "meshes": [{{ "name": "tri", "primitives": [{{ "attributes": {{ "POSITION": 0 }} }}] }}],
  "nodes": [
    {{ "name": "baked", "mesh": 0 }},
    {{ "name": "portalLight", "mesh": 0, "translation": [0, 0.5, -1.7] }},
    {{ "name": "poleLightA", "mesh": 0 }},
    {{ "name": "poleLightB", "mesh": 0 }},
    {{ "name": "props", "children": [5] }},
    {{ "name": "nested", "mesh": 0 }}
  ],
  "scenes": [{{ "name": "Scene", "nodes": [0, 1, 2, 3, 4] }}],
  "scene": 0
}}"#
        )
    }

    #[test]
    fn loads_named_top_level_nodes() {
        let json = portal_gltf("");
        let model = ModelLoader::new()
            .load_from_slice(json.as_bytes(), None)
            .expect("load gltf");

        assert_eq!(model.root.name, "Scene");
        assert_eq!(model.root.children.len(), 5);
        assert_eq!(model.geometries.len(), 5);
        for name in ["baked", "portalLight", "poleLightA", "poleLightB"] {
            let node = model.child(name).expect("named child");
            assert!(matches!(node.kind, NodeKind::Mesh { material: None, .. }));
        }
        assert!(model.child("nested").is_none());
        let props = model.child("props").expect("group");
        assert_eq!(props.kind, NodeKind::Group);
        assert_eq!(props.children[0].name, "nested");

        let light = model.child("portalLight").expect("portal light");
        assert_eq!(light.transform.translation, Vec3::new(0.0, 0.5, -1.7));

        let Geometry::Mesh(mesh) = &model.geometries[0] else {
            panic!("expected mesh geometry");
        };
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.vertices[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(mesh.vertices[0].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn draco_requires_configured_decoder() {
        let json = portal_gltf(r#""extensionsUsed": ["KHR_draco_mesh_compression"],"#);
        let err = ModelLoader::new()
            .load_from_slice(json.as_bytes(), None)
            .unwrap_err();
        assert!(err.to_string().contains("no Draco decoder path"));

        let mut loader = ModelLoader::new();
        loader.set_draco_decoder_path("definitely/not/here/draco");
        let err = loader.load_from_slice(json.as_bytes(), None).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn optional_draco_reads_fallback_data() {
        let json = portal_gltf(r#""extensionsUsed": ["KHR_draco_mesh_compression"],"#);
        let mut loader = ModelLoader::new();
        loader.set_draco_decoder_path(std::env::temp_dir());
        let model = loader
            .load_from_slice(json.as_bytes(), None)
            .expect("fallback accessors");
        assert!(model.child("baked").is_some());
    }

    #[test]
    fn required_draco_asks_for_uncompressed_export() {
        let json = portal_gltf(
            r#""extensionsUsed": ["KHR_draco_mesh_compression"],
  "extensionsRequired": ["KHR_draco_mesh_compression"],"#,
        );
        let mut loader = ModelLoader::new();
        loader.set_draco_decoder_path(std::env::temp_dir());
        let err = loader.load_from_slice(json.as_bytes(), None).unwrap_err();
        assert!(err.to_string().contains("without Draco compression"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = ModelLoader::new()
            .load("no/such/portal.glb")
            .wait()
            .unwrap_err();
        assert!(format!("{err:#}").contains("portal.glb"));
    }
}
