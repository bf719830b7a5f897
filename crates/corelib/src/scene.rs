//! Scene graph: a tree of named nodes plus the geometry, materials and
//! texture slots they reference by id.
//!
//! Storage is append-only. Ids stay valid for the lifetime of the scene and
//! the renderer can upload new entries by watching the lengths grow.

use crate::error::{CoreError, CoreResult};
use crate::material::{Material, MaterialId};
use crate::mesh::{Geometry, GeometryId};
use crate::texture::{TextureData, TextureId, TextureSlot};
use crate::transform::Transform;
use crate::Mat4;

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Group,
    Mesh {
        geometry: GeometryId,
        material: Option<MaterialId>,
    },
    Points {
        geometry: GeometryId,
        material: MaterialId,
    },
    /// Placeholder marking where the camera lives in the tree.
    Camera,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub kind: NodeKind,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            transform: Transform::identity(),
            kind,
            children: Vec::new(),
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Group)
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Immediate child by exact name. Not recursive.
    pub fn find_child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn find_child_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    pub fn material(&self) -> Option<MaterialId> {
        match self.kind {
            NodeKind::Mesh { material, .. } => material,
            NodeKind::Points { material, .. } => Some(material),
            NodeKind::Group | NodeKind::Camera => None,
        }
    }

    /// Replace the surface descriptor of a mesh or points node.
    pub fn set_material(&mut self, id: MaterialId) -> CoreResult<()> {
        match &mut self.kind {
            NodeKind::Mesh { material, .. } => *material = Some(id),
            NodeKind::Points { material, .. } => *material = id,
            NodeKind::Group | NodeKind::Camera => {
                return Err(CoreError::NotAMesh {
                    name: self.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Node::subtree_len).sum::<usize>()
    }

    fn offset_geometry(&mut self, offset: u32) {
        match &mut self.kind {
            NodeKind::Mesh { geometry, .. } | NodeKind::Points { geometry, .. } => {
                geometry.0 += offset;
            }
            NodeKind::Group | NodeKind::Camera => {}
        }
        for child in &mut self.children {
            child.offset_geometry(offset);
        }
    }
}

impl Default for Node {
    fn default() -> Self {
        Node::group("")
    }
}

/// A decoded model: node tree whose geometry ids index `geometries`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoadedModel {
    pub root: Node,
    pub geometries: Vec<Geometry>,
}

impl LoadedModel {
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.root.find_child(name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.root.find_child_mut(name)
    }
}

/// One mesh or point cloud ready to draw, with its world matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Drawable {
    pub geometry: GeometryId,
    pub material: Option<MaterialId>,
    pub world: Mat4,
}

#[derive(Debug, Default)]
pub struct Scene {
    children: Vec<Node>,
    geometries: Vec<Geometry>,
    materials: Vec<Material>,
    textures: Vec<TextureSlot>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a top-level node; returns its child index.
    pub fn add(&mut self, node: Node) -> usize {
        self.children.push(node);
        self.children.len() - 1
    }

    /// Take ownership of a loaded model: its geometry joins the scene
    /// storage and its root becomes one new top-level child.
    pub fn add_model(&mut self, model: LoadedModel) -> usize {
        let LoadedModel {
            mut root,
            geometries,
        } = model;
        let offset = self.geometries.len() as u32;
        root.offset_geometry(offset);
        self.geometries.extend(geometries);
        self.add(root)
    }

    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryId {
        self.geometries.push(geometry);
        GeometryId(self.geometries.len() as u32 - 1)
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() as u32 - 1)
    }

    pub fn add_texture_slot(&mut self, label: impl Into<String>) -> TextureId {
        self.textures.push(TextureSlot::new(label));
        TextureId(self.textures.len() as u32 - 1)
    }

    pub fn set_texture(&mut self, id: TextureId, data: TextureData) -> CoreResult<()> {
        let slot = self
            .textures
            .get_mut(id.0 as usize)
            .ok_or(CoreError::UnknownTexture(id.0))?;
        if !data.is_valid() {
            return Err(CoreError::Generic(format!(
                "texture '{}' has {} bytes for {}x{}",
                slot.label,
                data.data.len(),
                data.width,
                data.height
            )));
        }
        slot.set(data);
        Ok(())
    }

    #[inline]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    #[inline]
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn find_child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    #[inline]
    pub fn geometries(&self) -> &[Geometry] {
        &self.geometries
    }

    pub fn geometry(&self, id: GeometryId) -> Option<&Geometry> {
        self.geometries.get(id.0 as usize)
    }

    #[inline]
    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn material(&self, id: MaterialId) -> CoreResult<&Material> {
        self.materials
            .get(id.0 as usize)
            .ok_or(CoreError::UnknownMaterial(id.0))
    }

    #[inline]
    pub fn textures(&self) -> &[TextureSlot] {
        &self.textures
    }

    pub fn texture(&self, id: TextureId) -> Option<&TextureSlot> {
        self.textures.get(id.0 as usize)
    }

    /// Flatten the tree into draw items in depth-first order.
    pub fn drawables(&self) -> Vec<Drawable> {
        let mut out = Vec::new();
        for child in &self.children {
            collect(child, Mat4::IDENTITY, &mut out);
        }
        out
    }
}

fn collect(node: &Node, parent: Mat4, out: &mut Vec<Drawable>) {
    let world = parent * node.transform.matrix();
    match node.kind {
        NodeKind::Mesh { geometry, material } => out.push(Drawable {
            geometry,
            material,
            world,
        }),
        NodeKind::Points { geometry, material } => out.push(Drawable {
            geometry,
            material: Some(material),
            world,
        }),
        NodeKind::Group | NodeKind::Camera => {}
    }
    for child in &node.children {
        collect(child, world, out);
    }
}
