//! GPU copies of scene storage. Scene storage only grows, so syncing means
//! uploading whatever appeared since the last frame.

use corelib::mesh::Geometry;
use corelib::scene::Scene;
use corelib::texture::{ColorSpace, TextureData, TextureId};
use wgpu::util::{DeviceExt, TextureDataOrder};
use wgpu::{BindGroup, BindGroupLayout, Buffer, BufferUsages, Device, Queue, Sampler};

use crate::gpu_types::{ObjectUniform, Vertex};

pub(crate) enum GpuGeometry {
    Mesh {
        vertex_buf: Buffer,
        index_buf: Buffer,
        index_count: u32,
    },
    Points {
        instance_buf: Buffer,
        count: u32,
    },
    /// Nothing to draw.
    Empty,
}

pub(crate) struct GpuTexture {
    #[allow(dead_code)]
    texture: wgpu::Texture,
    pub bind_group: BindGroup,
    version: u32,
}

pub(crate) struct ObjectSlot {
    pub buffer: Buffer,
    pub bind_group: BindGroup,
}

pub(crate) struct SceneResources {
    pub geometries: Vec<GpuGeometry>,
    textures: Vec<Option<GpuTexture>>,
    /// Bound when a material has no map.
    white: GpuTexture,
    /// Bound while a map's image is still loading.
    black: GpuTexture,
    pub objects: Vec<ObjectSlot>,
}

impl SceneResources {
    pub fn new(device: &Device, queue: &Queue, layout: &BindGroupLayout, sampler: &Sampler) -> Self {
        let white = TextureData::solid([255; 4], ColorSpace::Srgb);
        let black = TextureData::solid([0, 0, 0, 255], ColorSpace::Srgb);
        Self {
            geometries: Vec::new(),
            textures: Vec::new(),
            white: upload_texture(device, queue, layout, sampler, "White", &white, 0),
            black: upload_texture(device, queue, layout, sampler, "Black", &black, 0),
            objects: Vec::new(),
        }
    }

    /// Upload geometry and texture images added since the last call.
    pub fn sync(
        &mut self,
        device: &Device,
        queue: &Queue,
        scene: &Scene,
        texture_layout: &BindGroupLayout,
        sampler: &Sampler,
    ) {
        for geometry in &scene.geometries()[self.geometries.len()..] {
            self.geometries.push(upload_geometry(device, geometry));
        }

        for (i, slot) in scene.textures().iter().enumerate() {
            if self.textures.len() <= i {
                self.textures.push(None);
            }
            let Some(data) = slot.data() else { continue };
            let stale = self.textures[i]
                .as_ref()
                .is_none_or(|t| t.version != slot.version());
            if stale {
                log::info!(
                    "Uploading texture '{}' ({}x{})",
                    slot.label,
                    data.width,
                    data.height
                );
                self.textures[i] = Some(upload_texture(
                    device,
                    queue,
                    texture_layout,
                    sampler,
                    &slot.label,
                    data,
                    slot.version(),
                ));
            }
        }
    }

    pub fn texture_bind_group(&self, map: Option<TextureId>) -> &BindGroup {
        match map {
            None => &self.white.bind_group,
            Some(id) => self
                .textures
                .get(id.0 as usize)
                .and_then(Option::as_ref)
                .map_or(&self.black.bind_group, |t| &t.bind_group),
        }
    }

    /// Make sure at least `count` per-draw uniform slots exist.
    pub fn ensure_objects(&mut self, device: &Device, layout: &BindGroupLayout, count: usize) {
        while self.objects.len() < count {
            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Object UBO"),
                size: std::mem::size_of::<ObjectUniform>() as u64,
                usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Object BG"),
                layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            });
            self.objects.push(ObjectSlot { buffer, bind_group });
        }
    }
}

fn upload_geometry(device: &Device, geometry: &Geometry) -> GpuGeometry {
    match geometry {
        Geometry::Mesh(mesh) if mesh.is_valid() => {
            let vertices: Vec<Vertex> = mesh.vertices.iter().map(Vertex::from).collect();
            let vertex_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh VB"),
                contents: bytemuck::cast_slice(&vertices),
                usage: BufferUsages::VERTEX,
            });
            let index_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh IB"),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: BufferUsages::INDEX,
            });
            GpuGeometry::Mesh {
                vertex_buf,
                index_buf,
                index_count: mesh.indices.len() as u32,
            }
        }
        Geometry::Points(field) if !field.is_empty() => {
            let instance_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Points IB"),
                contents: bytemuck::cast_slice(field.positions()),
                usage: BufferUsages::VERTEX,
            });
            GpuGeometry::Points {
                instance_buf,
                count: field.len() as u32,
            }
        }
        _ => GpuGeometry::Empty,
    }
}

fn upload_texture(
    device: &Device,
    queue: &Queue,
    layout: &BindGroupLayout,
    sampler: &Sampler,
    label: &str,
    data: &TextureData,
    version: u32,
) -> GpuTexture {
    let format = match data.color_space {
        ColorSpace::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        ColorSpace::Linear => wgpu::TextureFormat::Rgba8Unorm,
    };
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: data.width,
                height: data.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        TextureDataOrder::LayerMajor,
        &data.data,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    });
    GpuTexture {
        texture,
        bind_group,
        version,
    }
}
