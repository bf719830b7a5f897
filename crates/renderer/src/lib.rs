//! Renderer: wgpu init, off-screen scene target, surface presentation.
//! wgpu = 23.x, winit = 0.30.x
//!
//! The scene is drawn into an off-screen target sized `logical size * pixel
//! ratio` (optionally multisampled), then stretched onto the window surface.
//! An optional [`Overlay`] paints on top of the surface afterwards.

mod gpu_types;
mod resources;

use std::num::NonZeroU64;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use corelib::camera::PerspectiveCamera;
use corelib::material::{Color, Material};
use corelib::scene::Scene;
use corelib::viewport::drawing_buffer_size;
use wgpu::{
    BindGroup, BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingType,
    BlendState, Buffer, BufferBindingType, BufferUsages, ColorTargetState, ColorWrites,
    CommandEncoder, CommandEncoderDescriptor, DepthBiasState, DepthStencilState, Device,
    DeviceDescriptor, Extent3d, Features, FragmentState, Instance, InstanceDescriptor, Limits,
    LoadOp, Operations, PipelineLayoutDescriptor, PowerPreference, PresentMode, Queue,
    RenderPass, RenderPassColorAttachment, RenderPassDescriptor, RenderPipeline,
    RenderPipelineDescriptor, Sampler, ShaderModule, ShaderModuleDescriptor, ShaderSource,
    ShaderStages, StoreOp, Surface, SurfaceConfiguration, SurfaceError, TextureDescriptor,
    TextureDimension, TextureFormat, TextureUsages, TextureView, TextureViewDescriptor,
    VertexBufferLayout, VertexState,
};
use winit::{dpi::PhysicalSize, window::Window};

use crate::gpu_types::{CameraUniform, ObjectUniform, POINT_INSTANCE_LAYOUT, Vertex};
use crate::resources::{GpuGeometry, SceneResources};

const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;
const TARGET_FORMAT: TextureFormat = TextureFormat::Rgba8UnormSrgb;
const MSAA_SAMPLES: u32 = 4;
const CLEAR_COLOR: wgpu::Color = wgpu::Color::BLACK;

/// GPU setup choices made once at startup.
#[derive(Clone, Copy, Debug)]
pub struct GpuOptions {
    pub backends: wgpu::Backends,
    pub antialias: bool,
}

impl Default for GpuOptions {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            antialias: true,
        }
    }
}

/// Something drawn over the finished frame (debug UI).
pub trait Overlay {
    /// Upload buffers/textures before the surface pass begins.
    fn prepare(
        &mut self,
        device: &Device,
        queue: &Queue,
        encoder: &mut CommandEncoder,
        size_in_pixels: [u32; 2],
    );

    /// Record draw calls into the surface pass.
    fn paint(&mut self, pass: &mut RenderPass<'static>);
}

/// Off-screen colour/depth attachments at drawing-buffer resolution.
struct RenderTarget {
    width: u32,
    height: u32,
    color: TextureView,
    msaa: Option<TextureView>,
    depth: TextureView,
    blit_bg: BindGroup,
}

impl RenderTarget {
    fn new(
        device: &Device,
        (width, height): (u32, u32),
        sample_count: u32,
        blit_bgl: &BindGroupLayout,
        sampler: &Sampler,
    ) -> Self {
        let size = Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let color = create_view(
            device,
            "SceneColor",
            size,
            1,
            TARGET_FORMAT,
            TextureUsages::RENDER_ATTACHMENT | TextureUsages::TEXTURE_BINDING,
        );
        let msaa = (sample_count > 1).then(|| {
            create_view(
                device,
                "SceneColorMsaa",
                size,
                sample_count,
                TARGET_FORMAT,
                TextureUsages::RENDER_ATTACHMENT,
            )
        });
        let depth = create_view(
            device,
            "DepthTex",
            size,
            sample_count,
            DEPTH_FORMAT,
            TextureUsages::RENDER_ATTACHMENT,
        );
        let blit_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Blit BG"),
            layout: blit_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&color),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });
        Self {
            width,
            height,
            color,
            msaa,
            depth,
            blit_bg,
        }
    }
}

pub struct GpuState {
    // Surface
    surface: Surface<'static>,
    surface_format: TextureFormat,
    surface_config: SurfaceConfiguration,

    // Device/queue
    device: Device,
    queue: Queue,

    // Pipelines
    mesh_pipeline: RenderPipeline,
    points_pipeline: RenderPipeline,
    blit_pipeline: RenderPipeline,
    object_bgl: BindGroupLayout,
    texture_bgl: BindGroupLayout,

    // Camera
    camera_bg: BindGroup,
    camera_buf: Buffer,

    // Samplers
    map_sampler: Sampler,
    blit_sampler: Sampler,

    // Off-screen target
    sample_count: u32,
    target: RenderTarget,
    logical_size: (u32, u32),
    pixel_ratio: f64,

    resources: SceneResources,
}

impl GpuState {
    /// Create GPU state bound to an Arc<Window>.
    pub async fn new(window: Arc<Window>, options: GpuOptions) -> Result<Self> {
        let PhysicalSize { width, height } = window.inner_size();
        let width = width.max(1);
        let height = height.max(1);

        // Instance & surface
        let instance = Instance::new(InstanceDescriptor {
            backends: options.backends,
            ..Default::default()
        });
        let surface: Surface<'static> = instance
            .create_surface(window.clone())
            .context("create_surface failed")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow!("No suitable GPU adapter"))?;
        log::info!("Using adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: Some("Portal Device"),
                    required_features: Features::empty(),
                    required_limits: Limits::downlevel_webgl2_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .context("request_device failed")?;

        // Surface format (prefer sRGB)
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| anyhow!("Surface reports no formats"))?;
        log::info!("Surface format: {:?}", surface_format);

        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let msaa_supported = adapter
            .get_texture_format_features(TARGET_FORMAT)
            .flags
            .sample_count_supported(MSAA_SAMPLES);
        let sample_count = if options.antialias && msaa_supported {
            MSAA_SAMPLES
        } else {
            1
        };
        log::info!("Scene target: {:?}, {}x MSAA", TARGET_FORMAT, sample_count);

        // ==== Bind group layouts ====
        let camera_bgl = uniform_layout::<CameraUniform>(
            &device,
            "Camera BGL",
            ShaderStages::VERTEX,
        );
        let object_bgl = uniform_layout::<ObjectUniform>(
            &device,
            "Object BGL",
            ShaderStages::VERTEX | ShaderStages::FRAGMENT,
        );
        let texture_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Texture BGL"),
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        // ==== Camera UBO ====
        let camera_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera UBO"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let camera_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera BG"),
            layout: &camera_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buf.as_entire_binding(),
            }],
        });

        // ==== Pipelines ====
        let mesh_shader = shader(&device, "Mesh WGSL", include_str!("shaders/mesh.wgsl"));
        let points_shader = shader(&device, "Points WGSL", include_str!("shaders/points.wgsl"));
        let blit_shader = shader(&device, "Blit WGSL", include_str!("shaders/blit.wgsl"));

        let mesh_pipeline = scene_pipeline(
            &device,
            "Mesh Pipeline",
            &mesh_shader,
            &[&camera_bgl, &object_bgl, &texture_bgl],
            &[Vertex::LAYOUT],
            Some(wgpu::Face::Back),
            sample_count,
        );
        let points_pipeline = scene_pipeline(
            &device,
            "Points Pipeline",
            &points_shader,
            &[&camera_bgl, &object_bgl],
            &[POINT_INSTANCE_LAYOUT],
            None,
            sample_count,
        );
        let blit_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Blit PipelineLayout"),
            bind_group_layouts: &[&texture_bgl],
            push_constant_ranges: &[],
        });
        let blit_pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Blit Pipeline"),
            layout: Some(&blit_layout),
            vertex: VertexState {
                module: &blit_shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module: &blit_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(ColorTargetState {
                    format: surface_format,
                    blend: Some(BlendState::REPLACE),
                    write_mask: ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        // ==== Samplers ====
        let map_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Map Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let blit_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Blit Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let logical_size = (width, height);
        let pixel_ratio = 1.0;
        let target = RenderTarget::new(
            &device,
            drawing_buffer_size(width, height, pixel_ratio),
            sample_count,
            &texture_bgl,
            &blit_sampler,
        );
        let resources = SceneResources::new(&device, &queue, &texture_bgl, &map_sampler);

        Ok(Self {
            surface,
            surface_format,
            surface_config,
            device,
            queue,
            mesh_pipeline,
            points_pipeline,
            blit_pipeline,
            object_bgl,
            texture_bgl,
            camera_bg,
            camera_buf,
            map_sampler,
            blit_sampler,
            sample_count,
            target,
            logical_size,
            pixel_ratio,
            resources,
        })
    }

    #[inline]
    pub fn device(&self) -> &Device {
        &self.device
    }

    #[inline]
    pub fn surface_format(&self) -> TextureFormat {
        self.surface_format
    }

    /// Resize: reconfigure the surface to the window's physical size.
    pub fn resize_surface(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        if (self.surface_config.width, self.surface_config.height) == (width, height) {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Logical (unscaled) size of the scene target.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.logical_size = (width.max(1), height.max(1));
        self.update_target();
    }

    pub fn set_pixel_ratio(&mut self, ratio: f64) {
        self.pixel_ratio = ratio;
        self.update_target();
    }

    fn update_target(&mut self) {
        let (w, h) = self.logical_size;
        let size = drawing_buffer_size(w, h, self.pixel_ratio);
        if size == (self.target.width, self.target.height) {
            return;
        }
        log::debug!("Scene target resized to {}x{}", size.0, size.1);
        self.target = RenderTarget::new(
            &self.device,
            size,
            self.sample_count,
            &self.texture_bgl,
            &self.blit_sampler,
        );
    }

    /// Render one frame: scene into the off-screen target, then present.
    pub fn render(
        &mut self,
        scene: &Scene,
        camera: &PerspectiveCamera,
        mut overlay: Option<&mut dyn Overlay>,
    ) -> Result<(), SurfaceError> {
        self.resources.sync(
            &self.device,
            &self.queue,
            scene,
            &self.texture_bgl,
            &self.map_sampler,
        );
        let draws = scene.drawables();
        self.resources
            .ensure_objects(&self.device, &self.object_bgl, draws.len());

        // --- uniforms
        let cam = CameraUniform {
            view_proj: camera.proj_view().to_cols_array_2d(),
            viewport: [
                camera.aspect,
                self.target.width as f32,
                self.target.height as f32,
                self.pixel_ratio as f32,
            ],
        };
        self.queue
            .write_buffer(&self.camera_buf, 0, bytemuck::bytes_of(&cam));

        let fallback = Material::basic(Color::WHITE);
        let mut maps = Vec::with_capacity(draws.len());
        for (slot, draw) in self.resources.objects.iter().zip(&draws) {
            let material = draw
                .material
                .and_then(|id| scene.material(id).ok())
                .unwrap_or(&fallback);
            let [r, g, b] = material.color().to_linear();
            let params = match material {
                Material::Points {
                    size,
                    size_attenuation,
                    ..
                } => [*size, if *size_attenuation { 1.0 } else { 0.0 }, 0.0, 0.0],
                Material::Basic { .. } => [1.0, 1.0, 0.0, 0.0],
            };
            let uniform = ObjectUniform {
                model: draw.world.to_cols_array_2d(),
                color: [r, g, b, 1.0],
                params,
            };
            self.queue
                .write_buffer(&slot.buffer, 0, bytemuck::bytes_of(&uniform));
            maps.push(material.map());
        }

        // --- frame & passes
        let frame = self.surface.get_current_texture()?;
        let surface_view = frame.texture.create_view(&TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("MainEncoder"),
            });

        {
            let (view, resolve_target) = match &self.target.msaa {
                Some(msaa) => (msaa, Some(&self.target.color)),
                None => (&self.target.color, None),
            };
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("ScenePass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view,
                    resolve_target,
                    ops: Operations {
                        load: LoadOp::Clear(CLEAR_COLOR),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.target.depth,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            rpass.set_bind_group(0, &self.camera_bg, &[]);

            for (i, draw) in draws.iter().enumerate() {
                let object_bg = &self.resources.objects[i].bind_group;
                match self.resources.geometries.get(draw.geometry.0 as usize) {
                    Some(GpuGeometry::Mesh {
                        vertex_buf,
                        index_buf,
                        index_count,
                    }) => {
                        rpass.set_pipeline(&self.mesh_pipeline);
                        rpass.set_bind_group(1, object_bg, &[]);
                        rpass.set_bind_group(2, self.resources.texture_bind_group(maps[i]), &[]);
                        rpass.set_vertex_buffer(0, vertex_buf.slice(..));
                        rpass.set_index_buffer(index_buf.slice(..), wgpu::IndexFormat::Uint32);
                        rpass.draw_indexed(0..*index_count, 0, 0..1);
                    }
                    Some(GpuGeometry::Points {
                        instance_buf,
                        count,
                    }) => {
                        rpass.set_pipeline(&self.points_pipeline);
                        rpass.set_bind_group(1, object_bg, &[]);
                        rpass.set_vertex_buffer(0, instance_buf.slice(..));
                        rpass.draw(0..6, 0..*count);
                    }
                    Some(GpuGeometry::Empty) | None => {}
                }
            }
        }

        let size_in_pixels = [self.surface_config.width, self.surface_config.height];
        if let Some(overlay) = overlay.as_deref_mut() {
            overlay.prepare(&self.device, &self.queue, &mut encoder, size_in_pixels);
        }

        {
            let mut rpass = encoder
                .begin_render_pass(&RenderPassDescriptor {
                    label: Some("PresentPass"),
                    color_attachments: &[Some(RenderPassColorAttachment {
                        view: &surface_view,
                        resolve_target: None,
                        ops: Operations {
                            load: LoadOp::Clear(CLEAR_COLOR),
                            store: StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    occlusion_query_set: None,
                    timestamp_writes: None,
                })
                .forget_lifetime();

            rpass.set_pipeline(&self.blit_pipeline);
            rpass.set_bind_group(0, &self.target.blit_bg, &[]);
            rpass.draw(0..3, 0..1);

            if let Some(overlay) = overlay.as_deref_mut() {
                overlay.paint(&mut rpass);
            }
        }

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    pub fn is_surface_lost(err: &SurfaceError) -> bool {
        matches!(err, SurfaceError::Lost | SurfaceError::Outdated)
    }

    pub fn recreate_surface(&mut self) {
        self.surface.configure(&self.device, &self.surface_config);
    }
}

fn shader(device: &Device, label: &str, source: &str) -> ShaderModule {
    device.create_shader_module(ShaderModuleDescriptor {
        label: Some(label),
        source: ShaderSource::Wgsl(source.into()),
    })
}

fn uniform_layout<T>(device: &Device, label: &str, visibility: ShaderStages) -> BindGroupLayout {
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[BindGroupLayoutEntry {
            binding: 0,
            visibility,
            ty: BindingType::Buffer {
                ty: BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: NonZeroU64::new(std::mem::size_of::<T>() as u64),
            },
            count: None,
        }],
    })
}

fn scene_pipeline(
    device: &Device,
    label: &str,
    module: &ShaderModule,
    bind_group_layouts: &[&BindGroupLayout],
    buffers: &[VertexBufferLayout<'_>],
    cull_mode: Option<wgpu::Face>,
    sample_count: u32,
) -> RenderPipeline {
    let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts,
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: VertexState {
            module,
            entry_point: Some("vs_main"),
            buffers,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(FragmentState {
            module,
            entry_point: Some("fs_main"),
            targets: &[Some(ColorTargetState {
                format: TARGET_FORMAT,
                blend: Some(BlendState::REPLACE),
                write_mask: ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            cull_mode,
            ..Default::default()
        },
        depth_stencil: Some(DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: sample_count,
            ..Default::default()
        },
        multiview: None,
        cache: None,
    })
}

fn create_view(
    device: &Device,
    label: &str,
    size: Extent3d,
    sample_count: u32,
    format: TextureFormat,
    usage: TextureUsages,
) -> TextureView {
    let tex = device.create_texture(&TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count,
        dimension: TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    });
    tex.create_view(&TextureViewDescriptor::default())
}
