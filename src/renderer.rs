use std::collections::HashMap;
use std::sync::Arc;

use bytemuck::Zeroable;
use glam::Vec3;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::geometry::{LineVertex, Vertex};
use crate::loaders::texture::{TextureData, TextureHandle};
use crate::scene::{Material, NodeKind, Scene};
use crate::state::AppState;
use crate::types::{
    BackgroundUniform, FrameUniform, ObjectUniform, OBJECT_FLAG_NORMAL_MAP, OBJECT_FLAG_UNLIT,
};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Uploaded mesh geometry, shared between nodes that share CPU geometry
/// (the star field is 200 nodes over one buffer pair).
struct GpuGeometry {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

struct GpuLineSet {
    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,
}

/// Tracks an asynchronous texture so a newly resolved image is uploaded
/// exactly once; until then the placeholder stays bound.
struct TextureSlot {
    handle: Option<TextureHandle>,
    uploaded: bool,
}

impl TextureSlot {
    fn new(handle: Option<&TextureHandle>) -> Self {
        Self {
            handle: handle.cloned(),
            uploaded: false,
        }
    }

    fn take_newly_resolved(&mut self) -> Option<Arc<TextureData>> {
        if self.uploaded {
            return None;
        }
        let data = self.handle.as_ref()?.get()?;
        self.uploaded = true;
        Some(data)
    }
}

struct MeshNode {
    geometry: Arc<GpuGeometry>,
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    base: TextureSlot,
    base_view: wgpu::TextureView,
    normal: TextureSlot,
    normal_view: wgpu::TextureView,
    color: [f32; 3],
    flags: u32,
}

struct LinesNode {
    lines: Arc<GpuLineSet>,
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// GPU state per scene node, index-aligned with the scene's node list.
enum GpuNode {
    Mesh(MeshNode),
    Lines(LinesNode),
    Light,
}

struct BackgroundGpu {
    slot: TextureSlot,
    view: wgpu::TextureView,
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

struct EguiOverlay {
    ctx: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
}

/// Forward renderer for the scene: background, meshes, helper lines, and an
/// optional FPS overlay. The scene's geometry is uploaded once at creation;
/// per-frame work is uniform writes plus uploads for textures that resolved
/// since the last frame.
pub struct Renderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    depth_view: wgpu::TextureView,

    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,

    mesh_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    background_pipeline: wgpu::RenderPipeline,

    object_layout: wgpu::BindGroupLayout,
    background_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,

    background: Option<BackgroundGpu>,
    nodes: Vec<GpuNode>,

    egui: Option<EguiOverlay>,
}

impl Renderer {
    pub async fn new(window: Arc<Window>, scene: &Scene, no_ui: bool) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;
        let adapter = Self::request_adapter(&instance, &surface).await?;
        let (device, queue) = Self::request_device(&adapter).await?;

        let surface_config = Self::create_surface_config(&surface, &adapter, size);
        surface.configure(&device, &surface_config);

        let depth_view = Self::create_depth_texture(&device, size);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Map Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let placeholder_white =
            create_solid_texture(&device, &queue, [255, 255, 255, 255], true, "White Placeholder");
        let placeholder_normal =
            create_solid_texture(&device, &queue, [128, 128, 255, 255], false, "Flat Normal");
        let placeholder_black =
            create_solid_texture(&device, &queue, [0, 0, 0, 255], true, "Black Placeholder");

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Object Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let line_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Line Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let background_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Background Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let frame_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Frame Buffer"),
            contents: bytemuck::cast_slice(&[FrameUniform::zeroed()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let mesh_pipeline = Self::create_mesh_pipeline(
            &device,
            surface_config.format,
            &frame_layout,
            &object_layout,
        );
        let line_pipeline =
            Self::create_line_pipeline(&device, surface_config.format, &frame_layout, &line_layout);
        let background_pipeline =
            Self::create_background_pipeline(&device, surface_config.format, &background_layout);

        let nodes = Self::upload_scene(
            &device,
            scene,
            &object_layout,
            &line_layout,
            &sampler,
            &placeholder_white,
            &placeholder_normal,
        );

        let background = scene.background.as_ref().map(|bg| {
            let uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Background Uniform"),
                contents: bytemuck::cast_slice(&[BackgroundUniform {
                    intensity: bg.intensity,
                    _pad: [0.0; 3],
                }]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
            let bind_group = create_background_bind_group(
                &device,
                &background_layout,
                &placeholder_black,
                &sampler,
                &uniform,
            );
            BackgroundGpu {
                slot: TextureSlot::new(Some(&bg.texture)),
                view: placeholder_black.clone(),
                uniform,
                bind_group,
            }
        });

        let egui = if no_ui {
            None
        } else {
            let ctx = egui::Context::default();
            let state = egui_winit::State::new(
                ctx.clone(),
                egui::ViewportId::ROOT,
                &window,
                Some(window.scale_factor() as f32),
                None,
                None,
            );
            let renderer = egui_wgpu::Renderer::new(
                &device,
                surface_config.format,
                egui_wgpu::RendererOptions::default(),
            );
            Some(EguiOverlay {
                ctx,
                state,
                renderer,
            })
        };

        println!("Scene uploaded: {} nodes", scene.len());

        Ok(Self {
            device,
            queue,
            surface,
            surface_config,
            size,
            depth_view,
            frame_buffer,
            frame_bind_group,
            mesh_pipeline,
            line_pipeline,
            background_pipeline,
            object_layout,
            background_layout,
            sampler,
            background,
            nodes,
            egui,
        })
    }

    async fn request_adapter(
        instance: &wgpu::Instance,
        surface: &wgpu::Surface<'_>,
    ) -> Result<wgpu::Adapter> {
        instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| "Failed to find appropriate adapter".into())
    }

    async fn request_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue)> {
        adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                experimental_features: Default::default(),
                trace: Default::default(),
            })
            .await
            .map_err(|e| e.into())
    }

    fn create_surface_config(
        surface: &wgpu::Surface,
        adapter: &wgpu::Adapter,
        size: winit::dpi::PhysicalSize<u32>,
    ) -> wgpu::SurfaceConfiguration {
        let surface_caps = surface.get_capabilities(adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        }
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        size: winit::dpi::PhysicalSize<u32>,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn create_mesh_pipeline(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        frame_layout: &wgpu::BindGroupLayout,
        object_layout: &wgpu::BindGroupLayout,
    ) -> wgpu::RenderPipeline {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("scene.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[frame_layout, object_layout],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Mesh Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }

    fn create_line_pipeline(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        frame_layout: &wgpu::BindGroupLayout,
        line_layout: &wgpu::BindGroupLayout,
    ) -> wgpu::RenderPipeline {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Line Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("lines.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Line Pipeline Layout"),
            bind_group_layouts: &[frame_layout, line_layout],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Line Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[LineVertex::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }

    fn create_background_pipeline(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        background_layout: &wgpu::BindGroupLayout,
    ) -> wgpu::RenderPipeline {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Background Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("background.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Background Pipeline Layout"),
            bind_group_layouts: &[background_layout],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Background Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }

    /// Upload every scene node once. Geometry shared through an `Arc` on the
    /// CPU side is uploaded a single time and shared on the GPU side too.
    fn upload_scene(
        device: &wgpu::Device,
        scene: &Scene,
        object_layout: &wgpu::BindGroupLayout,
        line_layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        placeholder_white: &wgpu::TextureView,
        placeholder_normal: &wgpu::TextureView,
    ) -> Vec<GpuNode> {
        let mut geometry_cache: HashMap<usize, Arc<GpuGeometry>> = HashMap::new();
        let mut line_cache: HashMap<usize, Arc<GpuLineSet>> = HashMap::new();

        scene
            .iter()
            .map(|node| match &node.kind {
                NodeKind::Mesh(mesh) => {
                    let key = Arc::as_ptr(&mesh.geometry) as usize;
                    let geometry = Arc::clone(geometry_cache.entry(key).or_insert_with(|| {
                        Arc::new(GpuGeometry {
                            vertex_buffer: device.create_buffer_init(
                                &wgpu::util::BufferInitDescriptor {
                                    label: Some("Mesh Vertex Buffer"),
                                    contents: bytemuck::cast_slice(&mesh.geometry.vertices),
                                    usage: wgpu::BufferUsages::VERTEX,
                                },
                            ),
                            index_buffer: device.create_buffer_init(
                                &wgpu::util::BufferInitDescriptor {
                                    label: Some("Mesh Index Buffer"),
                                    contents: bytemuck::cast_slice(&mesh.geometry.indices),
                                    usage: wgpu::BufferUsages::INDEX,
                                },
                            ),
                            index_count: mesh.geometry.indices.len() as u32,
                        })
                    }));

                    let color = mesh.material.color();
                    let flags = material_flags(&mesh.material);
                    let uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Object Uniform"),
                        contents: bytemuck::cast_slice(&[ObjectUniform {
                            model: node.transform.matrix().to_cols_array_2d(),
                            color,
                            flags,
                        }]),
                        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    });

                    let base_view = placeholder_white.clone();
                    let normal_view = placeholder_normal.clone();
                    let bind_group = create_mesh_bind_group(
                        device,
                        object_layout,
                        &uniform,
                        &base_view,
                        &normal_view,
                        sampler,
                    );

                    GpuNode::Mesh(MeshNode {
                        geometry,
                        uniform,
                        bind_group,
                        base: TextureSlot::new(mesh.material.map()),
                        base_view,
                        normal: TextureSlot::new(mesh.material.normal_map()),
                        normal_view,
                        color,
                        flags,
                    })
                }
                NodeKind::Lines(data) => {
                    let key = Arc::as_ptr(data) as usize;
                    let lines = Arc::clone(line_cache.entry(key).or_insert_with(|| {
                        Arc::new(GpuLineSet {
                            vertex_buffer: device.create_buffer_init(
                                &wgpu::util::BufferInitDescriptor {
                                    label: Some("Line Vertex Buffer"),
                                    contents: bytemuck::cast_slice(&data.vertices),
                                    usage: wgpu::BufferUsages::VERTEX,
                                },
                            ),
                            vertex_count: data.vertices.len() as u32,
                        })
                    }));

                    let uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Line Uniform"),
                        contents: bytemuck::cast_slice(&[ObjectUniform {
                            model: node.transform.matrix().to_cols_array_2d(),
                            color: [1.0, 1.0, 1.0],
                            flags: 0,
                        }]),
                        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    });
                    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                        label: Some("Line Bind Group"),
                        layout: line_layout,
                        entries: &[wgpu::BindGroupEntry {
                            binding: 0,
                            resource: uniform.as_entire_binding(),
                        }],
                    });

                    GpuNode::Lines(LinesNode {
                        lines,
                        uniform,
                        bind_group,
                    })
                }
                NodeKind::PointLight(_) | NodeKind::AmbientLight(_) => GpuNode::Light,
            })
            .collect()
    }

    /// Upload any textures whose decode resolved since the last frame and
    /// rebind the affected objects.
    fn poll_textures(&mut self) {
        let device = &self.device;
        let queue = &self.queue;
        let object_layout = &self.object_layout;
        let background_layout = &self.background_layout;
        let sampler = &self.sampler;

        for node in &mut self.nodes {
            if let GpuNode::Mesh(mesh) = node {
                let mut rebind = false;
                if let Some(data) = mesh.base.take_newly_resolved() {
                    mesh.base_view = create_image_texture(device, queue, &data, true, "Base Map");
                    rebind = true;
                }
                if let Some(data) = mesh.normal.take_newly_resolved() {
                    mesh.normal_view =
                        create_image_texture(device, queue, &data, false, "Normal Map");
                    rebind = true;
                }
                if rebind {
                    mesh.bind_group = create_mesh_bind_group(
                        device,
                        object_layout,
                        &mesh.uniform,
                        &mesh.base_view,
                        &mesh.normal_view,
                        sampler,
                    );
                }
            }
        }

        if let Some(bg) = &mut self.background {
            if let Some(data) = bg.slot.take_newly_resolved() {
                bg.view = create_image_texture(device, queue, &data, true, "Background Texture");
                bg.bind_group = create_background_bind_group(
                    device,
                    background_layout,
                    &bg.view,
                    sampler,
                    &bg.uniform,
                );
            }
        }
    }

    fn write_uniforms(&self, state: &AppState) {
        let camera = &state.camera;
        let (light_position, light_color, light_intensity) = state
            .scene
            .point_light()
            .map(|(transform, light)| (transform.position, light.color, light.intensity))
            .unwrap_or((Vec3::ZERO, [0.0; 3], 0.0));
        let (ambient_color, ambient_intensity) = state
            .scene
            .ambient_light()
            .map(|light| (light.color, light.intensity))
            .unwrap_or(([0.0; 3], 0.0));

        let frame = FrameUniform {
            view_proj: camera.view_projection().to_cols_array_2d(),
            camera_position: camera.position.to_array(),
            _pad0: 0.0,
            light_position: light_position.to_array(),
            _pad1: 0.0,
            light_color,
            light_intensity,
            ambient_color,
            ambient_intensity,
        };
        self.queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::cast_slice(&[frame]));

        for (node, gpu) in state.scene.iter().zip(&self.nodes) {
            let model = node.transform.matrix().to_cols_array_2d();
            match gpu {
                GpuNode::Mesh(mesh) => {
                    let uniform = ObjectUniform {
                        model,
                        color: mesh.color,
                        flags: mesh.flags,
                    };
                    self.queue
                        .write_buffer(&mesh.uniform, 0, bytemuck::cast_slice(&[uniform]));
                }
                GpuNode::Lines(lines) => {
                    let uniform = ObjectUniform {
                        model,
                        color: [1.0, 1.0, 1.0],
                        flags: 0,
                    };
                    self.queue
                        .write_buffer(&lines.uniform, 0, bytemuck::cast_slice(&[uniform]));
                }
                GpuNode::Light => {}
            }
        }
    }

    pub fn render(
        &mut self,
        state: &AppState,
        window: &Window,
        fps: f32,
    ) -> std::result::Result<(), wgpu::SurfaceError> {
        self.poll_textures();
        self.write_uniforms(state);

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some(bg) = &self.background {
                render_pass.set_pipeline(&self.background_pipeline);
                render_pass.set_bind_group(0, &bg.bind_group, &[]);
                render_pass.draw(0..3, 0..1);
            }

            render_pass.set_pipeline(&self.mesh_pipeline);
            render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
            for gpu in &self.nodes {
                if let GpuNode::Mesh(mesh) = gpu {
                    render_pass.set_bind_group(1, &mesh.bind_group, &[]);
                    render_pass.set_vertex_buffer(0, mesh.geometry.vertex_buffer.slice(..));
                    render_pass.set_index_buffer(
                        mesh.geometry.index_buffer.slice(..),
                        wgpu::IndexFormat::Uint32,
                    );
                    render_pass.draw_indexed(0..mesh.geometry.index_count, 0, 0..1);
                }
            }

            render_pass.set_pipeline(&self.line_pipeline);
            render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
            for gpu in &self.nodes {
                if let GpuNode::Lines(lines) = gpu {
                    render_pass.set_bind_group(1, &lines.bind_group, &[]);
                    render_pass.set_vertex_buffer(0, lines.lines.vertex_buffer.slice(..));
                    render_pass.draw(0..lines.lines.vertex_count, 0..1);
                }
            }
        }

        if let Some(egui) = &mut self.egui {
            let raw_input = egui.state.take_egui_input(window);
            let full_output = egui.ctx.run(raw_input, |ctx| {
                egui::Window::new("FPS")
                    .title_bar(false)
                    .resizable(false)
                    .fixed_pos(egui::pos2(10.0, 10.0))
                    .frame(egui::Frame::NONE)
                    .show(ctx, |ui| {
                        ui.label(
                            egui::RichText::new(format!("{:.0}", fps))
                                .size(48.0)
                                .color(egui::Color32::from_rgb(74, 158, 255)),
                        );
                        ui.label(
                            egui::RichText::new("FPS")
                                .size(12.0)
                                .color(egui::Color32::GRAY),
                        );
                    });
            });

            egui.state
                .handle_platform_output(window, full_output.platform_output);

            let tris = egui
                .ctx
                .tessellate(full_output.shapes, egui.ctx.pixels_per_point());
            for (id, image_delta) in &full_output.textures_delta.set {
                egui.renderer
                    .update_texture(&self.device, &self.queue, *id, image_delta);
            }

            let screen_descriptor = egui_wgpu::ScreenDescriptor {
                size_in_pixels: [self.size.width, self.size.height],
                pixels_per_point: window.scale_factor() as f32,
            };

            egui.renderer.update_buffers(
                &self.device,
                &self.queue,
                &mut encoder,
                &tris,
                &screen_descriptor,
            );

            {
                let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });

                // SAFETY: The render pass lifetime is actually tied to the
                // encoder, but egui-wgpu requires 'static. This is safe
                // because we drop the render pass before using the encoder
                // again.
                let render_pass_static = unsafe {
                    std::mem::transmute::<&mut wgpu::RenderPass<'_>, &mut wgpu::RenderPass<'static>>(
                        &mut render_pass,
                    )
                };

                egui.renderer
                    .render(render_pass_static, &tris, &screen_descriptor);
            }

            for id in &full_output.textures_delta.free {
                egui.renderer.free_texture(id);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.surface_config.width = new_size.width;
        self.surface_config.height = new_size.height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = Self::create_depth_texture(&self.device, new_size);
    }

    /// Reconfigure with the current size after a Lost/Outdated surface.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Let egui see the event first; returns true when it consumed it.
    pub fn handle_event(&mut self, window: &Window, event: &winit::event::WindowEvent) -> bool {
        match &mut self.egui {
            Some(egui) => egui.state.on_window_event(window, event).consumed,
            None => false,
        }
    }
}

fn material_flags(material: &Material) -> u32 {
    let mut flags = 0;
    if material.is_unlit() {
        flags |= OBJECT_FLAG_UNLIT;
    }
    if material.normal_map().is_some() {
        flags |= OBJECT_FLAG_NORMAL_MAP;
    }
    flags
}

fn create_mesh_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniform: &wgpu::Buffer,
    base_view: &wgpu::TextureView,
    normal_view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Object Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(base_view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(normal_view),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

fn create_background_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
    uniform: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Background Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: uniform.as_entire_binding(),
            },
        ],
    })
}

fn create_image_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    data: &TextureData,
    srgb: bool,
    label: &str,
) -> wgpu::TextureView {
    let format = if srgb {
        wgpu::TextureFormat::Rgba8UnormSrgb
    } else {
        wgpu::TextureFormat::Rgba8Unorm
    };

    let texture = device.create_texture(&wgpu::TextureDescriptor {
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
    });

    queue.write_texture(
        texture.as_image_copy(),
        &data.pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * data.width),
            rows_per_image: Some(data.height),
        },
        wgpu::Extent3d {
            width: data.width,
            height: data.height,
            depth_or_array_layers: 1,
        },
    );

    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_solid_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    pixel: [u8; 4],
    srgb: bool,
    label: &str,
) -> wgpu::TextureView {
    create_image_texture(
        device,
        queue,
        &TextureData {
            width: 1,
            height: 1,
            pixels: pixel.to_vec(),
        },
        srgb,
        label,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn material_flags_combine() {
        let unlit = Material::Basic {
            color: [1.0; 3],
            map: None,
        };
        assert_eq!(material_flags(&unlit), OBJECT_FLAG_UNLIT);

        let lit_plain = Material::Standard {
            color: [1.0; 3],
            map: None,
            normal_map: None,
        };
        assert_eq!(material_flags(&lit_plain), 0);

        let lit_mapped = Material::Standard {
            color: [1.0; 3],
            map: None,
            normal_map: Some(TextureHandle::from_data(TextureData {
                width: 1,
                height: 1,
                pixels: vec![128, 128, 255, 255],
            })),
        };
        assert_eq!(material_flags(&lit_mapped), OBJECT_FLAG_NORMAL_MAP);
    }

    #[test]
    fn texture_slot_resolves_once() {
        let handle = TextureHandle::from_data(TextureData {
            width: 2,
            height: 2,
            pixels: vec![0; 16],
        });
        let mut slot = TextureSlot::new(Some(&handle));

        assert!(slot.take_newly_resolved().is_some());
        assert!(slot.take_newly_resolved().is_none());
    }

    #[test]
    fn empty_texture_slot_never_resolves() {
        let mut slot = TextureSlot::new(None);
        assert!(slot.take_newly_resolved().is_none());
    }
}
