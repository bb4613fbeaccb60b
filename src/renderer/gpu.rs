use std::sync::Arc;

use glam::Vec2;
use log::{debug, info};
use wgpu::util::DeviceExt;

use crate::error::GpuError;
use crate::renderer::camera::{Camera, CameraUniform};
use crate::renderer::point_cloud::{MARKER_QUAD_VERTICES, MarkerBuffer, marker_layout};
use crate::scene::{LayerGeometry, LayerStyle, MarkerStyle, Scene, SceneStyle, Segment, SurfaceVertex};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const EDGE_QUAD_VERTICES: u32 = 6;
const BACKGROUND: wgpu::Color = wgpu::Color {
    r: 0.3,
    g: 0.3,
    b: 0.3,
    a: 1.0,
};

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StyleUniform {
    pub color: [f32; 4],
    pub edge_color: [f32; 4],
    pub params: [f32; 4],
}

impl StyleUniform {
    fn layer(style: &LayerStyle) -> Self {
        Self {
            color: style.color,
            edge_color: style.edge_color,
            params: [style.line_width, 0.0, 0.0, 0.0],
        }
    }

    fn markers(style: &MarkerStyle) -> Self {
        Self {
            color: style.color,
            edge_color: style.color,
            params: [0.0, style.size, 0.0, 0.0],
        }
    }
}

struct StyleBinding {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl StyleBinding {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, label: &str) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: std::mem::size_of::<StyleUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        Self { buffer, bind_group }
    }

    fn write(&self, queue: &wgpu::Queue, uniform: StyleUniform) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[uniform]));
    }
}

/// Triangles and edge segments of one scene layer.
pub struct LayerBuffers {
    triangle_buffer: wgpu::Buffer,
    triangle_vertex_count: u32,
    edge_buffer: wgpu::Buffer,
    edge_count: u32,
}

/// Fails when `bytes` would not fit in one buffer of a device whose
/// `max_buffer_size` is `limit`.
pub fn check_buffer_size(layer: &'static str, bytes: u64, limit: u64) -> Result<(), GpuError> {
    if bytes > limit {
        return Err(GpuError::MeshTooLarge { layer, bytes, limit });
    }
    Ok(())
}

impl LayerBuffers {
    fn new(device: &wgpu::Device, name: &'static str, geometry: &LayerGeometry) -> Result<Self, GpuError> {
        let limit = device.limits().max_buffer_size;
        check_buffer_size(name, std::mem::size_of_val(geometry.triangles.as_slice()) as u64, limit)?;
        check_buffer_size(name, std::mem::size_of_val(geometry.edges.as_slice()) as u64, limit)?;

        let triangle_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Triangle Buffer")),
            contents: bytemuck::cast_slice(&geometry.triangles),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let edge_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Edge Buffer")),
            contents: bytemuck::cast_slice(&geometry.edges),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Ok(Self {
            triangle_buffer,
            triangle_vertex_count: geometry.triangles.len() as u32,
            edge_buffer,
            edge_count: geometry.edges.len() as u32,
        })
    }
}

pub struct GpuState {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,

    pipeline_surface: wgpu::RenderPipeline,
    pipeline_surface_translucent: wgpu::RenderPipeline,
    pipeline_edges: wgpu::RenderPipeline,
    pipeline_markers: wgpu::RenderPipeline,

    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,

    mesh_style: StyleBinding,
    highlight_style: StyleBinding,
    marker_style: StyleBinding,

    base: LayerBuffers,
    highlight: LayerBuffers,
    markers: MarkerBuffer,

    depth_texture: wgpu::TextureView,
}

fn surface_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<SurfaceVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
        ],
    }
}

fn segment_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Segment>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
        ],
    }
}

fn uniform_layout_entry() -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

struct PipelineDesc<'a> {
    label: &'a str,
    vs: &'a str,
    fs: &'a str,
    buffers: &'a [wgpu::VertexBufferLayout<'a>],
    depth_write: bool,
    bias: wgpu::DepthBiasState,
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    desc: PipelineDesc,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(desc.label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some(desc.vs),
            buffers: desc.buffers,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(desc.fs),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
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
            depth_write_enabled: desc.depth_write,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: desc.bias,
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

impl GpuState {
    pub async fn new(window: Arc<winit::window::Window>, scene: &Scene, vsync: bool) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        info!("using {} ({:?})", adapter_info.name, adapter_info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter.limits(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(GpuError::NoSurfaceFormat)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: present_mode(vsync),
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        debug!("surface configured: {:?} {}x{}", config.format, config.width, config.height);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders.wgsl").into()),
        });

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Camera Bind Group Layout"),
                entries: &[uniform_layout_entry()],
            });

        let style_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Style Bind Group Layout"),
                entries: &[uniform_layout_entry()],
            });

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera Buffer"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let mesh_style = StyleBinding::new(&device, &style_bind_group_layout, "Mesh Style");
        let highlight_style =
            StyleBinding::new(&device, &style_bind_group_layout, "Highlight Style");
        let marker_style = StyleBinding::new(&device, &style_bind_group_layout, "Marker Style");

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&camera_bind_group_layout, &style_bind_group_layout],
            push_constant_ranges: &[],
        });

        // Surfaces sit slightly behind their own edges and markers.
        let surface_bias = wgpu::DepthBiasState {
            constant: 2,
            slope_scale: 1.0,
            clamp: 0.0,
        };

        let pipeline_surface = create_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            config.format,
            PipelineDesc {
                label: "Surface Render Pipeline",
                vs: "vs_surface_main",
                fs: "fs_surface_main",
                buffers: &[surface_vertex_layout()],
                depth_write: true,
                bias: surface_bias,
            },
        );

        let pipeline_surface_translucent = create_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            config.format,
            PipelineDesc {
                label: "Translucent Surface Render Pipeline",
                vs: "vs_surface_main",
                fs: "fs_surface_main",
                buffers: &[surface_vertex_layout()],
                depth_write: false,
                bias: surface_bias,
            },
        );

        let pipeline_edges = create_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            config.format,
            PipelineDesc {
                label: "Edge Render Pipeline",
                vs: "vs_edge_main",
                fs: "fs_edge_main",
                buffers: &[segment_layout()],
                depth_write: true,
                bias: wgpu::DepthBiasState::default(),
            },
        );

        let pipeline_markers = create_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            config.format,
            PipelineDesc {
                label: "Marker Render Pipeline",
                vs: "vs_marker_main",
                fs: "fs_marker_main",
                buffers: &[marker_layout()],
                depth_write: true,
                bias: wgpu::DepthBiasState::default(),
            },
        );

        let base = LayerBuffers::new(&device, "Base", &scene.base)?;
        let highlight = LayerBuffers::new(&device, "Highlight", &scene.highlight)?;
        let markers = MarkerBuffer::new(&device, &scene.markers)?;
        let depth_texture = Self::create_depth_texture(&device, &config);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            pipeline_surface,
            pipeline_surface_translucent,
            pipeline_edges,
            pipeline_markers,
            camera_buffer,
            camera_bind_group,
            mesh_style,
            highlight_style,
            marker_style,
            base,
            highlight,
            markers,
            depth_texture,
        })
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
    ) -> wgpu::TextureView {
        let size = wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_texture = Self::create_depth_texture(&self.device, &self.config);
        }
    }

    pub fn viewport(&self) -> Vec2 {
        Vec2::new(self.config.width as f32, self.config.height as f32)
    }

    pub fn update_camera(&self, camera: &Camera) {
        let uniform = CameraUniform::from_camera(camera, self.viewport());
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[uniform]));
    }

    pub fn update_style(&self, style: &SceneStyle) {
        self.mesh_style.write(&self.queue, StyleUniform::layer(&style.mesh));
        self.highlight_style
            .write(&self.queue, StyleUniform::layer(&style.highlight));
        self.marker_style
            .write(&self.queue, StyleUniform::markers(&style.markers));
    }

    pub fn set_vsync(&mut self, enabled: bool) {
        self.config.present_mode = present_mode(enabled);
        self.surface.configure(&self.device, &self.config);
    }

    /// Draws every visible layer. A translucent base mesh is drawn last,
    /// without depth writes, so the layers behind it stay visible.
    pub fn render_scene(
        &self,
        view: &wgpu::TextureView,
        encoder: &mut wgpu::CommandEncoder,
        style: &SceneStyle,
    ) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(BACKGROUND),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_texture,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_bind_group(0, &self.camera_bind_group, &[]);

        let translucent = style.mesh.color[3] < 1.0;
        let draw_base_surface = style.mesh.visible && self.base.triangle_vertex_count > 0;

        if draw_base_surface && !translucent {
            render_pass.set_pipeline(&self.pipeline_surface);
            render_pass.set_bind_group(1, &self.mesh_style.bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.base.triangle_buffer.slice(..));
            render_pass.draw(0..self.base.triangle_vertex_count, 0..1);
        }

        if style.highlight.visible && self.highlight.triangle_vertex_count > 0 {
            render_pass.set_pipeline(&self.pipeline_surface);
            render_pass.set_bind_group(1, &self.highlight_style.bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.highlight.triangle_buffer.slice(..));
            render_pass.draw(0..self.highlight.triangle_vertex_count, 0..1);
        }

        render_pass.set_pipeline(&self.pipeline_edges);
        if style.mesh.visible && style.mesh.show_edges && self.base.edge_count > 0 {
            render_pass.set_bind_group(1, &self.mesh_style.bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.base.edge_buffer.slice(..));
            render_pass.draw(0..EDGE_QUAD_VERTICES, 0..self.base.edge_count);
        }
        if style.highlight.visible && style.highlight.show_edges && self.highlight.edge_count > 0 {
            render_pass.set_bind_group(1, &self.highlight_style.bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.highlight.edge_buffer.slice(..));
            render_pass.draw(0..EDGE_QUAD_VERTICES, 0..self.highlight.edge_count);
        }

        if style.markers.visible && self.markers.count() > 0 {
            render_pass.set_pipeline(&self.pipeline_markers);
            render_pass.set_bind_group(1, &self.marker_style.bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.markers.buffer().slice(..));
            render_pass.draw(0..MARKER_QUAD_VERTICES, 0..self.markers.count());
        }

        if draw_base_surface && translucent {
            render_pass.set_pipeline(&self.pipeline_surface_translucent);
            render_pass.set_bind_group(1, &self.mesh_style.bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.base.triangle_buffer.slice(..));
            render_pass.draw(0..self.base.triangle_vertex_count, 0..1);
        }
    }
}

fn present_mode(vsync: bool) -> wgpu::PresentMode {
    if vsync {
        wgpu::PresentMode::AutoVsync
    } else {
        wgpu::PresentMode::AutoNoVsync
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_MAX_BUFFER: u64 = 256 << 20;

    #[test]
    fn buffer_within_limit_is_accepted() {
        assert!(check_buffer_size("Base", 0, DEFAULT_MAX_BUFFER).is_ok());
        assert!(check_buffer_size("Base", DEFAULT_MAX_BUFFER, DEFAULT_MAX_BUFFER).is_ok());
    }

    #[test]
    fn large_triangle_layer_is_rejected() {
        let triangles = 3_800_000u64;
        let bytes = triangles * 3 * std::mem::size_of::<SurfaceVertex>() as u64;

        match check_buffer_size("Base", bytes, DEFAULT_MAX_BUFFER) {
            Err(GpuError::MeshTooLarge { layer, bytes: reported, limit }) => {
                assert_eq!(layer, "Base");
                assert_eq!(reported, bytes);
                assert_eq!(limit, DEFAULT_MAX_BUFFER);
            }
            other => panic!("expected MeshTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn shader_module_validates() {
        let module = naga::front::wgsl::parse_str(include_str!("shaders.wgsl"))
            .unwrap_or_else(|e| panic!("{}", e.emit_to_string(include_str!("shaders.wgsl"))));
        naga::valid::Validator::new(naga::valid::ValidationFlags::all(), naga::valid::Capabilities::empty())
            .validate(&module)
            .unwrap();

        let entry_points: Vec<_> = module.entry_points.iter().map(|ep| ep.name.as_str()).collect();
        for name in [
            "vs_surface_main",
            "fs_surface_main",
            "vs_edge_main",
            "fs_edge_main",
            "vs_marker_main",
            "fs_marker_main",
        ] {
            assert!(entry_points.contains(&name), "missing entry point {name}");
        }
    }
}
