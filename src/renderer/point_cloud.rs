use wgpu::util::DeviceExt;

use crate::error::GpuError;
use crate::renderer::gpu::check_buffer_size;
use crate::scene::Marker;

/// Corners of the screen-aligned quad each marker is expanded into.
pub const MARKER_QUAD_VERTICES: u32 = 6;

/// One instance per mesh point, drawn as a sphere impostor.
pub struct MarkerBuffer {
    buffer: wgpu::Buffer,
    count: u32,
}

impl MarkerBuffer {
    pub fn new(device: &wgpu::Device, markers: &[Marker]) -> Result<Self, GpuError> {
        check_buffer_size(
            "Markers",
            std::mem::size_of_val(markers) as u64,
            device.limits().max_buffer_size,
        )?;

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Marker Instance Buffer"),
            contents: bytemuck::cast_slice(markers),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Ok(Self {
            buffer,
            count: markers.len() as u32,
        })
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

pub fn marker_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Marker>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        }],
    }
}
