use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed PLY data: {0}")]
    Parse(#[source] std::io::Error),

    #[error("PLY file has no `{0}` element")]
    MissingElement(&'static str),

    #[error("{element} {index} has no usable `{property}` property")]
    MissingProperty {
        element: &'static str,
        index: usize,
        property: &'static str,
    },

    #[error("{element} {index} references point {point}, but the mesh has {point_count} points")]
    IndexOutOfRange {
        element: &'static str,
        index: usize,
        point: i64,
        point_count: usize,
    },

    #[error("mesh has no points")]
    Empty,

    #[error("cannot highlight cell {cell}: the mesh has {cell_count} cells")]
    CellOutOfRange { cell: usize, cell_count: usize },
}

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("failed to create a drawing surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no compatible GPU adapter found")]
    NoAdapter,

    #[error("failed to open the GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported texture formats")]
    NoSurfaceFormat,

    #[error("{layer} needs a {bytes}-byte GPU buffer, but the device allows at most {limit} bytes")]
    MeshTooLarge {
        layer: &'static str,
        bytes: u64,
        limit: u64,
    },
}
