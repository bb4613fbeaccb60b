use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use log::debug;

use crate::error::MeshError;
use crate::mesh::{Bounds, Mesh};

pub const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
pub const BLACK: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
pub const PINK: [f32; 4] = [1.0, 0.753, 0.796, 1.0];
pub const BLUE: [f32; 4] = [0.0, 0.0, 1.0, 1.0];
pub const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SurfaceVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Segment {
    pub start: [f32; 3],
    pub end: [f32; 3],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Marker {
    pub position: [f32; 3],
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerStyle {
    pub visible: bool,
    pub color: [f32; 4],
    pub show_edges: bool,
    pub edge_color: [f32; 4],
    pub line_width: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarkerStyle {
    pub visible: bool,
    pub color: [f32; 4],
    pub size: f32,
    pub labels: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneStyle {
    pub mesh: LayerStyle,
    pub highlight: LayerStyle,
    pub markers: MarkerStyle,
}

impl Default for SceneStyle {
    fn default() -> Self {
        Self {
            mesh: LayerStyle {
                visible: true,
                color: WHITE,
                show_edges: true,
                edge_color: BLACK,
                line_width: 1.0,
            },
            highlight: LayerStyle {
                visible: true,
                color: PINK,
                show_edges: true,
                edge_color: BLUE,
                line_width: 5.0,
            },
            markers: MarkerStyle {
                visible: true,
                color: RED,
                size: 10.0,
                labels: false,
            },
        }
    }
}

/// Geometry for one polygonal layer, ready for upload.
#[derive(Debug, Default, Clone)]
pub struct LayerGeometry {
    pub triangles: Vec<SurfaceVertex>,
    pub edges: Vec<Segment>,
}

/// Everything drawn for one viewing session.
#[derive(Debug, Clone)]
pub struct Scene {
    pub base: LayerGeometry,
    pub highlight: LayerGeometry,
    pub highlighted_cells: Vec<usize>,
    pub markers: Vec<Marker>,
    pub labels: Vec<String>,
    pub bounds: Bounds,
}

impl Scene {
    pub fn build(mesh: &Mesh, highlight: &[usize]) -> Result<Self, MeshError> {
        let cell_count = mesh.cell_count();
        if let Some(&cell) = highlight.iter().find(|&&c| c >= cell_count) {
            return Err(MeshError::CellOutOfRange { cell, cell_count });
        }

        let base = layer_geometry(mesh, mesh.cells().iter());
        let highlight_geometry = layer_geometry(mesh, highlight.iter().map(|&c| &mesh.cells()[c]));

        let markers = mesh
            .points()
            .iter()
            .map(|&position| Marker { position })
            .collect();

        debug!(
            "scene: {} triangles, {} edges, {} highlighted cells",
            base.triangles.len() / 3,
            base.edges.len(),
            highlight.len()
        );

        Ok(Self {
            base,
            highlight: highlight_geometry,
            highlighted_cells: highlight.to_vec(),
            markers,
            labels: mesh.point_labels(),
            bounds: mesh.bounds(),
        })
    }
}

fn layer_geometry<'a>(
    mesh: &Mesh,
    cells: impl Iterator<Item = &'a crate::mesh::Cell> + Clone,
) -> LayerGeometry {
    let triangles = mesh
        .triangulate(cells.clone())
        .into_iter()
        .flat_map(|[a, b, c]| {
            let (a, b, c) = (mesh.point(a), mesh.point(b), mesh.point(c));
            let normal = (b - a).cross(c - a).normalize_or_zero().to_array();
            [a, b, c].map(|p: Vec3| SurfaceVertex {
                position: p.to_array(),
                normal,
            })
        })
        .collect();

    let edges = mesh
        .unique_edges(cells)
        .into_iter()
        .map(|[a, b]| Segment {
            start: mesh.point(a).to_array(),
            end: mesh.point(b).to_array(),
        })
        .collect();

    LayerGeometry { triangles, edges }
}
