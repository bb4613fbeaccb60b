pub mod ply;

use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use glam::Vec3;
use log::{debug, info};

use crate::error::MeshError;

const MIN_RADIUS: f32 = 1e-3;

/// Point indices of one cell: a polygon (3+), a line (2) or a vertex (1).
pub type Cell = Vec<u32>;

/// Points and connectivity as read from disk. Every cell index is known to
/// be in range and there is at least one point.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    points: Vec<[f32; 3]>,
    cells: Vec<Cell>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn from_points(points: &[[f32; 3]]) -> Option<Self> {
        let mut iter = points.iter().map(|p| Vec3::from_array(*p));
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Half the diagonal, floored so a single point still has a usable scale.
    pub fn radius(&self) -> f32 {
        ((self.max - self.min).length() * 0.5).max(MIN_RADIUS)
    }
}

impl Mesh {
    pub fn new(points: Vec<[f32; 3]>, cells: Vec<Cell>) -> Result<Self, MeshError> {
        if points.is_empty() {
            return Err(MeshError::Empty);
        }

        for (index, cell) in cells.iter().enumerate() {
            if let Some(&point) = cell.iter().find(|&&i| i as usize >= points.len()) {
                return Err(MeshError::IndexOutOfRange {
                    element: "cell",
                    index,
                    point: point as i64,
                    point_count: points.len(),
                });
            }
        }

        Ok(Self { points, cells })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, MeshError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| MeshError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let mesh = ply::read_ply(&mut BufReader::new(file))?;
        info!(
            "loaded {}: {} points, {} cells",
            path.display(),
            mesh.point_count(),
            mesh.cell_count()
        );
        Ok(mesh)
    }

    pub fn points(&self) -> &[[f32; 3]] {
        &self.points
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn bounds(&self) -> Bounds {
        // `new` guarantees at least one point.
        Bounds::from_points(&self.points).unwrap_or(Bounds {
            min: Vec3::ZERO,
            max: Vec3::ZERO,
        })
    }

    /// One label per point: the point's index as text.
    pub fn point_labels(&self) -> Vec<String> {
        (0..self.points.len()).map(|i| i.to_string()).collect()
    }

    pub fn point(&self, index: u32) -> Vec3 {
        Vec3::from_array(self.points[index as usize])
    }

    /// Fan-triangulates every polygon among `cells`. Lines and vertices
    /// produce no triangles.
    pub fn triangulate<'a>(&self, cells: impl IntoIterator<Item = &'a Cell>) -> Vec<[u32; 3]> {
        let mut triangles = Vec::new();
        for cell in cells {
            if cell.len() < 3 {
                continue;
            }
            let apex = cell[0];
            for pair in cell[1..].windows(2) {
                triangles.push([apex, pair[0], pair[1]]);
            }
        }
        triangles
    }

    /// Undirected edges of `cells`, each reported once in first-seen order.
    pub fn unique_edges<'a>(&self, cells: impl IntoIterator<Item = &'a Cell>) -> Vec<[u32; 2]> {
        let mut seen = HashSet::new();
        let mut edges = Vec::new();

        let mut push = |a: u32, b: u32| {
            if a == b {
                return;
            }
            let key = (a.min(b), a.max(b));
            if seen.insert(key) {
                edges.push([a, b]);
            }
        };

        for cell in cells {
            match cell.len() {
                0 | 1 => {}
                2 => push(cell[0], cell[1]),
                n => {
                    for i in 0..n {
                        push(cell[i], cell[(i + 1) % n]);
                    }
                }
            }
        }

        debug!("extracted {} unique edges", edges.len());
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quad() -> Mesh {
        Mesh::new(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            vec![vec![0, 1, 2, 3]],
        )
        .unwrap()
    }

    #[test]
    fn labels_match_point_indices() {
        let mesh = quad();
        let labels = mesh.point_labels();
        assert_eq!(labels.len(), mesh.point_count());
        for (i, label) in labels.iter().enumerate() {
            assert_eq!(label, &i.to_string());
        }
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            b"ply\nformat ascii 1.0\nelement vertex 3\nproperty float x\nproperty float y\nproperty float z\n\
              element face 1\nproperty list uchar int vertex_indices\nend_header\n\
              0 0 0\n1 0 0\n0 1 0\n3 0 1 2\n",
        )
        .unwrap();

        let mesh = Mesh::load(file.path()).unwrap();
        assert_eq!(mesh.point_count(), 3);
        assert_eq!(mesh.cells(), &[vec![0, 1, 2]]);
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.ply");
        match Mesh::load(&path) {
            Err(MeshError::Open { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected open error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_empty_point_set() {
        assert!(matches!(Mesh::new(vec![], vec![]), Err(MeshError::Empty)));
    }

    #[test]
    fn rejects_dangling_index() {
        let err = Mesh::new(vec![[0.0; 3], [1.0; 3]], vec![vec![0, 1, 2]]).unwrap_err();
        assert!(matches!(
            err,
            MeshError::IndexOutOfRange {
                point: 2,
                point_count: 2,
                ..
            }
        ));
    }

    #[test]
    fn bounds_of_unit_quad() {
        let bounds = quad().bounds();
        assert_eq!(bounds.center(), Vec3::new(0.5, 0.5, 0.0));
        assert_relative_eq!(bounds.radius(), 2.0_f32.sqrt() / 2.0);
    }

    #[test]
    fn single_point_has_nonzero_radius() {
        let mesh = Mesh::new(vec![[3.0, 4.0, 5.0]], vec![]).unwrap();
        assert!(mesh.bounds().radius() > 0.0);
    }

    #[test]
    fn fan_triangulation() {
        let mesh = quad();
        let pentagon: Cell = vec![0, 1, 2, 3, 0];
        assert_eq!(mesh.triangulate(mesh.cells()), vec![[0, 1, 2], [0, 2, 3]]);
        assert_eq!(mesh.triangulate([&pentagon]).len(), 3);

        let line: Cell = vec![0, 1];
        assert!(mesh.triangulate([&line]).is_empty());
    }

    #[test]
    fn shared_edges_are_reported_once() {
        let mesh = Mesh::new(
            vec![[0.0; 3], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            vec![vec![0, 1, 2], vec![0, 2, 3]],
        )
        .unwrap();

        let edges = mesh.unique_edges(mesh.cells());
        assert_eq!(edges.len(), 5);
        assert_eq!(edges.iter().filter(|e| **e == [2, 0] || **e == [0, 2]).count(), 1);
    }

    #[test]
    fn line_cells_produce_one_edge() {
        let mesh = quad();
        let line: Cell = vec![3, 1];
        assert_eq!(mesh.unique_edges([&line]), vec![[3, 1]]);
    }
}
