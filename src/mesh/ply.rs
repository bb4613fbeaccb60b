use std::io::Read;

use log::{debug, warn};
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};

use super::{Cell, Mesh};
use crate::error::MeshError;

const FACE_INDEX_NAMES: [&str; 2] = ["vertex_indices", "vertex_index"];

/// Reads a PLY stream (ASCII or binary) into a [`Mesh`].
///
/// Points come from the `vertex` element. Polygons come from the optional
/// `face` element and line cells from the optional `edge` element.
pub fn read_ply<R: Read>(reader: &mut R) -> Result<Mesh, MeshError> {
    let parser = Parser::<DefaultElement>::new();
    let ply = parser.read_ply(reader).map_err(MeshError::Parse)?;

    debug!(
        "PLY header: {:?}, elements {:?}",
        ply.header.encoding,
        ply.header.elements.keys().collect::<Vec<_>>()
    );

    let vertices = ply
        .payload
        .get("vertex")
        .ok_or(MeshError::MissingElement("vertex"))?;

    let points = vertices
        .iter()
        .enumerate()
        .map(|(index, vertex)| read_point(index, vertex))
        .collect::<Result<Vec<_>, _>>()?;

    let mut cells = Vec::new();

    if let Some(faces) = ply.payload.get("face") {
        for (index, face) in faces.iter().enumerate() {
            let indices = FACE_INDEX_NAMES
                .iter()
                .find_map(|name| face.get(*name).and_then(index_list))
                .ok_or(MeshError::MissingProperty {
                    element: "face",
                    index,
                    property: "vertex_indices",
                })?;
            cells.push(to_cell("face", index, &indices, points.len())?);
        }
    }

    if let Some(edges) = ply.payload.get("edge") {
        for (index, edge) in edges.iter().enumerate() {
            let mut ends = [0i64; 2];
            for (slot, property) in ends.iter_mut().zip(["vertex1", "vertex2"]) {
                *slot = edge
                    .get(property)
                    .and_then(integer)
                    .ok_or(MeshError::MissingProperty {
                        element: "edge",
                        index,
                        property,
                    })?;
            }
            cells.push(to_cell("edge", index, &ends, points.len())?);
        }
    }

    let unknown: Vec<_> = ply
        .payload
        .keys()
        .filter(|name| !matches!(name.as_str(), "vertex" | "face" | "edge"))
        .collect();
    if !unknown.is_empty() {
        warn!("ignoring PLY elements {:?}", unknown);
    }

    Mesh::new(points, cells)
}

fn read_point(index: usize, vertex: &DefaultElement) -> Result<[f32; 3], MeshError> {
    let mut point = [0.0f32; 3];
    for (slot, property) in point.iter_mut().zip(["x", "y", "z"]) {
        *slot = vertex
            .get(property)
            .and_then(scalar)
            .ok_or(MeshError::MissingProperty {
                element: "vertex",
                index,
                property,
            })? as f32;
    }
    Ok(point)
}

fn to_cell(
    element: &'static str,
    index: usize,
    indices: &[i64],
    point_count: usize,
) -> Result<Cell, MeshError> {
    indices
        .iter()
        .map(|&point| {
            if point < 0 || point as usize >= point_count {
                Err(MeshError::IndexOutOfRange {
                    element,
                    index,
                    point,
                    point_count,
                })
            } else {
                Ok(point as u32)
            }
        })
        .collect()
}

fn scalar(property: &Property) -> Option<f64> {
    match *property {
        Property::Char(v) => Some(v as f64),
        Property::UChar(v) => Some(v as f64),
        Property::Short(v) => Some(v as f64),
        Property::UShort(v) => Some(v as f64),
        Property::Int(v) => Some(v as f64),
        Property::UInt(v) => Some(v as f64),
        Property::Float(v) => Some(v as f64),
        Property::Double(v) => Some(v),
        _ => None,
    }
}

fn integer(property: &Property) -> Option<i64> {
    match *property {
        Property::Char(v) => Some(v as i64),
        Property::UChar(v) => Some(v as i64),
        Property::Short(v) => Some(v as i64),
        Property::UShort(v) => Some(v as i64),
        Property::Int(v) => Some(v as i64),
        Property::UInt(v) => Some(v as i64),
        _ => None,
    }
}

fn index_list(property: &Property) -> Option<Vec<i64>> {
    fn widen<T: Copy + Into<i64>>(values: &[T]) -> Vec<i64> {
        values.iter().map(|&v| v.into()).collect()
    }

    match property {
        Property::ListChar(v) => Some(widen(v)),
        Property::ListUChar(v) => Some(widen(v)),
        Property::ListShort(v) => Some(widen(v)),
        Property::ListUShort(v) => Some(widen(v)),
        Property::ListInt(v) => Some(widen(v)),
        Property::ListUInt(v) => Some(widen(v)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUBE_FACES: &str = "ply
format ascii 1.0
comment unit cube split into quads
element vertex 8
property float x
property float y
property float z
element face 6
property list uchar uint vertex_indices
end_header
0 0 0
1 0 0
1 1 0
0 1 0
0 0 1
1 0 1
1 1 1
0 1 1
4 0 3 2 1
4 4 5 6 7
4 0 1 5 4
4 1 2 6 5
4 2 3 7 6
4 3 0 4 7
";

    fn parse(text: &str) -> Result<Mesh, MeshError> {
        read_ply(&mut text.as_bytes())
    }

    #[test]
    fn reads_ascii_quads() {
        let mesh = parse(CUBE_FACES).unwrap();
        assert_eq!(mesh.point_count(), 8);
        assert_eq!(mesh.cell_count(), 6);
        assert_eq!(mesh.cells()[0], vec![0, 3, 2, 1]);
        assert_eq!(mesh.points()[6], [1.0, 1.0, 1.0]);
    }

    #[test]
    fn accepts_vertex_index_name_and_signed_lists() {
        let text = "ply
format ascii 1.0
element vertex 3
property double x
property double y
property double z
element face 1
property list uchar int vertex_index
end_header
0 0 0
2.5 0 0
0 -1.5 0
3 0 1 2
";
        let mesh = parse(text).unwrap();
        assert_eq!(mesh.cells(), &[vec![0, 1, 2]]);
        assert_eq!(mesh.points()[2], [0.0, -1.5, 0.0]);
    }

    #[test]
    fn point_cloud_without_faces() {
        let text = "ply
format ascii 1.0
element vertex 2
property float x
property float y
property float z
property uchar red
end_header
0 0 0 255
1 1 1 0
";
        let mesh = parse(text).unwrap();
        assert_eq!(mesh.point_count(), 2);
        assert_eq!(mesh.cell_count(), 0);
    }

    #[test]
    fn edge_element_becomes_line_cells() {
        let text = "ply
format ascii 1.0
element vertex 3
property float x
property float y
property float z
element edge 2
property int vertex1
property int vertex2
end_header
0 0 0
1 0 0
1 1 0
0 1
1 2
";
        let mesh = parse(text).unwrap();
        assert_eq!(mesh.cells(), &[vec![0, 1], vec![1, 2]]);
    }

    #[test]
    fn reads_binary_little_endian() {
        let mut bytes = b"ply
format binary_little_endian 1.0
element vertex 3
property float x
property float y
property float z
element face 1
property list uchar int vertex_indices
end_header
"
        .to_vec();
        for value in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes.push(3);
        for index in [0i32, 1, 2] {
            bytes.extend_from_slice(&index.to_le_bytes());
        }

        let mesh = read_ply(&mut bytes.as_slice()).unwrap();
        assert_eq!(mesh.point_count(), 3);
        assert_eq!(mesh.points()[1], [1.0, 0.0, 0.0]);
        assert_eq!(mesh.cells(), &[vec![0, 1, 2]]);
    }

    #[test]
    fn reads_uchar_index_lists() {
        let text = "ply
format ascii 1.0
element vertex 4
property float x
property float y
property float z
element face 1
property list uchar uchar vertex_indices
end_header
0 0 0
1 0 0
1 1 0
0 1 0
4 0 1 2 3
";
        let mesh = parse(text).unwrap();
        assert_eq!(mesh.cells(), &[vec![0, 1, 2, 3]]);
    }

    #[test]
    fn reads_binary_big_endian() {
        let mut bytes = b"ply
format binary_big_endian 1.0
element vertex 3
property double x
property double y
property double z
element face 1
property list uchar ushort vertex_indices
end_header
"
        .to_vec();
        for value in [0.0f64, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, -3.5, 1.0] {
            bytes.extend_from_slice(&value.to_be_bytes());
        }
        bytes.push(3);
        for index in [2u16, 1, 0] {
            bytes.extend_from_slice(&index.to_be_bytes());
        }

        let mesh = read_ply(&mut bytes.as_slice()).unwrap();
        assert_eq!(mesh.points()[1], [2.0, 0.0, 0.0]);
        assert_eq!(mesh.points()[2], [0.0, -3.5, 1.0]);
        assert_eq!(mesh.cells(), &[vec![2, 1, 0]]);
    }

    #[test]
    fn rejects_out_of_range_face() {
        let text = "ply
format ascii 1.0
element vertex 3
property float x
property float y
property float z
element face 1
property list uchar int vertex_indices
end_header
0 0 0
1 0 0
0 1 0
3 0 1 7
";
        let err = parse(text).unwrap_err();
        assert!(matches!(
            err,
            MeshError::IndexOutOfRange {
                element: "face",
                index: 0,
                point: 7,
                point_count: 3,
            }
        ));
    }

    #[test]
    fn rejects_negative_index() {
        let text = "ply
format ascii 1.0
element vertex 3
property float x
property float y
property float z
element face 1
property list uchar int vertex_indices
end_header
0 0 0
1 0 0
0 1 0
3 0 -1 2
";
        assert!(matches!(
            parse(text),
            Err(MeshError::IndexOutOfRange { point: -1, .. })
        ));
    }

    #[test]
    fn rejects_file_without_vertices() {
        let text = "ply
format ascii 1.0
element face 0
property list uchar int vertex_indices
end_header
";
        assert!(matches!(parse(text), Err(MeshError::MissingElement("vertex"))));
    }

    #[test]
    fn rejects_vertex_without_coordinates() {
        let text = "ply
format ascii 1.0
element vertex 1
property float x
property float y
end_header
0 0
";
        assert!(matches!(
            parse(text),
            Err(MeshError::MissingProperty { property: "z", .. })
        ));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(parse("not a ply file\n"), Err(MeshError::Parse(_))));
    }
}
