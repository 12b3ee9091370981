//! OBJ file loader for 3D models

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

use crate::render::{MeshData, Vertex};

/// OBJ loading errors
#[derive(Error, Debug)]
pub enum ObjError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed number or index
    #[error("Parse error on line {line}: {message}")]
    ParseError {
        /// 1-based line number
        line: usize,
        /// What went wrong
        message: String,
    },
    /// Structurally invalid file
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Wavefront OBJ reader.
///
/// Faces are fan-triangulated. Each `o`/`g` group becomes its own mesh; empty
/// groups are dropped.
pub struct ObjLoader;

impl ObjLoader {
    /// Load an OBJ file and return its meshes
    pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<Vec<MeshData>, ObjError> {
        let file = File::open(path)?;
        Self::parse(BufReader::new(file))
    }

    /// Parse OBJ text from any buffered reader
    pub fn parse<R: BufRead>(reader: R) -> Result<Vec<MeshData>, ObjError> {
        let mut positions: Vec<[f32; 3]> = Vec::new();
        let mut normals: Vec<[f32; 3]> = Vec::new();
        let mut tex_coords: Vec<[f32; 2]> = Vec::new();
        let mut meshes = Vec::new();
        let mut current = MeshData::default();

        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = number + 1;
            let mut parts = line.split_whitespace();
            let Some(keyword) = parts.next() else {
                continue;
            };
            let args: Vec<&str> = parts.collect();

            match keyword {
                "v" => positions.push(parse_floats::<3>(&args, line_no, "vertex")?),
                "vn" => normals.push(parse_floats::<3>(&args, line_no, "normal")?),
                "vt" => tex_coords.push(parse_floats::<2>(&args, line_no, "tex coord")?),
                "o" | "g" => {
                    if !current.indices.is_empty() {
                        meshes.push(std::mem::take(&mut current));
                    }
                }
                "f" => {
                    if args.len() < 3 {
                        return Err(ObjError::ParseError {
                            line: line_no,
                            message: "face needs at least 3 vertices".to_string(),
                        });
                    }

                    let mut face = Vec::with_capacity(args.len());
                    for corner in &args {
                        let vertex = parse_corner(corner, &positions, &tex_coords, &normals, line_no)?;
                        let index = u32::try_from(current.vertices.len())
                            .map_err(|_| ObjError::InvalidFormat("too many vertices".to_string()))?;
                        current.vertices.push(vertex);
                        face.push(index);
                    }

                    // Fan triangulation
                    for i in 1..face.len() - 1 {
                        current.indices.extend_from_slice(&[face[0], face[i], face[i + 1]]);
                    }
                }
                _ => {}
            }
        }

        if !current.indices.is_empty() {
            meshes.push(current);
        }
        if meshes.is_empty() {
            return Err(ObjError::InvalidFormat("No faces found in OBJ file".to_string()));
        }
        Ok(meshes)
    }
}

fn parse_floats<const N: usize>(args: &[&str], line: usize, what: &str) -> Result<[f32; N], ObjError> {
    let mut values = [0.0; N];
    if args.len() < N {
        return Err(ObjError::ParseError {
            line,
            message: format!("{} needs {} components", what, N),
        });
    }
    for (value, text) in values.iter_mut().zip(args) {
        *value = text.parse().map_err(|_| ObjError::ParseError {
            line,
            message: format!("invalid {} component '{}'", what, text),
        })?;
    }
    Ok(values)
}

/// Resolve a 1-based (or negative, relative) OBJ index
fn resolve_index(text: &str, len: usize, line: usize) -> Result<usize, ObjError> {
    let raw: i64 = text.parse().map_err(|_| ObjError::ParseError {
        line,
        message: format!("invalid index '{}'", text),
    })?;
    let len = i64::try_from(len).unwrap_or(i64::MAX);
    let resolved = if raw < 0 { len + raw } else { raw - 1 };
    if (0..len).contains(&resolved) {
        usize::try_from(resolved).map_err(|_| ObjError::InvalidFormat("index overflow".to_string()))
    } else {
        Err(ObjError::InvalidFormat(format!("index {} out of bounds on line {}", raw, line)))
    }
}

fn parse_corner(
    corner: &str,
    positions: &[[f32; 3]],
    tex_coords: &[[f32; 2]],
    normals: &[[f32; 3]],
    line: usize,
) -> Result<Vertex, ObjError> {
    let mut fields = corner.split('/');
    let position = fields
        .next()
        .ok_or_else(|| ObjError::InvalidFormat(format!("empty face corner on line {}", line)))
        .and_then(|text| resolve_index(text, positions.len(), line))
        .map(|i| positions[i])?;

    let tex_coord = match fields.next() {
        Some(text) if !text.is_empty() => tex_coords[resolve_index(text, tex_coords.len(), line)?],
        _ => [0.0, 0.0],
    };
    let normal = match fields.next() {
        Some(text) if !text.is_empty() => normals[resolve_index(text, normals.len(), line)?],
        _ => [0.0, 1.0, 0.0],
    };

    Ok(Vertex::new(position, normal, tex_coord))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const QUAD: &str = "\
# unit quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    #[test]
    fn test_quad_is_fan_triangulated() {
        let meshes = ObjLoader::parse(Cursor::new(QUAD)).unwrap();
        assert_eq!(meshes.len(), 1);
        let mesh = &meshes[0];
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(mesh.vertices[2].tex_coord, [1.0, 1.0]);
        assert_eq!(mesh.vertices[0].normal, [0.0, 0.0, 1.0]);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_groups_become_separate_meshes() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\no a\nf 1 2 3\no b\nf -3 -2 -1\n";
        let meshes = ObjLoader::parse(Cursor::new(text)).unwrap();
        assert_eq!(meshes.len(), 2);
        assert_eq!(meshes[1].vertices[2].position, [0.0, 1.0, 0.0]);
        // Missing normals default to +Y
        assert_eq!(meshes[0].vertices[0].normal, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            ObjLoader::parse(Cursor::new("v 0 0 0\nf 1 2 3\n")),
            Err(ObjError::InvalidFormat(_))
        ));
        assert!(matches!(
            ObjLoader::parse(Cursor::new("v 0 zero 0\n")),
            Err(ObjError::ParseError { line: 1, .. })
        ));
        assert!(matches!(
            ObjLoader::parse(Cursor::new("# nothing\n")),
            Err(ObjError::InvalidFormat(_))
        ));
        assert!(ObjLoader::load_obj("no/such/model.obj").is_err());
    }
}
