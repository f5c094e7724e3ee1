use std::collections::HashMap;

use glam::{Vec3, Vec4};
use thiserror::Error;

use crate::scene::{Mesh, MeshNode, SceneGraph};

/// Failure while turning OBJ text into a scene graph.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MeshError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("line {line}: face references missing vertex {index}")]
    IndexOutOfRange { line: usize, index: i32 },
    #[error("OBJ data does not define any vertices")]
    NoVertices,
    #[error("OBJ data does not define any faces")]
    NoFaces,
    #[error("OBJ data is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
}

/// Parses Wavefront OBJ text into a scene graph.
///
/// Each `o` or `g` statement starts a new node; faces declared before the
/// first group land in a node called `default`. Polygons are triangulated as
/// fans and vertices without normals receive smooth computed normals.
pub fn parse_obj(label: &str, data: &str, color: Vec4) -> Result<SceneGraph, MeshError> {
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut groups: Vec<FaceGroup> = vec![FaceGroup::named("default")];

    for (line_no, line) in data.lines().enumerate() {
        let line_no = line_no + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };
        match tag {
            "v" => positions.push(parse_vec3(parts, line_no)?),
            "vn" => normals.push(parse_vec3(parts, line_no)?),
            "o" | "g" => {
                let name = parts.collect::<Vec<_>>().join(" ");
                let name = if name.is_empty() { "unnamed".to_string() } else { name };
                groups.push(FaceGroup::named(&name));
            }
            "f" => {
                let polygon = parse_face(parts, line_no, positions.len(), normals.len())?;
                if let Some(group) = groups.last_mut() {
                    for i in 1..polygon.len() - 1 {
                        group.triangles.push([polygon[0], polygon[i], polygon[i + 1]]);
                    }
                }
            }
            _ => {}
        }
    }

    if positions.is_empty() {
        return Err(MeshError::NoVertices);
    }

    let mut graph = SceneGraph::new(label);
    for group in groups.into_iter().filter(|g| !g.triangles.is_empty()) {
        let mut mesh = build_mesh(&positions, &normals, &group.triangles);
        fill_missing_normals(&mut mesh);
        graph.nodes.push(MeshNode::new(group.name, mesh, color));
    }
    if graph.nodes.is_empty() {
        return Err(MeshError::NoFaces);
    }
    Ok(graph)
}

struct FaceGroup {
    name: String,
    triangles: Vec<[Corner; 3]>,
}

impl FaceGroup {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            triangles: Vec::new(),
        }
    }
}

/// One `v/vt/vn` reference from a face statement, resolved to zero-based
/// indices. Texture coordinates are accepted but not used.
#[derive(Debug, Clone, Copy)]
struct Corner {
    position: usize,
    normal: Option<usize>,
}

fn parse_vec3<'a>(mut parts: impl Iterator<Item = &'a str>, line: usize) -> Result<Vec3, MeshError> {
    let mut component = || -> Result<f32, MeshError> {
        let text = parts.next().ok_or_else(|| MeshError::Syntax {
            line,
            message: "missing vector component".into(),
        })?;
        text.parse::<f32>().map_err(|err| MeshError::Syntax {
            line,
            message: format!("invalid number {text:?}: {err}"),
        })
    };
    Ok(Vec3::new(component()?, component()?, component()?))
}

fn parse_face<'a>(
    parts: impl Iterator<Item = &'a str>,
    line: usize,
    positions: usize,
    normals: usize,
) -> Result<Vec<Corner>, MeshError> {
    let mut corners = Vec::new();
    for part in parts {
        let mut segments = part.split('/');
        let position = segments
            .next()
            .and_then(|s| s.parse::<i32>().ok())
            .ok_or_else(|| MeshError::Syntax {
                line,
                message: format!("invalid face corner {part:?}"),
            })?;
        let _texcoord = segments.next();
        let normal = segments
            .next()
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<i32>().map_err(|_| MeshError::Syntax {
                    line,
                    message: format!("invalid normal index in {part:?}"),
                })
            })
            .transpose()?;
        // Relative indices count back from the vertices declared so far.
        let position = resolve_index(position, positions)
            .ok_or(MeshError::IndexOutOfRange { line, index: position })?;
        let normal = match normal {
            Some(index) => Some(
                resolve_index(index, normals).ok_or(MeshError::IndexOutOfRange { line, index })?,
            ),
            None => None,
        };
        corners.push(Corner { position, normal });
    }
    if corners.len() < 3 {
        return Err(MeshError::Syntax {
            line,
            message: "faces must reference at least 3 vertices".into(),
        });
    }
    Ok(corners)
}

fn build_mesh(positions: &[Vec3], normals: &[Vec3], triangles: &[[Corner; 3]]) -> Mesh {
    let mut lookup: HashMap<(usize, Option<usize>), u32> = HashMap::new();
    let mut mesh = Mesh::default();

    for triangle in triangles {
        for corner in triangle {
            let key = (corner.position, corner.normal);
            let index = match lookup.get(&key) {
                Some(index) => *index,
                None => {
                    let n = corner.normal.map(|i| normals[i]).unwrap_or(Vec3::ZERO);
                    let index = mesh.push_vertex(positions[corner.position], n);
                    lookup.insert(key, index);
                    index
                }
            };
            mesh.indices.push(index);
        }
    }
    mesh
}

/// Maps 1-based and negative (relative) OBJ indices onto a slice index.
fn resolve_index(index: i32, len: usize) -> Option<usize> {
    if index > 0 {
        let zero_based = index as usize - 1;
        (zero_based < len).then_some(zero_based)
    } else if index < 0 {
        let back = index.unsigned_abs() as usize;
        (back <= len).then(|| len - back)
    } else {
        None
    }
}

/// Replaces zero normals with the area-weighted average of adjacent faces.
fn fill_missing_normals(mesh: &mut Mesh) {
    let missing: Vec<bool> = (0..mesh.vertex_count())
        .map(|i| mesh.normal(i).length_squared() <= f32::EPSILON)
        .collect();
    if !missing.iter().any(|m| *m) {
        return;
    }

    let mut accum = vec![Vec3::ZERO; mesh.vertex_count()];
    for triangle in mesh.indices.chunks_exact(3) {
        let [a, b, c] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];
        let face = (mesh.position(b) - mesh.position(a)).cross(mesh.position(c) - mesh.position(a));
        for i in [a, b, c] {
            accum[i] += face;
        }
    }

    for (i, normal) in accum.into_iter().enumerate() {
        if !missing[i] {
            continue;
        }
        let normal = normal.normalize_or_zero();
        let base = i * Mesh::STRIDE + 3;
        mesh.vertices[base..base + 3].copy_from_slice(&normal.to_array());
    }
}
