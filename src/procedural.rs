//! Deterministic placeholder geometry that needs no network access.

use std::f32::consts::TAU;

use glam::Vec3;

use crate::scene::{hex_color, Mesh, MeshNode, SceneGraph};

pub const PRIMARY_COLOR: u32 = 0x667eea;
pub const ACCENT_COLOR: u32 = 0x764ba2;

/// Label of the placeholder graph shown when the model cannot be used.
pub const PLACEHOLDER_LABEL: &str = "procedural-placeholder";
/// Label of the spinner graph shown while the model is loading.
pub const LOADING_LABEL: &str = "loading-cube";

/// Icosahedron wrapped in a thin torus ring.
pub fn placeholder() -> SceneGraph {
    SceneGraph::new(PLACEHOLDER_LABEL)
        .with_node(MeshNode::new(
            "core",
            icosphere(1.5, 2),
            hex_color(PRIMARY_COLOR, 0.9),
        ))
        .with_node(MeshNode::new(
            "ring",
            torus(1.8, 0.1, 8, 32),
            hex_color(ACCENT_COLOR, 0.6),
        ))
}

/// Unit cube drawn while the asset is in flight.
pub fn loading_cube() -> SceneGraph {
    SceneGraph::new(LOADING_LABEL).with_node(MeshNode::new(
        "cube",
        cube(1.0),
        hex_color(PRIMARY_COLOR, 0.5),
    ))
}

/// Icosahedron whose faces are split into `(detail + 1)^2` triangles and
/// projected onto a sphere of `radius`.
pub fn icosphere(radius: f32, detail: u32) -> Mesh {
    let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
    let corners = [
        Vec3::new(-1.0, t, 0.0),
        Vec3::new(1.0, t, 0.0),
        Vec3::new(-1.0, -t, 0.0),
        Vec3::new(1.0, -t, 0.0),
        Vec3::new(0.0, -1.0, t),
        Vec3::new(0.0, 1.0, t),
        Vec3::new(0.0, -1.0, -t),
        Vec3::new(0.0, 1.0, -t),
        Vec3::new(t, 0.0, -1.0),
        Vec3::new(t, 0.0, 1.0),
        Vec3::new(-t, 0.0, -1.0),
        Vec3::new(-t, 0.0, 1.0),
    ];
    const FACES: [[usize; 3]; 20] = [
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];

    let steps = detail + 1;
    let mut mesh = Mesh::default();
    for [ia, ib, ic] in FACES {
        let (a, b, c) = (corners[ia], corners[ib], corners[ic]);
        // Barycentric grid: row i walks from edge a-b toward c.
        let point = |i: u32, j: u32| {
            let u = i as f32 / steps as f32;
            let v = j as f32 / steps as f32;
            a + (b - a) * u + (c - a) * v
        };
        let mut emit = |p: [Vec3; 3]| {
            for corner in p {
                let normal = corner.normalize();
                let index = mesh.push_vertex(normal * radius, normal);
                mesh.indices.push(index);
            }
        };
        for i in 0..steps {
            for j in 0..steps - i {
                emit([point(i, j), point(i + 1, j), point(i, j + 1)]);
                if j + 1 < steps - i {
                    emit([point(i + 1, j), point(i + 1, j + 1), point(i, j + 1)]);
                }
            }
        }
    }
    mesh
}

/// Torus in the XY plane, matching the ring around the hero model.
pub fn torus(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> Mesh {
    let mut mesh = Mesh::default();
    for j in 0..=radial_segments {
        let v = j as f32 / radial_segments as f32 * TAU;
        for i in 0..=tubular_segments {
            let u = i as f32 / tubular_segments as f32 * TAU;
            let center = Vec3::new(radius * u.cos(), radius * u.sin(), 0.0);
            let position = Vec3::new(
                (radius + tube * v.cos()) * u.cos(),
                (radius + tube * v.cos()) * u.sin(),
                tube * v.sin(),
            );
            mesh.push_vertex(position, (position - center).normalize_or_zero());
        }
    }
    let row = tubular_segments + 1;
    for j in 1..=radial_segments {
        for i in 1..=tubular_segments {
            let a = row * j + i - 1;
            let b = row * (j - 1) + i - 1;
            let c = row * (j - 1) + i;
            let d = row * j + i;
            mesh.indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }
    mesh
}

/// Axis-aligned cube with flat per-face normals.
pub fn cube(size: f32) -> Mesh {
    let h = size * 0.5;
    let mut mesh = Mesh::default();
    for axis in [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z] {
        // Two tangents spanning the face, ordered for counter-clockwise winding.
        let up = if axis.y.abs() > 0.5 { Vec3::Z } else { Vec3::Y };
        let side = up.cross(axis);
        let base = mesh.vertex_count() as u32;
        for (s, u) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            mesh.push_vertex((axis + side * s + up * u) * h, axis);
        }
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icosphere_face_count_follows_detail() {
        assert_eq!(icosphere(1.0, 0).triangle_count(), 20);
        assert_eq!(icosphere(1.0, 2).triangle_count(), 20 * 9);
    }

    #[test]
    fn icosphere_vertices_sit_on_the_sphere() {
        let mesh = icosphere(1.5, 2);
        for i in 0..mesh.vertex_count() {
            assert!((mesh.position(i).length() - 1.5).abs() < 1e-4);
            assert!((mesh.normal(i).length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn torus_has_expected_topology() {
        let mesh = torus(1.8, 0.1, 8, 32);
        assert_eq!(mesh.vertex_count(), 9 * 33);
        assert_eq!(mesh.triangle_count(), 8 * 32 * 2);
        let (min, max) = mesh.bounds().unwrap();
        assert!((max.x - 1.9).abs() < 1e-4);
        assert!((min.z + 0.1).abs() < 1e-4);
    }

    #[test]
    fn cube_normals_point_outward() {
        let mesh = cube(1.0);
        assert_eq!(mesh.triangle_count(), 12);
        for i in 0..mesh.vertex_count() {
            assert!(mesh.position(i).dot(mesh.normal(i)) > 0.0);
        }
    }

    #[test]
    fn cube_winding_is_counter_clockwise_from_outside() {
        let mesh = cube(2.0);
        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let face = (mesh.position(b) - mesh.position(a)).cross(mesh.position(c) - mesh.position(a));
            assert!(face.dot(mesh.normal(a)) > 0.0);
        }
    }

    #[test]
    fn placeholder_is_deterministic() {
        assert_eq!(placeholder(), placeholder());
        assert_eq!(placeholder().nodes.len(), 2);
        assert_eq!(loading_cube().label, LOADING_LABEL);
    }
}
