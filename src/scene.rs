use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Interleaved triangle mesh ready for upload.
///
/// Vertices are laid out as `position.xyz` followed by `normal.xyz`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub const STRIDE: usize = 6;

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / Self::STRIDE
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn position(&self, index: usize) -> Vec3 {
        Vec3::from_slice(&self.vertices[index * Self::STRIDE..index * Self::STRIDE + 3])
    }

    pub fn normal(&self, index: usize) -> Vec3 {
        Vec3::from_slice(&self.vertices[index * Self::STRIDE + 3..index * Self::STRIDE + 6])
    }

    pub(crate) fn push_vertex(&mut self, position: Vec3, normal: Vec3) -> u32 {
        let index = self.vertex_count() as u32;
        self.vertices
            .extend_from_slice(&[position.x, position.y, position.z, normal.x, normal.y, normal.z]);
        index
    }

    /// Axis-aligned bounds of every vertex, or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        (0..self.vertex_count()).map(|i| self.position(i)).fold(None, |acc, p| {
            Some(match acc {
                None => (p, p),
                Some((min, max)) => (min.min(p), max.max(p)),
            })
        })
    }
}

/// A mesh with its surface colour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshNode {
    pub name: String,
    pub mesh: Mesh,
    /// Linear RGB plus opacity.
    #[serde(default = "default_color")]
    pub color: Vec4,
}

impl MeshNode {
    pub fn new(name: impl Into<String>, mesh: Mesh, color: Vec4) -> Self {
        Self {
            name: name.into(),
            mesh,
            color,
        }
    }
}

/// Renderable scene graph handed to the renderers by reference.
///
/// The label doubles as the GPU cache key, so two graphs with the same label
/// are assumed to hold the same geometry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SceneGraph {
    pub label: String,
    pub nodes: Vec<MeshNode>,
}

impl SceneGraph {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            nodes: Vec::new(),
        }
    }

    pub fn with_node(mut self, node: MeshNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn triangle_count(&self) -> usize {
        self.nodes.iter().map(|node| node.mesh.triangle_count()).sum()
    }

    /// Rescales and recentres every node so the whole graph fits a cube of
    /// side `extent` around the origin.
    pub fn normalize_to(&mut self, extent: f32) {
        let Some((min, max)) = self
            .nodes
            .iter()
            .filter_map(|node| node.mesh.bounds())
            .reduce(|(amin, amax), (bmin, bmax)| (amin.min(bmin), amax.max(bmax)))
        else {
            return;
        };
        let size = (max - min).max_element();
        if size <= f32::EPSILON {
            return;
        }
        let center = (min + max) * 0.5;
        let factor = extent / size;
        for node in &mut self.nodes {
            for vertex in node.mesh.vertices.chunks_exact_mut(Mesh::STRIDE) {
                vertex[0] = (vertex[0] - center.x) * factor;
                vertex[1] = (vertex[1] - center.y) * factor;
                vertex[2] = (vertex[2] - center.z) * factor;
            }
        }
    }
}

/// Converts a `0xrrggbb` literal into RGBA components.
pub fn hex_color(rgb: u32, opacity: f32) -> Vec4 {
    Vec4::new(
        ((rgb >> 16) & 0xff) as f32 / 255.0,
        ((rgb >> 8) & 0xff) as f32 / 255.0,
        (rgb & 0xff) as f32 / 255.0,
        opacity,
    )
}

fn default_color() -> Vec4 {
    Vec4::ONE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Mesh {
        let mut mesh = Mesh::default();
        mesh.push_vertex(Vec3::new(0.0, 0.0, 0.0), Vec3::Z);
        mesh.push_vertex(Vec3::new(4.0, 0.0, 0.0), Vec3::Z);
        mesh.push_vertex(Vec3::new(0.0, 2.0, 0.0), Vec3::Z);
        mesh.indices = vec![0, 1, 2];
        mesh
    }

    #[test]
    fn hex_color_splits_channels() {
        let color = hex_color(0x667eea, 0.9);
        assert!((color.x - 102.0 / 255.0).abs() < 1e-6);
        assert!((color.y - 126.0 / 255.0).abs() < 1e-6);
        assert!((color.z - 234.0 / 255.0).abs() < 1e-6);
        assert_eq!(color.w, 0.9);
    }

    #[test]
    fn normalize_fits_graph_into_extent() {
        let mut graph = SceneGraph::new("tri").with_node(MeshNode::new("a", triangle(), Vec4::ONE));
        graph.normalize_to(2.0);
        let (min, max) = graph.nodes[0].mesh.bounds().unwrap();
        assert!(((max - min).max_element() - 2.0).abs() < 1e-5);
        assert!(((min + max) * 0.5).length() < 1e-5);
    }

    #[test]
    fn empty_graph_normalizes_to_itself() {
        let mut graph = SceneGraph::new("empty");
        graph.normalize_to(3.0);
        assert!(graph.nodes.is_empty());
        assert_eq!(graph.triangle_count(), 0);
    }
}
