//! Raw generated geometry with source-node bookkeeping.

use std::collections::BTreeMap;

use skelform_math::{normalized_or_zero, Color, Point3, PositionKey, Vec3};

/// A skeleton node as it ended up in generated geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectNode {
    /// Owning part.
    pub part_id: String,
    /// Source node.
    pub node_id: String,
    /// Mesh-space center.
    pub origin: Point3,
    /// Radius.
    pub radius: f64,
    /// Part color.
    pub color: Color,
    /// True for the reflected copy of an x-mirrored part.
    pub mirrored: bool,
}

/// Geometry generated for one part, before it is merged into an [`Object`].
#[derive(Debug, Clone, PartialEq)]
pub struct PartGeometry {
    /// Vertex positions.
    pub vertices: Vec<Point3>,
    /// Triangles indexing `vertices`.
    pub triangles: Vec<[usize; 3]>,
    /// Node each vertex was generated from, if it maps to exactly one.
    pub vertex_nodes: Vec<Option<String>>,
    /// Part color.
    pub color: Color,
    /// Nodes placed by this part (mirrored copies included).
    pub nodes: Vec<ObjectNode>,
}

impl PartGeometry {
    /// Empty geometry with the given color.
    pub fn new(color: Color) -> Self {
        Self {
            vertices: Vec::new(),
            triangles: Vec::new(),
            vertex_nodes: Vec::new(),
            color,
            nodes: Vec::new(),
        }
    }

    /// Append a vertex and return its index.
    pub fn push_vertex(&mut self, position: Point3, node: Option<&str>) -> usize {
        self.vertices.push(position);
        self.vertex_nodes.push(node.map(str::to_string));
        self.vertices.len() - 1
    }

    /// True when nothing was generated.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}

/// The combined result of one mesh generation pass.
#[derive(Debug, Clone, Default)]
pub struct Object {
    /// Vertex positions (mesh space).
    pub vertices: Vec<Point3>,
    /// Triangles indexing `vertices`.
    pub triangles: Vec<[usize; 3]>,
    /// Source part per triangle.
    pub triangle_part_ids: Vec<String>,
    /// Color per triangle.
    pub triangle_colors: Vec<Color>,
    /// Per-corner UVs, filled in by a UV generator.
    pub triangle_vertex_uvs: Vec<[[f64; 2]; 3]>,
    /// Nodes placed into the object.
    pub nodes: Vec<ObjectNode>,
    /// Exact vertex positions generated from a node.
    pub position_to_node: BTreeMap<PositionKey, String>,
    /// Whether any part color is translucent.
    pub alpha_enabled: bool,
}

impl Object {
    /// Create an empty object.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the object holds no triangles.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// True once a UV generator has assigned coordinates to every triangle.
    pub fn has_uvs(&self) -> bool {
        !self.triangles.is_empty() && self.triangle_vertex_uvs.len() == self.triangles.len()
    }

    /// Merge one part's geometry.
    pub fn append_part(&mut self, part_id: &str, geometry: &PartGeometry) {
        let offset = self.vertices.len();
        self.vertices.extend_from_slice(&geometry.vertices);
        for (position, node) in geometry.vertices.iter().zip(&geometry.vertex_nodes) {
            if let Some(node_id) = node {
                self.position_to_node
                    .entry(PositionKey::from(position))
                    .or_insert_with(|| node_id.clone());
            }
        }
        for triangle in &geometry.triangles {
            self.triangles
                .push([triangle[0] + offset, triangle[1] + offset, triangle[2] + offset]);
            self.triangle_part_ids.push(part_id.to_string());
            self.triangle_colors.push(geometry.color);
        }
        self.nodes.extend(geometry.nodes.iter().cloned());
        if geometry.color.a < 1.0 {
            self.alpha_enabled = true;
        }
    }

    /// Merge coincident vertices and drop triangles that collapse.
    pub fn weld(&mut self) {
        let mut index_of: BTreeMap<PositionKey, usize> = BTreeMap::new();
        let mut remap = Vec::with_capacity(self.vertices.len());
        let mut vertices = Vec::new();
        for position in &self.vertices {
            let index = *index_of.entry(PositionKey::from(position)).or_insert_with(|| {
                vertices.push(*position);
                vertices.len() - 1
            });
            remap.push(index);
        }

        let mut triangles = Vec::with_capacity(self.triangles.len());
        let mut part_ids = Vec::with_capacity(self.triangles.len());
        let mut colors = Vec::with_capacity(self.triangles.len());
        let mut uvs = Vec::new();
        let keep_uvs = self.has_uvs();
        for (i, triangle) in self.triangles.iter().enumerate() {
            let t = [remap[triangle[0]], remap[triangle[1]], remap[triangle[2]]];
            if t[0] == t[1] || t[1] == t[2] || t[0] == t[2] {
                continue;
            }
            triangles.push(t);
            part_ids.push(self.triangle_part_ids[i].clone());
            colors.push(self.triangle_colors[i]);
            if keep_uvs {
                uvs.push(self.triangle_vertex_uvs[i]);
            }
        }

        self.vertices = vertices;
        self.triangles = triangles;
        self.triangle_part_ids = part_ids;
        self.triangle_colors = colors;
        self.triangle_vertex_uvs = uvs;
    }

    /// Unit normal of a triangle (zero for degenerate triangles).
    pub fn triangle_normal(&self, triangle: usize) -> Vec3 {
        let [a, b, c] = self.triangles[triangle];
        let (a, b, c) = (self.vertices[a], self.vertices[b], self.vertices[c]);
        normalized_or_zero(&(b - a).cross(&(c - a)))
    }

    /// Node that generated the vertex at exactly this position.
    pub fn source_node_at(&self, position: &Point3) -> Option<&str> {
        self.position_to_node
            .get(&PositionKey::from(position))
            .map(String::as_str)
    }

    /// True when every coordinate is finite.
    pub fn is_finite(&self) -> bool {
        self.vertices
            .iter()
            .all(|v| v.x.is_finite() && v.y.is_finite() && v.z.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(color: Color) -> PartGeometry {
        let mut g = PartGeometry::new(color);
        g.push_vertex(Point3::new(0.0, 0.0, 0.0), Some("a"));
        g.push_vertex(Point3::new(1.0, 0.0, 0.0), Some("b"));
        g.push_vertex(Point3::new(1.0, 1.0, 0.0), None);
        g.push_vertex(Point3::new(0.0, 1.0, 0.0), None);
        g.triangles.push([0, 1, 2]);
        g.triangles.push([0, 2, 3]);
        g
    }

    #[test]
    fn test_append_offsets_indices() {
        let mut object = Object::new();
        object.append_part("p1", &quad(Color::white()));
        object.append_part("p2", &quad(Color::rgba(1.0, 0.0, 0.0, 0.5)));
        assert_eq!(object.num_vertices(), 8);
        assert_eq!(object.triangles[2], [4, 5, 6]);
        assert_eq!(object.triangle_part_ids[3], "p2");
        assert!(object.alpha_enabled);
        assert_eq!(object.source_node_at(&Point3::new(1.0, 0.0, 0.0)), Some("b"));
        assert_eq!(object.source_node_at(&Point3::new(1.0, 1.0, 0.0)), None);
    }

    #[test]
    fn test_weld_merges_duplicates() {
        let mut object = Object::new();
        object.append_part("p1", &quad(Color::white()));
        object.append_part("p1", &quad(Color::white()));
        object.weld();
        assert_eq!(object.num_vertices(), 4);
        assert_eq!(object.num_triangles(), 4);
        assert_eq!(object.triangle_part_ids.len(), 4);
    }

    #[test]
    fn test_weld_drops_collapsed_triangles() {
        let mut g = PartGeometry::new(Color::white());
        g.push_vertex(Point3::new(0.0, 0.0, 0.0), None);
        g.push_vertex(Point3::new(0.0, 0.0, 0.0), None);
        g.push_vertex(Point3::new(1.0, 0.0, 0.0), None);
        g.triangles.push([0, 1, 2]);
        let mut object = Object::new();
        object.append_part("p", &g);
        object.weld();
        assert!(object.is_empty());
    }

    #[test]
    fn test_triangle_normal() {
        let mut object = Object::new();
        object.append_part("p", &quad(Color::white()));
        let n = object.triangle_normal(0);
        assert!((n.z - 1.0).abs() < 1e-12);
        assert!(object.is_finite());
    }
}
