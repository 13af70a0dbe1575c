//! Renderable meshes.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};

use skelform_math::{normalized_or_zero, Color, Point3, Vec3};

use crate::object::Object;

static NEXT_MESH_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-unique mesh ID.
pub fn next_mesh_id() -> u64 {
    NEXT_MESH_ID.fetch_add(1, Ordering::Relaxed)
}

/// Triangle mesh with per-vertex normals, colors and UVs.
///
/// Vertices are not shared between triangles: triangle `i` uses vertices
/// `3i`, `3i + 1` and `3i + 2`, so hard edges and UV seams need no
/// special handling.
#[derive(Debug, Clone)]
pub struct ModelMesh {
    /// Process-unique ID; consumers compare it to detect a new mesh.
    pub id: u64,
    /// Vertex positions.
    pub vertices: Vec<Point3>,
    /// Vertex normals.
    pub normals: Vec<Vec3>,
    /// Vertex colors.
    pub colors: Vec<Color>,
    /// Vertex UVs (empty when the mesh is not UV mapped).
    pub uvs: Vec<[f64; 2]>,
    /// Triangles indexing `vertices`.
    pub triangles: Vec<[usize; 3]>,
}

impl ModelMesh {
    /// Build from an [`Object`], smoothing normals across edges whose
    /// dihedral angle is at most `smooth_threshold_degrees`.
    ///
    /// A threshold of zero produces flat shading.
    pub fn from_object(object: &Object, smooth_threshold_degrees: f64) -> Self {
        let face_normals: Vec<Vec3> = (0..object.num_triangles())
            .map(|t| object.triangle_normal(t))
            .collect();

        let mut incident: HashMap<usize, Vec<usize>> = HashMap::new();
        if smooth_threshold_degrees > 0.0 {
            for (t, triangle) in object.triangles.iter().enumerate() {
                for &v in triangle {
                    incident.entry(v).or_default().push(t);
                }
            }
        }
        let min_cos = smooth_threshold_degrees.to_radians().cos();
        let with_uvs = object.has_uvs();

        let count = object.num_triangles() * 3;
        let mut mesh = Self {
            id: next_mesh_id(),
            vertices: Vec::with_capacity(count),
            normals: Vec::with_capacity(count),
            colors: Vec::with_capacity(count),
            uvs: Vec::with_capacity(if with_uvs { count } else { 0 }),
            triangles: Vec::with_capacity(object.num_triangles()),
        };

        for (t, triangle) in object.triangles.iter().enumerate() {
            let base = mesh.vertices.len();
            let color = object
                .triangle_colors
                .get(t)
                .copied()
                .unwrap_or_else(Color::white);
            for (corner, &v) in triangle.iter().enumerate() {
                let own = face_normals[t];
                let normal = match incident.get(&v) {
                    Some(faces) => {
                        let mut sum = own;
                        for &other in faces {
                            if other != t && own.dot(&face_normals[other]) >= min_cos {
                                sum += face_normals[other];
                            }
                        }
                        normalized_or_zero(&sum)
                    }
                    None => own,
                };
                mesh.vertices.push(object.vertices[v]);
                mesh.normals.push(normal);
                mesh.colors.push(color);
                if with_uvs {
                    mesh.uvs.push(object.triangle_vertex_uvs[t][corner]);
                }
            }
            mesh.triangles.push([base, base + 1, base + 2]);
        }
        mesh
    }

    /// Flat-shaded mesh from shared vertices with per-vertex colors.
    ///
    /// Triangles referencing a vertex outside `vertices` are skipped.
    /// Vertices without a color get opaque white.
    pub fn from_vertex_colors(
        vertices: &[Point3],
        triangles: &[[usize; 3]],
        vertex_colors: &[Color],
    ) -> Self {
        let mut mesh = Self {
            id: next_mesh_id(),
            vertices: Vec::with_capacity(triangles.len() * 3),
            normals: Vec::with_capacity(triangles.len() * 3),
            colors: Vec::with_capacity(triangles.len() * 3),
            uvs: Vec::new(),
            triangles: Vec::with_capacity(triangles.len()),
        };
        for triangle in triangles {
            if triangle.iter().any(|&v| v >= vertices.len()) {
                continue;
            }
            let [a, b, c] = triangle.map(|v| vertices[v]);
            let normal = normalized_or_zero(&(b - a).cross(&(c - a)));
            let base = mesh.vertices.len();
            for &v in triangle {
                mesh.vertices.push(vertices[v]);
                mesh.normals.push(normal);
                mesh.colors
                    .push(vertex_colors.get(v).copied().unwrap_or_else(Color::white));
            }
            mesh.triangles.push([base, base + 1, base + 2]);
        }
        mesh
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// True when the mesh holds no triangles.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Render as Wavefront OBJ text (vertex colors appended to `v` lines).
    pub fn to_obj_string(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# skelform");
        for (v, c) in self.vertices.iter().zip(&self.colors) {
            let _ = writeln!(
                out,
                "v {:.6} {:.6} {:.6} {:.6} {:.6} {:.6}",
                v.x, v.y, v.z, c.r, c.g, c.b
            );
        }
        for uv in &self.uvs {
            let _ = writeln!(out, "vt {:.6} {:.6}", uv[0], 1.0 - uv[1]);
        }
        for n in &self.normals {
            let _ = writeln!(out, "vn {:.6} {:.6} {:.6}", n.x, n.y, n.z);
        }
        let with_uvs = self.uvs.len() == self.vertices.len() && !self.uvs.is_empty();
        for t in &self.triangles {
            let [a, b, c] = [t[0] + 1, t[1] + 1, t[2] + 1];
            if with_uvs {
                let _ = writeln!(out, "f {a}/{a}/{a} {b}/{b}/{b} {c}/{c}/{c}");
            } else {
                let _ = writeln!(out, "f {a}//{a} {b}//{b} {c}//{c}");
            }
        }
        out
    }
}

/// Line-segment mesh, used for wireframes.
#[derive(Debug, Clone)]
pub struct MonochromeMesh {
    /// Process-unique ID.
    pub id: u64,
    /// Segments.
    pub lines: Vec<[Point3; 2]>,
}

impl MonochromeMesh {
    /// Unique undirected triangle edges of an [`Object`].
    pub fn from_object(object: &Object) -> Self {
        let mut seen = BTreeSet::new();
        let mut lines = Vec::new();
        for triangle in &object.triangles {
            for i in 0..3 {
                let (a, b) = (triangle[i], triangle[(i + 1) % 3]);
                if seen.insert((a.min(b), a.max(b))) {
                    lines.push([object.vertices[a], object.vertices[b]]);
                }
            }
        }
        Self {
            id: next_mesh_id(),
            lines,
        }
    }

    /// Number of segments.
    pub fn num_lines(&self) -> usize {
        self.lines.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::PartGeometry;
    use approx::assert_relative_eq;

    /// Two triangles folded 90 degrees along the x axis.
    fn folded() -> Object {
        let mut g = PartGeometry::new(Color::rgb(0.5, 0.5, 0.5));
        g.push_vertex(Point3::new(0.0, 0.0, 0.0), None);
        g.push_vertex(Point3::new(1.0, 0.0, 0.0), None);
        g.push_vertex(Point3::new(0.0, 1.0, 0.0), None);
        g.push_vertex(Point3::new(0.0, 0.0, 1.0), None);
        g.triangles.push([0, 1, 2]);
        g.triangles.push([0, 3, 1]);
        let mut object = Object::new();
        object.append_part("p", &g);
        object
    }

    #[test]
    fn test_flat_shading() {
        let mesh = ModelMesh::from_object(&folded(), 0.0);
        assert_eq!(mesh.num_vertices(), 6);
        assert_eq!(mesh.num_triangles(), 2);
        assert_relative_eq!(mesh.normals[0].z, 1.0);
        assert_relative_eq!(mesh.normals[3].y, 1.0);
        assert!(mesh.uvs.is_empty());
    }

    #[test]
    fn test_smooth_shading_blends_shared_vertices() {
        let mesh = ModelMesh::from_object(&folded(), 100.0);
        let n = mesh.normals[0];
        assert_relative_eq!(n.y, n.z, epsilon = 1e-9);
        assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_threshold_keeps_hard_edges() {
        let mesh = ModelMesh::from_object(&folded(), 60.0);
        assert_relative_eq!(mesh.normals[0].z, 1.0);
    }

    #[test]
    fn test_ids_are_unique() {
        let a = ModelMesh::from_object(&folded(), 0.0);
        let b = ModelMesh::from_object(&folded(), 0.0);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_vertex_colored_mesh() {
        let vertices = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let red = Color::rgb(1.0, 0.0, 0.0);
        let mesh = ModelMesh::from_vertex_colors(&vertices, &[[0, 1, 2], [0, 1, 9]], &[red]);
        assert_eq!(mesh.num_triangles(), 1);
        assert_eq!(mesh.colors[0], red);
        assert_eq!(mesh.colors[1], Color::white());
        assert_relative_eq!(mesh.normals[0].z, 1.0);
    }

    #[test]
    fn test_wireframe_dedups_shared_edge() {
        let wire = MonochromeMesh::from_object(&folded());
        assert_eq!(wire.num_lines(), 5);
    }

    #[test]
    fn test_obj_export() {
        let obj = ModelMesh::from_object(&folded(), 0.0).to_obj_string();
        assert_eq!(obj.lines().filter(|l| l.starts_with("v ")).count(), 6);
        assert_eq!(obj.lines().filter(|l| l.starts_with("f ")).count(), 2);
        assert!(obj.contains("f 1//1 2//2 3//3"));
    }
}
