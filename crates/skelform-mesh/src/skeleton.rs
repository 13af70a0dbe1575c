//! Built-in mesher: a low-poly sphere per node and a tube per edge.

use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::PI;

use skelform_ir::{
    is_true, split_list, to_float, value_or_empty, Attributes, CombineMode, PartTarget, Snapshot,
};
use skelform_math::{normalized_or_zero, Color, Point3, Vec3};
use tracing::{debug, warn};

use crate::cache::{part_fingerprint, GeneratedCacheContext};
use crate::generator::{MeshGenerationInput, MeshGenerationOutput, MeshGenerator};
use crate::model::{ModelMesh, MonochromeMesh};
use crate::object::{Object, ObjectNode, PartGeometry};
use crate::preview::{render_silhouette, PREVIEW_IMAGE_SIZE};
use crate::{canvas_origin, node_mesh_position};

/// Tessellation density of the built-in mesher.
#[derive(Debug, Clone, Copy)]
pub struct SkeletonMeshGenerator {
    /// Vertices around each sphere latitude ring.
    pub sphere_segments: usize,
    /// Latitude bands per sphere.
    pub sphere_rings: usize,
    /// Vertices around each tube ring.
    pub tube_segments: usize,
}

impl Default for SkeletonMeshGenerator {
    fn default() -> Self {
        Self {
            sphere_segments: 8,
            sphere_rings: 4,
            tube_segments: 8,
        }
    }
}

/// A part in component-tree order.
#[derive(Debug, Clone, PartialEq)]
struct PartSlot {
    part_id: String,
    component_id: Option<String>,
    subtractive: bool,
}

/// Parts in the order a depth-first walk of the component tree reaches
/// them, followed by any part no component links to.
fn collect_parts(snapshot: &Snapshot) -> Vec<PartSlot> {
    fn walk(
        snapshot: &Snapshot,
        children: &str,
        subtractive: bool,
        visited: &mut BTreeSet<String>,
        out: &mut Vec<PartSlot>,
    ) {
        for child_id in split_list(children) {
            if !visited.insert(child_id.to_string()) {
                continue;
            }
            let Some(component) = snapshot.components.get(child_id) else {
                continue;
            };
            let mode: CombineMode = value_or_empty(component, "combineMode")
                .parse()
                .unwrap_or_default();
            let subtractive = subtractive
                || matches!(mode, CombineMode::Inversion | CombineMode::Difference);
            if value_or_empty(component, "linkDataType") == "partId" {
                out.push(PartSlot {
                    part_id: value_or_empty(component, "linkData").to_string(),
                    component_id: Some(child_id.to_string()),
                    subtractive,
                });
            }
            walk(
                snapshot,
                value_or_empty(component, "children"),
                subtractive,
                visited,
                out,
            );
        }
    }

    let mut slots = Vec::new();
    let mut visited = BTreeSet::new();
    walk(
        snapshot,
        value_or_empty(&snapshot.root_component, "children"),
        false,
        &mut visited,
        &mut slots,
    );
    let reached: BTreeSet<String> = slots.iter().map(|s| s.part_id.clone()).collect();
    for part_id in snapshot.parts.keys() {
        if !reached.contains(part_id) {
            slots.push(PartSlot {
                part_id: part_id.clone(),
                component_id: None,
                subtractive: false,
            });
        }
    }
    slots
}

impl SkeletonMeshGenerator {
    fn build_part(
        &self,
        snapshot: &Snapshot,
        part_id: &str,
        part: &Attributes,
        origin: &Point3,
        default_color: Color,
    ) -> PartGeometry {
        let color = Color::from_hex(value_or_empty(part, "color")).unwrap_or(default_color);
        let mut geometry = PartGeometry::new(color);

        let mut centers: BTreeMap<&str, (Point3, f64)> = BTreeMap::new();
        for (node_id, node) in &snapshot.nodes {
            if value_or_empty(node, "partId") != part_id {
                continue;
            }
            let center = node_mesh_position(node, origin);
            let radius = to_float(value_or_empty(node, "radius"));
            centers.insert(node_id.as_str(), (center, radius));
            self.add_sphere(&mut geometry, &center, radius, node_id);
            geometry.nodes.push(ObjectNode {
                part_id: part_id.to_string(),
                node_id: node_id.clone(),
                origin: center,
                radius,
                color,
                mirrored: false,
            });
        }

        for edge in snapshot.edges.values() {
            if value_or_empty(edge, "partId") != part_id {
                continue;
            }
            let from = value_or_empty(edge, "from");
            let to = value_or_empty(edge, "to");
            let (Some(&a), Some(&b)) = (centers.get(from), centers.get(to)) else {
                debug!(part_id, from, to, "edge endpoint missing, skipped");
                continue;
            };
            self.add_tube(&mut geometry, (from, a), (to, b));
        }

        if is_true(value_or_empty(part, "xMirrored")) {
            mirror(&mut geometry);
        }
        geometry
    }

    fn add_sphere(&self, g: &mut PartGeometry, center: &Point3, radius: f64, node_id: &str) {
        let segments = self.sphere_segments.max(3);
        let rings = self.sphere_rings.max(2);

        let top = g.push_vertex(center + Vec3::new(0.0, radius, 0.0), Some(node_id));
        let mut ring_starts = Vec::with_capacity(rings - 1);
        for i in 1..rings {
            let phi = PI * i as f64 / rings as f64;
            ring_starts.push(g.vertices.len());
            for j in 0..segments {
                let theta = 2.0 * PI * j as f64 / segments as f64;
                let offset = Vec3::new(
                    radius * phi.sin() * theta.cos(),
                    radius * phi.cos(),
                    radius * phi.sin() * theta.sin(),
                );
                g.push_vertex(center + offset, Some(node_id));
            }
        }
        let bottom = g.push_vertex(center - Vec3::new(0.0, radius, 0.0), Some(node_id));

        let first = ring_starts[0];
        let last = ring_starts[ring_starts.len() - 1];
        for j in 0..segments {
            let next = (j + 1) % segments;
            g.triangles.push([top, first + next, first + j]);
            g.triangles.push([bottom, last + j, last + next]);
        }
        for pair in ring_starts.windows(2) {
            connect_rings(g, pair[0], pair[1], segments);
        }
    }

    /// Three rings: the two end rings belong to their nodes, the middle
    /// ring to neither.
    fn add_tube(&self, g: &mut PartGeometry, from: (&str, (Point3, f64)), to: (&str, (Point3, f64))) {
        let (from_id, (pa, ra)) = from;
        let (to_id, (pb, rb)) = to;
        let direction = pb - pa;
        let axis = normalized_or_zero(&direction);
        if axis == Vec3::zeros() {
            return;
        }
        let helper = if axis.y.abs() < 0.9 {
            Vec3::y()
        } else {
            Vec3::x()
        };
        let u = normalized_or_zero(&axis.cross(&helper));
        let v = axis.cross(&u);
        let segments = self.tube_segments.max(3);

        let mut ring_starts = [0usize; 3];
        for (k, t) in [0.0, 0.5, 1.0].into_iter().enumerate() {
            let center = pa + direction * t;
            let radius = ra + (rb - ra) * t;
            let node = match k {
                0 => Some(from_id),
                2 => Some(to_id),
                _ => None,
            };
            ring_starts[k] = g.vertices.len();
            for j in 0..segments {
                let theta = 2.0 * PI * j as f64 / segments as f64;
                let offset = (u * theta.cos() + v * theta.sin()) * radius;
                g.push_vertex(center + offset, node);
            }
        }
        connect_rings(g, ring_starts[0], ring_starts[1], segments);
        connect_rings(g, ring_starts[1], ring_starts[2], segments);
    }
}

fn connect_rings(g: &mut PartGeometry, upper: usize, lower: usize, segments: usize) {
    for j in 0..segments {
        let next = (j + 1) % segments;
        let (a, b, c, d) = (upper + j, upper + next, lower + j, lower + next);
        g.triangles.push([a, d, c]);
        g.triangles.push([a, b, d]);
    }
}

/// Append a copy reflected through the x = 0 plane.
fn mirror(g: &mut PartGeometry) {
    let vertex_count = g.vertices.len();
    let triangle_count = g.triangles.len();
    for i in 0..vertex_count {
        let p = g.vertices[i];
        let node = g.vertex_nodes[i].clone();
        g.vertices.push(Point3::new(-p.x, p.y, p.z));
        g.vertex_nodes.push(node);
    }
    for t in 0..triangle_count {
        let [a, b, c] = g.triangles[t];
        g.triangles
            .push([a + vertex_count, c + vertex_count, b + vertex_count]);
    }
    let mirrored: Vec<ObjectNode> = g
        .nodes
        .iter()
        .map(|node| ObjectNode {
            origin: Point3::new(-node.origin.x, node.origin.y, node.origin.z),
            mirrored: true,
            ..node.clone()
        })
        .collect();
    g.nodes.extend(mirrored);
}

impl MeshGenerator for SkeletonMeshGenerator {
    fn generate(
        &self,
        input: &MeshGenerationInput,
        cache: &mut GeneratedCacheContext,
    ) -> MeshGenerationOutput {
        let snapshot = &input.snapshot;
        let origin = canvas_origin(snapshot);
        let default_color = input.default_part_color.to_hex_argb();
        let threshold = input.smooth_shading_threshold_degrees;

        let mut output = MeshGenerationOutput::default();
        let mut object = Object::new();
        let mut live = BTreeSet::new();

        for slot in collect_parts(snapshot) {
            let Some(part) = snapshot.parts.get(&slot.part_id) else {
                debug!(part_id = %slot.part_id, "component links to a missing part");
                continue;
            };
            if is_true(value_or_empty(part, "disabled")) {
                continue;
            }
            let target: PartTarget = value_or_empty(part, "target").parse().unwrap_or_default();
            if target != PartTarget::Model {
                continue;
            }
            if slot.subtractive {
                debug!(part_id = %slot.part_id, "subtractive part left out of the result");
                continue;
            }
            live.insert(slot.part_id.clone());

            let fingerprint = part_fingerprint(snapshot, &slot.part_id, &[default_color.as_str()]);
            let dirty = is_true(value_or_empty(part, "__dirty"));
            let cached = if dirty {
                None
            } else {
                cache.lookup(&slot.part_id, fingerprint).cloned()
            };
            let geometry = match cached {
                Some(geometry) => geometry,
                None => {
                    let geometry = self.build_part(
                        snapshot,
                        &slot.part_id,
                        part,
                        &origin,
                        input.default_part_color,
                    );
                    cache.store(&slot.part_id, fingerprint, geometry.clone());
                    geometry
                }
            };

            if dirty {
                if let Some(component_id) = &slot.component_id {
                    let mut part_object = Object::new();
                    part_object.append_part(&slot.part_id, &geometry);
                    let preview = ModelMesh::from_object(&part_object, threshold);
                    output.component_preview_images.insert(
                        component_id.clone(),
                        render_silhouette(&preview, PREVIEW_IMAGE_SIZE),
                    );
                    output
                        .component_preview_meshes
                        .insert(component_id.clone(), preview);
                    output
                        .generated_preview_component_ids
                        .insert(component_id.clone());
                }
            }

            object.append_part(&slot.part_id, &geometry);
        }
        cache.retain_parts(&live);

        if !object.is_finite() {
            warn!("mesh generation produced non-finite coordinates");
            output.successful = false;
            return output;
        }
        if input.weld_enabled {
            object.weld();
        }

        debug!(
            vertices = object.num_vertices(),
            triangles = object.num_triangles(),
            cache_hits = cache.hits(),
            "mesh generated"
        );
        output.result_mesh = Some(ModelMesh::from_object(&object, threshold));
        output.wireframe = Some(MonochromeMesh::from_object(&object));
        output.object = Some(object);
        output.successful = true;
        output
    }
}
