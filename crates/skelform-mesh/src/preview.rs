//! Component preview thumbnails.

use image::{Rgba, RgbaImage};
use skelform_math::Point3;

use crate::model::ModelMesh;

/// Side length of component preview images.
pub const PREVIEW_IMAGE_SIZE: u32 = 64;

/// Front orthographic silhouette of `mesh`, scaled to fit a `size` square.
///
/// Faces are shaded by how directly they face the viewer. Pixels no
/// triangle covers stay transparent.
pub fn render_silhouette(mesh: &ModelMesh, size: u32) -> RgbaImage {
    let mut image = RgbaImage::new(size, size);
    if mesh.is_empty() || size == 0 {
        return image;
    }

    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for v in &mesh.vertices {
        min_x = min_x.min(v.x);
        min_y = min_y.min(v.y);
        max_x = max_x.max(v.x);
        max_y = max_y.max(v.y);
    }
    let extent = (max_x - min_x).max(max_y - min_y);
    if !extent.is_finite() || extent <= 0.0 {
        return image;
    }

    let margin = 2.0;
    let scale = (f64::from(size) - 2.0 * margin) / extent;
    let center_x = (min_x + max_x) / 2.0;
    let center_y = (min_y + max_y) / 2.0;
    let half = f64::from(size) / 2.0;
    let project = |p: &Point3| -> (f64, f64) {
        (
            half + (p.x - center_x) * scale,
            half - (p.y - center_y) * scale,
        )
    };

    let mut depth = vec![f64::NEG_INFINITY; (size * size) as usize];
    for triangle in &mesh.triangles {
        let a = project(&mesh.vertices[triangle[0]]);
        let b = project(&mesh.vertices[triangle[1]]);
        let c = project(&mesh.vertices[triangle[2]]);
        let area = edge(a, b, c);
        if area.abs() < 1e-12 {
            continue;
        }
        let normal = (mesh.normals[triangle[0]]
            + mesh.normals[triangle[1]]
            + mesh.normals[triangle[2]])
            / 3.0;
        let shade = 0.4 + 0.6 * normal.z.abs().min(1.0);
        let color = mesh.colors[triangle[0]];
        let z = (mesh.vertices[triangle[0]].z
            + mesh.vertices[triangle[1]].z
            + mesh.vertices[triangle[2]].z)
            / 3.0;

        let x0 = a.0.min(b.0).min(c.0).floor().max(0.0) as u32;
        let y0 = a.1.min(b.1).min(c.1).floor().max(0.0) as u32;
        let x1 = (a.0.max(b.0).max(c.0).ceil() as u32).min(size - 1);
        let y1 = (a.1.max(b.1).max(c.1).ceil() as u32).min(size - 1);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let p = (f64::from(x) + 0.5, f64::from(y) + 0.5);
                let w0 = edge(b, c, p) / area;
                let w1 = edge(c, a, p) / area;
                let w2 = edge(a, b, p) / area;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }
                let slot = (y * size + x) as usize;
                if z < depth[slot] {
                    continue;
                }
                depth[slot] = z;
                let [r, g, b, _] = (color * shade).to_rgba8();
                image.put_pixel(x, y, Rgba([r, g, b, color.to_rgba8()[3]]));
            }
        }
    }
    image
}

fn edge(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> f64 {
    (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Object, PartGeometry};
    use skelform_math::Color;

    fn square() -> ModelMesh {
        let mut g = PartGeometry::new(Color::rgb(1.0, 0.0, 0.0));
        g.push_vertex(Point3::new(0.0, 0.0, 0.0), None);
        g.push_vertex(Point3::new(1.0, 0.0, 0.0), None);
        g.push_vertex(Point3::new(1.0, 1.0, 0.0), None);
        g.push_vertex(Point3::new(0.0, 1.0, 0.0), None);
        g.triangles.push([0, 1, 2]);
        g.triangles.push([0, 2, 3]);
        let mut object = Object::new();
        object.append_part("p", &g);
        ModelMesh::from_object(&object, 0.0)
    }

    #[test]
    fn test_silhouette_covers_center() {
        let image = render_silhouette(&square(), 32);
        assert_eq!(image.dimensions(), (32, 32));
        let center = image.get_pixel(16, 16);
        assert_eq!(center.0, [255, 0, 0, 255]);
        assert_eq!(image.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn test_empty_mesh_gives_blank_image() {
        let object = Object::new();
        let image = render_silhouette(&ModelMesh::from_object(&object, 0.0), 8);
        assert!(image.pixels().all(|p| p.0[3] == 0));
    }
}
