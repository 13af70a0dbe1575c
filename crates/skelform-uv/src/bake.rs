//! Rasterizing per-triangle values into atlas images.

use image::{Rgba, RgbaImage};
use skelform_math::{Color, Vec3};

/// Fill the UV-space triangle `uv` with `pixel`.
///
/// A pixel is covered when its center lies inside the triangle; the
/// triangle is additionally dilated by half a pixel so thin slivers do not
/// disappear.
pub fn fill_triangle(image: &mut RgbaImage, uv: &[[f64; 2]; 3], pixel: Rgba<u8>) {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    let points: Vec<(f64, f64)> = uv
        .iter()
        .map(|c| (c[0] * f64::from(width), c[1] * f64::from(height)))
        .collect();
    let (a, b, c) = (points[0], points[1], points[2]);
    let area = edge(a, b, c);
    if area.abs() < 1e-12 {
        return;
    }

    let x0 = (a.0.min(b.0).min(c.0).floor() - 1.0).max(0.0) as u32;
    let y0 = (a.1.min(b.1).min(c.1).floor() - 1.0).max(0.0) as u32;
    let x1 = ((a.0.max(b.0).max(c.0).ceil() + 1.0).max(0.0) as u32).min(width - 1);
    let y1 = ((a.1.max(b.1).max(c.1).ceil() + 1.0).max(0.0) as u32).min(height - 1);

    let tolerance = 0.5 / f64::from(width.max(height));
    for y in y0..=y1 {
        for x in x0..=x1 {
            let p = (f64::from(x) + 0.5, f64::from(y) + 0.5);
            let w0 = edge(b, c, p) / area;
            let w1 = edge(c, a, p) / area;
            let w2 = edge(a, b, p) / area;
            if w0 >= -tolerance && w1 >= -tolerance && w2 >= -tolerance {
                image.put_pixel(x, y, pixel);
            }
        }
    }
}

fn edge(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> f64 {
    (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0)
}

/// Color as an image pixel.
pub fn color_pixel(color: &Color) -> Rgba<u8> {
    Rgba(color.to_rgba8())
}

/// Object-space normal packed into RGB.
pub fn normal_pixel(normal: &Vec3) -> Rgba<u8> {
    let q = |v: f64| ((v.clamp(-1.0, 1.0) + 1.0) * 0.5 * 255.0).round() as u8;
    Rgba([q(normal.x), q(normal.y), q(normal.z), 255])
}

/// A `0..=1` scalar as an opaque gray pixel.
pub fn scalar_pixel(value: f64) -> Rgba<u8> {
    let v = (value.clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgba([v, v, v, 255])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_triangle_covers_interior() {
        let mut image = RgbaImage::new(16, 16);
        let red = Rgba([255, 0, 0, 255]);
        fill_triangle(&mut image, &[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]], red);
        assert_eq!(*image.get_pixel(2, 2), red);
        assert_eq!(image.get_pixel(15, 15).0[3], 0);
    }

    #[test]
    fn test_degenerate_triangle_is_ignored() {
        let mut image = RgbaImage::new(4, 4);
        fill_triangle(
            &mut image,
            &[[0.0, 0.0], [0.5, 0.5], [1.0, 1.0]],
            Rgba([255, 255, 255, 255]),
        );
        assert!(image.pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn test_pixel_encodings() {
        assert_eq!(normal_pixel(&Vec3::z()).0, [128, 128, 255, 255]);
        assert_eq!(scalar_pixel(0.0).0, [0, 0, 0, 255]);
        assert_eq!(scalar_pixel(2.0).0, [255, 255, 255, 255]);
        assert_eq!(color_pixel(&Color::white()).0, [255, 255, 255, 255]);
    }
}
