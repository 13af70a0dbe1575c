#![warn(missing_docs)]

//! UV mapping and texture baking for skelform.
//!
//! A [`TextureGenerator`] takes the [`Object`] produced by mesh generation
//! together with the snapshot it came from and returns:
//!
//! - five texture images: color, normal, metalness, roughness and ambient
//!   occlusion (metalness and roughness only when some part sets them),
//! - a UV-mapped copy of the object and a renderable mesh built from it.
//!
//! [`UvMapGenerator`] is the built-in implementation. It gives every
//! triangle its own slot in a square atlas, which wastes texture space but
//! never produces overlapping charts.

pub mod atlas;
pub mod bake;

use std::collections::BTreeMap;

use image::{Rgba, RgbaImage};
use skelform_ir::{is_true, to_float, value_or_empty, Snapshot};
use skelform_math::Color;
use skelform_mesh::{ModelMesh, Object};
use tracing::debug;

use crate::atlas::layout_triangles;
use crate::bake::{color_pixel, fill_triangle, normal_pixel, scalar_pixel};

/// Default metalness of a part without a `metallic` attribute.
pub const DEFAULT_METALNESS: f64 = 0.0;

/// Default roughness of a part without a `roughness` attribute.
pub const DEFAULT_ROUGHNESS: f64 = 1.0;

/// Everything a texture job needs, owned outright.
#[derive(Debug, Clone)]
pub struct TextureGenerationInput {
    /// Result of the last mesh generation.
    pub object: Object,
    /// Snapshot the object was generated from.
    pub snapshot: Snapshot,
    /// Side length of every produced image.
    pub texture_size: u32,
}

/// What a texture job hands back.
#[derive(Debug, Default)]
pub struct TextureGenerationOutput {
    /// Base color.
    pub color_image: Option<RgbaImage>,
    /// Object-space normals.
    pub normal_image: Option<RgbaImage>,
    /// Metalness (grayscale), when any part is metallic.
    pub metalness_image: Option<RgbaImage>,
    /// Roughness (grayscale), when any part overrides it.
    pub roughness_image: Option<RgbaImage>,
    /// Ambient occlusion (grayscale).
    pub ambient_occlusion_image: Option<RgbaImage>,
    /// Renderable UV-mapped mesh.
    pub result_texture_mesh: Option<ModelMesh>,
    /// The input object with per-corner UVs assigned.
    pub object: Option<Object>,
}

/// Bakes textures for a generated object. Runs on a worker thread.
pub trait TextureGenerator: Send + Sync {
    /// Generate textures for `input`.
    fn generate(&self, input: &TextureGenerationInput) -> TextureGenerationOutput;
}

/// Material values of one part.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Material {
    metalness: f64,
    roughness: f64,
    countershaded: bool,
}

/// Built-in atlas UV mapper and flat baker.
#[derive(Debug, Clone, Copy, Default)]
pub struct UvMapGenerator;

impl UvMapGenerator {
    /// Create the generator.
    pub fn new() -> Self {
        Self
    }
}

impl TextureGenerator for UvMapGenerator {
    fn generate(&self, input: &TextureGenerationInput) -> TextureGenerationOutput {
        let size = input.texture_size.max(1);
        let mut object = input.object.clone();
        object.triangle_vertex_uvs = layout_triangles(object.num_triangles());

        let mut has_metalness = false;
        let mut has_roughness = false;
        let materials: BTreeMap<&str, Material> = input
            .snapshot
            .parts
            .iter()
            .map(|(id, part)| {
                let metallic = value_or_empty(part, "metallic");
                let roughness = value_or_empty(part, "roughness");
                has_metalness |= !metallic.is_empty();
                has_roughness |= !roughness.is_empty();
                let material = Material {
                    metalness: if metallic.is_empty() {
                        DEFAULT_METALNESS
                    } else {
                        to_float(metallic)
                    },
                    roughness: if roughness.is_empty() {
                        DEFAULT_ROUGHNESS
                    } else {
                        to_float(roughness)
                    },
                    countershaded: is_true(value_or_empty(part, "countershaded")),
                };
                (id.as_str(), material)
            })
            .collect();
        let fallback = Material {
            metalness: DEFAULT_METALNESS,
            roughness: DEFAULT_ROUGHNESS,
            countershaded: false,
        };

        let mut color_image = RgbaImage::new(size, size);
        let mut normal_image = RgbaImage::from_pixel(size, size, Rgba([128, 128, 255, 255]));
        let mut metalness_image = RgbaImage::from_pixel(size, size, scalar_pixel(DEFAULT_METALNESS));
        let mut roughness_image = RgbaImage::from_pixel(size, size, scalar_pixel(DEFAULT_ROUGHNESS));
        let ambient_occlusion_image = RgbaImage::from_pixel(size, size, scalar_pixel(1.0));

        for (t, uv) in object.triangle_vertex_uvs.iter().enumerate() {
            let material = object
                .triangle_part_ids
                .get(t)
                .and_then(|id| materials.get(id.as_str()))
                .copied()
                .unwrap_or(fallback);
            let normal = object.triangle_normal(t);
            let mut color = object
                .triangle_colors
                .get(t)
                .copied()
                .unwrap_or_else(Color::white);
            if material.countershaded && normal.y < 0.0 {
                let alpha = color.a;
                color = color * 0.7 + Color::white() * 0.3;
                color.a = alpha;
            }

            fill_triangle(&mut color_image, uv, color_pixel(&color));
            fill_triangle(&mut normal_image, uv, normal_pixel(&normal));
            if has_metalness {
                fill_triangle(&mut metalness_image, uv, scalar_pixel(material.metalness));
            }
            if has_roughness {
                fill_triangle(&mut roughness_image, uv, scalar_pixel(material.roughness));
            }
        }

        debug!(
            triangles = object.num_triangles(),
            size, has_metalness, has_roughness, "texture baked"
        );

        TextureGenerationOutput {
            color_image: Some(color_image),
            normal_image: Some(normal_image),
            metalness_image: has_metalness.then_some(metalness_image),
            roughness_image: has_roughness.then_some(roughness_image),
            ambient_occlusion_image: Some(ambient_occlusion_image),
            result_texture_mesh: Some(ModelMesh::from_object(&object, 0.0)),
            object: Some(object),
        }
    }
}
