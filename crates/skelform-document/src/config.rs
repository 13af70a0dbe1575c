//! Document options loadable from TOML.

use std::path::Path;

use serde::Deserialize;
use skelform_math::Color;

use crate::error::{DocumentError, Result};

/// Default undo history depth.
pub const DEFAULT_MAX_SNAPSHOTS: usize = 1000;

/// Document behavior options.
///
/// Every field is optional in TOML; missing fields take their defaults.
///
/// ```
/// use skelform_document::DocumentConfig;
///
/// let config = DocumentConfig::from_toml_str(r##"
///     max_snapshots = 50
///     default_part_color = "#ff808080"
/// "##).unwrap();
/// assert_eq!(config.max_snapshots, 50);
/// assert!(config.chain_after_mesh);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Undo history depth; the oldest item is dropped beyond it.
    pub max_snapshots: usize,
    /// Request generation whenever a skeleton, rig or texture change is
    /// announced.
    pub auto_generate: bool,
    /// Request texture and bone generation after every mesh result.
    pub chain_after_mesh: bool,
    /// Smooth normals across shallow edges.
    pub smooth_normal: bool,
    /// Merge coincident generated vertices.
    pub weld_enabled: bool,
    /// Color of parts without their own, as `#rrggbb` or `#aarrggbb`.
    #[serde(deserialize_with = "deserialize_color")]
    pub default_part_color: Color,
    /// Normal smoothing threshold used when `smooth_normal` is on.
    pub smooth_shading_threshold_degrees: f64,
    /// Side length of baked texture images.
    pub texture_size: u32,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            max_snapshots: DEFAULT_MAX_SNAPSHOTS,
            auto_generate: false,
            chain_after_mesh: true,
            smooth_normal: true,
            weld_enabled: true,
            default_part_color: Color::white(),
            smooth_shading_threshold_degrees: 60.0,
            texture_size: 256,
        }
    }
}

impl DocumentConfig {
    /// Parse from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

fn deserialize_color<'de, D>(deserializer: D) -> std::result::Result<Color, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    Color::from_hex(&text)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid color {text:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_text_gives_defaults() {
        let config = DocumentConfig::from_toml_str("").unwrap();
        assert_eq!(config, DocumentConfig::default());
        assert_eq!(config.max_snapshots, 1000);
        assert!(!config.auto_generate);
    }

    #[test]
    fn test_overrides() {
        let config = DocumentConfig::from_toml_str(
            r##"
            auto_generate = true
            smooth_normal = false
            texture_size = 64
            default_part_color = "#336699"
            "##,
        )
        .unwrap();
        assert!(config.auto_generate);
        assert!(!config.smooth_normal);
        assert_eq!(config.texture_size, 64);
        assert_relative_eq!(config.default_part_color.r, 0.2);
        assert_relative_eq!(config.default_part_color.a, 1.0);
    }

    #[test]
    fn test_bad_color_is_rejected() {
        let err = DocumentConfig::from_toml_str(r#"default_part_color = "blue""#).unwrap_err();
        assert!(matches!(err, DocumentError::Config(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = DocumentConfig::load("/nonexistent/skelform.toml").unwrap_err();
        assert!(matches!(err, DocumentError::Io { .. }));
    }
}
