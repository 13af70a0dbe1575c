#![warn(missing_docs)]

//! Snapshot representation for skelform skeleton documents.
//!
//! A [`Snapshot`] is a flat, string-keyed picture of a whole document (or a
//! selection of it): nodes, edges, parts, components, bones, the root
//! component's children and the canvas origin. Every record is a sparse
//! `attribute name → string value` map, so attributes at their default
//! value are simply absent.
//!
//! Snapshots are the only thing that crosses from the document to the
//! generators, and they are also what undo history, the clipboard and
//! saved files contain. Text encodings live in [`xml`] (the interchange
//! format) and on [`Snapshot`] itself (JSON).
//!
//! # Example
//!
//! ```
//! use skelform_ir::{Attributes, Snapshot};
//!
//! let mut snapshot = Snapshot::new();
//! let mut node = Attributes::new();
//! node.insert("id".into(), "n1".into());
//! node.insert("radius".into(), "0.1".into());
//! snapshot.nodes.insert("n1".into(), node);
//!
//! let xml = skelform_ir::xml::save_snapshot_to_xml_string(&snapshot).unwrap();
//! let restored = skelform_ir::xml::load_snapshot_from_xml_string(&xml).unwrap();
//! assert_eq!(snapshot, restored);
//! ```

pub mod error;
pub mod xml;

pub use error::{Result, XmlError};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One sparse record: attribute name to string value.
pub type Attributes = BTreeMap<String, String>;

/// Records of one entity kind, keyed by entity ID string.
pub type RecordMap = BTreeMap<String, Attributes>;

/// Flat serializable picture of a skeleton document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Canvas attributes (`originX`, `originY`, `originZ`).
    #[serde(default)]
    pub canvas: Attributes,
    /// Node records.
    #[serde(default)]
    pub nodes: RecordMap,
    /// Edge records.
    #[serde(default)]
    pub edges: RecordMap,
    /// Part records.
    #[serde(default)]
    pub parts: RecordMap,
    /// Component records.
    #[serde(default)]
    pub components: RecordMap,
    /// The root component (only `children` is meaningful).
    #[serde(default)]
    pub root_component: Attributes,
    /// Bone records.
    #[serde(default)]
    pub bones: RecordMap,
    /// Bone IDs in display order.
    #[serde(default)]
    pub bone_id_list: Vec<String>,
}

impl Snapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the snapshot holds no entities at all.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
            && self.edges.is_empty()
            && self.parts.is_empty()
            && self.components.is_empty()
            && self.bones.is_empty()
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Axis-aligned bounds of all nodes, each inflated by its radius.
    ///
    /// Returns `None` when there are no nodes.
    pub fn node_bounds(&self) -> Option<Bounds> {
        let mut bounds: Option<Bounds> = None;
        for node in self.nodes.values() {
            let radius = to_float(value_or_empty(node, "radius"));
            let center = [
                to_float(value_or_empty(node, "x")),
                to_float(value_or_empty(node, "y")),
                to_float(value_or_empty(node, "z")),
            ];
            let b = bounds.get_or_insert(Bounds {
                min: [f64::INFINITY; 3],
                max: [f64::NEG_INFINITY; 3],
            });
            for axis in 0..3 {
                b.min[axis] = b.min[axis].min(center[axis] - radius);
                b.max[axis] = b.max[axis].max(center[axis] + radius);
            }
        }
        bounds
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Minimum corner.
    pub min: [f64; 3],
    /// Maximum corner.
    pub max: [f64; 3],
}

impl Bounds {
    /// Center point.
    pub fn center(&self) -> [f64; 3] {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
            (self.min[2] + self.max[2]) / 2.0,
        ]
    }
}

// =========================================================================
// Attribute helpers
// =========================================================================

/// Value of `key`, or `""` when absent.
pub fn value_or_empty<'a>(attributes: &'a Attributes, key: &str) -> &'a str {
    attributes.get(key).map(String::as_str).unwrap_or("")
}

/// `"true"` (case-insensitive) or `"1"`.
pub fn is_true(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

/// Boolean attribute text.
pub fn bool_text(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Lenient float parse; unparsable text reads as `0.0`.
pub fn to_float(value: &str) -> f64 {
    value.trim().parse().unwrap_or(0.0)
}

/// Lenient integer parse; unparsable text reads as `0`.
pub fn to_int(value: &str) -> i64 {
    value.trim().parse().unwrap_or(0)
}

/// Fixed six-decimal float text, the precision snapshots are written with.
pub fn float_text(value: f64) -> String {
    format!("{value:.6}")
}

/// Split a comma-separated ID list, skipping empty items.
pub fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Join items into a comma-separated list.
pub fn join_list<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(item.as_ref());
    }
    out
}

// =========================================================================
// Enumerations with string forms
// =========================================================================

/// A string did not name any variant of an enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct UnknownVariant {
    /// Enumeration name.
    pub kind: &'static str,
    /// Offending text.
    pub value: String,
}

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Canonical text form.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum! {
    /// Cross-section profile swept along a part's edges.
    CutFace, "cut face" {
        /// Four-sided profile.
        #[default]
        Quad => "Quad",
        /// Five-sided profile.
        Pentagon => "Pentagon",
        /// Six-sided profile.
        Hexagon => "Hexagon",
        /// Three-sided profile.
        Triangle => "Triangle",
        /// Profile donated by another part (see `cutFaceLinkedId`).
        UserDefined => "UserDefined",
    }
}

impl CutFace {
    /// Built-in profiles, in menu order (excludes [`CutFace::UserDefined`]).
    pub const BUILT_IN: [CutFace; 4] = [
        CutFace::Quad,
        CutFace::Pentagon,
        CutFace::Hexagon,
        CutFace::Triangle,
    ];
}

string_enum! {
    /// What a part contributes to generation.
    PartTarget, "part target" {
        /// Renderable geometry.
        #[default]
        Model => "Model",
        /// A 2D profile donor for other parts' cut faces.
        CutFace => "CutFace",
    }
}

string_enum! {
    /// How a component is composited into the final mesh.
    CombineMode, "combine mode" {
        /// Default compositing.
        #[default]
        Normal => "Normal",
        /// Inverted (subtractive) compositing.
        Inversion => "Inversion",
        /// Explicit union.
        Union => "Union",
        /// Difference against preceding siblings.
        Difference => "Difference",
        /// Intersection with preceding siblings.
        Intersection => "Intersection",
    }
}
