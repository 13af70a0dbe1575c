#![warn(missing_docs)]

//! The skelform skeleton document.
//!
//! A [`Document`] owns a part-based skeleton: [`Node`]s joined by
//! [`Edge`]s, grouped into [`Part`]s, arranged in a tree of
//! [`Component`]s, and rigged with [`Bone`]s. It provides:
//!
//! - editing operations that keep the graph consistent (removing a node
//!   can split its part in several, connecting two parts merges them),
//! - conversion to and from [`Snapshot`](skelform_ir::Snapshot)s, which
//!   back undo/redo, the clipboard and saved files,
//! - background mesh, texture and bone generation.
//!
//! Edits never fail. Requests that do not apply are ignored, and every
//! change is reported as a [`DocumentEvent`].
//!
//! ```
//! use skelform_document::{Document, DocumentEvent};
//! use skelform_math::Point3;
//!
//! let mut doc = Document::new();
//! let a = doc.add_node(Point3::new(0.4, 0.5, 0.5), 0.1, None).unwrap();
//! let b = doc.add_node(Point3::new(0.6, 0.5, 0.5), 0.1, Some(a)).unwrap();
//! assert_eq!(doc.parts().len(), 1);
//!
//! let edge = doc.find_edge_by_nodes(a, b).unwrap().id;
//! doc.remove_edge(edge);
//! assert_eq!(doc.parts().len(), 2);
//! assert!(doc.drain_events().contains(&DocumentEvent::SkeletonChanged));
//! ```

mod bones;
mod clipboard;
pub mod codec;
mod components;
pub mod config;
mod document;
pub mod entity;
pub mod error;
pub mod event;
mod history;
mod parts;
pub mod pipeline;
mod skeleton;

pub use codec::{IdTable, SnapshotFor, SnapshotSource};
pub use config::{DocumentConfig, DEFAULT_MAX_SNAPSHOTS};
pub use document::Document;
pub use entity::{
    Bone, Component, Edge, EditMode, Node, Part, LINK_DATA_TYPE_PART, MAX_NODE_RADIUS,
    MIN_NODE_RADIUS,
};
pub use error::{DocumentError, Result};
pub use event::{DocumentEvent, LockAxis};
pub use pipeline::JobKind;
