//! Cross-run mesh generation cache.
//!
//! The cache belongs to the document. It is moved into a mesh job and
//! moved back out with the result, so consecutive jobs share it without
//! ever touching it at the same time.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};

use skelform_ir::{value_or_empty, Snapshot};

use crate::object::PartGeometry;

#[derive(Debug, Clone)]
struct CachedPart {
    fingerprint: u64,
    geometry: PartGeometry,
}

/// Geometry of previously generated parts, keyed by part ID.
#[derive(Debug, Default)]
pub struct GeneratedCacheContext {
    parts: HashMap<String, CachedPart>,
    hits: usize,
    misses: usize,
}

impl GeneratedCacheContext {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached geometry for `part_id`, if it was built from the same content.
    pub fn lookup(&mut self, part_id: &str, fingerprint: u64) -> Option<&PartGeometry> {
        match self.parts.get(part_id) {
            Some(cached) if cached.fingerprint == fingerprint => {
                self.hits += 1;
                Some(&cached.geometry)
            }
            _ => {
                self.misses += 1;
                None
            }
        }
    }

    /// Remember geometry built for `part_id`.
    pub fn store(&mut self, part_id: &str, fingerprint: u64, geometry: PartGeometry) {
        self.parts.insert(
            part_id.to_string(),
            CachedPart {
                fingerprint,
                geometry,
            },
        );
    }

    /// Forget every part not in `live`.
    pub fn retain_parts(&mut self, live: &BTreeSet<String>) {
        self.parts.retain(|id, _| live.contains(id));
    }

    /// Number of cached parts.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Lookups answered from the cache so far.
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Lookups that had to regenerate so far.
    pub fn misses(&self) -> usize {
        self.misses
    }

    /// Drop all cached geometry.
    pub fn clear(&mut self) {
        self.parts.clear();
    }
}

/// Content hash of everything that shapes a part's geometry: the part
/// record (minus bookkeeping flags), its nodes and edges, the canvas
/// origin and any caller-supplied extras.
pub fn part_fingerprint(snapshot: &Snapshot, part_id: &str, extras: &[&str]) -> u64 {
    let mut hasher = DefaultHasher::new();
    if let Some(part) = snapshot.parts.get(part_id) {
        for (key, value) in part {
            if key.starts_with("__") {
                continue;
            }
            key.hash(&mut hasher);
            value.hash(&mut hasher);
        }
    }
    for (id, node) in &snapshot.nodes {
        if value_or_empty(node, "partId") == part_id {
            id.hash(&mut hasher);
            node.hash(&mut hasher);
        }
    }
    for (id, edge) in &snapshot.edges {
        if value_or_empty(edge, "partId") == part_id {
            id.hash(&mut hasher);
            edge.hash(&mut hasher);
        }
    }
    snapshot.canvas.hash(&mut hasher);
    extras.hash(&mut hasher);
    hasher.finish()
}
