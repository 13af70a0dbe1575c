//! Text payloads: clipboard copy/paste and whole-document XML or JSON.

use std::collections::BTreeSet;

use skelform_ir::xml::{contains_node_records, load_snapshot_from_xml_string, save_snapshot_to_xml_string};
use skelform_ir::Snapshot;
use uuid::Uuid;

use crate::codec::{IdTable, SnapshotFor, SnapshotSource};
use crate::document::Document;
use crate::error::Result;

impl Document {
    /// XML payload holding the given nodes with their parts, edges
    /// between them and enclosing components.
    pub fn copy_nodes(&self, node_ids: &BTreeSet<Uuid>) -> Result<String> {
        let snapshot = self.to_snapshot_for(node_ids, SnapshotFor::Nodes);
        Ok(save_snapshot_to_xml_string(&snapshot)?)
    }

    /// Whether `text` is worth offering to [`paste`](Self::paste).
    pub fn has_pastable_nodes(text: &str) -> bool {
        contains_node_records(text)
    }

    /// Add a copied payload under fresh IDs, keeping the current origin,
    /// and record the result in the undo history. Payloads without nodes
    /// are ignored.
    pub fn paste(&mut self, text: &str) -> Result<IdTable> {
        if !Self::has_pastable_nodes(text) {
            return Ok(IdTable::default());
        }
        let snapshot = load_snapshot_from_xml_string(text)?;
        let table = self.add_from_snapshot(&snapshot, SnapshotSource::Paste);
        self.save_snapshot();
        Ok(table)
    }

    /// The whole document as XML.
    pub fn to_xml_string(&self) -> Result<String> {
        Ok(save_snapshot_to_xml_string(&self.to_snapshot())?)
    }

    /// The whole document as JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(self.to_snapshot().to_json()?)
    }

    /// Replace the document with an XML payload and start a fresh history
    /// from it.
    pub fn load_xml_string(&mut self, text: &str) -> Result<()> {
        let snapshot = load_snapshot_from_xml_string(text)?;
        self.load_snapshot(&snapshot);
        Ok(())
    }

    /// Replace the document with a JSON payload and start a fresh history
    /// from it.
    pub fn load_json_string(&mut self, text: &str) -> Result<()> {
        let snapshot = Snapshot::from_json(text)?;
        self.load_snapshot(&snapshot);
        Ok(())
    }

    fn load_snapshot(&mut self, snapshot: &Snapshot) {
        self.from_snapshot(snapshot);
        self.clear_histories();
        self.save_snapshot();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocumentError;
    use skelform_math::Point3;

    fn two_parts(doc: &mut Document) -> (Uuid, Uuid, Uuid) {
        let a = doc.add_node(Point3::new(0.2, 0.5, 0.5), 0.1, None).unwrap();
        let b = doc.add_node(Point3::new(0.3, 0.5, 0.5), 0.1, Some(a)).unwrap();
        let c = doc.add_node(Point3::new(0.8, 0.5, 0.5), 0.1, None).unwrap();
        (a, b, c)
    }

    #[test]
    fn test_copy_then_paste_duplicates_selection() {
        let mut doc = Document::new();
        let (a, b, _) = two_parts(&mut doc);
        doc.save_snapshot();
        let payload = doc.copy_nodes(&[a, b].into_iter().collect()).unwrap();
        assert!(Document::has_pastable_nodes(&payload));

        let table = doc.paste(&payload).unwrap();

        assert_eq!(doc.nodes().len(), 5);
        assert_eq!(doc.edges().len(), 2);
        assert_eq!(doc.parts().len(), 3);
        let pasted_a = table.nodes[&a.to_string()];
        let pasted_b = table.nodes[&b.to_string()];
        assert!(doc.find_edge_by_nodes(pasted_a, pasted_b).is_some());
        assert!(doc.undoable());
        doc.undo();
        assert_eq!(doc.nodes().len(), 3);
    }

    #[test]
    fn test_paste_ignores_nodeless_text() {
        let mut doc = Document::new();
        let table = doc.paste("hello").unwrap();
        assert_eq!(table, IdTable::default());
        assert!(doc.nodes().is_empty());
    }

    #[test]
    fn test_xml_and_json_reload() {
        let mut doc = Document::new();
        two_parts(&mut doc);
        let xml = doc.to_xml_string().unwrap();
        let json = doc.to_json_string().unwrap();

        let mut from_xml = Document::new();
        from_xml.load_xml_string(&xml).unwrap();
        let mut from_json = Document::new();
        from_json.load_json_string(&json).unwrap();

        for loaded in [&from_xml, &from_json] {
            assert_eq!(loaded.nodes().len(), 3);
            assert_eq!(loaded.parts().len(), 2);
            assert_eq!(loaded.components().len(), 2);
            assert!(!loaded.undoable());
        }
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let mut doc = Document::new();
        let err = doc.load_json_string("{nodes").unwrap_err();
        assert!(matches!(err, DocumentError::Json(_)));
    }
}
