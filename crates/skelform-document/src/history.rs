//! Undo and redo over full-document snapshots.

use tracing::debug;

use crate::document::Document;

impl Document {
    /// Record the current state as the newest undo item, dropping the
    /// oldest beyond the configured depth.
    pub fn save_snapshot(&mut self) {
        let depth = self.config.max_snapshots.max(1);
        while self.undo_items.len() >= depth {
            self.undo_items.pop_front();
        }
        let snapshot = self.to_snapshot();
        self.undo_items.push_back(snapshot);
        debug!(undo_items = self.undo_items.len(), "snapshot saved");
    }

    /// Whether [`undo`](Self::undo) would do anything. The oldest item is
    /// the baseline and is never undone.
    pub fn undoable(&self) -> bool {
        self.undo_items.len() >= 2
    }

    /// Whether [`redo`](Self::redo) would do anything.
    pub fn redoable(&self) -> bool {
        !self.redo_items.is_empty()
    }

    /// Step back to the previous saved state.
    pub fn undo(&mut self) {
        if !self.undoable() {
            return;
        }
        let Some(current) = self.undo_items.pop_back() else {
            return;
        };
        self.redo_items.push(current);
        let Some(previous) = self.undo_items.back().cloned() else {
            return;
        };
        self.from_snapshot(&previous);
        debug!(
            undo_items = self.undo_items.len(),
            redo_items = self.redo_items.len(),
            "undo"
        );
    }

    /// Step forward to the state last undone.
    pub fn redo(&mut self) {
        let Some(item) = self.redo_items.pop() else {
            return;
        };
        self.from_snapshot(&item);
        self.undo_items.push_back(item);
        debug!(
            undo_items = self.undo_items.len(),
            redo_items = self.redo_items.len(),
            "redo"
        );
    }

    /// Forget every undo and redo item.
    pub fn clear_histories(&mut self) {
        self.undo_items.clear();
        self.redo_items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DocumentConfig;
    use skelform_math::Point3;

    fn add_chain_saving_each(doc: &mut Document, count: usize) {
        let mut previous = None;
        for i in 0..count {
            previous = doc.add_node(Point3::new(0.1 * (i + 1) as f64, 0.5, 0.5), 0.05, previous);
            doc.save_snapshot();
        }
    }

    #[test]
    fn test_undo_returns_to_baseline() {
        let mut doc = Document::new();
        doc.save_snapshot();
        add_chain_saving_each(&mut doc, 3);
        assert!(!doc.redoable());

        for _ in 0..3 {
            assert!(doc.undoable());
            doc.undo();
            assert!(doc.redoable());
        }
        assert!(doc.nodes().is_empty());
        assert!(!doc.undoable());
        doc.undo();
        assert!(doc.nodes().is_empty());
    }

    #[test]
    fn test_redo_replays_same_ids() {
        let mut doc = Document::new();
        doc.save_snapshot();
        add_chain_saving_each(&mut doc, 2);
        let ids: Vec<_> = doc.nodes().keys().copied().collect();

        doc.undo();
        assert_eq!(doc.nodes().len(), 1);
        doc.redo();
        assert_eq!(doc.nodes().keys().copied().collect::<Vec<_>>(), ids);
        assert_eq!(doc.edges().len(), 1);
        assert!(!doc.redoable());
    }

    #[test]
    fn test_depth_is_capped() {
        let config = DocumentConfig {
            max_snapshots: 3,
            ..DocumentConfig::default()
        };
        let mut doc = Document::with_config(config);
        doc.save_snapshot();
        add_chain_saving_each(&mut doc, 5);
        assert_eq!(doc.undo_items.len(), 3);

        doc.undo();
        doc.undo();
        assert!(!doc.undoable());
        assert_eq!(doc.nodes().len(), 3);
    }

    #[test]
    fn test_clear_histories() {
        let mut doc = Document::new();
        doc.save_snapshot();
        add_chain_saving_each(&mut doc, 2);
        doc.undo();
        doc.clear_histories();
        assert!(!doc.undoable());
        assert!(!doc.redoable());
    }
}
