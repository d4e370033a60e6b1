//! Parser state: the unit of mutation the host manipulates.

use text_size::TextSize;

use marktree_syntax::{Document, Node, SourceText, parse_source};
use tracing::debug;

use crate::config::UpdateConfig;
use crate::update::{Edit, UpdateResult, update_source};

/// Owns the current source text and its parsed document.
///
/// Single-writer: exactly one logical owner issues edits serially. The type
/// performs no I/O and no internal locking; overlapping `apply_edit` calls
/// against one value are a caller bug (callers offloading parses to a worker
/// must gate results with a generation counter and drop stale ones).
#[derive(Debug, Clone)]
pub struct ParserState {
    source: SourceText,
    document: Document,
    config: UpdateConfig,
}

impl ParserState {
    pub fn new(text: &str) -> Self {
        Self::with_config(text, UpdateConfig::default())
    }

    pub fn with_config(text: &str, config: UpdateConfig) -> Self {
        let source = SourceText::new(text);
        let document = parse_source(&source);
        Self {
            source,
            document,
            config,
        }
    }

    pub fn source(&self) -> &SourceText {
        &self.source
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Replace text and tree wholesale, equivalent to a fresh parse.
    pub fn set_source(&mut self, text: &str) {
        self.source = SourceText::new(text);
        self.document = parse_source(&self.source);
        debug!(len = self.source.len_bytes(), "source replaced");
    }

    /// Apply one edit. `new_source` is the full post-edit text, which the
    /// host buffer already owns. Replaces the document with the updated tree
    /// and returns the contract consumers act on.
    pub fn apply_edit(&mut self, edit: &Edit, new_source: &str) -> UpdateResult {
        let new_src = SourceText::new(new_source);
        let (document, result) =
            update_source(&self.document, &self.source, edit, &new_src, &self.config);
        self.source = new_src;
        self.document = document;
        result
    }

    /// Innermost node containing `offset`, for cursor and hover queries.
    pub fn node_at(&self, offset: TextSize) -> Option<&Node> {
        self.document.node_at(offset)
    }

    /// Structural navigation by child-index path from the root.
    pub fn child_at(&self, path: &[usize]) -> Option<&Node> {
        self.document.child_at(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marktree_syntax::{NodeKind, parse};
    use pretty_assertions::assert_eq;
    use text_size::TextRange;

    #[test]
    fn new_parses_initial_text() {
        let state = ParserState::new("# Title\n\nBody text.");
        assert_eq!(state.document().root().children.len(), 2);
        assert_eq!(state.source().text(), "# Title\n\nBody text.");
    }

    #[test]
    fn set_source_replaces_wholesale() {
        let mut state = ParserState::new("old");
        let old_root = state.document().root().id;
        state.set_source("# entirely new");
        assert_eq!(
            state.child_at(&[0]).unwrap().kind,
            NodeKind::Heading { level: 1 }
        );
        // A fresh parse is a fresh identity.
        assert_ne!(state.document().root().id, old_root);
    }

    #[test]
    fn apply_edit_keeps_state_in_sync() {
        let mut state = ParserState::new("# Title\n\nBody text.");
        let edit = Edit::insert(7.into(), "!");
        let new_text = edit.apply(state.source());
        let result = state.apply_edit(&edit, &new_text);
        assert!(!result.is_structural_change);
        assert_eq!(state.source().text(), "# Title!\n\nBody text.");
        assert!(state.document().content_eq(&parse("# Title!\n\nBody text.")));
    }

    #[test]
    fn sequential_edits_accumulate() {
        let mut state = ParserState::new("abc");
        for (at, ch) in [(3u32, "d"), (4, "e"), (5, "f")] {
            let edit = Edit::insert(at.into(), ch);
            let new_text = edit.apply(state.source());
            state.apply_edit(&edit, &new_text);
        }
        assert_eq!(state.source().text(), "abcdef");
        assert!(state.document().content_eq(&parse("abcdef")));
    }

    #[test]
    fn lookups_pass_through() {
        let state = ParserState::new("# Title\n\nBody text.");
        assert_eq!(
            state.node_at(3.into()).map(|n| n.kind.clone()),
            Some(NodeKind::Heading { level: 1 })
        );
        assert!(state.node_at(999.into()).is_none());
        assert_eq!(
            state.child_at(&[1]).unwrap().range,
            TextRange::new(9.into(), 19.into())
        );
        assert!(state.child_at(&[7]).is_none());
    }
}
