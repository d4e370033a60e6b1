//! Arena-indexed syntax tree model.
//!
//! The tree is a flat `Vec<Node>` owned by its [`Document`], with child lists
//! stored as index vectors. There are no parent back-references; structural
//! navigation goes top-down by range or child index. Two identities exist
//! side by side:
//!
//! - [`NodeIdx`] addresses an arena slot and is only meaningful inside the
//!   owning `Document`.
//! - [`NodeId`] is the process-unique stable identity consumers key off.
//!   The incremental updater preserves it whenever a node's content is
//!   judged unchanged, so caches and proximity trackers survive edits.

use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashMap;
use text_size::{TextRange, TextSize};

use crate::source::SourceText;

/// Stable node identity, minted once at node creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

impl NodeId {
    /// Mint a fresh process-unique id.
    pub fn mint() -> NodeId {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Arena slot index within one `Document`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeIdx(u32);

impl NodeIdx {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// The closed set of syntax kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Heading { level: u8 },
    Paragraph,
    Blockquote,
    List { ordered: bool },
    ListItem,
    CodeBlock { language: Option<String> },
    ThematicBreak,
    Text,
    Emphasis,
    Strong,
    InlineCode,
    Link,
    Image,
}

impl NodeKind {
    /// Block-level kinds participate in block-granularity reparse.
    pub fn is_block(&self) -> bool {
        matches!(
            self,
            NodeKind::Document
                | NodeKind::Heading { .. }
                | NodeKind::Paragraph
                | NodeKind::Blockquote
                | NodeKind::List { .. }
                | NodeKind::ListItem
                | NodeKind::CodeBlock { .. }
                | NodeKind::ThematicBreak
        )
    }

    pub fn is_inline(&self) -> bool {
        !self.is_block()
    }

    /// Same enum variant, ignoring payload (heading level, code language).
    pub fn same_variant(&self, other: &NodeKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// A single syntax-tree node.
///
/// `range` is a half-open interval in UTF-16 code units into the current
/// source. A node's range contains every child's range; sibling ranges are
/// sorted by start and never overlap. `content_hash` fingerprints the node's
/// source slice and is derived data: it is excluded from content equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub range: TextRange,
    pub children: Vec<NodeIdx>,
    pub content_hash: u64,
}

impl Node {
    pub fn is_block(&self) -> bool {
        self.kind.is_block()
    }

    /// Language tag, present only on code blocks carrying one.
    pub fn code_language(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::CodeBlock { language } => language.as_deref(),
            _ => None,
        }
    }
}

/// Fingerprint of a node's source bytes.
pub fn content_hash(bytes: &[u8]) -> u64 {
    use std::hash::Hasher;
    let mut hasher = rustc_hash::FxHasher::default();
    hasher.write(bytes);
    hasher.finish()
}

/// A parsed document: the arena, its root, and an id index.
///
/// Documents are produced by the full parser or the incremental updater and
/// never mutated destructively; each update yields a new value. Nodes are
/// owned exclusively by their document — other documents refer to them only
/// by `NodeId`.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeIdx,
    ids: FxHashMap<NodeId, NodeIdx>,
}

impl Document {
    pub fn root(&self) -> &Node {
        self.node(self.root)
    }

    pub fn root_idx(&self) -> NodeIdx {
        self.root
    }

    pub fn node(&self, idx: NodeIdx) -> &Node {
        &self.nodes[idx.index()]
    }

    pub fn node_by_id(&self, id: NodeId) -> Option<&Node> {
        self.ids.get(&id).map(|idx| self.node(*idx))
    }

    pub fn idx_of(&self, id: NodeId) -> Option<NodeIdx> {
        self.ids.get(&id).copied()
    }

    /// Total node count, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn children<'a>(&'a self, node: &'a Node) -> impl Iterator<Item = &'a Node> {
        node.children.iter().map(|idx| self.node(*idx))
    }

    /// The innermost node whose range contains `offset`, or `None` when the
    /// offset is outside the document. Offsets inside a separator gap
    /// resolve to the document root.
    pub fn node_at(&self, offset: TextSize) -> Option<&Node> {
        let mut current = self.root;
        if !self.node(current).range.contains(offset) {
            return None;
        }
        'descend: loop {
            let node = self.node(current);
            for &child_idx in &node.children {
                if self.node(child_idx).range.contains(offset) {
                    current = child_idx;
                    continue 'descend;
                }
            }
            return Some(self.node(current));
        }
    }

    /// Structural navigation by child-index path from the root. The empty
    /// path is the root itself; a dangling index yields `None`.
    pub fn child_at(&self, path: &[usize]) -> Option<&Node> {
        let mut current = self.root;
        for &step in path {
            current = *self.node(current).children.get(step)?;
        }
        Some(self.node(current))
    }

    /// Index of the top-level block whose range contains `offset`, treating
    /// the end offset as inclusive so an insertion at a block's end still
    /// attaches to it. `None` for offsets in separator gaps or out of range.
    pub fn block_index_at(&self, offset: TextSize) -> Option<usize> {
        let root = self.root();
        let idx = root
            .children
            .partition_point(|c| self.node(*c).range.start() <= offset);
        let candidate = idx.checked_sub(1)?;
        let block = self.node(root.children[candidate]);
        (offset <= block.range.end()).then_some(candidate)
    }

    /// Index of the single top-level block containing the whole edit range,
    /// end-inclusive. `None` when the range touches a gap or several blocks.
    pub fn block_index_covering(&self, range: TextRange) -> Option<usize> {
        let candidate = self.block_index_at(range.start())?;
        let block = self.node(self.root().children[candidate]);
        (range.end() <= block.range.end()).then_some(candidate)
    }

    /// Reassign a node's stable id. Used by the incremental updater when it
    /// judges a freshly parsed node to be the same logical node as one in
    /// the previous document.
    pub fn assign_id(&mut self, idx: NodeIdx, id: NodeId) {
        let old = self.nodes[idx.index()].id;
        self.ids.remove(&old);
        self.nodes[idx.index()].id = id;
        self.ids.insert(id, idx);
    }

    /// Structural equality ignoring ids and fingerprints: kind, range and
    /// child structure must match exactly.
    pub fn content_eq(&self, other: &Document) -> bool {
        fn eq(a_doc: &Document, a: &Node, b_doc: &Document, b: &Node) -> bool {
            a.kind == b.kind
                && a.range == b.range
                && a.children.len() == b.children.len()
                && a_doc
                    .children(a)
                    .zip(b_doc.children(b))
                    .all(|(ca, cb)| eq(a_doc, ca, b_doc, cb))
        }
        eq(self, self.root(), other, other.root())
    }

    /// Panic if tree invariants are violated: sibling ranges sorted and
    /// non-overlapping, every child contained in its parent, ids unique.
    /// Test support.
    pub fn check_invariants(&self) {
        let mut seen = FxHashMap::default();
        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(prev) = seen.insert(node.id, i) {
                panic!("duplicate node id {:?} at slots {} and {}", node.id, prev, i);
            }
            let mut prev_end = None;
            for child in self.children(node) {
                assert!(
                    node.range.start() <= child.range.start()
                        && child.range.end() <= node.range.end(),
                    "child range {:?} escapes parent {:?}",
                    child.range,
                    node.range,
                );
                if let Some(end) = prev_end {
                    assert!(
                        child.range.start() >= end,
                        "sibling ranges overlap or are unsorted at {:?}",
                        child.range,
                    );
                }
                prev_end = Some(child.range.end());
            }
        }
    }
}

/// Builds a document arena, either from freshly parsed nodes or by copying
/// subtrees out of a previous document with their ranges shifted.
pub struct DocumentBuilder {
    nodes: Vec<Node>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    fn push(&mut self, node: Node) -> NodeIdx {
        self.nodes.push(node);
        NodeIdx((self.nodes.len() - 1) as u32)
    }

    /// Deep-copy a subtree from `doc`, preserving ids and shifting every
    /// range by `delta` UTF-16 units.
    pub fn push_copy(&mut self, doc: &Document, idx: NodeIdx, delta: i64) -> NodeIdx {
        let node = doc.node(idx);
        let children = node
            .children
            .iter()
            .map(|c| self.push_copy(doc, *c, delta))
            .collect();
        self.push(Node {
            id: node.id,
            kind: node.kind.clone(),
            range: shift_range(node.range, delta),
            children,
            content_hash: node.content_hash,
        })
    }

    /// Overwrite the id of an already-pushed node.
    pub fn set_id(&mut self, idx: NodeIdx, id: NodeId) {
        self.nodes[idx.index()].id = id;
    }

    pub(crate) fn push_new(
        &mut self,
        src: &SourceText,
        kind: NodeKind,
        bytes: std::ops::Range<usize>,
        children: Vec<NodeIdx>,
    ) -> NodeIdx {
        let hash = content_hash(src.text()[bytes.clone()].as_bytes());
        self.push(Node {
            id: NodeId::mint(),
            kind,
            range: src.utf16_range(bytes),
            children,
            content_hash: hash,
        })
    }

    /// Allocate the root and finish the document. `top` holds the top-level
    /// block indices in document order.
    pub fn finish(mut self, src: &SourceText, root_id: NodeId, top: Vec<NodeIdx>) -> Document {
        let root = self.push(Node {
            id: root_id,
            kind: NodeKind::Document,
            range: TextRange::new(0.into(), src.len_utf16()),
            children: top,
            content_hash: content_hash(src.text().as_bytes()),
        });
        let ids = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id, NodeIdx(i as u32)))
            .collect();
        Document {
            nodes: self.nodes,
            root,
            ids,
        }
    }
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Shift a range by a signed UTF-16 delta, saturating at zero.
pub fn shift_range(range: TextRange, delta: i64) -> TextRange {
    let start = (u32::from(range.start()) as i64 + delta).max(0) as u32;
    let end = (u32::from(range.end()) as i64 + delta).max(0) as u32;
    TextRange::new(start.into(), end.into())
}
