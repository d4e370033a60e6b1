//! Incremental updater: previous tree + edit + new text → new tree.
//!
//! Edits are classified **local** (inline-only, one block reparsed, sibling
//! ranges shifted) or **structural** (block boundaries may move, full
//! reparse with id reconciliation). Classification is deliberately
//! conservative: a false positive costs one unnecessary full-block reparse,
//! a false negative would desynchronize the tree, so anything that *could*
//! move a block boundary goes structural.
//!
//! Correctness contract, enforced by the test suite: the non-id content of
//! `update(...)` is structurally identical to a fresh `parse` of the new
//! text, for every input.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use text_size::{TextRange, TextSize};
use tracing::debug;

use marktree_syntax::{
    Document, DocumentBuilder, NodeIdx, NodeKind, SourceText, fence_is_closed, parse_blocks,
    parse_source, push_raw,
};

use crate::config::UpdateConfig;

/// A single contiguous replace-in-place operation against the pre-edit text.
///
/// Insertion is an empty range, deletion an empty replacement. The range is
/// in UTF-16 code units; out-of-range edits are clamped, never rejected,
/// since upstream change notifications can race with buffer mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub range: TextRange,
    pub replacement: String,
}

impl Edit {
    pub fn new(range: TextRange, replacement: impl Into<String>) -> Self {
        Self {
            range,
            replacement: replacement.into(),
        }
    }

    pub fn insert(at: TextSize, text: impl Into<String>) -> Self {
        Self::new(TextRange::empty(at), text)
    }

    pub fn delete(range: TextRange) -> Self {
        Self::new(range, "")
    }

    pub fn replacement_utf16_len(&self) -> u32 {
        self.replacement.encode_utf16().count() as u32
    }

    /// Splice this edit into `source`, producing the post-edit text. Hosts
    /// that own the buffer already have this string; the helper exists for
    /// tests and secondary consumers.
    pub fn apply(&self, source: &SourceText) -> String {
        let bytes = source.byte_range(clamp_range(self.range, source.len_utf16()));
        let mut out = String::with_capacity(source.len_bytes() + self.replacement.len());
        out.push_str(&source.text()[..bytes.start]);
        out.push_str(&self.replacement);
        out.push_str(&source.text()[bytes.end..]);
        out
    }
}

/// What an update did, in post-edit coordinates. The sole contract
/// consumers use to decide re-render scope: `is_structural_change` means
/// re-render everything, otherwise only `nodes_to_reparse`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateResult {
    pub affected_range: TextRange,
    pub nodes_to_reparse: Vec<marktree_syntax::NodeId>,
    pub is_structural_change: bool,
}

/// Characters whose appearance in an edit forces structural classification.
/// The set errs on the side of inclusion: `~` is here because tilde fences
/// can change a block's extent, CR because line endings are boundaries.
const STRUCTURAL_CHARS: &[char] = &[
    '\n', '\r', '#', '-', '*', '_', '`', '~', '[', ']', '(', ')', '|', '>',
];

fn has_structural_chars(text: &str) -> bool {
    text.chars().any(|c| STRUCTURAL_CHARS.contains(&c))
}

fn clamp_range(range: TextRange, len: TextSize) -> TextRange {
    let start = range.start().min(len);
    let end = range.end().min(len).max(start);
    TextRange::new(start, end)
}

/// Apply an edit incrementally. Convenience wrapper building the post-edit
/// [`SourceText`]; see [`update_source`].
pub fn update(
    document: &Document,
    source: &SourceText,
    edit: &Edit,
    new_source: &str,
    config: &UpdateConfig,
) -> (Document, UpdateResult) {
    let new_src = SourceText::new(new_source);
    update_source(document, source, edit, &new_src, config)
}

/// Apply an edit incrementally against an already-wrapped post-edit source.
pub fn update_source(
    document: &Document,
    source: &SourceText,
    edit: &Edit,
    new_source: &SourceText,
    config: &UpdateConfig,
) -> (Document, UpdateResult) {
    let clamped = clamp_range(edit.range, source.len_utf16());
    let removed = source.slice(clamped);

    if removed == edit.replacement {
        // Nothing changed; keep the tree, ids included.
        return (
            document.clone(),
            UpdateResult {
                affected_range: clamped,
                nodes_to_reparse: Vec::new(),
                is_structural_change: false,
            },
        );
    }

    let replacement_len = edit.replacement_utf16_len();
    let delta = replacement_len as i64 - u32::from(clamped.len()) as i64;
    let local_candidate = !has_structural_chars(removed)
        && !has_structural_chars(&edit.replacement)
        && u32::from(clamped.len()) <= config.structural_length_threshold
        && replacement_len <= config.structural_length_threshold;

    if local_candidate
        && let Some(block_index) = document.block_index_covering(clamped)
        && let Some(spliced) = splice_block(document, new_source, block_index, delta)
    {
        return spliced;
    }

    debug!(
        local_candidate,
        delta, "edit classified as structural; full reparse"
    );
    structural_reparse(document, new_source)
}

/// Narrow operation for callers that already know an edit is block-local:
/// reparse the top-level block containing `offset` against the new text.
/// Falls back to a full reparse when the block's shape changed after all.
pub fn reparse_block(
    offset: TextSize,
    document: &Document,
    source: &SourceText,
    new_source: &str,
) -> Document {
    let new_src = SourceText::new(new_source);
    let delta =
        u32::from(new_src.len_utf16()) as i64 - u32::from(source.len_utf16()) as i64;
    if let Some(block_index) = document.block_index_at(offset)
        && let Some((doc, _)) = splice_block(document, &new_src, block_index, delta)
    {
        return doc;
    }
    structural_reparse(document, &new_src).0
}

/// The local path: reparse one top-level block's slice of the new text and
/// splice it in, shifting every following sibling subtree by `delta` with
/// ids intact. Returns `None` — escalate to structural — when the slice no
/// longer parses to exactly one block of the same kind, which catches the
/// block-extent changes the character policy cannot see.
fn splice_block(
    document: &Document,
    new_source: &SourceText,
    block_index: usize,
    delta: i64,
) -> Option<(Document, UpdateResult)> {
    let root = document.root();
    let old_block = document.node(root.children[block_index]);
    let new_end = u32::from(old_block.range.end()) as i64 + delta;
    if new_end < u32::from(old_block.range.start()) as i64 {
        return None;
    }
    let new_range = TextRange::new(old_block.range.start(), (new_end as u32).into());
    let byte_range = new_source.byte_range(new_range);
    let raws = parse_blocks(new_source, byte_range.clone());
    let [single] = raws.as_slice() else {
        return None;
    };
    if single.range != byte_range || !single.kind.same_variant(&old_block.kind) {
        return None;
    }
    if matches!(single.kind, NodeKind::CodeBlock { .. })
        && block_index + 1 < root.children.len()
        && !fence_is_closed(&new_source.text()[byte_range])
    {
        // An unclosed fence swallows every following block in a full parse;
        // splicing would leave the siblings alive.
        return None;
    }

    let mut builder = DocumentBuilder::new();
    let mut top = Vec::with_capacity(root.children.len());
    for (i, &child) in root.children.iter().enumerate() {
        if i == block_index {
            let idx = push_raw(&mut builder, new_source, single);
            builder.set_id(idx, old_block.id);
            top.push(idx);
        } else {
            let shift = if i < block_index { 0 } else { delta };
            top.push(builder.push_copy(document, child, shift));
        }
    }
    let new_doc = builder.finish(new_source, root.id, top);
    let result = UpdateResult {
        affected_range: new_range,
        nodes_to_reparse: vec![old_block.id],
        is_structural_change: false,
    };
    Some((new_doc, result))
}

/// The structural path: full reparse, then adopt ids from the previous tree
/// for top-level blocks whose content is byte-identical, so consumers keep
/// stable references across block moves and shifts.
fn structural_reparse(document: &Document, new_source: &SourceText) -> (Document, UpdateResult) {
    let mut new_doc = parse_source(new_source);
    reconcile_ids(document, &mut new_doc);
    let result = UpdateResult {
        affected_range: TextRange::new(0.into(), new_source.len_utf16()),
        nodes_to_reparse: new_doc.children(new_doc.root()).map(|n| n.id).collect(),
        is_structural_change: true,
    };
    (new_doc, result)
}

fn reconcile_ids(old: &Document, new: &mut Document) {
    new.assign_id(new.root_idx(), old.root().id);

    let mut by_fingerprint: FxHashMap<(u64, TextSize), VecDeque<NodeIdx>> = FxHashMap::default();
    for &child in &old.root().children {
        let node = old.node(child);
        by_fingerprint
            .entry((node.content_hash, node.range.len()))
            .or_default()
            .push_back(child);
    }

    let mut adopted = 0usize;
    let new_top = new.root().children.clone();
    for new_idx in new_top {
        let node = new.node(new_idx);
        let key = (node.content_hash, node.range.len());
        let Some(queue) = by_fingerprint.get_mut(&key) else {
            continue;
        };
        while let Some(old_idx) = queue.pop_front() {
            if old.node(old_idx).kind == new.node(new_idx).kind {
                adopt_subtree(old, old_idx, new, new_idx);
                adopted += 1;
                break;
            }
        }
    }
    debug!(adopted, total = new.root().children.len(), "reconciled block ids");
}

/// Copy ids node-by-node through two structurally identical subtrees.
fn adopt_subtree(old: &Document, old_idx: NodeIdx, new: &mut Document, new_idx: NodeIdx) {
    new.assign_id(new_idx, old.node(old_idx).id);
    let pairs: Vec<(NodeIdx, NodeIdx)> = old
        .node(old_idx)
        .children
        .iter()
        .copied()
        .zip(new.node(new_idx).children.iter().copied())
        .collect();
    for (o, n) in pairs {
        adopt_subtree(old, o, new, n);
    }
}
