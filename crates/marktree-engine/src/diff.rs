//! Tree diff engine: two documents → ordered change set.
//!
//! Top-down structural matching. Children pair by stable `NodeId` when ids
//! overlap — the fast path for documents produced by the incremental updater
//! — and otherwise by ordered longest-common-subsequence over a cheap
//! content fingerprint (kind + content hash). Matched pairs with identical
//! content are not descended into.
//!
//! The change set is advisory, for consumers that want minimal redraw or
//! cache eviction. It is never required for correctness of the tree itself.

use text_size::TextRange;
use tracing::trace;

use rustc_hash::FxHashMap;

use marktree_syntax::{Document, Node, NodeId, NodeIdx};

/// One operation over node identity, in application order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOp {
    /// A node that exists only in the new document.
    Insert {
        node: NodeId,
        parent: NodeId,
        index: usize,
    },
    /// A node that exists only in the old document.
    Remove { node: NodeId },
    /// Content changed, identity preserved. `new_node` names the node in the
    /// new document carrying the updated content.
    Update { node: NodeId, new_node: NodeId },
    /// Same content at a new position.
    Move {
        node: NodeId,
        new_parent: NodeId,
        new_index: usize,
    },
}

/// Full diff of two documents.
pub fn diff(old: &Document, new: &Document) -> Vec<ChangeOp> {
    diff_filtered(old, new, None)
}

/// Bounded diff that only descends into subtrees touching `edit_range`
/// (post-edit coordinates), for keystroke-latency consumers on large
/// documents.
pub fn compute_incremental_update(
    old: &Document,
    new: &Document,
    edit_range: TextRange,
) -> Vec<ChangeOp> {
    diff_filtered(old, new, Some(edit_range))
}

fn diff_filtered(old: &Document, new: &Document, filter: Option<TextRange>) -> Vec<ChangeOp> {
    let mut ops = Vec::new();
    diff_nodes(old, old.root_idx(), new, new.root_idx(), filter, &mut ops);
    trace!(ops = ops.len(), "diff complete");
    ops
}

/// Same content: kind (payload included), fingerprint, and extent match.
/// Position is deliberately not compared — a shifted but otherwise identical
/// node is not an update.
fn content_same(a: &Node, b: &Node) -> bool {
    a.kind == b.kind && a.content_hash == b.content_hash && a.range.len() == b.range.len()
}

/// Inclusive-touch overlap, so an edit at a block boundary still selects it.
fn touches(range: TextRange, filter: Option<TextRange>) -> bool {
    match filter {
        None => true,
        Some(f) => range.start() <= f.end() && f.start() <= range.end(),
    }
}

fn diff_nodes(
    old_doc: &Document,
    old_idx: NodeIdx,
    new_doc: &Document,
    new_idx: NodeIdx,
    filter: Option<TextRange>,
    ops: &mut Vec<ChangeOp>,
) {
    let a = old_doc.node(old_idx);
    let b = new_doc.node(new_idx);
    if !touches(a.range, filter) && !touches(b.range, filter) {
        return;
    }
    if content_same(a, b) {
        return;
    }
    ops.push(ChangeOp::Update {
        node: a.id,
        new_node: b.id,
    });

    let a_ids: FxHashMap<NodeId, usize> = a
        .children
        .iter()
        .enumerate()
        .map(|(i, &idx)| (old_doc.node(idx).id, i))
        .collect();
    let id_overlap = b
        .children
        .iter()
        .any(|&idx| a_ids.contains_key(&new_doc.node(idx).id));

    if id_overlap {
        match_children_by_id(old_doc, a, new_doc, b, &a_ids, filter, ops);
    } else {
        match_children_by_fingerprint(old_doc, a, new_doc, b, filter, ops);
    }
}

/// Fast path: ids were carried over by the incremental updater.
fn match_children_by_id(
    old_doc: &Document,
    a: &Node,
    new_doc: &Document,
    b: &Node,
    a_ids: &FxHashMap<NodeId, usize>,
    filter: Option<TextRange>,
    ops: &mut Vec<ChangeOp>,
) {
    let b_ids: FxHashMap<NodeId, usize> = b
        .children
        .iter()
        .enumerate()
        .map(|(i, &idx)| (new_doc.node(idx).id, i))
        .collect();

    for &a_child in &a.children {
        let child = old_doc.node(a_child);
        if !b_ids.contains_key(&child.id) && touches(child.range, filter) {
            ops.push(ChangeOp::Remove { node: child.id });
        }
    }

    // Shared children whose relative order regressed are moves.
    let mut max_rank: Option<usize> = None;
    for (new_index, &b_child) in b.children.iter().enumerate() {
        let child = new_doc.node(b_child);
        match a_ids.get(&child.id) {
            None => {
                if touches(child.range, filter) {
                    ops.push(ChangeOp::Insert {
                        node: child.id,
                        parent: b.id,
                        index: new_index,
                    });
                }
            }
            Some(&a_pos) => {
                if max_rank.is_some_and(|rank| a_pos < rank) {
                    if touches(child.range, filter) {
                        ops.push(ChangeOp::Move {
                            node: child.id,
                            new_parent: b.id,
                            new_index,
                        });
                    }
                } else {
                    max_rank = Some(a_pos);
                }
                diff_nodes(old_doc, a.children[a_pos], new_doc, b_child, filter, ops);
            }
        }
    }
}

/// Fallback: ordered LCS over content fingerprints, then pair leftovers —
/// equal fingerprints become moves, equal variants become updates, the rest
/// insert/remove.
fn match_children_by_fingerprint(
    old_doc: &Document,
    a: &Node,
    new_doc: &Document,
    b: &Node,
    filter: Option<TextRange>,
    ops: &mut Vec<ChangeOp>,
) {
    let matched = lcs_pairs(old_doc, &a.children, new_doc, &b.children);
    let matched_a: Vec<usize> = matched.iter().map(|&(i, _)| i).collect();
    let matched_b: FxHashMap<usize, usize> = matched.iter().map(|&(i, j)| (j, i)).collect();

    let mut leftovers_a: Vec<usize> = (0..a.children.len())
        .filter(|i| !matched_a.contains(i))
        .collect();

    // Pair leftovers: equal fingerprint = move, same variant = update.
    let mut paired: FxHashMap<usize, (usize, bool)> = FxHashMap::default();
    for j in 0..b.children.len() {
        if matched_b.contains_key(&j) {
            continue;
        }
        let b_child = new_doc.node(b.children[j]);
        if let Some(pos) = leftovers_a
            .iter()
            .position(|&i| content_same(old_doc.node(a.children[i]), b_child))
        {
            paired.insert(j, (leftovers_a.remove(pos), true));
        } else if let Some(pos) = leftovers_a
            .iter()
            .position(|&i| old_doc.node(a.children[i]).kind.same_variant(&b_child.kind))
        {
            paired.insert(j, (leftovers_a.remove(pos), false));
        }
    }

    for i in leftovers_a {
        let child = old_doc.node(a.children[i]);
        if touches(child.range, filter) {
            ops.push(ChangeOp::Remove { node: child.id });
        }
    }

    for (j, &b_child) in b.children.iter().enumerate() {
        let child = new_doc.node(b_child);
        if let Some(&i) = matched_b.get(&j) {
            diff_nodes(old_doc, a.children[i], new_doc, b_child, filter, ops);
        } else if let Some(&(i, is_move)) = paired.get(&j) {
            if is_move {
                if touches(child.range, filter) {
                    ops.push(ChangeOp::Move {
                        node: old_doc.node(a.children[i]).id,
                        new_parent: b.id,
                        new_index: j,
                    });
                }
            } else {
                diff_nodes(old_doc, a.children[i], new_doc, b_child, filter, ops);
            }
        } else if touches(child.range, filter) {
            ops.push(ChangeOp::Insert {
                node: child.id,
                parent: b.id,
                index: j,
            });
        }
    }
}

/// Longest common subsequence of two child lists under the content
/// fingerprint, as (old index, new index) pairs in order.
fn lcs_pairs(
    old_doc: &Document,
    a: &[NodeIdx],
    new_doc: &Document,
    b: &[NodeIdx],
) -> Vec<(usize, usize)> {
    let eq = |i: usize, j: usize| content_same(old_doc.node(a[i]), new_doc.node(b[j]));
    let mut table = vec![vec![0u32; b.len() + 1]; a.len() + 1];
    for i in (0..a.len()).rev() {
        for j in (0..b.len()).rev() {
            table[i][j] = if eq(i, j) {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }
    let mut pairs = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if eq(i, j) {
            pairs.push((i, j));
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    pairs
}
