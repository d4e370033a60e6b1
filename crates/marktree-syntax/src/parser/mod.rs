//! Full parser: source text → [`Document`].
//!
//! Two phases, as in the engine's line-classifier/block-builder split:
//!
//! 1. **Block phase** ([`block`]): scans line by line, classifies leading
//!    markers, and produces a temporary tree of [`RawNode`]s with byte
//!    ranges. Blockquotes and lists nest; everything else is flat under the
//!    root.
//! 2. **Inline phase** ([`inline`]): tokenizes each leaf block's content
//!    region and runs a single left-to-right delimiter-stack scan for
//!    emphasis, strong, code spans, links and images. Unmatched delimiters
//!    degrade to literal text; the scan never backtracks.
//!
//! The raw tree is then allocated into a [`Document`] arena, converting byte
//! ranges to UTF-16 and fingerprinting each node's content. Parsing is total:
//! any input yields a tree, with unrecognized syntax degrading to paragraphs
//! and plain text.

pub(crate) mod block;
pub(crate) mod inline;

pub use block::{fence_is_closed, parse_blocks};

use crate::node::{Document, DocumentBuilder, NodeId, NodeIdx, NodeKind};
use crate::source::SourceText;

/// Temporary parse-tree node with byte ranges, produced by the block and
/// inline phases before arena allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawNode {
    pub kind: NodeKind,
    pub range: std::ops::Range<usize>,
    pub children: Vec<RawNode>,
}

/// Parse markdown source into a document.
pub fn parse(text: &str) -> Document {
    let src = SourceText::new(text);
    parse_source(&src)
}

/// Parse an already-wrapped source.
pub fn parse_source(src: &SourceText) -> Document {
    let raws = block::parse_blocks(src, 0..src.len_bytes());
    let mut builder = DocumentBuilder::new();
    let top = raws
        .iter()
        .map(|raw| push_raw(&mut builder, src, raw))
        .collect();
    builder.finish(src, NodeId::mint(), top)
}

/// Allocate a raw subtree into a builder, minting fresh ids.
pub fn push_raw(builder: &mut DocumentBuilder, src: &SourceText, raw: &RawNode) -> NodeIdx {
    let children = raw
        .children
        .iter()
        .map(|child| push_raw(builder, src, child))
        .collect();
    builder.push_new(src, raw.kind.clone(), raw.range.clone(), children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use text_size::TextRange;

    fn kinds_of_top(doc: &Document) -> Vec<NodeKind> {
        doc.children(doc.root()).map(|n| n.kind.clone()).collect()
    }

    #[test]
    fn parse_empty_input() {
        let doc = parse("");
        assert_eq!(doc.root().kind, NodeKind::Document);
        assert_eq!(doc.root().children.len(), 0);
        assert_eq!(doc.root().range, TextRange::new(0.into(), 0.into()));
    }

    #[test]
    fn parse_title_and_body_ranges() {
        let doc = parse("# Title\n\nBody text.");
        let top: Vec<_> = doc.children(doc.root()).collect();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].kind, NodeKind::Heading { level: 1 });
        assert_eq!(top[0].range, TextRange::new(0.into(), 7.into()));
        assert_eq!(top[1].kind, NodeKind::Paragraph);
        assert_eq!(top[1].range, TextRange::new(9.into(), 19.into()));
        // Pure-text containers hold their text directly.
        assert!(top[0].children.is_empty());
        assert!(top[1].children.is_empty());
    }

    #[rstest]
    #[case("# one", 1)]
    #[case("## two", 2)]
    #[case("###### six", 6)]
    fn parse_heading_levels(#[case] input: &str, #[case] level: u8) {
        let doc = parse(input);
        assert_eq!(kinds_of_top(&doc), vec![NodeKind::Heading { level }]);
    }

    #[test]
    fn seven_hashes_is_a_paragraph() {
        let doc = parse("####### too deep");
        assert_eq!(kinds_of_top(&doc), vec![NodeKind::Paragraph]);
    }

    #[test]
    fn hash_without_space_is_a_paragraph() {
        let doc = parse("#nospace");
        assert_eq!(kinds_of_top(&doc), vec![NodeKind::Paragraph]);
    }

    #[test]
    fn parse_mixed_document() {
        let input = "# Head\n\npara one\npara one cont\n\n- a\n- b\n\n> quoted\n\n---\n\n```rust\nfn main() {}\n```\n";
        let doc = parse(input);
        let kinds = kinds_of_top(&doc);
        assert_eq!(
            kinds,
            vec![
                NodeKind::Heading { level: 1 },
                NodeKind::Paragraph,
                NodeKind::List { ordered: false },
                NodeKind::Blockquote,
                NodeKind::ThematicBreak,
                NodeKind::CodeBlock {
                    language: Some("rust".into())
                },
            ]
        );
        doc.check_invariants();
    }

    #[test]
    fn parse_is_idempotent_modulo_ids() {
        let input = "# A\n\n*em* and **st** and `c`\n\n- x\n  - y\n\n> q\n";
        let a = parse(input);
        let b = parse(input);
        assert!(a.content_eq(&b));
    }

    #[rstest]
    #[case("")]
    #[case("# Title\n\nBody text.")]
    #[case("para with *em __mixed_ and `code` [l](u) ![i](u)")]
    #[case("- a\n- b\n  - nested\n    1. ordered\n- c")]
    #[case("> q1\n> q2\n> > deep\n> tail")]
    #[case("```py\nx = 1\n\n# not a heading\n```\ntrailer")]
    #[case("~~~\nunclosed fence\nstill code")]
    #[case("***\ntext\n___")]
    #[case("unicode 🦀 *émphasis* works")]
    fn invariants_hold_for_corpus(#[case] input: &str) {
        let doc = parse(input);
        doc.check_invariants();
        // Root spans the entire source in UTF-16 units.
        let len: usize = input.encode_utf16().count();
        assert_eq!(u32::from(doc.root().range.end()) as usize, len);
    }

    #[test]
    fn node_at_returns_innermost() {
        let doc = parse("# Title\n\nBody text.");
        assert_eq!(
            doc.node_at(3.into()).map(|n| n.kind.clone()),
            Some(NodeKind::Heading { level: 1 })
        );
        assert_eq!(
            doc.node_at(10.into()).map(|n| n.kind.clone()),
            Some(NodeKind::Paragraph)
        );
        // Separator gap resolves to the root.
        assert_eq!(
            doc.node_at(8.into()).map(|n| n.kind.clone()),
            Some(NodeKind::Document)
        );
        assert!(doc.node_at(999.into()).is_none());
    }

    #[test]
    fn child_at_walks_paths() {
        let doc = parse("- a\n  - b\n");
        let list = doc.child_at(&[0]).unwrap();
        assert_eq!(list.kind, NodeKind::List { ordered: false });
        let item = doc.child_at(&[0, 0]).unwrap();
        assert_eq!(item.kind, NodeKind::ListItem);
        let nested = doc.child_at(&[0, 0, 0]).unwrap();
        assert_eq!(nested.kind, NodeKind::List { ordered: false });
        assert!(doc.child_at(&[0, 5]).is_none());
        assert_eq!(doc.child_at(&[]).unwrap().kind, NodeKind::Document);
    }
}
