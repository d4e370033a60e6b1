//! Block phase: line classification and block assembly.

use std::ops::Range;

use crate::node::NodeKind;
use crate::parser::RawNode;
use crate::parser::inline::parse_inline;
use crate::source::SourceText;

/// A physical line: content without its terminator, at absolute byte offsets.
struct Line<'a> {
    text: &'a str,
    start: usize,
    end: usize,
}

fn split_lines(text: &str, bytes: Range<usize>) -> Vec<Line<'_>> {
    let slice = &text[bytes.clone()];
    let mut lines = Vec::new();
    let mut offset = bytes.start;
    for raw in slice.split_inclusive('\n') {
        let mut content = raw.strip_suffix('\n').unwrap_or(raw);
        content = content.strip_suffix('\r').unwrap_or(content);
        lines.push(Line {
            text: content,
            start: offset,
            end: offset + content.len(),
        });
        offset += raw.len();
    }
    lines
}

/// Leading-marker classification of one line. Offsets are relative to the
/// line start.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LineKind<'a> {
    Blank,
    Heading { level: u8, content: usize },
    ThematicBreak,
    FenceOpen { marker: u8, len: usize, info: &'a str },
    Quote { content: usize },
    ListItem { indent: usize, ordered: bool, content: usize },
    Text,
}

fn classify(line: &str) -> LineKind<'_> {
    if line.trim().is_empty() {
        return LineKind::Blank;
    }
    let indent = line.len() - line.trim_start_matches([' ', '\t']).len();
    let rest = &line[indent..];

    if indent == 0 {
        if let Some(kind) = classify_heading(rest) {
            return kind;
        }
        // Checked before list markers so `- - -` breaks rather than lists.
        if is_thematic_break(rest) {
            return LineKind::ThematicBreak;
        }
        if let Some(kind) = classify_fence(rest) {
            return kind;
        }
        if rest.starts_with('>') {
            let content = if rest[1..].starts_with(' ') { 2 } else { 1 };
            return LineKind::Quote { content };
        }
    }
    if let Some((ordered, after_marker)) = list_marker(rest) {
        let tail = &rest[after_marker..];
        let ws = tail.len() - tail.trim_start_matches([' ', '\t']).len();
        return LineKind::ListItem {
            indent,
            ordered,
            content: indent + after_marker + ws,
        };
    }
    LineKind::Text
}

fn classify_heading(rest: &str) -> Option<LineKind<'_>> {
    let level = rest.bytes().take_while(|&b| b == b'#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    let tail = &rest[level..];
    if !tail.is_empty() && !tail.starts_with([' ', '\t']) {
        return None;
    }
    let ws = tail.len() - tail.trim_start_matches([' ', '\t']).len();
    Some(LineKind::Heading {
        level: level as u8,
        content: level + ws,
    })
}

fn is_thematic_break(rest: &str) -> bool {
    let mut marker = None;
    let mut count = 0;
    for ch in rest.chars() {
        match ch {
            ' ' | '\t' => {}
            '-' | '*' | '_' => match marker {
                None => {
                    marker = Some(ch);
                    count = 1;
                }
                Some(m) if m == ch => count += 1,
                Some(_) => return false,
            },
            _ => return false,
        }
    }
    count >= 3
}

fn classify_fence(rest: &str) -> Option<LineKind<'_>> {
    let marker = match rest.as_bytes().first() {
        Some(b @ (b'`' | b'~')) => *b,
        _ => return None,
    };
    let len = rest.bytes().take_while(|&b| b == marker).count();
    if len < 3 {
        return None;
    }
    Some(LineKind::FenceOpen {
        marker,
        len,
        info: rest[len..].trim(),
    })
}

fn is_fence_close(line: &str, marker: u8, min_len: usize) -> bool {
    if line.starts_with([' ', '\t']) {
        return false;
    }
    let run = line.bytes().take_while(|&b| b == marker).count();
    run >= min_len && line[run..].trim().is_empty()
}

/// Whether a code-fence block slice ends with its own closing fence. An
/// unclosed fence runs to the end of its input and would swallow any text
/// following the slice, so block-local reparse must not splice it unless
/// nothing follows.
pub fn fence_is_closed(slice: &str) -> bool {
    let mut lines = slice.lines();
    let Some(first) = lines.next() else {
        return false;
    };
    if first.starts_with([' ', '\t']) {
        return false;
    }
    let Some(LineKind::FenceOpen { marker, len, .. }) = classify_fence(first) else {
        return false;
    };
    match lines.last() {
        Some(last) => is_fence_close(last, marker, len),
        None => false,
    }
}

fn list_marker(rest: &str) -> Option<(bool, usize)> {
    let bytes = rest.as_bytes();
    match bytes.first()? {
        b'-' | b'*' | b'+' => match bytes.get(1) {
            Some(b' ' | b'\t') => Some((false, 1)),
            _ => None,
        },
        b'0'..=b'9' => {
            let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            if digits > 9 {
                return None;
            }
            match (bytes.get(digits), bytes.get(digits + 1)) {
                (Some(b'.' | b')'), Some(b' ' | b'\t')) => Some((true, digits + 1)),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Run the block phase over a byte range of the source, producing top-level
/// raw blocks with absolute byte ranges. Block ranges exclude their trailing
/// line terminator; blank separator lines belong to the caller's container.
pub fn parse_blocks(src: &SourceText, bytes: Range<usize>) -> Vec<RawNode> {
    let lines = split_lines(src.text(), bytes);
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = &lines[i];
        match classify(line.text) {
            LineKind::Blank => i += 1,
            LineKind::Heading { level, content } => {
                let children = parse_inline(src, line.start + content..line.end);
                blocks.push(RawNode {
                    kind: NodeKind::Heading { level },
                    range: line.start..line.end,
                    children,
                });
                i += 1;
            }
            LineKind::ThematicBreak => {
                blocks.push(RawNode {
                    kind: NodeKind::ThematicBreak,
                    range: line.start..line.end,
                    children: Vec::new(),
                });
                i += 1;
            }
            LineKind::FenceOpen { marker, len, info } => {
                let mut j = i + 1;
                let mut closed = false;
                while j < lines.len() {
                    if is_fence_close(lines[j].text, marker, len) {
                        closed = true;
                        break;
                    }
                    j += 1;
                }
                let end = if closed {
                    lines[j].end
                } else {
                    lines.last().expect("at least the fence line").end
                };
                let language = info.split_whitespace().next().map(str::to_owned);
                blocks.push(RawNode {
                    kind: NodeKind::CodeBlock { language },
                    range: line.start..end,
                    children: Vec::new(),
                });
                i = if closed { j + 1 } else { lines.len() };
            }
            LineKind::Quote { .. } => {
                let start = line.start;
                let mut quote_lines = Vec::new();
                let mut j = i;
                while j < lines.len() {
                    match classify(lines[j].text) {
                        LineKind::Quote { content } => {
                            quote_lines.push(QuoteLine {
                                content_start: lines[j].start + content,
                                end: lines[j].end,
                            });
                            j += 1;
                        }
                        _ => break,
                    }
                }
                let end = quote_lines.last().expect("at least one quote line").end;
                blocks.push(RawNode {
                    kind: NodeKind::Blockquote,
                    range: start..end,
                    children: quote_children(src, &quote_lines),
                });
                i = j;
            }
            LineKind::ListItem { .. } => {
                let mut item_lines = Vec::new();
                let mut j = i;
                while j < lines.len() {
                    match classify(lines[j].text) {
                        LineKind::ListItem {
                            indent,
                            ordered,
                            content,
                        } => {
                            item_lines.push(ItemLine {
                                indent,
                                ordered,
                                marker_start: lines[j].start + indent,
                                content_start: lines[j].start + content,
                                end: lines[j].end,
                            });
                            j += 1;
                        }
                        _ => break,
                    }
                }
                blocks.extend(build_lists(src, &item_lines));
                i = j;
            }
            LineKind::Text => {
                let start = line.start;
                let mut j = i + 1;
                // Block markers always win over paragraph continuation.
                while j < lines.len() && classify(lines[j].text) == LineKind::Text {
                    j += 1;
                }
                let end = lines[j - 1].end;
                let children = parse_inline(src, start..end);
                blocks.push(RawNode {
                    kind: NodeKind::Paragraph,
                    range: start..end,
                    children,
                });
                i = j;
            }
        }
    }

    blocks
}

/// One quote line after stripping the current nesting level's marker.
struct QuoteLine {
    content_start: usize,
    end: usize,
}

/// Children of a blockquote at one nesting depth: nested quotes for runs of
/// `>`-prefixed content, one paragraph per run of plain non-blank lines.
fn quote_children(src: &SourceText, quote_lines: &[QuoteLine]) -> Vec<RawNode> {
    let mut children = Vec::new();
    let mut i = 0;

    while i < quote_lines.len() {
        let content = &src.text()[quote_lines[i].content_start..quote_lines[i].end];
        if content.trim().is_empty() {
            i += 1;
        } else if content.starts_with('>') {
            let nested_start = quote_lines[i].content_start;
            let mut inner = Vec::new();
            let mut j = i;
            while j < quote_lines.len() {
                let c = &src.text()[quote_lines[j].content_start..quote_lines[j].end];
                if !c.starts_with('>') {
                    break;
                }
                let strip = if c[1..].starts_with(' ') { 2 } else { 1 };
                inner.push(QuoteLine {
                    content_start: quote_lines[j].content_start + strip,
                    end: quote_lines[j].end,
                });
                j += 1;
            }
            children.push(RawNode {
                kind: NodeKind::Blockquote,
                range: nested_start..quote_lines[j - 1].end,
                children: quote_children(src, &inner),
            });
            i = j;
        } else {
            let start = quote_lines[i].content_start;
            let mut j = i;
            while j < quote_lines.len() {
                let c = &src.text()[quote_lines[j].content_start..quote_lines[j].end];
                if c.trim().is_empty() || c.starts_with('>') {
                    break;
                }
                j += 1;
            }
            let range = start..quote_lines[j - 1].end;
            let kids = parse_inline(src, range.clone());
            children.push(RawNode {
                kind: NodeKind::Paragraph,
                range,
                children: kids,
            });
            i = j;
        }
    }

    children
}

/// One list-item line with its marker and content offsets.
struct ItemLine {
    indent: usize,
    ordered: bool,
    marker_start: usize,
    content_start: usize,
    end: usize,
}

struct OpenList {
    indent: usize,
    ordered: bool,
    start: usize,
    items: Vec<RawNode>,
}

/// Assemble a run of consecutive list-item lines into (possibly several)
/// sibling lists, nesting by indentation. A nested list hangs off the
/// preceding item; a marker-family change at the same level starts a new
/// sibling list.
fn build_lists(src: &SourceText, item_lines: &[ItemLine]) -> Vec<RawNode> {
    fn close(list: OpenList, stack: &mut [OpenList], out: &mut Vec<RawNode>) {
        let end = list.items.last().map_or(list.start, |n| n.range.end);
        let node = RawNode {
            kind: NodeKind::List {
                ordered: list.ordered,
            },
            range: list.start..end,
            children: list.items,
        };
        match stack.last_mut().and_then(|parent| parent.items.last_mut()) {
            Some(item) => {
                item.range.end = node.range.end;
                item.children.push(node);
            }
            None => out.push(node),
        }
    }

    let mut out = Vec::new();
    let mut stack: Vec<OpenList> = Vec::new();

    for line in item_lines {
        while stack.last().is_some_and(|top| top.indent > line.indent) {
            let list = stack.pop().expect("checked above");
            close(list, &mut stack, &mut out);
        }
        let opens_nested = match stack.last() {
            None => true,
            Some(top) => line.indent >= top.indent + 2,
        };
        if opens_nested {
            stack.push(OpenList {
                indent: line.indent,
                ordered: line.ordered,
                start: line.marker_start,
                items: Vec::new(),
            });
        } else if stack.last().map(|top| top.ordered) != Some(line.ordered) {
            let list = stack.pop().expect("non-empty when sibling");
            close(list, &mut stack, &mut out);
            stack.push(OpenList {
                indent: line.indent,
                ordered: line.ordered,
                start: line.marker_start,
                items: Vec::new(),
            });
        }
        let children = parse_inline(src, line.content_start..line.end);
        stack
            .last_mut()
            .expect("a list is open")
            .items
            .push(RawNode {
                kind: NodeKind::ListItem,
                range: line.marker_start..line.end,
                children,
            });
    }

    while let Some(list) = stack.pop() {
        close(list, &mut stack, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use text_size::TextRange;

    fn top_kinds(input: &str) -> Vec<NodeKind> {
        let doc = parse(input);
        doc.children(doc.root()).map(|n| n.kind.clone()).collect()
    }

    #[rstest]
    #[case("", LineKind::Blank)]
    #[case("   \t ", LineKind::Blank)]
    #[case("# h", LineKind::Heading { level: 1, content: 2 })]
    #[case("###  h", LineKind::Heading { level: 3, content: 5 })]
    #[case("#", LineKind::Heading { level: 1, content: 1 })]
    #[case("#x", LineKind::Text)]
    #[case("---", LineKind::ThematicBreak)]
    #[case("- - -", LineKind::ThematicBreak)]
    #[case("***", LineKind::ThematicBreak)]
    #[case("__", LineKind::Text)]
    #[case("> q", LineKind::Quote { content: 2 })]
    #[case(">q", LineKind::Quote { content: 1 })]
    #[case("- item", LineKind::ListItem { indent: 0, ordered: false, content: 2 })]
    #[case("  * item", LineKind::ListItem { indent: 2, ordered: false, content: 4 })]
    #[case("12. item", LineKind::ListItem { indent: 0, ordered: true, content: 4 })]
    #[case("3) item", LineKind::ListItem { indent: 0, ordered: true, content: 3 })]
    #[case("-nospace", LineKind::Text)]
    #[case("1.x", LineKind::Text)]
    #[case("plain", LineKind::Text)]
    #[case("  indented # not heading", LineKind::Text)]
    fn line_classification(#[case] line: &str, #[case] expected: LineKind<'static>) {
        assert_eq!(classify(line), expected);
    }

    #[rstest]
    #[case("```", Some(LineKind::FenceOpen { marker: b'`', len: 3, info: "" }))]
    #[case("````rust", Some(LineKind::FenceOpen { marker: b'`', len: 4, info: "rust" }))]
    #[case("~~~ py ", Some(LineKind::FenceOpen { marker: b'~', len: 3, info: "py" }))]
    #[case("``", None)]
    fn fence_classification(#[case] line: &str, #[case] expected: Option<LineKind<'static>>) {
        assert_eq!(classify_fence(line), expected);
    }

    #[test]
    fn paragraphs_merge_consecutive_text_lines() {
        let doc = parse("one\ntwo\n\nthree");
        let top: Vec<_> = doc.children(doc.root()).collect();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].range, TextRange::new(0.into(), 7.into()));
        assert_eq!(top[1].range, TextRange::new(9.into(), 14.into()));
    }

    #[test]
    fn block_markers_interrupt_paragraphs() {
        assert_eq!(
            top_kinds("text\n# head\ntext\n- item"),
            vec![
                NodeKind::Paragraph,
                NodeKind::Heading { level: 1 },
                NodeKind::Paragraph,
                NodeKind::List { ordered: false },
            ]
        );
    }

    #[test]
    fn fence_swallows_markers_until_close() {
        let doc = parse("```\n# not a heading\n- not a list\n```\nafter");
        let top: Vec<_> = doc.children(doc.root()).collect();
        assert_eq!(top.len(), 2);
        assert_eq!(
            top[0].kind,
            NodeKind::CodeBlock { language: None }
        );
        assert_eq!(top[1].kind, NodeKind::Paragraph);
    }

    #[test]
    fn unclosed_fence_runs_to_end_of_input() {
        let doc = parse("```rust\nfn x() {}\nno close");
        let top: Vec<_> = doc.children(doc.root()).collect();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].range, TextRange::new(0.into(), 26.into()));
    }

    #[test]
    fn shorter_fence_does_not_close() {
        let doc = parse("````\n```\n````");
        let top: Vec<_> = doc.children(doc.root()).collect();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].range, TextRange::new(0.into(), 13.into()));
    }

    #[test]
    fn quote_nests_and_splits_paragraphs() {
        let doc = parse("> a\n> b\n>\n> c\n> > deep");
        let quote = doc.child_at(&[0]).unwrap();
        assert_eq!(quote.kind, NodeKind::Blockquote);
        let kids: Vec<_> = doc.children(quote).map(|n| n.kind.clone()).collect();
        assert_eq!(
            kids,
            vec![NodeKind::Paragraph, NodeKind::Paragraph, NodeKind::Blockquote]
        );
        let deep = doc.child_at(&[0, 2, 0]).unwrap();
        assert_eq!(deep.kind, NodeKind::Paragraph);
    }

    #[test]
    fn list_nesting_by_indent() {
        let doc = parse("- a\n- b\n  - b1\n  - b2\n- c");
        let list = doc.child_at(&[0]).unwrap();
        assert_eq!(list.children.len(), 3);
        let item_b = doc.child_at(&[0, 1]).unwrap();
        let nested = doc.child_at(&[0, 1, 0]).unwrap();
        assert_eq!(nested.kind, NodeKind::List { ordered: false });
        assert_eq!(nested.children.len(), 2);
        // Item range extends over its nested list.
        assert!(item_b.range.contains_range(nested.range));
        doc.check_invariants();
    }

    #[test]
    fn ordered_and_unordered_split_into_sibling_lists() {
        assert_eq!(
            top_kinds("- a\n1. b"),
            vec![
                NodeKind::List { ordered: false },
                NodeKind::List { ordered: true },
            ]
        );
    }

    #[test]
    fn blank_line_ends_a_list() {
        assert_eq!(
            top_kinds("- a\n\n- b"),
            vec![
                NodeKind::List { ordered: false },
                NodeKind::List { ordered: false },
            ]
        );
    }

    #[rstest]
    #[case("```\ncode\n```", true)]
    #[case("```\ncode", false)]
    #[case("```", false)]
    #[case("~~~~\ncode\n~~~", false)]
    #[case("~~~\ncode\n~~~~", true)]
    #[case("not a fence", false)]
    fn fence_closure_detection(#[case] slice: &str, #[case] closed: bool) {
        assert_eq!(fence_is_closed(slice), closed);
    }

    #[test]
    fn crlf_line_endings_are_handled() {
        let doc = parse("# h\r\n\r\nbody\r\n");
        let top: Vec<_> = doc.children(doc.root()).collect();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].range, TextRange::new(0.into(), 3.into()));
        assert_eq!(top[1].range, TextRange::new(7.into(), 11.into()));
    }
}
