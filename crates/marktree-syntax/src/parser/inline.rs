//! Inline phase: delimiter-stack scan over a leaf block's content region.
//!
//! A single left-to-right pass. `*`/`_` runs of length 1 or 2 open a
//! delimiter frame; the nearest unmatched run of the same character and
//! length closes it. Anything unmatched at the end of the region degrades to
//! literal text. Code spans and links use bounded lookahead and also degrade
//! on failure, so the scan never backtracks.
//!
//! `Text` nodes materialize only when a container holds mixed content; a
//! container whose content is nothing but plain text holds it directly and
//! stays a leaf.

use std::ops::Range;

use crate::lexer::{InlineToken, Token, lex};
use crate::node::NodeKind;
use crate::parser::RawNode;
use crate::source::SourceText;

/// Accumulates the children of one container, merging adjacent literal text
/// into single runs.
struct Sink {
    items: Vec<RawNode>,
    pending: Option<Range<usize>>,
}

impl Sink {
    fn new() -> Self {
        Self {
            items: Vec::new(),
            pending: None,
        }
    }

    fn text(&mut self, range: Range<usize>) {
        if range.is_empty() {
            return;
        }
        match &mut self.pending {
            Some(pending) if pending.end == range.start => pending.end = range.end,
            _ => {
                self.flush();
                self.pending = Some(range);
            }
        }
    }

    fn flush(&mut self) {
        if let Some(range) = self.pending.take() {
            self.items.push(RawNode {
                kind: NodeKind::Text,
                range,
                children: Vec::new(),
            });
        }
    }

    fn node(&mut self, node: RawNode) {
        self.flush();
        self.items.push(node);
    }

    fn finish(mut self) -> Vec<RawNode> {
        self.flush();
        self.items
    }
}

/// An open emphasis/strong delimiter.
struct Frame {
    delim: InlineToken,
    len: usize,
    start: usize,
    sink: Sink,
}

fn top_sink<'a>(stack: &'a mut Vec<Frame>, bottom: &'a mut Sink) -> &'a mut Sink {
    match stack.last_mut() {
        Some(frame) => &mut frame.sink,
        None => bottom,
    }
}

/// Drop all-text children: the container holds plain text directly.
fn materialize(items: Vec<RawNode>) -> Vec<RawNode> {
    if items.iter().all(|n| matches!(n.kind, NodeKind::Text)) {
        Vec::new()
    } else {
        items
    }
}

fn run_len(tokens: &[Token], at: usize) -> usize {
    let kind = tokens[at].kind;
    tokens[at..].iter().take_while(|t| t.kind == kind).count()
}

/// Parse a content region into inline children with absolute byte ranges.
pub(crate) fn parse_inline(src: &SourceText, bytes: Range<usize>) -> Vec<RawNode> {
    let base = bytes.start;
    let tokens = lex(&src.text()[bytes]);
    let mut stack: Vec<Frame> = Vec::new();
    let mut bottom = Sink::new();

    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        let abs = token.span.start + base..token.span.end + base;
        match token.kind {
            InlineToken::Star | InlineToken::Underscore => {
                let run = run_len(&tokens, i);
                let run_range = token.span.start + base..tokens[i + run - 1].span.end + base;
                if run > 2 {
                    top_sink(&mut stack, &mut bottom).text(run_range);
                } else if let Some(open) = stack
                    .iter()
                    .rposition(|f| f.delim == token.kind && f.len == run)
                {
                    // Frames opened after the matching one stay unmatched:
                    // their delimiters degrade and their content reflows into
                    // the enclosing sink.
                    while stack.len() > open + 1 {
                        let frame = stack.pop().expect("stack is non-empty");
                        let items = frame.sink.finish();
                        let below = top_sink(&mut stack, &mut bottom);
                        below.text(frame.start..frame.start + frame.len);
                        for item in items {
                            below.node(item);
                        }
                    }
                    let frame = stack.pop().expect("matched frame");
                    let items = frame.sink.finish();
                    let kind = if run == 2 {
                        NodeKind::Strong
                    } else {
                        NodeKind::Emphasis
                    };
                    let node = RawNode {
                        kind,
                        range: frame.start..run_range.end,
                        children: materialize(items),
                    };
                    top_sink(&mut stack, &mut bottom).node(node);
                } else {
                    stack.push(Frame {
                        delim: token.kind,
                        len: run,
                        start: run_range.start,
                        sink: Sink::new(),
                    });
                }
                i += run;
            }
            InlineToken::Backtick => {
                let open = run_len(&tokens, i);
                let mut k = i + open;
                let mut close_at = None;
                while k < tokens.len() {
                    if tokens[k].kind == InlineToken::Backtick {
                        let close = run_len(&tokens, k);
                        if close == open {
                            close_at = Some(k);
                            break;
                        }
                        k += close;
                    } else {
                        k += 1;
                    }
                }
                match close_at {
                    Some(k) => {
                        let range = token.span.start + base..tokens[k + open - 1].span.end + base;
                        top_sink(&mut stack, &mut bottom).node(RawNode {
                            kind: NodeKind::InlineCode,
                            range,
                            children: Vec::new(),
                        });
                        i = k + open;
                    }
                    None => {
                        let run_range =
                            token.span.start + base..tokens[i + open - 1].span.end + base;
                        top_sink(&mut stack, &mut bottom).text(run_range);
                        i += open;
                    }
                }
            }
            InlineToken::Bang => {
                if tokens.get(i + 1).map(|t| t.kind) == Some(InlineToken::LBracket)
                    && let Some((node, next)) = try_link(&tokens, i + 1, base, Some(abs.start))
                {
                    top_sink(&mut stack, &mut bottom).node(node);
                    i = next;
                } else {
                    top_sink(&mut stack, &mut bottom).text(abs);
                    i += 1;
                }
            }
            InlineToken::LBracket => {
                if let Some((node, next)) = try_link(&tokens, i, base, None) {
                    top_sink(&mut stack, &mut bottom).node(node);
                    i = next;
                } else {
                    top_sink(&mut stack, &mut bottom).text(abs);
                    i += 1;
                }
            }
            InlineToken::Text
            | InlineToken::RBracket
            | InlineToken::LParen
            | InlineToken::RParen => {
                top_sink(&mut stack, &mut bottom).text(abs);
                i += 1;
            }
        }
    }

    // Unmatched frames degrade to literal text.
    while let Some(frame) = stack.pop() {
        let items = frame.sink.finish();
        let below = top_sink(&mut stack, &mut bottom);
        below.text(frame.start..frame.start + frame.len);
        for item in items {
            below.node(item);
        }
    }

    materialize(bottom.finish())
}

/// Bounded lookahead for `[label](url)` from an `[` token. `image_start`
/// carries the `!` position for images. Returns the node and the token index
/// to resume at, or `None` when the shape does not complete.
fn try_link(
    tokens: &[Token],
    at: usize,
    base: usize,
    image_start: Option<usize>,
) -> Option<(RawNode, usize)> {
    debug_assert_eq!(tokens[at].kind, InlineToken::LBracket);
    let mut j = at + 1;
    while j < tokens.len() && tokens[j].kind != InlineToken::RBracket {
        j += 1;
    }
    if j >= tokens.len() || tokens.get(j + 1).map(|t| t.kind) != Some(InlineToken::LParen) {
        return None;
    }
    let mut k = j + 2;
    while k < tokens.len() && tokens[k].kind != InlineToken::RParen {
        k += 1;
    }
    if k >= tokens.len() {
        return None;
    }
    let start = image_start.unwrap_or(tokens[at].span.start + base);
    let kind = if image_start.is_some() {
        NodeKind::Image
    } else {
        NodeKind::Link
    };
    Some((
        RawNode {
            kind,
            range: start..tokens[k].span.end + base,
            children: Vec::new(),
        },
        k + 1,
    ))
}
