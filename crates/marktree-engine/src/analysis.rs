//! Stateless text-analysis utilities.
//!
//! Regex-driven scans over the full text for tag/wikilink indexing and
//! document statistics. These are adjacent conveniences for consumers, not
//! part of the incremental core: pure functions of the text, no tree access,
//! recomputed on demand. Ranges are UTF-16 code units like everything else.

use std::sync::LazyLock;

use regex::Regex;
use text_size::TextRange;

use marktree_syntax::SourceText;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)#([\w][\w/-]*)").expect("tag regex compiles"));

static WIKILINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\[([^\[\]|\r\n]+?)(?:\|([^\[\]\r\n]+?))?\]\]").expect("wikilink regex compiles")
});

/// A `#tag` occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagHit {
    pub name: String,
    pub range: TextRange,
}

/// A `[[target]]` or `[[target|alias]]` occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikilinkHit {
    pub target: String,
    pub alias: Option<String>,
    pub range: TextRange,
}

/// Whole-document counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextStats {
    /// UTF-16 code units.
    pub characters: u32,
    pub words: usize,
    pub lines: usize,
    pub headings: usize,
}

/// Scan for `#tag` tokens. A tag starts at a word boundary, so heading
/// markers (`# ` followed by space) never match.
pub fn tags(text: &str) -> Vec<TagHit> {
    let src = SourceText::new(text);
    TAG_RE
        .captures_iter(text)
        .map(|caps| {
            let name = caps.get(1).expect("group 1 always participates");
            TagHit {
                name: name.as_str().to_owned(),
                // Include the leading `#`.
                range: src.utf16_range(name.start() - 1..name.end()),
            }
        })
        .collect()
}

/// Scan for wikilinks, splitting `target|alias` forms.
pub fn wikilinks(text: &str) -> Vec<WikilinkHit> {
    let src = SourceText::new(text);
    WIKILINK_RE
        .captures_iter(text)
        .map(|caps| {
            let all = caps.get(0).expect("whole match");
            WikilinkHit {
                target: caps[1].trim().to_owned(),
                alias: caps.get(2).map(|m| m.as_str().trim().to_owned()),
                range: src.utf16_range(all.range()),
            }
        })
        .collect()
}

/// Cheap whole-text statistics.
pub fn stats(text: &str) -> TextStats {
    let is_heading = |line: &str| {
        let level = line.bytes().take_while(|&b| b == b'#').count();
        (1..=6).contains(&level)
            && line[level..]
                .chars()
                .next()
                .is_none_or(|c| c == ' ' || c == '\t')
    };
    TextStats {
        characters: text.encode_utf16().count() as u32,
        words: text.split_whitespace().count(),
        lines: text.lines().count(),
        headings: text.lines().filter(|l| is_heading(l)).count(),
    }
}
