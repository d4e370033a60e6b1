//! Source text with byte ↔ UTF-16 offset mapping.
//!
//! Host text APIs address the buffer in UTF-16 code units, so every range in
//! the tree is expressed in those units. Parsing itself runs over `&str` byte
//! offsets; [`SourceText`] carries the breakpoint table that converts between
//! the two coordinate systems. For ASCII-only text the table is empty and
//! conversions are the identity.

use text_size::{TextRange, TextSize};

/// A byte/UTF-16 offset pair recorded immediately after a non-ASCII character.
///
/// Between two consecutive points every character is one byte and one UTF-16
/// unit, so offsets inside the gap convert by plain addition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MapPoint {
    byte: u32,
    utf16: u32,
}

/// Owned source text plus the offset map for the current contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    text: String,
    utf16_len: u32,
    points: Vec<MapPoint>,
}

impl SourceText {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut points = Vec::new();
        let mut utf16: u32 = 0;
        for (byte, ch) in text.char_indices() {
            if ch.is_ascii() {
                utf16 += 1;
            } else {
                utf16 += ch.len_utf16() as u32;
                points.push(MapPoint {
                    byte: (byte + ch.len_utf8()) as u32,
                    utf16,
                });
            }
        }
        Self {
            text,
            utf16_len: utf16,
            points,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len_bytes(&self) -> usize {
        self.text.len()
    }

    /// Length of the text in UTF-16 code units.
    pub fn len_utf16(&self) -> TextSize {
        TextSize::from(self.utf16_len)
    }

    /// UTF-16 offset for a byte offset lying on a char boundary.
    pub fn utf16_offset(&self, byte: usize) -> TextSize {
        let byte = byte.min(self.text.len()) as u32;
        let idx = self.points.partition_point(|p| p.byte <= byte);
        let size = match idx.checked_sub(1) {
            Some(i) => {
                let p = self.points[i];
                p.utf16 + (byte - p.byte)
            }
            None => byte,
        };
        TextSize::from(size)
    }

    /// Byte offset for a UTF-16 offset. Clamped to the text length and
    /// rounded down to a char boundary, so an offset inside a surrogate pair
    /// resolves to the character's start.
    pub fn byte_offset(&self, offset: TextSize) -> usize {
        let offset = u32::from(offset).min(self.utf16_len);
        let idx = self.points.partition_point(|p| p.utf16 <= offset);
        let mut byte = match idx.checked_sub(1) {
            Some(i) => {
                let p = self.points[i];
                (p.byte + (offset - p.utf16)) as usize
            }
            None => offset as usize,
        };
        byte = byte.min(self.text.len());
        while byte > 0 && !self.text.is_char_boundary(byte) {
            byte -= 1;
        }
        byte
    }

    /// Convert a byte range (on char boundaries) to a UTF-16 range.
    pub fn utf16_range(&self, bytes: std::ops::Range<usize>) -> TextRange {
        TextRange::new(self.utf16_offset(bytes.start), self.utf16_offset(bytes.end))
    }

    /// Convert a UTF-16 range to a byte range.
    pub fn byte_range(&self, range: TextRange) -> std::ops::Range<usize> {
        self.byte_offset(range.start())..self.byte_offset(range.end())
    }

    /// Slice the text by a UTF-16 range.
    pub fn slice(&self, range: TextRange) -> &str {
        &self.text[self.byte_range(range)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn ascii_is_identity() {
        let src = SourceText::new("hello world");
        assert_eq!(src.len_utf16(), TextSize::from(11));
        assert_eq!(src.utf16_offset(4), TextSize::from(4));
        assert_eq!(src.byte_offset(TextSize::from(4)), 4);
    }

    #[test]
    fn two_byte_chars() {
        // 'é' is 2 bytes, 1 UTF-16 unit.
        let src = SourceText::new("héllo");
        assert_eq!(src.len_utf16(), TextSize::from(5));
        assert_eq!(src.utf16_offset(0), TextSize::from(0));
        assert_eq!(src.utf16_offset(1), TextSize::from(1));
        assert_eq!(src.utf16_offset(3), TextSize::from(2));
        assert_eq!(src.utf16_offset(6), TextSize::from(5));
        assert_eq!(src.byte_offset(TextSize::from(2)), 3);
        assert_eq!(src.byte_offset(TextSize::from(5)), 6);
    }

    #[test]
    fn astral_plane_chars() {
        // '🦀' is 4 bytes, 2 UTF-16 units.
        let src = SourceText::new("a🦀b");
        assert_eq!(src.len_utf16(), TextSize::from(4));
        assert_eq!(src.utf16_offset(1), TextSize::from(1));
        assert_eq!(src.utf16_offset(5), TextSize::from(3));
        assert_eq!(src.byte_offset(TextSize::from(3)), 5);
        // Offset inside the surrogate pair resolves to the char start.
        assert_eq!(src.byte_offset(TextSize::from(2)), 1);
    }

    #[rstest]
    #[case("")]
    #[case("plain ascii")]
    #[case("mixé 🦀 ünïcode")]
    #[case("日本語のテキスト")]
    fn round_trip_on_char_boundaries(#[case] text: &str) {
        let src = SourceText::new(text);
        for (byte, _) in text.char_indices() {
            let utf16 = src.utf16_offset(byte);
            assert_eq!(src.byte_offset(utf16), byte);
        }
        assert_eq!(src.byte_offset(src.len_utf16()), text.len());
        let expected: usize = text.encode_utf16().count();
        assert_eq!(u32::from(src.len_utf16()) as usize, expected);
    }

    #[test]
    fn slice_by_utf16_range() {
        let src = SourceText::new("a🦀bc");
        assert_eq!(src.slice(TextRange::new(3.into(), 5.into())), "bc");
        assert_eq!(src.slice(TextRange::new(1.into(), 3.into())), "🦀");
    }

    #[test]
    fn offsets_clamp_past_end() {
        let src = SourceText::new("ab");
        assert_eq!(src.utf16_offset(99), TextSize::from(2));
        assert_eq!(src.byte_offset(TextSize::from(99)), 2);
    }
}
