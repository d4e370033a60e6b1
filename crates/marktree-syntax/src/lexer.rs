//! Inline tokenizer.
//!
//! Tokenizes a leaf block's content region with [Logos]. Only characters
//! that can open an inline construct get their own token; everything else
//! lands in `Text` runs. Every byte of the input appears in exactly one
//! token — nothing is skipped — so token spans tile the region.
//!
//! [Logos]: https://docs.rs/logos

use logos::Logos;

/// Token kinds for the inline phase.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineToken {
    /// `*` for emphasis and strong
    #[token("*")]
    Star,

    /// `_` for emphasis and strong
    #[token("_")]
    Underscore,

    /// Backtick for code spans
    #[token("`")]
    Backtick,

    /// `[` opening a link label
    #[token("[")]
    LBracket,

    /// `]` closing a link label
    #[token("]")]
    RBracket,

    /// `(` opening a link destination
    #[token("(")]
    LParen,

    /// `)` closing a link destination
    #[token(")")]
    RParen,

    /// `!` introducing an image
    #[token("!")]
    Bang,

    /// Anything else, in maximal runs
    #[regex(r"[^*_`\[\]()!]+")]
    Text,
}

/// A token with its byte span relative to the lexed slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: InlineToken,
    pub span: std::ops::Range<usize>,
}

/// Lex an inline content slice. All input bytes are covered by the output.
pub fn lex(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut lexer = InlineToken::lexer(input);

    while let Some(result) = lexer.next() {
        let kind = match result {
            Ok(kind) => kind,
            // Unrecognized input degrades to text.
            Err(()) => InlineToken::Text,
        };
        tokens.push(Token {
            kind,
            span: lexer.span(),
        });
    }

    tokens
}
