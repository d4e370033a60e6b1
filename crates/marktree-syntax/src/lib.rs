//! # marktree-syntax
//!
//! Markdown syntax tree model and full parser for the marktree engine.
//!
//! The pipeline:
//!
//! ```text
//! Source Text → Lexer → Tokens → Block/Inline Parser → RawNodes → Document
//!               (Logos)          (line classifier +     (arena
//!                                 delimiter stack)       allocation)
//! ```
//!
//! The tree is a value-typed arena: a flat `Vec<Node>` owned by its
//! [`Document`], children stored as index vectors, no parent back-references.
//! Every node carries a process-unique stable [`NodeId`] that the incremental
//! updater (in `marktree-engine`) preserves across edits whenever content is
//! unchanged — downstream caches key off that id.
//!
//! All public offsets are UTF-16 code units ([`text_size::TextRange`]), the
//! coordinate system of host text APIs; [`SourceText`] owns the conversion
//! table. Parsing is total: there is no parse error, only worse trees.
//!
//! ```
//! use marktree_syntax::{parse, NodeKind};
//!
//! let doc = parse("# Title\n\nBody text.");
//! let top: Vec<_> = doc.children(doc.root()).collect();
//! assert_eq!(top[0].kind, NodeKind::Heading { level: 1 });
//! assert_eq!(top[1].kind, NodeKind::Paragraph);
//! ```

pub mod lexer;
pub mod node;
pub mod parser;
pub mod source;

pub use node::{
    Document, DocumentBuilder, Node, NodeId, NodeIdx, NodeKind, content_hash, shift_range,
};
pub use parser::{RawNode, fence_is_closed, parse, parse_blocks, parse_source, push_raw};
pub use source::SourceText;
pub use text_size::{TextRange, TextSize};
