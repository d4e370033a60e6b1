//! # marktree-engine
//!
//! Incremental update and tree-diff engine over the `marktree-syntax` tree.
//!
//! The engine keeps a structural markdown model synchronized with a live,
//! edited text buffer at keystroke latency:
//!
//! - [`ParserState`] owns the current source and document — the unit of
//!   mutation the host manipulates, single-writer.
//! - [`update`] applies one edit, reparsing the minimal enclosing block for
//!   inline-only edits and falling back to a full reparse with stable-id
//!   reconciliation when block boundaries may have moved. Its result is
//!   contractually equivalent to a fresh parse of the new text.
//! - [`diff`] / [`compute_incremental_update`] compute an advisory change
//!   set between two documents for minimal-redraw consumers.
//! - [`analysis`] holds the stateless tag/wikilink/statistics scanners.
//!
//! Every operation is a pure synchronous computation bounded by document
//! size; the engine performs no I/O and exports no error type — malformed
//! input degrades, out-of-range edits clamp, lookups miss with `None`.

pub mod analysis;
pub mod config;
pub mod diff;
pub mod state;
pub mod update;

pub use config::UpdateConfig;
pub use diff::{ChangeOp, compute_incremental_update, diff};
pub use state::ParserState;
pub use update::{Edit, UpdateResult, reparse_block, update, update_source};

// Re-export the tree vocabulary so most consumers need only this crate.
pub use marktree_syntax::{
    Document, Node, NodeId, NodeKind, SourceText, TextRange, TextSize, parse, parse_source,
};
