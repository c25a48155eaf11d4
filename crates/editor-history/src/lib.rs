#![warn(missing_docs)]
//! Editor History - Undo/Redo Engine for Tree-Shaped Rich-Text Documents
//!
//! # Overview
//!
//! `editor-history` records, merges and replays structural edits to a mutable document tree.
//! It is headless: the host owns the document and the caret and exposes them through the
//! [`DocumentModel`] and [`SelectionModel`] traits.
//!
//! Node identity in a rich-text tree is not stable (renaming a block destroys and recreates
//! it), so the engine never keeps node handles between calls. Everything it stores is
//! positional: [`StructuralPath`]s for elements, accumulated text offsets for carets, and
//! `(ancestor, first, trailing)` triples for edited regions.
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  History (begin/end, undo/redo, hooks)      │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Replay (apply a record forward/backward)   │
//! ├─────────────────────────────────────────────┤
//! │  Typing Merge                               │
//! ├─────────────────────────────────────────────┤
//! │  HistoryStack (bounded circular buffer)     │
//! ├─────────────────────────────────────────────┤
//! │  Range Claim + Selection Snapshot           │  ← Capture
//! ├─────────────────────────────────────────────┤
//! │  Structural Path                            │  ← Addressing
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use editor_history::{History, RecordKind, RecordOptions};
//! use editor_history_dom::MarkupDocument;
//!
//! let mut doc = MarkupDocument::parse("<p>Hello</p>");
//! let text = doc.find_text("Hello").unwrap();
//! doc.set_caret(text, 5);
//!
//! let mut history = History::default();
//! history.subscribe(|state| {
//!     println!("can undo: {}, can redo: {}", state.can_undo, state.can_redo);
//! });
//!
//! history.begin_recording(&doc, RecordKind::Event, "insertText", RecordOptions::new()).unwrap();
//! doc.insert_text(text, 5, "!");
//! doc.set_caret(text, 6);
//! history.end_recording(&doc, RecordKind::Event, "insertText").unwrap();
//!
//! history.undo(&mut doc).unwrap();
//! assert_eq!(doc.to_markup(), "<p>Hello</p>");
//! history.redo(&mut doc).unwrap();
//! assert_eq!(doc.to_markup(), "<p>Hello!</p>");
//! ```
//!
//! # Module Description
//!
//! - [`document`] - Document and selection contracts consumed from the host
//! - [`path`] - Structural paths
//! - [`claim`] - Range claims (common ancestor + affected children)
//! - [`selection`] - Portable selection snapshots and their textual form
//! - [`record`] - Undo records
//! - [`stack`] - Bounded circular undo stack
//! - [`merge`] - Typing merge
//! - [`replay`] - Applying records forward and backward
//! - [`recorder`] - The [`History`] engine
//! - [`config`] - Engine configuration

pub mod claim;
pub mod config;
pub mod document;
pub mod error;
pub mod merge;
pub mod path;
pub mod record;
pub mod recorder;
pub mod replay;
pub mod selection;
pub mod stack;

pub use claim::{
    AffectedRange, AncestorWalk, BLOCK_TAGS, ClaimOptions, RangeSpan, claim, direct_child_of,
    find_common_ancestor, is_block_tag,
};
pub use config::HistoryConfig;
pub use document::{Caret, DocumentModel, Host, LiveSelection, SelectionModel};
pub use error::{
    ConfigError, HistoryError, MarkupError, PathResolutionError, ProtocolError, RangeBoundsError,
};
pub use merge::{MergeKind, is_adjacent};
pub use path::{ParsePathError, StructuralPath};
pub use record::{
    CustomAction, CustomRecord, DocumentRecord, EditRecord, EventRecord, GroupRecord, RecordKind,
    op,
};
pub use recorder::{
    ContentChangedCallback, History, RecordHandle, RecordOptions, StateChangeCallback,
};
pub use replay::{CustomHandler, Direction};
pub use selection::{OffsetSpace, SelectionPoint, SelectionSnapshot};
pub use stack::{DEFAULT_CAPACITY, HistoryStack, UndoRedoState};
