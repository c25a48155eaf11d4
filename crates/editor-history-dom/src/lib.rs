#![warn(missing_docs)]
//! `editor-history-dom` - an in-memory markup tree for `editor-history`.
//!
//! [`MarkupDocument`] implements the [`DocumentModel`](editor_history::DocumentModel) and
//! [`SelectionModel`](editor_history::SelectionModel) contracts on top of a small arena. Tests,
//! benches and headless hosts without a tree of their own use it to drive the history engine.
//!
//! ```rust
//! use editor_history::DocumentModel;
//! use editor_history_dom::MarkupDocument;
//!
//! let mut doc = MarkupDocument::parse("<div>ab</div>");
//! let text = doc.find_text("ab").unwrap();
//! doc.insert_text(text, 1, "x");
//! assert_eq!(doc.to_markup(), "<div>axb</div>");
//! assert_eq!(doc.children(doc.body()).len(), 1);
//! ```

mod markup;
mod tree;

pub use markup::{VOID_ELEMENTS, is_void_element};
pub use tree::{MarkupDocument, NodeId};

use editor_history::SelectionSnapshot;

/// Body attribute holding a stashed selection.
pub const SELECTION_ATTRIBUTE: &str = "data-history-selection";

/// Store `snapshot` on the body so it survives a markup export/import cycle.
pub fn stash_selection(doc: &mut MarkupDocument, snapshot: &SelectionSnapshot) {
    let body = doc.body();
    doc.set_attribute(body, SELECTION_ATTRIBUTE, &snapshot.to_string());
}

/// Remove and parse the selection stashed by [`stash_selection`].
///
/// Returns `None` when nothing was stashed or the stored text does not parse.
pub fn take_stashed_selection(doc: &mut MarkupDocument) -> Option<SelectionSnapshot> {
    let body = doc.body();
    let stored = doc.remove_attribute(body, SELECTION_ATTRIBUTE)?;
    SelectionSnapshot::parse(&stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stash_round_trip() {
        let mut doc = MarkupDocument::parse("<p>one</p><p>two</p>");
        let text = doc.find_text("two").unwrap();
        doc.set_caret(text, 2);

        let snapshot = SelectionSnapshot::store(&doc).unwrap();
        stash_selection(&mut doc, &snapshot);
        assert!(doc.attribute(doc.body(), SELECTION_ATTRIBUTE).is_some());

        assert_eq!(take_stashed_selection(&mut doc), Some(snapshot));
        assert_eq!(take_stashed_selection(&mut doc), None);
    }
}
