//! Document and selection contracts consumed by the engine.
//!
//! The engine never owns the document. Hosts implement [`DocumentModel`] for their tree and
//! [`SelectionModel`] for their caret; everything else in this crate is written against these
//! two traits.
//!
//! Node handles are expected to be cheap copies (an arena index, a raw pointer wrapper, ...).
//! They are **not** assumed to be stable across edits: a handle taken before a mutation may
//! refer to a destroyed node afterwards. The engine therefore only keeps
//! [`StructuralPath`](crate::StructuralPath)s between calls, never handles.

use std::fmt::Debug;

use crate::error::MarkupError;

/// An ordered, mutable tree of element and text nodes.
pub trait DocumentModel {
    /// Handle to a node of the tree.
    type Node: Copy + Eq + Debug;

    /// The fixed root every structural path starts from (e.g. the `<body>` element).
    fn root(&self) -> Self::Node;

    /// Parent of `node`, or `None` for the root and for detached nodes.
    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    /// Returns `true` if `node` is a text leaf.
    fn is_text(&self, node: Self::Node) -> bool;

    /// Text length in characters. Zero for elements.
    fn text_len(&self, node: Self::Node) -> usize;

    /// Tag name of an element, `None` for text leaves.
    fn tag_name(&self, node: Self::Node) -> Option<&str>;

    /// All children of `node` in document order, text leaves included.
    fn child_nodes(&self, node: Self::Node) -> Vec<Self::Node>;

    /// Element children of `node` in document order.
    fn children(&self, node: Self::Node) -> Vec<Self::Node> {
        self.child_nodes(node)
            .into_iter()
            .filter(|child| !self.is_text(*child))
            .collect()
    }

    /// Markup of `node` including its own tag.
    fn outer_markup(&self, node: Self::Node) -> String;

    /// Markup of the children of `node`.
    fn inner_markup(&self, node: Self::Node) -> String;

    /// Replace all children of `node` with the parsed `markup`.
    fn set_inner_markup(&mut self, node: Self::Node, markup: &str) -> Result<(), MarkupError>;

    /// Detach `child` from `parent` and drop it.
    fn remove_child(&mut self, parent: Self::Node, child: Self::Node);

    /// Parse `markup` into detached top-level nodes, as if it were the content of `context`.
    fn parse_fragment(
        &mut self,
        context: Self::Node,
        markup: &str,
    ) -> Result<Vec<Self::Node>, MarkupError>;

    /// Insert the detached `node` under `parent` before `reference`, or append when `None`.
    fn insert_before(
        &mut self,
        parent: Self::Node,
        node: Self::Node,
        reference: Option<Self::Node>,
    );

    /// Markup of the whole document.
    fn document_markup(&self) -> String {
        self.inner_markup(self.root())
    }

    /// Replace the whole document content.
    fn replace_document(&mut self, markup: &str) -> Result<(), MarkupError> {
        let root = self.root();
        self.set_inner_markup(root, markup)
    }
}

/// One end of a live selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caret<N> {
    /// Node the caret sits in.
    pub node: N,
    /// Character offset for text nodes, child offset for elements.
    pub offset: usize,
}

impl<N> Caret<N> {
    /// Create a caret.
    pub fn new(node: N, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A live selection: an anchor and an optional focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveSelection<N> {
    /// Where the selection started.
    pub anchor: Caret<N>,
    /// Where the selection ends; `None` for a collapsed caret.
    pub focus: Option<Caret<N>>,
}

impl<N: Copy + Eq> LiveSelection<N> {
    /// A collapsed selection at `node`/`offset`.
    pub fn collapsed(node: N, offset: usize) -> Self {
        Self {
            anchor: Caret::new(node, offset),
            focus: None,
        }
    }

    /// A selection from `anchor` to `focus`.
    pub fn range(anchor: Caret<N>, focus: Caret<N>) -> Self {
        Self {
            anchor,
            focus: Some(focus),
        }
    }

    /// Returns `true` if anchor and focus coincide.
    pub fn is_collapsed(&self) -> bool {
        self.focus.is_none_or(|focus| focus == self.anchor)
    }

    /// The focus, falling back to the anchor for collapsed selections.
    pub fn focus_or_anchor(&self) -> Caret<N> {
        self.focus.unwrap_or(self.anchor)
    }
}

/// Access to the host's selection/caret.
pub trait SelectionModel: DocumentModel {
    /// Current selection, `None` when the document has no caret.
    fn selection(&self) -> Option<LiveSelection<Self::Node>>;

    /// Move the live selection.
    fn set_selection(&mut self, selection: LiveSelection<Self::Node>);
}

/// Everything the engine needs from a host.
pub trait Host: DocumentModel + SelectionModel {}

impl<T: DocumentModel + SelectionModel> Host for T {}

/// Nearest element at or above `node` (the node itself unless it is a text leaf).
pub(crate) fn element_of<D: DocumentModel + ?Sized>(doc: &D, node: D::Node) -> Option<D::Node> {
    if doc.is_text(node) {
        doc.parent(node)
    } else {
        Some(node)
    }
}
