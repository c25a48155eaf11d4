//! Arena-backed markup tree.
//!
//! Freed slots are recycled. Each slot carries a generation that is bumped when its node is
//! freed, so a handle to a removed node stays dead even after the slot holds a new node.

use editor_history::{DocumentModel, LiveSelection, MarkupError, SelectionModel};

use crate::markup;

/// Handle to a node of a [`MarkupDocument`].
///
/// Once a node is removed (or replaced by [`MarkupDocument::rename_element`]) its handle stays
/// dead, which is how a real editor tree behaves from the history engine's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

impl NodeId {
    const ROOT: NodeId = NodeId {
        index: 0,
        generation: 0,
    };

    /// Arena slot of this node.
    pub fn index(self) -> usize {
        self.index
    }

    /// How many nodes occupied the slot before this one.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NodeData {
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// An in-memory rich-text document rooted at a `<body>` element.
///
/// Text offsets are measured in characters.
#[derive(Debug, Clone)]
pub struct MarkupDocument {
    slots: Vec<Slot>,
    free: Vec<usize>,
    root: NodeId,
    selection: Option<LiveSelection<NodeId>>,
}

impl Default for MarkupDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(Node {
                    data: NodeData::Element {
                        tag: "body".to_string(),
                        attributes: Vec::new(),
                    },
                    parent: None,
                    children: Vec::new(),
                }),
            }],
            free: Vec::new(),
            root: NodeId::ROOT,
            selection: None,
        }
    }

    /// Create a document whose body holds the parsed `markup`.
    ///
    /// Malformed markup is recovered the way a browser recovers it; parsing never fails.
    pub fn parse(markup: &str) -> Self {
        let mut doc = Self::new();
        let root = doc.root;
        for node in markup::parse_into(&mut doc, "body", markup) {
            doc.link_child(root, node, None);
        }
        doc
    }

    /// Markup of the body content.
    pub fn to_markup(&self) -> String {
        self.inner_markup(self.root)
    }

    /// The `<body>` element.
    pub fn body(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, the body included.
    pub fn node_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Returns `true` if `node` is still part of this document's arena.
    pub fn is_alive(&self, node: NodeId) -> bool {
        self.entry(node).is_some()
    }

    // ---- queries ----

    /// Text content of a text node.
    pub fn text(&self, node: NodeId) -> Option<&str> {
        match self.data(node)? {
            NodeData::Text(text) => Some(text),
            NodeData::Element { .. } => None,
        }
    }

    /// Concatenated text of `node` and its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        match self.data(node) {
            Some(NodeData::Text(text)) => out.push_str(text),
            Some(NodeData::Element { .. }) => {
                for child in self.child_ids(node) {
                    self.collect_text(*child, out);
                }
            }
            None => {}
        }
    }

    /// First text node (in document order) containing `needle`.
    pub fn find_text(&self, needle: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|id| self.text(*id).is_some_and(|text| text.contains(needle)))
    }

    /// First element (in document order) with the given tag name.
    pub fn find_element(&self, tag: &str) -> Option<NodeId> {
        self.find_elements(tag).into_iter().next()
    }

    /// All elements with the given tag name, in document order.
    pub fn find_elements(&self, tag: &str) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|id| {
                self.tag_of(*id)
                    .is_some_and(|name| name.eq_ignore_ascii_case(tag))
            })
            .collect()
    }

    fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.child_ids(node).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.child_ids(id).iter().rev().copied());
        }
        out
    }

    /// Attribute value of an element.
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match self.data(node)? {
            NodeData::Element { attributes, .. } => attributes
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str()),
            NodeData::Text(_) => None,
        }
    }

    // ---- mutation ----

    /// Set (or add) an attribute. Returns `false` if `node` is not a live element.
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> bool {
        let Some(NodeData::Element { attributes, .. }) = self.data_mut(node) else {
            return false;
        };
        let name = name.to_ascii_lowercase();
        match attributes.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => attributes.push((name, value.to_string())),
        }
        true
    }

    /// Remove an attribute, returning its previous value.
    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> Option<String> {
        let Some(NodeData::Element { attributes, .. }) = self.data_mut(node) else {
            return None;
        };
        let index = attributes
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))?;
        Some(attributes.remove(index).1)
    }

    /// Replace the content of a text node.
    pub fn set_text(&mut self, node: NodeId, text: &str) -> bool {
        match self.text_mut(node) {
            Some(existing) => {
                existing.clear();
                existing.push_str(text);
                true
            }
            None => false,
        }
    }

    /// Insert `text` at character `offset` of a text node (clamped to its length).
    pub fn insert_text(&mut self, node: NodeId, offset: usize, text: &str) -> bool {
        let Some(existing) = self.text_mut(node) else {
            return false;
        };
        let at = byte_offset(existing, offset);
        existing.insert_str(at, text);
        true
    }

    /// Delete `len` characters starting at character `offset` of a text node.
    pub fn delete_text(&mut self, node: NodeId, offset: usize, len: usize) -> bool {
        let Some(existing) = self.text_mut(node) else {
            return false;
        };
        let start = byte_offset(existing, offset);
        let end = byte_offset(existing, offset.saturating_add(len));
        existing.replace_range(start..end, "");
        true
    }

    /// Split a text node at character `offset`; the tail moves into a new following sibling.
    ///
    /// Returns the new node, or `None` if `node` is not an attached text node.
    pub fn split_text(&mut self, node: NodeId, offset: usize) -> Option<NodeId> {
        let parent = self.entry(node)?.parent?;
        let existing = self.text_mut(node)?;
        let at = byte_offset(existing, offset);
        let tail = existing.split_off(at);
        let id = self.alloc(NodeData::Text(tail));
        let reference = self.next_sibling(node);
        self.link_child(parent, id, reference);
        Some(id)
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeData::Element {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
        })
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData::Text(text.to_string()))
    }

    /// Append `child` to `parent`, detaching it from its previous parent first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.link_child(parent, child, None);
    }

    /// Remove `node` and its subtree from the document.
    pub fn remove(&mut self, node: NodeId) {
        if node == self.root {
            return;
        }
        self.unlink(node);
        self.free(node);
    }

    /// Replace an element with a new one of another tag, moving its attributes and children.
    ///
    /// The old handle dies, as it would when a browser changes a block's format.
    pub fn rename_element(&mut self, node: NodeId, tag: &str) -> Option<NodeId> {
        if node == self.root {
            return None;
        }
        let old = self.entry(node)?;
        let NodeData::Element { attributes, .. } = &old.data else {
            return None;
        };
        let attributes = attributes.clone();
        let children = old.children.clone();
        let parent = old.parent;

        let id = self.alloc(NodeData::Element {
            tag: tag.to_ascii_lowercase(),
            attributes,
        });
        for child in children {
            self.link_child(id, child, None);
        }
        if let Some(parent) = parent {
            self.link_child(parent, id, Some(node));
        }
        self.remove(node);
        Some(id)
    }

    // ---- selection ----

    /// Collapse the selection to `node`/`offset`.
    pub fn set_caret(&mut self, node: NodeId, offset: usize) {
        self.selection = Some(LiveSelection::collapsed(node, offset));
    }

    /// Select from the anchor point to the focus point.
    pub fn select(
        &mut self,
        anchor: NodeId,
        anchor_offset: usize,
        focus: NodeId,
        focus_offset: usize,
    ) {
        self.selection = Some(LiveSelection::range(
            editor_history::Caret::new(anchor, anchor_offset),
            editor_history::Caret::new(focus, focus_offset),
        ));
    }

    /// Drop the selection.
    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    // ---- arena plumbing ----

    fn entry(&self, node: NodeId) -> Option<&Node> {
        let slot = self.slots.get(node.index)?;
        if slot.generation != node.generation {
            return None;
        }
        slot.node.as_ref()
    }

    fn entry_mut(&mut self, node: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(node.index)?;
        if slot.generation != node.generation {
            return None;
        }
        slot.node.as_mut()
    }

    pub(crate) fn data(&self, node: NodeId) -> Option<&NodeData> {
        self.entry(node).map(|entry| &entry.data)
    }

    fn data_mut(&mut self, node: NodeId) -> Option<&mut NodeData> {
        self.entry_mut(node).map(|entry| &mut entry.data)
    }

    pub(crate) fn tag_of(&self, node: NodeId) -> Option<&str> {
        match self.data(node)? {
            NodeData::Element { tag, .. } => Some(tag),
            NodeData::Text(_) => None,
        }
    }

    pub(crate) fn text_mut(&mut self, node: NodeId) -> Option<&mut String> {
        match self.data_mut(node)? {
            NodeData::Text(text) => Some(text),
            NodeData::Element { .. } => None,
        }
    }

    pub(crate) fn child_ids(&self, node: NodeId) -> &[NodeId] {
        self.entry(node)
            .map_or(&[][..], |entry| entry.children.as_slice())
    }

    pub(crate) fn last_child(&self, node: NodeId) -> Option<NodeId> {
        self.child_ids(node).last().copied()
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.entry(node)?.parent?;
        let siblings = self.child_ids(parent);
        let index = siblings.iter().position(|id| *id == node)?;
        siblings.get(index + 1).copied()
    }

    pub(crate) fn alloc(&mut self, data: NodeData) -> NodeId {
        let node = Node {
            data,
            parent: None,
            children: Vec::new(),
        };

        if let Some(index) = self.free.pop()
            && let Some(slot) = self.slots.get_mut(index)
        {
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }

        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index: self.slots.len() - 1,
            generation: 0,
        }
    }

    /// Attach `child` under `parent` before `reference` (append when `None` or not a child).
    pub(crate) fn link_child(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if parent == child || !self.is_alive(parent) || !self.is_alive(child) {
            return;
        }
        self.unlink(child);

        let Some(entry) = self.entry_mut(parent) else {
            return;
        };
        let index = reference
            .and_then(|reference| entry.children.iter().position(|id| *id == reference))
            .unwrap_or(entry.children.len());
        entry.children.insert(index, child);

        if let Some(entry) = self.entry_mut(child) {
            entry.parent = Some(parent);
        }
    }

    fn unlink(&mut self, node: NodeId) {
        let Some(parent) = self.entry_mut(node).and_then(|entry| entry.parent.take()) else {
            return;
        };
        if let Some(entry) = self.entry_mut(parent) {
            entry.children.retain(|id| *id != node);
        }
    }

    fn free(&mut self, node: NodeId) {
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            let Some(slot) = self.slots.get_mut(id.index) else {
                continue;
            };
            if slot.generation != id.generation {
                continue;
            }
            if let Some(entry) = slot.node.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(id.index);
                stack.extend(entry.children);
            }
        }
    }
}

fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map_or(text.len(), |(index, _)| index)
}

impl DocumentModel for MarkupDocument {
    type Node = NodeId;

    fn root(&self) -> NodeId {
        self.root
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.entry(node)?.parent
    }

    fn is_text(&self, node: NodeId) -> bool {
        matches!(self.data(node), Some(NodeData::Text(_)))
    }

    fn text_len(&self, node: NodeId) -> usize {
        self.text(node).map_or(0, |text| text.chars().count())
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.tag_of(node)
    }

    fn child_nodes(&self, node: NodeId) -> Vec<NodeId> {
        self.child_ids(node).to_vec()
    }

    fn outer_markup(&self, node: NodeId) -> String {
        let mut out = String::new();
        markup::write_outer(self, node, &mut out);
        out
    }

    fn inner_markup(&self, node: NodeId) -> String {
        let mut out = String::new();
        markup::write_inner(self, node, &mut out);
        out
    }

    fn set_inner_markup(&mut self, node: NodeId, markup: &str) -> Result<(), MarkupError> {
        if !matches!(self.data(node), Some(NodeData::Element { .. })) {
            return Err(MarkupError::new(0, format!("{node:?} is not a live element")));
        }
        let context = self.tag_of(node).unwrap_or("body").to_string();
        let fragment = markup::parse_into(self, &context, markup);

        for child in self.child_nodes(node) {
            self.remove(child);
        }
        for child in fragment {
            self.link_child(node, child, None);
        }
        Ok(())
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        if self.parent(child) == Some(parent) {
            self.remove(child);
        }
    }

    fn parse_fragment(
        &mut self,
        context: NodeId,
        markup: &str,
    ) -> Result<Vec<NodeId>, MarkupError> {
        let context = self.tag_of(context).unwrap_or("body").to_string();
        Ok(markup::parse_into(self, &context, markup))
    }

    fn insert_before(&mut self, parent: NodeId, node: NodeId, reference: Option<NodeId>) {
        self.link_child(parent, node, reference);
    }
}

impl SelectionModel for MarkupDocument {
    fn selection(&self) -> Option<LiveSelection<NodeId>> {
        self.selection
    }

    fn set_selection(&mut self, selection: LiveSelection<NodeId>) {
        self.selection = Some(selection);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_document() {
        let doc = MarkupDocument::new();
        assert_eq!(doc.to_markup(), "");
        assert_eq!(doc.tag_name(doc.body()), Some("body"));
        assert_eq!(doc.node_count(), 1);
    }

    #[test]
    fn test_children_skip_text() {
        let doc = MarkupDocument::parse("a<b>x</b>c<i>y</i>");
        let body = doc.body();
        assert_eq!(doc.child_nodes(body).len(), 4);
        let elements = doc.children(body);
        assert_eq!(elements.len(), 2);
        assert_eq!(doc.tag_name(elements[1]), Some("i"));
    }

    #[test]
    fn test_text_editing_counts_characters() {
        let mut doc = MarkupDocument::parse("<p>héllo</p>");
        let text = doc.find_text("llo").unwrap();
        assert_eq!(doc.text_len(text), 5);
        doc.insert_text(text, 2, "X");
        assert_eq!(doc.to_markup(), "<p>héXllo</p>");
        doc.delete_text(text, 1, 2);
        assert_eq!(doc.to_markup(), "<p>hllo</p>");
        doc.insert_text(text, 99, "!");
        assert_eq!(doc.to_markup(), "<p>hllo!</p>");
    }

    #[test]
    fn test_split_text() {
        let mut doc = MarkupDocument::parse("<p>abcdef</p>");
        let text = doc.find_text("abc").unwrap();
        let tail = doc.split_text(text, 2).unwrap();
        assert_eq!(doc.text(text), Some("ab"));
        assert_eq!(doc.text(tail), Some("cdef"));
        assert_eq!(doc.next_sibling(text), Some(tail));
        assert_eq!(doc.to_markup(), "<p>abcdef</p>");
    }

    #[test]
    fn test_rename_kills_old_handle() {
        let mut doc = MarkupDocument::parse("<p class=\"c\">one<b>two</b></p>");
        let p = doc.find_element("p").unwrap();
        let h1 = doc.rename_element(p, "H1").unwrap();
        assert!(!doc.is_alive(p));
        assert!(doc.is_alive(h1));
        assert_eq!(doc.to_markup(), "<h1 class=\"c\">one<b>two</b></h1>");
        assert_eq!(doc.parent(h1), Some(doc.body()));
    }

    #[test]
    fn test_remove_frees_subtree() {
        let mut doc = MarkupDocument::parse("<div><p>x</p></div><p>y</p>");
        let div = doc.find_element("div").unwrap();
        let inner = doc.find_text("x").unwrap();
        doc.remove(div);
        assert!(!doc.is_alive(inner));
        assert_eq!(doc.to_markup(), "<p>y</p>");
        assert_eq!(doc.parent(inner), None);
    }

    #[test]
    fn test_set_inner_markup_rejects_text_target() {
        let mut doc = MarkupDocument::parse("<p>keep</p>");
        let text = doc.find_text("keep").unwrap();
        let count = doc.node_count();
        assert!(doc.set_inner_markup(text, "<b>x</b>").is_err());
        assert_eq!(doc.node_count(), count);
        assert_eq!(doc.to_markup(), "<p>keep</p>");

        let body = doc.body();
        doc.set_inner_markup(body, "<div>new</div>").unwrap();
        assert_eq!(doc.to_markup(), "<div>new</div>");
        assert_eq!(doc.node_count(), 3);
    }

    #[test]
    fn test_freed_slots_are_recycled() {
        let mut doc = MarkupDocument::parse("<p>0</p>");
        let body = doc.body();
        let first = doc.find_element("p").unwrap();

        doc.set_inner_markup(body, "<p>1</p>").unwrap();
        let slots = doc.slots.len();
        for round in 2..50 {
            doc.set_inner_markup(body, &format!("<p>{round}</p>")).unwrap();
        }
        assert_eq!(doc.slots.len(), slots);
        assert_eq!(doc.node_count(), 3);

        // A recycled slot does not revive the handle that used it before.
        let latest = doc.find_element("p").unwrap();
        assert!(!doc.is_alive(first));
        assert_eq!(doc.parent(first), None);
        assert!(doc.is_alive(latest));
        assert_eq!(doc.to_markup(), "<p>49</p>");
    }

    #[test]
    fn test_fragment_insert_before() {
        let mut doc = MarkupDocument::parse("<p>a</p><p>c</p>");
        let body = doc.body();
        let fragment = doc.parse_fragment(body, "<p>b</p>").unwrap();
        let reference = doc.children(body)[1];
        for node in fragment {
            doc.insert_before(body, node, Some(reference));
        }
        assert_eq!(doc.to_markup(), "<p>a</p><p>b</p><p>c</p>");
    }

    #[test]
    fn test_attributes() {
        let mut doc = MarkupDocument::parse("<p>x</p>");
        let p = doc.find_element("p").unwrap();
        assert!(doc.set_attribute(p, "Data-Sel", "a & b"));
        assert_eq!(doc.attribute(p, "data-sel"), Some("a & b"));
        assert_eq!(doc.to_markup(), "<p data-sel=\"a &amp; b\">x</p>");
        assert_eq!(doc.remove_attribute(p, "data-sel").as_deref(), Some("a & b"));
        assert_eq!(doc.attribute(p, "data-sel"), None);
        let text = doc.find_text("x").unwrap();
        assert!(!doc.set_attribute(text, "a", "b"));
    }

    #[test]
    fn test_selection() {
        let mut doc = MarkupDocument::parse("<p>abc</p>");
        assert_eq!(doc.selection(), None);
        let text = doc.find_text("abc").unwrap();
        doc.set_caret(text, 1);
        assert!(doc.selection().unwrap().is_collapsed());
        doc.select(text, 0, text, 3);
        assert!(!doc.selection().unwrap().is_collapsed());
        doc.clear_selection();
        assert_eq!(doc.selection(), None);
    }
}
