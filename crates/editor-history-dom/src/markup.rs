//! Markup parsing and serialization.
//!
//! Parsing runs html5ever's fragment algorithm, so input is recovered exactly as a browser
//! would recover it: unclosed elements close at the end of input, stray end tags are ignored,
//! character references are decoded and tag and attribute names are lowercased. The tree
//! builder writes into a staging tree, which is grafted into the document
//! arena only once parsing is complete. Comments and doctypes are dropped on the way and
//! adjacent text runs are merged.
//!
//! Serialization writes double-quoted attributes and escapes text with `html-escape`.

use std::borrow::Cow;

use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{
    Attribute, ExpandedName, LocalName, Namespace, ParseOpts, QualName, parse_fragment,
};

use crate::tree::{MarkupDocument, NodeData, NodeId};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Elements that never have children or an end tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Returns `true` for elements serialized without an end tag.
pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|void| void.eq_ignore_ascii_case(tag))
}

fn html_name(local: &str) -> QualName {
    QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from(local))
}

enum Staged {
    Document,
    Element {
        name: QualName,
        attributes: Vec<(String, String)>,
    },
    Text(String),
    /// Comments and processing instructions; never grafted.
    Ignored,
}

struct StagedNode {
    data: Staged,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// html5ever tree sink collecting a fragment into a flat staging arena.
///
/// Handles are indices into `nodes`; index 0 is the document node.
struct FragmentSink {
    nodes: Vec<StagedNode>,
    /// Name reported for handles that are not elements.
    unnamed: QualName,
}

impl FragmentSink {
    fn new() -> Self {
        Self {
            nodes: vec![StagedNode {
                data: Staged::Document,
                parent: None,
                children: Vec::new(),
            }],
            unnamed: html_name(""),
        }
    }

    fn push(&mut self, data: Staged) -> usize {
        self.nodes.push(StagedNode {
            data,
            parent: None,
            children: Vec::new(),
        });
        self.nodes.len() - 1
    }

    fn position(&self, node: usize) -> Option<(usize, usize)> {
        let parent = self.nodes.get(node)?.parent?;
        let index = self.nodes.get(parent)?.children.iter().position(|c| *c == node)?;
        Some((parent, index))
    }

    fn detach(&mut self, node: usize) {
        let Some((parent, index)) = self.position(node) else {
            return;
        };
        if let Some(entry) = self.nodes.get_mut(parent) {
            entry.children.remove(index);
        }
        if let Some(entry) = self.nodes.get_mut(node) {
            entry.parent = None;
        }
    }

    fn insert(&mut self, parent: usize, index: usize, child: NodeOrText<usize>) {
        let node = match child {
            NodeOrText::AppendNode(node) => {
                self.detach(node);
                node
            }
            NodeOrText::AppendText(text) => {
                let previous = index
                    .checked_sub(1)
                    .and_then(|i| self.nodes.get(parent)?.children.get(i).copied());
                if let Some(previous) = previous
                    && let Some(StagedNode {
                        data: Staged::Text(existing),
                        ..
                    }) = self.nodes.get_mut(previous)
                {
                    existing.push_str(&text);
                    return;
                }
                self.push(Staged::Text(text.to_string()))
            }
        };

        let Some(entry) = self.nodes.get_mut(parent) else {
            return;
        };
        let index = index.min(entry.children.len());
        entry.children.insert(index, node);
        if let Some(entry) = self.nodes.get_mut(node) {
            entry.parent = Some(parent);
        }
    }

    /// Parsed top-level nodes: the children of the `<html>` element the fragment algorithm
    /// places under the document.
    fn top_level(&self) -> &[usize] {
        let Some(document) = self.nodes.first() else {
            return &[];
        };
        document
            .children
            .iter()
            .find_map(|child| {
                let node = self.nodes.get(*child)?;
                matches!(node.data, Staged::Element { .. }).then_some(node.children.as_slice())
            })
            .unwrap_or(&[])
    }
}

impl TreeSink for FragmentSink {
    type Handle = usize;
    type Output = Self;

    fn finish(self) -> Self {
        self
    }

    // Every error is recovered from in the tree.
    fn parse_error(&mut self, _msg: Cow<'static, str>) {}

    fn get_document(&mut self) -> usize {
        0
    }

    fn elem_name<'a>(&'a self, target: &'a usize) -> ExpandedName<'a> {
        match self.nodes.get(*target) {
            Some(StagedNode {
                data: Staged::Element { name, .. },
                ..
            }) => name.expanded(),
            _ => self.unnamed.expanded(),
        }
    }

    fn create_element(
        &mut self,
        name: QualName,
        attrs: Vec<Attribute>,
        _flags: ElementFlags,
    ) -> usize {
        let attributes = attrs
            .into_iter()
            .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
            .collect();
        self.push(Staged::Element { name, attributes })
    }

    fn create_comment(&mut self, _text: StrTendril) -> usize {
        self.push(Staged::Ignored)
    }

    fn create_pi(&mut self, _target: StrTendril, _data: StrTendril) -> usize {
        self.push(Staged::Ignored)
    }

    fn append(&mut self, parent: &usize, child: NodeOrText<usize>) {
        let index = self.nodes.get(*parent).map_or(0, |entry| entry.children.len());
        self.insert(*parent, index, child);
    }

    fn append_based_on_parent_node(
        &mut self,
        element: &usize,
        prev_element: &usize,
        child: NodeOrText<usize>,
    ) {
        if self.position(*element).is_some() {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &mut self,
        _name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
    }

    fn get_template_contents(&mut self, target: &usize) -> usize {
        *target
    }

    fn same_node(&self, x: &usize, y: &usize) -> bool {
        x == y
    }

    fn set_quirks_mode(&mut self, _mode: QuirksMode) {}

    fn append_before_sibling(&mut self, sibling: &usize, new_node: NodeOrText<usize>) {
        if let Some((parent, index)) = self.position(*sibling) {
            self.insert(parent, index, new_node);
        }
    }

    fn add_attrs_if_missing(&mut self, target: &usize, attrs: Vec<Attribute>) {
        let Some(StagedNode {
            data: Staged::Element { attributes, .. },
            ..
        }) = self.nodes.get_mut(*target)
        else {
            return;
        };
        for attr in attrs {
            let name = attr.name.local.to_string();
            if !attributes.iter().any(|(key, _)| *key == name) {
                attributes.push((name, attr.value.to_string()));
            }
        }
    }

    fn remove_from_parent(&mut self, target: &usize) {
        self.detach(*target);
    }

    fn reparent_children(&mut self, node: &usize, new_parent: &usize) {
        let children = match self.nodes.get_mut(*node) {
            Some(entry) => std::mem::take(&mut entry.children),
            None => return,
        };
        for child in &children {
            if let Some(entry) = self.nodes.get_mut(*child) {
                entry.parent = Some(*new_parent);
            }
        }
        if let Some(entry) = self.nodes.get_mut(*new_parent) {
            entry.children.extend(children);
        }
    }
}

/// Parse `markup` as the content of a `context` element into detached nodes owned by `doc`,
/// returning the top-level ones.
pub(crate) fn parse_into(doc: &mut MarkupDocument, context: &str, markup: &str) -> Vec<NodeId> {
    let sink = parse_fragment(
        FragmentSink::new(),
        ParseOpts::default(),
        html_name(context),
        Vec::new(),
    )
    .one(markup);
    graft(doc, &sink, sink.top_level())
}

fn graft(doc: &mut MarkupDocument, sink: &FragmentSink, staged: &[usize]) -> Vec<NodeId> {
    let mut out: Vec<NodeId> = Vec::new();

    for node in staged.iter().filter_map(|index| sink.nodes.get(*index)) {
        let id = match &node.data {
            Staged::Document | Staged::Ignored => continue,
            Staged::Text(text) => {
                // Runs split by a dropped comment become one node again.
                if let Some(previous) = out.last()
                    && let Some(existing) = doc.text_mut(*previous)
                {
                    existing.push_str(text);
                    continue;
                }
                doc.alloc(NodeData::Text(text.clone()))
            }
            Staged::Element { name, attributes } => {
                let id = doc.alloc(NodeData::Element {
                    tag: name.local.to_string(),
                    attributes: attributes.clone(),
                });
                for child in graft(doc, sink, &node.children) {
                    doc.link_child(id, child, None);
                }
                id
            }
        };
        out.push(id);
    }

    out
}

/// Append the markup of `id` (including its own tag) to `out`.
pub(crate) fn write_outer(doc: &MarkupDocument, id: NodeId, out: &mut String) {
    match doc.data(id) {
        Some(NodeData::Text(text)) => out.push_str(&html_escape::encode_text(text)),
        Some(NodeData::Element { tag, attributes }) => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in attributes {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&html_escape::encode_double_quoted_attribute(value));
                out.push('"');
            }
            out.push('>');

            if is_void_element(tag) {
                return;
            }

            write_inner(doc, id, out);
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        None => {}
    }
}

/// Append the markup of the children of `id` to `out`.
pub(crate) fn write_inner(doc: &MarkupDocument, id: NodeId, out: &mut String) {
    for child in doc.child_ids(id) {
        write_outer(doc, *child, out);
    }
}
