//! Range claims: which part of the tree an edit touches.
//!
//! A claim is the smallest contiguous run of direct children of a common ancestor that covers
//! both boundaries of an edit. The run counts every child node, text included, so text lying
//! between or next to the boundary elements keeps its place. It is described positionally so
//! it can be re-found after the edit (and after any number of later undo/redo steps):
//!
//! ```text
//!   before        |  after
//!   <body>        |  <body>
//!     <a/>        |    <a/>
//!     <b/>        |    <x/>
//!     <c/>        |    <y/>
//!     <d/>        |    <c/>
//!   </body>       |    <d/>
//!                 |  </body>
//! ```
//!
//! Changing `b` into `x` and `y` is recorded with the ancestor path pointing at `body`,
//! `first = 1` and `trailing = 2`. Undo/redo replaces every child in
//! `first..child_nodes.len() - trailing`, whatever the count is at that moment.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::document::{DocumentModel, SelectionModel, element_of};
use crate::error::{HistoryError, PathResolutionError, RangeBoundsError};
use crate::path::StructuralPath;

/// Tags treated as block-level when widening a boundary to its parent block.
pub const BLOCK_TAGS: &[&str] = &[
    "P",
    "DIV",
    "BLOCKQUOTE",
    "UL",
    "OL",
    "PRE",
    "H1",
    "H2",
    "H3",
    "H4",
    "H5",
    "H6",
    "ADDRESS",
    "TD",
    "TH",
];

/// Returns `true` if `tag` is one of [`BLOCK_TAGS`] (case-insensitive).
pub fn is_block_tag(tag: &str) -> bool {
    BLOCK_TAGS.iter().any(|block| block.eq_ignore_ascii_case(tag))
}

/// Where the ancestor walk starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AncestorWalk {
    /// Start at the boundaries' parents. Used for mutation capture.
    #[default]
    Short,
    /// Start at the boundaries themselves, so a boundary can be its own ancestor.
    /// Used when computing formatting state over whole-sibling selections.
    Long,
}

/// The affected children of the common ancestor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeSpan {
    /// The ancestor's entire content is captured and replaced.
    Whole,
    /// Child nodes `first..len - trailing` are captured and replaced.
    Children {
        /// Index of the first affected child node.
        first: usize,
        /// Number of unaffected child nodes after the affected run.
        trailing: usize,
    },
}

impl RangeSpan {
    /// Index range of the affected children for an ancestor with `len` child nodes.
    ///
    /// Returns `None` for [`RangeSpan::Whole`].
    pub fn bounds(&self, len: usize) -> Result<Option<Range<usize>>, RangeBoundsError> {
        let RangeSpan::Children { first, trailing } = *self else {
            return Ok(None);
        };

        // `first` may equal `len` when the affected nodes had been removed.
        if first > len {
            return Err(RangeBoundsError::FirstOutOfBounds { first, len });
        }

        match len.checked_sub(trailing) {
            Some(last) if last >= first => Ok(Some(first..last)),
            _ => Err(RangeBoundsError::TrailingOutOfBounds {
                trailing,
                len,
                first,
            }),
        }
    }
}

/// A claimed region plus its captured content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedRange {
    /// Path of the common ancestor.
    pub ancestor_path: StructuralPath,
    /// Which of the ancestor's children are affected.
    pub span: RangeSpan,
    /// Markup of the affected children before the edit; `None` when not captured.
    pub before: Option<String>,
    /// Markup of the affected children after the edit; `None` until the edit is committed.
    pub after: Option<String>,
}

impl AffectedRange {
    /// Markup of the affected children as they are now.
    pub fn capture<D: DocumentModel + ?Sized>(&self, doc: &D) -> Result<String, HistoryError> {
        let ancestor = self.ancestor_path.resolve(doc)?;
        let children = doc.child_nodes(ancestor);

        Ok(match self.span.bounds(children.len())? {
            None => doc.inner_markup(ancestor),
            Some(range) => children[range]
                .iter()
                .map(|child| doc.outer_markup(*child))
                .collect(),
        })
    }

    /// Returns `true` when the captured before/after content is identical.
    pub fn is_unchanged(&self) -> bool {
        self.before.as_deref().unwrap_or_default() == self.after.as_deref().unwrap_or_default()
    }
}

/// Options for [`claim`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimOptions<'a> {
    /// Widen the start boundary to its nearest block-level ancestor first.
    pub use_parent_block: bool,
    /// Capture the markup of the claimed children into [`AffectedRange::before`].
    pub capture_content: bool,
    /// Additional tags treated as block-level on top of [`BLOCK_TAGS`].
    pub extra_block_tags: &'a [String],
}

/// Lowest common ancestor of `a` and `b` strictly below the root, or the root itself.
pub fn find_common_ancestor<D: DocumentModel + ?Sized>(
    doc: &D,
    a: D::Node,
    b: D::Node,
    walk: AncestorWalk,
) -> D::Node {
    let root = doc.root();
    if a == root || b == root {
        return root;
    }

    let start_of = |node: D::Node| match walk {
        AncestorWalk::Short => doc.parent(node),
        AncestorWalk::Long => Some(node),
    };

    let mut candidate = start_of(a);
    while let Some(ancestor) = candidate {
        if ancestor == root {
            break;
        }

        let mut other = start_of(b);
        while let Some(node) = other {
            if node == root {
                break;
            }
            if node == ancestor {
                return ancestor;
            }
            other = doc.parent(node);
        }

        candidate = doc.parent(ancestor);
    }

    root
}

/// The child of `ancestor` on the path down to `node`.
///
/// `None` when `node` is `ancestor` itself or not below it.
pub fn direct_child_of<D: DocumentModel + ?Sized>(
    doc: &D,
    ancestor: D::Node,
    node: D::Node,
) -> Option<D::Node> {
    if node == ancestor {
        return None;
    }

    let mut current = node;
    loop {
        let parent = doc.parent(current)?;
        if parent == ancestor {
            return Some(current);
        }
        current = parent;
    }
}

fn nearest_block<D: DocumentModel + ?Sized>(
    doc: &D,
    node: D::Node,
    extra_block_tags: &[String],
) -> D::Node {
    let root = doc.root();
    let mut current = node;

    while current != root {
        if let Some(tag) = doc.tag_name(current)
            && (is_block_tag(tag)
                || extra_block_tags
                    .iter()
                    .any(|extra| extra.eq_ignore_ascii_case(tag)))
        {
            break;
        }

        match doc.parent(current) {
            Some(parent) => current = parent,
            None => break,
        }
    }

    current
}

/// Claim the region between `start` and `end`.
///
/// Missing boundaries default to the live selection's anchor and focus, and to the whole
/// document when there is no selection either. Boundaries may come in either document order.
pub fn claim<H: SelectionModel + ?Sized>(
    host: &H,
    start: Option<H::Node>,
    end: Option<H::Node>,
    options: &ClaimOptions<'_>,
) -> Result<AffectedRange, PathResolutionError> {
    let root = host.root();
    let (mut start, end) = match start {
        Some(start) => (start, end.unwrap_or(start)),
        None => match host.selection() {
            Some(selection) => (selection.anchor.node, selection.focus_or_anchor().node),
            None => (root, root),
        },
    };

    if options.use_parent_block {
        start = nearest_block(host, start, options.extra_block_tags);
    }

    let start = element_of(host, start).ok_or(PathResolutionError::Detached)?;
    let end = element_of(host, end).ok_or(PathResolutionError::Detached)?;

    let ancestor = find_common_ancestor(host, start, end, AncestorWalk::Short);
    let mut start_child = direct_child_of(host, ancestor, start);
    let mut end_child = direct_child_of(host, ancestor, end);

    let children = host.child_nodes(ancestor);
    let mut first = None;
    let mut next = children.len();
    let mut content = String::new();

    for (index, child) in children.iter().enumerate() {
        if first.is_none() {
            if Some(*child) == start_child {
                first = Some(index);
            } else if Some(*child) == end_child {
                // Backward selection: the end boundary comes first in document order.
                end_child = start_child;
                start_child = Some(*child);
                first = Some(index);
            }
        }

        if first.is_some() {
            if options.capture_content {
                content.push_str(&host.outer_markup(*child));
            }

            if Some(*child) == end_child {
                next = index + 1;
                break;
            }
        }
    }

    let ancestor_path = StructuralPath::encode(host, ancestor)?;

    Ok(match first {
        Some(first) => AffectedRange {
            ancestor_path,
            span: RangeSpan::Children {
                first,
                trailing: children.len() - next,
            },
            before: options.capture_content.then_some(content),
            after: None,
        },
        None => AffectedRange {
            ancestor_path,
            span: RangeSpan::Whole,
            before: options
                .capture_content
                .then(|| host.inner_markup(ancestor)),
            after: None,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_tags_are_case_insensitive() {
        assert!(is_block_tag("p"));
        assert!(is_block_tag("Blockquote"));
        assert!(is_block_tag("H6"));
        assert!(!is_block_tag("span"));
        assert!(!is_block_tag("b"));
    }

    #[test]
    fn test_span_bounds() {
        let span = RangeSpan::Children {
            first: 1,
            trailing: 2,
        };
        assert_eq!(span.bounds(5).unwrap(), Some(1..3));
        assert_eq!(span.bounds(3).unwrap(), Some(1..1));
        assert_eq!(RangeSpan::Whole.bounds(0).unwrap(), None);
    }

    #[test]
    fn test_span_bounds_first_may_equal_len() {
        let span = RangeSpan::Children {
            first: 2,
            trailing: 0,
        };
        assert_eq!(span.bounds(2).unwrap(), Some(2..2));
    }

    #[test]
    fn test_span_bounds_errors() {
        let span = RangeSpan::Children {
            first: 4,
            trailing: 0,
        };
        assert_eq!(
            span.bounds(3),
            Err(RangeBoundsError::FirstOutOfBounds { first: 4, len: 3 })
        );

        let span = RangeSpan::Children {
            first: 1,
            trailing: 3,
        };
        assert_eq!(
            span.bounds(3),
            Err(RangeBoundsError::TrailingOutOfBounds {
                trailing: 3,
                len: 3,
                first: 1,
            })
        );
    }

    #[test]
    fn test_unchanged_treats_missing_as_empty() {
        let range = AffectedRange {
            ancestor_path: StructuralPath::root(),
            span: RangeSpan::Whole,
            before: None,
            after: Some(String::new()),
        };
        assert!(range.is_unchanged());
    }
}
