//! Portable selection snapshots.
//!
//! A live selection points at node handles, which do not survive edits. A
//! [`SelectionSnapshot`] stores each end as the [`StructuralPath`] of its element plus an offset
//! in *accumulated text* space: for a caret inside a text leaf the offset also counts the
//! lengths of all preceding text siblings under the same element. Splitting or merging text
//! leaves therefore keeps the snapshot valid.
//!
//! A caret placed on an element itself (between two of its children) keeps its child offset
//! instead, tagged with [`OffsetSpace::Child`].
//!
//! Snapshots have a deterministic textual form used for out-of-band persistence, e.g.
//!
//! ```text
//! anchorElem=[0,2] anchorOffset=5 focusElem=[0,3] focusOffset=1
//! anchorElem=[1] anchorChild=2
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::document::{Caret, DocumentModel, LiveSelection, SelectionModel};
use crate::error::PathResolutionError;
use crate::path::StructuralPath;

const ANCHOR_ELEM: &str = "anchorElem";
const ANCHOR_OFFSET: &str = "anchorOffset";
const FOCUS_ELEM: &str = "focusElem";
const FOCUS_OFFSET: &str = "focusOffset";
const ANCHOR_CHILD: &str = "anchorChild";
const FOCUS_CHILD: &str = "focusChild";

/// What the offset of a [`SelectionPoint`] counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OffsetSpace {
    /// Characters accumulated over the element's text runs.
    #[default]
    Text,
    /// Child nodes of the element; the caret sits between two children.
    Child,
}

/// One end of a stored selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionPoint {
    /// Path of the element holding the caret.
    pub path: StructuralPath,
    /// Offset into the element, counted in `space`.
    pub offset: usize,
    /// Unit of `offset`.
    #[serde(default)]
    pub space: OffsetSpace,
}

impl SelectionPoint {
    /// A point at accumulated text `offset` of the element at `path`.
    pub fn new(path: impl Into<StructuralPath>, offset: usize) -> Self {
        Self {
            path: path.into(),
            offset,
            space: OffsetSpace::Text,
        }
    }

    /// A point before child `offset` of the element at `path`.
    pub fn child(path: impl Into<StructuralPath>, offset: usize) -> Self {
        Self {
            path: path.into(),
            offset,
            space: OffsetSpace::Child,
        }
    }

    fn store<D: DocumentModel + ?Sized>(
        doc: &D,
        caret: Caret<D::Node>,
    ) -> Result<Self, PathResolutionError> {
        if !doc.is_text(caret.node) {
            return Ok(Self::child(
                StructuralPath::encode(doc, caret.node)?,
                caret.offset,
            ));
        }

        let parent = doc
            .parent(caret.node)
            .ok_or(PathResolutionError::Detached)?;
        let preceding: usize = doc
            .child_nodes(parent)
            .into_iter()
            .take_while(|sibling| *sibling != caret.node)
            .filter(|sibling| doc.is_text(*sibling))
            .map(|sibling| doc.text_len(sibling))
            .sum();

        Ok(Self::new(
            StructuralPath::encode(doc, parent)?,
            caret.offset + preceding,
        ))
    }

    fn resolve<D: DocumentModel + ?Sized>(
        &self,
        doc: &D,
    ) -> Result<Caret<D::Node>, PathResolutionError> {
        let element = self.path.resolve(doc)?;
        let child_nodes = doc.child_nodes(element);
        if self.space == OffsetSpace::Child {
            return Ok(Caret::new(element, self.offset.min(child_nodes.len())));
        }

        let mut remaining = self.offset;
        let mut last_run = None;

        for child in child_nodes.iter().copied().filter(|c| doc.is_text(*c)) {
            let len = doc.text_len(child);
            if remaining > len {
                remaining -= len;
                last_run = Some((child, len));
            } else {
                return Ok(Caret::new(child, remaining));
            }
        }

        Ok(match last_run {
            // Past the end of all text: clamp to the end of the last run.
            Some((node, len)) => Caret::new(node, len),
            None => Caret::new(element, 0),
        })
    }

    fn offset_key<'k>(&self, text_key: &'k str, child_key: &'k str) -> &'k str {
        match self.space {
            OffsetSpace::Text => text_key,
            OffsetSpace::Child => child_key,
        }
    }
}

/// A selection stored by position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionSnapshot {
    /// Where the selection started.
    pub anchor: SelectionPoint,
    /// Where the selection ends; `None` for a collapsed caret.
    pub focus: Option<SelectionPoint>,
}

impl SelectionSnapshot {
    /// A collapsed snapshot.
    pub fn collapsed(anchor: SelectionPoint) -> Self {
        Self {
            anchor,
            focus: None,
        }
    }

    /// Returns `true` when there is no focus.
    pub fn is_collapsed(&self) -> bool {
        self.focus.is_none()
    }

    /// Snapshot the host's live selection.
    ///
    /// Returns `None` when there is no selection or it lies outside the root.
    pub fn store<H: SelectionModel + ?Sized>(host: &H) -> Option<Self> {
        let selection = host.selection()?;
        match Self::from_live(host, &selection) {
            Ok(snapshot) => Some(snapshot),
            Err(error) => {
                warn!(%error, "Cannot store selection");
                None
            }
        }
    }

    /// Snapshot an explicit live selection.
    pub fn from_live<D: DocumentModel + ?Sized>(
        doc: &D,
        selection: &LiveSelection<D::Node>,
    ) -> Result<Self, PathResolutionError> {
        let anchor = SelectionPoint::store(doc, selection.anchor)?;
        let focus = match selection.focus {
            Some(focus) if !selection.is_collapsed() => Some(SelectionPoint::store(doc, focus)?),
            _ => None,
        };
        Ok(Self { anchor, focus })
    }

    /// Move the host's live selection to this snapshot.
    pub fn restore<H: SelectionModel + ?Sized>(
        &self,
        host: &mut H,
    ) -> Result<(), PathResolutionError> {
        let anchor = self.anchor.resolve(host)?;
        let selection = match &self.focus {
            Some(focus) => LiveSelection::range(anchor, focus.resolve(host)?),
            None => LiveSelection::collapsed(anchor.node, anchor.offset),
        };
        host.set_selection(selection);
        Ok(())
    }

    /// Decode the textual form produced by `to_string()`.
    ///
    /// Keys may appear in any order and unknown keys are ignored. Malformed offsets are ignored
    /// (treated as 0). Returns `None` unless a valid `anchorElem` is present.
    pub fn parse(text: &str) -> Option<Self> {
        let mut anchor_path = None;
        let mut anchor_offset = (0, OffsetSpace::Text);
        let mut focus_path = None;
        let mut focus_offset = (0, OffsetSpace::Text);

        for part in text.split_whitespace() {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };

            match key {
                ANCHOR_ELEM => anchor_path = Some(value.parse::<StructuralPath>().ok()?),
                ANCHOR_OFFSET | ANCHOR_CHILD => {
                    if let Ok(offset) = value.parse() {
                        anchor_offset = (offset, space_of(key));
                    }
                }
                FOCUS_ELEM => focus_path = value.parse::<StructuralPath>().ok(),
                FOCUS_OFFSET | FOCUS_CHILD => {
                    if let Ok(offset) = value.parse() {
                        focus_offset = (offset, space_of(key));
                    }
                }
                _ => {}
            }
        }

        let point = |path: StructuralPath, (offset, space): (usize, OffsetSpace)| SelectionPoint {
            path,
            offset,
            space,
        };
        Some(Self {
            anchor: point(anchor_path?, anchor_offset),
            focus: focus_path.map(|path| point(path, focus_offset)),
        })
    }
}

fn space_of(key: &str) -> OffsetSpace {
    match key {
        ANCHOR_CHILD | FOCUS_CHILD => OffsetSpace::Child,
        _ => OffsetSpace::Text,
    }
}

impl fmt::Display for SelectionSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{ANCHOR_ELEM}={} {}={}",
            self.anchor.path,
            self.anchor.offset_key(ANCHOR_OFFSET, ANCHOR_CHILD),
            self.anchor.offset
        )?;
        if let Some(focus) = &self.focus {
            write!(
                f,
                " {FOCUS_ELEM}={} {}={}",
                focus.path,
                focus.offset_key(FOCUS_OFFSET, FOCUS_CHILD),
                focus.offset
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapsed_to_string() {
        let snapshot = SelectionSnapshot::collapsed(SelectionPoint::new(vec![0, 2], 5));
        assert_eq!(snapshot.to_string(), "anchorElem=[0,2] anchorOffset=5");
    }

    #[test]
    fn test_round_trip_with_focus() {
        let snapshot = SelectionSnapshot {
            anchor: SelectionPoint::new(vec![1], 0),
            focus: Some(SelectionPoint::new(vec![3, 0], 7)),
        };
        let text = snapshot.to_string();
        assert_eq!(
            text,
            "anchorElem=[1] anchorOffset=0 focusElem=[3,0] focusOffset=7"
        );
        assert_eq!(SelectionSnapshot::parse(&text), Some(snapshot));
    }

    #[test]
    fn test_parse_root_anchor() {
        let snapshot = SelectionSnapshot::parse("anchorElem=[] anchorOffset=0").unwrap();
        assert!(snapshot.anchor.path.is_empty());
        assert!(snapshot.is_collapsed());
    }

    #[test]
    fn test_parse_any_order_and_unknown_keys() {
        let snapshot =
            SelectionSnapshot::parse("anchorOffset=4 color=red anchorElem=[2]").unwrap();
        assert_eq!(snapshot.anchor, SelectionPoint::new(vec![2], 4));
    }

    #[test]
    fn test_parse_requires_anchor() {
        assert_eq!(SelectionSnapshot::parse(""), None);
        assert_eq!(SelectionSnapshot::parse("anchorOffset=3"), None);
        assert_eq!(SelectionSnapshot::parse("anchorElem=[x] anchorOffset=3"), None);
    }

    #[test]
    fn test_parse_ignores_bad_offset() {
        let snapshot = SelectionSnapshot::parse("anchorElem=[0] anchorOffset=abc").unwrap();
        assert_eq!(snapshot.anchor.offset, 0);
    }

    #[test]
    fn test_child_offset_text_form() {
        let snapshot = SelectionSnapshot {
            anchor: SelectionPoint::child(vec![1], 2),
            focus: Some(SelectionPoint::new(vec![2], 3)),
        };
        let text = snapshot.to_string();
        assert_eq!(
            text,
            "anchorElem=[1] anchorChild=2 focusElem=[2] focusOffset=3"
        );
        assert_eq!(SelectionSnapshot::parse(&text), Some(snapshot));
    }

    #[test]
    fn test_parse_drops_malformed_focus() {
        let snapshot =
            SelectionSnapshot::parse("anchorElem=[0] anchorOffset=1 focusElem=(1) focusOffset=2")
                .unwrap();
        assert!(snapshot.focus.is_none());
    }
}
