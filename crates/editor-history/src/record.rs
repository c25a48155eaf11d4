//! Undo history records.
//!
//! Only [`EventRecord`], [`CustomRecord`] and [`DocumentRecord`] own captured content.
//! A [`GroupRecord`] delegates entirely to its children, which are replayed in order for redo
//! and in reverse order for undo.

use serde::{Deserialize, Serialize};

use crate::claim::AffectedRange;
use crate::merge::MergeKind;
use crate::selection::SelectionSnapshot;

/// Well-known operation types.
///
/// Operation types are free-form strings (hosts typically forward the `inputType` of their
/// input events); these are the ones the engine itself gives meaning to.
pub mod op {
    /// Plain text insertion. Consecutive insertions merge into one undo step.
    pub const INSERT_TEXT: &str = "insertText";
    /// Insertion of a word delimiter (space, tab). Merges only with its own kind.
    pub const INSERT_WORD_DELIMITER: &str = "insertText::WordDelim";
    /// New paragraph. Captured from the enclosing block by default.
    pub const INSERT_PARAGRAPH: &str = "insertParagraph";
    /// Line break. Captured from the enclosing block by default.
    pub const INSERT_LINE_BREAK: &str = "insertLineBreak";
    /// Whole-document replacement (mode switch, reload).
    pub const REPLACE_DOCUMENT: &str = "replaceDocument";
    /// Block alignment change.
    pub const SET_ALIGNMENT: &str = "setAlignment";
    /// Block format change.
    pub const SET_BLOCK_FORMAT: &str = "setBlockFormat";
}

/// Kind of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    /// Atomic low-level edit, one input/mutation burst.
    Event,
    /// Whole-document replacement.
    Document,
    /// Ordered sequence of sub-records forming one logical operation.
    Group,
    /// Edit replayed by a caller-registered handler.
    Custom,
}

/// A single captured edit.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    /// Operation type.
    pub op_type: String,
    /// Claimed region and its before/after content.
    pub range: AffectedRange,
    /// Selection before the edit.
    pub selection_before: Option<SelectionSnapshot>,
    /// Selection after the edit.
    pub selection_after: Option<SelectionSnapshot>,
    /// Set once this record has absorbed later records.
    pub(crate) merged: Option<MergeKind>,
}

impl EventRecord {
    /// Create a record without after-state.
    pub fn new(
        op_type: impl Into<String>,
        range: AffectedRange,
        selection_before: Option<SelectionSnapshot>,
    ) -> Self {
        Self {
            op_type: op_type.into(),
            range,
            selection_before,
            selection_after: None,
            merged: None,
        }
    }

    /// The merge bucket this record was folded under, if any.
    pub fn merged_as(&self) -> Option<MergeKind> {
        self.merged
    }
}

/// Whole-document before/after markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    /// Operation type.
    pub op_type: String,
    /// Document markup before the edit.
    pub html_before: String,
    /// Document markup after the edit.
    pub html_after: String,
    /// Selection before the edit.
    pub selection_before: Option<SelectionSnapshot>,
    /// Selection after the edit.
    pub selection_after: Option<SelectionSnapshot>,
}

/// Several records undone and redone as one step.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRecord {
    /// Operation type.
    pub op_type: String,
    /// Sub-records in the order they were committed.
    pub children: Vec<EditRecord>,
    /// Selection before the first child.
    pub selection_before: Option<SelectionSnapshot>,
    /// Selection after the last child.
    pub selection_after: Option<SelectionSnapshot>,
}

/// Handler id plus the explicit data it needs to invert an edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomAction {
    /// Id the handler was registered under.
    pub handler: String,
    /// Opaque data handed to the handler on replay.
    pub payload: serde_json::Value,
}

impl CustomAction {
    /// Create an action for `handler`.
    pub fn new(handler: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            handler: handler.into(),
            payload,
        }
    }
}

/// A record with caller-supplied replay logic.
///
/// Without an [`CustomAction`] the record replays its captured range like an event.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomRecord {
    /// Operation type.
    pub op_type: String,
    /// Claimed region, replayed when no action is attached.
    pub range: AffectedRange,
    /// Registered replay logic.
    pub action: Option<CustomAction>,
    /// Selection before the edit.
    pub selection_before: Option<SelectionSnapshot>,
    /// Selection after the edit.
    pub selection_after: Option<SelectionSnapshot>,
}

/// A unit of undo history.
#[derive(Debug, Clone, PartialEq)]
pub enum EditRecord {
    /// See [`EventRecord`].
    Event(EventRecord),
    /// See [`DocumentRecord`].
    Document(DocumentRecord),
    /// See [`GroupRecord`].
    Group(GroupRecord),
    /// See [`CustomRecord`].
    Custom(CustomRecord),
}

impl EditRecord {
    /// Kind of this record.
    pub fn kind(&self) -> RecordKind {
        match self {
            EditRecord::Event(_) => RecordKind::Event,
            EditRecord::Document(_) => RecordKind::Document,
            EditRecord::Group(_) => RecordKind::Group,
            EditRecord::Custom(_) => RecordKind::Custom,
        }
    }

    /// Operation type of this record.
    pub fn op_type(&self) -> &str {
        match self {
            EditRecord::Event(record) => &record.op_type,
            EditRecord::Document(record) => &record.op_type,
            EditRecord::Group(record) => &record.op_type,
            EditRecord::Custom(record) => &record.op_type,
        }
    }

    /// Selection before the edit.
    pub fn selection_before(&self) -> Option<&SelectionSnapshot> {
        match self {
            EditRecord::Event(record) => record.selection_before.as_ref(),
            EditRecord::Document(record) => record.selection_before.as_ref(),
            EditRecord::Group(record) => record.selection_before.as_ref(),
            EditRecord::Custom(record) => record.selection_before.as_ref(),
        }
    }

    /// Selection after the edit.
    pub fn selection_after(&self) -> Option<&SelectionSnapshot> {
        match self {
            EditRecord::Event(record) => record.selection_after.as_ref(),
            EditRecord::Document(record) => record.selection_after.as_ref(),
            EditRecord::Group(record) => record.selection_after.as_ref(),
            EditRecord::Custom(record) => record.selection_after.as_ref(),
        }
    }

    pub(crate) fn set_selection_after(&mut self, selection: Option<SelectionSnapshot>) {
        match self {
            EditRecord::Event(record) => record.selection_after = selection,
            EditRecord::Document(record) => record.selection_after = selection,
            EditRecord::Group(record) => record.selection_after = selection,
            EditRecord::Custom(record) => record.selection_after = selection,
        }
    }

    /// Returns `true` if replaying this record would not change the document.
    pub fn is_noop(&self) -> bool {
        match self {
            EditRecord::Event(record) => record.range.is_unchanged(),
            EditRecord::Document(record) => record.html_before == record.html_after,
            EditRecord::Group(record) => record.children.is_empty(),
            EditRecord::Custom(record) => record.action.is_none() && record.range.is_unchanged(),
        }
    }
}
