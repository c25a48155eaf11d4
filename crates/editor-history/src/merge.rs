//! Typing merge.
//!
//! Without merging every keystroke would become its own undo step. After each push the top of
//! the stack is folded into the record below it for as long as the two form one contiguous
//! typing run: same mergeable operation, same claimed children, both started from a collapsed
//! caret, and the newer one starting exactly where the older one left the caret.
//!
//! Any divergence (caret moved, selection widened, different operation) stops the chain.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::record::{EditRecord, EventRecord, op};
use crate::stack::HistoryStack;

/// Merge bucket of an operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MergeKind {
    /// Plain text insertion.
    Text,
    /// Word delimiter insertion (space, tab).
    WordDelimiter,
}

impl MergeKind {
    /// Bucket for `op_type`, `None` when the operation never merges.
    pub fn for_op_type(op_type: &str) -> Option<Self> {
        match op_type {
            op::INSERT_TEXT => Some(MergeKind::Text),
            op::INSERT_WORD_DELIMITER => Some(MergeKind::WordDelimiter),
            _ => None,
        }
    }
}

/// Returns `true` if `curr` directly continues the typing run recorded in `prev`.
pub fn is_adjacent(curr: &EventRecord, prev: &EventRecord, kind: MergeKind) -> bool {
    if MergeKind::for_op_type(&curr.op_type) != Some(kind)
        || MergeKind::for_op_type(&prev.op_type) != Some(kind)
    {
        return false;
    }

    // A chain folded under one bucket is never extended under another.
    if curr.merged.is_some_and(|merged| merged != kind)
        || prev.merged.is_some_and(|merged| merged != kind)
    {
        return false;
    }

    let (Some(curr_before), Some(prev_before), Some(prev_after)) = (
        curr.selection_before.as_ref(),
        prev.selection_before.as_ref(),
        prev.selection_after.as_ref(),
    ) else {
        return false;
    };

    curr_before.focus.is_none()
        && prev_before.focus.is_none()
        && curr.range.span == prev.range.span
        && curr_before.anchor.offset == prev_after.anchor.offset
        && curr_before.anchor.space == prev_after.anchor.space
        && curr.range.ancestor_path == prev.range.ancestor_path
        && curr_before.anchor.path == prev_after.anchor.path
}

impl HistoryStack {
    /// Fold the top record into its predecessors while they are adjacent under `kind`.
    ///
    /// Only runs when the top is the current record (nothing undone). Returns the number of
    /// records folded away.
    pub fn merge_consecutive(&mut self, kind: MergeKind) -> usize {
        let mut folded = 0;

        while self.current == self.top && self.current != self.bottom {
            let prev_index = self.prev_index(self.current);
            if prev_index == self.bottom {
                break;
            }

            let adjacent = match (&self.slots[self.current], &self.slots[prev_index]) {
                (Some(EditRecord::Event(curr)), Some(EditRecord::Event(prev))) => {
                    is_adjacent(curr, prev, kind)
                }
                _ => false,
            };
            if !adjacent {
                break;
            }

            let Some(EditRecord::Event(curr)) = self.slots[self.current].take() else {
                break;
            };
            if let Some(EditRecord::Event(prev)) = self.slots[prev_index].as_mut() {
                prev.range.after = curr.range.after;
                prev.selection_after = curr.selection_after;
                prev.merged = Some(kind);
            }

            self.current = prev_index;
            self.top = prev_index;
            folded += 1;
        }

        if folded > 0 {
            trace!(?kind, folded, "Merged consecutive history records");
        }
        folded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::{AffectedRange, RangeSpan};
    use crate::path::StructuralPath;
    use crate::selection::{SelectionPoint, SelectionSnapshot};

    fn typing(op_type: &str, first: usize, from: usize, to: usize) -> EventRecord {
        let mut record = EventRecord::new(
            op_type,
            AffectedRange {
                ancestor_path: StructuralPath::root(),
                span: RangeSpan::Children { first, trailing: 1 },
                before: Some(format!("<p>{from}</p>")),
                after: Some(format!("<p>{to}</p>")),
            },
            Some(SelectionSnapshot::collapsed(SelectionPoint::new(
                vec![first],
                from,
            ))),
        );
        record.selection_after = Some(SelectionSnapshot::collapsed(SelectionPoint::new(
            vec![first],
            to,
        )));
        record
    }

    #[test]
    fn test_merge_kind_for_op_type() {
        assert_eq!(MergeKind::for_op_type("insertText"), Some(MergeKind::Text));
        assert_eq!(
            MergeKind::for_op_type("insertText::WordDelim"),
            Some(MergeKind::WordDelimiter)
        );
        assert_eq!(MergeKind::for_op_type("insertParagraph"), None);
    }

    #[test]
    fn test_adjacent_typing() {
        let prev = typing(op::INSERT_TEXT, 0, 3, 4);
        let curr = typing(op::INSERT_TEXT, 0, 4, 5);
        assert!(is_adjacent(&curr, &prev, MergeKind::Text));
    }

    #[test]
    fn test_caret_jump_is_not_adjacent() {
        let prev = typing(op::INSERT_TEXT, 0, 3, 4);
        let curr = typing(op::INSERT_TEXT, 0, 10, 11);
        assert!(!is_adjacent(&curr, &prev, MergeKind::Text));
    }

    #[test]
    fn test_different_first_index_is_not_adjacent() {
        let prev = typing(op::INSERT_TEXT, 0, 3, 4);
        let mut curr = typing(op::INSERT_TEXT, 0, 4, 5);
        curr.range.span = RangeSpan::Children {
            first: 1,
            trailing: 1,
        };
        assert!(!is_adjacent(&curr, &prev, MergeKind::Text));
    }

    #[test]
    fn test_mixed_kinds_are_not_adjacent() {
        let prev = typing(op::INSERT_TEXT, 0, 3, 4);
        let curr = typing(op::INSERT_WORD_DELIMITER, 0, 4, 5);
        assert!(!is_adjacent(&curr, &prev, MergeKind::Text));
        assert!(!is_adjacent(&curr, &prev, MergeKind::WordDelimiter));
    }

    #[test]
    fn test_selection_with_focus_is_not_adjacent() {
        let prev = typing(op::INSERT_TEXT, 0, 3, 4);
        let mut curr = typing(op::INSERT_TEXT, 0, 4, 5);
        if let Some(before) = curr.selection_before.as_mut() {
            before.focus = Some(SelectionPoint::new(vec![0], 6));
        }
        assert!(!is_adjacent(&curr, &prev, MergeKind::Text));
    }

    #[test]
    fn test_merge_consecutive_folds_run() {
        let mut stack = HistoryStack::new(16);
        stack.push(EditRecord::Event(typing(op::INSERT_TEXT, 0, 3, 4)));
        stack.push(EditRecord::Event(typing(op::INSERT_TEXT, 0, 4, 5)));
        assert_eq!(stack.merge_consecutive(MergeKind::Text), 1);
        stack.push(EditRecord::Event(typing(op::INSERT_TEXT, 0, 5, 6)));
        assert_eq!(stack.merge_consecutive(MergeKind::Text), 1);

        assert_eq!(stack.undo_depth(), 1);
        let Some(EditRecord::Event(merged)) = stack.current_undo() else {
            panic!("expected an event record");
        };
        assert_eq!(merged.range.before.as_deref(), Some("<p>3</p>"));
        assert_eq!(merged.range.after.as_deref(), Some("<p>6</p>"));
        assert_eq!(
            merged.selection_after.as_ref().map(|s| s.anchor.offset),
            Some(6)
        );
        assert_eq!(merged.merged_as(), Some(MergeKind::Text));
    }

    #[test]
    fn test_merge_skipped_after_undo() {
        let mut stack = HistoryStack::new(16);
        stack.push(EditRecord::Event(typing(op::INSERT_TEXT, 0, 3, 4)));
        stack.push(EditRecord::Event(typing(op::INSERT_TEXT, 0, 4, 5)));
        stack.undo();
        assert_eq!(stack.merge_consecutive(MergeKind::Text), 0);
        assert_eq!(stack.redo_depth(), 1);
    }

    #[test]
    fn test_merge_never_touches_bottom_sentinel() {
        let mut stack = HistoryStack::new(16);
        stack.push(EditRecord::Event(typing(op::INSERT_TEXT, 0, 3, 4)));
        assert_eq!(stack.merge_consecutive(MergeKind::Text), 0);
        assert_eq!(stack.undo_depth(), 1);
    }
}
