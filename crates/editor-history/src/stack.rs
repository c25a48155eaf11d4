//! Bounded circular undo stack.
//!
//! The stack is a fixed ring of `capacity` slots addressed by three cursors:
//!
//! - `bottom`: sentinel slot just below the oldest retained record. It never holds a record,
//!   so at most `capacity - 1` records are retained.
//! - `top`: newest record ever pushed on the current branch.
//! - `current`: last applied record. `current == bottom` means nothing can be undone,
//!   `current == top` means nothing can be redone.
//!
//! Pushing discards everything above `current` (the redo branch) and evicts the oldest record
//! when the ring is full.

use tracing::trace;

use crate::record::EditRecord;

/// Default number of ring slots (one less usable record).
pub const DEFAULT_CAPACITY: usize = 1024;

/// Observable undo/redo availability.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UndoRedoState {
    /// Can undo
    pub can_undo: bool,
    /// Can redo
    pub can_redo: bool,
    /// Operation type of the record `undo` would revert (empty when none).
    pub undo_op_type: String,
    /// Operation type of the record `redo` would re-apply (empty when none).
    pub redo_op_type: String,
}

/// Fixed-capacity ring of edit records.
#[derive(Debug)]
pub struct HistoryStack {
    pub(crate) slots: Vec<Option<EditRecord>>,
    pub(crate) bottom: usize,
    pub(crate) top: usize,
    pub(crate) current: usize,
    observed: UndoRedoState,
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl HistoryStack {
    /// Create an empty stack with `capacity` slots (at least 2).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            bottom: 0,
            top: 0,
            current: 0,
            observed: UndoRedoState::default(),
        }
    }

    /// Number of ring slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.capacity()
    }

    pub(crate) fn prev_index(&self, index: usize) -> usize {
        (index + self.capacity() - 1) % self.capacity()
    }

    fn distance(&self, from: usize, to: usize) -> usize {
        (to + self.capacity() - from) % self.capacity()
    }

    /// Can undo
    pub fn can_undo(&self) -> bool {
        self.current_undo().is_some()
    }

    /// Can redo
    pub fn can_redo(&self) -> bool {
        self.current_redo().is_some()
    }

    /// Number of records `undo` can still revert.
    pub fn undo_depth(&self) -> usize {
        self.distance(self.bottom, self.current)
    }

    /// Number of records `redo` can still re-apply.
    pub fn redo_depth(&self) -> usize {
        self.distance(self.current, self.top)
    }

    /// Returns `true` if the stack holds no records at all.
    pub fn is_empty(&self) -> bool {
        self.bottom == self.top
    }

    /// The record `undo` would return.
    pub fn current_undo(&self) -> Option<&EditRecord> {
        if self.current == self.bottom {
            return None;
        }
        self.slots[self.current].as_ref()
    }

    /// The record `redo` would return.
    pub fn current_redo(&self) -> Option<&EditRecord> {
        if self.current == self.top {
            return None;
        }
        self.slots[self.next_index(self.current)].as_ref()
    }

    /// Push a record, discarding the redo branch and evicting the oldest record on overflow.
    pub fn push(&mut self, record: EditRecord) {
        let next = self.next_index(self.current);

        if self.current != self.top {
            let mut index = self.current;
            while index != self.top {
                index = self.next_index(index);
                self.slots[index] = None;
            }
            trace!(
                discarded = self.distance(self.current, self.top),
                "Discarding redo branch"
            );
        }

        if next == self.bottom {
            self.bottom = self.next_index(self.bottom);
            let evicted = self.slots[self.bottom].take();
            trace!(
                op_type = evicted.as_ref().map(EditRecord::op_type),
                "Evicting oldest history record"
            );
        }

        trace!(op_type = record.op_type(), slot = next, "Pushing history record");
        self.slots[next] = Some(record);
        self.current = next;
        self.top = next;
    }

    /// Move `current` down and return the record to revert, or `None` if nothing can be undone.
    pub fn undo(&mut self) -> Option<&EditRecord> {
        self.current_undo()?;
        let index = self.current;
        self.current = self.prev_index(index);
        self.slots[index].as_ref()
    }

    /// Move `current` up and return the record to re-apply, or `None` if nothing can be redone.
    pub fn redo(&mut self) -> Option<&EditRecord> {
        self.current_redo()?;
        let index = self.next_index(self.current);
        self.current = index;
        self.slots[index].as_ref()
    }

    /// Drop every record.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.bottom = 0;
        self.top = 0;
        self.current = 0;
    }

    /// Current observable state.
    pub fn state(&self) -> UndoRedoState {
        let undo = self.current_undo();
        let redo = self.current_redo();
        UndoRedoState {
            can_undo: undo.is_some(),
            can_redo: redo.is_some(),
            undo_op_type: undo.map(|r| r.op_type().to_string()).unwrap_or_default(),
            redo_op_type: redo.map(|r| r.op_type().to_string()).unwrap_or_default(),
        }
    }

    /// The current state if it differs from the last one returned here.
    pub fn take_state_change(&mut self) -> Option<UndoRedoState> {
        let state = self.state();
        if state == self.observed {
            return None;
        }
        self.observed = state.clone();
        Some(state)
    }
}
