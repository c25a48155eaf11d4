//! Transaction recorder: the public face of the engine.
//!
//! A caller opens a recording, mutates the document freely, then closes the recording. The
//! engine claims the affected region when the recording opens, captures it again when it
//! closes, and commits the pair as one undo step:
//!
//! ```rust
//! use editor_history::{History, RecordKind, RecordOptions};
//! use editor_history_dom::MarkupDocument;
//!
//! let mut doc = MarkupDocument::parse("<div>ab</div>");
//! let text = doc.find_text("ab").unwrap();
//! doc.set_caret(text, 1);
//!
//! let mut history = History::default();
//! history.begin_recording(&doc, RecordKind::Event, "insertText", RecordOptions::new()).unwrap();
//! doc.insert_text(text, 1, "x");
//! doc.set_caret(text, 2);
//! assert!(history.end_recording(&doc, RecordKind::Event, "insertText").unwrap());
//!
//! history.undo(&mut doc).unwrap();
//! assert_eq!(doc.to_markup(), "<div>ab</div>");
//! ```
//!
//! Recordings nest. An inner recording is appended to the enclosing [`RecordKind::Group`]
//! when it closes; only closing the outermost recording touches the undo stack.
//!
//! While the engine is disabled (see [`History::disable`]) beginning and ending recordings are
//! no-ops. Replay itself runs disabled, so nothing a replay does is ever recorded.

use std::collections::HashMap;

use tracing::{debug, error, trace, warn};

use crate::claim::{ClaimOptions, claim};
use crate::config::HistoryConfig;
use crate::document::Host;
use crate::error::{HistoryError, ProtocolError};
use crate::merge::MergeKind;
use crate::record::{
    CustomAction, CustomRecord, DocumentRecord, EditRecord, EventRecord, GroupRecord, RecordKind,
};
use crate::replay::{CustomHandler, Direction, replay};
use crate::selection::SelectionSnapshot;
use crate::stack::{HistoryStack, UndoRedoState};

/// Callback fired when undo/redo availability or the top operation types change.
pub type StateChangeCallback = Box<dyn FnMut(&UndoRedoState) + Send>;

/// Callback fired after a committed edit or a successful undo/redo.
pub type ContentChangedCallback = Box<dyn FnMut() + Send>;

/// Boundaries and capture flags for [`History::begin_recording`].
#[derive(Debug, Clone, Copy)]
pub struct RecordOptions<N> {
    /// First boundary node; defaults to the selection anchor.
    pub start: Option<N>,
    /// Second boundary node; defaults to `start` (or the selection focus).
    pub end: Option<N>,
    /// Widen `start` to its enclosing block element.
    pub use_parent_block: bool,
    /// Capture the claimed content before the edit.
    pub capture_content: bool,
}

impl<N> Default for RecordOptions<N> {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            use_parent_block: false,
            capture_content: true,
        }
    }
}

impl<N> RecordOptions<N> {
    /// Boundaries from the current selection, content captured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicit boundaries.
    pub fn between(start: N, end: N) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            ..Self::default()
        }
    }

    /// A single explicit boundary.
    pub fn at(node: N) -> Self {
        Self {
            start: Some(node),
            ..Self::default()
        }
    }

    /// Widen the start boundary to its enclosing block.
    pub fn with_parent_block(mut self) -> Self {
        self.use_parent_block = true;
        self
    }

    /// Do not capture content before the edit; undo then empties the claimed span.
    pub fn without_content(mut self) -> Self {
        self.capture_content = false;
        self
    }
}

/// Returned by [`History::begin_recording`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHandle {
    depth: Option<usize>,
}

impl RecordHandle {
    fn disabled() -> Self {
        Self { depth: None }
    }

    /// `false` when the engine was disabled and nothing is being recorded.
    pub fn is_recording(&self) -> bool {
        self.depth.is_some()
    }

    /// Nesting depth of the recording (0 for the outermost).
    pub fn depth(&self) -> Option<usize> {
        self.depth
    }
}

/// The editing-history engine.
///
/// Owns the undo stack, the ongoing recordings and the disable counter. The host document is
/// passed into each call instead of being stored, so the engine never holds node handles
/// across calls.
pub struct History<H: Host> {
    config: HistoryConfig,
    stack: HistoryStack,
    ongoing: Vec<EditRecord>,
    disabled: usize,
    attached: bool,
    stored_selection: Option<SelectionSnapshot>,
    handlers: HashMap<String, CustomHandler<H>>,
    state_callbacks: Vec<StateChangeCallback>,
    content_callbacks: Vec<ContentChangedCallback>,
}

impl<H: Host> Default for History<H> {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl<H: Host> History<H> {
    /// Create an engine with an empty history.
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            stack: HistoryStack::new(config.capacity),
            config,
            ongoing: Vec::new(),
            disabled: 0,
            attached: true,
            stored_selection: None,
            handlers: HashMap::new(),
            state_callbacks: Vec::new(),
            content_callbacks: Vec::new(),
        }
    }

    /// Engine configuration.
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// The undo stack (read-only).
    pub fn stack(&self) -> &HistoryStack {
        &self.stack
    }

    /// Can undo
    pub fn can_undo(&self) -> bool {
        self.stack.can_undo()
    }

    /// Can redo
    pub fn can_redo(&self) -> bool {
        self.stack.can_redo()
    }

    /// Number of undo steps available.
    pub fn undo_depth(&self) -> usize {
        self.stack.undo_depth()
    }

    /// Number of redo steps available.
    pub fn redo_depth(&self) -> usize {
        self.stack.redo_depth()
    }

    /// Current undo/redo state.
    pub fn state(&self) -> UndoRedoState {
        self.stack.state()
    }

    /// Subscribe to undo/redo state changes.
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&UndoRedoState) + Send + 'static,
    {
        self.state_callbacks.push(Box::new(callback));
    }

    /// Subscribe to content changes made through the engine.
    pub fn on_content_changed<F>(&mut self, callback: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.content_callbacks.push(Box::new(callback));
    }

    /// Register replay logic for custom records carrying `id`.
    pub fn register_custom_handler(&mut self, id: impl Into<String>, handler: CustomHandler<H>) {
        self.handlers.insert(id.into(), handler);
    }

    /// Returns `true` while recording is suppressed.
    pub fn is_disabled(&self) -> bool {
        self.disabled > 0
    }

    /// Suppress recording. Every call must be balanced by [`History::enable`].
    pub fn disable(&mut self) -> Result<(), ProtocolError> {
        self.raise_disabled()
    }

    /// Undo one [`History::disable`].
    pub fn enable(&mut self) -> Result<(), ProtocolError> {
        if self.disabled == 0 {
            error!("Enable called while recording is not disabled");
            return Err(ProtocolError::EnableWithoutDisable);
        }
        self.disabled -= 1;
        Ok(())
    }

    /// Run `f` with recording suppressed.
    pub fn suppressed<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> Result<R, ProtocolError> {
        self.raise_disabled()?;
        let result = f(self);
        self.lower_disabled();
        Ok(result)
    }

    fn raise_disabled(&mut self) -> Result<(), ProtocolError> {
        self.disabled = self
            .disabled
            .checked_add(1)
            .ok_or(ProtocolError::DisableOverflow)?;
        Ok(())
    }

    fn lower_disabled(&mut self) {
        self.disabled = self.disabled.saturating_sub(1);
    }

    /// Returns `true` while at least one recording is open.
    pub fn is_recording(&self) -> bool {
        !self.ongoing.is_empty()
    }

    /// Number of open recordings.
    pub fn recording_depth(&self) -> usize {
        self.ongoing.len()
    }

    /// Start reacting to [`History::on_before_input`] / [`History::on_input`].
    pub fn attach(&mut self) {
        self.attached = true;
    }

    /// Stop reacting to input notifications. Explicit recordings are unaffected.
    pub fn detach(&mut self) {
        self.attached = false;
    }

    /// Returns `true` while input notifications are recorded.
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Open a recording.
    ///
    /// - [`RecordKind::Document`] captures the whole document.
    /// - [`RecordKind::Event`] and [`RecordKind::Custom`] claim the region between the
    ///   boundaries (or around the selection). Events whose operation type is listed in
    ///   [`HistoryConfig::parent_block_ops`] are widened to the enclosing block.
    /// - [`RecordKind::Group`] only snapshots the selection; its content comes from the
    ///   recordings nested inside it.
    pub fn begin_recording(
        &mut self,
        host: &H,
        kind: RecordKind,
        op_type: &str,
        options: RecordOptions<H::Node>,
    ) -> Result<RecordHandle, HistoryError> {
        if self.is_disabled() {
            return Ok(RecordHandle::disabled());
        }

        let selection_before = SelectionSnapshot::store(host);
        let record = match kind {
            RecordKind::Group => EditRecord::Group(GroupRecord {
                op_type: op_type.to_string(),
                children: Vec::new(),
                selection_before,
                selection_after: None,
            }),
            RecordKind::Document => EditRecord::Document(DocumentRecord {
                op_type: op_type.to_string(),
                html_before: host.document_markup(),
                html_after: String::new(),
                selection_before,
                selection_after: None,
            }),
            RecordKind::Event | RecordKind::Custom => {
                let use_parent_block = options.use_parent_block
                    || (kind == RecordKind::Event && self.config.uses_parent_block(op_type));
                let range = claim(
                    host,
                    options.start,
                    options.end,
                    &ClaimOptions {
                        use_parent_block,
                        capture_content: options.capture_content,
                        extra_block_tags: &self.config.extra_block_tags,
                    },
                )?;

                if kind == RecordKind::Event {
                    EditRecord::Event(EventRecord::new(op_type, range, selection_before))
                } else {
                    EditRecord::Custom(CustomRecord {
                        op_type: op_type.to_string(),
                        range,
                        action: None,
                        selection_before,
                        selection_after: None,
                    })
                }
            }
        };

        trace!(?kind, op_type, depth = self.ongoing.len(), "Begin recording");
        self.ongoing.push(record);
        Ok(RecordHandle {
            depth: Some(self.ongoing.len() - 1),
        })
    }

    /// Attach replay logic to the innermost open [`RecordKind::Custom`] recording.
    pub fn set_custom_action(&mut self, action: CustomAction) -> Result<(), ProtocolError> {
        match self.ongoing.last_mut() {
            Some(EditRecord::Custom(record)) => {
                record.action = Some(action);
                Ok(())
            }
            _ => Err(ProtocolError::NotCustom),
        }
    }

    /// Close the innermost recording.
    ///
    /// Returns `Ok(true)` when a record was committed (pushed, or appended to the enclosing
    /// group) and `Ok(false)` when the edit turned out to be a no-op or the engine is disabled.
    /// A kind/op type mismatch is a [`ProtocolError`] and leaves the recording open.
    pub fn end_recording(
        &mut self,
        host: &H,
        kind: RecordKind,
        op_type: &str,
    ) -> Result<bool, HistoryError> {
        if self.is_disabled() {
            return Ok(false);
        }

        let Some(top) = self.ongoing.last() else {
            error!(op_type, "end_recording: nothing is recorded");
            return Err(ProtocolError::NothingRecorded.into());
        };
        if top.kind() != kind {
            error!(expected = ?top.kind(), received = ?kind, "end_recording: kind mismatch");
            return Err(ProtocolError::KindMismatch {
                expected: top.kind(),
                received: kind,
            }
            .into());
        }
        if top.op_type() != op_type {
            error!(
                expected = top.op_type(),
                received = op_type,
                "end_recording: op type mismatch"
            );
            return Err(ProtocolError::OpTypeMismatch {
                expected: top.op_type().to_string(),
                received: op_type.to_string(),
            }
            .into());
        }

        let Some(mut record) = self.ongoing.pop() else {
            return Err(ProtocolError::NothingRecorded.into());
        };

        match &mut record {
            EditRecord::Event(EventRecord { range, .. })
            | EditRecord::Custom(CustomRecord { range, .. }) => match range.capture(host) {
                Ok(after) => range.after = Some(after),
                Err(error) => {
                    warn!(%error, op_type, "Discarding recording, claimed range is gone");
                    return Err(error);
                }
            },
            EditRecord::Document(document) => document.html_after = host.document_markup(),
            EditRecord::Group(_) => {}
        }
        record.set_selection_after(SelectionSnapshot::store(host));

        if record.is_noop() {
            debug!(op_type, "Discarding no-op recording");
            if self.ongoing.is_empty() {
                self.merge_top();
                self.notify_state();
            }
            return Ok(false);
        }

        if let Some(parent) = self.ongoing.last_mut() {
            match parent {
                EditRecord::Group(group) => group.children.push(record),
                // Event, custom and document recordings capture their whole region themselves.
                _ => trace!(op_type, "Nested recording absorbed by its parent's capture"),
            }
            return Ok(true);
        }

        self.stack.push(record);
        self.merge_top();
        self.notify_state();
        self.notify_content_changed();
        Ok(true)
    }

    /// Revert the most recent step. Returns `Ok(false)` when there is nothing to undo.
    ///
    /// The stack cursor moves before the record is replayed, so a record that fails to apply
    /// is not offered again.
    pub fn undo(&mut self, host: &mut H) -> Result<bool, HistoryError> {
        self.step(host, Direction::Undo)
    }

    /// Re-apply the most recently undone step. Returns `Ok(false)` when there is nothing to redo.
    pub fn redo(&mut self, host: &mut H) -> Result<bool, HistoryError> {
        self.step(host, Direction::Redo)
    }

    fn step(&mut self, host: &mut H, direction: Direction) -> Result<bool, HistoryError> {
        self.raise_disabled()?;
        let record = match direction {
            Direction::Undo => self.stack.undo(),
            Direction::Redo => self.stack.redo(),
        };
        let result = record.map(|record| {
            trace!(?direction, op_type = record.op_type(), "Replaying record");
            replay(&self.handlers, host, record, direction, true)
        });
        self.lower_disabled();

        self.notify_state();

        match result {
            None => Ok(false),
            Some(Ok(())) => {
                self.notify_content_changed();
                Ok(true)
            }
            Some(Err(error)) => {
                warn!(?direction, %error, "Replay failed, history entry is stale");
                Err(error)
            }
        }
    }

    /// Replay `record` in `direction` without touching the stack.
    pub fn apply(
        &mut self,
        host: &mut H,
        record: &EditRecord,
        direction: Direction,
    ) -> Result<(), HistoryError> {
        self.raise_disabled()?;
        let result = replay(&self.handlers, host, record, direction, true);
        self.lower_disabled();
        result
    }

    /// Drop the whole history.
    pub fn clear(&mut self) {
        self.stack.clear();
        self.notify_state();
    }

    /// Remember the current selection for [`History::restore_selection`].
    pub fn store_selection(&mut self, host: &H) {
        self.stored_selection = SelectionSnapshot::store(host);
    }

    /// Put back (and forget) the selection remembered by [`History::store_selection`].
    ///
    /// Returns `Ok(false)` when nothing was stored.
    pub fn restore_selection(&mut self, host: &mut H) -> Result<bool, HistoryError> {
        let Some(selection) = self.stored_selection.take() else {
            return Ok(false);
        };
        selection.restore(host)?;
        Ok(true)
    }

    /// Input notification hook: a host input burst is about to happen.
    pub fn on_before_input(&mut self, host: &H, op_type: &str) -> Result<RecordHandle, HistoryError> {
        if !self.attached || self.is_disabled() {
            return Ok(RecordHandle::disabled());
        }
        self.begin_recording(host, RecordKind::Event, op_type, RecordOptions::new())
    }

    /// Input notification hook: the input burst announced by [`History::on_before_input`] ended.
    pub fn on_input(&mut self, host: &H, op_type: &str) -> Result<bool, HistoryError> {
        if !self.attached || self.is_disabled() {
            return Ok(false);
        }
        self.end_recording(host, RecordKind::Event, op_type)
    }

    fn merge_top(&mut self) {
        if !self.config.merge_typing {
            return;
        }
        let kind = self
            .stack
            .current_undo()
            .and_then(|record| MergeKind::for_op_type(record.op_type()));
        if let Some(kind) = kind {
            self.stack.merge_consecutive(kind);
        }
    }

    fn notify_state(&mut self) {
        if let Some(state) = self.stack.take_state_change() {
            for callback in &mut self.state_callbacks {
                callback(&state);
            }
        }
    }

    fn notify_content_changed(&mut self) {
        for callback in &mut self.content_callbacks {
            callback();
        }
    }
}

impl<H: Host> std::fmt::Debug for History<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("History")
            .field("config", &self.config)
            .field("stack", &self.stack)
            .field("ongoing", &self.ongoing)
            .field("disabled", &self.disabled)
            .field("attached", &self.attached)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentModel, LiveSelection, SelectionModel};
    use crate::error::MarkupError;

    /// A document that is only a root.
    struct EmptyHost;

    impl DocumentModel for EmptyHost {
        type Node = usize;

        fn root(&self) -> usize {
            0
        }

        fn parent(&self, _node: usize) -> Option<usize> {
            None
        }

        fn is_text(&self, _node: usize) -> bool {
            false
        }

        fn text_len(&self, _node: usize) -> usize {
            0
        }

        fn tag_name(&self, _node: usize) -> Option<&str> {
            Some("body")
        }

        fn child_nodes(&self, _node: usize) -> Vec<usize> {
            Vec::new()
        }

        fn outer_markup(&self, _node: usize) -> String {
            "<body></body>".to_string()
        }

        fn inner_markup(&self, _node: usize) -> String {
            String::new()
        }

        fn set_inner_markup(&mut self, _node: usize, _markup: &str) -> Result<(), MarkupError> {
            Ok(())
        }

        fn remove_child(&mut self, _parent: usize, _child: usize) {}

        fn parse_fragment(
            &mut self,
            _context: usize,
            _markup: &str,
        ) -> Result<Vec<usize>, MarkupError> {
            Ok(Vec::new())
        }

        fn insert_before(&mut self, _parent: usize, _node: usize, _reference: Option<usize>) {}
    }

    impl SelectionModel for EmptyHost {
        fn selection(&self) -> Option<LiveSelection<usize>> {
            None
        }

        fn set_selection(&mut self, _selection: LiveSelection<usize>) {}
    }

    #[test]
    fn test_disable_counter_overflow_is_reported_everywhere() {
        let mut history = History::<EmptyHost>::default();
        history.disabled = usize::MAX;

        assert_eq!(history.disable(), Err(ProtocolError::DisableOverflow));
        assert_eq!(history.suppressed(|_| ()), Err(ProtocolError::DisableOverflow));
        assert_eq!(
            history.undo(&mut EmptyHost),
            Err(HistoryError::Protocol(ProtocolError::DisableOverflow))
        );
        assert_eq!(history.disabled, usize::MAX);
    }

    #[test]
    fn test_suppressed_restores_counter() {
        let mut history = History::<EmptyHost>::default();
        let inside = history.suppressed(|history| history.is_disabled()).unwrap();
        assert!(inside);
        assert!(!history.is_disabled());
    }
}
