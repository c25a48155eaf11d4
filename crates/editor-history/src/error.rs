//! Error types shared by the history engine.
//!
//! Errors are split by how the engine reacts to them:
//!
//! - [`PathResolutionError`] and [`RangeBoundsError`] are recoverable. They abort the current
//!   undo/redo step (or discard the in-progress recording) and leave the stack cursors valid.
//! - [`ProtocolError`] is a caller contract violation (unbalanced begin/end, `enable` without
//!   `disable`). It should never happen in a correct integration.

use thiserror::Error;

use crate::record::RecordKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// A structural path could not be computed or followed.
pub enum PathResolutionError {
    #[error("node is not a descendant of the document root")]
    /// The node is not reachable from the root by parent links.
    Detached,

    #[error("path index {index} out of range at depth {depth} (element has {len} children)")]
    /// A path step addressed a child that does not exist.
    IndexOutOfRange {
        /// Zero-based position of the failing step within the path.
        depth: usize,
        /// The sibling index requested at that step.
        index: usize,
        /// The number of element children actually present.
        len: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// The recording protocol was used incorrectly.
pub enum ProtocolError {
    #[error("end_recording called with nothing recorded")]
    /// `end_recording` without a matching `begin_recording`.
    NothingRecorded,

    #[error("mismatch in record kind, expected {expected:?}, but received {received:?}")]
    /// The innermost ongoing recording has a different kind.
    KindMismatch {
        /// Kind of the innermost ongoing recording.
        expected: RecordKind,
        /// Kind passed by the caller.
        received: RecordKind,
    },

    #[error("mismatch in record op type, expected '{expected}', but received '{received}'")]
    /// The innermost ongoing recording has a different operation type.
    OpTypeMismatch {
        /// Operation type of the innermost ongoing recording.
        expected: String,
        /// Operation type passed by the caller.
        received: String,
    },

    #[error("cannot enable, when not disabled")]
    /// `enable` called while the disable counter is already zero.
    EnableWithoutDisable,

    #[error("overflow in disable")]
    /// The disable counter would overflow.
    DisableOverflow,

    #[error("no ongoing custom recording to attach an action to")]
    /// `set_custom_action` called while the innermost recording is not `Custom`.
    NotCustom,

    #[error("no handler registered for custom action '{0}'")]
    /// A custom record names a handler that was never registered.
    UnknownCustomHandler(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Recorded child indices no longer fit the ancestor's current children.
pub enum RangeBoundsError {
    #[error("first child index ({first}) out of bounds ({len})")]
    /// The first affected index is past the end of the children.
    FirstOutOfBounds {
        /// Recorded first affected index.
        first: usize,
        /// Current element child count.
        len: usize,
    },

    #[error("trailing count ({trailing}) out of bounds (length: {len} first: {first})")]
    /// More unaffected trailing children were recorded than there is room for.
    TrailingOutOfBounds {
        /// Recorded trailing unaffected count.
        trailing: usize,
        /// Current element child count.
        len: usize,
        /// Recorded first affected index.
        first: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("markup error at byte {position}: {message}")]
/// Markup could not be parsed into a fragment.
pub struct MarkupError {
    /// Byte offset in the input where parsing failed.
    pub position: usize,
    /// Human readable reason.
    pub message: String,
}

impl MarkupError {
    /// Create a markup error at `position`.
    pub fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
/// Errors produced while loading a [`crate::HistoryConfig`].
pub enum ConfigError {
    #[error("JSON parse error: {0}")]
    /// The configuration document is not valid JSON for the schema.
    Json(#[from] serde_json::Error),

    #[error("history capacity must be at least 2, got {0}")]
    /// One slot is always reserved as the bottom sentinel.
    CapacityTooSmall(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Top-level error for history operations.
pub enum HistoryError {
    #[error(transparent)]
    /// See [`PathResolutionError`].
    Path(#[from] PathResolutionError),

    #[error(transparent)]
    /// See [`ProtocolError`].
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    /// See [`RangeBoundsError`].
    RangeBounds(#[from] RangeBoundsError),

    #[error(transparent)]
    /// See [`MarkupError`].
    Markup(#[from] MarkupError),

    #[error("custom action '{handler}' failed: {message}")]
    /// A registered custom handler reported a failure.
    Custom {
        /// Handler id of the failing action.
        handler: String,
        /// Reason reported by the handler.
        message: String,
    },
}

impl HistoryError {
    /// Returns `true` for caller contract violations.
    pub fn is_protocol(&self) -> bool {
        matches!(self, HistoryError::Protocol(_))
    }
}
