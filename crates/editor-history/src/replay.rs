//! Applying records forward (redo) or backward (undo).

use std::collections::HashMap;

use tracing::warn;

use crate::claim::AffectedRange;
use crate::document::Host;
use crate::error::{HistoryError, ProtocolError};
use crate::record::EditRecord;

/// Which way a record is replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Restore the state before the edit.
    Undo,
    /// Restore the state after the edit.
    Redo,
}

impl Direction {
    /// Pick the value matching this direction.
    pub fn pick<T>(self, before: T, after: T) -> T {
        match self {
            Direction::Undo => before,
            Direction::Redo => after,
        }
    }
}

/// Replay logic for [`Custom`](crate::RecordKind::Custom) records.
///
/// Receives the action payload and the direction; an `Err` aborts the undo/redo step.
pub type CustomHandler<H> = fn(&mut H, &serde_json::Value, Direction) -> Result<(), String>;

pub(crate) fn replay<H: Host>(
    handlers: &HashMap<String, CustomHandler<H>>,
    host: &mut H,
    record: &EditRecord,
    direction: Direction,
    with_selection: bool,
) -> Result<(), HistoryError> {
    match record {
        EditRecord::Group(group) => match direction {
            Direction::Undo => {
                for child in group.children.iter().rev() {
                    replay(handlers, host, child, direction, false)?;
                }
            }
            Direction::Redo => {
                for child in &group.children {
                    replay(handlers, host, child, direction, false)?;
                }
            }
        },
        EditRecord::Document(document) => {
            host.replace_document(direction.pick(&document.html_before, &document.html_after))?;
        }
        EditRecord::Event(event) => replace_range(host, &event.range, direction)?,
        EditRecord::Custom(custom) => match &custom.action {
            Some(action) => {
                let handler = handlers.get(&action.handler).ok_or_else(|| {
                    ProtocolError::UnknownCustomHandler(action.handler.clone())
                })?;
                handler(host, &action.payload, direction).map_err(|message| {
                    HistoryError::Custom {
                        handler: action.handler.clone(),
                        message,
                    }
                })?;
            }
            None => replace_range(host, &custom.range, direction)?,
        },
    }

    if with_selection
        && let Some(selection) = direction.pick(record.selection_before(), record.selection_after())
        && let Err(error) = selection.restore(host)
    {
        // Content is already in place; a caret that cannot be placed is not worth failing for.
        warn!(%error, %selection, "Cannot restore selection after replay");
    }

    Ok(())
}

fn replace_range<H: Host>(
    host: &mut H,
    range: &AffectedRange,
    direction: Direction,
) -> Result<(), HistoryError> {
    let ancestor = range.ancestor_path.resolve(host)?;
    let content = direction
        .pick(range.before.as_deref(), range.after.as_deref())
        .unwrap_or_default();
    let children = host.child_nodes(ancestor);

    let Some(affected) = range.span.bounds(children.len())? else {
        host.set_inner_markup(ancestor, content)?;
        return Ok(());
    };

    // Parse first so malformed markup leaves the document untouched.
    let fragment = host.parse_fragment(ancestor, content)?;

    // The node right after the span stays put; an empty span inserts where the run was.
    let reference = children.get(affected.end).copied();

    for child in children[affected].iter().rev() {
        host.remove_child(ancestor, *child);
    }

    for node in fragment {
        host.insert_before(ancestor, node, reference);
    }

    Ok(())
}
