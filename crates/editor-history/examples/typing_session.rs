//! Typing session example
//!
//! Records a few edits against an in-memory document, then walks the history back and forth
//! while a subscriber prints every undo/redo state change.

use std::sync::{Arc, Mutex};

use editor_history::{History, RecordKind, RecordOptions, op};
use editor_history_dom::MarkupDocument;

fn main() {
    println!("=== Editing history example ===\n");

    let mut doc = MarkupDocument::parse("<p>Hello</p><p>Second paragraph</p>");
    let mut history = History::default();

    let change_count = Arc::new(Mutex::new(0));
    let change_count_clone = change_count.clone();
    history.subscribe(move |state| {
        let mut count = change_count_clone.lock().unwrap();
        *count += 1;
        println!(
            "  state change #{}: can_undo={} ({:?}) can_redo={} ({:?})",
            count, state.can_undo, state.undo_op_type, state.can_redo, state.redo_op_type
        );
    });

    println!("1. Typing \", world\" one character at a time:");
    let text = doc.find_text("Hello").unwrap();
    let mut offset = 5;
    for ch in ", world".chars() {
        let op_type = if ch == ' ' {
            op::INSERT_WORD_DELIMITER
        } else {
            op::INSERT_TEXT
        };
        doc.set_caret(text, offset);
        history
            .begin_recording(&doc, RecordKind::Event, op_type, RecordOptions::new())
            .unwrap();
        doc.insert_text(text, offset, &ch.to_string());
        offset += 1;
        doc.set_caret(text, offset);
        history
            .end_recording(&doc, RecordKind::Event, op_type)
            .unwrap();
    }
    println!("  document: {}", doc.to_markup());
    println!("  undo steps after merging: {}", history.undo_depth());

    println!("\n2. Renaming the second paragraph to a heading:");
    let second = doc.find_elements("p")[1];
    history
        .begin_recording(&doc, RecordKind::Event, op::SET_BLOCK_FORMAT, RecordOptions::at(second))
        .unwrap();
    doc.rename_element(second, "h2");
    history
        .end_recording(&doc, RecordKind::Event, op::SET_BLOCK_FORMAT)
        .unwrap();
    println!("  document: {}", doc.to_markup());

    println!("\n3. Undo everything:");
    while history.undo(&mut doc).unwrap() {
        println!("  document: {}", doc.to_markup());
    }

    println!("\n4. Redo everything:");
    while history.redo(&mut doc).unwrap() {
        println!("  document: {}", doc.to_markup());
    }

    println!("\nTotal state changes: {}", change_count.lock().unwrap());
}
