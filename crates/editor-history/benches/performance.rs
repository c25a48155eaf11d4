use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use editor_history::{
    ClaimOptions, History, HistoryConfig, RecordKind, RecordOptions, SelectionSnapshot,
    StructuralPath, claim, op,
};
use editor_history_dom::MarkupDocument;

fn large_document(paragraphs: usize) -> String {
    let mut out = String::with_capacity(paragraphs * 96);
    for i in 0..paragraphs {
        out.push_str(&format!(
            "<p>{i:05} the quick <b>brown</b> fox jumps over the <i>lazy</i> dog</p>"
        ));
    }
    out
}

fn bench_parse(c: &mut Criterion) {
    let markup = large_document(2_000);
    c.bench_function("parse/2k_paragraphs", |b| {
        b.iter(|| {
            let doc = MarkupDocument::parse(black_box(&markup));
            black_box(doc.node_count());
        })
    });
}

fn bench_path_round_trip(c: &mut Criterion) {
    let doc = MarkupDocument::parse(&large_document(2_000));
    let target = doc.find_elements("i")[1_500];
    c.bench_function("path/encode_resolve_deep", |b| {
        b.iter(|| {
            let path = StructuralPath::encode(&doc, black_box(target)).unwrap();
            black_box(path.resolve(&doc).unwrap());
        })
    });
}

fn bench_claim_and_snapshot(c: &mut Criterion) {
    let mut doc = MarkupDocument::parse(&large_document(2_000));
    let text = doc.find_text("01000 the quick").unwrap();
    doc.set_caret(text, 6);
    let options = ClaimOptions {
        capture_content: true,
        ..ClaimOptions::default()
    };

    c.bench_function("claim/collapsed_caret", |b| {
        b.iter(|| black_box(claim(&doc, None, None, &options).unwrap()))
    });
    c.bench_function("selection/store", |b| {
        b.iter(|| black_box(SelectionSnapshot::store(&doc)))
    });
}

fn bench_typing_with_merge(c: &mut Criterion) {
    let markup = large_document(500);
    c.bench_function("typing/100_merged_inserts", |b| {
        b.iter_batched(
            || {
                let doc = MarkupDocument::parse(&markup);
                (doc, History::default())
            },
            |(mut doc, mut history): (MarkupDocument, History<MarkupDocument>)| {
                let text = doc.find_text("00250 the quick").unwrap();
                let mut offset = 6;
                for _ in 0..100 {
                    doc.set_caret(text, offset);
                    history
                        .begin_recording(&doc, RecordKind::Event, op::INSERT_TEXT, RecordOptions::new())
                        .unwrap();
                    doc.insert_text(text, offset, "x");
                    offset += 1;
                    doc.set_caret(text, offset);
                    history
                        .end_recording(&doc, RecordKind::Event, op::INSERT_TEXT)
                        .unwrap();
                }
                black_box(history.undo_depth());
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_undo_redo_cycle(c: &mut Criterion) {
    let markup = large_document(200);
    c.bench_function("undo_redo/50_steps", |b| {
        b.iter_batched(
            || {
                let mut doc = MarkupDocument::parse(&markup);
                let mut history = History::new(HistoryConfig {
                    merge_typing: false,
                    ..HistoryConfig::default()
                });
                for i in 0..50 {
                    let needle = format!("{:05} the quick", i * 4);
                    let text = doc.find_text(&needle).unwrap();
                    doc.set_caret(text, 0);
                    history
                        .begin_recording(&doc, RecordKind::Event, "insertReplacementText", RecordOptions::new())
                        .unwrap();
                    doc.set_text(text, "replaced ");
                    history
                        .end_recording(&doc, RecordKind::Event, "insertReplacementText")
                        .unwrap();
                }
                (doc, history)
            },
            |(mut doc, mut history)| {
                while history.undo(&mut doc).unwrap() {}
                while history.redo(&mut doc).unwrap() {}
                black_box(doc.node_count());
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    bench_parse,
    bench_path_round_trip,
    bench_claim_and_snapshot,
    bench_typing_with_merge,
    bench_undo_redo_cycle
);
criterion_main!(benches);
