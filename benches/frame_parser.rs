use a2ui_term::core::data_store::DataStore;
use a2ui_term::core::frame_parser::FrameParser;
use a2ui_term::core::surface::apply;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use std::hint::black_box;

fn make_stream(n_text: usize) -> Vec<u8> {
    let mut wire = String::new();
    for i in 0..n_text {
        wire.push_str(&format!(
            "event: text\ndata: {{\"text\":\"chunk {i} of the narrative, 안녕 \"}}\n\n"
        ));
    }
    let surface = json!({"data": make_payload(20)});
    wire.push_str(&format!("event: a2ui\ndata: {surface}\n\nevent: done\ndata: {{}}\n\n"));
    wire.into_bytes()
}

fn make_payload(n_cards: usize) -> serde_json::Value {
    let mut components = vec![json!({"id": "root", "component": {"Column": {"children": {
        "explicitList": (0..n_cards).map(|i| format!("card-{i}")).collect::<Vec<_>>()
    }}}})];
    for i in 0..n_cards {
        components.push(json!({"id": format!("card-{i}"), "component": {"Column": {
            "style": "news-card",
            "children": {"explicitList": [format!("title-{i}"), format!("field-{i}")]}
        }}}));
        components.push(json!({"id": format!("title-{i}"), "component": {"Text": {
            "text": {"literalString": format!("Headline {i}")}, "usageHint": "news-title"
        }}}));
        components.push(json!({"id": format!("field-{i}"), "component": {"TextField": {
            "label": {"literalString": "Amount"}, "text": {"path": format!("/form/{i}")}
        }}}));
    }
    json!({"surfaceUpdate": {"components": components}, "beginRendering": {"root": "root"}})
}

fn bench_frame_parser(c: &mut Criterion) {
    for &frames in &[100usize, 1000usize] {
        let wire = make_stream(frames);
        let mut group = c.benchmark_group(format!("frame_parser_frames{frames}"));
        group.throughput(Throughput::Bytes(wire.len() as u64));

        for &chunk in &[7usize, 1024usize] {
            group.bench_with_input(BenchmarkId::new("feed_chunked", chunk), &chunk, |b, &chunk| {
                b.iter(|| {
                    let mut parser = FrameParser::new();
                    let mut count = 0usize;
                    for piece in wire.chunks(chunk) {
                        count += parser.feed(black_box(piece)).len();
                    }
                    black_box(count)
                })
            });
        }
        group.finish();
    }
}

fn bench_surface_apply(c: &mut Criterion) {
    let payload = make_payload(200);
    c.bench_function("surface_apply_200_cards", |b| {
        b.iter(|| {
            let mut store = DataStore::new();
            black_box(apply(black_box(&payload), &mut store))
        })
    });
}

criterion_group!(benches, bench_frame_parser, bench_surface_apply);
criterion_main!(benches);
