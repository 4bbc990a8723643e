//! BM25 scoring hot-path bench over a small in-memory index, mirroring
//! `crates/benchmarks`' per-primitive criterion benches.

use std::path::PathBuf;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use mithril_crawler::Document;
use mithril_index::{IndexBuilder, IndexBuilderConfig, IndexReader};
use mithril_rank::Bm25;

fn build_reader() -> (PathBuf, IndexReader) {
    let dir = std::env::temp_dir().join(format!("mithril-rank-bm25-bench-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let mut builder = IndexBuilder::new(IndexBuilderConfig { output_dir: dir.clone(), ..Default::default() });

    for id in 0..200u32 {
        let doc = Document {
            id,
            url: format!("https://example.test/{id}"),
            title: vec!["fox".to_string()],
            description: vec![],
            words: vec!["the".to_string(), "quick".to_string(), "brown".to_string(), "fox".to_string(), "jumps".to_string()],
            forward_links: vec![],
        };
        builder.add_document(&doc).unwrap();
    }

    let paths = builder.finalize().unwrap();
    let reader = IndexReader::open(&paths.dir).unwrap();
    (dir, reader)
}

fn bench_score_query(c: &mut Criterion) {
    let (dir, reader) = build_reader();
    let bm25 = Bm25::new(reader.stats());
    let terms = ["quick", "fox"];

    c.bench_function("bm25_score_query_200_docs", |b| {
        b.iter(|| {
            let mut total = 0.0;
            for doc_id in 0..200u32 {
                total += bm25.score_query(black_box(&reader), black_box(&terms), black_box(doc_id));
            }
            black_box(total)
        })
    });

    std::fs::remove_dir_all(&dir).ok();
}

criterion_group!(benches, bench_score_query);
criterion_main!(benches);
