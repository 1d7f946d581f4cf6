use criterion::{Criterion, criterion_group, criterion_main};
use docqa::embeddings::{
    DEFAULT_SLICE_SIZE, Embedder, HashedTokenEmbedder, MeanCodepointEmbedder, slice_pages,
};
use docqa::ranking::{ExcerptBound, ExcerptLimits, Ranker};
use docqa::store::ChunkStore;
use std::hint::black_box;
use std::sync::Arc;

fn corpus(paragraphs: usize) -> String {
    (0..paragraphs)
        .map(|i| {
            format!(
                "Section {i}. The tenant shall pay rent on the first business day of each month. \
                 Late payments accrue a fee of {i} percent after a grace period of five days.\n\n"
            )
        })
        .collect()
}

fn populated_ranker(embedder: Arc<dyn Embedder>, text: &str) -> Ranker {
    let store = Arc::new(ChunkStore::new(embedder));
    for doc in 0..8 {
        store
            .ingest_raw_text("ns:bench", &format!("doc_{doc}"), text, DEFAULT_SLICE_SIZE)
            .expect("bench corpus ingests");
    }
    Ranker::new(store, ExcerptLimits::default())
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let text = corpus(400);
    let scopes = vec!["ns:bench".to_string()];

    c.bench_function("slice_pages", |b| {
        b.iter(|| slice_pages(black_box(&text), black_box(DEFAULT_SLICE_SIZE)))
    });

    let mean = populated_ranker(Arc::new(MeanCodepointEmbedder), &text);
    c.bench_function("rank_mean_codepoint", |b| {
        b.iter(|| {
            mean.rank(
                black_box("when is rent due"),
                &scopes,
                5,
                None,
                ExcerptBound::Preview,
            )
        })
    });

    let hashed = populated_ranker(Arc::new(HashedTokenEmbedder::new(256)), &text);
    c.bench_function("rank_hashed_token", |b| {
        b.iter(|| {
            hashed.rank(
                black_box("when is rent due"),
                &scopes,
                5,
                None,
                ExcerptBound::Preview,
            )
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
