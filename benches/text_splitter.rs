use aide::adapters::embeddings::{cosine_similarity, HashingEmbeddingProvider};
use aide::domain::models::ChunkingConfig;
use aide::services::RecursiveTextSplitter;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn generate_document(paragraphs: usize) -> String {
    let sentences = [
        "The quarterly review covers revenue, hiring and the product roadmap.",
        "Action items were assigned to each team lead with a due date next Friday.",
        "Latency in the search service dropped after the index was rebuilt.",
        "We agreed to revisit the vendor contract once legal has finished its review.",
    ];
    (0..paragraphs)
        .map(|p| {
            (0..4)
                .map(|s| sentences[(p + s) % sentences.len()])
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn bench_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("recursive_split");

    for paragraphs in [10, 100, 1000] {
        let text = generate_document(paragraphs);
        group.throughput(Throughput::Bytes(text.len() as u64));

        for (size, overlap) in [(200, 20), (1000, 200)] {
            let splitter = RecursiveTextSplitter::new(ChunkingConfig::new(size, overlap)).unwrap();
            group.bench_with_input(
                BenchmarkId::new(format!("size{size}_overlap{overlap}"), paragraphs),
                &text,
                |b, text| b.iter(|| black_box(splitter.split_with_offsets(black_box(text)))),
            );
        }
    }

    group.finish();
}

fn bench_unbroken_text(c: &mut Criterion) {
    // No separators at all: character windows only.
    let text = "x".repeat(100_000);
    let splitter = RecursiveTextSplitter::new(ChunkingConfig::new(500, 50)).unwrap();
    c.bench_function("char_windows_100k", |b| {
        b.iter(|| black_box(splitter.split_with_offsets(black_box(&text))))
    });
}

fn bench_embed_and_score(c: &mut Criterion) {
    let provider = HashingEmbeddingProvider::new(384);
    let splitter = RecursiveTextSplitter::new(ChunkingConfig::new(500, 50)).unwrap();
    let chunks = splitter.split_text(&generate_document(200));
    let vectors: Vec<Vec<f32>> = chunks.iter().map(|c| provider.embed_text(c)).collect();
    let query = provider.embed_text("vendor contract legal review");

    c.bench_function("hashing_embed_chunk", |b| {
        b.iter(|| black_box(provider.embed_text(black_box(&chunks[0]))))
    });
    c.bench_function("cosine_rank_all_chunks", |b| {
        b.iter(|| {
            let mut scores: Vec<f32> = vectors
                .iter()
                .map(|v| cosine_similarity(black_box(&query), black_box(v)))
                .collect();
            scores.sort_by(|a, b| b.total_cmp(a));
            black_box(scores)
        })
    });
}

criterion_group!(benches, bench_split, bench_unbroken_text, bench_embed_and_score);
criterion_main!(benches);
