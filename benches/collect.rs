use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use faceted_date_histogram::facets::FacetRegistry;
use faceted_date_histogram::{
    execute, Document, FacetCollector, FacetContext, HistogramCollector, HistogramRequest,
    MemoryPartition, PartitionContext,
};
use serde_json::json;
use std::hint::black_box;
use std::sync::Arc;

const DOCS_PER_PARTITION: i64 = 50_000;
const TAGS: [&str; 8] = ["a", "b", "c", "d", "e", "f", "g", "h"];

fn partition(ordinal: usize, step: i64) -> PartitionContext {
    let docs = (0..DOCS_PER_PARTITION).map(|i| {
        Document::new()
            .numeric("ts", [i * step])
            .keyword("tag", [TAGS[i as usize % TAGS.len()]])
    });
    MemoryPartition::from_documents(ordinal, docs).into_context()
}

fn request(nested: serde_json::Value) -> HistogramRequest {
    let body = json!({ "field": "ts", "interval": "hour", "facet": nested });
    HistogramRequest::parse("bench", &body, &FacetRegistry::with_defaults())
        .unwrap_or_else(|e| panic!("invalid request: {e}"))
}

fn bench_collect(c: &mut Criterion) {
    let context = FacetContext::default();
    let mut group = c.benchmark_group("collect");
    group.throughput(Throughput::Elements(DOCS_PER_PARTITION as u64));

    for (label, nested) in [
        ("count", json!({ "count": {} })),
        ("terms", json!({ "terms": { "field": "tag" } })),
        ("stats", json!({ "stats": { "field": "ts" } })),
    ] {
        let request = request(nested);
        let factory = Arc::new(request.factory(&context).unwrap());
        // one-second spacing: ~14 buckets; one-minute spacing: ~834 buckets
        for step in [1_000, 60_000] {
            let partition = partition(0, step);
            group.bench_with_input(BenchmarkId::new(label, step), &partition, |b, partition| {
                b.iter(|| {
                    let mut collector = HistogramCollector::new(
                        &request,
                        Arc::clone(&factory),
                        context.recycler.clone(),
                    );
                    collector.bind_partition(partition).unwrap();
                    for doc in 0..partition.max_doc() {
                        collector.observe(doc).unwrap();
                    }
                    black_box(collector.finish().unwrap())
                })
            });
        }
    }
    group.finish();
}

fn bench_execute(c: &mut Criterion) {
    let context = FacetContext::default();
    let request = request(json!({ "terms": { "field": "tag" } }));
    let partitions: Vec<_> = (0..4).map(|i| partition(i, 60_000)).collect();

    c.bench_function("execute/4 partitions", |b| {
        b.iter(|| black_box(execute(&request, &partitions, &context).unwrap()))
    });
}

criterion_group!(benches, bench_collect, bench_execute);
criterion_main!(benches);
