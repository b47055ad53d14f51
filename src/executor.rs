//! Drives a histogram request over a set of partitions.
use crate::error::FacetResult;
use crate::facets::{FacetCollector, FacetCollectorFactory, FacetContext};
use crate::histogram::{reduce, FacetedDateHistogram, HistogramCollector, HistogramRequest};
use crate::partition::PartitionContext;
use rayon::iter::IntoParallelRefIterator;
use rayon::iter::ParallelIterator;
use serde_json::Value;
use std::sync::Arc;

/// Collects every partition on its own collector, in parallel, then reduces the partials
/// in partition order.
pub fn execute(
    request: &HistogramRequest,
    partitions: &[PartitionContext],
    context: &FacetContext,
) -> FacetResult<FacetedDateHistogram> {
    let factory = Arc::new(request.factory(context)?);
    let partials = partitions
        .par_iter()
        .map(|partition| collect_partition(request, &factory, partition, context))
        .collect::<FacetResult<Vec<_>>>()?;
    reduce(&request.name, partials, context)
}

/// Parses a request body and executes it.
pub fn execute_json(
    name: &str,
    body: &Value,
    partitions: &[PartitionContext],
    context: &FacetContext,
) -> FacetResult<FacetedDateHistogram> {
    let request = HistogramRequest::parse(name, body, &context.registry)?;
    execute(&request, partitions, context)
}

/// Visits the partitions in turn with a single collector, rebinding it between them.
/// The result needs no reduce.
pub fn execute_segments(
    request: &HistogramRequest,
    segments: &[PartitionContext],
    context: &FacetContext,
) -> FacetResult<FacetedDateHistogram> {
    let factory = Arc::new(request.factory(context)?);
    let mut collector = HistogramCollector::new(request, factory, context.recycler.clone());
    for segment in segments {
        collect_into(&mut collector, segment)?;
    }
    collector.finish()
}

fn collect_partition(
    request: &HistogramRequest,
    factory: &Arc<FacetCollectorFactory>,
    partition: &PartitionContext,
    context: &FacetContext,
) -> FacetResult<FacetedDateHistogram> {
    let mut collector =
        HistogramCollector::new(request, Arc::clone(factory), context.recycler.clone());
    collect_into(&mut collector, partition)?;
    collector.finish()
}

fn collect_into(collector: &mut HistogramCollector, partition: &PartitionContext) -> FacetResult {
    collector.bind_partition(partition)?;
    for doc in 0..partition.max_doc() {
        collector.observe(doc)?;
    }
    Ok(())
}
