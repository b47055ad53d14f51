//! The faceted date histogram: documents are grouped into rounded time buckets and every
//! bucket runs its own instance of a nested facet.
mod bucket_table;
mod collector;
mod reduce;
mod request;
mod serialization;

#[cfg(test)]
mod histogram_tests;

pub use bucket_table::*;
pub use collector::*;
pub use reduce::*;
pub use request::*;
pub use serialization::*;

use crate::common::BucketKey;
use crate::error::FacetResult;
use crate::facets::{
    downcast_partials, facet_eq, BoxedCollector, BoxedFacet, Facet, FacetContext, FacetType,
    NESTED_FACET_KEY,
};
use serde_json::{json, Map, Value};
use std::any::Any;
use std::sync::Arc;

pub const HISTOGRAM_FACET_TYPE: &str = "faceted_date_histogram";

/// A bucket of a finished histogram.
#[derive(Debug)]
pub struct FinalBucket {
    pub key: BucketKey,
    pub facet: BoxedFacet,
}

impl PartialEq for FinalBucket {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && *self.facet == *other.facet
    }
}

impl FinalBucket {
    pub fn new(key: BucketKey, facet: BoxedFacet) -> Self {
        Self { key, facet }
    }
}

#[derive(Debug)]
enum HistogramBuckets {
    /// Straight out of a collector: unordered, still in its pooled table.
    Table(BucketTable),
    /// Strictly increasing keys.
    Ordered(Vec<FinalBucket>),
}

/// Result of a faceted date histogram, either one partition's partial or a reduced whole.
#[derive(Debug)]
pub struct FacetedDateHistogram {
    name: String,
    buckets: HistogramBuckets,
}

impl FacetedDateHistogram {
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            buckets: HistogramBuckets::Ordered(Vec::new()),
        }
    }

    /// Builds a histogram from buckets in any order. Keys must be unique.
    pub fn from_buckets(name: &str, mut buckets: Vec<FinalBucket>) -> Self {
        buckets.sort_by_key(|b| b.key);
        Self {
            name: name.to_string(),
            buckets: HistogramBuckets::Ordered(buckets),
        }
    }

    pub(crate) fn from_table(name: &str, table: BucketTable) -> Self {
        Self {
            name: name.to_string(),
            buckets: HistogramBuckets::Table(table),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        match &self.buckets {
            HistogramBuckets::Table(table) => table.len(),
            HistogramBuckets::Ordered(buckets) => buckets.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Finalized buckets in ascending key order.
    pub fn entries(&self) -> Vec<(BucketKey, &dyn Facet)> {
        match &self.buckets {
            HistogramBuckets::Table(table) => {
                let mut entries: Vec<_> = table
                    .values()
                    .filter_map(|bucket| bucket.result().map(|facet| (bucket.key(), facet)))
                    .collect();
                entries.sort_by_key(|(key, _)| *key);
                entries
            }
            HistogramBuckets::Ordered(buckets) => buckets
                .iter()
                .map(|bucket| (bucket.key, bucket.facet.as_ref()))
                .collect(),
        }
    }

    pub fn keys(&self) -> Vec<BucketKey> {
        self.entries().into_iter().map(|(key, _)| key).collect()
    }

    pub fn get(&self, key: BucketKey) -> Option<&dyn Facet> {
        match &self.buckets {
            HistogramBuckets::Table(table) => table.get(&key).and_then(|bucket| bucket.result()),
            HistogramBuckets::Ordered(buckets) => buckets
                .binary_search_by_key(&key, |bucket| bucket.key)
                .ok()
                .map(|i| buckets[i].facet.as_ref()),
        }
    }

    /// Takes the buckets out, in no particular order. A pooled table is released here.
    pub fn into_buckets(self) -> FacetResult<Vec<FinalBucket>> {
        match self.buckets {
            HistogramBuckets::Table(mut table) => table
                .drain()
                .map(|(key, bucket)| bucket.into_result().map(|facet| FinalBucket::new(key, facet)))
                .collect(),
            HistogramBuckets::Ordered(buckets) => Ok(buckets),
        }
    }

    /// The external form, keyed by facet name.
    pub fn to_named_document(&self) -> Value {
        let mut document = Map::new();
        document.insert(self.name.clone(), self.to_document());
        Value::Object(document)
    }
}

impl PartialEq for FacetedDateHistogram {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.entries() == other.entries()
    }
}

impl Facet for FacetedDateHistogram {
    fn type_name(&self) -> &'static str {
        HISTOGRAM_FACET_TYPE
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> FacetResult {
        write_histogram(self, buf)
    }

    fn to_document(&self) -> Value {
        let entries: Vec<Value> = self
            .entries()
            .into_iter()
            .map(|(key, facet)| {
                let mut entry = Map::new();
                entry.insert("time".to_string(), json!(key));
                entry.insert(NESTED_FACET_KEY.to_string(), facet.to_document());
                Value::Object(entry)
            })
            .collect();
        json!({ "_type": HISTOGRAM_FACET_TYPE, "entries": entries })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }

    fn facet_eq(&self, other: &dyn Facet) -> bool {
        facet_eq(self, other)
    }
}

/// Registers the histogram itself as a nested facet type, so histograms nest.
#[derive(Debug)]
pub struct HistogramFacetType;

impl FacetType for HistogramFacetType {
    fn name(&self) -> &'static str {
        HISTOGRAM_FACET_TYPE
    }

    fn create_collector(
        &self,
        facet_name: &str,
        config: &Value,
        context: &FacetContext,
    ) -> FacetResult<BoxedCollector> {
        let request = HistogramRequest::parse(facet_name, config, &context.registry)?;
        let factory = Arc::new(request.factory(context)?);
        Ok(Box::new(HistogramCollector::new(
            &request,
            factory,
            context.recycler.clone(),
        )))
    }

    fn reduce(&self, partials: Vec<BoxedFacet>, context: &FacetContext) -> FacetResult<BoxedFacet> {
        let partials = downcast_partials::<FacetedDateHistogram>(partials, HISTOGRAM_FACET_TYPE)?;
        let name = partials
            .first()
            .map(|p| p.name.clone())
            .unwrap_or_default();
        Ok(Box::new(reduce(&name, partials, context)?))
    }

    fn read(&self, bytes: &[u8], context: &FacetContext) -> FacetResult<BoxedFacet> {
        Ok(Box::new(read_histogram(bytes, context)?))
    }
}
