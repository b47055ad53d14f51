use super::{
    decode_facet, downcast_partials, encode_facet, facet_eq, unbound, BoxedCollector, BoxedFacet,
    Facet, FacetCollector, FacetContext, FacetType,
};
use crate::aggregators::KahanSum;
use crate::common::DocId;
use crate::error::{FacetError, FacetResult};
use crate::partition::{require_numeric, NumericValues, PartitionContext};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::any::Any;
use std::sync::Arc;

pub const STATS_FACET_TYPE: &str = "stats";

/// Summary statistics of a numeric field within a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatsFacet {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    total: KahanSum,
    sum_of_squares: KahanSum,
}

impl Default for StatsFacet {
    fn default() -> Self {
        Self {
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            total: KahanSum::default(),
            sum_of_squares: KahanSum::default(),
        }
    }
}

impl StatsFacet {
    pub fn add(&mut self, value: f64) {
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.total += value;
        self.sum_of_squares += value * value;
    }

    pub fn merge(&mut self, other: &StatsFacet) {
        self.count += other.count;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.total += &other.total;
        self.sum_of_squares += &other.sum_of_squares;
    }

    pub fn total(&self) -> f64 {
        self.total.value()
    }

    pub fn sum_of_squares(&self) -> f64 {
        self.sum_of_squares.value()
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.total() / self.count as f64)
    }

    pub fn variance(&self) -> Option<f64> {
        let mean = self.mean()?;
        Some((self.sum_of_squares() / self.count as f64 - mean * mean).max(0.0))
    }

    pub fn std_deviation(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }
}

impl Facet for StatsFacet {
    fn type_name(&self) -> &'static str {
        STATS_FACET_TYPE
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> FacetResult {
        encode_facet(self, buf)
    }

    fn to_document(&self) -> Value {
        let bound = |v: f64| (self.count > 0).then_some(v);
        json!({
            "_type": STATS_FACET_TYPE,
            "count": self.count,
            "total": self.total(),
            "min": bound(self.min),
            "max": bound(self.max),
            "mean": self.mean(),
            "sum_of_squares": self.sum_of_squares(),
            "variance": self.variance(),
            "std_deviation": self.std_deviation(),
        })
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

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StatsConfig {
    field: String,
}

#[derive(Debug)]
pub struct StatsCollector {
    facet_name: String,
    field: String,
    values: Option<Arc<dyn NumericValues>>,
    stats: StatsFacet,
}

impl FacetCollector for StatsCollector {
    fn bind_partition(&mut self, partition: &PartitionContext) -> FacetResult {
        self.values = Some(require_numeric(partition, &self.field)?);
        Ok(())
    }

    fn observe(&mut self, doc: DocId) -> FacetResult {
        let values = self
            .values
            .as_ref()
            .ok_or_else(|| unbound(&self.facet_name))?;
        for &value in values.values(doc) {
            self.stats.add(value as f64);
        }
        Ok(())
    }

    fn finalize(&mut self) -> FacetResult<BoxedFacet> {
        Ok(Box::new(std::mem::take(&mut self.stats)))
    }
}

#[derive(Debug)]
pub struct StatsFacetType;

impl FacetType for StatsFacetType {
    fn name(&self) -> &'static str {
        STATS_FACET_TYPE
    }

    fn create_collector(
        &self,
        facet_name: &str,
        config: &Value,
        _context: &FacetContext,
    ) -> FacetResult<BoxedCollector> {
        let config = StatsConfig::deserialize(config).map_err(|e| {
            FacetError::Configuration(format!("[{facet_name}] stats facet: {e}"))
        })?;
        Ok(Box::new(StatsCollector {
            facet_name: facet_name.to_string(),
            field: config.field,
            values: None,
            stats: StatsFacet::default(),
        }))
    }

    fn reduce(&self, partials: Vec<BoxedFacet>, _context: &FacetContext) -> FacetResult<BoxedFacet> {
        let partials = downcast_partials::<StatsFacet>(partials, STATS_FACET_TYPE)?;
        let mut merged = StatsFacet::default();
        for partial in &partials {
            merged.merge(partial);
        }
        Ok(Box::new(merged))
    }

    fn read(&self, bytes: &[u8], _context: &FacetContext) -> FacetResult<BoxedFacet> {
        Ok(Box::new(decode_facet::<StatsFacet>(bytes)?))
    }
}
