use super::{
    decode_facet, downcast_partials, encode_facet, facet_eq, unbound, BoxedCollector, BoxedFacet,
    Facet, FacetCollector, FacetContext, FacetType,
};
use crate::aggregators::{AggregationHandler, AggregationType, Aggregator};
use crate::common::DocId;
use crate::error::{FacetError, FacetResult};
use crate::partition::{require_numeric, NumericValues, PartitionContext};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::any::Any;
use std::sync::Arc;

pub const METRIC_FACET_TYPE: &str = "metric";

/// A single mergeable metric over a numeric field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricFacet {
    aggregator: Aggregator,
}

impl MetricFacet {
    pub fn new(aggregation: AggregationType) -> Self {
        Self {
            aggregator: Aggregator::new(aggregation),
        }
    }

    pub fn aggregation(&self) -> AggregationType {
        self.aggregator.aggregation_type()
    }

    pub fn value(&self) -> f64 {
        self.aggregator.value()
    }
}

impl Facet for MetricFacet {
    fn type_name(&self) -> &'static str {
        METRIC_FACET_TYPE
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> FacetResult {
        encode_facet(self, buf)
    }

    fn to_document(&self) -> Value {
        // NaN has no JSON form and renders as null
        json!({
            "_type": METRIC_FACET_TYPE,
            "aggregation": self.aggregation().name(),
            "value": self.value(),
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
struct MetricConfig {
    field: String,
    aggregation: String,
}

#[derive(Debug)]
pub struct MetricCollector {
    facet_name: String,
    field: String,
    values: Option<Arc<dyn NumericValues>>,
    metric: MetricFacet,
}

impl FacetCollector for MetricCollector {
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
            self.metric.aggregator.update(value as f64);
        }
        Ok(())
    }

    fn finalize(&mut self) -> FacetResult<BoxedFacet> {
        let fresh = MetricFacet::new(self.metric.aggregation());
        Ok(Box::new(std::mem::replace(&mut self.metric, fresh)))
    }
}

#[derive(Debug)]
pub struct MetricFacetType;

impl FacetType for MetricFacetType {
    fn name(&self) -> &'static str {
        METRIC_FACET_TYPE
    }

    fn create_collector(
        &self,
        facet_name: &str,
        config: &Value,
        _context: &FacetContext,
    ) -> FacetResult<BoxedCollector> {
        let config = MetricConfig::deserialize(config).map_err(|e| {
            FacetError::Configuration(format!("[{facet_name}] metric facet: {e}"))
        })?;
        let aggregation = AggregationType::try_from(config.aggregation.as_str())?;
        Ok(Box::new(MetricCollector {
            facet_name: facet_name.to_string(),
            field: config.field,
            values: None,
            metric: MetricFacet::new(aggregation),
        }))
    }

    fn reduce(&self, partials: Vec<BoxedFacet>, _context: &FacetContext) -> FacetResult<BoxedFacet> {
        let mut partials = downcast_partials::<MetricFacet>(partials, METRIC_FACET_TYPE)?.into_iter();
        let Some(mut merged) = partials.next() else {
            return Err(FacetError::IllegalState(
                "metric reduce called without partials".to_string(),
            ));
        };
        for partial in partials {
            merged.aggregator.merge(&partial.aggregator)?;
        }
        Ok(Box::new(merged))
    }

    fn read(&self, bytes: &[u8], _context: &FacetContext) -> FacetResult<BoxedFacet> {
        Ok(Box::new(decode_facet::<MetricFacet>(bytes)?))
    }
}
