use super::{
    decode_facet, downcast_partials, encode_facet, facet_eq, BoxedCollector, BoxedFacet, Facet,
    FacetCollector, FacetContext, FacetType,
};
use crate::common::DocId;
use crate::error::{FacetError, FacetResult};
use crate::partition::PartitionContext;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::any::Any;

pub const COUNT_FACET_TYPE: &str = "count";

/// Number of documents in a bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountFacet {
    pub count: u64,
}

impl Facet for CountFacet {
    fn type_name(&self) -> &'static str {
        COUNT_FACET_TYPE
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> FacetResult {
        encode_facet(self, buf)
    }

    fn to_document(&self) -> Value {
        json!({ "_type": COUNT_FACET_TYPE, "count": self.count })
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

#[derive(Debug, Default)]
pub struct CountCollector {
    count: u64,
}

impl FacetCollector for CountCollector {
    fn bind_partition(&mut self, _partition: &PartitionContext) -> FacetResult {
        Ok(())
    }

    fn observe(&mut self, _doc: DocId) -> FacetResult {
        self.count += 1;
        Ok(())
    }

    fn finalize(&mut self) -> FacetResult<BoxedFacet> {
        Ok(Box::new(CountFacet {
            count: std::mem::take(&mut self.count),
        }))
    }
}

#[derive(Debug)]
pub struct CountFacetType;

impl FacetType for CountFacetType {
    fn name(&self) -> &'static str {
        COUNT_FACET_TYPE
    }

    fn create_collector(
        &self,
        facet_name: &str,
        config: &Value,
        _context: &FacetContext,
    ) -> FacetResult<BoxedCollector> {
        match config {
            Value::Object(fields) if fields.is_empty() => Ok(Box::new(CountCollector::default())),
            Value::Null => Ok(Box::new(CountCollector::default())),
            _ => Err(FacetError::Configuration(format!(
                "[{facet_name}] count facet does not take parameters"
            ))),
        }
    }

    fn reduce(&self, partials: Vec<BoxedFacet>, _context: &FacetContext) -> FacetResult<BoxedFacet> {
        let count = downcast_partials::<CountFacet>(partials, COUNT_FACET_TYPE)?
            .iter()
            .map(|facet| facet.count)
            .sum();
        Ok(Box::new(CountFacet { count }))
    }

    fn read(&self, bytes: &[u8], _context: &FacetContext) -> FacetResult<BoxedFacet> {
        Ok(Box::new(decode_facet::<CountFacet>(bytes)?))
    }
}
