//! Per-partition access to document field values.
//!
//! A partition is an independent slice of documents (a shard or a segment). Collectors
//! are bound to one partition at a time and read raw values through these traits.
//! Partitions of one index share a [`Schema`]; a field the schema declares but a
//! partition holds no values for reads as empty.
mod memory;
mod schema;

pub use memory::*;
pub use schema::*;

use crate::common::DocId;
use crate::error::{FacetError, FacetResult};
use std::fmt::Debug;
use std::sync::Arc;

/// Numeric doc values of one field. A document may have zero, one or many values.
pub trait NumericValues: Send + Sync + Debug {
    fn values(&self, doc: DocId) -> &[i64];
}

/// Keyword doc values of one field.
pub trait KeywordValues: Send + Sync + Debug {
    fn values(&self, doc: DocId) -> &[String];
}

pub trait PartitionReader: Send + Sync + Debug {
    /// Position of the partition within its request. Used for logging only.
    fn ordinal(&self) -> usize;

    /// One past the highest document id of the partition.
    fn max_doc(&self) -> DocId;

    fn schema(&self) -> &Schema;

    fn numeric_values(&self, field: &str) -> Option<Arc<dyn NumericValues>>;

    fn keyword_values(&self, field: &str) -> Option<Arc<dyn KeywordValues>>;
}

pub type PartitionContext = Arc<dyn PartitionReader>;

/// Value source for a declared field with no values in a partition.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoValues;

impl NumericValues for NoValues {
    fn values(&self, _doc: DocId) -> &[i64] {
        &[]
    }
}

impl KeywordValues for NoValues {
    fn values(&self, _doc: DocId) -> &[String] {
        &[]
    }
}

/// Resolves a numeric field. Fails only when the schema does not declare it as numeric.
pub fn require_numeric(
    partition: &PartitionContext,
    field: &str,
) -> FacetResult<Arc<dyn NumericValues>> {
    if let Some(values) = partition.numeric_values(field) {
        return Ok(values);
    }
    match partition.schema().kind(field) {
        Some(FieldKind::Numeric) => Ok(Arc::new(NoValues)),
        _ => Err(FacetError::MissingField(field.to_string())),
    }
}

/// Resolves a keyword field. Fails only when the schema does not declare it as keyword.
pub fn require_keyword(
    partition: &PartitionContext,
    field: &str,
) -> FacetResult<Arc<dyn KeywordValues>> {
    if let Some(values) = partition.keyword_values(field) {
        return Ok(values);
    }
    match partition.schema().kind(field) {
        Some(FieldKind::Keyword) => Ok(Arc::new(NoValues)),
        _ => Err(FacetError::MissingField(field.to_string())),
    }
}
