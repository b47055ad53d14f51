use super::{
    decode_facet, downcast_partials, encode_facet, facet_eq, unbound, BoxedCollector, BoxedFacet,
    Facet, FacetCollector, FacetContext, FacetType,
};
use crate::common::DocId;
use crate::error::{FacetError, FacetResult};
use crate::partition::{require_keyword, KeywordValues, PartitionContext};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::any::Any;
use std::sync::Arc;

pub const TERMS_FACET_TYPE: &str = "terms";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermEntry {
    pub term: String,
    pub count: u64,
}

/// Most frequent terms of a keyword field within a bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermsFacet {
    pub size: usize,
    /// Ordered by count descending, ties in first-seen order.
    pub entries: Vec<TermEntry>,
    /// Documents without a value.
    pub missing: u64,
    /// Values seen, including the ones not in `entries`.
    pub total: u64,
}

impl TermsFacet {
    pub fn other(&self) -> u64 {
        let shown: u64 = self.entries.iter().map(|e| e.count).sum();
        self.total.saturating_sub(shown)
    }

    pub fn count_of(&self, term: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|e| e.term == term)
            .map(|e| e.count)
    }
}

impl Facet for TermsFacet {
    fn type_name(&self) -> &'static str {
        TERMS_FACET_TYPE
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> FacetResult {
        encode_facet(self, buf)
    }

    fn to_document(&self) -> Value {
        let terms: Vec<Value> = self
            .entries
            .iter()
            .map(|e| json!({ "term": e.term, "count": e.count }))
            .collect();
        json!({
            "_type": TERMS_FACET_TYPE,
            "missing": self.missing,
            "total": self.total,
            "other": self.other(),
            "terms": terms,
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

/// Term counts in first-seen order.
#[derive(Debug, Default)]
struct TermCounts {
    counts: Vec<TermEntry>,
    index: AHashMap<String, usize>,
}

impl TermCounts {
    fn add(&mut self, term: &str, count: u64) {
        match self.index.get(term) {
            Some(&i) => self.counts[i].count += count,
            None => {
                self.index.insert(term.to_string(), self.counts.len());
                self.counts.push(TermEntry {
                    term: term.to_string(),
                    count,
                });
            }
        }
    }

    fn top(self, size: usize) -> Vec<TermEntry> {
        let mut counts = self.counts;
        // stable, so equal counts keep first-seen order
        counts.sort_by(|a, b| b.count.cmp(&a.count));
        counts.truncate(size);
        counts
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TermsConfig {
    field: String,
    #[serde(default)]
    size: Option<usize>,
}

#[derive(Debug)]
pub struct TermsCollector {
    facet_name: String,
    field: String,
    size: usize,
    values: Option<Arc<dyn KeywordValues>>,
    counts: TermCounts,
    missing: u64,
    total: u64,
}

impl FacetCollector for TermsCollector {
    fn bind_partition(&mut self, partition: &PartitionContext) -> FacetResult {
        self.values = Some(require_keyword(partition, &self.field)?);
        Ok(())
    }

    fn observe(&mut self, doc: DocId) -> FacetResult {
        let values = self
            .values
            .as_ref()
            .ok_or_else(|| unbound(&self.facet_name))?;
        let terms = values.values(doc);
        if terms.is_empty() {
            self.missing += 1;
            return Ok(());
        }
        for term in terms {
            self.counts.add(term, 1);
        }
        self.total += terms.len() as u64;
        Ok(())
    }

    fn finalize(&mut self) -> FacetResult<BoxedFacet> {
        let counts = std::mem::take(&mut self.counts);
        Ok(Box::new(TermsFacet {
            size: self.size,
            entries: counts.top(self.size),
            missing: std::mem::take(&mut self.missing),
            total: std::mem::take(&mut self.total),
        }))
    }
}

#[derive(Debug)]
pub struct TermsFacetType;

impl FacetType for TermsFacetType {
    fn name(&self) -> &'static str {
        TERMS_FACET_TYPE
    }

    fn create_collector(
        &self,
        facet_name: &str,
        config: &Value,
        context: &FacetContext,
    ) -> FacetResult<BoxedCollector> {
        let config = TermsConfig::deserialize(config).map_err(|e| {
            FacetError::Configuration(format!("[{facet_name}] terms facet: {e}"))
        })?;
        Ok(Box::new(TermsCollector {
            facet_name: facet_name.to_string(),
            field: config.field,
            size: config.size.unwrap_or(context.settings.default_terms_size),
            values: None,
            counts: TermCounts::default(),
            missing: 0,
            total: 0,
        }))
    }

    fn reduce(&self, partials: Vec<BoxedFacet>, _context: &FacetContext) -> FacetResult<BoxedFacet> {
        let partials = downcast_partials::<TermsFacet>(partials, TERMS_FACET_TYPE)?;
        let size = partials.first().map(|p| p.size).unwrap_or_default();
        let mut counts = TermCounts::default();
        let mut missing = 0;
        let mut total = 0;
        for partial in partials {
            for entry in &partial.entries {
                counts.add(&entry.term, entry.count);
            }
            missing += partial.missing;
            total += partial.total;
        }
        Ok(Box::new(TermsFacet {
            size,
            entries: counts.top(size),
            missing,
            total,
        }))
    }

    fn read(&self, bytes: &[u8], _context: &FacetContext) -> FacetResult<BoxedFacet> {
        Ok(Box::new(decode_facet::<TermsFacet>(bytes)?))
    }
}
