use super::{Bucket, BucketTable, FacetedDateHistogram, HistogramRequest, Recycler};
use crate::common::DocId;
use crate::error::{FacetError, FacetResult};
use crate::error_consts;
use crate::facets::{BoxedFacet, FacetCollector, FacetCollectorFactory};
use crate::partition::{require_numeric, NumericValues, PartitionContext};
use crate::rounding::DateRounding;
use smallvec::SmallVec;
use std::collections::hash_map::Entry;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Unbound,
    Bound,
    Collecting,
    Finalized,
}

/// Collects the documents of one partition (or of several partitions visited in turn)
/// into rounded time buckets, each with its own nested collector.
#[derive(Debug)]
pub struct HistogramCollector {
    name: String,
    key_field: String,
    rounding: DateRounding,
    factory: Arc<FacetCollectorFactory>,
    state: CollectorState,
    table: Option<BucketTable>,
    partition: Option<PartitionContext>,
    values: Option<Arc<dyn NumericValues>>,
}

impl HistogramCollector {
    pub fn new(
        request: &HistogramRequest,
        factory: Arc<FacetCollectorFactory>,
        recycler: Recycler,
    ) -> Self {
        Self {
            name: request.name.clone(),
            key_field: request.key_field.clone(),
            rounding: request.rounding.clone(),
            factory,
            state: CollectorState::Unbound,
            table: Some(recycler.bucket_table()),
            partition: None,
            values: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CollectorState {
        self.state
    }

    pub fn bucket_count(&self) -> usize {
        self.table.as_ref().map_or(0, |table| table.len())
    }

    /// Finalizes every bucket and hands the table over to the result. On error the table
    /// is released and the collector cannot be used again.
    pub fn finish(&mut self) -> FacetResult<FacetedDateHistogram> {
        if self.state == CollectorState::Finalized {
            return Err(self.illegal_state(error_consts::COLLECTOR_FINALIZED));
        }
        self.state = CollectorState::Finalized;
        self.partition = None;
        self.values = None;

        let Some(mut table) = self.table.take() else {
            return Err(self.illegal_state(error_consts::COLLECTOR_FINALIZED));
        };
        for (&key, bucket) in table.iter_mut() {
            bucket
                .finalize()
                .map_err(|err| FacetError::nested(&self.name, key, err))?;
        }
        log::debug!(
            "facet [{}]: finalized {} buckets",
            self.name,
            table.len()
        );
        Ok(FacetedDateHistogram::from_table(&self.name, table))
    }

    fn illegal_state(&self, message: &str) -> FacetError {
        FacetError::IllegalState(format!("[{}] {message}", self.name))
    }
}

impl FacetCollector for HistogramCollector {
    /// Switches the value source to a new partition. Buckets created for earlier partitions
    /// are re-bound too, since their collectors read partition scoped values.
    fn bind_partition(&mut self, partition: &PartitionContext) -> FacetResult {
        if self.state == CollectorState::Finalized {
            return Err(self.illegal_state(error_consts::COLLECTOR_FINALIZED));
        }
        self.values = Some(require_numeric(partition, &self.key_field)?);
        if let Some(table) = self.table.as_mut() {
            for (&key, bucket) in table.iter_mut() {
                bucket
                    .bind_partition(partition)
                    .map_err(|err| FacetError::nested(&self.name, key, err))?;
            }
        }
        log::debug!(
            "facet [{}]: bound to partition {} ({} existing buckets)",
            self.name,
            partition.ordinal(),
            self.bucket_count()
        );
        self.partition = Some(Arc::clone(partition));
        self.state = CollectorState::Bound;
        Ok(())
    }

    fn observe(&mut self, doc: DocId) -> FacetResult {
        match self.state {
            CollectorState::Unbound => {
                return Err(self.illegal_state(error_consts::COLLECTOR_UNBOUND))
            }
            CollectorState::Finalized => {
                return Err(self.illegal_state(error_consts::COLLECTOR_FINALIZED))
            }
            CollectorState::Bound | CollectorState::Collecting => {}
        }

        let Self {
            ref name,
            ref rounding,
            ref factory,
            ref mut state,
            ref mut table,
            ref partition,
            ref values,
            ..
        } = *self;
        let (Some(table), Some(partition), Some(values)) = (table, partition, values) else {
            return Err(FacetError::IllegalState(format!(
                "[{name}] {}",
                error_consts::COLLECTOR_UNBOUND
            )));
        };
        *state = CollectorState::Collecting;

        let raw = values.values(doc);
        if raw.is_empty() {
            return Ok(());
        }

        // one observation per distinct value; repeated values count once
        let mut seen: SmallVec<i64, 4> = SmallVec::new();
        for &value in raw {
            if seen.contains(&value) {
                continue;
            }
            seen.push(value);

            let key = rounding.round(value);
            let bucket = match table.entry(key) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let mut collector = factory
                        .create()
                        .map_err(|err| FacetError::nested(name, key, err))?;
                    collector
                        .bind_partition(partition)
                        .map_err(|err| FacetError::nested(name, key, err))?;
                    entry.insert(Bucket::new(key, collector))
                }
            };
            bucket
                .observe(doc)
                .map_err(|err| FacetError::nested(name, key, err))?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> FacetResult<BoxedFacet> {
        Ok(Box::new(self.finish()?))
    }
}
