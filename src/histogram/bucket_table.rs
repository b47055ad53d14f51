use super::MergeEntry;
use crate::common::pool::{Pool, PoolStats, Pooled};
use crate::common::{BucketKey, DocId};
use crate::config::FacetSettings;
use crate::error::{FacetError, FacetResult};
use crate::error_consts;
use crate::facets::{BoxedCollector, BoxedFacet, Facet};
use crate::partition::PartitionContext;
use ahash::RandomState;
use std::collections::HashMap;
use std::sync::Arc;

pub type BucketMap = HashMap<BucketKey, Bucket, RandomState>;
pub type MergeMap = HashMap<BucketKey, MergeEntry, RandomState>;

/// Pooled key to bucket table, owned by one collection pass.
pub type BucketTable = Pooled<BucketMap>;

#[derive(Debug)]
pub enum BucketState {
    Live(BoxedCollector),
    Finalized(BoxedFacet),
}

/// One time bucket and the nested facet of the documents that fell into it.
#[derive(Debug)]
pub struct Bucket {
    key: BucketKey,
    state: BucketState,
}

impl Bucket {
    pub fn new(key: BucketKey, collector: BoxedCollector) -> Self {
        Self {
            key,
            state: BucketState::Live(collector),
        }
    }

    pub fn key(&self) -> BucketKey {
        self.key
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self.state, BucketState::Finalized(_))
    }

    pub fn bind_partition(&mut self, partition: &PartitionContext) -> FacetResult {
        match &mut self.state {
            BucketState::Live(collector) => collector.bind_partition(partition),
            BucketState::Finalized(_) => Err(finalized()),
        }
    }

    pub fn observe(&mut self, doc: DocId) -> FacetResult {
        match &mut self.state {
            BucketState::Live(collector) => collector.observe(doc),
            BucketState::Finalized(_) => Err(finalized()),
        }
    }

    /// Replaces the live collector with its result. A bucket is finalized at most once.
    pub fn finalize(&mut self) -> FacetResult {
        let BucketState::Live(collector) = &mut self.state else {
            return Err(finalized());
        };
        let result = collector.finalize()?;
        self.state = BucketState::Finalized(result);
        Ok(())
    }

    pub fn result(&self) -> Option<&dyn Facet> {
        match &self.state {
            BucketState::Finalized(result) => Some(result.as_ref()),
            BucketState::Live(_) => None,
        }
    }

    pub fn into_result(self) -> FacetResult<BoxedFacet> {
        match self.state {
            BucketState::Finalized(result) => Ok(result),
            BucketState::Live(_) => Err(FacetError::IllegalState(format!(
                "{} (bucket {})",
                error_consts::BUCKET_NOT_FINALIZED,
                self.key
            ))),
        }
    }
}

fn finalized() -> FacetError {
    FacetError::IllegalState(error_consts::COLLECTOR_FINALIZED.to_string())
}

/// Pools for the bucket tables of collectors and the merge maps of the reducer.
#[derive(Debug, Clone)]
pub struct Recycler {
    tables: Arc<Pool<BucketMap>>,
    merge_maps: Arc<Pool<MergeMap>>,
}

impl Recycler {
    pub fn new(settings: &FacetSettings) -> Self {
        Self {
            tables: Pool::new(
                "bucket table",
                settings.pool_max_idle,
                settings.pool_max_retained_capacity,
            ),
            merge_maps: Pool::new(
                "merge map",
                settings.pool_max_idle,
                settings.pool_max_retained_capacity,
            ),
        }
    }

    pub fn bucket_table(&self) -> BucketTable {
        self.tables.acquire()
    }

    pub fn merge_map(&self) -> Pooled<MergeMap> {
        self.merge_maps.acquire()
    }

    pub fn table_stats(&self) -> PoolStats {
        self.tables.stats()
    }

    pub fn merge_map_stats(&self) -> PoolStats {
        self.merge_maps.stats()
    }
}

impl Default for Recycler {
    fn default() -> Self {
        Self::new(&FacetSettings::default())
    }
}
