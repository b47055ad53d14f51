use super::{FacetedDateHistogram, FinalBucket};
use crate::common::BucketKey;
use crate::error::{FacetError, FacetResult};
use crate::facets::{BoxedFacet, FacetContext};
use smallvec::SmallVec;
use std::collections::hash_map::Entry;

/// Partials collected for one key during a merge, in partition visitation order.
#[derive(Debug)]
pub struct MergeEntry {
    key: BucketKey,
    type_name: &'static str,
    partials: SmallVec<BoxedFacet, 2>,
}

impl MergeEntry {
    fn new(key: BucketKey, facet: BoxedFacet) -> Self {
        let mut partials = SmallVec::new();
        let type_name = facet.type_name();
        partials.push(facet);
        Self {
            key,
            type_name,
            partials,
        }
    }

    fn push(&mut self, facet: BoxedFacet) -> FacetResult {
        if facet.type_name() != self.type_name {
            return Err(FacetError::mismatch(
                Some(self.key),
                self.type_name,
                facet.type_name(),
            ));
        }
        self.partials.push(facet);
        Ok(())
    }

    fn reduce(mut self, name: &str, context: &FacetContext) -> FacetResult<FinalBucket> {
        let key = self.key;
        if self.partials.len() == 1 {
            if let Some(facet) = self.partials.pop() {
                return Ok(FinalBucket::new(key, facet));
            }
        }
        let facet_type = context.registry.require(self.type_name)?;
        let facet = facet_type
            .reduce(self.partials.into(), context)
            .map_err(|err| FacetError::nested(name, key, err))?;
        Ok(FinalBucket::new(key, facet))
    }
}

/// Merges per-partition histograms into one, ordered by key.
///
/// Partials are visited in the order given; when several of them have a bucket with the
/// same key, their nested results are handed to the nested type's own reduce in that order.
/// Every pooled table is released on return, on success and on error alike.
pub fn reduce(
    name: &str,
    partials: Vec<FacetedDateHistogram>,
    context: &FacetContext,
) -> FacetResult<FacetedDateHistogram> {
    if partials.len() <= 1 {
        let Some(partial) = partials.into_iter().next() else {
            return Ok(FacetedDateHistogram::empty(name));
        };
        log::debug!("facet [{name}]: single partial, no merge needed");
        return Ok(FacetedDateHistogram::from_buckets(name, partial.into_buckets()?));
    }

    let partial_count = partials.len();
    let mut merged = context.recycler.merge_map();
    for partial in partials {
        for bucket in partial.into_buckets()? {
            match merged.entry(bucket.key) {
                Entry::Vacant(entry) => {
                    entry.insert(MergeEntry::new(bucket.key, bucket.facet));
                }
                Entry::Occupied(mut entry) => entry.get_mut().push(bucket.facet)?,
            }
        }
    }

    let mut entries: Vec<MergeEntry> = merged.drain().map(|(_, entry)| entry).collect();
    drop(merged);
    entries.sort_by_key(|entry| entry.key);
    log::debug!(
        "facet [{name}]: merging {partial_count} partials into {} buckets",
        entries.len()
    );

    let buckets = entries
        .into_iter()
        .map(|entry| entry.reduce(name, context))
        .collect::<FacetResult<Vec<_>>>()?;
    Ok(FacetedDateHistogram::from_buckets(name, buckets))
}
