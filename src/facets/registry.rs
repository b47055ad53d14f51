use super::{
    BoxedCollector, BoxedFacet, CountFacetType, FacetContext, MetricFacetType, StatsFacetType,
    TermsFacetType,
};
use crate::error::{FacetError, FacetResult};
use crate::histogram::HistogramFacetType;
use ahash::AHashMap;
use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;

/// A facet implementation: parsing, merging and decoding of one facet type.
pub trait FacetType: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    /// Builds a fresh, independent collector from the type's configuration object.
    fn create_collector(
        &self,
        facet_name: &str,
        config: &Value,
        context: &FacetContext,
    ) -> FacetResult<BoxedCollector>;

    /// Merges partials of this type, given in partition visitation order.
    fn reduce(&self, partials: Vec<BoxedFacet>, context: &FacetContext)
        -> FacetResult<BoxedFacet>;

    /// Decodes a result previously written with [`super::Facet::write_to`].
    fn read(&self, bytes: &[u8], context: &FacetContext) -> FacetResult<BoxedFacet>;
}

#[derive(Debug, Default)]
pub struct FacetRegistry {
    types: AHashMap<&'static str, Arc<dyn FacetType>>,
}

impl FacetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every facet type shipped with the crate.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(CountFacetType));
        registry.register(Arc::new(TermsFacetType));
        registry.register(Arc::new(StatsFacetType));
        registry.register(Arc::new(MetricFacetType));
        registry.register(Arc::new(HistogramFacetType));
        registry
    }

    /// Adds a facet type, replacing any previous type of the same name.
    pub fn register(&mut self, facet_type: Arc<dyn FacetType>) {
        if let Some(previous) = self.types.insert(facet_type.name(), facet_type) {
            log::warn!("facet type [{}] was registered twice", previous.name());
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn FacetType>> {
        self.types.get(name).cloned()
    }

    pub fn require(&self, name: &str) -> FacetResult<Arc<dyn FacetType>> {
        self.get(name)
            .ok_or_else(|| FacetError::Configuration(format!("No facet type found for [{name}]")))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.types.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
