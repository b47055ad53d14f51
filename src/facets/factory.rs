use super::{BoxedCollector, FacetContext, FacetType};
use crate::error::FacetResult;
use serde_json::Value;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Produces independent nested collectors from one stored configuration fragment.
///
/// The fragment is kept in serialized form and parsed again on every [`create`](Self::create),
/// so no state is shared between the collectors of different buckets. The factory itself is
/// immutable and can be shared between partitions running on different threads.
pub struct FacetCollectorFactory {
    facet_name: String,
    facet_type: Arc<dyn FacetType>,
    config: Vec<u8>,
    context: FacetContext,
}

impl FacetCollectorFactory {
    /// Resolves `type_name` and runs one trial creation, so a malformed nested
    /// configuration fails here rather than on the first document.
    pub fn new(
        facet_name: &str,
        type_name: &str,
        config: &Value,
        context: FacetContext,
    ) -> FacetResult<Self> {
        let facet_type = context.registry.require(type_name)?;
        let factory = Self {
            facet_name: facet_name.to_string(),
            facet_type,
            config: serde_json::to_vec(config)?,
            context,
        };
        let trial = factory.create()?;
        log::debug!(
            "facet [{}]: nested [{}] collector validated: {:?}",
            factory.facet_name,
            factory.type_name(),
            trial
        );
        Ok(factory)
    }

    pub fn create(&self) -> FacetResult<BoxedCollector> {
        let config: Value = serde_json::from_slice(&self.config)?;
        self.facet_type
            .create_collector(&self.facet_name, &config, &self.context)
    }

    pub fn type_name(&self) -> &'static str {
        self.facet_type.name()
    }

    pub fn context(&self) -> &FacetContext {
        &self.context
    }
}

impl Debug for FacetCollectorFactory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacetCollectorFactory")
            .field("facet_name", &self.facet_name)
            .field("type", &self.type_name())
            .field("config", &String::from_utf8_lossy(&self.config))
            .finish()
    }
}
