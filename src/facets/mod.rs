//! The nested facet capability: collectors that observe the documents of one bucket,
//! the results they produce, and the registry that maps type names to implementations.
mod count;
mod factory;
mod metric;
mod registry;
mod stats;
mod terms;

pub use count::*;
pub use factory::*;
pub use metric::*;
pub use registry::*;
pub use stats::*;
pub use terms::*;

use crate::common::DocId;
use crate::config::{FacetSettings, DEFAULT_RECYCLER, DEFAULT_REGISTRY};
use crate::error::{FacetError, FacetResult};
use crate::error_consts;
use crate::histogram::Recycler;
use crate::partition::PartitionContext;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

/// Key of the nested facet definition in a request, and of the nested result in each
/// rendered bucket.
pub const NESTED_FACET_KEY: &str = "facet";

/// A finalized, immutable facet result.
pub trait Facet: Send + Debug + Any {
    fn type_name(&self) -> &'static str;

    /// Appends the binary form of the result. The type tag is not part of it.
    fn write_to(&self, buf: &mut Vec<u8>) -> FacetResult;

    fn to_document(&self) -> serde_json::Value;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;

    fn facet_eq(&self, other: &dyn Facet) -> bool;
}

pub type BoxedFacet = Box<dyn Facet>;

impl PartialEq for dyn Facet {
    fn eq(&self, other: &Self) -> bool {
        self.facet_eq(other)
    }
}

/// Per-bucket collection side of a facet. One instance only ever sees the documents of
/// one bucket, from one thread.
pub trait FacetCollector: Send + Debug {
    /// Called before the first document of every partition.
    fn bind_partition(&mut self, partition: &PartitionContext) -> FacetResult;

    fn observe(&mut self, doc: DocId) -> FacetResult;

    fn finalize(&mut self) -> FacetResult<BoxedFacet>;
}

pub type BoxedCollector = Box<dyn FacetCollector>;

/// Everything a facet type needs besides its own configuration.
#[derive(Debug, Clone)]
pub struct FacetContext {
    pub registry: Arc<FacetRegistry>,
    pub recycler: Recycler,
    pub settings: FacetSettings,
}

impl FacetContext {
    pub fn new(registry: Arc<FacetRegistry>, settings: FacetSettings) -> Self {
        Self {
            registry,
            recycler: Recycler::new(&settings),
            settings,
        }
    }
}

impl Default for FacetContext {
    fn default() -> Self {
        Self {
            registry: Arc::clone(&DEFAULT_REGISTRY),
            recycler: DEFAULT_RECYCLER.clone(),
            settings: FacetSettings::default(),
        }
    }
}

pub(crate) fn facet_eq<T: Facet + PartialEq>(this: &T, other: &dyn Facet) -> bool {
    other
        .as_any()
        .downcast_ref::<T>()
        .is_some_and(|other| other == this)
}

/// Unboxes partials of a single facet type, failing on the first foreign one.
pub(crate) fn downcast_partials<T: Facet>(
    partials: Vec<BoxedFacet>,
    expected: &'static str,
) -> FacetResult<Vec<T>> {
    partials
        .into_iter()
        .map(|facet| {
            let found = facet.type_name();
            facet
                .into_any()
                .downcast::<T>()
                .map(|facet| *facet)
                .map_err(|_| FacetError::mismatch(None, expected, found))
        })
        .collect()
}

pub(crate) fn encode_facet<T: Serialize>(value: &T, buf: &mut Vec<u8>) -> FacetResult {
    let bytes = bincode::serde::encode_to_vec(value, bincode::config::standard())?;
    buf.extend_from_slice(&bytes);
    Ok(())
}

pub(crate) fn decode_facet<T: DeserializeOwned>(bytes: &[u8]) -> FacetResult<T> {
    let (value, read) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())?;
    if read != bytes.len() {
        return Err(FacetError::Serialization(format!(
            "{} ({} bytes)",
            error_consts::TRAILING_BYTES,
            bytes.len() - read
        )));
    }
    Ok(value)
}

pub(crate) fn unbound(facet: &str) -> FacetError {
    FacetError::IllegalState(format!("[{facet}] {}", error_consts::COLLECTOR_UNBOUND))
}
