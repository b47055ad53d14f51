//! A date histogram facet whose buckets each run an independently configured nested facet.
//!
//! Documents are grouped by a rounded timestamp taken from a numeric field. Every bucket
//! owns a nested collector created from one shared definition, so a histogram can hold
//! counts, term frequencies, statistics or further histograms per time slot. Partitions
//! are collected independently and their partial histograms reduced into one.
extern crate enum_dispatch;
extern crate strum;
extern crate strum_macros;

pub mod aggregators;
pub mod common;
pub mod config;
pub mod error;
pub mod error_consts;
pub mod executor;
pub mod facets;
pub mod histogram;
pub mod parser;
pub mod partition;
pub mod rounding;

pub use error::{FacetError, FacetResult};
pub use executor::{execute, execute_json, execute_segments};
pub use facets::{Facet, FacetCollector, FacetContext, FacetRegistry, FacetType};
pub use histogram::{
    histogram_to_bytes, read_histogram, reduce, FacetedDateHistogram, HistogramCollector,
    HistogramRequest,
};
pub use partition::{Document, MemoryPartition, PartitionContext, PartitionReader};
pub use rounding::{DateRounding, RoundingUnit};
