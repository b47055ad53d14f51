pub const MISSING_INTERVAL: &str = "[interval] is required to be set for histogram facet";
pub const MISSING_KEY_FIELD: &str =
    "key field is required to be set for histogram facet, either using [field] or using [key_field]";
pub const MISSING_NESTED_FACET: &str = "faceted histogram misses an internal facet definition";
pub const NO_NESTED_FACET_TYPE: &str = "No facet type defined under facet node";
pub const MALFORMED_NESTED_FACET: &str = "Internal facet definition is malformed";
pub const INVALID_FACTOR: &str = "[factor] must be a finite, non-zero number";
pub const INVALID_METRIC_AGGREGATION: &str = "invalid [aggregation] for metric facet";
pub const COLLECTOR_FINALIZED: &str = "collector has already been finalized";
pub const COLLECTOR_UNBOUND: &str = "collector received a document before a partition was bound";
pub const BUCKET_NOT_FINALIZED: &str = "bucket still holds a live collector";
pub const TRUNCATED_INPUT: &str = "unexpected end of input";
pub const TRAILING_BYTES: &str = "trailing bytes after facet payload";
pub const UNSUPPORTED_VERSION: &str = "unsupported facet encoding version";
pub const UNORDERED_BUCKETS: &str = "bucket keys are not strictly increasing";
