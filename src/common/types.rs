/// Milliseconds since the unix epoch.
pub type Timestamp = i64;

/// A rounded timestamp identifying one histogram bucket.
pub type BucketKey = Timestamp;

/// Identifier of a document inside a single partition.
pub type DocId = u32;
