//! Binary form of a histogram.
//!
//! ```text
//! version: u8
//! name:    uvarint length + utf-8
//! count:   uvarint
//! count x { key: i64 big-endian, type tag: uvarint length + utf-8, payload: uvarint length + bytes }
//! ```
//!
//! Each bucket carries the tag of its nested facet type, so a reader needs nothing but the
//! registry to decode it.
use super::{FacetedDateHistogram, FinalBucket};
use crate::common::encoding::{write_bytes, write_i64, write_str, write_uvarint, ByteReader};
use crate::error::{FacetError, FacetResult};
use crate::error_consts;
use crate::facets::FacetContext;

pub const ENCODING_VERSION: u8 = 1;

pub fn write_histogram(histogram: &FacetedDateHistogram, buf: &mut Vec<u8>) -> FacetResult {
    let entries = histogram.entries();
    if entries.len() != histogram.len() {
        return Err(FacetError::IllegalState(
            error_consts::BUCKET_NOT_FINALIZED.to_string(),
        ));
    }

    buf.push(ENCODING_VERSION);
    write_str(buf, histogram.name());
    write_uvarint(buf, entries.len() as u64);

    let mut payload = Vec::new();
    for (key, facet) in entries {
        payload.clear();
        facet
            .write_to(&mut payload)
            .map_err(|err| FacetError::nested(histogram.name(), key, err))?;
        write_i64(buf, key);
        write_str(buf, facet.type_name());
        write_bytes(buf, &payload);
    }
    Ok(())
}

pub fn read_histogram(bytes: &[u8], context: &FacetContext) -> FacetResult<FacetedDateHistogram> {
    let mut reader = ByteReader::new(bytes);

    let version = reader.read_u8()?;
    if version != ENCODING_VERSION {
        return Err(FacetError::Serialization(format!(
            "{} ({version})",
            error_consts::UNSUPPORTED_VERSION
        )));
    }

    let name = reader.read_str()?.to_string();
    let count = reader.read_uvarint()?;
    // every bucket takes at least 10 bytes, which bounds the allocation below
    if count > reader.remaining() as u64 {
        return Err(FacetError::Serialization(
            error_consts::TRUNCATED_INPUT.to_string(),
        ));
    }

    let mut buckets = Vec::with_capacity(count as usize);
    let mut previous = None;
    for _ in 0..count {
        let key = reader.read_i64()?;
        if previous.is_some_and(|previous| previous >= key) {
            return Err(FacetError::Serialization(format!(
                "{} ({key})",
                error_consts::UNORDERED_BUCKETS
            )));
        }
        previous = Some(key);

        let tag = reader.read_str()?;
        let payload = reader.read_bytes()?;
        let facet_type = context.registry.get(tag).ok_or_else(|| {
            FacetError::Serialization(format!("unknown facet type [{tag}] in bucket {key}"))
        })?;
        let facet = facet_type
            .read(payload, context)
            .map_err(|err| FacetError::nested(&name, key, err))?;
        buckets.push(FinalBucket::new(key, facet));
    }
    reader.finish()?;

    Ok(FacetedDateHistogram::from_buckets(&name, buckets))
}

/// Encodes a histogram into a fresh buffer.
pub fn histogram_to_bytes(histogram: &FacetedDateHistogram) -> FacetResult<Vec<u8>> {
    let mut buf = Vec::new();
    write_histogram(histogram, &mut buf)?;
    Ok(buf)
}
