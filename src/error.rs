use crate::common::BucketKey;
use crate::parser::ParseError;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
/// Enum for the failures of a faceted histogram request.
pub enum FacetError {
    #[error("Invalid facet configuration. {0}")]
    Configuration(String),

    #[error("Field [{0}] not found")]
    MissingField(String),

    #[error("Facet [{facet}] failed in bucket {key}: {source}")]
    NestedAggregation {
        facet: String,
        key: BucketKey,
        #[source]
        source: Box<FacetError>,
    },

    #[error("Cannot merge facet partials{}: expected [{expected}], found [{found}]", fmt_bucket(.key))]
    MergeTypeMismatch {
        key: Option<BucketKey>,
        expected: String,
        found: String,
    },

    #[error("Serialization error. {0}")]
    Serialization(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Illegal collector state. {0}")]
    IllegalState(String),
}

pub type FacetResult<T = ()> = Result<T, FacetError>;

fn fmt_bucket(key: &Option<BucketKey>) -> String {
    match key {
        Some(key) => format!(" at bucket {key}"),
        None => String::new(),
    }
}

impl FacetError {
    pub(crate) fn nested(facet: &str, key: BucketKey, source: FacetError) -> Self {
        FacetError::NestedAggregation {
            facet: facet.to_string(),
            key,
            source: Box::new(source),
        }
    }

    pub(crate) fn mismatch(key: Option<BucketKey>, expected: &str, found: &str) -> Self {
        FacetError::MergeTypeMismatch {
            key,
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Returns the innermost error of a chain of nested aggregation failures.
    pub fn root_cause(&self) -> &FacetError {
        let mut current = self;
        while let FacetError::NestedAggregation { source, .. } = current {
            current = source;
        }
        current
    }
}

impl From<&str> for FacetError {
    fn from(s: &str) -> Self {
        FacetError::Configuration(s.to_string())
    }
}

impl From<serde_json::Error> for FacetError {
    fn from(e: serde_json::Error) -> Self {
        FacetError::Configuration(e.to_string())
    }
}

impl From<bincode::error::EncodeError> for FacetError {
    fn from(e: bincode::error::EncodeError) -> Self {
        FacetError::Serialization(e.to_string())
    }
}

impl From<bincode::error::DecodeError> for FacetError {
    fn from(e: bincode::error::DecodeError) -> Self {
        FacetError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_error_message_names_facet_and_bucket() {
        let err = FacetError::nested(
            "my_facet",
            1000,
            FacetError::MissingField("tag".to_string()),
        );
        assert_eq!(
            err.to_string(),
            "Facet [my_facet] failed in bucket 1000: Field [tag] not found"
        );
        assert_eq!(err.root_cause(), &FacetError::MissingField("tag".to_string()));
    }

    #[test]
    fn test_mismatch_message() {
        let err = FacetError::mismatch(Some(5), "terms", "count");
        assert_eq!(
            err.to_string(),
            "Cannot merge facet partials at bucket 5: expected [terms], found [count]"
        );
        let err = FacetError::mismatch(None, "terms", "count");
        assert_eq!(
            err.to_string(),
            "Cannot merge facet partials: expected [terms], found [count]"
        );
    }
}
