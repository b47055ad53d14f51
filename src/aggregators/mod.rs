use crate::error::FacetError;
use crate::error_consts;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use strum_macros::EnumIter;

mod handlers;
mod kahan;

pub use handlers::*;
pub use kahan::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Serialize, Deserialize)]
pub enum AggregationType {
    Avg,
    Count,
    Max,
    Min,
    Range,
    Sum,
    StdP,
    StdS,
    VarP,
    VarS,
}

impl AggregationType {
    pub fn name(&self) -> &'static str {
        match self {
            AggregationType::Avg => "avg",
            AggregationType::Count => "count",
            AggregationType::Max => "max",
            AggregationType::Min => "min",
            AggregationType::Range => "range",
            AggregationType::Sum => "sum",
            AggregationType::StdP => "std.p",
            AggregationType::StdS => "std.s",
            AggregationType::VarP => "var.p",
            AggregationType::VarS => "var.s",
        }
    }
}

impl Display for AggregationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl TryFrom<&str> for AggregationType {
    type Error = FacetError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let aggregation = hashify::tiny_map_ignore_case! {
            value.as_bytes(),
            "avg" => AggregationType::Avg,
            "count" => AggregationType::Count,
            "max" => AggregationType::Max,
            "min" => AggregationType::Min,
            "range" => AggregationType::Range,
            "sum" => AggregationType::Sum,
            "std.p" => AggregationType::StdP,
            "std.s" => AggregationType::StdS,
            "var.p" => AggregationType::VarP,
            "var.s" => AggregationType::VarS,
        };
        aggregation.ok_or_else(|| {
            FacetError::Configuration(format!(
                "{} [{value}]",
                error_consts::INVALID_METRIC_AGGREGATION
            ))
        })
    }
}
