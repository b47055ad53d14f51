use crate::error::{FacetError, FacetResult};
use crate::error_consts;
use crate::facets::{FacetCollectorFactory, FacetContext, FacetRegistry, NESTED_FACET_KEY};
use crate::parser::{parse_offset, parse_time_zone, time_zone_from_hours, utc, ParseError};
use crate::rounding::{DateRounding, RoundingUnit};
use chrono::FixedOffset;
use serde_json::Value;

/// A parsed faceted date histogram request.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramRequest {
    pub name: String,
    pub key_field: String,
    pub rounding: DateRounding,
    pub nested_type: String,
    pub nested_config: Value,
}

impl HistogramRequest {
    /// Parses a request body such as
    ///
    /// ```json
    /// { "field": "timestamp", "interval": "week", "time_zone": "+02:00",
    ///   "facet": { "terms": { "field": "tag" } } }
    /// ```
    ///
    /// Unknown keys are ignored.
    pub fn parse(name: &str, body: &Value, registry: &FacetRegistry) -> FacetResult<Self> {
        let fail = |message: String| FacetError::Configuration(format!("Facet [{name}]: {message}"));

        let Value::Object(fields) = body else {
            return Err(fail("request body must be an object".to_string()));
        };

        let mut key_field = None;
        let mut interval = None;
        let mut pre_zone = utc();
        let mut post_zone = utc();
        let mut pre_zone_adjust_large_interval = false;
        let mut pre_offset = 0;
        let mut post_offset = 0;
        let mut factor = 1.0;
        let mut nested = None;

        for (key, value) in fields {
            match key.as_str() {
                "field" | "key_field" | "keyField" => {
                    key_field = Some(string_value(key, value).map_err(fail)?)
                }
                "interval" => interval = Some(string_value(key, value).map_err(fail)?),
                "time_zone" | "timeZone" | "pre_zone" | "preZone" => {
                    pre_zone = zone_value(value).map_err(|e| fail(e.to_string()))?
                }
                "post_zone" | "postZone" => {
                    post_zone = zone_value(value).map_err(|e| fail(e.to_string()))?
                }
                "pre_zone_adjust_large_interval" | "preZoneAdjustLargeInterval" => {
                    pre_zone_adjust_large_interval = value
                        .as_bool()
                        .ok_or_else(|| fail(format!("[{key}] must be a boolean")))?
                }
                "pre_offset" | "preOffset" => {
                    pre_offset = offset_value(value).map_err(|e| fail(e.to_string()))?
                }
                "post_offset" | "postOffset" => {
                    post_offset = offset_value(value).map_err(|e| fail(e.to_string()))?
                }
                "factor" => {
                    factor = value
                        .as_f64()
                        .filter(|f| f.is_finite() && *f != 0.0)
                        .ok_or_else(|| fail(error_consts::INVALID_FACTOR.to_string()))?
                }
                NESTED_FACET_KEY => nested = Some(nested_value(value, registry).map_err(fail)?),
                _ => log::debug!("facet [{name}]: ignoring unknown parameter [{key}]"),
            }
        }

        let Some(interval) = interval else {
            return Err(fail(error_consts::MISSING_INTERVAL.to_string()));
        };
        let Some(key_field) = key_field else {
            return Err(fail(error_consts::MISSING_KEY_FIELD.to_string()));
        };
        let Some((nested_type, nested_config)) = nested else {
            return Err(fail(error_consts::MISSING_NESTED_FACET.to_string()));
        };

        let unit = RoundingUnit::try_from(interval.as_str()).map_err(|e| fail(e.to_string()))?;
        let rounding = DateRounding::builder()
            .unit(unit)
            .pre_zone(pre_zone)
            .post_zone(post_zone)
            .pre_zone_adjust_large_interval(pre_zone_adjust_large_interval)
            .pre_offset(pre_offset)
            .post_offset(post_offset)
            .factor(factor)
            .build();

        Ok(Self {
            name: name.to_string(),
            key_field,
            rounding,
            nested_type,
            nested_config,
        })
    }

    /// Builds the factory for the nested collectors, validating their configuration.
    pub fn factory(&self, context: &FacetContext) -> FacetResult<FacetCollectorFactory> {
        FacetCollectorFactory::new(
            &self.name,
            &self.nested_type,
            &self.nested_config,
            context.clone(),
        )
    }
}

fn string_value(key: &str, value: &Value) -> Result<String, String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| format!("[{key}] must be a string"))
}

fn zone_value(value: &Value) -> Result<FixedOffset, ParseError> {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(hours) => time_zone_from_hours(hours),
            None => Err(ParseError::InvalidTimeZone(n.to_string())),
        },
        Value::String(s) => parse_time_zone(s),
        other => Err(ParseError::InvalidTimeZone(other.to_string())),
    }
}

fn offset_value(value: &Value) -> Result<i64, ParseError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| ParseError::InvalidDuration(n.to_string())),
        Value::String(s) => parse_offset(s),
        other => Err(ParseError::InvalidDuration(other.to_string())),
    }
}

/// The nested definition is an object with a single key, the nested type. Anything after
/// the first key is ignored.
fn nested_value(value: &Value, registry: &FacetRegistry) -> Result<(String, Value), String> {
    let Value::Object(definition) = value else {
        return Err(error_consts::MALFORMED_NESTED_FACET.to_string());
    };
    let Some((facet_type, config)) = definition.iter().next() else {
        return Err(error_consts::NO_NESTED_FACET_TYPE.to_string());
    };
    if !registry.contains(facet_type) {
        return Err(format!("No facet type found for [{facet_type}]"));
    }
    if !config.is_object() {
        return Err(error_consts::MALFORMED_NESTED_FACET.to_string());
    }
    Ok((facet_type.clone(), config.clone()))
}
