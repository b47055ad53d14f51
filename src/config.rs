use crate::error::{FacetError, FacetResult};
use crate::facets::FacetRegistry;
use crate::histogram::Recycler;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_TERMS_SIZE: usize = 10;

pub const POOL_MAX_IDLE_MIN: usize = 0;
pub const POOL_MAX_IDLE_MAX: usize = 4096;
pub const POOL_MAX_IDLE_DEFAULT: usize = 64;

pub const POOL_MAX_RETAINED_CAPACITY_MIN: usize = 16;
pub const POOL_MAX_RETAINED_CAPACITY_MAX: usize = 16 * 1024 * 1024;
pub const POOL_MAX_RETAINED_CAPACITY_DEFAULT: usize = 64 * 1024;

/// Crate wide settings. Every field has a default, so a partial JSON object is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacetSettings {
    /// Number of terms reported by a `terms` facet that does not set `size`.
    pub default_terms_size: usize,
    /// Idle tables kept per pool.
    pub pool_max_idle: usize,
    /// Tables grown beyond this many entries are dropped instead of pooled.
    pub pool_max_retained_capacity: usize,
}

impl Default for FacetSettings {
    fn default() -> Self {
        Self {
            default_terms_size: DEFAULT_TERMS_SIZE,
            pool_max_idle: POOL_MAX_IDLE_DEFAULT,
            pool_max_retained_capacity: POOL_MAX_RETAINED_CAPACITY_DEFAULT,
        }
    }
}

impl FacetSettings {
    pub fn from_json(value: &serde_json::Value) -> FacetResult<Self> {
        let settings = FacetSettings::deserialize(value)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> FacetResult {
        check_range(
            "pool_max_idle",
            self.pool_max_idle,
            POOL_MAX_IDLE_MIN,
            POOL_MAX_IDLE_MAX,
        )?;
        check_range(
            "pool_max_retained_capacity",
            self.pool_max_retained_capacity,
            POOL_MAX_RETAINED_CAPACITY_MIN,
            POOL_MAX_RETAINED_CAPACITY_MAX,
        )?;
        if self.default_terms_size == 0 {
            return Err(FacetError::Configuration(
                "\"default_terms_size\" must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_range(name: &str, value: usize, min: usize, max: usize) -> FacetResult {
    if value < min || value > max {
        return Err(FacetError::Configuration(format!(
            "Invalid value ({value}) for \"{name}\". Must be in the range [{min}, {max}]"
        )));
    }
    Ok(())
}

lazy_static! {
    pub static ref DEFAULT_RECYCLER: Recycler = Recycler::new(&FacetSettings::default());
    pub static ref DEFAULT_REGISTRY: Arc<FacetRegistry> = Arc::new(FacetRegistry::with_defaults());
}
