//! Planner configuration.
//!
//! Every field has a default, so a partial JSON document or an empty
//! environment still yields a usable config (minus the depot).

use std::env;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::matrix_cache::MatrixCacheConfig;
use crate::model::Location;
use crate::osrm::OsrmConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Where every route starts and ends. Planning refuses to run without it.
    pub depot: Option<Location>,
    pub osrm: OsrmConfig,
    pub cache: MatrixCacheConfig,
    /// Load used when a shipment's pallets cannot be derived.
    pub default_pallets: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            depot: None,
            osrm: OsrmConfig::default(),
            cache: MatrixCacheConfig::default(),
            default_pallets: 1,
        }
    }
}

impl PlannerConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Defaults overlaid with environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|name| env::var(name).ok())
    }

    /// Applies overrides from a variable lookup. Depot coordinates only take
    /// effect when both are present.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lat = parse_var::<f64, _>(&lookup, "PLANNER_DEPOT_LAT")?;
        let lng = parse_var::<f64, _>(&lookup, "PLANNER_DEPOT_LNG")?;
        if let (Some(lat), Some(lng)) = (lat, lng) {
            self.depot = Some(Location::new(lat, lng));
        }

        if let Some(base_url) = lookup("OSRM_BASE_URL") {
            self.osrm.base_url = base_url;
        }
        if let Some(profile) = lookup("OSRM_PROFILE") {
            self.osrm.profile = profile;
        }
        if let Some(timeout) = parse_var(&lookup, "OSRM_TIMEOUT_SECS")? {
            self.osrm.timeout_secs = timeout;
        }
        if let Some(ttl) = parse_var(&lookup, "MATRIX_CACHE_TTL_SECS")? {
            self.cache.ttl_secs = ttl;
        }

        Ok(self)
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv {
                name: name.to_string(),
                value,
            }),
        None => Ok(None),
    }
}
