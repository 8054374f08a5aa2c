//! OSRM HTTP adapter for duration/distance tables.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::MatrixError;
use crate::model::{Location, Matrix};
use crate::traits::TableSource;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "driving".to_string(),
            timeout_secs: 20,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OsrmConfig {
        &self.config
    }

    /// Table URL with coordinates in OSRM's `lng,lat` order.
    pub fn table_url(&self, locations: &[Location]) -> String {
        let coords = locations
            .iter()
            .map(|location| format!("{:.6},{:.6}", location.lng, location.lat))
            .collect::<Vec<_>>()
            .join(";");

        format!(
            "{}/table/v1/{}/{}?annotations=duration,distance",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile,
            coords
        )
    }

    fn transport_error(&self, err: reqwest::Error) -> MatrixError {
        if err.is_timeout() {
            MatrixError::Timeout {
                timeout_secs: self.config.timeout_secs,
            }
        } else {
            MatrixError::Transport(err.to_string())
        }
    }
}

impl TableSource for OsrmClient {
    fn table_for(&self, locations: &[Location]) -> Result<Matrix, MatrixError> {
        let url = self.table_url(locations);
        debug!(points = locations.len(), "requesting OSRM table");

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| self.transport_error(err))?;
        let status = response.status();
        let body = response.text().map_err(|err| self.transport_error(err))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "OSRM table request rejected");
            // OSRM reports bad queries as 4xx with a JSON code/message.
            if let Ok(parsed) = serde_json::from_str::<OsrmTableResponse>(&body) {
                if parsed.code != "Ok" {
                    return Err(provider_error(parsed));
                }
            }
            return Err(MatrixError::HttpStatus {
                status: status.as_u16(),
                body: truncate(&body, 512),
            });
        }

        let parsed: OsrmTableResponse = serde_json::from_str(&body)
            .map_err(|err| MatrixError::MalformedResponse(format!("{}: {}", err, truncate(&body, 256))))?;

        into_matrix(parsed, locations.len())
    }
}

#[derive(Debug, Deserialize)]
struct OsrmTableResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    durations: Option<Vec<Vec<Option<f64>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<Option<f64>>>>,
}

fn provider_error(response: OsrmTableResponse) -> MatrixError {
    MatrixError::ProviderErrorCode {
        code: response.code,
        message: response.message.unwrap_or_default(),
    }
}

fn into_matrix(response: OsrmTableResponse, size: usize) -> Result<Matrix, MatrixError> {
    if response.code != "Ok" {
        return Err(provider_error(response));
    }

    let durations = response
        .durations
        .ok_or_else(|| MatrixError::MalformedResponse("missing durations".to_string()))?;
    let distances = response
        .distances
        .ok_or_else(|| MatrixError::MalformedResponse("missing distances".to_string()))?;

    let matrix = Matrix::new(durations, distances);
    if !matrix.is_square(size) {
        return Err(MatrixError::MalformedResponse(format!(
            "expected {size}x{size} tables"
        )));
    }

    Ok(matrix)
}

fn truncate(body: &str, limit: usize) -> String {
    match body.char_indices().nth(limit) {
        Some((end, _)) => format!("{}...", &body[..end]),
        None => body.to_string(),
    }
}
