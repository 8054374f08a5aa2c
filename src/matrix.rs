//! Day matrix between the depot and every job, served through the cache.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::error::MatrixError;
use crate::matrix_cache::{MatrixCache, cache_key};
use crate::model::{Job, Location, Matrix};
use crate::traits::TableSource;

/// Smallest table worth requesting: the depot and one job.
pub const MIN_COORDINATES: usize = 2;
/// Largest table a single request may carry; larger plans must batch.
pub const MAX_COORDINATES: usize = 200;

pub struct MatrixProvider<T: TableSource> {
    source: T,
    cache: Arc<MatrixCache>,
}

impl<T: TableSource> MatrixProvider<T> {
    pub fn new(source: T, cache: Arc<MatrixCache>) -> Self {
        Self { source, cache }
    }

    pub fn cache(&self) -> &MatrixCache {
        &self.cache
    }

    /// Matrix for the depot (index 0) and the jobs at their matrix indices.
    #[instrument(skip_all, fields(day = day_key, jobs = jobs.len()))]
    pub fn get_matrix(&self, depot: Location, jobs: &[Job], day_key: &str) -> Result<Matrix, MatrixError> {
        let locations = ordered_locations(depot, jobs)?;

        let count = locations.len();
        if !(MIN_COORDINATES..=MAX_COORDINATES).contains(&count) {
            return Err(MatrixError::SizeOutOfRange {
                count,
                min: MIN_COORDINATES,
                max: MAX_COORDINATES,
            });
        }

        let key = cache_key(day_key, &locations);
        if let Some(matrix) = self.cache.get(&key) {
            debug!("matrix cache hit");
            return Ok(matrix);
        }

        let matrix = self.source.table_for(&locations).inspect_err(|err| {
            warn!(error = %err, "matrix request failed");
        })?;
        if !matrix.is_square(count) {
            return Err(MatrixError::MalformedResponse(format!(
                "expected {count}x{count} tables"
            )));
        }

        info!(points = count, "matrix fetched");
        self.cache.insert(key, matrix.clone());
        Ok(matrix)
    }
}

/// Depot first, then jobs in matrix-index order. Indices must be exactly
/// `1..=jobs.len()` so that row `i` of the table belongs to index `i`.
fn ordered_locations(depot: Location, jobs: &[Job]) -> Result<Vec<Location>, MatrixError> {
    let mut ordered: Vec<&Job> = jobs.iter().collect();
    ordered.sort_by_key(|job| job.matrix_index);

    for (position, job) in ordered.iter().enumerate() {
        let expected = position + 1;
        if job.matrix_index != expected {
            return Err(MatrixError::InvalidJobIndex {
                job_id: job.id.clone(),
                found: job.matrix_index,
                expected,
            });
        }
    }

    Ok(std::iter::once(depot)
        .chain(ordered.into_iter().map(|job| job.location))
        .collect())
}
