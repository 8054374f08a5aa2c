//! Great-circle table source for offline planning.
//!
//! Straight-line distance at an assumed speed. Ignores roads, so it is only
//! used when configured explicitly, never as a silent stand-in for OSRM.

use crate::error::MatrixError;
use crate::model::{Location, Matrix};
use crate::traits::TableSource;

/// Average driving speed assumption for time estimation.
const DEFAULT_SPEED_KMH: f64 = 40.0;

/// Earth radius in metres.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone)]
pub struct HaversineTable {
    /// Assumed average driving speed in km/h.
    pub speed_kmh: f64,
}

impl Default for HaversineTable {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
        }
    }
}

impl HaversineTable {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }

    fn haversine_m(from: Location, to: Location) -> f64 {
        let lat1_rad = from.lat.to_radians();
        let lat2_rad = to.lat.to_radians();
        let delta_lat = (to.lat - from.lat).to_radians();
        let delta_lng = (to.lng - from.lng).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_M * c
    }

    fn metres_to_seconds(&self, metres: f64) -> f64 {
        (metres / 1000.0 / self.speed_kmh * 3600.0).round()
    }
}

impl TableSource for HaversineTable {
    fn table_for(&self, locations: &[Location]) -> Result<Matrix, MatrixError> {
        let n = locations.len();
        let mut durations = vec![vec![0.0; n]; n];
        let mut distances = vec![vec![0.0; n]; n];

        for (i, from) in locations.iter().enumerate() {
            for (j, to) in locations.iter().enumerate() {
                if i != j {
                    let metres = Self::haversine_m(*from, *to).round();
                    distances[i][j] = metres;
                    durations[i][j] = self.metres_to_seconds(metres);
                }
            }
        }

        Ok(Matrix::from_dense(durations, distances))
    }
}
