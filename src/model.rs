//! Planning entities shared by every stage of a run.

use serde::{Deserialize, Serialize};

pub type JobId = String;
pub type VehicleId = String;

/// Matrix index reserved for the depot.
pub const DEPOT_INDEX: usize = 0;

/// Geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A single delivery to be routed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub location: Location,
    /// 1-based position in the day's matrix.
    pub matrix_index: usize,
    pub pallets: u32,
    /// Earliest preferred time, minutes from midnight.
    pub time_window_start: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub capacity_pallets: u32,
}

impl Vehicle {
    pub fn new(id: impl Into<VehicleId>, capacity_pallets: u32) -> Self {
        Self {
            id: id.into(),
            capacity_pallets,
        }
    }
}

/// Directed travel matrix between the depot (index 0) and every job.
///
/// Durations are seconds, distances metres. A `None` cell means the
/// routing service found no path between the two points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub durations: Vec<Vec<Option<f64>>>,
    pub distances: Vec<Vec<Option<f64>>>,
}

impl Matrix {
    pub fn new(durations: Vec<Vec<Option<f64>>>, distances: Vec<Vec<Option<f64>>>) -> Self {
        Self {
            durations,
            distances,
        }
    }

    /// Builds a matrix where every cell is known.
    pub fn from_dense(durations: Vec<Vec<f64>>, distances: Vec<Vec<f64>>) -> Self {
        let wrap = |rows: Vec<Vec<f64>>| -> Vec<Vec<Option<f64>>> {
            rows.into_iter()
                .map(|row| row.into_iter().map(Some).collect())
                .collect()
        };
        Self::new(wrap(durations), wrap(distances))
    }

    pub fn size(&self) -> usize {
        self.durations.len()
    }

    pub fn duration(&self, from: usize, to: usize) -> Option<f64> {
        cell(&self.durations, from, to)
    }

    pub fn distance(&self, from: usize, to: usize) -> Option<f64> {
        cell(&self.distances, from, to)
    }

    /// True when both arrays are `size x size`.
    pub fn is_square(&self, size: usize) -> bool {
        let square = |rows: &Vec<Vec<Option<f64>>>| {
            rows.len() == size && rows.iter().all(|row| row.len() == size)
        };
        square(&self.durations) && square(&self.distances)
    }
}

fn cell(rows: &[Vec<Option<f64>>], from: usize, to: usize) -> Option<f64> {
    rows.get(from)
        .and_then(|row| row.get(to))
        .copied()
        .flatten()
        .filter(|value| value.is_finite())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub vehicle_id: VehicleId,
    pub job_ids: Vec<JobId>,
    pub total_pallets: u32,
    /// Seconds, including the return hop to the depot.
    pub total_duration: f64,
    /// Metres, including the return hop to the depot.
    pub total_distance: f64,
}

impl Route {
    pub fn empty(vehicle_id: VehicleId) -> Self {
        Self {
            vehicle_id,
            job_ids: Vec::new(),
            total_pallets: 0,
            total_duration: 0.0,
            total_distance: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.job_ids.is_empty()
    }
}

/// Why a job did not make it onto a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnassignedReason {
    /// Delivery location has no coordinates.
    MissingGeo,
    /// No vehicle had enough remaining capacity.
    Capacity,
    /// Allocated, but no path exists from the route's previous stop.
    Unreachable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnassignedEntry {
    pub job_id: JobId,
    pub reason: UnassignedReason,
}

impl UnassignedEntry {
    pub fn new(job_id: impl Into<JobId>, reason: UnassignedReason) -> Self {
        Self {
            job_id: job_id.into(),
            reason,
        }
    }
}

/// Output of one planning run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    pub routes: Vec<Route>,
    pub unassigned: Vec<UnassignedEntry>,
}

impl PlanResult {
    pub fn route_for(&self, vehicle_id: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.vehicle_id == vehicle_id)
    }

    /// Number of jobs accounted for, routed or not.
    pub fn job_count(&self) -> usize {
        self.routes.iter().map(|route| route.job_ids.len()).sum::<usize>() + self.unassigned.len()
    }
}
