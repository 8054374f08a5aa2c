//! Nearest-neighbour stop ordering for a single vehicle.

use tracing::warn;

use crate::model::{DEPOT_INDEX, Job, JobId, Matrix, Route, VehicleId};

/// A route plus the jobs that could not be reached from it.
#[derive(Debug, Clone, PartialEq)]
pub struct SequencedRoute {
    pub route: Route,
    pub unreachable: Vec<JobId>,
}

/// Orders stops by always driving to the closest remaining job, starting and
/// ending at the depot.
///
/// Ties go to the job that appears first in `jobs`. Missing matrix cells are
/// never chosen; once every remaining job is unreachable the tour stops and
/// those jobs come back in `unreachable`, outside the route's totals.
pub fn sequence(vehicle_id: VehicleId, jobs: &[Job], matrix: &Matrix) -> SequencedRoute {
    let mut remaining: Vec<&Job> = jobs.iter().collect();
    let mut route = Route::empty(vehicle_id);
    let mut current = DEPOT_INDEX;

    while !remaining.is_empty() {
        let mut best: Option<(usize, f64)> = None;
        for (position, job) in remaining.iter().enumerate() {
            let Some(duration) = matrix.duration(current, job.matrix_index) else {
                continue;
            };
            if best.is_none_or(|(_, best_duration)| duration < best_duration) {
                best = Some((position, duration));
            }
        }

        let Some((position, duration)) = best else {
            break;
        };
        let job = remaining.remove(position);

        route.total_duration += duration;
        route.total_distance += matrix.distance(current, job.matrix_index).unwrap_or(0.0);
        route.total_pallets += job.pallets;
        route.job_ids.push(job.id.clone());
        current = job.matrix_index;
    }

    if current != DEPOT_INDEX {
        match matrix.duration(current, DEPOT_INDEX) {
            Some(duration) => route.total_duration += duration,
            None => warn!(vehicle = %route.vehicle_id, "no return path to depot from last stop"),
        }
        route.total_distance += matrix.distance(current, DEPOT_INDEX).unwrap_or(0.0);
    }

    let unreachable: Vec<JobId> = remaining.into_iter().map(|job| job.id.clone()).collect();
    if !unreachable.is_empty() {
        warn!(vehicle = %route.vehicle_id, count = unreachable.len(), "stops unreachable from route");
    }

    SequencedRoute { route, unreachable }
}
