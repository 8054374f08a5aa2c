//! Planning run: jobs, matrix, allocation and sequencing for one date.

use std::sync::Arc;

use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::{info, instrument};

use crate::allocator::allocate;
use crate::config::PlannerConfig;
use crate::error::{ConfigError, PlanError};
use crate::jobs::build_jobs;
use crate::matrix::MatrixProvider;
use crate::matrix_cache::MatrixCache;
use crate::model::{Location, PlanResult, Route, UnassignedEntry, UnassignedReason};
use crate::osrm::OsrmClient;
use crate::sequencer::{SequencedRoute, sequence};
use crate::traits::{ShipmentSource, TableSource, VehicleSource};

pub struct Planner<S, V, T: TableSource> {
    depot: Option<Location>,
    default_pallets: u32,
    shipments: S,
    vehicles: V,
    matrix: MatrixProvider<T>,
}

impl<S, V> Planner<S, V, OsrmClient>
where
    S: ShipmentSource,
    V: VehicleSource,
{
    /// Planner backed by the configured OSRM service and a shared cache.
    pub fn with_osrm(
        config: &PlannerConfig,
        shipments: S,
        vehicles: V,
        cache: Arc<MatrixCache>,
    ) -> Result<Self, ConfigError> {
        let client = OsrmClient::new(config.osrm.clone())?;
        Ok(Self::new(config, shipments, vehicles, MatrixProvider::new(client, cache)))
    }
}

impl<S, V, T> Planner<S, V, T>
where
    S: ShipmentSource,
    V: VehicleSource,
    T: TableSource,
{
    pub fn new(config: &PlannerConfig, shipments: S, vehicles: V, matrix: MatrixProvider<T>) -> Self {
        Self {
            depot: config.depot,
            default_pallets: config.default_pallets.max(1),
            shipments,
            vehicles,
            matrix,
        }
    }

    /// Plans the given `YYYY-MM-DD` date.
    pub fn plan(&self, date: &str) -> Result<PlanResult, PlanError> {
        let depot = self.depot.ok_or(PlanError::DepotNotConfigured)?;
        let date = parse_date(date)?;
        self.plan_date(depot, date)
    }

    #[instrument(skip(self, depot))]
    fn plan_date(&self, depot: Location, date: NaiveDate) -> Result<PlanResult, PlanError> {
        let job_set = build_jobs(&self.shipments, date, self.default_pallets);
        let vehicles = self.vehicles.available_vehicles(date);
        let mut unassigned = job_set.unroutable;

        if job_set.routable.is_empty() {
            info!(vehicles = vehicles.len(), unroutable = unassigned.len(), "nothing to route");
            let routes = vehicles
                .into_iter()
                .map(|vehicle| Route::empty(vehicle.id))
                .collect();
            return Ok(PlanResult { routes, unassigned });
        }

        let day_key = date.format("%Y-%m-%d").to_string();
        let matrix = self.matrix.get_matrix(depot, &job_set.routable, &day_key)?;

        let allocation = allocate(&vehicles, &job_set.routable);
        unassigned.extend(allocation.unassigned);

        let sequenced: Vec<SequencedRoute> = allocation
            .loads
            .into_par_iter()
            .map(|load| sequence(load.vehicle_id, &load.jobs, &matrix))
            .collect();

        let mut routes = Vec::with_capacity(sequenced.len());
        for SequencedRoute { route, unreachable } in sequenced {
            unassigned.extend(
                unreachable
                    .into_iter()
                    .map(|job_id| UnassignedEntry::new(job_id, UnassignedReason::Unreachable)),
            );
            routes.push(route);
        }

        info!(
            jobs = job_set.routable.len(),
            vehicles = routes.len(),
            routed = routes.iter().map(|route| route.job_ids.len()).sum::<usize>(),
            unassigned = unassigned.len(),
            "plan complete"
        );

        Ok(PlanResult { routes, unassigned })
    }
}

fn parse_date(input: &str) -> Result<NaiveDate, PlanError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| PlanError::InvalidDate {
        input: input.to_string(),
    })
}
