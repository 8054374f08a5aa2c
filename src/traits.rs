//! Seams to the planner's external collaborators.
//!
//! Data stores, the routing service and the clock all sit behind these
//! traits so a run can be driven from in-memory fixtures.

use std::time::Instant;

use chrono::NaiveDate;

use crate::error::MatrixError;
use crate::jobs::ShipmentRecord;
use crate::model::{Location, Matrix, Vehicle};

/// Read-only projection of shipments scheduled around a date.
pub trait ShipmentSource {
    fn shipments_for(&self, date: NaiveDate) -> Vec<ShipmentRecord>;
}

/// Read-only projection of vehicles that are on the road for a date.
pub trait VehicleSource {
    fn available_vehicles(&self, date: NaiveDate) -> Vec<Vehicle>;
}

/// Provides a duration/distance table for a set of locations.
///
/// The matrix is indexed by the provided location order.
pub trait TableSource {
    fn table_for(&self, locations: &[Location]) -> Result<Matrix, MatrixError>;
}

/// Time source for cache expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
