//! Turns the day's shipments into routing jobs.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::load_rules::{LoadInput, derive_pallets};
use crate::model::{Job, Location, UnassignedEntry, UnassignedReason, VehicleId};
use crate::traits::ShipmentSource;

/// Shipment as projected from the external data store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipmentRecord {
    pub id: String,
    pub customer_key: String,
    /// Coordinates of the delivery location, if geocoded.
    pub location: Option<Location>,
    /// Pallet count reported by the pickup site.
    pub declared_pallets: Option<i64>,
    /// Pallet count entered by a dispatcher.
    pub pallet_override: Option<i64>,
    /// Raw fields as scraped from the source system.
    pub raw_load_metadata: Value,
    pub scheduled_date_time: Option<String>,
    pub archived: bool,
    pub assigned_vehicle: Option<VehicleId>,
    /// False for customers who collect their own freight.
    pub deliverable: bool,
}

/// Jobs for one date, split by whether they can be routed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobSet {
    pub routable: Vec<Job>,
    pub unroutable: Vec<UnassignedEntry>,
}

pub fn build_jobs<S>(source: &S, date: NaiveDate, default_pallets: u32) -> JobSet
where
    S: ShipmentSource + ?Sized,
{
    jobs_from_records(source.shipments_for(date), date, default_pallets)
}

/// Filters and converts records. Matrix indices are assigned from 1 in
/// output order.
pub fn jobs_from_records(records: Vec<ShipmentRecord>, date: NaiveDate, default_pallets: u32) -> JobSet {
    let mut set = JobSet::default();

    for record in records {
        if record.archived || record.assigned_vehicle.is_some() || !record.deliverable {
            continue;
        }

        let Some((scheduled_date, scheduled_time)) = record
            .scheduled_date_time
            .as_deref()
            .and_then(parse_schedule)
        else {
            debug!(shipment = %record.id, raw = ?record.scheduled_date_time, "skipping shipment without a readable schedule");
            continue;
        };
        if scheduled_date != date {
            continue;
        }

        let Some(location) = record.location.filter(is_valid_location) else {
            warn!(shipment = %record.id, customer = %record.customer_key, "shipment has no delivery coordinates");
            set.unroutable
                .push(UnassignedEntry::new(record.id, UnassignedReason::MissingGeo));
            continue;
        };

        let pallets = derive_pallets(&LoadInput {
            manual_override: record.pallet_override,
            site_pallets: record.declared_pallets,
            metadata: &record.raw_load_metadata,
        })
        .unwrap_or_else(|| {
            debug!(shipment = %record.id, default_pallets, "load could not be derived, using default");
            default_pallets
        });

        set.routable.push(Job {
            id: record.id,
            location,
            matrix_index: set.routable.len() + 1,
            pallets,
            time_window_start: scheduled_time.map(minutes_from_midnight),
        });
    }

    set
}

fn is_valid_location(location: &Location) -> bool {
    location.lat.is_finite()
        && location.lng.is_finite()
        && (-90.0..=90.0).contains(&location.lat)
        && (-180.0..=180.0).contains(&location.lng)
}

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Splits a scheduled date/time field into its date and optional
/// time-of-day. Offsets are ignored; the wall-clock time as written is kept.
pub fn parse_schedule(text: &str) -> Option<(NaiveDate, Option<NaiveTime>)> {
    let text = text.trim();

    if let Ok(stamp) = DateTime::parse_from_rfc3339(text) {
        let local = stamp.naive_local();
        return Some((local.date(), Some(local.time())));
    }

    for format in DATE_TIME_FORMATS {
        if let Ok(stamp) = NaiveDateTime::parse_from_str(text, format) {
            return Some((stamp.date(), Some(stamp.time())));
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|date| (date, None))
}

/// Minutes from midnight. Only called when the schedule carried a time,
/// so an explicit `00:00` is a real window.
fn minutes_from_midnight(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}
