//! End-to-end planning tests
//!
//! Runs the full pipeline against in-memory shipment, vehicle and table
//! sources and checks the plan-wide guarantees.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDate;
use serde_json::json;

use delivery_planner::config::PlannerConfig;
use delivery_planner::error::{ErrorKind, MatrixError, PlanError};
use delivery_planner::haversine::HaversineTable;
use delivery_planner::jobs::ShipmentRecord;
use delivery_planner::matrix::MatrixProvider;
use delivery_planner::matrix_cache::{MatrixCache, MatrixCacheConfig};
use delivery_planner::model::{Location, Matrix, PlanResult, UnassignedReason, Vehicle};
use delivery_planner::planner::Planner;
use delivery_planner::traits::{ShipmentSource, TableSource, VehicleSource};

// ============================================================================
// Test Fixtures
// ============================================================================

const DATE: &str = "2024-03-15";

struct MockShipments(Vec<ShipmentRecord>);

impl ShipmentSource for MockShipments {
    fn shipments_for(&self, _date: NaiveDate) -> Vec<ShipmentRecord> {
        self.0.clone()
    }
}

struct MockVehicles(Vec<Vehicle>);

impl VehicleSource for MockVehicles {
    fn available_vehicles(&self, _date: NaiveDate) -> Vec<Vehicle> {
        self.0.clone()
    }
}

/// Serves a fixed matrix and counts requests.
struct FixedTable {
    matrix: Matrix,
    calls: Arc<AtomicUsize>,
}

impl TableSource for FixedTable {
    fn table_for(&self, _locations: &[Location]) -> Result<Matrix, MatrixError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.matrix.clone())
    }
}

struct DownTable;

impl TableSource for DownTable {
    fn table_for(&self, _locations: &[Location]) -> Result<Matrix, MatrixError> {
        Err(MatrixError::HttpStatus {
            status: 503,
            body: "upstream unavailable".to_string(),
        })
    }
}

fn shipment(id: &str, lat: f64, lng: f64, pallets: i64) -> ShipmentRecord {
    ShipmentRecord {
        id: id.to_string(),
        customer_key: "ACME".to_string(),
        location: Some(Location::new(lat, lng)),
        declared_pallets: Some(pallets),
        scheduled_date_time: Some(DATE.to_string()),
        deliverable: true,
        ..Default::default()
    }
}

fn config() -> PlannerConfig {
    PlannerConfig {
        depot: Some(Location::new(49.19, -123.18)),
        ..PlannerConfig::default()
    }
}

fn cache() -> Arc<MatrixCache> {
    Arc::new(MatrixCache::new(&MatrixCacheConfig::default()))
}

fn planner_with<T: TableSource>(
    config: &PlannerConfig,
    shipments: Vec<ShipmentRecord>,
    vehicles: Vec<Vehicle>,
    table: T,
) -> Planner<MockShipments, MockVehicles, T> {
    delivery_planner::logging::init_test();
    Planner::new(
        config,
        MockShipments(shipments),
        MockVehicles(vehicles),
        MatrixProvider::new(table, cache()),
    )
}

fn fixed(durations: Vec<Vec<f64>>) -> (FixedTable, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let table = FixedTable {
        matrix: Matrix::from_dense(durations.clone(), durations),
        calls: calls.clone(),
    };
    (table, calls)
}

/// A spread of stops around Metro Vancouver.
fn metro_shipments() -> Vec<ShipmentRecord> {
    let mut shipments = vec![
        shipment("richmond", 49.1666, -123.1336, 3),
        shipment("burnaby", 49.2488, -122.9805, 4),
        shipment("surrey", 49.1913, -122.8490, 6),
        shipment("downtown", 49.2827, -123.1207, 2),
        shipment("north-van", 49.3200, -123.0724, 5),
        shipment("delta", 49.0847, -123.0586, 8),
        shipment("coquitlam", 49.2838, -122.7932, 2),
        shipment("langley", 49.1044, -122.6604, 7),
    ];
    shipments[3].scheduled_date_time = Some(format!("{DATE} 09:30"));
    shipments[6].scheduled_date_time = Some(format!("{DATE} 07:45"));
    shipments.push(ShipmentRecord {
        location: None,
        ..shipment("no-geo", 0.0, 0.0, 1)
    });
    shipments.push(ShipmentRecord {
        raw_load_metadata: json!({ "packages": "0 of 2", "description": "Fresh Cut Flowers" }),
        declared_pallets: None,
        ..shipment("florist", 49.2030, -122.9110, 0)
    });
    shipments
}

fn assert_partition(result: &PlanResult, expected: &[&str]) {
    let mut seen = HashSet::new();
    for route in &result.routes {
        for job_id in &route.job_ids {
            assert!(seen.insert(job_id.clone()), "{job_id} appears twice");
        }
    }
    for entry in &result.unassigned {
        assert!(seen.insert(entry.job_id.clone()), "{} appears twice", entry.job_id);
    }
    let expected: HashSet<String> = expected.iter().map(|id| id.to_string()).collect();
    assert_eq!(seen, expected);
}

// ============================================================================
// Plan-wide guarantees
// ============================================================================

#[test]
fn every_job_is_accounted_for_exactly_once() {
    let shipments = metro_shipments();
    let vehicles = vec![Vehicle::new("van-1", 10), Vehicle::new("truck-1", 12)];
    let planner = planner_with(&config(), shipments.clone(), vehicles, HaversineTable::default());

    let result = planner.plan(DATE).unwrap();

    let ids: Vec<&str> = shipments.iter().map(|shipment| shipment.id.as_str()).collect();
    assert_partition(&result, &ids);
    assert_eq!(result.job_count(), shipments.len());
    assert!(
        result
            .unassigned
            .iter()
            .any(|entry| entry.job_id == "no-geo" && entry.reason == UnassignedReason::MissingGeo)
    );
}

#[test]
fn routes_respect_vehicle_capacity() {
    let vehicles = vec![Vehicle::new("van-1", 10), Vehicle::new("truck-1", 12)];
    let shipments = metro_shipments();
    let planner = planner_with(&config(), shipments.clone(), vehicles.clone(), HaversineTable::default());

    let result = planner.plan(DATE).unwrap();

    for vehicle in &vehicles {
        let route = result.route_for(&vehicle.id).unwrap();
        let declared: u32 = route
            .job_ids
            .iter()
            .map(|id| match id.as_str() {
                "florist" => 1,
                _ => shipments
                    .iter()
                    .find(|shipment| &shipment.id == id)
                    .and_then(|shipment| shipment.declared_pallets)
                    .unwrap() as u32,
            })
            .sum();
        assert_eq!(route.total_pallets, declared);
        assert!(route.total_pallets <= vehicle.capacity_pallets);
    }
    assert!(
        result
            .unassigned
            .iter()
            .any(|entry| entry.reason == UnassignedReason::Capacity)
    );
}

#[test]
fn route_duration_matches_matrix_hops() {
    let shipments = metro_shipments();
    let planner = planner_with(
        &config(),
        shipments.clone(),
        vec![Vehicle::new("big", 100)],
        HaversineTable::default(),
    );

    let result = planner.plan(DATE).unwrap();
    let route = result.route_for("big").unwrap();

    // Rebuild the day's locations in matrix order to recompute the hops.
    let depot = config().depot.unwrap();
    let routable: Vec<&ShipmentRecord> = shipments.iter().filter(|shipment| shipment.location.is_some()).collect();
    let mut locations = vec![depot];
    locations.extend(routable.iter().map(|shipment| shipment.location.unwrap()));
    let matrix = HaversineTable::default().table_for(&locations).unwrap();
    let index_of = |id: &str| 1 + routable.iter().position(|shipment| shipment.id == id).unwrap();

    let mut expected = 0.0;
    let mut current = 0;
    for job_id in &route.job_ids {
        let next = index_of(job_id.as_str());
        expected += matrix.duration(current, next).unwrap();
        current = next;
    }
    expected += matrix.duration(current, 0).unwrap();

    assert_eq!(route.job_ids.len(), routable.len());
    assert_eq!(route.total_duration, expected);
    let unique: HashSet<&String> = route.job_ids.iter().collect();
    assert_eq!(unique.len(), route.job_ids.len());
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn second_job_overflows_both_vehicles() {
    let shipments = vec![shipment("J1", 49.20, -123.10, 3), shipment("J2", 49.21, -123.11, 8)];
    let vehicles = vec![Vehicle::new("A", 10), Vehicle::new("B", 5)];
    let (table, _) = fixed(vec![
        vec![0.0, 60.0, 60.0],
        vec![60.0, 0.0, 60.0],
        vec![60.0, 60.0, 0.0],
    ]);
    let planner = planner_with(&config(), shipments, vehicles, table);

    let result = planner.plan(DATE).unwrap();

    assert_eq!(result.route_for("A").unwrap().job_ids, vec!["J1"]);
    assert!(result.route_for("B").unwrap().is_empty());
    assert_eq!(result.unassigned.len(), 1);
    assert_eq!(result.unassigned[0].job_id, "J2");
    assert_eq!(result.unassigned[0].reason, UnassignedReason::Capacity);
}

#[test]
fn nearest_neighbour_tour_over_fixed_matrix() {
    let shipments = vec![shipment("first", 49.20, -123.10, 1), shipment("second", 49.21, -123.11, 1)];
    let (table, _) = fixed(vec![
        vec![0.0, 300.0, 500.0],
        vec![300.0, 0.0, 100.0],
        vec![500.0, 100.0, 0.0],
    ]);
    let planner = planner_with(&config(), shipments, vec![Vehicle::new("A", 10)], table);

    let result = planner.plan(DATE).unwrap();
    let route = result.route_for("A").unwrap();

    assert_eq!(route.job_ids, vec!["first", "second"]);
    assert_eq!(route.total_duration, 900.0);
}

#[test]
fn early_time_window_wins_the_last_slot() {
    let mut late = shipment("late", 49.20, -123.10, 4);
    late.scheduled_date_time = Some(format!("{DATE} 14:00"));
    let mut early = shipment("early", 49.21, -123.11, 4);
    early.scheduled_date_time = Some(format!("{DATE} 08:00"));
    let (table, _) = fixed(vec![
        vec![0.0, 60.0, 60.0],
        vec![60.0, 0.0, 60.0],
        vec![60.0, 60.0, 0.0],
    ]);
    let planner = planner_with(&config(), vec![late, early], vec![Vehicle::new("A", 5)], table);

    let result = planner.plan(DATE).unwrap();

    assert_eq!(result.route_for("A").unwrap().job_ids, vec!["early"]);
    assert_eq!(result.unassigned[0].job_id, "late");
}

#[test]
fn unreachable_stop_is_reported_not_dropped() {
    let shipments = vec![shipment("mainland", 49.20, -123.10, 1), shipment("island", 48.43, -123.36, 1)];
    let calls = Arc::new(AtomicUsize::new(0));
    let table = FixedTable {
        matrix: Matrix::new(
            vec![
                vec![Some(0.0), Some(100.0), None],
                vec![Some(100.0), Some(0.0), None],
                vec![None, None, Some(0.0)],
            ],
            vec![
                vec![Some(0.0), Some(900.0), None],
                vec![Some(900.0), Some(0.0), None],
                vec![None, None, Some(0.0)],
            ],
        ),
        calls,
    };
    let planner = planner_with(&config(), shipments, vec![Vehicle::new("A", 10)], table);

    let result = planner.plan(DATE).unwrap();

    let route = result.route_for("A").unwrap();
    assert_eq!(route.job_ids, vec!["mainland"]);
    assert_eq!(route.total_pallets, 1);
    assert_partition(&result, &["mainland", "island"]);
    assert_eq!(result.unassigned[0].reason, UnassignedReason::Unreachable);
}

// ============================================================================
// Failures and degenerate runs
// ============================================================================

#[test]
fn missing_depot_is_rejected_before_work() {
    let (table, calls) = fixed(vec![vec![0.0]]);
    let planner = planner_with(
        &PlannerConfig::default(),
        vec![shipment("a", 49.2, -123.1, 1)],
        vec![Vehicle::new("A", 10)],
        table,
    );

    let err = planner.plan(DATE).unwrap_err();

    assert!(matches!(err, PlanError::DepotNotConfigured));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn invalid_date_is_rejected() {
    let (table, _) = fixed(vec![vec![0.0]]);
    let planner = planner_with(&config(), Vec::new(), Vec::new(), table);

    let err = planner.plan("15/03/2024").unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidDate);
}

#[test]
fn matrix_failure_aborts_the_run() {
    let planner = planner_with(
        &config(),
        vec![shipment("a", 49.2, -123.1, 1)],
        vec![Vehicle::new("A", 10)],
        DownTable,
    );

    let err = planner.plan(DATE).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MatrixTransportFailure);
    assert!(err.to_string().contains("503"));
}

#[test]
fn no_routable_jobs_skips_the_matrix() {
    let (table, calls) = fixed(vec![vec![0.0]]);
    let no_geo = ShipmentRecord {
        location: None,
        ..shipment("no-geo", 0.0, 0.0, 1)
    };
    let planner = planner_with(&config(), vec![no_geo], vec![Vehicle::new("A", 10)], table);

    let result = planner.plan(DATE).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(result.route_for("A").unwrap().is_empty());
    assert_eq!(result.unassigned[0].reason, UnassignedReason::MissingGeo);
}

#[test]
fn repeated_runs_reuse_the_cached_matrix() {
    let (table, calls) = fixed(vec![vec![0.0, 60.0], vec![60.0, 0.0]]);
    let planner = planner_with(
        &config(),
        vec![shipment("a", 49.2, -123.1, 1)],
        vec![Vehicle::new("A", 10)],
        table,
    );

    let first = planner.plan(DATE).unwrap();
    let second = planner.plan(DATE).unwrap();

    assert_eq!(first, second);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn plan_serializes_with_reason_codes() {
    let (table, _) = fixed(vec![vec![0.0, 60.0], vec![60.0, 0.0]]);
    let no_geo = ShipmentRecord {
        location: None,
        ..shipment("no-geo", 0.0, 0.0, 1)
    };
    let planner = planner_with(
        &config(),
        vec![shipment("a", 49.2, -123.1, 1), no_geo],
        vec![Vehicle::new("A", 10)],
        table,
    );

    let json = serde_json::to_value(planner.plan(DATE).unwrap()).unwrap();

    assert_eq!(json["routes"][0]["job_ids"], json!(["a"]));
    assert_eq!(json["routes"][0]["total_duration"], json!(120.0));
    assert_eq!(json["unassigned"][0]["reason"], json!("MISSING_GEO"));
}
