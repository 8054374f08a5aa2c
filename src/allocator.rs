//! Greedy first-fit of jobs onto vehicles by pallet capacity.

use tracing::debug;

use crate::model::{Job, UnassignedEntry, UnassignedReason, Vehicle, VehicleId};

/// Jobs loaded onto one vehicle, in allocation order.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleLoad {
    pub vehicle_id: VehicleId,
    pub capacity_pallets: u32,
    pub jobs: Vec<Job>,
}

impl VehicleLoad {
    pub fn pallets(&self) -> u32 {
        self.jobs.iter().map(|job| job.pallets).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Allocation {
    /// One entry per vehicle, in the caller's vehicle order.
    pub loads: Vec<VehicleLoad>,
    pub unassigned: Vec<UnassignedEntry>,
}

impl Allocation {
    pub fn load_for(&self, vehicle_id: &str) -> Option<&VehicleLoad> {
        self.loads.iter().find(|load| load.vehicle_id == vehicle_id)
    }
}

/// Jobs with a time preference go first, earliest first; the rest keep
/// their relative order. Each job takes the first vehicle that still has
/// room for it.
pub fn allocate(vehicles: &[Vehicle], jobs: &[Job]) -> Allocation {
    let mut loads: Vec<VehicleLoad> = vehicles
        .iter()
        .map(|vehicle| VehicleLoad {
            vehicle_id: vehicle.id.clone(),
            capacity_pallets: vehicle.capacity_pallets,
            jobs: Vec::new(),
        })
        .collect();
    let mut remaining: Vec<u32> = vehicles.iter().map(|vehicle| vehicle.capacity_pallets).collect();
    let mut unassigned = Vec::new();

    for job in allocation_order(jobs) {
        let slot = remaining.iter().position(|capacity| *capacity >= job.pallets);
        match slot {
            Some(slot) => {
                remaining[slot] -= job.pallets;
                loads[slot].jobs.push(job.clone());
            }
            None => {
                debug!(job = %job.id, pallets = job.pallets, "no vehicle has room");
                unassigned.push(UnassignedEntry::new(job.id.clone(), UnassignedReason::Capacity));
            }
        }
    }

    Allocation { loads, unassigned }
}

fn allocation_order(jobs: &[Job]) -> Vec<&Job> {
    let (mut windowed, open): (Vec<&Job>, Vec<&Job>) =
        jobs.iter().partition(|job| job.time_window_start.is_some());
    windowed.sort_by_key(|job| job.time_window_start);
    windowed.extend(open);
    windowed
}
