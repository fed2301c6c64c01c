//! # Slot Mapper
//!
//! Expands a tier configuration into the grid of addressable slots and
//! answers occupancy/utilization questions about it.
//!
//! ## Slot Grid
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Vehicle VAN-1: 1000 kg / 10 m³, tiers Lower(3) + Upper(2) = 5 slots    │
//! │                                                                         │
//! │  Upper  ┌───────────┬───────────┐                                       │
//! │  (2)    │ #1  idx 3 │ #2  idx 4 │                                       │
//! │         ├───────────┼───────────┼───────────┐                           │
//! │  Lower  │ #1  idx 0 │ #2  idx 1 │ #3  idx 2 │                           │
//! │  (1)    └───────────┴───────────┴───────────┘                           │
//! │                                                                         │
//! │  Every slot: 1000 / 5 = 200 kg, 10 / 5 = 2 m³                           │
//! │  Key: "VAN-1::Lower::2"                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Uniform Division
//! Per-slot capacity is the vehicle total divided by the slot count across
//! ALL tiers, not per tier. The per-slot figure is a greedy-fit and display
//! aid; the authoritative capacity check is always the vehicle/tier
//! aggregate ([`validate_batch_capacity`], [`crate::payload`]).
//!
//! ## Immutability
//! Slots are regenerated from the tier layout on every call. There is no way
//! to add, remove or resize a slot; an existing assignment that points at a
//! slot the layout no longer has is reported as orphaned, never re-homed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, Violation};
use crate::measure::{count_utilization_pct, exceeds, ordered_sum, round_to, utilization_pct};
use crate::types::{payload_totals, AssignableItem, SlotAssignment, VehicleCapacity, VehicleSlot};
use crate::{BATCH_WARNING_PCT, SLOT_WARNING_RATIO};

// =============================================================================
// Slot Keys
// =============================================================================

/// Separator between the components of a slot key.
pub const SLOT_KEY_SEPARATOR: &str = "::";

/// Parsed components of a slot key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SlotKey {
    pub vehicle_id: String,
    pub tier_name: String,
    pub slot_number: u32,
}

/// Builds the canonical key for a slot.
///
/// ## Example
/// ```rust
/// use stowage_core::slots::{generate_slot_key, parse_slot_key};
///
/// let key = generate_slot_key("VAN-1", "Lower", 2);
/// assert_eq!(key, "VAN-1::Lower::2");
/// assert_eq!(parse_slot_key(&key).unwrap().slot_number, 2);
/// ```
pub fn generate_slot_key(vehicle_id: &str, tier_name: &str, slot_number: u32) -> String {
    format!(
        "{vehicle_id}{sep}{tier_name}{sep}{slot_number}",
        sep = SLOT_KEY_SEPARATOR
    )
}

/// Parses a key produced by [`generate_slot_key`].
///
/// The vehicle id runs up to the first separator and the slot number follows
/// the last one, so tier names may themselves contain the separator.
pub fn parse_slot_key(key: &str) -> CoreResult<SlotKey> {
    let invalid = |reason: &str| CoreError::InvalidSlotKey {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    let (vehicle_id, rest) = key
        .split_once(SLOT_KEY_SEPARATOR)
        .ok_or_else(|| invalid("expected 3 components"))?;
    let (tier_name, slot_number) = rest
        .rsplit_once(SLOT_KEY_SEPARATOR)
        .ok_or_else(|| invalid("expected 3 components"))?;

    if slot_number.is_empty() || !slot_number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("slot number is not a positive integer"));
    }
    let slot_number: u32 = slot_number
        .parse()
        .map_err(|_| invalid("slot number is out of range"))?;
    if slot_number == 0 {
        return Err(invalid("slot numbers start at 1"));
    }

    Ok(SlotKey {
        vehicle_id: vehicle_id.to_string(),
        tier_name: tier_name.to_string(),
        slot_number,
    })
}

// =============================================================================
// Utilization Summaries
// =============================================================================

/// Occupancy and load for one tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TierUtilization {
    pub tier_name: String,
    pub tier_order: u32,
    pub total_slots: u32,
    pub occupied_slots: u32,

    /// Count-based (occupied / total), 1 decimal.
    pub utilization_pct: f64,

    /// Resolved tier budget.
    pub budget_kg: f64,
    pub budget_m3: f64,

    /// Load of the assignments occupying this tier.
    pub loaded_kg: f64,
    pub loaded_m3: f64,
}

/// Occupancy for the whole vehicle plus a per-tier breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SlotUtilization {
    pub total_slots: u32,
    pub occupied_slots: u32,
    pub available_slots: u32,

    /// Count-based (occupied / total), 1 decimal.
    pub utilization_pct: f64,

    pub tiers: Vec<TierUtilization>,
}

// =============================================================================
// Slot Map
// =============================================================================

/// The derived slot grid of one vehicle for one snapshot of assignments.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotMap {
    vehicle: VehicleCapacity,
    slots: Vec<VehicleSlot>,
    placed: Vec<SlotAssignment>,
    orphaned: Vec<SlotAssignment>,
}

/// Builds the slot map for `vehicle` given the `existing` assignment snapshot.
pub fn slot_map(vehicle: &VehicleCapacity, existing: &[SlotAssignment]) -> SlotMap {
    SlotMap::build(vehicle, existing)
}

impl SlotMap {
    /// Generates the slots tier by tier (ascending order), then marks the
    /// ones named by `existing`.
    pub fn build(vehicle: &VehicleCapacity, existing: &[SlotAssignment]) -> Self {
        let total_slots = vehicle.total_slot_count();
        let (slot_kg, slot_m3) = if total_slots == 0 {
            (0.0, 0.0)
        } else {
            (
                vehicle.capacity_kg / total_slots as f64,
                vehicle.capacity_m3 / total_slots as f64,
            )
        };

        let mut slots = Vec::with_capacity(total_slots as usize);
        for tier in vehicle.sorted_tiers() {
            for slot_number in 1..=tier.slot_count {
                slots.push(VehicleSlot {
                    vehicle_id: vehicle.id.clone(),
                    tier_name: tier.name.clone(),
                    tier_order: tier.order,
                    slot_number,
                    global_index: slots.len() as u32,
                    capacity_kg: slot_kg,
                    capacity_m3: slot_m3,
                    occupied: false,
                    occupant_id: None,
                });
            }
        }

        let index: HashMap<String, usize> = slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (slot.key(), i))
            .collect();

        let mut placed = Vec::new();
        let mut orphaned = Vec::new();
        for assignment in existing.iter().filter(|a| a.vehicle_id == vehicle.id) {
            match index.get(&assignment.slot_key()) {
                Some(&i) => {
                    let slot = &mut slots[i];
                    // First claim wins; double claims surface via find_slot_conflicts.
                    if !slot.occupied {
                        slot.occupied = true;
                        slot.occupant_id = Some(assignment.item_id.clone());
                    }
                    placed.push(assignment.clone());
                }
                None => orphaned.push(assignment.clone()),
            }
        }

        SlotMap {
            vehicle: vehicle.clone(),
            slots,
            placed,
            orphaned,
        }
    }

    /// All slots in tier order.
    pub fn slots(&self) -> &[VehicleSlot] {
        &self.slots
    }

    /// Consumes the map, returning the owned slot list.
    pub fn into_slots(self) -> Vec<VehicleSlot> {
        self.slots
    }

    pub fn available(&self) -> Vec<&VehicleSlot> {
        self.slots.iter().filter(|s| !s.occupied).collect()
    }

    pub fn occupied(&self) -> Vec<&VehicleSlot> {
        self.slots.iter().filter(|s| s.occupied).collect()
    }

    pub fn available_count(&self) -> u32 {
        self.slots.iter().filter(|s| !s.occupied).count() as u32
    }

    /// Slots of one tier (name matched case-insensitively).
    pub fn by_tier(&self, tier_name: &str) -> Vec<&VehicleSlot> {
        let wanted = tier_name.to_lowercase();
        self.slots
            .iter()
            .filter(|s| s.tier_name.to_lowercase() == wanted)
            .collect()
    }

    /// Looks up a slot by its key.
    pub fn find(&self, key: &str) -> Option<&VehicleSlot> {
        self.slots.iter().find(|s| s.key() == key)
    }

    /// Existing assignments that point at slots this layout does not have.
    pub fn orphaned_assignments(&self) -> &[SlotAssignment] {
        &self.orphaned
    }

    /// Orphaned assignments rendered as warnings.
    pub fn orphan_warnings(&self) -> Vec<String> {
        self.orphaned
            .iter()
            .map(|a| {
                Violation::OrphanedAssignment {
                    item_id: a.item_id.clone(),
                    slot_key: a.slot_key(),
                }
                .to_string()
            })
            .collect()
    }

    /// Load already placed in the vehicle by the matched existing assignments.
    pub fn placed_load(&self) -> (f64, f64) {
        (
            ordered_sum(self.placed.iter().map(|a| a.weight_kg)),
            ordered_sum(self.placed.iter().map(|a| a.volume_m3)),
        )
    }

    /// Count-based utilization overall and per tier, plus per-tier loads.
    pub fn utilization(&self) -> SlotUtilization {
        let total = self.slots.len() as u32;
        let occupied = self.slots.iter().filter(|s| s.occupied).count() as u32;

        let tiers = self
            .vehicle
            .sorted_tiers()
            .into_iter()
            .map(|tier| {
                let tier_slots = self.slots.iter().filter(|s| s.tier_name == tier.name);
                let tier_total = tier.slot_count;
                let tier_occupied = tier_slots.filter(|s| s.occupied).count() as u32;
                let in_tier = || self.placed.iter().filter(|a| a.tier_name == tier.name);
                let loaded_kg = ordered_sum(in_tier().map(|a| a.weight_kg));
                let loaded_m3 = ordered_sum(in_tier().map(|a| a.volume_m3));

                TierUtilization {
                    tier_name: tier.name.clone(),
                    tier_order: tier.order,
                    total_slots: tier_total,
                    occupied_slots: tier_occupied,
                    utilization_pct: count_utilization_pct(tier_occupied, tier_total),
                    budget_kg: tier.resolved_weight_kg(self.vehicle.capacity_kg),
                    budget_m3: tier.resolved_volume_m3(self.vehicle.capacity_m3),
                    loaded_kg: round_to(loaded_kg, 2),
                    loaded_m3: round_to(loaded_m3, 2),
                }
            })
            .collect();

        SlotUtilization {
            total_slots: total,
            occupied_slots: occupied,
            available_slots: total - occupied,
            utilization_pct: count_utilization_pct(occupied, total),
            tiers,
        }
    }
}

// =============================================================================
// Single-Slot Check
// =============================================================================

/// Outcome of testing one item against one slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SlotValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Checks whether `item` may go into `slot`.
///
/// ## Rules
/// - Occupied slot → error
/// - Item weight or volume above slot capacity → error
/// - Item weight or volume above 90% of slot capacity → warning
pub fn validate_slot_assignment(item: &AssignableItem, slot: &VehicleSlot) -> SlotValidation {
    let slot_key = slot.key();
    let mut result = SlotValidation::default();

    if slot.occupied {
        result.errors.push(
            Violation::SlotAlreadyOccupied {
                slot_key: slot_key.clone(),
                occupant: slot
                    .occupant_id
                    .clone()
                    .unwrap_or_else(|| "another item".to_string()),
            }
            .to_string(),
        );
    }

    for (dimension, load, capacity) in [
        ("weight", item.total_weight_kg(), slot.capacity_kg),
        ("volume", item.total_volume_m3(), slot.capacity_m3),
    ] {
        if exceeds(load, capacity) {
            result.errors.push(
                Violation::SlotCapacityExceeded {
                    item_id: item.id.clone(),
                    slot_key: slot_key.clone(),
                    dimension: dimension.to_string(),
                    load: round_to(load, 2),
                    capacity: round_to(capacity, 2),
                }
                .to_string(),
            );
        } else if load > capacity * SLOT_WARNING_RATIO {
            result.warnings.push(
                Violation::SlotNearCapacity {
                    item_id: item.id.clone(),
                    slot_key: slot_key.clone(),
                    dimension: dimension.to_string(),
                    utilization: round_to(utilization_pct(load, capacity), 1),
                }
                .to_string(),
            );
        }
    }

    result.is_valid = result.errors.is_empty();
    result
}

// =============================================================================
// Batch Check
// =============================================================================

/// Outcome of the aggregate slot/capacity check for a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BatchValidation {
    pub is_valid: bool,
    pub required_slots: u32,
    pub available_slots: u32,

    /// Existing placed load plus the batch (kg / m³).
    pub total_weight_kg: f64,
    pub total_volume_m3: f64,

    pub weight_utilization_pct: f64,
    pub volume_utilization_pct: f64,

    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Checks a batch of items against a vehicle before placement.
///
/// ## Rules
/// - More items than available slots → error
/// - Aggregate weight/volume above vehicle totals → error (no tolerance)
/// - Above 95% of either dimension → warning
///
/// Load already placed by `existing` counts toward the aggregate.
pub fn validate_batch_capacity(
    vehicle: &VehicleCapacity,
    items: &[AssignableItem],
    existing: &[SlotAssignment],
) -> BatchValidation {
    let map = SlotMap::build(vehicle, existing);
    let available = map.available_count();
    let required = items.len() as u32;

    let (placed_kg, placed_m3) = map.placed_load();
    let (batch_kg, batch_m3) = payload_totals(items);
    let total_kg = placed_kg + batch_kg;
    let total_m3 = placed_m3 + batch_m3;

    let weight_pct = utilization_pct(total_kg, vehicle.capacity_kg);
    let volume_pct = utilization_pct(total_m3, vehicle.capacity_m3);

    let mut errors = Vec::new();
    let mut warnings = map.orphan_warnings();

    if required > available {
        errors.push(Violation::InsufficientSlots { required, available }.to_string());
    }

    for (dimension, unit, total, capacity, pct) in [
        ("Weight", "kg", total_kg, vehicle.capacity_kg, weight_pct),
        ("Volume", "m³", total_m3, vehicle.capacity_m3, volume_pct),
    ] {
        if exceeds(total, capacity) {
            errors.push(
                Violation::CapacityExceeded {
                    dimension: dimension.to_string(),
                    unit: unit.to_string(),
                    total: round_to(total, 2),
                    capacity,
                    excess: round_to(total - capacity, 2),
                }
                .to_string(),
            );
        } else if pct > BATCH_WARNING_PCT {
            warnings.push(
                Violation::NearCapacity {
                    dimension: dimension.to_string(),
                    utilization: round_to(pct, 1),
                }
                .to_string(),
            );
        }
    }

    BatchValidation {
        is_valid: errors.is_empty(),
        required_slots: required,
        available_slots: available,
        total_weight_kg: round_to(total_kg, 2),
        total_volume_m3: round_to(total_m3, 2),
        weight_utilization_pct: round_to(weight_pct, 1),
        volume_utilization_pct: round_to(volume_pct, 1),
        errors,
        warnings,
    }
}

// =============================================================================
// Conflict Detection
// =============================================================================

/// A slot claimed by more than one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SlotConflict {
    pub slot_key: String,
    pub item_ids: Vec<String>,
}

impl SlotConflict {
    pub fn to_violation(&self) -> Violation {
        Violation::SlotConflict {
            slot_key: self.slot_key.clone(),
            item_ids: self.item_ids.clone(),
        }
    }
}

/// Reports every slot key claimed by more than one assignment, in order of
/// first appearance. Conflicts are reported, never resolved.
pub fn find_slot_conflicts(assignments: &[SlotAssignment]) -> Vec<SlotConflict> {
    let mut order: Vec<String> = Vec::new();
    let mut claims: HashMap<String, Vec<String>> = HashMap::new();

    for assignment in assignments {
        let key = assignment.slot_key();
        let entry = claims.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            Vec::new()
        });
        entry.push(assignment.item_id.clone());
    }

    order
        .into_iter()
        .filter_map(|key| {
            let item_ids = claims.remove(&key)?;
            (item_ids.len() > 1).then_some(SlotConflict {
                slot_key: key,
                item_ids,
            })
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
