//! # Domain Types
//!
//! Core domain types used throughout Stowage.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ VehicleCapacity │   │   TierConfig    │   │ AssignableItem  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │──►│  name (unique)  │   │  id             │       │
//! │  │  capacity_kg    │   │  order (1..N)   │   │  weight_kg      │       │
//! │  │  capacity_m3    │   │  slot_count     │   │  volume_m3      │       │
//! │  │  category_code  │   │  weight / pct   │   │  priority       │       │
//! │  │  tiers          │   │  volume / pct   │   │  fragile        │       │
//! │  └─────────────────┘   └────────┬────────┘   └────────┬────────┘       │
//! │                                 │ expands to          │ placed into    │
//! │                                 ▼                     ▼                │
//! │                        ┌─────────────────┐   ┌─────────────────┐       │
//! │                        │  VehicleSlot    │◄──│ SlotAssignment  │       │
//! │                        │  (derived)      │   │  (one per slot) │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership
//! `VehicleCapacity` and its tiers come from the vehicle registry and are
//! read-only here. `VehicleSlot`s are regenerated from the tiers on every
//! query and never stored. `SlotAssignment`s are handed back to the caller,
//! who persists them and passes them in again as the existing snapshot.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::measure::ordered_sum;
use crate::slots::generate_slot_key;

// =============================================================================
// Vehicle Capacity
// =============================================================================

/// A vehicle's total capacity and (optionally) its tier layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct VehicleCapacity {
    /// Vehicle identifier from the registry.
    pub id: String,

    /// Total weight capacity in kilograms.
    pub capacity_kg: f64,

    /// Total volume capacity in cubic meters.
    pub capacity_m3: f64,

    /// Vehicle class code (e.g. "van", "truck"). Unknown codes fall back to
    /// the default constraint entry.
    #[serde(default)]
    pub category_code: Option<String>,

    /// Tier layout. Empty means the vehicle has no tiered configuration.
    #[serde(default)]
    pub tiers: Vec<TierConfig>,
}

impl VehicleCapacity {
    /// Creates an untiered vehicle.
    pub fn new(id: impl Into<String>, capacity_kg: f64, capacity_m3: f64) -> Self {
        VehicleCapacity {
            id: id.into(),
            capacity_kg,
            capacity_m3,
            category_code: None,
            tiers: Vec::new(),
        }
    }

    /// Sets the tier layout.
    pub fn with_tiers(mut self, tiers: Vec<TierConfig>) -> Self {
        self.tiers = tiers;
        self
    }

    /// Sets the vehicle class code.
    pub fn with_category(mut self, code: impl Into<String>) -> Self {
        self.category_code = Some(code.into());
        self
    }

    /// Returns true if a tier layout is configured.
    #[inline]
    pub fn has_tiers(&self) -> bool {
        !self.tiers.is_empty()
    }

    /// Total number of slots across all tiers.
    pub fn total_slot_count(&self) -> u32 {
        self.tiers.iter().map(|t| t.slot_count).sum()
    }

    /// Tiers sorted by ascending tier order (ties keep declaration order).
    pub fn sorted_tiers(&self) -> Vec<&TierConfig> {
        let mut tiers: Vec<&TierConfig> = self.tiers.iter().collect();
        tiers.sort_by_key(|t| t.order);
        tiers
    }
}

// =============================================================================
// Tier Config
// =============================================================================

/// One horizontal compartment of the cargo hold.
///
/// ## Absolute vs. Percentage
/// A tier may carry absolute capacities, percentages of the vehicle totals,
/// or both. Once an absolute value is present it is authoritative; the
/// percentage is advisory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TierConfig {
    /// Tier name, unique within a vehicle (case-insensitive).
    pub name: String,

    /// Sequential order starting at 1 (1 = lowest tier).
    pub order: u32,

    /// Number of slots in this tier.
    pub slot_count: u32,

    /// Absolute weight budget (kg).
    #[serde(default)]
    pub weight_kg: Option<f64>,

    /// Absolute volume budget (m³).
    #[serde(default)]
    pub volume_m3: Option<f64>,

    /// Weight budget as a percentage of the vehicle total.
    #[serde(default)]
    pub weight_pct: Option<f64>,

    /// Volume budget as a percentage of the vehicle total.
    #[serde(default)]
    pub volume_pct: Option<f64>,
}

impl TierConfig {
    /// Creates a tier with no capacity figures yet.
    pub fn new(name: impl Into<String>, order: u32, slot_count: u32) -> Self {
        TierConfig {
            name: name.into(),
            order,
            slot_count,
            weight_kg: None,
            volume_m3: None,
            weight_pct: None,
            volume_pct: None,
        }
    }

    /// Sets absolute weight and volume budgets.
    pub fn with_capacity(mut self, weight_kg: f64, volume_m3: f64) -> Self {
        self.weight_kg = Some(weight_kg);
        self.volume_m3 = Some(volume_m3);
        self
    }

    /// Sets percentage budgets.
    pub fn with_percentages(mut self, weight_pct: f64, volume_pct: f64) -> Self {
        self.weight_pct = Some(weight_pct);
        self.volume_pct = Some(volume_pct);
        self
    }

    /// Effective weight budget: the absolute value, else the percentage of
    /// `vehicle_kg`, else zero.
    pub fn resolved_weight_kg(&self, vehicle_kg: f64) -> f64 {
        self.weight_kg
            .or_else(|| self.weight_pct.map(|pct| (pct / 100.0 * vehicle_kg).round()))
            .unwrap_or(0.0)
    }

    /// Effective volume budget, resolved the same way as weight.
    pub fn resolved_volume_m3(&self, vehicle_m3: f64) -> f64 {
        self.volume_m3
            .or_else(|| {
                self.volume_pct
                    .map(|pct| crate::measure::round_to(pct / 100.0 * vehicle_m3, 2))
            })
            .unwrap_or(0.0)
    }
}

// =============================================================================
// Assignable Item
// =============================================================================

/// A unit of cargo (a facility delivery) waiting to be placed.
///
/// Weight and volume are estimates computed upstream; they are consumed
/// as facts and never recomputed here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AssignableItem {
    /// Item identifier (facility / requisition line).
    pub id: String,

    /// Estimated weight of one unit (kg).
    pub weight_kg: f64,

    /// Estimated volume of one unit (m³).
    pub volume_m3: f64,

    /// Higher is more urgent.
    #[serde(default)]
    pub priority: i32,

    /// Fragile cargo flag.
    #[serde(default)]
    pub fragile: bool,

    /// Number of identical units. An item still occupies a single slot.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

impl AssignableItem {
    /// Creates a non-fragile, priority-0, single-unit item.
    pub fn new(id: impl Into<String>, weight_kg: f64, volume_m3: f64) -> Self {
        AssignableItem {
            id: id.into(),
            weight_kg,
            volume_m3,
            priority: 0,
            fragile: false,
            quantity: default_quantity(),
        }
    }

    /// Marks the item fragile.
    pub fn fragile(mut self) -> Self {
        self.fragile = true;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    /// Weight of all units together.
    #[inline]
    pub fn total_weight_kg(&self) -> f64 {
        self.weight_kg * self.quantity as f64
    }

    /// Volume of all units together.
    #[inline]
    pub fn total_volume_m3(&self) -> f64 {
        self.volume_m3 * self.quantity as f64
    }
}

/// Sums the total weight and volume of a set of items.
///
/// The result does not depend on item order.
pub fn payload_totals(items: &[AssignableItem]) -> (f64, f64) {
    (
        ordered_sum(items.iter().map(AssignableItem::total_weight_kg)),
        ordered_sum(items.iter().map(AssignableItem::total_volume_m3)),
    )
}

// =============================================================================
// Vehicle Slot
// =============================================================================

/// One addressable unit of capacity, derived from the tier layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct VehicleSlot {
    pub vehicle_id: String,
    pub tier_name: String,
    pub tier_order: u32,

    /// 1-based number within the tier.
    pub slot_number: u32,

    /// 0-based position across the whole vehicle, in tier order.
    pub global_index: u32,

    /// Vehicle capacity divided evenly across all slots.
    pub capacity_kg: f64,
    pub capacity_m3: f64,

    pub occupied: bool,

    /// Item currently holding the slot, if any.
    pub occupant_id: Option<String>,
}

impl VehicleSlot {
    /// Canonical slot key (vehicle, tier, slot number).
    pub fn key(&self) -> String {
        generate_slot_key(&self.vehicle_id, &self.tier_name, self.slot_number)
    }
}

// =============================================================================
// Slot Assignment
// =============================================================================

/// One item committed to one slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SlotAssignment {
    pub item_id: String,
    pub vehicle_id: String,
    pub tier_name: String,
    pub tier_order: u32,
    pub slot_number: u32,

    /// Load placed in the slot (item totals).
    pub weight_kg: f64,
    pub volume_m3: f64,

    /// 1-based loading sequence.
    pub sequence_order: u32,
}

impl SlotAssignment {
    /// Canonical key of the slot this assignment occupies.
    pub fn slot_key(&self) -> String {
        generate_slot_key(&self.vehicle_id, &self.tier_name, self.slot_number)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
