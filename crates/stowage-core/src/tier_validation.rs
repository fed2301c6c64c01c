//! # Tier Validation
//!
//! Checks a proposed tier configuration against vehicle-class limits and the
//! authoring-time over-capacity tolerance.
//!
//! ## Rule Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Rules run in this order; the FIRST hard violation is reported.         │
//! │                                                                         │
//! │  1. Tier count within the vehicle class [min, max]                      │
//! │  2. Tier count ≤ 10 (global)                                            │
//! │  3. Each slot count in [1, 12] (tighter if the class says so)           │
//! │  4. Total slots ≤ vehicle class ceiling                                 │
//! │  5. Tier orders are 1, 2, … N with no gaps or duplicates                │
//! │  6. Tier names unique (case-insensitive)                                │
//! │  7. Every tier ≥ 10 kg and ≥ 0.01 m³                                    │
//! │  8. Σ tier weight ≤ capacity × 1.05   (100-105% → valid + warning)      │
//! │  9. Σ tier volume ≤ capacity × 1.05   (same)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tolerance
//! The 5% allowance exists only here, at authoring time. Dispatch-time checks
//! ([`crate::payload`], [`crate::slots::validate_batch_capacity`]) are strict.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::Violation;
use crate::measure::{ordered_sum, round_to};
use crate::types::{TierConfig, VehicleCapacity};
use crate::vehicle_class::{ClassConstraints, VehicleClassTable};
use crate::{
    MAX_SLOTS_PER_TIER, MAX_TIERS, MIN_TIER_VOLUME_M3, MIN_TIER_WEIGHT_KG,
    TIER_CAPACITY_TOLERANCE,
};

/// Outcome of validating a tier configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TierValidation {
    pub is_valid: bool,

    /// Sum of resolved tier weights (kg).
    pub total_weight_kg: f64,

    /// Sum of resolved tier volumes (m³).
    pub total_volume_m3: f64,

    /// Single human-readable summary. Starts with "Warning:" when the
    /// configuration is valid but over nominal capacity.
    pub message: String,

    /// First hard violation found, if any.
    pub violation: Option<Violation>,

    /// Soft findings (tolerance band).
    pub warnings: Vec<Violation>,
}

impl TierValidation {
    fn failed(violation: Violation, total_weight_kg: f64, total_volume_m3: f64) -> Self {
        TierValidation {
            is_valid: false,
            total_weight_kg,
            total_volume_m3,
            message: violation.to_string(),
            violation: Some(violation),
            warnings: Vec::new(),
        }
    }

    /// Returns true if the configuration passed with tolerance warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Validates a vehicle's tier layout using the built-in class table.
pub fn validate_vehicle_tiers(vehicle: &VehicleCapacity) -> TierValidation {
    validate_tier_configuration(vehicle, VehicleClassTable::standard())
}

/// Validates a vehicle's tier layout against `classes`.
///
/// ## Example
/// ```rust
/// use stowage_core::capacity::default_tier_layout;
/// use stowage_core::tier_validation::validate_vehicle_tiers;
/// use stowage_core::VehicleCapacity;
///
/// let vehicle = VehicleCapacity::new("VAN-1", 1000.0, 10.0)
///     .with_tiers(default_tier_layout(3, 1000.0, 10.0));
/// let result = validate_vehicle_tiers(&vehicle);
/// assert!(result.is_valid);
/// assert_eq!(result.total_weight_kg, 1000.0);
/// ```
pub fn validate_tier_configuration(
    vehicle: &VehicleCapacity,
    classes: &VehicleClassTable,
) -> TierValidation {
    let tiers = &vehicle.tiers;
    let class_name = vehicle
        .category_code
        .clone()
        .unwrap_or_else(|| "default".to_string());
    let limits = classes.resolve(vehicle.category_code.as_deref());

    let raw_weight = ordered_sum(tiers.iter().map(|t| t.resolved_weight_kg(vehicle.capacity_kg)));
    let raw_volume = ordered_sum(tiers.iter().map(|t| t.resolved_volume_m3(vehicle.capacity_m3)));
    let total_weight = round_to(raw_weight, 2);
    let total_volume = round_to(raw_volume, 2);

    let structural = check_tier_count(tiers, &class_name, &limits)
        .or_else(|| check_slot_counts(tiers, &class_name, &limits))
        .or_else(|| check_tier_orders(tiers))
        .or_else(|| check_tier_names(tiers))
        .or_else(|| check_tier_minimums(tiers, vehicle));
    if let Some(violation) = structural {
        return TierValidation::failed(violation, total_weight, total_volume);
    }

    let mut warnings = Vec::new();
    for (dimension, unit, total, capacity) in [
        ("weight", "kg", raw_weight, vehicle.capacity_kg),
        ("volume", "m³", raw_volume, vehicle.capacity_m3),
    ] {
        match check_total_against_capacity(dimension, unit, total, capacity) {
            Some(v) if v.is_warning() => warnings.push(v),
            Some(v) => return TierValidation::failed(v, total_weight, total_volume),
            None => {}
        }
    }

    let message = if warnings.is_empty() {
        format!(
            "Tier configuration is valid: {} tiers, {} slots",
            tiers.len(),
            vehicle.total_slot_count()
        )
    } else {
        warnings
            .iter()
            .map(|w| w.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    };

    TierValidation {
        is_valid: true,
        total_weight_kg: total_weight,
        total_volume_m3: total_volume,
        message,
        violation: None,
        warnings,
    }
}

// =============================================================================
// Individual Rules
// =============================================================================

/// Rules 1 and 2.
fn check_tier_count(
    tiers: &[TierConfig],
    class_name: &str,
    limits: &ClassConstraints,
) -> Option<Violation> {
    let count = tiers.len() as u32;

    if count < limits.min_tiers || count > limits.max_tiers {
        return Some(Violation::TierCountOutOfRange {
            class: class_name.to_string(),
            count,
            min: limits.min_tiers,
            max: limits.max_tiers,
        });
    }

    if count > MAX_TIERS {
        return Some(Violation::TierCountOutOfRange {
            class: "all vehicles".to_string(),
            count,
            min: 1,
            max: MAX_TIERS,
        });
    }

    None
}

/// Rules 3 and 4.
fn check_slot_counts(
    tiers: &[TierConfig],
    class_name: &str,
    limits: &ClassConstraints,
) -> Option<Violation> {
    let max_per_tier = limits.max_slots_per_tier.min(MAX_SLOTS_PER_TIER);

    if let Some(tier) = tiers
        .iter()
        .find(|t| t.slot_count < 1 || t.slot_count > max_per_tier)
    {
        return Some(Violation::InvalidSlotCount {
            tier: tier.name.clone(),
            slot_count: tier.slot_count,
            max: max_per_tier,
        });
    }

    let total: u32 = tiers.iter().map(|t| t.slot_count).sum();
    if total > limits.total_max_slots {
        return Some(Violation::TotalSlotsExceeded {
            class: class_name.to_string(),
            total,
            max: limits.total_max_slots,
        });
    }

    None
}

/// Rule 5: orders must be exactly 1..=N once sorted.
fn check_tier_orders(tiers: &[TierConfig]) -> Option<Violation> {
    let mut orders: Vec<u32> = tiers.iter().map(|t| t.order).collect();
    orders.sort_unstable();

    orders
        .into_iter()
        .zip(1u32..)
        .find(|(found, expected)| found != expected)
        .map(|(found, expected)| Violation::NonSequentialTierOrder { expected, found })
}

/// Rule 6.
fn check_tier_names(tiers: &[TierConfig]) -> Option<Violation> {
    let mut seen = HashSet::new();
    tiers
        .iter()
        .find(|t| !seen.insert(t.name.trim().to_lowercase()))
        .map(|t| Violation::DuplicateTierName {
            name: t.name.clone(),
        })
}

/// Rule 7.
fn check_tier_minimums(tiers: &[TierConfig], vehicle: &VehicleCapacity) -> Option<Violation> {
    for tier in tiers {
        let weight = tier.resolved_weight_kg(vehicle.capacity_kg);
        if weight < MIN_TIER_WEIGHT_KG {
            return Some(Violation::TierBelowMinimum {
                tier: tier.name.clone(),
                dimension: "weight".to_string(),
                unit: "kg".to_string(),
                value: weight,
                min: MIN_TIER_WEIGHT_KG,
            });
        }

        let volume = tier.resolved_volume_m3(vehicle.capacity_m3);
        if volume < MIN_TIER_VOLUME_M3 {
            return Some(Violation::TierBelowMinimum {
                tier: tier.name.clone(),
                dimension: "volume".to_string(),
                unit: "m³".to_string(),
                value: volume,
                min: MIN_TIER_VOLUME_M3,
            });
        }
    }
    None
}

/// Rules 8 and 9. `total` is the unrounded sum.
fn check_total_against_capacity(
    dimension: &str,
    unit: &str,
    total: f64,
    capacity: f64,
) -> Option<Violation> {
    if total > capacity * (1.0 + TIER_CAPACITY_TOLERANCE) {
        return Some(Violation::TierCapacityExceeded {
            dimension: dimension.to_string(),
            unit: unit.to_string(),
            total: round_to(total, 3),
            capacity,
        });
    }

    if total > capacity {
        return Some(Violation::TierCapacityWarning {
            dimension: dimension.to_string(),
            unit: unit.to_string(),
            total: round_to(total, 3),
            capacity,
        });
    }

    None
}

// =============================================================================
// Unit Tests
// =============================================================================
