//! # Payload Validator
//!
//! Aggregate weight/volume check of a candidate payload against a vehicle's
//! total capacity. This is the gate every dispatch goes through before
//! anything is committed.
//!
//! ## Thresholds
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   0%                         90%            100%                        │
//! │   ├───────────── ok ──────────┼── warning ────┤──── error ────►         │
//! │                               (exclusive)  (inclusive)                  │
//! │                                                                         │
//! │   No tolerance above 100%. The 5% authoring allowance of the tier      │
//! │   validator does not apply here.                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## No Bypass
//! There is deliberately no "ignore and proceed" variant. Callers that want
//! fail-fast semantics use [`assert_payload`]; everyone else inspects
//! `is_valid`.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, Violation};
use crate::measure::{count_utilization_pct, exceeds, round_to, utilization_pct};
use crate::slots::SlotMap;
use crate::types::{payload_totals, AssignableItem, SlotAssignment, VehicleCapacity};
use crate::{PAYLOAD_WARNING_PCT, TARGET_UTILIZATION};

/// Result of a payload check. Never mutates its inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PayloadValidation {
    pub is_valid: bool,
    pub vehicle_id: String,
    pub item_count: u32,

    /// Sum of weight × quantity (kg).
    pub total_weight_kg: f64,
    /// Sum of volume × quantity (m³).
    pub total_volume_m3: f64,

    pub capacity_kg: f64,
    pub capacity_m3: f64,

    /// 1 decimal.
    pub weight_utilization_pct: f64,
    pub volume_utilization_pct: f64,

    /// Slots the vehicle exposes, slots already taken by the snapshot, and
    /// the count-based utilization once the payload is added.
    pub total_slots: u32,
    pub occupied_slots: u32,
    pub slot_utilization_pct: f64,

    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Checks `items` against `vehicle` with no existing assignments.
///
/// ## Example
/// ```rust
/// use stowage_core::payload::validate_payload;
/// use stowage_core::{AssignableItem, VehicleCapacity};
///
/// let vehicle = VehicleCapacity::new("VAN-1", 1000.0, 10.0);
/// let items = vec![
///     AssignableItem::new("a", 500.0, 2.0),
///     AssignableItem::new("b", 450.0, 2.0),
/// ];
///
/// let result = validate_payload(&items, &vehicle);
/// assert!(result.is_valid);
/// assert_eq!(result.warnings, vec!["Weight at 95% capacity".to_string()]);
/// ```
pub fn validate_payload(items: &[AssignableItem], vehicle: &VehicleCapacity) -> PayloadValidation {
    validate_payload_with_assignments(items, vehicle, &[])
}

/// Checks `items` against `vehicle`, taking slot occupancy from `existing`.
///
/// Weight/volume are compared against the vehicle totals only; `existing`
/// affects the reported slot figures, not the verdict.
pub fn validate_payload_with_assignments(
    items: &[AssignableItem],
    vehicle: &VehicleCapacity,
    existing: &[SlotAssignment],
) -> PayloadValidation {
    let (total_kg, total_m3) = payload_totals(items);
    let weight_pct = utilization_pct(total_kg, vehicle.capacity_kg);
    let volume_pct = utilization_pct(total_m3, vehicle.capacity_m3);

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

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
        } else if pct > PAYLOAD_WARNING_PCT {
            warnings.push(
                Violation::NearCapacity {
                    dimension: dimension.to_string(),
                    utilization: round_to(pct, 1),
                }
                .to_string(),
            );
        }
    }

    let utilization = SlotMap::build(vehicle, existing).utilization();
    let slot_utilization_pct =
        count_utilization_pct(utilization.occupied_slots + items.len() as u32, utilization.total_slots);

    let result = PayloadValidation {
        is_valid: errors.is_empty(),
        vehicle_id: vehicle.id.clone(),
        item_count: items.len() as u32,
        total_weight_kg: round_to(total_kg, 2),
        total_volume_m3: round_to(total_m3, 2),
        capacity_kg: vehicle.capacity_kg,
        capacity_m3: vehicle.capacity_m3,
        weight_utilization_pct: round_to(weight_pct, 1),
        volume_utilization_pct: round_to(volume_pct, 1),
        total_slots: utilization.total_slots,
        occupied_slots: utilization.occupied_slots,
        slot_utilization_pct,
        errors,
        warnings,
    };

    if result.is_valid {
        debug!(
            vehicle_id = %vehicle.id,
            weight_pct = result.weight_utilization_pct,
            volume_pct = result.volume_utilization_pct,
            "payload within capacity"
        );
    } else {
        warn!(vehicle_id = %vehicle.id, errors = ?result.errors, "payload rejected");
    }

    result
}

/// Fail-fast form of [`validate_payload`].
///
/// ## Errors
/// [`CoreError::CapacityExceeded`] carrying every validation error.
pub fn assert_payload(items: &[AssignableItem], vehicle: &VehicleCapacity) -> CoreResult<PayloadValidation> {
    let result = validate_payload(items, vehicle);
    if result.is_valid {
        Ok(result)
    } else {
        Err(CoreError::CapacityExceeded {
            vehicle_id: vehicle.id.clone(),
            errors: result.errors,
        })
    }
}

// =============================================================================
// Payload-Based Suggestion
// =============================================================================

/// A candidate picked on aggregate capacity alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PayloadSuggestion {
    pub vehicle_id: String,
    pub weight_utilization_pct: f64,
    pub volume_utilization_pct: f64,

    /// max(weight %, volume %).
    pub peak_utilization_pct: f64,
}

/// Picks the candidate whose max(weight %, volume %) is closest to 80%.
///
/// Candidates that cannot carry the summed payload are skipped. Ties go to
/// the earlier candidate.
pub fn suggest_vehicle_for_payload(
    items: &[AssignableItem],
    candidates: &[VehicleCapacity],
) -> Option<PayloadSuggestion> {
    let (total_kg, total_m3) = payload_totals(items);
    let target_pct = TARGET_UTILIZATION * 100.0;

    candidates
        .iter()
        .filter(|v| !exceeds(total_kg, v.capacity_kg) && !exceeds(total_m3, v.capacity_m3))
        .map(|v| {
            let weight_pct = utilization_pct(total_kg, v.capacity_kg);
            let volume_pct = utilization_pct(total_m3, v.capacity_m3);
            (v, weight_pct, volume_pct, weight_pct.max(volume_pct))
        })
        .min_by(|a, b| (a.3 - target_pct).abs().total_cmp(&(b.3 - target_pct).abs()))
        .map(|(v, weight_pct, volume_pct, peak)| PayloadSuggestion {
            vehicle_id: v.id.clone(),
            weight_utilization_pct: round_to(weight_pct, 1),
            volume_utilization_pct: round_to(volume_pct, 1),
            peak_utilization_pct: round_to(peak, 1),
        })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capacity::default_tier_layout;

    fn van() -> VehicleCapacity {
        VehicleCapacity::new("VAN-1", 1000.0, 10.0)
    }

    #[test]
    fn test_exact_fill_is_valid_in_any_order() {
        let vehicle = VehicleCapacity::new("VAN-2", 100.0, 0.6);
        let mut items = vec![
            AssignableItem::new("a", 10.0, 0.1),
            AssignableItem::new("b", 10.0, 0.2),
            AssignableItem::new("c", 10.0, 0.3),
        ];
        let forward = validate_payload(&items, &vehicle);
        items.reverse();
        let reversed = validate_payload(&items, &vehicle);

        assert!(forward.is_valid, "{:?}", forward.errors);
        assert_eq!(forward.volume_utilization_pct, 100.0);
        assert_eq!(forward, reversed);
    }

    #[test]
    fn test_near_capacity_warns() {
        let items = vec![
            AssignableItem::new("a", 600.0, 3.0),
            AssignableItem::new("b", 350.0, 2.0),
        ];
        let result = validate_payload(&items, &van());
        assert!(result.is_valid);
        assert_eq!(result.total_weight_kg, 950.0);
        assert_eq!(result.weight_utilization_pct, 95.0);
        assert_eq!(result.volume_utilization_pct, 50.0);
        assert_eq!(result.warnings, vec!["Weight at 95% capacity".to_string()]);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_overload_is_rejected() {
        let items = vec![
            AssignableItem::new("a", 600.0, 3.0),
            AssignableItem::new("b", 450.0, 2.0),
        ];
        let result = validate_payload(&items, &van());
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("by 50 kg"));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_exactly_full_is_valid_with_warning() {
        let items = vec![AssignableItem::new("a", 1000.0, 10.0)];
        let result = validate_payload(&items, &van());
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn test_ninety_percent_is_not_a_warning() {
        let items = vec![AssignableItem::new("a", 900.0, 9.0)];
        let result = validate_payload(&items, &van());
        assert!(result.is_valid);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_quantity_multiplies_load() {
        let items = vec![AssignableItem::new("cartons", 120.0, 0.5).with_quantity(9)];
        let result = validate_payload(&items, &van());
        assert!(!result.is_valid);
        assert_eq!(result.total_weight_kg, 1080.0);
        assert_eq!(result.total_volume_m3, 4.5);
        assert!(result.errors[0].contains("by 80 kg"));
    }

    #[test]
    fn test_slot_utilization_includes_snapshot() {
        let vehicle = van().with_tiers(default_tier_layout(1, 1000.0, 10.0));
        let existing = vec![SlotAssignment {
            item_id: "OLD".to_string(),
            vehicle_id: "VAN-1".to_string(),
            tier_name: "Main".to_string(),
            tier_order: 1,
            slot_number: 1,
            weight_kg: 10.0,
            volume_m3: 0.1,
            sequence_order: 1,
        }];
        let items = vec![AssignableItem::new("a", 10.0, 0.1)];
        let result = validate_payload_with_assignments(&items, &vehicle, &existing);
        assert_eq!(result.total_slots, 4);
        assert_eq!(result.occupied_slots, 1);
        assert_eq!(result.slot_utilization_pct, 50.0);
    }

    #[test]
    fn test_assert_payload() {
        let ok = vec![AssignableItem::new("a", 100.0, 1.0)];
        assert!(assert_payload(&ok, &van()).is_ok());

        let heavy = vec![AssignableItem::new("a", 1200.0, 12.0)];
        match assert_payload(&heavy, &van()) {
            Err(CoreError::CapacityExceeded { vehicle_id, errors }) => {
                assert_eq!(vehicle_id, "VAN-1");
                assert_eq!(errors.len(), 2);
            }
            other => panic!("expected CapacityExceeded, got {:?}", other),
        }
    }

    #[test]
    fn test_suggest_vehicle_for_payload() {
        let items = vec![AssignableItem::new("a", 400.0, 2.0)];
        let candidates = vec![
            VehicleCapacity::new("BIKE", 100.0, 1.0),
            VehicleCapacity::new("TRUCK", 4000.0, 40.0),
            VehicleCapacity::new("VAN", 500.0, 5.0),
            VehicleCapacity::new("CAR", 450.0, 2.0),
        ];
        let best = suggest_vehicle_for_payload(&items, &candidates).unwrap();
        assert_eq!(best.vehicle_id, "VAN");
        assert_eq!(best.peak_utilization_pct, 80.0);

        assert!(suggest_vehicle_for_payload(&items, &candidates[..1]).is_none());
    }

    #[test]
    fn test_suggest_ties_go_to_first_candidate() {
        let items = vec![AssignableItem::new("a", 80.0, 0.8)];
        let candidates = vec![
            VehicleCapacity::new("A", 100.0, 1.0),
            VehicleCapacity::new("B", 100.0, 1.0),
        ];
        assert_eq!(
            suggest_vehicle_for_payload(&items, &candidates).unwrap().vehicle_id,
            "A"
        );
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: permuting the payload never changes the verdict or totals.
        #[test]
        fn test_order_independent(
            items in prop::collection::vec(
                ("[a-z]{1,4}", 0.0f64..400.0, 0.0f64..4.0, 1u32..4).prop_map(|(id, kg, m3, qty)| {
                    AssignableItem::new(id, kg, m3).with_quantity(qty)
                }),
                0..12,
            ),
            seed in any::<u64>(),
        ) {
            // Capacity equal to the payload summed back to front puts every
            // case on the boundary.
            let (kg, m3) = items.iter().rev().fold((0.0f64, 0.0f64), |(w, v), item| {
                (w + item.total_weight_kg(), v + item.total_volume_m3())
            });
            let vehicle = VehicleCapacity::new("V", kg.max(1.0), m3.max(0.01));
            let forward = validate_payload(&items, &vehicle);
            prop_assert!(forward.is_valid, "{:?}", forward.errors);

            let mut shuffled = items.clone();
            shuffled.reverse();
            if !shuffled.is_empty() {
                let k = (seed % shuffled.len() as u64) as usize;
                shuffled.rotate_left(k);
            }
            let permuted = validate_payload(&shuffled, &vehicle);

            prop_assert_eq!(forward.total_weight_kg, permuted.total_weight_kg);
            prop_assert_eq!(forward.total_volume_m3, permuted.total_volume_m3);
            prop_assert_eq!(forward.is_valid, permuted.is_valid);

            // Idempotent.
            prop_assert_eq!(validate_payload(&items, &vehicle), forward);
        }

        /// Property: a payload over capacity is rejected in every order.
        #[test]
        fn test_overload_rejected_in_any_order(
            loads in prop::collection::vec(1.0f64..400.0, 1..12),
            overshoot in 0.001f64..0.5,
        ) {
            let items: Vec<AssignableItem> = loads
                .iter()
                .enumerate()
                .map(|(i, kg)| AssignableItem::new(format!("I{}", i), *kg, 0.01))
                .collect();
            let (kg, _) = payload_totals(&items);
            let vehicle = VehicleCapacity::new("V", kg - overshoot, 100.0);

            let mut reversed = items.clone();
            reversed.reverse();
            prop_assert!(!validate_payload(&items, &vehicle).is_valid);
            prop_assert!(!validate_payload(&reversed, &vehicle).is_valid);
        }
    }
}
