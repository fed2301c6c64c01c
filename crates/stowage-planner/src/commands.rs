//! # Planner Commands
//!
//! Request/response operations over the core engine. Every command takes a
//! JSON-decodable request and returns a serialisable response or an
//! [`ApiError`].
//!
//! ## Dispatch Planning Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        plan_dispatch                                    │
//! │                                                                         │
//! │  ┌──────────────┐   invalid   ┌──────────────────────────────┐          │
//! │  │ payload gate │────────────►│ ApiError CAPACITY_EXCEEDED   │          │
//! │  └──────┬───────┘             └──────────────────────────────┘          │
//! │         │ valid                              ▲                          │
//! │  ┌──────▼───────┐   invalid                  │                          │
//! │  │ batch gate   │────────────────────────────┘                          │
//! │  │ (+ snapshot) │                                                       │
//! │  └──────┬───────┘                                                       │
//! │         │ valid                                                         │
//! │         ▼                                                               │
//! │  ┌──────────────┐   ┌─────────────────┐   ┌──────────────────────┐     │
//! │  │   assign     │──►│ optimize_order  │──►│ conflict check over  │     │
//! │  │ (fill strat.)│   │ (load sequence) │   │ snapshot + new plan  │     │
//! │  └──────────────┘   └─────────────────┘   └──────────┬───────────┘     │
//! │                                                      ▼                  │
//! │                           DispatchPlan { planId, generatedAt, ... }    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The payload gate has no bypass flag. An incomplete assignment is returned
//! as a plan with `assignment.success == false`; the persistence layer
//! decides what to do with partial commits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use stowage_core::assignment::{
    assign, optimize_order, rank_vehicles, AssignOptions, AssignmentResult, VehicleSuggestion,
};
use stowage_core::capacity::{
    default_tier_layout, tier_capacities_from_percentages, tier_percentages_from_absolutes,
};
use stowage_core::payload::{
    suggest_vehicle_for_payload, validate_payload_with_assignments, PayloadSuggestion,
    PayloadValidation,
};
use stowage_core::slots::{
    find_slot_conflicts, validate_batch_capacity, SlotConflict, SlotMap, SlotUtilization,
};
use stowage_core::tier_validation::{validate_tier_configuration, TierValidation};
use stowage_core::{
    AssignableItem, CoreError, SlotAssignment, VehicleCapacity, VehicleClassTable, VehicleSlot,
};

use crate::config::PlannerConfig;
use crate::error::{ApiError, ErrorCode, PlannerResult};

// =============================================================================
// Planner State
// =============================================================================

/// Immutable state shared by all commands: the effective config and the
/// vehicle-class table derived from it.
#[derive(Debug, Clone)]
pub struct Planner {
    config: PlannerConfig,
    classes: VehicleClassTable,
}

impl Planner {
    /// Validates `config` and freezes the vehicle-class table.
    pub fn new(config: PlannerConfig) -> PlannerResult<Self> {
        config.validate()?;
        let classes = config.class_table();
        Ok(Planner { config, classes })
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn classes(&self) -> &VehicleClassTable {
        &self.classes
    }

    fn options_or_default(&self, options: Option<AssignOptions>) -> AssignOptions {
        options.unwrap_or_else(|| self.config.assign_options())
    }
}

impl Default for Planner {
    fn default() -> Self {
        Planner {
            config: PlannerConfig::default(),
            classes: VehicleClassTable::default(),
        }
    }
}

// =============================================================================
// configure_tiers
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureTiersRequest {
    pub vehicle: VehicleCapacity,

    /// Used only when the vehicle has no tiers yet. Defaults to the vehicle
    /// class's default tier count.
    #[serde(default)]
    pub tier_count: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureTiersResponse {
    /// Vehicle with every tier carrying both absolute and percentage budgets.
    pub vehicle: VehicleCapacity,
    pub validation: TierValidation,
}

/// Authors a tier layout: fills in the default layout when none is given,
/// resolves percentages and absolutes, then validates.
///
/// ## Errors
/// `INVALID_TIER_CONFIGURATION` when the layout breaks a hard rule. Layouts
/// inside the 5% tolerance band are accepted with warnings.
pub fn configure_tiers(
    planner: &Planner,
    request: ConfigureTiersRequest,
) -> Result<ConfigureTiersResponse, ApiError> {
    let mut vehicle = request.vehicle;
    debug!(vehicle_id = %vehicle.id, "configure_tiers command");

    if !vehicle.has_tiers() {
        let count = request.tier_count.unwrap_or_else(|| {
            planner
                .classes
                .resolve(vehicle.category_code.as_deref())
                .default_tiers
        });
        vehicle.tiers = default_tier_layout(count, vehicle.capacity_kg, vehicle.capacity_m3);
    }

    let resolved =
        tier_capacities_from_percentages(&vehicle.tiers, vehicle.capacity_kg, vehicle.capacity_m3);
    vehicle.tiers = tier_percentages_from_absolutes(
        &resolved,
        Some(vehicle.capacity_kg),
        Some(vehicle.capacity_m3),
    );

    let validation = validate_tier_configuration(&vehicle, &planner.classes);
    if !validation.is_valid {
        warn!(vehicle_id = %vehicle.id, reason = %validation.message, "tier layout rejected");
        return Err(ApiError::new(
            ErrorCode::InvalidTierConfiguration,
            validation.message,
        ));
    }

    info!(
        vehicle_id = %vehicle.id,
        tiers = vehicle.tiers.len(),
        slots = vehicle.total_slot_count(),
        "tier layout accepted"
    );
    Ok(ConfigureTiersResponse {
        vehicle,
        validation,
    })
}

// =============================================================================
// validate_payload
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadRequest {
    pub vehicle: VehicleCapacity,
    pub items: Vec<AssignableItem>,

    /// Current assignment snapshot for the vehicle.
    #[serde(default)]
    pub existing: Vec<SlotAssignment>,
}

/// Runs the payload check and returns the result as-is (valid or not).
pub fn validate_payload(request: PayloadRequest) -> PayloadValidation {
    debug!(vehicle_id = %request.vehicle.id, items = request.items.len(), "validate_payload command");
    validate_payload_with_assignments(&request.items, &request.vehicle, &request.existing)
}

// =============================================================================
// plan_dispatch
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDispatchRequest {
    pub vehicle: VehicleCapacity,
    pub items: Vec<AssignableItem>,

    #[serde(default)]
    pub existing: Vec<SlotAssignment>,

    /// Overrides the configured ordering and fill strategy.
    #[serde(default)]
    pub options: Option<AssignOptions>,
}

/// A placement plan ready for the persistence layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchPlan {
    pub plan_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub vehicle_id: String,
    pub options: AssignOptions,
    pub payload: PayloadValidation,

    /// Assignments in loading sequence (heaviest first).
    pub assignment: AssignmentResult,

    /// Slot keys claimed twice across the snapshot and this plan.
    pub conflicts: Vec<SlotConflict>,
}

/// Gates the payload, places it, orders the placements and checks the
/// combined snapshot for conflicts.
///
/// ## Errors
/// `CAPACITY_EXCEEDED` when the payload alone fails the strict capacity
/// check, or when it no longer fits next to the load already placed (or in
/// the free slots) of the snapshot.
pub fn plan_dispatch(
    planner: &Planner,
    request: PlanDispatchRequest,
) -> Result<DispatchPlan, ApiError> {
    let PlanDispatchRequest {
        vehicle,
        items,
        existing,
        options,
    } = request;
    debug!(vehicle_id = %vehicle.id, items = items.len(), "plan_dispatch command");

    let payload = validate_payload_with_assignments(&items, &vehicle, &existing);
    if !payload.is_valid {
        warn!(vehicle_id = %vehicle.id, "dispatch blocked by payload check");
        return Err(ApiError::from(CoreError::CapacityExceeded {
            vehicle_id: vehicle.id.clone(),
            errors: payload.errors,
        }));
    }

    // Second gate: the payload plus the load already in the vehicle.
    let batch = validate_batch_capacity(&vehicle, &items, &existing);
    if !batch.is_valid {
        warn!(vehicle_id = %vehicle.id, errors = ?batch.errors, "dispatch blocked by batch check");
        return Err(ApiError::from(CoreError::CapacityExceeded {
            vehicle_id: vehicle.id.clone(),
            errors: batch.errors,
        }));
    }

    let options = planner.options_or_default(options);
    let mut assignment = assign(&items, &vehicle, &existing, &options);
    assignment.assignments = optimize_order(&assignment.assignments);

    for message in batch.warnings {
        if !assignment.warnings.contains(&message) {
            assignment.warnings.push(message);
        }
    }

    let combined: Vec<SlotAssignment> = existing
        .iter()
        .chain(assignment.assignments.iter())
        .cloned()
        .collect();
    let conflicts = find_slot_conflicts(&combined);
    if !conflicts.is_empty() {
        warn!(count = conflicts.len(), "slot conflicts in assignment snapshot");
    }

    let plan = DispatchPlan {
        plan_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        vehicle_id: vehicle.id.clone(),
        options,
        payload,
        assignment,
        conflicts,
    };
    info!(
        plan_id = %plan.plan_id,
        vehicle_id = %plan.vehicle_id,
        placed = plan.assignment.assignments.len(),
        success = plan.assignment.success,
        "dispatch plan generated"
    );
    Ok(plan)
}

// =============================================================================
// suggest_vehicle
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestVehicleRequest {
    pub items: Vec<AssignableItem>,
    pub candidates: Vec<VehicleCapacity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestVehicleResponse {
    /// Best slot/weight/volume balance.
    pub optimal: Option<VehicleSuggestion>,

    /// Best on aggregate capacity alone.
    pub by_payload: Option<PayloadSuggestion>,

    /// Every candidate that can carry the payload, best first.
    pub ranked: Vec<VehicleSuggestion>,
}

pub fn suggest_vehicle(request: SuggestVehicleRequest) -> SuggestVehicleResponse {
    debug!(
        items = request.items.len(),
        candidates = request.candidates.len(),
        "suggest_vehicle command"
    );
    let ranked = rank_vehicles(&request.items, &request.candidates);
    SuggestVehicleResponse {
        optimal: ranked.first().cloned(),
        by_payload: suggest_vehicle_for_payload(&request.items, &request.candidates),
        ranked,
    }
}

// =============================================================================
// slot_overview
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotOverviewRequest {
    pub vehicle: VehicleCapacity,

    #[serde(default)]
    pub existing: Vec<SlotAssignment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotOverviewResponse {
    pub slots: Vec<VehicleSlot>,
    pub utilization: SlotUtilization,
    pub orphaned: Vec<SlotAssignment>,
    pub warnings: Vec<String>,
}

pub fn slot_overview(request: SlotOverviewRequest) -> SlotOverviewResponse {
    debug!(vehicle_id = %request.vehicle.id, "slot_overview command");
    let map = SlotMap::build(&request.vehicle, &request.existing);
    let utilization = map.utilization();
    let orphaned = map.orphaned_assignments().to_vec();
    let warnings = map.orphan_warnings();
    SlotOverviewResponse {
        slots: map.into_slots(),
        utilization,
        orphaned,
        warnings,
    }
}

// =============================================================================
// find_conflicts
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindConflictsRequest {
    pub assignments: Vec<SlotAssignment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindConflictsResponse {
    pub has_conflicts: bool,
    pub conflicts: Vec<SlotConflict>,
    pub messages: Vec<String>,
}

pub fn find_conflicts(request: FindConflictsRequest) -> FindConflictsResponse {
    debug!(assignments = request.assignments.len(), "find_conflicts command");
    let conflicts = find_slot_conflicts(&request.assignments);
    FindConflictsResponse {
        has_conflicts: !conflicts.is_empty(),
        messages: conflicts.iter().map(|c| c.to_violation().to_string()).collect(),
        conflicts,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VehicleClassEntry;
    use stowage_core::assignment::FillStrategy;
    use stowage_core::TierConfig;

    fn van() -> VehicleCapacity {
        VehicleCapacity::new("VAN-1", 1500.0, 10.0)
            .with_category("van")
            .with_tiers(vec![
                TierConfig::new("Lower", 1, 3).with_capacity(900.0, 6.0),
                TierConfig::new("Upper", 2, 2).with_capacity(600.0, 4.0),
            ])
    }

    fn crates(n: usize, kg: f64) -> Vec<AssignableItem> {
        (1..=n)
            .map(|i| AssignableItem::new(format!("F-{}", i), kg, 1.0))
            .collect()
    }

    #[test]
    fn test_configure_tiers_default_layout() {
        let request = ConfigureTiersRequest {
            vehicle: VehicleCapacity::new("TRUCK-1", 1000.0, 10.0).with_category("truck"),
            tier_count: None,
        };
        let response = configure_tiers(&Planner::default(), request).unwrap();

        // Truck default is 3 tiers: 30/40/30.
        let weights: Vec<Option<f64>> = response.vehicle.tiers.iter().map(|t| t.weight_kg).collect();
        assert_eq!(weights, vec![Some(300.0), Some(400.0), Some(300.0)]);
        assert!(response.validation.is_valid);
    }

    #[test]
    fn test_configure_tiers_fills_percentages() {
        let request = ConfigureTiersRequest {
            vehicle: van(),
            tier_count: None,
        };
        let response = configure_tiers(&Planner::default(), request).unwrap();
        assert_eq!(response.vehicle.tiers[0].weight_pct, Some(60.0));
        assert_eq!(response.vehicle.tiers[1].volume_pct, Some(40.0));
    }

    #[test]
    fn test_configure_tiers_rejects_invalid_layout() {
        let mut vehicle = van();
        vehicle.tiers[1].name = "lower".to_string();
        let err = configure_tiers(
            &Planner::default(),
            ConfigureTiersRequest {
                vehicle,
                tier_count: None,
            },
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTierConfiguration);
        assert!(err.message.contains("Duplicate tier name"));
    }

    #[test]
    fn test_configure_tiers_uses_configured_classes() {
        let mut config = PlannerConfig::default();
        config.vehicle_classes.push(VehicleClassEntry {
            code: "cargo-bike".to_string(),
            min_tiers: 1,
            max_tiers: 1,
            default_tiers: 1,
            max_slots_per_tier: 3,
            total_max_slots: 3,
        });
        let planner = Planner::new(config).unwrap();

        // Default layout gives 4 slots per tier, above this class's limit.
        let err = configure_tiers(
            &planner,
            ConfigureTiersRequest {
                vehicle: VehicleCapacity::new("BIKE-1", 120.0, 0.5).with_category("cargo-bike"),
                tier_count: None,
            },
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTierConfiguration);
    }

    #[test]
    fn test_plan_dispatch_success() {
        let request = PlanDispatchRequest {
            vehicle: van(),
            items: vec![
                AssignableItem::new("light", 100.0, 1.0),
                AssignableItem::new("heavy", 250.0, 1.0),
            ],
            existing: Vec::new(),
            options: None,
        };
        let plan = plan_dispatch(&Planner::default(), request).unwrap();

        assert!(plan.payload.is_valid);
        assert!(plan.assignment.success);
        assert!(plan.conflicts.is_empty());
        assert_eq!(plan.vehicle_id, "VAN-1");
        assert_eq!(plan.assignment.assignments[0].item_id, "heavy");
        assert_eq!(plan.assignment.assignments[0].sequence_order, 1);
        assert_eq!(plan.options.fill_strategy, FillStrategy::LowerFirst);
    }

    #[test]
    fn test_plan_dispatch_blocks_overload() {
        let request = PlanDispatchRequest {
            vehicle: van(),
            items: crates(5, 320.0),
            existing: Vec::new(),
            options: None,
        };
        let err = plan_dispatch(&Planner::default(), request).unwrap_err();
        assert_eq!(err.code, ErrorCode::CapacityExceeded);
        assert!(err.message.contains("by 100 kg"));
    }

    #[test]
    fn test_plan_dispatch_blocks_overload_with_snapshot() {
        // 1000 kg already aboard; 600 kg more fits the van alone but not both.
        let aboard = SlotAssignment {
            item_id: "OLD-1".to_string(),
            vehicle_id: "VAN-1".to_string(),
            tier_name: "Lower".to_string(),
            tier_order: 1,
            slot_number: 1,
            weight_kg: 1000.0,
            volume_m3: 1.0,
            sequence_order: 1,
        };
        let request = PlanDispatchRequest {
            vehicle: van(),
            items: crates(3, 200.0),
            existing: vec![aboard],
            options: None,
        };
        let err = plan_dispatch(&Planner::default(), request).unwrap_err();
        assert_eq!(err.code, ErrorCode::CapacityExceeded);
        assert!(err.message.contains("by 100 kg"), "{}", err.message);
    }

    #[test]
    fn test_plan_dispatch_blocks_when_free_slots_run_out() {
        let aboard = |slot: u32| SlotAssignment {
            item_id: format!("OLD-{}", slot),
            vehicle_id: "VAN-1".to_string(),
            tier_name: "Lower".to_string(),
            tier_order: 1,
            slot_number: slot,
            weight_kg: 10.0,
            volume_m3: 0.1,
            sequence_order: slot,
        };
        let request = PlanDispatchRequest {
            vehicle: van(),
            items: crates(3, 50.0),
            existing: (1..=3).map(aboard).collect(),
            options: None,
        };
        let err = plan_dispatch(&Planner::default(), request).unwrap_err();
        assert_eq!(err.code, ErrorCode::CapacityExceeded);
        assert!(err.message.contains("only 2 available"), "{}", err.message);
    }

    #[test]
    fn test_plan_dispatch_uses_configured_strategy() {
        let mut config = PlannerConfig::default();
        config.planning.fill_strategy = FillStrategy::UpperFirst;
        let planner = Planner::new(config).unwrap();

        let plan = plan_dispatch(
            &planner,
            PlanDispatchRequest {
                vehicle: van(),
                items: crates(1, 100.0),
                existing: Vec::new(),
                options: None,
            },
        )
        .unwrap();
        assert_eq!(plan.assignment.assignments[0].tier_name, "Upper");
    }

    #[test]
    fn test_plan_dispatch_reports_snapshot_conflicts() {
        let duplicate = |item: &str| SlotAssignment {
            item_id: item.to_string(),
            vehicle_id: "VAN-1".to_string(),
            tier_name: "Upper".to_string(),
            tier_order: 2,
            slot_number: 2,
            weight_kg: 10.0,
            volume_m3: 0.1,
            sequence_order: 1,
        };
        let plan = plan_dispatch(
            &Planner::default(),
            PlanDispatchRequest {
                vehicle: van(),
                items: crates(1, 100.0),
                existing: vec![duplicate("OLD-1"), duplicate("OLD-2")],
                options: None,
            },
        )
        .unwrap();
        assert!(plan.assignment.success);
        assert_eq!(plan.conflicts.len(), 1);
        assert_eq!(plan.conflicts[0].slot_key, "VAN-1::Upper::2");
    }

    #[test]
    fn test_plan_dispatch_returns_partial_plans() {
        // Slots hold 300 kg each; the 400 kg crate fits the vehicle but no slot.
        let request = PlanDispatchRequest {
            vehicle: van(),
            items: vec![
                AssignableItem::new("big", 400.0, 1.0),
                AssignableItem::new("small", 50.0, 1.0),
            ],
            existing: Vec::new(),
            options: Some(AssignOptions::default().with_ordering(vec![
                stowage_core::assignment::OrderingRule::asc(
                    stowage_core::assignment::OrderingCriterion::Weight,
                ),
            ])),
        };
        let plan = plan_dispatch(&Planner::default(), request).unwrap();
        assert!(!plan.assignment.success);
        assert!(plan.assignment.partial);
        assert_eq!(plan.assignment.assignments.len(), 1);
        assert_eq!(plan.assignment.unassigned[0].id, "big");
    }

    #[test]
    fn test_validate_payload_command() {
        let result = validate_payload(PayloadRequest {
            vehicle: VehicleCapacity::new("VAN-1", 1000.0, 10.0),
            items: vec![AssignableItem::new("a", 950.0, 2.0)],
            existing: Vec::new(),
        });
        assert!(result.is_valid);
        assert_eq!(result.warnings, vec!["Weight at 95% capacity".to_string()]);
    }

    #[test]
    fn test_suggest_vehicle_command() {
        let response = suggest_vehicle(SuggestVehicleRequest {
            items: crates(4, 150.0),
            candidates: vec![
                van(),
                VehicleCapacity::new("CAR-1", 300.0, 2.0).with_tiers(vec![TierConfig::new(
                    "Main", 1, 4,
                )]),
            ],
        });
        assert_eq!(response.optimal.unwrap().vehicle_id, "VAN-1");
        assert_eq!(response.by_payload.unwrap().vehicle_id, "VAN-1");
        assert_eq!(response.ranked.len(), 1);
    }

    #[test]
    fn test_slot_overview_and_conflicts() {
        let orphan = SlotAssignment {
            item_id: "OLD".to_string(),
            vehicle_id: "VAN-1".to_string(),
            tier_name: "Roof".to_string(),
            tier_order: 3,
            slot_number: 1,
            weight_kg: 10.0,
            volume_m3: 0.1,
            sequence_order: 1,
        };
        let overview = slot_overview(SlotOverviewRequest {
            vehicle: van(),
            existing: vec![orphan.clone()],
        });
        assert_eq!(overview.slots.len(), 5);
        assert_eq!(overview.orphaned, vec![orphan.clone()]);
        assert_eq!(overview.warnings.len(), 1);

        let response = find_conflicts(FindConflictsRequest {
            assignments: vec![orphan.clone(), orphan],
        });
        assert!(response.has_conflicts);
        assert_eq!(
            response.messages,
            vec!["Slot VAN-1::Roof::1 is claimed by multiple items: OLD, OLD".to_string()]
        );
    }

    #[test]
    fn test_dispatch_plan_serializes_camel_case() {
        let plan = plan_dispatch(
            &Planner::default(),
            PlanDispatchRequest {
                vehicle: van(),
                items: crates(1, 100.0),
                existing: Vec::new(),
                options: None,
            },
        )
        .unwrap();
        let json = serde_json::to_value(&plan).unwrap();
        assert!(json["planId"].is_string());
        assert!(json["generatedAt"].is_string());
        assert_eq!(json["options"]["fillStrategy"], "lower-first");
    }
}
