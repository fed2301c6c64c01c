//! # Slot Assignment Engine
//!
//! Deterministically places cargo items into the free slots of a vehicle and
//! scores vehicles against a payload.
//!
//! ## Placement Walk
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  items ──► stable sort (ordering rules, last rule applied first)       │
//! │                │                                                        │
//! │                ▼                                                        │
//! │  free slots in tier visit order (fill strategy)                        │
//! │                                                                         │
//! │   cursor ─► [L1][L2][L3][U1][U2]                                        │
//! │              ▲                                                          │
//! │   item fits? ── yes ──► commit, cursor + 1, next item                   │
//! │              └─ no ───► warn, cursor + 1, same item                     │
//! │                                                                         │
//! │  The cursor is shared by all items and never rewinds: a slot skipped   │
//! │  by a heavy item is not offered to a lighter one later in the run.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Partial Results
//! When a later item cannot be placed, earlier commits are NOT rolled back.
//! The result comes back with `success == false`, `partial == true` and the
//! committed assignments intact; the caller decides whether to persist or
//! discard them.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use ts_rs::TS;

use crate::error::{CoreError, Violation};
use crate::measure::{exceeds, round_to, utilization_ratio};
use crate::slots::{validate_slot_assignment, SlotMap};
use crate::types::{payload_totals, AssignableItem, SlotAssignment, VehicleCapacity, VehicleSlot};
use crate::TARGET_UTILIZATION;

// =============================================================================
// Options
// =============================================================================

/// Which tier is offered first when placing items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum FillStrategy {
    /// Ascending tier order (heaviest items end up at the bottom).
    #[default]
    LowerFirst,
    /// Descending tier order.
    UpperFirst,
    /// Alternates lowest and highest remaining tier, moving inward.
    Balanced,
}

impl FillStrategy {
    /// Orders the given tier orders for visiting.
    ///
    /// ## Example
    /// ```rust
    /// use stowage_core::assignment::FillStrategy;
    ///
    /// assert_eq!(FillStrategy::Balanced.visit_order(&[1, 2, 3, 4]), vec![1, 4, 2, 3]);
    /// assert_eq!(FillStrategy::UpperFirst.visit_order(&[2, 1, 3]), vec![3, 2, 1]);
    /// ```
    pub fn visit_order(&self, tier_orders: &[u32]) -> Vec<u32> {
        let mut ascending = tier_orders.to_vec();
        ascending.sort_unstable();
        ascending.dedup();

        match self {
            FillStrategy::LowerFirst => ascending,
            FillStrategy::UpperFirst => {
                ascending.reverse();
                ascending
            }
            FillStrategy::Balanced => {
                let mut order = Vec::with_capacity(ascending.len());
                let (mut lo, mut hi) = (0usize, ascending.len());
                while lo < hi {
                    order.push(ascending[lo]);
                    lo += 1;
                    if lo < hi {
                        hi -= 1;
                        order.push(ascending[hi]);
                    }
                }
                order
            }
        }
    }
}

impl fmt::Display for FillStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FillStrategy::LowerFirst => "lower-first",
            FillStrategy::UpperFirst => "upper-first",
            FillStrategy::Balanced => "balanced",
        };
        f.write_str(name)
    }
}

impl FromStr for FillStrategy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lower-first" => Ok(FillStrategy::LowerFirst),
            "upper-first" => Ok(FillStrategy::UpperFirst),
            "balanced" => Ok(FillStrategy::Balanced),
            other => Err(CoreError::InvalidConfiguration(format!(
                "unknown fill strategy '{}' (expected lower-first, upper-first or balanced)",
                other
            ))),
        }
    }
}

/// Item attribute an ordering rule sorts by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum OrderingCriterion {
    Weight,
    Volume,
    /// Fragile items rank above non-fragile ones.
    Fragility,
    /// Position in the input list.
    OriginalSequence,
    Priority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One `(criterion, direction)` sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderingRule {
    pub criterion: OrderingCriterion,
    pub direction: SortDirection,
}

impl OrderingRule {
    pub const fn new(criterion: OrderingCriterion, direction: SortDirection) -> Self {
        OrderingRule {
            criterion,
            direction,
        }
    }

    pub const fn asc(criterion: OrderingCriterion) -> Self {
        Self::new(criterion, SortDirection::Asc)
    }

    pub const fn desc(criterion: OrderingCriterion) -> Self {
        Self::new(criterion, SortDirection::Desc)
    }

    fn compare(&self, a: &(usize, &AssignableItem), b: &(usize, &AssignableItem)) -> Ordering {
        let ascending = match self.criterion {
            OrderingCriterion::Weight => a.1.total_weight_kg().total_cmp(&b.1.total_weight_kg()),
            OrderingCriterion::Volume => a.1.total_volume_m3().total_cmp(&b.1.total_volume_m3()),
            OrderingCriterion::Fragility => a.1.fragile.cmp(&b.1.fragile),
            OrderingCriterion::OriginalSequence => a.0.cmp(&b.0),
            OrderingCriterion::Priority => a.1.priority.cmp(&b.1.priority),
        };
        match self.direction {
            SortDirection::Asc => ascending,
            SortDirection::Desc => ascending.reverse(),
        }
    }
}

/// Default sort: heaviest first.
pub const DEFAULT_ORDERING: OrderingRule = OrderingRule::desc(OrderingCriterion::Weight);

/// Knobs for [`assign`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AssignOptions {
    /// First rule is the dominant sort key.
    #[serde(default = "default_ordering")]
    pub ordering: Vec<OrderingRule>,

    #[serde(default)]
    pub fill_strategy: FillStrategy,
}

fn default_ordering() -> Vec<OrderingRule> {
    vec![DEFAULT_ORDERING]
}

impl Default for AssignOptions {
    fn default() -> Self {
        AssignOptions {
            ordering: default_ordering(),
            fill_strategy: FillStrategy::default(),
        }
    }
}

impl AssignOptions {
    pub fn with_strategy(mut self, fill_strategy: FillStrategy) -> Self {
        self.fill_strategy = fill_strategy;
        self
    }

    pub fn with_ordering(mut self, ordering: Vec<OrderingRule>) -> Self {
        self.ordering = ordering;
        self
    }
}

// =============================================================================
// Assignment
// =============================================================================

/// Outcome of one [`assign`] run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AssignmentResult {
    /// True only when every item was placed.
    pub success: bool,

    /// True when `success` is false but some items were committed anyway.
    pub partial: bool,

    pub assignments: Vec<SlotAssignment>,
    pub unassigned: Vec<AssignableItem>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Sorts items by the composed ordering rules.
///
/// Rules are applied as successive stable sorts from last to first, so the
/// first rule dominates and ties fall through to the later ones, then to
/// input order.
pub fn sort_items<'a>(items: &'a [AssignableItem], rules: &[OrderingRule]) -> Vec<&'a AssignableItem> {
    let mut indexed: Vec<(usize, &AssignableItem)> = items.iter().enumerate().collect();
    for rule in rules.iter().rev() {
        indexed.sort_by(|a, b| rule.compare(a, b));
    }
    indexed.into_iter().map(|(_, item)| item).collect()
}

/// Places `items` into the free slots of `vehicle`.
///
/// ## Rules
/// - More items than free slots → immediate failure, nothing placed
/// - Each item takes the first slot at or after the shared cursor that
///   passes [`validate_slot_assignment`]
/// - An item that runs off the end of the slot list is unassigned
/// - Earlier commits survive a later failure (see module docs)
///
/// `existing` is the caller's current assignment snapshot; it is read to
/// derive occupancy and never modified.
#[instrument(skip_all, fields(vehicle_id = %vehicle.id, items = items.len(), strategy = %options.fill_strategy))]
pub fn assign(
    items: &[AssignableItem],
    vehicle: &VehicleCapacity,
    existing: &[SlotAssignment],
    options: &AssignOptions,
) -> AssignmentResult {
    let map = SlotMap::build(vehicle, existing);
    let mut result = AssignmentResult {
        warnings: map.orphan_warnings(),
        ..AssignmentResult::default()
    };

    let available = map.available_count();
    let required = items.len() as u32;
    if required > available {
        warn!(required, available, "not enough free slots, nothing assigned");
        result
            .errors
            .push(Violation::InsufficientSlots { required, available }.to_string());
        return result;
    }

    // Local working copy: free slots only, in tier visit order.
    let tier_orders: Vec<u32> = vehicle.tiers.iter().map(|t| t.order).collect();
    let mut slots: Vec<VehicleSlot> = Vec::with_capacity(available as usize);
    for order in options.fill_strategy.visit_order(&tier_orders) {
        slots.extend(
            map.slots()
                .iter()
                .filter(|s| s.tier_order == order && !s.occupied)
                .cloned(),
        );
    }

    let mut cursor = 0usize;
    for item in sort_items(items, &options.ordering) {
        let mut placed = false;

        while cursor < slots.len() {
            let slot = &mut slots[cursor];
            cursor += 1;

            let check = validate_slot_assignment(item, slot);
            if !check.is_valid {
                debug!(item_id = %item.id, slot = %slot.key(), "slot rejected");
                result.warnings.extend(check.errors);
                continue;
            }

            slot.occupied = true;
            slot.occupant_id = Some(item.id.clone());
            result.warnings.extend(check.warnings);
            result.assignments.push(SlotAssignment {
                item_id: item.id.clone(),
                vehicle_id: vehicle.id.clone(),
                tier_name: slot.tier_name.clone(),
                tier_order: slot.tier_order,
                slot_number: slot.slot_number,
                weight_kg: item.total_weight_kg(),
                volume_m3: item.total_volume_m3(),
                sequence_order: result.assignments.len() as u32 + 1,
            });
            debug!(item_id = %item.id, slot = %slot.key(), "item placed");
            placed = true;
            break;
        }

        if !placed {
            result.errors.push(
                Violation::NoFittingSlot {
                    item_id: item.id.clone(),
                }
                .to_string(),
            );
            result.unassigned.push(item.clone());
        }
    }

    result.success = result.unassigned.is_empty() && result.errors.is_empty();
    result.partial = !result.success && !result.assignments.is_empty();

    if result.success {
        debug!(placed = result.assignments.len(), "assignment complete");
    } else {
        warn!(
            placed = result.assignments.len(),
            unassigned = result.unassigned.len(),
            "assignment incomplete, committed placements kept"
        );
    }

    result
}

/// Re-sorts committed assignments by descending weight and renumbers their
/// sequence order from 1. Slots are unchanged.
pub fn optimize_order(assignments: &[SlotAssignment]) -> Vec<SlotAssignment> {
    let mut ordered = assignments.to_vec();
    ordered.sort_by(|a, b| b.weight_kg.total_cmp(&a.weight_kg));
    for (i, assignment) in ordered.iter_mut().enumerate() {
        assignment.sequence_order = i as u32 + 1;
    }
    ordered
}

// =============================================================================
// Vehicle Scoring
// =============================================================================

/// A scored candidate vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct VehicleSuggestion {
    pub vehicle_id: String,

    /// 0..=100, higher is closer to the target operating point.
    pub score: f64,

    /// Fractions (0.8 = 80%).
    pub slot_utilization: f64,
    pub weight_utilization: f64,
    pub volume_utilization: f64,

    pub reason: String,
}

const SLOT_WEIGHT: f64 = 0.4;
const WEIGHT_WEIGHT: f64 = 0.4;
const VOLUME_WEIGHT: f64 = 0.2;

fn closeness(utilization: f64) -> f64 {
    100.0 - (utilization - TARGET_UTILIZATION).abs() * 100.0
}

/// Scores one vehicle for the payload, or `None` if it cannot carry it.
///
/// ## Formula
/// ```text
/// per dimension: 100 − |utilization − 0.8| × 100
/// score        = 0.4 × slots + 0.4 × weight + 0.2 × volume
/// ```
pub fn score_vehicle(items: &[AssignableItem], vehicle: &VehicleCapacity) -> Option<VehicleSuggestion> {
    evaluate_vehicle(items, vehicle).map(|(_, suggestion)| suggestion)
}

/// Unrounded score alongside the reported suggestion.
fn evaluate_vehicle(
    items: &[AssignableItem],
    vehicle: &VehicleCapacity,
) -> Option<(f64, VehicleSuggestion)> {
    let total_slots = vehicle.total_slot_count();
    let (weight, volume) = payload_totals(items);

    if (items.len() as u32) > total_slots
        || exceeds(weight, vehicle.capacity_kg)
        || exceeds(volume, vehicle.capacity_m3)
    {
        return None;
    }

    let slot_utilization = utilization_ratio(items.len() as f64, total_slots as f64);
    let weight_utilization = utilization_ratio(weight, vehicle.capacity_kg);
    let volume_utilization = utilization_ratio(volume, vehicle.capacity_m3);

    let raw_score = SLOT_WEIGHT * closeness(slot_utilization)
        + WEIGHT_WEIGHT * closeness(weight_utilization)
        + VOLUME_WEIGHT * closeness(volume_utilization);
    let score = round_to(raw_score, 1);

    let reason = format!(
        "{} uses {}/{} slots ({}%), {}% weight and {}% volume (score {})",
        vehicle.id,
        items.len(),
        total_slots,
        round_to(slot_utilization * 100.0, 1),
        round_to(weight_utilization * 100.0, 1),
        round_to(volume_utilization * 100.0, 1),
        score
    );

    let suggestion = VehicleSuggestion {
        vehicle_id: vehicle.id.clone(),
        score,
        slot_utilization: round_to(slot_utilization, 3),
        weight_utilization: round_to(weight_utilization, 3),
        volume_utilization: round_to(volume_utilization, 3),
        reason,
    };
    Some((raw_score, suggestion))
}

/// Every candidate that can carry the payload, best first. Ranking uses the
/// unrounded score; exact ties keep candidate order.
pub fn rank_vehicles(items: &[AssignableItem], candidates: &[VehicleCapacity]) -> Vec<VehicleSuggestion> {
    let mut ranked: Vec<(f64, VehicleSuggestion)> = candidates
        .iter()
        .filter_map(|vehicle| evaluate_vehicle(items, vehicle))
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
    ranked.into_iter().map(|(_, suggestion)| suggestion).collect()
}

/// Picks the candidate whose utilization sits closest to 80% across slots,
/// weight and volume. Candidates that cannot fit are excluded, not penalized.
#[instrument(skip_all, fields(items = items.len(), candidates = candidates.len()))]
pub fn suggest_optimal_vehicle(
    items: &[AssignableItem],
    candidates: &[VehicleCapacity],
) -> Option<VehicleSuggestion> {
    let best = rank_vehicles(items, candidates).into_iter().next();
    match &best {
        Some(s) => debug!(vehicle_id = %s.vehicle_id, score = s.score, "vehicle suggested"),
        None => debug!("no candidate can carry the payload"),
    }
    best
}

// =============================================================================
// Unit Tests
// =============================================================================
