//! # Capacity Configurator
//!
//! Derives tier-level weight/volume budgets from percentage splits or from
//! physical dimensions, and the inverse. Pure arithmetic.
//!
//! ## Where This Runs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Vehicle onboarding (once per vehicle)                                  │
//! │                                                                         │
//! │  Cargo box 400×200×180 cm ──► volume_from_dimensions ──► 14.4 m³        │
//! │                                                                         │
//! │  Tier count 3 ─────────────► default_tier_layout ──► Lower  30%         │
//! │                                                      Middle 40%         │
//! │                                                      Upper  30%         │
//! │                                                                         │
//! │  Percentages ──────────────► tier_capacities_from_percentages ──► kg/m³ │
//! │  Absolutes ────────────────► tier_percentages_from_absolutes ──► %      │
//! │                                                                         │
//! │  Result feeds the Tier Validator, then is frozen for dispatch.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rounding
//! Derived weights are whole kilograms, derived volumes keep 2 decimals and
//! percentages keep 2 decimals.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::measure::round_to;
use crate::types::{TierConfig, VehicleCapacity};
use crate::DEFAULT_SLOTS_PER_TIER;

const CUBIC_CM_PER_CUBIC_M: f64 = 1_000_000.0;

/// Cargo-box dimensions in centimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Dimensions {
    pub length_cm: f64,
    pub width_cm: f64,
    pub height_cm: f64,
}

// =============================================================================
// Dimensions <-> Volume
// =============================================================================

/// Converts length/width/height in centimeters to cubic meters (2 decimals).
///
/// ## Example
/// ```rust
/// use stowage_core::capacity::volume_from_dimensions;
///
/// assert_eq!(volume_from_dimensions(400.0, 200.0, 180.0).unwrap(), 14.4);
/// assert!(volume_from_dimensions(0.0, 200.0, 180.0).is_err());
/// ```
pub fn volume_from_dimensions(length_cm: f64, width_cm: f64, height_cm: f64) -> CoreResult<f64> {
    for (field, value) in [
        ("length", length_cm),
        ("width", width_cm),
        ("height", height_cm),
    ] {
        // Written as a negated comparison so NaN is rejected too.
        if !(value > 0.0) {
            return Err(CoreError::InvalidDimension {
                field: field.to_string(),
                value,
            });
        }
    }

    Ok(round_to(
        length_cm * width_cm * height_cm / CUBIC_CM_PER_CUBIC_M,
        2,
    ))
}

/// Estimates box dimensions for a volume, assuming a 2:1:1
/// length:width:height ratio. Results are in centimeters, 1 decimal.
pub fn dimensions_from_volume(volume_m3: f64) -> CoreResult<Dimensions> {
    if !(volume_m3 > 0.0) {
        return Err(CoreError::InvalidVolume(volume_m3));
    }

    // V = 2x · x · x
    let side_m = (volume_m3 / 2.0).cbrt();
    Ok(Dimensions {
        length_cm: round_to(side_m * 2.0 * 100.0, 1),
        width_cm: round_to(side_m * 100.0, 1),
        height_cm: round_to(side_m * 100.0, 1),
    })
}

impl VehicleCapacity {
    /// Creates an untiered vehicle whose volume comes from its cargo-box
    /// dimensions.
    pub fn from_dimensions(
        id: impl Into<String>,
        capacity_kg: f64,
        dimensions: Dimensions,
    ) -> CoreResult<Self> {
        let volume = volume_from_dimensions(
            dimensions.length_cm,
            dimensions.width_cm,
            dimensions.height_cm,
        )?;
        Ok(VehicleCapacity::new(id, capacity_kg, volume))
    }
}

// =============================================================================
// Percentages <-> Absolutes
// =============================================================================

/// Fills in absolute capacities for tiers that only carry percentages.
///
/// ## Rules
/// - Absolute = `round(pct / 100 × total)` (kg to whole units, m³ to 2 decimals)
/// - A tier that already has an absolute value keeps it untouched
/// - A tier with neither stays empty (the Tier Validator will flag it)
pub fn tier_capacities_from_percentages(
    tiers: &[TierConfig],
    total_kg: f64,
    total_m3: f64,
) -> Vec<TierConfig> {
    tiers
        .iter()
        .map(|tier| {
            let mut tier = tier.clone();
            if tier.weight_kg.is_none() {
                tier.weight_kg = tier.weight_pct.map(|pct| (pct / 100.0 * total_kg).round());
            }
            if tier.volume_m3.is_none() {
                tier.volume_m3 = tier
                    .volume_pct
                    .map(|pct| round_to(pct / 100.0 * total_m3, 2));
            }
            tier
        })
        .collect()
}

/// Computes percentages from absolute capacities.
///
/// The denominator is the vehicle total when given, otherwise the sum of the
/// tiers' absolute values. Tiers without an absolute value keep whatever
/// percentage they had.
pub fn tier_percentages_from_absolutes(
    tiers: &[TierConfig],
    total_kg: Option<f64>,
    total_m3: Option<f64>,
) -> Vec<TierConfig> {
    let weight_base = total_kg.unwrap_or_else(|| tiers.iter().filter_map(|t| t.weight_kg).sum());
    let volume_base = total_m3.unwrap_or_else(|| tiers.iter().filter_map(|t| t.volume_m3).sum());

    tiers
        .iter()
        .map(|tier| {
            let mut tier = tier.clone();
            if let Some(kg) = tier.weight_kg {
                tier.weight_pct = Some(share_pct(kg, weight_base));
            }
            if let Some(m3) = tier.volume_m3 {
                tier.volume_pct = Some(share_pct(m3, volume_base));
            }
            tier
        })
        .collect()
}

fn share_pct(part: f64, whole: f64) -> f64 {
    if whole <= 0.0 {
        return 0.0;
    }
    round_to(part * 100.0 / whole, 2)
}

// =============================================================================
// Default Layouts
// =============================================================================

/// Canonical tier layout for a tier count.
///
/// ```text
/// 1 tier  ──► Main 100%
/// 3 tiers ──► Lower 30% │ Middle 40% │ Upper 30%
/// N tiers ──► Tier 1 … Tier N, equal split
/// ```
///
/// Each tier gets [`DEFAULT_SLOTS_PER_TIER`] slots plus both percentage and
/// absolute budgets.
pub fn default_tier_layout(tier_count: u32, total_kg: f64, total_m3: f64) -> Vec<TierConfig> {
    let splits: Vec<(String, f64)> = match tier_count {
        0 => Vec::new(),
        1 => vec![("Main".to_string(), 100.0)],
        3 => vec![
            ("Lower".to_string(), 30.0),
            ("Middle".to_string(), 40.0),
            ("Upper".to_string(), 30.0),
        ],
        n => {
            let share = round_to(100.0 / n as f64, 2);
            (1..=n).map(|i| (format!("Tier {}", i), share)).collect()
        }
    };

    let tiers: Vec<TierConfig> = splits
        .into_iter()
        .zip(1u32..)
        .map(|((name, pct), order)| {
            TierConfig::new(name, order, DEFAULT_SLOTS_PER_TIER).with_percentages(pct, pct)
        })
        .collect();

    tier_capacities_from_percentages(&tiers, total_kg, total_m3)
}

// =============================================================================
// Unit Tests
// =============================================================================
