//! # Measurement Helpers
//!
//! Rounding and utilization arithmetic shared by every capacity check.
//!
//! ## Units
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Quantity        Unit     Stored as   Display rounding                  │
//! │  ──────────────  ───────  ──────────  ────────────────────────────────  │
//! │  Weight          kg       f64         whole kg for derived tier budgets │
//! │  Volume          m³       f64         2 decimals                        │
//! │  Dimensions      cm       f64         1 decimal                         │
//! │  Utilization     %        f64         1 decimal                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Comparisons against limits always use the unrounded values; rounding is
//! only applied to figures that are reported back to callers.
//!
//! ## Summing Loads
//! Float addition is not associative, so a payload summed in two different
//! orders can land on either side of a capacity limit. Aggregates go through
//! [`ordered_sum`] and strict limits through [`exceeds`].

/// Relative slack for load-versus-capacity comparisons (float noise only).
pub const LOAD_EPSILON: f64 = 1e-9;

/// Rounds `value` to `decimals` decimal places (half away from zero).
///
/// ## Example
/// ```rust
/// use stowage_core::measure::round_to;
///
/// assert_eq!(round_to(2.346, 2), 2.35);
/// assert_eq!(round_to(94.96, 1), 95.0);
/// ```
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Sums `values` in ascending order, so any permutation gives the same bits.
///
/// ## Example
/// ```rust
/// use stowage_core::measure::ordered_sum;
///
/// assert_eq!(ordered_sum([0.3, 0.2, 0.1]), ordered_sum([0.1, 0.3, 0.2]));
/// ```
pub fn ordered_sum<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let mut values: Vec<f64> = values.into_iter().collect();
    values.sort_by(f64::total_cmp);
    values.into_iter().fold(0.0, |acc, v| acc + v)
}

/// True when `load` is above `capacity` by more than rounding noise.
///
/// No business tolerance is applied: 1000.01 kg still exceeds 1000 kg.
pub fn exceeds(load: f64, capacity: f64) -> bool {
    load - capacity > LOAD_EPSILON * capacity.abs().max(1.0)
}

/// Used capacity as a percentage of the available capacity.
///
/// A zero (or negative) capacity yields 0% when nothing is used and
/// infinity otherwise, so an empty budget can never look "fine".
pub fn utilization_pct(used: f64, capacity: f64) -> f64 {
    if capacity <= 0.0 {
        return if used > 0.0 { f64::INFINITY } else { 0.0 };
    }
    used * 100.0 / capacity
}

/// Same as [`utilization_pct`] but as a fraction (0.8 = 80%).
pub fn utilization_ratio(used: f64, capacity: f64) -> f64 {
    utilization_pct(used, capacity) / 100.0
}

/// Count-based utilization (occupied slots over total slots).
pub fn count_utilization_pct(used: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_to(used as f64 * 100.0 / total as f64, 1)
}
