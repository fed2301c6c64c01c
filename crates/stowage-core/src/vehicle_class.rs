//! # Vehicle Classes
//!
//! Static lookup from vehicle category code to tier/slot limits.
//!
//! ## Built-in Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Code        Tiers (min-max)  Default  Slots/tier  Total slots          │
//! │  ──────────  ───────────────  ───────  ──────────  ───────────          │
//! │  motorcycle  1-1              1        4           4                    │
//! │  car         1-2              1        6           8                    │
//! │  pickup      1-2              2        8           12                   │
//! │  van         1-3              2        8           18                   │
//! │  truck       1-5              3        12          48                   │
//! │  (default)   1-3              1        12          12                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Codes are matched case-insensitively. An unknown (or absent) code
//! resolves to the default entry instead of failing.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::MAX_SLOTS_PER_TIER;

/// Limits for one vehicle class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ClassConstraints {
    pub min_tiers: u32,
    pub max_tiers: u32,
    pub default_tiers: u32,
    pub max_slots_per_tier: u32,
    pub total_max_slots: u32,
}

impl ClassConstraints {
    pub const fn new(
        min_tiers: u32,
        max_tiers: u32,
        default_tiers: u32,
        max_slots_per_tier: u32,
        total_max_slots: u32,
    ) -> Self {
        ClassConstraints {
            min_tiers,
            max_tiers,
            default_tiers,
            max_slots_per_tier,
            total_max_slots,
        }
    }

    /// Entry used for unknown category codes.
    pub const DEFAULT: ClassConstraints = ClassConstraints::new(1, 3, 1, 12, 12);

    /// Checks internal consistency of the limits.
    pub fn check(&self) -> Result<(), String> {
        if self.min_tiers == 0 {
            return Err("min_tiers must be at least 1".to_string());
        }
        if self.min_tiers > self.max_tiers {
            return Err(format!(
                "min_tiers ({}) exceeds max_tiers ({})",
                self.min_tiers, self.max_tiers
            ));
        }
        if self.default_tiers < self.min_tiers || self.default_tiers > self.max_tiers {
            return Err(format!(
                "default_tiers ({}) is outside {}-{}",
                self.default_tiers, self.min_tiers, self.max_tiers
            ));
        }
        if self.max_slots_per_tier == 0 || self.max_slots_per_tier > MAX_SLOTS_PER_TIER {
            return Err(format!(
                "max_slots_per_tier must be between 1 and {}",
                MAX_SLOTS_PER_TIER
            ));
        }
        if self.total_max_slots == 0 {
            return Err("total_max_slots must be at least 1".to_string());
        }
        Ok(())
    }
}

const BUILTIN_CLASSES: &[(&str, ClassConstraints)] = &[
    ("motorcycle", ClassConstraints::new(1, 1, 1, 4, 4)),
    ("car", ClassConstraints::new(1, 2, 1, 6, 8)),
    ("pickup", ClassConstraints::new(1, 2, 2, 8, 12)),
    ("van", ClassConstraints::new(1, 3, 2, 8, 18)),
    ("truck", ClassConstraints::new(1, 5, 3, 12, 48)),
];

/// Immutable vehicle-class table.
///
/// Build it once at start-up (optionally with overrides from config) and
/// share it by reference; there are no mutating methods after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleClassTable {
    classes: BTreeMap<String, ClassConstraints>,
    default: ClassConstraints,
}

impl VehicleClassTable {
    /// The built-in table, shared process-wide.
    pub fn standard() -> &'static VehicleClassTable {
        static TABLE: OnceLock<VehicleClassTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            VehicleClassTable::with_overrides(std::iter::empty::<(&str, ClassConstraints)>())
        })
    }

    /// Built-in entries with `overrides` merged on top (same code replaces).
    pub fn with_overrides<I, S>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (S, ClassConstraints)>,
        S: AsRef<str>,
    {
        let mut classes: BTreeMap<String, ClassConstraints> = BUILTIN_CLASSES
            .iter()
            .map(|(code, c)| (code.to_string(), *c))
            .collect();
        for (code, constraints) in overrides {
            classes.insert(normalize_code(code.as_ref()), constraints);
        }
        VehicleClassTable {
            classes,
            default: ClassConstraints::DEFAULT,
        }
    }

    /// Resolves a category code, falling back to the default entry.
    pub fn resolve(&self, code: Option<&str>) -> ClassConstraints {
        code.and_then(|c| self.classes.get(&normalize_code(c)).copied())
            .unwrap_or(self.default)
    }

    /// Returns true if the code has its own entry.
    pub fn contains(&self, code: &str) -> bool {
        self.classes.contains_key(&normalize_code(code))
    }

    /// Known codes in sorted order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }
}

impl Default for VehicleClassTable {
    fn default() -> Self {
        VehicleClassTable::standard().clone()
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase()
}
