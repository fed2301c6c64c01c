//! # Error Types
//!
//! Domain-specific error types for stowage-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stowage-core errors (this file)                                       │
//! │  ├── CoreError   - Raised faults (bad input, assert entry points)      │
//! │  └── Violation   - Business-rule findings carried inside results       │
//! │                                                                         │
//! │  stowage-planner errors (separate crate)                               │
//! │  ├── PlannerError - Config / I/O failures                              │
//! │  └── ApiError     - What callers see (serialized)                      │
//! │                                                                         │
//! │  Flow: Violation → *Validation result → (assert) CoreError → ApiError  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Raise vs. Report
//! Validators never raise for expected business-rule violations. They return
//! a result with a validity flag plus error/warning lists built from
//! [`Violation`]s. Only malformed input (a negative dimension, a key that
//! cannot be parsed) and the explicit assert entry point produce a
//! [`CoreError`].

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

// =============================================================================
// Core Error
// =============================================================================

/// Faults raised by fail-fast operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// A length measurement was zero or negative.
    #[error("Invalid dimension: {field} must be greater than 0 (got {value})")]
    InvalidDimension { field: String, value: f64 },

    /// A volume was zero or negative.
    #[error("Invalid volume: must be greater than 0 (got {0})")]
    InvalidVolume(f64),

    /// A slot key could not be parsed back into its components.
    #[error("Invalid slot key '{key}': {reason}")]
    InvalidSlotKey { key: String, reason: String },

    /// A payload failed the strict capacity check.
    ///
    /// ## When This Occurs
    /// Only [`crate::payload::assert_payload`] produces this. It carries every
    /// error message the validator reported.
    #[error("Payload exceeds capacity of vehicle {vehicle_id}: {}", .errors.join("; "))]
    CapacityExceeded {
        vehicle_id: String,
        errors: Vec<String>,
    },

    /// Structurally unusable configuration (e.g. NaN capacity).
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

// =============================================================================
// Violation
// =============================================================================

/// A business-rule finding, hard or soft.
///
/// ## Severity
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  HARD (blocks the operation)        SOFT (advisory only)               │
/// │  ───────────────────────────        ────────────────────               │
/// │  TierCountOutOfRange                TierCapacityWarning (100-105%)     │
/// │  InvalidSlotCount                   NearCapacity                       │
/// │  TotalSlotsExceeded                 SlotNearCapacity                   │
/// │  NonSequentialTierOrder             OrphanedAssignment                 │
/// │  DuplicateTierName                                                     │
/// │  TierBelowMinimum                                                      │
/// │  TierCapacityExceeded (>105%)                                          │
/// │  InsufficientSlots                                                     │
/// │  CapacityExceeded                                                      │
/// │  SlotAlreadyOccupied                                                   │
/// │  SlotCapacityExceeded                                                  │
/// │  SlotConflict                                                          │
/// │  NoFittingSlot                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "camelCase")]
#[ts(export)]
pub enum Violation {
    #[error("Tier count {count} is outside the allowed range {min}-{max} for vehicle class '{class}'")]
    TierCountOutOfRange {
        class: String,
        count: u32,
        min: u32,
        max: u32,
    },

    #[error("Tier '{tier}' has {slot_count} slots; slot count must be between 1 and {max}")]
    InvalidSlotCount {
        tier: String,
        slot_count: u32,
        max: u32,
    },

    #[error("Total slot count {total} exceeds the maximum of {max} for vehicle class '{class}'")]
    TotalSlotsExceeded { class: String, total: u32, max: u32 },

    #[error("Tier orders must be sequential starting at 1 (expected {expected}, found {found})")]
    NonSequentialTierOrder { expected: u32, found: u32 },

    #[error("Duplicate tier name '{name}'")]
    DuplicateTierName { name: String },

    #[error("Tier '{tier}' {dimension} {value} {unit} is below the minimum of {min} {unit}")]
    TierBelowMinimum {
        tier: String,
        dimension: String,
        unit: String,
        value: f64,
        min: f64,
    },

    #[error("Total tier {dimension} {total} {unit} exceeds vehicle capacity {capacity} {unit} by more than 5%")]
    TierCapacityExceeded {
        dimension: String,
        unit: String,
        total: f64,
        capacity: f64,
    },

    #[error("Warning: total tier {dimension} {total} {unit} exceeds vehicle capacity {capacity} {unit} (within 5% tolerance)")]
    TierCapacityWarning {
        dimension: String,
        unit: String,
        total: f64,
        capacity: f64,
    },

    #[error("Insufficient slots: {required} items but only {available} available")]
    InsufficientSlots { required: u32, available: u32 },

    #[error("{dimension} exceeds capacity by {excess} {unit} ({total} {unit} / {capacity} {unit})")]
    CapacityExceeded {
        dimension: String,
        unit: String,
        total: f64,
        capacity: f64,
        excess: f64,
    },

    #[error("{dimension} at {utilization}% capacity")]
    NearCapacity { dimension: String, utilization: f64 },

    #[error("Slot {slot_key} is already occupied by {occupant}")]
    SlotAlreadyOccupied { slot_key: String, occupant: String },

    #[error("Item {item_id} {dimension} {load} exceeds slot {slot_key} capacity {capacity}")]
    SlotCapacityExceeded {
        item_id: String,
        slot_key: String,
        dimension: String,
        load: f64,
        capacity: f64,
    },

    #[error("Item {item_id} fills {utilization}% of slot {slot_key} {dimension} capacity")]
    SlotNearCapacity {
        item_id: String,
        slot_key: String,
        dimension: String,
        utilization: f64,
    },

    #[error("Assignment of item {item_id} references slot {slot_key}, which is not part of the current layout")]
    OrphanedAssignment { item_id: String, slot_key: String },

    #[error("Slot {slot_key} is claimed by multiple items: {}", .item_ids.join(", "))]
    SlotConflict {
        slot_key: String,
        item_ids: Vec<String>,
    },

    #[error("Item {item_id} could not be placed: no remaining slot can hold it")]
    NoFittingSlot { item_id: String },
}

impl Violation {
    /// Returns true for advisory findings that never block an operation.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Violation::TierCapacityWarning { .. }
                | Violation::NearCapacity { .. }
                | Violation::SlotNearCapacity { .. }
                | Violation::OrphanedAssignment { .. }
        )
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidDimension {
            field: "length".to_string(),
            value: -5.0,
        };
        assert_eq!(
            err.to_string(),
            "Invalid dimension: length must be greater than 0 (got -5)"
        );

        let err = CoreError::CapacityExceeded {
            vehicle_id: "VAN-1".to_string(),
            errors: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(err.to_string(), "Payload exceeds capacity of vehicle VAN-1: a; b");
    }

    #[test]
    fn test_violation_messages() {
        let v = Violation::InsufficientSlots {
            required: 5,
            available: 4,
        };
        assert_eq!(
            v.to_string(),
            "Insufficient slots: 5 items but only 4 available"
        );

        let v = Violation::CapacityExceeded {
            dimension: "Weight".to_string(),
            unit: "kg".to_string(),
            total: 1050.0,
            capacity: 1000.0,
            excess: 50.0,
        };
        assert_eq!(
            v.to_string(),
            "Weight exceeds capacity by 50 kg (1050 kg / 1000 kg)"
        );

        let v = Violation::SlotConflict {
            slot_key: "V1::Lower::1".to_string(),
            item_ids: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(
            v.to_string(),
            "Slot V1::Lower::1 is claimed by multiple items: a, b"
        );
    }

    #[test]
    fn test_warning_classification() {
        assert!(Violation::NearCapacity {
            dimension: "Weight".to_string(),
            utilization: 95.0,
        }
        .is_warning());
        assert!(!Violation::DuplicateTierName {
            name: "Lower".to_string(),
        }
        .is_warning());
    }

    #[test]
    fn test_violation_serializes_with_kind_tag() {
        let v = Violation::DuplicateTierName {
            name: "Upper".to_string(),
        };
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["kind"], "duplicateTierName");
        assert_eq!(json["name"], "Upper");
    }
}
