//! # stowage-core: Pure Load-Planning Logic
//!
//! This crate allocates discrete cargo items into the finite, tiered storage
//! of a vehicle and picks the best vehicle for a payload. Every function is
//! pure: no I/O, no shared state, no persistence.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stowage Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  External collaborators (registry, demand source, persistence)  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ VehicleCapacity, AssignableItem,       │
//! │                                │ existing SlotAssignments               │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ stowage-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   capacity ──► tier_validation        (authoring, once)        │   │
//! │  │      │                                                          │   │
//! │  │      ▼                                                          │   │
//! │  │   slots ──► assignment ──► vehicle scoring   (per dispatch)    │   │
//! │  │                 ▲                                               │   │
//! │  │   payload ──────┘  (strict gate, single source of truth)       │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Vehicle, tier, item, slot and assignment types
//! - [`capacity`] - Tier budgets from percentages or dimensions
//! - [`vehicle_class`] - Vehicle-class tier/slot limits
//! - [`tier_validation`] - Authoring-time tier checks (5% tolerance)
//! - [`slots`] - Slot grid, slot keys, slot/batch checks, conflicts
//! - [`assignment`] - Placement engine and vehicle scoring
//! - [`payload`] - Strict dispatch-time payload check
//! - [`measure`] - Rounding and utilization helpers
//! - [`error`] - Raised faults and the violation taxonomy
//!
//! ## Example Usage
//!
//! ```rust
//! use stowage_core::assignment::{assign, AssignOptions};
//! use stowage_core::capacity::default_tier_layout;
//! use stowage_core::{AssignableItem, VehicleCapacity};
//!
//! let vehicle = VehicleCapacity::new("VAN-1", 1000.0, 10.0)
//!     .with_tiers(default_tier_layout(3, 1000.0, 10.0));
//! let items = vec![
//!     AssignableItem::new("clinic-a", 40.0, 0.3),
//!     AssignableItem::new("clinic-b", 25.0, 0.2),
//! ];
//!
//! let result = assign(&items, &vehicle, &[], &AssignOptions::default());
//! assert!(result.success);
//! assert_eq!(result.assignments.len(), 2);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod assignment;
pub mod capacity;
pub mod error;
pub mod measure;
pub mod payload;
pub mod slots;
pub mod tier_validation;
pub mod types;
pub mod vehicle_class;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, Violation};
pub use types::*;
pub use vehicle_class::{ClassConstraints, VehicleClassTable};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum tiers any vehicle may declare, regardless of class.
pub const MAX_TIERS: u32 = 10;

/// Maximum slots in a single tier, regardless of class.
pub const MAX_SLOTS_PER_TIER: u32 = 12;

/// Slots per tier used by the canonical default layouts.
pub const DEFAULT_SLOTS_PER_TIER: u32 = 4;

/// Smallest weight budget a tier may declare (kg).
pub const MIN_TIER_WEIGHT_KG: f64 = 10.0;

/// Smallest volume budget a tier may declare (m³).
pub const MIN_TIER_VOLUME_M3: f64 = 0.01;

/// Authoring-time allowance over vehicle capacity for the sum of tiers.
///
/// ## Business Reason
/// Tier budgets are rounded by hand during onboarding; 5% absorbs that.
/// Dispatch-time checks have no such allowance.
pub const TIER_CAPACITY_TOLERANCE: f64 = 0.05;

/// Slot fill ratio above which a placement is flagged.
pub const SLOT_WARNING_RATIO: f64 = 0.9;

/// Batch utilization (%) above which a warning is raised.
pub const BATCH_WARNING_PCT: f64 = 95.0;

/// Payload utilization (%) above which a warning is raised.
pub const PAYLOAD_WARNING_PCT: f64 = 90.0;

/// Utilization the vehicle scorers aim for (80%).
pub const TARGET_UTILIZATION: f64 = 0.8;
