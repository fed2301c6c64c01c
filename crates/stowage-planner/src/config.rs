//! # Planner Configuration
//!
//! Configuration management for the planner.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STOWAGE_FILL_STRATEGY=balanced                                     │
//! │     STOWAGE_LOG=debug                                                  │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     --config <file>, else $STOWAGE_CONFIG, else                        │
//! │     ~/.config/stowage/planner.toml (Linux)                             │
//! │     ~/Library/Application Support/com.stowage.planner/planner.toml     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     lower-first, weight descending, built-in vehicle classes           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # planner.toml
//! [planning]
//! fill_strategy = "lower-first"  # lower-first | upper-first | balanced
//! ordering = [
//!     { criterion = "fragility", direction = "desc" },
//!     { criterion = "weight", direction = "desc" },
//! ]
//!
//! [[vehicle_classes]]
//! code = "cargo-bike"
//! min_tiers = 1
//! max_tiers = 2
//! default_tiers = 1
//! max_slots_per_tier = 3
//! total_max_slots = 4
//!
//! [logging]
//! filter = "info,stowage=debug"
//! ```
//!
//! Vehicle-class entries are merged onto the built-in table once, when the
//! planner is created. The resulting table is never modified afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use stowage_core::assignment::{AssignOptions, FillStrategy, OrderingRule, DEFAULT_ORDERING};
use stowage_core::{ClassConstraints, VehicleClassTable};

use crate::error::{PlannerError, PlannerResult};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "STOWAGE_CONFIG";

/// Environment variable overriding `planning.fill_strategy`.
pub const FILL_STRATEGY_ENV: &str = "STOWAGE_FILL_STRATEGY";

/// Environment variable overriding `logging.filter`.
pub const LOG_FILTER_ENV: &str = "STOWAGE_LOG";

// =============================================================================
// Planning Settings
// =============================================================================

/// Defaults applied to every assignment run that does not bring its own
/// options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningSettings {
    #[serde(default)]
    pub fill_strategy: FillStrategy,

    /// First rule is the dominant sort key.
    #[serde(default = "default_ordering")]
    pub ordering: Vec<OrderingRule>,
}

fn default_ordering() -> Vec<OrderingRule> {
    vec![DEFAULT_ORDERING]
}

impl Default for PlanningSettings {
    fn default() -> Self {
        PlanningSettings {
            fill_strategy: FillStrategy::default(),
            ordering: default_ordering(),
        }
    }
}

impl PlanningSettings {
    /// Assignment options built from these settings.
    pub fn assign_options(&self) -> AssignOptions {
        AssignOptions {
            ordering: self.ordering.clone(),
            fill_strategy: self.fill_strategy,
        }
    }
}

// =============================================================================
// Vehicle Class Entries
// =============================================================================

/// Additional or overriding vehicle-class limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleClassEntry {
    /// Category code, matched case-insensitively.
    pub code: String,
    pub min_tiers: u32,
    pub max_tiers: u32,
    pub default_tiers: u32,
    pub max_slots_per_tier: u32,
    pub total_max_slots: u32,
}

impl VehicleClassEntry {
    pub fn constraints(&self) -> ClassConstraints {
        ClassConstraints::new(
            self.min_tiers,
            self.max_tiers,
            self.default_tiers,
            self.max_slots_per_tier,
            self.total_max_slots,
        )
    }
}

// =============================================================================
// Logging Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `tracing-subscriber` env-filter directive. `RUST_LOG` wins over this.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "info,stowage=debug".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_log_filter(),
        }
    }
}

// =============================================================================
// Main Planner Configuration
// =============================================================================

/// Complete planner configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default)]
    pub planning: PlanningSettings,

    #[serde(default)]
    pub vehicle_classes: Vec<VehicleClassEntry>,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl PlannerConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (planner.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> PlannerResult<Self> {
        let mut config = Self::default();

        if let Some(path) = Self::resolve_path(config_path) {
            if path.exists() {
                info!(?path, "Loading planner config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load planner config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file as pretty TOML.
    pub fn save(&self, config_path: Option<PathBuf>) -> PlannerResult<PathBuf> {
        let path = Self::resolve_path(config_path)
            .ok_or_else(|| PlannerError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PlannerError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| PlannerError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Planner config saved");
        Ok(path)
    }

    /// Validates the configuration.
    ///
    /// ## Rules
    /// - Every vehicle-class entry has a code, and codes are unique
    /// - Entry limits are consistent (min ≤ default ≤ max, slot limits 1-12)
    /// - The log filter parses
    pub fn validate(&self) -> PlannerResult<()> {
        let mut seen = HashSet::new();
        for entry in &self.vehicle_classes {
            let code = entry.code.trim().to_lowercase();
            if code.is_empty() {
                return Err(PlannerError::InvalidConfig(
                    "vehicle class code must not be empty".into(),
                ));
            }
            if !seen.insert(code) {
                return Err(PlannerError::InvalidConfig(format!(
                    "vehicle class '{}' is defined more than once",
                    entry.code
                )));
            }
            entry.constraints().check().map_err(|reason| {
                PlannerError::InvalidConfig(format!("vehicle class '{}': {}", entry.code, reason))
            })?;
        }

        EnvFilter::try_new(&self.logging.filter).map_err(|e| {
            PlannerError::InvalidConfig(format!(
                "invalid log filter '{}': {}",
                self.logging.filter, e
            ))
        })?;

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup.
    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(strategy) = lookup(FILL_STRATEGY_ENV) {
            match strategy.parse::<FillStrategy>() {
                Ok(parsed) => {
                    debug!(strategy = %parsed, "Overriding fill strategy from environment");
                    self.planning.fill_strategy = parsed;
                }
                Err(e) => warn!(value = %strategy, "Ignoring {}: {}", FILL_STRATEGY_ENV, e),
            }
        }

        if let Some(filter) = lookup(LOG_FILTER_ENV) {
            self.logging.filter = filter;
        }
    }

    /// Explicit path, else `STOWAGE_CONFIG`, else the platform config dir.
    pub fn resolve_path(config_path: Option<PathBuf>) -> Option<PathBuf> {
        config_path
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
            .or_else(Self::default_config_path)
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "stowage", "planner")
            .map(|dirs| dirs.config_dir().join("planner.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Built-in vehicle classes with this config's entries merged on top.
    pub fn class_table(&self) -> VehicleClassTable {
        VehicleClassTable::with_overrides(
            self.vehicle_classes
                .iter()
                .map(|entry| (entry.code.as_str(), entry.constraints())),
        )
    }

    pub fn assign_options(&self) -> AssignOptions {
        self.planning.assign_options()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use stowage_core::assignment::{OrderingCriterion, SortDirection};

    fn cargo_bike() -> VehicleClassEntry {
        VehicleClassEntry {
            code: "cargo-bike".to_string(),
            min_tiers: 1,
            max_tiers: 2,
            default_tiers: 1,
            max_slots_per_tier: 3,
            total_max_slots: 4,
        }
    }

    #[test]
    fn test_default_config() {
        let config = PlannerConfig::default();
        assert_eq!(config.planning.fill_strategy, FillStrategy::LowerFirst);
        assert_eq!(config.planning.ordering, vec![DEFAULT_ORDERING]);
        assert_eq!(config.logging.filter, "info,stowage=debug");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let config: PlannerConfig = toml::from_str(
            r#"
            [planning]
            fill_strategy = "balanced"
            ordering = [
                { criterion = "fragility", direction = "desc" },
                { criterion = "weight", direction = "asc" },
            ]

            [[vehicle_classes]]
            code = "cargo-bike"
            min_tiers = 1
            max_tiers = 2
            default_tiers = 1
            max_slots_per_tier = 3
            total_max_slots = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.planning.fill_strategy, FillStrategy::Balanced);
        assert_eq!(config.planning.ordering[0].criterion, OrderingCriterion::Fragility);
        assert_eq!(config.planning.ordering[1].direction, SortDirection::Asc);
        assert_eq!(config.vehicle_classes, vec![cargo_bike()]);
        assert_eq!(config.logging, LoggingSettings::default());
    }

    #[test]
    fn test_config_validation() {
        let mut config = PlannerConfig::default();
        config.vehicle_classes.push(cargo_bike());
        assert!(config.validate().is_ok());

        // Duplicate codes (case-insensitive)
        let mut dup = cargo_bike();
        dup.code = "Cargo-Bike".to_string();
        config.vehicle_classes.push(dup);
        assert!(config.validate().is_err());

        // Inconsistent limits
        let mut config = PlannerConfig::default();
        let mut bad = cargo_bike();
        bad.min_tiers = 3;
        config.vehicle_classes.push(bad);
        assert!(config.validate().is_err());

        // Per-tier slots above the global limit
        let mut config = PlannerConfig::default();
        let mut wide = cargo_bike();
        wide.max_slots_per_tier = 13;
        config.vehicle_classes.push(wide);
        assert!(config.validate().is_err());

        // Broken log filter
        let mut config = PlannerConfig::default();
        config.logging.filter = "stowage=loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            (FILL_STRATEGY_ENV, "upper-first"),
            (LOG_FILTER_ENV, "warn"),
        ]
        .into_iter()
        .collect();

        let mut config = PlannerConfig::default();
        config.apply_overrides_from(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.planning.fill_strategy, FillStrategy::UpperFirst);
        assert_eq!(config.logging.filter, "warn");
    }

    #[test]
    fn test_unknown_strategy_override_is_ignored() {
        let mut config = PlannerConfig::default();
        config.apply_overrides_from(|key| {
            (key == FILL_STRATEGY_ENV).then(|| "diagonal".to_string())
        });
        assert_eq!(config.planning.fill_strategy, FillStrategy::LowerFirst);
    }

    #[test]
    fn test_class_table_merges_entries() {
        let mut config = PlannerConfig::default();
        config.vehicle_classes.push(cargo_bike());
        let table = config.class_table();
        assert!(table.contains("CARGO-BIKE"));
        assert!(table.contains("truck"));
        assert_eq!(table.resolve(Some("cargo-bike")).total_max_slots, 4);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("planner.toml");

        let mut config = PlannerConfig::default();
        config.planning.fill_strategy = FillStrategy::Balanced;
        config.vehicle_classes.push(cargo_bike());

        let written = config.save(Some(path.clone())).unwrap();
        assert_eq!(written, path);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[planning]"));
        assert!(contents.contains("fill_strategy = \"balanced\""));

        let reloaded: PlannerConfig = toml::from_str(&contents).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("planner.toml");
        std::fs::write(&path, "[planning]\nfill_strategy = \"sideways\"\n").unwrap();
        assert!(matches!(
            PlannerConfig::load(Some(path)),
            Err(PlannerError::ConfigLoadFailed(_))
        ));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PlannerConfig::load_or_default(Some(dir.path().join("absent.toml")));
        assert_eq!(config.vehicle_classes, Vec::new());
    }
}
