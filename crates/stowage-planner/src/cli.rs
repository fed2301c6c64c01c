//! CLI command definitions and argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Stowage - plan tiered vehicle loads from JSON requests.
#[derive(Debug, Parser)]
#[command(name = "stowage")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "STOWAGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build (or complete) and validate a vehicle's tier layout
    ConfigureTiers(RequestArgs),

    /// Check a payload against a vehicle's total capacity
    ValidatePayload(RequestArgs),

    /// Gate, place and sequence a payload on a vehicle
    PlanDispatch(RequestArgs),

    /// Pick the best vehicle for a payload
    SuggestVehicle(RequestArgs),

    /// Show the slot grid and utilization of a vehicle
    SlotOverview(RequestArgs),

    /// Report slots claimed by more than one assignment
    FindConflicts(RequestArgs),

    /// Write the effective configuration to the config file
    InitConfig(InitConfigArgs),

    /// Print the effective configuration as TOML
    ShowConfig,
}

/// Arguments shared by the request/response commands.
#[derive(Debug, Args)]
pub struct RequestArgs {
    /// Request JSON file ("-" reads stdin)
    #[arg(short, long, default_value = "-")]
    pub input: String,
}

/// Arguments for the init-config command.
#[derive(Debug, Args)]
pub struct InitConfigArgs {
    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}
