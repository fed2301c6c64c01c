//! # Stowage Planner
//!
//! Application layer around `stowage-core`: configuration, logging and the
//! JSON commands behind the `stowage` binary.
//!
//! ## Module Organization
//! ```text
//! stowage_planner/
//! ├── lib.rs          ◄─── You are here (tracing setup & command dispatch)
//! ├── cli.rs          ◄─── clap argument definitions
//! ├── config.rs       ◄─── PlannerConfig (TOML + env + defaults)
//! ├── commands.rs     ◄─── configure_tiers, plan_dispatch, ...
//! └── error.rs        ◄─── PlannerError and the serialisable ApiError
//! ```
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Parse arguments (clap)                                              │
//! │  2. Load config under a bootstrap subscriber (RUST_LOG, else default)  │
//! │  3. Initialize tracing (RUST_LOG, else [logging] filter) on stderr     │
//! │  4. Freeze the vehicle-class table into a Planner                      │
//! │  5. Read the request, run the command, print JSON on stdout            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

use std::io::Read;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

pub use cli::{Cli, Command};
pub use commands::Planner;
pub use config::PlannerConfig;
pub use error::{ApiError, ErrorCode, PlannerError, PlannerResult};

/// Runs one CLI invocation and returns what should be printed on stdout.
pub fn run(cli: Cli) -> Result<String, ApiError> {
    let config = load_config(cli.config.clone())?;
    init_tracing(&config.logging.filter);
    info!(
        command = ?cli.command,
        config = ?PlannerConfig::resolve_path(cli.config.clone()),
        "Starting stowage planner"
    );

    let planner = Planner::new(config)?;
    execute(&cli, &planner)
}

/// Dispatches a parsed command against `planner`.
pub fn execute(cli: &Cli, planner: &Planner) -> Result<String, ApiError> {
    match &cli.command {
        Command::ConfigureTiers(args) => {
            let response = commands::configure_tiers(planner, read_request(&args.input)?)?;
            render(&response, cli.pretty)
        }
        Command::ValidatePayload(args) => {
            render(&commands::validate_payload(read_request(&args.input)?), cli.pretty)
        }
        Command::PlanDispatch(args) => {
            let plan = commands::plan_dispatch(planner, read_request(&args.input)?)?;
            render(&plan, cli.pretty)
        }
        Command::SuggestVehicle(args) => {
            render(&commands::suggest_vehicle(read_request(&args.input)?), cli.pretty)
        }
        Command::SlotOverview(args) => {
            render(&commands::slot_overview(read_request(&args.input)?), cli.pretty)
        }
        Command::FindConflicts(args) => {
            render(&commands::find_conflicts(read_request(&args.input)?), cli.pretty)
        }
        Command::InitConfig(args) => {
            let path = PlannerConfig::resolve_path(cli.config.clone()).ok_or_else(|| {
                ApiError::new(ErrorCode::ConfigError, "No config path available")
            })?;
            if path.exists() && !args.force {
                return Err(ApiError::new(
                    ErrorCode::ConfigError,
                    format!("{} already exists (use --force to overwrite)", path.display()),
                ));
            }
            let written = planner.config().save(Some(path))?;
            render(&serde_json::json!({ "path": written }), cli.pretty)
        }
        Command::ShowConfig => toml::to_string_pretty(planner.config())
            .map_err(|e| ApiError::internal(format!("Failed to render config: {}", e))),
    }
}

/// Reads and decodes a request from a file, or stdin for "-".
fn read_request<T: DeserializeOwned>(input: &str) -> PlannerResult<T> {
    let body = if input == "-" {
        let mut body = String::new();
        std::io::stdin()
            .read_to_string(&mut body)
            .map_err(|e| PlannerError::RequestUnreadable(format!("stdin: {}", e)))?;
        body
    } else {
        let path = PathBuf::from(input);
        std::fs::read_to_string(&path)
            .map_err(|e| PlannerError::RequestUnreadable(format!("{}: {}", path.display(), e)))?
    };
    Ok(serde_json::from_str(&body)?)
}

fn render<T: Serialize>(value: &T, pretty: bool) -> Result<String, ApiError> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    rendered.map_err(|e| ApiError::internal(format!("Failed to encode response: {}", e)))
}

/// Loads the planner config with a bootstrap subscriber on stderr.
///
/// The `[logging] filter` is not known until the file is read, so events
/// from the load itself use `RUST_LOG`, else the default filter.
pub fn load_config(config_path: Option<PathBuf>) -> PlannerResult<PlannerConfig> {
    load_config_with_writer(config_path, std::io::stderr)
}

fn load_config_with_writer<W>(config_path: Option<PathBuf>, writer: W) -> PlannerResult<PlannerConfig>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config::LoggingSettings::default().filter));
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .finish();
    tracing::subscriber::with_default(bootstrap, || PlannerConfig::load(config_path))
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=stowage_core=trace` - Show engine internals only
/// - Default: the `[logging] filter` config value
///
/// Logs go to stderr so stdout carries only the JSON response.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // A second initialization (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::Path;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["stowage"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    fn write(dir: &Path, name: &str, body: &str) -> String {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path.display().to_string()
    }

    const VAN_REQUEST: &str = r#"{
        "vehicle": {
            "id": "VAN-1",
            "capacityKg": 1000,
            "capacityM3": 10,
            "tiers": [
                { "name": "Lower", "order": 1, "slotCount": 3, "weightKg": 600, "volumeM3": 6 },
                { "name": "Upper", "order": 2, "slotCount": 2, "weightKg": 400, "volumeM3": 4 }
            ]
        },
        "items": [
            { "id": "clinic-a", "weightKg": 150, "volumeM3": 1 },
            { "id": "clinic-b", "weightKg": 90, "volumeM3": 0.5, "fragile": true }
        ]
    }"#;

    #[test]
    fn test_execute_validate_payload() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "request.json", VAN_REQUEST);

        let output = execute(
            &cli(&["validate-payload", "--input", &input]),
            &Planner::default(),
        )
        .unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["isValid"], true);
        assert_eq!(json["totalWeightKg"], 240.0);
        assert_eq!(json["totalSlots"], 5);
    }

    #[test]
    fn test_execute_plan_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "request.json", VAN_REQUEST);

        let output = execute(
            &cli(&["plan-dispatch", "--input", &input, "--pretty"]),
            &Planner::default(),
        )
        .unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["assignment"]["success"], true);
        assert_eq!(json["assignment"]["assignments"][0]["itemId"], "clinic-a");
        assert_eq!(json["assignment"]["assignments"][0]["tierName"], "Lower");
    }

    #[test]
    fn test_execute_reports_bad_requests() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "broken.json", "{ \"vehicle\": ");

        let err = execute(&cli(&["slot-overview", "--input", &input]), &Planner::default())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let missing = dir.path().join("absent.json").display().to_string();
        let err = execute(&cli(&["slot-overview", "--input", &missing]), &Planner::default())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(err.message.contains("absent.json"));
    }

    #[test]
    fn test_init_config_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("planner.toml").display().to_string();

        let output = execute(&cli(&["init-config", "--config", &path]), &Planner::default())
            .unwrap();
        assert!(output.contains("planner.toml"));
        assert!(Path::new(&path).exists());

        let err = execute(&cli(&["init-config", "--config", &path]), &Planner::default())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigError);

        assert!(execute(
            &cli(&["init-config", "--config", &path, "--force"]),
            &Planner::default()
        )
        .is_ok());
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_config_load_is_logged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("planner.toml");
        std::fs::write(&path, "[planning]\nfill_strategy = \"balanced\"\n").unwrap();

        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let config = load_config_with_writer(Some(path), move || writer.clone()).unwrap();
        assert_eq!(config.planning.fill_strategy.to_string(), "balanced");

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Loading planner config from file"), "{}", output);
    }

    #[test]
    fn test_show_config_prints_toml() {
        let output = execute(&cli(&["show-config"]), &Planner::default()).unwrap();
        assert!(output.contains("[planning]"));
        assert!(output.contains("fill_strategy = \"lower-first\""));
    }
}
