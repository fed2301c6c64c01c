//! # Stowage CLI Entry Point
//!
//! ```text
//! stowage <command> --input <request.json> [--config <file>] [--pretty]
//! ```
//!
//! Prints the JSON response on stdout. On failure prints the `ApiError` as
//! JSON on stdout and exits with status 1.

use clap::Parser;
use stowage_planner::Cli;

fn main() {
    let cli = Cli::parse();

    match stowage_planner::run(cli) {
        Ok(output) => println!("{}", output),
        Err(err) => {
            let body = serde_json::to_string(&err).unwrap_or_else(|_| err.to_string());
            println!("{}", body);
            std::process::exit(1);
        }
    }
}
