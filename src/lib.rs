pub mod commands;
pub mod config;
pub mod pipeline;

use std::io::Read;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use crate::commands::justification::{generate_justification, JustificationRequest};
use crate::config::GenerationConfig;
use crate::pipeline::justification::JustificationGenerator;

/// Read one justification request from stdin and print the result as JSON.
pub fn run() -> ExitCode {
    // Local .env is optional; real environment variables take precedence.
    let _ = dotenvy::dotenv();

    // Initialize tracing (stderr, so stdout carries only the result)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    match run_once() {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            tracing::error!(error = %message, "Justification request failed");
            ExitCode::FAILURE
        }
    }
}

fn run_once() -> Result<String, String> {
    let config = GenerationConfig::from_env().map_err(|e| e.to_string())?;
    let generator = JustificationGenerator::from_config(config).map_err(|e| e.to_string())?;

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .map_err(|e| format!("Cannot read request from stdin: {e}"))?;
    let request: JustificationRequest =
        serde_json::from_str(&input).map_err(|e| format!("Malformed request: {e}"))?;

    let result = generate_justification(&generator, &request).map_err(|e| e.to_string())?;
    serde_json::to_string_pretty(&result).map_err(|e| e.to_string())
}
