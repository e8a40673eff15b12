pub mod types;
pub mod rules;
pub mod prompt;
pub mod sanitize;
pub mod parser;
pub mod normalize;
pub mod ollama;
pub mod ollama_types;
pub mod orchestrator;

pub use types::*;
pub use rules::*;
pub use prompt::*;
pub use sanitize::*;
pub use parser::*;
pub use normalize::*;
pub use ollama::*;
pub use ollama_types::*;
pub use orchestrator::*;

use thiserror::Error;

use crate::config::ConfigError;

/// A single failed call to the generation backend.
///
/// Every variant is treated as transient by the retry loop.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Generation backend is not reachable at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Generation backend returned error (status {status}): {body}")]
    Status { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Generation backend response body is not JSON: {0}")]
    Decode(String),
}

#[derive(Error, Debug)]
pub enum JustificationError {
    #[error("Invalid rule document: {0}")]
    InvalidRuleDocument(String),

    #[error("Generation backend unavailable after {attempts} attempt(s): {source}")]
    BackendUnavailable {
        attempts: u32,
        #[source]
        source: BackendError,
    },

    #[error("Generation output contained no usable JSON object: {reason}")]
    InvalidGenerationOutput { reason: String, raw: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl JustificationError {
    /// Raw backend text attached to an `InvalidGenerationOutput`, for diagnostics.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            JustificationError::InvalidGenerationOutput { raw, .. } => Some(raw),
            _ => None,
        }
    }
}
