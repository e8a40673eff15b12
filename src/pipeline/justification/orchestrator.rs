use std::sync::Arc;

use serde_json::{Map, Value};
use uuid::Uuid;

use super::normalize::{normalize_justification, JUSTIFICATION_FIELD, PROCEDURE_FIELD};
use super::ollama::{generate_with_retry, OllamaClient, RetryPolicy};
use super::ollama_types::ChatRequest;
use super::parser::extract_json_object;
use super::prompt::build_messages;
use super::rules::flatten_requirements;
use super::types::{JustificationResult, LlmClient, RuleDocument};
use super::JustificationError;
use crate::config::GenerationConfig;

/// Orchestrates the justification pipeline:
/// flatten → prompt → LLM (with retry) → extract → normalize → result
///
/// Holds no mutable state; one instance can serve concurrent callers.
pub struct JustificationGenerator {
    llm: Arc<dyn LlmClient + Send + Sync>,
    config: GenerationConfig,
    retry: RetryPolicy,
}

impl JustificationGenerator {
    pub fn new(llm: Arc<dyn LlmClient + Send + Sync>, config: GenerationConfig) -> Self {
        let retry = RetryPolicy::from_config(&config);
        Self { llm, config, retry }
    }

    /// Generator talking to the Ollama backend named in `config`.
    pub fn from_config(config: GenerationConfig) -> Result<Self, JustificationError> {
        let client = OllamaClient::new(&config)?;
        Ok(Self::new(Arc::new(client), config))
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Generate the clinical justification for one procedure request.
    pub fn generate(
        &self,
        procedure: &str,
        clinical_text: &str,
        rules: &RuleDocument,
    ) -> Result<JustificationResult, JustificationError> {
        let request_id = Uuid::new_v4();
        let _span = tracing::info_span!(
            "generate_justification",
            request_id = %request_id,
            model = %self.config.model
        )
        .entered();

        // Step 1: Flatten the technical note
        let requirements = flatten_requirements(rules);

        // Step 2: Build the two-message prompt
        let messages = build_messages(procedure, clinical_text, &requirements);
        tracing::info!(
            categories = rules.categories.len(),
            requirements = rules.requirement_count(),
            clinical_len = clinical_text.len(),
            "Requesting clinical justification"
        );

        // Step 3: Call the backend with bounded retry
        let request = ChatRequest::new(&self.config, messages);
        let raw = generate_with_retry(self.llm.as_ref(), &request, &self.retry)?;
        tracing::debug!(response_len = raw.len(), "Generation backend responded");

        // Step 4: Strip reasoning traces and extract the JSON object
        let object = extract_json_object(&raw)?;

        // Step 5: Canonical paragraphs, then the typed result
        let result = into_result(normalize_justification(object), &raw)?;
        tracing::info!(
            justification_len = result.justification.len(),
            "Clinical justification generated"
        );
        Ok(result)
    }

    /// Same as [`generate`](Self::generate) with the technical note as JSON text.
    pub fn generate_from_json(
        &self,
        procedure: &str,
        clinical_text: &str,
        rules_json: &str,
    ) -> Result<JustificationResult, JustificationError> {
        let rules = RuleDocument::from_json_str(rules_json)?;
        self.generate(procedure, clinical_text, &rules)
    }
}

/// Require both fields as text; anything else the backend sent is kept in `extra`.
fn into_result(
    mut object: Map<String, Value>,
    raw: &str,
) -> Result<JustificationResult, JustificationError> {
    let procedure = take_text(&mut object, PROCEDURE_FIELD, raw)?;
    let justification = take_text(&mut object, JUSTIFICATION_FIELD, raw)?;
    Ok(JustificationResult {
        procedure,
        justification,
        extra: object,
    })
}

fn take_text(
    object: &mut Map<String, Value>,
    field: &str,
    raw: &str,
) -> Result<String, JustificationError> {
    match object.remove(field) {
        Some(Value::String(text)) => Ok(text),
        Some(_) => Err(JustificationError::InvalidGenerationOutput {
            reason: format!("field \"{field}\" is not text"),
            raw: raw.to_string(),
        }),
        None => Err(JustificationError::InvalidGenerationOutput {
            reason: format!("field \"{field}\" is missing"),
            raw: raw.to_string(),
        }),
    }
}
