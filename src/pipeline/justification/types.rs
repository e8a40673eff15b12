use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::BackendError;
use super::ollama_types::ChatRequest;

/// Technical note: ordered categories, each with ordered requirements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDocument {
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: Option<String>,
    pub description: Option<String>,
    pub requirements: Vec<Requirement>,
}

/// A single eligibility requirement ("ER") of the technical note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// One requirement as the procedure catalog lists it, carrying its category.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlatRequirement {
    #[serde(rename = "Nome", default)]
    pub name: Option<String>,
    #[serde(rename = "Descricao", default)]
    pub description: Option<String>,
    #[serde(rename = "categoria", default)]
    pub category: Option<FlatCategory>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlatCategory {
    #[serde(rename = "Nome", default)]
    pub name: Option<String>,
    #[serde(rename = "Descricao", default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

/// Final justification handed back to the caller.
///
/// `extra` keeps any additional fields the backend emitted alongside the two
/// required ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JustificationResult {
    #[serde(rename = "procedimento")]
    pub procedure: String,
    #[serde(rename = "justificativa")]
    pub justification: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Generation backend abstraction (allows mocking).
///
/// One call is one attempt; retrying is the caller's concern.
pub trait LlmClient {
    fn chat(&self, request: &ChatRequest) -> Result<String, BackendError>;
}
