//! Inbound command for clinical-justification generation.
//!
//! Accepts the technical note either as the catalog's flat requirement list
//! (`ers`) or as a nested rule document (`nota_tecnica`).

use serde::Deserialize;
use serde_json::Value;

use crate::pipeline::justification::{
    JustificationError, JustificationGenerator, JustificationResult, RuleDocument,
};

/// One justification request as received from the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct JustificationRequest {
    pub procedimento: String,
    pub clinico_text: String,
    #[serde(default)]
    pub ers: Option<Value>,
    #[serde(default)]
    pub nota_tecnica: Option<Value>,
}

impl JustificationRequest {
    /// Rule document from whichever form the request carries.
    /// `nota_tecnica` wins when both are present.
    pub fn rule_document(&self) -> Result<RuleDocument, JustificationError> {
        match (&self.nota_tecnica, &self.ers) {
            (Some(note), _) => RuleDocument::from_value(note),
            (None, Some(ers)) => RuleDocument::from_flat_value(ers),
            (None, None) => Err(JustificationError::InvalidRuleDocument(
                "request carries neither \"ers\" nor \"nota_tecnica\"".into(),
            )),
        }
    }
}

/// Generate a justification for `request`.
pub fn generate_justification(
    generator: &JustificationGenerator,
    request: &JustificationRequest,
) -> Result<JustificationResult, JustificationError> {
    let rules = request.rule_document()?;
    generator.generate(&request.procedimento, &request.clinico_text, &rules)
}
