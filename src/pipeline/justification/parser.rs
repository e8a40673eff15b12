use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::sanitize::strip_think_blocks;
use super::JustificationError;

/// Fenced code blocks, optionally tagged `json`.
static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```(?:json)?\s*(.*?)\s*```").unwrap());

/// Ways of locating a JSON object inside free-form model output.
///
/// Each strategy yields candidate spans in priority order; the extractor
/// tries them until one parses as a JSON object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// The whole (trimmed) text is the object.
    WholeText,
    /// Balanced spans inside ``` fences.
    FencedBlock,
    /// Balanced spans anywhere in the text, one per opening brace.
    BraceScan,
}

/// Order in which strategies are tried.
pub const DEFAULT_STRATEGIES: [ExtractionStrategy; 3] = [
    ExtractionStrategy::WholeText,
    ExtractionStrategy::FencedBlock,
    ExtractionStrategy::BraceScan,
];

impl ExtractionStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            ExtractionStrategy::WholeText => "whole_text",
            ExtractionStrategy::FencedBlock => "fenced_block",
            ExtractionStrategy::BraceScan => "brace_scan",
        }
    }

    /// Candidate spans, produced lazily so extraction stops at the first hit.
    pub fn candidates<'a>(&self, text: &'a str) -> Box<dyn Iterator<Item = &'a str> + 'a> {
        match self {
            ExtractionStrategy::WholeText => {
                Box::new(Some(text.trim()).filter(|t| !t.is_empty()).into_iter())
            }
            ExtractionStrategy::FencedBlock => Box::new(
                CODE_FENCE
                    .captures_iter(text)
                    .filter_map(|caps| caps.get(1))
                    .flat_map(|inner| balanced_spans(inner.as_str())),
            ),
            ExtractionStrategy::BraceScan => Box::new(balanced_spans(text)),
        }
    }
}

/// Balanced `{...}` spans, one attempt per opening brace, in order of their
/// starting position. Each span is only scanned when requested.
pub fn balanced_spans(text: &str) -> impl Iterator<Item = &str> + '_ {
    text.char_indices()
        .filter(|(_, ch)| *ch == '{')
        .filter_map(move |(start, _)| balanced_end(text, start).map(|end| &text[start..=end]))
}

/// Byte index of the `}` closing the `{` at `start`, if any.
///
/// Braces inside JSON string literals do not count.
fn balanced_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }

    None
}

fn parse_object(candidate: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Recover the first JSON object from raw backend output.
pub fn extract_json_object(raw: &str) -> Result<Map<String, Value>, JustificationError> {
    extract_json_object_with(raw, &DEFAULT_STRATEGIES)
}

/// Like [`extract_json_object`] with an explicit strategy order.
pub fn extract_json_object_with(
    raw: &str,
    strategies: &[ExtractionStrategy],
) -> Result<Map<String, Value>, JustificationError> {
    let cleaned = strip_think_blocks(raw);
    let mut tried = 0usize;

    for strategy in strategies {
        for candidate in strategy.candidates(&cleaned) {
            tried += 1;
            if let Some(object) = parse_object(candidate) {
                tracing::debug!(
                    strategy = strategy.name(),
                    candidates_tried = tried,
                    "Extracted JSON object from generation output"
                );
                return Ok(object);
            }
        }
    }

    let reason = if cleaned.trim().is_empty() {
        "response is empty".to_string()
    } else if tried == 0 || !cleaned.contains('{') {
        "no JSON object found".to_string()
    } else {
        format!("none of {tried} candidate span(s) parsed as a JSON object")
    };
    tracing::warn!(
        raw_len = raw.len(),
        candidates_tried = tried,
        "Generation output has no usable JSON object"
    );

    Err(JustificationError::InvalidGenerationOutput {
        reason,
        raw: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extract(raw: &str) -> Value {
        Value::Object(extract_json_object(raw).unwrap())
    }

    #[test]
    fn bare_object_returned_unchanged() {
        let raw = r#"{"procedimento":"Consulta","justificativa":"Texto."}"#;
        assert_eq!(
            extract(raw),
            json!({"procedimento": "Consulta", "justificativa": "Texto."})
        );
    }

    #[test]
    fn fenced_block_with_prose() {
        let raw = "Segue a justificativa:\n```json\n{\"procedimento\":\"Consulta\",\"justificativa\":\"Texto.\"}\n```\nObrigado.";
        assert_eq!(extract(raw)["procedimento"], "Consulta");
    }

    #[test]
    fn untagged_and_uppercase_fences() {
        assert_eq!(extract("```\n{\"a\":1}\n```")["a"], 1);
        assert_eq!(extract("```JSON\n{\"a\":2}\n```")["a"], 2);
    }

    #[test]
    fn fence_preferred_over_earlier_bare_object() {
        let raw = "{\"draft\":true} then\n```json\n{\"final\":true}\n```";
        let object = extract(raw);
        assert_eq!(object, json!({"final": true}));
    }

    #[test]
    fn broken_fence_falls_back_to_brace_scan() {
        let raw = "```json\n{\"a\": \n```\nActually: {\"b\":2}";
        assert_eq!(extract(raw), json!({"b": 2}));
    }

    #[test]
    fn skips_unbalanced_leading_brace() {
        let raw = r#"{"a": {unterminated ... } {"procedimento":"X","justificativa":"Y"}"#;
        assert_eq!(
            extract(raw),
            json!({"procedimento": "X", "justificativa": "Y"})
        );
    }

    #[test]
    fn skips_balanced_but_invalid_span() {
        let raw = "prefix {not json} middle {\"ok\":true} suffix";
        assert_eq!(extract(raw), json!({"ok": true}));
    }

    #[test]
    fn braces_inside_strings_ignored() {
        let raw = r#"Resposta: {"justificativa":"critério } atendido { parcialmente","n":1} fim"#;
        let object = extract(raw);
        assert_eq!(object["justificativa"], "critério } atendido { parcialmente");
        assert_eq!(object["n"], 1);
    }

    #[test]
    fn escaped_quotes_inside_strings() {
        let raw = r#"x {"t":"aspas \" e } chave"} y"#;
        assert_eq!(extract(raw)["t"], "aspas \" e } chave");
    }

    #[test]
    fn nested_object_kept_whole() {
        let raw = "Result: {\"outer\":{\"inner\":[1,2]},\"k\":\"v\"} done";
        assert_eq!(extract(raw), json!({"outer": {"inner": [1, 2]}, "k": "v"}));
    }

    #[test]
    fn think_blocks_stripped_before_extraction() {
        let with_blocks = "<think>{\"wrong\":1}</think>{\"procedimento\":<think>hmm</think>\"X\"}";
        let without = "{\"procedimento\":\"X\"}";
        assert_eq!(extract(with_blocks), extract(without));
    }

    #[test]
    fn think_block_stripping_independent_of_block_count() {
        let body = "{\"procedimento\":\"X\",\"justificativa\":\"Y\"}";
        let interleaved = format!(
            "<think>a</think>pre <THINK>b\nc</think>{body}<think>d</think> post"
        );
        let pre_cleaned = format!("pre {body} post");
        assert_eq!(extract(&interleaved), extract(&pre_cleaned));
    }

    #[test]
    fn top_level_array_rejected() {
        let err = extract_json_object("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, JustificationError::InvalidGenerationOutput { .. }));
    }

    #[test]
    fn array_of_objects_yields_first_object() {
        assert_eq!(extract("[{\"a\":1},{\"b\":2}]"), json!({"a": 1}));
    }

    #[test]
    fn scalar_rejected() {
        assert!(extract_json_object("\"just a string\"").is_err());
        assert!(extract_json_object("42").is_err());
    }

    #[test]
    fn empty_response_is_invalid_output() {
        let err = extract_json_object("").unwrap_err();
        let JustificationError::InvalidGenerationOutput { reason, raw } = err else {
            panic!("expected InvalidGenerationOutput");
        };
        assert_eq!(reason, "response is empty");
        assert_eq!(raw, "");
    }

    #[test]
    fn only_think_block_is_empty_response() {
        let err = extract_json_object("<think>{\"a\":1}</think>  ").unwrap_err();
        assert!(err.to_string().contains("response is empty"));
    }

    #[test]
    fn truncated_object_fails_with_raw_text() {
        let raw = "```json\n{\"procedimento\":\"Consulta\",\"justificativa\":\"Texto";
        let err = extract_json_object(raw).unwrap_err();
        assert_eq!(err.raw_output(), Some(raw));
    }

    #[test]
    fn prose_without_braces_reports_no_object() {
        let err = extract_json_object("Desculpe, não posso ajudar.").unwrap_err();
        let JustificationError::InvalidGenerationOutput { reason, .. } = err else {
            panic!("expected InvalidGenerationOutput");
        };
        assert_eq!(reason, "no JSON object found");
    }

    #[test]
    fn unparseable_spans_report_candidate_count() {
        let err = extract_json_object("veja {isto} e {aquilo}").unwrap_err();
        let JustificationError::InvalidGenerationOutput { reason, .. } = err else {
            panic!("expected InvalidGenerationOutput");
        };
        assert_eq!(reason, "none of 3 candidate span(s) parsed as a JSON object");
    }

    #[test]
    fn first_parseable_span_wins_over_trailing_garbage() {
        let raw = format!("{{\"procedimento\":\"X\"}}{}", "{".repeat(50_000));
        assert_eq!(extract(&raw), json!({"procedimento": "X"}));

        let mut spans = balanced_spans(&raw);
        assert_eq!(spans.next(), Some("{\"procedimento\":\"X\"}"));
    }

    #[test]
    fn brace_scan_candidates_in_start_order() {
        let spans: Vec<_> = balanced_spans("{\"a\":{\"b\":1}} {x").collect();
        assert_eq!(spans, vec!["{\"a\":{\"b\":1}}", "{\"b\":1}"]);
    }

    #[test]
    fn whole_text_strategy_trims() {
        let spans: Vec<_> = ExtractionStrategy::WholeText.candidates("  {} \n").collect();
        assert_eq!(spans, vec!["{}"]);
        assert_eq!(ExtractionStrategy::WholeText.candidates(" \n").count(), 0);
    }

    #[test]
    fn fenced_strategy_looks_only_inside_fences() {
        let text = "{\"outside\":1}\n```json\n{\"inside\":2}\n```";
        let spans: Vec<_> = ExtractionStrategy::FencedBlock.candidates(text).collect();
        assert_eq!(spans, vec!["{\"inside\":2}"]);
    }

    #[test]
    fn custom_strategy_order_respected() {
        let raw = "{\"draft\":true}\n```json\n{\"final\":true}\n```";
        let object = extract_json_object_with(raw, &[ExtractionStrategy::BraceScan]).unwrap();
        assert_eq!(Value::Object(object), json!({"draft": true}));
    }
}
