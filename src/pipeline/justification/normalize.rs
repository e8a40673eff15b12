use serde_json::{Map, Value};

/// Field holding the narrative justification text.
pub const JUSTIFICATION_FIELD: &str = "justificativa";

/// Field holding the procedure name.
pub const PROCEDURE_FIELD: &str = "procedimento";

/// Line boundaries: `\n`, `\r`, vertical tab, form feed, the ASCII
/// file/group/record separators, NEL, and the Unicode line and paragraph
/// separators.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0b}' | '\u{0c}' | '\u{1c}'..='\u{1e}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Collapse arbitrary line wrapping into paragraphs separated by one blank line.
pub fn normalize_paragraphs(text: &str) -> String {
    text.split(is_line_break)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Normalize the justification field in place when it is text.
///
/// Absent or non-text justifications and every other field pass through.
pub fn normalize_justification(mut object: Map<String, Value>) -> Map<String, Value> {
    if let Some(Value::String(text)) = object.get_mut(JUSTIFICATION_FIELD) {
        *text = normalize_paragraphs(text);
    }
    object
}
