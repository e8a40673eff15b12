// Clean raw backend output before JSON extraction.
// Some models emit reasoning traces even when asked not to.

use std::sync::LazyLock;

use regex::Regex;

/// Matched `<think>...</think>` pairs, case-insensitive, spanning lines, shortest match.
static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<think>.*?</think>").unwrap());

/// Remove every well-formed `<think>...</think>` block, markers included.
///
/// Pairs are matched left to right without overlap. An unmatched closing tag
/// is left in place, and for nested blocks only the span up to the first
/// closing tag is removed.
pub fn strip_think_blocks(text: &str) -> String {
    THINK_BLOCK.replace_all(text, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_single_block() {
        let text = "<think>planning the answer</think>{\"a\":1}";
        assert_eq!(strip_think_blocks(text), "{\"a\":1}");
    }

    #[test]
    fn removes_multiple_blocks_across_lines() {
        let text = "<think>one\ntwo</think>{\"a\":\n<THINK>three</Think>1}";
        assert_eq!(strip_think_blocks(text), "{\"a\":\n1}");
    }

    #[test]
    fn non_greedy_keeps_content_between_blocks() {
        let text = "<think>x</think>keep<think>y</think>";
        assert_eq!(strip_think_blocks(text), "keep");
    }

    #[test]
    fn unmatched_closing_tag_left_alone() {
        let text = "answer</think>";
        assert_eq!(strip_think_blocks(text), "answer</think>");
    }

    #[test]
    fn unclosed_opening_tag_left_alone() {
        let text = "<think>never closed {\"a\":1}";
        assert_eq!(strip_think_blocks(text), text);
    }

    #[test]
    fn nested_blocks_remove_up_to_first_close() {
        let text = "<think>a<think>b</think>c</think>rest";
        assert_eq!(strip_think_blocks(text), "c</think>rest");
    }

    #[test]
    fn text_without_blocks_unchanged() {
        let text = "{\"procedimento\":\"Consulta\"}";
        assert_eq!(strip_think_blocks(text), text);
    }
}
