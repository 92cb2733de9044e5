//! Shared language-model response parsing: strip optional fenced-code-block
//! markers, JSON-parse, validate against the target schema, and never
//! attempt to repair
//! partially valid JSON.

use serde::de::DeserializeOwned;

/// Parses `raw` as JSON of type `T`, accepting either a bare JSON value or
/// one wrapped in a fenced code block (```` ```json ... ``` ```` or
/// ```` ``` ... ``` ````). Any parse or schema failure returns `Err` with no
/// attempt to repair the input.
pub fn parse_llm_json<T: DeserializeOwned>(raw: &str) -> Result<T, serde_json::Error> {
    let stripped = strip_fenced_block(raw);
    serde_json::from_str(stripped.trim())
}

fn strip_fenced_block(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip an optional language tag on the opening fence line (e.g. `json`).
    let after_open = match after_open.find('\n') {
        Some(newline) => &after_open[newline + 1..],
        None => after_open,
    };
    match after_open.rfind("```") {
        Some(close) => after_open[..close].trim(),
        None => after_open.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        ok: bool,
    }

    #[test]
    fn parses_bare_json() {
        let parsed: Sample = parse_llm_json(r#"{"ok": true}"#).unwrap();
        assert_eq!(parsed, Sample { ok: true });
    }

    #[test]
    fn parses_fenced_json_block_with_language_tag() {
        let raw = "```json\n{\"ok\": true}\n```";
        let parsed: Sample = parse_llm_json(raw).unwrap();
        assert_eq!(parsed, Sample { ok: true });
    }

    #[test]
    fn parses_fenced_block_without_language_tag() {
        let raw = "```\n{\"ok\": true}\n```";
        let parsed: Sample = parse_llm_json(raw).unwrap();
        assert_eq!(parsed, Sample { ok: true });
    }

    #[test]
    fn rejects_invalid_json_without_repair_attempt() {
        let result: Result<Sample, _> = parse_llm_json(r#"{"ok": tru"#);
        assert!(result.is_err());
    }
}
