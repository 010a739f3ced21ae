// Flowsmith: Candidate JSON extraction from raw model output

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("no '{{' found in model output")]
    NoOpeningBrace,
    #[error("no '}}' found in model output")]
    NoClosingBrace,
    #[error("last '}}' comes before the first '{{' in model output")]
    ClosingBeforeOpening,
}

/// Slice from the first `{` to the last `}`, inclusive.
///
/// This only strips prose or fences around the object. Braces are not
/// balanced here; the strict JSON parse that follows is the real gate.
pub fn extract_candidate(raw: &str) -> Result<&str, ExtractionError> {
    let start = raw.find('{').ok_or(ExtractionError::NoOpeningBrace)?;
    let end = raw.rfind('}').ok_or(ExtractionError::NoClosingBrace)?;
    if end <= start {
        return Err(ExtractionError::ClosingBeforeOpening);
    }
    Ok(&raw[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_object() {
        assert_eq!(extract_candidate(r#"{"a":1}"#).unwrap(), r#"{"a":1}"#);
    }

    #[test]
    fn test_prose_wrapped() {
        let raw = "Here is the workflow:\n{\"name\":\"Demo\",\"nodes\":[]}\nHope this helps!";
        assert_eq!(
            extract_candidate(raw).unwrap(),
            "{\"name\":\"Demo\",\"nodes\":[]}"
        );
    }

    #[test]
    fn test_markdown_fence() {
        let raw = "```json\n{\"a\": {\"b\": 2}}\n```";
        assert_eq!(extract_candidate(raw).unwrap(), "{\"a\": {\"b\": 2}}");
    }

    #[test]
    fn test_spans_first_open_to_last_close() {
        // Two objects: the slice covers both and the parse step rejects it
        let raw = "a {\"x\":1} b {\"y\":2} c";
        assert_eq!(extract_candidate(raw).unwrap(), "{\"x\":1} b {\"y\":2}");
    }

    #[test]
    fn test_multibyte_prose() {
        let raw = "ワークフロー: {\"a\":\"…\"} 完了";
        assert_eq!(extract_candidate(raw).unwrap(), "{\"a\":\"…\"}");
    }

    #[test]
    fn test_missing_delimiters() {
        assert_eq!(
            extract_candidate("no json here"),
            Err(ExtractionError::NoOpeningBrace)
        );
        assert_eq!(extract_candidate(""), Err(ExtractionError::NoOpeningBrace));
        assert_eq!(
            extract_candidate("{ truncated"),
            Err(ExtractionError::NoClosingBrace)
        );
        assert_eq!(
            extract_candidate("} wrong order {"),
            Err(ExtractionError::ClosingBeforeOpening)
        );
    }
}
