// Flowsmith: Minimum import-shape validation for workflow documents

use super::{WorkflowDocument, REQUIRED_NODE_KEYS, REQUIRED_TOP_LEVEL_KEYS};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;

/// Characters of the candidate echoed back in `invalid_json` diagnostics.
const EXCERPT_CHARS: usize = 200;

/// The first failed check. Checks stop at the first failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid_json: {message} (candidate begins: {excerpt:?})")]
    InvalidJson { message: String, excerpt: String },
    #[error("missing_top_level_key:{0}")]
    MissingTopLevelKey(&'static str),
    #[error("nodes_empty_or_not_array")]
    NodesEmptyOrNotArray,
    #[error("node_missing_key:{key} (node: {node})")]
    NodeMissingKey { key: &'static str, node: String },
    #[error("bad_position (node: {node}): position must be [x, y]")]
    BadPosition { node: String },
    #[error(
        "typographic_violation: U+{:04X} at byte {offset}; replace smart quotes and ellipsis with ASCII",
        codepoint(.character)
    )]
    TypographicViolation { character: char, offset: usize },
}

fn codepoint(c: &char) -> u32 {
    *c as u32
}

impl ValidationError {
    /// Machine-readable reason, e.g. `missing_top_level_key:nodes`.
    pub fn reason(&self) -> String {
        match self {
            ValidationError::InvalidJson { .. } => "invalid_json".to_string(),
            ValidationError::MissingTopLevelKey(key) => format!("missing_top_level_key:{}", key),
            ValidationError::NodesEmptyOrNotArray => "nodes_empty_or_not_array".to_string(),
            ValidationError::NodeMissingKey { key, .. } => format!("node_missing_key:{}", key),
            ValidationError::BadPosition { .. } => "bad_position".to_string(),
            ValidationError::TypographicViolation { .. } => "typographic_violation".to_string(),
        }
    }
}

/// Parse `candidate` and check it against the import contract, then scan the
/// full `raw` model output for typographic characters.
pub fn validate_document(candidate: &str, raw: &str) -> Result<WorkflowDocument, ValidationError> {
    let value: Value = serde_json::from_str(candidate).map_err(|e| invalid_json(&e, candidate))?;

    check_shape(&value)?;
    check_typography(raw)?;

    serde_json::from_value(value).map_err(|e| invalid_json(&e, candidate))
}

/// Validate a stored workflow file; the whole text is the candidate.
pub fn validate_file_contents(text: &str) -> Result<WorkflowDocument, ValidationError> {
    validate_document(text, text)
}

fn invalid_json(err: &serde_json::Error, candidate: &str) -> ValidationError {
    ValidationError::InvalidJson {
        message: err.to_string(),
        excerpt: candidate.chars().take(EXCERPT_CHARS).collect(),
    }
}

fn check_shape(value: &Value) -> Result<(), ValidationError> {
    let top = value.as_object();
    for key in REQUIRED_TOP_LEVEL_KEYS {
        if !top.is_some_and(|m| m.contains_key(key)) {
            return Err(ValidationError::MissingTopLevelKey(key));
        }
    }

    let nodes = value
        .get("nodes")
        .and_then(|n| n.as_array())
        .filter(|n| !n.is_empty())
        .ok_or(ValidationError::NodesEmptyOrNotArray)?;

    // Keys then position, node by node
    for (index, node) in nodes.iter().enumerate() {
        let fields = node.as_object();
        for key in REQUIRED_NODE_KEYS {
            if !fields.is_some_and(|f| f.contains_key(key)) {
                return Err(ValidationError::NodeMissingKey {
                    key,
                    node: node_label(node, index),
                });
            }
        }

        let position_ok = node
            .get("position")
            .and_then(|p| p.as_array())
            .is_some_and(|p| p.len() == 2);
        if !position_ok {
            return Err(ValidationError::BadPosition {
                node: node_label(node, index),
            });
        }
    }

    Ok(())
}

fn typographic_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // “ ” ‘ ’ …
        Regex::new("[\u{201C}\u{201D}\u{2018}\u{2019}\u{2026}]").unwrap()
    })
}

fn check_typography(raw: &str) -> Result<(), ValidationError> {
    match typographic_pattern().find(raw) {
        Some(m) => Err(ValidationError::TypographicViolation {
            character: m.as_str().chars().next().unwrap_or('\u{FFFD}'),
            offset: m.start(),
        }),
        None => Ok(()),
    }
}

/// Identify a node by its name, else its id, else its position in `nodes`.
fn node_label(node: &Value, index: usize) -> String {
    let field = |key: &str| -> Option<String> {
        match node.get(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    };
    field("name")
        .or_else(|| field("id"))
        .unwrap_or_else(|| format!("#{}", index))
}
