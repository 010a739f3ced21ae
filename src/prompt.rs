// Flowsmith: Prompt builder (output-format rules + verbatim workflow spec)

use crate::provider::Message;
use crate::workflow::{REQUIRED_NODE_KEYS, REQUIRED_TOP_LEVEL_KEYS};

/// Build the system prompt for a target n8n version.
pub fn build_system_prompt(target_platform_version: &str) -> String {
    let mut parts = Vec::new();

    parts.push(format!(
        "You generate n8n importable workflow JSON for n8n version {}.",
        target_platform_version
    ));

    let rules = [
        "Output MUST be a single JSON object and nothing else.".to_string(),
        "No markdown, no code fences, no comments, no commentary before or after the JSON."
            .to_string(),
        "Use only plain ASCII quotes (\" and ').".to_string(),
        "Never use smart quotes or the ellipsis character.".to_string(),
        "Do not invent undocumented properties: do not use \"option\" where a node expects \"options\"."
            .to_string(),
        "Use the correct node typeVersion and parameter schema for the target n8n version."
            .to_string(),
        format!(
            "The top-level object must include: {}, settings, active.",
            REQUIRED_TOP_LEVEL_KEYS.join(", ")
        ),
        format!(
            "Every node must have: {}. position is an array of exactly two numbers [x, y].",
            REQUIRED_NODE_KEYS.join(", ")
        ),
    ];

    parts.push("\nHard rules:".to_string());
    for rule in &rules {
        parts.push(format!("- {}", rule));
    }

    parts.join("\n")
}

/// Build the `[system, user]` message pair. The spec is passed through
/// unmodified.
pub fn build_messages(target_platform_version: &str, spec: &str) -> Vec<Message> {
    vec![
        Message::system(build_system_prompt(target_platform_version)),
        Message::user(spec),
    ]
}
