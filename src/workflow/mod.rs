// Flowsmith: n8n workflow document model

pub mod extract;
pub mod validate;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Top-level keys every importable workflow carries, in check order.
pub const REQUIRED_TOP_LEVEL_KEYS: [&str; 3] = ["name", "nodes", "connections"];

/// Keys every node carries, in check order.
pub const REQUIRED_NODE_KEYS: [&str; 6] =
    ["id", "name", "type", "typeVersion", "position", "parameters"];

/// A validated workflow, ready to be written for import.
///
/// Only the shape checked at validation time is typed. Everything else the
/// model produced (`settings`, `active`, `pinData`, ...) is kept in `extra`
/// so re-serializing does not drop keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDocument {
    pub name: Value,
    pub nodes: Vec<NodeRecord>,
    /// Edges between nodes, keyed by source node name. Not checked.
    pub connections: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: Value,
    pub name: Value,
    #[serde(rename = "type")]
    pub node_type: Value,
    #[serde(rename = "typeVersion")]
    pub type_version: Value,
    /// Canvas coordinates `[x, y]`.
    pub position: [Value; 2],
    pub parameters: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkflowDocument {
    pub fn display_name(&self) -> &str {
        self.name.as_str().unwrap_or("(unnamed)")
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn settings(&self) -> Option<&Value> {
        self.extra.get("settings")
    }

    pub fn active(&self) -> Option<&Value> {
        self.extra.get("active")
    }

    /// Pretty-printed JSON with a single trailing newline. Non-ASCII text is
    /// written as-is, not escaped.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }

    /// Write the document to `path`, creating parent directories.
    pub async fn write_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Atomic write: write to temp file then rename
        let tmp_path = path.with_extension("json.tmp");
        let content = self.to_pretty_json()?;
        tokio::fs::write(&tmp_path, &content).await?;
        tokio::fs::rename(&tmp_path, path).await?;

        tracing::debug!(path = %path.display(), bytes = content.len(), "Workflow written");
        Ok(())
    }
}
