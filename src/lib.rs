// Flowsmith: n8n workflow generation driven by an LLM
// License: Apache-2.0

pub mod config;
pub mod import_check;
pub mod logger;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod workflow;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
