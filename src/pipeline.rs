// Flowsmith: Generation pipeline
//
// spec text -> prompt -> provider -> extract -> validate. One request per run,
// and the first failure ends the run.

use crate::config::ConfigError;
use crate::prompt::build_messages;
use crate::provider::{LLMProvider, ProviderError};
use crate::workflow::extract::{extract_candidate, ExtractionError};
use crate::workflow::validate::{validate_document, ValidationError};
use crate::workflow::WorkflowDocument;
use std::path::PathBuf;
use thiserror::Error;

/// Spec file read when neither `--spec` nor `WORKFLOW_SPEC` is given.
pub const DEFAULT_SPEC_PATH: &str = "workflow_spec.txt";

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("spec input error: {0}")]
    Input(String),
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Spec input
// ---------------------------------------------------------------------------

/// Where the workflow spec text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecSource {
    File(PathBuf),
    Inline(String),
}

impl SpecSource {
    /// An explicit path wins; then non-blank inline text; then the default file.
    pub fn resolve(path: Option<PathBuf>, inline: Option<String>) -> Self {
        if let Some(p) = path {
            return SpecSource::File(p);
        }
        match inline.filter(|s| !s.trim().is_empty()) {
            Some(text) => SpecSource::Inline(text),
            None => SpecSource::File(PathBuf::from(DEFAULT_SPEC_PATH)),
        }
    }

    /// Read the spec text. The text is returned unmodified; blank input is
    /// rejected.
    pub async fn read(&self) -> Result<String, GenerateError> {
        let text = match self {
            SpecSource::Inline(text) => text.clone(),
            SpecSource::File(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| GenerateError::Io {
                        path: path.clone(),
                        source,
                    })?
            }
        };

        if text.trim().is_empty() {
            return Err(GenerateError::Input(format!("{} is empty", self)));
        }
        Ok(text)
    }
}

impl std::fmt::Display for SpecSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpecSource::File(path) => write!(f, "{}", path.display()),
            SpecSource::Inline(_) => f.write_str("WORKFLOW_SPEC"),
        }
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Run one generation: prompt the provider, then extract and validate.
pub async fn generate(
    provider: &dyn LLMProvider,
    target_platform_version: &str,
    spec: &str,
) -> Result<WorkflowDocument, GenerateError> {
    let messages = build_messages(target_platform_version, spec);

    tracing::info!(
        model = %provider.model(),
        protocol = %provider.protocol(),
        spec_len = spec.len(),
        "Requesting workflow from provider"
    );

    let raw = provider.complete(&messages).await?;
    tracing::debug!(output_len = raw.len(), "Model output received");

    let candidate = extract_candidate(&raw)?;
    if candidate.len() != raw.len() {
        tracing::debug!(
            stripped = raw.len() - candidate.len(),
            "Stripped text around JSON object"
        );
    }

    let document = validate_document(candidate, &raw)?;
    tracing::info!(
        workflow = %document.display_name(),
        nodes = document.node_count(),
        active = document.active().and_then(|v| v.as_bool()).unwrap_or(false),
        has_settings = document.settings().is_some(),
        "Workflow validated"
    );

    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Message, Protocol, Role};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Returns a fixed reply and records the prompt it was sent.
    struct ScriptedProvider {
        reply: Result<String, ()>,
        seen: Mutex<Vec<Message>>,
    }

    impl ScriptedProvider {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn empty() -> Self {
            Self {
                reply: Err(()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        async fn complete(&self, messages: &[Message]) -> Result<String, ProviderError> {
            self.seen.lock().unwrap().extend_from_slice(messages);
            self.reply.clone().map_err(|_| ProviderError::EmptyOutput)
        }

        fn protocol(&self) -> Protocol {
            Protocol::ChatCompletions
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    const DEMO: &str = r#"{"name":"Demo","nodes":[{"id":"1","name":"Start","type":"trigger","typeVersion":1,"position":[0,0],"parameters":{}}],"connections":{}}"#;

    #[tokio::test]
    async fn test_generate_prose_wrapped() {
        crate::logger::init_test();
        let provider = ScriptedProvider::replying(&format!(
            "Here is the workflow:\n{}\nHope this helps!",
            DEMO
        ));

        let doc = generate(&provider, "2.6.3", "Manual trigger only").await.unwrap();
        assert_eq!(doc.display_name(), "Demo");

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].role, Role::System);
        assert!(seen[0].content.contains("2.6.3"));
        assert_eq!(seen[1].content, "Manual trigger only");
    }

    #[tokio::test]
    async fn test_empty_output_stops_before_extraction() {
        let provider = ScriptedProvider::empty();
        let err = generate(&provider, "2.6.3", "spec").await.unwrap_err();
        assert!(matches!(err, GenerateError::Provider(ProviderError::EmptyOutput)));
        assert!(err.to_string().contains("empty output"));
    }

    #[tokio::test]
    async fn test_extraction_failure() {
        let provider = ScriptedProvider::replying("I cannot build that workflow.");
        let err = generate(&provider, "2.6.3", "spec").await.unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Extraction(ExtractionError::NoOpeningBrace)
        ));
    }

    #[tokio::test]
    async fn test_validation_failure() {
        let provider = ScriptedProvider::replying(r#"{"name":"X","nodes":[],"connections":{}}"#);
        let err = generate(&provider, "2.6.3", "spec").await.unwrap_err();
        match err {
            GenerateError::Validation(v) => assert_eq!(v.reason(), "nodes_empty_or_not_array"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_spec_source_resolution() {
        assert_eq!(
            SpecSource::resolve(Some("a.txt".into()), Some("inline".into())),
            SpecSource::File("a.txt".into())
        );
        assert_eq!(
            SpecSource::resolve(None, Some("inline".into())),
            SpecSource::Inline("inline".into())
        );
        assert_eq!(
            SpecSource::resolve(None, Some("  \n".into())),
            SpecSource::File(DEFAULT_SPEC_PATH.into())
        );
        assert_eq!(
            SpecSource::resolve(None, None),
            SpecSource::File(DEFAULT_SPEC_PATH.into())
        );
    }

    #[tokio::test]
    async fn test_spec_source_read() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("spec.txt");
        std::fs::write(&path, "  keep surrounding whitespace\n").unwrap();

        let text = SpecSource::File(path.clone()).read().await.unwrap();
        assert_eq!(text, "  keep surrounding whitespace\n");

        std::fs::write(&path, "\n\n").unwrap();
        let err = SpecSource::File(path).read().await.unwrap_err();
        assert!(matches!(err, GenerateError::Input(_)));

        let err = SpecSource::File(tmp.path().join("missing.txt"))
            .read()
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::Io { .. }));
    }
}
