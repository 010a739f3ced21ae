// Flowsmith: Provider factory

use super::{http::HTTPProvider, LLMProvider, ProviderError};
use crate::config::GenerationConfig;

/// Create the LLM provider for a resolved configuration.
pub fn create_provider(cfg: &GenerationConfig) -> Result<Box<dyn LLMProvider>, ProviderError> {
    let provider = HTTPProvider::new(cfg)?;

    tracing::info!(
        provider = %cfg.provider,
        model = %cfg.model,
        protocol = %cfg.protocol(),
        endpoint = %provider.endpoint(),
        "Creating LLM provider"
    );

    Ok(Box::new(provider))
}
