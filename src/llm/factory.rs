use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use super::client::{LlmClient, MockLlmClient};
use super::client_impl::{GeminiClient, OpenAIClient};
use crate::config::{Backend, LlmConfig, LlmSettings};

const LOCAL_BASE_URL: &str = "http://localhost:11434/v1";

/// Create the suggestion client selected by configuration.
///
/// A remote backend without a credential either falls back to the local
/// backend (`fallback_to_local`) or is built anyway, in which case every
/// request fails with an authentication error naming the missing variable.
pub fn create_client(settings: &LlmSettings, dry_run: bool) -> Result<Box<dyn LlmClient>> {
    if dry_run {
        return Ok(Box::new(MockLlmClient::new()));
    }

    match settings.backend {
        Backend::Local => create_client_from_llm_config(&settings.local, Backend::Local),
        Backend::Remote => {
            if settings.remote.resolve_api_key().is_none() {
                if settings.fallback_to_local {
                    warn!(
                        "Remote backend unavailable ({}), falling back to local model {}",
                        settings.remote.key_source(),
                        settings.local.model
                    );
                    return create_client_from_llm_config(&settings.local, Backend::Local);
                }
                warn!(
                    "Remote backend has no credential ({}); suggestions will be unavailable",
                    settings.remote.key_source()
                );
            }
            create_client_from_llm_config(&settings.remote, Backend::Remote)
        }
    }
}

/// Create a client for one `[llm.*]` table
pub fn create_client_from_llm_config(
    llm_config: &LlmConfig,
    backend: Backend,
) -> Result<Box<dyn LlmClient>> {
    let api_key = llm_config.resolve_api_key().unwrap_or_default();
    let max_tokens = llm_config.get_max_tokens();
    let timeout = llm_config.timeout_secs;

    let client: Box<dyn LlmClient> = match llm_config.provider.as_str() {
        "gemini" => {
            let model = llm_config.model.clone();
            let client = match llm_config.base_url.clone() {
                Some(base_url) => {
                    GeminiClient::with_base_url(api_key, model, base_url, max_tokens, timeout)
                }
                None => GeminiClient::new(api_key, model, max_tokens, timeout),
            }
            .context("failed to create Gemini client")?;
            Box::new(
                client
                    .with_temperature(llm_config.temperature)
                    .with_key_source(llm_config.key_source()),
            )
        }

        "openai" | "openai-compatible" => {
            let model = llm_config.model.clone();
            let mut client = match llm_config.base_url.clone() {
                Some(base_url) => {
                    OpenAIClient::with_base_url(api_key, model, base_url, max_tokens, timeout)
                }
                None if llm_config.provider == "openai" => {
                    OpenAIClient::new(api_key, model, max_tokens, timeout)
                }
                None => OpenAIClient::with_base_url(
                    api_key,
                    model,
                    LOCAL_BASE_URL.to_string(),
                    max_tokens,
                    timeout,
                ),
            }
            .context("failed to create OpenAI-compatible client")?;
            if let Some(temperature) = llm_config.temperature {
                client = client.with_temperature(temperature);
            }
            match backend {
                Backend::Local => client = client.as_local(),
                Backend::Remote if !llm_config.is_keyless() => {
                    client = client.with_key_source(llm_config.key_source())
                }
                Backend::Remote => {}
            }
            Box::new(client)
        }

        unknown => bail!("Unknown LLM provider: {}", unknown),
    };

    info!("Using {} backend: {}", backend, client.describe());
    Ok(client)
}
