use async_trait::async_trait;

use crate::error::SuggestionError;

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send `prompt` and return the suggestion text
    async fn complete(&self, prompt: &str) -> Result<String, SuggestionError>;

    /// Short description for logs, e.g. "gemini/gemini-1.5-flash"
    fn describe(&self) -> String;
}

/// Canned backend for `--dry-run`: answers every prompt without network access
pub struct MockLlmClient;

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String, SuggestionError> {
        let error_line = prompt
            .lines()
            .find_map(|l| l.strip_prefix("**Error:** "))
            .unwrap_or("the reported error");

        Ok(format!(
            "(dry run) No backend was called for: {}\n\
             Check the changelog of the upgraded package for renamed or removed APIs \
             and update the call site shown in the snippet.",
            error_line
        ))
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}
