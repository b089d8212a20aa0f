//! Language model access for answer generation.

mod openai;

pub use openai::OpenAIChatModel;

use crate::error::Result;
use async_trait::async_trait;

/// A rendered system + user prompt pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// Trait for chat completion backends.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a completion for the prompt.
    async fn complete(&self, prompt: &Prompt) -> Result<String>;

    /// Model name, for logging.
    fn name(&self) -> &str;
}
