//! Completion service seam and provider implementations

use async_trait::async_trait;

pub mod openai;

// Re-export for convenience
pub use openai::OpenAiClient;

/// One completion call: model, wire prompt, sampling parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest
{   pub model: String
  , pub prompt: crate::Prompt
  , pub params: crate::config::CompletionParams
}

/// Generated text of a successful call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion
{   pub text: String
}

/// A hosted completion API. Chat prompts and text prompts are served by
/// whichever endpoint matches `request.prompt`.
#[async_trait]
pub trait CompletionService: Send + Sync
{   async fn complete(
      &self
    , request: &CompletionRequest
    ) -> Result<Completion, crate::error::Error>;
}
