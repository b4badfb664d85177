pub mod error;
pub mod config;
pub mod prompt;
pub mod schema;
pub mod providers;
pub mod retry;
pub mod extract;
pub mod tokens;
pub mod request;
pub mod generator;
use serde::{Deserialize, Serialize};

/*

allm-sqlgen: natural-language question + pruned schema -> SQL, through
one hosted completion call with a deadline and a single overload retry.

allm-sqlgen/
├── Cargo.toml
├── src/
│   ├── lib.rs          # Shared wire types and re-exports
│   ├── error.rs        # Error enum
│   ├── config.rs       # Generator, sampling and retry configuration
│   ├── prompt.rs       # Template parsing and prompt assembly
│   ├── schema.rs       # Schema pruner seam
│   ├── providers/      # Completion service seam + OpenAI client
│   ├── retry.rs        # Completion invoker with overload retry
│   ├── extract.rs      # SQL extraction from generated text
│   ├── tokens.rs       # Token accounting
│   ├── request.rs      # Per-call request and result types
│   ├── generator.rs    # generate_query orchestration
│   └── bin/sqlgen.rs   # CLI
└── tests/              # Integration tests and template fixtures

*/

pub use error::Error;
pub use config::{CompletionParams, GeneratorConfig, RetryConfig};
pub use generator::QueryGenerator;
pub use prompt::{PromptBundle, PromptTemplate};
pub use providers::{Completion, CompletionRequest, CompletionService};
pub use request::{GenerationRequest, GenerationResult};
pub use schema::{SchemaPruner, StaticMetadata};

/// The one model served through the single-string completion endpoint.
/// Every other model identifier is treated as a chat model.
pub const LEGACY_MODEL: &str = "text-davinci-003";

/// Reported in `GenerationResult::err` when the deadline elapses
pub const TIMEOUT_ERROR: &str = "QUERY GENERATION TIMEOUT";

/// Placeholder `reason` on every successful generation
pub const SUCCESS_REASON: &str = "-";

// ===== Completion mode =====

/// How a prompt is shaped and which endpoint receives it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionMode
{   /// Role-tagged message list
    Chat
  , /// Single flat prompt string
    Legacy
}

impl CompletionMode
{   pub fn for_model(model: &str) -> Self
    {   if model == LEGACY_MODEL
        {   CompletionMode::Legacy
        } else
        {   CompletionMode::Chat
        }
    }
}

// ===== Messages =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role
{   System
  , User
  , Assistant
}

impl Role
{   pub fn as_str(&self) -> &'static str
    {   match self
        {   Role::System => "system"
          , Role::User => "user"
          , Role::Assistant => "assistant"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage
{   pub role: Role
  , pub content: String
}

impl ChatMessage
{   pub fn new(role: Role, content: impl Into<String>) -> Self
    {   ChatMessage
        {   role
          , content: content.into()
        }
    }
}

/// Prompt exactly as it goes over the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt
{   Chat(Vec<ChatMessage>)
  , Text(String)
}

impl Prompt
{   pub fn mode(&self) -> CompletionMode
    {   match self
        {   Prompt::Chat(_) => CompletionMode::Chat
          , Prompt::Text(_) => CompletionMode::Legacy
        }
    }
}
