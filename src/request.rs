//! Per-call request and result types

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Everything one `generate_query` call needs. Built per call, never
/// shared.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest
{   /// Natural-language question
    pub question: String
  , /// Database handed to the schema pruner
    pub db_name: String
  , /// Model identifier; also selects the completion mode
    pub model: String
  , /// Prompt template path
    pub prompt_file: PathBuf
  , /// Deadline for the invocation, retry included
    pub timeout: Duration
  , /// Emit diagnostics on failure
    pub verbose: bool
}

impl GenerationRequest
{   pub fn from_config(
      config: &crate::config::GeneratorConfig
    , question: impl Into<String>
    ) -> Self
    {   GenerationRequest
        {   question: question.into()
          , db_name: config.db_name.clone()
          , model: config.model.clone()
          , prompt_file: config.prompt_file.clone()
          , timeout: config.timeout()
          , verbose: config.verbose
        }
    }
}

/// Outcome of one generation. On terminal paths exactly one of `query`
/// and `err` is non-empty, except that an empty completion yields an
/// empty query with no error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult
{   /// Extracted SQL
    pub query: String
  , /// `"-"` on success, empty otherwise
    pub reason: String
  , /// Empty on success
    pub err: String
  , /// Wall-clock time of the whole call
    pub latency_seconds: f64
  , /// Tokens in the prompt that was sent
    pub tokens_used: usize
}

impl GenerationResult
{   pub fn success(
      query: impl Into<String>
    , latency_seconds: f64
    , tokens_used: usize
    ) -> Self
    {   GenerationResult
        {   query: query.into()
          , reason: crate::SUCCESS_REASON.to_string()
          , err: String::new()
          , latency_seconds
          , tokens_used
        }
    }

    pub fn failure(
      err: impl Into<String>
    , latency_seconds: f64
    , tokens_used: usize
    ) -> Self
    {   GenerationResult
        {   query: String::new()
          , reason: String::new()
          , err: err.into()
          , latency_seconds
          , tokens_used
        }
    }

    pub fn is_success(&self) -> bool
    {   self.err.is_empty()
    }

    pub fn timed_out(&self) -> bool
    {   self.err == crate::TIMEOUT_ERROR
    }
}
