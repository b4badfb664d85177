//! Configuration for the query generator, sampling and retry behavior

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

/// Sampling parameters sent with every completion call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionParams
{   /// Max tokens to generate
    pub max_tokens: usize
  , /// Sampling temperature; 0 is deterministic
    pub temperature: f32
  , /// Stop sequences
    pub stop: Vec<String>
  , /// Token id -> bias
    pub logit_bias: HashMap<String, f32>
}

impl CompletionParams
{   /// Parameters used by `generate_query`
    pub fn for_generation(max_tokens: usize) -> Self
    {   CompletionParams
        {   max_tokens
          , ..CompletionParams::default()
        }
    }
}

impl Default for CompletionParams
{   fn default() -> Self
    {   CompletionParams
        {   max_tokens: 600
          , temperature: 0.0
          , stop: vec!["```".to_string()]
          , logit_bias: HashMap::new()
        }
    }
}

/// Retry configuration for overloaded completion services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig
{   /// Retries after the first attempt
    pub max_retries: usize
  , /// Backoff multiplier between retries
    pub backoff_multiplier: f32
  , /// Pause before the first retry in milliseconds
    pub initial_backoff_ms: u64
}

impl Default for RetryConfig
{   fn default() -> Self
    {   RetryConfig
        {   max_retries: 1
          , backoff_multiplier: 1.0
          , initial_backoff_ms: 5000
        }
    }
}

fn default_max_tokens() -> usize
{   400
}

/// Query generator configuration, fixed at construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig
{   /// Model identifier
    pub model: String
  , /// Prompt template path
    pub prompt_file: PathBuf
  , /// Database handed to the schema pruner
    pub db_name: String
  , /// Deadline for the whole invocation, retry included
    pub timeout_secs: u64
  , /// Emit diagnostics on failure
    #[serde(default)]
    pub verbose: bool
  , #[serde(default = "default_max_tokens")]
    pub max_tokens: usize
  , #[serde(default)]
    pub retry: RetryConfig
}

impl GeneratorConfig
{   pub fn new(
      model: impl Into<String>
    , prompt_file: impl Into<PathBuf>
    , db_name: impl Into<String>
    , timeout_secs: u64
    ) -> Self
    {   GeneratorConfig
        {   model: model.into()
          , prompt_file: prompt_file.into()
          , db_name: db_name.into()
          , timeout_secs
          , verbose: false
          , max_tokens: default_max_tokens()
          , retry: RetryConfig::default()
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self
    {   self.verbose = verbose;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self
    {   self.retry = retry;
        self
    }

    /// Load and validate a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>)
      -> Result<Self, crate::error::Error>
    {   let path = path.as_ref();
        debug!("Loading generator config from {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|e| {
          crate::error::Error::InvalidConfiguration(
            format!("{}: {}", path.display(), e)
          )
        })?;
        let config: GeneratorConfig
          = serde_json::from_str(&text).map_err(|e| {
            crate::error::Error::InvalidConfiguration(e.to_string())
          })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), crate::error::Error>
    {   if self.model.trim().is_empty()
        {   return Err(crate::error::Error::InvalidConfiguration(
              "model must not be empty".to_string()
            ));
        }
        if self.timeout_secs == 0
        {   return Err(crate::error::Error::InvalidConfiguration(
              "timeout_secs must be positive".to_string()
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration
    {   Duration::from_secs(self.timeout_secs)
    }

    pub fn completion_params(&self) -> CompletionParams
    {   CompletionParams::for_generation(self.max_tokens)
    }
}
