//! Completion invoker: one call, delayed retry on overload
//!
//! `invoke` never fails. Any error that ends the call is recorded in the
//! returned outcome next to an empty text, so callers see the same shape
//! on every path.

use std::time::Duration;

use log::{debug, info, warn};

use crate::error::Error;
use crate::providers::{CompletionRequest, CompletionService};

/// Retry policy for overloaded completion services
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy
{   pub max_retries: usize
  , pub backoff_multiplier: f32
  , pub initial_backoff: Duration
}

impl RetryPolicy
{   pub fn new(
      max_retries: usize
    , backoff_multiplier: f32
    , initial_backoff_ms: u64
    ) -> Self
    {   RetryPolicy
        {   max_retries
          , backoff_multiplier
          , initial_backoff: Duration::from_millis(
              initial_backoff_ms
            )
        }
    }

    /// Pause before retry number `retry` (0-based); the first retry
    /// waits exactly `initial_backoff`
    pub fn backoff_for_attempt(&self, retry: usize) -> Duration
    {   if retry == 0
        {   return self.initial_backoff;
        }
        self.initial_backoff
          .mul_f32(self.backoff_multiplier.powi(retry as i32))
    }

    pub fn should_retry(&self, error: &Error, retries_done: usize)
      -> bool
    {   error.is_transient() && retries_done < self.max_retries
    }
}

impl Default for RetryPolicy
{   /// One retry after 5 seconds
    fn default() -> Self
    {   RetryPolicy::new(1, 1.0, 5000)
    }
}

impl From<&crate::config::RetryConfig> for RetryPolicy
{   fn from(config: &crate::config::RetryConfig) -> Self
    {   RetryPolicy::new(
          config.max_retries
        , config.backoff_multiplier
        , config.initial_backoff_ms
        )
    }
}

/// Result of an invocation. `text` is empty whenever `failure` is set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompletionOutcome
{   pub text: String
  , pub failure: Option<Error>
  , /// Calls made, retries included
    pub attempts: usize
}

/// Call `service`, retrying identical requests on overload errors.
/// Other errors end the invocation immediately. Diagnostics go out at
/// warn/info when `verbose`, otherwise only at debug.
pub async fn invoke(
  service: &dyn CompletionService
, request: &CompletionRequest
, policy: &RetryPolicy
, verbose: bool
) -> CompletionOutcome
{   let mut attempts = 0;
    loop
    {   attempts += 1;
        debug!(
          "Completion attempt {}/{} for {} ({:?} prompt)",
          attempts,
          policy.max_retries + 1,
          request.model,
          request.prompt.mode()
        );
        match service.complete(request).await
        {   Ok(completion) => {
              debug!(
                "Completion received after {} attempt(s)",
                attempts
              );
              return CompletionOutcome
              {   text: completion.text
                , failure: None
                , attempts
              };
            }
          , Err(e) if policy.should_retry(&e, attempts - 1) => {
              let pause = policy.backoff_for_attempt(attempts - 1);
              if verbose
              {   info!(
                    "Model overloaded. Pausing for {}s before retrying...",
                    pause.as_secs_f32()
                  );
              } else
              {   debug!("Overloaded ({}), retrying in {:?}", e, pause);
              }
              tokio::time::sleep(pause).await;
            }
          , Err(e) => {
              if verbose
              {   warn!("{}: {}", e.kind(), e);
              } else
              {   debug!("Completion failed: {}: {}", e.kind(), e);
              }
              return CompletionOutcome
              {   text: String::new()
                , failure: Some(e)
                , attempts
              };
            }
        }
    }
}
