use std::sync::Arc;

use log::{debug, info, trace, warn};
use tokio::time::Instant;

use crate::config::GeneratorConfig;
use crate::error::Error;
use crate::extract::extract_sql;
use crate::prompt::{PromptBundle, PromptTemplate};
use crate::providers::{CompletionRequest, CompletionService};
use crate::request::{GenerationRequest, GenerationResult};
use crate::retry::{self, CompletionOutcome, RetryPolicy};
use crate::schema::SchemaPruner;
use crate::tokens::TokenCounter;
use crate::{CompletionMode, Prompt};

/// Turns questions into SQL through one completion service.
///
/// Holds only read-only configuration, so one generator can serve any
/// number of concurrent `generate_query` calls behind an `Arc`.
pub struct QueryGenerator
{   config: GeneratorConfig
  , service: Arc<dyn CompletionService>
  , pruner: Arc<dyn SchemaPruner>
  , policy: RetryPolicy
  , counter: Option<TokenCounter>
}

impl QueryGenerator
{   pub fn new(
      config: GeneratorConfig
    , service: Arc<dyn CompletionService>
    , pruner: Arc<dyn SchemaPruner>
    ) -> Result<Self, Error>
    {   config.validate()?;
        debug!(
          "Creating QueryGenerator for {} ({:?} mode)",
          config.model,
          CompletionMode::for_model(&config.model)
        );
        let counter = match TokenCounter::for_model(&config.model)
        {   Ok(counter) => Some(counter)
          , Err(e) => {
              warn!("Token counts will be 0: {}", e);
              None
            }
        };
        let policy = RetryPolicy::from(&config.retry);
        Ok(QueryGenerator
        {   config
          , service
          , pruner
          , policy
          , counter
        })
    }

    /// Generator backed by the hosted OpenAI API
    pub fn openai(
      config: GeneratorConfig
    , api_key: Option<String>
    , pruner: Arc<dyn SchemaPruner>
    ) -> Result<Self, Error>
    {   let client = crate::providers::OpenAiClient::new(api_key);
        QueryGenerator::new(config, Arc::new(client), pruner)
    }

    pub fn config(&self) -> &GeneratorConfig
    {   &self.config
    }

    /// Load the template and fill it for `request`. Chat templates are
    /// validated before the schema pruner runs.
    pub async fn prepare_prompt(
      &self
    , request: &GenerationRequest
    ) -> Result<PromptBundle, Error>
    {   let template = PromptTemplate::load(&request.prompt_file).await?;
        let mode = CompletionMode::for_model(&request.model);
        if mode == CompletionMode::Chat
        {   template.sections()?;
        }
        let metadata = self.pruner.prune(
          &request.question,
          &request.db_name
        );
        trace!("Pruned metadata: {}", metadata);
        template.assemble(mode, &request.question, &metadata)
    }

    /// Tokens in `prompt` as encoded for `model`; 0 if no encoder
    pub fn count_tokens(&self, model: &str, prompt: &Prompt) -> usize
    {   if let Some(counter) = &self.counter
        {   if counter.model() == model
            {   return counter.count_prompt(prompt);
            }
        }
        match crate::tokens::count_tokens(model, prompt)
        {   Ok(count) => count
          , Err(e) => {
              warn!("Cannot count tokens for {}: {}", model, e);
              0
            }
        }
    }

    /// Generate SQL for `question` with the configured model, template,
    /// database and deadline. Never fails: every error is reported in
    /// `GenerationResult::err`.
    pub async fn generate_query(&self, question: &str)
      -> GenerationResult
    {   let request = GenerationRequest::from_config(
          &self.config,
          question
        );
        self.generate(request).await
    }

    pub async fn generate(&self, request: GenerationRequest)
      -> GenerationResult
    {   let started = Instant::now();
        let verbose = request.verbose;

        let bundle = match self.prepare_prompt(&request).await
        {   Ok(bundle) => bundle
          , Err(e) => {
              report(verbose, &format!(
                "Cannot build prompt for {}: {}",
                request.model, e
              ));
              return GenerationResult::failure(
                generation_error(&e),
                started.elapsed().as_secs_f64(),
                0
              );
            }
        };

        debug!(
          "Sending {:?} prompt to {}",
          bundle.mode(), request.model
        );
        let prompt = bundle.to_prompt();
        let completion_request = CompletionRequest
        {   model: request.model.clone()
          , prompt
          , params: self.config.completion_params()
        };
        let tokens_used = self.count_tokens(
          &request.model,
          &completion_request.prompt
        );

        let outcome = self.invoke_with_deadline(
          completion_request,
          &request
        ).await;

        let latency_seconds = started.elapsed().as_secs_f64();
        let result = match outcome
        {   Ok(text) => {
              GenerationResult::success(
                extract_sql(&text),
                latency_seconds,
                tokens_used
              )
            }
          , Err(e) => {
              GenerationResult::failure(
                generation_error(&e),
                latency_seconds,
                tokens_used
              )
            }
        };
        debug!(
          "Generation finished in {:.3}s, {} tokens, err={:?}",
          result.latency_seconds, result.tokens_used, result.err
        );
        result
    }

    /// Run the invoker on its own task and stop waiting at the deadline.
    /// Aborting the task drops the local request future; work already
    /// started on the remote service is not cancelled.
    async fn invoke_with_deadline(
      &self
    , completion_request: CompletionRequest
    , request: &GenerationRequest
    ) -> Result<String, Error>
    {   let service = Arc::clone(&self.service);
        let policy = self.policy.clone();
        let verbose = request.verbose;

        let task = tokio::spawn(async move {
          retry::invoke(
            service.as_ref(),
            &completion_request,
            &policy,
            verbose
          ).await
        });
        let abort = task.abort_handle();

        match tokio::time::timeout(request.timeout, task).await
        {   Err(_elapsed) => {
              abort.abort();
              report(verbose, "generating query timed out");
              Err(Error::Timeout)
            }
          , Ok(Err(join_error)) => {
              let e = if join_error.is_panic()
              {   Error::WorkerPanic(join_error.to_string())
              } else
              {   Error::WorkerCancelled(join_error.to_string())
              };
              report(verbose, &format!(
                "Error while generating query: {}, {}",
                e.kind(), e
              ));
              Err(e)
            }
          , Ok(Ok(CompletionOutcome { failure: Some(e), .. })) => Err(e)
          , Ok(Ok(CompletionOutcome { text, .. })) => Ok(text)
        }
    }
}

/// `err` text for a failed generation. A timeout is reported as
/// `TIMEOUT_ERROR`; the raw completion body is appended only when a
/// lookup failure actually received one.
pub fn generation_error(error: &Error) -> String
{   if *error == Error::Timeout
    {   return crate::TIMEOUT_ERROR.to_string();
    }
    match error.completion_body()
    {   Some(body) => format!(
          "QUERY GENERATION ERROR: {}, {}, Completion: {}",
          error.kind(), error, body
        )
      , None => format!(
          "QUERY GENERATION ERROR: {}, {}",
          error.kind(), error
        )
    }
}

fn report(verbose: bool, message: &str)
{   if verbose
    {   info!("{}", message);
    } else
    {   debug!("{}", message);
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn timeout_maps_to_fixed_text()
    {   assert_eq!(generation_error(&Error::Timeout), crate::TIMEOUT_ERROR);
        assert_eq!(
          generation_error(&Error::WorkerPanic("task 3 panicked".into())),
          "QUERY GENERATION ERROR: Panic, task 3 panicked"
        );
    }

    #[test]
    fn error_text_names_kind_and_message()
    {   assert_eq!(
          generation_error(&Error::ApiError("401: bad key".into())),
          "QUERY GENERATION ERROR: ApiError, API error: 401: bad key"
        );
    }

    #[test]
    fn error_text_includes_received_completion()
    {   let err = Error::MissingCompletion
        {   body: "{\"choices\":[]}".to_string()
        };
        assert_eq!(
          generation_error(&err),
          "QUERY GENERATION ERROR: MissingCompletion, API response \
           contained no completion, Completion: {\"choices\":[]}"
        );

        let nothing_received = Error::MissingCompletion
        {   body: String::new()
        };
        assert!(!generation_error(&nothing_received).contains("Completion:"));
    }
}
