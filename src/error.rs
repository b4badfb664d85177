use std::fmt;

/// Error type for query generation
/// Implements Clone so failures can cross task boundaries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// API key is missing for the completion service
    MissingApiKey(String)
  , /// Prompt template could not be read
    TemplateIo(String)
  , /// Prompt template is malformed (markers or placeholders)
    TemplateFormat(String)
  , /// HTTP transport error
    HttpError(String)
  , /// HTTP 429 from the completion service
    RateLimitExceeded
  , /// HTTP 503 from the completion service
    ServiceUnavailable(String)
  , /// API returned a non-success response
    ApiError(String)
  , /// Failed to parse API response
    ParseError(String)
  , /// Response parsed but held no generated text; carries the raw body
    MissingCompletion
    {   body: String
    }
  , /// No token encoder available for the model
    Tokenizer(String)
  , /// Invalid configuration
    InvalidConfiguration(String)
  , /// Deadline elapsed before the completion arrived
    Timeout
  , /// Invocation task panicked
    WorkerPanic(String)
  , /// Invocation task was cancelled before finishing
    WorkerCancelled(String)
  , /// Generic error
    Other(String)
}

impl Error
{   /// Stable name of the variant, used in result error strings
    pub fn kind(&self) -> &'static str
    {   match self
        {   Error::MissingApiKey(_) => "MissingApiKey"
          , Error::TemplateIo(_) => "TemplateIo"
          , Error::TemplateFormat(_) => "TemplateFormat"
          , Error::HttpError(_) => "HttpError"
          , Error::RateLimitExceeded => "RateLimitExceeded"
          , Error::ServiceUnavailable(_) => "ServiceUnavailable"
          , Error::ApiError(_) => "ApiError"
          , Error::ParseError(_) => "ParseError"
          , Error::MissingCompletion { .. } => "MissingCompletion"
          , Error::Tokenizer(_) => "Tokenizer"
          , Error::InvalidConfiguration(_) => "InvalidConfiguration"
          , Error::Timeout => "Timeout"
          , Error::WorkerPanic(_) => "Panic"
          , Error::WorkerCancelled(_) => "Cancelled"
          , Error::Other(_) => "Other"
        }
    }

    /// Overload failures worth one delayed retry
    pub fn is_transient(&self) -> bool
    {   matches!(
          self,
          Error::RateLimitExceeded | Error::ServiceUnavailable(_)
        )
    }

    /// Raw completion body attached to a lookup failure, if one
    /// was actually received
    pub fn completion_body(&self) -> Option<&str>
    {   match self
        {   Error::MissingCompletion { body } if !body.is_empty() => {
              Some(body.as_str())
            }
          , _ => None
        }
    }
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::MissingApiKey(service) => {
              write!(f, "Missing API key for: {}", service)
            }
          , Error::TemplateIo(msg) => {
              write!(f, "Cannot read prompt template: {}", msg)
            }
          , Error::TemplateFormat(msg) => {
              write!(f, "Malformed prompt template: {}", msg)
            }
          , Error::HttpError(msg) => {
              write!(f, "HTTP error: {}", msg)
            }
          , Error::RateLimitExceeded => {
              write!(f, "API rate limit exceeded")
            }
          , Error::ServiceUnavailable(msg) => {
              write!(f, "Service unavailable: {}", msg)
            }
          , Error::ApiError(msg) => {
              write!(f, "API error: {}", msg)
            }
          , Error::ParseError(msg) => {
              write!(f, "Parse error: {}", msg)
            }
          , Error::MissingCompletion { .. } => {
              write!(f, "API response contained no completion")
            }
          , Error::Tokenizer(msg) => {
              write!(f, "Tokenizer error: {}", msg)
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
          , Error::Timeout => {
              write!(f, "Request timed out")
            }
          , Error::WorkerPanic(msg) | Error::WorkerCancelled(msg) => {
              write!(f, "{}", msg)
            }
          , Error::Other(msg) => {
              write!(f, "Error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<String> for Error
{   fn from(s: String) -> Self
    {   Error::Other(s)
    }
}

impl From<&str> for Error
{   fn from(s: &str) -> Self
    {   Error::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn transient_covers_overload_only()
    {   assert!(Error::RateLimitExceeded.is_transient());
        assert!(
          Error::ServiceUnavailable("busy".into()).is_transient()
        );
        assert!(!Error::ApiError("400".into()).is_transient());
        assert!(!Error::Timeout.is_transient());
    }

    #[test]
    fn completion_body_requires_received_body()
    {   let empty = Error::MissingCompletion { body: String::new() };
        assert_eq!(empty.completion_body(), None);

        let full = Error::MissingCompletion
        {   body: "{\"choices\":[]}".to_string()
        };
        assert_eq!(full.completion_body(), Some("{\"choices\":[]}"));
        assert_eq!(Error::ParseError("x".into()).completion_body(), None);
    }
}
