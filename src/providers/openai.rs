use std::collections::HashMap;

use async_trait::async_trait;
use log::{debug, error, trace};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::providers::{Completion, CompletionRequest, CompletionService};
use crate::{ChatMessage, CompletionMode, Prompt};

const OPENAI_API_BASE: &str
  = "https://api.openai.com/v1";

// ===== Wire Types =====

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a>
{   model: &'a str
  , messages: &'a [ChatMessage]
  , max_tokens: usize
  , temperature: f32
  , stop: &'a [String]
  , logit_bias: &'a HashMap<String, f32>
}

#[derive(Debug, Serialize)]
struct TextCompletionBody<'a>
{   model: &'a str
  , prompt: &'a str
  , max_tokens: usize
  , temperature: f32
  , stop: &'a [String]
  , logit_bias: &'a HashMap<String, f32>
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse
{   #[serde(default)]
    choices: Vec<ChatChoice>
}

#[derive(Debug, Deserialize)]
struct ChatChoice
{   message: Option<ResponseMessage>
}

#[derive(Debug, Deserialize)]
struct ResponseMessage
{   content: Option<String>
}

#[derive(Debug, Deserialize)]
struct TextCompletionResponse
{   #[serde(default)]
    choices: Vec<TextChoice>
}

#[derive(Debug, Deserialize)]
struct TextChoice
{   text: Option<String>
}

// ===== OpenAI Client =====

/// OpenAI-compatible completion client. Chat prompts go to
/// `/chat/completions`, text prompts to `/completions`.
#[derive(Debug, Clone)]
pub struct OpenAiClient
{   api_key: Option<String>
  , api_base: String
  , http_client: reqwest::Client
}

impl OpenAiClient
{   pub fn new(api_key: Option<String>) -> Self
    {   debug!("Creating OpenAiClient");
        OpenAiClient
        {   api_key
          , api_base: OPENAI_API_BASE.to_string()
          , http_client: reqwest::Client::new()
        }
    }

    /// Point at another OpenAI-compatible server
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self
    {   self.api_base = api_base.into()
          .trim_end_matches('/')
          .to_string();
        self
    }

    pub fn api_base(&self) -> &str
    {   &self.api_base
    }

    fn get_api_key(&self) -> Result<&str, Error>
    {   self.api_key.as_deref().ok_or_else(|| {
          error!("No OpenAI API key");
          Error::MissingApiKey("OpenAI".to_string())
        })
    }

    async fn post_json(
      &self
    , path: &str
    , body: serde_json::Value
    ) -> Result<String, Error>
    {   let api_key = self.get_api_key()?;
        trace!("OpenAI request to {}: {}", path, body);

        let response = self.http_client
          .post(format!("{}{}", self.api_base, path))
          .header("Authorization", format!("Bearer {}", api_key))
          .header("Content-Type", "application/json")
          .json(&body)
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error: {}", e);
            Error::HttpError(e.to_string())
          })?;

        let status = response.status();
        trace!("OpenAI response status: {}", status);

        let text = response.text().await.map_err(|e| {
          error!("Failed to read response body: {}", e);
          Error::HttpError(e.to_string())
        })?;

        if !status.is_success()
        {   error!("OpenAI API error {}: {}", status, text);
            return Err(classify_status(status.as_u16(), text));
        }
        Ok(text)
    }
}

#[async_trait]
impl CompletionService for OpenAiClient
{   async fn complete(
      &self
    , request: &CompletionRequest
    ) -> Result<Completion, Error>
    {   debug!("OpenAI completion for model: {}", request.model);
        let (path, body) = request_body(request)?;
        let raw = self.post_json(path, body).await?;
        let text = match request.prompt.mode()
        {   CompletionMode::Chat => parse_chat_body(&raw)?
          , CompletionMode::Legacy => parse_text_body(&raw)?
        };
        Ok(Completion { text })
    }
}

/// Endpoint path and JSON body for a request
fn request_body(request: &CompletionRequest)
  -> Result<(&'static str, serde_json::Value), Error>
{   let params = &request.params;
    let body = match &request.prompt
    {   Prompt::Chat(messages) => {
          let body = ChatCompletionBody
          {   model: &request.model
            , messages
            , max_tokens: params.max_tokens
            , temperature: params.temperature
            , stop: &params.stop
            , logit_bias: &params.logit_bias
          };
          ("/chat/completions", serde_json::to_value(&body))
        }
      , Prompt::Text(prompt) => {
          let body = TextCompletionBody
          {   model: &request.model
            , prompt
            , max_tokens: params.max_tokens
            , temperature: params.temperature
            , stop: &params.stop
            , logit_bias: &params.logit_bias
          };
          ("/completions", serde_json::to_value(&body))
        }
    };
    let (path, value) = body;
    let value = value.map_err(|e| Error::ParseError(e.to_string()))?;
    Ok((path, value))
}

/// Map a non-success HTTP status onto the error taxonomy.
/// 429 and 503 are the overload class.
pub fn classify_status(status: u16, body: String) -> Error
{   match status
    {   429 => Error::RateLimitExceeded
      , 503 => Error::ServiceUnavailable(body)
      , _ => Error::ApiError(format!("{}: {}", status, body))
    }
}

/// `choices[0].message.content` of a chat response
pub fn parse_chat_body(raw: &str) -> Result<String, Error>
{   let response: ChatCompletionResponse
      = serde_json::from_str(raw).map_err(|e| {
        error!("Parse error: {}", e);
        Error::ParseError(e.to_string())
      })?;
    response.choices.into_iter()
      .next()
      .and_then(|c| c.message)
      .and_then(|m| m.content)
      .ok_or_else(|| {
        error!("No message content in response");
        Error::MissingCompletion { body: raw.to_string() }
      })
}

/// `choices[0].text` of a text completion response
pub fn parse_text_body(raw: &str) -> Result<String, Error>
{   let response: TextCompletionResponse
      = serde_json::from_str(raw).map_err(|e| {
        error!("Parse error: {}", e);
        Error::ParseError(e.to_string())
      })?;
    response.choices.into_iter()
      .next()
      .and_then(|c| c.text)
      .ok_or_else(|| {
        error!("No text in response");
        Error::MissingCompletion { body: raw.to_string() }
      })
}
