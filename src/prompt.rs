//! Prompt templates and prompt assembly
//!
//! A chat template is three sections separated by two markers:
//!
//! ```text
//! <system instruction>
//! ### Input:
//! <user instruction with {user_question} and {table_metadata_string}>
//! ### Response:
//! <assistant priming text, sent verbatim>
//! ```
//!
//! A legacy template is a single string with the same placeholders.

use std::path::Path;

use log::{debug, trace};

use crate::error::Error;
use crate::{ChatMessage, CompletionMode, Prompt, Role};

pub const INPUT_MARKER: &str = "### Input:";
pub const RESPONSE_MARKER: &str = "### Response:";

pub const QUESTION_PLACEHOLDER: &str = "user_question";
pub const METADATA_PLACEHOLDER: &str = "table_metadata_string";

/// Filled-in prompt, shaped by completion mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptBundle
{   Chat
    {   system: String
      , user: String
      , assistant: String
    }
  , Legacy(String)
}

impl PromptBundle
{   pub fn mode(&self) -> CompletionMode
    {   match self
        {   PromptBundle::Chat { .. } => CompletionMode::Chat
          , PromptBundle::Legacy(_) => CompletionMode::Legacy
        }
    }

    /// Wire form: system, user, assistant messages in that order,
    /// or the flat string
    pub fn to_prompt(&self) -> Prompt
    {   match self
        {   PromptBundle::Chat { system, user, assistant } => {
              Prompt::Chat(vec![
                ChatMessage::new(Role::System, system.clone())
              , ChatMessage::new(Role::User, user.clone())
              , ChatMessage::new(Role::Assistant, assistant.clone())
              ])
            }
          , PromptBundle::Legacy(text) => Prompt::Text(text.clone())
        }
    }
}

/// Borrowed view of the three chat sections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatSections<'a>
{   pub system: &'a str
  , pub user: &'a str
  , pub response: &'a str
}

/// Raw template text as read from disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate
{   text: String
}

impl PromptTemplate
{   pub fn new(text: impl Into<String>) -> Self
    {   PromptTemplate
        {   text: text.into()
        }
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, Error>
    {   let path = path.as_ref();
        debug!("Loading prompt template {}", path.display());
        let text = tokio::fs::read_to_string(path)
          .await
          .map_err(|e| {
            Error::TemplateIo(format!("{}: {}", path.display(), e))
          })?;
        Ok(PromptTemplate::new(text))
    }

    /// Split on the section markers. Each marker must appear exactly
    /// once, input before response.
    pub fn sections(&self) -> Result<ChatSections<'_>, Error>
    {   let input_at = single_marker(&self.text, INPUT_MARKER)?;
        let response_at = single_marker(&self.text, RESPONSE_MARKER)?;
        if response_at < input_at
        {   return Err(Error::TemplateFormat(format!(
              "'{}' must come before '{}'",
              INPUT_MARKER, RESPONSE_MARKER
            )));
        }
        Ok(ChatSections
        {   system: &self.text[..input_at]
          , user: &self.text[input_at + INPUT_MARKER.len()..response_at]
          , response: &self.text[response_at + RESPONSE_MARKER.len()..]
        })
    }

    /// Build the prompt for `mode`. Only the user section (chat) or the
    /// whole text (legacy) has its placeholders filled.
    pub fn assemble(
      &self
    , mode: CompletionMode
    , question: &str
    , table_metadata: &str
    ) -> Result<PromptBundle, Error>
    {   let values = [
          (QUESTION_PLACEHOLDER, question)
        , (METADATA_PLACEHOLDER, table_metadata)
        ];
        let bundle = match mode
        {   CompletionMode::Chat => {
              let sections = self.sections()?;
              PromptBundle::Chat
              {   system: sections.system.to_string()
                , user: fill_placeholders(sections.user, &values)?
                , assistant: sections.response.to_string()
              }
            }
          , CompletionMode::Legacy => {
              PromptBundle::Legacy(
                fill_placeholders(&self.text, &values)?
              )
            }
        };
        trace!("Assembled prompt: {:?}", bundle);
        Ok(bundle)
    }
}

fn single_marker(text: &str, marker: &str) -> Result<usize, Error>
{   let mut found = text.match_indices(marker).map(|(i, _)| i);
    match (found.next(), found.next())
    {   (Some(at), None) => Ok(at)
      , (None, _) => Err(Error::TemplateFormat(
          format!("missing '{}' marker", marker)
        ))
      , (Some(_), Some(_)) => Err(Error::TemplateFormat(
          format!("'{}' marker appears more than once", marker)
        ))
    }
}

/// Substitute `{name}` placeholders. `{{` and `}}` are literal braces;
/// unknown names and unbalanced braces are template errors.
pub fn fill_placeholders(
  template: &str
, values: &[(&str, &str)]
) -> Result<String, Error>
{   let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next()
    { match c
      {   '{' if chars.peek() == Some(&'{') => {
            chars.next();
            out.push('{');
          }
        , '{' => {
            let mut name = String::new();
            loop
            { match chars.next()
              {   Some('}') => break
                , Some('{') | None => {
                    return Err(Error::TemplateFormat(
                      "unclosed '{' in template".to_string()
                    ));
                  }
                , Some(ch) => name.push(ch)
              }
            }
            let value = values.iter()
              .find(|(key, _)| *key == name)
              .map(|(_, value)| *value)
              .ok_or_else(|| {
                Error::TemplateFormat(
                  format!("unknown placeholder '{{{}}}'", name)
                )
              })?;
            out.push_str(value);
          }
        , '}' if chars.peek() == Some(&'}') => {
            chars.next();
            out.push('}');
          }
        , '}' => {
            return Err(Error::TemplateFormat(
              "single '}' in template".to_string()
            ));
          }
        , other => out.push(other)
      }
    }
    Ok(out)
}
