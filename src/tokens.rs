//! Token accounting over the prompt actually sent

use log::{debug, warn};
use tiktoken_rs::CoreBPE;

use crate::error::Error;
use crate::Prompt;

/// Encoder chosen for one model family
pub struct TokenCounter
{   model: String
  , bpe: CoreBPE
}

impl TokenCounter
{   /// Encoder for `model`; models tiktoken does not know are counted
    /// with cl100k_base
    pub fn for_model(model: &str) -> Result<Self, Error>
    {   let bpe = match tiktoken_rs::get_bpe_from_model(model)
        {   Ok(bpe) => bpe
          , Err(e) => {
              warn!(
                "No encoding registered for {} ({}), using cl100k_base",
                model, e
              );
              tiktoken_rs::cl100k_base()
                .map_err(|e| Error::Tokenizer(e.to_string()))?
            }
        };
        debug!("Token counter ready for {}", model);
        Ok(TokenCounter
        {   model: model.to_string()
          , bpe
        })
    }

    pub fn model(&self) -> &str
    {   &self.model
    }

    pub fn count_text(&self, text: &str) -> usize
    {   self.bpe.encode_with_special_tokens(text).len()
    }

    /// Chat prompts count every field of every message, role included
    pub fn count_prompt(&self, prompt: &Prompt) -> usize
    {   match prompt
        {   Prompt::Chat(messages) => {
              messages.iter()
                .map(|m| {
                  self.count_text(m.role.as_str())
                    + self.count_text(&m.content)
                })
                .sum()
            }
          , Prompt::Text(text) => self.count_text(text)
        }
    }
}

/// One-shot count without keeping an encoder around
pub fn count_tokens(model: &str, prompt: &Prompt)
  -> Result<usize, Error>
{   Ok(TokenCounter::for_model(model)?.count_prompt(prompt))
}

#[cfg(test)]
mod tests
{   use super::*;
    use crate::{ChatMessage, Role};

    #[test]
    fn counts_plain_text()
    {   let chat = TokenCounter::for_model("gpt-3.5-turbo-0613").unwrap();
        assert_eq!(chat.count_text("hello world"), 2);

        let legacy = TokenCounter::for_model("text-davinci-003").unwrap();
        assert_eq!(legacy.count_text("hello world"), 2);
        assert_eq!(
          legacy.count_prompt(&Prompt::Text("hello world".into())),
          2
        );
    }

    #[test]
    fn chat_count_includes_roles()
    {   let counter = TokenCounter::for_model("gpt-4-0613").unwrap();
        let messages = vec![
          ChatMessage::new(Role::System, "You write SQL.")
        , ChatMessage::new(Role::User, "how many users?")
        , ChatMessage::new(Role::Assistant, "```sql")
        ];
        let expected: usize = messages.iter()
          .map(|m| {
            counter.count_text(m.role.as_str())
              + counter.count_text(&m.content)
          })
          .sum();
        let contents_only: usize = messages.iter()
          .map(|m| counter.count_text(&m.content))
          .sum();

        let counted = counter.count_prompt(&Prompt::Chat(messages));
        assert_eq!(counted, expected);
        assert!(counted > contents_only);
    }

    #[test]
    fn counting_is_deterministic()
    {   let prompt = Prompt::Text("SELECT * FROM users".into());
        let first = count_tokens("text-davinci-003", &prompt).unwrap();
        let second = count_tokens("text-davinci-003", &prompt).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_models_fall_back()
    {   let counter = TokenCounter::for_model("scripted-model").unwrap();
        assert_eq!(counter.model(), "scripted-model");
        assert_eq!(counter.count_text("hello world"), 2);
    }
}
