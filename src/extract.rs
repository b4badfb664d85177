//! SQL extraction from generated text

pub const SQL_FENCE: &str = "```sql";
pub const CLOSING_FENCE: &str = "```";

/// Segment after the last "```sql" fence, up to its closing fence if
/// the model emitted one. Text without a fence is returned unchanged.
/// The SQL itself is not checked.
pub fn extract_sql(generated: &str) -> &str
{   match generated.rfind(SQL_FENCE)
    {   Some(at) => {
          let body = &generated[at + SQL_FENCE.len()..];
          match body.find(CLOSING_FENCE)
          {   Some(end) => &body[..end]
            , None => body
          }
        }
      , None => generated
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn takes_segment_after_fence()
    {   assert_eq!(extract_sql("blah ```sql SELECT 1 ```"), " SELECT 1 ");
        assert_eq!(extract_sql("```sql\nSELECT 1;"), "\nSELECT 1;");
    }

    #[test]
    fn last_fence_wins()
    {   assert_eq!(
          extract_sql("```sql a ``` then ```sql b"),
          " b"
        );
    }

    #[test]
    fn plain_text_is_returned_unchanged()
    {   assert_eq!(
          extract_sql("SELECT count(*) FROM users"),
          "SELECT count(*) FROM users"
        );
        assert_eq!(extract_sql("no fence ``` here"), "no fence ``` here");
        assert_eq!(extract_sql(""), "");
    }
}
