//! Schema pruner seam
//!
//! The generator only needs a string of schema metadata relevant to a
//! question; how it is pruned is up to the implementor.

use std::collections::HashMap;
use std::path::Path;

use log::{debug, warn};

use crate::error::Error;

pub trait SchemaPruner: Send + Sync
{   /// Metadata relevant to `question` within database `db_name`
    fn prune(&self, question: &str, db_name: &str) -> String;
}

impl<F> SchemaPruner for F
where
  F: Fn(&str, &str) -> String + Send + Sync
{   fn prune(&self, question: &str, db_name: &str) -> String
    {   self(question, db_name)
    }
}

/// Returns the full stored metadata for a database, unpruned
#[derive(Debug, Clone, Default)]
pub struct StaticMetadata
{   by_db: HashMap<String, String>
}

impl StaticMetadata
{   pub fn new() -> Self
    {   StaticMetadata::default()
    }

    pub fn with_database(
      mut self
    , db_name: impl Into<String>
    , metadata: impl Into<String>
    ) -> Self
    {   self.by_db.insert(db_name.into(), metadata.into());
        self
    }

    /// Single database whose metadata is read from a file
    pub fn from_file(
      db_name: impl Into<String>
    , path: impl AsRef<Path>
    ) -> Result<Self, Error>
    {   let path = path.as_ref();
        let metadata = std::fs::read_to_string(path).map_err(|e| {
          Error::InvalidConfiguration(
            format!("{}: {}", path.display(), e)
          )
        })?;
        Ok(StaticMetadata::new().with_database(db_name, metadata))
    }
}

impl SchemaPruner for StaticMetadata
{   fn prune(&self, _question: &str, db_name: &str) -> String
    {   match self.by_db.get(db_name)
        {   Some(metadata) => {
              debug!("Using stored metadata for {}", db_name);
              metadata.clone()
            }
          , None => {
              warn!("No metadata stored for database {}", db_name);
              String::new()
            }
        }
    }
}
