use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::error;

use allm_sqlgen::{GeneratorConfig, QueryGenerator, StaticMetadata};

/// Generate SQL for a natural-language question
#[derive(Debug, Parser)]
#[command(name = "sqlgen", version)]
struct Args
{   /// Question to answer
    question: String
  , /// JSON generator config; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>
  , #[arg(long, default_value = "gpt-3.5-turbo-0613")]
    model: String
  , #[arg(long, default_value = "prompts/prompt_openai.md")]
    prompt_file: PathBuf
  , /// Database name handed to the schema pruner
    #[arg(long, default_value = "default")]
    db_name: String
  , /// File holding the table metadata for --db-name
    #[arg(long)]
    metadata_file: Option<PathBuf>
  , #[arg(long, default_value_t = 60)]
    timeout: u64
  , #[arg(short, long)]
    verbose: bool
  , #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>
  , /// OpenAI-compatible API base URL
    #[arg(long)]
    api_base: Option<String>
}

fn init_logging(verbose: bool)
{   let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(
      env_logger::Env::default().default_filter_or(default_filter)
    ).init();
}

fn load_config(args: &Args)
  -> Result<GeneratorConfig, allm_sqlgen::Error>
{   match &args.config
    {   Some(path) => {
          let config = GeneratorConfig::from_json_file(path)?;
          let verbose = config.verbose || args.verbose;
          Ok(config.with_verbose(verbose))
        }
      , None => {
          let config = GeneratorConfig::new(
            args.model.clone(),
            args.prompt_file.clone(),
            args.db_name.clone(),
            args.timeout
          ).with_verbose(args.verbose);
          config.validate()?;
          Ok(config)
        }
    }
}

async fn run(args: Args) -> Result<(), allm_sqlgen::Error>
{   let config = load_config(&args)?;
    let metadata = match &args.metadata_file
    {   Some(path) => StaticMetadata::from_file(&config.db_name, path)?
      , None => StaticMetadata::new()
    };

    let mut client = allm_sqlgen::providers::OpenAiClient::new(
      args.api_key.clone()
    );
    if let Some(base) = &args.api_base
    {   client = client.with_api_base(base.clone());
    }

    let generator = QueryGenerator::new(
      config,
      Arc::new(client),
      Arc::new(metadata)
    )?;
    let result = generator.generate_query(&args.question).await;

    let json = serde_json::to_string_pretty(&result)
      .map_err(|e| allm_sqlgen::Error::ParseError(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode
{   let args = Args::parse();
    init_logging(args.verbose);

    match run(args).await
    {   Ok(()) => ExitCode::SUCCESS
      , Err(e) => {
          error!("{}", e);
          eprintln!("sqlgen: {}", e);
          ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    fn config_fixture() -> String
    {   format!(
          "{}/tests/fixtures/generator_config.json",
          env!("CARGO_MANIFEST_DIR")
        )
    }

    #[test]
    fn config_file_merges_verbose_flag()
    {   let path = config_fixture();
        let quiet = Args::parse_from([
          "sqlgen", "--config", path.as_str(), "how many users?"
        ]);
        let config = load_config(&quiet).unwrap();
        assert_eq!(config.model, "text-davinci-003");
        assert_eq!(config.db_name, "shop");
        assert!(!config.verbose);

        let loud = Args::parse_from([
          "sqlgen", "--config", path.as_str(), "--verbose", "q"
        ]);
        assert!(load_config(&loud).unwrap().verbose);
    }

    #[test]
    fn flags_build_config_without_file()
    {   let args = Args::parse_from([
          "sqlgen", "--model", "gpt-4-0613", "--timeout", "0", "q"
        ]);
        assert!(matches!(
          load_config(&args),
          Err(allm_sqlgen::Error::InvalidConfiguration(_))
        ));
    }
}
