//! entrel CLI - Command-line interface
//!
//! Usage:
//!   entrel extract <path> [--types PERSON,ORG] [--threshold 0.5] [--mode local|aws]
//!   entrel extract --text "Alice met Bob."
//!   entrel serve-config

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use entrel_core::config::{AppConfig, ExtractionMode};
use entrel_extractor::{ExtractionOptions, ExtractionService};
use entrel_parser::ParserRegistry;
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "entrel")]
#[command(about = "Entity recognition and relationship inference")]
#[command(version)]
struct Cli {
    /// TOML configuration file (environment variables take precedence)
    #[arg(long, global = true, env = "ENTREL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract entities and relationships from a document or text
    Extract {
        /// Document to analyze (pdf, txt, md)
        #[arg(required_unless_present = "text", conflicts_with = "text")]
        path: Option<PathBuf>,

        /// Analyze this text instead of a file
        #[arg(long)]
        text: Option<String>,

        /// Comma-separated entity types to keep
        #[arg(long, value_delimiter = ',')]
        types: Option<Vec<String>>,

        /// Minimum relationship strength in [0, 1]
        #[arg(long)]
        threshold: Option<f32>,

        /// Recognizer backend
        #[arg(long, value_enum)]
        mode: Option<Mode>,
    },
    /// Print the effective configuration as TOML
    ServeConfig,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Local,
    Aws,
}

impl From<Mode> for ExtractionMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Local => ExtractionMode::Local,
            Mode::Aws => ExtractionMode::Aws,
        }
    }
}

#[derive(Serialize)]
struct DocumentOutput {
    file_name: String,
    file_type: String,
    title: Option<String>,
    page_count: Option<u32>,
}

#[derive(Serialize)]
struct ExtractOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    document: Option<DocumentOutput>,
    #[serde(flatten)]
    result: entrel_core::ExtractionResult,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref())?;
    init_tracing(&config);

    match cli.command {
        Commands::Extract {
            path,
            text,
            types,
            threshold,
            mode,
        } => {
            if let Some(mode) = mode {
                config.extraction.mode = mode.into();
            }

            let (content, document) = match (path, text) {
                (_, Some(text)) => (text, None),
                (Some(path), None) => {
                    let doc = ParserRegistry::with_defaults()
                        .parse(&path)
                        .with_context(|| format!("failed to parse {}", path.display()))?;
                    tracing::info!(
                        file = %doc.file_name,
                        words = doc.word_count(),
                        "Parsed document"
                    );
                    let info = DocumentOutput {
                        file_name: doc.file_name.clone(),
                        file_type: doc.file_type.to_string(),
                        title: doc.metadata.title.clone(),
                        page_count: doc.metadata.page_count,
                    };
                    (doc.content, Some(info))
                }
                (None, None) => bail!("either a path or --text is required"),
            };

            let service = ExtractionService::from_config(&config)?;
            let options = ExtractionOptions {
                entity_types: types,
                relationship_threshold: threshold,
            };
            let result = service.extract(&content, &options).await?;

            let output = ExtractOutput { document, result };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::ServeConfig => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?
            .with_env_override()?,
        None => AppConfig::from_env()?,
    };
    Ok(config)
}

/// Logs go to stderr so stdout stays valid JSON
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("entrel={0},entrel_extractor={0}", config.logging.level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_extract_text() {
        let cli = Cli::try_parse_from([
            "entrel",
            "extract",
            "--text",
            "Alice met Bob.",
            "--types",
            "PERSON,ORG",
            "--threshold",
            "0.5",
            "--mode",
            "aws",
        ])
        .unwrap();

        match cli.command {
            Commands::Extract {
                path,
                text,
                types,
                threshold,
                mode,
            } => {
                assert!(path.is_none());
                assert_eq!(text.as_deref(), Some("Alice met Bob."));
                assert_eq!(types, Some(vec!["PERSON".to_string(), "ORG".to_string()]));
                assert_eq!(threshold, Some(0.5));
                assert!(matches!(mode, Some(Mode::Aws)));
            }
            Commands::ServeConfig => panic!("expected extract"),
        }
    }

    #[test]
    fn test_extract_requires_input() {
        assert!(Cli::try_parse_from(["entrel", "extract"]).is_err());
        assert!(Cli::try_parse_from(["entrel", "extract", "a.txt", "--text", "x"]).is_err());
    }
}
