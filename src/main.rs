use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use pdf_highlighter::config::{default_config_path, find_config_file, load_config, Config};
use pdf_highlighter::pdf::{extract_text, load_document};
use pdf_highlighter::phrases::{GroqClient, PhraseError};
use pdf_highlighter::pipeline::{Pipeline, PipelineSettings};
use pdf_highlighter::text::chunk_text;
use pdf_highlighter::ui::{
    format_file_size, format_number, print_section, print_status, truncate_with_ellipsis,
    ChunkProgress, Status, StdinGate,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// PDF Highlighter - mark the key phrases of a PDF using a language model
#[derive(Parser, Debug)]
#[command(name = "pdf-highlighter")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Highlight the key phrases of a PDF document", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times: -v, -vv, -vvv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Highlight the key phrases of a PDF
    Highlight {
        /// Input PDF
        input: PathBuf,

        /// Output PDF (defaults to <input>_highlighted.pdf)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Phrase service API key
        #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Process large documents without asking
        #[arg(long, short = 'y')]
        yes: bool,

        /// Maximum chunk size in characters
        #[arg(long)]
        max_chunk_size: Option<usize>,

        /// Minimum phrase length in characters
        #[arg(long)]
        min_phrase_len: Option<usize>,
    },

    /// Print the text extracted from a PDF
    Extract {
        /// Input PDF
        input: PathBuf,

        /// Show the chunk split instead of the text
        #[arg(long)]
        chunks: bool,

        /// Maximum chunk size in characters
        #[arg(long)]
        max_chunk_size: Option<usize>,
    },

    /// Write a configuration file with default values
    InitConfig {
        /// Destination (defaults to the user config directory)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing(cli: &Cli, config: &Config) {
    let level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => config.logging.level.as_str(),
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("pdf_highlighter={}", level)),
    );
    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format.as_deref() == Some("json") {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn resolve_config(path: Option<&Path>) -> Result<Config> {
    let path = path.map(Path::to_path_buf).or_else(find_config_file);
    load_config(path.as_deref()).with_context(|| match &path {
        Some(path) => format!("Failed to load config from {}", path.display()),
        None => "Failed to load config from the environment".to_string(),
    })
}

/// `paper.pdf` becomes `paper_highlighted.pdf` in the same directory
fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    input.with_file_name(format!("{}_highlighted.pdf", stem))
}

fn read_pdf(input: &Path) -> Result<Vec<u8>> {
    std::fs::read(input).with_context(|| format!("Failed to read {}", input.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = resolve_config(cli.config.as_deref())?;
    init_tracing(&cli, &config);

    match cli.command {
        Commands::Highlight {
            ref input,
            ref output,
            ref api_key,
            yes,
            max_chunk_size,
            min_phrase_len,
        } => {
            let mut config = config;
            if let Some(size) = max_chunk_size {
                config.chunking.max_chunk_size = size;
            }
            if let Some(len) = min_phrase_len {
                config.highlight.min_phrase_len = len;
            }

            let bytes = read_pdf(input)?;
            let api_key = api_key
                .clone()
                .or_else(|| config.service.resolve_api_key())
                .ok_or(PhraseError::MissingApiKey)?;
            let client = GroqClient::new(api_key, config.service.clone(), config.retry.policy())?;

            let progress = ChunkProgress::new(cli.quiet);
            let gate = StdinGate::new(yes).with_progress(progress.clone());
            let pipeline = Pipeline::new(PipelineSettings::from(&config), Arc::new(client))
                .with_listener(Arc::new(progress))
                .with_gate(Arc::new(gate));

            let result = pipeline
                .run(&bytes)
                .await
                .with_context(|| format!("Failed to highlight {}", input.display()))?;

            let output_path = output.clone().unwrap_or_else(|| default_output_path(input));
            std::fs::write(&output_path, &result.pdf)
                .with_context(|| format!("Failed to write {}", output_path.display()))?;

            if !cli.quiet {
                print_status(
                    Status::Info,
                    &format!(
                        "Extracted {} characters in {} chunks",
                        format_number(result.characters),
                        result.chunks
                    ),
                );
                print_status(
                    Status::Success,
                    &format!(
                        "{} highlights from {} phrases written to {} ({})",
                        result.annotations.to_string().yellow().bold(),
                        result.phrases.len(),
                        output_path.display().to_string().cyan(),
                        format_file_size(result.pdf.len() as u64)
                    ),
                );
                if !result.warnings.is_empty() {
                    print_status(
                        Status::Warning,
                        &format!("{} warnings during processing", result.warnings.len()),
                    );
                }
            }
        }

        Commands::Extract {
            ref input,
            chunks,
            max_chunk_size,
        } => {
            let bytes = read_pdf(input)?;
            let document = load_document(&bytes)
                .with_context(|| format!("Failed to parse {}", input.display()))?;
            let text = extract_text(&document);

            if chunks {
                let max = max_chunk_size.unwrap_or(config.chunking.max_chunk_size);
                let chunks = chunk_text(&text, max);
                print_section(&format!("{} chunks (max {} characters)", chunks.len(), max));
                for chunk in &chunks {
                    let preview = chunk.text.replace('\n', " ");
                    println!(
                        "{:>4}  {:>6}  {}",
                        (chunk.index + 1).to_string().cyan(),
                        chunk.char_len(),
                        truncate_with_ellipsis(&preview, 60)
                    );
                }
            } else {
                println!("{}", text);
            }

            if !cli.quiet {
                print_status(
                    Status::Info,
                    &format!(
                        "Extracted {} characters from {} pages",
                        format_number(text.chars().count()),
                        document.page_count()
                    ),
                );
            }
        }

        Commands::InitConfig { ref path, force } => {
            let path = match path.clone().or_else(default_config_path) {
                Some(path) => path,
                None => anyhow::bail!("No config directory found; pass a path explicitly"),
            };
            if path.exists() && !force {
                anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
            }
            Config::default()
                .save(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            print_status(
                Status::Success,
                &format!("Wrote default configuration to {}", path.display()),
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_highlight_args() {
        let cli = Cli::parse_from([
            "pdf-highlighter",
            "highlight",
            "paper.pdf",
            "-o",
            "out.pdf",
            "--yes",
            "--max-chunk-size",
            "1500",
            "--min-phrase-len",
            "8",
        ]);
        match cli.command {
            Commands::Highlight {
                input,
                output,
                yes,
                max_chunk_size,
                min_phrase_len,
                ..
            } => {
                assert_eq!(input, PathBuf::from("paper.pdf"));
                assert_eq!(output, Some(PathBuf::from("out.pdf")));
                assert!(yes);
                assert_eq!(max_chunk_size, Some(1500));
                assert_eq!(min_phrase_len, Some(8));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::parse_from(["pdf-highlighter", "-vv", "extract", "a.pdf"]);
        assert_eq!(cli.verbose, 2);

        let cli = Cli::parse_from(["pdf-highlighter", "extract", "a.pdf", "--chunks", "-q"]);
        assert!(cli.quiet);
        assert!(matches!(cli.command, Commands::Extract { chunks: true, .. }));
    }

    #[test]
    fn test_cli_init_config() {
        let cli = Cli::parse_from(["pdf-highlighter", "init-config", "cfg.toml", "--force"]);
        match cli.command {
            Commands::InitConfig { path, force } => {
                assert_eq!(path, Some(PathBuf::from("cfg.toml")));
                assert!(force);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/tmp/paper.pdf")),
            PathBuf::from("/tmp/paper_highlighted.pdf")
        );
        assert_eq!(
            default_output_path(Path::new("notes")),
            PathBuf::from("notes_highlighted.pdf")
        );
    }
}
