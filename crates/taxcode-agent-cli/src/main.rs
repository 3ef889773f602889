//! Tax code assistant CLI.
//!
//! Provides commands for the three pipeline stages and the interactive
//! assistant:
//! - `convert`: USLM XML to Markdown
//! - `format`: chunked LLM reformatting of the Markdown
//! - `ask`: one-shot question against the prepared tax code
//! - `chat`: interactive question loop, preparing the corpus if needed

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use taxcode_agent::agent::TaxAgent;
use taxcode_agent::convert::convert_file;
use taxcode_agent::ollama::{DEFAULT_MODEL, OllamaClient};
use taxcode_agent::options::ConvertOptions;
use taxcode_agent::pipeline::{self, PipelineOptions};
use taxcode_agent::{ConvertError, PipelineError};

/// Errors surfaced to the user at top level.
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("I/O error")]
    Io(#[from] io::Error),

    #[error("tax code XML file not found: {0}")]
    MissingXml(PathBuf),
}

/// Tax code assistant: converts the US tax code to Markdown and answers
/// questions against it.
#[derive(Parser)]
#[command(name = "taxcode", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a tax code XML document to Markdown.
    Convert(ConvertArgs),
    /// Reformat a Markdown document chunk-by-chunk with a language model.
    Format(FormatArgs),
    /// Ask a single question against the prepared tax code.
    Ask(AskArgs),
    /// Interactive question loop, preparing the corpus first if needed.
    Chat(ChatArgs),
}

#[derive(Args)]
struct ConvertArgs {
    /// Input tax code XML file.
    #[arg(long, default_value = "data/usc26.xml")]
    xml: PathBuf,

    /// Output Markdown file.
    #[arg(long, default_value = "data/usc26.md")]
    output: PathBuf,

    /// Drop the whole subtree of textless uncommon elements instead of
    /// keeping their children.
    #[arg(long)]
    prune_empty: bool,
}

#[derive(Args)]
struct FormatArgs {
    /// Input Markdown file.
    #[arg(long, default_value = "data/usc26.md")]
    input: PathBuf,

    /// Final output file path.
    #[arg(long, default_value = "data/output/usc26_formatted.md")]
    output: PathBuf,

    /// Ollama model to use.
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Maximum chunk size in characters.
    #[arg(long, default_value_t = 5000)]
    chunk_size: usize,

    /// Resume from the last processed chunk.
    #[arg(long)]
    resume: bool,

    /// Clean intermediate files after processing.
    #[arg(long)]
    clean: bool,
}

#[derive(Args)]
struct AskArgs {
    /// The question to ask.
    question: String,

    /// Path to the formatted tax code Markdown file.
    #[arg(long, default_value = "data/output/usc26_formatted.md")]
    tax_code: PathBuf,

    /// Ollama model to use.
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,
}

#[derive(Args)]
struct ChatArgs {
    /// Input tax code XML file, used when the corpus must be prepared.
    #[arg(long, default_value = "data/usc26.xml")]
    xml: PathBuf,

    /// Intermediate Markdown file between conversion and formatting.
    #[arg(long, default_value = "data/usc26.md")]
    intermediate: PathBuf,

    /// Path to the formatted tax code Markdown file.
    #[arg(long, default_value = "data/output/usc26_formatted.md")]
    tax_code: PathBuf,

    /// Ollama model to use.
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Maximum chunk size for LLM processing.
    #[arg(long, default_value_t = 5000)]
    chunk_size: usize,

    /// Resume formatting from the last processed chunk.
    #[arg(long)]
    resume: bool,

    /// Clean intermediate files after processing.
    #[arg(long)]
    clean: bool,

    /// Force reprocessing of the tax code documents.
    #[arg(long)]
    reprocess: bool,

    /// Run a single query instead of the interactive loop.
    #[arg(long)]
    query: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match cli.command {
        Commands::Convert(args) => run_convert(&args),
        Commands::Format(args) => run_format(&args),
        Commands::Ask(args) => run_ask(&args),
        Commands::Chat(args) => run_chat(&args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            let mut source = std::error::Error::source(&err);
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn run_convert(args: &ConvertArgs) -> Result<(), CliError> {
    let options = ConvertOptions {
        prune_empty: args.prune_empty,
        ..ConvertOptions::default()
    };
    convert_file(&args.xml, &args.output, &options)?;
    Ok(())
}

fn run_format(args: &FormatArgs) -> Result<(), CliError> {
    let client = OllamaClient::new(&args.model);
    let options = PipelineOptions {
        max_chunk_size: args.chunk_size,
        resume: args.resume,
        clean: args.clean,
        ..PipelineOptions::default()
    };
    pipeline::format_file(&args.input, &args.output, &client, &options)?;
    Ok(())
}

fn run_ask(args: &AskArgs) -> Result<(), CliError> {
    let client = OllamaClient::new(&args.model);
    let mut agent = TaxAgent::from_file(&args.tax_code, client);
    let response = agent.query(&args.question);
    println!("{response}");
    Ok(())
}

fn run_chat(args: &ChatArgs) -> Result<(), CliError> {
    prepare_corpus(args)?;

    let client = OllamaClient::new(&args.model);
    let mut agent = TaxAgent::from_file(&args.tax_code, client);

    if let Some(question) = &args.query {
        let response = agent.query(question);
        println!("{response}");
        return Ok(());
    }

    println!("\nWelcome to Tax Agent! Ask me any tax-related questions (type 'exit' to quit).");
    let stdin = io::stdin();
    loop {
        print!("\n> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question.to_lowercase().as_str(), "exit" | "quit" | "bye") {
            println!("Goodbye!");
            break;
        }

        let response = agent.query(question);
        println!("\n{response}");
    }
    Ok(())
}

/// Convert and format the tax code if the finished document is missing or
/// reprocessing was requested.
fn prepare_corpus(args: &ChatArgs) -> Result<(), CliError> {
    if args.tax_code.exists() && !args.reprocess {
        tracing::info!(path = %args.tax_code.display(), "using existing tax code document");
        return Ok(());
    }

    tracing::info!("processing tax code documents");
    if !args.intermediate.exists() || args.reprocess {
        if !args.xml.exists() {
            return Err(CliError::MissingXml(args.xml.clone()));
        }
        tracing::info!("converting XML to Markdown");
        convert_file(&args.xml, &args.intermediate, &ConvertOptions::default())?;
    }

    tracing::info!("formatting Markdown with LLM");
    let client = OllamaClient::new(&args.model);
    let options = PipelineOptions {
        max_chunk_size: args.chunk_size,
        resume: args.resume,
        clean: args.clean,
        ..PipelineOptions::default()
    };
    pipeline::format_file(&args.intermediate, &args.tax_code, &client, &options)?;
    Ok(())
}
