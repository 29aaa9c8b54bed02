//! geolink CLI
//!
//! Links place-name mentions from a table to Wikidata identifiers.

mod table;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use geolink_core::{validate_language, EntityId, ExclusionPolicy, SearchTerm};
use geolink_linker::{
    CandidateResolver, ClientConfig, LinkagePipeline, PipelineConfig, PropertyFetcher,
    WikidataClient,
};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// geolink - match free-text place names to Wikidata items
#[derive(Parser)]
#[command(name = "geolink")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Link every mention in a CSV table
    Link {
        /// Input CSV file with a header row
        #[arg(short, long)]
        input: PathBuf,

        /// Column holding the place mentions
        #[arg(short, long, default_value = "location")]
        column: String,

        /// Type ids to exclude (comma-separated, e.g. Q1549591,Q515)
        #[arg(short, long, default_value = "")]
        exclude: String,

        /// Label language (defaults to GEOLINK_LANGUAGE or "en")
        #[arg(short, long)]
        lang: Option<String>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,

        /// Pause between remote calls in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Remote calls allowed in flight at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Timeout for a single remote call in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Check that both services answer before linking
        #[arg(long)]
        preflight: bool,
    },

    /// Show the ranked candidates for one place name
    Resolve {
        /// Place name
        term: String,

        /// Label language
        #[arg(short, long)]
        lang: Option<String>,
    },

    /// Show the instance-of types of one item
    Types {
        /// Item id (e.g., Q2749)
        id: String,

        /// Label language
        #[arg(short, long)]
        lang: Option<String>,
    },

    /// Check that the query service and entity API are reachable
    Check,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env if present.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Setup logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Link {
            input,
            column,
            exclude,
            lang,
            out,
            format,
            delay_ms,
            concurrency,
            timeout_secs,
            preflight,
        } => {
            let mut config = PipelineConfig::from_env();
            if let Some(lang) = lang {
                config = config.with_language(lang);
            }
            if let Some(delay_ms) = delay_ms {
                config = config.with_delay(Duration::from_millis(delay_ms));
            }
            if let Some(concurrency) = concurrency {
                config = config.with_concurrency(concurrency);
            }
            if let Some(secs) = timeout_secs {
                config = config.with_call_timeout(Duration::from_secs(secs));
            }
            cmd_link(input, column, exclude, config, out, format, preflight).await?;
        }
        Commands::Resolve { term, lang } => {
            cmd_resolve(term, language_or_default(lang)).await?;
        }
        Commands::Types { id, lang } => {
            cmd_types(id, language_or_default(lang)).await?;
        }
        Commands::Check => {
            cmd_check().await?;
        }
    }

    Ok(())
}

fn language_or_default(lang: Option<String>) -> String {
    lang.unwrap_or_else(|| PipelineConfig::from_env().language)
}

fn client(timeout: Option<Duration>) -> Result<WikidataClient> {
    let mut config = ClientConfig::from_env();
    if let Some(timeout) = timeout {
        config = config.with_timeout(timeout);
    }
    WikidataClient::new(config).context("Failed to build the Wikidata client")
}

async fn cmd_link(
    input: PathBuf,
    column: String,
    exclude: String,
    config: PipelineConfig,
    out: Option<PathBuf>,
    format: OutputFormat,
    preflight: bool,
) -> Result<()> {
    let exclusions = ExclusionPolicy::parse_list(&exclude).context("Invalid --exclude list")?;
    let client = client(Some(config.call_timeout))?;
    let pipeline =
        LinkagePipeline::new(Arc::new(client), config).context("Invalid linking configuration")?;

    let mentions = table::read_mentions(&input, &column)?;
    info!("Read {} mentions from {}", mentions.len(), input.display());

    if preflight {
        pipeline
            .preflight()
            .await
            .context("Knowledge base preflight failed")?;
    }

    let report = pipeline.link(&mentions, &exclusions).await;

    match &out {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            write_report(&report, format, BufWriter::new(file))?;
            eprintln!(
                "✓ Linked {}/{} terms, written to {}",
                report.resolved_count(),
                report.len(),
                path.display()
            );
        }
        None => {
            write_report(&report, format, io::stdout().lock())?;
        }
    }

    Ok(())
}

fn write_report<W: io::Write>(
    report: &geolink_linker::LinkageReport,
    format: OutputFormat,
    writer: W,
) -> Result<()> {
    match format {
        OutputFormat::Csv => table::write_csv(report, writer),
        OutputFormat::Json => table::write_json(report, writer),
    }
}

async fn cmd_resolve(term: String, language: String) -> Result<()> {
    validate_language(&language)?;
    let term = SearchTerm::parse(&term)
        .ok_or_else(|| anyhow::anyhow!("Place name is empty after cleanup: {:?}", term))?;

    let resolver = CandidateResolver::new(Arc::new(client(None)?));
    match resolver.resolve(&term, &language).await? {
        Some(set) => {
            println!("Candidates for {} ({}):", term, language);
            for (rank, candidate) in set.candidates().iter().enumerate() {
                println!(
                    "  {}. {} ({} sitelinks)",
                    rank + 1,
                    candidate.id,
                    candidate.sitelinks
                );
            }
        }
        None => println!("No geographic match for {}", term),
    }

    Ok(())
}

async fn cmd_types(id: String, language: String) -> Result<()> {
    validate_language(&language)?;
    let id: EntityId = id.parse()?;

    let fetcher = PropertyFetcher::new(Arc::new(client(None)?));
    let mut types: Vec<_> = fetcher.fetch_types(&id, &language).await?.into_iter().collect();
    types.sort();

    if types.is_empty() {
        println!("{} has no instance-of statements.", id);
    } else {
        println!("{} is an instance of:", id);
        for t in types {
            println!("  • {}", t);
        }
    }

    Ok(())
}

async fn cmd_check() -> Result<()> {
    let pipeline_config = PipelineConfig::from_env();
    let client = client(Some(pipeline_config.call_timeout))?;
    let config = client.config().clone();
    let pipeline = LinkagePipeline::new(Arc::new(client), pipeline_config)
        .context("Invalid linking configuration")?;

    match pipeline.preflight().await {
        Ok(()) => {
            println!("✓ Knowledge base reachable");
            println!("  Query service: {}", config.sparql_url);
            println!("  Entity API: {}", config.api_url);
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: knowledge base is not reachable: {}", e);
            eprintln!("  Query service: {}", config.sparql_url);
            eprintln!("  Entity API: {}", config.api_url);
            anyhow::bail!("Knowledge base unavailable");
        }
    }
}
