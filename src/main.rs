//! HelpDesk - College helpdesk with knowledge-base search and LLM fallback

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use helpdesk::{
    config::HelpdeskConfig,
    knowledge::KnowledgeStore,
    llm::{generator_from_config, GenerationFallback, HttpGenerator},
    retrieval::RetrievalPipeline,
    server::ServerBuilder,
    storage::Database,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "helpdesk")]
#[command(version)]
#[command(about = "College helpdesk with knowledge-base search and LLM fallback")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "HELPDESK_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Answer one question and exit
    Ask {
        /// The question
        query: String,
    },

    /// Run diagnostics
    Doctor,

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.json_logs);

    let config = match &cli.config {
        Some(path) => HelpdeskConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => HelpdeskConfig::default(),
    };

    match cli.command {
        Commands::Serve { host, port } => run_server(config, host, port).await?,
        Commands::Ask { query } => ask(config, &query).await?,
        Commands::Doctor => run_doctor(&config)?,
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, json: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("helpdesk={},tower_http={}", log_level, log_level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run_server(config: HelpdeskConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut builder = ServerBuilder::new().config(config);
    if let Some(host) = host {
        builder = builder.host(host);
    }
    if let Some(port) = port {
        builder = builder.port(port);
    }

    let server = builder.build()?;
    server.start().await?;

    tracing::info!("Helpdesk is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down...");
    server.stop().await?;

    Ok(())
}

async fn ask(config: HelpdeskConfig, query: &str) -> Result<()> {
    config.validate()?;
    let knowledge = Arc::new(KnowledgeStore::load(config.knowledge.source.clone())?);
    let generator = generator_from_config(&config.llm)?;
    let pipeline = RetrievalPipeline::new(knowledge, GenerationFallback::new(generator))
        .with_threshold(config.retrieval.threshold);

    let answer = pipeline.answer(query).await?;
    tracing::debug!(source = answer.source(), "Answered");
    println!("{}", answer.text());
    Ok(())
}

fn run_doctor(config: &HelpdeskConfig) -> Result<()> {
    println!("HelpDesk Doctor");
    println!();

    println!("Checking knowledge base...");
    match KnowledgeStore::load(config.knowledge.source.clone()) {
        Ok(_) => {
            let origin = config
                .knowledge
                .source
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "builtin".to_string());
            println!("  ✓ Knowledge base indexed ({})", origin);
        }
        Err(e) => println!("  ✗ {}", e),
    }

    println!();
    println!("Checking database...");
    match Database::open(&config.storage.database).and_then(|db| db.ping()) {
        Ok(()) => println!("  ✓ {}", config.storage.database.display()),
        Err(e) => println!("  ✗ {}: {}", config.storage.database.display(), e),
    }

    println!();
    println!("Checking generative endpoint...");
    if !config.llm.enabled {
        println!("  ℹ Disabled; unmatched questions use substring search");
    } else {
        match HttpGenerator::new(&config.llm) {
            Ok(generator) if generator.has_api_key() => {
                println!("  ✓ Credential found in {}", config.llm.api_key_env)
            }
            Ok(_) => println!(
                "  ✗ {} is not set; unmatched questions use substring search",
                config.llm.api_key_env
            ),
            Err(e) => println!("  ✗ {}", e),
        }
    }

    println!();
    println!("Doctor check complete!");

    Ok(())
}

fn show_config(config: Option<&HelpdeskConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    let toml = toml::to_string_pretty(&config)?;
    println!("{}", toml);
    Ok(())
}
