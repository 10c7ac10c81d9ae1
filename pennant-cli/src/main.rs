//! Pennant CLI
//!
//! Command-line interface for checking flag documents and evaluating flags
//! against them without a host runtime.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pennant_engine::payload;
use pennant_engine::{Engine, EngineOpts, ErrorStrategy, SourceKind};
use pennant_evaluation::{EvaluationRequest, FlagType};
use std::path::PathBuf;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "pennant")]
#[command(about = "Pennant - Native feature flag evaluation engine", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level
    #[arg(short, long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a flag document and report whether it compiles
    Validate {
        /// Flag document
        snapshot: PathBuf,
    },

    /// List the flags of a namespace
    List {
        /// Flag document
        snapshot: PathBuf,

        /// Namespace
        #[arg(short, long)]
        namespace: Option<String>,
    },

    /// Evaluate one flag for one entity
    Eval {
        /// Flag document
        snapshot: PathBuf,

        /// Flag key
        #[arg(short, long)]
        flag: String,

        /// Entity identifier
        #[arg(short, long)]
        entity: String,

        /// Namespace
        #[arg(short, long)]
        namespace: Option<String>,

        /// Context property, repeatable
        #[arg(short, long = "context", value_name = "KEY=VALUE", value_parser = parse_property)]
        context: Vec<(String, String)>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level)?;

    match cli.command {
        Commands::Validate { snapshot } => validate(snapshot),
        Commands::List {
            snapshot,
            namespace,
        } => list(snapshot, namespace),
        Commands::Eval {
            snapshot,
            flag,
            entity,
            namespace,
            context,
        } => eval(snapshot, namespace, flag, entity, context),
    }
}

fn setup_logging(level: &str) -> Result<()> {
    let level = level.parse::<Level>().unwrap_or(Level::WARN);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;

    Ok(())
}

/// Engine over a document file, read once
fn open(snapshot: PathBuf, namespace: Option<&str>) -> Result<Engine> {
    let display = snapshot.display().to_string();
    let opts = EngineOpts {
        source: SourceKind::File,
        path: Some(snapshot),
        update_interval: 0,
        error_strategy: ErrorStrategy::Fail,
        ..Default::default()
    };
    Engine::new(namespace, opts).with_context(|| format!("Failed to load {display}"))
}

fn validate(snapshot: PathBuf) -> Result<()> {
    info!("Validating flag document {}", snapshot.display());

    let engine = open(snapshot, None)?;
    let document = engine.document()?;

    println!(
        "ok: namespace {}, {} flags",
        document.namespace.key,
        document.flags.len()
    );

    Ok(())
}

fn list(snapshot: PathBuf, namespace: Option<String>) -> Result<()> {
    let engine = open(snapshot, namespace.as_deref())?;
    println!("{}", payload::encode(engine.list_flags()));
    Ok(())
}

fn eval(
    snapshot: PathBuf,
    namespace: Option<String>,
    flag: String,
    entity: String,
    context: Vec<(String, String)>,
) -> Result<()> {
    let engine = open(snapshot, namespace.as_deref())?;

    let kind = engine
        .list_flags()
        .ok()
        .and_then(|flags| flags.into_iter().find(|info| info.key == flag))
        .map(|info| info.r#type);
    debug!(flag = %flag, kind = ?kind, "Evaluating");

    let request = context
        .into_iter()
        .fold(EvaluationRequest::new(flag, entity), |request, (k, v)| {
            request.with_context(k, v)
        });

    let output = match kind {
        Some(FlagType::Boolean) => payload::encode(engine.boolean(&request)),
        _ => payload::encode(engine.variant(&request)),
    };
    println!("{output}");

    Ok(())
}

fn parse_property(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got `{s}`")),
    }
}
