// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use evidence_ingest::sink::{CountingSink, Sink};
use evidence_ingest::source::{AsyncReadSource, Source};
use evidence_ingest::utils::logging::{
    format_failure, format_info, format_step, format_success, format_summary, init_logger,
};
use evidence_ingest::{
    Config, LanceDbClient, LanceDbSink, Pipeline, PipelineError, ProgressBarObserver,
    ProgressObserver, RunFailure, RunSummary, SchemaManager, TracingObserver,
    compute_fingerprint, utils::OperationTimer,
};
use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "evidence-ingest")]
#[command(author = "cipher")]
#[command(version = "0.1.0")]
#[command(about = "Streaming compliance evidence ingestion into LanceDB", long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config/default.toml"
    )]
    config: PathBuf,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest delimited evidence from files, directories or stdin ("-")
    Ingest {
        #[arg(required = true, value_name = "INPUT")]
        inputs: Vec<String>,

        /// Validate and batch without touching LanceDB
        #[arg(long)]
        dry_run: bool,

        #[arg(long, value_name = "NUM")]
        batch_size: Option<usize>,

        #[arg(long)]
        no_progress: bool,
    },

    Verify {
        #[arg(long)]
        create_schema: bool,
    },

    Stats,

    Reset {
        #[arg(long)]
        confirm: bool,
    },

    /// Print the fingerprint of an evidence triple
    Fingerprint {
        control_id: String,
        resource_id: String,
        collected_at: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logger(cli.color, cli.verbose);
    colored::control::set_override(cli.color);

    info!("Evidence Ingest Pipeline");
    info!("Loading configuration from: {}", cli.config.display());

    let config = if cli.config.exists() {
        Config::load(Some(cli.config.as_path())).context("Failed to load configuration")?
    } else {
        warn!(
            "Config file {} not found, using default configuration",
            cli.config.display()
        );
        Config::load(None).unwrap_or_else(|e| {
            warn!("Falling back to built-in defaults: {}", e);
            Config::default_config()
        })
    };

    match cli.command {
        Commands::Ingest {
            inputs,
            dry_run,
            batch_size,
            no_progress,
        } => {
            cmd_ingest(config, &inputs, dry_run, batch_size, no_progress, cli.color).await?;
        }
        Commands::Verify { create_schema } => {
            cmd_verify(&config, create_schema).await?;
        }
        Commands::Stats => {
            cmd_stats(&config).await?;
        }
        Commands::Reset { confirm } => {
            cmd_reset(&config, confirm).await?;
        }
        Commands::Fingerprint {
            control_id,
            resource_id,
            collected_at,
        } => {
            println!(
                "{}",
                compute_fingerprint(control_id.trim(), resource_id.trim(), collected_at.trim())
            );
        }
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Input {
    Stdin,
    File(PathBuf),
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::Stdin => write!(f, "<stdin>"),
            Input::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl Input {
    async fn open(&self) -> std::io::Result<Box<dyn Source>> {
        let source: Box<dyn Source> = match self {
            Input::Stdin => Box::new(AsyncReadSource::stdin()),
            Input::File(path) => Box::new(AsyncReadSource::open(path).await?),
        };
        Ok(source)
    }
}

/// Expand command line inputs into the ordered set of sources to ingest.
fn collect_inputs(args: &[String]) -> Result<Vec<Input>> {
    let mut inputs = BTreeSet::new();

    for arg in args {
        if arg == "-" {
            inputs.insert(Input::Stdin);
            continue;
        }

        let path = Path::new(arg);
        if path.is_dir() {
            for entry in WalkDir::new(path).follow_links(true).sort_by_file_name() {
                let entry = entry.with_context(|| format!("Failed to walk {}", path.display()))?;
                if entry.file_type().is_file() {
                    inputs.insert(Input::File(entry.into_path()));
                }
            }
        } else if path.is_file() {
            inputs.insert(Input::File(path.to_path_buf()));
        } else {
            bail!("Input {} does not exist", path.display());
        }
    }

    Ok(inputs.into_iter().collect())
}

/// Where committed evidence goes for this invocation.
enum SinkTarget {
    DryRun(Arc<CountingSink>),
    Lance(LanceDbClient),
}

impl SinkTarget {
    async fn sink_for(&self, run_id: Uuid) -> evidence_ingest::Result<Arc<dyn Sink>> {
        match self {
            SinkTarget::DryRun(sink) => Ok(sink.clone()),
            SinkTarget::Lance(client) => {
                Ok(Arc::new(LanceDbSink::open(client, run_id.to_string()).await?))
            }
        }
    }
}

async fn cmd_ingest(
    mut config: Config,
    args: &[String],
    dry_run: bool,
    batch_size: Option<usize>,
    no_progress: bool,
    colored: bool,
) -> Result<()> {
    if let Some(batch_size) = batch_size {
        config.pipeline.batch_size = batch_size;
    }
    config.validate().context("Invalid pipeline configuration")?;

    let inputs = collect_inputs(args)?;
    if inputs.is_empty() {
        warn!("No input files found");
        return Ok(());
    }
    info!("Found {} input(s) to ingest", inputs.len());

    let target = if dry_run {
        info!("Dry run: evidence is validated and counted, nothing is stored");
        SinkTarget::DryRun(Arc::new(CountingSink::new()))
    } else {
        let client = LanceDbClient::new(config.database.clone())
            .await
            .context("Failed to create LanceDB client")?;

        if !client.ping().await? {
            error!("Cannot connect to LanceDB");
            return Err(anyhow::anyhow!("Database connection failed"));
        }

        SchemaManager::new(&client)
            .initialize()
            .await
            .context("Failed to initialize schema")?;
        SinkTarget::Lance(client)
    };

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling ingestion");
            interrupt.cancel();
        }
    });

    let timer = OperationTimer::new("ingest");
    let show_bar = !no_progress && inputs.len() == 1;
    let total = inputs.len();

    let results = stream::iter(inputs.into_iter().map(|input| {
        let target = &target;
        let config = &config;
        let cancel = cancel.clone();

        async move {
            let result = ingest_one(&input, target, config, cancel, show_bar, colored).await;
            (input, result)
        }
    }))
    .buffer_unordered(config.pipeline.parallel_workers.max(1))
    .collect::<Vec<_>>()
    .await;

    let mut processed = 0;
    let mut failed = 0;

    for (step, (input, result)) in results.iter().enumerate() {
        let label = input.to_string();
        let line = match result {
            Ok(summary) => {
                processed += summary.total_processed;
                format_summary(&label, summary)
            }
            Err(failure) => {
                failed += 1;
                processed += failure.partial.total_processed;
                format_failure(&label, failure)
            }
        };
        println!("{}", format_step(step + 1, total, &line));
    }

    timer.finish_with_count(processed);

    if let SinkTarget::DryRun(sink) = &target {
        println!(
            "{}",
            format_info(&format!(
                "Dry run accepted {} records ({} invalid) in {} batches",
                sink.records(),
                sink.invalid(),
                sink.batches()
            ))
        );
    }

    if failed > 0 {
        bail!("{} of {} input(s) failed", failed, total);
    }

    println!("{}", format_success("Ingestion complete"));
    Ok(())
}

async fn ingest_one(
    input: &Input,
    target: &SinkTarget,
    config: &Config,
    cancel: CancellationToken,
    show_bar: bool,
    colored: bool,
) -> std::result::Result<RunSummary, RunFailure> {
    let run_id = Uuid::new_v4();

    let source = input
        .open()
        .await
        .map_err(|e| RunFailure::new(PipelineError::Source(e), RunSummary::default()))?;
    let sink = target
        .sink_for(run_id)
        .await
        .map_err(|e| RunFailure::new(e, RunSummary::default()))?;

    let observer: Arc<dyn ProgressObserver> = if show_bar {
        Arc::new(ProgressBarObserver::new(&input.to_string(), colored))
    } else {
        Arc::new(TracingObserver::new(input.to_string()))
    };

    Pipeline::new(source, sink, &config.pipeline, cancel)
        .map_err(|e| RunFailure::new(e, RunSummary::default()))?
        .with_run_id(run_id)
        .with_observer(observer)
        .run()
        .await
}

async fn cmd_verify(config: &Config, create_schema: bool) -> Result<()> {
    info!("Verifying database schema");

    let client = LanceDbClient::new(config.database.clone())
        .await
        .context("Failed to create LanceDB client")?;

    if !client.ping().await? {
        error!("Cannot connect to LanceDB");
        return Err(anyhow::anyhow!("Database connection failed"));
    }

    info!("Database connection successful");

    let schema_manager = SchemaManager::new(&client);

    if schema_manager.verify_schema().await? {
        info!("Schema verification passed");
    } else {
        warn!("Schema verification failed");

        if create_schema {
            info!("Creating schema");
            schema_manager
                .initialize()
                .await
                .context("Failed to create schema")?;
            info!("Schema created successfully");
        } else {
            info!("Use --create-schema to create the evidence table");
        }
    }

    Ok(())
}

async fn cmd_stats(config: &Config) -> Result<()> {
    info!("Gathering statistics");

    let client = LanceDbClient::new(config.database.clone())
        .await
        .context("Failed to create LanceDB client")?;

    if !client.ping().await? {
        error!("Cannot connect to LanceDB");
        return Err(anyhow::anyhow!("Database connection failed"));
    }

    let total = client.evidence_count().await?;
    let invalid = client.invalid_count().await?;
    info!("Table: {} at {}", client.table_name(), client.uri());
    info!("Total evidence: {}", total);
    info!("Invalid evidence: {}", invalid);

    Ok(())
}

async fn cmd_reset(config: &Config, confirm: bool) -> Result<()> {
    if !confirm {
        error!("This will delete all evidence. Use --confirm to proceed");
        return Ok(());
    }

    warn!("Resetting database - all evidence will be lost");

    let client = LanceDbClient::new(config.database.clone())
        .await
        .context("Failed to create LanceDB client")?;

    let schema_manager = SchemaManager::new(&client);
    schema_manager
        .drop_all_tables()
        .await
        .context("Failed to drop tables")?;

    info!("Evidence table dropped");

    schema_manager
        .initialize()
        .await
        .context("Failed to recreate schema")?;

    info!("Schema recreated - database reset complete");

    Ok(())
}
