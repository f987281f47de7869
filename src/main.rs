//! budget-stats - Budget proposal statistics service
//!
//! Exit codes:
//!   0 - Success
//!   1 - Invalid arguments, configuration or runtime error

use anyhow::{Context, Result};
use budget_stats::cli::{Args, Command, OutputFormat};
use budget_stats::config::{Config, StorageBackend, DEFAULT_CONFIG_FILE};
use budget_stats::publish::{GcsAuth, GcsStore, LocalStore, ObjectNaming, Publisher};
use budget_stats::report::{self, ReportMode};
use budget_stats::server::{self, AppState};
use budget_stats::service::StatisticsService;
use budget_stats::source::{
    ApiAuth, GraphQlSource, ProposalSource, RetryPolicy, SnapshotSource,
};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if let Command::InitConfig = args.command {
        return handle_init_config();
    }

    init_logging(&args)?;

    info!("budget-stats v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Command failed: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle init-config: generate a default budget-stats.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("Edit it to set the GraphQL endpoint, credentials and storage backend.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// `RUST_LOG` wins over `--verbose`/`--quiet` when set. Logs go to stderr
/// so that `generate` can write reports to stdout.
fn init_logging(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level().to_string()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

async fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.apply_env()?;
    config.merge_with_args(&args);
    config.validate()?;

    let source = build_source(&config, args.snapshot().map(PathBuf::as_path))?;
    let publisher = build_publisher(&config)?;
    let service = StatisticsService::new(source, publisher);

    match args.command {
        Command::Serve { .. } => {
            let listen_addr: SocketAddr = config
                .server
                .listen_addr
                .parse()
                .with_context(|| format!("Invalid listen address: {}", config.server.listen_addr))?;
            let state = Arc::new(AppState { service });
            server::serve(state, listen_addr).await
        }
        Command::Generate {
            mode,
            year,
            format,
            output,
            ..
        } => handle_generate(&service, mode, year, format, output.as_deref()).await,
        Command::Publish {
            mode,
            year,
            timestamped,
            ..
        } => {
            let naming = if timestamped {
                ObjectNaming::Timestamped
            } else {
                ObjectNaming::Latest
            };
            let receipt = service.publish(mode, year, naming).await?;
            println!("{}", serde_json::to_string_pretty(&receipt)?);
            Ok(())
        }
        Command::InitConfig => handle_init_config(),
    }
}

async fn handle_generate(
    service: &StatisticsService,
    mode: ReportMode,
    year: Option<i32>,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let reports = service.report(mode, year).await?;

    let content = match format {
        OutputFormat::Json => report::generate_json_report(&reports)?,
        OutputFormat::Markdown => report::generate_markdown_report(&reports, mode),
    };

    match output {
        Some(path) => {
            report::write_report(&content, path)?;
            info!(
                "Wrote {} statistics for {} years to {}",
                mode,
                reports.len(),
                path.display()
            );
        }
        None => println!("{}", content),
    }

    Ok(())
}

/// Pick the snapshot file when given, the GraphQL API otherwise.
fn build_source(config: &Config, snapshot: Option<&Path>) -> Result<Arc<dyn ProposalSource>> {
    if let Some(path) = snapshot {
        info!("Reading upstream data from snapshot: {}", path.display());
        return Ok(Arc::new(SnapshotSource::load(path)?));
    }

    let auth = ApiAuth::from_parts(
        config.api.bearer_token.as_deref(),
        config.api.api_key.as_deref(),
    );
    if auth.is_none() {
        warn!("No API credentials configured; sending unauthenticated requests");
    }

    let retry = RetryPolicy::new(
        config.api.max_retries,
        Duration::from_millis(config.api.retry_base_delay_ms),
    );

    let source = GraphQlSource::new(
        config.api.endpoint.clone(),
        auth,
        config.api.timeout_seconds,
        retry,
    )?;
    Ok(Arc::new(source))
}

fn build_publisher(config: &Config) -> Result<Option<Arc<Publisher>>> {
    let storage = &config.storage;

    let publisher = match storage.backend {
        StorageBackend::None => {
            debug!("No storage backend configured, publishing disabled");
            None
        }
        StorageBackend::Local => {
            info!("Publishing to local directory: {}", storage.local_dir);
            let store = LocalStore::new(&storage.local_dir);
            Some(Publisher::new(Arc::new(store), storage.output_prefix.clone()))
        }
        StorageBackend::Gcs => {
            let bucket = storage
                .bucket
                .clone()
                .context("storage.bucket is required for the gcs backend")?;
            info!("Publishing to Cloud Storage bucket: {}", bucket);
            let auth = GcsAuth::from_settings(
                storage.access_token.as_deref(),
                storage.credentials_path.as_deref().map(Path::new),
                config.api.timeout_seconds,
            )?;
            let store = GcsStore::new(
                bucket,
                auth,
                storage.gcs_base_url.clone(),
                config.api.timeout_seconds,
            )?;
            Some(Publisher::new(Arc::new(store), storage.output_prefix.clone()))
        }
    };

    Ok(publisher.map(Arc::new))
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
