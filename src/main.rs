//! Catalog Fetcher CLI application
//!
//! Discovers items on public catalog listings and downloads them into a local
//! library, tracking every job in a resumable SQLite ledger.

use std::error::Error;
use std::process;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use catalog_fetcher::cli::{
    handle_discover, handle_download, handle_fetch, handle_stats, Cli, Commands,
};
use catalog_fetcher::config::{AppConfig, FetcherConfig, FetcherConfigBuilder, RuntimeHint};
use catalog_fetcher::errors::{AppError, Result};

fn main() {
    let cli = Cli::parse_args();

    let result = load_config(&cli).and_then(|(app_config, config)| {
        init_logging(&cli, &app_config);
        let runtime = build_runtime(config.runtime)?;
        runtime.block_on(run(cli, Arc::new(config)))
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let mut source = e.source();
        while let Some(cause) = source {
            eprintln!("  Caused by: {}", cause);
            source = cause.source();
        }
        process::exit(1);
    }
}

/// Main application logic
async fn run(cli: Cli, config: Arc<FetcherConfig>) -> Result<()> {
    info!("Catalog Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Fetch(args) => {
            info!("Executing fetch command");
            handle_fetch(config, args).await
        }
        Commands::Discover(args) => {
            info!("Executing discover command");
            handle_discover(config, args).await
        }
        Commands::Download(args) => {
            info!("Executing download command");
            handle_download(config, args).await
        }
        Commands::Stats => handle_stats(config).await,
    }
}

/// Config file first, then command-line overrides, then validation
fn load_config(cli: &Cli) -> Result<(AppConfig, FetcherConfig)> {
    let app_config = AppConfig::load(cli.global.config.as_deref())?;
    let builder = FetcherConfigBuilder::from_config(app_config.fetcher.clone());
    let config = cli.global.apply(builder).build()?;
    Ok((app_config, config))
}

fn build_runtime(hint: RuntimeHint) -> Result<tokio::runtime::Runtime> {
    let mut builder = match hint {
        RuntimeHint::MultiThread => tokio::runtime::Builder::new_multi_thread(),
        RuntimeHint::MultiThreadWith { worker_threads } => {
            let mut builder = tokio::runtime::Builder::new_multi_thread();
            builder.worker_threads(worker_threads);
            builder
        }
        RuntimeHint::CurrentThread => tokio::runtime::Builder::new_current_thread(),
    };
    builder.enable_all().build().map_err(AppError::from)
}

/// Initialize logging from CLI verbosity, falling back to the config file level
fn init_logging(cli: &Cli, app_config: &AppConfig) {
    let level = cli
        .log_level()
        .map(|level| level.to_string().to_lowercase())
        .unwrap_or_else(|| app_config.logging.level.clone());

    let mut filter = EnvFilter::from_default_env();
    match format!("catalog_fetcher={}", level).parse() {
        Ok(directive) => filter = filter.add_directive(directive),
        Err(e) => eprintln!("Ignoring invalid log level '{}': {}", level, e),
    }

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
