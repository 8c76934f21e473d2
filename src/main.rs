use anyhow::Result;
use clap::{Parser, Subcommand};
use swiss_tracker::tracker_config::TrackerConfig;
use tracing::error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(
    name = "swiss-tracker",
    version = swiss_tracker::actions::version(),
    about = "Poll OpenSky for aircraft over Switzerland and serve the latest snapshot"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Poll the upstream API on a fixed cadence and store each snapshot
    Ingest {
        /// Stop after this many cycles instead of running forever
        #[arg(long)]
        cycles: Option<u64>,
        /// Expose Prometheus metrics on this port
        #[arg(long)]
        metrics_port: Option<u16>,
    },
    /// Serve the query API
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        interface: String,
        #[arg(long, default_value_t = 8000)]
        port: u16,
        /// Also run the ingestion scheduler in this process
        #[arg(long, default_value_t = false)]
        with_ingest: bool,
    },
    /// Run one ingestion cycle now and print the outcome
    Refresh,
    /// Print KPIs and the latest flights from a running API server
    Dashboard {
        /// Ask the API to refresh before reading
        #[arg(long, default_value_t = false)]
        refresh: bool,
    },
}

fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok().filter(|d| !d.is_empty())?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: Some(swiss_tracker::actions::version().into()),
            environment: std::env::var("TRACKER_ENV").ok().map(Into::into),
            attach_stacktrace: true,
            ..Default::default()
        },
    )))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Guard must outlive the runtime so buffered events are flushed on exit
    let _sentry = init_sentry();
    init_tracing();

    let cli = Cli::parse();
    let config = TrackerConfig::from_env()?;

    let result = match cli.command {
        Commands::Ingest {
            cycles,
            metrics_port,
        } => commands::handle_ingest(config, cycles, metrics_port).await,
        Commands::Serve {
            interface,
            port,
            with_ingest,
        } => commands::handle_serve(config, interface, port, with_ingest).await,
        Commands::Refresh => commands::handle_refresh(config).await,
        Commands::Dashboard { refresh } => commands::handle_dashboard(config, refresh).await,
    };

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}
