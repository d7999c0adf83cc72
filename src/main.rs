use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use sensor_ingest::app::ingest_use_case::{AnalyticsStatus, IngestUseCase};
use sensor_ingest::app::ports::{AnalyticsSinkPort, ArchiveSinkPort, ReadingsQueryPort};
use sensor_ingest::app::simulate_use_case::{parse_regions, SimulateUseCase, SimulatorConfig};
use sensor_ingest::config::{token_from_env, AnalyticsConfig, ArchiveConfig, Config};
use sensor_ingest::constants::DEFAULT_REGIONS;
use sensor_ingest::infra::{
    FsArchiveStore, HttpAnalyticsSink, HttpArchiveStore, HttpPushPublisher, SqliteAnalyticsStore,
};
use sensor_ingest::server::{create_server, start_server, AppState};
use sensor_ingest::{logging, metrics};

#[derive(Parser)]
#[command(name = "sensor_ingest")]
#[command(about = "Field sensor telemetry ingestion")]
#[command(version)]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Accept push deliveries over HTTP
    Serve,
    /// Run the pipeline once on a push-request JSON file ("-" for stdin)
    Ingest {
        #[arg(long)]
        file: String,
    },
    /// Create the SQLite analytics table if it does not exist
    InitStore,
    /// Publish fake sensor readings to a push endpoint
    Simulate {
        /// Push endpoint URL, e.g. http://localhost:8080/pubsub/push
        #[arg(long)]
        endpoint: String,
        #[arg(long, default_value_t = 5)]
        sensors: usize,
        /// Seconds between rounds
        #[arg(long, default_value_t = 5.0)]
        interval: f64,
        /// Comma-separated region list
        #[arg(long, default_value = DEFAULT_REGIONS)]
        regions: String,
        /// Publish a single round and exit
        #[arg(long)]
        once: bool,
    },
}

/// Stores selected by the config file
struct Stores {
    analytics: Arc<dyn AnalyticsSinkPort>,
    archive: Arc<dyn ArchiveSinkPort>,
    readings: Option<Arc<dyn ReadingsQueryPort>>,
}

fn build_stores(config: &Config, client: &reqwest::Client) -> anyhow::Result<Stores> {
    let (analytics, readings): (Arc<dyn AnalyticsSinkPort>, Option<Arc<dyn ReadingsQueryPort>>) =
        match &config.analytics {
            AnalyticsConfig::Sqlite { path, table } => {
                let store = Arc::new(SqliteAnalyticsStore::open(path, table)?);
                let readings: Arc<dyn ReadingsQueryPort> = store.clone();
                let analytics: Arc<dyn AnalyticsSinkPort> = store;
                (analytics, Some(readings))
            }
            AnalyticsConfig::Http { endpoint, token_env } => {
                let token = token_from_env(token_env.as_deref())?;
                let analytics: Arc<dyn AnalyticsSinkPort> =
                    Arc::new(HttpAnalyticsSink::new(client.clone(), endpoint.as_str(), token));
                (analytics, None)
            }
        };

    let archive: Arc<dyn ArchiveSinkPort> = match &config.archive {
        ArchiveConfig::Fs { root } => Arc::new(FsArchiveStore::new(root.clone())),
        ArchiveConfig::Http {
            base_url,
            bucket,
            token_env,
        } => {
            let token = token_from_env(token_env.as_deref())?;
            Arc::new(HttpArchiveStore::new(
                client.clone(),
                base_url.as_str(),
                bucket.as_str(),
                token,
            ))
        }
    };

    Ok(Stores {
        analytics,
        archive,
        readings,
    })
}

/// Cancelled on Ctrl-C or SIGTERM
fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown signal received");
        trigger.cancel();
    });
    token
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            error!("Cannot listen for SIGTERM: {}", e);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn read_input(file: &str) -> anyhow::Result<Vec<u8>> {
    if file == "-" {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read(file).with_context(|| format!("reading {}", file))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    if let Some(addr) = config.metrics.listen_addr {
        metrics::init_metrics(addr);
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    match cli.command {
        Commands::Serve => {
            let stores = build_stores(&config, &client)?;
            let ingest = Arc::new(IngestUseCase::new(stores.analytics, stores.archive));
            let app = create_server(AppState {
                ingest,
                readings: stores.readings,
            });
            let shutdown = shutdown_token();
            start_server(app, config.server.bind_addr, async move { shutdown.cancelled().await }).await?;
        }
        Commands::Ingest { file } => {
            let stores = build_stores(&config, &client)?;
            let ingest = IngestUseCase::new(stores.analytics, stores.archive);
            let body = read_input(&file)?;
            let report = ingest.handle_push(&body).await?;
            info!(
                sensor_id = %report.sensor_id,
                anomaly = report.anomaly,
                archive_key = %report.archive_key,
                rejected = matches!(report.analytics, AnalyticsStatus::Rejected(_)),
                "Envelope acknowledged"
            );
        }
        Commands::InitStore => match &config.analytics {
            AnalyticsConfig::Sqlite { path, table } => {
                let store = SqliteAnalyticsStore::open(path, table)?;
                store.provision()?;
                info!("Analytics table {} ready in {}", store.table(), path.display());
            }
            AnalyticsConfig::Http { .. } => {
                anyhow::bail!("init-store only provisions the sqlite analytics backend");
            }
        },
        Commands::Simulate {
            endpoint,
            sensors,
            interval,
            regions,
            once,
        } => {
            let interval = Duration::try_from_secs_f64(interval)
                .map_err(|_| anyhow::anyhow!("--interval must be a non-negative number of seconds"))?;
            let publisher = HttpPushPublisher::new(client.clone(), endpoint.as_str());
            let simulator = SimulateUseCase::new(Box::new(publisher));
            info!("Publishing {} sensors to {}", sensors, endpoint);
            simulator
                .run(
                    shutdown_token(),
                    SimulatorConfig {
                        sensors,
                        interval,
                        regions: parse_regions(&regions),
                        once,
                    },
                )
                .await?;
        }
    }
    Ok(())
}
