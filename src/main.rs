use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use ttf_scraper::catalog::{parse_source_ids, SourceCatalog};
use ttf_scraper::config::Config;
use ttf_scraper::geo::GeoResolver;
use ttf_scraper::infra::{NominatimGeocoder, ReqwestPageFetcher};
use ttf_scraper::logging;
use ttf_scraper::observability;
use ttf_scraper::pipeline::{IngestionOrchestrator, IngestionRequest};
use ttf_scraper::scheduler::WarmupScheduler;
use ttf_scraper::server::{self, AppState};
use ttf_scraper::storage::CacheStore;

#[derive(Parser)]
#[command(name = "ttf_scraper")]
#[command(about = "Tennis tournament listings with geocoded venues")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the tournament listing API
    Serve,
    /// Run one ingestion pass to fill the geocoding cache
    Warmup {
        /// First day, DD.MM.YYYY (default: today)
        #[arg(long)]
        date_from: Option<String>,
        /// Last day, DD.MM.YYYY (default: today + 14 days)
        #[arg(long)]
        date_to: Option<String>,
        /// Competition type, e.g. Herren+Einzel
        #[arg(long)]
        comp_type: Option<String>,
        /// Federations to include (comma-separated). Default: all
        #[arg(long)]
        federations: Option<String>,
    },
    /// Print geocoding cache statistics
    CacheStats,
    /// Remove old permanently failed geocoding entries
    Cleanup,
}

struct Components {
    store: Arc<CacheStore>,
    orchestrator: Arc<IngestionOrchestrator>,
}

fn build(config: &Config) -> Result<Components> {
    let store = Arc::new(CacheStore::open_or_memory(&config.cache.path, config.cache.memory)?);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http.timeout_secs))
        .user_agent(config.http.user_agent.as_str())
        .build()?;
    let fetcher = Arc::new(ReqwestPageFetcher::with_client(client.clone()));
    let geocoder = Arc::new(NominatimGeocoder::new(client, config.http.geocoder_url.clone()));

    let resolver = Arc::new(GeoResolver::new(store.clone(), geocoder));
    let orchestrator = Arc::new(IngestionOrchestrator::new(
        SourceCatalog::builtin(),
        fetcher,
        resolver,
    ));
    Ok(Components {
        store,
        orchestrator,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load()?;

    if let Some(port) = config.metrics.port {
        if let Err(e) = observability::init(SocketAddr::from(([0, 0, 0, 0], port))) {
            error!("Metrics exporter disabled: {}", e);
        }
    }

    let components = build(&config)?;

    match cli.command {
        Commands::Serve => {
            if config.scheduler.enabled {
                WarmupScheduler::new(components.orchestrator.clone(), &config.scheduler).start();
            }
            let addr: SocketAddr = config
                .server
                .bind
                .parse()
                .with_context(|| format!("invalid bind address '{}'", config.server.bind))?;
            let state = AppState {
                orchestrator: components.orchestrator,
                store: components.store,
            };
            server::start_server(state, addr).await?;
        }
        Commands::Warmup {
            date_from,
            date_to,
            comp_type,
            federations,
        } => {
            let request = IngestionRequest {
                date_from,
                date_to,
                comp_type,
                federations: federations.as_deref().map(parse_source_ids),
            };
            let total = components.orchestrator.warmup(&request).await;
            println!("Warmup finished: {} tournaments", total);
        }
        Commands::CacheStats => {
            let stats = components.store.statistics(chrono::Utc::now().timestamp())?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Cleanup => {
            let removed = components.store.cleanup_old_failed_entries()?;
            observability::cache::cleanup_removed(removed);
            info!("Removed {} old failed entries", removed);
            println!("Removed {} old failed geocoding entries", removed);
        }
    }
    Ok(())
}
