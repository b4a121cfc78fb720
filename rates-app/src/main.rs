//! # Rates Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the store adapter
//! - Build the providers, the cache tiers and the rates service
//! - Close history gaps and schedule the background jobs
//! - Start the HTTP server

mod config;

use std::sync::Arc;

use chrono::Utc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rates_hex::backfill::Backfill;
use rates_hex::cache::MemoryCache;
use rates_hex::inbound::HttpServer;
use rates_hex::providers::{EmiratesProvider, FixerProvider, ProviderRegistry, http_client};
use rates_hex::resolver::TieredResolver;
use rates_hex::schedule::Scheduler;
use rates_hex::RatesService;
use rates_repo::build_store;
use rates_types::domain::calendar;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,rates_app=debug,rates_hex=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::from_env()?;

    tracing::info!("Starting rates server on port {}", config.port);
    tracing::info!("Using database: {}", config.database_url);

    // Build store (handles connection and migration)
    let store = Arc::new(build_store(&config.database_url).await?);

    // One upstream client, shared by both providers.
    let client = http_client(config.http_timeout)?;
    let registry = Arc::new(ProviderRegistry::new(
        EmiratesProvider::new(
            config.emirates.descriptor.clone(),
            config.emirates.base_url.clone(),
            client.clone(),
            Arc::clone(&store),
        ),
        FixerProvider::new(
            config.fixer.descriptor.clone(),
            config.fixer.base_url.clone(),
            client,
        ),
    ));

    let memory = Arc::new(MemoryCache::new(config.memory_cache_ttl));
    let resolver = TieredResolver::new(Arc::clone(&memory), Arc::clone(&store));
    let service = RatesService::new(Arc::clone(&registry), resolver);

    // Close stored history gaps before taking traffic.
    let backfill = Arc::new(Backfill::new(
        Arc::clone(&store),
        registry,
        config.backfill_parallelism,
        config.backfill_max_delay_ms,
    ));
    backfill.run().await;

    // Background jobs: a backfill pass after each provider's daily
    // generation boundary, and a periodic cache sweep.
    let mut scheduler = Scheduler::new();
    for provider in [&config.emirates, &config.fixer] {
        let descriptor = &provider.descriptor;
        if !descriptor.historical_preload {
            continue;
        }
        let generation_time = descriptor.rates_generated_time;
        let location = descriptor.location;
        let job_backfill = Arc::clone(&backfill);
        scheduler.spawn_daily(
            descriptor.code.as_str(),
            move || calendar::duration_until_next(Utc::now(), generation_time, location),
            move || {
                let backfill = Arc::clone(&job_backfill);
                async move {
                    backfill.run().await;
                }
            },
        );
    }
    let sweep_memory = Arc::clone(&memory);
    scheduler.spawn_interval("memory-cache-sweep", config.memory_cache_cleanup, move || {
        let memory = Arc::clone(&sweep_memory);
        async move {
            memory.sweep();
        }
    });

    // Create and run the HTTP server
    let server = HttpServer::with_rate_limit(service, config.rate_limit_per_minute);
    let addr = format!("0.0.0.0:{}", config.port);

    server.run(&addr).await?;

    // Wind down background jobs before exit.
    scheduler.stop().await;
    Ok(())
}
