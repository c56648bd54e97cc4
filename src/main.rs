use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use chainwatch_portfolio::aggregator::{Aggregator, RefreshOutcome};
use chainwatch_portfolio::api::{self, AppState};
use chainwatch_portfolio::balances::BalanceFetcher;
use chainwatch_portfolio::config::Config;
use chainwatch_portfolio::events::Diagnostics;
use chainwatch_portfolio::networks::registry::build_networks;
use chainwatch_portfolio::prices::{CoinGeckoClient, PriceCache, SymbolIds};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    // Initialize structured logging (set RUST_LOG=info for output)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    tracing::info!("ChainWatch Portfolio starting");

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path)?;
    tracing::info!(
        networks = config.networks.len(),
        wallets = config.refresh.addresses.len(),
        "Configuration loaded from {}",
        config_path
    );

    let networks = build_networks(&config.networks)?;
    let diagnostics = Diagnostics::default();

    let fetcher = BalanceFetcher::new(&networks, &config.rpc, diagnostics.clone())?
        .report_zero_balances(config.refresh.report_zero_token_balances);

    let price_provider = CoinGeckoClient::new(&config.prices)
        .map_err(|e| eyre::eyre!("Failed to build price client: {}", e))?;
    let prices = PriceCache::new(
        Arc::new(price_provider),
        SymbolIds::with_overrides(&config.prices.ids),
        config.prices.ttl(),
        diagnostics.clone(),
    );

    let aggregator = Arc::new(Aggregator::new(
        networks,
        Arc::new(fetcher),
        Arc::new(prices),
        diagnostics.clone(),
    ));
    tracing::info!("Aggregator initialized");

    // Create shutdown signal
    let shutdown = CancellationToken::new();
    let mut handles = Vec::new();

    // Surface absorbed failures at debug level for operators
    let mut events = diagnostics.subscribe();
    let events_shutdown = shutdown.clone();
    handles.push(tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = events_shutdown.cancelled() => break,
                event = events.recv() => match event {
                    Ok(event) => tracing::debug!(?event, "Diagnostic event"),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Diagnostics listener lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    }));

    // Spawn API server
    if config.api.enabled {
        let state = AppState {
            aggregator: aggregator.clone(),
            default_addresses: config.refresh.addresses.clone(),
        };
        let host = config.api.host.clone();
        let port = config.api.port;
        tokio::spawn(async move {
            if let Err(e) = api::serve(state, &host, port).await {
                tracing::error!(error = %e, "API server failed");
            }
        });
    }

    // Spawn the periodic refresh loop
    if let Some(interval_secs) = config.refresh.interval_secs.filter(|s| *s > 0) {
        let aggregator = aggregator.clone();
        let addresses = config.refresh.addresses.clone();
        let shutdown = shutdown.clone();

        handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                match aggregator.refresh(&addresses).await {
                    Ok(RefreshOutcome::Published(view)) => tracing::info!(
                        generation = view.generation,
                        grand_total_usd = view.grand_total_usd,
                        "Scheduled refresh complete"
                    ),
                    Ok(RefreshOutcome::Superseded { generation }) => {
                        tracing::debug!(generation, "Scheduled refresh superseded")
                    }
                    Err(e) => tracing::error!(error = %e, "Scheduled refresh failed"),
                }
            }
        }));
        tracing::info!(interval_secs, "Periodic refresh started");
    }

    tracing::info!("ChainWatch Portfolio running. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, stopping background tasks...");
    shutdown.cancel();

    // Wait for all tasks to finish
    for handle in handles {
        let _ = handle.await;
    }

    tracing::info!("ChainWatch Portfolio stopped gracefully");
    Ok(())
}
