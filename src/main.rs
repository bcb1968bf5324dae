use anyhow::Context;
use clap::Parser; // for cli
use daily_quota_gateway::config::Args;
use daily_quota_gateway::quota::QuotaService;
use daily_quota_gateway::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    // parse cli arguments (flags or QUOTA_* env vars)
    let args = Args::parse();
    let config = args.quota_config()?;

    // the one quota table for this process
    let state = Arc::new(AppState::new(QuotaService::new(
        config.daily_limit,
        config.timezone,
    )));

    if let Some(metrics_port) = args.metrics_port {
        let addr = format!("{}:{}", args.host, metrics_port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind metrics listener on {addr}"))?;
        info!("Metrics available on http://{}/metrics", addr);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, daily_quota_gateway::metrics_router()).await {
                tracing::error!(error = %e, "metrics listener stopped");
            }
        });
    }

    let app = daily_quota_gateway::router(state);

    let addr = args.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind quota listener on {addr}"))?;

    info!("Quota gateway running on http://{}", addr);
    info!(
        "Daily limit: {} calls per client, resetting at midnight {}",
        config.daily_limit, config.timezone
    );

    // ConnectInfo gives handlers the peer address used as the client identity
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("quota server failed")?;

    info!("Quota gateway stopped; usage counters discarded");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received SIGTERM signal"),
    }
}
