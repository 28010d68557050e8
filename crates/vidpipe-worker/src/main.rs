//! Video processing worker binary.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vidpipe_queue::MessageQueue;
use vidpipe_worker::{ProcessingContext, WorkerConfig, WorkerExecutor};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::from_default_env().add_directive("vidpipe=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting vidpipe-worker");

    // Prometheus exposition over its own HTTP listener
    let metrics_port: u16 = std::env::var("METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(9090);
    if let Err(e) = PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], metrics_port))
        .install()
    {
        error!("Failed to install Prometheus exporter: {}", e);
        std::process::exit(1);
    }
    info!("Prometheus metrics listening on port {}", metrics_port);

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let queue = match MessageQueue::from_env() {
        Ok(queue) => queue,
        Err(e) => {
            error!("Failed to create message queue: {}", e);
            std::process::exit(1);
        }
    };

    let ctx = match ProcessingContext::from_env(config.clone()).await {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Failed to create processing context: {}", e);
            std::process::exit(1);
        }
    };

    let executor = Arc::new(WorkerExecutor::new(config, queue, ctx));

    let signal_executor = Arc::clone(&executor);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        signal_executor.shutdown();
    });

    if let Err(e) = executor.run().await {
        error!("Executor error: {}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}
