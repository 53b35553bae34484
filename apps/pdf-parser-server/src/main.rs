//! PDF Parser Server
//!
//! Converts base64 PDFs to markdown, JSON or HTML over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pdf_parser_server::config::Config;
use pdf_parser_server::extractor::MupdfExtractor;
use pdf_parser_server::ocr::OcrService;
use pdf_parser_server::routes;
use pdf_parser_server::state::AppState;

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_parser_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env();

    let mut runtime = tokio::runtime::Builder::new_multi_thread();
    runtime
        .enable_all()
        .max_blocking_threads(config.conversion.max_concurrent.max(1) * 2 + 8);
    if let Some(threads) = config.server.worker_threads {
        runtime.worker_threads(threads);
    }

    runtime
        .build()
        .context("failed to build tokio runtime")?
        .block_on(serve(config))
}

async fn serve(config: Config) -> anyhow::Result<()> {
    tracing::info!("Starting PDF Parser Server v{}", env!("CARGO_PKG_VERSION"));

    let ocr = OcrService::new(&config.ocr);
    let available = ocr.available_providers().await;
    if available.is_empty() {
        tracing::warn!("No OCR provider available; scanned pages will convert to empty text");
    } else {
        tracing::info!("OCR providers available: {:?}", available);
    }

    tracing::info!(
        max_concurrent = config.conversion.max_concurrent,
        queue_depth = config.conversion.queue_depth,
        timeout_secs = config.conversion.timeout_secs,
        "Conversion limits"
    );

    let state = AppState::new(config.clone(), Arc::new(MupdfExtractor::new(ocr)));
    let app = routes::router(state.clone());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.server.host, config.server.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("PDF Parser Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    state.shutdown();
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
