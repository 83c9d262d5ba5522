use shared::config::CacheSettings;
use shared::TtlSecs;
use std::sync::Arc;
use storage_engine::EngineFactory;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use trestle::CacheService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables before the filter reads RUST_LOG
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Trestle cache service");
    match dotenv {
        Ok(path) => info!("Loaded environment variables from {}", path.display()),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    let settings = CacheSettings::from_env();

    // The one cache instance for this process; hand clones of the Arc to whatever needs it
    let cache = Arc::new(CacheService::from_settings(&settings, &EngineFactory::new()).await);

    info!(
        backend = cache.backend_name(),
        distributed = cache.is_distributed(),
        "Cache service ready"
    );

    probe(&cache).await;

    shutdown_signal().await;

    cache.shutdown().await;
    info!("Trestle cache service stopped");
    Ok(())
}

/// Round-trip a throwaway key so a misconfigured backend shows up in the logs at startup
async fn probe(cache: &CacheService) {
    let key = CacheService::generate_key([
        "trestle".to_string(),
        "probe".to_string(),
        std::process::id().to_string(),
    ]);

    let stored = cache.set(&key, &"ok", Some(TtlSecs(30))).await;
    let read_back = cache.get::<String>(&key).await;
    let removed = cache.delete(&key).await;
    let healthy = cache.health_check().await;

    if stored && read_back.as_deref() == Some("ok") && removed && healthy {
        info!(key = %key, "Cache probe succeeded");
    } else {
        warn!(
            key = %key,
            stored,
            read_back = read_back.is_some(),
            removed,
            healthy,
            "Cache probe failed, requests will fall through to the database"
        );
    }
}

// Graceful shutdown handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }

    info!("Shutting down gracefully...");
}
