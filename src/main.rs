mod core;
mod features;
mod modules;
mod shared;

use crate::core::app::build_router;
use crate::core::config::{Config, SuggestionConfig};
use crate::core::database;
use crate::features::files::clients::{OpenAiCompatibleClient, TagSuggestionClient};
use crate::features::files::{FileService, TagSuggestionService};
use crate::modules::storage::LocalStorage;
use socket2::{Domain, Protocol, Socket, TcpKeepalive, Type};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(worker_threads))
}

async fn async_main(worker_threads: usize) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!("Tokio runtime started with {} worker threads", worker_threads);

    // Database
    let pool = database::create_pool(&config.database).await?;
    tracing::info!("Database connection established: {}", config.database.url);

    database::run_migrations(&pool).await?;
    tracing::info!("Database migrations applied");

    // Content storage
    let storage = Arc::new(LocalStorage::new(&config.storage).await?);

    let suggestion_service = Arc::new(suggestion_service(&config.suggestion)?);

    let file_service = Arc::new(FileService::new(
        pool,
        storage,
        suggestion_service,
        config.app.max_upload_size,
    ));

    let app = build_router(&config.app, &config.swagger, file_service);

    let addr = config.app.server_address();
    let socket_addr: SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address {}: {}", addr, e))?;

    let listener = bind_listener(socket_addr)?;
    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Suggestion engine, with the external service when an API key is set
fn suggestion_service(config: &SuggestionConfig) -> anyhow::Result<TagSuggestionService> {
    let client: Option<Arc<dyn TagSuggestionClient>> =
        match OpenAiCompatibleClient::from_config(config)? {
            Some(client) => {
                tracing::info!(
                    "External tag suggestions enabled: model={}, base_url={}",
                    config.model,
                    config.base_url
                );
                Some(Arc::new(client))
            }
            None => {
                tracing::info!("External tag suggestions disabled (SUGGESTION_API_KEY not set)");
                None
            }
        };

    Ok(TagSuggestionService::new(client))
}

/// TCP listener with address reuse, no-delay and keepalive set
fn bind_listener(socket_addr: SocketAddr) -> std::io::Result<tokio::net::TcpListener> {
    let socket = Socket::new(
        Domain::for_address(socket_addr),
        Type::STREAM,
        Some(Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nodelay(true)?;

    let keepalive = TcpKeepalive::new().with_time(Duration::from_secs(60));
    #[cfg(target_os = "linux")]
    let keepalive = keepalive
        .with_interval(Duration::from_secs(10))
        .with_retries(3);
    socket.set_tcp_keepalive(&keepalive)?;

    socket.set_nonblocking(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(1024)?;

    tokio::net::TcpListener::from_std(socket.into())
}
