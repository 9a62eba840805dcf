use super::config::{default_config_path, GatehouseConfig};
use gatehouse::clock::SystemClock;
use gatehouse::http::{self, AppState};
use gatehouse::persistence::JsonFileStore;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Run the gate service
///
/// ## Configuration Loading
///
/// 1. `--config` flag if provided, otherwise the default config path
/// 2. Built-in defaults if that file does not exist
/// 3. `GATEHOUSE_*` environment overrides
/// 4. `--data-dir` and `--bind` flags
///
/// Both persisted documents are loaded once at startup; a missing or
/// unreadable document starts from defaults.
pub async fn execute(
    config_path: Option<String>,
    data_dir: Option<String>,
    bind: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);

    let mut config = GatehouseConfig::load_or_default(&config_path)?;
    config.apply_env()?;
    if let Some(dir) = data_dir {
        config.storage.data_dir = PathBuf::from(dir);
    }
    if let Some(bind) = bind {
        config.server.bind = bind;
    }

    init_tracing(&config.logging.level);
    info!(config = %config_path.display(), "starting gatehouse");

    if config.secrets.admin_pin.is_none() {
        warn!("admin_pin is not set; admin routes will refuse every request");
    }

    let bind_addr = config.server.bind_addr()?;
    let store = JsonFileStore::open(&config.storage.data_dir)?;
    info!(data_dir = %store.data_dir().display(), "using data directory");

    let state = AppState::new(
        Arc::new(store),
        Arc::new(SystemClock),
        config.heuristic.build(),
        config.secrets.clone(),
        config.server.trust_proxy,
    );

    let listener = TcpListener::bind(bind_addr).await?;
    info!(addr = %listener.local_addr()?, trust_proxy = config.server.trust_proxy, "listening");

    axum::serve(
        listener,
        http::router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("gatehouse stopped");
    Ok(())
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A subscriber may already be installed (tests); keep the existing one.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
