use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sao_jose_site::config::{Config, SiteInfo};
use sao_jose_site::live_reload;
use sao_jose_site::state::{AppState, RouterState};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        development = config.is_development,
        scheduling = config.scheduling_enabled,
        "starting server"
    );

    let site = SiteInfo::load(&config.content_dir);

    let (tx, _rx) = broadcast::channel(1);
    if config.is_development {
        info!("live reload enabled, watching the content directory");
        live_reload::start_content_watcher(tx.clone(), config.content_dir.clone());
    }

    let port = config.port;
    let state = RouterState {
        app_state: Arc::new(AppState::new(config, site)),
        broadcaster: tx,
    };

    let app = sao_jose_site::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "listening");
    let listener = TcpListener::bind(addr).await.expect("failed to bind address");
    axum::serve(listener, app).await.expect("server error");
}
