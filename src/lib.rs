pub mod config;
pub mod content;
pub mod error;
pub mod feeds;
pub mod handlers;
pub mod live_reload;
pub mod mail;
pub mod markdown;
pub mod models;
pub mod render;
pub mod state;

use axum::routing::{get, get_service, post};
use axum::Router;
use tower_http::services::{ServeDir, ServeFile};

use crate::state::RouterState;

pub fn router(state: RouterState) -> Router {
    let content_dir = &state.app_state.config.content_dir;
    let static_dir = get_service(ServeDir::new(content_dir.join("static")));
    let favicon_ico = get_service(ServeFile::new(content_dir.join("static/favicon.ico")));
    let favicon_png = get_service(ServeFile::new(content_dir.join("static/favicon.png")));

    let mut app = Router::new()
        .route("/", get(handlers::homepage))
        .route("/noticias", get(handlers::news_index))
        .route("/noticias/{slug}", get(handlers::news_post))
        .route("/sitemap.xml", get(feeds::sitemap))
        .route("/rss.xml", get(feeds::rss))
        .route("/robots.txt", get(feeds::robots))
        .route("/api/contato", post(mail::contact))
        .route("/api/env", get(handlers::env_debug))
        .route("/ws", get(live_reload::ws_handler))
        .route("/{slug}", get(handlers::static_page));

    if state.app_state.config.scheduling_enabled {
        app = app.route("/api/agendamento", post(mail::scheduling));
    }

    app.nest_service("/static", static_dir)
        .route_service("/favicon.ico", favicon_ico)
        .route_service("/favicon.png", favicon_png)
        .fallback(handlers::fallback)
        .with_state(state)
}
