use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::{Config, SiteInfo};
use crate::mail::Mailer;

pub type ReloadBroadcaster = broadcast::Sender<()>;

pub struct AppState {
    pub config: Config,
    pub site: SiteInfo,
    pub mailer: Mailer,
}

impl AppState {
    pub fn new(config: Config, site: SiteInfo) -> Self {
        let mailer = Mailer::new(config.mail.clone());
        AppState {
            config,
            site,
            mailer,
        }
    }
}

#[derive(Clone)]
pub struct RouterState {
    pub app_state: Arc<AppState>,
    pub broadcaster: ReloadBroadcaster,
}

impl axum::extract::FromRef<RouterState> for Arc<AppState> {
    fn from_ref(state: &RouterState) -> Self {
        state.app_state.clone()
    }
}

impl axum::extract::FromRef<RouterState> for ReloadBroadcaster {
    fn from_ref(state: &RouterState) -> Self {
        state.broadcaster.clone()
    }
}
