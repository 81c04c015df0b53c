use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

/// Runtime configuration, assembled from environment variables with safe
/// fallbacks. Missing mail credentials switch the relay into its logging
/// fallback rather than failing startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub is_development: bool,
    pub base_url: String,
    pub content_dir: PathBuf,
    pub scheduling_enabled: bool,
    pub mail: MailConfig,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    /// Transactional email API key; `None` enables the dev logging fallback.
    pub api_key: Option<String>,
    pub api_url: String,
    pub from: String,
    pub to: String,
}

impl Config {
    pub fn from_env() -> Self {
        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let is_development = std::env::var("RUST_ENV")
            .map(|v| v == "development")
            .unwrap_or(false);

        let base_url = std::env::var("SITE_BASE_URL")
            .ok()
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("http://localhost:{port}"));

        let content_dir = std::env::var("CONTENT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("content"));

        let scheduling_enabled = std::env::var("SCHEDULING_ENABLED")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let mail = MailConfig {
            api_key: std::env::var("MAIL_API_KEY").ok().filter(|k| !k.is_empty()),
            api_url: std::env::var("MAIL_API_URL")
                .unwrap_or_else(|_| "https://api.resend.com/emails".to_string()),
            from: std::env::var("MAIL_FROM")
                .unwrap_or_else(|_| "site@colegiosaojose.com.br".to_string()),
            to: std::env::var("MAIL_TO")
                .unwrap_or_else(|_| "secretaria@colegiosaojose.com.br".to_string()),
        };

        Config {
            port,
            is_development,
            base_url,
            content_dir,
            scheduling_enabled,
            mail,
        }
    }
}

/// Site identity rendered into the layout chrome (header, footer, contact
/// links). Lives in `content/site.toml` next to the rest of the content.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteInfo {
    pub name: String,
    pub tagline: String,
    pub phone: String,
    pub whatsapp: String,
    pub address: String,
}

impl Default for SiteInfo {
    fn default() -> Self {
        SiteInfo {
            name: "Colégio São José".to_string(),
            tagline: "Educação com acolhimento, da educação infantil ao ensino fundamental."
                .to_string(),
            phone: "(11) 4002-8922".to_string(),
            whatsapp: "5511940028922".to_string(),
            address: "Rua das Acácias, 120 — Centro".to_string(),
        }
    }
}

impl SiteInfo {
    pub fn load(content_dir: &Path) -> Self {
        let path = content_dir.join("site.toml");
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => return SiteInfo::default(),
        };
        match toml::from_str(&raw) {
            Ok(info) => info,
            Err(e) => {
                warn!("failed to parse {}: {e}", path.display());
                SiteInfo::default()
            }
        }
    }

    /// WhatsApp deep link, the manual fallback channel offered whenever a
    /// form submission fails.
    pub fn whatsapp_link(&self) -> String {
        format!("https://wa.me/{}", self.whatsapp)
    }
}
