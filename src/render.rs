use htmlescape::encode_minimal;
use serde_json::json;

use crate::config::SiteInfo;

/// Injected before `</body>` in development so edits to `content/` refresh
/// open browser tabs (see `live_reload`).
pub const LIVE_RELOAD_SCRIPT: &str = r#"
<script>
    const socket = new WebSocket("ws://" + window.location.host + "/ws");
    socket.onmessage = (event) => {
        if (event.data === "reload") {
            window.location.reload();
        }
    };
</script>
"#;

#[derive(Debug, Clone)]
pub struct Breadcrumb {
    pub name: String,
    pub path: String,
}

impl Breadcrumb {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Breadcrumb {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Per-page metadata rendered into the layout head: document title,
/// description, canonical URL, Open Graph tags and JSON-LD breadcrumbs.
#[derive(Debug, Clone)]
pub struct PageMeta {
    pub title: String,
    pub description: String,
    pub path: String,
    pub cover: Option<String>,
    pub og_type: &'static str,
    pub breadcrumbs: Vec<Breadcrumb>,
}

impl PageMeta {
    pub fn page(title: impl Into<String>, description: impl Into<String>, path: impl Into<String>) -> Self {
        PageMeta {
            title: title.into(),
            description: description.into(),
            path: path.into(),
            cover: None,
            og_type: "website",
            breadcrumbs: Vec::new(),
        }
    }

    pub fn article(title: impl Into<String>, description: impl Into<String>, path: impl Into<String>) -> Self {
        PageMeta {
            og_type: "article",
            ..PageMeta::page(title, description, path)
        }
    }
}

fn absolute_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else {
        format!("{base_url}{path}")
    }
}

fn og_tags(base_url: &str, meta: &PageMeta) -> String {
    let mut tags = String::new();
    let url = absolute_url(base_url, &meta.path);
    tags.push_str(&format!(
        "<meta property=\"og:title\" content=\"{}\">\n",
        encode_minimal(&meta.title)
    ));
    tags.push_str(&format!(
        "    <meta property=\"og:description\" content=\"{}\">\n",
        encode_minimal(&meta.description)
    ));
    tags.push_str(&format!(
        "    <meta property=\"og:type\" content=\"{}\">\n",
        meta.og_type
    ));
    tags.push_str(&format!(
        "    <meta property=\"og:url\" content=\"{}\">",
        encode_minimal(&url)
    ));
    if let Some(cover) = &meta.cover {
        tags.push_str(&format!(
            "\n    <meta property=\"og:image\" content=\"{}\">",
            encode_minimal(&absolute_url(base_url, cover))
        ));
    }
    tags
}

fn breadcrumb_jsonld(base_url: &str, crumbs: &[Breadcrumb]) -> String {
    if crumbs.is_empty() {
        return String::new();
    }
    let items: Vec<_> = crumbs
        .iter()
        .enumerate()
        .map(|(i, crumb)| {
            json!({
                "@type": "ListItem",
                "position": i + 1,
                "name": crumb.name,
                "item": absolute_url(base_url, &crumb.path),
            })
        })
        .collect();
    let graph = json!({
        "@context": "https://schema.org",
        "@type": "BreadcrumbList",
        "itemListElement": items,
    });
    format!("<script type=\"application/ld+json\">{graph}</script>")
}

/// Substitutes page content and metadata into the layout chrome.
///
/// `content` is trusted HTML from the content directory; everything that
/// originates in metadata strings is entity-encoded before insertion.
pub fn render_page(
    layout: &str,
    site: &SiteInfo,
    base_url: &str,
    meta: &PageMeta,
    content: &str,
    is_development: bool,
) -> String {
    let canonical = absolute_url(base_url, &meta.path);

    let mut page = layout
        .replace("{{ title }}", &encode_minimal(&meta.title))
        .replace("{{ description }}", &encode_minimal(&meta.description))
        .replace("{{ canonical }}", &encode_minimal(&canonical))
        .replace("{{ og_tags }}", &og_tags(base_url, meta))
        .replace("{{ jsonld }}", &breadcrumb_jsonld(base_url, &meta.breadcrumbs))
        .replace("{{ site_name }}", &encode_minimal(&site.name))
        .replace("{{ site_tagline }}", &encode_minimal(&site.tagline))
        .replace("{{ site_phone }}", &encode_minimal(&site.phone))
        .replace("{{ site_address }}", &encode_minimal(&site.address))
        .replace("{{ whatsapp_link }}", &site.whatsapp_link())
        .replace("{{ content }}", content);

    if is_development {
        page = page.replace("</body>", &format!("{LIVE_RELOAD_SCRIPT}</body>"));
    }

    page
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> &'static str {
        "<html><head><title>{{ title }}</title>{{ og_tags }}{{ jsonld }}</head>\
         <body><header>{{ site_name }}</header>{{ content }}</body></html>"
    }

    #[test]
    fn metadata_is_entity_encoded() {
        let meta = PageMeta::page("Pais & Mestres", "Reunião \"aberta\"", "/eventos");
        let page = render_page(layout(), &SiteInfo::default(), "https://example.com", &meta, "<p>ok</p>", false);
        assert!(page.contains("Pais &amp; Mestres"));
        assert!(page.contains("<p>ok</p>"));
        assert!(!page.contains("Reunião \"aberta\""));
    }

    #[test]
    fn breadcrumbs_emit_jsonld_with_absolute_urls() {
        let mut meta = PageMeta::article("Notícia", "d", "/noticias/x");
        meta.breadcrumbs = vec![
            Breadcrumb::new("Início", "/"),
            Breadcrumb::new("Notícias", "/noticias"),
        ];
        let page = render_page(layout(), &SiteInfo::default(), "https://example.com", &meta, "", false);
        assert!(page.contains("application/ld+json"));
        assert!(page.contains("BreadcrumbList"));
        assert!(page.contains("https://example.com/noticias"));
    }

    #[test]
    fn dev_mode_injects_the_reload_script() {
        let meta = PageMeta::page("t", "d", "/");
        let dev = render_page(layout(), &SiteInfo::default(), "http://localhost:8080", &meta, "", true);
        let prod = render_page(layout(), &SiteInfo::default(), "http://localhost:8080", &meta, "", false);
        assert!(dev.contains("new WebSocket"));
        assert!(!prod.contains("new WebSocket"));
    }
}
