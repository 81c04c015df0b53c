use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;
use htmlescape::encode_minimal;

use crate::content;
use crate::error::SiteError;
use crate::state::AppState;

fn xml_response(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/xml; charset=utf-8")], body).into_response()
}

fn rfc2822(date: NaiveDate) -> Option<String> {
    date.and_hms_opt(12, 0, 0).map(|dt| dt.and_utc().to_rfc2822())
}

fn push_url(xml: &mut String, loc: &str, lastmod: Option<NaiveDate>) {
    xml.push_str("  <url>\n");
    xml.push_str(&format!("    <loc>{}</loc>\n", encode_minimal(loc)));
    if let Some(date) = lastmod {
        xml.push_str(&format!("    <lastmod>{}</lastmod>\n", date.format("%Y-%m-%d")));
    }
    xml.push_str("  </url>\n");
}

pub async fn sitemap(State(state): State<Arc<AppState>>) -> Result<Response, SiteError> {
    let base = &state.config.base_url;
    let pages = content::list_pages(&state.config.content_dir).await?;
    let posts = content::list_posts(&state.config.content_dir).await?;

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    push_url(&mut xml, &format!("{base}/"), None);
    push_url(&mut xml, &format!("{base}/noticias"), None);
    for (slug, _) in &pages {
        push_url(&mut xml, &format!("{base}/{slug}"), None);
    }
    for post in &posts {
        push_url(&mut xml, &format!("{base}/noticias/{}", post.slug), post.date);
    }
    xml.push_str("</urlset>\n");

    Ok(xml_response(xml))
}

fn enclosure_type(url: &str) -> &'static str {
    let lower = url.to_ascii_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".webp") {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

pub async fn rss(State(state): State<Arc<AppState>>) -> Result<Response, SiteError> {
    let base = &state.config.base_url;
    let site = &state.site;
    let posts = content::list_posts(&state.config.content_dir).await?;

    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\">\n<channel>\n");
    xml.push_str(&format!("  <title>{}</title>\n", encode_minimal(&site.name)));
    xml.push_str(&format!("  <link>{}/noticias</link>\n", encode_minimal(base)));
    xml.push_str(&format!(
        "  <description>{}</description>\n",
        encode_minimal(&site.tagline)
    ));
    xml.push_str("  <language>pt-br</language>\n");

    for post in &posts {
        let link = format!("{base}/noticias/{}", post.slug);
        xml.push_str("  <item>\n");
        xml.push_str(&format!("    <title>{}</title>\n", encode_minimal(&post.title)));
        xml.push_str(&format!("    <link>{}</link>\n", encode_minimal(&link)));
        xml.push_str(&format!(
            "    <guid isPermaLink=\"true\">{}</guid>\n",
            encode_minimal(&link)
        ));
        if let Some(pub_date) = post.date.and_then(rfc2822) {
            xml.push_str(&format!("    <pubDate>{pub_date}</pubDate>\n"));
        }
        xml.push_str(&format!(
            "    <description>{}</description>\n",
            encode_minimal(&post.excerpt)
        ));
        if let Some(cover) = &post.cover {
            let url = if cover.starts_with("http") {
                cover.clone()
            } else {
                format!("{base}{cover}")
            };
            xml.push_str(&format!(
                "    <enclosure url=\"{}\" length=\"0\" type=\"{}\"/>\n",
                encode_minimal(&url),
                enclosure_type(&url)
            ));
        }
        xml.push_str("  </item>\n");
    }

    xml.push_str("</channel>\n</rss>\n");
    Ok(xml_response(xml))
}

pub async fn robots(State(state): State<Arc<AppState>>) -> Response {
    let body = format!(
        "User-agent: *\nAllow: /\n\nSitemap: {}/sitemap.xml\n",
        state.config.base_url
    );
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enclosure_type_follows_the_extension() {
        assert_eq!(enclosure_type("/static/images/a.PNG"), "image/png");
        assert_eq!(enclosure_type("https://cdn.example.com/b.webp"), "image/webp");
        assert_eq!(enclosure_type("/static/images/c.jpg"), "image/jpeg");
    }

    #[test]
    fn url_entries_escape_xml_characters() {
        let mut xml = String::new();
        push_url(&mut xml, "https://example.com/busca?a=1&b=2", None);
        assert!(xml.contains("a=1&amp;b=2"));
        assert!(!xml.contains("a=1&b=2"));
    }
}
