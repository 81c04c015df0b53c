use std::io;
use std::path::Path as FsPath;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use htmlescape::encode_minimal;
use tokio::fs;

use crate::content;
use crate::error::SiteError;
use crate::models::PostSummary;
use crate::render::{render_page, Breadcrumb, PageMeta};
use crate::state::AppState;

/// Posts shown in the home page news strip.
const HOME_TEASER_POSTS: usize = 3;

async fn read_layout(content_dir: &FsPath) -> io::Result<String> {
    fs::read_to_string(content_dir.join("layout.html")).await
}

fn format_date(date: chrono::NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

fn post_card(post: &PostSummary) -> String {
    let mut card = String::from("<article class=\"card\">\n");
    if let Some(cover) = &post.cover {
        card.push_str(&format!(
            "  <a href=\"/noticias/{slug}\"><img src=\"{src}\" alt=\"{alt}\" loading=\"lazy\"></a>\n",
            slug = post.slug,
            src = encode_minimal(cover),
            alt = encode_minimal(&post.title)
        ));
    }
    if let Some(date) = post.date {
        card.push_str(&format!("  <time>{}</time>\n", format_date(date)));
    }
    card.push_str(&format!(
        "  <h3><a href=\"/noticias/{}\">{}</a></h3>\n",
        post.slug,
        encode_minimal(&post.title)
    ));
    card.push_str(&format!("  <p>{}</p>\n", encode_minimal(&post.excerpt)));
    card.push_str("</article>\n");
    card
}

pub async fn homepage(State(state): State<Arc<AppState>>) -> Result<Response, SiteError> {
    let content_dir = &state.config.content_dir;
    let layout = read_layout(content_dir).await?;
    let home = fs::read_to_string(content_dir.join("home.html")).await?;

    let posts = content::list_posts(content_dir).await?;
    let teaser: String = posts
        .iter()
        .take(HOME_TEASER_POSTS)
        .map(post_card)
        .collect();
    let body = home.replace("{{ news_teaser }}", &teaser);

    let meta = PageMeta::page(state.site.name.clone(), state.site.tagline.clone(), "/");
    let page = render_page(
        &layout,
        &state.site,
        &state.config.base_url,
        &meta,
        &body,
        state.config.is_development,
    );
    Ok(Html(page).into_response())
}

pub async fn news_index(State(state): State<Arc<AppState>>) -> Result<Response, SiteError> {
    let content_dir = &state.config.content_dir;
    let layout = read_layout(content_dir).await?;
    let posts = content::list_posts(content_dir).await?;

    let mut body = String::from("<section class=\"news\">\n<h1>Notícias</h1>\n");
    if posts.is_empty() {
        body.push_str("<p>Nenhuma notícia publicada até o momento.</p>\n");
    } else {
        body.push_str("<div class=\"card-grid\">\n");
        for post in &posts {
            body.push_str(&post_card(post));
        }
        body.push_str("</div>\n");
    }
    body.push_str("</section>\n");

    let mut meta = PageMeta::page(
        format!("Notícias — {}", state.site.name),
        "Comunicados, eventos e novidades do colégio.",
        "/noticias",
    );
    meta.breadcrumbs = vec![
        Breadcrumb::new("Início", "/"),
        Breadcrumb::new("Notícias", "/noticias"),
    ];

    let page = render_page(
        &layout,
        &state.site,
        &state.config.base_url,
        &meta,
        &body,
        state.config.is_development,
    );
    Ok(Html(page).into_response())
}

pub async fn news_post(
    Path(slug): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, SiteError> {
    let content_dir = &state.config.content_dir;
    let Some(post) = content::load_post(content_dir, &slug).await? else {
        return not_found(&state, &format!("/noticias/{slug}")).await;
    };

    let layout = read_layout(content_dir).await?;

    let mut body = String::from("<article class=\"post\">\n");
    body.push_str(&format!("<h1>{}</h1>\n", encode_minimal(&post.title)));
    if let Some(date) = post.date {
        body.push_str(&format!(
            "<p class=\"post-date\"><time>{}</time></p>\n",
            format_date(date)
        ));
    }
    if let Some(cover) = &post.cover {
        body.push_str(&format!(
            "<img class=\"post-cover\" src=\"{}\" alt=\"{}\">\n",
            encode_minimal(cover),
            encode_minimal(&post.title)
        ));
    }
    body.push_str(&post.html);
    body.push_str("</article>\n");

    let mut meta = PageMeta::article(
        format!("{} — {}", post.title, state.site.name),
        post.excerpt.clone(),
        format!("/noticias/{}", post.slug),
    );
    meta.cover = post.cover.clone();
    meta.breadcrumbs = vec![
        Breadcrumb::new("Início", "/"),
        Breadcrumb::new("Notícias", "/noticias"),
        Breadcrumb::new(post.title.clone(), format!("/noticias/{}", post.slug)),
    ];

    let page = render_page(
        &layout,
        &state.site,
        &state.config.base_url,
        &meta,
        &body,
        state.config.is_development,
    );
    Ok(Html(page).into_response())
}

pub async fn static_page(
    Path(slug): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, SiteError> {
    let content_dir = &state.config.content_dir;
    let Some(page_content) = content::load_page(content_dir, &slug).await? else {
        return not_found(&state, &format!("/{slug}")).await;
    };

    let layout = read_layout(content_dir).await?;

    let mut body = String::from("<section class=\"page\">\n");
    body.push_str(&format!("<h1>{}</h1>\n", encode_minimal(&page_content.title)));
    body.push_str(&page_content.html);
    body.push_str("</section>\n");

    let mut meta = PageMeta::page(
        format!("{} — {}", page_content.title, state.site.name),
        page_content
            .description
            .clone()
            .unwrap_or_else(|| state.site.tagline.clone()),
        format!("/{}", page_content.slug),
    );
    meta.cover = page_content.cover.clone();
    meta.breadcrumbs = vec![
        Breadcrumb::new("Início", "/"),
        Breadcrumb::new(page_content.title.clone(), format!("/{}", page_content.slug)),
    ];

    let page = render_page(
        &layout,
        &state.site,
        &state.config.base_url,
        &meta,
        &body,
        state.config.is_development,
    );
    Ok(Html(page).into_response())
}

pub async fn fallback(
    uri: Uri,
    State(state): State<Arc<AppState>>,
) -> Result<Response, SiteError> {
    not_found(&state, uri.path()).await
}

async fn not_found(state: &AppState, path: &str) -> Result<Response, SiteError> {
    let content_dir = &state.config.content_dir;
    let layout = read_layout(content_dir).await?;
    let template = fs::read_to_string(content_dir.join("not_found.html")).await?;
    let body = template.replace("{{ path }}", &encode_minimal(path));

    let meta = PageMeta::page(
        format!("Página não encontrada — {}", state.site.name),
        "O endereço solicitado não existe.",
        path.to_string(),
    );
    let page = render_page(
        &layout,
        &state.site,
        &state.config.base_url,
        &meta,
        &body,
        state.config.is_development,
    );
    Ok((StatusCode::NOT_FOUND, Html(page)).into_response())
}

/// Masked configuration introspection for debugging deployments. Secrets are
/// reported only as present/absent.
pub async fn env_debug(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let config = &state.config;
    Json(serde_json::json!({
        "development": config.is_development,
        "base_url": config.base_url,
        "content_dir": config.content_dir.display().to_string(),
        "scheduling_enabled": config.scheduling_enabled,
        "mail": {
            "api_key_set": config.mail.api_key.is_some(),
            "api_url": config.mail.api_url,
            "from": config.mail.from,
            "to": config.mail.to,
        },
    }))
}
