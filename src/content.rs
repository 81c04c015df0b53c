use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate};
use gray_matter::{engine::YAML, Matter};
use scraper::Html;
use tokio::fs;
use tracing::warn;

use crate::markdown::render_markdown_to_html;
use crate::models::{FrontMatter, Page, Post, PostSummary};

/// Prefix applied to relative `cover` paths in frontmatter.
const COVER_PREFIX: &str = "/static/images/";

const EXCERPT_MAX_CHARS: usize = 160;

/// Slugs come from URLs; anything that could walk the filesystem is
/// treated as not-found before we touch the disk.
pub fn is_safe_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn posts_dir(content_dir: &Path) -> PathBuf {
    content_dir.join("posts")
}

fn pages_dir(content_dir: &Path) -> PathBuf {
    content_dir.join("pages")
}

/// Lists every post under `content/posts`, newest first.
///
/// Posts with a missing or unparseable `date` sort after all dated posts.
/// A missing posts directory yields an empty list.
pub async fn list_posts(content_dir: &Path) -> io::Result<Vec<PostSummary>> {
    let mut posts = Vec::new();

    let mut entries = match fs::read_dir(posts_dir(content_dir)).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(posts),
        Err(e) => return Err(e),
    };

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !path.extension().map_or(false, |ext| ext == "md") {
            continue;
        }
        let Some(slug) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let file_content = fs::read_to_string(&path).await?;
        let (front_matter, body) = parse_front_matter(slug, &file_content);

        let date = front_matter.date.as_deref().and_then(parse_date);
        let excerpt = match front_matter.excerpt {
            Some(excerpt) => excerpt,
            None => excerpt_from_html(&render_markdown_to_html(&body)),
        };

        posts.push(PostSummary {
            slug: slug.to_string(),
            title: front_matter.title.unwrap_or_else(|| slug.to_string()),
            date,
            cover: front_matter.cover.as_deref().map(resolve_cover),
            excerpt,
            sort_key: date_sort_key(date),
        });
    }

    posts.sort_by(|a, b| b.sort_key.cmp(&a.sort_key).then_with(|| a.slug.cmp(&b.slug)));
    Ok(posts)
}

/// Loads a single post by slug; `Ok(None)` when the slug does not exist.
pub async fn load_post(content_dir: &Path, slug: &str) -> io::Result<Option<Post>> {
    if !is_safe_slug(slug) {
        return Ok(None);
    }
    let path = posts_dir(content_dir).join(format!("{slug}.md"));
    let file_content = match fs::read_to_string(&path).await {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    let (front_matter, body) = parse_front_matter(slug, &file_content);
    let html = render_markdown_to_html(&body);
    let excerpt = match front_matter.excerpt {
        Some(excerpt) => excerpt,
        None => excerpt_from_html(&html),
    };

    Ok(Some(Post {
        slug: slug.to_string(),
        title: front_matter.title.unwrap_or_else(|| slug.to_string()),
        date: front_matter.date.as_deref().and_then(parse_date),
        cover: front_matter.cover.as_deref().map(resolve_cover),
        excerpt,
        html,
    }))
}

/// Loads a static page from `content/pages` by slug.
pub async fn load_page(content_dir: &Path, slug: &str) -> io::Result<Option<Page>> {
    if !is_safe_slug(slug) {
        return Ok(None);
    }
    let path = pages_dir(content_dir).join(format!("{slug}.md"));
    let file_content = match fs::read_to_string(&path).await {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    let (front_matter, body) = parse_front_matter(slug, &file_content);

    Ok(Some(Page {
        slug: slug.to_string(),
        title: front_matter.title.unwrap_or_else(|| slug.to_string()),
        description: front_matter.description,
        cover: front_matter.cover.as_deref().map(resolve_cover),
        html: render_markdown_to_html(&body),
    }))
}

/// Lists the slugs and titles of every static page, for the sitemap.
pub async fn list_pages(content_dir: &Path) -> io::Result<Vec<(String, String)>> {
    let mut pages = Vec::new();

    let mut entries = match fs::read_dir(pages_dir(content_dir)).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(pages),
        Err(e) => return Err(e),
    };

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !path.extension().map_or(false, |ext| ext == "md") {
            continue;
        }
        let Some(slug) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let file_content = fs::read_to_string(&path).await?;
        let (front_matter, _) = parse_front_matter(slug, &file_content);
        pages.push((
            slug.to_string(),
            front_matter.title.unwrap_or_else(|| slug.to_string()),
        ));
    }

    pages.sort();
    Ok(pages)
}

fn parse_front_matter(slug: &str, file_content: &str) -> (FrontMatter, String) {
    let matter = Matter::<YAML>::new();
    match matter.parse::<FrontMatter>(file_content) {
        Ok(parsed) => (parsed.data.unwrap_or_default(), parsed.content),
        Err(e) => {
            warn!(slug, "failed to parse front matter: {e}");
            (FrontMatter::default(), file_content.to_string())
        }
    }
}

/// Accepts `2026-03-15`, `15/03/2026` and full RFC 3339 timestamps.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

pub fn date_sort_key(date: Option<NaiveDate>) -> i64 {
    date.and_then(|d| d.and_hms_opt(0, 0, 0))
        .map_or(0, |dt| dt.and_utc().timestamp())
}

/// Relative covers live under the public images folder; absolute paths and
/// full URLs pass through untouched.
pub fn resolve_cover(raw: &str) -> String {
    if raw.starts_with('/') || raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("{COVER_PREFIX}{raw}")
    }
}

/// Plain-text excerpt from rendered HTML, collapsed to one line and
/// truncated on a character boundary.
fn excerpt_from_html(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text = fragment
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ");
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= EXCERPT_MAX_CHARS {
        return collapsed;
    }
    let truncated: String = collapsed.chars().take(EXCERPT_MAX_CHARS).collect();
    match truncated.rfind(' ') {
        Some(at) => format!("{}…", &truncated[..at]),
        None => format!("{truncated}…"),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    fn write_post(dir: &Path, slug: &str, body: &str) {
        std::fs::create_dir_all(dir.join("posts")).unwrap();
        std::fs::write(dir.join("posts").join(format!("{slug}.md")), body).unwrap();
    }

    #[tokio::test]
    async fn missing_content_directory_yields_empty_list() {
        let tmp = tempfile::tempdir().unwrap();
        let posts = list_posts(&tmp.path().join("nowhere")).await.unwrap();
        assert!(posts.is_empty());
    }

    #[tokio::test]
    async fn posts_sort_by_descending_date_with_undated_last() {
        let tmp = tempfile::tempdir().unwrap();
        write_post(tmp.path(), "antigo", "---\ntitle: Antigo\ndate: 2024-02-01\n---\ncorpo");
        write_post(tmp.path(), "recente", "---\ntitle: Recente\ndate: 2026-06-10\n---\ncorpo");
        write_post(tmp.path(), "sem-data", "---\ntitle: Sem data\n---\ncorpo");
        write_post(
            tmp.path(),
            "data-invalida",
            "---\ntitle: Inválida\ndate: amanhã\n---\ncorpo",
        );

        let posts = list_posts(tmp.path()).await.unwrap();
        let slugs: Vec<_> = posts.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["recente", "antigo", "data-invalida", "sem-data"]);
    }

    #[tokio::test]
    async fn unknown_slug_is_none_not_error() {
        let tmp = tempfile::tempdir().unwrap();
        write_post(tmp.path(), "existe", "---\ntitle: Existe\n---\ncorpo");
        assert!(load_post(tmp.path(), "nao-existe").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn traversal_slugs_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(load_post(tmp.path(), "../etc/passwd").await.unwrap().is_none());
        assert!(load_page(tmp.path(), "a/b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn title_defaults_to_slug_and_excerpt_comes_from_body() {
        let tmp = tempfile::tempdir().unwrap();
        write_post(tmp.path(), "festa-junina", "Arraiá do **São José** confirmado.");

        let post = load_post(tmp.path(), "festa-junina").await.unwrap().unwrap();
        assert_eq!(post.title, "festa-junina");
        assert_eq!(post.excerpt, "Arraiá do São José confirmado.");
        assert!(post.html.contains("<strong>São José</strong>"));
    }

    #[test]
    fn covers_resolve_against_the_images_folder() {
        assert_eq!(resolve_cover("quadra.jpg"), "/static/images/quadra.jpg");
        assert_eq!(resolve_cover("/uploads/quadra.jpg"), "/uploads/quadra.jpg");
        assert_eq!(
            resolve_cover("https://cdn.example.com/q.jpg"),
            "https://cdn.example.com/q.jpg"
        );
    }

    #[test]
    fn dates_parse_in_iso_and_brazilian_formats() {
        assert!(parse_date("2026-03-15").is_some());
        assert!(parse_date("15/03/2026").is_some());
        assert!(parse_date("2026-03-15T08:00:00-03:00").is_some());
        assert!(parse_date("semana que vem").is_none());
    }
}
