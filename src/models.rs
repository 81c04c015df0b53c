use chrono::NaiveDate;
use serde::Deserialize;

/// Frontmatter block parsed from the top of a content markdown file.
///
/// Every field is optional; accessors fall back to filename-derived values
/// (see `content::list_posts`).
#[derive(Deserialize, Debug, Clone, Default)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub date: Option<String>,
    pub cover: Option<String>,
    pub excerpt: Option<String>,
    pub description: Option<String>,
}

/// A news post with its body rendered to HTML.
#[derive(Debug, Clone)]
pub struct Post {
    pub slug: String,
    pub title: String,
    pub date: Option<NaiveDate>,
    pub cover: Option<String>,
    pub excerpt: String,
    pub html: String,
}

/// Listing entry for the news index, feeds and sitemap.
#[derive(Debug, Clone)]
pub struct PostSummary {
    pub slug: String,
    pub title: String,
    pub date: Option<NaiveDate>,
    pub cover: Option<String>,
    pub excerpt: String,
    /// Unix timestamp of `date` at midnight UTC; 0 when the date is
    /// missing or unparseable, so undated posts sort after dated ones.
    pub sort_key: i64,
}

/// A static marketing page (admissions, pedagogy, legal policies).
#[derive(Debug, Clone)]
pub struct Page {
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub cover: Option<String>,
    pub html: String,
}
