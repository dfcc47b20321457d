//! Reads the current post and the listed posts out of a rendered page.
//!
//! The parsed document never leaves [`scan_page`]; callers only see owned
//! [`ScannedPage`] data.

use std::sync::OnceLock;

use chrono::Utc;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use crate::models::{ItemMetadata, PageSnapshot};
use crate::services::extractor::{string_hash, ContentFields};

const TITLE_SUFFIXES: &[&str] = &[" - BlogSphere", " - Blog"];
const LISTING_SEGMENTS: &[&str] = &["posts", "blog"];
const DETAIL_PATH_MARKERS: &[&str] = &["/post/", "/blog/"];

static SELECTORS: OnceLock<PageSelectors> = OnceLock::new();

/// The post the page is about
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentItem {
    pub id: String,
    pub title: String,
    /// Display label, not normalized
    pub category: String,
    pub url: String,
    pub content: ContentFields,
}

/// A post listed somewhere on the page
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedItem {
    pub id: String,
    pub metadata: ItemMetadata,
    pub content: ContentFields,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScannedPage {
    pub current: CurrentItem,
    /// Whether the URL points at a single post
    pub is_detail_view: bool,
    pub candidates: Vec<ScannedItem>,
}

struct PageSelectors {
    title: Selector,
    meta_post_id: Selector,
    post_container: Selector,
    current_category_label: Selector,
    breadcrumb_active: Selector,
    page_category: Selector,
    page_tags: Selector,
    page_author: Selector,
    page_body: Selector,
    cards: Selector,
    card_title: Selector,
    card_link: Selector,
    card_category: Selector,
    card_tags: Selector,
    card_author: Selector,
}

impl PageSelectors {
    fn new() -> Self {
        Self {
            title: Selector::parse("title").expect("title selector"),
            meta_post_id: Selector::parse(r#"meta[name="post-id"]"#).expect("meta selector"),
            post_container: Selector::parse("article, .post-detail").expect("post selector"),
            current_category_label: Selector::parse(".category, .post-category, .badge.bg-primary")
                .expect("category label selector"),
            breadcrumb_active: Selector::parse(".breadcrumb .active")
                .expect("breadcrumb selector"),
            page_category: Selector::parse(".category, .post-category, [data-category], .badge")
                .expect("category selector"),
            page_tags: Selector::parse(".tag, .post-tag, .badge:not(.category)")
                .expect("tag selector"),
            page_author: Selector::parse(".author, .post-author, [data-author]")
                .expect("author selector"),
            page_body: Selector::parse(".post-content, .content, article").expect("body selector"),
            cards: Selector::parse(".post-card, .card, article").expect("card selector"),
            card_title: Selector::parse("h1, h2, h3, h4, h5, .post-title")
                .expect("card title selector"),
            card_link: Selector::parse("a").expect("link selector"),
            card_category: Selector::parse(".category, .badge").expect("card category selector"),
            card_tags: Selector::parse(".tag, .badge:not(.category)").expect("card tag selector"),
            card_author: Selector::parse(".author").expect("card author selector"),
        }
    }
}

/// Selector set shared by every scan, parsed on first use
fn selectors() -> &'static PageSelectors {
    SELECTORS.get_or_init(PageSelectors::new)
}

/// Parses `snapshot` and pulls out the current post and every listed post
pub fn scan_page(snapshot: &PageSnapshot) -> ScannedPage {
    let document = Html::parse_document(&snapshot.html);
    let selectors = selectors();
    let base = Url::parse(&snapshot.url).ok();
    let path = url_path(&snapshot.url, base.as_ref());

    let is_detail_view = is_detail_path(&path);
    let current = CurrentItem {
        id: current_post_id(&document, selectors, &path, is_detail_view),
        title: page_title(&document, selectors),
        category: current_category_label(&document, selectors),
        url: snapshot.url.clone(),
        content: page_content(&document, selectors),
    };

    // on a post page the post's own container is not a candidate
    let own_container = document
        .select(&selectors.post_container)
        .next()
        .filter(|_| is_detail_view)
        .map(|el| el.id());

    let candidates = document
        .select(&selectors.cards)
        .enumerate()
        .filter(|(_, element)| Some(element.id()) != own_container)
        .map(|(index, element)| scan_card(element, index, selectors, base.as_ref()))
        .filter(|item| item.id != current.id)
        .collect();

    ScannedPage {
        current,
        is_detail_view,
        candidates,
    }
}

/// True for URLs of a single post
pub fn is_detail_path(path: &str) -> bool {
    DETAIL_PATH_MARKERS.iter().any(|marker| path.contains(marker))
}

/// Id derived from what the card shows, stable across scans
pub fn stable_item_id(title: &str, url: &str) -> String {
    format!("post_{:08x}", string_hash(&format!("{}|{}", title, url)))
}

fn url_path(raw: &str, parsed: Option<&Url>) -> String {
    match parsed {
        Some(url) => url.path().to_string(),
        None => raw
            .split(|c: char| c == '?' || c == '#')
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

fn last_segment(path: &str) -> Option<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).last()
}

/// Slug, then page-provided ids on post pages, then a synthesized id
///
/// Listing pages never take an id from the markup: their first `article`
/// is a listed card, not the page itself.
fn current_post_id(
    document: &Html,
    selectors: &PageSelectors,
    path: &str,
    is_detail_view: bool,
) -> String {
    let slug = last_segment(path);
    if let Some(slug) = slug.filter(|s| !LISTING_SEGMENTS.contains(s)) {
        return slug.to_string();
    }
    if !is_detail_view {
        return synthesized_id(slug);
    }

    let from_meta = document
        .select(&selectors.meta_post_id)
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .map(str::trim)
        .filter(|id| !id.is_empty());
    if let Some(id) = from_meta {
        return id.to_string();
    }

    let from_container = document
        .select(&selectors.post_container)
        .next()
        .and_then(|el| el.value().attr("data-post-id"))
        .map(str::trim)
        .filter(|id| !id.is_empty());
    if let Some(id) = from_container {
        return id.to_string();
    }

    synthesized_id(slug)
}

fn synthesized_id(slug: Option<&str>) -> String {
    format!(
        "post_{}_{}",
        slug.unwrap_or("home"),
        Utc::now().timestamp_millis()
    )
}

fn page_title(document: &Html, selectors: &PageSelectors) -> String {
    let mut title = document
        .select(&selectors.title)
        .next()
        .map(|el| element_text(&el))
        .unwrap_or_default();
    for suffix in TITLE_SUFFIXES {
        title = title.replace(suffix, "");
    }

    let title = title.trim();
    if title.is_empty() {
        "Untitled Post".to_string()
    } else {
        title.to_string()
    }
}

fn current_category_label(document: &Html, selectors: &PageSelectors) -> String {
    if let Some(label) = document
        .select(&selectors.current_category_label)
        .next()
        .map(|el| element_text(&el))
        .filter(|label| !label.is_empty())
    {
        return label;
    }

    document
        .select(&selectors.breadcrumb_active)
        .next()
        .map(|el| element_text(&el))
        .filter(|label| !label.is_empty() && !label.contains("Home"))
        .unwrap_or_else(|| "General".to_string())
}

fn page_content(document: &Html, selectors: &PageSelectors) -> ContentFields {
    ContentFields {
        category: document
            .select(&selectors.page_category)
            .next()
            .map(|el| label_of(&el, "data-category")),
        tags: document
            .select(&selectors.page_tags)
            .map(|el| element_text(&el))
            .collect(),
        author: document
            .select(&selectors.page_author)
            .next()
            .map(|el| label_of(&el, "data-author")),
        word_count: document
            .select(&selectors.page_body)
            .next()
            .map(|el| el.text().flat_map(str::split_whitespace).count()),
    }
}

fn scan_card(
    element: ElementRef<'_>,
    index: usize,
    selectors: &PageSelectors,
    base: Option<&Url>,
) -> ScannedItem {
    let title = element
        .select(&selectors.card_title)
        .next()
        .map(|el| element_text(&el))
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| format!("Post {}", index + 1));

    let url = element
        .select(&selectors.card_link)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(|href| resolve_href(href, base))
        .unwrap_or_else(|| "#".to_string());

    let category_el = element.select(&selectors.card_category).next();
    let category = category_el
        .map(|el| element_text(&el))
        .filter(|label| !label.is_empty())
        .unwrap_or_else(|| "General".to_string());

    let id = element
        .value()
        .attr("data-post-id")
        .or_else(|| element.value().id())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| stable_item_id(&title, &url));

    let content = ContentFields {
        category: category_el.map(|el| element_text(&el)),
        tags: element
            .select(&selectors.card_tags)
            .map(|el| element_text(&el))
            .collect(),
        author: element
            .select(&selectors.card_author)
            .next()
            .map(|el| element_text(&el)),
        word_count: None,
    };

    ScannedItem {
        id,
        metadata: ItemMetadata {
            title,
            url,
            category,
        },
        content,
    }
}

fn resolve_href(href: &str, base: Option<&Url>) -> String {
    base.and_then(|base| base.join(href).ok())
        .map(String::from)
        .unwrap_or_else(|| href.to_string())
}

fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Visible text, or the data attribute when the element is empty
fn label_of(element: &ElementRef<'_>, data_attr: &str) -> String {
    let text = element_text(element);
    if !text.is_empty() {
        return text;
    }
    element
        .value()
        .attr(data_attr)
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETAIL_PAGE: &str = r#"
        <html>
          <head>
            <title>Understanding Lifetimes - BlogSphere</title>
          </head>
          <body>
            <nav class="breadcrumb"><span class="active">Rust</span></nav>
            <div class="post-detail" data-post-id="42">
              <span class="category">Systems Programming</span>
              <span class="tag">Rust</span>
              <span class="tag">memory</span>
              <span class="tag">rust</span>
              <span class="author">Jane  Doe</span>
              <div class="post-content">one two three four five</div>
            </div>
            <aside>
              <div class="post-card" data-post-id="7">
                <h3>Borrowing Basics</h3>
                <a href="/post/borrowing-basics/">read</a>
                <span class="badge category">Rust</span>
                <span class="tag">ownership</span>
              </div>
              <div class="card">
                <a href="/post/async-io/">Async IO</a>
              </div>
            </aside>
          </body>
        </html>
    "#;

    fn snapshot(url: &str, html: &str) -> PageSnapshot {
        PageSnapshot {
            url: url.to_string(),
            html: html.to_string(),
        }
    }

    #[test]
    fn test_detail_page_current_item() {
        let page = scan_page(&snapshot(
            "https://blog.example.com/post/understanding-lifetimes/",
            DETAIL_PAGE,
        ));

        assert!(page.is_detail_view);
        assert_eq!(page.current.id, "understanding-lifetimes");
        assert_eq!(page.current.title, "Understanding Lifetimes");
        assert_eq!(page.current.category, "Systems Programming");
        assert_eq!(
            page.current.content.category.as_deref(),
            Some("Systems Programming")
        );
        assert_eq!(page.current.content.author.as_deref(), Some("Jane Doe"));
        assert_eq!(page.current.content.word_count, Some(5));
        assert!(page.current.content.tags.contains(&"memory".to_string()));
    }

    #[test]
    fn test_detail_page_candidates() {
        let page = scan_page(&snapshot(
            "https://blog.example.com/post/understanding-lifetimes/",
            DETAIL_PAGE,
        ));

        assert_eq!(page.candidates.len(), 2);

        let first = &page.candidates[0];
        assert_eq!(first.id, "7");
        assert_eq!(first.metadata.title, "Borrowing Basics");
        assert_eq!(
            first.metadata.url,
            "https://blog.example.com/post/borrowing-basics/"
        );
        assert_eq!(first.metadata.category, "Rust");
        assert_eq!(first.content.tags, vec!["ownership".to_string()]);
        assert_eq!(first.content.word_count, None);

        let second = &page.candidates[1];
        assert_eq!(second.metadata.title, "Post 2");
        assert_eq!(second.metadata.category, "General");
        assert_eq!(
            second.id,
            stable_item_id("Post 2", "https://blog.example.com/post/async-io/")
        );
    }

    #[test]
    fn test_synthesized_candidate_ids_are_stable_across_scans() {
        let snap = snapshot("https://blog.example.com/", DETAIL_PAGE);
        let first = scan_page(&snap);
        let second = scan_page(&snap);
        assert_eq!(first.candidates[1].id, second.candidates[1].id);
    }

    #[test]
    fn test_bare_blog_path_uses_container_id() {
        let page = scan_page(&snapshot("https://blog.example.com/blog/", DETAIL_PAGE));
        assert_eq!(page.current.id, "42");
        assert!(page.is_detail_view);
    }

    #[test]
    fn test_meta_post_id_preferred_over_container() {
        let html = r#"<html><head><meta name="post-id" content="meta-9"></head>
            <body><article data-post-id="article-1"></article></body></html>"#;
        let page = scan_page(&snapshot("https://blog.example.com/blog/", html));
        assert_eq!(page.current.id, "meta-9");
    }

    const ARTICLE_LISTING: &str = r#"
        <article data-post-id="alpha"><h2>Alpha</h2><span class="badge">Rust</span></article>
        <article data-post-id="beta"><h2>Beta</h2><span class="badge">Rust</span></article>
        <article data-post-id="gamma"><h2>Gamma</h2><span class="badge">Cooking</span></article>
    "#;

    #[test]
    fn test_listing_articles_stay_candidates() {
        for url in ["https://blog.example.com/", "https://blog.example.com/posts/"] {
            let page = scan_page(&snapshot(url, ARTICLE_LISTING));

            assert!(!page.is_detail_view);
            assert!(page.current.id.starts_with("post_"), "{}", page.current.id);
            assert_ne!(page.current.id, "alpha");
            let ids: Vec<&str> = page.candidates.iter().map(|c| c.id.as_str()).collect();
            assert_eq!(ids, vec!["alpha", "beta", "gamma"]);
        }
    }

    #[test]
    fn test_listing_ignores_meta_post_id() {
        let html = r#"<html><head><meta name="post-id" content="alpha"></head><body></body></html>"#;
        let page = scan_page(&snapshot("https://blog.example.com/posts/", html));
        assert!(page.current.id.starts_with("post_posts_"));
    }

    #[test]
    fn test_home_page_synthesizes_id_and_defaults() {
        let page = scan_page(&snapshot("https://blog.example.com/", "<html><body></body></html>"));

        assert!(page.current.id.starts_with("post_home_"));
        assert_eq!(page.current.title, "Untitled Post");
        assert_eq!(page.current.category, "General");
        assert_eq!(page.current.content, ContentFields::default());
        assert!(!page.is_detail_view);
        assert!(page.candidates.is_empty());
    }

    #[test]
    fn test_breadcrumb_category_fallback() {
        let html = r#"<nav class="breadcrumb"><a>Home</a><span class="active">Databases</span></nav>"#;
        let page = scan_page(&snapshot("/post/indexes/", html));
        assert_eq!(page.current.category, "Databases");

        let home_only = r#"<nav class="breadcrumb"><span class="active">Home</span></nav>"#;
        let page = scan_page(&snapshot("/post/indexes/", home_only));
        assert_eq!(page.current.category, "General");
    }

    #[test]
    fn test_relative_url_keeps_href() {
        let html = r#"<div class="post-card"><a href="/post/a/">A</a></div>"#;
        let page = scan_page(&snapshot("/post/indexes/?ref=home", html));
        assert_eq!(page.current.id, "indexes");
        assert_eq!(page.candidates[0].metadata.url, "/post/a/");
    }

    #[test]
    fn test_candidate_matching_current_id_is_skipped() {
        let html = r#"<article data-post-id="indexes"><h1>Indexes</h1></article>
            <div class="post-card" data-post-id="other"><h2>Other</h2></div>"#;
        let page = scan_page(&snapshot("/post/indexes/", html));
        let ids: Vec<&str> = page.candidates.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["other"]);
    }

    #[test]
    fn test_post_container_not_a_candidate_on_detail_page() {
        let html = r#"<article><h1>Lifetimes</h1><span class="tag">rust</span></article>
            <article data-post-id="next"><h2>Next</h2></article>"#;

        let detail = scan_page(&snapshot("/post/lifetimes/", html));
        let ids: Vec<&str> = detail.candidates.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["next"]);

        let listing = scan_page(&snapshot("/", html));
        assert_eq!(listing.candidates.len(), 2);
    }

    #[test]
    fn test_data_attribute_used_for_empty_marker() {
        let html = r#"<span data-category="Go"></span><span data-author="Rob"></span>"#;
        let page = scan_page(&snapshot("/post/x/", html));
        assert_eq!(page.current.content.category.as_deref(), Some("Go"));
        assert_eq!(page.current.content.author.as_deref(), Some("Rob"));
    }

    #[test]
    fn test_selectors_parsed_once_and_shared() {
        let first = selectors();
        scan_page(&snapshot("/post/42/", DETAIL_PAGE));
        scan_page(&snapshot("/", DETAIL_PAGE));
        assert!(std::ptr::eq(first, selectors()));
    }
}
