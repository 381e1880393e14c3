//! Link discovery
//!
//! Finds the outbound link targets in an HTML document: embedded links and
//! media plus declared `<link rel>` relations, resolved against the page URL.

use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

static LINK_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a[href], img[src], audio[src], video[src], source[src], link[rel][href]")
        .unwrap()
});

/// Resolve `href` against `base`, keeping only http(s) results
pub fn resolve_url(base: Option<&Url>, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let resolved = match base {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };

    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

/// Discover link targets in document order. Duplicates are kept.
pub fn discover_links(html: &str, base_url: &str) -> Vec<String> {
    let base = Url::parse(base_url).ok();
    let document = Html::parse_document(html);

    document
        .select(&LINK_SELECTOR)
        .filter_map(|element| {
            let el = element.value();
            let reference = match el.name() {
                "a" | "link" => el.attr("href"),
                _ => el.attr("src"),
            }?;
            resolve_url(base.as_ref(), reference)
        })
        .collect()
}

/// Whether `html` links to exactly `target`.
///
/// Both sides are compared in the normalised form discovered links take, so
/// `https://Example.org` matches a link written as `https://example.org/`.
pub fn links_to(html: &str, base_url: &str, target: &str) -> bool {
    let target = Url::parse(target.trim())
        .map(|u| u.to_string())
        .unwrap_or_else(|_| target.to_string());
    discover_links(html, base_url).iter().any(|link| *link == target)
}
