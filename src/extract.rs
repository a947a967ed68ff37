//! Result extraction: ordered structural strategies with a generic fallback.
//!
//! The provider's SERP markup changes often and without notice. Rather than
//! betting on one selector set, extraction walks a fixed cascade of
//! structural strategies (most specific first) and stops at the first one
//! that yields anything; when the whole cascade comes up dry, a heuristic
//! link scan keeps results flowing. Strategy order and the fallback's
//! ancestor-walk bound are constants, not configuration.

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use crate::core::types::SearchResult;

/// One structural extraction strategy.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionStrategy {
    pub name: &'static str,
    pub container: &'static str,
    pub title: &'static str,
    pub snippet: &'static str,
}

/// The cascade, most specific first.
pub const EXTRACTION_STRATEGIES: &[ExtractionStrategy] = &[
    ExtractionStrategy {
        name: "search-hveid",
        container: "#search div[data-hveid]",
        title: "h3",
        snippet: "div[data-sncf]",
    },
    ExtractionStrategy {
        name: "rso-hveid",
        container: "#rso div[data-hveid]",
        title: "h3",
        snippet: "[data-sncf='1']",
    },
    ExtractionStrategy {
        name: "classic-g",
        container: ".g",
        title: "h3",
        snippet: "div[style*='webkit-line-clamp']",
    },
    ExtractionStrategy {
        name: "jscontroller",
        container: "div[jscontroller][data-hveid]",
        title: "h3",
        snippet: "div[role='text']",
    },
];

/// How many ancestor levels the fallback inspects when hunting for a snippet.
pub const FALLBACK_ANCESTOR_LEVELS: usize = 3;

/// Extracts up to `limit` results from the rendered page HTML.
pub fn extract(html: &str, base_url: &str, limit: usize) -> Vec<SearchResult> {
    let doc = Html::parse_document(html);

    for strategy in EXTRACTION_STRATEGIES {
        let results = apply_strategy(&doc, strategy, base_url, limit);
        if !results.is_empty() {
            info!(
                "extract: strategy '{}' yielded {} result(s)",
                strategy.name,
                results.len()
            );
            return results;
        }
        debug!("extract: strategy '{}' yielded nothing", strategy.name);
    }

    warn!("extract: every structural strategy came up empty; generic link fallback");
    extract_generic_links(&doc, base_url, limit)
}

fn apply_strategy(
    doc: &Html,
    strategy: &ExtractionStrategy,
    base_url: &str,
    limit: usize,
) -> Vec<SearchResult> {
    let Ok(container_sel) = Selector::parse(strategy.container) else {
        return Vec::new();
    };
    let Ok(title_sel) = Selector::parse(strategy.title) else {
        return Vec::new();
    };
    let Ok(snippet_sel) = Selector::parse(strategy.snippet) else {
        return Vec::new();
    };
    let link_sel = Selector::parse("a").unwrap();
    let h3_sel = Selector::parse("h3").unwrap();

    let mut out = Vec::new();
    for container in doc.select(&container_sel).take(limit) {
        let title = container
            .select(&title_sel)
            .next()
            .map(|t| collapse_ws(t.text()))
            .unwrap_or_default();
        if title.is_empty() {
            continue;
        }

        // Prefer the anchor wrapping the title; fall back to any anchor with
        // a usable href. Provider-internal links never count as results.
        let mut link: Option<String> = None;
        let anchors: Vec<ElementRef<'_>> = container.select(&link_sel).collect();
        for a in anchors
            .iter()
            .filter(|a| a.select(&h3_sel).next().is_some())
            .chain(anchors.iter())
        {
            let href = a.value().attr("href").unwrap_or("");
            if let Some(url) = normalize_href(href, base_url) {
                if !is_provider_internal(&url) {
                    link = Some(url);
                    break;
                }
            }
        }
        let Some(link) = link else {
            continue;
        };

        let snippet = container
            .select(&snippet_sel)
            .next()
            .map(|s| collapse_ws(s.text()))
            .unwrap_or_default();

        out.push(SearchResult {
            title,
            link,
            snippet,
        });
    }
    out
}

/// Generic last-resort scan: every absolute off-provider link on the page.
fn extract_generic_links(doc: &Html, base_url: &str, limit: usize) -> Vec<SearchResult> {
    let anchor_sel = Selector::parse("a[href]").unwrap();

    let mut out: Vec<SearchResult> = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for a in doc.select(&anchor_sel) {
        if out.len() >= limit {
            break;
        }

        let href = a.value().attr("href").unwrap_or("");
        let Some(link) = normalize_href(href, base_url) else {
            continue;
        };
        if is_provider_internal(&link) || !seen.insert(link.clone()) {
            continue;
        }

        let title = collapse_ws(a.text());
        if title.is_empty() {
            continue;
        }

        let snippet = ancestor_snippet(&a, &title);
        out.push(SearchResult {
            title,
            link,
            snippet,
        });
    }
    out
}

/// Longest ancestor text (up to [`FALLBACK_ANCESTOR_LEVELS`] levels up) that
/// differs from the title.
fn ancestor_snippet(anchor: &ElementRef<'_>, title: &str) -> String {
    let mut best = String::new();
    for node in anchor.ancestors().take(FALLBACK_ANCESTOR_LEVELS) {
        let Some(el) = ElementRef::wrap(node) else {
            continue;
        };
        let text = collapse_ws(el.text());
        if text != title && text.len() > best.len() {
            best = text;
        }
    }
    best
}

/// Resolves an href to an absolute external URL.
///
/// The provider wraps many organic links as `/url?q=<target>&…`; those are
/// unwrapped against `base_url`. Everything else must already be absolute
/// http(s) to count.
fn normalize_href(href: &str, base_url: &str) -> Option<String> {
    if href.is_empty() {
        return None;
    }

    if href.starts_with("/url?") {
        let full = format!("{}{}", base_url.trim_end_matches('/'), href);
        if let Ok(url) = Url::parse(&full) {
            for (k, v) in url.query_pairs() {
                if k == "q" && (v.starts_with("http://") || v.starts_with("https://")) {
                    return Some(v.to_string());
                }
            }
        }
        return None;
    }

    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }

    None
}

/// Provider-owned hosts (any SERP ccTLD, accounts, support) are never results.
fn is_provider_internal(link: &str) -> bool {
    match Url::parse(link) {
        Ok(url) => url
            .host_str()
            .map(|h| h.contains("google."))
            .unwrap_or(true),
        Err(_) => true,
    }
}

fn collapse_ws<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
