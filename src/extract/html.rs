//! Markup handler and link discovery.
//!
//! Portal pages are arbitrary, unversioned HTML. Callers describe what they
//! want with a [`MarkupTarget`]: either a content container (CSS selector) to
//! flatten, or a [`LinkMatcher`] whose matching anchors are collected. The
//! same matcher drives [`find_links`], which indirection-following strategies
//! use to hop from a listing page to the document it points at.

use super::{ExtractLimits, finish};
use crate::error::{AcquisitionResult, Failure};
use crate::utils::collapse_whitespace;
use itertools::Itertools;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

/// Elements whose text never belongs in extracted content.
const SKIPPED: &[&str] = &["script", "style", "noscript", "template", "svg"];

/// Elements that start a new line when flattened.
const BLOCKS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "footer",
    "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p", "pre",
    "section", "table", "td", "th", "tr", "ul",
];

/// What the markup handler should pull out of a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkupTarget {
    /// Flatten the first element matching this CSS selector.
    Container(String),
    /// Collect the text of every anchor accepted by the matcher.
    Anchors(LinkMatcher),
}

/// Heuristics for picking anchors out of a page.
///
/// All comparisons are case-insensitive. A link is accepted when it sits
/// inside a `scope` element whose text contains `scope_text` (both optional)
/// and its text contains any of `text_contains` or its href contains any of
/// `href_contains`. With no needles at all, every link in scope is accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkMatcher {
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub scope_text: Option<String>,
    #[serde(default)]
    pub text_contains: Vec<String>,
    #[serde(default)]
    pub href_contains: Vec<String>,
}

impl LinkMatcher {
    pub fn text(needles: &[&str]) -> Self {
        Self {
            text_contains: needles.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn within(mut self, scope: &str, scope_text: Option<&str>) -> Self {
        self.scope = Some(scope.to_string());
        self.scope_text = scope_text.map(str::to_string);
        self
    }

    pub fn or_href(mut self, needles: &[&str]) -> Self {
        self.href_contains = needles.iter().map(|s| s.to_string()).collect();
        self
    }

    fn accepts(&self, text: &str, href: &str) -> bool {
        if self.text_contains.is_empty() && self.href_contains.is_empty() {
            return true;
        }
        let text = text.to_lowercase();
        let href = href.to_lowercase();
        self.text_contains.iter().any(|n| text.contains(&n.to_lowercase()))
            || self.href_contains.iter().any(|n| href.contains(&n.to_lowercase()))
    }
}

/// An anchor found on a page; `href` is as written (possibly relative).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub text: String,
    pub href: String,
}

fn parse_selector(css: &str) -> Result<Selector, Failure> {
    Selector::parse(css).map_err(|e| Failure::malformed(format!("invalid selector `{css}`: {e}")))
}

/// Collect the links accepted by `matcher`, in document order, deduplicated by href.
pub fn find_links(html: &str, matcher: &LinkMatcher) -> Result<Vec<Link>, Failure> {
    let document = Html::parse_document(html);
    let anchor_selector = parse_selector("a[href]")?;

    let scopes: Vec<ElementRef> = match &matcher.scope {
        Some(css) => {
            let scope_selector = parse_selector(css)?;
            let needle = matcher.scope_text.as_deref().map(str::to_lowercase);
            document
                .select(&scope_selector)
                .filter(|el| match &needle {
                    Some(n) => el.text().collect::<String>().to_lowercase().contains(n),
                    None => true,
                })
                .collect()
        }
        None => vec![document.root_element()],
    };

    let links = scopes
        .into_iter()
        .flat_map(|scope| scope.select(&anchor_selector).collect::<Vec<_>>())
        .filter_map(|a| {
            let href = a.value().attr("href")?.trim().to_string();
            if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
                return None;
            }
            let text = a.text().collect::<Vec<_>>().join(" ");
            let text = text.split_whitespace().join(" ");
            matcher.accepts(&text, &href).then_some(Link { text, href })
        })
        .unique_by(|l| l.href.clone())
        .collect();

    Ok(links)
}

/// Flatten an element to text, one line per block element.
pub fn flatten_element(element: ElementRef) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        if let Some(el) = node.value().as_element() {
            if BLOCKS.contains(&el.name()) {
                out.push('\n');
            }
            continue;
        }
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let skipped = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| SKIPPED.contains(&e.name()))
        });
        if !skipped {
            out.push_str(text);
        }
    }
    collapse_whitespace(&out)
}

/// Flatten the first element matching `container`, or the whole `<body>`.
pub fn flatten_page(html: &str, container: Option<&str>) -> Result<String, Failure> {
    let document = Html::parse_document(html);
    let element = match container {
        Some(css) => {
            let selector = parse_selector(css)?;
            document
                .select(&selector)
                .next()
                .ok_or_else(|| Failure::insufficient(format!("no element matches `{css}`")))?
        }
        None => {
            let selector = parse_selector("body")?;
            document
                .select(&selector)
                .next()
                .unwrap_or_else(|| document.root_element())
        }
    };
    Ok(flatten_element(element))
}

pub fn extract_html(bytes: &[u8], target: &MarkupTarget, limits: &ExtractLimits) -> AcquisitionResult {
    let html = String::from_utf8_lossy(bytes);
    let text = match target {
        MarkupTarget::Container(css) => flatten_page(&html, Some(css))?,
        MarkupTarget::Anchors(matcher) => {
            let links = find_links(&html, matcher)?;
            if links.is_empty() {
                return Err(Failure::insufficient("no matching links on page"));
            }
            links.iter().map(|l| l.text.as_str()).join("\n")
        }
    };
    finish(&text, bytes.len(), 1, limits)
}
