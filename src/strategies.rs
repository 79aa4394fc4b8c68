//! Concrete acquisition strategies.
//!
//! | Strategy | Method | Typical position |
//! |----------|--------|------------------|
//! | [`ProvidedDocument`] | user-supplied file | first, when given |
//! | [`LinkTrail`] | listing page → link(s) → document | primary |
//! | [`ScheduleListing`] | listing page → line classifier | primary (sports) |
//! | [`PageText`] | listing page container text | fallback |
//! | [`SearchSnippets`] | web search result snippets | fallback (sports) |
//! | [`RenderedPage`] | headless browser DOM | last, when available |
//!
//! Every strategy is a read-only bundle of configuration; all network and
//! decode work goes through [`DocumentFetcher`] and [`extract_bounded`], so
//! the caps and timeouts are enforced uniformly.

use crate::chain::Strategy;
use crate::classifier::{ScheduleLineClassifier, render_events};
use crate::config::TimeoutConfig;
use crate::error::{AcquisitionResult, Failure};
use crate::extract::html::{find_links, flatten_page};
use crate::extract::pdf::extract_pdf;
use crate::extract::{
    DocumentFormat, ExtractLimits, LinkMatcher, MarkupTarget, extract_bounded, finish, run_bounded, sniff_format,
};
use crate::fetch::{DocumentFetcher, Expect};
use crate::render::HeadlessBrowser;
use async_trait::async_trait;
use itertools::Itertools;
use scraper::{Html, Selector};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// What to pull out of a fetched, rendered or provided payload.
#[derive(Clone)]
pub enum Extraction {
    /// Plain text of the document, or of `MarkupTarget` when it is markup.
    Markup(MarkupTarget),
    /// Schedule events recognized by the line classifier.
    Schedule {
        container: Option<String>,
        classifier: Arc<ScheduleLineClassifier>,
    },
}

impl fmt::Debug for Extraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Markup(target) => f.debug_tuple("Markup").field(target).finish(),
            Self::Schedule { container, .. } => f.debug_struct("Schedule").field("container", container).finish(),
        }
    }
}

impl Extraction {
    fn target(&self) -> MarkupTarget {
        match self {
            Self::Markup(target) => target.clone(),
            Self::Schedule { container, .. } => container_target(container.as_deref()),
        }
    }

    /// Decode `bytes` off the async runtime, bounded by `timeout`.
    pub async fn apply(
        &self,
        bytes: Vec<u8>,
        format: DocumentFormat,
        limits: ExtractLimits,
        timeout: Duration,
    ) -> AcquisitionResult {
        match self {
            Self::Markup(_) => extract_bounded(bytes, format, limits, timeout).await,
            Self::Schedule { classifier, .. } => {
                schedule_bounded(bytes, format, classifier.clone(), limits, timeout).await
            }
        }
    }
}

fn container_target(container: Option<&str>) -> MarkupTarget {
    MarkupTarget::Container(container.unwrap_or("body").to_string())
}

/// Caller-provided document, tried before any remote fetching.
#[derive(Debug)]
pub struct ProvidedDocument {
    pub path: PathBuf,
    pub extraction: Extraction,
    pub limits: ExtractLimits,
    pub max_bytes: usize,
    pub timeouts: TimeoutConfig,
}

#[async_trait]
impl Strategy for ProvidedDocument {
    fn name(&self) -> &str {
        "provided-document"
    }

    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    async fn attempt(&self) -> AcquisitionResult {
        let meta = tokio::fs::metadata(&self.path)
            .await
            .map_err(|e| Failure::malformed(format!("cannot read {}: {e}", self.path.display())))?;
        if meta.len() > self.max_bytes as u64 {
            return Err(Failure::malformed(format!(
                "{} is {} bytes, limit is {}",
                self.path.display(),
                meta.len(),
                self.max_bytes
            )));
        }
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| Failure::malformed(format!("cannot read {}: {e}", self.path.display())))?;
        let format = sniff_format(&bytes, &self.extraction.target());
        debug!(?format, bytes = bytes.len(), "Extracting provided document");
        self.extraction
            .apply(bytes, format, self.limits, self.timeouts.decode())
            .await
    }
}

/// Follow one link per hop from a listing page, then extract the final document.
#[derive(Debug)]
pub struct LinkTrail {
    pub name: String,
    pub fetcher: Arc<DocumentFetcher>,
    pub start: String,
    pub hops: Vec<LinkMatcher>,
    pub document: Expect,
    /// Used when the final document is markup.
    pub target: MarkupTarget,
    pub limits: ExtractLimits,
    pub timeouts: TimeoutConfig,
}

#[async_trait]
impl Strategy for LinkTrail {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(level = "info", skip_all, fields(strategy = %self.name, start = %self.start))]
    async fn attempt(&self) -> AcquisitionResult {
        let mut current = self.fetcher.resolve(&self.start)?;

        for (hop, matcher) in self.hops.iter().enumerate() {
            let page = self
                .fetcher
                .fetch(current.as_str(), self.timeouts.page(), Expect::Html)
                .await?;
            let html = String::from_utf8_lossy(&page.content).into_owned();
            let links = find_links(&html, matcher)?;
            let Some(link) = links.into_iter().next() else {
                return Err(Failure::insufficient(format!(
                    "hop {hop}: no matching link on {current}"
                )));
            };
            info!(hop, text = %link.text, href = %link.href, "Following link");
            current = self.fetcher.resolve(&link.href)?;
        }

        let doc = self
            .fetcher
            .fetch(current.as_str(), self.timeouts.document(), self.document)
            .await?;
        let format = sniff_format(&doc.content, &self.target);
        extract_bounded(doc.content, format, self.limits, self.timeouts.decode()).await
    }
}

/// Flatten a container on a known page.
#[derive(Debug)]
pub struct PageText {
    pub name: String,
    pub fetcher: Arc<DocumentFetcher>,
    pub path: String,
    pub target: MarkupTarget,
    pub limits: ExtractLimits,
    pub timeouts: TimeoutConfig,
}

#[async_trait]
impl Strategy for PageText {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(level = "info", skip_all, fields(strategy = %self.name, path = %self.path))]
    async fn attempt(&self) -> AcquisitionResult {
        let page = self
            .fetcher
            .fetch(&self.path, self.timeouts.page(), Expect::Html)
            .await?;
        extract_bounded(
            page.content,
            DocumentFormat::Html(self.target.clone()),
            self.limits,
            self.timeouts.decode(),
        )
        .await
    }
}

/// Classify a schedule document into events and render them as text.
///
/// Markup is flattened first (only `container` when it is a container
/// target); PDFs go through the page decoder with no minimum so the
/// classifier decides what counts.
pub fn schedule_text(
    bytes: &[u8],
    format: &DocumentFormat,
    classifier: &ScheduleLineClassifier,
    limits: &ExtractLimits,
) -> AcquisitionResult {
    let (text, pages) = match format {
        DocumentFormat::Pdf => {
            let decoded = extract_pdf(
                bytes,
                &ExtractLimits {
                    min_content: 0,
                    ..*limits
                },
            )?;
            (decoded.content, decoded.pages_consumed)
        }
        DocumentFormat::Html(MarkupTarget::Container(css)) => {
            (flatten_page(&String::from_utf8_lossy(bytes), Some(css))?, 1)
        }
        DocumentFormat::Html(MarkupTarget::Anchors(_)) => (flatten_page(&String::from_utf8_lossy(bytes), None)?, 1),
        DocumentFormat::PlainText => (String::from_utf8_lossy(bytes).into_owned(), 1),
    };
    let events = classifier.scan(text.lines());
    if events.is_empty() {
        return Err(Failure::insufficient("no schedule events recognized"));
    }
    debug!(events = events.len(), "Classified schedule lines");
    finish(&render_events(&events), bytes.len(), pages, limits)
}

/// [`schedule_text`] on the blocking pool under the decode timeout.
pub async fn schedule_bounded(
    bytes: Vec<u8>,
    format: DocumentFormat,
    classifier: Arc<ScheduleLineClassifier>,
    limits: ExtractLimits,
    timeout: Duration,
) -> AcquisitionResult {
    run_bounded(timeout, move || schedule_text(&bytes, &format, &classifier, &limits)).await
}

/// Fetch a schedule listing and run it through the line classifier.
pub struct ScheduleListing {
    pub fetcher: Arc<DocumentFetcher>,
    pub path: String,
    pub container: Option<String>,
    pub classifier: Arc<ScheduleLineClassifier>,
    pub limits: ExtractLimits,
    pub timeouts: TimeoutConfig,
}

#[async_trait]
impl Strategy for ScheduleListing {
    fn name(&self) -> &str {
        "schedule-listing"
    }

    #[instrument(level = "info", skip_all, fields(path = %self.path))]
    async fn attempt(&self) -> AcquisitionResult {
        let page = self
            .fetcher
            .fetch(&self.path, self.timeouts.page(), Expect::Html)
            .await?;
        schedule_bounded(
            page.content,
            DocumentFormat::Html(container_target(self.container.as_deref())),
            self.classifier.clone(),
            self.limits,
            self.timeouts.decode(),
        )
        .await
    }
}

/// Combine the top results of an HTML web search.
#[derive(Debug)]
pub struct SearchSnippets {
    pub fetcher: Arc<DocumentFetcher>,
    pub query: String,
    pub max_results: usize,
    pub limits: ExtractLimits,
    pub timeouts: TimeoutConfig,
}

/// Title and snippet of each organic result, deduplicated by title.
pub fn parse_search_results(html: &str, max_results: usize) -> Result<Vec<(String, String)>, Failure> {
    let parse = |css: &str| {
        Selector::parse(css).map_err(|e| Failure::malformed(format!("invalid selector `{css}`: {e}")))
    };
    let result_selector = parse(".result")?;
    let title_selector = parse(".result__a")?;
    let snippet_selector = parse(".result__snippet")?;

    let document = Html::parse_document(html);
    let squash = |s: String| s.split_whitespace().join(" ");
    let results = document
        .select(&result_selector)
        .filter_map(|result| {
            let title = squash(result.select(&title_selector).next()?.text().collect());
            let snippet = result
                .select(&snippet_selector)
                .next()
                .map(|s| squash(s.text().collect()))
                .unwrap_or_default();
            (!title.is_empty()).then_some((title, snippet))
        })
        .unique_by(|(title, _)| title.clone())
        .take(max_results)
        .collect();
    Ok(results)
}

#[async_trait]
impl Strategy for SearchSnippets {
    fn name(&self) -> &str {
        "web-search"
    }

    #[instrument(level = "info", skip_all, fields(query = %self.query))]
    async fn attempt(&self) -> AcquisitionResult {
        let target = format!("/html/?q={}", urlencoding::encode(&self.query));
        let page = self
            .fetcher
            .fetch(&target, self.timeouts.page(), Expect::Html)
            .await?;
        let html = String::from_utf8_lossy(&page.content).into_owned();
        let results = parse_search_results(&html, self.max_results)?;
        if results.is_empty() {
            return Err(Failure::insufficient("no search results returned"));
        }
        let combined = results
            .iter()
            .enumerate()
            .map(|(i, (title, snippet))| format!("Source {}: {title}\n{snippet}\n", i + 1))
            .join("\n");
        finish(&combined, page.bytes_consumed, 1, &self.limits)
    }
}

/// Render a page in a headless browser, then extract as usual.
pub struct RenderedPage {
    pub name: String,
    pub browser: HeadlessBrowser,
    pub url: String,
    pub extraction: Extraction,
    pub limits: ExtractLimits,
    pub max_bytes: usize,
    pub timeouts: TimeoutConfig,
}

#[async_trait]
impl Strategy for RenderedPage {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(level = "info", skip_all, fields(strategy = %self.name, url = %self.url))]
    async fn attempt(&self) -> AcquisitionResult {
        let dom = self
            .browser
            .dump_dom(&self.url, self.timeouts.render(), self.max_bytes)
            .await?;
        let format = DocumentFormat::Html(self.extraction.target());
        self.extraction
            .apply(dom.content, format, self.limits, self.timeouts.decode())
            .await
    }
}
