//! Bounded conversion of raw payloads into plain text.
//!
//! Every handler enforces the same [`ExtractLimits`]: at most `page_cap`
//! pages are decoded, the result is cut to `size_cap` characters, and text
//! with fewer than `min_content` non-whitespace characters is reported as
//! [`ErrorKind::InsufficientContent`](crate::error::ErrorKind) so the chain can
//! move on instead of forwarding junk to the summarizer.
//!
//! # Submodules
//!
//! - [`pdf`]: paginated documents (`lopdf`)
//! - [`html`]: markup pages (`scraper`), including link discovery

pub mod html;
pub mod pdf;

use crate::error::{Acquired, AcquisitionResult, Failure};
use crate::fetch::is_pdf;
use crate::utils::{collapse_whitespace, non_whitespace_len, truncate_chars};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

pub use html::{LinkMatcher, MarkupTarget};

/// Page and length bounds applied to every extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractLimits {
    /// Maximum pages decoded from a paginated document.
    pub page_cap: usize,
    /// Maximum characters of text handed back.
    pub size_cap: usize,
    /// Minimum non-whitespace characters for the text to count as usable.
    pub min_content: usize,
}

impl Default for ExtractLimits {
    fn default() -> Self {
        Self {
            page_cap: 50,
            size_cap: 15_000,
            min_content: 200,
        }
    }
}

/// Payload format and, for markup, what to pull out of it.
#[derive(Debug, Clone)]
pub enum DocumentFormat {
    Pdf,
    Html(MarkupTarget),
    PlainText,
}

/// Pick a format from the payload itself; markup falls back to `target`.
pub fn sniff_format(bytes: &[u8], target: &MarkupTarget) -> DocumentFormat {
    if is_pdf(bytes) {
        return DocumentFormat::Pdf;
    }
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(512)]).to_ascii_lowercase();
    if head.contains("<html") || head.contains("<!doctype html") || head.contains("<body") {
        DocumentFormat::Html(target.clone())
    } else {
        DocumentFormat::PlainText
    }
}

/// Convert `bytes` to capped plain text.
///
/// Pure function of its inputs: identical bytes and limits always yield
/// identical output.
pub fn extract(bytes: &[u8], format: &DocumentFormat, limits: &ExtractLimits) -> AcquisitionResult {
    match format {
        DocumentFormat::Pdf => pdf::extract_pdf(bytes, limits),
        DocumentFormat::Html(target) => html::extract_html(bytes, target, limits),
        DocumentFormat::PlainText => {
            let text = collapse_whitespace(&String::from_utf8_lossy(bytes));
            finish(&text, bytes.len(), 1, limits)
        }
    }
}

/// Run [`extract`] on the blocking pool under a hard decode timeout.
pub async fn extract_bounded(
    bytes: Vec<u8>,
    format: DocumentFormat,
    limits: ExtractLimits,
    timeout: Duration,
) -> AcquisitionResult {
    run_bounded(timeout, move || extract(&bytes, &format, &limits)).await
}

/// Run a CPU-bound decode step on the blocking pool, giving up after `timeout`.
///
/// A step that overruns keeps its blocking thread until it returns, but its
/// result is discarded and the caller sees [`ErrorKind::Timeout`](crate::error::ErrorKind).
pub async fn run_bounded<F>(timeout: Duration, work: F) -> AcquisitionResult
where
    F: FnOnce() -> AcquisitionResult + Send + 'static,
{
    let task = tokio::task::spawn_blocking(work);
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => {
            warn!(error = %join_err, "Extraction task panicked");
            Err(Failure::malformed(format!("extraction aborted: {join_err}")))
        }
        Err(_) => Err(Failure::timeout(format!(
            "extraction exceeded {}s",
            timeout.as_secs_f32()
        ))),
    }
}

/// Apply the size cap and the minimum-content check shared by all handlers.
pub(crate) fn finish(
    text: &str,
    bytes_consumed: usize,
    pages_consumed: usize,
    limits: &ExtractLimits,
) -> AcquisitionResult {
    let capped = truncate_chars(text, limits.size_cap);
    let usable = non_whitespace_len(capped);
    if usable < limits.min_content {
        return Err(Failure::insufficient(format!(
            "{usable} non-whitespace chars, need {}",
            limits.min_content
        )));
    }
    Ok(Acquired::new(capped.to_string(), bytes_consumed, pages_consumed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn limits(size_cap: usize, min_content: usize) -> ExtractLimits {
        ExtractLimits {
            page_cap: 5,
            size_cap,
            min_content,
        }
    }

    #[test]
    fn test_plain_text_is_capped() {
        let body = "word ".repeat(1000);
        let out = extract(body.as_bytes(), &DocumentFormat::PlainText, &limits(100, 10)).unwrap();
        assert!(out.content.chars().count() <= 100);
        assert_eq!(out.bytes_consumed, body.len());
    }

    #[test]
    fn test_insufficient_content_even_when_decoding_succeeds() {
        let err = extract(b"  tiny  ", &DocumentFormat::PlainText, &limits(100, 50)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InsufficientContent);
    }

    #[test]
    fn test_sniff_format() {
        let target = MarkupTarget::Container("body".into());
        assert!(matches!(sniff_format(b"%PDF-1.7", &target), DocumentFormat::Pdf));
        assert!(matches!(
            sniff_format(b"<!DOCTYPE html><html></html>", &target),
            DocumentFormat::Html(_)
        ));
        assert!(matches!(sniff_format(b"Agenda\nItem 1", &target), DocumentFormat::PlainText));
    }

    #[test]
    fn test_extract_is_idempotent() {
        let html = b"<html><body><main><p>Budget   workshop</p><p>Zoning case Z-12</p></main></body></html>";
        let format = DocumentFormat::Html(MarkupTarget::Container("main".into()));
        let a = extract(html, &format, &limits(1000, 5)).unwrap();
        let b = extract(html, &format, &limits(1000, 5)).unwrap();
        assert_eq!(a.content, b.content);
    }

    #[tokio::test]
    async fn test_extract_bounded_matches_sync() {
        let body = "Consent agenda approved ".repeat(20).into_bytes();
        let sync = extract(&body, &DocumentFormat::PlainText, &limits(200, 10)).unwrap();
        let bounded = extract_bounded(
            body,
            DocumentFormat::PlainText,
            limits(200, 10),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(sync, bounded);
    }
}
