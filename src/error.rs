//! Acquisition outcome and failure taxonomy.
//!
//! Every step of the content-acquisition core (fetching, extracting, running a
//! strategy) reports its outcome as an [`AcquisitionResult`]. Failures are
//! plain data: they are never raised past a strategy boundary, and the chain
//! runner only ever surfaces [`Exhausted`] to its caller.
//!
//! | Kind | Raised by | Recovered by |
//! |------|-----------|--------------|
//! | `Network` | fetcher | next strategy |
//! | `Timeout` | fetcher, extractor, renderer | next strategy |
//! | `HttpStatus(code)` | fetcher | next strategy |
//! | `InvalidContentType` | fetcher | next strategy |
//! | `Malformed` | extractor, fetcher (oversized body) | next strategy |
//! | `InsufficientContent` | extractor, schedule strategies | next strategy |
//! | `ExhaustedStrategies` | chain runner | caller (placeholder section) |

use std::fmt;
use thiserror::Error;

/// Classification of why an acquisition attempt produced no content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// Connection, DNS, TLS or body-read failure.
    #[error("network error")]
    Network,
    /// A fetch, decode or render exceeded its time budget.
    #[error("timed out")]
    Timeout,
    /// The server answered with a non-2xx status.
    #[error("HTTP status {0}")]
    HttpStatus(u16),
    /// The payload is not of the kind the strategy asked for.
    #[error("invalid content type")]
    InvalidContentType,
    /// The container could not be decoded.
    #[error("malformed document")]
    Malformed,
    /// Decoding succeeded but yielded too little usable text.
    #[error("insufficient content")]
    InsufficientContent,
    /// Chain-level: every strategy failed.
    #[error("all strategies exhausted")]
    ExhaustedStrategies,
}

/// Successful acquisition payload along with what it cost to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acquired<T = String> {
    pub content: T,
    pub bytes_consumed: usize,
    pub pages_consumed: usize,
}

impl<T> Acquired<T> {
    pub fn new(content: T, bytes_consumed: usize, pages_consumed: usize) -> Self {
        Self {
            content,
            bytes_consumed,
            pages_consumed,
        }
    }
}

/// A single failed attempt, before the chain attributes it to a strategy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {detail}")]
pub struct Failure {
    pub kind: ErrorKind,
    pub detail: String,
}

impl Failure {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn network(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, detail)
    }

    pub fn timeout(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, detail)
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Malformed, detail)
    }

    pub fn insufficient(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::InsufficientContent, detail)
    }

    pub fn invalid_content_type(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidContentType, detail)
    }
}

/// Outcome of one fetch, extraction or strategy attempt.
pub type AcquisitionResult<T = String> = Result<Acquired<T>, Failure>;

/// A failure recorded by the chain runner, attributed to the strategy that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptError {
    pub strategy: String,
    pub kind: ErrorKind,
    pub detail: String,
}

impl AttemptError {
    pub fn from_failure(strategy: &str, failure: Failure) -> Self {
        Self {
            strategy: strategy.to_string(),
            kind: failure.kind,
            detail: failure.detail,
        }
    }
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.strategy, self.kind, self.detail)
    }
}

/// Chain-level failure: no strategy produced content.
///
/// Carries the ordered per-strategy failures as the only diagnostic surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{source_id}: {kind} after {} attempt(s)", .errors.len())]
pub struct Exhausted {
    pub source_id: String,
    pub kind: ErrorKind,
    pub errors: Vec<AttemptError>,
}

impl Exhausted {
    pub fn new(source_id: impl Into<String>, errors: Vec<AttemptError>) -> Self {
        Self {
            source_id: source_id.into(),
            kind: ErrorKind::ExhaustedStrategies,
            errors,
        }
    }

    /// Multi-line diagnostic text, one line per failed strategy.
    pub fn diagnostics(&self) -> String {
        if self.errors.is_empty() {
            return "no strategies configured".to_string();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::HttpStatus(404).to_string(), "HTTP status 404");
        assert_eq!(ErrorKind::Timeout.to_string(), "timed out");
    }

    #[test]
    fn test_attempt_error_carries_strategy_name() {
        let err = AttemptError::from_failure("packet", Failure::malformed("bad xref"));
        assert_eq!(err.strategy, "packet");
        assert_eq!(err.kind, ErrorKind::Malformed);
        assert_eq!(err.to_string(), "[packet] malformed document: bad xref");
    }

    #[test]
    fn test_exhausted_diagnostics_in_order() {
        let ex = Exhausted::new(
            "council",
            vec![
                AttemptError::from_failure("a", Failure::timeout("30s")),
                AttemptError::from_failure("b", Failure::new(ErrorKind::HttpStatus(503), "GET /")),
            ],
        );
        assert_eq!(ex.kind, ErrorKind::ExhaustedStrategies);
        let diag = ex.diagnostics();
        let lines: Vec<_> = diag.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("[a]"));
        assert!(lines[1].contains("HTTP status 503"));
    }
}
