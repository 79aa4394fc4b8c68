//! Ordered fallback over acquisition strategies.
//!
//! A [`SourceSpec`] lists the ways a source's content can be obtained,
//! cheapest and most reliable first, most manual or expensive last. [`run`]
//! walks that list once: the first strategy that yields content wins and the
//! rest are never invoked. Failures are collected in order and become the
//! only diagnostic surface the caller sees. Content is never combined across
//! strategies, and nothing is retried beyond moving to the next strategy.

use crate::error::{Acquired, AcquisitionResult, AttemptError, Exhausted};
use crate::extract::ExtractLimits;
use crate::models::SourceId;
use crate::utils::truncate_chars;
use async_trait::async_trait;
use std::fmt;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// One concrete method of obtaining a source's content.
///
/// Implementations hold only immutable configuration; calling `attempt`
/// twice must not depend on what the first call did.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Stable name used in logs and diagnostics.
    fn name(&self) -> &str;

    async fn attempt(&self) -> AcquisitionResult;
}

/// Everything needed to acquire one logical source.
pub struct SourceSpec {
    pub source: SourceId,
    pub strategies: Vec<Box<dyn Strategy>>,
    pub limits: ExtractLimits,
}

impl SourceSpec {
    pub fn new(source: SourceId, limits: ExtractLimits) -> Self {
        Self {
            source,
            strategies: Vec::new(),
            limits,
        }
    }

    /// Append a strategy at the lowest priority so far.
    pub fn then(mut self, strategy: impl Strategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Append a strategy only when the capability it needs is present.
    pub fn then_if<S: Strategy + 'static>(self, strategy: Option<S>) -> Self {
        match strategy {
            Some(s) => self.then(s),
            None => self,
        }
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }
}

impl fmt::Debug for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceSpec")
            .field("source", &self.source)
            .field("strategies", &self.strategy_names())
            .field("limits", &self.limits)
            .finish()
    }
}

/// Result of running one chain: content from at most one strategy, plus
/// every failure seen before it (or all of them, on exhaustion).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainOutcome {
    pub source: SourceId,
    pub content: Option<Acquired>,
    pub winner: Option<String>,
    pub errors: Vec<AttemptError>,
}

impl ChainOutcome {
    /// Successful content and the winning strategy's name, or exhaustion.
    pub fn into_result(self) -> Result<(String, Acquired), Exhausted> {
        match (self.content, self.winner) {
            (Some(content), Some(winner)) => Ok((winner, content)),
            _ => Err(Exhausted::new(self.source.as_str(), self.errors)),
        }
    }
}

/// Try each strategy in declared order until one succeeds.
#[instrument(level = "info", skip_all, fields(source = %spec.source))]
pub async fn run(spec: &SourceSpec) -> ChainOutcome {
    let mut errors = Vec::new();

    for strategy in &spec.strategies {
        let name = strategy.name();
        let t0 = Instant::now();
        match strategy.attempt().await {
            Ok(mut acquired) => {
                // Extractors already cap; this keeps the bound for any strategy that doesn't.
                let capped = truncate_chars(&acquired.content, spec.limits.size_cap);
                if capped.len() < acquired.content.len() {
                    acquired.content = capped.to_string();
                }
                info!(
                    strategy = name,
                    chars = acquired.content.chars().count(),
                    bytes = acquired.bytes_consumed,
                    pages = acquired.pages_consumed,
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    failed_before = errors.len(),
                    "Strategy succeeded"
                );
                return ChainOutcome {
                    source: spec.source,
                    content: Some(acquired),
                    winner: Some(name.to_string()),
                    errors,
                };
            }
            Err(failure) => {
                warn!(
                    strategy = name,
                    kind = %failure.kind,
                    detail = %failure.detail,
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "Strategy failed; falling through"
                );
                errors.push(AttemptError::from_failure(name, failure));
            }
        }
    }

    warn!(attempts = errors.len(), "All strategies exhausted");
    ChainOutcome {
        source: spec.source,
        content: None,
        winner: None,
        errors,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::{ErrorKind, Failure};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Strategy returning a fixed outcome and counting its invocations.
    pub(crate) struct Scripted {
        pub name: String,
        pub outcome: AcquisitionResult,
        pub calls: Arc<AtomicUsize>,
    }

    impl Scripted {
        pub(crate) fn ok(name: &str, content: &str) -> Self {
            Self {
                name: name.to_string(),
                outcome: Ok(Acquired::new(content.to_string(), content.len(), 1)),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub(crate) fn fail(name: &str, kind: ErrorKind) -> Self {
            Self {
                name: name.to_string(),
                outcome: Err(Failure::new(kind, format!("{name} failed"))),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl Strategy for Scripted {
        fn name(&self) -> &str {
            &self.name
        }

        async fn attempt(&self) -> AcquisitionResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    fn spec() -> SourceSpec {
        SourceSpec::new(SourceId::Council, ExtractLimits::default())
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let first = Scripted::fail("direct", ErrorKind::Timeout);
        let second = Scripted::ok("indirect", "agenda text");
        let third = Scripted::ok("rendered", "never used");
        let (c1, c2, c3) = (first.calls.clone(), second.calls.clone(), third.calls.clone());

        let outcome = run(&spec().then(first).then(second).then(third)).await;

        assert_eq!(c1.load(Ordering::SeqCst), 1);
        assert_eq!(c2.load(Ordering::SeqCst), 1);
        assert_eq!(c3.load(Ordering::SeqCst), 0);
        assert_eq!(outcome.winner.as_deref(), Some("indirect"));
        assert_eq!(outcome.content.unwrap().content, "agenda text");
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].kind, ErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_errors_in_order() {
        let outcome = run(&spec()
            .then(Scripted::fail("a", ErrorKind::Network))
            .then(Scripted::fail("b", ErrorKind::HttpStatus(500)))
            .then(Scripted::fail("c", ErrorKind::InsufficientContent)))
        .await;

        assert!(outcome.content.is_none());
        let names: Vec<_> = outcome.errors.iter().map(|e| e.strategy.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(outcome.errors[1].kind, ErrorKind::HttpStatus(500));

        let exhausted = outcome.into_result().unwrap_err();
        assert_eq!(exhausted.kind, ErrorKind::ExhaustedStrategies);
        assert_eq!(exhausted.errors.len(), 3);
        assert_eq!(exhausted.source_id, "council");
    }

    #[tokio::test]
    async fn test_empty_chain_is_exhausted() {
        let outcome = run(&spec()).await;
        assert!(outcome.content.is_none());
        assert!(outcome.errors.is_empty());
        assert!(outcome.into_result().is_err());
    }

    #[tokio::test]
    async fn test_oversized_success_is_clamped() {
        let limits = ExtractLimits {
            size_cap: 10,
            ..ExtractLimits::default()
        };
        let spec = SourceSpec::new(SourceId::Sports, limits).then(Scripted::ok("raw", &"x".repeat(50)));
        let (winner, acquired) = run(&spec).await.into_result().unwrap();
        assert_eq!(winner, "raw");
        assert_eq!(acquired.content.len(), 10);
    }

    #[test]
    fn test_then_if_omits_missing_capability() {
        let spec = spec()
            .then(Scripted::ok("a", "x"))
            .then_if(None::<Scripted>)
            .then_if(Some(Scripted::ok("b", "y")));
        assert_eq!(spec.strategy_names(), vec!["a", "b"]);
    }
}
