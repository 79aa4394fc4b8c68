//! Section summaries from an OpenAI-compatible LLM.
//!
//! [`LlmSummarizer`] picks the chat template for each section's source and
//! sends the extracted content through [`SectionAsk`], wrapped in
//! [`RetryAsk`] for backoff. A template is read from the `awful_aj` template
//! directory when one with the source's name exists; otherwise the copy
//! built into the binary (`templates/*.yaml`) is used, so a fresh install
//! still gets the per-section prompts.
//!
//! # Retry Strategy
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
//! ```
//!
//! The default [`RetryPolicy`] allows 5 retries starting at 1 second, capped at 30 seconds.

use crate::models::SourceId;
use crate::utils::truncate_for_log;
use awful_aj::api::ask;
use awful_aj::{config, config_dir, config::AwfulJadeConfig, template, template::ChatTemplate};
use rand::{Rng, rng};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Trait for async LLM interaction.
///
/// Implemented by the `awful_aj` call itself and by decorators such as [`RetryAsk`].
pub trait AskAsync {
    type Response;

    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>>;
}

/// How often and how patiently a failed request is repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub base_delay: StdDuration,
    pub max_delay: StdDuration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: StdDuration::from_secs(1),
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based), without jitter.
    pub fn delay(&self, attempt: usize) -> StdDuration {
        let exponent = attempt.saturating_sub(1).min(31) as u32;
        self.base_delay.saturating_mul(1u32 << exponent).min(self.max_delay)
    }
}

/// Decorator adding exponential backoff to any [`AskAsync`] implementation.
pub struct RetryAsk<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk").field("policy", &self.policy).finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync + fmt::Debug,
{
    type Response = T::Response;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            let e = match self.inner.ask(text).await {
                Ok(resp) => return Ok(resp),
                Err(e) => e,
            };
            attempt += 1;
            let attempt_ms = attempt_t0.elapsed().as_millis() as u64;
            let total_ms = total_t0.elapsed().as_millis() as u64;

            if attempt > self.policy.max_retries {
                error!(
                    attempt,
                    max = self.policy.max_retries,
                    attempt_ms,
                    total_ms,
                    error = %e,
                    "LLM request still failing; giving up"
                );
                return Err(e);
            }

            let jitter_ms: u64 = rng().random_range(0..=250);
            let delay = self.policy.delay(attempt) + StdDuration::from_millis(jitter_ms);
            warn!(
                attempt,
                max = self.policy.max_retries,
                attempt_ms,
                total_ms,
                ?delay,
                error = %e,
                "LLM request failed; backing off"
            );
            sleep(delay).await;
        }
    }
}

/// One `awful_aj` chat call for one section's source.
pub struct SectionAsk<'a> {
    pub config: &'a AwfulJadeConfig,
    pub template: &'a ChatTemplate,
    pub source: SourceId,
}

impl fmt::Debug for SectionAsk<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionAsk").field("source", &self.source).finish()
    }
}

impl AskAsync for SectionAsk<'_> {
    type Response = String;

    #[instrument(level = "info", skip_all, fields(source = %self.source))]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let t0 = Instant::now();
        let res = ask(self.config, text.to_string(), self.template, None, None).await;
        if let Err(e) = &res {
            warn!(elapsed_ms = t0.elapsed().as_millis() as u64, error = %e, "LLM request failed");
        }
        res
    }
}

/// YAML of the template built into the binary for `source`.
fn builtin_template_yaml(source: SourceId) -> &'static str {
    match source {
        SourceId::Council => include_str!("../templates/sachse_city_council.yaml"),
        SourceId::SchoolBoard => include_str!("../templates/sachse_school_board.yaml"),
        SourceId::Sports => include_str!("../templates/sachse_sports.yaml"),
    }
}

/// The chat template built into the binary for `source`.
pub fn builtin_template(source: SourceId) -> Result<ChatTemplate, serde_yaml::Error> {
    serde_yaml::from_str(builtin_template_yaml(source))
}

/// The user's `awful_aj` template named after `source`, else the built-in one.
#[instrument(level = "info")]
pub async fn resolve_template(source: SourceId) -> Result<ChatTemplate, Box<dyn Error>> {
    let name = source.template_name();
    match template::load_template(name).await {
        Ok(loaded) => {
            info!(template = name, "Loaded template");
            Ok(loaded)
        }
        Err(e) => {
            info!(template = name, reason = %e, "No installed template; using built-in prompt");
            Ok(builtin_template(source)?)
        }
    }
}

/// Turns one source's extracted content into the text of its digest section.
pub trait Summarize {
    async fn summarize(&self, source: SourceId, content: &str) -> Result<String, Box<dyn Error>>;
}

/// Strip surrounding whitespace and a Markdown code fence the model sometimes
/// wraps its answer in. Empty answers are errors.
pub fn clean_summary(raw: &str) -> Result<String, Box<dyn Error>> {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
        text = rest.strip_suffix("```").unwrap_or(rest).trim();
    }
    if text.is_empty() {
        return Err("model returned an empty summary".into());
    }
    Ok(text.to_string())
}

/// [`Summarize`] backed by `awful_aj`, one chat template per source.
pub struct LlmSummarizer {
    config: AwfulJadeConfig,
    templates: HashMap<SourceId, ChatTemplate>,
    retry: RetryPolicy,
}

impl fmt::Debug for LlmSummarizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSummarizer")
            .field("templates", &self.templates.keys().collect::<Vec<_>>())
            .field("retry", &self.retry)
            .finish()
    }
}

impl LlmSummarizer {
    /// Load the `awful_aj` configuration and a template for each of `sources`.
    ///
    /// `config_path` defaults to `config.yaml` in the `awful_aj` config directory.
    #[instrument(level = "info", skip(sources))]
    pub async fn load(sources: &[SourceId], config_path: Option<&str>) -> Result<Self, Box<dyn Error>> {
        let config_path = match config_path {
            Some(path) => path.to_string(),
            None => config_dir()?
                .join("config.yaml")
                .to_str()
                .ok_or("Not a valid config filename")?
                .to_string(),
        };
        let config = config::load_config(&config_path)?;
        info!(%config_path, "Loaded configuration");

        let mut templates = HashMap::new();
        for source in sources {
            templates.insert(*source, resolve_template(*source).await?);
        }
        Ok(Self {
            config,
            templates,
            retry: RetryPolicy::default(),
        })
    }
}

impl Summarize for LlmSummarizer {
    #[instrument(level = "info", skip(self, content), fields(chars = content.len()))]
    async fn summarize(&self, source: SourceId, content: &str) -> Result<String, Box<dyn Error>> {
        let template = self
            .templates
            .get(&source)
            .ok_or_else(|| format!("no template loaded for {source}"))?;
        let t0 = Instant::now();
        let api = RetryAsk::new(
            SectionAsk {
                config: &self.config,
                template,
                source,
            },
            self.retry,
        );
        let response = match api.ask(content).await {
            Ok(response) => response,
            Err(e) => {
                error!(elapsed_ms_total = t0.elapsed().as_millis() as u64, error = %e, "Summary request failed");
                return Err(e);
            }
        };
        info!(elapsed_ms_total = t0.elapsed().as_millis() as u64, "Summary received");
        debug!(response_preview = %truncate_for_log(&response, 300), "Model response");
        clean_summary(&response)
    }
}

/// Passes extracted content through untouched, for runs without an LLM.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Summarize for Passthrough {
    async fn summarize(&self, _source: SourceId, content: &str) -> Result<String, Box<dyn Error>> {
        clean_summary(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Flaky {
        failures: usize,
        calls: AtomicUsize,
    }

    impl AskAsync for Flaky {
        type Response = String;

        async fn ask(&self, text: &str) -> Result<String, Box<dyn Error>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(format!("transient failure {n}").into())
            } else {
                Ok(text.to_uppercase())
            }
        }
    }

    fn fast_retries(max_retries: usize) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: StdDuration::from_millis(1),
            ..RetryPolicy::default()
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_after_transient_failures() {
        let api = RetryAsk::new(
            Flaky {
                failures: 2,
                calls: AtomicUsize::new(0),
            },
            fast_retries(5),
        );
        assert_eq!(api.ask("agenda").await.unwrap(), "AGENDA");
        assert_eq!(api.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_retries() {
        let api = RetryAsk::new(
            Flaky {
                failures: usize::MAX,
                calls: AtomicUsize::new(0),
            },
            fast_retries(2),
        );
        assert!(api.ask("agenda").await.is_err());
        assert_eq!(api.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_clean_summary_strips_fence() {
        assert_eq!(
            clean_summary("```markdown\n- Budget adopted\n```").unwrap(),
            "- Budget adopted"
        );
        assert_eq!(clean_summary("  plain  ").unwrap(), "plain");
        assert!(clean_summary("``` ```").is_err());
        assert!(clean_summary("   ").is_err());
    }

    #[tokio::test]
    async fn test_passthrough_keeps_content() {
        let text = Passthrough.summarize(SourceId::Sports, "- Football: W 35-14\n").await.unwrap();
        assert_eq!(text, "- Football: W 35-14");
    }

    #[test]
    fn test_backoff_doubles_until_cap() {
        let policy = RetryPolicy::default();
        let secs = (1..=7).map(|n| policy.delay(n).as_secs()).collect::<Vec<_>>();
        assert_eq!(secs, vec![1, 2, 4, 8, 16, 30, 30]);
        assert_eq!(policy.delay(200), StdDuration::from_secs(30));
    }

    #[test]
    fn test_builtin_templates_carry_section_prompts() {
        let focus = [
            (SourceId::Council, "City Hall Updates", "Zoning changes"),
            (SourceId::SchoolBoard, "School Board Updates", "Bond projects"),
            (SourceId::Sports, "Mustang Sports Minute", "Upcoming important games"),
        ];
        for (source, heading, topic) in focus {
            let yaml: serde_yaml::Value = serde_yaml::from_str(builtin_template_yaml(source)).unwrap();
            let prompt = yaml["system_prompt"].as_str().unwrap();
            assert!(prompt.starts_with("You are a professional local news writer"), "{source}");
            assert!(prompt.contains(heading), "{source}");
            assert!(prompt.contains(topic), "{source}");
            assert!(builtin_template(source).is_ok(), "{source}");
        }
    }
}
