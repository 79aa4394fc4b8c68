//! Bounded single-shot document retrieval.
//!
//! [`DocumentFetcher`] performs exactly one GET per call, with a connect
//! timeout, a whole-request timeout and a download size bound. Outcomes are
//! classified into [`ErrorKind`] values and returned as data; nothing here
//! retries, and nothing here touches shared state.
//!
//! Each logical source owns a fetcher bound to its base origin so that
//! source-relative links (`/Meeting/123/Packet`) can be resolved before use.

use crate::error::{Acquired, AcquisitionResult, ErrorKind, Failure};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

/// User-Agent string identifying this digest builder
const USER_AGENT: &str = concat!("sachse_digest/", env!("CARGO_PKG_VERSION"));

/// Connect timeout applied to every request
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const PDF_MAGIC: &[u8] = b"%PDF-";

/// What kind of payload the caller is prepared to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expect {
    Any,
    Html,
    Pdf,
}

/// Returns true when the payload starts with the PDF header.
pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}

/// Bounded HTTP fetcher bound to one source's base origin.
#[derive(Debug, Clone)]
pub struct DocumentFetcher {
    client: Client,
    base: Url,
    max_bytes: usize,
}

impl DocumentFetcher {
    /// Build a fetcher for `base` with its own HTTP client.
    pub fn new(base: &str, max_bytes: usize) -> Result<Self, Box<dyn Error>> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base: Url::parse(base)?,
            max_bytes,
        })
    }

    /// Resolve an absolute URL or a path relative to the base origin.
    pub fn resolve(&self, target: &str) -> Result<Url, Failure> {
        let target = target.trim();
        match Url::parse(target) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
            Ok(url) => Err(Failure::malformed(format!(
                "unsupported scheme `{}` in {target}",
                url.scheme()
            ))),
            Err(url::ParseError::RelativeUrlWithoutBase) => self
                .base
                .join(target)
                .map_err(|e| Failure::malformed(format!("cannot resolve {target}: {e}"))),
            Err(e) => Err(Failure::malformed(format!("invalid url {target}: {e}"))),
        }
    }

    /// Fetch raw bytes and check that they are of the expected kind.
    #[instrument(level = "info", skip(self, timeout), fields(base = %self.base))]
    pub async fn fetch(
        &self,
        target: &str,
        timeout: Duration,
        expect: Expect,
    ) -> AcquisitionResult<Vec<u8>> {
        let url = self.resolve(target)?;

        let mut response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "Non-success HTTP status");
            return Err(Failure::new(
                ErrorKind::HttpStatus(status.as_u16()),
                format!("GET {url} returned {status}"),
            ));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| classify(&url, e))? {
            if body.len() + chunk.len() > self.max_bytes {
                warn!(%url, max_bytes = self.max_bytes, "Payload exceeds download bound");
                return Err(Failure::malformed(format!(
                    "payload from {url} exceeds {} bytes",
                    self.max_bytes
                )));
            }
            body.extend_from_slice(&chunk);
        }

        check_expectation(&url, &content_type, &body, expect)?;

        debug!(%url, bytes = body.len(), %content_type, "Fetched document");
        let len = body.len();
        Ok(Acquired::new(body, len, 0))
    }
}

fn check_expectation(url: &Url, content_type: &str, body: &[u8], expect: Expect) -> Result<(), Failure> {
    let ok = match expect {
        Expect::Any => true,
        Expect::Pdf => is_pdf(body) || content_type.contains("application/pdf"),
        Expect::Html => {
            !is_pdf(body) && (content_type.is_empty() || content_type.contains("html"))
        }
    };
    if ok {
        Ok(())
    } else {
        Err(Failure::invalid_content_type(format!(
            "expected {expect:?} from {url}, got `{}`",
            if content_type.is_empty() { "<none>" } else { content_type }
        )))
    }
}

fn classify(url: &Url, e: reqwest::Error) -> Failure {
    if e.is_timeout() {
        Failure::timeout(format!("GET {url}: {e}"))
    } else {
        Failure::network(format!("GET {url}: {e}"))
    }
}
