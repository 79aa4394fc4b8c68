//! Optional headless-browser rendering.
//!
//! Some portals only fill in their listings client-side. When a Chromium
//! binary is available, the most expensive fallback in each chain renders the
//! page with `--dump-dom` and hands the resulting markup to the normal
//! extractors. Availability is detected once at startup and passed into
//! source construction; chains built without it simply omit the strategy.

use crate::error::{Acquired, AcquisitionResult, Failure};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Environment variable naming an explicit browser binary.
pub const BROWSER_ENV: &str = "SACHSE_CHROMIUM_PATH";

const CANDIDATES: &[&str] = &["chromium", "chromium-browser", "google-chrome", "google-chrome-stable", "chrome"];

/// A located headless-capable browser binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessBrowser {
    binary: PathBuf,
}

impl HeadlessBrowser {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into() }
    }

    /// Find a browser via `SACHSE_CHROMIUM_PATH`, then the `PATH`.
    pub fn detect() -> Option<Self> {
        if let Ok(p) = std::env::var(BROWSER_ENV) {
            let path = PathBuf::from(&p);
            if path.exists() {
                return Some(Self::new(path));
            }
            warn!(path = %p, "{BROWSER_ENV} does not exist; searching PATH");
        }
        let found = CANDIDATES.iter().find_map(|name| which::which(name).ok()).map(Self::new);
        match &found {
            Some(b) => info!(binary = %b.binary.display(), "Headless renderer available"),
            None => info!("No headless browser found; rendered fallbacks disabled"),
        }
        found
    }

    /// Render `url` and return the serialized DOM.
    ///
    /// The child is killed when the timeout elapses.
    #[instrument(level = "info", skip(self, timeout))]
    pub async fn dump_dom(&self, url: &str, timeout: Duration, max_bytes: usize) -> AcquisitionResult<Vec<u8>> {
        let child = Command::new(&self.binary)
            .args(["--headless=new", "--disable-gpu", "--hide-scrollbars", "--dump-dom", url])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Failure::network(format!("cannot launch {}: {e}", self.binary.display())))?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(Failure::network(format!("renderer I/O error: {e}"))),
            Err(_) => {
                return Err(Failure::timeout(format!(
                    "rendering {url} exceeded {}s",
                    timeout.as_secs()
                )));
            }
        };

        if !output.status.success() {
            return Err(Failure::network(format!("renderer exited with {}", output.status)));
        }
        if output.stdout.len() > max_bytes {
            return Err(Failure::malformed(format!("rendered DOM exceeds {max_bytes} bytes")));
        }
        if output.stdout.iter().all(u8::is_ascii_whitespace) {
            return Err(Failure::insufficient("renderer produced an empty DOM"));
        }

        debug!(bytes = output.stdout.len(), "Rendered page");
        let len = output.stdout.len();
        Ok(Acquired::new(output.stdout, len, 0))
    }
}
