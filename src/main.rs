//! # Sachse Digest
//!
//! Builds the "Sachse Weekly Newsletter" from three public sources that
//! publish no structured feed: the city council meeting portal, the school
//! board's meeting site and a high-school sports schedule page.
//!
//! ## Usage
//!
//! ```sh
//! sachse_digest -o ./newsletter
//! ```
//!
//! ## Architecture
//!
//! 1. **Chains**: each source has an ordered list of acquisition strategies
//!    (direct document links, listing text, search snippets, headless render)
//! 2. **Acquisition**: chains run concurrently; the first strategy to yield
//!    enough text wins, every failure is recorded
//! 3. **Summarization**: extracted text goes to an OpenAI-compatible LLM,
//!    one template per source
//! 4. **Output**: a Markdown newsletter, and optionally a JSON digest

use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod chain;
mod classifier;
mod cli;
mod config;
mod digest;
mod error;
mod extract;
mod fetch;
mod models;
mod outputs;
mod render;
mod sources;
mod strategies;
mod utils;

use api::{LlmSummarizer, Passthrough};
use cli::Cli;
use config::SourcesConfig;
use outputs::{json, markdown};
use render::HeadlessBrowser;
use sources::BuildContext;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("sachse_digest starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // Early check: ensure output dir is writable
    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Build source chains ----
    let browser = if args.no_render {
        info!("Headless rendering disabled");
        None
    } else {
        HeadlessBrowser::detect()
    };
    let ctx = BuildContext {
        config: SourcesConfig::load(args.sources_config.as_deref())?,
        overrides: args.overrides(),
        browser,
    };
    let enabled = args.sources();
    let specs = enabled
        .iter()
        .map(|source| sources::build(*source, &ctx))
        .collect::<Result<Vec<_>, _>>()?;
    info!(sources = ?enabled, "Source chains ready");

    // ---- Acquire and summarize ----
    let digest = if args.raw {
        info!("Summarization disabled; using extracted text");
        digest::assemble(&specs, &Passthrough, Local::now()).await
    } else {
        let summarizer = LlmSummarizer::load(&enabled, args.config.as_deref()).await?;
        digest::assemble(&specs, &summarizer, Local::now()).await
    };

    // ---- Output ----
    let path = markdown::write_newsletter(&digest, Path::new(&args.output_dir), args.diagnostics).await?;
    info!(path = %path.display(), "Newsletter ready");

    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = json::write_digest(&digest, Path::new(dir)).await {
            error!(error = %e, "Failed to write JSON digest");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
