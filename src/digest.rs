//! Digest assembly.
//!
//! Runs every enabled source's chain concurrently, hands each extracted
//! document to the summarizer and lays the sections out in the fixed source
//! order. Every enabled source yields exactly one section: exhaustion and
//! summarizer errors become placeholders, never a missing section.

use crate::api::Summarize;
use crate::chain::{SourceSpec, run};
use crate::models::{Digest, Section, SectionBody, SourceId};
use chrono::{DateTime, Local};
use futures::future::join_all;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

/// Shown when a summary could not be produced from acquired content.
pub fn summary_placeholder(source: SourceId) -> &'static str {
    match source {
        SourceId::Sports => "*Unable to generate sports report at this time.*",
        _ => "*Unable to generate summary at this time.*",
    }
}

/// Shown when no strategy produced content for `source`.
pub fn retrieval_placeholder(source: SourceId) -> String {
    format!(
        "*Could not retrieve {} data. Please check back later.*",
        source.display_name()
    )
}

/// Acquire and summarize one source.
#[instrument(level = "info", skip_all, fields(source = %spec.source))]
pub async fn build_section<S: Summarize>(spec: &SourceSpec, summarizer: &S) -> Section {
    let source = spec.source;
    let body = match run(spec).await.into_result() {
        Ok((strategy, acquired)) => match summarizer.summarize(source, &acquired.content).await {
            Ok(text) => {
                info!(%strategy, summary_chars = text.len(), "Section summarized");
                SectionBody::Summary { text, strategy }
            }
            Err(e) => {
                error!(%strategy, error = %e, "Summarizer failed");
                SectionBody::Placeholder {
                    text: summary_placeholder(source).to_string(),
                    diagnostics: Some(format!("[summarizer] {e}")),
                }
            }
        },
        Err(exhausted) => {
            warn!(error = %exhausted, "Source unavailable");
            SectionBody::Placeholder {
                text: retrieval_placeholder(source),
                diagnostics: Some(exhausted.diagnostics()),
            }
        }
    };
    Section {
        source,
        title: source.section_title().to_string(),
        body,
    }
}

/// Build the whole digest. Sections follow the order of `specs`.
#[instrument(level = "info", skip_all, fields(sources = specs.len()))]
pub async fn assemble<S: Summarize>(specs: &[SourceSpec], summarizer: &S, now: DateTime<Local>) -> Digest {
    let t0 = Instant::now();
    let sections = join_all(specs.iter().map(|spec| build_section(spec, summarizer))).await;

    let summarized = sections
        .iter()
        .filter(|s| matches!(s.body, SectionBody::Summary { .. }))
        .count();
    info!(
        summarized,
        placeholders = sections.len() - summarized,
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Digest assembled"
    );

    Digest {
        local_date: now.format("%Y-%m-%d").to_string(),
        display_date: now.format("%B %d, %Y").to_string(),
        sections,
    }
}
