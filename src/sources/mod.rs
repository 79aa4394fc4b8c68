//! Per-source strategy chains.
//!
//! Each logical source gets one immutable [`SourceSpec`] built from the run's
//! [`SourcesConfig`], the optional user-supplied override document, and the
//! optional headless-render capability.
//!
//! # Chains
//!
//! | Source | Strategies, in order |
//! |--------|----------------------|
//! | council | provided-document?, packet-link, portal-listing, rendered-portal? |
//! | school_board | provided-document?, meeting-agenda-link, organization-listing, rendered-organization? |
//! | sports | provided-document?, schedule-listing, web-search, rendered-schedule? |
//!
//! `?` marks strategies that are only present when their input or capability is.

pub mod agenda;
pub mod sports;

use crate::chain::SourceSpec;
use crate::config::SourcesConfig;
use crate::extract::ExtractLimits;
use crate::models::SourceId;
use crate::render::HeadlessBrowser;
use crate::strategies::{Extraction, ProvidedDocument};
use std::collections::HashMap;
use std::error::Error;
use std::path::PathBuf;
use tracing::{debug, instrument};

/// Everything chain construction depends on besides the source itself.
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    pub config: SourcesConfig,
    /// User-supplied documents, keyed by the source they stand in for.
    pub overrides: HashMap<SourceId, PathBuf>,
    /// Present only when a headless browser was found and rendering is enabled.
    pub browser: Option<HeadlessBrowser>,
}

impl BuildContext {
    /// The override strategy for `source`, if the caller supplied a document.
    pub(crate) fn provided_document(
        &self,
        source: SourceId,
        extraction: Extraction,
        limits: ExtractLimits,
    ) -> Option<ProvidedDocument> {
        self.overrides.get(&source).map(|path| ProvidedDocument {
            path: path.clone(),
            extraction,
            limits,
            max_bytes: self.config.max_download_bytes,
            timeouts: self.config.timeouts.clone(),
        })
    }
}

/// Build the chain for one source.
#[instrument(level = "info", skip(ctx))]
pub fn build(source: SourceId, ctx: &BuildContext) -> Result<SourceSpec, Box<dyn Error>> {
    let spec = match source {
        SourceId::Council => agenda::build(source, &ctx.config.council, ctx)?,
        SourceId::SchoolBoard => agenda::build(source, &ctx.config.school_board, ctx)?,
        SourceId::Sports => sports::build(ctx)?,
    };
    debug!(strategies = ?spec.strategy_names(), "Built source chain");
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chains_without_extras() {
        let ctx = BuildContext::default();
        let council = build(SourceId::Council, &ctx).unwrap();
        assert_eq!(council.strategy_names(), vec!["packet-link", "portal-listing"]);
        let board = build(SourceId::SchoolBoard, &ctx).unwrap();
        assert_eq!(board.strategy_names(), vec!["meeting-agenda-link", "organization-listing"]);
        let sports = build(SourceId::Sports, &ctx).unwrap();
        assert_eq!(sports.strategy_names(), vec!["schedule-listing", "web-search"]);
    }

    #[test]
    fn test_override_first_and_render_last() {
        let mut ctx = BuildContext {
            browser: Some(HeadlessBrowser::new("/usr/bin/chromium")),
            ..BuildContext::default()
        };
        ctx.overrides.insert(SourceId::Council, PathBuf::from("packet.pdf"));

        let council = build(SourceId::Council, &ctx).unwrap();
        let names = council.strategy_names();
        assert_eq!(names.first(), Some(&"provided-document"));
        assert_eq!(names.last(), Some(&"rendered-portal"));
        assert_eq!(council.limits.page_cap, 50);

        let sports = build(SourceId::Sports, &ctx).unwrap();
        assert_eq!(
            sports.strategy_names(),
            vec!["schedule-listing", "web-search", "rendered-schedule"]
        );
    }
}
