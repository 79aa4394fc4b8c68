//! Sports source.
//!
//! The schedule site has no structured feed, so its listing page is
//! flattened to lines and run through the schedule classifier. When that
//! yields nothing, search-result snippets about recent games stand in. A
//! user-supplied schedule or results document goes through the same
//! classifier.

use super::BuildContext;
use crate::chain::SourceSpec;
use crate::classifier::ScheduleLineClassifier;
use crate::fetch::DocumentFetcher;
use crate::models::SourceId;
use crate::strategies::{Extraction, RenderedPage, ScheduleListing, SearchSnippets};
use std::error::Error;
use std::sync::Arc;

pub fn build(ctx: &BuildContext) -> Result<SourceSpec, Box<dyn Error>> {
    let settings = &ctx.config.sports;
    let max_bytes = ctx.config.max_download_bytes;
    let timeouts = ctx.config.timeouts.clone();
    let limits = settings.limits;

    let classifier = Arc::new(ScheduleLineClassifier::new(settings.classifier.clone())?);
    let site = Arc::new(DocumentFetcher::new(&settings.base_url, max_bytes)?);
    let search = Arc::new(DocumentFetcher::new(&settings.search.base_url, max_bytes)?);
    let schedule = Extraction::Schedule {
        container: settings.container.clone(),
        classifier: classifier.clone(),
    };

    let rendered = match &ctx.browser {
        Some(browser) => Some(RenderedPage {
            name: "rendered-schedule".into(),
            browser: browser.clone(),
            url: site.resolve(&settings.schedule_path)?.to_string(),
            extraction: schedule.clone(),
            limits,
            max_bytes,
            timeouts: timeouts.clone(),
        }),
        None => None,
    };

    let spec = SourceSpec::new(SourceId::Sports, limits)
        .then_if(ctx.provided_document(SourceId::Sports, schedule, limits))
        .then(ScheduleListing {
            fetcher: site,
            path: settings.schedule_path.clone(),
            container: settings.container.clone(),
            classifier,
            limits,
            timeouts: timeouts.clone(),
        })
        .then(SearchSnippets {
            fetcher: search,
            query: settings.search.query.clone(),
            max_results: settings.search.max_results,
            limits,
            timeouts,
        })
        .then_if(rendered);

    Ok(spec)
}
