//! Meeting-portal sources (city council, school board).
//!
//! Both portals publish a listing page that links, directly or through a
//! meeting page, to the agenda document. The chain prefers following those
//! links to the document itself, falls back to the listing text, and renders
//! the listing in a browser as a last resort.

use super::BuildContext;
use crate::chain::SourceSpec;
use crate::config::AgendaSourceConfig;
use crate::extract::MarkupTarget;
use crate::fetch::DocumentFetcher;
use crate::models::SourceId;
use crate::strategies::{Extraction, LinkTrail, PageText, RenderedPage};
use std::error::Error;
use std::sync::Arc;

/// Strategy names for a portal: (link trail, listing text, rendered listing).
fn names(source: SourceId) -> (&'static str, &'static str, &'static str) {
    match source {
        SourceId::SchoolBoard => ("meeting-agenda-link", "organization-listing", "rendered-organization"),
        _ => ("packet-link", "portal-listing", "rendered-portal"),
    }
}

pub fn build(source: SourceId, settings: &AgendaSourceConfig, ctx: &BuildContext) -> Result<SourceSpec, Box<dyn Error>> {
    let (trail_name, listing_name, rendered_name) = names(source);
    let fetcher = Arc::new(DocumentFetcher::new(&settings.base_url, ctx.config.max_download_bytes)?);
    let listing = MarkupTarget::Container(settings.listing_container.clone());
    let timeouts = ctx.config.timeouts.clone();
    let limits = settings.limits;

    let rendered = match &ctx.browser {
        Some(browser) => Some(RenderedPage {
            name: rendered_name.to_string(),
            browser: browser.clone(),
            url: fetcher.resolve(&settings.start_path)?.to_string(),
            extraction: Extraction::Markup(listing.clone()),
            limits,
            max_bytes: ctx.config.max_download_bytes,
            timeouts: timeouts.clone(),
        }),
        None => None,
    };

    let spec = SourceSpec::new(source, limits)
        .then_if(ctx.provided_document(source, Extraction::Markup(listing.clone()), limits))
        .then(LinkTrail {
            name: trail_name.to_string(),
            fetcher: fetcher.clone(),
            start: settings.start_path.clone(),
            hops: settings.hops.clone(),
            document: settings.document,
            target: listing.clone(),
            limits,
            timeouts: timeouts.clone(),
        })
        .then(PageText {
            name: listing_name.to_string(),
            fetcher,
            path: settings.start_path.clone(),
            target: listing,
            limits,
            timeouts,
        })
        .then_if(rendered);

    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::run;
    use crate::config::{SourcesConfig, TimeoutConfig};
    use crate::error::ErrorKind;
    use crate::extract::{ExtractLimits, LinkMatcher};
    use crate::fetch::Expect;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(base: &str) -> AgendaSourceConfig {
        AgendaSourceConfig {
            base_url: base.to_string(),
            start_path: "/".into(),
            hops: vec![LinkMatcher::text(&["Packet"]).within("tr.meeting-row", Some("City Council"))],
            document: Expect::Pdf,
            listing_container: "table".into(),
            limits: ExtractLimits {
                page_cap: 5,
                size_cap: 2_000,
                min_content: 10,
            },
        }
    }

    fn ctx() -> BuildContext {
        BuildContext {
            config: SourcesConfig {
                timeouts: TimeoutConfig {
                    page_secs: 5,
                    document_secs: 5,
                    decode_secs: 5,
                    render_secs: 5,
                },
                ..SourcesConfig::default()
            },
            ..BuildContext::default()
        }
    }

    #[tokio::test]
    async fn test_falls_back_to_listing_when_packet_is_not_pdf() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"<html><body><table><tr class="meeting-row">
                   <td class="meeting-title">City Council Regular Session</td>
                   <td><a href="/packet">Agenda Packet</a></td></tr></table></body></html>"#,
                "text/html",
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/packet"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<html>Sign in</html>", "text/html"))
            .mount(&server)
            .await;

        let spec = build(SourceId::Council, &settings(&server.uri()), &ctx()).unwrap();
        let outcome = run(&spec).await;

        assert_eq!(outcome.winner.as_deref(), Some("portal-listing"));
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].strategy, "packet-link");
        assert_eq!(outcome.errors[0].kind, ErrorKind::InvalidContentType);
        let content = outcome.content.unwrap().content;
        assert!(content.contains("City Council Regular Session"));
    }

    #[tokio::test]
    async fn test_unreachable_portal_exhausts_chain() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let spec = build(SourceId::Council, &settings(&server.uri()), &ctx()).unwrap();
        let exhausted = run(&spec).await.into_result().unwrap_err();
        assert_eq!(exhausted.kind, ErrorKind::ExhaustedStrategies);
        assert_eq!(exhausted.errors.len(), 2);
        assert!(exhausted.errors.iter().all(|e| e.kind == ErrorKind::HttpStatus(500)));
    }
}
