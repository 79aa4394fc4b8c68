//! Source settings: URLs, link heuristics, caps and timeouts.
//!
//! The portals change markup between revisions, and the thresholds that work
//! for one revision (minimum usable text, section markers) do not always work
//! for the next. Everything heuristic lives here, with defaults matching the
//! live sites, and can be overridden from a YAML file:
//!
//! ```yaml
//! timeouts:
//!   page_secs: 20
//! sports:
//!   limits: { page_cap: 1, size_cap: 6000, min_content: 30 }
//!   classifier:
//!     start_marker: "Recent Scores"
//!     end_markers: ["Upcoming Events"]
//! ```

use crate::classifier::ClassifierConfig;
use crate::extract::{ExtractLimits, LinkMatcher};
use crate::fetch::Expect;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::time::Duration;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Listing and meeting pages.
    pub page_secs: u64,
    /// Agenda packets and other documents.
    pub document_secs: u64,
    /// PDF/markup decoding.
    pub decode_secs: u64,
    /// Headless rendering.
    pub render_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            page_secs: 30,
            document_secs: 60,
            decode_secs: 30,
            render_secs: 45,
        }
    }
}

impl TimeoutConfig {
    pub fn page(&self) -> Duration {
        Duration::from_secs(self.page_secs)
    }

    pub fn document(&self) -> Duration {
        Duration::from_secs(self.document_secs)
    }

    pub fn decode(&self) -> Duration {
        Duration::from_secs(self.decode_secs)
    }

    pub fn render(&self) -> Duration {
        Duration::from_secs(self.render_secs)
    }
}

/// A meeting portal whose agenda is reached by following links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgendaSourceConfig {
    /// Origin that relative links resolve against.
    pub base_url: String,
    /// Listing page the link trail starts from.
    pub start_path: String,
    /// One matcher per link to follow, in order.
    pub hops: Vec<LinkMatcher>,
    /// What the final link must point at.
    pub document: Expect,
    /// Container flattened by the listing-page fallback.
    pub listing_container: String,
    #[serde(default)]
    pub limits: ExtractLimits,
}

impl AgendaSourceConfig {
    pub fn council() -> Self {
        Self {
            base_url: "https://sachsetx.portal.civicclerk.com".into(),
            start_path: "/".into(),
            hops: vec![
                LinkMatcher::text(&["Agenda Packet", "Packet"]).within("tr.meeting-row", Some("City Council")),
            ],
            document: Expect::Pdf,
            listing_container: "body".into(),
            limits: ExtractLimits::default(),
        }
    }

    pub fn school_board() -> Self {
        Self {
            base_url: "https://meetings.boardbook.org".into(),
            start_path: "/public/Organization/1084".into(),
            hops: vec![
                LinkMatcher::text(&["Regular Meeting", "Board Meeting"]),
                LinkMatcher::text(&["agenda"]).or_href(&[".pdf"]),
            ],
            document: Expect::Any,
            listing_container: "body".into(),
            limits: ExtractLimits::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Origin of the HTML search endpoint.
    pub base_url: String,
    pub query: String,
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://html.duckduckgo.com".into(),
            query: "Sachse High School Mustangs sports results last week".into(),
            max_results: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SportsSourceConfig {
    pub base_url: String,
    pub schedule_path: String,
    /// Container holding the schedule; the whole body when absent.
    pub container: Option<String>,
    pub classifier: ClassifierConfig,
    pub search: SearchConfig,
    pub limits: ExtractLimits,
}

impl Default for SportsSourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.maxpreps.com".into(),
            schedule_path: "/tx/sachse/sachse-mustangs/".into(),
            container: None,
            classifier: ClassifierConfig::default(),
            search: SearchConfig::default(),
            limits: ExtractLimits {
                page_cap: 1,
                size_cap: 8_000,
                min_content: 40,
            },
        }
    }
}

/// All per-source settings for one digest run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub timeouts: TimeoutConfig,
    /// Upper bound on any single downloaded or rendered payload.
    pub max_download_bytes: usize,
    pub council: AgendaSourceConfig,
    pub school_board: AgendaSourceConfig,
    pub sports: SportsSourceConfig,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            timeouts: TimeoutConfig::default(),
            max_download_bytes: 25 * 1024 * 1024,
            council: AgendaSourceConfig::council(),
            school_board: AgendaSourceConfig::school_board(),
            sports: SportsSourceConfig::default(),
        }
    }
}

impl SourcesConfig {
    /// Load settings from a YAML file, or fall back to the built-in defaults.
    #[instrument(level = "info")]
    pub fn load(path: Option<&str>) -> Result<Self, Box<dyn Error>> {
        let Some(path) = path else {
            info!("Using built-in source settings");
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&raw)?;
        info!(path, "Loaded source settings");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_caps_and_timeouts() {
        let config = SourcesConfig::default();
        assert_eq!(config.council.limits.page_cap, 50);
        assert_eq!(config.council.limits.size_cap, 15_000);
        assert_eq!(config.sports.limits.size_cap, 8_000);
        assert_eq!(config.timeouts.page(), Duration::from_secs(30));
        assert_eq!(config.timeouts.document(), Duration::from_secs(60));
        assert_eq!(config.school_board.hops.len(), 2);
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let yaml = r#"
timeouts:
  page_secs: 5
sports:
  limits: { page_cap: 1, size_cap: 500, min_content: 10 }
  classifier:
    start_marker: "SCORES-START"
    end_markers: ["SCORES-END"]
    max_events: 3
"#;
        let config = SourcesConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.timeouts.page_secs, 5);
        assert_eq!(config.timeouts.document_secs, 60);
        assert_eq!(config.sports.limits.size_cap, 500);
        assert_eq!(config.sports.classifier.max_events, 3);
        assert_eq!(config.sports.classifier.max_participant_lines, 4);
        assert_eq!(config.council, AgendaSourceConfig::council());
    }

    #[test]
    fn test_agenda_override_parses_matchers() {
        let yaml = r#"
council:
  base_url: "https://portal.example.gov"
  start_path: "/meetings"
  hops:
    - scope: "li.meeting"
      scope_text: "Council"
      text_contains: ["packet"]
  document: pdf
  listing_container: "main"
"#;
        let config = SourcesConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.council.base_url, "https://portal.example.gov");
        assert_eq!(config.council.hops[0].scope.as_deref(), Some("li.meeting"));
        assert_eq!(config.council.document, Expect::Pdf);
        assert_eq!(config.council.limits, ExtractLimits::default());
    }

    #[test]
    fn test_load_without_path_uses_defaults() {
        assert_eq!(SourcesConfig::load(None).unwrap(), SourcesConfig::default());
    }
}
