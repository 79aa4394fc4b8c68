//! Data models for sources and the assembled digest.
//!
//! This module defines the core data structures shared across the application:
//! - [`SourceId`]: The three logical sources the digest is built from
//! - [`Digest`]: One run's output, one [`Section`] per enabled source
//! - [`SectionBody`]: Either a summary or a placeholder with diagnostics

use serde::{Deserialize, Serialize};
use std::fmt;

/// A logical content source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    Council,
    SchoolBoard,
    Sports,
}

impl SourceId {
    /// Fixed digest order.
    pub const ALL: [SourceId; 3] = [SourceId::Council, SourceId::SchoolBoard, SourceId::Sports];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Council => "council",
            SourceId::SchoolBoard => "school_board",
            SourceId::Sports => "sports",
        }
    }

    /// Heading used for this source's digest section.
    pub fn section_title(&self) -> &'static str {
        match self {
            SourceId::Council => "City Hall Updates",
            SourceId::SchoolBoard => "School Board Updates",
            SourceId::Sports => "Mustang Sports Minute",
        }
    }

    /// Short human name used in placeholder text.
    pub fn display_name(&self) -> &'static str {
        match self {
            SourceId::Council => "City Council",
            SourceId::SchoolBoard => "School Board",
            SourceId::Sports => "sports",
        }
    }

    /// Name of the summarization template for this source.
    pub fn template_name(&self) -> &'static str {
        match self {
            SourceId::Council => "sachse_city_council",
            SourceId::SchoolBoard => "sachse_school_board",
            SourceId::Sports => "sachse_sports",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a digest section shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SectionBody {
    /// Summarizer output (or raw extracted text when summarization is disabled).
    Summary { text: String, strategy: String },
    /// Fixed placeholder plus optional diagnostic detail for the reader.
    Placeholder {
        text: String,
        diagnostics: Option<String>,
    },
}

/// One section of the digest; exactly one per enabled source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub source: SourceId,
    pub title: String,
    pub body: SectionBody,
}

/// A complete digest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Digest {
    /// Date of the run in `YYYY-MM-DD` format.
    pub local_date: String,
    /// Human-readable date, e.g. `October 19, 2026`.
    pub display_date: String,
    pub sections: Vec<Section>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_order_and_names() {
        let names: Vec<_> = SourceId::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["council", "school_board", "sports"]);
        assert_eq!(SourceId::Sports.section_title(), "Mustang Sports Minute");
    }

    #[test]
    fn test_section_body_serializes_with_kind_tag() {
        let body = SectionBody::Placeholder {
            text: "unavailable".into(),
            diagnostics: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains(r#""kind":"placeholder""#));
    }
}
