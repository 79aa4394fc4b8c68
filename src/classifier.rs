//! Line-oriented schedule scanner.
//!
//! Schedule pages on the sports site carry no usable structure once
//! flattened: a sport/level heading, a few opponent or result lines and a
//! date/time line, repeated, surrounded by navigation and sponsor noise.
//! [`ScheduleLineClassifier`] turns that line dump into a bounded list of
//! [`ScheduleEvent`]s with an explicit state machine:
//!
//! ```text
//! NotStarted --start marker--> InSection --end marker | max_events | EOF--> Done
//! ```
//!
//! Inside the section each line is classified, in this priority order, as an
//! end marker, a sport marker (opens a new event), a temporal line (closes
//! the pending event), noise (dropped) or a detail line (appended to the
//! pending event). The scanner does no I/O.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

static TEMPORAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        \b\d{1,2}:\d{2}\s*(?:[ap]\.?m\.?)?
        | \b\d{1,2}\s*[ap]\.?m\.?(?:\s|$)
        | \b(?:today|tonight|tomorrow|yesterday|tba|tbd)\b
        | ^(?:mon|tue|tues|wed|wednes|thu|thur|thurs|fri|sat|satur|sun)(?:day)?\.?(?:,|\s+\d|\s*$)
        | \b(?:jan|feb|mar|apr|may|jun|jul|aug|sept?|oct|nov|dec)[a-z]*\.?\s+\d{1,2}\b
        | \b\d{1,2}/\d{1,2}(?:/\d{2,4})?\b",
    )
    .expect("static temporal pattern")
});

static PURE_NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\d\s]+$").expect("static numeric pattern"));

/// Level prefixes that may precede a sport name (`V.`, `JV`, `Girls` ...).
const LEVEL_PREFIXES: &[&str] = &[
    "v", "jv", "varsity", "junior varsity", "sub-varsity", "freshman", "fr", "9th", "9th grade",
    "boys", "boys'", "girls", "girls'", "men's", "women's", "b", "g",
];

/// Tunables for one schedule scan.
///
/// Section markers and thresholds differ between revisions of the same page,
/// so they are configuration rather than constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Line that opens the section; `None` starts scanning at the first line.
    pub start_marker: Option<String>,
    /// Any of these lines closes the section.
    pub end_markers: Vec<String>,
    /// Hard cap on emitted events per scan.
    pub max_events: usize,
    /// Cap on detail lines kept per event.
    pub max_participant_lines: usize,
    /// Lines dropped as noise (case-insensitive exact match).
    pub exclusions: Vec<String>,
    /// Sport names recognized as event headings.
    pub sport_keywords: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            start_marker: None,
            end_markers: vec!["Latest News".into(), "Sponsors".into(), "Quick Links".into()],
            max_events: 25,
            max_participant_lines: 4,
            exclusions: ["View All", "Box Score", "Buy Tickets", "Watch Live", "Recap", "Preview", "Share", "Directions"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            sport_keywords: [
                "Football", "Basketball", "Baseball", "Softball", "Soccer", "Volleyball", "Track",
                "Track & Field", "Cross Country", "Swimming", "Swim & Dive", "Tennis", "Golf",
                "Wrestling", "Powerlifting", "Water Polo", "Lacrosse", "Cheer", "Dance",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// One classified unit of schedule information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEvent {
    pub sport_marker: String,
    pub participant_lines: Vec<String>,
    pub temporal_line: Option<String>,
}

impl ScheduleEvent {
    fn open(sport_marker: &str) -> Self {
        Self {
            sport_marker: sport_marker.to_string(),
            participant_lines: Vec::new(),
            temporal_line: None,
        }
    }
}

impl fmt::Display for ScheduleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sport_marker)?;
        if !self.participant_lines.is_empty() {
            write!(f, ": {}", self.participant_lines.join("; "))?;
        }
        if let Some(when) = &self.temporal_line {
            write!(f, " ({when})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    InSection,
    Done,
}

/// How a single line inside the section was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    EndMarker,
    SportMarker,
    Temporal,
    Noise,
    Detail,
}

/// Scan state: at most one pending record plus everything emitted so far.
#[derive(Debug, Clone)]
pub struct ClassifierState {
    pub phase: Phase,
    pub pending: Option<ScheduleEvent>,
    pub emitted: Vec<ScheduleEvent>,
    last_sport: Option<String>,
}

impl ClassifierState {
    pub fn emitted_count(&self) -> usize {
        self.emitted.len()
    }
}

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("sport_keywords has no non-blank entries")]
    NoSportKeywords,
    #[error("invalid sport pattern: {0}")]
    Pattern(#[from] regex::Error),
}

pub struct ScheduleLineClassifier {
    config: ClassifierConfig,
    sport: Regex,
}

impl ScheduleLineClassifier {
    /// Compile the sport-marker pattern from `config.sport_keywords`.
    ///
    /// Blank keywords are ignored; a list with nothing else is rejected,
    /// since an empty alternation would match every line.
    pub fn new(config: ClassifierConfig) -> Result<Self, ClassifierError> {
        let prefixes = LEVEL_PREFIXES.iter().map(|p| regex::escape(p)).collect::<Vec<_>>().join("|");
        let sports = config
            .sport_keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(regex::escape)
            .collect::<Vec<_>>();
        if sports.is_empty() {
            return Err(ClassifierError::NoSportKeywords);
        }
        let sports = sports.join("|");
        let sport = Regex::new(&format!(r"(?i)^(?:(?:{prefixes})\.?\s+)*(?:{sports})s?\b"))?;
        Ok(Self { config, sport })
    }

    /// Fresh state; begins inside the section when no start marker is configured.
    pub fn initial_state(&self) -> ClassifierState {
        let phase = match (&self.config.start_marker, self.config.max_events) {
            (_, 0) => Phase::Done,
            (None, _) => Phase::InSection,
            (Some(_), _) => Phase::NotStarted,
        };
        ClassifierState {
            phase,
            pending: None,
            emitted: Vec::new(),
            last_sport: None,
        }
    }

    /// Classify a trimmed, in-section line by fixed priority.
    pub fn classify(&self, line: &str) -> LineKind {
        if self.config.end_markers.iter().any(|m| is_marker(line, m)) {
            LineKind::EndMarker
        } else if line.chars().count() <= 60 && self.sport.is_match(line) {
            LineKind::SportMarker
        } else if TEMPORAL.is_match(line) {
            LineKind::Temporal
        } else if line.is_empty()
            || PURE_NUMERIC.is_match(line)
            || self.config.exclusions.iter().any(|x| x.eq_ignore_ascii_case(line))
        {
            LineKind::Noise
        } else {
            LineKind::Detail
        }
    }

    /// Advance the state machine by one line.
    pub fn step(&self, state: &mut ClassifierState, raw: &str) {
        let line = raw.trim();
        match state.phase {
            Phase::Done => {}
            Phase::NotStarted => {
                let started = self
                    .config
                    .start_marker
                    .as_deref()
                    .is_some_and(|start| is_marker(line, start));
                if started {
                    state.phase = Phase::InSection;
                }
            }
            Phase::InSection => match self.classify(line) {
                LineKind::EndMarker => self.finish(state),
                LineKind::SportMarker => {
                    if let Some(event) = state.pending.take() {
                        self.emit(state, event);
                    }
                    if state.phase == Phase::InSection {
                        state.pending = Some(ScheduleEvent::open(line));
                        state.last_sport = Some(line.to_string());
                    }
                }
                LineKind::Temporal => {
                    if let Some(mut event) = state.pending.take() {
                        event.temporal_line = Some(line.to_string());
                        self.emit(state, event);
                    }
                }
                LineKind::Noise => {}
                LineKind::Detail => {
                    if state.pending.is_none() {
                        state.pending = state.last_sport.as_deref().map(ScheduleEvent::open);
                    }
                    if let Some(event) = state.pending.as_mut() {
                        if event.participant_lines.len() < self.config.max_participant_lines {
                            event.participant_lines.push(line.to_string());
                        }
                    }
                }
            },
        }
    }

    /// Move to `Done`, emitting any pending record best-effort.
    pub fn finish(&self, state: &mut ClassifierState) {
        if let Some(event) = state.pending.take() {
            if state.phase == Phase::InSection {
                self.emit(state, event);
            }
        }
        state.phase = Phase::Done;
    }

    fn emit(&self, state: &mut ClassifierState, event: ScheduleEvent) {
        if state.emitted.len() >= self.config.max_events {
            state.phase = Phase::Done;
            return;
        }
        state.emitted.push(event);
        if state.emitted.len() >= self.config.max_events {
            state.pending = None;
            state.phase = Phase::Done;
        }
    }

    /// Scan a whole line sequence and return the emitted events.
    pub fn scan<I, S>(&self, lines: I) -> Vec<ScheduleEvent>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut state = self.initial_state();
        for (position, line) in lines.into_iter().enumerate() {
            if state.phase == Phase::Done {
                debug!(position, "Schedule scan reached Done before end of input");
                break;
            }
            self.step(&mut state, line.as_ref());
        }
        self.finish(&mut state);
        debug!(events = state.emitted_count(), "Schedule scan complete");
        state.emitted
    }
}

fn is_marker(line: &str, marker: &str) -> bool {
    line.eq_ignore_ascii_case(marker.trim())
}

/// Plain-text rendering handed to the summarizer, one event per line.
pub fn render_events(events: &[ScheduleEvent]) -> String {
    events
        .iter()
        .map(|e| format!("- {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}
