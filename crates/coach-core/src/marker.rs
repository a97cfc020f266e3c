//! In-band marker protocol embedded in assistant text.
//!
//! The coach signals structured data by embedding bracketed markers in its
//! replies: `[Insight:customer:They value speed over price]`,
//! `[Framework:swot]`, `[Research:company:capabilities:2:We own the data]`,
//! and so on. This module is a single-pass finite scanner that extracts every
//! recognized marker and returns the cleaned display text.
//!
//! Parsing is fail-open: a malformed marker (unterminated bracket, unknown
//! tag, wrong field count, bad territory, non-numeric question index) is left
//! verbatim in the display text and produces no record. Stripping is
//! idempotent — the cleaned text contains no recognized markers, so a second
//! pass returns it unchanged.

use crate::types::{InsightTerritory, Territory};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Framework registry
// ---------------------------------------------------------------------------

/// Canonical ids of the frameworks the coach can reference. `[Framework:..]`
/// markers are matched case-insensitively against this list; markers naming
/// anything else are stripped from display without producing a ref.
pub const FRAMEWORK_REGISTRY: &[&str] = &[
    "jobs-to-be-done",
    "porters-five-forces",
    "swot",
    "value-proposition-canvas",
    "business-model-canvas",
    "blue-ocean",
    "ansoff-matrix",
];

fn lookup_framework(id: &str) -> Option<&'static str> {
    FRAMEWORK_REGISTRY
        .iter()
        .copied()
        .find(|f| f.eq_ignore_ascii_case(id))
}

fn is_framework_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

// ---------------------------------------------------------------------------
// Marker records
// ---------------------------------------------------------------------------

/// Advisory insight pinned to a territory (or `general`). Never changes area
/// status; the research-capture pipeline is authoritative for that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightMarker {
    pub territory: InsightTerritory,
    pub summary: String,
}

/// One captured answer for a research-area question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchCapture {
    pub territory: Territory,
    pub area_id: String,
    pub question_index: u32,
    pub answer: String,
}

/// Signal that every question in an area has been answered in conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaCompletion {
    pub territory: Territory,
    pub area_id: String,
}

/// Reference to a registered framework, in canonical-id form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkRef {
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    Territory,
    Doc,
    Synthesis,
}

/// Evidence reference. Identical raw markers collapse to one ref; the number
/// of occurrences is kept for internal counting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRef {
    pub kind: EvidenceKind,
    pub value: String,
    pub occurrences: u32,
}

// ---------------------------------------------------------------------------
// ParsedAssistantText
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedAssistantText {
    pub display_text: String,
    pub insights: Vec<InsightMarker>,
    pub research_captures: Vec<ResearchCapture>,
    pub area_completions: Vec<AreaCompletion>,
    pub framework_refs: Vec<FrameworkRef>,
    pub evidence_refs: Vec<EvidenceRef>,
}

impl ParsedAssistantText {
    /// True when the message carried research captures or area completions,
    /// i.e. when it should be flagged `researchCaptured` on persistence.
    pub fn has_research_signals(&self) -> bool {
        !self.research_captures.is_empty() || !self.area_completions.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

enum Marker {
    Insight(InsightMarker),
    Research(ResearchCapture),
    AreaComplete(AreaCompletion),
    Framework(Option<FrameworkRef>),
    Evidence(EvidenceKind, String),
}

/// Interpret the text between a `[` `]` pair. `None` means "not a marker" —
/// the bracketed text stays verbatim in the display output.
fn match_marker(inner: &str) -> Option<Marker> {
    let (tag, rest) = inner.split_once(':')?;
    match tag {
        "Insight" => {
            let (territory, summary) = rest.split_once(':')?;
            let territory: InsightTerritory = territory.parse().ok()?;
            Some(Marker::Insight(InsightMarker {
                territory,
                summary: summary.to_string(),
            }))
        }
        "Research" => {
            let mut parts = rest.splitn(4, ':');
            let territory: Territory = parts.next()?.parse().ok()?;
            let area_id = parts.next()?;
            let question_index: u32 = parts.next()?.parse().ok()?;
            let answer = parts.next()?;
            if area_id.is_empty() {
                return None;
            }
            Some(Marker::Research(ResearchCapture {
                territory,
                area_id: area_id.to_string(),
                question_index,
                answer: answer.to_string(),
            }))
        }
        "AreaComplete" => {
            let (territory, area_id) = rest.split_once(':')?;
            let territory: Territory = territory.parse().ok()?;
            // Exactly two fields; a stray extra colon is not this marker.
            if area_id.is_empty() || area_id.contains(':') {
                return None;
            }
            Some(Marker::AreaComplete(AreaCompletion {
                territory,
                area_id: area_id.to_string(),
            }))
        }
        "Framework" => {
            if !is_framework_id(rest) {
                return None;
            }
            // Well-formed but unregistered ids are stripped, not shown.
            Some(Marker::Framework(
                lookup_framework(rest).map(|id| FrameworkRef { id: id.to_string() }),
            ))
        }
        "Territory" => Some(Marker::Evidence(EvidenceKind::Territory, rest.to_string())),
        "Doc" => Some(Marker::Evidence(EvidenceKind::Doc, rest.to_string())),
        "Synthesis" => Some(Marker::Evidence(EvidenceKind::Synthesis, rest.to_string())),
        _ => None,
    }
}

/// Scan assistant text, extracting every recognized marker and removing it
/// from the display text. Whitespace around a removed marker collapses to a
/// single space and the result is trimmed.
pub fn parse_assistant_text(input: &str) -> ParsedAssistantText {
    let mut out = String::with_capacity(input.len());
    let mut parsed = ParsedAssistantText::default();
    let mut rest = input;

    while let Some(open) = rest.find('[') {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];

        let Some(close) = after_open.find(']') else {
            // Unterminated bracket: everything from here is verbatim.
            out.push_str(&rest[open..]);
            rest = "";
            break;
        };

        let inner = &after_open[..close];
        if inner.contains('[') {
            // A nested `[` means this `[` never opened a marker. Emit it and
            // rescan from the inner bracket.
            out.push('[');
            rest = after_open;
            continue;
        }

        match match_marker(inner) {
            Some(marker) => {
                record(&mut parsed, marker);
                // Collapse the removal site to at most one space. Splicing
                // the two sides directly could form a new scannable marker
                // out of text already classified as non-marker.
                rest = after_open[close + 1..].trim_start();
                if !out.is_empty() && !out.ends_with(char::is_whitespace) && !rest.is_empty() {
                    out.push(' ');
                }
            }
            None => {
                out.push_str(&rest[open..open + 1 + close + 1]);
                rest = &after_open[close + 1..];
            }
        }
    }

    out.push_str(rest);
    parsed.display_text = out.trim().to_string();
    parsed
}

/// Remove every recognized marker from `input`, returning display-clean text.
/// Idempotent: stripping already-stripped text is the identity.
pub fn strip_markers(input: &str) -> String {
    parse_assistant_text(input).display_text
}

fn record(parsed: &mut ParsedAssistantText, marker: Marker) {
    match marker {
        Marker::Insight(m) => parsed.insights.push(m),
        Marker::Research(m) => parsed.research_captures.push(m),
        Marker::AreaComplete(m) => parsed.area_completions.push(m),
        Marker::Framework(Some(r)) => {
            if !parsed.framework_refs.contains(&r) {
                parsed.framework_refs.push(r);
            }
        }
        Marker::Framework(None) => {}
        Marker::Evidence(kind, value) => {
            if let Some(existing) = parsed
                .evidence_refs
                .iter_mut()
                .find(|e| e.kind == kind && e.value == value)
            {
                existing.occurrences += 1;
            } else {
                parsed.evidence_refs.push(EvidenceRef {
                    kind,
                    value,
                    occurrences: 1,
                });
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
