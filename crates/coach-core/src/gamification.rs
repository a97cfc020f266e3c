//! XP ledger: a deterministic fold over the session's event log.
//!
//! Event delivery to the backend is fire-and-forget, so the ledger itself
//! must be replay-safe: folding the same ordered log always produces the
//! same XP, level and achievement state.

use crate::types::Territory;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// CoachEvent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoachEvent {
    MessageSent,
    InsightCaptured,
    FrameworkRequested,
    ResearchCaptured,
    AreaMapped,
    BetCreated,
    TerritoryComplete(Territory),
    SynthesisGenerated,
    /// Anything the wire sends that this build does not know. Worth 0 XP,
    /// never an error.
    Other(String),
}

impl CoachEvent {
    pub fn xp(&self) -> u64 {
        match self {
            CoachEvent::MessageSent => 5,
            CoachEvent::FrameworkRequested => 10,
            CoachEvent::InsightCaptured => 15,
            CoachEvent::ResearchCaptured => 25,
            CoachEvent::AreaMapped => 50,
            CoachEvent::BetCreated => 75,
            CoachEvent::TerritoryComplete(_) => 100,
            CoachEvent::SynthesisGenerated => 150,
            CoachEvent::Other(_) => 0,
        }
    }

    pub fn as_wire(&self) -> &str {
        match self {
            CoachEvent::MessageSent => "message_sent",
            CoachEvent::InsightCaptured => "insight_captured",
            CoachEvent::FrameworkRequested => "framework_requested",
            CoachEvent::ResearchCaptured => "research_captured",
            CoachEvent::AreaMapped => "area_mapped",
            CoachEvent::BetCreated => "bet_created",
            CoachEvent::TerritoryComplete(_) => "territory_complete",
            CoachEvent::SynthesisGenerated => "synthesis_generated",
            CoachEvent::Other(name) => name,
        }
    }

    pub fn from_wire(name: &str) -> CoachEvent {
        match name {
            "message_sent" => CoachEvent::MessageSent,
            "insight_captured" => CoachEvent::InsightCaptured,
            "framework_requested" => CoachEvent::FrameworkRequested,
            "research_captured" => CoachEvent::ResearchCaptured,
            "area_mapped" => CoachEvent::AreaMapped,
            "bet_created" => CoachEvent::BetCreated,
            "synthesis_generated" => CoachEvent::SynthesisGenerated,
            other => CoachEvent::Other(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Levels
// ---------------------------------------------------------------------------

/// Cumulative XP required to reach level index+1. Monotonic by construction.
const LEVEL_THRESHOLDS: &[u64] = &[0, 100, 250, 500, 1000, 2000, 3500, 5500, 8000];

/// XP per level beyond the end of the table.
const LEVEL_STRIDE: u64 = 3000;

pub fn level_for_xp(xp: u64) -> u32 {
    let table_max = *LEVEL_THRESHOLDS.last().unwrap_or(&0);
    if xp >= table_max {
        let extra = (xp - table_max) / LEVEL_STRIDE;
        return LEVEL_THRESHOLDS.len() as u32 + extra as u32;
    }
    LEVEL_THRESHOLDS
        .iter()
        .rposition(|&threshold| xp >= threshold)
        .map(|i| i as u32 + 1)
        .unwrap_or(1)
}

fn level_floor(level: u32) -> u64 {
    let idx = (level - 1) as usize;
    if idx < LEVEL_THRESHOLDS.len() {
        LEVEL_THRESHOLDS[idx]
    } else {
        let table_max = *LEVEL_THRESHOLDS.last().unwrap_or(&0);
        table_max + (idx - (LEVEL_THRESHOLDS.len() - 1)) as u64 * LEVEL_STRIDE
    }
}

/// Progress within the current level, for the XP bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelProgress {
    pub into_level: u64,
    pub level_span: u64,
}

pub fn progress_in_level(xp: u64) -> LevelProgress {
    let level = level_for_xp(xp);
    let floor = level_floor(level);
    let ceiling = level_floor(level + 1);
    LevelProgress {
        into_level: xp - floor,
        level_span: ceiling - floor,
    }
}

// ---------------------------------------------------------------------------
// Achievements
// ---------------------------------------------------------------------------

fn achievements_for(event: &CoachEvent, xp_total: u64) -> Vec<&'static str> {
    let mut unlocked = Vec::new();
    match event {
        CoachEvent::InsightCaptured => unlocked.push("first-insight"),
        CoachEvent::AreaMapped => unlocked.push("first-area-mapped"),
        CoachEvent::TerritoryComplete(_) => unlocked.push("territory-explorer"),
        CoachEvent::SynthesisGenerated => unlocked.push("synthesizer"),
        CoachEvent::BetCreated => unlocked.push("bet-maker"),
        _ => {}
    }
    if xp_total >= 500 {
        unlocked.push("xp-500");
    }
    if xp_total >= 2000 {
        unlocked.push("xp-2000");
    }
    unlocked
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// What a single applied event changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerDelta {
    pub xp_awarded: u64,
    pub level_before: u32,
    pub level_after: u32,
    pub unlocked: Vec<String>,
}

impl LedgerDelta {
    pub fn leveled_up(&self) -> bool {
        self.level_after > self.level_before
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    xp_total: u64,
    achievements: BTreeSet<String>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn xp_total(&self) -> u64 {
        self.xp_total
    }

    pub fn level(&self) -> u32 {
        level_for_xp(self.xp_total)
    }

    pub fn progress(&self) -> LevelProgress {
        progress_in_level(self.xp_total)
    }

    pub fn achievements(&self) -> impl Iterator<Item = &str> {
        self.achievements.iter().map(String::as_str)
    }

    pub fn has_achievement(&self, id: &str) -> bool {
        self.achievements.contains(id)
    }

    /// Apply one event. XP only ever grows; achievements unlock once.
    pub fn apply(&mut self, event: &CoachEvent) -> LedgerDelta {
        let level_before = self.level();
        let xp_awarded = event.xp();
        self.xp_total += xp_awarded;

        let mut unlocked = Vec::new();
        for id in achievements_for(event, self.xp_total) {
            if self.achievements.insert(id.to_string()) {
                unlocked.push(id.to_string());
            }
        }

        LedgerDelta {
            xp_awarded,
            level_before,
            level_after: self.level(),
            unlocked,
        }
    }

    /// Rebuild ledger state from an ordered event log.
    pub fn replay<'a>(events: impl IntoIterator<Item = &'a CoachEvent>) -> Self {
        let mut ledger = Ledger::new();
        for event in events {
            ledger.apply(event);
        }
        ledger
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xp_table_matches_product_values() {
        assert_eq!(CoachEvent::MessageSent.xp(), 5);
        assert_eq!(CoachEvent::FrameworkRequested.xp(), 10);
        assert_eq!(CoachEvent::InsightCaptured.xp(), 15);
        assert_eq!(CoachEvent::ResearchCaptured.xp(), 25);
        assert_eq!(CoachEvent::AreaMapped.xp(), 50);
        assert_eq!(CoachEvent::BetCreated.xp(), 75);
        assert_eq!(CoachEvent::TerritoryComplete(Territory::Company).xp(), 100);
        assert_eq!(CoachEvent::SynthesisGenerated.xp(), 150);
    }

    #[test]
    fn unknown_event_awards_zero() {
        let event = CoachEvent::from_wire("confetti_clicked");
        assert_eq!(event, CoachEvent::Other("confetti_clicked".to_string()));
        assert_eq!(event.xp(), 0);

        let mut ledger = Ledger::new();
        let delta = ledger.apply(&event);
        assert_eq!(delta.xp_awarded, 0);
        assert_eq!(ledger.xp_total(), 0);
    }

    #[test]
    fn wire_roundtrip_for_known_events() {
        for name in [
            "message_sent",
            "insight_captured",
            "framework_requested",
            "research_captured",
            "area_mapped",
            "bet_created",
            "synthesis_generated",
        ] {
            assert_eq!(CoachEvent::from_wire(name).as_wire(), name);
        }
    }

    #[test]
    fn level_is_monotonic_in_xp() {
        let mut last = 0;
        for xp in (0..20_000).step_by(50) {
            let level = level_for_xp(xp);
            assert!(level >= last, "level dropped at xp={xp}");
            last = level;
        }
    }

    #[test]
    fn level_thresholds() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(99), 1);
        assert_eq!(level_for_xp(100), 2);
        assert_eq!(level_for_xp(250), 3);
        assert_eq!(level_for_xp(8000), 9);
        assert_eq!(level_for_xp(11_000), 10);
    }

    #[test]
    fn progress_in_level_spans() {
        let p = progress_in_level(120);
        assert_eq!(p.into_level, 20);
        assert_eq!(p.level_span, 150); // 250 - 100

        let p = progress_in_level(0);
        assert_eq!(p.into_level, 0);
        assert_eq!(p.level_span, 100);
    }

    #[test]
    fn replay_is_deterministic() {
        let log = vec![
            CoachEvent::MessageSent,
            CoachEvent::ResearchCaptured,
            CoachEvent::AreaMapped,
            CoachEvent::MessageSent,
            CoachEvent::TerritoryComplete(Territory::Customer),
            CoachEvent::SynthesisGenerated,
            CoachEvent::Other("mystery".to_string()),
        ];
        let a = Ledger::replay(&log);
        let b = Ledger::replay(&log);
        assert_eq!(a, b);
        assert_eq!(a.xp_total(), 5 + 25 + 50 + 5 + 100 + 150);
    }

    #[test]
    fn achievements_unlock_once_and_never_relock() {
        let mut ledger = Ledger::new();
        let delta = ledger.apply(&CoachEvent::InsightCaptured);
        assert_eq!(delta.unlocked, vec!["first-insight".to_string()]);

        let delta = ledger.apply(&CoachEvent::InsightCaptured);
        assert!(delta.unlocked.is_empty());
        assert!(ledger.has_achievement("first-insight"));
    }

    #[test]
    fn xp_milestone_achievements() {
        let mut ledger = Ledger::new();
        for _ in 0..4 {
            ledger.apply(&CoachEvent::SynthesisGenerated);
        }
        assert_eq!(ledger.xp_total(), 600);
        assert!(ledger.has_achievement("xp-500"));
        assert!(!ledger.has_achievement("xp-2000"));
    }

    #[test]
    fn level_up_reported_in_delta() {
        let mut ledger = Ledger::new();
        ledger.apply(&CoachEvent::AreaMapped); // 50
        let delta = ledger.apply(&CoachEvent::TerritoryComplete(Territory::Company)); // 150 total
        assert_eq!(delta.level_before, 1);
        assert_eq!(delta.level_after, 2);
        assert!(delta.leveled_up());
    }
}
