//! Session lifecycle phases and the guard rules for moving between them.

use crate::error::{CoachError, Result};
use crate::types::Phase;
use serde::{Deserialize, Serialize};

/// Research areas that must be mapped before synthesis opens (out of 9).
pub const SYNTHESIS_GATE_MAPPED_AREAS: u32 = 4;

// ---------------------------------------------------------------------------
// GateContext
// ---------------------------------------------------------------------------

/// Everything the forward-transition guards look at. Assembled from the
/// progress board and the context-awareness read of the backing store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateContext {
    pub materials_count: u32,
    pub mapped_area_count: u32,
    pub synthesis_available: bool,
}

// ---------------------------------------------------------------------------
// PhaseMachine
// ---------------------------------------------------------------------------

/// Tracks the navigable current phase plus a render-only high-water mark.
///
/// Backward navigation is always allowed and never erases later-phase
/// progress; forward navigation checks the entry guard of every phase it
/// steps through. `highest_reached` gates nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseMachine {
    current: Phase,
    highest_reached: Phase,
}

impl PhaseMachine {
    pub fn new(phase: Phase) -> Self {
        Self {
            current: phase,
            highest_reached: phase,
        }
    }

    /// Build from the phase string stored in the conversation's framework
    /// state. Unknown values fall back to `Discovery`.
    pub fn from_stored(stored: &str) -> Self {
        Self::new(Phase::from_stored(stored))
    }

    pub fn current(&self) -> Phase {
        self.current
    }

    pub fn highest_reached(&self) -> Phase {
        self.highest_reached
    }

    /// Guard for entering `target` directly from its predecessor. Entry to
    /// `Discovery`, `Activation` and `Review` is ungated.
    pub fn entry_guard(target: Phase, ctx: &GateContext) -> Option<String> {
        match target {
            Phase::Research if ctx.materials_count == 0 => {
                Some("at least one material must be uploaded before research".to_string())
            }
            Phase::Synthesis if ctx.mapped_area_count < SYNTHESIS_GATE_MAPPED_AREAS => {
                Some(format!(
                    "{} of {SYNTHESIS_GATE_MAPPED_AREAS} required research areas mapped",
                    ctx.mapped_area_count
                ))
            }
            Phase::Bets if !ctx.synthesis_available => {
                Some("synthesis has not been generated yet".to_string())
            }
            _ => None,
        }
    }

    /// Check whether `navigate(target)` would succeed, without moving.
    pub fn can_navigate(&self, target: Phase, ctx: &GateContext) -> Result<()> {
        if target <= self.current {
            return Ok(());
        }
        // Forward moves validate every phase stepped through, so a jump from
        // discovery to bets still needs materials, mapped areas and a
        // synthesis result.
        for step in Phase::all() {
            if *step > self.current && *step <= target {
                if let Some(reason) = Self::entry_guard(*step, ctx) {
                    return Err(CoachError::GateNotSatisfied {
                        from: self.current.to_string(),
                        to: target.to_string(),
                        reason,
                    });
                }
            }
        }
        Ok(())
    }

    /// Move to `target`. Backward always succeeds; forward is guarded.
    pub fn navigate(&mut self, target: Phase, ctx: &GateContext) -> Result<Phase> {
        self.can_navigate(target, ctx)?;
        self.current = target;
        if target > self.highest_reached {
            self.highest_reached = target;
        }
        Ok(self.current)
    }

    /// Advance one phase forward, if there is one and its guard passes.
    pub fn advance(&mut self, ctx: &GateContext) -> Result<Phase> {
        let target = self.current.next().ok_or_else(|| CoachError::GateNotSatisfied {
            from: self.current.to_string(),
            to: self.current.to_string(),
            reason: "already at the final phase".to_string(),
        })?;
        self.navigate(target, ctx)
    }
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new(Phase::Discovery)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn open_ctx() -> GateContext {
        GateContext {
            materials_count: 2,
            mapped_area_count: 9,
            synthesis_available: true,
        }
    }

    #[test]
    fn discovery_to_research_requires_materials() {
        let mut machine = PhaseMachine::default();
        let ctx = GateContext::default();
        assert!(matches!(
            machine.advance(&ctx),
            Err(CoachError::GateNotSatisfied { .. })
        ));

        let ctx = GateContext {
            materials_count: 1,
            ..GateContext::default()
        };
        assert_eq!(machine.advance(&ctx).unwrap(), Phase::Research);
    }

    #[test]
    fn research_to_synthesis_requires_four_mapped_areas() {
        let mut machine = PhaseMachine::new(Phase::Research);
        // 1 mapped per territory = 3 total, below the gate
        let ctx = GateContext {
            materials_count: 1,
            mapped_area_count: 3,
            synthesis_available: false,
        };
        let err = machine.navigate(Phase::Synthesis, &ctx).unwrap_err();
        match err {
            CoachError::GateNotSatisfied { from, to, reason } => {
                assert_eq!(from, "research");
                assert_eq!(to, "synthesis");
                assert!(reason.contains("3 of 4"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let ctx = GateContext {
            mapped_area_count: 4,
            ..ctx
        };
        assert_eq!(machine.navigate(Phase::Synthesis, &ctx).unwrap(), Phase::Synthesis);
    }

    #[test]
    fn synthesis_to_bets_requires_generated_synthesis() {
        let mut machine = PhaseMachine::new(Phase::Synthesis);
        let ctx = GateContext {
            materials_count: 1,
            mapped_area_count: 9,
            synthesis_available: false,
        };
        assert!(machine.navigate(Phase::Bets, &ctx).is_err());

        let ctx = GateContext {
            synthesis_available: true,
            ..ctx
        };
        assert_eq!(machine.navigate(Phase::Bets, &ctx).unwrap(), Phase::Bets);
    }

    #[test]
    fn activation_and_review_are_ungated() {
        let mut machine = PhaseMachine::new(Phase::Bets);
        let ctx = open_ctx();
        assert_eq!(machine.advance(&ctx).unwrap(), Phase::Activation);
        assert_eq!(machine.advance(&ctx).unwrap(), Phase::Review);
        assert!(machine.advance(&ctx).is_err());
    }

    #[test]
    fn backward_navigation_keeps_high_water_mark() {
        let mut machine = PhaseMachine::new(Phase::Synthesis);
        let ctx = open_ctx();
        machine.navigate(Phase::Discovery, &ctx).unwrap();
        assert_eq!(machine.current(), Phase::Discovery);
        assert_eq!(machine.highest_reached(), Phase::Synthesis);
    }

    #[test]
    fn forward_jump_validates_every_step() {
        let mut machine = PhaseMachine::default();
        // Synthesis gate open but no materials: the research step blocks a
        // jump straight to synthesis.
        let ctx = GateContext {
            materials_count: 0,
            mapped_area_count: 9,
            synthesis_available: true,
        };
        assert!(machine.navigate(Phase::Synthesis, &ctx).is_err());

        let ctx = GateContext {
            materials_count: 1,
            ..ctx
        };
        assert_eq!(machine.navigate(Phase::Synthesis, &ctx).unwrap(), Phase::Synthesis);
    }

    #[test]
    fn from_stored_falls_back_to_discovery() {
        let machine = PhaseMachine::from_stored("garbage");
        assert_eq!(machine.current(), Phase::Discovery);
        let machine = PhaseMachine::from_stored("planning");
        assert_eq!(machine.current(), Phase::Bets);
    }

    #[test]
    fn returning_forward_after_backnav_rechecks_guards() {
        let mut machine = PhaseMachine::new(Phase::Synthesis);
        let ctx = open_ctx();
        machine.navigate(Phase::Research, &ctx).unwrap();
        // Going forward again still re-checks the guards.
        let closed = GateContext::default();
        assert!(machine.navigate(Phase::Synthesis, &closed).is_err());
        assert_eq!(machine.navigate(Phase::Synthesis, &ctx).unwrap(), Phase::Synthesis);
        assert_eq!(machine.highest_reached(), Phase::Synthesis);
    }
}
