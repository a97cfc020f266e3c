//! Strategic-opportunity classification: the 2×2 quadrant over market
//! attractiveness and capability fit, plus the tension evidence types.

use crate::error::{CoachError, Result};
use crate::types::{InsightTerritory, Quadrant, TensionImpact};
use serde::{Deserialize, Serialize};

/// The single high/low cut for both matrix axes. Scores are 1–10; 6 and up
/// is "high", 5 and below is "low". The display matrix and the quadrant
/// label share this constant so they can never disagree.
pub const HIGH_SCORE_THRESHOLD: f64 = 5.5;

pub fn is_high(score: f64) -> bool {
    score >= HIGH_SCORE_THRESHOLD
}

// ---------------------------------------------------------------------------
// OpportunityScores
// ---------------------------------------------------------------------------

/// Validated scoring triple. Construction rejects out-of-range values —
/// scores are never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpportunityScores {
    pub market_attractiveness: f64,
    pub capability_fit: f64,
    pub competitive_advantage: f64,
}

impl OpportunityScores {
    pub fn new(
        market_attractiveness: f64,
        capability_fit: f64,
        competitive_advantage: f64,
    ) -> Result<Self> {
        check_range("market_attractiveness", market_attractiveness)?;
        check_range("capability_fit", capability_fit)?;
        check_range("competitive_advantage", competitive_advantage)?;
        Ok(Self {
            market_attractiveness,
            capability_fit,
            competitive_advantage,
        })
    }
}

fn check_range(dimension: &str, value: f64) -> Result<()> {
    if !(1.0..=10.0).contains(&value) {
        return Err(CoachError::ScoreOutOfRange {
            dimension: dimension.to_string(),
            value,
        });
    }
    Ok(())
}

/// Quadrant as a pure function of the two high/low bits.
pub fn quadrant(market_attractiveness: f64, capability_fit: f64) -> Quadrant {
    match (is_high(market_attractiveness), is_high(capability_fit)) {
        (true, true) => Quadrant::Invest,
        (true, false) => Quadrant::Explore,
        (false, true) => Quadrant::Harvest,
        (false, false) => Quadrant::Divest,
    }
}

// ---------------------------------------------------------------------------
// StrategicOpportunity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub territory: InsightTerritory,
    pub quote: String,
}

/// A synthesis-produced opportunity, relabeled with its quadrant. The
/// `overall_score` comes from the synthesis step; classification only
/// consumes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategicOpportunity {
    pub title: String,
    pub kind: String,
    pub scores: OpportunityScores,
    pub overall_score: f64,
    pub quadrant: Quadrant,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    #[serde(default)]
    pub assumptions: Vec<String>,
}

/// Attach the quadrant label to an already-scored opportunity.
pub fn classify(
    title: impl Into<String>,
    kind: impl Into<String>,
    scores: OpportunityScores,
    overall_score: f64,
    evidence: Vec<Evidence>,
    assumptions: Vec<String>,
) -> StrategicOpportunity {
    StrategicOpportunity {
        title: title.into(),
        kind: kind.into(),
        quadrant: quadrant(scores.market_attractiveness, scores.capability_fit),
        scores,
        overall_score,
        evidence,
        assumptions,
    }
}

// ---------------------------------------------------------------------------
// StrategicTension
// ---------------------------------------------------------------------------

/// A tension in the research corpus: evidence pulling in two directions.
/// Impact is supplied by the synthesis step; the classifier only reports
/// evidence counts and never infers impact from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategicTension {
    pub description: String,
    #[serde(default)]
    pub aligned: Vec<Evidence>,
    #[serde(default)]
    pub conflicting: Vec<Evidence>,
    pub impact: TensionImpact,
    #[serde(default)]
    pub resolution_options: Vec<String>,
}

impl StrategicTension {
    /// (aligned, conflicting) evidence counts for display.
    pub fn evidence_counts(&self) -> (usize, usize) {
        (self.aligned.len(), self.conflicting.len())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadrant_examples() {
        assert_eq!(quadrant(7.0, 8.0), Quadrant::Invest);
        assert_eq!(quadrant(7.0, 3.0), Quadrant::Explore);
        assert_eq!(quadrant(3.0, 8.0), Quadrant::Harvest);
        assert_eq!(quadrant(2.0, 2.0), Quadrant::Divest);
    }

    #[test]
    fn quadrant_threshold_resolves_six_high_five_low() {
        assert_eq!(quadrant(6.0, 6.0), Quadrant::Invest);
        assert_eq!(quadrant(5.0, 5.0), Quadrant::Divest);
        assert_eq!(quadrant(6.0, 5.0), Quadrant::Explore);
        assert_eq!(quadrant(5.0, 6.0), Quadrant::Harvest);
    }

    #[test]
    fn quadrant_is_total_and_pure_in_the_high_bits() {
        for m in 1..=10 {
            for c in 1..=10 {
                let q = quadrant(m as f64, c as f64);
                let expected = match (m >= 6, c >= 6) {
                    (true, true) => Quadrant::Invest,
                    (true, false) => Quadrant::Explore,
                    (false, true) => Quadrant::Harvest,
                    (false, false) => Quadrant::Divest,
                };
                assert_eq!(q, expected, "m={m} c={c}");
            }
        }
    }

    #[test]
    fn scores_reject_out_of_range() {
        assert!(OpportunityScores::new(0.5, 5.0, 5.0).is_err());
        assert!(OpportunityScores::new(5.0, 10.1, 5.0).is_err());
        assert!(OpportunityScores::new(5.0, 5.0, -1.0).is_err());
        assert!(OpportunityScores::new(1.0, 10.0, 5.5).is_ok());
    }

    #[test]
    fn score_error_names_the_dimension() {
        let err = OpportunityScores::new(5.0, 11.0, 5.0).unwrap_err();
        match err {
            CoachError::ScoreOutOfRange { dimension, value } => {
                assert_eq!(dimension, "capability_fit");
                assert_eq!(value, 11.0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn classify_keeps_caller_overall_score() {
        let scores = OpportunityScores::new(7.0, 8.0, 6.0).unwrap();
        let opp = classify("Self-serve tier", "growth", scores, 7.3, vec![], vec![]);
        assert_eq!(opp.quadrant, Quadrant::Invest);
        assert_eq!(opp.overall_score, 7.3);
        assert_eq!(opp.title, "Self-serve tier");
    }

    #[test]
    fn tension_counts_do_not_touch_impact() {
        let tension = StrategicTension {
            description: "Premium brand vs. price-sensitive segment".to_string(),
            aligned: vec![Evidence {
                territory: InsightTerritory::Company,
                quote: "Margins depend on premium pricing".to_string(),
            }],
            conflicting: vec![
                Evidence {
                    territory: InsightTerritory::Customer,
                    quote: "Buyers churn on renewal price".to_string(),
                },
                Evidence {
                    territory: InsightTerritory::Competitor,
                    quote: "Two rivals undercut us 30%".to_string(),
                },
            ],
            impact: TensionImpact::Significant,
            resolution_options: vec!["Tiered packaging".to_string()],
        };
        assert_eq!(tension.evidence_counts(), (1, 2));
        assert_eq!(tension.impact, TensionImpact::Significant);
    }

    #[test]
    fn opportunity_json_roundtrip() {
        let scores = OpportunityScores::new(7.0, 3.0, 5.0).unwrap();
        let opp = classify(
            "Adjacent market entry",
            "expansion",
            scores,
            5.0,
            vec![Evidence {
                territory: InsightTerritory::Competitor,
                quote: "No incumbent in the mid-market".to_string(),
            }],
            vec!["Sales team can carry a second product".to_string()],
        );
        let json = serde_json::to_string(&opp).unwrap();
        let back: StrategicOpportunity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, opp);
        assert_eq!(back.quadrant, Quadrant::Explore);
    }
}
