use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Discovery,
    Research,
    Synthesis,
    Bets,
    Activation,
    Review,
}

impl Phase {
    pub fn all() -> &'static [Phase] {
        &[
            Phase::Discovery,
            Phase::Research,
            Phase::Synthesis,
            Phase::Bets,
            Phase::Activation,
            Phase::Review,
        ]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<Phase> {
        let all = Phase::all();
        let i = self.index();
        all.get(i + 1).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Discovery => "discovery",
            Phase::Research => "research",
            Phase::Synthesis => "synthesis",
            Phase::Bets => "bets",
            Phase::Activation => "activation",
            Phase::Review => "review",
        }
    }

    /// Derive a phase from a stored framework-state value.
    ///
    /// This is the single fallback rule for the whole system: anything that
    /// does not name a known phase reads as `Discovery`. Consumers must not
    /// re-validate stored phase strings on their own.
    pub fn from_stored(s: &str) -> Phase {
        s.parse().unwrap_or(Phase::Discovery)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = crate::error::CoachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discovery" => Ok(Phase::Discovery),
            "research" => Ok(Phase::Research),
            "synthesis" => Ok(Phase::Synthesis),
            // Legacy surfaces stored the bets phase as "planning".
            "bets" | "planning" => Ok(Phase::Bets),
            "activation" => Ok(Phase::Activation),
            "review" => Ok(Phase::Review),
            _ => Err(crate::error::CoachError::InvalidPhase(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Territory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Territory {
    Company,
    Customer,
    Competitor,
}

impl Territory {
    pub fn all() -> &'static [Territory] {
        &[Territory::Company, Territory::Customer, Territory::Competitor]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Territory::Company => "company",
            Territory::Customer => "customer",
            Territory::Competitor => "competitor",
        }
    }
}

impl fmt::Display for Territory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Territory {
    type Err = crate::error::CoachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "company" => Ok(Territory::Company),
            "customer" => Ok(Territory::Customer),
            "competitor" => Ok(Territory::Competitor),
            _ => Err(crate::error::CoachError::InvalidTerritory(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// InsightTerritory
// ---------------------------------------------------------------------------

/// Target of an advisory insight marker. Unlike research captures, insights
/// may be general observations not pinned to a single territory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightTerritory {
    Company,
    Customer,
    Competitor,
    General,
}

impl InsightTerritory {
    pub fn as_str(self) -> &'static str {
        match self {
            InsightTerritory::Company => "company",
            InsightTerritory::Customer => "customer",
            InsightTerritory::Competitor => "competitor",
            InsightTerritory::General => "general",
        }
    }
}

impl fmt::Display for InsightTerritory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InsightTerritory {
    type Err = crate::error::CoachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "company" => Ok(InsightTerritory::Company),
            "customer" => Ok(InsightTerritory::Customer),
            "competitor" => Ok(InsightTerritory::Competitor),
            "general" => Ok(InsightTerritory::General),
            _ => Err(crate::error::CoachError::InvalidTerritory(s.to_string())),
        }
    }
}

impl From<Territory> for InsightTerritory {
    fn from(t: Territory) -> Self {
        match t {
            Territory::Company => InsightTerritory::Company,
            Territory::Customer => InsightTerritory::Customer,
            Territory::Competitor => InsightTerritory::Competitor,
        }
    }
}

// ---------------------------------------------------------------------------
// AreaStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaStatus {
    Unexplored,
    InProgress,
    Mapped,
}

impl AreaStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AreaStatus::Unexplored => "unexplored",
            AreaStatus::InProgress => "in_progress",
            AreaStatus::Mapped => "mapped",
        }
    }
}

impl fmt::Display for AreaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Quadrant
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quadrant {
    Invest,
    Explore,
    Harvest,
    Divest,
}

impl Quadrant {
    pub fn as_str(self) -> &'static str {
        match self {
            Quadrant::Invest => "invest",
            Quadrant::Explore => "explore",
            Quadrant::Harvest => "harvest",
            Quadrant::Divest => "divest",
        }
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TensionImpact
// ---------------------------------------------------------------------------

/// Severity of a strategic tension. Always supplied by the synthesis step;
/// never inferred from evidence counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TensionImpact {
    Blocking,
    Significant,
    Minor,
}

impl fmt::Display for TensionImpact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TensionImpact::Blocking => "blocking",
            TensionImpact::Significant => "significant",
            TensionImpact::Minor => "minor",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
