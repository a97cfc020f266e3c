use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoachError {
    #[error("invalid phase: {0}")]
    InvalidPhase(String),

    #[error("invalid territory: {0}")]
    InvalidTerritory(String),

    #[error("unknown research area '{area}' for territory '{territory}'")]
    UnknownArea { territory: String, area: String },

    #[error("question index {index} out of range for area '{area}' ({count} questions)")]
    QuestionIndexOutOfRange {
        area: String,
        index: u32,
        count: u32,
    },

    #[error("score {value} for '{dimension}' is out of range (must be within 1.0..=10.0)")]
    ScoreOutOfRange { dimension: String, value: f64 },

    #[error("cannot move from {from} to {to}: {reason}")]
    GateNotSatisfied {
        from: String,
        to: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, CoachError>;
