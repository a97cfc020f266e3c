use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("message is empty")]
    EmptyMessage,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("stream error: {0}")]
    Stream(String),

    #[error(transparent)]
    Core(#[from] coach_core::CoachError),
}

pub type Result<T> = std::result::Result<T, SessionError>;
