pub mod classifier;
pub mod error;
pub mod gamification;
pub mod marker;
pub mod phase;
pub mod progress;
pub mod types;

pub use error::{CoachError, Result};
