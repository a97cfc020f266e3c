//! `coach-session` — the async boundary of the strategy coach.
//!
//! Owns one conversation's streaming turn loop on top of the pure domain
//! logic in `coach-core`:
//!
//! ```text
//! user input
//!     │
//!     ▼
//! SessionController   ← optimistic message, busy gate, live buffer
//!     │
//!     ▼
//! CoachTransport      ← send-turn POST, streamed text body
//!     │
//!     ▼
//! TokenStream         ← mpsc-backed chunks, cooperative cancellation
//!     │
//!     ▼
//! marker parser       ← clean display text + structured captures
//!     │
//!     ▼
//! progress board / XP ledger / phase gates + persistence side effects
//! ```
//!
//! Side effects (capture persistence, XP posts) are at-most-once toward the
//! store: failures are logged, reported as [`SideEffectOutcome`]s, and never
//! roll back the displayed conversation.

pub mod error;
pub mod session;
pub mod stream;
pub mod transport;
pub mod types;


pub use error::{Result, SessionError};
pub use session::{
    SessionController, SideEffect, SideEffectOutcome, TurnOutcome, TurnState, STOPPED_NOTICE,
};
pub use stream::TokenStream;
pub use transport::{CoachTransport, HttpTransport};
pub use types::{
    CapturePersistRequest, ChatMessage, ContextSnapshot, EventPost, InsightRow, MessageId,
    MessageMeta, Role, SendTurnRequest,
};
