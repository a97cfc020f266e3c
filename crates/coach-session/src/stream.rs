use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::Result;

// ─── TokenStream ──────────────────────────────────────────────────────────

/// The receiving half of one in-flight assistant turn: raw text chunks in
/// arrival order, then the end of the turn.
///
/// Transports feed the sender half from wherever the bytes come from (an
/// HTTP response body in production, a script in tests); the controller only
/// ever sees this half. The turn's cancellation token stops the feeding
/// side, so after an abort the stream drains whatever was already sent and
/// ends.
#[derive(Debug)]
pub struct TokenStream {
    rx: mpsc::Receiver<Result<String>>,
}

impl TokenStream {
    /// Create a channel pair: the sender side feeds chunks, the returned
    /// stream yields them. Used by every transport implementation and by
    /// tests to inject scripted turns.
    pub fn channel(buffer: usize) -> (mpsc::Sender<Result<String>>, TokenStream) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, TokenStream { rx })
    }
}

impl Stream for TokenStream {
    type Item = Result<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
