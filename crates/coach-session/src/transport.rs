//! Transport seam between the session controller and the coaching backend.
//!
//! The backend is an external collaborator: a chat endpoint that streams raw
//! assistant text, plus a relational store for insight rows, a context read,
//! and a fire-and-forget gamification event sink. [`CoachTransport`] is the
//! trait the controller talks to; [`HttpTransport`] is the production
//! implementation over reqwest.

use async_trait::async_trait;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::stream::TokenStream;
use crate::types::{
    BackendError, CapturePersistRequest, ContextSnapshot, EventPost, InsightRow, SendTurnRequest,
};
use crate::{Result, SessionError};

// ─── CoachTransport ───────────────────────────────────────────────────────

#[async_trait]
pub trait CoachTransport: Send + Sync {
    /// Open one assistant turn. The returned stream yields raw text chunks;
    /// the transport must stop producing chunks once `cancel` fires.
    async fn send_turn(
        &self,
        conversation_id: &str,
        request: &SendTurnRequest,
        cancel: CancellationToken,
    ) -> Result<TokenStream>;

    /// Persist a research capture; the store echoes the updated row.
    async fn persist_capture(&self, request: &CapturePersistRequest) -> Result<InsightRow>;

    /// Read the context-awareness snapshot for a conversation.
    async fn fetch_context(&self, conversation_id: &str) -> Result<ContextSnapshot>;

    /// Fire-and-forget XP event. Only HTTP success/failure is observed.
    async fn post_event(&self, conversation_id: &str, event: &EventPost) -> Result<()>;
}

// ─── HttpTransport ────────────────────────────────────────────────────────

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Map a non-2xx response to `SessionError::Backend`, reading the
    /// `{"error": "..."}` body when one is present.
    async fn backend_error(response: reqwest::Response) -> SessionError {
        let status = response.status().as_u16();
        let message = response
            .json::<BackendError>()
            .await
            .map(|b| b.error)
            .unwrap_or_else(|_| "unknown backend error".to_string());
        SessionError::Backend { status, message }
    }
}

#[async_trait]
impl CoachTransport for HttpTransport {
    async fn send_turn(
        &self,
        conversation_id: &str,
        request: &SendTurnRequest,
        cancel: CancellationToken,
    ) -> Result<TokenStream> {
        let response = self
            .client
            .post(self.url(&format!("/conversations/{conversation_id}/messages")))
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::backend_error(response).await);
        }

        let (tx, stream) = TokenStream::channel(32);
        tokio::spawn(async move {
            let mut body = response.bytes_stream();
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    chunk = body.next() => match chunk {
                        None => break,
                        Some(Ok(bytes)) => {
                            let text = String::from_utf8_lossy(&bytes).into_owned();
                            if tx.send(Ok(text)).await.is_err() {
                                break; // Receiver dropped
                            }
                        }
                        Some(Err(e)) => {
                            let _ = tx.send(Err(SessionError::Http(e))).await;
                            break;
                        }
                    }
                }
            }
        });

        Ok(stream)
    }

    async fn persist_capture(&self, request: &CapturePersistRequest) -> Result<InsightRow> {
        let response = self
            .client
            .post(self.url("/territory-insights"))
            .json(request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::backend_error(response).await);
        }
        Ok(response.json().await?)
    }

    async fn fetch_context(&self, conversation_id: &str) -> Result<ContextSnapshot> {
        let response = self
            .client
            .get(self.url(&format!("/conversations/{conversation_id}/context")))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::backend_error(response).await);
        }
        Ok(response.json().await?)
    }

    async fn post_event(&self, conversation_id: &str, event: &EventPost) -> Result<()> {
        let response = self
            .client
            .post(self.url(&format!("/conversations/{conversation_id}/events")))
            .json(event)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::backend_error(response).await);
        }
        Ok(())
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
