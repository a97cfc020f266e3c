//! The streaming session controller: owns one conversation's message list,
//! drives one assistant turn at a time, and routes completed turns through
//! the marker parser into progress and XP updates.

use std::collections::BTreeMap;

use futures::{FutureExt, StreamExt};
use tokio_util::sync::CancellationToken;

use coach_core::gamification::{CoachEvent, Ledger};
use coach_core::marker::{parse_assistant_text, ParsedAssistantText};
use coach_core::phase::{GateContext, PhaseMachine};
use coach_core::progress::{ProgressBoard, TerritoryInsight};
use coach_core::types::{AreaStatus, Phase, Territory};

use crate::transport::CoachTransport;
use crate::types::{
    CapturePersistRequest, ChatMessage, ContextSnapshot, EventPost, MessageMeta, SendTurnRequest,
};
use crate::{Result, SessionError};

/// Trailing notice appended to a turn that was stopped mid-stream.
pub const STOPPED_NOTICE: &str = "*Response stopped by user*";

// ─── Turn bookkeeping ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    /// Request sent, first byte not yet received.
    Loading,
    Streaming,
}

/// A persistence or gamification side effect attempted after a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    PersistCapture {
        territory: Territory,
        research_area: String,
        status: AreaStatus,
    },
    PostEvent {
        event_type: String,
    },
}

/// The explicit, testable record of whether a side effect landed. Failures
/// are non-fatal to the session by contract; the orchestrator decides what
/// to do with them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideEffectOutcome {
    pub effect: SideEffect,
    pub ok: bool,
    pub detail: Option<String>,
}

/// Terminal state of one `send_message` call.
#[derive(Debug)]
pub enum TurnOutcome {
    /// A turn was already in flight; this send was silently ignored.
    Ignored,
    /// The user aborted mid-stream. Partial text, if any, was kept as an
    /// assistant message with the stopped notice; no side effects ran.
    Stopped,
    Completed {
        parsed: ParsedAssistantText,
        effects: Vec<SideEffectOutcome>,
        xp_awarded: u64,
    },
}

enum StreamEnd {
    Completed(String),
    Cancelled(String),
}

// ─── SessionController ────────────────────────────────────────────────────

/// One conversation's session. Single-writer: the message list, progress
/// board and ledger are owned here and there is at most one in-flight turn.
pub struct SessionController<T: CoachTransport> {
    transport: T,
    conversation_id: String,
    messages: Vec<ChatMessage>,
    state: TurnState,
    buffer: String,
    cancel: Option<CancellationToken>,
    board: ProgressBoard,
    ledger: Ledger,
    phases: PhaseMachine,
    snapshot: ContextSnapshot,
    synthesis_generated: bool,
    research_context: Option<serde_json::Value>,
}

impl<T: CoachTransport> SessionController<T> {
    pub fn new(transport: T, conversation_id: impl Into<String>) -> Self {
        Self {
            transport,
            conversation_id: conversation_id.into(),
            messages: Vec::new(),
            state: TurnState::Idle,
            buffer: String::new(),
            cancel: None,
            board: ProgressBoard::default(),
            ledger: Ledger::new(),
            phases: PhaseMachine::default(),
            snapshot: ContextSnapshot::default(),
            synthesis_generated: false,
            research_context: None,
        }
    }

    /// Restore a session from stored conversation state: the phase string
    /// from the framework-state blob (unknown values read as discovery) and
    /// the persisted insight rows.
    pub fn restore(&mut self, stored_phase: &str, rows: Vec<TerritoryInsight>) {
        self.phases = PhaseMachine::from_stored(stored_phase);
        self.board.load_rows(rows);
    }

    // ─── Accessors ────────────────────────────────────────────────────────

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    /// The accumulating text of the in-flight turn, for live display. Not a
    /// committed message.
    pub fn live_buffer(&self) -> &str {
        &self.buffer
    }

    pub fn board(&self) -> &ProgressBoard {
        &self.board
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn phase(&self) -> Phase {
        self.phases.current()
    }

    pub fn highest_phase_reached(&self) -> Phase {
        self.phases.highest_reached()
    }

    pub fn set_research_context(&mut self, context: Option<serde_json::Value>) {
        self.research_context = context;
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    /// Abort the in-flight turn, if any. Safe to call when idle.
    pub fn cancel(&self) {
        if let Some(token) = &self.cancel {
            token.cancel();
        }
    }

    // ─── Sending a turn ───────────────────────────────────────────────────

    pub async fn send_message(&mut self, text: &str) -> Result<TurnOutcome> {
        self.send_message_with_cancel(text, CancellationToken::new())
            .await
    }

    /// Send one user message and drive the assistant turn to a terminal
    /// state. The caller may keep a clone of `cancel` to abort mid-stream;
    /// starting a turn invalidates any handle from a previous turn.
    pub async fn send_message_with_cancel(
        &mut self,
        text: &str,
        cancel: CancellationToken,
    ) -> Result<TurnOutcome> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        if self.state != TurnState::Idle {
            return Ok(TurnOutcome::Ignored);
        }

        // Optimistic user message; rolled back on transport failure.
        self.messages.push(ChatMessage::user(trimmed));
        self.cancel = Some(cancel.clone());
        self.state = TurnState::Loading;

        let result = self.run_stream(trimmed, &cancel).await;

        // Guaranteed cleanup on every path, before side effects run, so the
        // send gate never waits on persistence.
        self.state = TurnState::Idle;
        self.buffer.clear();
        self.cancel = None;

        match result {
            Ok(StreamEnd::Completed(raw)) => {
                let parsed = parse_assistant_text(&raw);
                let meta = MessageMeta {
                    research_captured: parsed.has_research_signals(),
                    ..MessageMeta::default()
                };
                self.messages
                    .push(ChatMessage::assistant(parsed.display_text.clone(), meta));

                let (effects, xp_awarded) = self.dispatch_effects(&parsed).await;
                Ok(TurnOutcome::Completed {
                    parsed,
                    effects,
                    xp_awarded,
                })
            }
            Ok(StreamEnd::Cancelled(partial)) => {
                // Markers can be cut mid-tag on an abort, so the marker
                // pipeline never runs here and no side effects fire.
                if !partial.is_empty() {
                    let meta = MessageMeta {
                        stopped: true,
                        ..MessageMeta::default()
                    };
                    self.messages.push(ChatMessage::assistant(
                        format!("{partial}\n\n{STOPPED_NOTICE}"),
                        meta,
                    ));
                }
                Ok(TurnOutcome::Stopped)
            }
            Err(e) => {
                // Roll back the optimistic user message; the turn is fully
                // absent after a transport failure.
                self.messages.pop();
                Err(e)
            }
        }
    }

    async fn run_stream(&mut self, text: &str, cancel: &CancellationToken) -> Result<StreamEnd> {
        let request = SendTurnRequest {
            message: text.to_string(),
            research_context: self.research_context.clone(),
        };
        let mut stream = self
            .transport
            .send_turn(&self.conversation_id, &request, cancel.clone())
            .await?;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    // Chunks that arrived before the abort landed still
                    // belong to the partial text.
                    while let Some(Some(Ok(chunk))) = stream.next().now_or_never() {
                        self.buffer.push_str(&chunk);
                    }
                    return Ok(StreamEnd::Cancelled(std::mem::take(&mut self.buffer)));
                }
                chunk = stream.next() => match chunk {
                    None => {
                        let buffer = std::mem::take(&mut self.buffer);
                        return if cancel.is_cancelled() {
                            Ok(StreamEnd::Cancelled(buffer))
                        } else {
                            Ok(StreamEnd::Completed(buffer))
                        };
                    }
                    Some(Ok(text)) => {
                        if self.state == TurnState::Loading {
                            self.state = TurnState::Streaming;
                        }
                        self.buffer.push_str(&text);
                    }
                    Some(Err(e)) => return Err(e),
                }
            }
        }
    }

    // ─── Side effects ─────────────────────────────────────────────────────

    /// Run the post-turn side effects: persist research captures and area
    /// completions, award XP. Every attempt is reported as an outcome;
    /// failures are logged and never roll back the displayed turn.
    async fn dispatch_effects(
        &mut self,
        parsed: &ParsedAssistantText,
    ) -> (Vec<SideEffectOutcome>, u64) {
        let mut effects = Vec::new();
        let mut xp = 0u64;

        xp += self.award(CoachEvent::MessageSent, &mut effects).await;

        // One persist command per captured (territory, area) pair.
        let mut grouped: BTreeMap<(Territory, &str), BTreeMap<String, String>> = BTreeMap::new();
        for capture in &parsed.research_captures {
            match self.board.record_response(
                capture.territory,
                &capture.area_id,
                capture.question_index,
                capture.answer.clone(),
            ) {
                Ok(_) => {
                    grouped
                        .entry((capture.territory, capture.area_id.as_str()))
                        .or_default()
                        .insert(capture.question_index.to_string(), capture.answer.clone());
                }
                Err(e) => {
                    tracing::warn!(
                        territory = %capture.territory,
                        area = %capture.area_id,
                        error = %e,
                        "dropping invalid research capture"
                    );
                }
            }
        }
        for ((territory, research_area), responses) in grouped {
            let research_area = research_area.to_string();
            self.persist(territory, research_area, responses, AreaStatus::InProgress, &mut effects)
                .await;
            xp += self.award(CoachEvent::ResearchCaptured, &mut effects).await;
        }

        for completion in &parsed.area_completions {
            let was_complete = self.board.territory_complete(completion.territory);
            if let Err(e) = self
                .board
                .complete_area(completion.territory, &completion.area_id)
            {
                tracing::warn!(
                    territory = %completion.territory,
                    area = %completion.area_id,
                    error = %e,
                    "dropping invalid area completion"
                );
                continue;
            }
            let responses = self
                .board
                .insight(completion.territory, &completion.area_id)
                .map(|insight| {
                    insight
                        .responses
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.clone()))
                        .collect()
                })
                .unwrap_or_default();
            self.persist(
                completion.territory,
                completion.area_id.clone(),
                responses,
                AreaStatus::Mapped,
                &mut effects,
            )
            .await;
            xp += self.award(CoachEvent::AreaMapped, &mut effects).await;

            if !was_complete && self.board.territory_complete(completion.territory) {
                xp += self
                    .award(CoachEvent::TerritoryComplete(completion.territory), &mut effects)
                    .await;
            }
        }

        for _ in &parsed.insights {
            xp += self.award(CoachEvent::InsightCaptured, &mut effects).await;
        }
        for _ in &parsed.framework_refs {
            xp += self.award(CoachEvent::FrameworkRequested, &mut effects).await;
        }

        (effects, xp)
    }

    async fn persist(
        &mut self,
        territory: Territory,
        research_area: String,
        responses: BTreeMap<String, String>,
        status: AreaStatus,
        effects: &mut Vec<SideEffectOutcome>,
    ) {
        let request = CapturePersistRequest {
            conversation_id: self.conversation_id.clone(),
            territory,
            research_area: research_area.clone(),
            responses,
            status,
        };
        let effect = SideEffect::PersistCapture {
            territory,
            research_area,
            status,
        };
        match self.transport.persist_capture(&request).await {
            Ok(_) => effects.push(SideEffectOutcome {
                effect,
                ok: true,
                detail: None,
            }),
            Err(e) => {
                tracing::warn!(
                    territory = %territory,
                    area = %request.research_area,
                    error = %e,
                    "capture persistence failed"
                );
                effects.push(SideEffectOutcome {
                    effect,
                    ok: false,
                    detail: Some(e.to_string()),
                });
            }
        }
    }

    /// Apply an XP event to the local ledger and post it to the backend.
    /// The local award always lands; the post is fire-and-forget.
    async fn award(&mut self, event: CoachEvent, effects: &mut Vec<SideEffectOutcome>) -> u64 {
        let delta = self.ledger.apply(&event);
        let post = EventPost {
            event_type: event.as_wire().to_string(),
            metadata: None,
        };
        let effect = SideEffect::PostEvent {
            event_type: post.event_type.clone(),
        };
        match self.transport.post_event(&self.conversation_id, &post).await {
            Ok(()) => effects.push(SideEffectOutcome {
                effect,
                ok: true,
                detail: None,
            }),
            Err(e) => {
                tracing::warn!(event = %post.event_type, error = %e, "event post failed");
                effects.push(SideEffectOutcome {
                    effect,
                    ok: false,
                    detail: Some(e.to_string()),
                });
            }
        }
        delta.xp_awarded
    }

    // ─── Phase navigation ─────────────────────────────────────────────────

    /// Re-read the context-awareness snapshot from the store.
    pub async fn refresh_context(&mut self) -> Result<ContextSnapshot> {
        let snapshot = self.transport.fetch_context(&self.conversation_id).await?;
        self.snapshot = snapshot;
        Ok(snapshot)
    }

    /// Gate inputs for phase transitions. The store snapshot is the baseline;
    /// areas mapped locally this session count immediately, without waiting
    /// for capture persistence to land.
    pub fn gate_context(&self) -> GateContext {
        GateContext {
            materials_count: self.snapshot.materials_count,
            mapped_area_count: self
                .snapshot
                .territory_progress
                .total_mapped()
                .max(self.board.mapped_area_count()),
            synthesis_available: self.snapshot.synthesis_available || self.synthesis_generated,
        }
    }

    /// Navigate to `target`, enforcing the forward guards.
    pub fn navigate_phase(&mut self, target: Phase) -> Result<Phase> {
        let ctx = self.gate_context();
        Ok(self.phases.navigate(target, &ctx)?)
    }

    /// Record that the synthesis step produced a result for this
    /// conversation; opens the bets gate and awards the synthesis event.
    pub async fn note_synthesis_generated(&mut self) -> Vec<SideEffectOutcome> {
        self.synthesis_generated = true;
        let mut effects = Vec::new();
        self.award(CoachEvent::SynthesisGenerated, &mut effects).await;
        effects
    }

    /// Record that the user created a strategic bet.
    pub async fn note_bet_created(&mut self) -> Vec<SideEffectOutcome> {
        let mut effects = Vec::new();
        self.award(CoachEvent::BetCreated, &mut effects).await;
        effects
    }
}
