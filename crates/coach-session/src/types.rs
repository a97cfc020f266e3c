//! Chat message model and the wire DTOs for the coaching backend.

use chrono::{DateTime, Utc};
use coach_core::types::{AreaStatus, Territory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

// ─── MessageId ────────────────────────────────────────────────────────────

/// Identity of a chat message. Optimistic messages start `Pending` with a
/// locally generated UUID and are committed to the server-assigned id once
/// the store echoes the row back — reconciliation is explicit, never based
/// on id-string patterns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "id", rename_all = "snake_case")]
pub enum MessageId {
    Pending(Uuid),
    Committed(String),
}

impl MessageId {
    pub fn new_pending() -> Self {
        MessageId::Pending(Uuid::new_v4())
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, MessageId::Pending(_))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::Pending(id) => write!(f, "pending:{id}"),
            MessageId::Committed(id) => f.write_str(id),
        }
    }
}

// ─── ChatMessage ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMeta {
    /// Set when the finalized assistant turn carried research captures or
    /// area completions.
    #[serde(default)]
    pub research_captured: bool,
    #[serde(default)]
    pub liked: bool,
    #[serde(default)]
    pub bookmarked: bool,
    /// Set when the turn was cancelled mid-stream and the partial text was
    /// kept.
    #[serde(default)]
    pub stopped: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub meta: MessageMeta,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new_pending(),
            role: Role::User,
            content: content.into(),
            meta: MessageMeta::default(),
            created_at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>, meta: MessageMeta) -> Self {
        Self {
            id: MessageId::new_pending(),
            role: Role::Assistant,
            content: content.into(),
            meta,
            created_at: Utc::now(),
        }
    }

    /// Adopt the server-assigned id for a persisted row.
    pub fn commit(&mut self, server_id: impl Into<String>) {
        self.id = MessageId::Committed(server_id.into());
    }
}

// ─── Send-turn request ────────────────────────────────────────────────────

/// Body of the send-turn POST. The response is a raw streamed text payload;
/// non-2xx responses carry a [`BackendError`] JSON body instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTurnRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research_context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendError {
    pub error: String,
}

// ─── Capture persistence ──────────────────────────────────────────────────

/// Persist one research-area capture. Question indexes travel as string
/// keys, matching the store's JSON column shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturePersistRequest {
    pub conversation_id: String,
    pub territory: Territory,
    pub research_area: String,
    pub responses: BTreeMap<String, String>,
    pub status: AreaStatus,
}

/// The insight row as the store echoes it back. The core never re-derives
/// this; it is display data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightRow {
    pub conversation_id: String,
    pub territory: Territory,
    pub research_area: String,
    #[serde(default)]
    pub responses: BTreeMap<String, String>,
    pub status: AreaStatus,
}

// ─── Context-awareness read ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressPair {
    pub mapped: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerritoryProgressMap {
    pub company: ProgressPair,
    pub customer: ProgressPair,
    pub competitor: ProgressPair,
}

impl TerritoryProgressMap {
    pub fn total_mapped(&self) -> u32 {
        self.company.mapped + self.customer.mapped + self.competitor.mapped
    }
}

/// Snapshot of everything the phase gates need, as served by the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSnapshot {
    pub materials_count: u32,
    pub territory_progress: TerritoryProgressMap,
    pub synthesis_available: bool,
}

// ─── Gamification event post ──────────────────────────────────────────────

/// Fire-and-forget XP event. No response body is relied upon beyond HTTP
/// success/failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPost {
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_then_committed() {
        let mut msg = ChatMessage::user("hello");
        assert!(msg.id.is_pending());
        msg.commit("msg-42");
        assert_eq!(msg.id, MessageId::Committed("msg-42".to_string()));
    }

    #[test]
    fn send_turn_request_camel_case() {
        let req = SendTurnRequest {
            message: "hi".to_string(),
            research_context: Some(serde_json::json!({"territory": "company"})),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"researchContext\""));

        let bare = SendTurnRequest {
            message: "hi".to_string(),
            research_context: None,
        };
        let json = serde_json::to_string(&bare).unwrap();
        assert!(!json.contains("researchContext"));
    }

    #[test]
    fn capture_request_wire_shape() {
        let mut responses = BTreeMap::new();
        responses.insert("0".to_string(), "We own the data".to_string());
        let req = CapturePersistRequest {
            conversation_id: "c1".to_string(),
            territory: Territory::Company,
            research_area: "capabilities".to_string(),
            responses,
            status: AreaStatus::InProgress,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["conversation_id"], "c1");
        assert_eq!(json["territory"], "company");
        assert_eq!(json["research_area"], "capabilities");
        assert_eq!(json["status"], "in_progress");
        assert_eq!(json["responses"]["0"], "We own the data");
    }

    #[test]
    fn context_snapshot_camel_case_roundtrip() {
        let raw = r#"{
            "materialsCount": 2,
            "territoryProgress": {
                "company": {"mapped": 1, "total": 3},
                "customer": {"mapped": 2, "total": 3},
                "competitor": {"mapped": 0, "total": 3}
            },
            "synthesisAvailable": false
        }"#;
        let snap: ContextSnapshot = serde_json::from_str(raw).unwrap();
        assert_eq!(snap.materials_count, 2);
        assert_eq!(snap.territory_progress.total_mapped(), 3);
        assert!(!snap.synthesis_available);
    }

    #[test]
    fn event_post_wire_shape() {
        let post = EventPost {
            event_type: "area_mapped".to_string(),
            metadata: None,
        };
        let json = serde_json::to_string(&post).unwrap();
        assert!(json.contains("\"eventType\":\"area_mapped\""));
        assert!(!json.contains("metadata"));
    }
}
