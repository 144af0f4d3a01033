//! Outbound push messages.
//!
//! Wire shape:
//!
//! ```text
//! {"op":"DISPATCH","t":1700000000000,"d":{"type":"cosmetics.create","body":{...}},"wh":"<session>"}
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Opcode {
    Dispatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "cosmetics.create")]
    CreateCosmetic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectKind {
    Cosmetic,
}

/// Describes the object a dispatch is about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeMap {
    pub id: String,
    pub kind: ObjectKind,
    /// Only meaningful to the whispered session, not a global state change.
    pub contextual: bool,
    pub object: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchPayload {
    #[serde(rename = "type")]
    pub event: EventType,
    pub body: ChangeMap,
}

impl DispatchPayload {
    /// A contextual "cosmetic created" event carrying a presentation object.
    pub fn create_cosmetic(id: impl Into<String>, object: serde_json::Value) -> Self {
        Self {
            event: EventType::CreateCosmetic,
            body: ChangeMap {
                id: id.into(),
                kind: ObjectKind::Cosmetic,
                contextual: true,
                object,
            },
        }
    }
}

/// A push message targeted at one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub op: Opcode,
    /// Unix milliseconds at construction.
    #[serde(rename = "t")]
    pub timestamp: i64,
    #[serde(rename = "d")]
    pub data: DispatchPayload,
    #[serde(rename = "wh", default, skip_serializing_if = "String::is_empty")]
    pub whisper: String,
}

impl OutboundMessage {
    pub fn dispatch(data: DispatchPayload, whisper: impl Into<String>) -> Self {
        Self {
            op: Opcode::Dispatch,
            timestamp: chrono::Utc::now().timestamp_millis(),
            data,
            whisper: whisper.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
