//! Bridged command frames and their typed payloads.
//!
//! A frame on the bridge channel is `"<command>:<json>"`. The JSON half is a
//! [`CommandPayload`] whose `body` shape depends on the command name, so it is
//! validated once as an opaque envelope and decoded into a concrete type only
//! after routing (see [`Command::decode`]).

use crate::model::Platform;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Command name of the user cosmetic state request.
pub const COSMETICS_COMMAND: &str = "cosmetics";

/// A frame that could not be turned into a command.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(#[from] serde_json::Error),
}

/// One frame split on its first `:`.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandEnvelope {
    pub name: String,
    pub raw_body: String,
}

impl CommandEnvelope {
    /// Splits a frame and checks that the body is well-formed JSON.
    pub fn parse(message: &str) -> Result<Self, FrameError> {
        let (name, body) = message
            .split_once(':')
            .ok_or_else(|| FrameError::MalformedFrame("bad length".to_string()))?;

        serde_json::from_str::<IgnoredAny>(body)?;

        Ok(Self {
            name: name.to_string(),
            raw_body: body.to_string(),
        })
    }

    /// Decodes the body as the payload of a specific command.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<CommandPayload<T>, FrameError> {
        Ok(serde_json::from_str(&self.raw_body)?)
    }
}

/// Envelope body: the requesting session plus a command-specific body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandPayload<T> {
    /// Client connection that asked; empty when the producer omitted it.
    #[serde(default)]
    pub session_id: String,
    pub body: T,
}

/// Cosmetic categories a client can ask about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CosmeticKind {
    Badge,
    Paint,
    Avatar,
}

/// "Tell me the cosmetic state of these identifiers on this platform."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStateCommandBody {
    #[serde(default)]
    pub platform: Platform,
    #[serde(default)]
    pub identifiers: Vec<String>,
    #[serde(default)]
    pub kinds: Vec<CosmeticKind>,
}

impl UserStateCommandBody {
    /// An empty `kinds` list means "everything".
    pub fn wants(&self, kind: CosmeticKind) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&kind)
    }
}

/// A routed command with its typed payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Cosmetics(CommandPayload<UserStateCommandBody>),
}

impl Command {
    /// Decodes the envelope for its command name.
    ///
    /// Unknown names yield `Ok(None)` so producers can ship newer commands before
    /// this side understands them.
    pub fn decode(envelope: &CommandEnvelope) -> Result<Option<Self>, FrameError> {
        match envelope.name.as_str() {
            COSMETICS_COMMAND => Ok(Some(Command::Cosmetics(envelope.decode()?))),
            _ => Ok(None),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Cosmetics(_) => COSMETICS_COMMAND,
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            Command::Cosmetics(payload) => &payload.session_id,
        }
    }
}
