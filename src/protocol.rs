use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

/// Window identifier as reported by bspwm (an X11 window id).
pub type WindowId = i64;

/// Message type tag, carried on the wire as a small integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum MessageType {
    Hello = 0,
    CurrentWindow = 1,
    AddCurrentWindow = 2,
    RemoveCurrentWindow = 3,
    ShowNextWindow = 4,
    ShowPreviousWindow = 5,
    ShowAllWindows = 6,
    SetWindowVisibility = 7,
    Error = 8,
}

/// All message types a daemon is expected to serve (everything but Error,
/// which is only ever a response).
pub const REQUEST_TYPES: [MessageType; 8] = [
    MessageType::Hello,
    MessageType::CurrentWindow,
    MessageType::AddCurrentWindow,
    MessageType::RemoveCurrentWindow,
    MessageType::ShowNextWindow,
    MessageType::ShowPreviousWindow,
    MessageType::ShowAllWindows,
    MessageType::SetWindowVisibility,
];

#[derive(Debug, Clone, Error)]
#[error("unknown message type {0}")]
pub struct UnknownMessageType(pub u8);

impl From<MessageType> for u8 {
    fn from(ty: MessageType) -> u8 {
        ty as u8
    }
}

impl TryFrom<u8> for MessageType {
    type Error = UnknownMessageType;

    fn try_from(value: u8) -> Result<Self, UnknownMessageType> {
        match value {
            0 => Ok(MessageType::Hello),
            1 => Ok(MessageType::CurrentWindow),
            2 => Ok(MessageType::AddCurrentWindow),
            3 => Ok(MessageType::RemoveCurrentWindow),
            4 => Ok(MessageType::ShowNextWindow),
            5 => Ok(MessageType::ShowPreviousWindow),
            6 => Ok(MessageType::ShowAllWindows),
            7 => Ok(MessageType::SetWindowVisibility),
            8 => Ok(MessageType::Error),
            other => Err(UnknownMessageType(other)),
        }
    }
}

/// A single request or response as it travels over the socket.
///
/// `id` is a per-connection correlation token chosen by the client and
/// echoed back unchanged in the matching response. `data` is a
/// type-specific payload; null when the message carries none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub ty: MessageType,
    pub id: u64,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl Message {
    /// A request carrying no payload.
    pub fn request(ty: MessageType, id: u64) -> Self {
        Message {
            ty,
            id,
            data: Value::Null,
        }
    }

    /// A payload-free success response echoing the request id.
    pub fn reply(ty: MessageType, id: u64) -> Self {
        Self::request(ty, id)
    }

    /// A success response with a serialized payload.
    pub fn reply_with<T: Serialize>(ty: MessageType, id: u64, payload: &T) -> Result<Self> {
        Ok(Message {
            ty,
            id,
            data: serde_json::to_value(payload).context("failed to serialize payload")?,
        })
    }

    /// An error response carrying the given detail string.
    pub fn error(id: u64, details: impl Into<String>) -> Self {
        let payload = ErrorPayload {
            details: details.into(),
        };
        // ErrorPayload is a plain struct of strings; serialization cannot fail.
        Message {
            ty: MessageType::Error,
            id,
            data: serde_json::to_value(&payload).unwrap_or(Value::Null),
        }
    }

    /// Deserialize this message's payload as `T`.
    pub fn payload<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        serde_json::from_value(self.data.clone()).context("malformed message payload")
    }
}

/// Window metadata as reported by `bspc query -T`.
///
/// The state machine only ever reads `id` and `hidden`; everything else in
/// bspwm's node JSON round-trips untouched through the flattened map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub id: WindowId,
    #[serde(default)]
    pub hidden: bool,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, Value>,
}

/// Payload of a successful CurrentWindow response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWindowPayload {
    pub window: WindowInfo,
}

/// Payload of a SetWindowVisibility request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetVisibilityPayload {
    pub id: WindowId,
    pub visible: bool,
}

/// Payload of an Error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub details: String,
}

/// Get the default path to the daemon socket.
pub fn get_socket_path() -> Result<PathBuf> {
    let runtime_dir = dirs::runtime_dir()
        .or_else(dirs::cache_dir)
        .context("Could not determine runtime directory")?;

    Ok(runtime_dir.join("bspwm-scratchpad.sock"))
}
