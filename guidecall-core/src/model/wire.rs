use serde::{Deserialize, Serialize};

/// Payload carried by every message without auxiliary data.
pub const EMPTY_PAYLOAD: &str = "{}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageType {
    Started,
    NextStep,
    Finished,
    Aborted,
}

/// Step announced to the operator when the specialist moves on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextStepInfo {
    pub name: String,
    pub description: String,
}

impl NextStepInfo {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Application message sent over the data sub-channel.
///
/// On the wire: `{ "type": "nextStep", "data": "{\"name\":..}" }`. `data` is
/// itself serialized JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub data: String,
}

impl WireMessage {
    fn empty(kind: MessageType) -> Self {
        Self {
            kind,
            data: EMPTY_PAYLOAD.to_owned(),
        }
    }

    pub fn started() -> Self {
        Self::empty(MessageType::Started)
    }

    pub fn finished() -> Self {
        Self::empty(MessageType::Finished)
    }

    pub fn aborted() -> Self {
        Self::empty(MessageType::Aborted)
    }

    pub fn next_step(info: &NextStepInfo) -> Result<Self, serde_json::Error> {
        Ok(Self {
            kind: MessageType::NextStep,
            data: serde_json::to_string(info)?,
        })
    }

    /// Decodes the `NextStep` payload, `None` for any other type.
    pub fn next_step_info(&self) -> Option<NextStepInfo> {
        match self.kind {
            MessageType::NextStep => serde_json::from_str(&self.data).ok(),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
