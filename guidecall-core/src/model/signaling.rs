use crate::model::peer::{ConnectionId, PeerEndpoint};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

/// Which sub-channel an offer negotiates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Media,
    Data,
}

/// Frames exchanged with the rendezvous service.
///
/// `Open`, `Error` are pushed by the server. Everything addressed with a
/// `dst` is relayed verbatim to that endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d")]
pub enum SignalMessage {
    Open {
        peer_id: PeerEndpoint,
    },
    Offer {
        src: PeerEndpoint,
        dst: PeerEndpoint,
        connection_id: ConnectionId,
        kind: ChannelKind,
        sdp: String,
    },
    Answer {
        src: PeerEndpoint,
        dst: PeerEndpoint,
        connection_id: ConnectionId,
        sdp: String,
    },
    Candidate {
        src: PeerEndpoint,
        dst: PeerEndpoint,
        connection_id: ConnectionId,
        candidate: String,
    },
    Leave {
        src: PeerEndpoint,
        dst: PeerEndpoint,
        connection_id: ConnectionId,
    },
    Error {
        reason: String,
    },
    Heartbeat,
}

impl SignalMessage {
    /// Endpoint a relayed frame is addressed to.
    pub fn destination(&self) -> Option<&PeerEndpoint> {
        match self {
            Self::Offer { dst, .. }
            | Self::Answer { dst, .. }
            | Self::Candidate { dst, .. }
            | Self::Leave { dst, .. } => Some(dst),
            _ => None,
        }
    }

    pub fn connection_id(&self) -> Option<ConnectionId> {
        match self {
            Self::Offer { connection_id, .. }
            | Self::Answer { connection_id, .. }
            | Self::Candidate { connection_id, .. }
            | Self::Leave { connection_id, .. } => Some(*connection_id),
            _ => None,
        }
    }
}
