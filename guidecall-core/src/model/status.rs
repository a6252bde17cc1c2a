use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of the link to the rendezvous service.
///
/// Only ever produced from server-originated events. `Error` is an
/// announcement and does not end the link by itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalingStatus {
    Connected,
    Disconnected,
    Closed,
    Error,
}

/// Lifecycle of the peer session, media and data sub-channels combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Opened,
    Closed,
    Error,
}

impl fmt::Display for SignalingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Closed => "closed",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Opened => "opened",
            Self::Closed => "closed",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}
