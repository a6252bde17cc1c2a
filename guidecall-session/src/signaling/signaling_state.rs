/// Where the manager stands with the rendezvous service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingState {
    Uninitialized,
    Initializing,
    Connected,
    Disconnected,
    Closed,
}

impl SignalingState {
    /// A link is being opened or is up, so `initialize` must be refused.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Initializing | Self::Connected)
    }
}

/// Progress of the peer session towards the remote endpoint.
///
/// Media always completes before data is requested, and `Opened` is only
/// reached with both sub-channels up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    Idle,
    MediaPending,
    MediaOpen,
    DataPending,
    Opened,
    Closed,
    Error,
}

impl PeerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Error)
    }
}
