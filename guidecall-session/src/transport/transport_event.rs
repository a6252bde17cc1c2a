use crate::media::MediaStream;
use guidecall_core::PeerEndpoint;

/// Events raised by the signaling side of a peer.
#[derive(Debug, Clone)]
pub enum PeerEvent {
    /// The rendezvous service accepted us under this id.
    Open(PeerEndpoint),

    /// The link dropped. The peer may still be reopened.
    Disconnected,

    /// The peer is gone for good.
    Closed,

    /// Reported by the service or the link. Not terminal by itself.
    Error(String),
}

/// Events raised by an outgoing media call.
#[derive(Debug, Clone)]
pub enum MediaEvent {
    /// A remote stream arrived. The first one marks the call as open.
    Stream(MediaStream),
    Closed,
    Error(String),
}

/// Events raised by an outgoing data channel.
#[derive(Debug, Clone)]
pub enum DataEvent {
    Open,
    Message(String),
    Closed,
    Error(String),
}
