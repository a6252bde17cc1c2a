use crate::media::MediaStream;
use crate::transport::transport_event::{DataEvent, MediaEvent, PeerEvent};
use anyhow::Result;
use async_trait::async_trait;
use guidecall_core::PeerEndpoint;
use std::sync::Arc;
use tokio::sync::mpsc;

/// A freshly opened peer and the receiver of its signaling events.
pub struct PeerHandle {
    pub peer: Arc<dyn PeerBackend>,
    pub events: mpsc::UnboundedReceiver<PeerEvent>,
}

pub struct MediaChannel {
    pub link: Arc<dyn MediaLink>,
    pub events: mpsc::UnboundedReceiver<MediaEvent>,
}

pub struct DataChannel {
    pub link: Arc<dyn DataLink>,
    pub events: mpsc::UnboundedReceiver<DataEvent>,
}

/// Creates peers registered with a rendezvous service.
#[async_trait]
pub trait PeerConnector: Send + Sync {
    async fn open(&self) -> Result<PeerHandle>;
}

/// A local peer able to place media calls and open data channels.
#[async_trait]
pub trait PeerBackend: Send + Sync {
    /// Places a media call carrying `local`. Success is reported later as
    /// [`MediaEvent::Stream`].
    async fn call(&self, remote: &PeerEndpoint, local: &MediaStream) -> Result<MediaChannel>;

    /// Opens a reliable data channel. Success is reported later as
    /// [`DataEvent::Open`].
    async fn connect(&self, remote: &PeerEndpoint) -> Result<DataChannel>;

    fn local_id(&self) -> Option<PeerEndpoint>;

    fn is_disconnected(&self) -> bool;

    async fn disconnect(&self);

    async fn destroy(&self);
}

#[async_trait]
pub trait MediaLink: Send + Sync {
    fn is_open(&self) -> bool;

    async fn close(&self);
}

#[async_trait]
pub trait DataLink: Send + Sync {
    fn is_open(&self) -> bool;

    async fn send(&self, text: String) -> Result<()>;

    async fn close(&self);
}
