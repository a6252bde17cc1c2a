use crate::config::SignalingConfig;
use crate::error::{SessionError, SessionResult};
use crate::feed::{FeedReceiver, Replay, StatusFeed};
use crate::media::MediaStream;
use crate::signaling::signaling_state::{PeerState, SignalingState};
use crate::transport::{
    DataChannel, DataEvent, DataLink, MediaChannel, MediaEvent, MediaLink, PeerBackend,
    PeerConnector, PeerEvent, PeerHandle, RtcPeerConnector,
};
use guidecall_core::{ConnectionStatus, PeerEndpoint, SignalingStatus, WireMessage};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Owns the link to the rendezvous service and the single peer session
/// (media call plus data channel) towards the remote operator.
///
/// Cheap to clone, every clone drives the same session.
#[derive(Clone)]
pub struct SignalingSessionManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    connector: Arc<dyn PeerConnector>,
    state: Mutex<ManagerState>,
}

struct ManagerState {
    /// Bumped on every initialize/destroy so events of a previous peer are ignored.
    generation: u64,
    signaling: SignalingState,
    peer_state: PeerState,
    locally_closed: bool,
    peer: Option<Arc<dyn PeerBackend>>,
    local_id: Option<PeerEndpoint>,
    local_stream: Option<MediaStream>,
    media: Option<Arc<dyn MediaLink>>,
    data: Option<Arc<dyn DataLink>>,
    signaling_feed: StatusFeed<SignalingStatus>,
    connection_feed: StatusFeed<ConnectionStatus>,
    stream_feed: StatusFeed<MediaStream>,
    pump: Option<JoinHandle<()>>,
    negotiation: Option<JoinHandle<()>>,
}

/// Parts of a peer session that are released together on close.
struct SessionParts {
    negotiation: Option<JoinHandle<()>>,
    local: Option<MediaStream>,
    media: Option<Arc<dyn MediaLink>>,
    data: Option<Arc<dyn DataLink>>,
}

impl SessionParts {
    /// Data is closed before media.
    async fn release(self) {
        if let Some(task) = self.negotiation {
            task.abort();
        }
        if let Some(local) = self.local {
            debug!("Stopped {} local tracks", local.stop_all());
        }
        if let Some(data) = self.data {
            data.close().await;
        }
        if let Some(media) = self.media {
            media.close().await;
        }
    }
}

impl ManagerState {
    fn take_session(&mut self) -> SessionParts {
        SessionParts {
            negotiation: self.negotiation.take(),
            local: self.local_stream.take(),
            media: self.media.take(),
            data: self.data.take(),
        }
    }

    fn new() -> Self {
        Self {
            generation: 0,
            signaling: SignalingState::Uninitialized,
            peer_state: PeerState::Idle,
            locally_closed: false,
            peer: None,
            local_id: None,
            local_stream: None,
            media: None,
            data: None,
            signaling_feed: StatusFeed::new(Replay::Last),
            connection_feed: StatusFeed::new(Replay::Last),
            stream_feed: StatusFeed::new(Replay::None),
            pump: None,
            negotiation: None,
        }
    }

    fn renew_feeds(&mut self) {
        self.signaling_feed.complete();
        self.connection_feed.complete();
        self.stream_feed.complete();
        self.signaling_feed = StatusFeed::new(Replay::Last);
        self.connection_feed = StatusFeed::new(Replay::Last);
        self.stream_feed = StatusFeed::new(Replay::None);
    }

    fn complete_feeds(&mut self) {
        self.signaling_feed.complete();
        self.connection_feed.complete();
        self.stream_feed.complete();
    }
}

impl Drop for ManagerInner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        for task in [state.pump.take(), state.negotiation.take()].into_iter().flatten() {
            task.abort();
        }
    }
}

impl SignalingSessionManager {
    pub fn new(connector: Arc<dyn PeerConnector>) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                connector,
                state: Mutex::new(ManagerState::new()),
            }),
        }
    }

    /// Manager talking WebRTC through the configured rendezvous service.
    pub fn from_config(config: &SignalingConfig) -> Self {
        Self::new(Arc::new(RtcPeerConnector::new(config.clone())))
    }

    /// Opens the signaling link.
    ///
    /// The returned feed replays the latest status. Link failures are
    /// reported on it as [`SignalingStatus::Error`], not as an `Err`.
    pub async fn initialize(&self) -> SessionResult<FeedReceiver<SignalingStatus>> {
        let (generation, receiver, stale_session, stale_peer, stale_pump) = {
            let mut state = self.inner.state.lock();
            if state.signaling.is_active() {
                return Err(SessionError::AlreadyInitialized);
            }

            let stale_session = state.take_session();
            state.renew_feeds();
            state.generation += 1;
            state.signaling = SignalingState::Initializing;
            state.peer_state = PeerState::Idle;
            state.locally_closed = false;
            state.local_id = None;

            (
                state.generation,
                state.signaling_feed.subscribe(),
                stale_session,
                state.peer.take(),
                state.pump.take(),
            )
        };

        if let Some(pump) = stale_pump {
            pump.abort();
        }
        stale_session.release().await;
        if let Some(peer) = stale_peer {
            peer.destroy().await;
        }

        info!("Opening signaling link");
        match self.inner.connector.open().await {
            Ok(PeerHandle { peer, events }) => {
                let accepted = {
                    let mut state = self.inner.state.lock();
                    if state.generation == generation {
                        state.peer = Some(peer.clone());
                        state.pump = Some(tokio::spawn(pump_peer_events(
                            Arc::downgrade(&self.inner),
                            generation,
                            events,
                        )));
                        true
                    } else {
                        false
                    }
                };
                if !accepted {
                    debug!("Manager was reset while the link was opening");
                    peer.destroy().await;
                }
            }
            Err(e) => {
                error!("Failed to open signaling link: {:?}", e);
                let mut state = self.inner.state.lock();
                if state.generation == generation {
                    state.signaling = SignalingState::Closed;
                    state.signaling_feed.emit(SignalingStatus::Error);
                }
            }
        }

        Ok(receiver)
    }

    /// Starts the peer session: media first, data only once media is up.
    ///
    /// `Opened` is emitted when both sub-channels are open. If either one
    /// fails, whatever was already open is closed before the failure is
    /// reported.
    pub fn connect(
        &self,
        remote: PeerEndpoint,
        local: MediaStream,
    ) -> SessionResult<FeedReceiver<ConnectionStatus>> {
        let mut state = self.inner.state.lock();
        if state.signaling != SignalingState::Connected {
            return Err(SessionError::NotInitialized);
        }
        let Some(peer) = state.peer.clone() else {
            return Err(SessionError::NotInitialized);
        };
        if state.peer_state != PeerState::Idle {
            return Err(SessionError::ConnectionBusy);
        }

        state.peer_state = PeerState::MediaPending;
        state.local_stream = Some(local.clone());
        let receiver = state.connection_feed.subscribe();
        state.negotiation = Some(tokio::spawn(negotiate(
            Arc::downgrade(&self.inner),
            state.generation,
            peer,
            remote,
            local,
        )));

        Ok(receiver)
    }

    /// Sends a message over the data channel. `false` if it is not open.
    pub async fn send_data(&self, message: &WireMessage) -> bool {
        let link = {
            let state = self.inner.state.lock();
            if state.signaling == SignalingState::Connected && state.peer_state == PeerState::Opened
            {
                state.data.clone()
            } else {
                None
            }
        };
        let Some(link) = link.filter(|link| link.is_open()) else {
            debug!("Data channel not open, dropping {:?} message", message.kind);
            return false;
        };

        let json = match message.to_json() {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize {:?} message: {}", message.kind, e);
                return false;
            }
        };

        match link.send(json).await {
            Ok(()) => {
                debug!("Sent {:?} message", message.kind);
                true
            }
            Err(e) => {
                warn!("Failed to send {:?} message: {:?}", message.kind, e);
                false
            }
        }
    }

    /// Remote streams as they arrive. No replay.
    pub fn streams(&self) -> FeedReceiver<MediaStream> {
        self.inner.state.lock().stream_feed.subscribe()
    }

    /// Stops local tracks, closes both sub-channels and leaves the
    /// rendezvous service. Safe to call in any state.
    pub async fn close(&self) {
        let (session, peer) = {
            let mut state = self.inner.state.lock();
            state.locally_closed = true;
            if state.signaling != SignalingState::Uninitialized {
                state.signaling = SignalingState::Closed;
            }
            if state.peer_state != PeerState::Idle {
                state.peer_state = PeerState::Closed;
            }
            (state.take_session(), state.peer.clone())
        };

        session.release().await;
        if let Some(peer) = peer
            && !peer.is_disconnected()
        {
            peer.disconnect().await;
        }
        debug!("Peer session closed");
    }

    /// Closes everything and ends every feed. Idempotent.
    pub async fn destroy(&self) {
        self.close().await;

        let (peer, pump) = {
            let mut state = self.inner.state.lock();
            state.generation += 1;
            state.signaling = SignalingState::Uninitialized;
            state.peer_state = PeerState::Idle;
            state.local_id = None;
            state.complete_feeds();
            (state.peer.take(), state.pump.take())
        };

        if let Some(pump) = pump {
            pump.abort();
        }
        if let Some(peer) = peer {
            peer.destroy().await;
            info!("Signaling session manager destroyed");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.inner.state.lock().signaling == SignalingState::Connected
    }

    pub fn is_opened(&self) -> bool {
        let state = self.inner.state.lock();
        state.peer_state == PeerState::Opened && state.data.as_ref().is_some_and(|d| d.is_open())
    }

    pub fn signaling_state(&self) -> SignalingState {
        self.inner.state.lock().signaling
    }

    pub fn peer_state(&self) -> PeerState {
        self.inner.state.lock().peer_state
    }

    /// Id assigned by the rendezvous service.
    pub fn local_id(&self) -> Option<PeerEndpoint> {
        self.inner.state.lock().local_id.clone()
    }
}

impl ManagerInner {
    fn on_peer_event(&self, generation: u64, event: PeerEvent) {
        let mut state = self.state.lock();
        if state.generation != generation {
            return;
        }

        match event {
            PeerEvent::Open(id) => {
                if state.locally_closed {
                    debug!("Ignoring open for {} after local close", id);
                    return;
                }
                info!("Connected to signaling server as {}", id);
                state.local_id = Some(id);
                state.signaling = SignalingState::Connected;
                state.signaling_feed.emit(SignalingStatus::Connected);
            }
            PeerEvent::Disconnected => {
                info!("Disconnected from signaling server");
                if state.signaling.is_active() {
                    state.signaling = SignalingState::Disconnected;
                }
                state.signaling_feed.emit(SignalingStatus::Disconnected);
            }
            PeerEvent::Closed => {
                info!("Signaling peer closed");
                state.signaling = SignalingState::Closed;
                state.signaling_feed.emit(SignalingStatus::Closed);
            }
            PeerEvent::Error(reason) => {
                warn!("Signaling error: {}", reason);
                state.signaling_feed.emit(SignalingStatus::Error);
            }
        }
    }

    fn attach_media(&self, generation: u64, link: Arc<dyn MediaLink>) -> bool {
        let mut state = self.state.lock();
        if state.generation != generation || state.peer_state != PeerState::MediaPending {
            return false;
        }
        state.media = Some(link);
        true
    }

    fn media_opened(&self, generation: u64, stream: MediaStream) -> bool {
        let mut state = self.state.lock();
        if state.generation != generation || state.peer_state != PeerState::MediaPending {
            return false;
        }
        info!("[Media] remote stream {} received", stream.id());
        state.peer_state = PeerState::MediaOpen;
        state.stream_feed.emit(stream);
        state.peer_state = PeerState::DataPending;
        true
    }

    fn attach_data(&self, generation: u64, link: Arc<dyn DataLink>) -> bool {
        let mut state = self.state.lock();
        if state.generation != generation || state.peer_state != PeerState::DataPending {
            return false;
        }
        state.data = Some(link);
        true
    }

    fn opened(&self, generation: u64) {
        let mut state = self.state.lock();
        if state.generation != generation || state.peer_state != PeerState::DataPending {
            return;
        }
        info!("[Data] channel open, peer session established");
        state.peer_state = PeerState::Opened;
        state.connection_feed.emit(ConnectionStatus::Opened);
    }

    fn publish_stream(&self, generation: u64, stream: MediaStream) {
        let state = self.state.lock();
        if state.generation == generation && !state.peer_state.is_terminal() {
            state.stream_feed.emit(stream);
        }
    }

    /// Tears the session down after a sub-channel failure and reports it.
    async fn fail(&self, generation: u64, status: ConnectionStatus) {
        let (media, data) = {
            let mut state = self.state.lock();
            if state.generation != generation || state.peer_state.is_terminal() {
                return;
            }
            state.peer_state = match status {
                ConnectionStatus::Closed => PeerState::Closed,
                _ => PeerState::Error,
            };
            (state.media.take(), state.data.take())
        };

        if let Some(data) = data {
            data.close().await;
        }
        if let Some(media) = media {
            media.close().await;
        }

        let state = self.state.lock();
        if state.generation == generation {
            info!("Peer session ended: {}", status);
            state.connection_feed.emit(status);
        }
    }
}

async fn pump_peer_events(
    manager: Weak<ManagerInner>,
    generation: u64,
    mut events: mpsc::UnboundedReceiver<PeerEvent>,
) {
    while let Some(event) = events.recv().await {
        let Some(inner) = manager.upgrade() else {
            break;
        };
        inner.on_peer_event(generation, event);
    }
}

enum Outcome {
    Continue,
    Opened,
    Failed(ConnectionStatus),
}

async fn negotiate(
    manager: Weak<ManagerInner>,
    generation: u64,
    peer: Arc<dyn PeerBackend>,
    remote: PeerEndpoint,
    local: MediaStream,
) {
    info!("[Media] calling {}", remote);
    let MediaChannel {
        link: media_link,
        events: mut media_events,
    } = match peer.call(&remote, &local).await {
        Ok(channel) => channel,
        Err(e) => {
            warn!("[Media] call to {} failed: {:?}", remote, e);
            if let Some(inner) = manager.upgrade() {
                inner.fail(generation, ConnectionStatus::Error).await;
            }
            return;
        }
    };

    let Some(inner) = manager.upgrade() else {
        media_link.close().await;
        return;
    };
    if !inner.attach_media(generation, media_link.clone()) {
        media_link.close().await;
        return;
    }
    drop(inner);

    let first = loop {
        match media_events.recv().await {
            Some(MediaEvent::Stream(stream)) => break Ok(stream),
            Some(MediaEvent::Error(reason)) => {
                warn!("[Media] call to {} failed: {}", remote, reason);
                break Err(ConnectionStatus::Error);
            }
            Some(MediaEvent::Closed) | None => break Err(ConnectionStatus::Closed),
        }
    };

    let Some(inner) = manager.upgrade() else {
        return;
    };
    match first {
        Ok(stream) => {
            if !inner.media_opened(generation, stream) {
                return;
            }
        }
        Err(status) => {
            inner.fail(generation, status).await;
            return;
        }
    }
    drop(inner);

    info!("[Data] connecting to {}", remote);
    let DataChannel {
        link: data_link,
        events: mut data_events,
    } = match peer.connect(&remote).await {
        Ok(channel) => channel,
        Err(e) => {
            warn!("[Data] connection to {} failed: {:?}", remote, e);
            if let Some(inner) = manager.upgrade() {
                inner.fail(generation, ConnectionStatus::Error).await;
            }
            return;
        }
    };

    let Some(inner) = manager.upgrade() else {
        data_link.close().await;
        return;
    };
    if !inner.attach_data(generation, data_link.clone()) {
        data_link.close().await;
        return;
    }
    drop(inner);

    loop {
        let outcome = tokio::select! {
            event = media_events.recv() => match event {
                Some(MediaEvent::Stream(stream)) => {
                    if let Some(inner) = manager.upgrade() {
                        inner.publish_stream(generation, stream);
                    }
                    Outcome::Continue
                }
                Some(MediaEvent::Error(reason)) => {
                    warn!("[Media] connection with {} failed: {}", remote, reason);
                    Outcome::Failed(ConnectionStatus::Error)
                }
                Some(MediaEvent::Closed) | None => Outcome::Failed(ConnectionStatus::Closed),
            },
            event = data_events.recv() => match event {
                Some(DataEvent::Open) => Outcome::Opened,
                Some(DataEvent::Message(text)) => {
                    debug!("[Data] message from {}: {}", remote, text);
                    Outcome::Continue
                }
                Some(DataEvent::Error(reason)) => {
                    warn!("[Data] connection with {} failed: {}", remote, reason);
                    Outcome::Failed(ConnectionStatus::Error)
                }
                Some(DataEvent::Closed) | None => Outcome::Failed(ConnectionStatus::Closed),
            },
        };

        let Some(inner) = manager.upgrade() else {
            return;
        };
        match outcome {
            Outcome::Continue => {}
            Outcome::Opened => inner.opened(generation),
            Outcome::Failed(status) => {
                inner.fail(generation, status).await;
                return;
            }
        }
    }
}
