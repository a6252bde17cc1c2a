use crate::config::SignalingConfig;
use crate::media::{MediaFrame, MediaStream, MediaTrack, TrackKind};
use crate::transport::peer_backend::{
    DataChannel, DataLink, MediaChannel, MediaLink, PeerBackend, PeerConnector, PeerHandle,
};
use crate::transport::signaling_link::{LinkEvent, SignalingLink};
use crate::transport::transport_config::TransportConfig;
use crate::transport::transport_event::{DataEvent, MediaEvent, PeerEvent};
use anyhow::{Context, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use guidecall_core::utils::{DATA_CHANNEL_LABEL, LOCAL_STREAM_ID};
use guidecall_core::{ChannelKind, ConnectionId, PeerEndpoint, SignalMessage};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::media::Sample;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_remote::TrackRemote;

/// Opens [`RtcPeer`]s against a WebSocket rendezvous service.
pub struct RtcPeerConnector {
    signaling: SignalingConfig,
    transport: TransportConfig,
}

impl RtcPeerConnector {
    pub fn new(signaling: SignalingConfig) -> Self {
        let transport = TransportConfig::new(signaling.ice_servers.clone());
        Self {
            signaling,
            transport,
        }
    }
}

#[async_trait]
impl PeerConnector for RtcPeerConnector {
    async fn open(&self) -> Result<PeerHandle> {
        let (link, link_events) = SignalingLink::connect(&self.signaling).await?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(PeerShared {
            link,
            local_id: Mutex::new(None),
            routes: DashMap::new(),
        });
        let router = tokio::spawn(route_signals(
            shared.clone(),
            link_events,
            events_tx.clone(),
        ));

        let peer = RtcPeer {
            shared,
            transport: self.transport.clone(),
            events_tx,
            router,
            destroyed: AtomicBool::new(false),
        };

        Ok(PeerHandle {
            peer: Arc::new(peer),
            events: events_rx,
        })
    }
}

struct PeerShared {
    link: SignalingLink,
    local_id: Mutex<Option<PeerEndpoint>>,
    routes: DashMap<ConnectionId, mpsc::UnboundedSender<SignalMessage>>,
}

async fn route_signals(
    shared: Arc<PeerShared>,
    mut link_events: mpsc::UnboundedReceiver<LinkEvent>,
    events_tx: mpsc::UnboundedSender<PeerEvent>,
) {
    while let Some(event) = link_events.recv().await {
        let signal = match event {
            LinkEvent::Signal(signal) => signal,
            LinkEvent::Closed => {
                let _ = events_tx.send(PeerEvent::Disconnected);
                break;
            }
        };

        match signal {
            SignalMessage::Open { peer_id } => {
                info!("Registered with rendezvous service as {}", peer_id);
                *shared.local_id.lock() = Some(peer_id.clone());
                let _ = events_tx.send(PeerEvent::Open(peer_id));
            }
            SignalMessage::Error { reason } => {
                warn!("Rendezvous service reported an error: {}", reason);
                let _ = events_tx.send(PeerEvent::Error(reason));
            }
            SignalMessage::Offer { src, kind, .. } => {
                warn!("Ignoring incoming {:?} offer from {}", kind, src);
            }
            signal => {
                let Some(connection_id) = signal.connection_id() else {
                    continue;
                };
                match shared.routes.get(&connection_id) {
                    Some(route) => {
                        let _ = route.send(signal);
                    }
                    None => debug!("No connection {} for relayed signal", connection_id),
                }
            }
        }
    }
}

/// Local peer backed by one `RTCPeerConnection` per sub-channel.
pub struct RtcPeer {
    shared: Arc<PeerShared>,
    transport: TransportConfig,
    events_tx: mpsc::UnboundedSender<PeerEvent>,
    router: JoinHandle<()>,
    destroyed: AtomicBool,
}

impl RtcPeer {
    fn registered_id(&self) -> Result<PeerEndpoint> {
        self.shared
            .local_id
            .lock()
            .clone()
            .context("peer is not registered with the rendezvous service")
    }
}

#[async_trait]
impl PeerBackend for RtcPeer {
    async fn call(&self, remote: &PeerEndpoint, local: &MediaStream) -> Result<MediaChannel> {
        let local_id = self.registered_id()?;
        let connection_id = ConnectionId::new();
        let pc = self.transport.new_peer_connection().await?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let mut tasks = Vec::new();
        for track in local.tracks() {
            let rtc_track = Arc::new(TrackLocalStaticSample::new(
                codec_for(track.kind()),
                track.id().to_owned(),
                LOCAL_STREAM_ID.to_owned(),
            ));
            if let Err(e) = pc
                .add_track(Arc::clone(&rtc_track) as Arc<dyn TrackLocal + Send + Sync>)
                .await
            {
                abort_all(&tasks);
                let _ = pc.close().await;
                return Err(e.into());
            }
            tasks.push(tokio::spawn(pump_local_track(track, rtc_track)));
        }

        let state_tx = events_tx.clone();
        pc.on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
            let tx = state_tx.clone();

            Box::pin(async move {
                info!("Media connection {} state changed: {:?}", connection_id, s);
                match s {
                    RTCPeerConnectionState::Failed => {
                        let _ = tx.send(MediaEvent::Error("media connection failed".to_owned()));
                    }
                    RTCPeerConnectionState::Disconnected | RTCPeerConnectionState::Closed => {
                        let _ = tx.send(MediaEvent::Closed);
                    }
                    _ => {}
                }
            })
        }));

        let track_tx = events_tx.clone();
        let streams: Arc<Mutex<HashMap<String, MediaStream>>> = Arc::default();
        pc.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let tx = track_tx.clone();
                let streams = streams.clone();

                Box::pin(async move {
                    let kind = match track.kind() {
                        RTPCodecType::Audio => TrackKind::Audio,
                        _ => TrackKind::Video,
                    };
                    let media_track = MediaTrack::with_id(track.id(), kind);
                    let stream_id = track.stream_id();

                    let announced = {
                        let mut streams = streams.lock();
                        match streams.get(&stream_id) {
                            Some(existing) => {
                                existing.add_track(media_track.clone());
                                None
                            }
                            None => {
                                let stream =
                                    MediaStream::new(stream_id.clone(), vec![media_track.clone()]);
                                streams.insert(stream_id, stream.clone());
                                Some(stream)
                            }
                        }
                    };
                    if let Some(stream) = announced {
                        let _ = tx.send(MediaEvent::Stream(stream));
                    }

                    tokio::spawn(async move {
                        while let Ok((packet, _)) = track.read_rtp().await {
                            let frame = MediaFrame::new(packet.payload, Duration::ZERO);
                            if !media_track.push_frame(frame) {
                                break;
                            }
                        }
                        media_track.stop();
                    });
                })
            },
        ));

        let leave_tx = events_tx.clone();
        let negotiation = Negotiation {
            shared: self.shared.clone(),
            pc: pc.clone(),
            local: local_id,
            remote: remote.clone(),
            connection_id,
        };
        match negotiation
            .start(ChannelKind::Media, move || {
                let _ = leave_tx.send(MediaEvent::Closed);
            })
            .await
        {
            Ok(relay) => tasks.push(relay),
            Err(e) => {
                abort_all(&tasks);
                let _ = pc.close().await;
                return Err(e);
            }
        }

        info!("Media call {} placed to {}", connection_id, remote);
        Ok(MediaChannel {
            link: Arc::new(RtcMediaLink {
                connection: negotiation.into_connection(tasks),
            }),
            events: events_rx,
        })
    }

    async fn connect(&self, remote: &PeerEndpoint) -> Result<DataChannel> {
        let local_id = self.registered_id()?;
        let connection_id = ConnectionId::new();
        let pc = self.transport.new_peer_connection().await?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let init = RTCDataChannelInit {
            ordered: Some(true),
            ..Default::default()
        };
        let channel = match pc.create_data_channel(DATA_CHANNEL_LABEL, Some(init)).await {
            Ok(channel) => channel,
            Err(e) => {
                let _ = pc.close().await;
                return Err(e.into());
            }
        };

        let state_tx = events_tx.clone();
        pc.on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
            let tx = state_tx.clone();

            Box::pin(async move {
                debug!("Data connection {} state changed: {:?}", connection_id, s);
                if s == RTCPeerConnectionState::Failed {
                    let _ = tx.send(DataEvent::Error("data connection failed".to_owned()));
                }
            })
        }));

        let open_tx = events_tx.clone();
        channel.on_open(Box::new(move || {
            let tx = open_tx.clone();
            Box::pin(async move {
                info!("DataChannel {} open", connection_id);
                let _ = tx.send(DataEvent::Open);
            })
        }));

        let close_tx = events_tx.clone();
        channel.on_close(Box::new(move || {
            let tx = close_tx.clone();
            Box::pin(async move {
                let _ = tx.send(DataEvent::Closed);
            })
        }));

        let error_tx = events_tx.clone();
        channel.on_error(Box::new(move |err: webrtc::Error| {
            let tx = error_tx.clone();
            Box::pin(async move {
                let _ = tx.send(DataEvent::Error(err.to_string()));
            })
        }));

        let message_tx = events_tx.clone();
        channel.on_message(Box::new(move |msg: DataChannelMessage| {
            let tx = message_tx.clone();
            Box::pin(async move {
                let text = String::from_utf8_lossy(&msg.data).into_owned();
                let _ = tx.send(DataEvent::Message(text));
            })
        }));

        let leave_tx = events_tx.clone();
        let negotiation = Negotiation {
            shared: self.shared.clone(),
            pc: pc.clone(),
            local: local_id,
            remote: remote.clone(),
            connection_id,
        };
        let relay = match negotiation
            .start(ChannelKind::Data, move || {
                let _ = leave_tx.send(DataEvent::Closed);
            })
            .await
        {
            Ok(relay) => relay,
            Err(e) => {
                let _ = pc.close().await;
                return Err(e);
            }
        };

        info!("Data connection {} requested to {}", connection_id, remote);
        Ok(DataChannel {
            link: Arc::new(RtcDataLink {
                connection: negotiation.into_connection(vec![relay]),
                channel,
            }),
            events: events_rx,
        })
    }

    fn local_id(&self) -> Option<PeerEndpoint> {
        self.shared.local_id.lock().clone()
    }

    fn is_disconnected(&self) -> bool {
        self.shared.link.is_closed()
    }

    async fn disconnect(&self) {
        self.shared.link.close();
    }

    async fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.link.close();
        self.shared.routes.clear();
        self.router.abort();
        let _ = self.events_tx.send(PeerEvent::Closed);
        info!("Peer destroyed");
    }
}

impl Drop for RtcPeer {
    fn drop(&mut self) {
        self.router.abort();
    }
}

/// Offer/answer exchange for one connection, relayed through the link.
struct Negotiation {
    shared: Arc<PeerShared>,
    pc: Arc<RTCPeerConnection>,
    local: PeerEndpoint,
    remote: PeerEndpoint,
    connection_id: ConnectionId,
}

impl Negotiation {
    /// Sends the offer and spawns the task applying the answer and the
    /// remote candidates. `on_leave` runs when the remote hangs up.
    async fn start(
        &self,
        kind: ChannelKind,
        on_leave: impl Fn() + Send + Sync + 'static,
    ) -> Result<JoinHandle<()>> {
        let connection_id = self.connection_id;

        let ice_shared = self.shared.clone();
        let (src, dst) = (self.local.clone(), self.remote.clone());
        self.pc
            .on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
                let shared = ice_shared.clone();
                let src = src.clone();
                let dst = dst.clone();

                Box::pin(async move {
                    let Some(candidate) = c else { return };
                    let Ok(json_candidate) = candidate.to_json() else {
                        return;
                    };
                    let Ok(candidate) = serde_json::to_string(&json_candidate) else {
                        return;
                    };
                    let signal = SignalMessage::Candidate {
                        src,
                        dst,
                        connection_id,
                        candidate,
                    };
                    if let Err(e) = shared.link.send(&signal) {
                        debug!("Dropping local candidate for {}: {}", connection_id, e);
                    }
                })
            }));

        let (route_tx, mut route_rx) = mpsc::unbounded_channel();
        self.shared.routes.insert(connection_id, route_tx);

        if let Err(e) = self.send_offer(kind).await {
            self.shared.routes.remove(&connection_id);
            return Err(e);
        }

        let pc = self.pc.clone();
        Ok(tokio::spawn(async move {
            let mut pending = Vec::new();
            let mut answered = false;

            while let Some(signal) = route_rx.recv().await {
                match signal {
                    SignalMessage::Answer { sdp, .. } => {
                        if let Err(e) = apply_answer(&pc, sdp).await {
                            warn!("Failed to apply answer for {}: {:?}", connection_id, e);
                            on_leave();
                            break;
                        }
                        answered = true;
                        for candidate in pending.drain(..) {
                            add_candidate(&pc, connection_id, candidate).await;
                        }
                    }
                    SignalMessage::Candidate { candidate, .. } if answered => {
                        add_candidate(&pc, connection_id, candidate).await;
                    }
                    SignalMessage::Candidate { candidate, .. } => pending.push(candidate),
                    SignalMessage::Leave { src, .. } => {
                        info!("Remote {} left connection {}", src, connection_id);
                        on_leave();
                        break;
                    }
                    _ => {}
                }
            }
        }))
    }

    async fn send_offer(&self, kind: ChannelKind) -> Result<()> {
        let offer = self.pc.create_offer(None).await?;
        self.pc.set_local_description(offer.clone()).await?;
        self.shared.link.send(&SignalMessage::Offer {
            src: self.local.clone(),
            dst: self.remote.clone(),
            connection_id: self.connection_id,
            kind,
            sdp: offer.sdp,
        })
    }

    fn into_connection(self, tasks: Vec<JoinHandle<()>>) -> RtcConnection {
        RtcConnection {
            shared: self.shared,
            pc: self.pc,
            local: self.local,
            remote: self.remote,
            connection_id: self.connection_id,
            tasks: Mutex::new(tasks),
            open: AtomicBool::new(true),
        }
    }
}

async fn apply_answer(pc: &RTCPeerConnection, sdp: String) -> Result<()> {
    let desc = RTCSessionDescription::answer(sdp)?;
    pc.set_remote_description(desc).await?;
    Ok(())
}

async fn add_candidate(pc: &RTCPeerConnection, connection_id: ConnectionId, candidate: String) {
    let parsed: RTCIceCandidateInit = match serde_json::from_str(&candidate) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Malformed ICE candidate for {}: {}", connection_id, e);
            return;
        }
    };
    if let Err(e) = pc.add_ice_candidate(parsed).await {
        warn!("Failed to add ICE candidate for {}: {:?}", connection_id, e);
    }
}

struct RtcConnection {
    shared: Arc<PeerShared>,
    pc: Arc<RTCPeerConnection>,
    local: PeerEndpoint,
    remote: PeerEndpoint,
    connection_id: ConnectionId,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    open: AtomicBool,
}

impl RtcConnection {
    fn is_live(&self) -> bool {
        self.open.load(Ordering::SeqCst)
            && self.pc.connection_state() == RTCPeerConnectionState::Connected
    }

    async fn close(&self) {
        if !self.open.swap(false, Ordering::SeqCst) {
            return;
        }
        self.shared.routes.remove(&self.connection_id);
        let leave = SignalMessage::Leave {
            src: self.local.clone(),
            dst: self.remote.clone(),
            connection_id: self.connection_id,
        };
        if let Err(e) = self.shared.link.send(&leave) {
            debug!("Leave for {} not delivered: {}", self.connection_id, e);
        }
        abort_all(&self.tasks.lock());
        if let Err(e) = self.pc.close().await {
            debug!("Error closing connection {}: {:?}", self.connection_id, e);
        }
    }
}

struct RtcMediaLink {
    connection: RtcConnection,
}

#[async_trait]
impl MediaLink for RtcMediaLink {
    fn is_open(&self) -> bool {
        self.connection.is_live()
    }

    async fn close(&self) {
        self.connection.close().await;
    }
}

struct RtcDataLink {
    connection: RtcConnection,
    channel: Arc<RTCDataChannel>,
}

#[async_trait]
impl DataLink for RtcDataLink {
    fn is_open(&self) -> bool {
        self.connection.open.load(Ordering::SeqCst)
            && self.channel.ready_state() == RTCDataChannelState::Open
    }

    async fn send(&self, text: String) -> Result<()> {
        self.channel.send_text(text).await?;
        Ok(())
    }

    async fn close(&self) {
        if let Err(e) = self.channel.close().await {
            debug!("Error closing data channel: {:?}", e);
        }
        self.connection.close().await;
    }
}

fn codec_for(kind: TrackKind) -> RTCRtpCodecCapability {
    match kind {
        TrackKind::Audio => RTCRtpCodecCapability {
            mime_type: MIME_TYPE_OPUS.to_owned(),
            clock_rate: 48_000,
            channels: 2,
            ..Default::default()
        },
        TrackKind::Video => RTCRtpCodecCapability {
            mime_type: MIME_TYPE_VP8.to_owned(),
            clock_rate: 90_000,
            ..Default::default()
        },
    }
}

async fn pump_local_track(track: Arc<MediaTrack>, rtc_track: Arc<TrackLocalStaticSample>) {
    let mut frames = track.subscribe();
    loop {
        match frames.recv().await {
            Ok(frame) => {
                let sample = Sample {
                    data: frame.data,
                    duration: frame.duration,
                    ..Default::default()
                };
                if let Err(e) = rtc_track.write_sample(&sample).await {
                    debug!("Failed to write sample for {}: {:?}", track.id(), e);
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                debug!("Local track {} skipped {} frames", track.id(), skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn abort_all(tasks: &[JoinHandle<()>]) {
    for task in tasks {
        task.abort();
    }
}
