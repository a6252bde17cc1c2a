use crate::config::MediaConstraints;
use crate::error::{SessionError, SessionResult};
use crate::feed::FeedReceiver;
use crate::media::MediaStream;
use crate::recording::RecordingManager;
use crate::session::collaborators::SessionCollaborators;
use crate::session::endpoint_memory::EndpointMemory;
use crate::session::session_command::SessionCommand;
use crate::signaling::SignalingSessionManager;
use futures::future::try_join_all;
use guidecall_core::{
    ActionEvent, ActionLog, Checklist, ConnectionStatus, MessageType, OperatorInfo, PeerEndpoint,
    SignalingStatus, WireMessage, next_step_after,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// What happened to the recording when the session was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingOutcome {
    Saved,
    Discarded,
    NotRecorded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeardownReport {
    /// Final message sent to the operator.
    pub wire_message: MessageType,
    /// Whether the final message made it onto an open data channel.
    pub delivered: bool,
    pub recording: RecordingOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ending {
    /// Closed by the user after completing the checklists.
    Completed,
    /// Aborted by the user.
    Aborted,
    /// The view went away. Nobody is left to answer prompts.
    Abandoned,
}

/// Drives one guided session: resolves the operator, brings the peer
/// session up, relays checklist progress and tears everything down.
pub struct SessionRuntime {
    session_id: String,
    navigation_endpoint: Option<PeerEndpoint>,
    constraints: MediaConstraints,
    memory: EndpointMemory,
    collaborators: SessionCollaborators,
    signaling: SignalingSessionManager,
    recording: RecordingManager,
    command_rx: mpsc::Receiver<SessionCommand>,
    signaling_rx: Option<FeedReceiver<SignalingStatus>>,
    connection_rx: Option<FeedReceiver<ConnectionStatus>>,
    remote_rx: Option<FeedReceiver<MediaStream>>,
    checklists: Vec<Checklist>,
    actions: ActionLog,
    remote_endpoint: Option<PeerEndpoint>,
    local_stream: Option<MediaStream>,
    remote_stream: Option<MediaStream>,
    capture_requested: bool,
    opened: bool,
    video_enabled: bool,
}

impl SessionRuntime {
    pub fn new(
        session_id: impl Into<String>,
        signaling: SignalingSessionManager,
        recording: RecordingManager,
        collaborators: SessionCollaborators,
        command_rx: mpsc::Receiver<SessionCommand>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            navigation_endpoint: None,
            constraints: MediaConstraints::default(),
            memory: EndpointMemory::default(),
            collaborators,
            signaling,
            recording,
            command_rx,
            signaling_rx: None,
            connection_rx: None,
            remote_rx: None,
            checklists: Vec::new(),
            actions: ActionLog::default(),
            remote_endpoint: None,
            local_stream: None,
            remote_stream: None,
            capture_requested: false,
            opened: false,
            video_enabled: true,
        }
    }

    /// Endpoint handed over by the screen that created the session.
    pub fn with_navigation_endpoint(mut self, endpoint: Option<PeerEndpoint>) -> Self {
        self.navigation_endpoint = endpoint.filter(|e| !e.is_empty());
        self
    }

    pub fn with_endpoint_memory(mut self, memory: EndpointMemory) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_constraints(mut self, constraints: MediaConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn actions(&self) -> &ActionLog {
        &self.actions
    }

    pub fn is_video_enabled(&self) -> bool {
        self.video_enabled
    }

    /// Starts the session and processes commands and status changes until
    /// it is closed or abandoned.
    pub async fn run(mut self) -> SessionResult<TeardownReport> {
        if let Err(e) = self.start().await {
            self.release_resources().await;
            return Err(e);
        }
        info!("Session {} event loop started", self.session_id);

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    let ending = match cmd {
                        Some(SessionCommand::ActionDone(event)) => {
                            self.handle_action(event).await;
                            None
                        }
                        Some(SessionCommand::Close { completed }) => self.close_session(completed).await,
                        Some(SessionCommand::NavigateAway) => Some(Ending::Abandoned),
                        None => {
                            info!("Command channel closed. Abandoning session.");
                            Some(Ending::Abandoned)
                        }
                    };
                    if let Some(ending) = ending {
                        let report = self.terminate(ending).await;
                        info!("Session {} event loop finished", self.session_id);
                        return Ok(report);
                    }
                }

                status = next_value(&mut self.signaling_rx) => self.handle_signaling(status).await,

                status = next_value(&mut self.connection_rx) => self.handle_connection(status).await,

                stream = next_value(&mut self.remote_rx) => self.handle_remote_stream(stream).await,
            }
        }
    }

    /// Loads the session, its template and checklists, then brings up the
    /// peer session towards the operator.
    pub async fn start(&mut self) -> SessionResult<()> {
        let store = self.collaborators.store.clone();

        let loaded = async {
            let session = store.get_session(&self.session_id).await?;
            let template = store.get_template(&session.template).await?;
            let checklists = try_join_all(
                template
                    .phases
                    .iter()
                    .map(|phase| store.get_checklist(&phase.checklist)),
            )
            .await?;
            anyhow::Ok((session, checklists))
        }
        .await;

        let (session, checklists) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => {
                error!("Failed to load session {}: {:?}", self.session_id, e);
                self.collaborators.view.notify("Initialization error").await;
                return Err(SessionError::Collaborator(format!("{e:#}")));
            }
        };

        self.actions = ActionLog::from_session(&session);
        self.checklists = checklists;
        info!(
            "Session {} loaded with {} checklists",
            self.session_id,
            self.checklists.len()
        );

        self.initialize_peer().await;
        Ok(())
    }

    async fn initialize_peer(&mut self) {
        let operators = match self.collaborators.operators.list_operators().await {
            Ok(operators) => operators,
            Err(e) => {
                warn!("Failed to list operators: {:?}", e);
                self.disable_video("Unable to reach the operator list, live feed is disabled")
                    .await;
                return;
            }
        };

        if operators.is_empty() {
            self.disable_video("No operator available, live feed is disabled")
                .await;
            return;
        }

        let candidate = self
            .navigation_endpoint
            .clone()
            .or_else(|| self.memory.last());
        if let Some(candidate) = candidate
            && operators.iter().any(|op| op.id == candidate)
        {
            self.connect_remote(candidate).await;
            return;
        }

        let available: Vec<OperatorInfo> = operators
            .into_iter()
            .filter(OperatorInfo::is_available)
            .collect();
        if available.is_empty() {
            self.disable_video("All operators are busy, live feed is disabled")
                .await;
            return;
        }

        match self.collaborators.view.choose_operator(available).await {
            Some(selected) => self.connect_remote(selected).await,
            None => {
                self.disable_video("No operator selected, live feed is disabled")
                    .await
            }
        }
    }

    async fn connect_remote(&mut self, endpoint: PeerEndpoint) {
        info!("Connecting session {} to {}", self.session_id, endpoint);
        self.memory.remember(endpoint.clone());
        self.remote_endpoint = Some(endpoint);

        match self.signaling.initialize().await {
            Ok(receiver) => self.signaling_rx = Some(receiver),
            Err(e) => error!("Signaling manager refused to initialize: {}", e),
        }
    }

    async fn handle_signaling(&mut self, status: SignalingStatus) {
        debug!("Signaling status: {}", status);
        match status {
            SignalingStatus::Connected => {
                if self.capture_requested {
                    debug!("Signaling reconnected, peer session already requested");
                    return;
                }
                self.capture_requested = true;
                self.acquire_and_connect().await;
            }
            SignalingStatus::Disconnected => {
                self.collaborators
                    .view
                    .notify("Disconnected from signaling server")
                    .await;
            }
            SignalingStatus::Closed => {
                self.collaborators
                    .view
                    .notify("Connection with signaling server closed")
                    .await;
            }
            SignalingStatus::Error => {}
        }
    }

    async fn acquire_and_connect(&mut self) {
        let Some(endpoint) = self.remote_endpoint.clone() else {
            return;
        };

        let local = match self.collaborators.capture.acquire(&self.constraints).await {
            Ok(local) => local,
            Err(e) => {
                warn!("Local capture failed: {:?}", e);
                self.signaling.close().await;
                self.disable_video(
                    "The device doesn't have a camera or microphone, live feed has been deactivated",
                )
                .await;
                return;
            }
        };

        self.recording.initialize().await;
        self.recording.attach_streams(self.signaling.streams()).await;
        self.remote_rx = Some(self.signaling.streams());
        self.local_stream = Some(local.clone());

        match self.signaling.connect(endpoint, local) {
            Ok(receiver) => self.connection_rx = Some(receiver),
            Err(e) => error!("Signaling manager refused to connect: {}", e),
        }
    }

    async fn handle_connection(&mut self, status: ConnectionStatus) {
        debug!("Connection status: {}", status);
        match status {
            ConnectionStatus::Opened => {
                self.opened = true;
                self.recording.start_recording().await;
                self.send(WireMessage::started()).await;
            }
            ConnectionStatus::Closed => {
                self.collaborators
                    .view
                    .notify("Connection with remote peer closed")
                    .await;
            }
            ConnectionStatus::Error => {
                if !self.opened {
                    self.disable_video("Unable to reach the operator, live feed is disabled")
                        .await;
                }
            }
        }
    }

    async fn handle_remote_stream(&mut self, stream: MediaStream) {
        debug!("Received remote stream {}", stream.id());
        self.remote_stream = Some(stream.clone());
        self.collaborators.view.show_remote_stream(Some(stream)).await;
    }

    async fn handle_action(&mut self, event: ActionEvent) {
        self.actions
            .record(&event.checklist_id, event.action.clone());

        let store = self.collaborators.store.clone();
        let view = self.collaborators.view.clone();
        let session_id = self.session_id.clone();
        let persisted = event.clone();
        tokio::spawn(async move {
            match store
                .add_action(&session_id, &persisted.checklist_id, &persisted.action)
                .await
            {
                Ok(()) => debug!("Action on step {} persisted", persisted.action.step),
                Err(e) => {
                    error!("Failed to persist action: {:?}", e);
                    view.notify(&format!("Unable to save answer: {e}")).await;
                }
            }
        });

        if !self.signaling.is_connected() {
            return;
        }
        let Some(next) = next_step_after(&self.checklists, &event.checklist_id, &event.action.step)
        else {
            return;
        };
        match WireMessage::next_step(&next) {
            Ok(message) => {
                self.send(message).await;
            }
            Err(e) => error!("Failed to encode next step: {}", e),
        }
    }

    async fn close_session(&mut self, completed: bool) -> Option<Ending> {
        let store = &self.collaborators.store;
        if completed {
            match store.close_session(&self.session_id).await {
                Ok(()) => {
                    self.memory.forget();
                    Some(Ending::Completed)
                }
                Err(e) => {
                    warn!("Failed to close session {}: {:?}", self.session_id, e);
                    self.collaborators.view.notify("Unable to close session").await;
                    None
                }
            }
        } else {
            match store.abort_session(&self.session_id).await {
                Ok(()) => Some(Ending::Aborted),
                Err(e) => {
                    warn!("Failed to abort session {}: {:?}", self.session_id, e);
                    self.collaborators.view.notify("Unable to abort session").await;
                    None
                }
            }
        }
    }

    /// Ends the session in a fixed order: tracks, final message, peer,
    /// recording, release. Every step runs whatever happened before it.
    async fn terminate(&mut self, ending: Ending) -> TeardownReport {
        info!("Terminating session {} ({:?})", self.session_id, ending);

        if let Some(remote) = self.remote_stream.take() {
            remote.stop_all();
        }
        self.collaborators.view.show_remote_stream(None).await;
        if let Some(local) = &self.local_stream {
            debug!("Stopped {} local tracks", local.stop_all());
        }

        let message = match ending {
            Ending::Completed => WireMessage::finished(),
            Ending::Aborted | Ending::Abandoned => WireMessage::aborted(),
        };
        let wire_message = message.kind;
        let delivered = self.send(message).await;

        self.signaling.close().await;

        let stopped = self.recording.stop_recording().await;
        let recording = if !stopped {
            RecordingOutcome::NotRecorded
        } else if ending != Ending::Abandoned
            && self.collaborators.view.confirm_save_recording().await
        {
            if self.recording.save_recording().await {
                RecordingOutcome::Saved
            } else {
                self.collaborators
                    .view
                    .notify("Unable to save the recording")
                    .await;
                RecordingOutcome::Discarded
            }
        } else {
            RecordingOutcome::Discarded
        };

        self.release_resources().await;

        if ending != Ending::Abandoned {
            match recording {
                RecordingOutcome::Saved => self.collaborators.view.notify("Recording saved").await,
                RecordingOutcome::Discarded => {
                    self.collaborators.view.notify("Recording discarded").await
                }
                RecordingOutcome::NotRecorded => {}
            }
            self.collaborators.view.navigate_away().await;
        }

        TeardownReport {
            wire_message,
            delivered,
            recording,
        }
    }

    /// Releases both managers. Safe to call any number of times.
    async fn release_resources(&mut self) {
        self.recording.destroy().await;
        self.signaling.destroy().await;
        self.signaling_rx = None;
        self.connection_rx = None;
        self.remote_rx = None;
        self.local_stream = None;
        self.remote_stream = None;
        debug!("Session {} resources released", self.session_id);
    }

    async fn send(&self, message: WireMessage) -> bool {
        let delivered = self.signaling.send_data(&message).await;
        if !delivered {
            debug!("{:?} message not delivered", message.kind);
        }
        delivered
    }

    async fn disable_video(&mut self, reason: &str) {
        warn!("Live feed disabled: {}", reason);
        self.video_enabled = false;
        self.collaborators.view.notify(reason).await;
    }
}

/// Next value of an optional feed. Pends forever once the feed is gone.
async fn next_value<T>(slot: &mut Option<FeedReceiver<T>>) -> T {
    if let Some(receiver) = slot.as_mut() {
        if let Some(value) = receiver.recv().await {
            return value;
        }
        *slot = None;
    }
    std::future::pending().await
}
