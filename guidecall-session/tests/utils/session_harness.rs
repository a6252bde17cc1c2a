use crate::utils::journal::Journal;
use crate::utils::mock_collaborators::{
    MockCaptureDevice, MockOperatorDirectory, MockSessionStore, MockSessionView, SESSION_ID,
    operator,
};
use crate::utils::mock_peer::{Autopilot, MockPeerControl};
use crate::utils::mock_recorder::{MockRecorderFactory, MockRecordingStore};
use guidecall_core::{Action, ActionEvent, PeerEndpoint};
use guidecall_session::{
    EndpointMemory, RecordingManager, SessionCollaborators, SessionCommand, SessionResult,
    SessionRuntime, SignalingSessionManager, TeardownReport,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const OPERATOR_ID: &str = "operator-1";

/// Every mock a session runtime needs, sharing one journal.
pub struct SessionHarness {
    pub journal: Journal,
    pub peer: MockPeerControl,
    pub recorders: MockRecorderFactory,
    pub recording_store: MockRecordingStore,
    pub store: Arc<MockSessionStore>,
    pub operators: Arc<MockOperatorDirectory>,
    pub capture: Arc<MockCaptureDevice>,
    pub view: Arc<MockSessionView>,
    pub memory: EndpointMemory,
    pub signaling: SignalingSessionManager,
    pub recording: RecordingManager,
}

impl SessionHarness {
    /// One free operator, `operator-1`, and a peer that answers on its own.
    pub fn new() -> Self {
        Self::with_autopilot(Autopilot::full())
    }

    pub fn with_autopilot(autopilot: Autopilot) -> Self {
        let journal = Journal::new();
        let peer = MockPeerControl::new(journal.clone(), autopilot);
        let recorders = MockRecorderFactory::new(journal.clone());
        let recording_store = MockRecordingStore::new(journal.clone());

        let signaling = SignalingSessionManager::new(peer.connector());
        let recording =
            RecordingManager::new(recorders.factory(), Arc::new(recording_store.clone()));

        Self {
            store: Arc::new(MockSessionStore::new(journal.clone())),
            operators: Arc::new(MockOperatorDirectory::new(vec![operator(OPERATOR_ID, None)])),
            capture: Arc::new(MockCaptureDevice::new(journal.clone())),
            view: Arc::new(MockSessionView::new(journal.clone())),
            memory: EndpointMemory::new(),
            journal,
            peer,
            recorders,
            recording_store,
            signaling,
            recording,
        }
    }

    pub fn collaborators(&self) -> SessionCollaborators {
        SessionCollaborators {
            store: self.store.clone(),
            operators: self.operators.clone(),
            capture: self.capture.clone(),
            view: self.view.clone(),
        }
    }

    /// Spawns a runtime for `session-1`, optionally handed an endpoint by
    /// the navigation.
    pub fn spawn(
        &self,
        navigation: Option<&str>,
    ) -> (
        mpsc::Sender<SessionCommand>,
        JoinHandle<SessionResult<TeardownReport>>,
    ) {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let runtime = SessionRuntime::new(
            SESSION_ID,
            self.signaling.clone(),
            self.recording.clone(),
            self.collaborators(),
            cmd_rx,
        )
        .with_navigation_endpoint(navigation.map(PeerEndpoint::from))
        .with_endpoint_memory(self.memory.clone());

        let handle = tokio::spawn(runtime.run());
        (cmd_tx, handle)
    }
}

pub fn step_done(checklist_id: &str, step: &str) -> SessionCommand {
    SessionCommand::ActionDone(ActionEvent {
        checklist_id: checklist_id.to_owned(),
        action: Action::new(step, "done", "true"),
    })
}
