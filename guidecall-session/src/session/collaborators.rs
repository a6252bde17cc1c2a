use crate::config::MediaConstraints;
use crate::media::MediaStream;
use anyhow::Result;
use async_trait::async_trait;
use guidecall_core::{Action, Checklist, OperatorInfo, PeerEndpoint, Session, Template};
use std::sync::Arc;

/// Persistent session data.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_session(&self, session_id: &str) -> Result<Session>;

    async fn get_template(&self, template_id: &str) -> Result<Template>;

    async fn get_checklist(&self, checklist_id: &str) -> Result<Checklist>;

    async fn add_action(&self, session_id: &str, checklist_id: &str, action: &Action) -> Result<()>;

    /// Marks the session as completed.
    async fn close_session(&self, session_id: &str) -> Result<()>;

    async fn abort_session(&self, session_id: &str) -> Result<()>;
}

#[async_trait]
pub trait OperatorDirectory: Send + Sync {
    async fn list_operators(&self) -> Result<Vec<OperatorInfo>>;
}

/// Local camera and microphone.
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    async fn acquire(&self, constraints: &MediaConstraints) -> Result<MediaStream>;
}

/// User-facing side of the session.
#[async_trait]
pub trait SessionView: Send + Sync {
    async fn notify(&self, message: &str);

    /// Offers the free operators. `None` when the user picks nobody.
    async fn choose_operator(&self, operators: Vec<OperatorInfo>) -> Option<PeerEndpoint>;

    async fn confirm_save_recording(&self) -> bool;

    /// Shows the remote stream, or clears the display with `None`.
    async fn show_remote_stream(&self, stream: Option<MediaStream>);

    async fn navigate_away(&self);
}

/// Everything the runtime talks to besides the two managers.
#[derive(Clone)]
pub struct SessionCollaborators {
    pub store: Arc<dyn SessionStore>,
    pub operators: Arc<dyn OperatorDirectory>,
    pub capture: Arc<dyn CaptureDevice>,
    pub view: Arc<dyn SessionView>,
}
