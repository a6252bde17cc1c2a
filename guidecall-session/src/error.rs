use thiserror::Error;

/// Faults raised by the connectivity managers and the session runtime.
///
/// Connectivity failures are reported through the status feeds instead;
/// what ends up here is either caller misuse or a broken collaborator.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("signaling link is already initialized")]
    AlreadyInitialized,

    #[error("signaling link is not connected")]
    NotInitialized,

    #[error("a peer session is already in progress")]
    ConnectionBusy,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("collaborator failed: {0}")]
    Collaborator(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Recording misuse. Only ever logged, callers see a `bool`.
#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("recorder is busy recording")]
    RecorderBusy,

    #[error("recorder is not initialized")]
    NotInitialized,

    #[error("recorder is not recording")]
    NotRecording,

    #[error("no captured recording available")]
    NothingCaptured,

    #[error("upload failed: {0}")]
    Upload(String),
}
