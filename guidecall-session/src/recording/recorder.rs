use crate::media::MediaStream;
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

/// Captured recording, ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingBlob {
    pub mime_type: String,
    pub data: Bytes,
}

impl RecordingBlob {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Underlying capture engine driven by the recording manager.
#[async_trait]
pub trait Recorder: Send {
    fn add_stream(&mut self, stream: MediaStream);

    fn start(&mut self);

    /// Stops capturing and finalizes the blob.
    async fn stop(&mut self) -> Result<()>;

    fn blob(&self) -> Option<RecordingBlob>;

    /// Releases the engine. Streams must not be accepted afterwards.
    fn destroy(&mut self);
}

pub type RecorderFactory = Arc<dyn Fn() -> Box<dyn Recorder> + Send + Sync>;
