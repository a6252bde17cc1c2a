use crate::error::RecordingError;
use crate::feed::FeedReceiver;
use crate::media::MediaStream;
use crate::recording::frame_recorder::FrameRecorder;
use crate::recording::recorder::{Recorder, RecorderFactory};
use crate::recording::recording_store::RecordingStore;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Uninitialized,
    Ready,
    Recording,
    Stopped,
}

struct RecordingInner {
    recorder: Option<Box<dyn Recorder>>,
    state: RecordingState,
    attach_task: Option<JoinHandle<()>>,
}

/// Wraps one recorder instance at a time and uploads what it captured.
///
/// Misuse never fails loudly: every operation logs and reports `false`.
#[derive(Clone)]
pub struct RecordingManager {
    inner: Arc<Mutex<RecordingInner>>,
    factory: RecorderFactory,
    store: Arc<dyn RecordingStore>,
}

impl RecordingManager {
    pub fn new(factory: RecorderFactory, store: Arc<dyn RecordingStore>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RecordingInner {
                recorder: None,
                state: RecordingState::Uninitialized,
                attach_task: None,
            })),
            factory,
            store,
        }
    }

    /// Manager backed by [`FrameRecorder`].
    pub fn with_frame_recorder(store: Arc<dyn RecordingStore>) -> Self {
        Self::new(
            Arc::new(|| Box::new(FrameRecorder::new()) as Box<dyn Recorder>),
            store,
        )
    }

    /// Replaces the current recorder with a fresh one.
    ///
    /// Refused while recording. The previous recorder is destroyed first.
    pub async fn initialize(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.state == RecordingState::Recording {
            warn!("Cannot initialize recorder: {}", RecordingError::RecorderBusy);
            return false;
        }

        if let Some(task) = inner.attach_task.take() {
            task.abort();
        }
        if let Some(mut previous) = inner.recorder.take() {
            previous.destroy();
            debug!("Previous recorder destroyed");
        }

        inner.recorder = Some((self.factory)());
        inner.state = RecordingState::Ready;
        info!("Recorder initialized");
        true
    }

    /// Feeds every stream of `streams` to the recorder as it arrives.
    pub async fn attach_streams(&self, mut streams: FeedReceiver<MediaStream>) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.recorder.is_none() {
            warn!("Cannot attach streams: {}", RecordingError::NotInitialized);
            return false;
        }

        let target = Arc::downgrade(&self.inner);
        let task = tokio::spawn(async move {
            while let Some(stream) = streams.next().await {
                let Some(inner) = target.upgrade() else {
                    break;
                };
                let mut inner = inner.lock().await;
                match inner.recorder.as_mut() {
                    Some(recorder) => recorder.add_stream(stream),
                    None => break,
                }
            }
            debug!("Stream attachment finished");
        });

        if let Some(previous) = inner.attach_task.replace(task) {
            previous.abort();
        }
        true
    }

    pub async fn add_stream(&self, stream: MediaStream) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.recorder.as_mut() {
            Some(recorder) => {
                recorder.add_stream(stream);
                true
            }
            None => {
                warn!("Cannot add stream: {}", RecordingError::NotInitialized);
                false
            }
        }
    }

    pub async fn start_recording(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.state == RecordingState::Recording {
            warn!("Cannot start recording: {}", RecordingError::RecorderBusy);
            return false;
        }
        let Some(recorder) = inner.recorder.as_mut() else {
            warn!("Cannot start recording: {}", RecordingError::NotInitialized);
            return false;
        };

        recorder.start();
        inner.state = RecordingState::Recording;
        info!("Recording started");
        true
    }

    /// Stops the recorder. `false`, without touching the recorder, when
    /// nothing is being recorded.
    pub async fn stop_recording(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.state != RecordingState::Recording {
            debug!("Cannot stop recording: {}", RecordingError::NotRecording);
            return false;
        }
        let Some(recorder) = inner.recorder.as_mut() else {
            return false;
        };

        let result = recorder.stop().await;
        inner.state = RecordingState::Stopped;
        match result {
            Ok(()) => {
                info!("Recording stopped");
                true
            }
            Err(e) => {
                error!("Recorder failed to stop: {:?}", e);
                false
            }
        }
    }

    /// Uploads the captured recording. Refused while still recording.
    pub async fn save_recording(&self) -> bool {
        let blob = {
            let inner = self.inner.lock().await;
            if inner.state == RecordingState::Recording {
                warn!("Cannot save recording: {}", RecordingError::RecorderBusy);
                return false;
            }
            let Some(recorder) = inner.recorder.as_ref() else {
                warn!("Cannot save recording: {}", RecordingError::NotInitialized);
                return false;
            };
            match recorder.blob() {
                Some(blob) => blob,
                None => {
                    warn!("Cannot save recording: {}", RecordingError::NothingCaptured);
                    return false;
                }
            }
        };

        match self.store.upload(blob).await {
            Ok(()) => {
                info!("Recording uploaded");
                true
            }
            Err(e) => {
                error!("{}", RecordingError::Upload(format!("{e:#}")));
                false
            }
        }
    }

    /// Releases the recorder. Idempotent.
    pub async fn destroy(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(task) = inner.attach_task.take() {
            task.abort();
        }
        if let Some(mut recorder) = inner.recorder.take() {
            recorder.destroy();
            info!("Recorder destroyed");
        }
        inner.state = RecordingState::Uninitialized;
    }

    pub async fn is_recording(&self) -> bool {
        self.state().await == RecordingState::Recording
    }

    pub async fn state(&self) -> RecordingState {
        self.inner.lock().await.state
    }
}
