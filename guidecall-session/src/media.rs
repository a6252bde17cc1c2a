use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

const FRAME_BUFFER: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

/// One encoded media sample.
#[derive(Debug, Clone)]
pub struct MediaFrame {
    pub data: Bytes,
    pub duration: Duration,
}

impl MediaFrame {
    pub fn new(data: impl Into<Bytes>, duration: Duration) -> Self {
        Self {
            data: data.into(),
            duration,
        }
    }
}

/// A single audio or video track.
///
/// Frames are fanned out to every subscriber. Stopping a track is final and
/// closes the frame channel, so subscribers see the end of the track.
#[derive(Debug)]
pub struct MediaTrack {
    id: String,
    kind: TrackKind,
    frames: Mutex<Option<broadcast::Sender<MediaFrame>>>,
    stopped: AtomicBool,
}

impl MediaTrack {
    pub fn new(kind: TrackKind) -> Arc<Self> {
        Self::with_id(Uuid::new_v4().to_string(), kind)
    }

    pub fn with_id(id: impl Into<String>, kind: TrackKind) -> Arc<Self> {
        let (tx, _) = broadcast::channel(FRAME_BUFFER);
        Arc::new(Self {
            id: id.into(),
            kind,
            frames: Mutex::new(Some(tx)),
            stopped: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    /// Publishes a frame. Returns `false` once the track is stopped.
    pub fn push_frame(&self, frame: MediaFrame) -> bool {
        match self.frames.lock().as_ref() {
            Some(tx) => {
                // No subscriber is not an error, the frame is simply not observed.
                let _ = tx.send(frame);
                true
            }
            None => false,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MediaFrame> {
        match self.frames.lock().as_ref() {
            Some(tx) => tx.subscribe(),
            None => broadcast::channel(1).1,
        }
    }

    /// Stops the track. Only the first call has an effect and returns `true`.
    pub fn stop(&self) -> bool {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.frames.lock().take();
        debug!("Track {} ({:?}) stopped", self.id, self.kind);
        true
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Shared handle to a group of tracks. Clones see the same track list.
#[derive(Debug, Clone)]
pub struct MediaStream {
    id: String,
    tracks: Arc<RwLock<Vec<Arc<MediaTrack>>>>,
}

impl MediaStream {
    pub fn new(id: impl Into<String>, tracks: Vec<Arc<MediaTrack>>) -> Self {
        Self {
            id: id.into(),
            tracks: Arc::new(RwLock::new(tracks)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> Vec<Arc<MediaTrack>> {
        self.tracks.read().clone()
    }

    pub fn tracks_of(&self, kind: TrackKind) -> Vec<Arc<MediaTrack>> {
        self.tracks
            .read()
            .iter()
            .filter(|t| t.kind() == kind)
            .cloned()
            .collect()
    }

    pub fn add_track(&self, track: Arc<MediaTrack>) {
        self.tracks.write().push(track);
    }

    /// Stops every track, returns how many were still live.
    pub fn stop_all(&self) -> usize {
        self.tracks.read().iter().filter(|t| t.stop()).count()
    }

    pub fn is_active(&self) -> bool {
        self.tracks.read().iter().any(|t| !t.is_stopped())
    }

    pub fn same_stream(&self, other: &MediaStream) -> bool {
        Arc::ptr_eq(&self.tracks, &other.tracks)
    }
}
