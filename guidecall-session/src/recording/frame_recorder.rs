use crate::media::{MediaFrame, MediaStream, MediaTrack};
use crate::recording::recorder::{Recorder, RecordingBlob};
use anyhow::{Result, bail};
use async_trait::async_trait;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const FRAME_CONTAINER_MIME: &str = "application/x-guidecall-frames";

/// A frame read back from a recording container.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedFrame {
    pub track_id: String,
    /// Offset from the start of the recording.
    pub offset: Duration,
    pub data: Bytes,
}

/// Records every track of the attached streams into a single
/// length-prefixed container.
///
/// Frame layout: `u16` track id length, track id, `u64` offset in
/// microseconds, `u32` payload length, payload. All big endian.
#[derive(Default)]
pub struct FrameRecorder {
    streams: Vec<MediaStream>,
    captured_tracks: HashSet<String>,
    buffer: Arc<Mutex<BytesMut>>,
    started_at: Option<Instant>,
    stop_tx: Option<watch::Sender<bool>>,
    tasks: Vec<JoinHandle<()>>,
    blob: Option<RecordingBlob>,
    destroyed: bool,
}

impl FrameRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_capturing(&self) -> bool {
        self.started_at.is_some() && !self.destroyed
    }

    fn capture_stream(&mut self, stream: &MediaStream) {
        let (Some(started_at), Some(stop_tx)) = (self.started_at, self.stop_tx.as_ref()) else {
            return;
        };
        for track in stream.tracks() {
            if !self.captured_tracks.insert(track.id().to_owned()) {
                continue;
            }
            // Subscribed here so frames pushed before the task first runs are kept.
            let frames = track.subscribe();
            self.tasks.push(tokio::spawn(capture_track(
                track,
                frames,
                self.buffer.clone(),
                started_at,
                stop_tx.subscribe(),
            )));
        }
    }

    fn abort_capture(&mut self) {
        self.stop_tx = None;
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    /// Signals every capture task and waits until each has written the
    /// frames queued before the signal.
    async fn finish_capture(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
        let tasks: Vec<_> = self.tasks.drain(..).collect();
        for result in join_all(tasks).await {
            if let Err(e) = result {
                warn!("Capture task ended abnormally: {}", e);
            }
        }
    }

    /// Reads back every frame of a container produced by this recorder.
    pub fn decode(data: &[u8]) -> Result<Vec<RecordedFrame>> {
        let mut buf = data;
        let mut frames = Vec::new();

        while buf.has_remaining() {
            if buf.remaining() < 2 {
                bail!("truncated track id length");
            }
            let id_len = buf.get_u16() as usize;
            if buf.remaining() < id_len + 8 + 4 {
                bail!("truncated frame header");
            }
            let track_id = String::from_utf8(buf.copy_to_bytes(id_len).to_vec())?;
            let offset = Duration::from_micros(buf.get_u64());
            let len = buf.get_u32() as usize;
            if buf.remaining() < len {
                bail!("truncated frame payload");
            }
            let data = buf.copy_to_bytes(len);
            frames.push(RecordedFrame {
                track_id,
                offset,
                data,
            });
        }

        Ok(frames)
    }
}

#[async_trait]
impl Recorder for FrameRecorder {
    fn add_stream(&mut self, stream: MediaStream) {
        if self.destroyed {
            warn!("Recorder destroyed, ignoring stream {}", stream.id());
            return;
        }
        if self.streams.iter().any(|s| s.same_stream(&stream)) {
            return;
        }
        debug!("Recording stream {}", stream.id());
        if self.is_capturing() {
            self.capture_stream(&stream);
        }
        self.streams.push(stream);
    }

    fn start(&mut self) {
        if self.destroyed || self.started_at.is_some() {
            return;
        }
        self.started_at = Some(Instant::now());
        self.stop_tx = Some(watch::channel(false).0);
        self.blob = None;
        self.buffer.lock().clear();

        let streams = self.streams.clone();
        for stream in &streams {
            self.capture_stream(stream);
        }
        info!("Frame recorder started with {} streams", streams.len());
    }

    async fn stop(&mut self) -> Result<()> {
        if self.started_at.take().is_none() {
            bail!("frame recorder is not running");
        }
        self.finish_capture().await;
        self.captured_tracks.clear();

        let data = self.buffer.lock().split().freeze();
        info!("Frame recorder stopped, {} bytes captured", data.len());
        self.blob = Some(RecordingBlob {
            mime_type: FRAME_CONTAINER_MIME.to_owned(),
            data,
        });
        Ok(())
    }

    fn blob(&self) -> Option<RecordingBlob> {
        self.blob.clone()
    }

    fn destroy(&mut self) {
        self.abort_capture();
        self.destroyed = true;
        self.started_at = None;
        self.streams.clear();
        self.captured_tracks.clear();
        self.blob = None;
        self.buffer.lock().clear();
    }
}

impl Drop for FrameRecorder {
    fn drop(&mut self) {
        self.abort_capture();
    }
}

async fn capture_track(
    track: Arc<MediaTrack>,
    mut frames: broadcast::Receiver<MediaFrame>,
    buffer: Arc<Mutex<BytesMut>>,
    started_at: Instant,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;

            frame = frames.recv() => match frame {
                Ok(frame) => append_frame(&buffer, track.id(), started_at, &frame),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Recorder fell behind on track {}, {} frames lost", track.id(), skipped);
                }
                Err(RecvError::Closed) => break,
            },

            _ = stop.changed() => {
                loop {
                    match frames.try_recv() {
                        Ok(frame) => append_frame(&buffer, track.id(), started_at, &frame),
                        Err(TryRecvError::Lagged(_)) => continue,
                        Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                    }
                }
                break;
            }
        }
    }
    debug!("Capture of track {} finished", track.id());
}

fn append_frame(
    buffer: &Mutex<BytesMut>,
    track_id: &str,
    started_at: Instant,
    frame: &MediaFrame,
) {
    let id = track_id.as_bytes();
    let (Ok(id_len), Ok(data_len)) = (u16::try_from(id.len()), u32::try_from(frame.data.len()))
    else {
        warn!(
            "Skipping frame of track {}: {} byte id, {} byte payload do not fit the container",
            track_id,
            id.len(),
            frame.data.len()
        );
        return;
    };
    let offset = u64::try_from(started_at.elapsed().as_micros()).unwrap_or(u64::MAX);

    let mut buf = buffer.lock();
    buf.put_u16(id_len);
    buf.put_slice(id);
    buf.put_u64(offset);
    buf.put_u32(data_len);
    buf.put_slice(&frame.data);
}
