use guidecall_session::{
    DirectoryRecordingStore, FrameRecorder, MediaFrame, MediaStream, MediaTrack,
    RecordingManager, TrackKind,
};
use std::sync::Arc;
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::settle;

#[tokio::test]
async fn test_frame_recording_is_saved_to_directory() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let manager =
        RecordingManager::with_frame_recorder(Arc::new(DirectoryRecordingStore::new(dir.path())));

    let video = MediaTrack::with_id("operator-video", TrackKind::Video);
    let stream = MediaStream::new("operator-stream", vec![video.clone()]);

    assert!(manager.initialize().await);
    assert!(manager.add_stream(stream).await);
    assert!(manager.start_recording().await);
    settle().await;

    video.push_frame(MediaFrame::new(vec![7u8, 7, 7], Duration::from_millis(33)));
    video.push_frame(MediaFrame::new(vec![8u8], Duration::from_millis(33)));
    settle().await;

    assert!(manager.stop_recording().await);
    assert!(manager.save_recording().await);
    manager.destroy().await;

    let files: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(files.len(), 1);

    let data = std::fs::read(&files[0]).unwrap();
    let frames = FrameRecorder::decode(&data).unwrap();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].track_id, "operator-video");
    assert_eq!(frames[0].data.as_ref(), &[7, 7, 7]);
    assert_eq!(frames[1].data.as_ref(), &[8]);
}
