use guidecall_session::{RecordingState, Replay, StatusFeed};

use crate::integration::{init_tracing, mock_recording_manager};
use crate::utils::{remote_stream, settle};

#[tokio::test]
async fn test_destroy_releases_recorder() {
    init_tracing();

    let (manager, recorders, _store, journal) = mock_recording_manager();
    let feed = StatusFeed::new(Replay::None);

    assert!(manager.initialize().await);
    assert!(manager.attach_streams(feed.subscribe()).await);

    manager.destroy().await;
    manager.destroy().await;
    assert_eq!(journal.count("recorder:destroy"), 1);
    assert_eq!(manager.state().await, RecordingState::Uninitialized);

    // Forwarding stopped with the recorder
    feed.emit(remote_stream());
    settle().await;
    assert!(recorders.streams().is_empty());

    assert!(!manager.add_stream(remote_stream()).await);
    assert!(!manager.start_recording().await);
    assert!(!journal.contains("recorder:start"));
}
