use guidecall_session::RecordingState;

use crate::integration::{init_tracing, mock_recording_manager};

#[tokio::test]
async fn test_stop_without_recording() {
    init_tracing();

    let (manager, _recorders, _store, journal) = mock_recording_manager();

    assert!(!manager.stop_recording().await);
    assert!(!manager.start_recording().await);
    assert_eq!(manager.state().await, RecordingState::Uninitialized);

    assert!(manager.initialize().await);
    assert!(!manager.stop_recording().await);
    assert!(!journal.contains("recorder:stop"));
    assert_eq!(manager.state().await, RecordingState::Ready);
}
