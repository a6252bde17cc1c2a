use crate::integration::{init_tracing, mock_recording_manager};
use crate::utils::MOCK_RECORDING_MIME;

#[tokio::test]
async fn test_save_requires_stopped_recording() {
    init_tracing();

    let (manager, _recorders, store, journal) = mock_recording_manager();

    assert!(!manager.save_recording().await, "nothing to save yet");

    assert!(manager.initialize().await);
    assert!(!manager.save_recording().await, "nothing captured yet");

    assert!(manager.start_recording().await);
    assert!(!manager.save_recording().await, "still recording");
    assert!(!journal.contains("store:upload"));

    assert!(manager.stop_recording().await);
    assert!(manager.save_recording().await);

    let uploads = store.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].mime_type, MOCK_RECORDING_MIME);
    assert!(!uploads[0].is_empty());
}

#[tokio::test]
async fn test_failed_upload_reports_false() {
    init_tracing();

    let (manager, _recorders, store, journal) = mock_recording_manager();
    store.fail_uploads(true);

    assert!(manager.initialize().await);
    assert!(manager.start_recording().await);
    assert!(manager.stop_recording().await);

    assert!(!manager.save_recording().await);
    assert!(journal.contains("store:upload"));
    assert!(store.uploads().is_empty());
}
