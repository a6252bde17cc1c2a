use guidecall_session::SessionError;

use crate::integration::init_tracing;
use crate::utils::{OPERATOR_ID, SessionHarness};

#[tokio::test]
async fn test_initialization_error() {
    init_tracing();

    let harness = SessionHarness::new();
    harness.store.fail_load(true);
    let (_cmd_tx, handle) = harness.spawn(Some(OPERATOR_ID));

    let result = handle.await.unwrap();
    assert!(matches!(result, Err(SessionError::Collaborator(_))));
    assert!(harness.view.has_notification("Initialization error"));
    assert!(!harness.journal.contains("signaling:open"));
    assert!(!harness.journal.contains("view:navigate_away"));
}
