use guidecall_core::MessageType;
use guidecall_session::{RecordingOutcome, SessionCommand};

use crate::integration::init_tracing;
use crate::utils::{OPERATOR_ID, SessionHarness, WAIT_TIMEOUT_MS, wait_until};

#[tokio::test]
async fn test_abandoned_session_skips_prompts() {
    init_tracing();

    let harness = SessionHarness::new();
    let journal = harness.journal.clone();
    let (cmd_tx, handle) = harness.spawn(Some(OPERATOR_ID));
    assert!(wait_until(|| journal.contains("data:send:started"), WAIT_TIMEOUT_MS).await);

    cmd_tx.send(SessionCommand::NavigateAway).await.unwrap();
    let report = handle.await.unwrap().expect("session failed");

    assert_eq!(report.wire_message, MessageType::Aborted);
    assert!(report.delivered);
    assert_eq!(report.recording, RecordingOutcome::Discarded);

    assert!(journal.contains("recorder:stop"));
    assert!(journal.contains("peer:destroy"));
    assert!(!journal.contains("view:confirm_save"));
    assert!(!journal.contains("store:upload"));
    assert!(!journal.contains("view:navigate_away"));
    assert!(!journal.contains("store:abort_session"));
}
