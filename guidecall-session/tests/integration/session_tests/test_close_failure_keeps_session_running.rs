use guidecall_core::MessageType;
use guidecall_session::SessionCommand;

use crate::integration::init_tracing;
use crate::utils::{OPERATOR_ID, SessionHarness, WAIT_TIMEOUT_MS, settle, wait_until};

#[tokio::test]
async fn test_close_failure_keeps_session_running() {
    init_tracing();

    let harness = SessionHarness::new();
    harness.store.fail_close(true);
    let journal = harness.journal.clone();
    let (cmd_tx, handle) = harness.spawn(Some(OPERATOR_ID));
    assert!(wait_until(|| journal.contains("data:send:started"), WAIT_TIMEOUT_MS).await);

    cmd_tx
        .send(SessionCommand::Close { completed: true })
        .await
        .unwrap();
    assert!(
        wait_until(
            || harness.view.has_notification("Unable to close session"),
            WAIT_TIMEOUT_MS
        )
        .await
    );
    settle().await;
    assert!(!handle.is_finished());
    assert!(!journal.contains("data:send:finished"));
    assert!(harness.memory.last().is_some());

    harness.store.fail_close(false);
    cmd_tx
        .send(SessionCommand::Close { completed: true })
        .await
        .unwrap();
    let report = handle.await.unwrap().expect("session failed");
    assert_eq!(report.wire_message, MessageType::Finished);
    assert_eq!(journal.count("store:close_session"), 2);
}
