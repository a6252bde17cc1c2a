use guidecall_core::SignalingStatus;
use guidecall_session::{SignalingSessionManager, SignalingState};

use crate::integration::init_tracing;
use crate::utils::{Autopilot, Journal, MockPeerControl, WAIT_TIMEOUT_MS, recv_within};

#[tokio::test]
async fn test_open_failure_reports_error() {
    init_tracing();

    let control = MockPeerControl::new(Journal::new(), Autopilot::manual());
    control.fail_open(true);
    let manager = SignalingSessionManager::new(control.connector());

    let mut signaling_rx = manager
        .initialize()
        .await
        .expect("open failures are reported on the feed");
    let status = recv_within(&mut signaling_rx, WAIT_TIMEOUT_MS).await;
    assert_eq!(status, Some(SignalingStatus::Error));
    assert_eq!(manager.signaling_state(), SignalingState::Closed);
    assert!(!manager.is_connected());

    // The manager can be initialized again once the service is back
    control.fail_open(false);
    let mut signaling_rx = manager.initialize().await.expect("re-initialize refused");
    let status = recv_within(&mut signaling_rx, WAIT_TIMEOUT_MS).await;
    assert_eq!(status, Some(SignalingStatus::Connected));
    assert_eq!(control.journal().count("signaling:open"), 2);
}
