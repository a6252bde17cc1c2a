use guidecall_core::ConnectionStatus;
use guidecall_session::{PeerState, SignalingSessionManager, SignalingState};

use crate::integration::{connected_manager, init_tracing, remote};
use crate::utils::{
    Autopilot, Journal, MockPeerControl, WAIT_TIMEOUT_MS, recv_within, remote_stream,
};

#[tokio::test]
async fn test_destroy_is_idempotent() {
    init_tracing();

    let (manager, control, _signaling_rx) = connected_manager(Autopilot::full()).await;
    let journal = control.journal().clone();

    let mut connection_rx = manager
        .connect(remote(), remote_stream())
        .expect("connect refused");
    let status = recv_within(&mut connection_rx, WAIT_TIMEOUT_MS).await;
    assert_eq!(status, Some(ConnectionStatus::Opened));

    manager.destroy().await;
    manager.destroy().await;

    assert_eq!(journal.count("peer:destroy"), 1);
    assert_eq!(journal.count("data:close"), 1);
    assert_eq!(journal.count("media:close"), 1);
    journal.assert_order(&["data:close", "media:close", "peer:disconnect", "peer:destroy"]);

    assert_eq!(manager.signaling_state(), SignalingState::Uninitialized);
    assert_eq!(manager.peer_state(), PeerState::Idle);
    assert!(!manager.is_connected());
    assert_eq!(manager.local_id(), None);

    // Feeds are completed
    assert!(manager.streams().recv().await.is_none());
}

#[tokio::test]
async fn test_destroy_without_initialize() {
    init_tracing();

    let control = MockPeerControl::new(Journal::new(), Autopilot::manual());
    let manager = SignalingSessionManager::new(control.connector());

    manager.destroy().await;
    manager.destroy().await;

    let journal = control.journal();
    assert_eq!(journal.count("signaling:open"), 0);
    assert_eq!(journal.count("peer:destroy"), 0);
    assert_eq!(manager.signaling_state(), SignalingState::Uninitialized);
    assert_eq!(manager.peer_state(), PeerState::Idle);
    assert!(manager.streams().recv().await.is_none());
}
