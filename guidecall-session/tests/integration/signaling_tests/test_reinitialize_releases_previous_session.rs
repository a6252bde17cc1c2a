use guidecall_core::{ConnectionStatus, SignalingStatus};
use guidecall_session::{PeerEvent, PeerState};

use crate::integration::{connected_manager, init_tracing, remote};
use crate::utils::{Autopilot, WAIT_TIMEOUT_MS, recv_within, remote_stream};

#[tokio::test]
async fn test_reinitialize_releases_previous_session() {
    init_tracing();

    let (manager, control, mut signaling_rx) = connected_manager(Autopilot::full()).await;
    let journal = control.journal().clone();

    let local = remote_stream();
    let mut connection_rx = manager
        .connect(remote(), local.clone())
        .expect("connect refused");
    let status = recv_within(&mut connection_rx, WAIT_TIMEOUT_MS).await;
    assert_eq!(status, Some(ConnectionStatus::Opened));

    // Rendezvous drops while the peer session is still up
    control.emit_peer(PeerEvent::Disconnected);
    let status = recv_within(&mut signaling_rx, WAIT_TIMEOUT_MS).await;
    assert_eq!(status, Some(SignalingStatus::Disconnected));
    assert!(!manager.is_connected());

    let mut signaling_rx = manager
        .initialize()
        .await
        .expect("Failed to reinitialize manager");
    let status = recv_within(&mut signaling_rx, WAIT_TIMEOUT_MS).await;
    assert_eq!(status, Some(SignalingStatus::Connected));

    assert_eq!(journal.count("data:close"), 1);
    assert_eq!(journal.count("media:close"), 1);
    journal.assert_order(&["data:close", "media:close", "peer:destroy"]);
    assert!(!local.is_active());
    assert!(!control.media_link_open());
    assert_eq!(manager.peer_state(), PeerState::Idle);

    // A fresh session opens on the new link
    let mut connection_rx = manager
        .connect(remote(), remote_stream())
        .expect("connect refused");
    let status = recv_within(&mut connection_rx, WAIT_TIMEOUT_MS).await;
    assert_eq!(status, Some(ConnectionStatus::Opened));
    assert_eq!(journal.count("media:call"), 2);
    assert_eq!(journal.count("media:close"), 1);
    assert!(manager.is_opened());
}
