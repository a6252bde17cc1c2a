use guidecall_core::ConnectionStatus;
use guidecall_session::{DataEvent, PeerState};

use crate::integration::{connected_manager, init_tracing, remote};
use crate::utils::{Autopilot, WAIT_TIMEOUT_MS, recv_within, remote_stream, wait_until};

#[tokio::test]
async fn test_data_failure_closes_media() {
    init_tracing();

    let (manager, control, _signaling_rx) = connected_manager(Autopilot::manual()).await;
    let journal = control.journal().clone();

    let mut connection_rx = manager
        .connect(remote(), remote_stream())
        .expect("connect refused");
    assert!(wait_until(|| journal.contains("media:call"), WAIT_TIMEOUT_MS).await);
    control.answer_media();
    assert!(wait_until(|| journal.contains("data:connect"), WAIT_TIMEOUT_MS).await);
    assert!(control.media_link_open());

    control.emit_data(DataEvent::Error("negotiation failed".to_owned()));

    let status = recv_within(&mut connection_rx, WAIT_TIMEOUT_MS).await;
    assert_eq!(status, Some(ConnectionStatus::Error));

    // Both sub-channels are closed by the time the failure is reported
    assert!(journal.contains("media:close"));
    assert!(journal.contains("data:close"));
    assert!(!control.media_link_open());
    assert_eq!(manager.peer_state(), PeerState::Error);
    assert!(!manager.is_opened());
}
