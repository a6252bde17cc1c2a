use guidecall_core::{ConnectionStatus, MessageType, WireMessage};
use guidecall_session::{PeerState, SessionError};

use crate::integration::{connected_manager, init_tracing, remote};
use crate::utils::{Autopilot, WAIT_TIMEOUT_MS, recv_within, remote_stream, settle, wait_until};

#[tokio::test]
async fn test_opened_after_media_then_data() {
    init_tracing();

    let (manager, control, _signaling_rx) = connected_manager(Autopilot::manual()).await;
    let journal = control.journal().clone();
    let mut streams = manager.streams();

    let mut connection_rx = manager
        .connect(remote(), remote_stream())
        .expect("connect refused");

    assert!(wait_until(|| journal.contains("media:call"), WAIT_TIMEOUT_MS).await);
    settle().await;
    assert!(
        !journal.contains("data:connect"),
        "data channel must wait for the media call"
    );
    assert_eq!(manager.peer_state(), PeerState::MediaPending);

    // Only one peer session at a time
    let busy = manager.connect(remote(), remote_stream());
    assert!(matches!(busy, Err(SessionError::ConnectionBusy)));

    let answered = control.answer_media();
    let stream = recv_within(&mut streams, WAIT_TIMEOUT_MS)
        .await
        .expect("remote stream not published");
    assert!(stream.same_stream(&answered));

    assert!(wait_until(|| journal.contains("data:connect"), WAIT_TIMEOUT_MS).await);
    settle().await;
    assert!(connection_rx.try_recv().is_none(), "opened before data channel");
    assert!(!manager.is_opened());

    control.open_data();
    let status = recv_within(&mut connection_rx, WAIT_TIMEOUT_MS).await;
    assert_eq!(status, Some(ConnectionStatus::Opened));
    assert!(manager.is_opened());
    assert_eq!(manager.peer_state(), PeerState::Opened);

    assert!(manager.send_data(&WireMessage::started()).await);
    let sent = control.sent_messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, MessageType::Started);

    journal.assert_order(&["media:call", "media:stream", "data:connect", "data:open"]);
}
