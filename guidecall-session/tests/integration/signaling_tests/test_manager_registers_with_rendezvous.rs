use guidecall_core::SignalingStatus;
use guidecall_session::{SignalingConfig, SignalingSessionManager};

use crate::integration::init_tracing;
use crate::utils::{MockRendezvous, WAIT_TIMEOUT_MS, recv_within, wait_until};

#[tokio::test]
async fn test_manager_registers_with_rendezvous() {
    init_tracing();

    let (rendezvous, url, _server) = MockRendezvous::spawn().await;
    let config = SignalingConfig {
        url,
        key: Some("test-key".to_owned()),
        ..Default::default()
    };
    let manager = SignalingSessionManager::from_config(&config);

    let mut signaling_rx = manager.initialize().await.expect("initialize refused");
    let status = recv_within(&mut signaling_rx, WAIT_TIMEOUT_MS).await;
    assert_eq!(status, Some(SignalingStatus::Connected));

    let local_id = manager.local_id().expect("no id assigned");
    assert!(rendezvous.is_registered(&local_id));

    manager.destroy().await;
    assert!(wait_until(|| rendezvous.peer_count() == 0, WAIT_TIMEOUT_MS).await);
    assert!(!manager.is_connected());
}

#[tokio::test]
async fn test_unreachable_rendezvous_reports_error() {
    init_tracing();

    let config = SignalingConfig {
        url: "ws://127.0.0.1:1/signal".to_owned(),
        ..Default::default()
    };
    let manager = SignalingSessionManager::from_config(&config);

    let mut signaling_rx = manager.initialize().await.expect("initialize refused");
    let status = recv_within(&mut signaling_rx, WAIT_TIMEOUT_MS).await;
    assert_eq!(status, Some(SignalingStatus::Error));
}
