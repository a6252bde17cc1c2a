use anyhow::Result;
use guidecall_core::IceServerConfig;
use guidecall_core::utils::{DEFAULT_STUN_ADDR, DEFAULT_STUN_ADDR_2};
use std::sync::Arc;
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;

/// WebRTC settings shared by every connection a peer opens.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig {
                urls: vec![DEFAULT_STUN_ADDR.to_owned(), DEFAULT_STUN_ADDR_2.to_owned()],
                username: None,
                credential: None,
            }],
        }
    }
}

impl TransportConfig {
    pub fn new(ice_servers: Vec<IceServerConfig>) -> Self {
        if ice_servers.is_empty() {
            return Self::default();
        }
        Self { ice_servers }
    }

    pub fn rtc_configuration(&self) -> RTCConfiguration {
        RTCConfiguration {
            ice_servers: self
                .ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                })
                .collect(),
            ..Default::default()
        }
    }

    /// Builds a peer connection with the default codecs and interceptors.
    pub async fn new_peer_connection(&self) -> Result<Arc<RTCPeerConnection>> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        Ok(Arc::new(
            api.new_peer_connection(self.rtc_configuration()).await?,
        ))
    }
}
