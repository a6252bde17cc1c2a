use crate::error::{SessionError, SessionResult};
use guidecall_core::IceServerConfig;
use guidecall_core::utils::{DEFAULT_STUN_ADDR, DEFAULT_STUN_ADDR_2};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const ENV_SIGNALING_URL: &str = "GUIDECALL_SIGNALING_URL";
pub const ENV_SIGNALING_KEY: &str = "GUIDECALL_SIGNALING_KEY";
pub const ENV_TURN_URL: &str = "GUIDECALL_TURN_URL";
pub const ENV_TURN_USERNAME: &str = "GUIDECALL_TURN_USERNAME";
pub const ENV_TURN_CREDENTIAL: &str = "GUIDECALL_TURN_CREDENTIAL";
pub const ENV_RECORDING_DIR: &str = "GUIDECALL_RECORDING_DIR";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    pub signaling: SignalingConfig,
    pub recording: RecordingConfig,
    pub capture: MediaConstraints,
}

/// Connection parameters of the rendezvous service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SignalingConfig {
    pub url: String,
    pub key: Option<String>,
    pub heartbeat_interval_ms: u64,
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:9000/signal".to_owned(),
            key: None,
            heartbeat_interval_ms: 5_000,
            ice_servers: vec![IceServerConfig {
                urls: vec![DEFAULT_STUN_ADDR.to_owned(), DEFAULT_STUN_ADDR_2.to_owned()],
                username: None,
                credential: None,
            }],
        }
    }
}

impl SignalingConfig {
    /// URL the signaling link dials, with the API key appended if present.
    pub fn connect_url(&self) -> String {
        match &self.key {
            Some(key) if self.url.contains('?') => format!("{}&key={}", self.url, key),
            Some(key) => format!("{}?key={}", self.url, key),
            None => self.url.clone(),
        }
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecordingConfig {
    pub output_dir: PathBuf,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("recordings"),
        }
    }
}

/// What the local capture device is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

impl SessionConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> SessionResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        debug!("Loaded session config from {}", path.display());
        Ok(config)
    }

    /// Builds the config from `GUIDECALL_*` variables on top of the defaults.
    pub fn from_env() -> SessionResult<Self> {
        let mut config = Self::default();

        if let Ok(url) = env::var(ENV_SIGNALING_URL) {
            config.signaling.url = url;
        }
        config.signaling.key = env::var(ENV_SIGNALING_KEY).ok();

        if let Ok(turn_url) = env::var(ENV_TURN_URL) {
            config.signaling.ice_servers.push(IceServerConfig {
                urls: vec![turn_url],
                username: env::var(ENV_TURN_USERNAME).ok(),
                credential: env::var(ENV_TURN_CREDENTIAL).ok(),
            });
        }

        if let Ok(dir) = env::var(ENV_RECORDING_DIR) {
            config.recording.output_dir = PathBuf::from(dir);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SessionResult<()> {
        let url = self.signaling.url.trim();
        if url.is_empty() {
            return Err(SessionError::Config("signaling url cannot be empty".to_owned()));
        }
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(SessionError::Config(format!(
                "signaling url must use ws:// or wss://, got '{url}'"
            )));
        }
        for server in &self.signaling.ice_servers {
            if server.urls.is_empty() {
                return Err(SessionError::Config("ICE server without urls".to_owned()));
            }
            let is_turn = server.urls.iter().any(|u| u.starts_with("turn:"));
            if is_turn && (server.username.is_none() || server.credential.is_none()) {
                return Err(SessionError::Config(
                    "TURN servers require username and credential".to_owned(),
                ));
            }
        }
        Ok(())
    }
}
